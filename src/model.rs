use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The content to export. This is plain data; nothing in here knows about
/// pages or positions.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Content {
    pub cover: CoverContent,
    pub sections: Vec<Section>,
    pub modules: Vec<Module>,
    pub glossary: Vec<GlossaryTerm>,
}

impl Content {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::Content)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CoverContent {
    /// Short lines shown under the title (e.g. a tagline).
    pub lines: Vec<String>,
    /// Encoded PNG/JPEG bytes. Filled in by the file-level API from
    /// `branding.logo`, never read from JSON.
    #[serde(skip)]
    pub logo: Option<Vec<u8>>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Section {
    pub title: String,
    #[serde(default = "default_level")]
    pub level: u8,
    #[serde(default)]
    pub blocks: Vec<ContentBlock>,
    #[serde(default)]
    pub subsections: Vec<Section>,
}

fn default_level() -> u8 {
    1
}

impl Section {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            level: 1,
            blocks: Vec::new(),
            subsections: Vec::new(),
        }
    }

    pub fn with_level(mut self, level: u8) -> Self {
        self.level = level.max(1);
        self
    }

    pub fn with_block(mut self, block: ContentBlock) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn with_subsection(mut self, section: Section) -> Self {
        self.subsections.push(section);
        self
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentBlock {
    Paragraph(String),
    Bullets(Vec<String>),
    Callout { label: String, body: String },
    Badges(Vec<String>),
    KeyValues(Vec<(String, String)>),
    Rule,
    Spacer(f32),
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Module {
    pub name: String,
    pub summary: String,
    pub status: String,
    pub tags: Vec<String>,
    pub features: Vec<String>,
    pub details: Vec<Section>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GlossaryTerm {
    pub term: String,
    pub definition: String,
}
