use crate::backend::RenderBackend;
use crate::error::Result;
use crate::settings::{LayoutSettings, Margins};

use super::block::Block;
use super::page_break::PageBreakPolicy;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margins: Margins,
}

impl PageGeometry {
    pub fn new(width: f32, height: f32, margins: Margins) -> Self {
        Self {
            width,
            height,
            margins,
        }
    }

    pub fn from_layout(layout: &LayoutSettings) -> Self {
        let (width, height) = layout.page_dimensions();
        Self::new(width, height, layout.margins)
    }

    pub fn content_width(&self) -> f32 {
        (self.width - self.margins.left - self.margins.right).max(0.0)
    }

    pub fn content_top(&self) -> f32 {
        self.margins.top
    }

    pub fn content_bottom(&self) -> f32 {
        self.height - self.margins.bottom
    }
}

/// Where a block ended up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub page_index: usize,
    pub y: f32,
    pub height: f32,
}

/// Current page, vertical write position and section label.
///
/// Only `push` (through `PageBreakPolicy::ensure_space`) moves the cursor to
/// another page; the cursor never goes back to an earlier page.
#[derive(Debug)]
pub struct LayoutCursor {
    geometry: PageGeometry,
    page_index: usize,
    y: f32,
    section_label: String,
    page_used: bool,
    /// Section label of every page created while this cursor was live,
    /// indexed by page index.
    page_sections: Vec<String>,
}

impl LayoutCursor {
    /// Create the first page of the assembly and position the cursor on it.
    pub fn begin<B: RenderBackend + ?Sized>(
        backend: &mut B,
        geometry: PageGeometry,
        section_label: &str,
    ) -> Result<Self> {
        let page_index = backend.add_page()?;
        let mut page_sections = vec![String::new(); page_index];
        page_sections.push(section_label.to_string());
        Ok(Self {
            geometry,
            page_index,
            y: geometry.content_top(),
            section_label: section_label.to_string(),
            page_used: false,
            page_sections,
        })
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn section_label(&self) -> &str {
        &self.section_label
    }

    /// True until the first block lands on the current page.
    pub fn is_at_page_top(&self) -> bool {
        !self.page_used
    }

    pub fn page_sections(&self) -> &[String] {
        &self.page_sections
    }

    pub fn into_page_sections(self) -> Vec<String> {
        self.page_sections
    }

    /// Change the label used for pages created from now on. A page that has
    /// nothing on it yet is relabelled as well.
    pub fn set_section_label(&mut self, label: &str) {
        self.section_label = label.to_string();
        if !self.page_used {
            self.page_sections[self.page_index] = self.section_label.clone();
        }
    }

    /// Consume the rest of the current page so the next block starts on a
    /// new one.
    pub fn fill_page(&mut self) {
        self.page_used = true;
        self.y = self.y.max(self.geometry.content_bottom());
    }

    pub(super) fn move_to_page(&mut self, index: usize, label: Option<&str>) {
        debug_assert!(index > self.page_index, "cursor must only move forward");
        if let Some(label) = label {
            self.section_label = label.to_string();
        }
        self.page_index = index;
        self.y = self.geometry.content_top();
        self.page_used = false;
        if self.page_sections.len() <= index {
            self.page_sections.resize(index + 1, String::new());
        }
        self.page_sections[index] = self.section_label.clone();
    }

    pub fn push<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        policy: &PageBreakPolicy,
        block: &Block,
    ) -> Result<Placement> {
        self.push_labeled(backend, policy, block, 0.0, None)
    }

    /// Push `block`, also requiring `lookahead` points to be free below it so
    /// a heading is never left alone at the bottom of a page. `label` becomes
    /// the section label of the page the block lands on.
    pub fn push_labeled<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        policy: &PageBreakPolicy,
        block: &Block,
        lookahead: f32,
        label: Option<&str>,
    ) -> Result<Placement> {
        let required = if !self.is_at_page_top() && policy.fits(self, block.height()) {
            block.height() + lookahead
        } else {
            block.height()
        };
        policy.ensure_space(self, backend, required, label)?;
        if let Some(label) = label {
            self.set_section_label(label);
        }
        if backend.current_page() != Some(self.page_index) {
            backend.select_page(self.page_index)?;
        }

        let x = self.geometry.margins.left;
        for op in block.ops() {
            op.translated(x, self.y).draw_on(backend)?;
        }

        let placement = Placement {
            page_index: self.page_index,
            y: self.y,
            height: block.height(),
        };
        self.y += block.height();
        self.page_used = true;
        Ok(placement)
    }
}
