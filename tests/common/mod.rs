#![allow(dead_code)]

use capdoc_pdf::RecordingBackend;
use capdoc_pdf::backend::{FontWeight, TextSpec};
use capdoc_pdf::engine::{AssemblyReport, PageGeometry, Theme, assemble_document};
use capdoc_pdf::model::{Content, ContentBlock, GlossaryTerm, Module, Section};
use capdoc_pdf::settings::{BandStyle, Revision, Settings, WatermarkKind};
use chrono::NaiveDate;

const WORDS: &[&str] = &[
    "pagination", "engine", "reserves", "contents", "pages", "before", "the", "body", "is",
    "laid", "out", "and", "resolves", "every", "heading", "once", "final", "numbers", "are",
    "known", "decorations", "follow", "after", "assembly",
];

/// Deterministic filler text of `n` words.
pub fn lorem(n: usize) -> String {
    (0..n)
        .map(|i| WORDS[(i * 7 + 3) % WORDS.len()])
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn print_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).expect("valid date")
}

/// Full settings with a fixed print date so output is reproducible.
pub fn sample_settings() -> Settings {
    let mut settings = Settings::default();
    settings.metadata.title = "Platform Capabilities".to_string();
    settings.metadata.subtitle = "Reference edition".to_string();
    settings.metadata.owner = "Product Office".to_string();
    settings.metadata.document_id = "CAP-001".to_string();
    settings.metadata.print_date = Some(print_date());
    settings.metadata.revision_history = vec![
        Revision {
            version: "0.9".to_string(),
            date: "2024-03-02".to_string(),
            author: "A. Writer".to_string(),
            changes: "Draft".to_string(),
        },
        Revision {
            version: "1.0".to_string(),
            date: "2024-04-20".to_string(),
            author: "A. Writer".to_string(),
            changes: "First release".to_string(),
        },
    ];
    settings
}

/// No cover, no contents, no decorations: only the body lands on pages.
pub fn bare_settings() -> Settings {
    let mut settings = sample_settings();
    settings.sections.include_cover = false;
    settings.sections.include_toc = false;
    settings.sections.include_revision_history = false;
    settings.header_footer.header_style = BandStyle::None;
    settings.header_footer.footer_style = BandStyle::None;
    settings.branding.watermark = WatermarkKind::None;
    settings
}

pub fn sample_content() -> Content {
    let overview = Section::new("Overview")
        .with_block(ContentBlock::Paragraph(lorem(180)))
        .with_block(ContentBlock::Callout {
            label: "Note".to_string(),
            body: lorem(40),
        })
        .with_subsection(
            Section::new("Audience")
                .with_block(ContentBlock::Bullets(vec![lorem(12), lorem(30), lorem(8)])),
        )
        .with_subsection(
            Section::new("Scope")
                .with_block(ContentBlock::Paragraph(lorem(220)))
                .with_subsection(
                    Section::new("Out of scope").with_block(ContentBlock::Paragraph(lorem(60))),
                ),
        );
    let platform = Section::new("Platform")
        .with_block(ContentBlock::Badges(vec![
            "GA".to_string(),
            "Cloud".to_string(),
            "On-prem".to_string(),
        ]))
        .with_block(ContentBlock::KeyValues(vec![
            ("Regions".to_string(), "3".to_string()),
            ("Uptime".to_string(), "99.9%".to_string()),
        ]))
        .with_block(ContentBlock::Rule)
        .with_block(ContentBlock::Spacer(12.0))
        .with_block(ContentBlock::Paragraph(lorem(300)));

    let modules = (1..=4)
        .map(|i| Module {
            name: format!("Module {i}"),
            summary: lorem(50 + i * 10),
            status: "Available".to_string(),
            tags: vec!["Core".to_string(), format!("Tier {i}")],
            features: (0..6).map(|j| lorem(6 + j * 3)).collect(),
            details: vec![
                Section::new(format!("Module {i} integration"))
                    .with_block(ContentBlock::Paragraph(lorem(120))),
            ],
        })
        .collect();

    Content {
        sections: vec![overview, platform],
        modules,
        glossary: vec![
            GlossaryTerm {
                term: "ToC".to_string(),
                definition: lorem(20),
            },
            GlossaryTerm {
                term: "cursor".to_string(),
                definition: lorem(25),
            },
            GlossaryTerm {
                term: "Block".to_string(),
                definition: lorem(18),
            },
        ],
        ..Content::default()
    }
}

pub fn assemble(settings: &Settings, content: &Content) -> (RecordingBackend, AssemblyReport) {
    let mut backend = RecordingBackend::new();
    let report =
        assemble_document(&mut backend, settings, content, None).expect("assembly succeeds");
    (backend, report)
}

pub fn geometry(settings: &Settings) -> PageGeometry {
    PageGeometry::from_layout(&settings.layout)
}

pub fn texts_on(backend: &RecordingBackend, page: usize) -> Vec<String> {
    backend
        .texts(page)
        .into_iter()
        .map(|t| t.text.clone())
        .collect()
}

/// The heading text `title` as drawn in the body (bold, heading size), if it
/// is on `page`.
pub fn heading_on<'a>(
    backend: &'a RecordingBackend,
    page: usize,
    title: &str,
    level: u8,
    theme: &Theme,
) -> Option<&'a TextSpec> {
    let size = theme.heading_size(level);
    backend.texts(page).into_iter().find(|t| {
        t.text == title && t.weight == FontWeight::Bold && (t.size - size).abs() < 0.01
    })
}

pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 0.01
}
