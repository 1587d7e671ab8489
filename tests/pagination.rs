mod common;

use capdoc_pdf::backend::{DrawOp, FontWeight, RenderBackend};
use capdoc_pdf::engine::block::{self, Block};
use capdoc_pdf::engine::{LayoutCursor, PageBreakPolicy, PageGeometry, Theme};
use capdoc_pdf::model::{Content, ContentBlock, Section};
use capdoc_pdf::settings::Margins;
use capdoc_pdf::RecordingBackend;

fn small_page() -> PageGeometry {
    PageGeometry::new(300.0, 280.0, Margins::uniform(20.0))
}

#[test]
fn three_hundred_point_blocks_make_two_pages() {
    let mut backend = RecordingBackend::new();
    let policy = PageBreakPolicy::default();
    let mut cursor = LayoutCursor::begin(&mut backend, small_page(), "Body").unwrap();

    let placements: Vec<_> = (0..3)
        .map(|_| {
            cursor
                .push(&mut backend, &policy, &Block::spacer(100.0))
                .unwrap()
        })
        .collect();

    assert_eq!(backend.page_count(), 2);
    assert_eq!(
        placements
            .iter()
            .map(|p| (p.page_index, p.y))
            .collect::<Vec<_>>(),
        vec![(0, 20.0), (0, 120.0), (1, 20.0)]
    );
}

#[test]
fn block_tops_stay_inside_the_content_area() {
    let mut backend = RecordingBackend::new();
    let policy = PageBreakPolicy::default();
    let geometry = small_page();
    let limit = policy.content_limit(&geometry);
    let mut cursor = LayoutCursor::begin(&mut backend, geometry, "Body").unwrap();

    let mut violations = Vec::new();
    let mut last_page = 0;
    let mut last_count = backend.page_count();
    for i in 0..400usize {
        let height = ((i * 37) % 90) as f32 + 5.0;
        let placement = cursor
            .push(&mut backend, &policy, &Block::spacer(height))
            .unwrap();
        if placement.y < geometry.margins.top || placement.y > limit {
            violations.push(format!("block {i}: top {:.1}", placement.y));
        }
        if placement.y + height > limit {
            violations.push(format!("block {i}: bottom {:.1}", placement.y + height));
        }
        assert!(placement.page_index >= last_page, "page index went backwards");
        assert!(backend.page_count() >= last_count, "page count shrank");
        last_page = placement.page_index;
        last_count = backend.page_count();
    }
    assert!(violations.is_empty(), "{}", violations.join("\n"));
    assert!(backend.page_count() > 10);
}

#[test]
fn oversize_block_overflows_on_a_fresh_page() {
    let mut backend = RecordingBackend::new();
    let policy = PageBreakPolicy::default();
    let mut cursor = LayoutCursor::begin(&mut backend, small_page(), "Body").unwrap();

    let tall = cursor
        .push(&mut backend, &policy, &Block::spacer(1000.0))
        .unwrap();
    assert_eq!((tall.page_index, tall.y), (0, 20.0));
    assert_eq!(backend.page_count(), 1);

    let next = cursor
        .push(&mut backend, &policy, &Block::spacer(10.0))
        .unwrap();
    assert_eq!((next.page_index, next.y), (1, 20.0));
}

#[test]
fn oversize_block_after_content_breaks_first() {
    let mut backend = RecordingBackend::new();
    let policy = PageBreakPolicy::default();
    let mut cursor = LayoutCursor::begin(&mut backend, small_page(), "Body").unwrap();

    cursor
        .push(&mut backend, &policy, &Block::spacer(50.0))
        .unwrap();
    let tall = cursor
        .push(&mut backend, &policy, &Block::spacer(1000.0))
        .unwrap();
    assert_eq!((tall.page_index, tall.y), (1, 20.0));
    assert_eq!(backend.page_count(), 2);
}

#[test]
fn heading_is_not_stranded_at_the_bottom() {
    let mut backend = RecordingBackend::new();
    let policy = PageBreakPolicy::default();
    let mut cursor = LayoutCursor::begin(&mut backend, small_page(), "Intro").unwrap();

    // Content limit is 280 - 20 - 15 = 245; this leaves 25 points.
    cursor
        .push(&mut backend, &policy, &Block::spacer(200.0))
        .unwrap();
    let heading = Block::spacer(20.0);
    let placement = cursor
        .push_labeled(&mut backend, &policy, &heading, 12.0, Some("Details"))
        .unwrap();

    assert_eq!(placement.page_index, 1);
    assert_eq!(cursor.page_sections(), ["Intro", "Details"]);
}

#[test]
fn forced_breaks_keep_the_last_label() {
    let mut backend = RecordingBackend::new();
    let policy = PageBreakPolicy::default();
    let mut cursor = LayoutCursor::begin(&mut backend, small_page(), "Setup").unwrap();

    cursor
        .push(&mut backend, &policy, &Block::spacer(10.0))
        .unwrap();
    assert!(!cursor.is_at_page_top());
    let added = policy
        .ensure_space(&mut cursor, &mut backend, 400.0, None)
        .unwrap();
    assert!(added);
    let index = policy
        .break_page(&mut cursor, &mut backend, Some("Usage"))
        .unwrap();
    policy.break_page(&mut cursor, &mut backend, None).unwrap();

    assert_eq!(index, 2);
    assert_eq!(cursor.page_index(), 3);
    assert_eq!(cursor.y(), 20.0);
    assert_eq!(cursor.page_sections(), ["Setup", "Setup", "Usage", "Usage"]);
}

#[test]
fn measured_footer_reserve_tracks_the_font() {
    let backend = RecordingBackend::new();
    let policy = PageBreakPolicy::measured(&backend, 8.0);
    assert!(common::approx(policy.reserve_footer_space(), 8.0 * 1.2 + 4.0));
    assert_eq!(PageBreakPolicy::default().reserve_footer_space(), 15.0);
}

#[test]
fn wrapped_paragraph_lines_fit_the_width() {
    let backend = RecordingBackend::new();
    let text = format!(
        "{} Supercalifragilisticexpialidocious{}",
        common::lorem(80),
        "x".repeat(60)
    );
    let lines = block::wrap_text(&backend, &text, 10.0, FontWeight::Regular, 200.0).unwrap();

    assert!(lines.len() > 5);
    for line in &lines {
        let width = backend.measure_text(line, 10.0, FontWeight::Regular).unwrap();
        assert!(width <= 200.0, "{line:?} is {width:.1}pt wide");
    }
    let rejoined: String = lines.concat().split_whitespace().collect();
    let original: String = text.split_whitespace().collect();
    assert_eq!(rejoined, original);
}

#[test]
fn paragraphs_break_between_lines() {
    let mut settings = common::bare_settings();
    settings.layout.page_size = capdoc_pdf::settings::PageSize::Custom {
        width: 300.0,
        height: 280.0,
    };
    settings.layout.margins = Margins::uniform(20.0);
    let content = Content {
        sections: vec![
            Section::new("Long").with_block(ContentBlock::Paragraph(common::lorem(600))),
        ],
        ..Content::default()
    };

    let (backend, report) = common::assemble(&settings, &content);
    assert!(report.page_count > 3);
    assert_eq!(report.page_sections.len(), report.page_count);
    assert!(report.page_sections.iter().all(|label| label == "Long"));

    let limit = 280.0 - 20.0 - 15.0;
    let theme = Theme::from_settings(&settings);
    let line_h = backend.line_height(theme.body_size);
    for page in 0..backend.page_count() {
        for text in backend.texts(page) {
            assert!(text.y >= 20.0, "page {page}: {:?} above the margin", text.text);
            assert!(
                text.y - backend.ascent(text.size) + line_h <= limit + 0.01,
                "page {page}: {:?} runs into the footer reserve",
                text.text
            );
        }
    }
}

#[test]
fn new_page_toggles_start_sections_on_fresh_pages() {
    let mut settings = common::bare_settings();
    settings.sections.section_new_page = true;
    settings.sections.module_new_page = true;
    settings.sections.include_glossary = false;
    let content = common::sample_content();

    let (_, report) = common::assemble(&settings, &content);
    let level_one: Vec<usize> = report
        .toc_entries
        .iter()
        .filter(|e| e.level == 1)
        .map(|e| e.page_index)
        .collect();
    assert_eq!(level_one.len(), content.sections.len() + content.modules.len());
    assert!(
        level_one.windows(2).all(|w| w[1] > w[0]),
        "level-1 headings share a page: {level_one:?}"
    );
    assert_eq!(level_one[0], 0, "first section reuses the empty first page");
}

#[test]
fn long_callouts_and_table_cells_break_between_lines() {
    let settings = common::bare_settings();
    let content = Content {
        sections: vec![
            Section::new("Notes")
                .with_block(ContentBlock::Callout {
                    label: "Heads up".to_string(),
                    body: common::lorem(1500),
                })
                .with_block(ContentBlock::KeyValues(vec![
                    ("Limits".to_string(), common::lorem(1500)),
                    ("Regions".to_string(), "3".to_string()),
                ])),
        ],
        ..Content::default()
    };

    let (backend, report) = common::assemble(&settings, &content);
    assert!(report.page_count > 4, "{} pages", report.page_count);

    let geometry = common::geometry(&settings);
    let limit = PageBreakPolicy::default().content_limit(&geometry);
    let line_h = backend.line_height(Theme::from_settings(&settings).body_size);
    for page in 0..backend.page_count() {
        for op in backend.ops(page) {
            match op {
                DrawOp::Text(t) => assert!(
                    t.y - backend.ascent(t.size) + line_h <= limit + 0.01,
                    "page {page}: {:?} at {:.1} is past {limit:.1}",
                    t.text,
                    t.y
                ),
                DrawOp::Rect(r) => assert!(
                    r.y + r.height <= limit + 0.01,
                    "page {page}: panel reaches {:.1}",
                    r.y + r.height
                ),
                _ => {}
            }
        }
    }
    let listed: Vec<String> = (0..backend.page_count())
        .flat_map(|p| common::texts_on(&backend, p))
        .collect();
    assert!(listed.contains(&"Heads up".to_string()));
    assert!(listed.contains(&"Regions".to_string()));
}
