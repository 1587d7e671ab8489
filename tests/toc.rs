mod common;

use capdoc_pdf::RecordingBackend;
use capdoc_pdf::backend::{FontWeight, RenderBackend, TextAlign};
use capdoc_pdf::engine::block;
use capdoc_pdf::engine::{
    DeferredResolutionPass, LayoutCursor, PageBreakPolicy, SectionRegistry, TOC_TITLE, Theme,
    TocReservation, plan_outline,
};
use capdoc_pdf::model::{Content, Section};

/// Draw a heading through the cursor and log it, the way the assembler does.
fn record_heading(
    backend: &mut RecordingBackend,
    cursor: &mut LayoutCursor,
    policy: &PageBreakPolicy,
    registry: &mut SectionRegistry,
    theme: &Theme,
    title: &str,
    level: u8,
) {
    let width = cursor.geometry().content_width();
    let heading = block::heading(&*backend, title, level, theme, width).unwrap();
    cursor
        .push_labeled(&mut *backend, policy, &heading, 24.0, Some(title))
        .unwrap();
    registry.record_section(title, level, &*cursor);
}

#[test]
fn contents_page_lists_late_sections_with_their_pages() {
    let settings = common::sample_settings();
    let geometry = common::geometry(&settings);
    let theme = Theme::from_settings(&settings);
    let policy = PageBreakPolicy::default();
    let mut backend = RecordingBackend::new();
    let mut cursor = LayoutCursor::begin(&mut backend, geometry, "").unwrap();
    let mut registry = SectionRegistry::new();

    let reservation =
        TocReservation::reserve(&mut cursor, &mut backend, &policy, &theme, 2, 2).unwrap();
    assert_eq!(reservation.pages(), [0]);

    while cursor.page_index() < 2 {
        policy.break_page(&mut cursor, &mut backend, None).unwrap();
    }
    record_heading(&mut backend, &mut cursor, &policy, &mut registry, &theme, "Alpha", 1);
    while cursor.page_index() < 4 {
        policy.break_page(&mut cursor, &mut backend, None).unwrap();
    }
    record_heading(&mut backend, &mut cursor, &policy, &mut registry, &theme, "Beta", 1);
    let pages_before = backend.page_count();

    let drawn = DeferredResolutionPass::new(geometry, &theme)
        .render(&mut backend, &reservation, &registry)
        .unwrap();

    assert_eq!(drawn, 2);
    assert_eq!(backend.page_count(), pages_before);
    let toc = backend.texts(0);
    assert!(toc.iter().any(|t| t.text == TOC_TITLE));
    let right_edge = geometry.margins.left + geometry.content_width();
    for (title, number) in [("Alpha", "3"), ("Beta", "5")] {
        let row = toc
            .iter()
            .find(|t| t.text == title)
            .unwrap_or_else(|| panic!("{title} missing from contents"));
        let label = toc
            .iter()
            .find(|t| t.text == number && t.y == row.y)
            .unwrap_or_else(|| panic!("page label {number} missing for {title}"));
        assert_eq!(label.align, TextAlign::Right);
        assert!(common::approx(label.x, right_edge));
    }
}

#[test]
fn contents_agree_with_where_headings_landed() {
    let settings = common::sample_settings();
    let content = common::sample_content();
    let theme = Theme::from_settings(&settings);
    let (backend, report) = common::assemble(&settings, &content);

    assert_eq!(report.toc_pages, vec![1]);
    assert!(!report.toc_entries.is_empty());
    let mut stale = Vec::new();
    for entry in &report.toc_entries {
        if common::heading_on(&backend, entry.page_index, &entry.title, entry.level, &theme)
            .is_none()
        {
            stale.push(format!("{} (page {})", entry.title, entry.page_number()));
        }
    }
    assert!(stale.is_empty(), "headings not where recorded: {stale:?}");

    let listed = common::texts_on(&backend, 1);
    for entry in report.toc_entries.iter().filter(|e| e.level <= 2) {
        assert!(listed.contains(&entry.title), "{} not listed", entry.title);
        assert!(listed.contains(&entry.page_number().to_string()));
    }
    assert!(
        !listed.contains(&"Out of scope".to_string()),
        "level 3 is deeper than toc_max_level"
    );
    assert!(report.toc_entries.iter().any(|e| e.title == "Out of scope"));
}

#[test]
fn recorded_outline_matches_plan() {
    let settings = common::sample_settings();
    let content = common::sample_content();
    let (_, report) = common::assemble(&settings, &content);

    let recorded: Vec<(String, u8)> = report
        .toc_entries
        .iter()
        .map(|e| (e.title.clone(), e.level))
        .collect();
    assert_eq!(recorded, plan_outline(&settings, &content));
    assert_eq!(recorded[0], ("Document Control".to_string(), 1));
    assert_eq!(recorded.last().unwrap(), &("Glossary".to_string(), 1));
}

#[test]
fn many_sections_reserve_enough_contents_pages() {
    let mut settings = common::sample_settings();
    settings.sections.include_revision_history = false;
    settings.sections.include_glossary = false;
    let content = Content {
        sections: (1..=120).map(|i| Section::new(format!("Topic {i}"))).collect(),
        ..Content::default()
    };

    let (backend, report) = common::assemble(&settings, &content);
    assert!(report.toc_pages.len() >= 2, "{:?}", report.toc_pages);
    assert!(report.toc_pages.windows(2).all(|w| w[1] == w[0] + 1));
    assert_eq!(report.toc_pages[0], 1);

    let first_body_page = report.toc_entries[0].page_index;
    assert_eq!(first_body_page, report.toc_pages.last().unwrap() + 1);

    let listed: Vec<String> = report
        .toc_pages
        .iter()
        .flat_map(|&p| common::texts_on(&backend, p))
        .collect();
    for entry in &report.toc_entries {
        assert!(listed.contains(&entry.title), "{} not listed", entry.title);
    }
    for &page in &report.toc_pages {
        assert_eq!(report.page_sections[page], TOC_TITLE);
    }
}

#[test]
fn overflowing_registry_is_truncated_not_paginated() {
    let settings = common::sample_settings();
    let geometry = common::geometry(&settings);
    let theme = Theme::from_settings(&settings);
    let policy = PageBreakPolicy::default();
    let mut backend = RecordingBackend::new();
    let mut cursor = LayoutCursor::begin(&mut backend, geometry, "").unwrap();
    let mut registry = SectionRegistry::new();

    let reservation =
        TocReservation::reserve(&mut cursor, &mut backend, &policy, &theme, 1, 2).unwrap();
    for i in 0..200 {
        registry.record_section(&format!("Entry {i}"), 1, &cursor);
    }
    let pages_before = backend.page_count();

    let drawn = DeferredResolutionPass::new(geometry, &theme)
        .render(&mut backend, &reservation, &registry)
        .unwrap();

    assert_eq!(drawn, reservation.capacity());
    assert!(drawn < 200);
    assert_eq!(backend.page_count(), pages_before);
    let listed = common::texts_on(&backend, 0);
    assert!(listed.contains(&"Entry 0".to_string()));
    assert!(!listed.contains(&"Entry 199".to_string()));
}

#[test]
fn long_titles_are_shortened_with_an_ellipsis() {
    let settings = common::sample_settings();
    let geometry = common::geometry(&settings);
    let theme = Theme::from_settings(&settings);
    let policy = PageBreakPolicy::default();
    let mut backend = RecordingBackend::new();
    let mut cursor = LayoutCursor::begin(&mut backend, geometry, "").unwrap();
    let mut registry = SectionRegistry::new();

    let reservation =
        TocReservation::reserve(&mut cursor, &mut backend, &policy, &theme, 1, 2).unwrap();
    policy.break_page(&mut cursor, &mut backend, None).unwrap();
    let long_title = common::lorem(60);
    registry.record_section(&long_title, 2, &cursor);

    DeferredResolutionPass::new(geometry, &theme)
        .render(&mut backend, &reservation, &registry)
        .unwrap();

    let row = backend
        .texts(0)
        .into_iter()
        .find(|t| t.text.ends_with("..."))
        .expect("shortened title");
    let width = backend
        .measure_text(&row.text, row.size, FontWeight::Regular)
        .unwrap();
    assert!(width < geometry.content_width());
    assert!(long_title.starts_with(row.text.trim_end_matches("...")));
}

#[test]
fn registry_keeps_duplicates_in_order() {
    let mut settings = common::bare_settings();
    settings.sections.include_toc = true;
    let content = Content {
        sections: vec![
            Section::new("Limits"),
            Section::new("Usage").with_subsection(Section::new("Limits")),
        ],
        ..Content::default()
    };

    let (_, report) = common::assemble(&settings, &content);
    let titles: Vec<(&str, u8)> = report
        .toc_entries
        .iter()
        .map(|e| (e.title.as_str(), e.level))
        .collect();
    assert_eq!(titles, [("Limits", 1), ("Usage", 1), ("Limits", 2)]);
}
