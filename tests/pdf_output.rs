mod common;

use std::cell::Cell;
use std::path::Path;

use capdoc_pdf::backend::{
    DocumentInfo, FontWeight, ImageSpec, LineSpec, RectSpec, RenderBackend, TextSpec,
};
use capdoc_pdf::{Error, PdfBackend, RecordingBackend, Result, assemble_document};

fn page_count_entry(pdf: &[u8]) -> Option<usize> {
    let text = String::from_utf8_lossy(pdf);
    let start = text.find("/Count ")? + "/Count ".len();
    let digits: String = text[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[test]
fn generated_pdf_has_header_and_page_count() {
    let _ = env_logger::try_init();
    let settings = common::sample_settings();
    let content = common::sample_content();

    let (width, height) = settings.layout.page_dimensions();
    let (bytes, report) = capdoc_pdf::generate_with_backend(
        PdfBackend::new(width, height),
        &settings,
        &content,
        None,
    )
    .unwrap();

    assert!(bytes.starts_with(b"%PDF-"));
    assert!(report.page_count > 3);
    assert_eq!(page_count_entry(&bytes), Some(report.page_count));
    assert!(contains(&bytes, b"/Helvetica-Bold"));
    assert!(contains(&bytes, b"FlateDecode"));
}

#[test]
fn pdf_and_recording_backends_paginate_alike() {
    let settings = common::sample_settings();
    let content = common::sample_content();

    let (_, recorded) = common::assemble(&settings, &content);
    let (width, height) = settings.layout.page_dimensions();
    let mut pdf = PdfBackend::new(width, height);
    let report = assemble_document(&mut pdf, &settings, &content, None).unwrap();

    assert_eq!(report.page_count, recorded.page_count);
    assert_eq!(report.toc_entries, recorded.toc_entries);
}

#[test]
fn watermark_adds_an_opacity_state() {
    let mut settings = common::sample_settings();
    settings.branding.watermark = capdoc_pdf::settings::WatermarkKind::Classification;
    let bytes = capdoc_pdf::generate(&settings, &common::sample_content()).unwrap();
    assert!(contains(&bytes, b"/ExtGState"));
    assert!(contains(&bytes, b"/GS1"));
}

#[test]
fn file_api_writes_pdf_with_logo() {
    let dir = tempfile::tempdir().unwrap();
    let logo = dir.path().join("logo.png");
    image::RgbaImage::from_pixel(32, 16, image::Rgba([30, 58, 138, 200]))
        .save(&logo)
        .unwrap();

    let mut settings = common::sample_settings();
    settings.branding.logo = Some(logo);
    let settings_path = dir.path().join("settings.json");
    std::fs::write(&settings_path, serde_json::to_string(&settings).unwrap()).unwrap();
    let content_path = dir.path().join("content.json");
    std::fs::write(
        &content_path,
        serde_json::to_string(&common::sample_content()).unwrap(),
    )
    .unwrap();
    let output = dir.path().join("out.pdf");

    capdoc_pdf::generate_pdf_file(&content_path, Some(&settings_path), &output).unwrap();

    let bytes = std::fs::read(&output).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
    assert!(contains(&bytes, b"/Image"));
    assert!(contains(&bytes, b"/SMask"));
}

#[test]
fn missing_logo_and_fonts_fall_back() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = common::sample_settings();
    settings.branding.logo = Some(dir.path().join("nope.png"));
    settings.typography.font_regular = Some(dir.path().join("nope.ttf"));
    let settings_path = dir.path().join("settings.json");
    std::fs::write(&settings_path, serde_json::to_string(&settings).unwrap()).unwrap();
    let content_path = dir.path().join("content.json");
    std::fs::write(&content_path, r#"{ "sections": [ { "title": "Only" } ] }"#).unwrap();
    let output = dir.path().join("out.pdf");

    capdoc_pdf::generate_pdf_file(&content_path, Some(&settings_path), &output).unwrap();
    let bytes = std::fs::read(&output).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
    assert!(!contains(&bytes, b"/Image"));
}

#[test]
fn missing_content_file_is_an_io_error() {
    let err = capdoc_pdf::generate_pdf_file(
        Path::new("does/not/exist.json"),
        None,
        Path::new("unused.pdf"),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Io(_)), "{err}");
    assert!(!Path::new("unused.pdf").exists());
}

#[test]
fn malformed_content_is_reported_as_content() {
    let dir = tempfile::tempdir().unwrap();
    let content_path = dir.path().join("content.json");
    std::fs::write(&content_path, r#"{ "sections": [ { "title": 7 } ] }"#).unwrap();

    let err = capdoc_pdf::generate_pdf_file(&content_path, None, &dir.path().join("out.pdf"))
        .unwrap_err();
    assert!(matches!(err, Error::Content(_)), "{err}");
    assert!(err.to_string().starts_with("invalid content file"));
}

#[test]
fn progress_milestones_are_ordered() {
    let settings = common::sample_settings();
    let content = common::sample_content();
    let mut seen: Vec<(u8, String)> = Vec::new();
    let mut record = |percent: u8, message: &str| seen.push((percent, message.to_string()));

    let mut backend = RecordingBackend::new();
    assemble_document(&mut backend, &settings, &content, Some(&mut record)).unwrap();

    let percents: Vec<u8> = seen.iter().map(|(p, _)| *p).collect();
    assert_eq!(percents.first(), Some(&0));
    assert_eq!(percents.last(), Some(&100));
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{percents:?}");
    for milestone in [10, 20, 80, 85, 95] {
        assert!(percents.contains(&milestone), "missing {milestone}%");
    }
    assert!(seen.iter().any(|(_, m)| m == "Module 2"));
}

/// Recording backend whose text measurement stops working after a while.
struct FlakyBackend {
    inner: RecordingBackend,
    measures_left: Cell<usize>,
}

impl RenderBackend for FlakyBackend {
    fn page_count(&self) -> usize {
        self.inner.page_count()
    }

    fn current_page(&self) -> Option<usize> {
        self.inner.current_page()
    }

    fn add_page(&mut self) -> Result<usize> {
        self.inner.add_page()
    }

    fn select_page(&mut self, index: usize) -> Result<()> {
        self.inner.select_page(index)
    }

    fn draw_text(&mut self, spec: &TextSpec) -> Result<()> {
        self.inner.draw_text(spec)
    }

    fn draw_rect(&mut self, spec: &RectSpec) -> Result<()> {
        self.inner.draw_rect(spec)
    }

    fn draw_line(&mut self, spec: &LineSpec) -> Result<()> {
        self.inner.draw_line(spec)
    }

    fn draw_image(&mut self, spec: &ImageSpec) -> Result<()> {
        self.inner.draw_image(spec)
    }

    fn measure_text(&self, text: &str, size: f32, weight: FontWeight) -> Result<f32> {
        match self.measures_left.get() {
            0 => Err(Error::Measure(format!("no metrics for {text:?}"))),
            n => {
                self.measures_left.set(n - 1);
                self.inner.measure_text(text, size, weight)
            }
        }
    }

    fn finish(self, info: &DocumentInfo) -> Result<Vec<u8>> {
        self.inner.finish(info)
    }
}

#[test]
fn backend_failure_aborts_generation() {
    let settings = common::sample_settings();
    let content = common::sample_content();
    let backend = FlakyBackend {
        inner: RecordingBackend::new(),
        measures_left: Cell::new(200),
    };

    let err = capdoc_pdf::generate_with_backend(backend, &settings, &content, None).unwrap_err();
    assert!(matches!(err, Error::Measure(_)), "{err}");
}

#[test]
fn selecting_a_missing_page_is_an_error() {
    let mut backend = PdfBackend::new(595.0, 842.0);
    assert!(matches!(
        backend.draw_text(&TextSpec::new("x", 0.0, 0.0, 10.0)),
        Err(Error::NoActivePage)
    ));
    backend.add_page().unwrap();
    assert!(matches!(
        backend.select_page(3),
        Err(Error::PageOutOfRange { index: 3, count: 1 })
    ));
}
