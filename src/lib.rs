pub mod backend;
pub mod engine;
mod error;
mod fonts;
pub mod model;
mod pdf;
pub mod settings;

pub use backend::{DocumentInfo, RecordingBackend, RenderBackend};
pub use engine::{AssemblyReport, ProgressFn, assemble_document};
pub use error::{Error, Result};
pub use model::Content;
pub use pdf::PdfBackend;
pub use settings::Settings;

use std::path::Path;
use std::time::Instant;

/// Render `content` to PDF bytes.
pub fn generate(settings: &Settings, content: &Content) -> Result<Vec<u8>> {
    generate_with_progress(settings, content, None)
}

/// Like [`generate`], calling `on_progress(percent, message)` at coarse
/// milestones.
pub fn generate_with_progress(
    settings: &Settings,
    content: &Content,
    on_progress: Option<ProgressFn<'_>>,
) -> Result<Vec<u8>> {
    let (width, height) = settings.layout.page_dimensions();
    let backend = PdfBackend::new(width, height).with_fonts(
        settings.typography.font_regular.as_deref(),
        settings.typography.font_bold.as_deref(),
    );
    let (bytes, _report) = generate_with_backend(backend, settings, content, on_progress)?;
    Ok(bytes)
}

/// Assemble on any backend and serialize it. Nothing is returned unless every
/// step succeeded.
pub fn generate_with_backend<B: RenderBackend>(
    mut backend: B,
    settings: &Settings,
    content: &Content,
    on_progress: Option<ProgressFn<'_>>,
) -> Result<(Vec<u8>, AssemblyReport)> {
    let report = assemble_document(&mut backend, settings, content, on_progress)?;
    let bytes = backend.finish(&document_info(settings))?;
    Ok((bytes, report))
}

pub fn document_info(settings: &Settings) -> DocumentInfo {
    let meta = &settings.metadata;
    DocumentInfo {
        title: meta.title.clone(),
        subject: meta.subtitle.clone(),
        author: meta.owner.clone(),
        creator: concat!("capdoc-pdf ", env!("CARGO_PKG_VERSION")).to_string(),
    }
}

/// Read content (and optionally settings) JSON, render, write the PDF.
pub fn generate_pdf_file(
    content_path: &Path,
    settings_path: Option<&Path>,
    output: &Path,
) -> Result<()> {
    generate_pdf_file_with_progress(content_path, settings_path, output, None)
}

pub fn generate_pdf_file_with_progress(
    content_path: &Path,
    settings_path: Option<&Path>,
    output: &Path,
    on_progress: Option<ProgressFn<'_>>,
) -> Result<()> {
    let t0 = Instant::now();

    let settings = match settings_path {
        Some(path) => Settings::from_path(path)?,
        None => Settings::default(),
    };
    let mut content = Content::from_json_str(&std::fs::read_to_string(content_path)?)?;
    if let Some(logo) = &settings.branding.logo {
        match std::fs::read(logo) {
            Ok(bytes) => content.cover.logo = Some(bytes),
            Err(e) => log::warn!("Logo not readable: {} ({e})", logo.display()),
        }
    }
    let t_load = t0.elapsed();

    let bytes = generate_with_progress(&settings, &content, on_progress)?;
    let t_render = t0.elapsed();

    std::fs::write(output, &bytes)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: load={:.1}ms, render={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_load.as_secs_f64() * 1000.0,
        (t_render - t_load).as_secs_f64() * 1000.0,
        (t_total - t_render).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        bytes.len(),
    );

    Ok(())
}
