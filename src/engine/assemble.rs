use std::io::Cursor;
use std::time::Instant;

use serde::Serialize;

use crate::backend::{DrawOp, FontWeight, ImageSpec, RectSpec, RenderBackend};
use crate::error::Result;
use crate::model::{Content, ContentBlock, GlossaryTerm, Module, Section};
use crate::settings::Settings;

use super::block::{self, Block, Theme};
use super::cursor::{LayoutCursor, PageGeometry};
use super::decorate::{self, DecorationPass, DecorationSpec};
use super::page_break::PageBreakPolicy;
use super::toc::{DeferredResolutionPass, SectionRegistry, TocEntry, TocReservation};

pub const DOCUMENT_CONTROL_TITLE: &str = "Document Control";
pub const GLOSSARY_TITLE: &str = "Glossary";

const COVER_BAND_RATIO: f32 = 0.38;
const LOGO_HEIGHT: f32 = 48.0;

/// Progress callback: percent complete and a short message.
pub type ProgressFn<'a> = &'a mut dyn FnMut(u8, &str);

/// What the assembly produced, for callers that want more than the bytes.
#[derive(Clone, Debug, Default, Serialize)]
pub struct AssemblyReport {
    pub page_count: usize,
    pub toc_entries: Vec<TocEntry>,
    pub toc_pages: Vec<usize>,
    /// Section label of each page, by page index.
    pub page_sections: Vec<String>,
    pub has_cover: bool,
}

struct Progress<'a> {
    callback: Option<ProgressFn<'a>>,
    units: usize,
    done: usize,
}

impl Progress<'_> {
    fn report(&mut self, percent: u8, message: &str) {
        log::debug!("progress {percent}%: {message}");
        if let Some(callback) = self.callback.as_deref_mut() {
            callback(percent.min(100), message);
        }
    }

    /// One body unit finished; the body spans 20% to 80%.
    fn step(&mut self, message: &str) {
        self.done += 1;
        let percent = 20 + (60 * self.done / self.units.max(1)).min(60) as u8;
        self.report(percent, message);
    }
}

/// Every heading the assembly will record, in order, as (title, level).
/// The count drives how many contents pages get reserved.
pub fn plan_outline(settings: &Settings, content: &Content) -> Vec<(String, u8)> {
    let toggles = &settings.sections;
    let mut outline = Vec::new();
    if toggles.include_revision_history && !settings.metadata.revision_history.is_empty() {
        outline.push((DOCUMENT_CONTROL_TITLE.to_string(), 1));
    }
    for section in &content.sections {
        outline_section(section, section.level.max(1), &mut outline);
    }
    for module in &content.modules {
        outline.push((module.name.clone(), 1));
        if toggles.include_module_details {
            for detail in &module.details {
                outline_section(detail, 2, &mut outline);
            }
        }
    }
    if toggles.include_glossary && !content.glossary.is_empty() {
        outline.push((GLOSSARY_TITLE.to_string(), 1));
    }
    outline
}

fn outline_section(section: &Section, level: u8, out: &mut Vec<(String, u8)>) {
    out.push((section.title.clone(), level));
    for sub in &section.subsections {
        outline_section(sub, level.saturating_add(1), out);
    }
}

/// Lay out `content` on `backend`, fill in the contents pages and decorate
/// every page. The backend is left ready for `finish`.
pub fn assemble_document<B: RenderBackend + ?Sized>(
    backend: &mut B,
    settings: &Settings,
    content: &Content,
    on_progress: Option<ProgressFn<'_>>,
) -> Result<AssemblyReport> {
    let t0 = Instant::now();
    let mut progress = Progress {
        callback: on_progress,
        units: 0,
        done: 0,
    };
    progress.report(0, "Starting");

    let geometry = PageGeometry::from_layout(&settings.layout);
    let theme = Theme::from_settings(settings);
    let policy = if settings.layout.measure_footer {
        PageBreakPolicy::measured(&*backend, decorate::FOOTER_SIZE)
    } else {
        PageBreakPolicy::new(settings.layout.footer_reserve())
    };
    log::debug!(
        "page {:.1}x{:.1}pt, content width {:.1}pt, footer reserve {:.1}pt",
        geometry.width,
        geometry.height,
        geometry.content_width(),
        policy.reserve_footer_space()
    );

    let cursor = LayoutCursor::begin(&mut *backend, geometry, "")?;
    let mut asm = Assembler {
        backend,
        settings,
        content,
        width: geometry.content_width(),
        theme,
        policy,
        cursor,
        registry: SectionRegistry::new(),
    };

    let has_cover = settings.sections.include_cover;
    if has_cover {
        asm.cover()?;
    }
    progress.report(10, "Cover");

    let reservation = if settings.sections.include_toc {
        let max_level = settings.sections.toc_max_level.max(1);
        let expected = plan_outline(settings, content)
            .iter()
            .filter(|(_, level)| *level <= max_level)
            .count();
        Some(TocReservation::reserve(
            &mut asm.cursor,
            &mut *asm.backend,
            &asm.policy,
            &asm.theme,
            expected,
            max_level,
        )?)
    } else {
        None
    };
    progress.report(20, "Contents reserved");

    asm.body(&mut progress)?;
    let t_body = t0.elapsed();

    let Assembler {
        backend,
        theme,
        cursor,
        registry,
        ..
    } = asm;
    // The cursor is finished with; only its per-page labels survive.
    let page_sections = cursor.into_page_sections();

    if let Some(reservation) = &reservation {
        let drawn = DeferredResolutionPass::new(geometry, &theme).render(
            &mut *backend,
            reservation,
            &registry,
        )?;
        log::debug!("table of contents: {drawn} of {} entries", registry.len());
    }
    progress.report(85, "Table of contents");
    let t_toc = t0.elapsed();

    DecorationPass::new(DecorationSpec::from_settings(settings), geometry)
        .apply_all(&mut *backend, &page_sections)?;
    progress.report(95, "Decorations");
    let t_total = t0.elapsed();

    log::info!(
        "Timing: assembly={:.1}ms, toc={:.1}ms, decorations={:.1}ms, total={:.1}ms ({} pages)",
        t_body.as_secs_f64() * 1000.0,
        (t_toc - t_body).as_secs_f64() * 1000.0,
        (t_total - t_toc).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        backend.page_count(),
    );

    let report = AssemblyReport {
        page_count: backend.page_count(),
        toc_entries: registry.into_entries(),
        toc_pages: reservation.map(|r| r.pages().to_vec()).unwrap_or_default(),
        page_sections,
        has_cover,
    };
    progress.report(100, "Done");
    Ok(report)
}

struct Assembler<'a, B: RenderBackend + ?Sized> {
    backend: &'a mut B,
    settings: &'a Settings,
    content: &'a Content,
    width: f32,
    theme: Theme,
    policy: PageBreakPolicy,
    cursor: LayoutCursor,
    registry: SectionRegistry,
}

impl<B: RenderBackend + ?Sized> Assembler<'_, B> {
    fn push(&mut self, block: &Block) -> Result<()> {
        self.cursor.push(&mut *self.backend, &self.policy, block)?;
        Ok(())
    }

    fn push_all(&mut self, blocks: Vec<Block>) -> Result<()> {
        for block in &blocks {
            self.push(block)?;
        }
        Ok(())
    }

    /// Push a heading, keep room for the first lines after it and log it for
    /// the contents. Level-1 headings name the pages they start on.
    fn heading(&mut self, title: &str, level: u8) -> Result<()> {
        let block = block::heading(&*self.backend, title, level, &self.theme, self.width)?;
        let lookahead = 2.0 * self.backend.line_height(self.theme.body_size);
        let label = (level == 1).then_some(title);
        self.cursor
            .push_labeled(&mut *self.backend, &self.policy, &block, lookahead, label)?;
        self.registry.record_section(title, level, &self.cursor);
        Ok(())
    }

    fn break_unless_at_top(&mut self) -> Result<()> {
        if !self.cursor.is_at_page_top() {
            self.policy
                .break_page(&mut self.cursor, &mut *self.backend, None)?;
        }
        Ok(())
    }

    fn cover(&mut self) -> Result<()> {
        let (settings, content) = (self.settings, self.content);
        let meta = &settings.metadata;
        let geometry = *self.cursor.geometry();
        let band_h = geometry.height * COVER_BAND_RATIO;
        self.backend.draw_rect(&RectSpec::filled(
            0.0,
            0.0,
            geometry.width,
            band_h,
            self.theme.primary,
        ))?;
        if let Some(bytes) = &content.cover.logo {
            self.cover_logo(bytes, &geometry)?;
        }

        let title_size = self.theme.heading_size(1) * 1.6;
        let title_lines = block::wrap_text(
            &*self.backend,
            &meta.title,
            title_size,
            FontWeight::Bold,
            self.width,
        )?;
        let subtitle_size = self.theme.heading_size(2);
        let subtitle_lines = if meta.subtitle.trim().is_empty() {
            Vec::new()
        } else {
            block::wrap_text(
                &*self.backend,
                &meta.subtitle,
                subtitle_size,
                FontWeight::Regular,
                self.width,
            )?
        };
        let text_h = title_lines.len() as f32 * self.backend.line_height(title_size)
            + subtitle_lines.len() as f32 * self.backend.line_height(subtitle_size);
        // Title block sits at the bottom of the band.
        let start = (band_h - 24.0 - text_h).max(geometry.content_top() + LOGO_HEIGHT);
        let mut dropped = 0;
        self.push_on_cover(&Block::spacer(start - self.cursor.y()), &mut dropped)?;
        for line in &title_lines {
            let block =
                block::text_line(&*self.backend, line, title_size, FontWeight::Bold, block::WHITE);
            self.push_on_cover(&block, &mut dropped)?;
        }
        for line in &subtitle_lines {
            let block = block::text_line(
                &*self.backend,
                line,
                subtitle_size,
                FontWeight::Regular,
                block::WHITE,
            );
            self.push_on_cover(&block, &mut dropped)?;
        }
        self.push_on_cover(&Block::spacer(band_h + 24.0 - self.cursor.y()), &mut dropped)?;

        for line in &content.cover.lines {
            let blocks = block::wrap_text(
                &*self.backend,
                line,
                self.theme.body_size * 1.2,
                FontWeight::Regular,
                self.width,
            )?
            .into_iter()
            .map(|l| {
                block::text_line(
                    &*self.backend,
                    &l,
                    self.theme.body_size * 1.2,
                    FontWeight::Regular,
                    self.theme.muted,
                )
            })
            .collect::<Vec<_>>();
            for block in &blocks {
                self.push_on_cover(block, &mut dropped)?;
            }
        }
        self.push_on_cover(&Block::spacer(12.0), &mut dropped)?;

        let badge = block::badge_row(
            &*self.backend,
            &[meta.classification.label().to_uppercase()],
            &self.theme,
            self.width,
        )?;
        self.push_on_cover(&badge, &mut dropped)?;

        let date = meta.print_date().format("%Y-%m-%d").to_string();
        let rows: Vec<Vec<String>> = [
            ("Version", meta.version.as_str()),
            ("Owner", meta.owner.as_str()),
            ("Document ID", meta.document_id.as_str()),
            ("Date", date.as_str()),
        ]
        .into_iter()
        .filter(|(_, v)| !v.trim().is_empty())
        .map(|(k, v)| vec![k.to_string(), v.to_string()])
        .collect();
        let table = block::table(
            &*self.backend,
            None,
            &rows,
            &[0.3, 0.7],
            &self.theme,
            self.width * 0.6,
        )?;
        for block in &table {
            self.push_on_cover(block, &mut dropped)?;
        }
        if dropped > 0 {
            log::warn!("Cover content does not fit on one page, {dropped} blocks dropped");
        }

        self.cursor.fill_page();
        Ok(())
    }

    /// The cover never spills onto a second page: once a block does not fit,
    /// it and everything after it are dropped.
    fn push_on_cover(&mut self, block: &Block, dropped: &mut usize) -> Result<()> {
        if *dropped > 0 || !self.policy.fits(&self.cursor, block.height()) {
            *dropped += 1;
            return Ok(());
        }
        self.push(block)
    }

    fn cover_logo(&mut self, bytes: &[u8], geometry: &PageGeometry) -> Result<()> {
        let dims = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(image::ImageError::IoError)
            .and_then(|reader| reader.into_dimensions());
        let (w, h) = match dims {
            Ok((w, h)) if w > 0 && h > 0 => (w as f32, h as f32),
            Ok(_) => return Ok(()),
            Err(e) => {
                log::warn!("Cover logo skipped: {e}");
                return Ok(());
            }
        };
        let height = LOGO_HEIGHT;
        let width = (w / h * height).min(geometry.content_width());
        let op = DrawOp::Image(ImageSpec {
            data: bytes.to_vec(),
            x: geometry.margins.left,
            y: geometry.content_top(),
            width,
            height,
        });
        op.draw_on(&mut *self.backend)
    }

    /// Everything between the contents and the deferred passes.
    fn body(&mut self, progress: &mut Progress<'_>) -> Result<()> {
        let (settings, content) = (self.settings, self.content);
        let toggles = &settings.sections;
        let with_revisions =
            toggles.include_revision_history && !settings.metadata.revision_history.is_empty();
        let with_glossary = toggles.include_glossary && !content.glossary.is_empty();
        progress.units = usize::from(with_revisions)
            + content.sections.len()
            + content.modules.len()
            + usize::from(with_glossary);

        if with_revisions {
            self.document_control()?;
            progress.step(DOCUMENT_CONTROL_TITLE);
        }
        for section in &content.sections {
            if toggles.section_new_page && section.level <= 1 {
                self.break_unless_at_top()?;
            }
            self.section(section, section.level.max(1))?;
            progress.step(&section.title);
        }
        for module in &content.modules {
            if toggles.module_new_page {
                self.break_unless_at_top()?;
            }
            self.module(module)?;
            progress.step(&module.name);
        }
        if with_glossary {
            self.glossary(&content.glossary)?;
            progress.step(GLOSSARY_TITLE);
        }
        Ok(())
    }

    fn document_control(&mut self) -> Result<()> {
        self.heading(DOCUMENT_CONTROL_TITLE, 1)?;
        let header: Vec<String> = ["Version", "Date", "Author", "Changes"]
            .into_iter()
            .map(String::from)
            .collect();
        let settings = self.settings;
        let rows: Vec<Vec<String>> = settings
            .metadata
            .revision_history
            .iter()
            .map(|r| {
                vec![
                    r.version.clone(),
                    r.date.clone(),
                    r.author.clone(),
                    r.changes.clone(),
                ]
            })
            .collect();
        let blocks = block::table(
            &*self.backend,
            Some(&header),
            &rows,
            &[0.12, 0.18, 0.2, 0.5],
            &self.theme,
            self.width,
        )?;
        self.push_all(blocks)
    }

    fn section(&mut self, section: &Section, level: u8) -> Result<()> {
        self.heading(&section.title, level)?;
        for content_block in &section.blocks {
            self.content_block(content_block)?;
        }
        for sub in &section.subsections {
            self.section(sub, level.saturating_add(1))?;
        }
        Ok(())
    }

    fn content_block(&mut self, content_block: &ContentBlock) -> Result<()> {
        let backend = &*self.backend;
        let (theme, width) = (&self.theme, self.width);
        let blocks = match content_block {
            ContentBlock::Paragraph(text) => block::paragraph(backend, text, theme, width)?,
            ContentBlock::Bullets(items) => block::bullet_list(backend, items, theme, width)?,
            ContentBlock::Callout { label, body } => {
                block::labeled_box(backend, label, body, theme, width)?
            }
            ContentBlock::Badges(badges) => vec![block::badge_row(backend, badges, theme, width)?],
            ContentBlock::KeyValues(pairs) => {
                let rows: Vec<Vec<String>> =
                    pairs.iter().map(|(k, v)| vec![k.clone(), v.clone()]).collect();
                block::table(backend, None, &rows, &[0.35, 0.65], theme, width)?
            }
            ContentBlock::Rule => vec![block::rule(width, block::HAIRLINE)],
            ContentBlock::Spacer(height) => vec![Block::spacer(*height)],
        };
        self.push_all(blocks)
    }

    fn module(&mut self, module: &Module) -> Result<()> {
        self.heading(&module.name, 1)?;
        if !module.summary.trim().is_empty() {
            let blocks =
                block::paragraph(&*self.backend, &module.summary, &self.theme, self.width)?;
            self.push_all(blocks)?;
        }
        let badges: Vec<String> = std::iter::once(&module.status)
            .chain(&module.tags)
            .filter(|b| !b.trim().is_empty())
            .cloned()
            .collect();
        if !badges.is_empty() {
            let row = block::badge_row(&*self.backend, &badges, &self.theme, self.width)?;
            self.push(&row)?;
        }
        if !module.features.is_empty() {
            let blocks =
                block::bullet_list(&*self.backend, &module.features, &self.theme, self.width)?;
            self.push_all(blocks)?;
        }
        if self.settings.sections.include_module_details {
            for detail in &module.details {
                self.section(detail, 2)?;
            }
        }
        Ok(())
    }

    fn glossary(&mut self, terms: &[GlossaryTerm]) -> Result<()> {
        self.heading(GLOSSARY_TITLE, 1)?;
        let mut sorted: Vec<&GlossaryTerm> = terms.iter().collect();
        sorted.sort_by_key(|t| t.term.to_lowercase());

        let size = self.theme.body_size;
        let line_h = self.backend.line_height(size);
        for term in sorted {
            let lines =
                block::wrap_text(&*self.backend, &term.term, size, FontWeight::Bold, self.width)?;
            for line in lines {
                let block = block::text_line(
                    &*self.backend,
                    &line,
                    size,
                    FontWeight::Bold,
                    self.theme.text,
                );
                self.cursor
                    .push_labeled(&mut *self.backend, &self.policy, &block, line_h, None)?;
            }
            let blocks =
                block::paragraph(&*self.backend, &term.definition, &self.theme, self.width)?;
            self.push_all(blocks)?;
        }
        Ok(())
    }
}
