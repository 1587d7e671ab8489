use serde::Serialize;

use crate::backend::{DrawOp, FontWeight, LineSpec, RenderBackend, TextAlign, TextSpec};
use crate::error::Result;

use super::block::{self, Theme};
use super::cursor::{LayoutCursor, PageGeometry};
use super::page_break::PageBreakPolicy;

pub const TOC_TITLE: &str = "Table of Contents";

const LEVEL_INDENT: f32 = 14.0;
const ROW_PADDING: f32 = 4.0;
const NUMBER_COLUMN: f32 = 36.0;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub title: String,
    pub level: u8,
    /// 0-based index of the page the heading was drawn on.
    pub page_index: usize,
}

impl TocEntry {
    /// The number printed for this entry, matching the footer numbering.
    pub fn page_number(&self) -> usize {
        self.page_index + 1
    }
}

/// Append-only log of the headings as they are drawn.
#[derive(Clone, Debug, Default)]
pub struct SectionRegistry {
    entries: Vec<TocEntry>,
}

impl SectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log a heading on the cursor's current page. Call right after the
    /// heading block was pushed.
    pub fn record_section(&mut self, title: &str, level: u8, cursor: &LayoutCursor) {
        let entry = TocEntry {
            title: title.to_string(),
            level: level.max(1),
            page_index: cursor.page_index(),
        };
        log::debug!(
            "toc entry: {:?} level {} on page {}",
            entry.title,
            entry.level,
            entry.page_number()
        );
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<TocEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Row geometry of the contents pages.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TocLayout {
    pub title_height: f32,
    pub row_height: f32,
    pub first_page_rows: usize,
    pub continuation_rows: usize,
}

impl TocLayout {
    pub fn new<B: RenderBackend + ?Sized>(
        backend: &B,
        geometry: &PageGeometry,
        policy: &PageBreakPolicy,
        theme: &Theme,
    ) -> Self {
        let title_size = theme.heading_size(1);
        let title_height = backend.line_height(title_size) + 2.0 * ROW_PADDING + 6.0;
        let row_height = backend.line_height(theme.body_size) + ROW_PADDING;
        let usable = (policy.content_limit(geometry) - geometry.content_top()).max(0.0);
        Self {
            title_height,
            row_height,
            first_page_rows: ((usable - title_height).max(0.0) / row_height) as usize,
            continuation_rows: ((usable / row_height) as usize).max(1),
        }
    }

    /// Pages needed for `entries` rows, at least one.
    pub fn pages_needed(&self, entries: usize) -> usize {
        if entries <= self.first_page_rows {
            return 1;
        }
        1 + (entries - self.first_page_rows).div_ceil(self.continuation_rows)
    }

    pub fn capacity(&self, pages: usize) -> usize {
        match pages {
            0 => 0,
            n => self.first_page_rows + (n - 1) * self.continuation_rows,
        }
    }
}

/// Blank pages set aside for the contents, in order.
#[derive(Clone, Debug)]
pub struct TocReservation {
    pages: Vec<usize>,
    layout: TocLayout,
    max_level: u8,
}

impl TocReservation {
    /// Reserve enough pages for `expected_entries` rows at or above
    /// `max_level`. The current page is reused when nothing is on it yet.
    /// Afterwards the cursor sits on a full page, so the next block starts a
    /// fresh one.
    pub fn reserve<B: RenderBackend + ?Sized>(
        cursor: &mut LayoutCursor,
        backend: &mut B,
        policy: &PageBreakPolicy,
        theme: &Theme,
        expected_entries: usize,
        max_level: u8,
    ) -> Result<Self> {
        let layout = TocLayout::new(backend, cursor.geometry(), policy, theme);
        let count = layout.pages_needed(expected_entries);
        let mut pages = Vec::with_capacity(count);
        if cursor.is_at_page_top() {
            cursor.set_section_label(TOC_TITLE);
            pages.push(cursor.page_index());
        } else {
            pages.push(policy.break_page(cursor, backend, Some(TOC_TITLE))?);
        }
        while pages.len() < count {
            pages.push(policy.break_page(cursor, backend, Some(TOC_TITLE))?);
        }
        cursor.fill_page();
        log::debug!(
            "reserved {} contents page(s) for {} entries: {:?}",
            pages.len(),
            expected_entries,
            pages
        );
        Ok(Self {
            pages,
            layout,
            max_level: max_level.max(1),
        })
    }

    pub fn pages(&self) -> &[usize] {
        &self.pages
    }

    pub fn layout(&self) -> &TocLayout {
        &self.layout
    }

    pub fn max_level(&self) -> u8 {
        self.max_level
    }

    pub fn capacity(&self) -> usize {
        self.layout.capacity(self.pages.len())
    }
}

/// Draws the contents onto the reserved pages once every heading is known.
/// Drawing never goes through the cursor, so it cannot add pages.
pub struct DeferredResolutionPass<'a> {
    geometry: PageGeometry,
    theme: &'a Theme,
}

impl<'a> DeferredResolutionPass<'a> {
    pub fn new(geometry: PageGeometry, theme: &'a Theme) -> Self {
        Self { geometry, theme }
    }

    /// Render the listed entries and return how many were drawn.
    pub fn render<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        reservation: &TocReservation,
        registry: &SectionRegistry,
    ) -> Result<usize> {
        let listed: Vec<&TocEntry> = registry
            .entries()
            .iter()
            .filter(|e| e.level <= reservation.max_level())
            .collect();
        let capacity = reservation.capacity();
        if listed.len() > capacity {
            log::warn!(
                "Table of contents truncated: {} entries, room for {}",
                listed.len(),
                capacity
            );
        }

        let layout = reservation.layout();
        let mut remaining = listed.into_iter().take(capacity);
        let mut drawn = 0;
        for (i, &page) in reservation.pages().iter().enumerate() {
            backend.select_page(page)?;
            let mut y = self.geometry.content_top();
            let rows = if i == 0 {
                self.draw_title(backend, y)?;
                y += layout.title_height;
                layout.first_page_rows
            } else {
                layout.continuation_rows
            };
            for entry in remaining.by_ref().take(rows) {
                self.draw_row(backend, entry, y)?;
                y += layout.row_height;
                drawn += 1;
            }
        }
        Ok(drawn)
    }

    fn draw_title<B: RenderBackend + ?Sized>(&self, backend: &mut B, y: f32) -> Result<()> {
        let size = self.theme.heading_size(1);
        let x = self.geometry.margins.left;
        backend.draw_text(
            &TextSpec::new(TOC_TITLE, x, y + ROW_PADDING + backend.ascent(size), size)
                .bold()
                .color(self.theme.primary),
        )?;
        let rule_y = y + ROW_PADDING + backend.line_height(size) + 2.0;
        backend.draw_line(&LineSpec {
            x1: x,
            y1: rule_y,
            x2: x + self.geometry.content_width(),
            y2: rule_y,
            color: self.theme.accent,
            width: 1.5,
        })
    }

    fn draw_row<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        entry: &TocEntry,
        y: f32,
    ) -> Result<()> {
        let size = self.theme.body_size;
        let weight = if entry.level == 1 {
            FontWeight::Bold
        } else {
            FontWeight::Regular
        };
        let left = self.geometry.margins.left + (entry.level - 1) as f32 * LEVEL_INDENT;
        let right = self.geometry.margins.left + self.geometry.content_width();
        let baseline = y + backend.ascent(size);
        let title_room = (right - NUMBER_COLUMN - left).max(0.0);
        let title = fit_to_width(backend, &entry.title, size, weight, title_room)?;
        let title_w = backend.measure_text(&title, size, weight)?;
        let number = entry.page_number().to_string();
        let number_w = backend.measure_text(&number, size, FontWeight::Regular)?;

        let ops = [
            DrawOp::Text(
                TextSpec::new(title, left, baseline, size)
                    .weight(weight)
                    .color(self.theme.text),
            ),
            DrawOp::Line(LineSpec {
                x1: left + title_w + 4.0,
                y1: baseline,
                x2: right - number_w - 4.0,
                y2: baseline,
                color: block::HAIRLINE,
                width: 0.5,
            }),
            DrawOp::Text(
                TextSpec::new(number, right, baseline, size)
                    .align(TextAlign::Right)
                    .color(self.theme.text),
            ),
        ];
        for op in &ops {
            op.draw_on(backend)?;
        }
        Ok(())
    }
}

/// Shorten `text` with an ellipsis until it fits `max_width`.
fn fit_to_width<B: RenderBackend + ?Sized>(
    backend: &B,
    text: &str,
    size: f32,
    weight: FontWeight,
    max_width: f32,
) -> Result<String> {
    if backend.measure_text(text, size, weight)? <= max_width {
        return Ok(text.to_string());
    }
    let mut chars: Vec<char> = text.chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let candidate: String = chars.iter().collect::<String>().trim_end().to_string() + "...";
        if backend.measure_text(&candidate, size, weight)? <= max_width {
            return Ok(candidate);
        }
    }
    Ok(String::new())
}
