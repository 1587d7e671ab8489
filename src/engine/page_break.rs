use crate::backend::RenderBackend;
use crate::error::Result;
use crate::settings::DEFAULT_FOOTER_RESERVE;

use super::cursor::{LayoutCursor, PageGeometry};

/// Decides when the cursor has to move to a fresh page.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageBreakPolicy {
    reserve_footer_space: f32,
}

impl Default for PageBreakPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_FOOTER_RESERVE)
    }
}

impl PageBreakPolicy {
    pub fn new(reserve_footer_space: f32) -> Self {
        Self {
            reserve_footer_space: reserve_footer_space.max(0.0),
        }
    }

    /// Reserve derived from the footer font instead of a fixed constant.
    pub fn measured<B: RenderBackend + ?Sized>(backend: &B, footer_size: f32) -> Self {
        Self::new(backend.line_height(footer_size) + 4.0)
    }

    pub fn reserve_footer_space(&self) -> f32 {
        self.reserve_footer_space
    }

    /// Lowest y a block may extend to.
    pub fn content_limit(&self, geometry: &PageGeometry) -> f32 {
        geometry.content_bottom() - self.reserve_footer_space
    }

    pub fn fits(&self, cursor: &LayoutCursor, height: f32) -> bool {
        cursor.y() + height <= self.content_limit(cursor.geometry())
    }

    /// Make room for `height` points, starting a new page when they do not fit
    /// below the cursor. Returns whether a page was added.
    ///
    /// A block that does not even fit on an empty page is left where it is and
    /// overflows into the bottom margin.
    pub fn ensure_space<B: RenderBackend + ?Sized>(
        &self,
        cursor: &mut LayoutCursor,
        backend: &mut B,
        height: f32,
        section_label: Option<&str>,
    ) -> Result<bool> {
        if self.fits(cursor, height) {
            return Ok(false);
        }
        if cursor.is_at_page_top() {
            log::warn!(
                "Block of {height:.1}pt exceeds the usable page height ({:.1}pt) on page {}",
                self.content_limit(cursor.geometry()) - cursor.geometry().content_top(),
                cursor.page_index() + 1,
            );
            return Ok(false);
        }
        self.break_page(cursor, backend, section_label)?;
        Ok(true)
    }

    /// Unconditionally start a new page.
    pub fn break_page<B: RenderBackend + ?Sized>(
        &self,
        cursor: &mut LayoutCursor,
        backend: &mut B,
        section_label: Option<&str>,
    ) -> Result<usize> {
        let index = backend.add_page()?;
        cursor.move_to_page(index, section_label);
        log::debug!(
            "page break → page {} ({:?})",
            index + 1,
            cursor.section_label()
        );
        Ok(index)
    }
}
