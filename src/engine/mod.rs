//! Pagination and assembly.
//!
//! Content is pushed block by block through a [`LayoutCursor`], which asks
//! the [`PageBreakPolicy`] for room before every draw. Headings are logged in
//! a [`SectionRegistry`] as they land; the contents pages reserved up front
//! are drawn from that log by the [`DeferredResolutionPass`], and the
//! [`DecorationPass`] stamps every page once the page count is final.

mod assemble;
pub mod block;
mod cursor;
mod decorate;
mod page_break;
mod toc;

pub use assemble::{
    AssemblyReport, DOCUMENT_CONTROL_TITLE, GLOSSARY_TITLE, ProgressFn, assemble_document,
    plan_outline,
};
pub use block::{Block, Theme};
pub use cursor::{LayoutCursor, PageGeometry, Placement};
pub use decorate::{DecorationPass, DecorationSpec, Watermark};
pub use page_break::PageBreakPolicy;
pub use toc::{
    DeferredResolutionPass, SectionRegistry, TOC_TITLE, TocEntry, TocLayout, TocReservation,
};
