use serde::Serialize;

use crate::error::{Error, Result};
use crate::fonts;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum FontWeight {
    #[default]
    Regular,
    Bold,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TextSpec {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub weight: FontWeight,
    pub color: [u8; 3],
    pub align: TextAlign,
    /// Counter-clockwise, in degrees.
    pub rotation: f32,
    pub opacity: f32,
}

impl TextSpec {
    pub fn new(text: impl Into<String>, x: f32, y: f32, size: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            size,
            weight: FontWeight::Regular,
            color: [0, 0, 0],
            align: TextAlign::Left,
            rotation: 0.0,
            opacity: 1.0,
        }
    }

    pub fn bold(mut self) -> Self {
        self.weight = FontWeight::Bold;
        self
    }

    pub fn weight(mut self, weight: FontWeight) -> Self {
        self.weight = weight;
        self
    }

    pub fn color(mut self, color: [u8; 3]) -> Self {
        self.color = color;
        self
    }

    pub fn align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn rotated(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RectSpec {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub fill: Option<[u8; 3]>,
    pub stroke: Option<[u8; 3]>,
    pub line_width: f32,
}

impl RectSpec {
    pub fn filled(x: f32, y: f32, width: f32, height: f32, color: [u8; 3]) -> Self {
        Self {
            x,
            y,
            width,
            height,
            fill: Some(color),
            stroke: None,
            line_width: 0.0,
        }
    }

    pub fn outlined(mut self, color: [u8; 3], line_width: f32) -> Self {
        self.stroke = Some(color);
        self.line_width = line_width;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LineSpec {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub color: [u8; 3],
    pub width: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImageSpec {
    #[serde(skip)]
    pub data: Vec<u8>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One recorded drawing primitive. Blocks carry these relative to their own
/// top-left corner; the cursor translates them when the block is placed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum DrawOp {
    Text(TextSpec),
    Rect(RectSpec),
    Line(LineSpec),
    Image(ImageSpec),
}

impl DrawOp {
    pub fn translated(&self, dx: f32, dy: f32) -> DrawOp {
        match self {
            DrawOp::Text(t) => DrawOp::Text(TextSpec {
                x: t.x + dx,
                y: t.y + dy,
                ..t.clone()
            }),
            DrawOp::Rect(r) => DrawOp::Rect(RectSpec {
                x: r.x + dx,
                y: r.y + dy,
                ..r.clone()
            }),
            DrawOp::Line(l) => DrawOp::Line(LineSpec {
                x1: l.x1 + dx,
                y1: l.y1 + dy,
                x2: l.x2 + dx,
                y2: l.y2 + dy,
                ..l.clone()
            }),
            DrawOp::Image(i) => DrawOp::Image(ImageSpec {
                x: i.x + dx,
                y: i.y + dy,
                ..i.clone()
            }),
        }
    }

    pub fn draw_on<B: RenderBackend + ?Sized>(&self, backend: &mut B) -> Result<()> {
        match self {
            DrawOp::Text(t) => backend.draw_text(t),
            DrawOp::Rect(r) => backend.draw_rect(r),
            DrawOp::Line(l) => backend.draw_line(l),
            DrawOp::Image(i) => backend.draw_image(i),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DocumentInfo {
    pub title: String,
    pub subject: String,
    pub author: String,
    pub creator: String,
}

/// External drawing and measurement provider.
///
/// Pages are addressed by 0-based index and stay addressable after later
/// pages exist, so a page can be re-selected and drawn on again. Coordinates
/// are points from the top-left corner, y growing downward; text `y` is the
/// baseline.
pub trait RenderBackend {
    fn page_count(&self) -> usize;

    fn current_page(&self) -> Option<usize>;

    /// Append a page and make it the drawing target.
    fn add_page(&mut self) -> Result<usize>;

    fn select_page(&mut self, index: usize) -> Result<()>;

    fn draw_text(&mut self, spec: &TextSpec) -> Result<()>;

    fn draw_rect(&mut self, spec: &RectSpec) -> Result<()>;

    fn draw_line(&mut self, spec: &LineSpec) -> Result<()>;

    fn draw_image(&mut self, spec: &ImageSpec) -> Result<()>;

    /// Advance width of `text` in points.
    fn measure_text(&self, text: &str, size: f32, weight: FontWeight) -> Result<f32>;

    fn line_height(&self, size: f32) -> f32 {
        size * 1.2
    }

    /// Distance from the top of a line box to its baseline.
    fn ascent(&self, size: f32) -> f32 {
        size * 0.8
    }

    fn finish(self, info: &DocumentInfo) -> Result<Vec<u8>>
    where
        Self: Sized;
}

/// In-memory backend that keeps every primitive per page. Text is measured
/// with the built-in Helvetica metrics, the same numbers the PDF backend uses
/// when no font file is configured.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pages: Vec<Vec<DrawOp>>,
    current: Option<usize>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self, page: usize) -> &[DrawOp] {
        self.pages.get(page).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn texts(&self, page: usize) -> Vec<&TextSpec> {
        self.ops(page)
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    /// First page whose text contains `needle` exactly.
    pub fn find_text(&self, needle: &str) -> Option<(usize, &TextSpec)> {
        (0..self.pages.len()).find_map(|page| {
            self.texts(page)
                .into_iter()
                .find(|t| t.text == needle)
                .map(|t| (page, t))
        })
    }

    fn target(&mut self) -> Result<&mut Vec<DrawOp>> {
        let idx = self.current.ok_or(Error::NoActivePage)?;
        Ok(&mut self.pages[idx])
    }
}

impl RenderBackend for RecordingBackend {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn current_page(&self) -> Option<usize> {
        self.current
    }

    fn add_page(&mut self) -> Result<usize> {
        self.pages.push(Vec::new());
        let idx = self.pages.len() - 1;
        self.current = Some(idx);
        Ok(idx)
    }

    fn select_page(&mut self, index: usize) -> Result<()> {
        if index >= self.pages.len() {
            return Err(Error::PageOutOfRange {
                index,
                count: self.pages.len(),
            });
        }
        self.current = Some(index);
        Ok(())
    }

    fn draw_text(&mut self, spec: &TextSpec) -> Result<()> {
        self.target()?.push(DrawOp::Text(spec.clone()));
        Ok(())
    }

    fn draw_rect(&mut self, spec: &RectSpec) -> Result<()> {
        self.target()?.push(DrawOp::Rect(spec.clone()));
        Ok(())
    }

    fn draw_line(&mut self, spec: &LineSpec) -> Result<()> {
        self.target()?.push(DrawOp::Line(spec.clone()));
        Ok(())
    }

    fn draw_image(&mut self, spec: &ImageSpec) -> Result<()> {
        self.target()?.push(DrawOp::Image(spec.clone()));
        Ok(())
    }

    fn measure_text(&self, text: &str, size: f32, weight: FontWeight) -> Result<f32> {
        Ok(fonts::builtin_text_width(text, size, weight))
    }

    /// Serializes the recorded pages as JSON.
    fn finish(self, _info: &DocumentInfo) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.pages).map_err(Error::Serialize)
    }
}
