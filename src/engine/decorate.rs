use crate::backend::{FontWeight, LineSpec, RectSpec, RenderBackend, TextAlign, TextSpec};
use crate::error::Result;
use crate::settings::{
    BandStyle, Classification, PageNumberFormat, Position, Settings, WatermarkKind,
};

use super::block;
use super::cursor::PageGeometry;

const HEADER_SIZE: f32 = 8.5;
pub(crate) const FOOTER_SIZE: f32 = 8.0;
const WATERMARK_ROTATION: f32 = 45.0;
const WATERMARK_MAX_SIZE: f32 = 72.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Watermark {
    pub text: String,
    pub opacity: f32,
    pub color: [u8; 3],
    pub rotation: f32,
}

impl Watermark {
    /// Resolve the configured watermark, `None` when nothing should be drawn.
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        let classification = settings.metadata.classification;
        let (text, opacity, color) = match settings.branding.watermark {
            WatermarkKind::None => return None,
            WatermarkKind::Classification => (
                classification.watermark_text().to_string(),
                classification.watermark_opacity(),
                classification.color(),
            ),
            WatermarkKind::Custom => (
                settings.branding.watermark_text.trim().to_string(),
                settings.branding.watermark_opacity(),
                block::MUTED,
            ),
            WatermarkKind::Date => (
                format!(
                    "PRINTED {}",
                    settings.metadata.print_date().format("%Y-%m-%d")
                ),
                settings.branding.watermark_opacity(),
                block::MUTED,
            ),
        };
        if text.is_empty() || opacity <= 0.0 {
            return None;
        }
        Some(Self {
            text,
            opacity,
            color,
            rotation: WATERMARK_ROTATION,
        })
    }
}

/// Static decoration configuration for one document.
#[derive(Clone, Debug, PartialEq)]
pub struct DecorationSpec {
    pub header_style: BandStyle,
    pub footer_style: BandStyle,
    pub alternating_headers: bool,
    pub page_number_format: PageNumberFormat,
    pub page_number_position: Position,
    pub title: String,
    pub version: String,
    pub classification: Classification,
    /// Center footer text, `document_id · print_date`.
    pub footer_center: String,
    pub watermark: Option<Watermark>,
    /// Page 0 is a cover and gets no header or footer.
    pub has_cover: bool,
    pub primary: [u8; 3],
    pub secondary: [u8; 3],
    pub accent: [u8; 3],
}

impl DecorationSpec {
    pub fn from_settings(settings: &Settings) -> Self {
        let meta = &settings.metadata;
        let hf = &settings.header_footer;
        let date = meta.print_date().format("%Y-%m-%d").to_string();
        let footer_center = if meta.document_id.trim().is_empty() {
            date
        } else {
            format!("{} \u{00B7} {date}", meta.document_id.trim())
        };
        let version = if meta.version.trim().is_empty() {
            String::new()
        } else {
            format!("v{}", meta.version.trim())
        };
        Self {
            header_style: hf.header_style,
            footer_style: hf.footer_style,
            alternating_headers: hf.alternating_headers,
            page_number_format: hf.page_number_format,
            page_number_position: hf.page_number_position,
            title: meta.title.clone(),
            version,
            classification: meta.classification,
            footer_center,
            watermark: Watermark::from_settings(settings),
            has_cover: settings.sections.include_cover,
            primary: settings.branding.primary(),
            secondary: settings.branding.secondary(),
            accent: settings.branding.accent(),
        }
    }
}

pub struct DecorationPass {
    spec: DecorationSpec,
    geometry: PageGeometry,
}

impl DecorationPass {
    pub fn new(spec: DecorationSpec, geometry: PageGeometry) -> Self {
        Self { spec, geometry }
    }

    /// Decorate every page. `page_sections[i]` is the section label of page
    /// `i`; missing labels render as an empty center zone.
    pub fn apply_all<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        page_sections: &[String],
    ) -> Result<()> {
        let total = backend.page_count();
        for index in 0..total {
            backend.select_page(index)?;
            if !(self.spec.has_cover && index == 0) {
                let section = page_sections.get(index).map(String::as_str).unwrap_or("");
                self.draw_header(backend, index, section)?;
                self.draw_footer(backend, index, total)?;
            }
            if let Some(watermark) = &self.spec.watermark {
                self.draw_watermark(backend, watermark)?;
            }
        }
        log::debug!("decorated {total} pages (cover excluded: {})", self.spec.has_cover);
        Ok(())
    }

    /// Left, center and right header text for a page.
    pub fn header_zones(&self, page_index: usize, section: &str) -> [String; 3] {
        let is_odd_page = (page_index + 1) % 2 == 1;
        let mut zones = [
            self.spec.title.clone(),
            section.to_string(),
            self.spec.version.clone(),
        ];
        if self.spec.alternating_headers && !is_odd_page {
            zones.swap(0, 2);
        }
        zones
    }

    /// Left, center and right footer text. The page number takes the
    /// configured zone; whatever it displaces moves to the right.
    pub fn footer_zones(&self, page_index: usize, total_pages: usize) -> [String; 3] {
        let number = self
            .spec
            .page_number_format
            .render(page_index + 1, total_pages);
        let classification = self.spec.classification.label().to_string();
        let center = self.spec.footer_center.clone();
        match self.spec.page_number_position {
            Position::Left => [number, center, classification],
            Position::Center => [classification, number, center],
            Position::Right => [classification, center, number],
        }
    }

    fn zone_specs(&self, zones: [String; 3], baseline: f32, size: f32) -> [TextSpec; 3] {
        let g = &self.geometry;
        let [left, center, right] = zones;
        [
            TextSpec::new(left, g.margins.left, baseline, size),
            TextSpec::new(center, g.width / 2.0, baseline, size).align(TextAlign::Center),
            TextSpec::new(right, g.width - g.margins.right, baseline, size)
                .align(TextAlign::Right),
        ]
    }

    fn draw_header<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        page_index: usize,
        section: &str,
    ) -> Result<()> {
        let g = &self.geometry;
        let zones = self.header_zones(page_index, section);
        match self.spec.header_style {
            BandStyle::None => Ok(()),
            BandStyle::Branded => {
                let band_h = g.margins.top * 0.6;
                backend.draw_rect(&RectSpec::filled(0.0, 0.0, g.width, band_h, self.spec.primary))?;
                backend.draw_line(&LineSpec {
                    x1: 0.0,
                    y1: band_h,
                    x2: g.width,
                    y2: band_h,
                    color: self.spec.accent,
                    width: 2.0,
                })?;
                let baseline = band_h / 2.0 + HEADER_SIZE * 0.35;
                let specs = self.zone_specs(zones, baseline, HEADER_SIZE);
                for (i, spec) in specs.into_iter().enumerate() {
                    let spec = spec.color(block::WHITE);
                    let spec = if i == 0 { spec.bold() } else { spec };
                    backend.draw_text(&spec)?;
                }
                Ok(())
            }
            BandStyle::Simple => {
                let baseline = g.margins.top * 0.55;
                for spec in self.zone_specs(zones, baseline, HEADER_SIZE) {
                    backend.draw_text(&spec.color(block::MUTED))?;
                }
                let rule_y = g.margins.top * 0.7;
                backend.draw_line(&LineSpec {
                    x1: g.margins.left,
                    y1: rule_y,
                    x2: g.width - g.margins.right,
                    y2: rule_y,
                    color: block::HAIRLINE,
                    width: 0.5,
                })
            }
        }
    }

    fn draw_footer<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        page_index: usize,
        total_pages: usize,
    ) -> Result<()> {
        let g = &self.geometry;
        let (rule_color, rule_width, text_color) = match self.spec.footer_style {
            BandStyle::None => return Ok(()),
            BandStyle::Branded => (self.spec.secondary, 1.0, self.spec.secondary),
            BandStyle::Simple => (block::HAIRLINE, 0.5, block::MUTED),
        };
        let rule_y = g.height - g.margins.bottom * 0.75;
        backend.draw_line(&LineSpec {
            x1: g.margins.left,
            y1: rule_y,
            x2: g.width - g.margins.right,
            y2: rule_y,
            color: rule_color,
            width: rule_width,
        })?;
        let baseline = g.height - g.margins.bottom * 0.45;
        let zones = self.footer_zones(page_index, total_pages);
        for spec in self.zone_specs(zones, baseline, FOOTER_SIZE) {
            backend.draw_text(&spec.color(text_color))?;
        }
        Ok(())
    }

    fn draw_watermark<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        watermark: &Watermark,
    ) -> Result<()> {
        let g = &self.geometry;
        let unit_width = backend.measure_text(&watermark.text, 1.0, FontWeight::Bold)?;
        let diagonal = (g.width * g.width + g.height * g.height).sqrt();
        let size = if unit_width > 0.0 {
            (diagonal * 0.6 / unit_width).min(WATERMARK_MAX_SIZE)
        } else {
            WATERMARK_MAX_SIZE
        };
        backend.draw_text(
            &TextSpec::new(watermark.text.as_str(), g.width / 2.0, g.height / 2.0, size)
                .bold()
                .color(watermark.color)
                .align(TextAlign::Center)
                .rotated(watermark.rotation)
                .opacity(watermark.opacity),
        )
    }
}
