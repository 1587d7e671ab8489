use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_PRIMARY: [u8; 3] = [0x1E, 0x3A, 0x8A];
pub const DEFAULT_SECONDARY: [u8; 3] = [0x64, 0x74, 0x8B];
pub const DEFAULT_ACCENT: [u8; 3] = [0xF5, 0x9E, 0x0B];

/// Fixed space kept free above the bottom margin for the footer.
pub const DEFAULT_FOOTER_RESERVE: f32 = 15.0;

const MM: f32 = 72.0 / 25.4;

type DeResult<T, E> = std::result::Result<T, E>;

/// Unusable values (an unknown variant, a wrong type) are not errors: they
/// become the type's default and are reported with a warning.
fn lenient<'de, D, T>(deserializer: D) -> DeResult<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    lenient_or(deserializer, T::default)
}

fn lenient_true<'de, D: Deserializer<'de>>(deserializer: D) -> DeResult<bool, D::Error> {
    lenient_or(deserializer, || true)
}

fn lenient_toc_level<'de, D: Deserializer<'de>>(deserializer: D) -> DeResult<u8, D::Error> {
    lenient_or(deserializer, || 2)
}

/// The accessors map non-finite sizes to their defaults, so a mistyped number
/// becomes NaN.
fn lenient_f32<'de, D: Deserializer<'de>>(deserializer: D) -> DeResult<f32, D::Error> {
    lenient_or(deserializer, || f32::NAN)
}

fn lenient_or<'de, D, T>(deserializer: D, fallback: impl FnOnce() -> T) -> DeResult<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(&value).unwrap_or_else(|e| {
        log::warn!("Ignoring setting {value} ({e}), using default");
        fallback()
    }))
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub layout: LayoutSettings,
    pub metadata: Metadata,
    pub sections: SectionToggles,
    pub branding: Branding,
    pub header_footer: HeaderFooterSettings,
    pub typography: Typography,
}

impl Settings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::Settings)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSize {
    #[default]
    A4,
    Letter,
    Legal,
    Custom { width: f32, height: f32 },
}

impl PageSize {
    /// Portrait (width, height) in points.
    pub fn dimensions(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (210.0 * MM, 297.0 * MM),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Custom { width, height } => (width, height),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    pub fn uniform(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(20.0 * MM)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LayoutSettings {
    #[serde(deserialize_with = "lenient")]
    pub orientation: Orientation,
    #[serde(deserialize_with = "lenient")]
    pub page_size: PageSize,
    #[serde(deserialize_with = "lenient")]
    pub margins: Margins,
    #[serde(deserialize_with = "lenient_f32")]
    pub footer_reserve: f32,
    /// Derive the footer reserve from the footer font's line height instead
    /// of using `footer_reserve`.
    #[serde(deserialize_with = "lenient")]
    pub measure_footer: bool,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            orientation: Orientation::Portrait,
            page_size: PageSize::A4,
            margins: Margins::default(),
            footer_reserve: DEFAULT_FOOTER_RESERVE,
            measure_footer: false,
        }
    }
}

impl LayoutSettings {
    /// Page (width, height) after applying orientation. Degenerate sizes fall
    /// back to A4.
    pub fn page_dimensions(&self) -> (f32, f32) {
        let (w, h) = match self.page_size.dimensions() {
            (w, h) if w > 0.0 && h > 0.0 => (w, h),
            (w, h) => {
                log::warn!("Unusable page size {w}x{h} — using A4");
                PageSize::A4.dimensions()
            }
        };
        match self.orientation {
            Orientation::Portrait => (w.min(h), w.max(h)),
            Orientation::Landscape => (w.max(h), w.min(h)),
        }
    }

    pub fn footer_reserve(&self) -> f32 {
        if self.footer_reserve.is_finite() && self.footer_reserve >= 0.0 {
            self.footer_reserve
        } else {
            DEFAULT_FOOTER_RESERVE
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Public,
    #[default]
    Internal,
    Confidential,
    Restricted,
}

impl Classification {
    pub fn label(self) -> &'static str {
        match self {
            Classification::Public => "Public",
            Classification::Internal => "Internal Use Only",
            Classification::Confidential => "Confidential",
            Classification::Restricted => "Restricted - Do Not Distribute",
        }
    }

    pub fn watermark_text(self) -> &'static str {
        match self {
            Classification::Public => "PUBLIC",
            Classification::Internal => "INTERNAL USE ONLY",
            Classification::Confidential => "CONFIDENTIAL",
            Classification::Restricted => "RESTRICTED",
        }
    }

    pub fn watermark_opacity(self) -> f32 {
        match self {
            Classification::Public => 0.06,
            Classification::Internal => 0.08,
            Classification::Confidential => 0.10,
            Classification::Restricted => 0.12,
        }
    }

    pub fn color(self) -> [u8; 3] {
        match self {
            Classification::Public => [0x6B, 0x72, 0x80],
            Classification::Internal => [0x47, 0x55, 0x69],
            Classification::Confidential => [0xDC, 0x26, 0x26],
            Classification::Restricted => [0x99, 0x1B, 0x1B],
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Revision {
    pub version: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub changes: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Metadata {
    pub title: String,
    pub subtitle: String,
    pub version: String,
    #[serde(deserialize_with = "lenient")]
    pub classification: Classification,
    pub owner: String,
    pub document_id: String,
    #[serde(deserialize_with = "lenient")]
    pub print_date: Option<NaiveDate>,
    pub revision_history: Vec<Revision>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            title: "Product Capabilities".to_string(),
            subtitle: String::new(),
            version: "1.0".to_string(),
            classification: Classification::Internal,
            owner: String::new(),
            document_id: String::new(),
            print_date: None,
            revision_history: Vec::new(),
        }
    }
}

impl Metadata {
    pub fn print_date(&self) -> NaiveDate {
        self.print_date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SectionToggles {
    #[serde(deserialize_with = "lenient_true")]
    pub include_cover: bool,
    #[serde(deserialize_with = "lenient_true")]
    pub include_toc: bool,
    #[serde(deserialize_with = "lenient_true")]
    pub include_revision_history: bool,
    #[serde(deserialize_with = "lenient_true")]
    pub include_glossary: bool,
    #[serde(deserialize_with = "lenient_true")]
    pub include_module_details: bool,
    #[serde(deserialize_with = "lenient")]
    pub module_new_page: bool,
    #[serde(deserialize_with = "lenient")]
    pub section_new_page: bool,
    #[serde(deserialize_with = "lenient_toc_level")]
    pub toc_max_level: u8,
}

impl Default for SectionToggles {
    fn default() -> Self {
        Self {
            include_cover: true,
            include_toc: true,
            include_revision_history: true,
            include_glossary: true,
            include_module_details: true,
            module_new_page: false,
            section_new_page: false,
            toc_max_level: 2,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkKind {
    #[default]
    None,
    Classification,
    Custom,
    #[serde(alias = "date-based", alias = "date_based", alias = "dateBased")]
    Date,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Branding {
    #[serde(deserialize_with = "lenient")]
    pub primary_color: String,
    #[serde(deserialize_with = "lenient")]
    pub secondary_color: String,
    #[serde(deserialize_with = "lenient")]
    pub accent_color: String,
    #[serde(deserialize_with = "lenient")]
    pub watermark: WatermarkKind,
    #[serde(deserialize_with = "lenient")]
    pub watermark_text: String,
    #[serde(deserialize_with = "lenient_f32")]
    pub watermark_opacity: f32,
    #[serde(deserialize_with = "lenient")]
    pub logo: Option<PathBuf>,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            primary_color: "#1E3A8A".to_string(),
            secondary_color: "#64748B".to_string(),
            accent_color: "#F59E0B".to_string(),
            watermark: WatermarkKind::None,
            watermark_text: String::new(),
            watermark_opacity: 0.1,
            logo: None,
        }
    }
}

impl Branding {
    pub fn primary(&self) -> [u8; 3] {
        color_or_default("primary_color", &self.primary_color, DEFAULT_PRIMARY)
    }

    pub fn secondary(&self) -> [u8; 3] {
        color_or_default("secondary_color", &self.secondary_color, DEFAULT_SECONDARY)
    }

    pub fn accent(&self) -> [u8; 3] {
        color_or_default("accent_color", &self.accent_color, DEFAULT_ACCENT)
    }

    pub fn watermark_opacity(&self) -> f32 {
        if self.watermark_opacity.is_finite() {
            self.watermark_opacity.clamp(0.0, 1.0)
        } else {
            0.1
        }
    }
}

fn color_or_default(field: &str, value: &str, default: [u8; 3]) -> [u8; 3] {
    parse_hex_color(value).unwrap_or_else(|| {
        log::warn!("Malformed {field} {value:?}, using default");
        default
    })
}

/// Parse `#rrggbb` or `#rgb` (leading `#` optional).
pub fn parse_hex_color(value: &str) -> Option<[u8; 3]> {
    let hex = value.trim().trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => {
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            Some([channel(0)?, channel(2)?, channel(4)?])
        }
        3 => {
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
            Some([channel(0)?, channel(1)?, channel(2)?])
        }
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BandStyle {
    #[default]
    Branded,
    Simple,
    None,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageNumberFormat {
    Simple,
    Page,
    #[default]
    #[serde(alias = "pageOf", alias = "page-of")]
    PageOf,
}

impl PageNumberFormat {
    pub fn render(self, page_number: usize, total_pages: usize) -> String {
        match self {
            PageNumberFormat::Simple => page_number.to_string(),
            PageNumberFormat::Page => format!("Page {page_number}"),
            PageNumberFormat::PageOf => format!("Page {page_number} of {total_pages}"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Left,
    Center,
    #[default]
    Right,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderFooterSettings {
    #[serde(deserialize_with = "lenient")]
    pub header_style: BandStyle,
    #[serde(deserialize_with = "lenient")]
    pub footer_style: BandStyle,
    #[serde(deserialize_with = "lenient")]
    pub alternating_headers: bool,
    #[serde(deserialize_with = "lenient")]
    pub page_number_format: PageNumberFormat,
    #[serde(deserialize_with = "lenient")]
    pub page_number_position: Position,
}

impl Default for HeaderFooterSettings {
    fn default() -> Self {
        Self {
            header_style: BandStyle::Branded,
            footer_style: BandStyle::Simple,
            alternating_headers: false,
            page_number_format: PageNumberFormat::PageOf,
            page_number_position: Position::Right,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Typography {
    #[serde(deserialize_with = "lenient_f32")]
    pub body_size: f32,
    /// Heading sizes for levels 1, 2 and 3+.
    #[serde(deserialize_with = "lenient")]
    pub heading_sizes: [f32; 3],
    #[serde(deserialize_with = "lenient")]
    pub font_regular: Option<PathBuf>,
    #[serde(deserialize_with = "lenient")]
    pub font_bold: Option<PathBuf>,
}

impl Default for Typography {
    fn default() -> Self {
        Self {
            body_size: 10.0,
            heading_sizes: [18.0, 14.0, 12.0],
            font_regular: None,
            font_bold: None,
        }
    }
}

impl Typography {
    pub fn body_size(&self) -> f32 {
        positive_or(self.body_size, 10.0)
    }

    pub fn heading_size(&self, level: u8) -> f32 {
        let idx = (level.max(1) as usize - 1).min(2);
        positive_or(self.heading_sizes[idx], [18.0, 14.0, 12.0][idx])
    }
}

fn positive_or(value: f32, default: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        default
    }
}
