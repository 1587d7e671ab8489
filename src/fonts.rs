use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::OnceLock;

use memmap2::Mmap;
use pdf_writer::{Name, Pdf, Rect, Ref};
use ttf_parser::Face;

use crate::backend::FontWeight;
use crate::error::{Error, Result};

/// Map a single Unicode char to its WinAnsi byte, or 0 if unmappable.
fn char_to_winansi(c: char) -> u8 {
    match c as u32 {
        0x0020..=0x007E => c as u8,
        0x00A0..=0x00FF => c as u8,
        0x20AC => 0x80,
        0x201A => 0x82,
        0x0192 => 0x83,
        0x201E => 0x84,
        0x2026 => 0x85,
        0x2020 => 0x86,
        0x2021 => 0x87,
        0x02C6 => 0x88,
        0x2030 => 0x89,
        0x0160 => 0x8A,
        0x2039 => 0x8B,
        0x0152 => 0x8C,
        0x017D => 0x8E,
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201C => 0x93,
        0x201D => 0x94,
        0x2022 => 0x95, // bullet
        0x2013 => 0x96,
        0x2014 => 0x97,
        0x02DC => 0x98,
        0x2122 => 0x99,
        0x0161 => 0x9A,
        0x203A => 0x9B,
        0x0153 => 0x9C,
        0x017E => 0x9E,
        0x0178 => 0x9F,
        _ => 0,
    }
}

/// Convert a UTF-8 string to WinAnsi (Windows-1252) bytes for PDF Str encoding.
/// Characters outside the code page are replaced with `?`.
pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .filter(|c| !c.is_control())
        .map(|c| match char_to_winansi(c) {
            0 => b'?',
            b => b,
        })
        .collect()
}

/// Approximate Helvetica widths at 1000 units/em for WinAnsi chars 32..=255.
fn helvetica_widths() -> Vec<f32> {
    (32u8..=255u8)
        .map(|b| match b {
            32 => 278.0,                          // space
            33..=47 => 333.0,                     // punctuation
            48..=57 => 556.0,                     // digits
            58..=64 => 333.0,                     // more punctuation
            73 | 74 => 278.0,                     // I J (narrow uppercase)
            77 => 833.0,                          // M (wide)
            87 => 944.0,                          // W
            65..=90 => 667.0,                     // uppercase A-Z (average)
            91..=96 => 333.0,                     // brackets etc.
            102 | 105 | 106 | 108 | 116 => 278.0, // narrow lowercase: f i j l t
            109 | 119 => 833.0,                   // m w (wide)
            97..=122 => 556.0,                    // lowercase a-z (average)
            0x95 => 350.0,                        // bullet
            0x96 => 556.0,                        // en dash
            0x97 => 1000.0,                       // em dash
            _ => 556.0,
        })
        .collect()
}

/// Approximate Helvetica-Bold widths, same layout as `helvetica_widths`.
fn helvetica_bold_widths() -> Vec<f32> {
    (32u8..=255u8)
        .map(|b| match b {
            32 => 278.0,
            33..=47 => 333.0,
            48..=57 => 556.0,
            58..=64 => 333.0,
            73 => 278.0,
            74 => 556.0,
            77 => 833.0,
            87 => 944.0,
            69 | 80 | 83 | 86 | 88 | 89 => 667.0,
            70 | 76 | 84 | 90 => 611.0,
            71 | 79 | 81 => 778.0,
            65..=90 => 722.0,
            91..=96 => 333.0,
            105 | 106 | 108 => 278.0,
            102 | 116 => 333.0,
            114 => 389.0,
            109 => 889.0,
            119 => 778.0,
            97 | 99 | 101 | 107 | 115 | 118 | 120 | 121 => 556.0,
            122 => 500.0,
            98..=122 => 611.0,
            0x95 => 350.0,
            0x96 => 556.0,
            0x97 => 1000.0,
            _ => 611.0,
        })
        .collect()
}

static REGULAR_WIDTHS: OnceLock<Vec<f32>> = OnceLock::new();
static BOLD_WIDTHS: OnceLock<Vec<f32>> = OnceLock::new();

fn builtin_widths(weight: FontWeight) -> &'static [f32] {
    match weight {
        FontWeight::Regular => REGULAR_WIDTHS.get_or_init(helvetica_widths),
        FontWeight::Bold => BOLD_WIDTHS.get_or_init(helvetica_bold_widths),
    }
}

/// Advance width of `text` set in built-in Helvetica (or Helvetica-Bold).
pub fn builtin_text_width(text: &str, size: f32, weight: FontWeight) -> f32 {
    let widths = builtin_widths(weight);
    to_winansi_bytes(text)
        .iter()
        .filter(|&&b| b >= 32)
        .map(|&b| widths[(b - 32) as usize] * size / 1000.0)
        .sum()
}

/// A TrueType/OpenType file, memory-mapped for the duration of the export.
/// Glyphs are remapped as text is drawn so the font can be subsetted once the
/// last page is finished.
pub(crate) struct FontFile {
    name: String,
    data: Mmap,
    units: f32,
    pub(crate) ascender_ratio: f32,
    pub(crate) line_h_ratio: f32,
    remapper: subsetter::GlyphRemapper,
    char_to_gid: HashMap<char, u16>,
}

impl FontFile {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        // SAFETY: the mapping is read-only and only lives while this export runs.
        let data = unsafe { Mmap::map(&file) }?;
        let face = Face::parse(&data, 0)
            .map_err(|e| Error::Font(format!("{}: {e}", path.display())))?;
        let units = face.units_per_em() as f32;
        let line_gap = face.line_gap() as f32;
        let ascender_ratio = face.ascender() as f32 / units;
        let line_h_ratio = (face.ascender() as f32 - face.descender() as f32 + line_gap) / units;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Embedded")
            .replace(|c: char| !c.is_ascii_alphanumeric(), "");
        drop(face);
        Ok(Self {
            name,
            data,
            units,
            ascender_ratio,
            line_h_ratio,
            remapper: subsetter::GlyphRemapper::new(),
            char_to_gid: HashMap::new(),
        })
    }

    fn face(&self) -> Result<Face<'_>> {
        Face::parse(&self.data, 0).map_err(|e| Error::Measure(format!("{}: {e}", self.name)))
    }

    pub(crate) fn text_width(&self, text: &str, size: f32) -> Result<f32> {
        let face = self.face()?;
        let notdef = face
            .glyph_hor_advance(ttf_parser::GlyphId(0))
            .unwrap_or(0) as f32;
        Ok(text
            .chars()
            .map(|ch| {
                face.glyph_index(ch)
                    .and_then(|gid| face.glyph_hor_advance(gid))
                    .map(|adv| adv as f32)
                    .unwrap_or(notdef)
                    / self.units
                    * size
            })
            .sum())
    }

    /// Encode text as big-endian 2-byte glyph IDs of the subset font.
    pub(crate) fn encode(&mut self, text: &str) -> Result<Vec<u8>> {
        let face = Face::parse(&self.data, 0)
            .map_err(|e| Error::Measure(format!("{}: {e}", self.name)))?;
        let mut out = Vec::with_capacity(text.len() * 2);
        for ch in text.chars() {
            let gid = match self.char_to_gid.get(&ch) {
                Some(&gid) => gid,
                None => {
                    let gid = face
                        .glyph_index(ch)
                        .map(|old| self.remapper.remap(old.0))
                        .unwrap_or(0);
                    self.char_to_gid.insert(ch, gid);
                    gid
                }
            };
            out.push((gid >> 8) as u8);
            out.push((gid & 0xFF) as u8);
        }
        Ok(out)
    }

    /// Write the subset as a CIDFont (Type0 composite) with Identity-H encoding.
    fn write(&self, pdf: &mut Pdf, font_ref: Ref, alloc: &mut impl FnMut() -> Ref) -> Result<()> {
        let face = self.face()?;
        let units = self.units;
        let ascent = face.ascender() as f32 / units * 1000.0;
        let descent = face.descender() as f32 / units * 1000.0;
        let cap_height = face
            .capital_height()
            .map(|h| h as f32 / units * 1000.0)
            .unwrap_or(700.0);
        let bb = face.global_bounding_box();
        let bbox = Rect::new(
            bb.x_min as f32 / units * 1000.0,
            bb.y_min as f32 / units * 1000.0,
            bb.x_max as f32 / units * 1000.0,
            bb.y_max as f32 / units * 1000.0,
        );

        let subset_data = subsetter::subset(&self.data, 0, &self.remapper).unwrap_or_else(|e| {
            log::warn!("Font subsetting failed for {}: {e} — embedding full font", self.name);
            self.data.to_vec()
        });
        let data_len = i32::try_from(subset_data.len())
            .map_err(|_| Error::Font(format!("{} is too large to embed", self.name)))?;

        let descriptor_ref = alloc();
        let data_ref = alloc();
        let cid_font_ref = alloc();
        let tounicode_ref = alloc();

        pdf.stream(data_ref, &subset_data)
            .pair(Name(b"Length1"), data_len);

        pdf.font_descriptor(descriptor_ref)
            .name(Name(self.name.as_bytes()))
            .flags(pdf_writer::types::FontFlags::NON_SYMBOLIC)
            .bbox(bbox)
            .italic_angle(0.0)
            .ascent(ascent)
            .descent(descent)
            .cap_height(cap_height)
            .stem_v(80.0)
            .font_file2(data_ref);

        let system_info = pdf_writer::types::SystemInfo {
            registry: pdf_writer::Str(b"Adobe"),
            ordering: pdf_writer::Str(b"Identity"),
            supplement: 0,
        };
        {
            let mut cid = pdf.cid_font(cid_font_ref);
            cid.subtype(pdf_writer::types::CidFontType::Type2);
            cid.base_font(Name(self.name.as_bytes()));
            cid.system_info(system_info);
            cid.font_descriptor(descriptor_ref);
            cid.default_width(0.0);
            cid.cid_to_gid_map_predefined(Name(b"Identity"));
            let mut gid_widths: Vec<(u16, f32)> = self
                .char_to_gid
                .iter()
                .filter_map(|(&ch, &new_gid)| {
                    face.glyph_index(ch)
                        .and_then(|gid| face.glyph_hor_advance(gid))
                        .map(|adv| (new_gid, adv as f32 / units * 1000.0))
                })
                .collect();
            gid_widths.sort_by_key(|&(gid, _)| gid);
            gid_widths.dedup_by_key(|&mut (gid, _)| gid);
            if !gid_widths.is_empty() {
                let mut w = cid.widths();
                for &(gid, width) in &gid_widths {
                    w.consecutive(gid, [width]);
                }
            }
        }

        let cmap_name = format!("{}-UTF16", self.name);
        let mut cmap = pdf_writer::types::UnicodeCmap::new(
            Name(cmap_name.as_bytes()),
            pdf_writer::types::SystemInfo {
                registry: pdf_writer::Str(b"Adobe"),
                ordering: pdf_writer::Str(b"Identity"),
                supplement: 0,
            },
        );
        for (&ch, &new_gid) in &self.char_to_gid {
            if new_gid != 0 {
                cmap.pair(new_gid, ch);
            }
        }
        let cmap_data = cmap.finish();
        pdf.stream(tounicode_ref, cmap_data.as_slice());

        pdf.type0_font(font_ref)
            .base_font(Name(self.name.as_bytes()))
            .encoding_predefined(Name(b"Identity-H"))
            .descendant_font(cid_font_ref)
            .to_unicode(tounicode_ref);
        Ok(())
    }
}

/// The font used for one weight: either a built-in Type1 face or a font file.
pub(crate) enum FontSlot {
    Builtin(FontWeight),
    File(Box<FontFile>),
}

impl FontSlot {
    /// Open `path` if given; any problem falls back to built-in Helvetica.
    pub(crate) fn load(path: Option<&Path>, weight: FontWeight) -> Self {
        let Some(path) = path else {
            return FontSlot::Builtin(weight);
        };
        let t0 = std::time::Instant::now();
        match FontFile::open(path) {
            Ok(font) => {
                log::debug!(
                    "load font: {} ({weight:?}) → {:.1}ms",
                    path.display(),
                    t0.elapsed().as_secs_f64() * 1000.0,
                );
                FontSlot::File(Box::new(font))
            }
            Err(e) => {
                log::warn!("Font not usable: {} ({e}) — using Helvetica", path.display());
                FontSlot::Builtin(weight)
            }
        }
    }

    pub(crate) fn text_width(&self, text: &str, size: f32) -> Result<f32> {
        match self {
            FontSlot::Builtin(weight) => Ok(builtin_text_width(text, size, *weight)),
            FontSlot::File(font) => font.text_width(text, size),
        }
    }

    pub(crate) fn encode(&mut self, text: &str) -> Result<Vec<u8>> {
        match self {
            FontSlot::Builtin(_) => Ok(to_winansi_bytes(text)),
            FontSlot::File(font) => font.encode(text),
        }
    }

    pub(crate) fn line_h_ratio(&self) -> f32 {
        match self {
            FontSlot::Builtin(_) => 1.2,
            FontSlot::File(font) => font.line_h_ratio,
        }
    }

    pub(crate) fn ascender_ratio(&self) -> f32 {
        match self {
            FontSlot::Builtin(_) => 0.8,
            FontSlot::File(font) => font.ascender_ratio,
        }
    }

    pub(crate) fn write(
        &self,
        pdf: &mut Pdf,
        font_ref: Ref,
        alloc: &mut impl FnMut() -> Ref,
    ) -> Result<()> {
        match self {
            FontSlot::Builtin(weight) => {
                let base: &[u8] = match weight {
                    FontWeight::Regular => b"Helvetica",
                    FontWeight::Bold => b"Helvetica-Bold",
                };
                pdf.type1_font(font_ref)
                    .base_font(Name(base))
                    .encoding_predefined(Name(b"WinAnsiEncoding"));
                Ok(())
            }
            FontSlot::File(font) => font.write(pdf, font_ref, alloc),
        }
    }
}
