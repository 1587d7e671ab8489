use std::path::Path;

use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str, TextStr};

use crate::backend::{
    DocumentInfo, FontWeight, ImageSpec, LineSpec, RectSpec, RenderBackend, TextAlign, TextSpec,
};
use crate::error::{Error, Result};
use crate::fonts::FontSlot;

enum ImageData {
    Jpeg {
        data: Vec<u8>,
        width: u32,
        height: u32,
    },
    Rgb {
        compressed_rgb: Vec<u8>,
        compressed_alpha: Option<Vec<u8>>,
        width: u32,
        height: u32,
    },
}

struct PendingImage {
    pdf_name: String,
    data: ImageData,
}

/// `RenderBackend` that builds one content stream per page and serializes
/// the whole document with `pdf-writer` in `finish`.
///
/// Content streams stay open until `finish`, so any page can be selected
/// again and appended to.
pub struct PdfBackend {
    width: f32,
    height: f32,
    pages: Vec<Content>,
    current: Option<usize>,
    regular: FontSlot,
    bold: FontSlot,
    alpha_states: Vec<f32>,
    images: Vec<PendingImage>,
}

const REGULAR_FONT: &[u8] = b"F1";
const BOLD_FONT: &[u8] = b"F2";

fn set_fill(content: &mut Content, [r, g, b]: [u8; 3]) {
    content.set_fill_rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
}

fn set_stroke(content: &mut Content, [r, g, b]: [u8; 3]) {
    content.set_stroke_rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
}

impl PdfBackend {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            pages: Vec::new(),
            current: None,
            regular: FontSlot::Builtin(FontWeight::Regular),
            bold: FontSlot::Builtin(FontWeight::Bold),
            alpha_states: Vec::new(),
            images: Vec::new(),
        }
    }

    /// Use TrueType files for body and bold text. Missing or unreadable files
    /// keep the built-in Helvetica faces.
    pub fn with_fonts(mut self, regular: Option<&Path>, bold: Option<&Path>) -> Self {
        self.regular = FontSlot::load(regular, FontWeight::Regular);
        self.bold = FontSlot::load(bold.or(regular), FontWeight::Bold);
        self
    }

    fn font(&self, weight: FontWeight) -> &FontSlot {
        match weight {
            FontWeight::Regular => &self.regular,
            FontWeight::Bold => &self.bold,
        }
    }

    fn flip(&self, y: f32) -> f32 {
        self.height - y
    }

    /// ExtGState resource name for a fill/stroke alpha, quantized to 1%.
    fn alpha_state(&mut self, alpha: f32) -> String {
        let alpha = (alpha * 100.0).round() / 100.0;
        let idx = match self.alpha_states.iter().position(|&a| a == alpha) {
            Some(idx) => idx,
            None => {
                self.alpha_states.push(alpha);
                self.alpha_states.len() - 1
            }
        };
        format!("GS{}", idx + 1)
    }

    fn content(&mut self) -> Result<&mut Content> {
        let idx = self.current.ok_or(Error::NoActivePage)?;
        Ok(&mut self.pages[idx])
    }

    fn register_image(&mut self, bytes: &[u8]) -> Result<String> {
        let format = image::guess_format(bytes).map_err(|e| Error::Image(e.to_string()))?;
        let data = match format {
            image::ImageFormat::Jpeg => {
                let decoded =
                    image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg)
                        .map_err(|e| Error::Image(e.to_string()))?;
                ImageData::Jpeg {
                    data: bytes.to_vec(),
                    width: decoded.width(),
                    height: decoded.height(),
                }
            }
            image::ImageFormat::Png => {
                let decoded = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
                    .map_err(|e| Error::Image(e.to_string()))?;
                let rgba: image::RgbaImage = decoded.to_rgba8();
                let (width, height) = (rgba.width(), rgba.height());
                let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);
                let rgb_data: Vec<u8> = rgba
                    .pixels()
                    .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
                    .collect();
                let compressed_alpha = has_alpha.then(|| {
                    let alpha_data: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
                    miniz_oxide::deflate::compress_to_vec_zlib(&alpha_data, 6)
                });
                ImageData::Rgb {
                    compressed_rgb: miniz_oxide::deflate::compress_to_vec_zlib(&rgb_data, 6),
                    compressed_alpha,
                    width,
                    height,
                }
            }
            other => {
                return Err(Error::Image(format!("unsupported image format {other:?}")));
            }
        };
        let pdf_name = format!("Im{}", self.images.len() + 1);
        self.images.push(PendingImage {
            pdf_name: pdf_name.clone(),
            data,
        });
        Ok(pdf_name)
    }
}

impl RenderBackend for PdfBackend {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn current_page(&self) -> Option<usize> {
        self.current
    }

    fn add_page(&mut self) -> Result<usize> {
        self.pages.push(Content::new());
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
        if spec.text.trim().is_empty() {
            return Ok(());
        }
        let width = self.measure_text(&spec.text, spec.size, spec.weight)?;
        let shift = match spec.align {
            TextAlign::Left => 0.0,
            TextAlign::Center => width / 2.0,
            TextAlign::Right => width,
        };
        let (sin, cos) = spec.rotation.to_radians().sin_cos();
        let x = spec.x - shift * cos;
        let y = self.flip(spec.y) - shift * sin;

        let (bytes, font_name) = match spec.weight {
            FontWeight::Regular => (self.regular.encode(&spec.text)?, REGULAR_FONT),
            FontWeight::Bold => (self.bold.encode(&spec.text)?, BOLD_FONT),
        };
        let gs = (spec.opacity < 1.0).then(|| self.alpha_state(spec.opacity));

        let content = self.content()?;
        content.save_state();
        if let Some(gs) = &gs {
            content.set_parameters(Name(gs.as_bytes()));
        }
        set_fill(content, spec.color);
        content
            .begin_text()
            .set_font(Name(font_name), spec.size)
            .set_text_matrix([cos, sin, -sin, cos, x, y])
            .show(Str(&bytes))
            .end_text();
        content.restore_state();
        Ok(())
    }

    fn draw_rect(&mut self, spec: &RectSpec) -> Result<()> {
        let bottom = self.flip(spec.y + spec.height);
        let content = self.content()?;
        content.save_state();
        if let Some(color) = spec.fill {
            set_fill(content, color);
        }
        if let Some(color) = spec.stroke {
            set_stroke(content, color);
            content.set_line_width(spec.line_width);
        }
        content.rect(spec.x, bottom, spec.width, spec.height);
        match (spec.fill.is_some(), spec.stroke.is_some()) {
            (true, true) => {
                content.fill_nonzero_and_stroke();
            }
            (true, false) => {
                content.fill_nonzero();
            }
            (false, true) => {
                content.stroke();
            }
            (false, false) => {
                content.end_path();
            }
        }
        content.restore_state();
        Ok(())
    }

    fn draw_line(&mut self, spec: &LineSpec) -> Result<()> {
        let (y1, y2) = (self.flip(spec.y1), self.flip(spec.y2));
        let content = self.content()?;
        content.save_state();
        content.set_line_width(spec.width);
        set_stroke(content, spec.color);
        content.move_to(spec.x1, y1);
        content.line_to(spec.x2, y2);
        content.stroke();
        content.restore_state();
        Ok(())
    }

    fn draw_image(&mut self, spec: &ImageSpec) -> Result<()> {
        let pdf_name = self.register_image(&spec.data)?;
        let bottom = self.flip(spec.y + spec.height);
        let content = self.content()?;
        content.save_state();
        content.transform([spec.width, 0.0, 0.0, spec.height, spec.x, bottom]);
        content.x_object(Name(pdf_name.as_bytes()));
        content.restore_state();
        Ok(())
    }

    fn measure_text(&self, text: &str, size: f32, weight: FontWeight) -> Result<f32> {
        self.font(weight).text_width(text, size)
    }

    fn line_height(&self, size: f32) -> f32 {
        size * self.regular.line_h_ratio()
    }

    fn ascent(&self, size: f32) -> f32 {
        size * self.regular.ascender_ratio()
    }

    fn finish(self, info: &DocumentInfo) -> Result<Vec<u8>> {
        let t0 = std::time::Instant::now();
        let mut pdf = Pdf::new();
        let mut next_id = 1i32;
        let mut alloc = || {
            let r = Ref::new(next_id);
            next_id += 1;
            r
        };

        let catalog_id = alloc();
        let pages_id = alloc();
        let info_id = alloc();

        let regular_ref = alloc();
        let bold_ref = alloc();
        self.regular.write(&mut pdf, regular_ref, &mut alloc)?;
        self.bold.write(&mut pdf, bold_ref, &mut alloc)?;

        let gs_refs: Vec<(String, Ref)> = self
            .alpha_states
            .iter()
            .enumerate()
            .map(|(i, &alpha)| {
                let gs_ref = alloc();
                pdf.ext_graphics(gs_ref)
                    .non_stroking_alpha(alpha)
                    .stroking_alpha(alpha);
                (format!("GS{}", i + 1), gs_ref)
            })
            .collect();

        let mut image_refs: Vec<(String, Ref)> = Vec::with_capacity(self.images.len());
        for image in &self.images {
            let xobj_ref = alloc();
            match &image.data {
                ImageData::Jpeg { data, width, height } => {
                    let mut xobj = pdf.image_xobject(xobj_ref, data);
                    xobj.filter(Filter::DctDecode);
                    xobj.width(*width as i32);
                    xobj.height(*height as i32);
                    xobj.color_space().device_rgb();
                    xobj.bits_per_component(8);
                }
                ImageData::Rgb {
                    compressed_rgb,
                    compressed_alpha,
                    width,
                    height,
                } => {
                    let smask_ref = compressed_alpha.as_ref().map(|alpha| {
                        let mask_ref = alloc();
                        let mut mask = pdf.image_xobject(mask_ref, alpha);
                        mask.filter(Filter::FlateDecode);
                        mask.width(*width as i32);
                        mask.height(*height as i32);
                        mask.color_space().device_gray();
                        mask.bits_per_component(8);
                        mask_ref
                    });
                    let mut xobj = pdf.image_xobject(xobj_ref, compressed_rgb);
                    xobj.filter(Filter::FlateDecode);
                    xobj.width(*width as i32);
                    xobj.height(*height as i32);
                    xobj.color_space().device_rgb();
                    xobj.bits_per_component(8);
                    if let Some(mask_ref) = smask_ref {
                        xobj.s_mask(mask_ref);
                    }
                }
            }
            image_refs.push((image.pdf_name.clone(), xobj_ref));
        }

        let n = self.pages.len();
        let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
        let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();

        for (i, c) in self.pages.into_iter().enumerate() {
            let raw = c.finish();
            let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
            pdf.stream(content_ids[i], &compressed)
                .filter(Filter::FlateDecode);
        }

        pdf.catalog(catalog_id).pages(pages_id);
        pdf.pages(pages_id)
            .kids(page_ids.iter().copied())
            .count(n as i32);

        for i in 0..n {
            let mut page = pdf.page(page_ids[i]);
            page.media_box(Rect::new(0.0, 0.0, self.width, self.height))
                .parent(pages_id)
                .contents(content_ids[i]);
            let mut resources = page.resources();
            resources
                .fonts()
                .pair(Name(REGULAR_FONT), regular_ref)
                .pair(Name(BOLD_FONT), bold_ref);
            if !gs_refs.is_empty() {
                let mut states = resources.ext_g_states();
                for (name, gs_ref) in &gs_refs {
                    states.pair(Name(name.as_bytes()), *gs_ref);
                }
            }
            if !image_refs.is_empty() {
                let mut xobjects = resources.x_objects();
                for (name, xobj_ref) in &image_refs {
                    xobjects.pair(Name(name.as_bytes()), *xobj_ref);
                }
            }
        }

        {
            let mut doc_info = pdf.document_info(info_id);
            if !info.title.is_empty() {
                doc_info.title(TextStr(&info.title));
            }
            if !info.subject.is_empty() {
                doc_info.subject(TextStr(&info.subject));
            }
            if !info.author.is_empty() {
                doc_info.author(TextStr(&info.author));
            }
            if !info.creator.is_empty() {
                doc_info.creator(TextStr(&info.creator));
            }
            doc_info.producer(TextStr(concat!("capdoc-pdf ", env!("CARGO_PKG_VERSION"))));
        }

        let bytes = pdf.finish();
        log::info!(
            "PDF assembly: {} pages, {} images, {} opacity states → {:.1}ms ({} bytes)",
            n,
            image_refs.len(),
            gs_refs.len(),
            t0.elapsed().as_secs_f64() * 1000.0,
            bytes.len(),
        );
        Ok(bytes)
    }
}
