use crate::backend::{DrawOp, FontWeight, LineSpec, RectSpec, RenderBackend, TextSpec};
use crate::error::Result;
use crate::settings::Settings;

const TEXT: [u8; 3] = [0x1F, 0x29, 0x37];
pub(crate) const MUTED: [u8; 3] = [0x6B, 0x72, 0x80];
pub(crate) const HAIRLINE: [u8; 3] = [0xD1, 0xD5, 0xDB];
const PANEL: [u8; 3] = [0xF3, 0xF4, 0xF6];
pub(crate) const WHITE: [u8; 3] = [0xFF, 0xFF, 0xFF];

const PARAGRAPH_GAP: f32 = 6.0;
const BULLET_INDENT: f32 = 14.0;
const BOX_PADDING: f32 = 8.0;
const CELL_PADDING: f32 = 4.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Theme {
    pub body_size: f32,
    pub heading_sizes: [f32; 3],
    pub text: [u8; 3],
    pub muted: [u8; 3],
    pub primary: [u8; 3],
    pub secondary: [u8; 3],
    pub accent: [u8; 3],
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl Theme {
    pub fn from_settings(settings: &Settings) -> Self {
        let typo = &settings.typography;
        Self {
            body_size: typo.body_size(),
            heading_sizes: [
                typo.heading_size(1),
                typo.heading_size(2),
                typo.heading_size(3),
            ],
            text: TEXT,
            muted: MUTED,
            primary: settings.branding.primary(),
            secondary: settings.branding.secondary(),
            accent: settings.branding.accent(),
        }
    }

    pub fn heading_size(&self, level: u8) -> f32 {
        self.heading_sizes[(level.max(1) as usize - 1).min(2)]
    }
}

/// An atomic unit of known height. Ops are relative to the block's top-left
/// corner.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Block {
    height: f32,
    ops: Vec<DrawOp>,
}

impl Block {
    pub fn new(height: f32, ops: Vec<DrawOp>) -> Self {
        Self {
            height: height.max(0.0),
            ops,
        }
    }

    pub fn spacer(height: f32) -> Self {
        Self::new(height, Vec::new())
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }
}

/// Greedy word wrap to `max_width`. Explicit newlines start a new line and
/// words wider than a whole line are split between characters.
pub fn wrap_text<B: RenderBackend + ?Sized>(
    backend: &B,
    text: &str,
    size: f32,
    weight: FontWeight,
    max_width: f32,
) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for raw_line in text.lines() {
        let mut current = String::new();
        for word in raw_line.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if backend.measure_text(&candidate, size, weight)? <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if backend.measure_text(word, size, weight)? <= max_width {
                current = word.to_string();
                continue;
            }
            for ch in word.chars() {
                current.push(ch);
                if current.chars().count() > 1
                    && backend.measure_text(&current, size, weight)? > max_width
                {
                    current.pop();
                    lines.push(std::mem::replace(&mut current, ch.to_string()));
                }
            }
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    Ok(lines)
}

/// A single line of text, no wrapping.
pub fn text_line<B: RenderBackend + ?Sized>(
    backend: &B,
    text: &str,
    size: f32,
    weight: FontWeight,
    color: [u8; 3],
) -> Block {
    let op = TextSpec::new(text, 0.0, backend.ascent(size), size)
        .weight(weight)
        .color(color);
    Block::new(backend.line_height(size), vec![DrawOp::Text(op)])
}

pub fn heading<B: RenderBackend + ?Sized>(
    backend: &B,
    text: &str,
    level: u8,
    theme: &Theme,
    width: f32,
) -> Result<Block> {
    let size = theme.heading_size(level);
    let (space_before, color) = match level {
        1 => (10.0, theme.primary),
        2 => (8.0, theme.text),
        _ => (6.0, theme.text),
    };
    let line_h = backend.line_height(size);
    let mut ops = Vec::new();
    let mut y = space_before;
    for line in wrap_text(backend, text, size, FontWeight::Bold, width)? {
        ops.push(DrawOp::Text(
            TextSpec::new(line, 0.0, y + backend.ascent(size), size)
                .bold()
                .color(color),
        ));
        y += line_h;
    }
    if level == 1 {
        y += 2.0;
        ops.push(DrawOp::Line(LineSpec {
            x1: 0.0,
            y1: y,
            x2: width,
            y2: y,
            color: theme.accent,
            width: 1.5,
        }));
        y += 2.0;
    }
    Ok(Block::new(y + 4.0, ops))
}

/// One block per wrapped line, followed by a paragraph gap.
pub fn paragraph<B: RenderBackend + ?Sized>(
    backend: &B,
    text: &str,
    theme: &Theme,
    width: f32,
) -> Result<Vec<Block>> {
    let mut blocks: Vec<Block> =
        wrap_text(backend, text, theme.body_size, FontWeight::Regular, width)?
            .into_iter()
            .map(|line| text_line(backend, &line, theme.body_size, FontWeight::Regular, theme.text))
            .collect();
    blocks.push(Block::spacer(PARAGRAPH_GAP));
    Ok(blocks)
}

pub fn bullet_list<B: RenderBackend + ?Sized>(
    backend: &B,
    items: &[String],
    theme: &Theme,
    width: f32,
) -> Result<Vec<Block>> {
    let size = theme.body_size;
    let mut blocks = Vec::new();
    for item in items {
        let lines = wrap_text(backend, item, size, FontWeight::Regular, width - BULLET_INDENT)?;
        for (i, line) in lines.into_iter().enumerate() {
            let baseline = backend.ascent(size);
            let mut ops = vec![DrawOp::Text(
                TextSpec::new(line, BULLET_INDENT, baseline, size).color(theme.text),
            )];
            if i == 0 {
                ops.push(DrawOp::Text(
                    TextSpec::new("\u{2022}", 4.0, baseline, size).color(theme.accent),
                ));
            }
            blocks.push(Block::new(backend.line_height(size), ops));
        }
    }
    blocks.push(Block::spacer(PARAGRAPH_GAP));
    Ok(blocks)
}

fn hline(x1: f32, x2: f32, y: f32) -> DrawOp {
    DrawOp::Line(LineSpec {
        x1,
        y1: y,
        x2,
        y2: y,
        color: HAIRLINE,
        width: 0.5,
    })
}

/// A shaded panel with a bold label over wrapped body text, one block per
/// line. Each block draws its own slice of the panel; only the first and last
/// carry the top and bottom padding and border.
pub fn labeled_box<B: RenderBackend + ?Sized>(
    backend: &B,
    label: &str,
    body: &str,
    theme: &Theme,
    width: f32,
) -> Result<Vec<Block>> {
    let size = theme.body_size;
    let line_h = backend.line_height(size);
    let inner = width - 2.0 * BOX_PADDING - 3.0;
    let mut lines: Vec<(String, FontWeight)> =
        wrap_text(backend, label, size, FontWeight::Bold, inner)?
            .into_iter()
            .map(|line| (line, FontWeight::Bold))
            .collect();
    if !body.trim().is_empty() {
        lines.extend(
            wrap_text(backend, body, size, FontWeight::Regular, inner)?
                .into_iter()
                .map(|line| (line, FontWeight::Regular)),
        );
    }

    let last = lines.len() - 1;
    let x = 3.0 + BOX_PADDING;
    let mut blocks = Vec::with_capacity(lines.len() + 1);
    for (i, (line, weight)) in lines.into_iter().enumerate() {
        let top = if i == 0 { BOX_PADDING } else { 0.0 };
        let bottom = if i == last { BOX_PADDING } else { 0.0 };
        let slice_h = top + line_h + bottom;
        let mut ops = vec![
            DrawOp::Rect(RectSpec::filled(0.0, 0.0, width, slice_h, PANEL)),
            DrawOp::Rect(RectSpec::filled(0.0, 0.0, 3.0, slice_h, theme.accent)),
            DrawOp::Line(LineSpec {
                x1: width,
                y1: 0.0,
                x2: width,
                y2: slice_h,
                color: HAIRLINE,
                width: 0.5,
            }),
        ];
        if i == 0 {
            ops.push(hline(3.0, width, 0.0));
        }
        if i == last {
            ops.push(hline(3.0, width, slice_h));
        }
        ops.push(DrawOp::Text(
            TextSpec::new(line, x, top + backend.ascent(size), size)
                .weight(weight)
                .color(theme.text),
        ));
        blocks.push(Block::new(slice_h, ops));
    }
    blocks.push(Block::spacer(PARAGRAPH_GAP));
    Ok(blocks)
}

/// Pill-shaped labels laid out left to right, wrapping onto extra rows.
pub fn badge_row<B: RenderBackend + ?Sized>(
    backend: &B,
    badges: &[String],
    theme: &Theme,
    width: f32,
) -> Result<Block> {
    let size = theme.body_size * 0.85;
    let pill_h = backend.line_height(size) + 4.0;
    let gap = 6.0;
    let mut ops = Vec::new();
    let (mut x, mut y) = (0.0f32, 0.0f32);
    for (i, badge) in badges.iter().filter(|b| !b.trim().is_empty()).enumerate() {
        let pill_w = backend.measure_text(badge, size, FontWeight::Bold)? + 12.0;
        if x > 0.0 && x + pill_w > width {
            x = 0.0;
            y += pill_h + gap;
        }
        let fill = if i == 0 { theme.primary } else { theme.secondary };
        ops.push(DrawOp::Rect(RectSpec::filled(x, y, pill_w, pill_h, fill)));
        ops.push(DrawOp::Text(
            TextSpec::new(badge.as_str(), x + 6.0, y + 2.0 + backend.ascent(size), size)
                .bold()
                .color(WHITE),
        ));
        x += pill_w + gap;
    }
    if ops.is_empty() {
        return Ok(Block::spacer(0.0));
    }
    Ok(Block::new(y + pill_h + PARAGRAPH_GAP, ops))
}

/// Table rows as blocks. Column widths are fractions of `width`; cells wrap
/// and a row comes back as one block per line of its tallest cell.
pub fn table<B: RenderBackend + ?Sized>(
    backend: &B,
    header: Option<&[String]>,
    rows: &[Vec<String>],
    fractions: &[f32],
    theme: &Theme,
    width: f32,
) -> Result<Vec<Block>> {
    let total: f32 = fractions.iter().sum::<f32>().max(f32::EPSILON);
    let col_widths: Vec<f32> = fractions.iter().map(|f| f / total * width).collect();

    let mut blocks = Vec::with_capacity(rows.len() + 2);
    if let Some(header) = header {
        blocks.extend(table_row(backend, header, &col_widths, theme, true)?);
    }
    for row in rows {
        blocks.extend(table_row(backend, row, &col_widths, theme, false)?);
    }
    blocks.push(Block::spacer(PARAGRAPH_GAP));
    Ok(blocks)
}

fn table_row<B: RenderBackend + ?Sized>(
    backend: &B,
    cells: &[String],
    col_widths: &[f32],
    theme: &Theme,
    is_header: bool,
) -> Result<Vec<Block>> {
    let size = theme.body_size;
    let weight = if is_header {
        FontWeight::Bold
    } else {
        FontWeight::Regular
    };
    let line_h = backend.line_height(size);
    let mut wrapped = Vec::with_capacity(col_widths.len());
    for (i, &col_w) in col_widths.iter().enumerate() {
        let text = cells.get(i).map(String::as_str).unwrap_or("");
        wrapped.push(wrap_text(backend, text, size, weight, col_w - 2.0 * CELL_PADDING)?);
    }
    let max_lines = wrapped.iter().map(Vec::len).max().unwrap_or(1).max(1);
    let row_w: f32 = col_widths.iter().sum();
    let color = if is_header { WHITE } else { theme.text };

    let mut blocks = Vec::with_capacity(max_lines);
    for k in 0..max_lines {
        let top = if k == 0 { CELL_PADDING } else { 0.0 };
        let bottom = if k + 1 == max_lines { CELL_PADDING } else { 0.0 };
        let slice_h = top + line_h + bottom;

        let mut ops = Vec::new();
        if is_header {
            ops.push(DrawOp::Rect(RectSpec::filled(0.0, 0.0, row_w, slice_h, theme.primary)));
        }
        let mut x = 0.0;
        for (lines, &col_w) in wrapped.iter().zip(col_widths) {
            if let Some(line) = lines.get(k) {
                ops.push(DrawOp::Text(
                    TextSpec::new(line.as_str(), x + CELL_PADDING, top + backend.ascent(size), size)
                        .weight(weight)
                        .color(color),
                ));
            }
            x += col_w;
        }
        if k + 1 == max_lines {
            ops.push(hline(0.0, row_w, slice_h));
        }
        blocks.push(Block::new(slice_h, ops));
    }
    Ok(blocks)
}

pub fn rule(width: f32, color: [u8; 3]) -> Block {
    Block::new(
        12.0,
        vec![DrawOp::Line(LineSpec {
            x1: 0.0,
            y1: 6.0,
            x2: width,
            y2: 6.0,
            color,
            width: 0.75,
        })],
    )
}
