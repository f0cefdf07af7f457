use std::fs;
use std::path::Path;

use ab_glyph::{point, Font, FontVec, Glyph, PxScale, ScaleFont};
use anyhow::{anyhow, Context, Result};
use tiny_skia::{Color, Pixmap, PremultipliedColorU8};

/// Rasterizes words and text boxes with one font, size and colour.
pub struct TextRasterizer {
    font: FontVec,
    size_px: f32,
    color: Color,
}

impl TextRasterizer {
    pub fn new(font: FontVec, size_px: f32, color: Color) -> Self {
        Self {
            font,
            size_px,
            color,
        }
    }

    pub fn load(path: &Path, size_px: f32, color: Color) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|_| anyhow!("{} is not a TrueType/OpenType font", path.display()))?;
        Ok(Self::new(font, size_px, color))
    }

    pub fn size_px(&self) -> f32 {
        self.size_px
    }

    /// Advance width of a single line
    pub fn line_width(&self, text: &str) -> f32 {
        let sf = self.font.as_scaled(PxScale::from(self.size_px));
        let mut width = 0.0;
        let mut prev = None;
        for ch in text.chars() {
            let id = sf.glyph_id(ch);
            if let Some(p) = prev {
                width += sf.kern(p, id);
            }
            width += sf.h_advance(id);
            prev = Some(id);
        }
        width
    }

    /// Splits on explicit newlines, then greedily on spaces so no line is
    /// wider than `max_width` (a single over-long word keeps its own line)
    pub fn wrap(&self, text: &str, max_width: f32) -> Vec<String> {
        let mut lines = Vec::new();
        for paragraph in text.split('\n') {
            let mut current = String::new();
            for word in paragraph.split_whitespace() {
                if current.is_empty() {
                    current.push_str(word);
                    continue;
                }
                let candidate = format!("{current} {word}");
                if self.line_width(&candidate) > max_width {
                    lines.push(std::mem::replace(&mut current, word.to_string()));
                } else {
                    current = candidate;
                }
            }
            lines.push(current);
        }
        lines
    }

    /// One line of text, tightly cropped
    pub fn render_line(&self, text: &str) -> Result<Pixmap> {
        rasterize(&self.font, self.size_px, &[text], self.color)
    }

    /// Multi-line block, each line centred, wrapped at `max_width`
    pub fn render_box(&self, text: &str, max_width: f32) -> Result<Pixmap> {
        let lines = self.wrap(text, max_width);
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        rasterize(&self.font, self.size_px, &refs, self.color)
    }
}

fn rasterize<F: Font>(font: &F, font_size: f32, lines: &[&str], color: Color) -> Result<Pixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);
    let line_height = sf.ascent() - sf.descent() + sf.line_gap();

    // 1) layout: baselines stacked from the ascent, lines centred in the block
    let mut laid_out: Vec<(f32, Vec<Glyph>)> = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        let baseline = sf.ascent() + i as f32 * line_height;
        let mut pen_x = 0.0f32;
        let mut glyphs = Vec::<Glyph>::new();
        for ch in line.chars() {
            let id = font.glyph_id(ch);
            if let Some(prev) = glyphs.last() {
                pen_x += sf.kern(prev.id, id);
            }
            glyphs.push(Glyph {
                id,
                scale,
                position: point(pen_x, baseline),
            });
            pen_x += sf.h_advance(id);
        }
        laid_out.push((pen_x, glyphs));
    }
    let block_width = laid_out.iter().map(|(w, _)| *w).fold(0.0, f32::max);
    let glyphs: Vec<Glyph> = laid_out
        .into_iter()
        .flat_map(|(w, glyphs)| {
            let offset = (block_width - w) * 0.5;
            glyphs.into_iter().map(move |mut g| {
                g.position.x += offset;
                g
            })
        })
        .collect();

    // 2) union pixel bounds from outlined glyphs
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    let outlines: Vec<_> = glyphs
        .into_iter()
        .filter_map(|g| font.outline_glyph(g))
        .collect();
    for out in &outlines {
        let b = out.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }

    // whitespace only
    if outlines.is_empty() {
        return Pixmap::new(1, 1).ok_or_else(|| anyhow!("cannot allocate text pixmap"));
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    let mut pm =
        Pixmap::new(w, h).ok_or_else(|| anyhow!("cannot allocate {w}x{h} text pixmap"))?;

    // 3) rasterize with premultiplied alpha blending
    let stride = pm.width() as usize;
    let dst = pm.pixels_mut();
    let cu = [
        (color.red() * 255.0) as u8,
        (color.green() * 255.0) as u8,
        (color.blue() * 255.0) as u8,
        (color.alpha() * 255.0) as u8,
    ];

    for out in &outlines {
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + b.min.x - min_x).floor() as i32;
            let iy = (y as f32 + b.min.y - min_y).floor() as i32;
            if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                return;
            }
            let i = iy as usize * stride + ix as usize;

            let a_lin = (cov * cu[3] as f32 / 255.0).clamp(0.0, 1.0);
            let sa = (a_lin * 255.0) as u8;
            let bg = dst[i];
            // Porter-Duff over: out = src + bg * (1 - src.a)
            let inv = 1.0 - (sa as f32 / 255.0);
            let blend = |s: u8, d: u8| ((s as f32 * a_lin) as u8).saturating_add((d as f32 * inv) as u8);
            let a = sa.saturating_add((bg.alpha() as f32 * inv) as u8);
            if let Some(px) = PremultipliedColorU8::from_rgba(
                blend(cu[0], bg.red()).min(a),
                blend(cu[1], bg.green()).min(a),
                blend(cu[2], bg.blue()).min(a),
                a,
            ) {
                dst[i] = px;
            }
        });
    }

    Ok(pm)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Any font the test machine happens to have
    fn system_rasterizer() -> Option<TextRasterizer> {
        [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "/Library/Fonts/Arial.ttf",
            "C:\\Windows\\Fonts\\arial.ttf",
        ]
        .iter()
        .find_map(|p| TextRasterizer::load(Path::new(p), 48.0, Color::BLACK).ok())
    }

    #[test]
    fn missing_font_is_an_error() {
        let err = TextRasterizer::load(Path::new("fonts/NOPE.TTF"), 48.0, Color::BLACK);
        assert!(err.is_err());
    }

    #[test]
    fn wrap_respects_width_and_newlines() {
        let Some(r) = system_rasterizer() else {
            return;
        };
        let lines = r.wrap("un deux trois quatre\ncinq", r.line_width("un deux") + 1.0);
        assert_eq!(lines, vec!["un deux", "trois", "quatre", "cinq"]);
        let single = r.wrap("anticonstitutionnellement", 10.0);
        assert_eq!(single, vec!["anticonstitutionnellement"]);
    }

    #[test]
    fn rendered_text_has_ink_and_box_is_taller() {
        let Some(r) = system_rasterizer() else {
            return;
        };
        let word = r.render_line("Bonjour").unwrap();
        assert!(word.width() > word.height());
        assert!(word.pixels().iter().any(|p| p.alpha() > 0));
        let block = r.render_box("Bonjour\nà tous", 2000.0).unwrap();
        assert!(block.height() > word.height() * 3 / 2);
        let blank = r.render_line("   ").unwrap();
        assert_eq!((blank.width(), blank.height()), (1, 1));
    }
}
