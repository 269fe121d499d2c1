use std::collections::HashMap;
use std::sync::Arc;

use ab_glyph::{point, Font, FontArc, Glyph, PxScale, ScaleFont};
use gatejudge_cache::{intern_label, label, Atom};
use tiny_skia::{Color, Pixmap, PremultipliedColorU8};

/// Size and colour of a piece of on-screen text
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash)]
pub enum TextStyle {
    Title,
    Body,
    /// Focused row or question.
    Accent,
    /// Disabled controls.
    Dim,
    Small,
}

impl TextStyle {
    pub fn size_px(self) -> f32 {
        match self {
            TextStyle::Title => 34.0,
            TextStyle::Body | TextStyle::Accent | TextStyle::Dim => 22.0,
            TextStyle::Small => 17.0,
        }
    }

    pub fn color(self) -> Color {
        match self {
            TextStyle::Title | TextStyle::Body => Color::from_rgba8(255, 255, 255, 255),
            TextStyle::Accent => Color::from_rgba8(255, 214, 102, 255),
            TextStyle::Dim => Color::from_rgba8(110, 110, 110, 255),
            TextStyle::Small => Color::from_rgba8(190, 190, 190, 255),
        }
    }
}

/// Where a text pixmap is placed relative to a point
#[derive(Copy, Debug, Clone, PartialEq)]
pub enum Anchor {
    Center(f32, f32),
    /// Left edge at `x`, vertically centred on `y`.
    Left(f32, f32),
}

impl Anchor {
    pub fn top_left(self, width: u32, height: u32) -> (i32, i32) {
        let (x, y) = match self {
            Anchor::Center(x, y) => (x - width as f32 * 0.5, y - height as f32 * 0.5),
            Anchor::Left(x, y) => (x, y - height as f32 * 0.5),
        };
        (x.floor() as i32, y.floor() as i32)
    }
}

/// Rasterised labels keyed by interned text and style
pub(crate) struct TextCache {
    font: FontArc,
    map: HashMap<(Atom, TextStyle), Arc<Pixmap>>,
}

impl TextCache {
    pub(crate) fn new(font: FontArc) -> Self {
        Self {
            font,
            map: HashMap::new(),
        }
    }

    pub(crate) fn get_or_render(&mut self, text: &str, style: TextStyle) -> Option<Arc<Pixmap>> {
        let atom = label(intern_label(text))?;
        if let Some(p) = self.map.get(&(atom.clone(), style)) {
            return Some(Arc::clone(p));
        }
        let pm = Arc::new(render_text_pixmap(
            atom.as_ref(),
            style.size_px(),
            &self.font,
            style.color(),
        )?);
        self.map.insert((atom, style), Arc::clone(&pm));
        Some(pm)
    }

    /// For participant-typed text, which would only grow the cache.
    pub(crate) fn render_once(&self, text: &str, style: TextStyle) -> Option<Pixmap> {
        render_text_pixmap(text, style.size_px(), &self.font, style.color())
    }
}

/// Rasterise one line of text into a tightly cropped premultiplied pixmap.
/// Returns `None` when the text has no visible glyphs.
pub fn render_text_pixmap(
    text: &str,
    font_size: f32,
    font: &FontArc,
    color: Color,
) -> Option<Pixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);

    // layout with the baseline at the ascent
    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for g in &glyphs {
        if let Some(out) = font.outline_glyph(g.clone()) {
            let b = out.px_bounds();
            min_x = min_x.min(b.min.x);
            min_y = min_y.min(b.min.y);
            max_x = max_x.max(b.max.x);
            max_y = max_y.max(b.max.y);
        }
    }
    if min_x == f32::INFINITY {
        return None;
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    let mut pm = Pixmap::new(w, h)?;
    let stride = pm.width() as usize;
    let dst = pm.pixels_mut();

    let cu = [
        (color.red() * 255.0) as u8,
        (color.green() * 255.0) as u8,
        (color.blue() * 255.0) as u8,
        (color.alpha() * 255.0) as u8,
    ];

    for g in &glyphs {
        let Some(out) = font.outline_glyph(g.clone()) else {
            continue;
        };
        let bounds = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + bounds.min.x - min_x).floor() as i32;
            let iy = (y as f32 + bounds.min.y - min_y).floor() as i32;
            if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                return;
            }
            let i = iy as usize * stride + ix as usize;
            let Some(bg) = dst.get(i).copied() else {
                return;
            };

            let a_lin = (cov * cu[3] as f32 / 255.0).clamp(0.0, 1.0);
            let sa = (a_lin * 255.0) as u8;
            let sr = (cu[0] as f32 * a_lin) as u8;
            let sg = (cu[1] as f32 * a_lin) as u8;
            let sb = (cu[2] as f32 * a_lin) as u8;

            // source over, premultiplied
            let inv = 1.0 - (sa as f32 / 255.0);
            let a = sa.saturating_add((bg.alpha() as f32 * inv) as u8);
            let red = sr.saturating_add((bg.red() as f32 * inv) as u8).min(a);
            let green = sg.saturating_add((bg.green() as f32 * inv) as u8).min(a);
            let blue = sb.saturating_add((bg.blue() as f32 * inv) as u8).min(a);
            if let Some(px) = PremultipliedColorU8::from_rgba(red, green, blue, a) {
                dst[i] = px;
            }
        });
    }

    Some(pm)
}
