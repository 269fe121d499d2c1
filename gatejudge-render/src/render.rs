use ab_glyph::FontArc;
use anyhow::{anyhow, bail, Result};
use bytemuck::{cast_slice, cast_slice_mut};
use gatejudge_core::{
    ButtonView, DemographicsField, DemographicsView, PageView, QuestionView, ScreenView, TrialView,
};
use gatejudge_timing::{FrameStats as TimingStats, MonotonicTimer, Timer};
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;
use tiny_skia::{Color, FilterQuality, Paint, Pixmap, PixmapPaint, Rect, Transform};

use crate::layout::{self, Bounds, TrialLayout, BUTTON_SIZE, SLIDER_THUMB};
use crate::text::{Anchor, TextCache, TextStyle};

const BACKGROUND: [u8; 4] = [0, 0, 0, 255];
const PANEL: [u8; 4] = [28, 28, 28, 255];
const TRACK: [u8; 4] = [110, 110, 110, 255];
const THUMB: [u8; 4] = [255, 214, 102, 255];
const PROGRESS: [u8; 4] = [90, 160, 255, 255];
const BUTTON_FILL: [u8; 4] = [60, 60, 60, 255];
const BUTTON_FILL_DISABLED: [u8; 4] = [30, 30, 30, 255];
const BORDER: [u8; 4] = [200, 200, 200, 255];
const BORDER_DISABLED: [u8; 4] = [70, 70, 70, 255];
const FOCUS: [u8; 4] = [255, 214, 102, 255];

/// Which control keyboard input currently goes to
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    None,
    Question(usize),
    Field(DemographicsField),
}

/// Everything drawn in one frame
pub struct Frame<'a, 'v> {
    pub view: &'a ScreenView<'v>,
    pub focus: Focus,
    /// Current clip frame, if any.
    pub video: Option<&'a Pixmap>,
    /// `(completed, total)` trials.
    pub progress: Option<(usize, usize)>,
}

pub struct FrameStats {
    pub clear: Duration,
    pub draw: Duration,
    pub copy: Duration,
    pub total: Duration,
    pub dirty_count: usize,
}

pub trait Renderer {
    fn clear_dirty(&mut self, dirty: &[Rect]);
    fn blit_pixmap(&mut self, pixmap: &Pixmap, top_left: (i32, i32));
    /// Returns the drawn width in pixels, 0 when nothing was drawn.
    fn draw_text(&mut self, text: &str, style: TextStyle, anchor: Anchor) -> u32;
}

pub trait ScreenRenderer: Renderer {
    fn render_screen(&mut self, frame: &Frame<'_, '_>) -> Result<()>;
}

pub struct SkiaRenderer {
    width: u32,
    height: u32,
    center: (f32, f32),

    text: Option<TextCache>,

    canvas: Pixmap,
    dirty_regions: Vec<Rect>,
    first_frame: bool,

    component_timers: HashMap<&'static str, RefCell<MonotonicTimer>>,
    clear_buffer: Vec<u8>,
}

fn solid(width: u32, height: u32) -> Vec<u8> {
    BACKGROUND
        .into_iter()
        .cycle()
        .take((width * height * 4) as usize)
        .collect()
}

fn paint(color: [u8; 4]) -> Paint<'static> {
    let mut p = Paint::default();
    p.anti_alias = false;
    p.set_color(Color::from_rgba8(color[0], color[1], color[2], color[3]));
    p
}

impl SkiaRenderer {
    /// Without a font every text call is a no-op; shapes and video still draw.
    pub fn new(width: u32, height: u32, font: Option<FontArc>) -> Result<Self> {
        let mut canvas = Pixmap::new(width, height)
            .ok_or_else(|| anyhow!("cannot allocate a {width}x{height} canvas"))?;
        canvas.fill(Color::from_rgba8(0, 0, 0, 255));

        Ok(SkiaRenderer {
            width,
            height,
            center: (width as f32 / 2.0, height as f32 / 2.0),
            text: font.map(TextCache::new),
            canvas,
            dirty_regions: Vec::with_capacity(64),
            first_frame: true,
            component_timers: ["draw", "clear", "copy"]
                .iter()
                .map(|&k| (k, RefCell::new(MonotonicTimer::new())))
                .collect(),
            clear_buffer: solid(width, height),
        })
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) -> Result<()> {
        self.canvas = Pixmap::new(new_width, new_height)
            .ok_or_else(|| anyhow!("cannot allocate a {new_width}x{new_height} canvas"))?;
        self.canvas.fill(Color::from_rgba8(0, 0, 0, 255));
        self.width = new_width;
        self.height = new_height;
        self.center = (new_width as f32 / 2.0, new_height as f32 / 2.0);
        self.clear_buffer = solid(new_width, new_height);
        self.dirty_regions.clear();
        self.first_frame = true;
        Ok(())
    }

    /// Per-component frame time summary ("draw", "clear" or "copy").
    pub fn component_stats(&self, component: &str) -> Option<TimingStats> {
        self.component_timers
            .get(component)
            .and_then(|t| t.borrow().frame_stats())
    }

    /// Clip `(x, y, w, h)` to the canvas.
    fn clip(&self, x: f32, y: f32, w: f32, h: f32) -> Option<Rect> {
        let x0 = x.floor().max(0.0);
        let y0 = y.floor().max(0.0);
        let x1 = (x + w).ceil().min(self.width as f32);
        let y1 = (y + h).ceil().min(self.height as f32);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Rect::from_ltrb(x0, y0, x1, y1)
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: [u8; 4]) {
        let Some(rect) = self.clip(x, y, w, h) else {
            return;
        };
        self.canvas
            .fill_rect(rect, &paint(color), Transform::identity(), None);
        self.dirty_regions.push(rect);
    }

    fn outline_rect(&mut self, x: f32, y: f32, w: f32, h: f32, thickness: f32, color: [u8; 4]) {
        self.fill_rect(x, y, w, thickness, color);
        self.fill_rect(x, y + h - thickness, w, thickness, color);
        self.fill_rect(x, y, thickness, h, color);
        self.fill_rect(x + w - thickness, y, thickness, h, color);
    }

    fn copy_dirty_region(&self, dirty: Rect, frame_buffer: &mut [u8]) {
        let x0 = dirty.x().floor().max(0.0).min(self.width as f32) as usize;
        let y0 = dirty.y().floor().max(0.0).min(self.height as f32) as usize;
        let x1 = (dirty.x() + dirty.width()).ceil().min(self.width as f32) as usize;
        let y1 = (dirty.y() + dirty.height()).ceil().min(self.height as f32) as usize;
        if x1 <= x0 || y1 <= y0 {
            return;
        }
        let row_bytes = self.width as usize * 4;
        let bytes = (x1 - x0) * 4;
        let canvas_data = self.canvas.data();
        for row in y0..y1 {
            let off = row * row_bytes + x0 * 4;
            frame_buffer[off..off + bytes].copy_from_slice(&canvas_data[off..off + bytes]);
        }
    }

    /// Merge touching rects on the same row so each span is copied once.
    fn coalesce_dirty(rects: &mut Vec<Rect>) {
        rects.sort_by(|a, b| a.y().total_cmp(&b.y()).then(a.x().total_cmp(&b.x())));
        let mut out: Vec<Rect> = Vec::with_capacity(rects.len());
        for r in rects.drain(..) {
            if let Some(last) = out.last_mut() {
                let same_row =
                    (r.y() - last.y()).abs() < 1.0 && (r.height() - last.height()).abs() < 1.0;
                let touching = r.x() <= last.x() + last.width() + 1.0;
                if same_row && touching {
                    let nx = last.x().min(r.x());
                    let nx2 = (last.x() + last.width()).max(r.x() + r.width());
                    if let Some(merged) = Rect::from_xywh(nx, last.y(), nx2 - nx, last.height()) {
                        *last = merged;
                        continue;
                    }
                }
            }
            out.push(r);
        }
        *rects = out;
    }

    /// Draw `frame` and copy every changed span into `frame_buffer` (RGBA,
    /// same size as the canvas).
    pub fn render_frame(
        &mut self,
        frame: &Frame<'_, '_>,
        frame_buffer: &mut [u8],
        timer: &mut MonotonicTimer,
    ) -> Result<FrameStats> {
        if frame_buffer.len() != self.clear_buffer.len() {
            bail!(
                "frame buffer holds {} bytes, canvas needs {}",
                frame_buffer.len(),
                self.clear_buffer.len()
            );
        }
        if self.first_frame {
            self.first_frame = false;
            self.canvas.fill(Color::from_rgba8(0, 0, 0, 255));
            frame_buffer.copy_from_slice(&self.clear_buffer);
            self.dirty_regions.clear();
        }

        let old_dirty = std::mem::take(&mut self.dirty_regions);

        let t = timer.now();
        self.clear_dirty(&old_dirty);
        let t_clear = timer.elapsed(t);

        let t = timer.now();
        self.render_screen(frame)?;
        let t_draw = timer.elapsed(t);

        let mut present = old_dirty;
        present.extend_from_slice(&self.dirty_regions);
        SkiaRenderer::coalesce_dirty(&mut present);

        let t = timer.now();
        for rect in &present {
            self.copy_dirty_region(*rect, frame_buffer);
        }
        let t_copy = timer.elapsed(t);

        let total = t_clear + t_draw + t_copy;
        for (name, d) in [("draw", t_draw), ("clear", t_clear), ("copy", t_copy)] {
            if let Some(timer) = self.component_timers.get(name) {
                timer.borrow_mut().record_frame(d);
            }
        }
        timer.record_frame(total);

        Ok(FrameStats {
            clear: t_clear,
            draw: t_draw,
            copy: t_copy,
            total,
            dirty_count: self.dirty_regions.len(),
        })
    }

    fn draw_button(&mut self, button: ButtonView, center: (f32, f32), focused: bool) {
        if !button.visible {
            return;
        }
        let (w, h) = BUTTON_SIZE;
        let (x, y) = (center.0 - w * 0.5, center.1 - h * 0.5);
        let (fill, border, style) = if button.enabled {
            (BUTTON_FILL, BORDER, TextStyle::Body)
        } else {
            (BUTTON_FILL_DISABLED, BORDER_DISABLED, TextStyle::Dim)
        };
        self.fill_rect(x, y, w, h, fill);
        let border = if focused { FOCUS } else { border };
        self.outline_rect(x, y, w, h, 2.0, border);
        self.draw_text(button.label, style, Anchor::Center(center.0, center.1));
    }

    fn draw_video(&mut self, video: &Pixmap, bounds: Bounds) {
        let Some((scale, x, y)) = bounds.fit(video.width(), video.height()) else {
            return;
        };
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        self.canvas.draw_pixmap(
            0,
            0,
            video.as_ref(),
            &paint,
            Transform::from_row(scale, 0.0, 0.0, scale, x, y),
            None,
        );
        if let Some(rect) = self.clip(bounds.x, bounds.y, bounds.w, bounds.h) {
            self.dirty_regions.push(rect);
        }
    }

    fn render_page(&mut self, page: &PageView<'_>) {
        let (cx, h) = (self.center.0, self.height as f32);
        self.draw_text(page.title, TextStyle::Title, Anchor::Center(cx, h * 0.14));
        let mut y = h * 0.28;
        for line in page.lines {
            self.draw_text(line, TextStyle::Body, Anchor::Center(cx, y));
            y += 38.0;
        }
        self.draw_button(page.action, (cx, h * 0.85), false);
        if page.action.visible {
            self.draw_text(
                "Press Enter to continue",
                TextStyle::Small,
                Anchor::Center(cx, h * 0.93),
            );
        }
    }

    fn render_comprehension(
        &mut self,
        questions: &[QuestionView<'_>],
        submit: ButtonView,
        focus: Focus,
    ) {
        let (w, h) = (self.width as f32, self.height as f32);
        let left = w * 0.12;
        let mut y = h * 0.08;
        for (qi, q) in questions.iter().enumerate() {
            let focused = focus == Focus::Question(qi);
            let style = if focused {
                TextStyle::Accent
            } else {
                TextStyle::Body
            };
            self.draw_text(q.prompt, style, Anchor::Left(left, y));
            y += 34.0;
            for (oi, (value, label)) in q.options.iter().enumerate() {
                let mark = if q.selected == Some(oi) { "(x)" } else { "( )" };
                self.draw_text(
                    &format!("{mark} {value}. {label}"),
                    TextStyle::Small,
                    Anchor::Left(left + 24.0, y),
                );
                y += 28.0;
            }
            y += 18.0;
        }
        self.draw_button(submit, (self.center.0, h * 0.88), false);
        self.draw_text(
            "Up/Down: question   Left/Right or letter: answer   Enter: continue",
            TextStyle::Small,
            Anchor::Center(self.center.0, h * 0.96),
        );
    }

    fn render_trial(
        &mut self,
        trial: &TrialView<'_>,
        video: Option<&Pixmap>,
        progress: Option<(usize, usize)>,
    ) {
        let layout = TrialLayout::new(self.width, self.height);
        let cx = self.center.0;

        if let Some((done, total)) = progress {
            let bar = layout.progress;
            self.fill_rect(bar.x, bar.y, bar.w, bar.h, TRACK);
            let fill = layout::progress_fill(done, total, bar.w);
            self.fill_rect(bar.x, bar.y, fill, bar.h, PROGRESS);
            self.draw_text(
                &format!("{} of {}", (done + 1).min(total), total),
                TextStyle::Small,
                Anchor::Left(bar.x + bar.w + 12.0, bar.y + bar.h * 0.5),
            );
        }

        self.draw_text(trial.prompt, TextStyle::Body, Anchor::Center(cx, layout.prompt_y));

        let v = layout.video;
        self.fill_rect(v.x, v.y, v.w, v.h, PANEL);
        match video {
            Some(pixmap) => self.draw_video(pixmap, v),
            None => {
                let (vx, vy) = v.center();
                self.draw_text(trial.clip_name, TextStyle::Dim, Anchor::Center(vx, vy));
            }
        }

        self.draw_button(trial.play, (layout.button_x(0), layout.buttons_y), false);
        self.draw_button(trial.rate, (layout.button_x(1), layout.buttons_y), false);
        self.draw_button(trial.advance, (layout.button_x(2), layout.buttons_y), false);

        if trial.slider_visible {
            let (x0, x1, y) = (layout.slider_left, layout.slider_right, layout.slider_y);
            self.fill_rect(x0, y - 2.0, x1 - x0, 4.0, TRACK);
            self.draw_text(trial.labels.left, TextStyle::Small, Anchor::Center(x0, y + 30.0));
            self.draw_text(trial.labels.right, TextStyle::Small, Anchor::Center(x1, y + 30.0));
            match trial.rating {
                Some(value) => {
                    let (tw, th) = SLIDER_THUMB;
                    let x = layout.slider_x(value);
                    self.fill_rect(x - tw * 0.5, y - th * 0.5, tw, th, THUMB);
                }
                None => {
                    self.draw_text(
                        "Use Left/Right to move the slider",
                        TextStyle::Small,
                        Anchor::Center(cx, y - 34.0),
                    );
                }
            }
        }
        if trial.replay_hint {
            self.draw_text(
                "You may replay the video before you continue.",
                TextStyle::Small,
                Anchor::Center(cx, layout.hint_y),
            );
        } else {
            self.draw_text(
                "Space: play video",
                TextStyle::Small,
                Anchor::Center(cx, layout.hint_y),
            );
        }
    }

    fn choice_text(options: &[String], selected: Option<usize>) -> String {
        match selected.and_then(|i| options.get(i)) {
            Some(choice) => format!("< {choice} >"),
            None => "< choose with Left/Right >".to_owned(),
        }
    }

    fn render_demographics(&mut self, d: &DemographicsView<'_>, focus: Focus) {
        let (w, h) = (self.width as f32, self.height as f32);
        let label_x = w * 0.1;
        let value_x = w * 0.32;
        let row_h = h * 0.12;
        let mut y = h * 0.1;

        self.draw_text(
            "A few questions about you",
            TextStyle::Title,
            Anchor::Center(self.center.0, h * 0.04 + 10.0),
        );

        for field in DemographicsField::ALL {
            let focused = focus == Focus::Field(field);
            let style = if focused {
                TextStyle::Accent
            } else {
                TextStyle::Body
            };
            y += row_h;
            match field {
                DemographicsField::Gender => {
                    self.draw_text("Gender", style, Anchor::Left(label_x, y));
                    let text = Self::choice_text(d.genders, d.gender);
                    self.draw_text(&text, TextStyle::Body, Anchor::Left(value_x, y));
                }
                DemographicsField::Age => {
                    self.draw_text("Age", style, Anchor::Left(label_x, y));
                    let mut text = d.age_text.to_owned();
                    if focused {
                        text.push('_');
                    }
                    let drawn = self.draw_typed(&text, Anchor::Left(value_x, y));
                    let mark = if d.age_prefer_not { "[x]" } else { "[ ]" };
                    self.draw_text(
                        &format!("{mark} Prefer not to say (P)"),
                        TextStyle::Small,
                        Anchor::Left(value_x + drawn.max(80) as f32 + 40.0, y),
                    );
                }
                DemographicsField::Race => {
                    self.draw_text("Race", style, Anchor::Left(label_x, y));
                    let text = Self::choice_text(d.races, d.race);
                    let drawn = self.draw_text(&text, TextStyle::Body, Anchor::Left(value_x, y));
                    let mark = if d.race_prefer_not { "[x]" } else { "[ ]" };
                    self.draw_text(
                        &format!("{mark} Prefer not to say (P)"),
                        TextStyle::Small,
                        Anchor::Left(value_x + drawn as f32 + 40.0, y),
                    );
                }
                DemographicsField::Ethnicity => {
                    self.draw_text("Ethnicity", style, Anchor::Left(label_x, y));
                    let text = Self::choice_text(d.ethnicities, d.ethnicity);
                    self.draw_text(&text, TextStyle::Body, Anchor::Left(value_x, y));
                }
                DemographicsField::Feedback => {
                    self.draw_text("Comments (optional)", style, Anchor::Left(label_x, y));
                    self.fill_rect(value_x - 8.0, y - 18.0, w * 0.58, 36.0, PANEL);
                    let mut text = layout::tail(d.feedback, 60).to_owned();
                    if focused {
                        text.push('_');
                    }
                    self.draw_typed(&text, Anchor::Left(value_x, y));
                }
                DemographicsField::Finish => {
                    self.draw_button(d.finish, (self.center.0, y + 10.0), focused);
                }
            }
        }
        self.draw_text(
            "Tab/Up/Down: move   Left/Right: choose   Enter on Finish: submit",
            TextStyle::Small,
            Anchor::Center(self.center.0, h * 0.96),
        );
    }

    fn draw_typed(&mut self, text: &str, anchor: Anchor) -> u32 {
        let Some(pm) = self
            .text
            .as_ref()
            .and_then(|cache| cache.render_once(text, TextStyle::Body))
        else {
            return 0;
        };
        self.blit_pixmap(&pm, anchor.top_left(pm.width(), pm.height()));
        pm.width()
    }
}

impl Renderer for SkiaRenderer {
    fn clear_dirty(&mut self, dirty: &[Rect]) {
        let stride = self.width as usize * 4;
        let canvas_data = self.canvas.data_mut();
        for rect in dirty {
            let x0 = rect.x().floor().max(0.0).min(self.width as f32) as usize;
            let y0 = rect.y().floor().max(0.0).min(self.height as f32) as usize;
            let x1 = (rect.x() + rect.width()).ceil().min(self.width as f32) as usize;
            let y1 = (rect.y() + rect.height()).ceil().min(self.height as f32) as usize;
            if x1 <= x0 || y1 <= y0 {
                continue;
            }
            let row_len = (x1 - x0) * 4;
            for y in y0..y1 {
                let off = y * stride + x0 * 4;
                canvas_data[off..off + row_len]
                    .copy_from_slice(&self.clear_buffer[off..off + row_len]);
            }
        }
    }

    fn blit_pixmap(&mut self, pm: &Pixmap, top_left: (i32, i32)) {
        let (w, h) = (pm.width() as i32, pm.height() as i32);
        let (cw, ch) = (self.width as i32, self.height as i32);
        let (x, y) = top_left;
        if x + w <= 0 || y + h <= 0 || x >= cw || y >= ch {
            return;
        }

        let dst_x = x.max(0) as usize;
        let dst_y = y.max(0) as usize;
        let src_x_offset = (-x).max(0) as usize;
        let src_y_offset = (-y).max(0) as usize;
        let copy_w = (w as usize - src_x_offset).min(cw as usize - dst_x);
        let copy_h = (h as usize - src_y_offset).min(ch as usize - dst_y);
        let src_stride = pm.width() as usize;
        let dst_stride = self.width as usize;

        let src_u32: &[u32] = cast_slice(pm.data());
        let dst_u32: &mut [u32] = cast_slice_mut(self.canvas.data_mut());

        let fully_opaque = (0..copy_h).all(|row| {
            let start = (src_y_offset + row) * src_stride + src_x_offset;
            src_u32[start..start + copy_w]
                .iter()
                .all(|&p| p >> 24 == 0xFF)
        });

        for row in 0..copy_h {
            let src_row = (src_y_offset + row) * src_stride + src_x_offset;
            let dst_row = (dst_y + row) * dst_stride + dst_x;
            if fully_opaque {
                dst_u32[dst_row..dst_row + copy_w]
                    .copy_from_slice(&src_u32[src_row..src_row + copy_w]);
                continue;
            }
            for i in 0..copy_w {
                let s = src_u32[src_row + i];
                let d = dst_u32[dst_row + i];
                let sa = s >> 24;
                if sa == 0 {
                    continue;
                }
                let inv = 255 - sa;
                let over = |shift: u32| {
                    let sc = (s >> shift) & 0xFF;
                    let dc = (d >> shift) & 0xFF;
                    (sc + (dc * inv + 127) / 255).min(255)
                };
                dst_u32[dst_row + i] = (over(24) << 24) | (over(16) << 16) | (over(8) << 8) | over(0);
            }
        }

        if let Some(rect) =
            Rect::from_xywh(dst_x as f32, dst_y as f32, copy_w as f32, copy_h as f32)
        {
            self.dirty_regions.push(rect);
        }
    }

    fn draw_text(&mut self, text: &str, style: TextStyle, anchor: Anchor) -> u32 {
        let Some(pm) = self
            .text
            .as_mut()
            .and_then(|cache| cache.get_or_render(text, style))
        else {
            return 0;
        };
        self.blit_pixmap(&pm, anchor.top_left(pm.width(), pm.height()));
        pm.width()
    }
}

impl ScreenRenderer for SkiaRenderer {
    fn render_screen(&mut self, frame: &Frame<'_, '_>) -> Result<()> {
        match frame.view {
            ScreenView::Page(page) => self.render_page(page),
            ScreenView::Comprehension { questions, submit } => {
                self.render_comprehension(questions, *submit, frame.focus)
            }
            ScreenView::Trial(trial) => self.render_trial(trial, frame.video, frame.progress),
            ScreenView::Demographics(d) => self.render_demographics(d, frame.focus),
        }
        Ok(())
    }
}
