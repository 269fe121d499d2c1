//! Screen geometry shared by the renderer and its tests.

use tiny_skia::Rect;

#[derive(Copy, Debug, Clone, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Bounds {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    pub fn to_rect(self) -> Option<Rect> {
        Rect::from_xywh(self.x, self.y, self.w, self.h)
    }

    /// Largest placement of a `src_w` x `src_h` image inside these bounds,
    /// centred, keeping its aspect ratio. Returns `(scale, x, y)`.
    pub fn fit(&self, src_w: u32, src_h: u32) -> Option<(f32, f32, f32)> {
        if src_w == 0 || src_h == 0 || self.w <= 0.0 || self.h <= 0.0 {
            return None;
        }
        let scale = (self.w / src_w as f32).min(self.h / src_h as f32);
        let x = self.x + (self.w - src_w as f32 * scale) * 0.5;
        let y = self.y + (self.h - src_h as f32 * scale) * 0.5;
        Some((scale, x, y))
    }
}

pub const BUTTON_SIZE: (f32, f32) = (220.0, 48.0);
pub const SLIDER_THUMB: (f32, f32) = (14.0, 30.0);

/// Trial screen, top to bottom: progress bar, prompt, video, buttons, slider
#[derive(Copy, Debug, Clone, PartialEq)]
pub struct TrialLayout {
    pub progress: Bounds,
    pub prompt_y: f32,
    pub video: Bounds,
    pub buttons_y: f32,
    pub slider_left: f32,
    pub slider_right: f32,
    pub slider_y: f32,
    pub hint_y: f32,
}

impl TrialLayout {
    pub fn new(width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        let video_h = (h * 0.42).floor();
        let video = Bounds::new((w * 0.2).floor(), 110.0, (w * 0.6).floor(), video_h);
        let half_track = (w * 0.3).min(320.0).floor();
        let buttons_y = (video.y + video.h + 44.0).floor();
        Self {
            progress: Bounds::new((w * 0.2).floor(), 24.0, (w * 0.6).floor(), 8.0),
            prompt_y: 76.0,
            video,
            buttons_y,
            slider_left: (w * 0.5).floor() - half_track,
            slider_right: (w * 0.5).floor() + half_track,
            slider_y: (h * 0.84).floor().max(buttons_y + 60.0),
            hint_y: (h * 0.95).floor(),
        }
    }

    pub fn slider_x(&self, value: u8) -> f32 {
        let t = f32::from(value.min(100)) / 100.0;
        self.slider_left + (self.slider_right - self.slider_left) * t
    }

    pub fn button_x(&self, slot: usize) -> f32 {
        let center = self.video.x + self.video.w * 0.5;
        center + (slot as f32 - 1.0) * (BUTTON_SIZE.0 + 30.0)
    }
}

/// Width of the filled part of a progress bar.
pub fn progress_fill(done: usize, total: usize, width: f32) -> f32 {
    if total == 0 {
        return 0.0;
    }
    width * (done.min(total) as f32 / total as f32)
}

/// The last `max_chars` characters of `text`.
pub fn tail(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    let skip = count - max_chars;
    match text.char_indices().nth(skip) {
        Some((i, _)) => &text[i..],
        None => "",
    }
}
