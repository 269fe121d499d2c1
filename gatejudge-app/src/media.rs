//! Clips are directories of PNG frames: `<media_root>/<part|full>/<name>/*.png`,
//! played in file-name order.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use gatejudge_core::Clip;
use gatejudge_timing::Timer;
use tiny_skia::{ColorU8, Pixmap};
use tracing::{debug, warn};

pub fn load_frames(dir: &Path) -> Result<Vec<Pixmap>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("reading clip directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
        })
        .collect();
    paths.sort();
    paths.iter().map(|p| decode_frame(p)).collect()
}

fn decode_frame(path: &Path) -> Result<Pixmap> {
    let rgba = image::open(path)
        .with_context(|| format!("decoding {}", path.display()))?
        .into_rgba8();
    let (w, h) = rgba.dimensions();
    let mut pixmap =
        Pixmap::new(w, h).with_context(|| format!("{} has no pixels", path.display()))?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(rgba.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

/// Decoded clips, loaded on first use
pub struct ClipLibrary {
    root: PathBuf,
    loaded: HashMap<(Clip, String), Arc<[Pixmap]>>,
}

impl ClipLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            loaded: HashMap::new(),
        }
    }

    pub fn clip_dir(&self, clip: Clip, name: &str) -> PathBuf {
        self.root.join(clip.dir()).join(name)
    }

    /// Frames of a clip; empty when the clip is missing or unreadable.
    pub fn frames(&mut self, clip: Clip, name: &str) -> Arc<[Pixmap]> {
        let key = (clip, name.to_owned());
        if let Some(frames) = self.loaded.get(&key) {
            return Arc::clone(frames);
        }
        let dir = self.clip_dir(clip, name);
        let frames: Arc<[Pixmap]> = match load_frames(&dir) {
            Ok(frames) if !frames.is_empty() => {
                debug!(dir = %dir.display(), count = frames.len(), "loaded clip");
                frames.into()
            }
            Ok(_) => {
                warn!(dir = %dir.display(), "clip has no frames, ending it immediately");
                Arc::from(Vec::new())
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "clip unavailable, ending it immediately");
                Arc::from(Vec::new())
            }
        };
        self.loaded.insert(key, Arc::clone(&frames));
        frames
    }
}

/// Frame shown `elapsed` into a clip of `count` frames; `None` once it has ended.
pub fn frame_index(elapsed: Duration, period: Duration, count: usize) -> Option<usize> {
    if count == 0 || period.is_zero() {
        return None;
    }
    let index = (elapsed.as_nanos() / period.as_nanos()) as usize;
    (index < count).then_some(index)
}

/// Used when `fps` is not a positive number.
const DEFAULT_FRAME_PERIOD: Duration = Duration::from_nanos(33_333_333);

struct Playback<Ts> {
    clip: Clip,
    frames: Arc<[Pixmap]>,
    started: Ts,
}

/// Plays one clip at a time against the session clock
pub struct ClipPlayer<Ts> {
    frame_period: Duration,
    playing: Option<Playback<Ts>>,
    still: Option<(Arc<[Pixmap]>, usize)>,
}

impl<Ts: Copy> ClipPlayer<Ts> {
    pub fn new(fps: f32) -> Self {
        Self {
            frame_period: Duration::try_from_secs_f64(1.0 / f64::from(fps))
                .unwrap_or(DEFAULT_FRAME_PERIOD),
            playing: None,
            still: None,
        }
    }

    pub fn playing(&self) -> Option<Clip> {
        self.playing.as_ref().map(|p| p.clip)
    }

    pub fn start(&mut self, clip: Clip, frames: Arc<[Pixmap]>, now: Ts) {
        self.playing = Some(Playback {
            clip,
            frames,
            started: now,
        });
    }

    pub fn has_still(&self) -> bool {
        self.still.is_some()
    }

    /// Show the first frame of `frames` until something plays.
    pub fn show_still(&mut self, frames: Arc<[Pixmap]>) {
        self.still = Some((frames, 0));
    }

    /// Returns the clip that just ran out of frames.
    pub fn tick<T: Timer<Timestamp = Ts>>(&mut self, timer: &T) -> Option<Clip> {
        let p = self.playing.as_ref()?;
        if frame_index(timer.elapsed(p.started), self.frame_period, p.frames.len()).is_some() {
            return None;
        }
        let p = self.playing.take()?;
        if let Some(last) = p.frames.len().checked_sub(1) {
            self.still = Some((Arc::clone(&p.frames), last));
        }
        Some(p.clip)
    }

    pub fn frame<T: Timer<Timestamp = Ts>>(&self, timer: &T) -> Option<&Pixmap> {
        match &self.playing {
            Some(p) => {
                let index = frame_index(timer.elapsed(p.started), self.frame_period, p.frames.len())
                    .unwrap_or(p.frames.len().saturating_sub(1));
                p.frames.get(index)
            }
            None => self.still.as_ref().and_then(|(frames, i)| frames.get(*i)),
        }
    }

    pub fn reset(&mut self) {
        self.playing = None;
        self.still = None;
    }
}
