use ab_glyph::FontArc;
use anyhow::Result;
use gatejudge_core::{Screen, ScreenView, SubmissionStage};
use gatejudge_experiment::{ExperimentConfig, ExperimentEvent, Session};
use gatejudge_render::{Frame, SkiaRenderer};
use gatejudge_timing::{MonotonicTimer, Timer};
use pixels::{Pixels, SurfaceTexture};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::{KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Fullscreen, Window, WindowId},
};

use crate::host::FileHost;
use crate::input::{InputState, Key};
use crate::media::{ClipLibrary, ClipPlayer};

pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<SkiaRenderer>,
    session: Session<MonotonicTimer, FileHost>,
    input: InputState,
    clips: ClipLibrary,
    player: ClipPlayer<u64>,
    font: FontArc,
    frame_timer: MonotonicTimer,
    windowed: bool,
    current_size: Option<PhysicalSize<u32>>,
    scale_factor: f64,
    refresh_rate: Option<f64>,

    should_exit: bool,
}

impl App {
    pub fn new(config: ExperimentConfig, host: FileHost, font: FontArc, windowed: bool) -> Self {
        let clips = ClipLibrary::new(config.media_root.clone());
        let player = ClipPlayer::new(config.fps);
        let session = Session::new(config, MonotonicTimer::new(), host);

        Self {
            window: None,
            pixels: None,
            renderer: None,
            session,
            input: InputState::default(),
            clips,
            player,
            font,
            frame_timer: MonotonicTimer::new(),
            windowed,
            current_size: None,
            scale_factor: 1.0,
            refresh_rate: None,
            should_exit: false,
        }
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        info!(
            platform = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            "starting experiment window, press Escape to quit"
        );
        self.session.start();
        event_loop.run_app(&mut self)?;
        Ok(())
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow::anyhow!("no monitor available"))?;

        self.refresh_rate = monitor
            .refresh_rate_millihertz()
            .map(|rate| rate as f64 / 1000.0);

        let mut attributes = Window::default_attributes().with_title("Gatejudge");
        attributes = if self.windowed {
            attributes.with_inner_size(LogicalSize::new(1280.0, 800.0))
        } else {
            attributes
                .with_fullscreen(Some(Fullscreen::Borderless(Some(monitor))))
                .with_resizable(false)
        };

        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();
        self.current_size = Some(size);
        self.scale_factor = window.scale_factor();

        info!(
            width = size.width,
            height = size.height,
            scale_factor = self.scale_factor,
            refresh_hz = self.refresh_rate,
            "display configured"
        );

        let surface_texture = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface_texture)?);
        self.renderer = Some(SkiaRenderer::new(
            size.width,
            size.height,
            Some(self.font.clone()),
        )?);

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn dispatch(&mut self, event: ExperimentEvent) {
        if self.session.dispatch(event) {
            self.input.reset();
            self.player.reset();
            if self.session.screen() == Screen::Submitting(SubmissionStage::Completed) {
                info!(
                    path = %self.session.host().data_path().display(),
                    "session complete"
                );
            }
        }
    }

    /// Keep the player in step with the trial on screen.
    fn sync_player(&mut self) {
        let wanted = match self.session.machine().view() {
            ScreenView::Trial(t) => Some((t.clip, t.clip_name.to_owned(), t.playing)),
            _ => None,
        };
        let Some((clip, name, playing)) = wanted else {
            self.player.reset();
            return;
        };
        if playing && self.player.playing() != Some(clip) {
            let frames = self.clips.frames(clip, &name);
            self.player.start(clip, frames, self.session.timer().now());
        } else if !playing && !self.player.has_still() && self.player.playing().is_none() {
            let frames = self.clips.frames(clip, &name);
            self.player.show_still(frames);
        }
    }

    fn update(&mut self) {
        self.session.poll();
        self.sync_player();
        if let Some(clip) = self.player.tick(self.session.timer()) {
            debug!(?clip, "clip finished");
            self.dispatch(ExperimentEvent::ClipEnded(clip));
        }
    }

    fn render(&mut self) -> Result<()> {
        let (Some(pixels), Some(renderer)) = (self.pixels.as_mut(), self.renderer.as_mut()) else {
            return Ok(());
        };
        let machine = self.session.machine();
        let view = machine.view();
        let frame = Frame {
            view: &view,
            focus: self.input.focus(&view),
            video: self.player.frame(self.session.timer()),
            progress: machine.trial_progress(),
        };

        let stats = renderer.render_frame(&frame, pixels.frame_mut(), &mut self.frame_timer)?;
        let t = self.frame_timer.now();
        pixels.render()?;
        trace!(
            present_ms = self.frame_timer.elapsed(t).as_secs_f64() * 1e3,
            clear_ms = stats.clear.as_secs_f64() * 1e3,
            draw_ms = stats.draw.as_secs_f64() * 1e3,
            copy_ms = stats.copy.as_secs_f64() * 1e3,
            dirty = stats.dirty_count,
            "frame"
        );
        Ok(())
    }

    fn handle_key(&mut self, event: &KeyEvent, event_loop: &ActiveEventLoop) {
        let Some(key) = Key::from_winit(event) else {
            return;
        };
        if key == Key::Escape {
            self.cleanup_and_exit(event_loop);
            return;
        }
        let screen = self.session.screen();
        let mapped = {
            let view = self.session.machine().view();
            self.input.map(key, screen, &view)
        };
        if let Some(event) = mapped {
            self.dispatch(event);
        }
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.current_size = Some(new_size);
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                warn!(error = %e, "failed to resize surface");
            }
            if let Err(e) = pixels.resize_buffer(new_size.width, new_size.height) {
                warn!(error = %e, "failed to resize buffer");
            }
        }
        if let Some(renderer) = &mut self.renderer {
            if let Err(e) = renderer.resize(new_size.width, new_size.height) {
                error!(error = %e, "failed to resize canvas");
            }
        }
        info!(width = new_size.width, height = new_size.height, "display resized");
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
        let screen = self.session.screen();
        if screen == Screen::Submitting(SubmissionStage::Completed) {
            info!("experiment finished");
        } else {
            warn!(%screen, "exiting before the session was submitted");
        }
        if let Some(stats) = self.frame_timer.frame_stats() {
            debug!(
                avg_ms = stats.average_frame_time_ns / 1e6,
                jitter_ms = stats.jitter_ns / 1e6,
                fps = stats.effective_fps,
                "frame timing"
            );
        }
        if let Some(renderer) = &self.renderer {
            for component in ["clear", "draw", "copy"] {
                if let Some(stats) = renderer.component_stats(component) {
                    debug!(
                        component,
                        avg_us = stats.average_frame_time_ns / 1e3,
                        max_us = stats.max_frame_time_ns / 1e3,
                        "render component timing"
                    );
                }
            }
        }
        self.should_exit = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                error!(error = %e, "failed to create window and surface");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.cleanup_and_exit(event_loop),
            WindowEvent::RedrawRequested => {
                self.update();
                if let Err(e) = self.render() {
                    error!(error = %e, "render failed");
                    self.cleanup_and_exit(event_loop);
                    return;
                }
                if let Some(win) = &self.window {
                    win.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                self.handle_key(&event, event_loop);
            }
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.scale_factor = scale_factor;
                if let Some(size) = self.window.as_ref().map(|w| w.inner_size()) {
                    self.handle_resize(size);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        debug!("application resources released");
    }
}
