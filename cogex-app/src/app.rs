use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use cogex_core::{
    AssetKind, AssetRequest, Input, KeySource, LoadError, PresentError, Presenter, StimulusLoader,
    StimulusRef,
};
use cogex_render::display::TEXT_BOX_WIDTH_RATIO;
use cogex_render::{DisplayConfig, FrameComposer, TextRasterizer};
use pixels::{Pixels, SurfaceTexture};
use tracing::{debug, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, NamedKey},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{Fullscreen, Window, WindowId},
};

use crate::audio::{AudioOutput, SoundClip};
use crate::stimulus::{load_picture, text_error, Stimulus};

/// Receives winit callbacks while the backend pumps the event loop
struct Shell {
    display: DisplayConfig,
    window: Option<Arc<Window>>,
    inputs: VecDeque<Input>,
    resized: Option<PhysicalSize<u32>>,
    error: Option<anyhow::Error>,
}

impl ApplicationHandler for Shell {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            match create_window(event_loop, &self.display) {
                Ok(window) => self.window = Some(window),
                Err(e) => self.error = Some(e),
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.inputs.push_back(Input::Abort),
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed && !event.repeat =>
            {
                if let Some(input) = key_input(&event.logical_key) {
                    self.inputs.push_back(input);
                }
            }
            WindowEvent::Resized(size) => self.resized = Some(size),
            _ => {}
        }
    }
}

/// Escape aborts; everything else is reported by name, lowercased
pub fn key_input(key: &Key) -> Option<Input> {
    match key {
        Key::Named(NamedKey::Escape) => Some(Input::Abort),
        Key::Named(NamedKey::Space) => Some(Input::Key(" ".to_string())),
        Key::Named(named) => Some(Input::Key(format!("{named:?}").to_lowercase())),
        Key::Character(s) => Some(Input::Key(s.to_lowercase())),
        _ => None,
    }
}

fn create_window(event_loop: &ActiveEventLoop, display: &DisplayConfig) -> Result<Arc<Window>> {
    let mut attributes = Window::default_attributes()
        .with_title("cogex localizer")
        .with_resizable(false);

    if display.window_mode {
        let (width, height) = display.window_size;
        attributes = attributes.with_inner_size(PhysicalSize::new(width, height));
    } else {
        let monitor = match display.display {
            Some(index) => event_loop
                .available_monitors()
                .nth(index)
                .ok_or_else(|| anyhow!("no monitor with index {index}"))?,
            None => event_loop
                .primary_monitor()
                .or_else(|| event_loop.available_monitors().next())
                .ok_or_else(|| anyhow!("no monitor available"))?,
        };
        if let Some(mhz) = monitor.refresh_rate_millihertz() {
            info!(refresh_hz = mhz as f64 / 1000.0, "monitor refresh rate");
        }
        let fullscreen = match display.resolution {
            Some((width, height)) => {
                let mode = monitor
                    .video_modes()
                    .filter(|m| m.size() == PhysicalSize::new(width, height))
                    .max_by_key(|m| m.refresh_rate_millihertz())
                    .ok_or_else(|| anyhow!("monitor has no {width}x{height} video mode"))?;
                Fullscreen::Exclusive(mode)
            }
            None => Fullscreen::Borderless(Some(monitor)),
        };
        attributes = attributes.with_fullscreen(Some(fullscreen));
    }

    let window = Arc::new(event_loop.create_window(attributes)?);
    window.set_cursor_visible(false);
    Ok(window)
}

/// Window, surface and audio device behind the session loop.
///
/// The winit event loop is pumped from `poll_key`, never run, so the
/// dispatch loop stays in charge of timing.
pub struct WindowBackend {
    event_loop: EventLoop<()>,
    shell: Shell,
    window: Arc<Window>,
    pixels: Pixels<'static>,
    composer: FrameComposer,
    text: TextRasterizer,
    audio: Option<AudioOutput>,
}

impl WindowBackend {
    pub fn open(display: &DisplayConfig) -> Result<Self> {
        let text = TextRasterizer::load(
            &display.font_path,
            display.text_size,
            display.text_color.to_color(),
        )?;

        let mut event_loop = EventLoop::new()?;
        let mut shell = Shell {
            display: display.clone(),
            window: None,
            inputs: VecDeque::new(),
            resized: None,
            error: None,
        };

        // the window is created on the first resume; fullscreen windows may
        // report a zero size until the compositor has placed them
        let (window, size) = loop {
            if let PumpStatus::Exit(code) =
                event_loop.pump_app_events(Some(Duration::from_millis(10)), &mut shell)
            {
                bail!("event loop exited with code {code} before the window opened");
            }
            if let Some(e) = shell.error.take() {
                return Err(e.context("cannot open the stimulus window"));
            }
            if let Some(window) = &shell.window {
                let size = window.inner_size();
                if size.width > 0 && size.height > 0 {
                    break (window.clone(), size);
                }
            }
        };
        shell.resized = None;

        let surface = SurfaceTexture::new(size.width, size.height, window.clone());
        let pixels = Pixels::new(size.width, size.height, surface)
            .context("cannot create the pixel surface")?;
        let composer = FrameComposer::new(
            size.width,
            size.height,
            display.background.to_color(),
            display.text_color.to_color(),
        )?;
        let fullscreen = !display.window_mode;
        info!(
            width = size.width,
            height = size.height,
            scale_factor = window.scale_factor(),
            fullscreen,
            "display ready"
        );

        let mut backend = Self {
            event_loop,
            shell,
            window,
            pixels,
            composer,
            text,
            audio: None,
        };
        backend.composer.compose_blank();
        backend.flip()?;
        Ok(backend)
    }

    fn flip(&mut self) -> Result<(), PresentError> {
        self.composer
            .copy_to(self.pixels.frame_mut())
            .map_err(|e| PresentError::Surface(e.to_string()))?;
        self.pixels
            .render()
            .map_err(|e| PresentError::Surface(e.to_string()))
    }

    fn pump(&mut self) {
        if let PumpStatus::Exit(_) = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.shell)
        {
            self.shell.inputs.push_back(Input::Abort);
        }
        if let Some(size) = self.shell.resized.take() {
            if let Err(e) = self.resize(size) {
                warn!(error = %e, "failed to resize surface");
            }
        }
    }

    fn resize(&mut self, size: PhysicalSize<u32>) -> Result<()> {
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }
        if (size.width, size.height) == (self.composer.width(), self.composer.height()) {
            return Ok(());
        }
        self.pixels.resize_surface(size.width, size.height)?;
        self.pixels.resize_buffer(size.width, size.height)?;
        self.composer.resize(size.width, size.height)?;
        warn!(
            width = size.width,
            height = size.height,
            "display resized, screen cleared"
        );
        Ok(())
    }

    fn ensure_audio(&mut self) -> Result<&AudioOutput, LoadError> {
        if self.audio.is_none() {
            self.audio = Some(AudioOutput::open()?);
            debug!("audio output opened");
        }
        self.audio
            .as_ref()
            .ok_or_else(|| LoadError::Unsupported { kind: AssetKind::Sound })
    }
}

impl StimulusLoader for WindowBackend {
    type Handle = Stimulus;

    fn load(&mut self, request: &AssetRequest) -> Result<Stimulus, LoadError> {
        match request.kind {
            AssetKind::Text => self
                .text
                .render_line(&request.key)
                .map(Stimulus::visual)
                .map_err(|e| text_error(request, e)),
            AssetKind::TextBox => {
                let max_width = self.composer.width() as f32 * TEXT_BOX_WIDTH_RATIO;
                self.text
                    .render_box(&request.key, max_width)
                    .map(Stimulus::visual)
                    .map_err(|e| text_error(request, e))
            }
            AssetKind::Picture => load_picture(Path::new(&request.key)).map(Stimulus::visual),
            AssetKind::Sound => {
                self.ensure_audio()?;
                let clip = SoundClip::load(Path::new(&request.key))?;
                debug!(
                    key = %request.key,
                    duration_ms = clip.duration().map(|d| d.as_millis() as u64),
                    "sound loaded"
                );
                Ok(Stimulus::Sound(clip))
            }
            AssetKind::Video => Err(LoadError::Unsupported { kind: AssetKind::Video }),
        }
    }
}

impl Presenter<Stimulus> for WindowBackend {
    fn present(&mut self, stimulus: StimulusRef<'_, Stimulus>) -> Result<(), PresentError> {
        match stimulus {
            StimulusRef::Asset(Stimulus::Visual(pixmap)) => {
                self.composer.compose_centered(pixmap);
                self.flip()
            }
            StimulusRef::Asset(Stimulus::Sound(clip)) => match &self.audio {
                Some(audio) => audio.play(clip),
                None => Err(PresentError::Audio("no output device open".to_string())),
            },
            StimulusRef::FixationCross => {
                self.composer.compose_fixation();
                self.flip()
            }
            StimulusRef::Blank => {
                self.composer.compose_blank();
                self.flip()
            }
        }
    }
}

impl KeySource for WindowBackend {
    fn poll_key(&mut self) -> Option<Input> {
        if self.shell.inputs.is_empty() {
            self.pump();
        }
        self.shell.inputs.pop_front()
    }
}

impl Drop for WindowBackend {
    fn drop(&mut self) {
        self.window.set_cursor_visible(true);
    }
}
