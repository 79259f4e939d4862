//! Playback engine: sample buffer, cursor, play state and the render path.
//!
//! ```text
//!  control thread                         real-time thread
//!  ──────────────                         ────────────────
//!  load_buffer / play / pause             transport callback
//!  set_haas_delay / enable_haas                 │
//!        │  (allocate first)                    │
//!        ▼                                      ▼
//!   ┌─────────────────── Mutex<RenderState> ───────────────┐
//!   │ buffer · cursor · state · source format · Haas       │
//!   └──────────────────────────────────────────────────────┘
//! ```
//!
//! Control operations never allocate or free while holding the lock: new
//! buffers and delay lines are built beforehand and the replaced ones are
//! dropped after it is released. The lock is only ever held for a swap or a
//! flag write, which keeps the window in which the render callback can be
//! made to wait as short as possible.

use std::mem;
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::config::EngineConfig;
use crate::dsp::effect::Effect;
use crate::dsp::haas::{DelayUpdate, HaasProcessor};
use crate::error::StreamResult;
use crate::transport::cpal_backend::CpalTransport;
use crate::transport::{AudioTransport, CallbackResult, OutputStream, StreamRequest};
use crate::{OUTPUT_CHANNELS, OUTPUT_SAMPLE_RATE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
}

/// Format the caller declared for the loaded buffer. Recorded only; the
/// render path never converts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for SourceFormat {
    fn default() -> Self {
        Self { sample_rate: OUTPUT_SAMPLE_RATE, channels: OUTPUT_CHANNELS }
    }
}

/// Everything the render callback touches.
struct RenderState {
    buffer: Vec<f32>,
    cursor: usize,
    state: PlaybackState,
    source: SourceFormat,
    haas: HaasProcessor,
}

impl RenderState {
    fn new() -> Self {
        Self {
            buffer: Vec::new(),
            cursor: 0,
            state: PlaybackState::Stopped,
            source: SourceFormat::default(),
            haas: HaasProcessor::new(OUTPUT_SAMPLE_RATE),
        }
    }

    /// Fills `out` with the next `frames` frames. No allocation, no I/O.
    fn render(&mut self, out: &mut [f32], frames: usize) -> CallbackResult {
        if self.state != PlaybackState::Playing || self.buffer.is_empty() {
            out.fill(0.0);
            return CallbackResult::Continue;
        }

        let requested = (frames * OUTPUT_CHANNELS as usize).min(out.len());
        let remaining = self.buffer.len() - self.cursor;
        let to_copy = requested.min(remaining);

        out[..to_copy].copy_from_slice(&self.buffer[self.cursor..self.cursor + to_copy]);
        out[to_copy..].fill(0.0);

        self.cursor += to_copy;
        if self.cursor >= self.buffer.len() {
            // single-shot: rewind and stop
            self.cursor = 0;
            self.state = PlaybackState::Stopped;
        }

        self.haas.process_in_place(out, frames);
        CallbackResult::Continue
    }
}

pub struct PlaybackEngine {
    shared: Arc<Mutex<RenderState>>,
    transport: Box<dyn AudioTransport>,
    output_stream: Option<Box<dyn OutputStream>>,
    cfg: EngineConfig,
}

impl PlaybackEngine {
    /// Engine backed by cpal, output device chosen from `cfg`.
    pub fn new(cfg: EngineConfig) -> Self {
        let transport = CpalTransport::new(cfg.output_name.clone(), cfg.output_index);
        Self::with_transport(cfg, Box::new(transport))
    }

    pub fn with_transport(cfg: EngineConfig, transport: Box<dyn AudioTransport>) -> Self {
        let engine = Self {
            shared: Arc::new(Mutex::new(RenderState::new())),
            transport,
            output_stream: None,
            cfg,
        };
        if engine.cfg.haas_delay_ms != 0 {
            engine.set_haas_delay(engine.cfg.haas_delay_ms);
        }
        engine.enable_haas(engine.cfg.haas_enabled);
        engine
    }

    /// Opens and starts the output stream. Already running is a success.
    ///
    /// A stream that opened but failed to start is released before the
    /// error is returned.
    pub fn start(&mut self) -> StreamResult<()> {
        if self.output_stream.is_some() {
            debug!("start: stream already running");
            return Ok(());
        }

        let request = StreamRequest::playback().with_block_size(self.cfg.block_size);
        let shared = Arc::clone(&self.shared);
        let mut stream = self.transport.open_output(
            &request,
            Box::new(move |out: &mut [f32], frames: usize| shared.lock().render(out, frames)),
        )?;
        stream.start()?;

        info!(
            "output stream started: {} Hz, {} ch",
            stream.sample_rate(),
            stream.channels()
        );
        self.output_stream = Some(stream);
        Ok(())
    }

    /// Stops playback and releases the stream. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.shared.lock().state = PlaybackState::Stopped;
        if self.output_stream.take().is_some() {
            info!("output stream closed");
        }
    }

    pub fn is_running(&self) -> bool {
        self.output_stream.is_some()
    }

    /// Replaces the sample buffer and rewinds. `samples` are interleaved and
    /// must already match the 48 kHz stereo output format.
    pub fn load_buffer(&self, samples: Vec<f32>, sample_rate: u32, channels: u16) -> bool {
        let source = SourceFormat { sample_rate, channels };
        if source != SourceFormat::default() {
            warn!(
                "loaded buffer is {sample_rate} Hz / {channels} ch; output is {OUTPUT_SAMPLE_RATE} Hz / {OUTPUT_CHANNELS} ch, playing without conversion"
            );
        }
        let len = samples.len();

        let previous = {
            let mut st = self.shared.lock();
            st.cursor = 0;
            st.source = source;
            mem::replace(&mut st.buffer, samples)
        };
        drop(previous);

        debug!("buffer loaded: {len} samples, {sample_rate} Hz, {channels} ch");
        true
    }

    /// Resumes from the current cursor.
    pub fn play(&self) {
        self.shared.lock().state = PlaybackState::Playing;
        debug!("play");
    }

    /// Suspends rendering; the cursor is kept.
    pub fn pause(&self) {
        self.shared.lock().state = PlaybackState::Stopped;
        debug!("pause");
    }

    /// Sets the Haas delay. Values outside `0..=MAX_DELAY_MS` are ignored.
    pub fn set_haas_delay(&self, delay_ms: i32) {
        let Some(update) = DelayUpdate::new(delay_ms, OUTPUT_SAMPLE_RATE) else {
            warn!("ignoring out-of-range Haas delay: {delay_ms} ms");
            return;
        };
        let samples = update.delay_samples();
        let retired = self.shared.lock().haas.apply_delay(update);
        drop(retired);
        debug!("Haas delay: {delay_ms} ms ({samples} samples)");
    }

    pub fn enable_haas(&self, enabled: bool) {
        self.shared.lock().haas.set_enabled(enabled);
        debug!("Haas effect {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Runs the render callback directly, exactly as the transport would.
    pub fn render(&self, out: &mut [f32], frames: usize) -> CallbackResult {
        self.shared.lock().render(out, frames)
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.lock().state
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    /// Cursor into the loaded buffer, in samples.
    pub fn position(&self) -> usize {
        self.shared.lock().cursor
    }

    /// Length of the loaded buffer, in samples.
    pub fn len(&self) -> usize {
        self.shared.lock().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn source_format(&self) -> SourceFormat {
        self.shared.lock().source
    }

    /// `(enabled, delay_samples)` of the Haas processor.
    pub fn haas_config(&self) -> (bool, usize) {
        let st = self.shared.lock();
        (st.haas.is_enabled(), st.haas.delay_samples())
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
