//! Haas (precedence effect) stereo widener.
//!
//! The left channel passes through untouched while the right channel is
//! emitted `delay_samples` frames late, read from a circular delay line.
//! Both lines are allocated to the capacity of the maximum delay, but the
//! running index wraps modulo the *configured* delay, not the capacity.

use std::mem;

use super::effect::Effect;

/// Largest accepted delay, in milliseconds.
pub const MAX_DELAY_MS: i32 = 500;

const CHANNELS: usize = 2;

/// Delay-line capacity in samples for `sample_rate`.
pub fn delay_capacity(sample_rate: u32) -> usize {
    (MAX_DELAY_MS as f64 / 1000.0 * sample_rate as f64).ceil() as usize
}

/// A validated delay setting together with freshly zeroed delay lines.
///
/// Built on the control thread so that swapping it into a running
/// [`HaasProcessor`] costs no allocation on the audio thread. After
/// [`HaasProcessor::apply_delay`] it holds the retired lines, which the
/// caller drops outside any lock.
pub struct DelayUpdate {
    delay_ms: i32,
    delay_samples: usize,
    left: Box<[f32]>,
    right: Box<[f32]>,
}

impl DelayUpdate {
    /// Returns `None` when `delay_ms` is outside `0..=MAX_DELAY_MS`.
    pub fn new(delay_ms: i32, sample_rate: u32) -> Option<Self> {
        if !(0..=MAX_DELAY_MS).contains(&delay_ms) {
            return None;
        }
        let capacity = delay_capacity(sample_rate);
        let delay_samples = (delay_ms as f64 / 1000.0 * sample_rate as f64).round() as usize;
        Some(Self {
            delay_ms,
            delay_samples: delay_samples.min(capacity),
            left: vec![0.0; capacity].into_boxed_slice(),
            right: vec![0.0; capacity].into_boxed_slice(),
        })
    }

    pub fn delay_ms(&self) -> i32 {
        self.delay_ms
    }

    pub fn delay_samples(&self) -> usize {
        self.delay_samples
    }
}

pub struct HaasProcessor {
    enabled: bool,
    sample_rate: u32,
    delay_ms: i32,
    delay_samples: usize,
    left: Box<[f32]>,
    right: Box<[f32]>,
    index: usize,
}

impl HaasProcessor {
    /// Disabled, 0 ms delay, lines sized for the maximum delay.
    pub fn new(sample_rate: u32) -> Self {
        let capacity = delay_capacity(sample_rate);
        Self {
            enabled: false,
            sample_rate,
            delay_ms: 0,
            delay_samples: 0,
            left: vec![0.0; capacity].into_boxed_slice(),
            right: vec![0.0; capacity].into_boxed_slice(),
            index: 0,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn delay_ms(&self) -> i32 {
        self.delay_ms
    }

    pub fn delay_samples(&self) -> usize {
        self.delay_samples
    }

    pub fn capacity(&self) -> usize {
        self.left.len()
    }

    /// Reconfigures the delay. Out-of-range values are rejected and leave
    /// the processor untouched. Every accepted value, including the current
    /// one, discards the delayed history.
    pub fn set_delay_ms(&mut self, delay_ms: i32) -> bool {
        match DelayUpdate::new(delay_ms, self.sample_rate) {
            Some(update) => {
                self.apply_delay(update);
                true
            }
            None => false,
        }
    }

    /// Swaps in a prepared delay configuration and resets the index.
    /// Returns the update now holding the previous lines.
    pub fn apply_delay(&mut self, mut update: DelayUpdate) -> DelayUpdate {
        mem::swap(&mut self.left, &mut update.left);
        mem::swap(&mut self.right, &mut update.right);
        mem::swap(&mut self.delay_ms, &mut update.delay_ms);
        mem::swap(&mut self.delay_samples, &mut update.delay_samples);
        self.index = 0;
        update
    }

    #[inline]
    fn is_active(&self) -> bool {
        self.enabled && self.delay_samples > 0
    }

    /// Advances the lines by one frame and returns the delayed right sample.
    #[inline]
    fn tick(&mut self, left: f32, right: f32) -> f32 {
        let idx = self.index;
        let delayed_right = self.right[idx];
        self.left[idx] = left;
        self.right[idx] = right;
        self.index = (idx + 1) % self.delay_samples;
        delayed_right
    }
}

impl Effect for HaasProcessor {
    fn process(&mut self, input: &[f32], output: &mut [f32], frames: usize) {
        let n = (frames * CHANNELS).min(input.len()).min(output.len());
        if !self.is_active() {
            output[..n].copy_from_slice(&input[..n]);
            return;
        }
        for (src, dst) in input[..n]
            .chunks_exact(CHANNELS)
            .zip(output[..n].chunks_exact_mut(CHANNELS))
        {
            let (left, right) = (src[0], src[1]);
            dst[0] = left;
            dst[1] = self.tick(left, right);
        }
    }

    fn process_in_place(&mut self, block: &mut [f32], frames: usize) {
        if !self.is_active() {
            return;
        }
        let n = (frames * CHANNELS).min(block.len());
        for frame in block[..n].chunks_exact_mut(CHANNELS) {
            let (left, right) = (frame[0], frame[1]);
            frame[1] = self.tick(left, right);
        }
    }
}
