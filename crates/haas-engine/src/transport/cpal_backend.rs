use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{debug, error, info};

use super::{
    AudioTransport, CallbackResult, Direction, OutputStream, RenderCallback, SampleFormat,
    StreamRequest,
};
use crate::error::{StreamError, StreamResult};

/// Output transport over the default cpal host.
#[derive(Debug, Clone, Default)]
pub struct CpalTransport {
    output_name: Option<String>,
    output_index: Option<usize>,
}

impl CpalTransport {
    pub fn new(output_name: Option<String>, output_index: Option<usize>) -> Self {
        Self { output_name, output_index }
    }
}

impl AudioTransport for CpalTransport {
    fn open_output(
        &self,
        request: &StreamRequest,
        mut callback: RenderCallback,
    ) -> StreamResult<Box<dyn OutputStream>> {
        if request.direction != Direction::Output {
            return Err(StreamError::UnsupportedConfig("only output streams are supported".into()));
        }
        if request.format != SampleFormat::F32 {
            return Err(StreamError::UnsupportedConfig(format!("{:?} samples", request.format)));
        }

        let host = cpal::default_host();
        let device = pick_output_device(&host, self.output_name.as_deref(), self.output_index)?
            .ok_or(StreamError::NoDevice)?;
        let device_name = device.name().unwrap_or_else(|_| "<unknown>".to_string());

        let sr = request.sample_rate;
        let supported = device
            .supported_output_configs()
            .map_err(|e| StreamError::Open(e.to_string()))?
            .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
            .filter(|c| c.channels() == request.channels)
            .find(|c| c.min_sample_rate().0 <= sr && sr <= c.max_sample_rate().0)
            .ok_or_else(|| {
                StreamError::UnsupportedConfig(format!(
                    "{device_name}: no f32 config with {} channels at {sr} Hz",
                    request.channels
                ))
            })?;

        let mut config = supported.with_sample_rate(cpal::SampleRate(sr)).config();
        if let Some(bs) = request.block_size {
            config.buffer_size = cpal::BufferSize::Fixed(bs);
        }

        // cpal has no notion of these; they stay advisory
        debug!(
            "performance mode {:?}, sharing mode {:?} requested",
            request.performance_mode, request.sharing_mode
        );

        let channels = config.channels as usize;
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels;
                    if callback(data, frames) == CallbackResult::Stop {
                        data.fill(0.0);
                    }
                },
                move |err| error!("output stream error: {err}"),
                None,
            )
            .map_err(|e| StreamError::Open(e.to_string()))?;

        info!(
            "opened output stream on {device_name}: {} ch, {sr} Hz, buffer {:?}",
            config.channels, config.buffer_size
        );

        Ok(Box::new(CpalOutputStream {
            stream,
            sample_rate: sr,
            channels: config.channels,
        }))
    }
}

struct CpalOutputStream {
    stream: cpal::Stream,
    sample_rate: u32,
    channels: u16,
}

impl OutputStream for CpalOutputStream {
    fn start(&mut self) -> StreamResult<()> {
        self.stream.play().map_err(|e| StreamError::Start(e.to_string()))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }
}

/* ---------- device picking (by index, then name) ---------- */

pub(crate) fn pick_output_device(
    host: &cpal::Host,
    name_substr: Option<&str>,
    index: Option<usize>,
) -> StreamResult<Option<cpal::Device>> {
    // Try explicit index first; indices match `devices::list_output_devices`
    if let Some(idx) = index {
        if let Some(dev) = host.output_devices()?.nth(idx) {
            return Ok(Some(dev));
        }
        // fallthrough to name/default if index not found
    }

    if let Some(q) = name_substr {
        let qn = q.to_lowercase();
        for dev in host.output_devices()? {
            let name = dev.name().unwrap_or_default();
            if name.to_lowercase().contains(&qn) {
                return Ok(Some(dev));
            }
        }
    }

    Ok(host.default_output_device())
}
