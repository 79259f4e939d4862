use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use haas_engine::{EngineConfig, PlaybackEngine, MAX_DELAY_MS, OUTPUT_CHANNELS, OUTPUT_SAMPLE_RATE};

#[derive(Parser)]
#[command(name="haas", version, about="Play a test signal through the Haas stereo widener")]
struct Cli {
    #[command(subcommand)]
    cmd: Command
}

#[derive(Subcommand)]
enum Command {
    /// List audio output devices
    Devices,
    /// Play a synthesized test signal
    Play {
        /// Length of the signal in seconds
        #[arg(long, default_value_t = 4.0)]
        seconds: f32,
        /// Tone frequency in Hz
        #[arg(long, default_value_t = 440.0)]
        freq: f32,
        /// Right-channel delay in milliseconds
        #[arg(long, default_value_t = 20, allow_negative_numbers = true)]
        haas_ms: i32,
        /// Play dry, effect disabled
        #[arg(long)]
        no_haas: bool,
        /// Output device, matched by name substring
        #[arg(long)]
        output: Option<String>,
        /// Output device, by index from `haas devices`
        #[arg(long)]
        output_index: Option<usize>,
        /// Frames per hardware buffer
        #[arg(long)]
        block_size: Option<u32>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Devices => haas_engine::devices::print_devices(),
        Command::Play { seconds, freq, haas_ms, no_haas, output, output_index, block_size } => {
            if !(0..=MAX_DELAY_MS).contains(&haas_ms) {
                log::warn!("--haas-ms {haas_ms} is outside 0..={MAX_DELAY_MS} and will be ignored");
            }
            let cfg = EngineConfig {
                output_name: output,
                output_index,
                block_size,
                haas_enabled: !no_haas,
                haas_delay_ms: haas_ms,
            };
            play(cfg, seconds, freq)
        }
    }
}

fn play(cfg: EngineConfig, seconds: f32, freq: f32) -> Result<()> {
    let mut engine = PlaybackEngine::new(cfg);
    engine.load_buffer(test_signal(seconds, freq), OUTPUT_SAMPLE_RATE, OUTPUT_CHANNELS);
    engine.start().context("Failed to start audio output")?;
    engine.play();

    while engine.is_playing() {
        thread::sleep(Duration::from_millis(50));
    }
    engine.stop();
    Ok(())
}

/// Identical left/right plucks twice a second, so the only stereo cue
/// left is the one the effect adds.
fn test_signal(seconds: f32, freq: f32) -> Vec<f32> {
    let sr = OUTPUT_SAMPLE_RATE as f32;
    let frames = (seconds.max(0.0) * sr) as usize;
    let period = (sr / 2.0) as usize;
    let mut out = Vec::with_capacity(frames * OUTPUT_CHANNELS as usize);
    for i in 0..frames {
        let t = i as f32 / sr;
        let since_pluck = (i % period) as f32 / sr;
        let s = 0.3 * (std::f32::consts::TAU * freq * t).sin() * (-since_pluck * 12.0).exp();
        out.push(s);
        out.push(s);
    }
    out
}
