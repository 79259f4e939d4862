use std::sync::Arc;

use haas_engine::{
    AudioTransport, CallbackResult, EngineConfig, OutputStream, PlaybackEngine, PlaybackState,
    RenderCallback, StreamError, StreamRequest, StreamResult,
};
use parking_lot::Mutex;

/// In-process transport: the test pumps the registered callback by hand.
#[derive(Default)]
struct Fake {
    fail_open: bool,
    fail_start: bool,
    opened: usize,
    released: usize,
    started: bool,
    request: Option<StreamRequest>,
    callback: Option<RenderCallback>,
}

#[derive(Clone, Default)]
struct FakeTransport(Arc<Mutex<Fake>>);

impl FakeTransport {
    fn pump(&self, frames: usize) -> (Vec<f32>, CallbackResult) {
        let mut fake = self.0.lock();
        assert!(fake.started, "pumped a stream that is not running");
        let cb = fake.callback.as_mut().expect("no callback registered");
        let mut out = vec![f32::NAN; frames * 2];
        let res = cb(&mut out, frames);
        (out, res)
    }
}

impl AudioTransport for FakeTransport {
    fn open_output(
        &self,
        request: &StreamRequest,
        callback: RenderCallback,
    ) -> StreamResult<Box<dyn OutputStream>> {
        let mut fake = self.0.lock();
        if fake.fail_open {
            return Err(StreamError::Open("device busy".into()));
        }
        fake.opened += 1;
        fake.request = Some(request.clone());
        fake.callback = Some(callback);
        Ok(Box::new(FakeStream(Arc::clone(&self.0))))
    }
}

struct FakeStream(Arc<Mutex<Fake>>);

impl OutputStream for FakeStream {
    fn start(&mut self) -> StreamResult<()> {
        let mut fake = self.0.lock();
        if fake.fail_start {
            return Err(StreamError::Start("refused".into()));
        }
        fake.started = true;
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        48_000
    }

    fn channels(&self) -> u16 {
        2
    }
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        let mut fake = self.0.lock();
        fake.released += 1;
        fake.started = false;
        fake.callback = None;
    }
}

fn setup(cfg: EngineConfig) -> (PlaybackEngine, FakeTransport) {
    let transport = FakeTransport::default();
    let engine = PlaybackEngine::with_transport(cfg, Box::new(transport.clone()));
    (engine, transport)
}

fn stereo(frames: usize) -> Vec<f32> {
    (0..frames)
        .flat_map(|i| {
            let s = ((i % 97) as f32 + 1.0) / 100.0;
            [s, s]
        })
        .collect()
}

#[test]
fn start_requests_low_latency_exclusive_stereo() {
    let cfg = EngineConfig { block_size: Some(192), ..Default::default() };
    let (mut engine, transport) = setup(cfg);
    engine.start().unwrap();
    assert!(engine.is_running());

    let fake = transport.0.lock();
    let req = fake.request.clone().unwrap();
    assert_eq!(req, StreamRequest::playback().with_block_size(Some(192)));
    assert_eq!(req.sample_rate, 48_000);
    assert_eq!(req.channels, 2);
    assert!(fake.started);
}

#[test]
fn start_twice_keeps_one_stream() {
    let (mut engine, transport) = setup(EngineConfig::default());
    engine.start().unwrap();
    engine.start().unwrap();
    assert_eq!(transport.0.lock().opened, 1);
}

#[test]
fn open_failure_is_reported() {
    let (mut engine, transport) = setup(EngineConfig::default());
    transport.0.lock().fail_open = true;
    assert!(matches!(engine.start(), Err(StreamError::Open(_))));
    assert!(!engine.is_running());
    assert_eq!(transport.0.lock().released, 0);
}

#[test]
fn start_failure_releases_opened_stream() {
    let (mut engine, transport) = setup(EngineConfig::default());
    transport.0.lock().fail_start = true;
    assert!(matches!(engine.start(), Err(StreamError::Start(_))));
    assert!(!engine.is_running());
    {
        let fake = transport.0.lock();
        assert_eq!(fake.opened, 1);
        assert_eq!(fake.released, 1);
        assert!(fake.callback.is_none());
    }

    // retry after the device recovers
    transport.0.lock().fail_start = false;
    engine.start().unwrap();
    assert!(engine.is_running());
}

#[test]
fn stop_releases_stream_and_is_idempotent() {
    let (mut engine, transport) = setup(EngineConfig::default());
    engine.stop();
    engine.start().unwrap();
    engine.play();
    engine.stop();
    engine.stop();
    assert!(!engine.is_running());
    assert_eq!(engine.state(), PlaybackState::Stopped);
    assert_eq!(transport.0.lock().released, 1);
}

#[test]
fn drop_releases_stream() {
    let (mut engine, transport) = setup(EngineConfig::default());
    engine.start().unwrap();
    drop(engine);
    assert_eq!(transport.0.lock().released, 1);
}

#[test]
fn empty_buffer_renders_silence_indefinitely() {
    let (mut engine, transport) = setup(EngineConfig::default());
    engine.start().unwrap();
    engine.load_buffer(Vec::new(), 48_000, 2);
    engine.play();
    for frames in [1, 64, 256, 960] {
        let (out, res) = transport.pump(frames);
        assert_eq!(res, CallbackResult::Continue);
        assert_eq!(out.len(), frames * 2);
        assert!(out.iter().all(|&s| s == 0.0));
    }
}

#[test]
fn single_shot_stops_exactly_at_end() {
    let (mut engine, transport) = setup(EngineConfig::default());
    engine.start().unwrap();
    let data = stereo(300);
    engine.load_buffer(data.clone(), 48_000, 2);
    engine.play();

    let mut rendered = Vec::new();
    for frames in [128, 100, 72] {
        assert!(engine.is_playing());
        let (out, res) = transport.pump(frames);
        assert_eq!(res, CallbackResult::Continue);
        rendered.extend(out);
    }
    assert_eq!(rendered, data);
    assert_eq!(engine.state(), PlaybackState::Stopped);
    assert_eq!(engine.position(), 0);

    // no replay without a new play()
    let (out, _) = transport.pump(128);
    assert!(out.iter().all(|&s| s == 0.0));

    // play() after the end starts from the top
    engine.play();
    let (out, _) = transport.pump(10);
    assert_eq!(out, data[..20]);
}

#[test]
fn partial_tail_block_is_zero_filled() {
    let (mut engine, transport) = setup(EngineConfig::default());
    engine.start().unwrap();
    let data = stereo(100);
    engine.load_buffer(data.clone(), 48_000, 2);
    engine.play();

    transport.pump(70);
    assert_eq!(engine.position(), 140);
    let (out, _) = transport.pump(64);
    assert_eq!(out[..60], data[140..]);
    assert!(out[60..].iter().all(|&s| s == 0.0));
    assert_eq!(engine.state(), PlaybackState::Stopped);
}

#[test]
fn haas_delays_right_channel_through_render() {
    let cfg = EngineConfig { haas_enabled: true, haas_delay_ms: 1, ..Default::default() };
    let (mut engine, transport) = setup(cfg);
    engine.start().unwrap();
    let data = stereo(500);
    engine.load_buffer(data.clone(), 48_000, 2);
    engine.play();

    let d = 48;
    let mut rendered = Vec::new();
    for _ in 0..5 {
        rendered.extend(transport.pump(100).0);
    }
    for i in 0..500 {
        assert_eq!(rendered[2 * i], data[2 * i]);
        let expected = if i < d { 0.0 } else { data[2 * (i - d)] };
        assert_eq!(rendered[2 * i + 1], expected, "frame {i}");
    }
}

#[test]
fn disabling_haas_restores_passthrough() {
    let cfg = EngineConfig { haas_enabled: true, haas_delay_ms: 5, ..Default::default() };
    let (mut engine, transport) = setup(cfg);
    engine.start().unwrap();
    let data = stereo(400);
    engine.load_buffer(data.clone(), 48_000, 2);
    engine.play();

    transport.pump(200);
    engine.enable_haas(false);
    let (out, _) = transport.pump(200);
    assert_eq!(out, data[400..]);
}

#[test]
fn delay_change_mid_playback_resets_history() {
    let cfg = EngineConfig { haas_enabled: true, haas_delay_ms: 1, ..Default::default() };
    let (mut engine, transport) = setup(cfg);
    engine.start().unwrap();
    let data = stereo(600);
    engine.load_buffer(data.clone(), 48_000, 2);
    engine.play();

    transport.pump(200);
    engine.set_haas_delay(1);
    let (out, _) = transport.pump(200);
    for i in 0..48 {
        assert_eq!(out[2 * i + 1], 0.0, "frame {i}");
    }
    assert_eq!(out[2 * 48 + 1], data[2 * 200 + 1]);

    // rejected values leave the running delay alone
    engine.set_haas_delay(-1);
    engine.set_haas_delay(1000);
    assert_eq!(engine.haas_config(), (true, 48));
    let (out, _) = transport.pump(10);
    assert_eq!(out[1], data[2 * (400 - 48) + 1]);
}

#[test]
fn control_thread_races_render_thread() {
    let (mut engine, transport) = setup(EngineConfig::default());
    engine.start().unwrap();
    engine.load_buffer(stereo(48_000), 48_000, 2);
    engine.play();
    engine.enable_haas(true);

    let pump = {
        let transport = transport.clone();
        std::thread::spawn(move || {
            for _ in 0..2_000 {
                let (out, res) = transport.pump(64);
                assert_eq!(res, CallbackResult::Continue);
                assert!(out.iter().all(|s| s.is_finite()));
            }
        })
    };
    for i in 0..200 {
        engine.set_haas_delay(i % 40);
        if i % 50 == 0 {
            engine.load_buffer(stereo(4_800), 48_000, 2);
            engine.play();
        }
    }
    pump.join().unwrap();
}
