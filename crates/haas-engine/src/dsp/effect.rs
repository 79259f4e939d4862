/// Real-time safe effect interface.
/// - process() must not allocate or lock on the hot path.
/// - blocks are interleaved stereo f32 samples; `frames` counts L,R pairs.
pub trait Effect: Send {
    fn process(&mut self, input: &[f32], output: &mut [f32], frames: usize);

    /// Same as `process` with input and output being one region.
    fn process_in_place(&mut self, block: &mut [f32], frames: usize);
}
