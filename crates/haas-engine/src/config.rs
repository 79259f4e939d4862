#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub output_name: Option<String>,      // match by substring (case-insensitive)
    pub output_index: Option<usize>,      // explicit index from device list
    pub block_size: Option<u32>,          // frames per buffer (if backend supports)
    pub haas_enabled: bool,
    pub haas_delay_ms: i32,               // applied at construction, 0..=MAX_DELAY_MS
}
