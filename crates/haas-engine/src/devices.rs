use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait};

#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub index: usize,       // usable as `EngineConfig::output_index`
    pub name: String,
    pub is_default: bool,
}

pub fn list_output_devices() -> Result<Vec<DeviceInfo>> {
    let host = cpal::default_host();

    let default_out = host.default_output_device().map(|d| d.name().unwrap_or_default());

    let devices = host.output_devices().context("Failed to enumerate output devices")?;
    let out = devices
        .enumerate()
        .map(|(index, dev)| {
            let name = dev.name().unwrap_or_else(|_| "<unknown>".to_string());
            let is_default = default_out.as_ref().map(|n| n == &name).unwrap_or(false);
            DeviceInfo { index, name, is_default }
        })
        .collect();
    Ok(out)
}

/// Pretty-print for CLI
pub fn print_devices() -> Result<()> {
    let list = list_output_devices()?;
    if list.is_empty() {
        println!("(no output devices found)");
        return Ok(());
    }
    for d in &list {
        let mark = if d.is_default { "*" } else { " " };
        println!("{mark} {:>2}  {}", d.index, d.name);
    }
    Ok(())
}
