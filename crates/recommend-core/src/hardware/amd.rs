//! AMD ROCm probing via `rocm-smi`.
//!
//! ROCm support is marked experimental throughout the pipeline: the
//! catalog's `platform_support.amd_rocm` flags are expected to be sparser
//! than NVIDIA/Apple, and this probe makes no attempt to infer a laptop
//! sustained-performance ratio — it defaults to desktop (`1.0`) since ROCm
//! is overwhelmingly a desktop/workstation deployment target today.

use std::time::Duration;

use crate::command::{first_number, CommandRunner};

use super::{GpuInfo, GpuVendor};

pub struct AmdReading {
    pub gfx_version: String,
    pub vram_gb: f32,
    pub temperature_celsius: Option<f32>,
}

/// Query `rocm-smi` for VRAM and GFX version. Returns `None` if ROCm is not
/// installed or no AMD device is present.
pub fn probe(runner: &dyn CommandRunner, timeout: Duration) -> Option<AmdReading> {
    let vram_text = runner.run("rocm-smi", &["--showmeminfo", "vram"], timeout)?;
    let vram_mb = parse_vram_mb(&vram_text)?;

    let gfx_text = runner.run("rocm-smi", &["--showproductname"], timeout);
    let gfx_version = gfx_text
        .as_deref()
        .and_then(parse_gfx_version)
        .unwrap_or_else(|| "unknown".to_string());

    let temp_text = runner.run("rocm-smi", &["--showtemp"], timeout);
    let temperature_celsius = temp_text
        .as_deref()
        .and_then(|t| first_number("rocm-smi --showtemp", t).ok())
        .map(|v| v as f32);

    Some(AmdReading {
        gfx_version,
        vram_gb: vram_mb / 1024.0,
        temperature_celsius,
    })
}

fn parse_vram_mb(text: &str) -> Option<f32> {
    for line in text.lines() {
        if line.contains("Total Memory") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            for (i, part) in parts.iter().enumerate() {
                if part.contains("MB") && i > 0 {
                    if let Ok(v) = parts[i - 1].parse::<f32>() {
                        return Some(v);
                    }
                }
            }
        }
    }
    None
}

fn parse_gfx_version(text: &str) -> Option<String> {
    text.lines()
        .find(|l| l.to_lowercase().contains("gfx"))
        .map(|l| l.trim().to_string())
}

pub fn to_gpu_info(reading: &AmdReading) -> GpuInfo {
    GpuInfo {
        vendor: GpuVendor::Amd,
        name: format!("AMD {}", reading.gfx_version),
        vram_gb: reading.vram_gb,
        memory_bandwidth_gbps: 0.0, // not exposed by rocm-smi in a portable form
        compute_capability: None,
        supports_fp8: false,
        supports_bf16: true,
        supports_fp4: false,
        flash_attention: false,
        unified_memory: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct StubRunner(HashMap<&'static str, &'static str>);

    impl CommandRunner for StubRunner {
        fn run(&self, _program: &str, args: &[&str], _timeout: Duration) -> Option<String> {
            let key = args.last().copied().unwrap_or("");
            self.0.get(key).map(|s| s.to_string())
        }
    }

    #[test]
    fn probe_parses_vram_from_rocm_smi_output() {
        let mut stub = HashMap::new();
        stub.insert("vram", "GPU[0]\t: Total Memory (B): 17163091968\nGPU[0]\t: vram Total Memory (MB): 16368\n");
        let runner = StubRunner(stub);
        let reading = probe(&runner, Duration::from_secs(5)).unwrap();
        assert!((reading.vram_gb - 15.98).abs() < 0.1);
    }

    #[test]
    fn probe_returns_none_when_rocm_smi_missing() {
        let runner = StubRunner(HashMap::new());
        assert!(probe(&runner, Duration::from_secs(5)).is_none());
    }

    #[test]
    fn to_gpu_info_marks_experimental_capabilities() {
        let reading = AmdReading {
            gfx_version: "gfx1100".into(),
            vram_gb: 16.0,
            temperature_celsius: Some(65.0),
        };
        let gpu = to_gpu_info(&reading);
        assert!(!gpu.supports_fp8);
        assert!(!gpu.flash_attention);
        assert_eq!(gpu.vendor, GpuVendor::Amd);
    }
}
