//! Shared fixtures for pipeline-layer unit tests. Not part of the public
//! API; compiled only under `#[cfg(test)]`.

use std::collections::HashSet;

use recommend_core::catalog::{
    Capabilities, CapabilityScores, CatalogEntry, CloudAvailability, ComputeIntensity,
    HardwareRequirements, PlatformVariantSupport, Precision, Variant, VariantPlatformSupport,
};
use recommend_core::hardware::{
    CpuInfo, CpuTier, FormFactor, GpuInfo, GpuVendor, HardwareProfile, Platform, PowerState,
    RamInfo, RamType, StorageInfo, StorageTier, StorageType, ThermalState,
};
use recommend_core::user_profile::{
    CloudWillingness, ImagePrefs, Modality, SharedQuality, TechnicalLevel, UseCase, UserProfile,
};

pub fn flux_entry() -> CatalogEntry {
    let support = |nvidia_cc: Option<(u32, u32)>, apple: bool| VariantPlatformSupport {
        nvidia: PlatformVariantSupport {
            supported: true,
            min_compute_capability: nvidia_cc,
        },
        apple_mps: PlatformVariantSupport {
            supported: apple,
            min_compute_capability: None,
        },
        amd_rocm: PlatformVariantSupport {
            supported: false,
            min_compute_capability: None,
        },
    };

    CatalogEntry {
        id: "flux-dev".into(),
        family: "flux".into(),
        name: "Flux.1 Dev".into(),
        license: "non-commercial".into(),
        variants: vec![
            Variant {
                id: "flux-dev-fp16".into(),
                precision: Precision::Fp16,
                vram_min_mb: 20_000,
                vram_recommended_mb: 24_000,
                download_size_gb: 23.8,
                quality_retention_percent: 100,
                platform_support: support(None, true),
                required_nodes: vec![],
            },
            Variant {
                id: "flux-dev-fp8".into(),
                precision: Precision::Fp8,
                vram_min_mb: 16_000,
                vram_recommended_mb: 20_000,
                download_size_gb: 12.0,
                quality_retention_percent: 95,
                platform_support: support(Some((8, 9)), false),
                required_nodes: vec![],
            },
            Variant {
                id: "flux-dev-q4km".into(),
                precision: Precision::Gguf(recommend_core::catalog::GgufQuant::Q4KM),
                vram_min_mb: 9_000,
                vram_recommended_mb: 11_000,
                download_size_gb: 7.1,
                quality_retention_percent: 85,
                platform_support: support(None, true),
                required_nodes: vec![],
            },
        ],
        capabilities: Capabilities {
            primary: vec![Modality::Image],
            scores: CapabilityScores {
                photorealism: 0.9,
                speed: 0.4,
                ..Default::default()
            },
            style_tags: ["photorealism".to_string()].into_iter().collect(),
            controlnet_support: HashSet::new(),
            video_modes: HashSet::new(),
            mps_performance_penalty: 0.2,
            ecosystem_maturity: 0.8,
            approach_fit: 0.7,
        },
        hardware: HardwareRequirements {
            total_size_gb: 24.0,
            compute_intensity: ComputeIntensity::High,
            supports_cpu_offload: true,
            ram_for_offload_gb: Some(16.0),
            supports_tensorrt: true,
            minimum_ram_gb: 16.0,
        },
        cloud: CloudAvailability {
            available: false,
            service: None,
            estimated_cost_per_gen: None,
        },
        incompatibilities: vec![],
    }
}

pub fn animatediff_entry() -> CatalogEntry {
    let support = |nvidia_cc: Option<(u32, u32)>, apple: bool| VariantPlatformSupport {
        nvidia: PlatformVariantSupport {
            supported: true,
            min_compute_capability: nvidia_cc,
        },
        apple_mps: PlatformVariantSupport {
            supported: apple,
            min_compute_capability: None,
        },
        amd_rocm: PlatformVariantSupport {
            supported: false,
            min_compute_capability: None,
        },
    };

    CatalogEntry {
        id: "animatediff".into(),
        family: "animatediff".into(),
        name: "AnimateDiff".into(),
        license: "apache-2.0".into(),
        variants: vec![Variant {
            id: "animatediff-fp16".into(),
            precision: Precision::Fp16,
            vram_min_mb: 8_000,
            vram_recommended_mb: 12_000,
            download_size_gb: 6.5,
            quality_retention_percent: 100,
            platform_support: support(None, true),
            required_nodes: vec![],
        }],
        capabilities: Capabilities {
            primary: vec![Modality::Video],
            scores: CapabilityScores {
                motion_quality: 0.7,
                temporal_coherence: 0.6,
                speed: 0.5,
                ..Default::default()
            },
            style_tags: HashSet::new(),
            controlnet_support: HashSet::new(),
            video_modes: ["text_to_video".to_string()].into_iter().collect(),
            mps_performance_penalty: 0.1,
            ecosystem_maturity: 0.6,
            approach_fit: 0.6,
        },
        hardware: HardwareRequirements {
            total_size_gb: 6.5,
            compute_intensity: ComputeIntensity::Medium,
            supports_cpu_offload: true,
            ram_for_offload_gb: Some(8.0),
            supports_tensorrt: false,
            minimum_ram_gb: 8.0,
        },
        cloud: CloudAvailability {
            available: false,
            service: None,
            estimated_cost_per_gen: None,
        },
        incompatibilities: vec![],
    }
}

fn gpu(vram_gb: f32, unified: bool, cc: Option<(u32, u32)>) -> GpuInfo {
    GpuInfo {
        vendor: if unified { GpuVendor::Apple } else { GpuVendor::Nvidia },
        name: "test-gpu".into(),
        vram_gb,
        memory_bandwidth_gbps: 500.0,
        compute_capability: cc,
        supports_fp8: cc.map(|(maj, min)| (maj as f32 + min as f32 / 10.0) >= 8.9).unwrap_or(false),
        supports_bf16: true,
        supports_fp4: false,
        flash_attention: true,
        unified_memory: unified,
    }
}

fn cpu(physical_cores: u32, avx2: bool) -> CpuInfo {
    CpuInfo {
        model: "test-cpu".into(),
        physical_cores,
        logical_cores: physical_cores * 2,
        arch: "x86_64".into(),
        supports_avx: true,
        supports_avx2: avx2,
        supports_avx512: false,
        tier: CpuTier::from_physical_cores(physical_cores),
    }
}

fn fast_storage(free_gb: f32) -> StorageInfo {
    StorageInfo {
        free_gb,
        total_gb: 2000.0,
        storage_type: StorageType::Nvme,
        tier: StorageTier::Fast,
        read_mbps: 7000.0,
    }
}

pub fn desktop_4090() -> HardwareProfile {
    HardwareProfile::build(
        Platform::NvidiaDesktop,
        gpu(24.0, false, Some((8, 9))),
        cpu(16, true),
        RamInfo::new(64.0, 56.0, RamType::Ddr5, Some(6000), 64.0),
        fast_storage(500.0),
        FormFactor::desktop(),
        ThermalState::Nominal,
        PowerState::Ac,
        vec![],
    )
    .unwrap()
}

pub fn rtx_3070_64gb_ram() -> HardwareProfile {
    HardwareProfile::build(
        Platform::NvidiaDesktop,
        gpu(8.0, false, Some((8, 6))),
        cpu(16, true),
        RamInfo::new(64.0, 56.0, RamType::Ddr5, Some(6000), 64.0),
        fast_storage(500.0),
        FormFactor::desktop(),
        ThermalState::Nominal,
        PowerState::Ac,
        vec![],
    )
    .unwrap()
}

pub fn laptop_m1_8gb() -> HardwareProfile {
    HardwareProfile::build(
        Platform::AppleSilicon,
        gpu(0.0, true, None),
        cpu(8, false),
        RamInfo::new(8.0, 5.0, RamType::Unified, None, 68.0),
        fast_storage(200.0),
        FormFactor::desktop(),
        ThermalState::Nominal,
        PowerState::Battery,
        vec![],
    )
    .unwrap()
}

pub fn laptop_4090_175w() -> HardwareProfile {
    HardwareProfile::build(
        Platform::NvidiaLaptop,
        gpu(16.0, false, Some((8, 9))),
        cpu(16, true),
        RamInfo::new(32.0, 26.0, RamType::Ddr5, Some(5600), 64.0),
        fast_storage(500.0),
        FormFactor::laptop(175.0, 450.0),
        ThermalState::Nominal,
        PowerState::Battery,
        vec![],
    )
    .unwrap()
}

pub fn user_image_only() -> UserProfile {
    UserProfile {
        use_cases: vec![UseCase {
            id: "product_photo".into(),
            required_modalities: [Modality::Image].into_iter().collect(),
        }],
        shared_quality: SharedQuality {
            photorealism: 5,
            artistic_stylization: 2,
            generation_speed: 3,
            output_quality: 4,
            character_consistency: 3,
        },
        image_prefs: Some(ImagePrefs {
            editability: 0.6,
            pose_control: 0.2,
            holistic_edits: 0.4,
            localized_edits: 0.5,
            style_tags: ["photorealism".to_string()].into_iter().collect(),
            character_consistency: recommend_core::user_profile::ConsistencyNeed::Helpful,
        }),
        video_prefs: None,
        audio_prefs: None,
        three_d_prefs: None,
        cloud_willingness: CloudWillingness::Hybrid,
        speed_priority: 0.4,
        technical_level: TechnicalLevel::Intermediate,
    }
}

pub fn user_image_and_video() -> UserProfile {
    let mut user = user_image_only();
    user.use_cases.push(UseCase {
        id: "short_clip".into(),
        required_modalities: [Modality::Video].into_iter().collect(),
    });
    user.video_prefs = Some(recommend_core::user_profile::VideoPrefs {
        motion_intensity: 0.5,
        temporal_coherence: 0.6,
        duration: recommend_core::user_profile::VideoDuration::Short,
    });
    user
}
