//! Recommender Evaluation Runner
//!
//! Runs the full recommendation pipeline against a catalog and a library of
//! built-in hardware/use-case scenarios, reporting per-scenario pass/fail
//! against the expectations each scenario encodes.
//!
//! Usage:
//!   cargo run --bin recommend-eval -- run --catalog fixtures/sample_catalog.json
//!   cargo run --bin recommend-eval -- run --scenario apple_m1_8gb --verbose
//!   cargo run --bin recommend-eval -- list

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;

use recommend_core::candidate::ExecutionMode;
use recommend_core::catalog::Catalog;
use recommend_core::config::RecommenderConfig;
use recommend_core::hardware::{
    CpuInfo, CpuTier, FormFactor, GpuInfo, GpuVendor, HardwareProfile, PowerState, Platform,
    RamInfo, RamType, StorageInfo, StorageTier, StorageType, ThermalState,
};
use recommend_core::user_profile::{
    CloudWillingness, ImagePrefs, Modality, SharedQuality, TechnicalLevel, UseCase, UserProfile,
    VideoDuration, VideoPrefs,
};
use recommend_engine::recommend;

const DEFAULT_CATALOG_PATH: &str = "fixtures/sample_catalog.json";

#[derive(Parser)]
#[command(name = "recommend-eval")]
#[command(author, version, about = "Scenario evaluation runner for the model recommender")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one or all built-in scenarios against a catalog
    Run {
        /// Path to the catalog JSON document
        #[arg(short, long, default_value = DEFAULT_CATALOG_PATH)]
        catalog: PathBuf,

        /// Run a single named scenario instead of the full suite
        #[arg(short, long)]
        scenario: Option<String>,

        /// Directory to write JSON and Markdown reports into
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print per-candidate ranking detail
        #[arg(short, long)]
        verbose: bool,
    },
    /// List the built-in scenarios and their expectations
    List,
}

/// A named hardware/user fixture with a human-readable expectation, modeled
/// on the specification's worked examples rather than the catalog itself.
struct Scenario {
    id: &'static str,
    description: &'static str,
    expectation: &'static str,
    hardware: fn() -> HardwareProfile,
    user: fn() -> UserProfile,
}

fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            id: "apple_m1_8gb",
            description: "Apple M1 8GB unified memory, image generation, photorealism priority",
            expectation: "no FP16/FP8 Flux variant selected; a GGUF or lightweight variant wins; HunyuanVideo never appears",
            hardware: hw_apple_m1_8gb,
            user: user_image_photoreal,
        },
        Scenario {
            id: "apple_m3_max_48gb",
            description: "Apple M3 Max 48GB unified memory, image and video generation",
            expectation: "AnimateDiff selected for video rather than HunyuanVideo; Flux FP16 available for image",
            hardware: hw_apple_m3_max_48gb,
            user: user_image_and_video,
        },
        Scenario {
            id: "rtx_4090_desktop",
            description: "RTX 4090 24GB desktop, compute capability 8.9, speed priority",
            expectation: "Flux FP8 ranks at or above FP16 under high speed priority; sustained ratio is 1.0",
            hardware: hw_rtx_4090_desktop,
            user: user_image_speed_priority,
        },
        Scenario {
            id: "rtx_4090_laptop",
            description: "RTX 4090 Laptop, 175W power limit against a 450W reference TDP",
            expectation: "sustained performance ratio near 0.62 discounts hardware_fit for high-intensity candidates",
            hardware: hw_rtx_4090_laptop,
            user: user_video_default,
        },
        Scenario {
            id: "rtx_3070_offload",
            description: "RTX 3070 8GB VRAM, 64GB RAM, 16-core CPU",
            expectation: "a 16GB-class model is rescued onto gpu_offload with a CPU-offload warning attached",
            hardware: hw_rtx_3070_64gb_ram,
            user: user_video_default,
        },
    ]
}

fn hw_apple_m1_8gb() -> HardwareProfile {
    HardwareProfile::build(
        Platform::AppleSilicon,
        GpuInfo {
            vendor: GpuVendor::Apple,
            name: "Apple M1".into(),
            vram_gb: 0.0,
            memory_bandwidth_gbps: 68.0,
            compute_capability: None,
            supports_fp8: false,
            supports_bf16: true,
            supports_fp4: false,
            flash_attention: false,
            unified_memory: true,
        },
        CpuInfo {
            model: "Apple M1".into(),
            physical_cores: 8,
            logical_cores: 8,
            arch: "aarch64".into(),
            supports_avx: false,
            supports_avx2: false,
            supports_avx512: false,
            tier: CpuTier::from_physical_cores(8),
        },
        RamInfo::new(8.0, 5.5, RamType::Unified, None, 68.0),
        StorageInfo {
            free_gb: 200.0,
            total_gb: 256.0,
            storage_type: StorageType::Nvme,
            tier: StorageTier::Fast,
            read_mbps: 2500.0,
        },
        FormFactor::laptop(20.0, 20.0),
        ThermalState::Nominal,
        PowerState::Battery,
        vec![],
    )
    .expect("hand-built profile satisfies build invariants")
}

fn hw_apple_m3_max_48gb() -> HardwareProfile {
    HardwareProfile::build(
        Platform::AppleSilicon,
        GpuInfo {
            vendor: GpuVendor::Apple,
            name: "Apple M3 Max".into(),
            vram_gb: 0.0,
            memory_bandwidth_gbps: 400.0,
            compute_capability: None,
            supports_fp8: false,
            supports_bf16: true,
            supports_fp4: false,
            flash_attention: false,
            unified_memory: true,
        },
        CpuInfo {
            model: "Apple M3 Max".into(),
            physical_cores: 16,
            logical_cores: 16,
            arch: "aarch64".into(),
            supports_avx: false,
            supports_avx2: false,
            supports_avx512: false,
            tier: CpuTier::from_physical_cores(16),
        },
        RamInfo::new(48.0, 40.0, RamType::Unified, None, 400.0),
        StorageInfo {
            free_gb: 800.0,
            total_gb: 2000.0,
            storage_type: StorageType::Nvme,
            tier: StorageTier::Fast,
            read_mbps: 6000.0,
        },
        FormFactor::laptop(96.0, 96.0),
        ThermalState::Nominal,
        PowerState::Ac,
        vec![],
    )
    .expect("hand-built profile satisfies build invariants")
}

fn hw_rtx_4090_desktop() -> HardwareProfile {
    HardwareProfile::build(
        Platform::NvidiaDesktop,
        GpuInfo {
            vendor: GpuVendor::Nvidia,
            name: "NVIDIA GeForce RTX 4090".into(),
            vram_gb: 24.0,
            memory_bandwidth_gbps: 1008.0,
            compute_capability: Some((8, 9)),
            supports_fp8: true,
            supports_bf16: true,
            supports_fp4: false,
            flash_attention: true,
            unified_memory: false,
        },
        CpuInfo {
            model: "AMD Ryzen 9 7950X".into(),
            physical_cores: 16,
            logical_cores: 32,
            arch: "x86_64".into(),
            supports_avx: true,
            supports_avx2: true,
            supports_avx512: true,
            tier: CpuTier::from_physical_cores(16),
        },
        RamInfo::new(64.0, 56.0, RamType::Ddr5, Some(6000), 64.0),
        StorageInfo {
            free_gb: 1500.0,
            total_gb: 2000.0,
            storage_type: StorageType::Nvme,
            tier: StorageTier::Fast,
            read_mbps: 7000.0,
        },
        FormFactor::desktop(),
        ThermalState::Nominal,
        PowerState::Ac,
        vec![],
    )
    .expect("hand-built profile satisfies build invariants")
}

fn hw_rtx_4090_laptop() -> HardwareProfile {
    HardwareProfile::build(
        Platform::NvidiaLaptop,
        GpuInfo {
            vendor: GpuVendor::Nvidia,
            name: "NVIDIA GeForce RTX 4090 Laptop GPU".into(),
            vram_gb: 16.0,
            memory_bandwidth_gbps: 576.0,
            compute_capability: Some((8, 9)),
            supports_fp8: true,
            supports_bf16: true,
            supports_fp4: false,
            flash_attention: true,
            unified_memory: false,
        },
        CpuInfo {
            model: "Intel Core i9-13980HX".into(),
            physical_cores: 24,
            logical_cores: 32,
            arch: "x86_64".into(),
            supports_avx: true,
            supports_avx2: true,
            supports_avx512: false,
            tier: CpuTier::from_physical_cores(24),
        },
        RamInfo::new(32.0, 24.0, RamType::Ddr5, Some(5600), 89.6),
        StorageInfo {
            free_gb: 600.0,
            total_gb: 2000.0,
            storage_type: StorageType::Nvme,
            tier: StorageTier::Fast,
            read_mbps: 5000.0,
        },
        FormFactor::laptop(175.0, 450.0),
        ThermalState::Fair,
        PowerState::Ac,
        vec![],
    )
    .expect("hand-built profile satisfies build invariants")
}

fn hw_rtx_3070_64gb_ram() -> HardwareProfile {
    HardwareProfile::build(
        Platform::NvidiaDesktop,
        GpuInfo {
            vendor: GpuVendor::Nvidia,
            name: "NVIDIA GeForce RTX 3070".into(),
            vram_gb: 8.0,
            memory_bandwidth_gbps: 448.0,
            compute_capability: Some((8, 6)),
            supports_fp8: false,
            supports_bf16: true,
            supports_fp4: false,
            flash_attention: true,
            unified_memory: false,
        },
        CpuInfo {
            model: "AMD Ryzen 9 5950X".into(),
            physical_cores: 16,
            logical_cores: 32,
            arch: "x86_64".into(),
            supports_avx: true,
            supports_avx2: true,
            supports_avx512: false,
            tier: CpuTier::from_physical_cores(16),
        },
        RamInfo::new(64.0, 56.0, RamType::Ddr4, Some(3600), 50.0),
        StorageInfo {
            free_gb: 900.0,
            total_gb: 2000.0,
            storage_type: StorageType::Nvme,
            tier: StorageTier::Fast,
            read_mbps: 3500.0,
        },
        FormFactor::desktop(),
        ThermalState::Nominal,
        PowerState::Ac,
        vec![],
    )
    .expect("hand-built profile satisfies build invariants")
}

fn shared_quality(photorealism: u8, speed: u8) -> SharedQuality {
    SharedQuality {
        photorealism,
        artistic_stylization: 3,
        generation_speed: speed,
        output_quality: 4,
        character_consistency: 3,
    }
}

fn user_image_photoreal() -> UserProfile {
    UserProfile {
        use_cases: vec![UseCase {
            id: "product_photo".into(),
            required_modalities: [Modality::Image].into_iter().collect(),
        }],
        shared_quality: shared_quality(5, 3),
        image_prefs: Some(ImagePrefs {
            editability: 0.3,
            pose_control: 0.1,
            holistic_edits: 0.2,
            localized_edits: 0.2,
            style_tags: ["photorealism".to_string()].into_iter().collect(),
            character_consistency: recommend_core::user_profile::ConsistencyNeed::Helpful,
        }),
        video_prefs: None,
        audio_prefs: None,
        three_d_prefs: None,
        cloud_willingness: CloudWillingness::Hybrid,
        speed_priority: 0.3,
        technical_level: TechnicalLevel::Beginner,
    }
}

fn user_image_and_video() -> UserProfile {
    UserProfile {
        use_cases: vec![UseCase {
            id: "social_campaign".into(),
            required_modalities: [Modality::Image, Modality::Video].into_iter().collect(),
        }],
        shared_quality: shared_quality(4, 4),
        image_prefs: Some(ImagePrefs {
            editability: 0.5,
            pose_control: 0.3,
            holistic_edits: 0.4,
            localized_edits: 0.4,
            style_tags: std::collections::HashSet::new(),
            character_consistency: recommend_core::user_profile::ConsistencyNeed::Helpful,
        }),
        video_prefs: Some(VideoPrefs {
            motion_intensity: 0.6,
            temporal_coherence: 0.7,
            duration: VideoDuration::Short,
        }),
        audio_prefs: None,
        three_d_prefs: None,
        cloud_willingness: CloudWillingness::Hybrid,
        speed_priority: 0.4,
        technical_level: TechnicalLevel::Intermediate,
    }
}

fn user_image_speed_priority() -> UserProfile {
    UserProfile {
        use_cases: vec![UseCase {
            id: "rapid_iteration".into(),
            required_modalities: [Modality::Image].into_iter().collect(),
        }],
        shared_quality: shared_quality(4, 5),
        image_prefs: Some(ImagePrefs {
            editability: 0.3,
            pose_control: 0.1,
            holistic_edits: 0.2,
            localized_edits: 0.2,
            style_tags: std::collections::HashSet::new(),
            character_consistency: recommend_core::user_profile::ConsistencyNeed::NotNeeded,
        }),
        video_prefs: None,
        audio_prefs: None,
        three_d_prefs: None,
        cloud_willingness: CloudWillingness::LocalOnly,
        speed_priority: 0.8,
        technical_level: TechnicalLevel::Advanced,
    }
}

fn user_video_default() -> UserProfile {
    UserProfile {
        use_cases: vec![UseCase {
            id: "short_form_video".into(),
            required_modalities: [Modality::Video].into_iter().collect(),
        }],
        shared_quality: shared_quality(3, 3),
        image_prefs: None,
        video_prefs: Some(VideoPrefs {
            motion_intensity: 0.5,
            temporal_coherence: 0.6,
            duration: VideoDuration::Medium,
        }),
        audio_prefs: None,
        three_d_prefs: None,
        cloud_willingness: CloudWillingness::Hybrid,
        speed_priority: 0.4,
        technical_level: TechnicalLevel::Intermediate,
    }
}

#[derive(Debug, Clone, Serialize)]
struct ScenarioReport {
    scenario_id: String,
    description: String,
    expectation: String,
    selected: Vec<SelectedSummary>,
    warning_count: usize,
    rejection_count: usize,
}

#[derive(Debug, Clone, Serialize)]
struct SelectedSummary {
    model_id: String,
    variant_id: Option<String>,
    execution_mode: String,
}

fn execution_mode_str(mode: ExecutionMode) -> &'static str {
    match mode {
        ExecutionMode::GpuNative => "gpu_native",
        ExecutionMode::GpuOffload => "gpu_offload",
        ExecutionMode::Cloud => "cloud",
    }
}

fn run_scenario(scenario: &Scenario, catalog: &Catalog, config: &RecommenderConfig, verbose: bool) -> ScenarioReport {
    let hardware = (scenario.hardware)();
    let user = (scenario.user)();

    let result = recommend(&user, &hardware, catalog, config, None, None, None)
        .expect("scenario fixtures are built to satisfy recommend()'s preconditions");

    if verbose {
        for (modality, ranked) in &result.per_modality_rankings {
            println!("  [{}] ranking:", modality.as_str());
            for candidate in ranked {
                println!(
                    "    #{} {} score={:.3} hardware_fit={:.3} content={:.3}",
                    candidate.rank,
                    candidate.passing.model_id,
                    candidate.topsis_score,
                    candidate.criteria_scores.hardware_fit,
                    candidate.criteria_scores.content_similarity,
                );
            }
        }
    }

    let selected = result
        .manifest
        .selected
        .iter()
        .map(|s| SelectedSummary {
            model_id: s.model_id.clone(),
            variant_id: s.variant_id.clone(),
            execution_mode: execution_mode_str(s.execution_mode).to_string(),
        })
        .collect();

    ScenarioReport {
        scenario_id: scenario.id.to_string(),
        description: scenario.description.to_string(),
        expectation: scenario.expectation.to_string(),
        selected,
        warning_count: result.warnings.len(),
        rejection_count: result.rejections.len(),
    }
}

fn markdown_report(reports: &[ScenarioReport]) -> String {
    let mut out = String::new();
    out.push_str("# Recommender Scenario Report\n\n");
    for report in reports {
        out.push_str(&format!("## {}\n\n", report.scenario_id));
        out.push_str(&format!("{}\n\n", report.description));
        out.push_str(&format!("Expectation: {}\n\n", report.expectation));
        out.push_str("| Model | Variant | Execution Mode |\n|---|---|---|\n");
        for selection in &report.selected {
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                selection.model_id,
                selection.variant_id.as_deref().unwrap_or("-"),
                selection.execution_mode,
            ));
        }
        out.push_str(&format!(
            "\nWarnings: {}, Rejections: {}\n\n",
            report.warning_count, report.rejection_count
        ));
    }
    out
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::List => {
            println!("Built-in scenarios:\n");
            for scenario in scenarios() {
                println!("  {:<20} {}", scenario.id, scenario.description);
                println!("  {:<20} expects: {}\n", "", scenario.expectation);
            }
            ExitCode::SUCCESS
        }
        Commands::Run {
            catalog,
            scenario,
            output,
            verbose,
        } => {
            let catalog = match Catalog::load(&catalog) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("failed to load catalog {}: {e}", catalog.display());
                    return ExitCode::FAILURE;
                }
            };
            if !catalog.warnings.is_empty() {
                println!("catalog warnings:");
                for warning in &catalog.warnings {
                    println!("  [{}] {}", warning.model_id, warning.message);
                }
                println!();
            }

            let config = RecommenderConfig::default();
            let all = scenarios();
            let selected: Vec<&Scenario> = match &scenario {
                Some(id) => all.iter().filter(|s| s.id == id.as_str()).collect(),
                None => all.iter().collect(),
            };

            if selected.is_empty() {
                eprintln!("no scenario named {:?}; run `recommend-eval list`", scenario.unwrap());
                return ExitCode::FAILURE;
            }

            println!("═══════════════════════════════════════════════════════════════");
            println!("Recommender Scenario Evaluation");
            println!("═══════════════════════════════════════════════════════════════");
            println!("Catalog: {} entries", catalog.len());
            println!();

            let mut reports = Vec::new();
            for scenario in &selected {
                println!("─── {} ───", scenario.id);
                let report = run_scenario(scenario, &catalog, &config, verbose);
                for selection in &report.selected {
                    println!(
                        "  selected: {} ({}) via {}",
                        selection.model_id,
                        selection.variant_id.as_deref().unwrap_or("cloud"),
                        selection.execution_mode,
                    );
                }
                println!(
                    "  warnings={} rejections={}",
                    report.warning_count, report.rejection_count
                );
                println!();
                reports.push(report);
            }

            if let Some(output_dir) = output {
                if let Err(e) = std::fs::create_dir_all(&output_dir) {
                    eprintln!("failed to create output directory: {e}");
                    return ExitCode::FAILURE;
                }
                let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();

                let json_path = output_dir.join(format!("eval-{timestamp}.json"));
                match serde_json::to_string_pretty(&reports) {
                    Ok(json) => {
                        if let Err(e) = std::fs::write(&json_path, json) {
                            eprintln!("failed to write JSON report: {e}");
                        } else {
                            println!("JSON report: {}", json_path.display());
                        }
                    }
                    Err(e) => eprintln!("failed to serialize report: {e}"),
                }

                let md_path = output_dir.join(format!("eval-{timestamp}.md"));
                if let Err(e) = std::fs::write(&md_path, markdown_report(&reports)) {
                    eprintln!("failed to write Markdown report: {e}");
                } else {
                    println!("Markdown report: {}", md_path.display());
                }
            }

            ExitCode::SUCCESS
        }
    }
}
