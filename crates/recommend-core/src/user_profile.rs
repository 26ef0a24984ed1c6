//! User preference schema consumed by the content and TOPSIS layers.
//!
//! `UserProfile` is produced by the external onboarding wizard (out of
//! scope for this core) and handed to [`crate::recommend`]-family entry
//! points by reference. Nothing downstream mutates it.

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A modality a candidate can serve and a user can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Image,
    Video,
    Audio,
    ThreeD,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Image => "image",
            Modality::Video => "video",
            Modality::Audio => "audio",
            Modality::ThreeD => "3d",
        }
    }
}

/// A user-selected use case, e.g. "product photography" or "short-form
/// video". Use cases are declared by the onboarding flow; the core only
/// needs the modalities they imply and, for the space fitter, a caller
/// supplied priority (lower number = more important).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UseCase {
    pub id: String,
    pub required_modalities: HashSet<Modality>,
}

/// 1..5 quality sliders shared across all modalities, normalized to
/// `[0,1]` via `(v-1)/4`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SharedQuality {
    pub photorealism: u8,
    pub artistic_stylization: u8,
    pub generation_speed: u8,
    pub output_quality: u8,
    pub character_consistency: u8,
}

impl SharedQuality {
    fn normalize(v: u8) -> f32 {
        ((v.clamp(1, 5) as f32) - 1.0) / 4.0
    }

    pub fn photorealism_norm(&self) -> f32 {
        Self::normalize(self.photorealism)
    }

    pub fn artistic_stylization_norm(&self) -> f32 {
        Self::normalize(self.artistic_stylization)
    }

    pub fn generation_speed_norm(&self) -> f32 {
        Self::normalize(self.generation_speed)
    }

    pub fn output_quality_norm(&self) -> f32 {
        Self::normalize(self.output_quality)
    }

    pub fn character_consistency_norm(&self) -> f32 {
        Self::normalize(self.character_consistency)
    }
}

/// How much a user values character (subject) consistency across
/// generations. Drives a binary-ish content dimension rather than a
/// continuous slider since most catalog entries only declare coarse
/// support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyNeed {
    Essential,
    Helpful,
    NotNeeded,
}

/// Image-modality preferences. Present iff `image` is a required modality
/// of at least one selected use case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ImagePrefs {
    pub editability: f32,
    pub pose_control: f32,
    pub holistic_edits: f32,
    pub localized_edits: f32,
    pub style_tags: HashSet<String>,
    #[serde(default = "default_consistency")]
    pub character_consistency: ConsistencyNeed,
}

fn default_consistency() -> ConsistencyNeed {
    ConsistencyNeed::NotNeeded
}

/// Desired clip duration bucket for video generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VideoDuration {
    Short,
    Medium,
    Long,
}

/// Video-modality preferences. Present iff `video` is a required modality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoPrefs {
    pub motion_intensity: f32,
    pub temporal_coherence: f32,
    pub duration: VideoDuration,
}

/// Audio-modality preferences (extension point; the spec's `audio_prefs?`
/// — only the sync-need projection used by the content layer is modeled
/// today).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AudioPrefs {
    pub audio_sync_needs: HashSet<String>,
}

/// 3D-modality preferences (extension point; no dimensions are scored yet,
/// reserved for future catalog capability growth).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ThreeDPrefs {}

/// How willing the user is to have a model run in the cloud rather than
/// locally. Gates the constraint layer's cloud-escape rule (§4.3.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CloudWillingness {
    LocalOnly,
    Hybrid,
    CloudPreferred,
}

impl CloudWillingness {
    pub fn allows_cloud(&self) -> bool {
        !matches!(self, CloudWillingness::LocalOnly)
    }
}

/// Self-reported technical level; the explainer adapts prose verbosity and
/// jargon to this, but it never changes pipeline decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TechnicalLevel {
    Beginner,
    Intermediate,
    Advanced,
}

/// Full user preference profile for a single recommendation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UserProfile {
    pub use_cases: Vec<UseCase>,
    pub shared_quality: SharedQuality,
    pub image_prefs: Option<ImagePrefs>,
    pub video_prefs: Option<VideoPrefs>,
    pub audio_prefs: Option<AudioPrefs>,
    pub three_d_prefs: Option<ThreeDPrefs>,
    pub cloud_willingness: CloudWillingness,
    pub speed_priority: f32,
    pub technical_level: TechnicalLevel,
}

impl UserProfile {
    /// The set of modalities implied by the union of selected use cases.
    pub fn required_modalities(&self) -> HashSet<Modality> {
        self.use_cases
            .iter()
            .flat_map(|uc| uc.required_modalities.iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_quality_normalizes_1_to_5_onto_0_1() {
        let q = SharedQuality {
            photorealism: 1,
            artistic_stylization: 5,
            generation_speed: 3,
            output_quality: 1,
            character_consistency: 5,
        };
        assert_eq!(q.photorealism_norm(), 0.0);
        assert_eq!(q.artistic_stylization_norm(), 1.0);
        assert!((q.generation_speed_norm() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn required_modalities_unions_across_use_cases() {
        let profile = UserProfile {
            use_cases: vec![
                UseCase {
                    id: "product_photo".into(),
                    required_modalities: [Modality::Image].into_iter().collect(),
                },
                UseCase {
                    id: "social_clip".into(),
                    required_modalities: [Modality::Image, Modality::Video].into_iter().collect(),
                },
            ],
            shared_quality: SharedQuality {
                photorealism: 3,
                artistic_stylization: 3,
                generation_speed: 3,
                output_quality: 3,
                character_consistency: 3,
            },
            image_prefs: None,
            video_prefs: None,
            audio_prefs: None,
            three_d_prefs: None,
            cloud_willingness: CloudWillingness::Hybrid,
            speed_priority: 0.5,
            technical_level: TechnicalLevel::Intermediate,
        };
        let modalities = profile.required_modalities();
        assert_eq!(modalities.len(), 2);
        assert!(modalities.contains(&Modality::Image));
        assert!(modalities.contains(&Modality::Video));
    }

    #[test]
    fn cloud_willingness_gates_allows_cloud() {
        assert!(!CloudWillingness::LocalOnly.allows_cloud());
        assert!(CloudWillingness::Hybrid.allows_cloud());
        assert!(CloudWillingness::CloudPreferred.allows_cloud());
    }
}
