//! Pipeline stage names and the on/off configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A named stage of the fixed pipeline.
///
/// Variants are declared in execution order; `Ord` follows that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StageName {
    TtsFromScript,
    TtsToVideo,
    NormalizeAudio,
    #[serde(rename = "convertToCFR")]
    ConvertToCfr,
    OptimizeSilence,
    Transcribe,
    GenerateScenes,
    DeleteEmptyScenes,
    GenerateClips,
    SpeedUp,
    ImproveText,
    GenerateSpeech,
    SyncVideo,
    TranscribeScenes,
    PromptScenes,
}

impl StageName {
    /// All stages in execution order.
    pub const ALL: [StageName; 15] = [
        StageName::TtsFromScript,
        StageName::TtsToVideo,
        StageName::NormalizeAudio,
        StageName::ConvertToCfr,
        StageName::OptimizeSilence,
        StageName::Transcribe,
        StageName::GenerateScenes,
        StageName::DeleteEmptyScenes,
        StageName::GenerateClips,
        StageName::SpeedUp,
        StageName::ImproveText,
        StageName::GenerateSpeech,
        StageName::SyncVideo,
        StageName::TranscribeScenes,
        StageName::PromptScenes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::TtsFromScript => "ttsFromScript",
            StageName::TtsToVideo => "ttsToVideo",
            StageName::NormalizeAudio => "normalizeAudio",
            StageName::ConvertToCfr => "convertToCFR",
            StageName::OptimizeSilence => "optimizeSilence",
            StageName::Transcribe => "transcribe",
            StageName::GenerateScenes => "generateScenes",
            StageName::DeleteEmptyScenes => "deleteEmptyScenes",
            StageName::GenerateClips => "generateClips",
            StageName::SpeedUp => "speedUp",
            StageName::ImproveText => "improveText",
            StageName::GenerateSpeech => "generateSpeech",
            StageName::SyncVideo => "syncVideo",
            StageName::TranscribeScenes => "transcribeScenes",
            StageName::PromptScenes => "promptScenes",
        }
    }

    /// Stages from scene generation onward also need the scene collection
    /// refreshed before the next stage runs.
    pub fn touches_scenes(&self) -> bool {
        *self >= StageName::GenerateScenes
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

impl FromStr for StageName {
    type Err = ParseStageError;

    /// Accepts the camelCase names as well as snake/kebab spellings,
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s.trim());
        StageName::ALL
            .iter()
            .copied()
            .find(|stage| normalize(stage.as_str()) == wanted)
            .ok_or_else(|| ParseStageError(s.to_string()))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown pipeline stage: {0}")]
pub struct ParseStageError(pub String);

/// Mapping from stage name to enabled flag.
///
/// The configuration only filters stages; execution order is always
/// [`StageName::ALL`]. Stages missing from the map are disabled.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineConfig {
    stages: BTreeMap<StageName, bool>,
}

impl PipelineConfig {
    /// Every stage enabled.
    pub fn all_enabled() -> Self {
        Self {
            stages: StageName::ALL.iter().map(|s| (*s, true)).collect(),
        }
    }

    /// Every stage disabled.
    pub fn none() -> Self {
        Self {
            stages: StageName::ALL.iter().map(|s| (*s, false)).collect(),
        }
    }

    pub fn set(&mut self, stage: StageName, enabled: bool) -> &mut Self {
        self.stages.insert(stage, enabled);
        self
    }

    pub fn with(mut self, stage: StageName, enabled: bool) -> Self {
        self.set(stage, enabled);
        self
    }

    pub fn is_enabled(&self, stage: StageName) -> bool {
        self.stages.get(&stage).copied().unwrap_or(false)
    }

    /// Enabled stages, in execution order.
    pub fn enabled_stages(&self) -> Vec<StageName> {
        StageName::ALL
            .iter()
            .copied()
            .filter(|s| self.is_enabled(*s))
            .collect()
    }

    /// Parse a comma-separated list of enabled stages.
    ///
    /// `"all"` (or an empty string) enables everything.
    pub fn parse_list(list: &str) -> Result<Self, ParseStageError> {
        let trimmed = list.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::all_enabled());
        }

        let mut config = Self::none();
        for name in trimmed.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            config.set(name.parse()?, true);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_is_fixed() {
        assert_eq!(StageName::ALL.len(), 15);
        assert!(StageName::ALL.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(StageName::TtsFromScript < StageName::PromptScenes);
        assert!(!StageName::Transcribe.touches_scenes());
        assert!(StageName::GenerateScenes.touches_scenes());
    }

    #[test]
    fn test_stage_parse() {
        assert_eq!("convertToCFR".parse::<StageName>().unwrap(), StageName::ConvertToCfr);
        assert_eq!("convert_to_cfr".parse::<StageName>().unwrap(), StageName::ConvertToCfr);
        assert_eq!("speedup".parse::<StageName>().unwrap(), StageName::SpeedUp);
        assert!("render".parse::<StageName>().is_err());
    }

    #[test]
    fn test_stage_serde_names() {
        assert_eq!(
            serde_json::to_value(StageName::ConvertToCfr).unwrap(),
            serde_json::json!("convertToCFR")
        );
        for stage in StageName::ALL {
            let json = serde_json::to_value(stage).unwrap();
            assert_eq!(json, serde_json::json!(stage.as_str()));
        }
    }

    #[test]
    fn test_config_filters_without_reordering() {
        let config = PipelineConfig::none()
            .with(StageName::PromptScenes, true)
            .with(StageName::TtsFromScript, true)
            .with(StageName::Transcribe, true);
        assert_eq!(
            config.enabled_stages(),
            vec![StageName::TtsFromScript, StageName::Transcribe, StageName::PromptScenes]
        );
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(PipelineConfig::parse_list("all").unwrap(), PipelineConfig::all_enabled());
        let config = PipelineConfig::parse_list("transcribe, generateScenes").unwrap();
        assert_eq!(
            config.enabled_stages(),
            vec![StageName::Transcribe, StageName::GenerateScenes]
        );
        assert!(PipelineConfig::parse_list("transcribe,bogus").is_err());
    }

    #[test]
    fn test_config_json_shape() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"transcribe": true, "speedUp": false}"#).unwrap();
        assert!(config.is_enabled(StageName::Transcribe));
        assert!(!config.is_enabled(StageName::SpeedUp));
        assert!(!config.is_enabled(StageName::SyncVideo));
    }
}
