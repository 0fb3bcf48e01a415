//! Engine settings loaded from TOML.
//!
//! Settings are plain values handed to each component's constructor; nothing
//! reads them from global state.
//!
//! - `parse_settings_toml(toml_content)` parses and validates a custom TOML
//! - `Settings::default()` uses the embedded `default_settings.toml`
//! - `Settings::load(path)` reads a TOML file from disk

use std::fs;
use std::path::Path;

use serde::Deserialize;

pub const DEFAULT_SETTINGS_TOML: &str = include_str!("default_settings.toml");

/// Returns the embedded default settings TOML content.
pub fn default_toml() -> &'static str {
    DEFAULT_SETTINGS_TOML
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A user file may omit whole sections; missing ones take the embedded
/// defaults. A section that is present must be complete.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub prediction: PredictionSettings,
    #[serde(default)]
    pub ngram: NgramSettings,
    #[serde(default)]
    pub learning: LearningSettings,
    #[serde(default)]
    pub mode: ModeSettings,
}

impl Default for Settings {
    fn default() -> Self {
        // build.rs validates the embedded file, and the unit tests parse it.
        parse_settings_toml(DEFAULT_SETTINGS_TOML).expect("default settings TOML must be valid")
    }
}

impl Settings {
    /// Read and validate a settings file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        parse_settings_toml(&content)
    }
}

macro_rules! section_default {
    ($ty:ty, $section:ident) => {
        impl Default for $ty {
            fn default() -> Self {
                // The embedded file has every section, so this never recurses.
                Settings::default().$section
            }
        }
    };
}

section_default!(PredictionSettings, prediction);
section_default!(NgramSettings, ngram);
section_default!(LearningSettings, learning);
section_default!(ModeSettings, mode);

#[derive(Debug, Clone, Deserialize)]
pub struct PredictionSettings {
    pub enabled: bool,
    pub top_k: usize,
    pub pool_size: usize,
    pub score_floor: f64,
    pub static_weight: f64,
    pub personal_weight: f64,
    pub budget_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NgramSettings {
    pub min_matches: usize,
    pub trigram_confidence: f64,
    pub bigram_confidence: f64,
    pub unigram_confidence: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LearningSettings {
    pub enabled: bool,
    pub half_life_hours: f64,
    pub capacity: usize,
    pub boost_per_use: f64,
    pub max_boost: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModeSettings {
    pub preference: ModePreference,
    pub min_confidence_threshold: f64,
    pub debounce: u32,
}

/// User preference for which suggestion category is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModePreference {
    Adaptive,
    ForceNextWord,
    ForceCurrentWord,
    Hybrid,
}

pub fn parse_settings_toml(toml_str: &str) -> Result<Settings, SettingsError> {
    let s: Settings = toml::from_str(toml_str).map_err(|e| SettingsError::Parse(e.to_string()))?;
    validate(&s)?;
    Ok(s)
}

fn validate(s: &Settings) -> Result<(), SettingsError> {
    macro_rules! check_non_negative {
        ($section:ident . $field:ident) => {
            if !(s.$section.$field >= 0.0) {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be non-negative".to_string(),
                });
            }
        };
    }
    macro_rules! check_positive {
        ($section:ident . $field:ident) => {
            if !(s.$section.$field > 0.0) {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        };
    }
    macro_rules! check_positive_int {
        ($section:ident . $field:ident) => {
            if s.$section.$field == 0 {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        };
    }
    macro_rules! check_unit_range {
        ($section:ident . $field:ident) => {
            if !(0.0..=1.0).contains(&s.$section.$field) {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be within 0.0..=1.0".to_string(),
                });
            }
        };
    }

    check_positive_int!(prediction.top_k);
    check_positive_int!(prediction.pool_size);
    check_positive_int!(prediction.budget_ms);
    check_non_negative!(prediction.score_floor);
    check_non_negative!(prediction.static_weight);
    check_non_negative!(prediction.personal_weight);

    check_positive_int!(ngram.min_matches);
    check_unit_range!(ngram.trigram_confidence);
    check_unit_range!(ngram.bigram_confidence);
    check_unit_range!(ngram.unigram_confidence);
    let n = &s.ngram;
    if n.trigram_confidence < n.bigram_confidence || n.bigram_confidence < n.unigram_confidence {
        return Err(SettingsError::InvalidValue {
            field: "ngram".to_string(),
            reason: "confidence must satisfy trigram >= bigram >= unigram".to_string(),
        });
    }

    check_positive!(learning.half_life_hours);
    check_positive_int!(learning.capacity);
    check_non_negative!(learning.boost_per_use);
    check_non_negative!(learning.max_boost);

    check_unit_range!(mode.min_confidence_threshold);
    check_positive_int!(mode.debounce);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_replaced(from: &str, to: &str) -> String {
        assert!(DEFAULT_SETTINGS_TOML.contains(from), "{from} not in defaults");
        DEFAULT_SETTINGS_TOML.replacen(from, to, 1)
    }

    #[test]
    fn parse_default_toml() {
        let s = parse_settings_toml(DEFAULT_SETTINGS_TOML).unwrap();
        assert!(s.prediction.enabled);
        assert_eq!(s.prediction.top_k, 3);
        assert_eq!(s.prediction.pool_size, 12);
        assert_eq!(s.prediction.budget_ms, 20);
        assert_eq!(s.ngram.min_matches, 3);
        assert!((s.ngram.trigram_confidence - 1.0).abs() < f64::EPSILON);
        assert!((s.ngram.bigram_confidence - 0.6).abs() < f64::EPSILON);
        assert!((s.ngram.unigram_confidence - 0.2).abs() < f64::EPSILON);
        assert!(s.learning.enabled);
        assert!((s.learning.half_life_hours - 168.0).abs() < f64::EPSILON);
        assert_eq!(s.learning.capacity, 5000);
        assert_eq!(s.mode.preference, ModePreference::Adaptive);
        assert!((s.mode.min_confidence_threshold - 0.3).abs() < f64::EPSILON);
        assert_eq!(s.mode.debounce, 2);
    }

    #[test]
    fn default_matches_embedded() {
        let s = Settings::default();
        assert_eq!(s.prediction.top_k, 3);
    }

    #[test]
    fn parse_mode_preferences() {
        for (raw, expected) in [
            ("force_next_word", ModePreference::ForceNextWord),
            ("force_current_word", ModePreference::ForceCurrentWord),
            ("hybrid", ModePreference::Hybrid),
        ] {
            let toml = with_replaced(
                "preference = \"adaptive\"",
                &format!("preference = \"{raw}\""),
            );
            let s = parse_settings_toml(&toml).unwrap();
            assert_eq!(s.mode.preference, expected);
        }
    }

    #[test]
    fn error_unknown_preference() {
        let toml = with_replaced("preference = \"adaptive\"", "preference = \"sometimes\"");
        let err = parse_settings_toml(&toml).unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn error_zero_top_k() {
        let toml = with_replaced("top_k = 3", "top_k = 0");
        let err = parse_settings_toml(&toml).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { .. }));
        assert!(err.to_string().contains("prediction.top_k"));
    }

    #[test]
    fn error_zero_half_life() {
        let toml = with_replaced("half_life_hours = 168.0", "half_life_hours = 0.0");
        let err = parse_settings_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("half_life_hours"));
    }

    #[test]
    fn error_negative_weight() {
        let toml = with_replaced("personal_weight = 1.0", "personal_weight = -0.5");
        let err = parse_settings_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("prediction.personal_weight"));
    }

    #[test]
    fn error_threshold_out_of_range() {
        let toml = with_replaced(
            "min_confidence_threshold = 0.3",
            "min_confidence_threshold = 1.5",
        );
        let err = parse_settings_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("mode.min_confidence_threshold"));
    }

    #[test]
    fn error_confidence_order() {
        let toml = with_replaced("unigram_confidence = 0.2", "unigram_confidence = 0.9");
        let err = parse_settings_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("trigram >= bigram >= unigram"));
    }

    #[test]
    fn error_invalid_toml() {
        let err = parse_settings_toml("not valid toml {{{").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn missing_sections_take_defaults() {
        let toml = r#"
[mode]
preference = "hybrid"
min_confidence_threshold = 0.5
debounce = 3
"#;
        let s = parse_settings_toml(toml).unwrap();
        assert_eq!(s.mode.preference, ModePreference::Hybrid);
        assert_eq!(s.mode.debounce, 3);
        assert_eq!(s.prediction.top_k, 3);
        assert_eq!(s.ngram.min_matches, 3);
        assert_eq!(s.learning.capacity, 5000);

        let empty = parse_settings_toml("").unwrap();
        assert_eq!(empty.mode.preference, ModePreference::Adaptive);
    }

    #[test]
    fn error_incomplete_section() {
        let err = parse_settings_toml("[mode]\npreference = \"hybrid\"\n").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, with_replaced("top_k = 3", "top_k = 5")).unwrap();
        let s = Settings::load(&path).unwrap();
        assert_eq!(s.prediction.top_k, 5);
    }

    #[test]
    fn load_missing_file() {
        let err = Settings::load(Path::new("/nonexistent/settings.toml")).unwrap_err();
        assert!(matches!(err, SettingsError::Io(_)));
    }
}
