//! # Config Loader
//!
//! Loads a `RecorderBlueprint` from TOML or JSON and validates it.
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("recorder.toml")).unwrap();
//! println!("Frame limit: {}", blueprint.recording.frame_limit);
//! ```

mod parser;
mod validator;

pub use contracts::RecorderBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Read, parse and validate a `.toml` / `.json` file
    ///
    /// # Errors
    /// - Unsupported extension
    /// - File read failure (carries the path)
    /// - Parse or validation failure
    pub fn load_from_path(path: &Path) -> Result<RecorderBlueprint, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| ContractError::ConfigParse {
            message: format!("cannot read {}: {e}", path.display()),
            source: Some(Box::new(e)),
        })?;
        Self::load_from_str(&content, format)
    }

    /// Parse and validate configuration content
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<RecorderBlueprint, ContractError> {
        let blueprint = format.parse(content)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Validate an already-built blueprint (e.g. after CLI overrides)
    pub fn validate(blueprint: &RecorderBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    pub fn to_toml(blueprint: &RecorderBlueprint) -> Result<String, ContractError> {
        ConfigFormat::Toml.render(blueprint)
    }

    pub fn to_json(blueprint: &RecorderBlueprint) -> Result<String, ContractError> {
        ConfigFormat::Json.render(blueprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_TOML: &str = r#"
[recording]
output_path = "/tmp/recordings"
frame_limit = 200
episode_limit = 3
cameras = ["rgb_center", "depth"]

[proximity.traffic_light]
radius = 12.0

[proximity.speed_limit]
radius = 12.5
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.recording.episode_limit, 3);
        assert_eq!(bp.recording.cameras.len(), 2);
    }

    #[test]
    fn test_round_trip_toml() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.recording.output_path, bp2.recording.output_path);
        assert_eq!(bp.recording.cameras, bp2.recording.cameras);
        assert_eq!(bp.proximity, bp2.proximity);
    }

    #[test]
    fn test_round_trip_json() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(bp.recording.frame_limit, bp2.recording.frame_limit);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[recording]
cameras = ["rgb_center", "rgb_center"]
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("duplicate"));
    }

    #[test]
    fn test_missing_file_names_path() {
        let path = Path::new("/nonexistent/recorder.toml");
        let err = ConfigLoader::load_from_path(path).unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { source: Some(_), .. }));
        assert!(err.to_string().contains("cannot read /nonexistent/recorder.toml"));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let result = ConfigLoader::load_from_path(Path::new("recorder.yaml"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("unsupported config format"));
    }
}
