//! 配置格式识别与 (反) 序列化
//!
//! TOML 为主, JSON 可选; 格式由文件扩展名决定。

use std::fmt;
use std::path::Path;

use contracts::{ContractError, RecorderBlueprint};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// 由扩展名识别格式 (不区分大小写)
    pub fn from_path(path: &Path) -> Result<Self, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        match ext.to_ascii_lowercase().as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            _ => Err(ContractError::config_parse(format!(
                "unsupported config format: .{ext}"
            ))),
        }
    }

    pub(crate) fn parse(self, content: &str) -> Result<RecorderBlueprint, ContractError> {
        match self {
            Self::Toml => toml::from_str(content).map_err(|e| self.error("parse", e)),
            Self::Json => serde_json::from_str(content).map_err(|e| self.error("parse", e)),
        }
    }

    pub(crate) fn render(self, blueprint: &RecorderBlueprint) -> Result<String, ContractError> {
        match self {
            Self::Toml => toml::to_string_pretty(blueprint).map_err(|e| self.error("serialize", e)),
            Self::Json => {
                serde_json::to_string_pretty(blueprint).map_err(|e| self.error("serialize", e))
            }
        }
    }

    fn error<E>(self, op: &str, e: E) -> ContractError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ContractError::ConfigParse {
            message: format!("{self} {op} error: {e}"),
            source: Some(Box::new(e)),
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Toml => f.write_str("TOML"),
            Self::Json => f.write_str("JSON"),
        }
    }
}
