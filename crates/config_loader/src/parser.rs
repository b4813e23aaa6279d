//! 场景文件格式
//!
//! TOML 是默认格式；JSON 便于脚本生成场景。两者映射到同一个
//! `LocatorBlueprint`，`encode` 与 `decode` 互为逆操作。

use std::path::Path;

use contracts::{ContractError, LocatorBlueprint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// 按扩展名识别格式，大小写不敏感
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }

    /// Format of a scenario file, from its extension
    ///
    /// # Errors
    /// `ConfigParse` when the path has no extension or an unknown one.
    pub fn from_path(path: &Path) -> Result<Self, ContractError> {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Err(ContractError::config_parse(format!(
                "{} has no extension, expected .toml or .json",
                path.display()
            )));
        };
        Self::from_extension(ext)
            .ok_or_else(|| ContractError::config_parse(format!("unsupported config format: .{ext}")))
    }

    fn parse_error<E>(self, source: E) -> ContractError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ContractError::ConfigParse {
            message: format!("{} parse error: {source}", self.label()),
            source: Some(Box::new(source)),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }

    /// Deserialize a blueprint; no validation happens here
    pub fn decode(self, content: &str) -> Result<LocatorBlueprint, ContractError> {
        match self {
            Self::Toml => toml::from_str(content).map_err(|e| self.parse_error(e)),
            Self::Json => serde_json::from_str(content).map_err(|e| self.parse_error(e)),
        }
    }

    pub fn encode(self, blueprint: &LocatorBlueprint) -> Result<String, ContractError> {
        let rendered = match self {
            Self::Toml => toml::to_string_pretty(blueprint).map_err(|e| e.to_string()),
            Self::Json => serde_json::to_string_pretty(blueprint).map_err(|e| e.to_string()),
        };
        rendered.map_err(|e| {
            ContractError::config_parse(format!("{} serialize error: {e}", self.label()))
        })
    }
}
