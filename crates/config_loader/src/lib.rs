//! Scenario file loading for the locator CLI and integration tests
//!
//! 读取场景文件，按扩展名选择格式，反序列化为 `LocatorBlueprint`
//! 并在返回前完成校验。校验失败的蓝图不会离开本 crate。
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("locator.toml")).unwrap();
//! println!("requests: {}", blueprint.requests.len());
//! ```

mod parser;
mod validator;

pub use contracts::LocatorBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Read, decode and validate a scenario file
    ///
    /// # Errors
    /// `Io` when the file cannot be read, `ConfigParse` for an unknown
    /// extension or malformed content, `ConfigValidation` for a blueprint
    /// the locator would reject.
    pub fn load_from_path(path: &Path) -> Result<LocatorBlueprint, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Decode and validate in-memory content
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<LocatorBlueprint, ContractError> {
        let blueprint = format.decode(content)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Render `blueprint` back to text; the output loads again unchanged
    pub fn render(
        blueprint: &LocatorBlueprint,
        format: ConfigFormat,
    ) -> Result<String, ContractError> {
        format.encode(blueprint)
    }
}
