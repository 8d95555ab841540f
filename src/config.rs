//! Settings files for the command line tool
//!
//! A settings file is a JSON object with any of these fields:
//!
//! ```json
//! {
//!   "evaluate": "\\{%([\\s\\S]+?)%\\}",
//!   "interpolate": "\\{\\{([\\s\\S]+?)\\}\\}",
//!   "escape": "\\{\\{-([\\s\\S]+?)\\}\\}",
//!   "debug": true
//! }
//! ```
//!
//! Missing fields keep their defaults; `"evaluate": null` disables evaluate
//! directives.

use crate::template::SettingsOverride;
use camino::Utf8Path;
use color_eyre::eyre::{Result, WrapErr};
use serde::{Deserialize, Deserializer};
use std::fs;

/// Contents of a settings file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsFile {
    /// `Some(None)` when the file sets `"evaluate": null`
    #[serde(deserialize_with = "present")]
    pub evaluate: Option<Option<String>>,
    pub interpolate: Option<String>,
    pub escape: Option<String>,
    pub debug: Option<bool>,
}

/// Tell an explicit `null` apart from a missing field
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl SettingsFile {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).wrap_err("invalid settings file")
    }

    pub fn load(path: &Utf8Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read settings file {path}"))?;
        Self::parse(&json).wrap_err_with(|| format!("in {path}"))
    }

    /// The per-call override these settings describe
    pub fn into_override(self) -> SettingsOverride {
        SettingsOverride {
            evaluate: self.evaluate,
            interpolate: self.interpolate,
            escape: self.escape,
            debug: self.debug,
            globals: None,
        }
    }
}
