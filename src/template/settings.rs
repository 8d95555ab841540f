//! Delimiter and runtime configuration
//!
//! [`Settings`] is a complete configuration; [`SettingsOverride`] carries only
//! the fields a caller wants to change and inherits the rest from a base
//! [`Settings`] (an engine's defaults).

use super::value::{Function, Value};
use indexmap::IndexMap;

/// Default evaluate delimiter: `<% code %>`
pub const DEFAULT_EVALUATE: &str = r"<%([\s\S]+?)%>";
/// Default interpolate delimiter: `<%= expr %>`
pub const DEFAULT_INTERPOLATE: &str = r"<%=([\s\S]+?)%>";
/// Default escape delimiter: `<%- expr %>`
pub const DEFAULT_ESCAPE: &str = r"<%-([\s\S]+?)%>";

/// Names compiled templates reserve for themselves. Data fields with these
/// names are shadowed.
pub const RESERVED_NAMES: &[&str] = &["g", "print", "__p", "__debug", "obj"];

/// Template settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Pattern for evaluate directives; `None` disables them
    pub evaluate: Option<String>,
    /// Pattern for interpolate directives
    pub interpolate: String,
    /// Pattern for escape directives
    pub escape: String,
    /// Frozen into compiled templates as `__debug`; also selects fail-loud
    /// rendering
    pub debug: bool,
    /// Available to templates as `g`
    pub globals: Globals,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            evaluate: Some(DEFAULT_EVALUATE.to_string()),
            interpolate: DEFAULT_INTERPOLATE.to_string(),
            escape: DEFAULT_ESCAPE.to_string(),
            debug: false,
            globals: Globals::standard(),
        }
    }
}

impl Settings {
    /// Default delimiters with debugging enabled
    pub fn debugging() -> Self {
        Self {
            debug: true,
            ..Self::default()
        }
    }

    /// Resolve `overrides` against these settings
    pub fn merged(&self, overrides: Option<&SettingsOverride>) -> Settings {
        let Some(o) = overrides else {
            return self.clone();
        };
        Settings {
            evaluate: o.evaluate.clone().unwrap_or_else(|| self.evaluate.clone()),
            interpolate: o
                .interpolate
                .clone()
                .unwrap_or_else(|| self.interpolate.clone()),
            escape: o.escape.clone().unwrap_or_else(|| self.escape.clone()),
            debug: o.debug.unwrap_or(self.debug),
            globals: o.globals.clone().unwrap_or_else(|| self.globals.clone()),
        }
    }

    /// The debug flag that applies when rendering with `overrides`
    pub fn effective_debug(&self, overrides: Option<&SettingsOverride>) -> bool {
        overrides.and_then(|o| o.debug).unwrap_or(self.debug)
    }
}

/// Per-call settings; unset fields fall back to the base settings
#[derive(Debug, Clone, Default)]
pub struct SettingsOverride {
    /// `Some(None)` disables evaluate directives
    pub evaluate: Option<Option<String>>,
    pub interpolate: Option<String>,
    pub escape: Option<String>,
    pub debug: Option<bool>,
    pub globals: Option<Globals>,
}

impl SettingsOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(mut self, pattern: impl Into<String>) -> Self {
        self.evaluate = Some(Some(pattern.into()));
        self
    }

    pub fn without_evaluate(mut self) -> Self {
        self.evaluate = Some(None);
        self
    }

    pub fn interpolate(mut self, pattern: impl Into<String>) -> Self {
        self.interpolate = Some(pattern.into());
        self
    }

    pub fn escape(mut self, pattern: impl Into<String>) -> Self {
        self.escape = Some(pattern.into());
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    pub fn globals(mut self, globals: Globals) -> Self {
        self.globals = Some(globals);
        self
    }
}

/// The helper namespace bound to `g` inside templates
#[derive(Debug, Clone, Default)]
pub struct Globals {
    entries: IndexMap<String, Value>,
}

impl Globals {
    /// No helpers at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// `h` (HTML), `u` (URL) and `debug`
    pub fn standard() -> Self {
        let mut globals = Self::empty();
        crate::helpers::install(&mut globals);
        globals
    }

    /// Add or replace a global binding
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Register a global function
    pub fn register_fn(&mut self, name: impl Into<String>, function: Function) {
        self.entries.insert(name.into(), Value::Function(function));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// The object templates see as `g`
    pub fn to_value(&self) -> Value {
        Value::Object(self.entries.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_inherits_unset_fields() {
        let base = Settings::default();
        let merged = base.merged(Some(&SettingsOverride::new().debug(true)));
        assert!(merged.debug);
        assert_eq!(merged.interpolate, DEFAULT_INTERPOLATE);
        assert_eq!(merged.evaluate.as_deref(), Some(DEFAULT_EVALUATE));
    }

    #[test]
    fn test_override_can_disable_evaluate() {
        let merged = Settings::default().merged(Some(&SettingsOverride::new().without_evaluate()));
        assert_eq!(merged.evaluate, None);
    }

    #[test]
    fn test_effective_debug() {
        let base = Settings::debugging();
        assert!(base.effective_debug(None));
        assert!(!base.effective_debug(Some(&SettingsOverride::new().debug(false))));
        assert!(base.effective_debug(Some(&SettingsOverride::new())));
    }

    #[test]
    fn test_standard_globals() {
        let globals = Globals::standard();
        let names: Vec<&str> = globals.names().collect();
        assert!(names.contains(&"h"));
        assert!(names.contains(&"u"));
        assert!(names.contains(&"debug"));
    }
}
