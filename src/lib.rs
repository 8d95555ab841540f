//! jstmpl - plain-text templates with embedded script directives
//!
//! Templates mix literal text with `<% code %>`, `<%= expr %>` and
//! `<%- expr %>` directives. A template is compiled once into a syntax tree,
//! cached by its source text, and rendered against a data object:
//!
//! ```
//! let data = jstmpl::Value::object([("name", "World")]);
//! assert_eq!(jstmpl::render("Hello, <%= name %>!", &data).unwrap(), "Hello, World!");
//! ```
//!
//! See [`template`] for the directive syntax and [`helpers`] for the globals
//! available as `g`.

pub mod config;
pub mod helpers;
pub mod logging;
pub mod template;

pub use template::{
    CompiledTemplate, Engine, ErrorKind, Function, Globals, Input, Output, Prepared, Settings,
    SettingsOverride, TemplateError, Value,
};

/// Render `source` against `data` with the process-wide engine
pub fn render(source: &str, data: &Value) -> Result<String, TemplateError> {
    Engine::global().render(source, data)
}

/// Compile `source` with the process-wide engine and return a render
/// function for later data
pub fn prepare(source: &str) -> Result<Prepared, TemplateError> {
    Engine::global().prepare(source, None)
}
