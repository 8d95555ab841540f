//! Template compiler and renderer
//!
//! A template is plain text with three kinds of embedded directives:
//!
//! ```text
//! <% code %>      - Evaluate: run statements, may open and close blocks
//! <%= expr %>     - Interpolate: append the value of `expr`
//! <%- expr %>     - Escape: append `g.h.escape(expr)`
//! ```
//!
//! The embedded language is a small JavaScript subset: `var`/`let`/`const`,
//! `if`/`else`, `for` (C-style, `of` and `in`), `while`, `break`,
//! `continue`, `throw`, and the usual operators. Data fields are bare names,
//! helpers live under `g`, and `print(...)` appends to the output.
//!
//! Templates are compiled into a syntax tree that an interpreter runs, and
//! compiled templates are cached by source text in an [`Engine`].
//!
//! # Example
//!
//! ```
//! use jstmpl::{Engine, Value};
//!
//! let engine = Engine::default();
//! let data = Value::object([("items", Value::from(vec!["a", "b"]))]);
//! let out = engine
//!     .render("<% for (var x of items) { %><%- x %>;<% } %>", &data)
//!     .unwrap();
//! assert_eq!(out, "a;b;");
//! ```

pub mod ast;
mod compile;
mod error;
mod eval;
pub mod lexer;
mod methods;
pub mod parser;
mod render;
pub mod scan;
mod settings;
mod value;

pub use compile::{CompiledTemplate, Compiler};
pub use error::{
    ErrorKind, HelperError, InvalidInputError, SyntaxError, TemplateError, TemplateSource,
    ThrownError, TypeError, UnclosedError, UndefinedError,
};
pub use render::{Engine, Input, Output, Prepared};
pub use settings::{
    DEFAULT_ESCAPE, DEFAULT_EVALUATE, DEFAULT_INTERPOLATE, Globals, RESERVED_NAMES, Settings,
    SettingsOverride,
};
pub use value::{Call, Function, NativeFn, Value, format_number};
