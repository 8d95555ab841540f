//! Error types with source spans for template diagnostics
//!
//! Every error that can be attributed to a location in the template carries
//! the template text and a span, so miette can render the offending directive.
//! Errors fall into three families (see [`ErrorKind`]): invalid input,
//! compilation failures, and execution failures.

use miette::{Diagnostic, NamedSource, SourceSpan};
use std::sync::Arc;
use thiserror::Error;

/// A template source for error reporting
#[derive(Debug, Clone)]
pub struct TemplateSource {
    /// Name of the template (a file name, or `template` for inline sources)
    pub name: String,
    /// The full source text
    pub source: Arc<String>,
}

impl TemplateSource {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: Arc::new(source.into()),
        }
    }

    /// Create a NamedSource for miette
    pub fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(&self.name, (*self.source).clone())
    }
}

/// Which stage a [`TemplateError`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Settings could not be used (bad delimiter pattern)
    InvalidInput,
    /// The template's embedded code is not a valid program
    Compilation,
    /// The program failed while rendering
    Execution,
}

/// All template errors
#[derive(Error, Debug, Diagnostic)]
pub enum TemplateError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    InvalidInput(#[from] InvalidInputError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Unclosed(#[from] UnclosedError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Undefined(#[from] UndefinedError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Helper(#[from] HelperError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Thrown(#[from] ThrownError),
}

impl TemplateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TemplateError::InvalidInput(_) => ErrorKind::InvalidInput,
            TemplateError::Syntax(_) | TemplateError::Unclosed(_) => ErrorKind::Compilation,
            TemplateError::Undefined(_)
            | TemplateError::Type(_)
            | TemplateError::Helper(_)
            | TemplateError::Thrown(_) => ErrorKind::Execution,
        }
    }

    /// True for failures raised while running a compiled template
    pub fn is_execution(&self) -> bool {
        self.kind() == ErrorKind::Execution
    }
}

/// A delimiter pattern that cannot be used
#[derive(Error, Debug, Diagnostic)]
#[error("Invalid {setting} pattern `{pattern}`: {reason}")]
#[diagnostic(
    code(template::invalid_input),
    help("Patterns are regular expressions with exactly one capture group for the embedded code")
)]
pub struct InvalidInputError {
    /// Which setting holds the pattern (`evaluate`, `interpolate`, `escape`)
    pub setting: &'static str,
    /// The pattern text
    pub pattern: String,
    /// Why it was rejected
    pub reason: String,
}

/// Syntax error in embedded code
#[derive(Error, Debug, Diagnostic)]
#[error("Unexpected {found}")]
#[diagnostic(code(template::syntax::unexpected), help("Expected {expected}"))]
pub struct SyntaxError {
    /// What we found
    pub found: String,
    /// What we expected
    pub expected: String,
    /// Location in source
    #[label("here")]
    pub span: SourceSpan,
    /// The source code
    #[source_code]
    pub src: NamedSource<String>,
}

/// A block or directive left open at the end of the template
#[derive(Error, Debug, Diagnostic)]
#[error("Unclosed {kind}")]
#[diagnostic(
    code(template::syntax::unclosed),
    help("Add `{close_delim}` to close this {kind}")
)]
pub struct UnclosedError {
    /// What was left unclosed
    pub kind: String,
    /// The closing delimiter needed
    pub close_delim: String,
    /// Where it was opened
    #[label("opened here")]
    pub open_span: SourceSpan,
    /// The source code
    #[source_code]
    pub src: NamedSource<String>,
}

/// A bare name that is neither a local, a global binding nor a data field
#[derive(Error, Debug, Diagnostic)]
#[error("`{name}` is not defined")]
#[diagnostic(
    code(template::undefined),
    help("Available names: {}", available.join(", "))
)]
pub struct UndefinedError {
    /// The undefined name
    pub name: String,
    /// Names that are in scope
    pub available: Vec<String>,
    /// Location
    #[label("not found in scope")]
    pub span: SourceSpan,
    /// The source code
    #[source_code]
    pub src: NamedSource<String>,
}

/// Operation applied to a value of the wrong type
#[derive(Error, Debug, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(template::type_error))]
pub struct TypeError {
    pub message: String,
    #[label("{context}")]
    pub span: SourceSpan,
    /// Short label shown under the span
    pub context: String,
    #[source_code]
    pub src: NamedSource<String>,
}

/// A global helper reported a failure
#[derive(Error, Debug, Diagnostic)]
#[error("Helper `{helper}` failed: {message}")]
#[diagnostic(code(template::helper))]
pub struct HelperError {
    pub helper: String,
    pub message: String,
    #[label("called here")]
    pub span: SourceSpan,
    #[source_code]
    pub src: NamedSource<String>,
}

/// Raised by a `throw` statement inside the template
#[derive(Error, Debug, Diagnostic)]
#[error("Uncaught {message}")]
#[diagnostic(code(template::thrown))]
pub struct ThrownError {
    pub message: String,
    #[label("thrown here")]
    pub span: SourceSpan,
    #[source_code]
    pub src: NamedSource<String>,
}
