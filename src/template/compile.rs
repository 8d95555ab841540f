//! Template compilation
//!
//! Compiling a template is one pass over its source. The delimiter scanner
//! splits it into text and directives, and every piece is lowered into a
//! single token stream:
//!
//! - literal text becomes one `Text` token
//! - `<%= expr %>` and `<%- expr %>` become `OutputOpen`, the tokens of
//!   `expr`, and `OutputClose`
//! - `<% code %>` contributes the tokens of `code` followed by a `;`
//!
//! The stream is parsed as one program, so statements in evaluate directives
//! can wrap the text and output directives between them.
//!
//! Alongside the program the compiler produces the template's textual
//! function source: the JavaScript-style render function the template
//! corresponds to. It is what [`Input::Introspect`](super::Input) returns,
//! and what debug-mode failures are logged with.

use super::ast::Program;
use super::error::{TemplateError, TemplateSource};
use super::eval::Evaluator;
use super::lexer::{Lexer, Token, TokenKind};
use super::parser::Parser;
use super::scan::{DirectiveKind, Patterns, Segment, scan};
use super::settings::Settings;
use super::value::Value;
use tracing::{debug, debug_span};

/// Compiles template source with a fixed set of settings
pub struct Compiler<'s> {
    settings: &'s Settings,
    name: String,
}

impl<'s> Compiler<'s> {
    pub fn new(settings: &'s Settings) -> Self {
        Self {
            settings,
            name: "template".to_string(),
        }
    }

    /// Name used for the template in diagnostics
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Compile `source`
    ///
    /// Fails with an invalid-input error when a delimiter pattern cannot be
    /// used, and with a syntax error when the embedded code does not form a
    /// valid program.
    pub fn compile(&self, source: &str) -> Result<CompiledTemplate, TemplateError> {
        let patterns = Patterns::from_settings(self.settings)?;
        let segments = scan(source, &patterns);
        let template = TemplateSource::new(self.name.clone(), source);

        let tokens = token_stream(source, &segments);
        let program = Parser::new(tokens, &template).parse()?;
        let function_source = function_source(source, &segments, self.settings.debug);

        debug!(
            template = %self.name,
            segments = segments.len(),
            statements = program.body.len(),
            "compiled template"
        );

        Ok(CompiledTemplate {
            program,
            function_source,
            template,
            debug: self.settings.debug,
            globals: self.settings.globals.to_value(),
        })
    }
}

/// A compiled template
///
/// Holds the parsed program together with what was frozen at compile time:
/// the `__debug` flag and the globals object bound to `g`.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    program: Program,
    function_source: String,
    template: TemplateSource,
    debug: bool,
    globals: Value,
}

impl CompiledTemplate {
    /// Textual form of the render function
    pub fn function_source(&self) -> &str {
        &self.function_source
    }

    /// The `__debug` flag frozen at compile time
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// The globals object frozen at compile time
    pub fn globals(&self) -> &Value {
        &self.globals
    }

    /// The template text
    pub fn source(&self) -> &str {
        &self.template.source
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Render against `data` with the frozen globals
    pub fn execute(&self, data: &Value) -> Result<String, TemplateError> {
        self.execute_with_globals(data, &self.globals)
    }

    /// Render against `data` with another globals object
    pub fn execute_with_globals(&self, data: &Value, globals: &Value) -> Result<String, TemplateError> {
        let _span = debug_span!("render", template = %self.template.name).entered();
        Evaluator::new(data, globals, self.debug, &self.template).run(&self.program)
    }
}

/// Lower scanned segments into the parser's token stream
fn token_stream(source: &str, segments: &[Segment]) -> Vec<Token> {
    let mut tokens = Vec::new();

    for segment in segments {
        match segment {
            Segment::Text { range } => tokens.push(Token::new(
                TokenKind::Text(source[range.clone()].to_string()),
                range.start,
                range.len(),
            )),
            Segment::Directive { kind, range, code } => {
                let lexer = Lexer::new(&source[code.clone()], code.start);
                let opener = code.start - range.start;
                let closer = range.end - code.end;
                match kind {
                    DirectiveKind::Escape | DirectiveKind::Interpolate => {
                        let escape = *kind == DirectiveKind::Escape;
                        tokens.push(Token::new(TokenKind::OutputOpen { escape }, range.start, opener));
                        tokens.extend(lexer);
                        tokens.push(Token::new(TokenKind::OutputClose, code.end, closer));
                    }
                    DirectiveKind::Evaluate => {
                        tokens.extend(lexer);
                        tokens.push(Token::new(TokenKind::Semi, code.end, closer));
                    }
                }
            }
        }
    }

    tokens.push(Token::new(TokenKind::Eof, source.len(), 0));
    tokens
}

/// Build the textual render function for a template
fn function_source(source: &str, segments: &[Segment], debug: bool) -> String {
    let mut body = format!(
        "var __p=[],print=function(){{__p.push.apply(__p,arguments);}};\
         var __debug = {debug};var g = this;with(obj||{{}}){{__p.push('"
    );

    for segment in segments {
        match segment {
            Segment::Text { range } => body.push_str(&escape_control(&quote_text(&source[range.clone()]))),
            Segment::Directive { kind, code, .. } => {
                let code = unquote_code(&source[code.clone()]);
                match kind {
                    DirectiveKind::Escape => {
                        body.push_str("',g.h.escape(");
                        body.push_str(&escape_control(&code));
                        body.push_str("),'");
                    }
                    DirectiveKind::Interpolate => {
                        body.push_str("',");
                        body.push_str(&escape_control(&code));
                        body.push_str(",'");
                    }
                    DirectiveKind::Evaluate => {
                        body.push_str("');");
                        body.push_str(&code.replace(['\r', '\n', '\t'], " "));
                        body.push_str(";__p.push('");
                    }
                }
            }
        }
    }

    body.push_str("');}return __p.join('');");
    format!("function anonymous(obj) {{\n{body}\n}}")
}

/// Escape backslashes and single quotes for a single-quoted string literal
fn quote_text(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Directive code is quoted along with the text around it and then has its
/// quotes restored, so only its backslashes stay doubled
fn unquote_code(code: &str) -> String {
    quote_text(code).replace("\\'", "'")
}

fn escape_control(text: &str) -> String {
    text.replace('\r', "\\r")
        .replace('\n', "\\n")
        .replace('\t', "\\t")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::settings::SettingsOverride;

    fn compile(source: &str) -> Result<CompiledTemplate, TemplateError> {
        Compiler::new(&Settings::default()).compile(source)
    }

    fn render(source: &str, data: Value) -> String {
        compile(source).unwrap().execute(&data).unwrap()
    }

    #[test]
    fn test_literal_text_round_trip() {
        let source = "a\\b'c\nd\t\"e\"";
        assert_eq!(render(source, Value::Undefined), source);
    }

    #[test]
    fn test_interpolate_and_escape() {
        let data = Value::object([("name", "<World>")]);
        assert_eq!(
            render("<%= name %> / <%- name %>", data),
            "<World> / &lt;World&gt;"
        );
    }

    #[test]
    fn test_control_flow_across_directives() {
        assert_eq!(
            render("<% for (var i=0;i<3;i++) { %>x<% } %>", Value::object::<&str, Value, _>([])),
            "xxx"
        );
    }

    #[test]
    fn test_if_else_across_directives() {
        let source = "<% if (admin) { %>admin<% } else { %>guest<% } %>";
        assert_eq!(render(source, Value::object([("admin", true)])), "admin");
        assert_eq!(render(source, Value::object([("admin", false)])), "guest");
    }

    #[test]
    fn test_unbalanced_braces_fail_to_compile() {
        let err = compile("<% if (x) { %>open").unwrap_err();
        assert!(matches!(err, TemplateError::Unclosed(_)));

        let err = compile("close<% } %>").unwrap_err();
        assert!(matches!(err, TemplateError::Syntax(_)));
    }

    #[test]
    fn test_evaluate_disabled() {
        let settings = Settings::default().merged(Some(&SettingsOverride::new().without_evaluate()));
        let template = Compiler::new(&settings).compile("<% x %><%= y %>").unwrap();
        let out = template.execute(&Value::object([("y", 1)])).unwrap();
        assert_eq!(out, "<% x %>1");
    }

    #[test]
    fn test_function_source_shape() {
        let template = compile("Hi <%= name %>!\n<% if (a) { %>'<% } %><%- b %>").unwrap();
        let expected = concat!(
            "function anonymous(obj) {\n",
            "var __p=[],print=function(){__p.push.apply(__p,arguments);};",
            "var __debug = false;var g = this;with(obj||{}){__p.push('",
            "Hi ', name ,'!\\n",
            "'); if (a) { ;__p.push('",
            "\\'",
            "'); } ;__p.push('",
            "',g.h.escape( b ),'",
            "');}return __p.join('');",
            "\n}",
        );
        assert_eq!(template.function_source(), expected);
    }

    #[test]
    fn test_evaluate_code_whitespace_becomes_spaces() {
        let template = compile("<%\tif (a)\r\n{ %>x\ty<% } %>").unwrap();
        let expected = concat!(
            "function anonymous(obj) {\n",
            "var __p=[],print=function(){__p.push.apply(__p,arguments);};",
            "var __debug = false;var g = this;with(obj||{}){__p.push('",
            "'); if (a)  { ;__p.push('",
            "x\\ty",
            "'); } ;__p.push('",
            "');}return __p.join('');",
            "\n}",
        );
        assert_eq!(template.function_source(), expected);
        assert_eq!(template.execute(&Value::object([("a", true)])).unwrap(), "x\ty");
    }

    #[test]
    fn test_function_source_freezes_debug() {
        let template = Compiler::new(&Settings::debugging()).compile("x").unwrap();
        assert!(template.debug());
        assert!(template.function_source().contains("var __debug = true;"));
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let a = compile("<% var n = 2; %><%= n * 2 %>").unwrap();
        let b = compile("<% var n = 2; %><%= n * 2 %>").unwrap();
        assert_eq!(a.function_source(), b.function_source());
        assert_eq!(a.execute(&Value::Null).unwrap(), b.execute(&Value::Null).unwrap());
    }

    #[test]
    fn test_spans_point_into_template() {
        let err = compile("ok <%= 1 + %>").unwrap_err();
        let TemplateError::Syntax(syntax) = err else {
            panic!("expected syntax error");
        };
        // The directive's closing delimiter
        assert_eq!(syntax.span.offset(), 11);
    }
}
