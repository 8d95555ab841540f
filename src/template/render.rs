//! Template renderer
//!
//! The [`Engine`] owns the compiled-template cache and is the main entry
//! point of the crate. Templates are keyed by their exact source text: the
//! first render of a source compiles it with the settings in effect for that
//! call, and every later render of the same text reuses that compilation,
//! whatever settings it passes. Entries are never evicted.
//!
//! Rendering failures are contained according to the effective debug flag.
//! With debug off a failing render returns an empty string; with debug on the
//! failure is logged together with the function source and the template
//! text, then returned. Invalid settings and syntax errors are always
//! returned.

use super::compile::{CompiledTemplate, Compiler};
use super::error::TemplateError;
use super::settings::{Settings, SettingsOverride};
use super::value::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};
use tracing::{debug, debug_span, error, trace};

type Result<T> = std::result::Result<T, TemplateError>;

/// The process-wide engine behind [`crate::render`] and [`crate::prepare`]
static GLOBAL: LazyLock<Engine> = LazyLock::new(Engine::default);

/// What to do with a template
#[derive(Debug, Clone, Copy)]
pub enum Input<'d> {
    /// Compile and return a reusable render function
    Omitted,
    /// Return the textual function source without running anything
    Introspect,
    /// Render against this data
    Data(&'d Value),
}

/// Result of [`Engine::invoke`]
#[derive(Debug, Clone)]
pub enum Output {
    Rendered(String),
    Source(String),
    Curried(Prepared),
}

impl Output {
    pub fn into_rendered(self) -> Option<String> {
        match self {
            Output::Rendered(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_source(self) -> Option<String> {
        match self {
            Output::Source(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_curried(self) -> Option<Prepared> {
        match self {
            Output::Curried(prepared) => Some(prepared),
            _ => None,
        }
    }
}

/// A compiled template bound to a debug policy, ready to render many times
#[derive(Debug, Clone)]
pub struct Prepared {
    template: Arc<CompiledTemplate>,
    debug: bool,
}

impl Prepared {
    /// Render against `data`
    pub fn render(&self, data: &Value) -> Result<String> {
        contain(&self.template, self.template.execute(data), self.debug)
    }

    pub fn template(&self) -> &CompiledTemplate {
        &self.template
    }
}

/// Template engine with a compiled-template cache
pub struct Engine {
    settings: Settings,
    cache: RwLock<HashMap<String, Arc<CompiledTemplate>>>,
    compilations: AtomicUsize,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl Engine {
    /// Create an engine whose first compilations use `settings` unless a
    /// call overrides them
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            cache: RwLock::new(HashMap::new()),
            compilations: AtomicUsize::new(0),
        }
    }

    /// The process-wide engine with default settings
    pub fn global() -> &'static Engine {
        &GLOBAL
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Compile (or fetch) `source` and act on `input`
    pub fn invoke(
        &self,
        source: &str,
        input: Input<'_>,
        overrides: Option<&SettingsOverride>,
    ) -> Result<Output> {
        let template = self.compiled(source, overrides)?;
        let debug = self.settings.effective_debug(overrides);

        Ok(match input {
            Input::Introspect => Output::Source(template.function_source().to_string()),
            Input::Omitted => Output::Curried(Prepared { template, debug }),
            Input::Data(data) => Output::Rendered(contain(&template, template.execute(data), debug)?),
        })
    }

    /// Render `source` against `data` with the engine's settings
    pub fn render(&self, source: &str, data: &Value) -> Result<String> {
        self.render_with(source, data, None)
    }

    /// Render `source` against `data`; `overrides` only affect the first
    /// compilation of `source` and the containment policy of this call
    pub fn render_with(
        &self,
        source: &str,
        data: &Value,
        overrides: Option<&SettingsOverride>,
    ) -> Result<String> {
        let template = self.compiled(source, overrides)?;
        let debug = self.settings.effective_debug(overrides);
        contain(&template, template.execute(data), debug)
    }

    /// Compile `source` now and return a render function for later data
    pub fn prepare(&self, source: &str, overrides: Option<&SettingsOverride>) -> Result<Prepared> {
        Ok(Prepared {
            template: self.compiled(source, overrides)?,
            debug: self.settings.effective_debug(overrides),
        })
    }

    /// The textual function source of `source`; nothing is executed
    pub fn function_source(
        &self,
        source: &str,
        overrides: Option<&SettingsOverride>,
    ) -> Result<String> {
        Ok(self.compiled(source, overrides)?.function_source().to_string())
    }

    /// Like [`Engine::prepare`], naming the template in diagnostics when
    /// this call compiles it
    pub fn prepare_named(
        &self,
        name: &str,
        source: &str,
        overrides: Option<&SettingsOverride>,
    ) -> Result<Prepared> {
        Ok(Prepared {
            template: self.compiled_as(name, source, overrides)?,
            debug: self.settings.effective_debug(overrides),
        })
    }

    /// Fetch the cached compilation of `source`, compiling it on a miss
    pub fn compiled(
        &self,
        source: &str,
        overrides: Option<&SettingsOverride>,
    ) -> Result<Arc<CompiledTemplate>> {
        self.compiled_as("template", source, overrides)
    }

    fn compiled_as(
        &self,
        name: &str,
        source: &str,
        overrides: Option<&SettingsOverride>,
    ) -> Result<Arc<CompiledTemplate>> {
        let cached = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(source)
            .cloned();
        if let Some(template) = cached {
            trace!(bytes = source.len(), "template cache hit");
            return Ok(template);
        }

        // Compile outside the lock. Two threads racing on the same source
        // both compile; the last insert wins.
        let _span = debug_span!("compile", bytes = source.len()).entered();
        let settings = self.settings.merged(overrides);
        let template = Arc::new(Compiler::new(&settings).with_name(name).compile(source)?);
        self.compilations.fetch_add(1, Ordering::Relaxed);

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        cache.insert(source.to_string(), Arc::clone(&template));
        debug!(cached = cache.len(), "cached compiled template");
        Ok(template)
    }

    /// Number of compilations performed so far
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::Relaxed)
    }

    /// Number of cached templates
    pub fn cached_len(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Drop every cached compilation
    pub fn clear_cache(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Apply the fail-soft / fail-loud policy to a render result
fn contain(template: &CompiledTemplate, result: Result<String>, debug: bool) -> Result<String> {
    match result {
        Ok(output) => Ok(output),
        Err(err) if debug => {
            error!(
                "[jstmpl] {err} in:\n\n{}\n\n{}",
                template.function_source(),
                template.source()
            );
            Err(err)
        }
        Err(err) => {
            debug!(error = %err, "template failed; rendering empty output");
            Ok(String::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::error::ErrorKind;

    fn data(pairs: &[(&str, &str)]) -> Value {
        Value::object(pairs.iter().copied())
    }

    #[test]
    fn test_simple_render() {
        let engine = Engine::default();
        let out = engine
            .render("Hello, <%= name %>!", &data(&[("name", "World")]))
            .unwrap();
        assert_eq!(out, "Hello, World!");
    }

    #[test]
    fn test_cache_compiles_once() {
        let engine = Engine::default();
        let source = "<%= greeting %>";
        assert_eq!(engine.render(source, &data(&[("greeting", "hi")])).unwrap(), "hi");
        assert_eq!(engine.render(source, &data(&[("greeting", "yo")])).unwrap(), "yo");
        assert_eq!(engine.compilations(), 1);
        assert_eq!(engine.cached_len(), 1);
    }

    #[test]
    fn test_overrides_ignored_on_cache_hit() {
        let engine = Engine::default();
        let source = "{{ x }}<%= x %>";
        engine.render(source, &data(&[("x", "1")])).unwrap();

        let mustache = SettingsOverride::new()
            .interpolate(r"\{\{(.+?)\}\}")
            .without_evaluate();
        let out = engine
            .render_with(source, &data(&[("x", "2")]), Some(&mustache))
            .unwrap();
        assert_eq!(out, "{{ x }}2");
        assert_eq!(engine.compilations(), 1);

        engine.clear_cache();
        let out = engine
            .render_with(source, &data(&[("x", "3")]), Some(&mustache))
            .unwrap();
        assert_eq!(out, "3<%= x %>");
        assert_eq!(engine.compilations(), 2);
    }

    #[test]
    fn test_fail_soft_without_debug() {
        let engine = Engine::default();
        let out = engine.render("a<%= missing %>b", &Value::object::<&str, Value, _>([]));
        assert_eq!(out.unwrap(), "");
    }

    #[test]
    fn test_fail_loud_with_debug() {
        let engine = Engine::new(Settings::debugging());
        let err = engine
            .render("a<%= missing %>b", &Value::object::<&str, Value, _>([]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Execution);
        assert!(matches!(err, TemplateError::Undefined(_)));
    }

    #[test]
    fn test_debug_override_per_call() {
        let engine = Engine::default();
        let source = "<% throw 'bad' %>";
        assert_eq!(engine.render(source, &Value::Null).unwrap(), "");

        let loud = SettingsOverride::new().debug(true);
        let err = engine.render_with(source, &Value::Null, Some(&loud)).unwrap_err();
        assert_eq!(err.to_string(), "Uncaught bad");
    }

    #[test]
    fn test_compilation_errors_are_never_swallowed() {
        let engine = Engine::default();
        let err = engine.render("<% if (x) { %>", &Value::Null).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Compilation);

        let bad = SettingsOverride::new().escape("([");
        let err = engine.render_with("x", &Value::Null, Some(&bad)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(engine.cached_len(), 0);
    }

    #[test]
    fn test_introspection_does_not_execute() {
        let engine = Engine::new(Settings::debugging());
        let output = engine
            .invoke("<% throw new Error() %>", Input::Introspect, None)
            .unwrap();
        let source = output.into_source().unwrap();
        assert!(source.contains("return __p.join"));
        assert!(source.contains("throw new Error()"));
    }

    #[test]
    fn test_introspection_matches_across_calls() {
        let engine = Engine::default();
        let source = "<%= a %>";
        let first = engine.function_source(source, None).unwrap();
        engine.render(source, &data(&[("a", "x")])).unwrap();
        assert_eq!(engine.function_source(source, None).unwrap(), first);
        assert_eq!(engine.compilations(), 1);
    }

    #[test]
    fn test_curried_render() {
        let engine = Engine::default();
        let prepared = engine
            .invoke("<%- who %>!", Input::Omitted, None)
            .unwrap()
            .into_curried()
            .unwrap();
        assert_eq!(prepared.render(&data(&[("who", "a&b")])).unwrap(), "a&amp;b!");
        assert_eq!(prepared.render(&data(&[("who", "c")])).unwrap(), "c!");
        assert_eq!(engine.compilations(), 1);
    }

    #[test]
    fn test_curried_keeps_call_debug_policy() {
        let engine = Engine::default();
        let loud = engine
            .prepare("<%= nope %>", Some(&SettingsOverride::new().debug(true)))
            .unwrap();
        assert!(loud.render(&Value::Null).is_err());

        let soft = engine.prepare("<%= nope %>", None).unwrap();
        assert_eq!(soft.render(&Value::Null).unwrap(), "");
    }

    #[test]
    fn test_globals_frozen_at_first_compile() {
        let engine = Engine::default();
        let mut globals = crate::template::settings::Globals::empty();
        globals.insert("site", "first");
        let first = SettingsOverride::new().globals(globals);
        assert_eq!(
            engine.render_with("<%= g.site %>", &Value::Null, Some(&first)).unwrap(),
            "first"
        );
        // Cache hit: the globals of the first compilation stay bound
        assert_eq!(engine.render("<%= g.site %>", &Value::Null).unwrap(), "first");
    }

    #[test]
    fn test_concurrent_renders_converge() {
        let engine = Engine::default();
        std::thread::scope(|scope| {
            for i in 0..8 {
                let engine = &engine;
                scope.spawn(move || {
                    let n = i.to_string();
                    let out = engine.render("<%= n %>", &data(&[("n", n.as_str())])).unwrap();
                    assert_eq!(out, n);
                });
            }
        });
        assert_eq!(engine.cached_len(), 1);
        assert!((1..=8).contains(&engine.compilations()));
    }
}
