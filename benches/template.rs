//! Benchmarks for the template engine
//!
//! Run with: cargo bench --bench template
//!
//! Benchmarks cover:
//! - Compilation (scan + lex + parse)
//! - Cached render (the common path once a template has been seen)
//! - Escape-heavy output

use divan::{Bencher, black_box};
use jstmpl::template::{Compiler, Settings};
use jstmpl::{Engine, Value};

fn main() {
    divan::main();
}

// ============================================================================
// Templates
// ============================================================================

fn simple_text() -> &'static str {
    "Hello, World! This is a simple static text template."
}

fn with_variables() -> &'static str {
    "Hello, <%= name %>! Welcome to <%= site_name %>.\n\
     You have <%= message_count %> unread messages."
}

fn with_loops() -> &'static str {
    r#"<ul>
<% for (var item of items) { %>
  <li><%- item.name %>: <%= item.price.toFixed(2) %></li>
<% } %>
</ul>"#
}

fn with_helpers() -> &'static str {
    r#"<% for (var item of items) { %><%= g.h.li(g.h.escape(item.name), {class: 'item'}) %><% } %>
<a href="/search?<%= g.u.toQuery({q: query}) %>">search</a>"#
}

fn large_loop_template(iterations: usize) -> String {
    format!(
        "<% for (var i = 0; i < {iterations}; i++) {{ %><%- label %> <%= i %>\n<% }} %>"
    )
}

// ============================================================================
// Data
// ============================================================================

fn simple_data() -> Value {
    Value::object([
        ("name", Value::from("Alice")),
        ("site_name", Value::from("jstmpl")),
        ("message_count", Value::from(42)),
    ])
}

fn loop_data() -> Value {
    let items: Vec<Value> = (0..50)
        .map(|i| {
            Value::object([
                ("name", Value::from(format!("<Item {i}>"))),
                ("price", Value::from(f64::from(i) * 1.25)),
            ])
        })
        .collect();
    Value::object([
        ("items", Value::from(items)),
        ("query", Value::from("rust & templates")),
        ("label", Value::from("<row>")),
    ])
}

// ============================================================================
// Compilation
// ============================================================================

#[divan::bench]
fn compile_simple(bencher: Bencher) {
    let settings = Settings::default();
    bencher.bench(|| Compiler::new(&settings).compile(black_box(simple_text())));
}

#[divan::bench]
fn compile_with_variables(bencher: Bencher) {
    let settings = Settings::default();
    bencher.bench(|| Compiler::new(&settings).compile(black_box(with_variables())));
}

#[divan::bench]
fn compile_with_loops(bencher: Bencher) {
    let settings = Settings::default();
    bencher.bench(|| Compiler::new(&settings).compile(black_box(with_loops())));
}

// ============================================================================
// Cached rendering
// ============================================================================

#[divan::bench]
fn render_simple(bencher: Bencher) {
    let engine = Engine::default();
    let data = simple_data();
    bencher.bench(|| engine.render(black_box(simple_text()), &data));
}

#[divan::bench]
fn render_with_variables(bencher: Bencher) {
    let engine = Engine::default();
    let data = simple_data();
    bencher.bench(|| engine.render(black_box(with_variables()), &data));
}

#[divan::bench]
fn render_with_loops(bencher: Bencher) {
    let engine = Engine::default();
    let data = loop_data();
    bencher.bench(|| engine.render(black_box(with_loops()), &data));
}

#[divan::bench]
fn render_with_helpers(bencher: Bencher) {
    let engine = Engine::default();
    let data = loop_data();
    bencher.bench(|| engine.render(black_box(with_helpers()), &data));
}

#[divan::bench(args = [10, 100, 1000])]
fn render_loop_scaling(bencher: Bencher, iterations: usize) {
    let engine = Engine::default();
    let prepared = engine
        .prepare(&large_loop_template(iterations), None)
        .expect("template compiles");
    let data = loop_data();
    bencher.bench(|| prepared.render(black_box(&data)));
}
