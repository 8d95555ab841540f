//! HTML helpers (`g.h`)

use crate::template::{Call, Function, Value};
use indexmap::IndexMap;

/// Tags that get a `g.h.<tag>(content, attrs)` shorthand
pub const TAGS: &[&str] = &[
    "p", "a", "strong", "em", "button", "code", "pre", "blockquote", "div", "li", "dd", "dt",
    "td", "th", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "tt",
];

/// Shorthand aliases: `b` renders `<strong>`, `i` renders `<em>`
const ALIASES: &[(&str, &str)] = &[("b", "strong"), ("i", "em")];

/// Escape `& < > " ' /` as HTML entities
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            c => out.push(c),
        }
    }
    out
}

/// Wrap `content` in `<tag attrs>...</tag>`; attribute values are not escaped
pub fn enclose(content: &Value, tag: &str, attrs: &Value) -> String {
    let mut html = format!("<{tag}");
    for (name, value) in attributes(attrs) {
        html.push_str(&format!(" {name}=\"{}\"", value.to_js_string()));
    }
    html.push('>');
    html.push_str(&content.to_js_string());
    html.push_str(&format!("</{tag}>"));
    html
}

/// A `<select>` whose options come from an array (value and label are the
/// element) or an object (key is the value, entry is the label)
pub fn select(options: &Value, attrs: &Value) -> String {
    let html: String = match options {
        Value::Array(items) => items
            .iter()
            .map(|v| {
                let v = v.to_js_string();
                format!("<option value=\"{v}\">{v}</option>")
            })
            .collect(),
        Value::Object(entries) => entries
            .iter()
            .map(|(key, label)| format!("<option value=\"{key}\">{}</option>", label.to_js_string()))
            .collect(),
        _ => String::new(),
    };
    enclose(&Value::String(html), "select", attrs)
}

fn attributes(attrs: &Value) -> Vec<(String, &Value)> {
    match attrs {
        Value::Object(entries) => entries.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => Vec::new(),
    }
}

/// The `h` object
pub fn namespace() -> Value {
    let mut h: IndexMap<String, Value> = IndexMap::new();

    h.insert(
        "escape".to_string(),
        Function::new("h.escape", |call: &Call<'_>| {
            let value = call.arg(0);
            let text = match value {
                Value::String(s) => escape(s),
                other => escape(&other.to_output()),
            };
            Ok(Value::String(text))
        })
        .into(),
    );

    h.insert(
        "enclose".to_string(),
        Function::new("h.enclose", |call: &Call<'_>| {
            let Some(tag) = call.arg(1).as_str() else {
                return Err("enclose() expects a tag name as its second argument".to_string());
            };
            Ok(Value::String(enclose(call.arg(0), tag, call.arg(2))))
        })
        .into(),
    );

    h.insert(
        "select".to_string(),
        Function::new("h.select", |call: &Call<'_>| {
            Ok(Value::String(select(call.arg(0), call.arg(1))))
        })
        .into(),
    );

    let shorthands = TAGS
        .iter()
        .map(|tag| (*tag, *tag))
        .chain(ALIASES.iter().copied());
    for (name, tag) in shorthands {
        let function = Function::new(&format!("h.{name}"), move |call: &Call<'_>| {
            Ok(Value::String(enclose(call.arg(0), tag, call.arg(1))))
        });
        h.insert(name.to_string(), function.into());
    }

    Value::Object(h)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> Value {
        let h = namespace();
        let Value::Function(function) = h.get_property(name) else {
            panic!("h.{name} is not a function");
        };
        function.call(&Call { args, debug: false }).unwrap()
    }

    #[test]
    fn test_escape_all_specials() {
        assert_eq!(
            escape(r#"<a href="/x?a=1&b='2'">"#),
            "&lt;a href=&quot;&#x2F;x?a=1&amp;b=&#x27;2&#x27;&quot;&gt;"
        );
    }

    #[test]
    fn test_escape_is_not_applied_twice() {
        assert_eq!(escape("&amp;"), "&amp;amp;");
        assert_eq!(escape(">"), "&gt;");
    }

    #[test]
    fn test_escape_helper_converts_values() {
        assert_eq!(call("escape", &[Value::Number(3.0)]), Value::from("3"));
        assert_eq!(call("escape", &[Value::Null]), Value::from(""));
    }

    #[test]
    fn test_tag_helpers() {
        let attrs = Value::object([("class", "note"), ("id", "n1")]);
        assert_eq!(
            call("p", &["Hi".into(), attrs]),
            Value::from(r#"<p class="note" id="n1">Hi</p>"#)
        );
        assert_eq!(call("h2", &["Title".into()]), Value::from("<h2>Title</h2>"));
    }

    #[test]
    fn test_aliases() {
        assert_eq!(call("b", &["x".into()]), Value::from("<strong>x</strong>"));
        assert_eq!(call("i", &["x".into()]), Value::from("<em>x</em>"));
    }

    #[test]
    fn test_select_from_array_and_object() {
        assert_eq!(
            select(&Value::from(vec!["a", "b"]), &Value::Undefined),
            r#"<select><option value="a">a</option><option value="b">b</option></select>"#
        );
        let opts = Value::object([("1", "One")]);
        let attrs = Value::object([("name", "n")]);
        assert_eq!(
            select(&opts, &attrs),
            r#"<select name="n"><option value="1">One</option></select>"#
        );
    }
}
