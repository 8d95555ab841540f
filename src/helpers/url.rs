//! URL helpers (`g.u`)

use crate::template::{Call, Function, Value};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters `encodeURIComponent` escapes: everything except
/// `A-Z a-z 0-9 - _ . ! ~ * ' ( )`
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a query value
pub fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string()
}

/// `key=value` pairs joined by `;`. Keys are used as they are; values are
/// percent-encoded. There is no leading `?`.
pub fn to_query(parameters: &Value) -> Result<String, String> {
    let pairs: Vec<String> = match parameters {
        Value::Object(entries) => entries
            .iter()
            .map(|(key, value)| format!("{key}={}", encode_component(&value.to_js_string())))
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, value)| format!("{i}={}", encode_component(&value.to_js_string())))
            .collect(),
        other => {
            return Err(format!(
                "toQuery() expects an object of parameters, got {}",
                other.type_of()
            ));
        }
    };
    Ok(pairs.join(";"))
}

/// The `u` object
pub fn namespace() -> Value {
    Value::object([(
        "toQuery",
        Function::new("u.toQuery", |call: &Call<'_>| {
            to_query(call.arg(0)).map(Value::String)
        }),
    )])
}
