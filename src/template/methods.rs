//! Built-in methods on strings, arrays and numbers
//!
//! These are the primitive methods templates commonly reach for
//! (`name.toUpperCase()`, `tags.join(', ')`, `price.toFixed(2)`). Anything
//! else is looked up as a property and must be a function value.

use super::value::{Value, format_number};

/// Call `base.name(args)` if `name` is a built-in method for the type of
/// `base`. Returns `None` when there is no such method.
pub fn call_method(base: &Value, name: &str, args: &[Value]) -> Option<Result<Value, String>> {
    let arg = |i: usize| args.get(i).cloned().unwrap_or_default();

    let result = match (base, name) {
        (Value::String(s), "toUpperCase") => Ok(Value::String(s.to_uppercase())),
        (Value::String(s), "toLowerCase") => Ok(Value::String(s.to_lowercase())),
        (Value::String(s), "trim") => Ok(Value::String(s.trim().to_string())),
        (Value::String(s), "indexOf") => Ok(Value::Number(string_index_of(s, &arg(0).to_js_string()))),
        (Value::String(s), "includes") => Ok(Value::Bool(s.contains(&arg(0).to_js_string()))),
        (Value::String(s), "slice") => {
            let chars: Vec<char> = s.chars().collect();
            let (start, end) = slice_bounds(chars.len(), &arg(0), &arg(1));
            Ok(Value::String(chars[start..end].iter().collect()))
        }
        (Value::String(s), "split") => Ok(split(s, &arg(0))),
        (Value::String(s), "replace") => match arg(0) {
            Value::String(pattern) => {
                let replacement = arg(1).to_js_string();
                Ok(Value::String(s.replacen(&pattern, &replacement, 1)))
            }
            other => Err(format!(
                "replace() expects a string pattern, got {}",
                other.type_of()
            )),
        },

        (Value::Array(items), "join") => {
            let sep = match arg(0) {
                Value::Undefined => ",".to_string(),
                other => other.to_js_string(),
            };
            Ok(Value::String(
                items
                    .iter()
                    .map(Value::to_output)
                    .collect::<Vec<_>>()
                    .join(&sep),
            ))
        }
        (Value::Array(items), "indexOf") => {
            let needle = arg(0);
            let position = items.iter().position(|item| item.strict_eq(&needle));
            Ok(Value::Number(position.map_or(-1.0, |i| i as f64)))
        }
        (Value::Array(items), "includes") => {
            let needle = arg(0);
            Ok(Value::Bool(items.iter().any(|item| item.strict_eq(&needle))))
        }
        (Value::Array(items), "slice") => {
            let (start, end) = slice_bounds(items.len(), &arg(0), &arg(1));
            Ok(Value::Array(items[start..end].to_vec()))
        }

        (Value::Number(n), "toFixed") => {
            let digits = arg(0).to_number();
            let digits = if digits.is_nan() { 0.0 } else { digits.trunc() };
            if !(0.0..=100.0).contains(&digits) {
                Err("toFixed() digits argument must be between 0 and 100".to_string())
            } else if !n.is_finite() {
                Ok(Value::String(format_number(*n)))
            } else {
                Ok(Value::String(format!("{:.*}", digits as usize, n)))
            }
        }

        (value, "toString") if !value.is_nullish() => Ok(Value::String(value.to_js_string())),
        _ => return None,
    };

    Some(result)
}

/// Character index of `needle` in `haystack`, or -1
fn string_index_of(haystack: &str, needle: &str) -> f64 {
    haystack
        .find(needle)
        .map_or(-1.0, |byte| haystack[..byte].chars().count() as f64)
}

fn split(s: &str, separator: &Value) -> Value {
    let parts: Vec<Value> = match separator {
        Value::Undefined => vec![Value::String(s.to_string())],
        sep => {
            let sep = sep.to_js_string();
            if sep.is_empty() {
                s.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                s.split(sep.as_str()).map(Value::from).collect()
            }
        }
    };
    Value::Array(parts)
}

/// Resolve `slice(start, end)` arguments against a length; negative values
/// count from the end
fn slice_bounds(len: usize, start: &Value, end: &Value) -> (usize, usize) {
    let start = relative_index(start, len, 0);
    let end = relative_index(end, len, len);
    (start, end.max(start))
}

fn relative_index(value: &Value, len: usize, default: usize) -> usize {
    if matches!(value, Value::Undefined) {
        return default;
    }
    let n = value.to_number();
    if n.is_nan() {
        return 0;
    }
    let n = n.trunc();
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(base: impl Into<Value>, name: &str, args: &[Value]) -> Value {
        call_method(&base.into(), name, args).unwrap().unwrap()
    }

    #[test]
    fn test_string_methods() {
        assert_eq!(call("Hello", "toUpperCase", &[]), Value::from("HELLO"));
        assert_eq!(call("  x ", "trim", &[]), Value::from("x"));
        assert_eq!(call("héllo", "indexOf", &["l".into()]), Value::Number(2.0));
        assert_eq!(call("abc", "indexOf", &["z".into()]), Value::Number(-1.0));
        assert_eq!(call("a-b-c", "replace", &["-".into(), "+".into()]), Value::from("a+b-c"));
    }

    #[test]
    fn test_slice_negative() {
        assert_eq!(call("template", "slice", &[Value::Number(-4.0)]), Value::from("late"));
        assert_eq!(
            call("template", "slice", &[Value::Number(1.0), Value::Number(3.0)]),
            Value::from("em")
        );
        let items = Value::from(vec![1, 2, 3]);
        assert_eq!(
            call(items, "slice", &[Value::Number(1.0)]),
            Value::from(vec![2, 3])
        );
    }

    #[test]
    fn test_split_and_join() {
        let parts = call("a,b,c", "split", &[",".into()]);
        assert_eq!(parts, Value::from(vec!["a", "b", "c"]));
        assert_eq!(call(parts, "join", &[" / ".into()]), Value::from("a / b / c"));
        assert_eq!(call(vec![Value::Null, 1.into()], "join", &[]), Value::from(",1"));
    }

    #[test]
    fn test_to_fixed() {
        assert_eq!(call(1.23456, "toFixed", &[Value::Number(2.0)]), Value::from("1.23"));
        assert_eq!(call(2.0, "toFixed", &[]), Value::from("2"));
        assert!(call_method(&Value::Number(1.0), "toFixed", &[Value::Number(101.0)])
            .unwrap()
            .is_err());
    }

    #[test]
    fn test_unknown_method() {
        assert!(call_method(&Value::from("x"), "frobnicate", &[]).is_none());
        assert!(call_method(&Value::Null, "toString", &[]).is_none());
    }
}
