//! Standard template globals
//!
//! Templates reach these through `g`:
//!
//! - `g.h`: HTML helpers (`escape`, `enclose`, `select`, and one function per
//!   common tag such as `g.h.p(text, attrs)`)
//! - `g.u`: URL helpers (`toQuery`)
//! - `g.debug(msg)`: log a message when the template was compiled in debug
//!   mode

pub mod html;
pub mod url;

use crate::template::{Call, Function, Globals, Value};

/// Add `h`, `u` and `debug` to `globals`
pub fn install(globals: &mut Globals) {
    globals.insert("h", html::namespace());
    globals.insert("u", url::namespace());
    globals.register_fn("debug", Function::new("debug", debug));
}

fn debug(call: &Call<'_>) -> Result<Value, String> {
    if !call.debug {
        return Ok(Value::Undefined);
    }
    let message = call.arg(0);
    if message.is_truthy() {
        tracing::debug!(target: "jstmpl::template", "{message}");
    } else {
        let parts: Vec<String> = call.args.iter().map(Value::to_js_string).collect();
        tracing::debug!(target: "jstmpl::template", "{}", parts.join(" "));
    }
    Ok(Value::Undefined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_silent_without_flag() {
        let call = Call {
            args: &[Value::from("hello")],
            debug: false,
        };
        assert_eq!(debug(&call), Ok(Value::Undefined));
    }

    #[test]
    fn test_install_registers_namespaces() {
        let mut globals = Globals::empty();
        install(&mut globals);
        assert!(globals.get("h").and_then(Value::as_object).is_some());
        assert!(globals.get("u").and_then(Value::as_object).is_some());
        assert!(matches!(globals.get("debug"), Some(Value::Function(_))));
    }
}
