//! Template program interpreter
//!
//! Runs a parsed [`Program`] against a data object and a globals object.
//! Bare names resolve in this order: template locals, the reserved bindings
//! (`g`, `print`, `__debug`, `obj`), then the fields of the data object. A
//! name found nowhere is an [`UndefinedError`].
//!
//! Neither the data nor the globals are ever mutated. Assigning through a
//! data field (`item.count += 1`) first copies that field into a template
//! local, and later reads see the copy.

use super::ast::*;
use super::error::{
    HelperError, TemplateError, TemplateSource, ThrownError, TypeError, UndefinedError,
};
use super::methods;
use super::settings::RESERVED_NAMES;
use super::value::{Call, Function, Value, format_number};
use indexmap::IndexMap;
use std::collections::HashMap;

type Result<T> = std::result::Result<T, TemplateError>;

/// Control flow signals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    /// Continue with the next statement
    Normal,
    /// Skip to the next loop iteration
    Continue,
    /// Exit the innermost loop
    Break,
}

/// A template-local binding
#[derive(Debug, Clone)]
struct Local {
    value: Value,
    constant: bool,
}

/// An assignable location: a root name and a property path below it
struct Place {
    root: Ident,
    keys: Vec<Value>,
}

/// Executes one render of a compiled template
pub struct Evaluator<'a> {
    data: &'a Value,
    globals: &'a Value,
    /// Frozen `__debug` flag of the compiled template
    debug: bool,
    source: &'a TemplateSource,
    locals: HashMap<String, Local>,
    output: String,
}

impl<'a> Evaluator<'a> {
    pub fn new(data: &'a Value, globals: &'a Value, debug: bool, source: &'a TemplateSource) -> Self {
        Self {
            data,
            globals,
            debug,
            source,
            locals: HashMap::new(),
            output: String::new(),
        }
    }

    /// Run the program and return the accumulated output
    pub fn run(mut self, program: &Program) -> Result<String> {
        self.exec_all(&program.body)?;
        Ok(self.output)
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn exec_all(&mut self, stmts: &[Stmt]) -> Result<Flow> {
        for stmt in stmts {
            let flow = self.exec(stmt)?;
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Text(text) => {
                self.output.push_str(&text.text);
            }
            Stmt::Output(out) => {
                let value = self.eval(&out.expr)?;
                let value = if out.escape {
                    self.escape(value, out.span)?
                } else {
                    value
                };
                self.output.push_str(&value.to_output());
            }
            Stmt::Expr(stmt) => {
                self.eval(&stmt.expr)?;
            }
            Stmt::Decl(decl) => self.declare(decl)?,
            Stmt::If(stmt) => {
                if self.eval(&stmt.condition)?.is_truthy() {
                    return self.exec(&stmt.then_branch);
                } else if let Some(otherwise) = &stmt.else_branch {
                    return self.exec(otherwise);
                }
            }
            Stmt::Block(block) => return self.exec_all(&block.body),
            Stmt::For(stmt) => {
                if let Some(init) = &stmt.init {
                    self.exec(init)?;
                }
                loop {
                    if let Some(condition) = &stmt.condition
                        && !self.eval(condition)?.is_truthy()
                    {
                        break;
                    }
                    if self.exec(&stmt.body)? == Flow::Break {
                        break;
                    }
                    if let Some(update) = &stmt.update {
                        self.eval(update)?;
                    }
                }
            }
            Stmt::ForEach(stmt) => {
                for item in self.iteration_items(stmt)? {
                    self.bind(&stmt.binding, item, false)?;
                    if self.exec(&stmt.body)? == Flow::Break {
                        break;
                    }
                }
            }
            Stmt::While(stmt) => {
                while self.eval(&stmt.condition)?.is_truthy() {
                    if self.exec(&stmt.body)? == Flow::Break {
                        break;
                    }
                }
            }
            Stmt::Break(_) => return Ok(Flow::Break),
            Stmt::Continue(_) => return Ok(Flow::Continue),
            Stmt::Throw(stmt) => {
                let value = self.eval(&stmt.value)?;
                return Err(ThrownError {
                    message: thrown_message(&value),
                    span: stmt.span,
                    src: self.source.named_source(),
                }
                .into());
            }
            Stmt::Empty(_) => {}
        }
        Ok(Flow::Normal)
    }

    fn declare(&mut self, decl: &DeclStmt) -> Result<()> {
        for declarator in &decl.declarators {
            let value = match &declarator.init {
                Some(init) => self.eval(init)?,
                // `var x;` keeps an earlier value, `let x;` resets it
                None if decl.kind == DeclKind::Var
                    && self.locals.contains_key(&declarator.name.name) =>
                {
                    continue;
                }
                None => Value::Undefined,
            };
            self.bind(&declarator.name, value, decl.kind == DeclKind::Const)?;
        }
        Ok(())
    }

    fn bind(&mut self, name: &Ident, value: Value, constant: bool) -> Result<()> {
        if RESERVED_NAMES.contains(&name.name.as_str()) {
            return Err(self.type_error(
                format!("Cannot declare reserved name `{}`", name.name),
                "reserved",
                name.span,
            ));
        }
        self.locals
            .insert(name.name.clone(), Local { value, constant });
        Ok(())
    }

    fn iteration_items(&mut self, stmt: &ForEachStmt) -> Result<Vec<Value>> {
        let iter = self.eval(&stmt.iter)?;
        match (stmt.kind, iter) {
            (IterKind::Of, Value::Array(items)) => Ok(items),
            (IterKind::Of, Value::String(s)) => {
                Ok(s.chars().map(|c| Value::String(c.to_string())).collect())
            }
            (IterKind::Of, other) => Err(self.type_error(
                format!("{} is not iterable", describe(&stmt.iter, &other)),
                "not iterable",
                stmt.iter.span(),
            )),
            (IterKind::In, Value::Object(map)) => Ok(map.into_keys().map(Value::String).collect()),
            (IterKind::In, Value::Array(items)) => {
                Ok((0..items.len()).map(|i| Value::String(i.to_string())).collect())
            }
            (IterKind::In, Value::String(s)) => {
                Ok((0..s.chars().count()).map(|i| Value::String(i.to_string())).collect())
            }
            (IterKind::In, _) => Ok(Vec::new()),
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn eval(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(lit) => Ok(match &lit.value {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::String(s) => Value::String(s.clone()),
                LiteralValue::Bool(b) => Value::Bool(*b),
                LiteralValue::Null => Value::Null,
                LiteralValue::Undefined => Value::Undefined,
            }),
            Expr::Array(arr) => {
                let mut elements = Vec::with_capacity(arr.elements.len());
                for element in &arr.elements {
                    elements.push(self.eval(element)?);
                }
                Ok(Value::Array(elements))
            }
            Expr::Object(obj) => {
                let mut entries = IndexMap::with_capacity(obj.entries.len());
                for (key, value) in &obj.entries {
                    let value = self.eval(value)?;
                    entries.insert(key.clone(), value);
                }
                Ok(Value::Object(entries))
            }
            Expr::Var(ident) => self.lookup(ident),
            Expr::Member(member) => {
                if let Some(value) = self.resolve_path(expr) {
                    return Ok(value.clone());
                }
                let base = self.eval(&member.base)?;
                self.read_property(&base, &member.base, &member.property.name, member.property.span)
            }
            Expr::Index(index) => {
                let base = self.eval(&index.base)?;
                let key = self.eval(&index.index)?;
                if base.is_nullish() {
                    return Err(self.nullish_read(&base, &index.base, &property_key(&key), index.span));
                }
                Ok(base.get_index(&key))
            }
            Expr::Call(call) => self.call(call),
            Expr::New(new) => self.construct(new),
            Expr::Unary(unary) => {
                let value = match (unary.op, unary.expr.as_ref()) {
                    // `typeof missing` is "undefined", not an error
                    (UnaryOp::TypeOf, Expr::Var(ident)) => match self.lookup(ident) {
                        Ok(value) => value,
                        Err(TemplateError::Undefined(_)) => Value::Undefined,
                        Err(e) => return Err(e),
                    },
                    _ => self.eval(&unary.expr)?,
                };
                Ok(match unary.op {
                    UnaryOp::Not => Value::Bool(!value.is_truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Pos => Value::Number(value.to_number()),
                    UnaryOp::TypeOf => Value::String(value.type_of().to_string()),
                })
            }
            Expr::Update(update) => {
                let place = self.place(&update.target)?;
                let old = self.read_place(&place)?.to_number();
                let new = match update.op {
                    UpdateOp::Increment => old + 1.0,
                    UpdateOp::Decrement => old - 1.0,
                };
                self.write_place(place, Value::Number(new), update.span)?;
                Ok(Value::Number(if update.prefix { new } else { old }))
            }
            Expr::Binary(binary) => {
                let left = self.eval(&binary.left)?;
                match binary.op {
                    BinaryOp::And if !left.is_truthy() => Ok(left),
                    BinaryOp::Or if left.is_truthy() => Ok(left),
                    BinaryOp::And | BinaryOp::Or => self.eval(&binary.right),
                    op => {
                        let right = self.eval(&binary.right)?;
                        Ok(binary_op(op, &left, &right))
                    }
                }
            }
            Expr::Conditional(cond) => {
                if self.eval(&cond.condition)?.is_truthy() {
                    self.eval(&cond.then)
                } else {
                    self.eval(&cond.otherwise)
                }
            }
            Expr::Assign(assign) => {
                let place = self.place(&assign.target)?;
                let value = match assign.op.binary() {
                    None => self.eval(&assign.value)?,
                    Some(op) => {
                        let current = self.read_place(&place)?;
                        let rhs = self.eval(&assign.value)?;
                        binary_op(op, &current, &rhs)
                    }
                };
                self.write_place(place, value.clone(), assign.span)?;
                Ok(value)
            }
        }
    }

    // ========================================================================
    // Name resolution
    // ========================================================================

    /// Resolve a bare name without cloning, for names that are stored values
    fn lookup_ref(&self, name: &str) -> Option<&Value> {
        if let Some(local) = self.locals.get(name) {
            return Some(&local.value);
        }
        match name {
            "g" => Some(self.globals),
            "obj" => Some(self.data),
            _ if RESERVED_NAMES.contains(&name) => None,
            _ => self.data.as_object().and_then(|fields| fields.get(name)),
        }
    }

    fn lookup(&self, ident: &Ident) -> Result<Value> {
        if let Some(value) = self.lookup_ref(&ident.name) {
            return Ok(value.clone());
        }
        match ident.name.as_str() {
            "__debug" => Ok(Value::Bool(self.debug)),
            "__p" => Ok(Value::String(self.output.clone())),
            "print" => Ok(Value::Function(Function::new("print", |_| {
                Err("print can only be called directly".to_string())
            }))),
            _ => Err(self.undefined(ident)),
        }
    }

    /// Follow a chain of `.name` accesses by reference
    fn resolve_path(&self, expr: &Expr) -> Option<&Value> {
        match expr {
            Expr::Var(ident) => self.lookup_ref(&ident.name),
            Expr::Member(member) => match self.resolve_path(&member.base)? {
                Value::Object(fields) => fields.get(&member.property.name),
                _ => None,
            },
            _ => None,
        }
    }

    fn read_property(&self, base: &Value, base_expr: &Expr, name: &str, span: Span) -> Result<Value> {
        if base.is_nullish() {
            return Err(self.nullish_read(base, base_expr, name, span));
        }
        Ok(base.get_property(name))
    }

    // ========================================================================
    // Calls
    // ========================================================================

    fn call(&mut self, call: &CallExpr) -> Result<Value> {
        match call.callee.as_ref() {
            Expr::Var(ident) if ident.name == "print" => {
                for arg in &call.args {
                    let value = self.eval(arg)?;
                    self.output.push_str(&value.to_output());
                }
                Ok(Value::Undefined)
            }
            Expr::Member(member) => {
                if let Some(Value::Function(function)) = self.resolve_path(&call.callee) {
                    let function = function.clone();
                    let args = self.eval_args(&call.args)?;
                    return self.invoke(&function, &args, call.span);
                }

                let base = self.eval(&member.base)?;
                let name = &member.property.name;
                if base.is_nullish() {
                    return Err(self.nullish_read(&base, &member.base, name, member.property.span));
                }
                let args = self.eval_args(&call.args)?;

                if let Value::Function(function) = base.get_property(name) {
                    return self.invoke(&function, &args, call.span);
                }
                match methods::call_method(&base, name, &args) {
                    Some(Ok(value)) => Ok(value),
                    Some(Err(message)) => Err(self.type_error(message, "in this call", call.span)),
                    None => Err(self.not_a_function(&call.callee, member.property.span)),
                }
            }
            callee => {
                let value = self.eval(callee)?;
                let args = self.eval_args(&call.args)?;
                match value {
                    Value::Function(function) => self.invoke(&function, &args, call.span),
                    _ => Err(self.not_a_function(callee, callee.span())),
                }
            }
        }
    }

    fn eval_args(&mut self, args: &[Expr]) -> Result<Vec<Value>> {
        args.iter().map(|arg| self.eval(arg)).collect()
    }

    fn invoke(&self, function: &Function, args: &[Value], span: Span) -> Result<Value> {
        function
            .call(&Call {
                args,
                debug: self.debug,
            })
            .map_err(|message| {
                HelperError {
                    helper: function.name().to_string(),
                    message,
                    span,
                    src: self.source.named_source(),
                }
                .into()
            })
    }

    /// Run an escape directive's value through `g.h.escape`
    fn escape(&self, value: Value, span: Span) -> Result<Value> {
        let helper = self
            .globals
            .as_object()
            .and_then(|g| g.get("h"))
            .and_then(Value::as_object)
            .and_then(|h| h.get("escape"));
        match helper {
            Some(Value::Function(function)) => self.invoke(function, &[value], span),
            _ => Err(self.type_error(
                "g.h.escape is not a function".to_string(),
                "escape directive needs the `h.escape` global",
                span,
            )),
        }
    }

    /// `new Error(message)` and friends
    fn construct(&mut self, new: &NewExpr) -> Result<Value> {
        let name = &new.constructor.name;
        if !name.ends_with("Error") {
            return Err(self.type_error(
                format!("{name} is not a constructor"),
                "only error types can be constructed",
                new.constructor.span,
            ));
        }
        let args = self.eval_args(&new.args)?;
        let message = match args.first() {
            None | Some(Value::Undefined) => String::new(),
            Some(value) => value.to_js_string(),
        };
        Ok(Value::object([
            ("name", Value::String(name.clone())),
            ("message", Value::String(message)),
        ]))
    }

    // ========================================================================
    // Assignment
    // ========================================================================

    fn place(&mut self, expr: &Expr) -> Result<Place> {
        match expr {
            Expr::Var(ident) => Ok(Place {
                root: ident.clone(),
                keys: Vec::new(),
            }),
            Expr::Member(member) => {
                let mut place = self.place(&member.base)?;
                place.keys.push(Value::String(member.property.name.clone()));
                Ok(place)
            }
            Expr::Index(index) => {
                let mut place = self.place(&index.base)?;
                let key = self.eval(&index.index)?;
                place.keys.push(key);
                Ok(place)
            }
            other => Err(self.type_error(
                "Invalid assignment target".to_string(),
                "cannot assign here",
                other.span(),
            )),
        }
    }

    fn read_place(&self, place: &Place) -> Result<Value> {
        let mut value = self.lookup(&place.root)?;
        for key in &place.keys {
            if value.is_nullish() {
                return Err(self.type_error(
                    format!(
                        "Cannot read properties of {} (reading '{}')",
                        nullish_name(&value),
                        property_key(key)
                    ),
                    "",
                    place.root.span,
                ));
            }
            value = value.get_index(key);
        }
        Ok(value)
    }

    fn write_place(&mut self, place: Place, value: Value, span: Span) -> Result<()> {
        let name = place.root.name.as_str();
        if RESERVED_NAMES.contains(&name) {
            return Err(self.type_error(
                format!("Cannot assign to reserved name `{name}`"),
                "reserved",
                place.root.span,
            ));
        }

        if place.keys.is_empty() {
            if self.locals.get(name).is_some_and(|local| local.constant) {
                return Err(self.type_error(
                    "Assignment to constant variable.".to_string(),
                    "declared with `const`",
                    span,
                ));
            }
            self.locals.insert(
                name.to_string(),
                Local {
                    value,
                    constant: false,
                },
            );
            return Ok(());
        }

        if !self.locals.contains_key(name) {
            // Copy the data field so the caller's data stays untouched
            let Some(field) = self.data.as_object().and_then(|fields| fields.get(name)) else {
                return Err(self.undefined(&place.root));
            };
            let local = Local {
                value: field.clone(),
                constant: false,
            };
            self.locals.insert(name.to_string(), local);
        }

        let result = match self.locals.get_mut(name) {
            Some(local) => set_path(&mut local.value, &place.keys, value),
            None => Ok(()),
        };
        result.map_err(|message| self.type_error(message, "in this assignment", span))
    }

    // ========================================================================
    // Errors
    // ========================================================================

    fn type_error(&self, message: String, context: &str, span: Span) -> TemplateError {
        TypeError {
            message,
            span,
            context: context.to_string(),
            src: self.source.named_source(),
        }
        .into()
    }

    fn undefined(&self, ident: &Ident) -> TemplateError {
        let mut available: Vec<String> = self.locals.keys().cloned().collect();
        available.sort();
        available.extend(["g", "print", "__debug", "obj"].map(String::from));
        if let Some(fields) = self.data.as_object() {
            available.extend(
                fields
                    .keys()
                    .filter(|k| !RESERVED_NAMES.contains(&k.as_str()))
                    .cloned(),
            );
        }
        UndefinedError {
            name: ident.name.clone(),
            available,
            span: ident.span,
            src: self.source.named_source(),
        }
        .into()
    }

    fn nullish_read(&self, base: &Value, base_expr: &Expr, name: &str, span: Span) -> TemplateError {
        self.type_error(
            format!(
                "Cannot read properties of {} (reading '{name}')",
                nullish_name(base)
            ),
            &format!("{} is {}", describe(base_expr, base), nullish_name(base)),
            span,
        )
    }

    fn not_a_function(&self, callee: &Expr, span: Span) -> TemplateError {
        let name = path_text(callee).unwrap_or_else(|| "expression".to_string());
        self.type_error(format!("{name} is not a function"), "not a function", span)
    }
}

/// `undefined` or `null`, as they are named in error messages
fn nullish_name(value: &Value) -> &'static str {
    if matches!(value, Value::Null) {
        "null"
    } else {
        "undefined"
    }
}

/// Apply a binary operator to two evaluated operands
fn binary_op(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            if is_numeric(left) && is_numeric(right) {
                Value::Number(left.to_number() + right.to_number())
            } else {
                Value::String(format!("{}{}", left.to_js_string(), right.to_js_string()))
            }
        }
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Mod => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Eq => Value::Bool(left.loose_eq(right)),
        BinaryOp::Ne => Value::Bool(!left.loose_eq(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_eq(right)),
        BinaryOp::StrictNe => Value::Bool(!left.strict_eq(right)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (left, right) {
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => left.to_number().partial_cmp(&right.to_number()),
            };
            Value::Bool(ordering.is_some_and(|ord| match op {
                BinaryOp::Lt => ord.is_lt(),
                BinaryOp::Le => ord.is_le(),
                BinaryOp::Gt => ord.is_gt(),
                _ => ord.is_ge(),
            }))
        }
        BinaryOp::And => {
            if left.is_truthy() {
                right.clone()
            } else {
                left.clone()
            }
        }
        BinaryOp::Or => {
            if left.is_truthy() {
                left.clone()
            } else {
                right.clone()
            }
        }
    }
}

/// Operands `+` adds numerically instead of concatenating
fn is_numeric(value: &Value) -> bool {
    matches!(
        value,
        Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_)
    )
}

/// Object key for a computed property
fn property_key(key: &Value) -> String {
    match key {
        Value::Number(n) => format_number(*n),
        other => other.to_js_string(),
    }
}

/// Most holes a single write may add to an array
const MAX_ARRAY_GROWTH: usize = 1 << 16;

fn array_index(key: &Value) -> Option<usize> {
    match key {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as usize),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Store `value` at `keys` below `target`
fn set_path(target: &mut Value, keys: &[Value], value: Value) -> std::result::Result<(), String> {
    let Some((last, parents)) = keys.split_last() else {
        *target = value;
        return Ok(());
    };

    let mut current = target;
    for key in parents {
        current = match current {
            Value::Object(fields) => fields.get_mut(&property_key(key)),
            Value::Array(items) => array_index(key).and_then(|i| items.get_mut(i)),
            _ => None,
        }
        .ok_or_else(|| {
            format!(
                "Cannot set properties of undefined (setting '{}')",
                property_key(key)
            )
        })?;
    }

    match current {
        Value::Object(fields) => {
            fields.insert(property_key(last), value);
            Ok(())
        }
        Value::Array(items) => {
            if let Some(index) = array_index(last) {
                let len = index.checked_add(1).ok_or_else(|| invalid_length(last))?;
                grow(items, len, last)?;
                items[index] = value;
            } else if property_key(last) == "length" {
                let len = array_index(&value).ok_or_else(|| invalid_length(&value))?;
                if len <= items.len() {
                    items.truncate(len);
                } else {
                    grow(items, len, &value)?;
                }
            }
            // Arrays keep no named properties; other keys are dropped.
            Ok(())
        }
        other => Err(format!(
            "Cannot set properties of {} (setting '{}')",
            other.type_of(),
            property_key(last)
        )),
    }
}

/// Extend `items` with holes up to `len`, within [`MAX_ARRAY_GROWTH`]
fn grow(items: &mut Vec<Value>, len: usize, key: &Value) -> std::result::Result<(), String> {
    if len <= items.len() {
        return Ok(());
    }
    if len - items.len() > MAX_ARRAY_GROWTH {
        return Err(invalid_length(key));
    }
    items.resize(len, Value::Undefined);
    Ok(())
}

fn invalid_length(key: &Value) -> String {
    format!("Invalid array length (index {})", property_key(key))
}

/// Message carried by a thrown value
fn thrown_message(value: &Value) -> String {
    let fields = value.as_object();
    let field = |name: &str| fields.and_then(|f| f.get(name)).map(Value::to_js_string);
    match (field("name"), field("message")) {
        (Some(name), Some(message)) if message.is_empty() => name,
        (Some(name), Some(message)) => format!("{name}: {message}"),
        _ => value.to_js_string(),
    }
}

/// Source-like rendering of a simple access path (`g.h.p`)
fn path_text(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Var(ident) => Some(ident.name.clone()),
        Expr::Member(member) => Some(format!("{}.{}", path_text(&member.base)?, member.property.name)),
        _ => None,
    }
}

fn describe(expr: &Expr, value: &Value) -> String {
    path_text(expr).unwrap_or_else(|| value.type_of().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::lexer::Lexer;
    use crate::template::parser::Parser;
    use crate::template::settings::Globals;

    fn run_with(code: &str, data: Value, globals: Value) -> Result<String> {
        let source = TemplateSource::new("test", code);
        let tokens: Vec<_> = Lexer::new(code, 0).collect();
        let program = Parser::new(tokens, &source).parse()?;
        Evaluator::new(&data, &globals, false, &source).run(&program)
    }

    fn run(code: &str, data: Value) -> Result<String> {
        run_with(code, data, Globals::standard().to_value())
    }

    fn data() -> Value {
        Value::object([
            ("name", Value::from("Ada")),
            ("items", Value::from(vec!["a", "b", "c"])),
            ("user", Value::object([("age", 36)])),
        ])
    }

    #[test]
    fn test_print_and_data_lookup() {
        assert_eq!(run("print('Hi ', name);", data()).unwrap(), "Hi Ada");
    }

    #[test]
    fn test_arithmetic_and_concat() {
        assert_eq!(run("print(1 + 2 * 3, ' ', '1' + 2, ' ', 7 % 4);", data()).unwrap(), "7 12 3");
    }

    #[test]
    fn test_for_of_loop() {
        assert_eq!(
            run("for (const item of items) { print(item.toUpperCase()); }", data()).unwrap(),
            "ABC"
        );
    }

    #[test]
    fn test_for_in_loop() {
        let data = Value::object([("o", Value::object([("x", 1), ("y", 2)]))]);
        assert_eq!(run("for (var k in o) { print(k, '=', o[k], ';'); }", data).unwrap(), "x=1;y=2;");
    }

    #[test]
    fn test_break_and_continue() {
        let code = "for (var i = 0; i < 10; i++) { if (i == 1) continue; if (i > 3) break; print(i); }";
        assert_eq!(run(code, data()).unwrap(), "023");
    }

    #[test]
    fn test_undefined_name() {
        let err = run("print(missing);", data()).unwrap_err();
        let TemplateError::Undefined(undefined) = err else {
            panic!("expected undefined error");
        };
        assert_eq!(undefined.name, "missing");
        assert!(undefined.available.contains(&"name".to_string()));
    }

    #[test]
    fn test_typeof_missing_is_undefined() {
        assert_eq!(run("print(typeof missing, ' ', typeof name);", data()).unwrap(), "undefined string");
    }

    #[test]
    fn test_missing_member_prints_nothing() {
        assert_eq!(run("print(user.email, '|', user.age);", data()).unwrap(), "|36");
    }

    #[test]
    fn test_member_of_undefined_is_type_error() {
        let err = run("print(user.address.street);", data()).unwrap_err();
        assert!(matches!(err, TemplateError::Type(_)));
    }

    #[test]
    fn test_data_is_not_mutated() {
        let data = data();
        let source = TemplateSource::new("test", "user.age += 1; name = 'Bob'; print(user.age, name);");
        let tokens: Vec<_> = Lexer::new(&source.source, 0).collect();
        let program = Parser::new(tokens, &source).parse().unwrap();
        let globals = Globals::standard().to_value();
        let out = Evaluator::new(&data, &globals, false, &source)
            .run(&program)
            .unwrap();
        assert_eq!(out, "37Bob");
        assert_eq!(data.get_property("user").get_property("age"), Value::Number(36.0));
        assert_eq!(data.get_property("name"), Value::from("Ada"));
    }

    #[test]
    fn test_const_reassignment() {
        let err = run("const x = 1; x = 2;", data()).unwrap_err();
        let TemplateError::Type(type_error) = err else {
            panic!("expected type error");
        };
        assert_eq!(type_error.message, "Assignment to constant variable.");
    }

    #[test]
    fn test_reserved_assignment() {
        assert!(matches!(run("g = 1;", data()).unwrap_err(), TemplateError::Type(_)));
        assert!(matches!(run("var obj = 1;", data()).unwrap_err(), TemplateError::Type(_)));
    }

    #[test]
    fn test_throw_error_object() {
        let err = run("throw new Error('boom');", data()).unwrap_err();
        assert_eq!(err.to_string(), "Uncaught Error: boom");
    }

    #[test]
    fn test_not_a_function() {
        let err = run("name.frobnicate();", data()).unwrap_err();
        let TemplateError::Type(type_error) = err else {
            panic!("expected type error");
        };
        assert_eq!(type_error.message, "name.frobnicate is not a function");
    }

    #[test]
    fn test_helper_failure() {
        let mut globals = Globals::empty();
        globals.register_fn("fail", Function::new("fail", |_| Err("nope".to_string())));
        let err = run_with("g.fail();", data(), globals.to_value()).unwrap_err();
        assert!(matches!(err, TemplateError::Helper(_)));
    }

    #[test]
    fn test_globals_through_g() {
        assert_eq!(run("print(g.h.escape('<b>'));", data()).unwrap(), "&lt;b&gt;");
    }

    #[test]
    fn test_update_expressions() {
        assert_eq!(run("var i = 5; print(i++, ' ', i, ' ', --i);", data()).unwrap(), "5 6 5");
    }

    #[test]
    fn test_array_element_assignment() {
        assert_eq!(run("var xs = [1]; xs[2] = 3; print(xs.join('-'));", data()).unwrap(), "1--3");
    }

    #[test]
    fn test_huge_array_index_is_type_error() {
        for code in ["var a = []; a[1e20] = 1;", "var a = []; a[1e9] = 1;", "var a = []; a.length = 1e9;"] {
            let err = run(code, data()).unwrap_err();
            assert!(matches!(err, TemplateError::Type(_)), "{code}");
        }
    }

    #[test]
    fn test_array_growth_within_limit() {
        assert_eq!(run("var a = []; a[999] = 1; print(a.length);", data()).unwrap(), "1000");
    }

    #[test]
    fn test_non_index_array_keys_are_dropped() {
        let code = "var a = []; a[-1] = 1; a[1.5] = 2; a.label = 'x'; print(a.length);";
        assert_eq!(run(code, data()).unwrap(), "0");
    }

    #[test]
    fn test_array_length_assignment() {
        let code = "var a = [1, 2, 3]; a.length = 1; print(a.join('-'), ' '); a.length = 3; print(a.join('-'));";
        assert_eq!(run(code, data()).unwrap(), "1 1--");
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(run("print(user.email || 'none', ' ', name && 'yes');", data()).unwrap(), "none yes");
    }
}
