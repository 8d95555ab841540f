//! AST for compiled templates
//!
//! A template compiles to a single [`Program`]: literal text and output
//! directives become statements, interleaved with the statements written in
//! evaluate directives. Every node carries a [`Span`] into the template source.

use miette::SourceSpan;

/// A span in the source (re-export from miette)
pub type Span = SourceSpan;

/// Create a span from offset and length
pub fn span(offset: usize, len: usize) -> Span {
    SourceSpan::new(offset.into(), len)
}

/// Span covering `start` through the end of `end`
pub fn join(start: Span, end: Span) -> Span {
    let end_offset = end.offset() + end.len();
    span(start.offset(), end_offset.saturating_sub(start.offset()))
}

/// A complete compiled template body
#[derive(Debug, Clone)]
pub struct Program {
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// A statement
#[derive(Debug, Clone)]
pub enum Stmt {
    /// Literal template text, appended verbatim
    Text(TextStmt),
    /// Interpolate or escape directive
    Output(OutputStmt),
    /// Expression evaluated for its effects
    Expr(ExprStmt),
    /// `var` / `let` / `const` declaration
    Decl(DeclStmt),
    If(IfStmt),
    /// C-style `for (init; cond; update)`
    For(ForStmt),
    /// `for (x of xs)` / `for (k in obj)`
    ForEach(ForEachStmt),
    While(WhileStmt),
    Block(BlockStmt),
    Break(Span),
    Continue(Span),
    Throw(ThrowStmt),
    /// Lone `;` (directive boundaries produce these)
    Empty(Span),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Text(s) => s.span,
            Stmt::Output(s) => s.span,
            Stmt::Expr(s) => s.span,
            Stmt::Decl(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::For(s) => s.span,
            Stmt::ForEach(s) => s.span,
            Stmt::While(s) => s.span,
            Stmt::Block(s) => s.span,
            Stmt::Break(span) | Stmt::Continue(span) | Stmt::Empty(span) => *span,
            Stmt::Throw(s) => s.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextStmt {
    pub text: String,
    pub span: Span,
}

/// Output of an interpolate (`escape: false`) or escape (`escape: true`) directive
#[derive(Debug, Clone)]
pub struct OutputStmt {
    pub expr: Expr,
    pub escape: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone)]
pub struct DeclStmt {
    pub kind: DeclKind,
    pub declarators: Vec<Declarator>,
    pub span: Span,
}

/// One `name = init` pair of a declaration
#[derive(Debug, Clone)]
pub struct Declarator {
    pub name: Ident,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_branch: Box<Stmt>,
    pub else_branch: Option<Box<Stmt>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ForStmt {
    pub init: Option<Box<Stmt>>,
    pub condition: Option<Expr>,
    pub update: Option<Expr>,
    pub body: Box<Stmt>,
    pub span: Span,
}

/// What a `for (x ? xs)` loop binds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterKind {
    /// `for (x of xs)`: array elements, string characters, object values
    Of,
    /// `for (k in obj)`: object keys, array indices
    In,
}

#[derive(Debug, Clone)]
pub struct ForEachStmt {
    pub binding: Ident,
    pub kind: IterKind,
    pub iter: Expr,
    pub body: Box<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Box<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct BlockStmt {
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ThrowStmt {
    pub value: Expr,
    pub span: Span,
}

// ============================================================================
// Expressions
// ============================================================================

/// An expression
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Literal),
    Array(ArrayExpr),
    Object(ObjectExpr),
    /// Bare name
    Var(Ident),
    /// `expr.name`
    Member(MemberExpr),
    /// `expr[index]`
    Index(IndexExpr),
    Call(CallExpr),
    /// `new Error(...)`
    New(NewExpr),
    Unary(UnaryExpr),
    /// `++x`, `x--`
    Update(UpdateExpr),
    Binary(BinaryExpr),
    /// `cond ? a : b`
    Conditional(ConditionalExpr),
    Assign(AssignExpr),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(l) => l.span,
            Expr::Array(a) => a.span,
            Expr::Object(o) => o.span,
            Expr::Var(i) => i.span,
            Expr::Member(m) => m.span,
            Expr::Index(i) => i.span,
            Expr::Call(c) => c.span,
            Expr::New(n) => n.span,
            Expr::Unary(u) => u.span,
            Expr::Update(u) => u.span,
            Expr::Binary(b) => b.span,
            Expr::Conditional(c) => c.span,
            Expr::Assign(a) => a.span,
        }
    }

    /// Can this expression appear on the left of `=` / `++`?
    pub fn is_assignable(&self) -> bool {
        matches!(self, Expr::Var(_) | Expr::Member(_) | Expr::Index(_))
    }
}

#[derive(Debug, Clone)]
pub struct Literal {
    pub value: LiteralValue,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Number(f64),
    String(String),
    Bool(bool),
    Null,
    Undefined,
}

#[derive(Debug, Clone)]
pub struct ArrayExpr {
    pub elements: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ObjectExpr {
    pub entries: Vec<(String, Expr)>,
    pub span: Span,
}

/// An identifier
#[derive(Debug, Clone)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct MemberExpr {
    pub base: Box<Expr>,
    pub property: Ident,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IndexExpr {
    pub base: Box<Expr>,
    pub index: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct NewExpr {
    pub constructor: Ident,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Pos,
    TypeOf,
}

#[derive(Debug, Clone)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub expr: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone)]
pub struct UpdateExpr {
    pub op: UpdateOp,
    pub prefix: bool,
    pub target: Box<Expr>,
    pub span: Span,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical (short-circuit)
    And,
    Or,
}

#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub op: BinaryOp,
    pub right: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ConditionalExpr {
    pub condition: Box<Expr>,
    pub then: Box<Expr>,
    pub otherwise: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
}

impl AssignOp {
    /// The arithmetic operator a compound assignment applies
    pub fn binary(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Sub => Some(BinaryOp::Sub),
            AssignOp::Mul => Some(BinaryOp::Mul),
            AssignOp::Div => Some(BinaryOp::Div),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssignExpr {
    pub target: Box<Expr>,
    pub op: AssignOp,
    pub value: Box<Expr>,
    pub span: Span,
}
