//! Abstract Syntax Tree (AST) for MAS-Lang.
//!
//! A program is an ordered sequence of statements. Every node carries the
//! span of the source it came from; parents own their children exclusively.

use crate::utils::location::Span;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// An identifier name, shared between the nodes that mention it.
pub type Name = Rc<str>;

/// A complete program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Top-level statements, in source order
    pub statements: Vec<Stmt>,
    /// Source span
    pub span: Span,
}

impl Program {
    /// Create a program from its statements.
    pub fn new(statements: Vec<Stmt>, span: Span) -> Self {
        Self { statements, span }
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new(Vec::new(), Span::dummy())
    }
}

/// A variable type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// 64-bit signed integer
    Int,
    /// 64-bit floating point
    Float,
    /// Boolean
    Bool,
    /// Single character
    Char,
    /// Immutable string
    String,
    /// One-dimensional array of a single element type
    Array,
}

impl Type {
    /// Check if this is a numeric type.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    /// Whether a value of type `value` may be stored in a slot of this type.
    pub fn accepts(&self, value: Type) -> bool {
        *self == value || (*self == Type::Float && value == Type::Int)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Int => "int",
            Type::Float => "float",
            Type::Bool => "bool",
            Type::Char => "char",
            Type::String => "string",
            Type::Array => "array",
        };
        f.write_str(name)
    }
}

/// A block of statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Statements in the block
    pub statements: Vec<Stmt>,
    /// Source span
    pub span: Span,
}

impl Block {
    /// Create a block from its statements.
    pub fn new(statements: Vec<Stmt>, span: Span) -> Self {
        Self { statements, span }
    }

    /// Create an empty block.
    pub fn empty() -> Self {
        Self::new(Vec::new(), Span::dummy())
    }

    /// Check if the block is empty.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// A statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    /// The kind of statement
    pub kind: StmtKind,
    /// Source span
    pub span: Span,
}

impl Stmt {
    /// Create a new statement.
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Wrap an assignment as a statement.
    pub fn assign(assign: Assign) -> Self {
        let span = assign.span;
        Self::new(StmtKind::Assign(assign), span)
    }
}

/// The kind of a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    /// Variable declaration: `int x;` or `int x = expr;`
    VarDecl {
        name: Name,
        ty: Type,
        init: Option<Expr>,
    },

    /// Assignment: `x = expr;`, `x += expr;`, `x++;`
    Assign(Assign),

    /// Conditional with any number of `else if` arms.
    If {
        condition: Expr,
        then_block: Block,
        else_ifs: Vec<ElseIf>,
        else_block: Option<Block>,
    },

    /// Counted loop: `for (init; condition; update) { body }`
    For {
        /// Set when the header declares the loop variable
        init_ty: Option<Type>,
        init: Assign,
        condition: Expr,
        update: Assign,
        body: Block,
    },

    /// Conditional loop: `while (condition) { body }`
    While {
        condition: Expr,
        body: Block,
    },

    /// `print(expr);`
    Print(Expr),

    /// Nested block: `{ stmts }`
    Block(Block),
}

/// An assignment.
///
/// `value` is always the complete stored value: `x += e` is recorded with
/// `op = AddAssign` and `value = x + e`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assign {
    /// Assigned variable
    pub target: Name,
    /// Surface operator
    pub op: AssignOp,
    /// Value stored into `target`
    pub value: Expr,
    /// Source span
    pub span: Span,
}

impl Assign {
    /// A plain `target = value` assignment.
    pub fn new(target: Name, value: Expr, span: Span) -> Self {
        Self { target, op: AssignOp::Assign, value, span }
    }
}

/// An `else if (condition) { block }` arm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElseIf {
    pub condition: Expr,
    pub block: Block,
    pub span: Span,
}

/// An assignment operator as written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    /// `=`
    Assign,
    /// `+=`
    AddAssign,
    /// `-=`
    SubAssign,
    /// `*=`
    MulAssign,
    /// `/=`
    DivAssign,
    /// `%=`
    ModAssign,
    /// `++`
    Increment,
    /// `--`
    Decrement,
}

impl AssignOp {
    /// The binary operator a compound assignment desugars to.
    pub fn binary_op(&self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign | AssignOp::Increment => Some(BinaryOp::Add),
            AssignOp::SubAssign | AssignOp::Decrement => Some(BinaryOp::Sub),
            AssignOp::MulAssign => Some(BinaryOp::Mul),
            AssignOp::DivAssign => Some(BinaryOp::Div),
            AssignOp::ModAssign => Some(BinaryOp::Mod),
        }
    }
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignOp::Assign => write!(f, "="),
            AssignOp::AddAssign => write!(f, "+="),
            AssignOp::SubAssign => write!(f, "-="),
            AssignOp::MulAssign => write!(f, "*="),
            AssignOp::DivAssign => write!(f, "/="),
            AssignOp::ModAssign => write!(f, "%="),
            AssignOp::Increment => write!(f, "++"),
            AssignOp::Decrement => write!(f, "--"),
        }
    }
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    /// The kind of expression
    pub kind: ExprKind,
    /// Source span
    pub span: Span,
}

impl Expr {
    /// Create a new expression.
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Create an integer literal.
    pub fn int_lit(value: i64, span: Span) -> Self {
        Self::new(ExprKind::IntLiteral(value), span)
    }

    /// Create a float literal.
    pub fn float_lit(value: f64, span: Span) -> Self {
        Self::new(ExprKind::FloatLiteral(value), span)
    }

    /// Create a variable reference.
    pub fn ident(name: Name, span: Span) -> Self {
        Self::new(ExprKind::Identifier(name), span)
    }

    /// Create a binary expression spanning both operands.
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        let span = left.span.merge(&right.span);
        Self::new(ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) }, span)
    }

    /// Create a comparison spanning both operands.
    pub fn compare(op: CompareOp, left: Expr, right: Expr) -> Self {
        let span = left.span.merge(&right.span);
        Self::new(ExprKind::Compare { op, left: Box::new(left), right: Box::new(right) }, span)
    }

    /// Create a unary expression.
    pub fn unary(op: UnaryOp, operand: Expr, span: Span) -> Self {
        Self::new(ExprKind::Unary { op, operand: Box::new(operand) }, span)
    }

    /// The value of an integer literal.
    pub fn as_int_literal(&self) -> Option<i64> {
        match self.kind {
            ExprKind::IntLiteral(n) => Some(n),
            _ => None,
        }
    }

    /// The name of a plain variable reference.
    pub fn as_identifier(&self) -> Option<&Name> {
        match &self.kind {
            ExprKind::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// Check if this is a literal zero (`0` or `0.0`).
    pub fn is_zero_literal(&self) -> bool {
        match self.kind {
            ExprKind::IntLiteral(n) => n == 0,
            ExprKind::FloatLiteral(x) => x == 0.0,
            _ => false,
        }
    }
}

/// The kind of an expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    /// Integer literal
    IntLiteral(i64),
    /// Floating-point literal
    FloatLiteral(f64),
    /// Boolean literal
    BoolLiteral(bool),
    /// String literal (decoded)
    StringLiteral(String),
    /// Character literal
    CharLiteral(char),

    /// Variable reference
    Identifier(Name),

    /// Arithmetic, power, concatenation or indexing
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Comparison or logical connective
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Unary operation or unary builtin
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    /// Array literal: `[e1, e2, ...]`
    ArrayLiteral(Vec<Expr>),

    /// Array access: `a[i]`
    ArrayAccess {
        array: Name,
        index: Box<Expr>,
    },
}

/// Binary operators producing a value of an operand's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    /// `a ^ b`, `pow(a, b)`
    Pow,
    /// `concat(a, b)`
    Concat,
    /// `index(a, i)`
    Index,
}

impl BinaryOp {
    /// Check if this is an arithmetic operator.
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod | BinaryOp::Pow
        )
    }

    /// Check if this operator is written infix in source.
    pub fn is_infix(&self) -> bool {
        !matches!(self, BinaryOp::Concat | BinaryOp::Index)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "+"),
            BinaryOp::Sub => write!(f, "-"),
            BinaryOp::Mul => write!(f, "*"),
            BinaryOp::Div => write!(f, "/"),
            BinaryOp::Mod => write!(f, "%"),
            BinaryOp::Pow => write!(f, "^"),
            BinaryOp::Concat => write!(f, "concat"),
            BinaryOp::Index => write!(f, "index"),
        }
    }
}

/// Comparison and logical operators, all producing `bool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl CompareOp {
    /// Check if this is a logical connective.
    pub fn is_logical(&self) -> bool {
        matches!(self, CompareOp::And | CompareOp::Or)
    }

    /// Check if this is an ordering comparison.
    pub fn is_ordering(&self) -> bool {
        matches!(self, CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "=="),
            CompareOp::Ne => write!(f, "!="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Le => write!(f, "<="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Ge => write!(f, ">="),
            CompareOp::And => write!(f, "and"),
            CompareOp::Or => write!(f, "or"),
        }
    }
}

/// Unary operators and single-argument builtins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Negation: `-x`
    Neg,
    /// Logical not: `not x`, `!x`
    Not,
    /// Prefix `++x`: the value `x + 1`
    Increment,
    /// Prefix `--x`: the value `x - 1`
    Decrement,
    /// `length(x)`
    Length,
    /// `abs(x)`
    Abs,
    /// `min(x)`
    Min,
    /// `max(x)`
    Max,
}

impl UnaryOp {
    /// Check if this operator is written as a call in source.
    pub fn is_builtin(&self) -> bool {
        matches!(self, UnaryOp::Length | UnaryOp::Abs | UnaryOp::Min | UnaryOp::Max)
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "-"),
            UnaryOp::Not => write!(f, "not"),
            UnaryOp::Increment => write!(f, "++"),
            UnaryOp::Decrement => write!(f, "--"),
            UnaryOp::Length => write!(f, "length"),
            UnaryOp::Abs => write!(f, "abs"),
            UnaryOp::Min => write!(f, "min"),
            UnaryOp::Max => write!(f, "max"),
        }
    }
}

/// Visitor trait for traversing the AST.
///
/// Every method defaults to a full pre-order walk; override the ones you
/// care about and call the matching `walk_*` function to keep descending.
pub trait AstVisitor {
    /// Visit a program.
    fn visit_program(&mut self, program: &Program) {
        for stmt in &program.statements {
            self.visit_stmt(stmt);
        }
    }

    /// Visit a block.
    fn visit_block(&mut self, block: &Block) {
        for stmt in &block.statements {
            self.visit_stmt(stmt);
        }
    }

    /// Visit a statement.
    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    /// Visit an assignment, including loop headers.
    fn visit_assign(&mut self, assign: &Assign) {
        self.visit_expr(&assign.value);
    }

    /// Visit an expression.
    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
}

/// Visit the children of a statement.
pub fn walk_stmt<V: AstVisitor + ?Sized>(visitor: &mut V, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::VarDecl { init, .. } => {
            if let Some(expr) = init {
                visitor.visit_expr(expr);
            }
        }
        StmtKind::Assign(assign) => visitor.visit_assign(assign),
        StmtKind::If { condition, then_block, else_ifs, else_block } => {
            visitor.visit_expr(condition);
            visitor.visit_block(then_block);
            for arm in else_ifs {
                visitor.visit_expr(&arm.condition);
                visitor.visit_block(&arm.block);
            }
            if let Some(block) = else_block {
                visitor.visit_block(block);
            }
        }
        StmtKind::For { init, condition, update, body, .. } => {
            visitor.visit_assign(init);
            visitor.visit_expr(condition);
            visitor.visit_assign(update);
            visitor.visit_block(body);
        }
        StmtKind::While { condition, body } => {
            visitor.visit_expr(condition);
            visitor.visit_block(body);
        }
        StmtKind::Print(expr) => visitor.visit_expr(expr),
        StmtKind::Block(block) => visitor.visit_block(block),
    }
}

/// Visit the children of an expression.
pub fn walk_expr<V: AstVisitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::Binary { left, right, .. } | ExprKind::Compare { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        ExprKind::Unary { operand, .. } => visitor.visit_expr(operand),
        ExprKind::ArrayLiteral(elements) => {
            for element in elements {
                visitor.visit_expr(element);
            }
        }
        ExprKind::ArrayAccess { index, .. } => visitor.visit_expr(index),
        ExprKind::IntLiteral(_)
        | ExprKind::FloatLiteral(_)
        | ExprKind::BoolLiteral(_)
        | ExprKind::StringLiteral(_)
        | ExprKind::CharLiteral(_)
        | ExprKind::Identifier(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        Rc::from(s)
    }

    #[test]
    fn test_type_display_and_widening() {
        assert_eq!(Type::Int.to_string(), "int");
        assert_eq!(Type::Array.to_string(), "array");
        assert!(Type::Float.accepts(Type::Int));
        assert!(!Type::Int.accepts(Type::Float));
        assert!(!Type::Bool.accepts(Type::Int));
    }

    #[test]
    fn test_compound_ops_desugar() {
        assert_eq!(AssignOp::Increment.binary_op(), Some(BinaryOp::Add));
        assert_eq!(AssignOp::ModAssign.binary_op(), Some(BinaryOp::Mod));
        assert_eq!(AssignOp::Assign.binary_op(), None);
    }

    #[test]
    fn test_zero_literal() {
        assert!(Expr::int_lit(0, Span::dummy()).is_zero_literal());
        assert!(Expr::float_lit(0.0, Span::dummy()).is_zero_literal());
        assert!(!Expr::int_lit(3, Span::dummy()).is_zero_literal());
        assert!(!Expr::ident(name("z"), Span::dummy()).is_zero_literal());
    }

    #[test]
    fn test_visitor_counts_identifiers() {
        struct Counter(usize);
        impl AstVisitor for Counter {
            fn visit_expr(&mut self, expr: &Expr) {
                if expr.as_identifier().is_some() {
                    self.0 += 1;
                }
                walk_expr(self, expr);
            }
        }

        let i = name("i");
        let body = Block::new(
            vec![Stmt::new(
                StmtKind::Print(Expr::binary(
                    BinaryOp::Mul,
                    Expr::ident(i.clone(), Span::dummy()),
                    Expr::ident(i.clone(), Span::dummy()),
                )),
                Span::dummy(),
            )],
            Span::dummy(),
        );
        let program = Program::new(
            vec![Stmt::new(
                StmtKind::While {
                    condition: Expr::compare(
                        CompareOp::Lt,
                        Expr::ident(i, Span::dummy()),
                        Expr::int_lit(3, Span::dummy()),
                    ),
                    body,
                },
                Span::dummy(),
            )],
            Span::dummy(),
        );

        let mut counter = Counter(0);
        counter.visit_program(&program);
        assert_eq!(counter.0, 3);
    }
}
