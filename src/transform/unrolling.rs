//! Loop unrolling transformation.
//!
//! Unrolling replicates a loop body `k` times, rewriting uses of the
//! induction variable in each copy, and appends a remainder loop for the
//! iterations that do not fill a whole group.
//!
//! Example:
//! ```text
//! for (i = 0; i < 7; i = i + 1) { x = x + i; }
//! ```
//! After unrolling by factor 3:
//! ```text
//! for (i = 0; i < 5; i = i + 3) {
//!     x = x + i;
//!     x = x + (i + 1);
//!     x = x + (i + 2);
//! }
//! while (i < 7) { x = x + i; i = i + 1; }
//! ```
//!
//! Loops are rewritten bottom-up, so loops nested in bodies are unrolled
//! before the loops around them. Any loop that does not match the counted
//! shape is left unchanged.

use crate::frontend::ast::*;
use crate::transform::Transform;
use crate::utils::location::Span;
use log::{debug, trace};
use std::fmt;
use std::mem;

/// Counters for one unrolling run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnrollStats {
    /// Loops that were unrolled
    pub unrolled: usize,
    /// Loops left unchanged
    pub skipped: usize,
    /// Remainder loops emitted
    pub remainders: usize,
}

impl fmt::Display for UnrollStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} loops unrolled ({} with remainder), {} skipped",
            self.unrolled, self.remainders, self.skipped
        )
    }
}

/// Why a loop was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    Condition,
    Init,
    Step,
    Direction,
    BodyAssigns,
    BodyDeclares,
    Increment,
    Factor,
    Overflow,
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Skip::Condition => "condition is not `var <cmp> integer literal`",
            Skip::Init => "initializer does not assign the loop variable",
            Skip::Step => "update is not a constant non-zero step of the loop variable",
            Skip::Direction => "step moves away from the bound",
            Skip::BodyAssigns => "body assigns the loop variable",
            Skip::BodyDeclares => "body declares variables",
            Skip::Increment => "body does not hold exactly one top-level step of the loop variable",
            Skip::Factor => "factor exceeds the largest supported unroll factor",
            Skip::Overflow => "unrolled offsets overflow a 64-bit integer",
        };
        f.write_str(reason)
    }
}

/// Largest factor a loop is unrolled by. Loops are skipped above it.
pub const MAX_FACTOR: i64 = 1024;

/// Loop unrolling transformation.
#[derive(Debug, Clone)]
pub struct Unrolling {
    /// Unrolling factor
    factor: i64,
}

/// Bound, group step and per-copy offsets for one loop.
struct Plan {
    bound: i64,
    step: i64,
    /// `offsets[i] = i * stride`, for `i` in `0..=factor`
    offsets: Vec<i64>,
}

impl Unrolling {
    /// Create a new unrolling transformation. Factors below 2 leave every
    /// loop unchanged.
    pub fn new(factor: i64) -> Self {
        Self { factor }
    }

    /// Unroll every eligible loop in the program.
    pub fn run(&self, program: &mut Program) -> UnrollStats {
        let mut stats = UnrollStats::default();
        if self.factor <= 1 {
            return stats;
        }

        let statements = mem::take(&mut program.statements);
        program.statements = self.rewrite_stmts(statements, &mut stats);
        debug!("unroll by {}: {}", self.factor, stats);
        stats
    }

    fn rewrite_stmts(&self, statements: Vec<Stmt>, stats: &mut UnrollStats) -> Vec<Stmt> {
        let mut out = Vec::with_capacity(statements.len());
        for stmt in statements {
            self.rewrite_stmt(stmt, stats, &mut out);
        }
        out
    }

    fn rewrite_block(&self, block: Block, stats: &mut UnrollStats) -> Block {
        Block::new(self.rewrite_stmts(block.statements, stats), block.span)
    }

    fn rewrite_stmt(&self, stmt: Stmt, stats: &mut UnrollStats, out: &mut Vec<Stmt>) {
        let Stmt { kind, span } = stmt;
        let kind = match kind {
            StmtKind::If { condition, then_block, else_ifs, else_block } => StmtKind::If {
                condition,
                then_block: self.rewrite_block(then_block, stats),
                else_ifs: else_ifs
                    .into_iter()
                    .map(|arm| ElseIf {
                        condition: arm.condition,
                        block: self.rewrite_block(arm.block, stats),
                        span: arm.span,
                    })
                    .collect(),
                else_block: else_block.map(|b| self.rewrite_block(b, stats)),
            },
            StmtKind::Block(block) => StmtKind::Block(self.rewrite_block(block, stats)),
            StmtKind::For { init_ty, init, condition, update, body } => {
                let body = self.rewrite_block(body, stats);
                match self.unroll_for(init_ty, &init, &condition, &update, &body, span) {
                    Ok(replacement) => {
                        stats.record(&replacement);
                        out.extend(replacement);
                        return;
                    }
                    Err(reason) => {
                        debug!("not unrolling for loop at {}: {}", span, reason);
                        stats.skipped += 1;
                        StmtKind::For { init_ty, init, condition, update, body }
                    }
                }
            }
            StmtKind::While { condition, body } => {
                let body = self.rewrite_block(body, stats);
                match self.unroll_while(&condition, &body, span) {
                    Ok(replacement) => {
                        stats.record(&replacement);
                        out.extend(replacement);
                        return;
                    }
                    Err(reason) => {
                        debug!("not unrolling while loop at {}: {}", span, reason);
                        stats.skipped += 1;
                        StmtKind::While { condition, body }
                    }
                }
            }
            other => other,
        };
        out.push(Stmt::new(kind, span));
    }

    fn plan(&self, bound: i64, stride: i64) -> Result<Plan, Skip> {
        let k = self.factor;
        if k > MAX_FACTOR {
            return Err(Skip::Factor);
        }
        let step = k.checked_mul(stride).ok_or(Skip::Overflow)?;
        let reach = (k - 1).checked_mul(stride).ok_or(Skip::Overflow)?;
        let bound = bound.checked_sub(reach).ok_or(Skip::Overflow)?;
        let offsets = (0..=k)
            .map(|i| i.checked_mul(stride).filter(|o| o.checked_neg().is_some()))
            .collect::<Option<Vec<_>>>()
            .ok_or(Skip::Overflow)?;
        Ok(Plan { bound, step, offsets })
    }

    fn unroll_for(
        &self,
        init_ty: Option<Type>,
        init: &Assign,
        condition: &Expr,
        update: &Assign,
        body: &Block,
        span: Span,
    ) -> Result<Vec<Stmt>, Skip> {
        let (var, cmp, bound) = loop_condition(condition)?;
        if init.target != var {
            return Err(Skip::Init);
        }
        let stride = step_of(update, &var).ok_or(Skip::Step)?;
        check_direction(cmp, stride)?;

        let scan = BodyScan::of(&body.statements, &var);
        if scan.declares {
            return Err(Skip::BodyDeclares);
        }
        if scan.assigns > 0 {
            return Err(Skip::BodyAssigns);
        }

        let plan = self.plan(bound, stride)?;
        let copies = &plan.offsets[..plan.offsets.len() - 1];

        let mut statements = Vec::with_capacity(body.statements.len() * copies.len());
        for &offset in copies {
            statements.extend(body.statements.iter().map(|s| shift_stmt(s, &var, offset)));
        }

        let unrolled = Stmt::new(
            StmtKind::For {
                init_ty,
                init: init.clone(),
                condition: with_bound(condition, plan.bound),
                update: Assign::new(var.clone(), offset_expr(&var, plan.step, update.span), update.span),
                body: Block::new(statements, body.span),
            },
            span,
        );

        let trips = init
            .value
            .as_int_literal()
            .map(|start| trip_count(cmp, start, bound, stride));
        trace!(
            "for loop at {}: var '{}', stride {}, bound {} -> {}, trips {:?}",
            span, var, stride, bound, plan.bound, trips
        );

        let mut replacement = vec![unrolled];
        if trips.map_or(true, |m| m % i128::from(self.factor) != 0) {
            let mut rest = body.statements.clone();
            rest.push(Stmt::assign(update.clone()));
            replacement.push(Stmt::new(
                StmtKind::While { condition: condition.clone(), body: Block::new(rest, body.span) },
                span,
            ));
        }
        Ok(replacement)
    }

    fn unroll_while(&self, condition: &Expr, body: &Block, span: Span) -> Result<Vec<Stmt>, Skip> {
        let (var, cmp, bound) = loop_condition(condition)?;

        let scan = BodyScan::of(&body.statements, &var);
        if scan.declares {
            return Err(Skip::BodyDeclares);
        }
        if scan.assigns != 1 {
            return Err(Skip::Increment);
        }
        let (pos, increment) = body
            .statements
            .iter()
            .enumerate()
            .find_map(|(pos, s)| match &s.kind {
                StmtKind::Assign(assign) if assign.target == var => Some((pos, assign)),
                _ => None,
            })
            .ok_or(Skip::Increment)?;
        let stride = step_of(increment, &var).ok_or(Skip::Step)?;
        check_direction(cmp, stride)?;

        let plan = self.plan(bound, stride)?;
        let before = &body.statements[..pos];
        let after = &body.statements[pos + 1..];

        // Statements after the step see the variable one stride further on
        let mut statements = Vec::new();
        for pair in plan.offsets.windows(2) {
            statements.extend(before.iter().map(|s| shift_stmt(s, &var, pair[0])));
            statements.extend(after.iter().map(|s| shift_stmt(s, &var, pair[1])));
        }
        statements.push(Stmt::assign(Assign::new(
            var.clone(),
            offset_expr(&var, plan.step, increment.span),
            increment.span,
        )));

        trace!(
            "while loop at {}: var '{}', stride {}, bound {} -> {}",
            span, var, stride, bound, plan.bound
        );

        let unrolled = Stmt::new(
            StmtKind::While {
                condition: with_bound(condition, plan.bound),
                body: Block::new(statements, body.span),
            },
            span,
        );
        let remainder = Stmt::new(StmtKind::While { condition: condition.clone(), body: body.clone() }, span);
        Ok(vec![unrolled, remainder])
    }
}

impl UnrollStats {
    fn record(&mut self, replacement: &[Stmt]) {
        self.unrolled += 1;
        if replacement.len() > 1 {
            self.remainders += 1;
        }
    }
}

impl Transform for Unrolling {
    fn apply(&self, program: &mut Program) -> bool {
        self.run(program).unrolled > 0
    }

    fn name(&self) -> &str {
        "unrolling"
    }
}

/// Split `var <cmp> literal` into its parts.
fn loop_condition(condition: &Expr) -> Result<(Name, CompareOp, i64), Skip> {
    match &condition.kind {
        ExprKind::Compare { op, left, right } if op.is_ordering() => {
            match (left.as_identifier(), right.as_int_literal()) {
                (Some(var), Some(bound)) => Ok((var.clone(), *op, bound)),
                _ => Err(Skip::Condition),
            }
        }
        _ => Err(Skip::Condition),
    }
}

/// The constant step of `var = var + s` or `var = var - s`.
fn step_of(assign: &Assign, var: &Name) -> Option<i64> {
    if assign.target != *var {
        return None;
    }
    let ExprKind::Binary { op, left, right } = &assign.value.kind else {
        return None;
    };
    if left.as_identifier() != Some(var) {
        return None;
    }
    let step = right.as_int_literal()?;
    let stride = match op {
        BinaryOp::Add => step,
        BinaryOp::Sub => step.checked_neg()?,
        _ => return None,
    };
    (stride != 0).then_some(stride)
}

fn check_direction(cmp: CompareOp, stride: i64) -> Result<(), Skip> {
    let towards_bound = match cmp {
        CompareOp::Lt | CompareOp::Le => stride > 0,
        _ => stride < 0,
    };
    if towards_bound {
        Ok(())
    } else {
        Err(Skip::Direction)
    }
}

/// Number of iterations of a counted loop starting at `start`.
fn trip_count(cmp: CompareOp, start: i64, bound: i64, stride: i64) -> i128 {
    let (start, bound, stride) = (i128::from(start), i128::from(bound), i128::from(stride));
    let trips = match cmp {
        CompareOp::Lt => (bound - start + stride - 1).div_euclid(stride),
        CompareOp::Le => (bound - start).div_euclid(stride) + 1,
        CompareOp::Gt => (start - bound - stride - 1).div_euclid(-stride),
        _ => (start - bound).div_euclid(-stride) + 1,
    };
    trips.max(0)
}

/// The same comparison against a new bound.
fn with_bound(condition: &Expr, bound: i64) -> Expr {
    match &condition.kind {
        ExprKind::Compare { op, left, right } => {
            let mut expr = Expr::compare(*op, (**left).clone(), Expr::int_lit(bound, right.span));
            expr.span = condition.span;
            expr
        }
        _ => condition.clone(),
    }
}

/// `var`, `var + offset` or `var - |offset|`.
fn offset_expr(var: &Name, offset: i64, span: Span) -> Expr {
    let base = Expr::ident(var.clone(), span);
    match offset {
        0 => base,
        o if o > 0 => Expr::binary(BinaryOp::Add, base, Expr::int_lit(o, span)),
        o => Expr::binary(BinaryOp::Sub, base, Expr::int_lit(-o, span)),
    }
}

/// Assignments to, and declarations in, a loop body.
struct BodyScan<'a> {
    var: &'a str,
    assigns: usize,
    declares: bool,
}

impl<'a> BodyScan<'a> {
    fn of(statements: &[Stmt], var: &'a str) -> Self {
        let mut scan = Self { var, assigns: 0, declares: false };
        for stmt in statements {
            scan.visit_stmt(stmt);
        }
        scan
    }
}

impl AstVisitor for BodyScan<'_> {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        if matches!(stmt.kind, StmtKind::VarDecl { .. } | StmtKind::For { init_ty: Some(_), .. }) {
            self.declares = true;
        }
        walk_stmt(self, stmt);
    }

    fn visit_assign(&mut self, assign: &Assign) {
        if &*assign.target == self.var {
            self.assigns += 1;
        }
    }
}

fn shift_block(block: &Block, var: &str, offset: i64) -> Block {
    Block::new(
        block.statements.iter().map(|s| shift_stmt(s, var, offset)).collect(),
        block.span,
    )
}

fn shift_assign(assign: &Assign, var: &str, offset: i64) -> Assign {
    Assign {
        target: assign.target.clone(),
        op: assign.op,
        value: shift_expr(&assign.value, var, offset),
        span: assign.span,
    }
}

/// Copy a statement with every read of `var` replaced by `var + offset`.
fn shift_stmt(stmt: &Stmt, var: &str, offset: i64) -> Stmt {
    if offset == 0 {
        return stmt.clone();
    }
    let kind = match &stmt.kind {
        StmtKind::VarDecl { name, ty, init } => StmtKind::VarDecl {
            name: name.clone(),
            ty: *ty,
            init: init.as_ref().map(|e| shift_expr(e, var, offset)),
        },
        StmtKind::Assign(assign) => StmtKind::Assign(shift_assign(assign, var, offset)),
        StmtKind::If { condition, then_block, else_ifs, else_block } => StmtKind::If {
            condition: shift_expr(condition, var, offset),
            then_block: shift_block(then_block, var, offset),
            else_ifs: else_ifs
                .iter()
                .map(|arm| ElseIf {
                    condition: shift_expr(&arm.condition, var, offset),
                    block: shift_block(&arm.block, var, offset),
                    span: arm.span,
                })
                .collect(),
            else_block: else_block.as_ref().map(|b| shift_block(b, var, offset)),
        },
        StmtKind::For { init_ty, init, condition, update, body } => StmtKind::For {
            init_ty: *init_ty,
            init: shift_assign(init, var, offset),
            condition: shift_expr(condition, var, offset),
            update: shift_assign(update, var, offset),
            body: shift_block(body, var, offset),
        },
        StmtKind::While { condition, body } => StmtKind::While {
            condition: shift_expr(condition, var, offset),
            body: shift_block(body, var, offset),
        },
        StmtKind::Print(expr) => StmtKind::Print(shift_expr(expr, var, offset)),
        StmtKind::Block(block) => StmtKind::Block(shift_block(block, var, offset)),
    };
    Stmt::new(kind, stmt.span)
}

fn shift_expr(expr: &Expr, var: &str, offset: i64) -> Expr {
    let kind = match &expr.kind {
        ExprKind::Identifier(name) if &**name == var => return offset_expr(name, offset, expr.span),
        ExprKind::Binary { op, left, right } => ExprKind::Binary {
            op: *op,
            left: Box::new(shift_expr(left, var, offset)),
            right: Box::new(shift_expr(right, var, offset)),
        },
        ExprKind::Compare { op, left, right } => ExprKind::Compare {
            op: *op,
            left: Box::new(shift_expr(left, var, offset)),
            right: Box::new(shift_expr(right, var, offset)),
        },
        ExprKind::Unary { op, operand } => ExprKind::Unary {
            op: *op,
            operand: Box::new(shift_expr(operand, var, offset)),
        },
        ExprKind::ArrayLiteral(elements) => {
            ExprKind::ArrayLiteral(elements.iter().map(|e| shift_expr(e, var, offset)).collect())
        }
        ExprKind::ArrayAccess { array, index } => ExprKind::ArrayAccess {
            array: array.clone(),
            index: Box::new(shift_expr(index, var, offset)),
        },
        _ => return expr.clone(),
    };
    Expr::new(kind, expr.span)
}
