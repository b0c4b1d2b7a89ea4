//! Code generation from the AST.
//!
//! A backend implements [`CodeGenerator`], one method per statement and
//! expression variant; [`emit_stmt`] and [`emit_expr`] route each node to
//! the matching method.

pub mod c;
pub mod source;

pub use c::CCodeGen;
pub use source::SourcePrinter;

use crate::frontend::ast::*;
use crate::utils::errors::{CodegenResult, CompileResult};
use log::debug;
use std::fmt;

/// Target for code generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Target {
    /// Standard C99
    #[default]
    C,
    /// MAS-Lang source text
    Source,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::C => write!(f, "C"),
            Target::Source => write!(f, "MAS-Lang"),
        }
    }
}

/// A code generation backend.
pub trait CodeGenerator {
    /// What a whole program is translated into.
    type Artifact;
    /// What a single expression is translated into.
    type Value;

    /// Translate a whole program.
    fn program(&mut self, program: &Program) -> CodegenResult<Self::Artifact>;

    fn var_decl(&mut self, name: &Name, ty: Type, init: Option<&Expr>) -> CodegenResult<()>;
    fn assign(&mut self, assign: &Assign) -> CodegenResult<()>;
    fn if_stmt(
        &mut self,
        condition: &Expr,
        then_block: &Block,
        else_ifs: &[ElseIf],
        else_block: Option<&Block>,
    ) -> CodegenResult<()>;
    fn for_stmt(
        &mut self,
        init_ty: Option<Type>,
        init: &Assign,
        condition: &Expr,
        update: &Assign,
        body: &Block,
    ) -> CodegenResult<()>;
    fn while_stmt(&mut self, condition: &Expr, body: &Block) -> CodegenResult<()>;
    fn print(&mut self, expr: &Expr) -> CodegenResult<()>;
    fn block(&mut self, block: &Block) -> CodegenResult<()>;

    fn int_literal(&mut self, value: i64) -> CodegenResult<Self::Value>;
    fn float_literal(&mut self, value: f64) -> CodegenResult<Self::Value>;
    fn bool_literal(&mut self, value: bool) -> CodegenResult<Self::Value>;
    fn string_literal(&mut self, value: &str) -> CodegenResult<Self::Value>;
    fn char_literal(&mut self, value: char) -> CodegenResult<Self::Value>;
    fn identifier(&mut self, name: &Name) -> CodegenResult<Self::Value>;
    fn binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> CodegenResult<Self::Value>;
    fn compare(&mut self, op: CompareOp, left: &Expr, right: &Expr) -> CodegenResult<Self::Value>;
    fn unary(&mut self, op: UnaryOp, operand: &Expr) -> CodegenResult<Self::Value>;
    fn array_literal(&mut self, elements: &[Expr]) -> CodegenResult<Self::Value>;
    fn array_access(&mut self, array: &Name, index: &Expr) -> CodegenResult<Self::Value>;
}

/// Dispatch a statement to its backend method.
pub fn emit_stmt<G: CodeGenerator + ?Sized>(gen: &mut G, stmt: &Stmt) -> CodegenResult<()> {
    match &stmt.kind {
        StmtKind::VarDecl { name, ty, init } => gen.var_decl(name, *ty, init.as_ref()),
        StmtKind::Assign(assign) => gen.assign(assign),
        StmtKind::If { condition, then_block, else_ifs, else_block } => {
            gen.if_stmt(condition, then_block, else_ifs, else_block.as_ref())
        }
        StmtKind::For { init_ty, init, condition, update, body } => {
            gen.for_stmt(*init_ty, init, condition, update, body)
        }
        StmtKind::While { condition, body } => gen.while_stmt(condition, body),
        StmtKind::Print(expr) => gen.print(expr),
        StmtKind::Block(block) => gen.block(block),
    }
}

/// Dispatch an expression to its backend method.
pub fn emit_expr<G: CodeGenerator + ?Sized>(gen: &mut G, expr: &Expr) -> CodegenResult<G::Value> {
    match &expr.kind {
        ExprKind::IntLiteral(value) => gen.int_literal(*value),
        ExprKind::FloatLiteral(value) => gen.float_literal(*value),
        ExprKind::BoolLiteral(value) => gen.bool_literal(*value),
        ExprKind::StringLiteral(value) => gen.string_literal(value),
        ExprKind::CharLiteral(value) => gen.char_literal(*value),
        ExprKind::Identifier(name) => gen.identifier(name),
        ExprKind::Binary { op, left, right } => gen.binary(*op, left, right),
        ExprKind::Compare { op, left, right } => gen.compare(*op, left, right),
        ExprKind::Unary { op, operand } => gen.unary(*op, operand),
        ExprKind::ArrayLiteral(elements) => gen.array_literal(elements),
        ExprKind::ArrayAccess { array, index } => gen.array_access(array, index),
    }
}

/// Emit every statement of a block, in order.
pub fn emit_statements<G: CodeGenerator + ?Sized>(gen: &mut G, statements: &[Stmt]) -> CodegenResult<()> {
    for stmt in statements {
        emit_stmt(gen, stmt)?;
    }
    Ok(())
}

/// Generate code for a target.
pub fn generate(program: &Program, target: Target) -> CompileResult<String> {
    debug!("generating {} code for {} statements", target, program.statements.len());
    let output = match target {
        Target::C => CCodeGen::new().program(program)?,
        Target::Source => SourcePrinter::new().program(program)?,
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parse;

    /// Counts the nodes each dispatcher reaches.
    #[derive(Default)]
    struct Counter {
        statements: usize,
        expressions: usize,
    }

    impl CodeGenerator for Counter {
        type Artifact = (usize, usize);
        type Value = ();

        fn program(&mut self, program: &Program) -> CodegenResult<(usize, usize)> {
            emit_statements(self, &program.statements)?;
            Ok((self.statements, self.expressions))
        }

        fn var_decl(&mut self, _: &Name, _: Type, init: Option<&Expr>) -> CodegenResult<()> {
            self.statements += 1;
            if let Some(init) = init {
                emit_expr(self, init)?;
            }
            Ok(())
        }

        fn assign(&mut self, assign: &Assign) -> CodegenResult<()> {
            self.statements += 1;
            emit_expr(self, &assign.value)
        }

        fn if_stmt(&mut self, condition: &Expr, then_block: &Block, else_ifs: &[ElseIf], else_block: Option<&Block>) -> CodegenResult<()> {
            self.statements += 1;
            emit_expr(self, condition)?;
            emit_statements(self, &then_block.statements)?;
            for arm in else_ifs {
                emit_expr(self, &arm.condition)?;
                emit_statements(self, &arm.block.statements)?;
            }
            if let Some(block) = else_block {
                emit_statements(self, &block.statements)?;
            }
            Ok(())
        }

        fn for_stmt(&mut self, _: Option<Type>, init: &Assign, condition: &Expr, update: &Assign, body: &Block) -> CodegenResult<()> {
            self.statements += 1;
            emit_expr(self, &init.value)?;
            emit_expr(self, condition)?;
            emit_expr(self, &update.value)?;
            emit_statements(self, &body.statements)
        }

        fn while_stmt(&mut self, condition: &Expr, body: &Block) -> CodegenResult<()> {
            self.statements += 1;
            emit_expr(self, condition)?;
            emit_statements(self, &body.statements)
        }

        fn print(&mut self, expr: &Expr) -> CodegenResult<()> {
            self.statements += 1;
            emit_expr(self, expr)
        }

        fn block(&mut self, block: &Block) -> CodegenResult<()> {
            self.statements += 1;
            emit_statements(self, &block.statements)
        }

        fn int_literal(&mut self, _: i64) -> CodegenResult<()> {
            self.expressions += 1;
            Ok(())
        }

        fn float_literal(&mut self, _: f64) -> CodegenResult<()> {
            self.expressions += 1;
            Ok(())
        }

        fn bool_literal(&mut self, _: bool) -> CodegenResult<()> {
            self.expressions += 1;
            Ok(())
        }

        fn string_literal(&mut self, _: &str) -> CodegenResult<()> {
            self.expressions += 1;
            Ok(())
        }

        fn char_literal(&mut self, _: char) -> CodegenResult<()> {
            self.expressions += 1;
            Ok(())
        }

        fn identifier(&mut self, _: &Name) -> CodegenResult<()> {
            self.expressions += 1;
            Ok(())
        }

        fn binary(&mut self, _: BinaryOp, left: &Expr, right: &Expr) -> CodegenResult<()> {
            self.expressions += 1;
            emit_expr(self, left)?;
            emit_expr(self, right)
        }

        fn compare(&mut self, _: CompareOp, left: &Expr, right: &Expr) -> CodegenResult<()> {
            self.expressions += 1;
            emit_expr(self, left)?;
            emit_expr(self, right)
        }

        fn unary(&mut self, _: UnaryOp, operand: &Expr) -> CodegenResult<()> {
            self.expressions += 1;
            emit_expr(self, operand)
        }

        fn array_literal(&mut self, elements: &[Expr]) -> CodegenResult<()> {
            self.expressions += 1;
            for element in elements {
                emit_expr(self, element)?;
            }
            Ok(())
        }

        fn array_access(&mut self, _: &Name, index: &Expr) -> CodegenResult<()> {
            self.expressions += 1;
            emit_expr(self, index)
        }
    }

    #[test]
    fn test_dispatch_reaches_every_node() {
        let program = parse(
            r#"
            array a = [1, 2];
            int x = a[0] + 1;
            while (x < 3) { x++; }
            if (x == 3) { print("done"); } else { { print('c'); } }
            "#,
        )
        .unwrap();
        let (statements, expressions) = Counter::default().program(&program).unwrap();
        // decl, decl, while, assign, if, print, block, print
        assert_eq!(statements, 8);
        // [1, 2] 1 2 | + a[0] 0 1 | < x 3 | + x 1 | == x 3 | "done" | 'c'
        assert_eq!(expressions, 18);
    }

    #[test]
    fn test_generate_source_target() {
        let program = parse("int x = 1 + 2;").unwrap();
        let output = generate(&program, Target::Source).unwrap();
        assert_eq!(output, "int x = 1 + 2;\n");
    }

    #[test]
    fn test_target_default_is_c() {
        assert_eq!(Target::default(), Target::C);
        assert_eq!(Target::Source.to_string(), "MAS-Lang");
    }
}
