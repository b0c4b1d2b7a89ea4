//! MAS-Lang source printer.
//!
//! Prints a program back as MAS-Lang text. Nested binary, comparison and
//! unary expressions are parenthesised, so the output parses back to an
//! equivalent program whatever the precedence of the operators involved.

use super::{emit_expr, emit_statements, CodeGenerator};
use crate::frontend::ast::*;
use crate::utils::errors::CodegenResult;
use crate::utils::pretty::{format_list, CodeFormatter};

/// Prints the AST as MAS-Lang source.
pub struct SourcePrinter {
    formatter: CodeFormatter,
    /// Nesting depth of the expression being printed
    depth: usize,
}

impl SourcePrinter {
    pub fn new() -> Self {
        Self { formatter: CodeFormatter::new("    "), depth: 0 }
    }

    /// Print an expression on its own.
    pub fn expr(expr: &Expr) -> String {
        let mut printer = Self::new();
        // The printer never fails
        emit_expr(&mut printer, expr).unwrap_or_default()
    }

    /// Print a sub-expression one level deeper.
    fn nested(&mut self, expr: &Expr) -> CodegenResult<String> {
        self.depth += 1;
        let text = emit_expr(self, expr);
        self.depth -= 1;
        text
    }

    /// Parenthesise `text` unless it is a whole top-level expression.
    fn group(&self, text: String) -> String {
        if self.depth > 0 {
            format!("({})", text)
        } else {
            text
        }
    }

    /// `x = value`, without the terminating semicolon.
    fn assign_clause(&mut self, assign: &Assign) -> CodegenResult<String> {
        Ok(format!("{} = {}", assign.target, emit_expr(self, &assign.value)?))
    }

    fn body(&mut self, block: &Block) -> CodegenResult<()> {
        self.formatter.indent();
        emit_statements(self, &block.statements)?;
        self.formatter.dedent();
        Ok(())
    }
}

impl Default for SourcePrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGenerator for SourcePrinter {
    type Artifact = String;
    type Value = String;

    fn program(&mut self, program: &Program) -> CodegenResult<String> {
        emit_statements(self, &program.statements)?;
        let formatter = std::mem::replace(&mut self.formatter, CodeFormatter::new("    "));
        Ok(formatter.finish())
    }

    fn var_decl(&mut self, name: &Name, ty: Type, init: Option<&Expr>) -> CodegenResult<()> {
        let line = match init {
            Some(init) => format!("{} {} = {};", ty, name, emit_expr(self, init)?),
            None => format!("{} {};", ty, name),
        };
        self.formatter.writeln(&line);
        Ok(())
    }

    fn assign(&mut self, assign: &Assign) -> CodegenResult<()> {
        let line = format!("{};", self.assign_clause(assign)?);
        self.formatter.writeln(&line);
        Ok(())
    }

    fn if_stmt(
        &mut self,
        condition: &Expr,
        then_block: &Block,
        else_ifs: &[ElseIf],
        else_block: Option<&Block>,
    ) -> CodegenResult<()> {
        let line = format!("if ({}) {{", emit_expr(self, condition)?);
        self.formatter.writeln(&line);
        self.body(then_block)?;
        for arm in else_ifs {
            let line = format!("}} else if ({}) {{", emit_expr(self, &arm.condition)?);
            self.formatter.writeln(&line);
            self.body(&arm.block)?;
        }
        if let Some(block) = else_block {
            self.formatter.writeln("} else {");
            self.body(block)?;
        }
        self.formatter.writeln("}");
        Ok(())
    }

    fn for_stmt(
        &mut self,
        init_ty: Option<Type>,
        init: &Assign,
        condition: &Expr,
        update: &Assign,
        body: &Block,
    ) -> CodegenResult<()> {
        let init = match init_ty {
            Some(ty) => format!("{} {}", ty, self.assign_clause(init)?),
            None => self.assign_clause(init)?,
        };
        let line = format!(
            "for ({}; {}; {}) {{",
            init,
            emit_expr(self, condition)?,
            self.assign_clause(update)?
        );
        self.formatter.writeln(&line);
        self.body(body)?;
        self.formatter.writeln("}");
        Ok(())
    }

    fn while_stmt(&mut self, condition: &Expr, body: &Block) -> CodegenResult<()> {
        let line = format!("while ({}) {{", emit_expr(self, condition)?);
        self.formatter.writeln(&line);
        self.body(body)?;
        self.formatter.writeln("}");
        Ok(())
    }

    fn print(&mut self, expr: &Expr) -> CodegenResult<()> {
        let line = format!("print({});", emit_expr(self, expr)?);
        self.formatter.writeln(&line);
        Ok(())
    }

    fn block(&mut self, block: &Block) -> CodegenResult<()> {
        self.formatter.writeln("{");
        self.body(block)?;
        self.formatter.writeln("}");
        Ok(())
    }

    fn int_literal(&mut self, value: i64) -> CodegenResult<String> {
        // The literal 9223372036854775808 does not exist
        if value == i64::MIN {
            return Ok(self.group(format!("-{} - 1", i64::MAX)));
        }
        if value < 0 {
            return Ok(self.group(value.to_string()));
        }
        Ok(value.to_string())
    }

    fn float_literal(&mut self, value: f64) -> CodegenResult<String> {
        let mut text = value.to_string();
        if !text.contains('.') {
            text.push_str(".0");
        }
        if value.is_sign_negative() {
            return Ok(self.group(text));
        }
        Ok(text)
    }

    fn bool_literal(&mut self, value: bool) -> CodegenResult<String> {
        Ok(value.to_string())
    }

    fn string_literal(&mut self, value: &str) -> CodegenResult<String> {
        let mut text = String::with_capacity(value.len() + 2);
        text.push('"');
        for c in value.chars() {
            push_escaped(&mut text, c, '"');
        }
        text.push('"');
        Ok(text)
    }

    fn char_literal(&mut self, value: char) -> CodegenResult<String> {
        let mut text = String::from("'");
        push_escaped(&mut text, value, '\'');
        text.push('\'');
        Ok(text)
    }

    fn identifier(&mut self, name: &Name) -> CodegenResult<String> {
        Ok(name.to_string())
    }

    fn binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> CodegenResult<String> {
        if !op.is_infix() {
            let (left, right) = (emit_expr(self, left)?, emit_expr(self, right)?);
            return Ok(format!("{}({}, {})", op, left, right));
        }
        let (left, right) = (self.nested(left)?, self.nested(right)?);
        Ok(self.group(format!("{} {} {}", left, op, right)))
    }

    fn compare(&mut self, op: CompareOp, left: &Expr, right: &Expr) -> CodegenResult<String> {
        let (left, right) = (self.nested(left)?, self.nested(right)?);
        Ok(self.group(format!("{} {} {}", left, op, right)))
    }

    fn unary(&mut self, op: UnaryOp, operand: &Expr) -> CodegenResult<String> {
        if op.is_builtin() {
            return Ok(format!("{}({})", op, emit_expr(self, operand)?));
        }
        let operand = self.nested(operand)?;
        let text = match op {
            UnaryOp::Not => format!("not {}", operand),
            _ => format!("{}{}", op, operand),
        };
        Ok(self.group(text))
    }

    fn array_literal(&mut self, elements: &[Expr]) -> CodegenResult<String> {
        let saved = std::mem::replace(&mut self.depth, 0);
        let items = elements.iter().map(|e| emit_expr(self, e)).collect::<CodegenResult<Vec<_>>>();
        self.depth = saved;
        Ok(format!("[{}]", format_list(&items?, ", ")))
    }

    fn array_access(&mut self, array: &Name, index: &Expr) -> CodegenResult<String> {
        let saved = std::mem::replace(&mut self.depth, 0);
        let index = emit_expr(self, index);
        self.depth = saved;
        Ok(format!("{}[{}]", array, index?))
    }
}

fn push_escaped(out: &mut String, c: char, quote: char) {
    match c {
        '\n' => out.push_str("\\n"),
        '\t' => out.push_str("\\t"),
        '\r' => out.push_str("\\r"),
        '\0' => out.push_str("\\0"),
        '\\' => out.push_str("\\\\"),
        c if c == quote => {
            out.push('\\');
            out.push(c);
        }
        c => out.push(c),
    }
}
