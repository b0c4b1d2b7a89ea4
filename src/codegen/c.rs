//! C code generation.
//!
//! The whole program becomes the body of `main`. MAS-Lang names live in one
//! flat scope, so every variable is declared once at the top of `main` and
//! declarations in the program turn into plain stores.

use super::{emit_expr, emit_statements, CodeGenerator};
use crate::frontend::ast::*;
use crate::frontend::semantic::{Checker, Typed};
use crate::utils::errors::{CodegenError, CodegenResult};
use crate::utils::pretty::CodeFormatter;
use log::trace;
use std::collections::{HashMap, HashSet};

/// C identifiers a MAS-Lang name may collide with.
const RESERVED: &[&str] = &[
    "auto", "break", "case", "const", "continue", "default", "do", "double", "enum", "extern",
    "goto", "inline", "long", "main", "register", "restrict", "return", "short", "signed",
    "sizeof", "static", "struct", "switch", "typedef", "union", "unsigned", "void", "volatile",
    "fabs", "fmod", "llabs", "pow", "printf", "strcmp", "strlen",
];

/// C code generator.
pub struct CCodeGen {
    /// Types of every name in the program
    checker: Checker,
    /// Formatter for output
    formatter: CodeFormatter,
    /// Length of each array, from its initializer
    array_sizes: HashMap<Name, usize>,
}

impl CCodeGen {
    pub fn new() -> Self {
        Self {
            checker: Checker::new(),
            formatter: CodeFormatter::new("    "),
            array_sizes: HashMap::new(),
        }
    }

    fn type_of(&self, expr: &Expr) -> CodegenResult<Typed> {
        self.checker
            .expr_type(expr)
            .ok_or_else(|| CodegenError::unknown_type(format!("cannot type expression at {}", expr.span)))
    }

    /// Declare every variable of the program, zero-initialised.
    fn declarations(&mut self, program: &Program) -> CodegenResult<()> {
        let mut collector = Declarations::default();
        collector.visit_program(program);
        self.array_sizes = collector.array_sizes;

        for name in &collector.order {
            let info = self
                .checker
                .symbols()
                .lookup(name)
                .ok_or_else(|| CodegenError::unknown_type(format!("'{}' has no known type", name)))?;
            let line = if info.ty == Type::Array {
                let size = self.array_sizes.get(name).copied().ok_or_else(|| {
                    CodegenError::unsupported(format!("array '{}' must be initialised with an array literal", name))
                })?;
                let element = info
                    .element
                    .ok_or_else(|| CodegenError::unknown_type(format!("element type of array '{}'", name)))?;
                format!("{} {}[{}];", c_type(element)?, c_name(name), size.max(1))
            } else {
                format!("{} = {};", c_declarator(info.ty, &c_name(name))?, zero(info.ty))
            };
            self.formatter.writeln(&line);
        }
        Ok(())
    }

    fn body(&mut self, block: &Block) -> CodegenResult<()> {
        self.formatter.indent();
        emit_statements(self, &block.statements)?;
        self.formatter.dedent();
        Ok(())
    }

    fn store(&mut self, assign: &Assign) -> CodegenResult<String> {
        if self.checker.symbols().lookup(&assign.target).map(|info| info.ty) == Some(Type::Array) {
            return Err(CodegenError::unsupported(format!(
                "re-assigning array '{}' at {}",
                assign.target, assign.span
            )));
        }
        Ok(format!("{} = {}", c_name(&assign.target), emit_expr(self, &assign.value)?))
    }
}

impl Default for CCodeGen {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGenerator for CCodeGen {
    type Artifact = String;
    type Value = String;

    /// Generate C code for a program.
    fn program(&mut self, program: &Program) -> CodegenResult<String> {
        self.checker = Checker::new();
        self.checker.check_program(program);
        self.formatter = CodeFormatter::new("    ");

        // Header
        self.formatter.writeln("#include <math.h>");
        self.formatter.writeln("#include <stdio.h>");
        self.formatter.writeln("#include <stdlib.h>");
        self.formatter.writeln("#include <string.h>");
        self.formatter.writeln("");
        self.formatter.writeln("int main(void) {");
        self.formatter.indent();

        self.declarations(program)?;
        if !program.statements.is_empty() {
            self.formatter.writeln("");
        }
        emit_statements(self, &program.statements)?;

        self.formatter.writeln("return 0;");
        self.formatter.dedent();
        self.formatter.writeln("}");

        let formatter = std::mem::replace(&mut self.formatter, CodeFormatter::new("    "));
        Ok(formatter.finish())
    }

    fn var_decl(&mut self, name: &Name, ty: Type, init: Option<&Expr>) -> CodegenResult<()> {
        if ty == Type::Array {
            let Some(Expr { kind: ExprKind::ArrayLiteral(elements), .. }) = init else {
                return Err(CodegenError::unsupported(format!(
                    "array '{}' must be initialised with an array literal",
                    name
                )));
            };
            for (i, element) in elements.iter().enumerate() {
                let line = format!("{}[{}] = {};", c_name(name), i, emit_expr(self, element)?);
                self.formatter.writeln(&line);
            }
            return Ok(());
        }

        // A declaration without initializer resets the variable
        let value = match init {
            Some(init) => emit_expr(self, init)?,
            None => zero(ty).to_string(),
        };
        self.formatter.writeln(&format!("{} = {};", c_name(name), value));
        Ok(())
    }

    fn assign(&mut self, assign: &Assign) -> CodegenResult<()> {
        let line = format!("{};", self.store(assign)?);
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
        _init_ty: Option<Type>,
        init: &Assign,
        condition: &Expr,
        update: &Assign,
        body: &Block,
    ) -> CodegenResult<()> {
        let line = format!(
            "for ({}; {}; {}) {{",
            self.store(init)?,
            emit_expr(self, condition)?,
            self.store(update)?
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
        let ty = self.type_of(expr)?.ty;
        let value = emit_expr(self, expr)?;
        let line = match ty {
            Type::Int => format!("printf(\"%lld\\n\", {});", value),
            Type::Float => format!("printf(\"%g\\n\", {});", value),
            Type::Bool => format!("printf(\"%s\\n\", {} ? \"true\" : \"false\");", value),
            Type::Char => format!("printf(\"%c\\n\", {});", value),
            Type::String => format!("printf(\"%s\\n\", {});", value),
            Type::Array => {
                return Err(CodegenError::unsupported(format!("printing a whole array at {}", expr.span)));
            }
        };
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
        Ok(match value {
            i64::MIN => format!("(-{}LL - 1)", i64::MAX),
            v if v < 0 => format!("({}LL)", v),
            v => format!("{}LL", v),
        })
    }

    fn float_literal(&mut self, value: f64) -> CodegenResult<String> {
        if value.is_sign_negative() {
            Ok(format!("({:?})", value))
        } else {
            Ok(format!("{:?}", value))
        }
    }

    fn bool_literal(&mut self, value: bool) -> CodegenResult<String> {
        Ok(if value { "1" } else { "0" }.to_string())
    }

    fn string_literal(&mut self, value: &str) -> CodegenResult<String> {
        let mut text = String::from("\"");
        for c in value.chars() {
            push_c_escaped(&mut text, c, '"');
        }
        text.push('"');
        Ok(text)
    }

    fn char_literal(&mut self, value: char) -> CodegenResult<String> {
        if !value.is_ascii() {
            return Err(CodegenError::unsupported(format!("non-ASCII character {:?}", value)));
        }
        let mut text = String::from("'");
        push_c_escaped(&mut text, value, '\'');
        text.push('\'');
        Ok(text)
    }

    fn identifier(&mut self, name: &Name) -> CodegenResult<String> {
        Ok(c_name(name))
    }

    fn binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> CodegenResult<String> {
        let (lt, rt) = (self.type_of(left)?.ty, self.type_of(right)?.ty);
        match op {
            BinaryOp::Concat => {
                return Err(CodegenError::unsupported(format!("concat at {}", left.span.merge(&right.span))));
            }
            BinaryOp::Index => {
                let (l, r) = (emit_expr(self, left)?, emit_expr(self, right)?);
                return Ok(format!("{}[{}]", l, r));
            }
            _ if lt == Type::Array || rt == Type::Array => {
                return Err(CodegenError::unsupported(format!(
                    "elementwise '{}' on an array at {}",
                    op,
                    left.span.merge(&right.span)
                )));
            }
            _ => {}
        }

        let (l, r) = (emit_expr(self, left)?, emit_expr(self, right)?);
        let both_int = lt == Type::Int && rt == Type::Int;
        Ok(match op {
            BinaryOp::Mod if !both_int => format!("fmod({}, {})", l, r),
            BinaryOp::Pow if both_int => format!("((long long)pow({}, {}))", l, r),
            BinaryOp::Pow => format!("pow({}, {})", l, r),
            _ => format!("({} {} {})", l, op, r),
        })
    }

    fn compare(&mut self, op: CompareOp, left: &Expr, right: &Expr) -> CodegenResult<String> {
        let lt = self.type_of(left)?.ty;
        let (l, r) = (emit_expr(self, left)?, emit_expr(self, right)?);
        Ok(match op {
            CompareOp::And => format!("({} && {})", l, r),
            CompareOp::Or => format!("({} || {})", l, r),
            _ if lt == Type::String => format!("(strcmp({}, {}) {} 0)", l, r, op),
            _ if lt == Type::Array => {
                return Err(CodegenError::unsupported(format!("comparing arrays at {}", left.span)));
            }
            _ => format!("({} {} {})", l, op, r),
        })
    }

    fn unary(&mut self, op: UnaryOp, operand: &Expr) -> CodegenResult<String> {
        let ty = self.type_of(operand)?.ty;
        if matches!(op, UnaryOp::Min | UnaryOp::Max) {
            return Err(CodegenError::unsupported(format!("'{}' at {}", op, operand.span)));
        }
        if op == UnaryOp::Length && ty == Type::Array {
            let size = operand.as_identifier().and_then(|name| self.array_sizes.get(name));
            return match size {
                Some(size) => Ok(format!("{}LL", size)),
                None => Err(CodegenError::unsupported(format!("length of array expression at {}", operand.span))),
            };
        }
        if ty == Type::Array {
            return Err(CodegenError::unsupported(format!("elementwise '{}' on an array at {}", op, operand.span)));
        }

        let value = emit_expr(self, operand)?;
        Ok(match op {
            UnaryOp::Neg => format!("(-{})", value),
            UnaryOp::Not => format!("(!{})", value),
            UnaryOp::Increment => format!("({} + 1)", value),
            UnaryOp::Decrement => format!("({} - 1)", value),
            UnaryOp::Abs if ty == Type::Int => format!("llabs({})", value),
            UnaryOp::Abs => format!("fabs({})", value),
            _ => format!("((long long)strlen({}))", value),
        })
    }

    fn array_literal(&mut self, _elements: &[Expr]) -> CodegenResult<String> {
        Err(CodegenError::unsupported("array literal outside a declaration"))
    }

    fn array_access(&mut self, array: &Name, index: &Expr) -> CodegenResult<String> {
        Ok(format!("{}[{}]", c_name(array), emit_expr(self, index)?))
    }
}

/// Every variable, in order of first declaration.
#[derive(Default)]
struct Declarations {
    order: Vec<Name>,
    seen: HashSet<Name>,
    array_sizes: HashMap<Name, usize>,
}

impl Declarations {
    fn add(&mut self, name: &Name) {
        if self.seen.insert(name.clone()) {
            trace!("declaring '{}'", name);
            self.order.push(name.clone());
        }
    }
}

impl AstVisitor for Declarations {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::VarDecl { name, init, .. } => {
                self.add(name);
                if let Some(Expr { kind: ExprKind::ArrayLiteral(elements), .. }) = init {
                    self.array_sizes.entry(name.clone()).or_insert(elements.len());
                }
            }
            StmtKind::For { init, .. } => self.add(&init.target),
            _ => {}
        }
        walk_stmt(self, stmt);
    }
}

fn c_type(ty: Type) -> CodegenResult<&'static str> {
    match ty {
        Type::Int => Ok("long long"),
        Type::Float => Ok("double"),
        Type::Bool => Ok("int"),
        Type::Char => Ok("char"),
        Type::String => Ok("const char *"),
        Type::Array => Err(CodegenError::unsupported("arrays of arrays")),
    }
}

fn c_declarator(ty: Type, name: &str) -> CodegenResult<String> {
    let ty = c_type(ty)?;
    if ty.ends_with('*') {
        Ok(format!("{}{}", ty, name))
    } else {
        Ok(format!("{} {}", ty, name))
    }
}

fn zero(ty: Type) -> &'static str {
    match ty {
        Type::Float => "0.0",
        Type::Char => "'\\0'",
        Type::String => "\"\"",
        _ => "0",
    }
}

fn c_name(name: &str) -> String {
    if RESERVED.contains(&name) {
        format!("{}_", name)
    } else {
        name.to_string()
    }
}

fn push_c_escaped(out: &mut String, c: char, quote: char) {
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
