//! Semantic analysis for MAS-Lang.
//!
//! A single pre-order pass over the program with one flat symbol table.
//! Every error is recorded and the pass continues; an expression whose type
//! could not be determined produces no further errors in its parents.

use crate::frontend::ast::*;
use crate::utils::errors::{SemanticError, SemanticErrorKind};
use crate::utils::location::Span;
use log::debug;
use std::collections::{HashMap, HashSet};
use std::mem;

/// Check a program, returning every error found.
pub fn check(program: &Program) -> Vec<SemanticError> {
    let mut checker = Checker::new();
    checker.check_program(program);
    checker.into_errors()
}

/// The type of a value, with the element type of arrays when known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Typed {
    pub ty: Type,
    pub element: Option<Type>,
}

impl Typed {
    /// A non-array type.
    pub fn scalar(ty: Type) -> Self {
        Self { ty, element: None }
    }

    /// An array type.
    pub fn array(element: Option<Type>) -> Self {
        Self { ty: Type::Array, element }
    }
}

/// Symbol information.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolInfo {
    /// Declared type, fixed for the whole program
    pub ty: Type,
    /// Element type of an array, once known
    pub element: Option<Type>,
    /// Where the name was declared
    pub span: Span,
}

/// The flat table of every declared name.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<Name, SymbolInfo>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a name. Returns the existing entry if it is already declared,
    /// leaving that entry in force.
    pub fn declare(&mut self, name: Name, info: SymbolInfo) -> Result<(), &SymbolInfo> {
        if self.symbols.contains_key(&name) {
            return Err(&self.symbols[&name]);
        }
        self.symbols.insert(name, info);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&SymbolInfo> {
        self.symbols.get(name)
    }

    fn lookup_mut(&mut self, name: &str) -> Option<&mut SymbolInfo> {
        self.symbols.get_mut(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Semantic checker.
#[derive(Debug, Default)]
pub struct Checker {
    symbols: SymbolTable,
    /// Names whose type was lost to an earlier error. Uses are not reported.
    unknown: HashSet<Name>,
    errors: Vec<SemanticError>,
}

impl Checker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The declarations seen so far.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// The errors recorded so far.
    pub fn errors(&self) -> &[SemanticError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<SemanticError> {
        self.errors
    }

    pub fn check_program(&mut self, program: &Program) {
        for stmt in &program.statements {
            self.check_stmt(stmt);
        }
        debug!(
            "semantic check: {} symbols declared, {} errors",
            self.symbols.len(),
            self.errors.len()
        );
    }

    fn check_block(&mut self, block: &Block) {
        for stmt in &block.statements {
            self.check_stmt(stmt);
        }
    }

    /// Check one statement, declaring any names it introduces.
    pub fn check_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::VarDecl { name, ty, init } => {
                self.check_declaration(name, *ty, init.as_ref(), stmt.span);
            }
            StmtKind::Assign(assign) => self.check_assign(assign),
            StmtKind::If { condition, then_block, else_ifs, else_block } => {
                self.check_condition(condition);
                self.check_block(then_block);
                for arm in else_ifs {
                    self.check_condition(&arm.condition);
                    self.check_block(&arm.block);
                }
                if let Some(block) = else_block {
                    self.check_block(block);
                }
            }
            StmtKind::For { init_ty, init, condition, update, body } => {
                match init_ty {
                    Some(ty) => self.check_declaration(&init.target, *ty, Some(&init.value), init.span),
                    None if self.symbols.lookup(&init.target).is_some() => self.check_assign(init),
                    // The loop header introduces an undeclared variable
                    None => match self.check_expr(&init.value) {
                        Some(value) => {
                            let info = SymbolInfo { ty: value.ty, element: value.element, span: init.span };
                            self.declare(&init.target, info);
                        }
                        None => {
                            self.unknown.insert(init.target.clone());
                        }
                    },
                }
                self.check_condition(condition);
                self.check_assign(update);
                self.check_block(body);
            }
            StmtKind::While { condition, body } => {
                self.check_condition(condition);
                self.check_block(body);
            }
            StmtKind::Print(expr) => {
                self.check_expr(expr);
            }
            StmtKind::Block(block) => self.check_block(block),
        }
    }

    fn check_declaration(&mut self, name: &Name, ty: Type, init: Option<&Expr>, span: Span) {
        let mut element = None;
        if let Some(init) = init {
            match self.check_expr(init) {
                Some(value) if !ty.accepts(value.ty) => self.error(
                    SemanticErrorKind::TypeMismatch,
                    init.span,
                    format!("cannot initialize {} '{}' with a value of type {}", ty, name, value.ty),
                ),
                Some(value) if ty == Type::Array => element = value.element,
                Some(_) => {}
                None if ty == Type::Array && self.symbols.lookup(name).is_none() => {
                    self.unknown.insert(name.clone());
                }
                None => {}
            }
        }

        self.declare(name, SymbolInfo { ty, element, span });
    }

    /// Add a name to the table, reporting a re-declaration.
    fn declare(&mut self, name: &Name, info: SymbolInfo) {
        let span = info.span;
        if let Err(existing) = self.symbols.declare(name.clone(), info) {
            let message = format!(
                "'{}' is already declared (first declared at {})",
                name, existing.span
            );
            self.error(SemanticErrorKind::AlreadyDeclared, span, message);
        }
    }

    fn check_assign(&mut self, assign: &Assign) {
        let value = self.check_expr(&assign.value);

        let Some(info) = self.symbols.lookup(&assign.target).cloned() else {
            if self.unknown.contains(&assign.target) {
                return;
            }
            self.error(
                SemanticErrorKind::Undeclared,
                assign.span,
                format!("cannot assign to undeclared variable '{}'", assign.target),
            );
            return;
        };
        let Some(value) = value else { return };

        if !info.ty.accepts(value.ty) {
            self.error(
                SemanticErrorKind::TypeMismatch,
                assign.span,
                format!("cannot assign {} to '{}' of type {}", value.ty, assign.target, info.ty),
            );
            return;
        }

        if info.ty == Type::Array {
            match (info.element, value.element) {
                (Some(declared), Some(found)) if !declared.accepts(found) => {
                    self.error(
                        SemanticErrorKind::TypeMismatch,
                        assign.span,
                        format!(
                            "cannot assign an array of {} to '{}', an array of {}",
                            found, assign.target, declared
                        ),
                    );
                }
                (None, Some(found)) => {
                    if let Some(entry) = self.symbols.lookup_mut(&assign.target) {
                        entry.element = Some(found);
                    }
                    self.unknown.remove(&assign.target);
                }
                _ => {}
            }
        }
    }

    fn check_condition(&mut self, condition: &Expr) {
        if let Some(found) = self.check_expr(condition) {
            if found.ty != Type::Bool {
                self.error(
                    SemanticErrorKind::TypeMismatch,
                    condition.span,
                    format!("condition must be bool, found {}", found.ty),
                );
            }
        }
    }

    /// Type an expression, recording its errors.
    fn check_expr(&mut self, expr: &Expr) -> Option<Typed> {
        let mut errors = mem::take(&mut self.errors);
        let result = self.infer(expr, &mut errors);
        self.errors = errors;
        result
    }

    /// Type an expression against the declarations seen so far, without
    /// recording errors. `None` if the expression is ill-typed.
    pub fn expr_type(&self, expr: &Expr) -> Option<Typed> {
        self.infer(expr, &mut Vec::new())
    }

    fn error(&mut self, kind: SemanticErrorKind, span: Span, message: String) {
        self.errors.push(SemanticError { message, span, kind });
    }

    fn infer(&self, expr: &Expr, errors: &mut Vec<SemanticError>) -> Option<Typed> {
        match &expr.kind {
            ExprKind::IntLiteral(_) => Some(Typed::scalar(Type::Int)),
            ExprKind::FloatLiteral(_) => Some(Typed::scalar(Type::Float)),
            ExprKind::BoolLiteral(_) => Some(Typed::scalar(Type::Bool)),
            ExprKind::StringLiteral(_) => Some(Typed::scalar(Type::String)),
            ExprKind::CharLiteral(_) => Some(Typed::scalar(Type::Char)),

            ExprKind::Identifier(name) if self.unknown.contains(name) => None,
            ExprKind::Identifier(name) => match self.symbols.lookup(name) {
                Some(info) => Some(Typed { ty: info.ty, element: info.element }),
                None => {
                    push_error(errors, SemanticErrorKind::Undeclared, expr.span, format!("'{}' is not declared", name));
                    None
                }
            },

            ExprKind::ArrayLiteral(elements) => {
                let mut element: Option<Type> = None;
                let mut known = true;
                for item in elements {
                    if !known {
                        self.infer(item, errors);
                        continue;
                    }
                    match self.infer(item, errors) {
                        Some(t) => match element {
                            None => element = Some(t.ty),
                            Some(first) if first != t.ty => {
                                push_error(
                                    errors,
                                    SemanticErrorKind::TypeMismatch,
                                    item.span,
                                    format!("array elements must share one type, found {} and {}", first, t.ty),
                                );
                                return None;
                            }
                            Some(_) => {}
                        },
                        None => known = false,
                    }
                }
                known.then_some(Typed::array(element))
            }

            ExprKind::ArrayAccess { array, index } => {
                if self.unknown.contains(array) {
                    self.infer(index, errors);
                    return None;
                }
                let base = match self.symbols.lookup(array) {
                    Some(info) => Some(Typed { ty: info.ty, element: info.element }),
                    None => {
                        push_error(errors, SemanticErrorKind::Undeclared, expr.span, format!("'{}' is not declared", array));
                        None
                    }
                };
                let index = self.infer(index, errors);
                self.element_of(base?, index?, expr.span, errors)
            }

            ExprKind::Binary { op, left, right } => {
                let lt = self.infer(left, errors);
                let rt = self.infer(right, errors);

                if matches!(op, BinaryOp::Div | BinaryOp::Mod) && right.is_zero_literal() {
                    push_error(
                        errors,
                        SemanticErrorKind::DivideByZeroLiteral,
                        right.span,
                        format!("'{}' by literal zero", op),
                    );
                }

                let (lt, rt) = (lt?, rt?);
                match op {
                    BinaryOp::Index => self.element_of(lt, rt, expr.span, errors),
                    BinaryOp::Concat => {
                        if lt.ty == Type::String && rt.ty == Type::String {
                            Some(Typed::scalar(Type::String))
                        } else {
                            push_error(
                                errors,
                                SemanticErrorKind::InvalidOperationForType,
                                expr.span,
                                format!("concat expects two strings, found {} and {}", lt.ty, rt.ty),
                            );
                            None
                        }
                    }
                    _ => match arithmetic_result(lt, rt) {
                        Some(result) => Some(result),
                        None => {
                            push_error(
                                errors,
                                SemanticErrorKind::InvalidOperationForType,
                                expr.span,
                                format!("operator '{}' cannot be applied to {} and {}", op, lt.ty, rt.ty),
                            );
                            None
                        }
                    },
                }
            }

            ExprKind::Compare { op, left, right } => {
                let lt = self.infer(left, errors);
                let rt = self.infer(right, errors);
                let (lt, rt) = (lt?, rt?);

                if op.is_logical() {
                    if lt.ty == Type::Bool && rt.ty == Type::Bool {
                        return Some(Typed::scalar(Type::Bool));
                    }
                    push_error(
                        errors,
                        SemanticErrorKind::InvalidOperationForType,
                        expr.span,
                        format!("operator '{}' expects bool operands, found {} and {}", op, lt.ty, rt.ty),
                    );
                    return None;
                }

                if (lt.ty.is_numeric() && rt.ty.is_numeric()) || lt.ty == rt.ty {
                    Some(Typed::scalar(Type::Bool))
                } else {
                    push_error(
                        errors,
                        SemanticErrorKind::TypeMismatch,
                        expr.span,
                        format!("cannot compare {} with {}", lt.ty, rt.ty),
                    );
                    None
                }
            }

            ExprKind::Unary { op, operand } => {
                let t = self.infer(operand, errors)?;
                let result = match op {
                    UnaryOp::Neg | UnaryOp::Abs | UnaryOp::Increment | UnaryOp::Decrement => {
                        t.ty.is_numeric().then_some(t)
                    }
                    UnaryOp::Not => (t.ty == Type::Bool).then_some(t),
                    UnaryOp::Length => {
                        matches!(t.ty, Type::Array | Type::String).then_some(Typed::scalar(Type::Int))
                    }
                    UnaryOp::Min | UnaryOp::Max => (t.ty == Type::Array).then_some(t),
                };
                if result.is_none() {
                    push_error(
                        errors,
                        SemanticErrorKind::InvalidOperationForType,
                        expr.span,
                        format!("'{}' cannot be applied to {}", op, t.ty),
                    );
                }
                result
            }
        }
    }

    /// The element read by `array[index]`.
    fn element_of(
        &self,
        array: Typed,
        index: Typed,
        span: Span,
        errors: &mut Vec<SemanticError>,
    ) -> Option<Typed> {
        if array.ty != Type::Array {
            push_error(
                errors,
                SemanticErrorKind::TypeMismatch,
                span,
                format!("cannot index into a value of type {}", array.ty),
            );
            return None;
        }
        if index.ty != Type::Int {
            push_error(
                errors,
                SemanticErrorKind::TypeMismatch,
                span,
                format!("array index must be int, found {}", index.ty),
            );
            return None;
        }
        if array.element.is_none() {
            push_error(
                errors,
                SemanticErrorKind::TypeMismatch,
                span,
                "element type of the array is not known".to_string(),
            );
        }
        array.element.map(Typed::scalar)
    }
}

fn push_error(errors: &mut Vec<SemanticError>, kind: SemanticErrorKind, span: Span, message: String) {
    errors.push(SemanticError { message, span, kind });
}

/// Result of `+ - * / % ^` on two operand types.
fn arithmetic_result(left: Typed, right: Typed) -> Option<Typed> {
    let numeric = |a: Type, b: Type| {
        if a == Type::Int && b == Type::Int {
            Type::Int
        } else {
            Type::Float
        }
    };

    match (left.ty, right.ty) {
        (l, r) if l.is_numeric() && r.is_numeric() => Some(Typed::scalar(numeric(l, r))),
        (Type::Array, s) if s.is_numeric() => {
            Some(Typed::array(left.element.map(|e| if e.is_numeric() { numeric(e, s) } else { e })))
        }
        (s, Type::Array) if s.is_numeric() => {
            Some(Typed::array(right.element.map(|e| if e.is_numeric() { numeric(s, e) } else { e })))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parse;

    fn errors(source: &str) -> Vec<SemanticErrorKind> {
        let program = parse(source).unwrap();
        check(&program).into_iter().map(|e| e.kind).collect()
    }

    fn assert_clean(source: &str) {
        let program = parse(source).unwrap();
        let errors = check(&program);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    }

    use SemanticErrorKind::*;

    #[test]
    fn test_valid_program() {
        assert_clean(
            r#"
            int total = 0;
            float avg;
            string label = "sum";
            char c = 'x';
            bool done = false;
            for (int i = 0; i < 10; i++) {
                total += i;
            }
            avg = total / 10;
            if (total > 40 and not done) {
                print(concat(label, "!"));
            } else if (total == 0) {
                print(c);
            } else {
                print(avg);
            }
            "#,
        );
    }

    #[test]
    fn test_already_declared() {
        assert_eq!(errors("int a; int a;"), vec![AlreadyDeclared]);
    }

    #[test]
    fn test_first_declaration_stays_in_force() {
        assert_eq!(errors("int a; string a; a = 5;"), vec![AlreadyDeclared]);
    }

    #[test]
    fn test_type_mismatch_on_assignment() {
        assert_eq!(errors("bool b; b = 5;"), vec![TypeMismatch]);
        assert_eq!(errors("int i = 1.5;"), vec![TypeMismatch]);
    }

    #[test]
    fn test_int_widens_to_float() {
        assert_clean("float f = 1; f = f * 2;");
    }

    #[test]
    fn test_undeclared() {
        assert_eq!(errors("int x; y = x;"), vec![Undeclared]);
        assert_eq!(errors("print(q);"), vec![Undeclared]);
    }

    #[test]
    fn test_initializer_checked_before_declaration() {
        assert_eq!(errors("int x = x;"), vec![Undeclared]);
    }

    #[test]
    fn test_divide_by_zero_literal() {
        assert_eq!(errors("int z = 10 / 0;"), vec![DivideByZeroLiteral]);
        assert_eq!(errors("int z = 10 % -0;"), vec![DivideByZeroLiteral]);
        assert_eq!(errors("float f = 1.5 / 0.0;"), vec![DivideByZeroLiteral]);
        assert_clean("int d = 2; int z = 10 / d;");
    }

    #[test]
    fn test_errors_accumulate_in_order() {
        let source = r#"
            int a;
            int a;
            bool b = 5;
            c = 1;
            int z = 4 / 0;
        "#;
        assert_eq!(errors(source), vec![AlreadyDeclared, TypeMismatch, Undeclared, DivideByZeroLiteral]);
    }

    #[test]
    fn test_no_cascading_errors() {
        assert_eq!(errors("int a = (y + 1) * 2;"), vec![Undeclared]);
        assert_eq!(errors("bool b = nope < 3 and true;"), vec![Undeclared]);
    }

    #[test]
    fn test_lost_types_do_not_cascade() {
        assert_eq!(
            errors("for (i = true + 1; i < 3; i++) { print(i); }"),
            vec![InvalidOperationForType]
        );
        assert_eq!(errors("array a = [y, 2]; print(a[0]); print(length(a));"), vec![Undeclared]);
        assert_eq!(errors("array b = [1, z]; b = [3]; bool t = b[0];"), vec![Undeclared, TypeMismatch]);
    }

    #[test]
    fn test_invalid_operations() {
        assert_eq!(errors("int x = true + 1;"), vec![InvalidOperationForType]);
        assert_eq!(errors("string s = concat(1, \"a\");"), vec![InvalidOperationForType]);
        assert_eq!(errors("int n = length(5);"), vec![InvalidOperationForType]);
        assert_eq!(errors("bool b = not 5;"), vec![InvalidOperationForType]);
        assert_eq!(errors("bool b = 1 and true;"), vec![InvalidOperationForType]);
        assert_eq!(errors("string s = -\"a\";"), vec![InvalidOperationForType]);
    }

    #[test]
    fn test_comparison_mismatch() {
        assert_eq!(errors("bool b = \"a\" < 1;"), vec![TypeMismatch]);
        assert_clean("bool b = 1 < 2.5; bool s = \"a\" == \"b\";");
    }

    #[test]
    fn test_conditions_must_be_bool() {
        assert_eq!(errors("if (1) { }"), vec![TypeMismatch]);
        assert_eq!(errors("int x = 0; while (x) { x = x - 1; }"), vec![TypeMismatch]);
        assert_eq!(errors("if (true) { } else if (2) { }"), vec![TypeMismatch]);
    }

    #[test]
    fn test_arrays() {
        assert_clean(
            r#"
            array a = [1, 2, 3];
            int first = a[0];
            float half = a[1] / 2.0;
            int n = length(a) + index(a, 2);
            array doubled = a * 2;
            array lo = min(a);
            "#,
        );
        assert_eq!(errors("array a = [1, 2]; bool b = a[true];"), vec![TypeMismatch]);
        assert_eq!(errors("int n = 3; int m = n[0];"), vec![TypeMismatch]);
        assert_eq!(errors("array a = [1, \"x\"];"), vec![TypeMismatch]);
        assert_eq!(errors("array a = [1, 2]; string s = a[0];"), vec![TypeMismatch]);
        assert_eq!(errors("array a = [1, 2]; a = [\"x\"];"), vec![TypeMismatch]);
    }

    #[test]
    fn test_unknown_element_type_is_reported() {
        assert_eq!(
            errors("array a; bool b = a[0] + 1; string s = a[1];"),
            vec![TypeMismatch, TypeMismatch]
        );
        assert_eq!(errors("array e = []; int n = index(e, 0);"), vec![TypeMismatch]);
        assert_clean("array a; a = [1, 2]; int n = a[0];");
    }

    #[test]
    fn test_for_header_declares_loop_variable() {
        assert_clean("for (i = 0; i < 10; i = i + 1) { print(i); } print(i);");
        assert_clean("int i; for (i = 0; i < 3; i++) { }");
        assert_eq!(
            errors("for (int i = 0; i < 3; i++) { } for (int i = 0; i < 3; i++) { }"),
            vec![AlreadyDeclared]
        );
    }

    #[test]
    fn test_expr_type_query() {
        let program = parse("array a = [1.5, 2.5]; int n = 2;").unwrap();
        let mut checker = Checker::new();
        checker.check_program(&program);
        assert!(checker.errors().is_empty());

        let access = parse("print(a[0] * n);").unwrap();
        let StmtKind::Print(expr) = &access.statements[0].kind else {
            panic!("expected print");
        };
        assert_eq!(checker.expr_type(expr), Some(Typed::scalar(Type::Float)));
        assert_eq!(checker.symbols().lookup("a").and_then(|s| s.element), Some(Type::Float));
    }
}
