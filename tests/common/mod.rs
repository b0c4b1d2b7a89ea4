//! Reference interpreter used to compare program behavior in tests.

#![allow(dead_code)]

use maslang::frontend::ast::*;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Loop iterations allowed before a run is considered stuck.
const MAX_STEPS: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Char(char),
    Str(String),
    Array(Vec<Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Char(c) => write!(f, "{}", c),
            Value::Str(s) => write!(f, "{}", s),
            Value::Array(items) => {
                let items: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
        }
    }
}

impl Value {
    fn as_f64(&self) -> f64 {
        match self {
            Value::Int(v) => *v as f64,
            Value::Float(v) => *v,
            other => panic!("not a number: {:?}", other),
        }
    }

    fn as_bool(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            other => panic!("not a bool: {:?}", other),
        }
    }
}

/// Everything observable about one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    /// Printed lines, in order
    pub output: Vec<String>,
    /// Final value of every variable
    pub vars: BTreeMap<String, Value>,
}

/// Counters that are not part of a program's behavior.
#[derive(Debug, Default)]
pub struct Counters {
    pub for_iterations: usize,
    pub while_iterations: usize,
}

#[derive(Default)]
struct Interpreter {
    types: HashMap<Name, Type>,
    vars: HashMap<Name, Value>,
    output: Vec<String>,
    counters: Counters,
}

pub fn run(program: &Program) -> Run {
    run_counted(program).0
}

pub fn run_counted(program: &Program) -> (Run, Counters) {
    let mut interp = Interpreter::default();
    for stmt in &program.statements {
        interp.exec(stmt);
    }
    let vars = interp.vars.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
    (Run { output: interp.output, vars }, interp.counters)
}

pub fn run_source(source: &str) -> Run {
    run(&maslang::analyze(source).expect("program should be valid"))
}

impl Interpreter {
    fn exec_block(&mut self, block: &Block) {
        for stmt in &block.statements {
            self.exec(stmt);
        }
    }

    fn step(&self) {
        let total = self.counters.for_iterations + self.counters.while_iterations;
        assert!(total < MAX_STEPS, "program does not terminate");
    }

    fn exec(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::VarDecl { name, ty, init } => {
                let value = match init {
                    Some(e) => self.eval(e),
                    None => default_value(*ty),
                };
                self.types.insert(name.clone(), *ty);
                self.store(name, value);
            }
            StmtKind::Assign(assign) => self.exec_assign(assign),
            StmtKind::If { condition, then_block, else_ifs, else_block } => {
                if self.eval(condition).as_bool() {
                    return self.exec_block(then_block);
                }
                for arm in else_ifs {
                    if self.eval(&arm.condition).as_bool() {
                        return self.exec_block(&arm.block);
                    }
                }
                if let Some(block) = else_block {
                    self.exec_block(block);
                }
            }
            StmtKind::For { init_ty, init, condition, update, body } => {
                if let Some(ty) = init_ty {
                    self.types.insert(init.target.clone(), *ty);
                }
                self.exec_assign(init);
                while self.eval(condition).as_bool() {
                    self.counters.for_iterations += 1;
                    self.step();
                    self.exec_block(body);
                    self.exec_assign(update);
                }
            }
            StmtKind::While { condition, body } => {
                while self.eval(condition).as_bool() {
                    self.counters.while_iterations += 1;
                    self.step();
                    self.exec_block(body);
                }
            }
            StmtKind::Print(expr) => {
                let value = self.eval(expr);
                self.output.push(value.to_string());
            }
            StmtKind::Block(block) => self.exec_block(block),
        }
    }

    fn exec_assign(&mut self, assign: &Assign) {
        let value = self.eval(&assign.value);
        if !self.types.contains_key(&assign.target) {
            let ty = type_of(&value);
            self.types.insert(assign.target.clone(), ty);
        }
        self.store(&assign.target, value);
    }

    fn store(&mut self, name: &Name, value: Value) {
        let value = match (self.types.get(name), value) {
            (Some(Type::Float), Value::Int(v)) => Value::Float(v as f64),
            (_, value) => value,
        };
        self.vars.insert(name.clone(), value);
    }

    fn eval(&mut self, expr: &Expr) -> Value {
        match &expr.kind {
            ExprKind::IntLiteral(v) => Value::Int(*v),
            ExprKind::FloatLiteral(v) => Value::Float(*v),
            ExprKind::BoolLiteral(v) => Value::Bool(*v),
            ExprKind::StringLiteral(s) => Value::Str(s.clone()),
            ExprKind::CharLiteral(c) => Value::Char(*c),
            ExprKind::Identifier(name) => self
                .vars
                .get(name)
                .cloned()
                .unwrap_or_else(|| panic!("read of unset variable '{}'", name)),
            ExprKind::ArrayLiteral(items) => Value::Array(items.iter().map(|e| self.eval(e)).collect()),
            ExprKind::ArrayAccess { array, index } => {
                let index = self.eval(index);
                let array = self.vars.get(array).cloned().expect("array is set");
                element(&array, &index)
            }
            ExprKind::Binary { op, left, right } => {
                let (l, r) = (self.eval(left), self.eval(right));
                binary(*op, &l, &r)
            }
            ExprKind::Compare { op: CompareOp::And, left, right } => {
                Value::Bool(self.eval(left).as_bool() && self.eval(right).as_bool())
            }
            ExprKind::Compare { op: CompareOp::Or, left, right } => {
                Value::Bool(self.eval(left).as_bool() || self.eval(right).as_bool())
            }
            ExprKind::Compare { op, left, right } => {
                let (l, r) = (self.eval(left), self.eval(right));
                Value::Bool(compare(*op, &l, &r))
            }
            ExprKind::Unary { op, operand } => {
                let v = self.eval(operand);
                unary(*op, &v)
            }
        }
    }
}

fn default_value(ty: Type) -> Value {
    match ty {
        Type::Int => Value::Int(0),
        Type::Float => Value::Float(0.0),
        Type::Bool => Value::Bool(false),
        Type::Char => Value::Char('\0'),
        Type::String => Value::Str(String::new()),
        Type::Array => Value::Array(Vec::new()),
    }
}

fn type_of(value: &Value) -> Type {
    match value {
        Value::Int(_) => Type::Int,
        Value::Float(_) => Type::Float,
        Value::Bool(_) => Type::Bool,
        Value::Char(_) => Type::Char,
        Value::Str(_) => Type::String,
        Value::Array(_) => Type::Array,
    }
}

fn element(array: &Value, index: &Value) -> Value {
    match (array, index) {
        (Value::Array(items), Value::Int(i)) => items[usize::try_from(*i).expect("index is non-negative")].clone(),
        other => panic!("bad index operands: {:?}", other),
    }
}

fn binary(op: BinaryOp, l: &Value, r: &Value) -> Value {
    match (op, l, r) {
        (BinaryOp::Concat, Value::Str(a), Value::Str(b)) => Value::Str(format!("{}{}", a, b)),
        (BinaryOp::Index, array, index) => element(array, index),
        (_, Value::Array(items), scalar) => Value::Array(items.iter().map(|v| binary(op, v, scalar)).collect()),
        (_, scalar, Value::Array(items)) => Value::Array(items.iter().map(|v| binary(op, scalar, v)).collect()),
        (op, Value::Int(a), Value::Int(b)) => match op {
            BinaryOp::Add => Value::Int(a.wrapping_add(*b)),
            BinaryOp::Sub => Value::Int(a.wrapping_sub(*b)),
            BinaryOp::Mul => Value::Int(a.wrapping_mul(*b)),
            BinaryOp::Div => Value::Int(a.wrapping_div(*b)),
            BinaryOp::Mod => Value::Int(a.wrapping_rem(*b)),
            BinaryOp::Pow if *b >= 0 => Value::Int(a.wrapping_pow(*b as u32)),
            BinaryOp::Pow => Value::Float((*a as f64).powf(*b as f64)),
            other => panic!("bad int operator {:?}", other),
        },
        (op, a, b) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            Value::Float(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                BinaryOp::Mod => a % b,
                BinaryOp::Pow => a.powf(b),
                other => panic!("bad float operator {:?}", other),
            })
        }
    }
}

fn compare(op: CompareOp, l: &Value, r: &Value) -> bool {
    let ordering = match (l, r) {
        (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => l.as_f64().partial_cmp(&r.as_f64()),
        (Value::Char(a), Value::Char(b)) => a.partial_cmp(b),
        (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
        _ => None,
    };
    match op {
        CompareOp::Eq => l == r || ordering == Some(std::cmp::Ordering::Equal),
        CompareOp::Ne => !(l == r || ordering == Some(std::cmp::Ordering::Equal)),
        CompareOp::Lt => ordering.map_or(false, |o| o.is_lt()),
        CompareOp::Le => ordering.map_or(false, |o| o.is_le()),
        CompareOp::Gt => ordering.map_or(false, |o| o.is_gt()),
        CompareOp::Ge => ordering.map_or(false, |o| o.is_ge()),
        CompareOp::And | CompareOp::Or => unreachable!("logical operators short-circuit"),
    }
}

fn unary(op: UnaryOp, v: &Value) -> Value {
    match (op, v) {
        (UnaryOp::Not, Value::Bool(b)) => Value::Bool(!b),
        (UnaryOp::Length, Value::Array(items)) => Value::Int(items.len() as i64),
        (UnaryOp::Length, Value::Str(s)) => Value::Int(s.chars().count() as i64),
        (UnaryOp::Min | UnaryOp::Max, Value::Array(items)) => {
            let pick = items.iter().cloned().reduce(|a, b| {
                let b_first = if op == UnaryOp::Min {
                    compare(CompareOp::Lt, &b, &a)
                } else {
                    compare(CompareOp::Gt, &b, &a)
                };
                if b_first { b } else { a }
            });
            Value::Array(pick.into_iter().collect())
        }
        (_, Value::Array(items)) => Value::Array(items.iter().map(|item| unary(op, item)).collect()),
        (UnaryOp::Neg, Value::Int(a)) => Value::Int(a.wrapping_neg()),
        (UnaryOp::Neg, Value::Float(a)) => Value::Float(-a),
        (UnaryOp::Abs, Value::Int(a)) => Value::Int(a.wrapping_abs()),
        (UnaryOp::Abs, Value::Float(a)) => Value::Float(a.abs()),
        (UnaryOp::Increment, Value::Int(a)) => Value::Int(a.wrapping_add(1)),
        (UnaryOp::Increment, Value::Float(a)) => Value::Float(a + 1.0),
        (UnaryOp::Decrement, Value::Int(a)) => Value::Int(a.wrapping_sub(1)),
        (UnaryOp::Decrement, Value::Float(a)) => Value::Float(a - 1.0),
        other => panic!("bad unary operands: {:?}", other),
    }
}
