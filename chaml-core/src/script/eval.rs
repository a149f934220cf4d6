use std::cmp::Ordering;
use std::collections::HashMap;

use super::ScriptEvaluator;
use super::ast::{BinaryOp, Expr, Part, Stmt, UnaryOp};
use super::parser::parse;
use super::value::Value;
use crate::error::ScriptError;

/// Built-in expression interpreter.
///
/// Locals live in the interpreter, so a value assigned by one evaluation is
/// visible to later ones. A lookup of `@name` falls back to `name` when no
/// `@name` local exists.
#[derive(Debug, Clone, Default)]
pub struct Interpreter {
    locals: HashMap<String, Value>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_local(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_local(name, value);
        self
    }

    pub fn set_local(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.locals.insert(name.into(), value.into());
    }

    pub fn local(&self, name: &str) -> Option<&Value> {
        self.locals.get(name).or_else(|| {
            name.strip_prefix('@')
                .and_then(|bare| self.locals.get(bare))
        })
    }

    /// Parses and runs `code`, returning the value of its last statement.
    pub fn run(&mut self, code: &str) -> Result<Value, ScriptError> {
        let program = parse(code)?;
        self.exec(&program)
    }

    fn exec(&mut self, stmts: &[Stmt]) -> Result<Value, ScriptError> {
        let mut last = Value::Nil;
        for stmt in stmts {
            last = match stmt {
                Stmt::Assign { name, value } => {
                    let value = self.eval(value)?;
                    self.locals.insert(name.clone(), value.clone());
                    value
                }
                Stmt::Expr(expr) => self.eval(expr)?,
            };
        }
        Ok(last)
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, ScriptError> {
        match expr {
            Expr::Nil => Ok(Value::Nil),
            Expr::Bool(value) => Ok(Value::Bool(*value)),
            Expr::Int(value) => Ok(Value::Int(*value)),
            Expr::Float(value) => Ok(Value::Float(*value)),
            Expr::Str(text) => Ok(Value::Str(text.clone())),
            Expr::Interpolated(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        Part::Text(text) => out.push_str(text),
                        Part::Code(stmts) => out.push_str(&self.exec(stmts)?.to_text()),
                    }
                }
                Ok(Value::Str(out))
            }
            Expr::Var(name) => self
                .local(name)
                .cloned()
                .ok_or_else(|| ScriptError::UndefinedVariable(name.clone())),
            Expr::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(values))
            }
            Expr::Hash(entries) => {
                let mut pairs: Vec<(String, Value)> = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = self.eval(key)?.to_text();
                    let value = self.eval(value)?;
                    match pairs.iter_mut().find(|(existing, _)| *existing == key) {
                        Some(slot) => slot.1 = value,
                        None => pairs.push((key, value)),
                    }
                }
                Ok(Value::Map(pairs))
            }
            Expr::Index { target, index } => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                index_value(&target, &index)
            }
            Expr::Call {
                receiver,
                method,
                args,
            } => {
                let receiver = self.eval(receiver)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                call_method(receiver, method, &args)
            }
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    UnaryOp::Neg => match value {
                        Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
                        Value::Float(n) => Ok(Value::Float(-n)),
                        other => Err(ScriptError::UndefinedMethod {
                            method: "-@".to_string(),
                            receiver: other.type_name(),
                        }),
                    },
                }
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                match op {
                    BinaryOp::And if !left.is_truthy() => return Ok(left),
                    BinaryOp::Or if left.is_truthy() => return Ok(left),
                    BinaryOp::And | BinaryOp::Or => return self.eval(right),
                    _ => {}
                }
                let right = self.eval(right)?;
                binary(*op, left, right)
            }
        }
    }
}

impl ScriptEvaluator for Interpreter {
    fn evaluate(&mut self, code: &str) -> Result<Value, ScriptError> {
        self.run(code)
    }
}

#[derive(Debug, Clone, Copy)]
enum Arith {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, ScriptError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(values_equal(&left, &right))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(&left, &right))),
        BinaryOp::Lt => compare(&left, &right, Ordering::is_lt),
        BinaryOp::Le => compare(&left, &right, Ordering::is_le),
        BinaryOp::Gt => compare(&left, &right, Ordering::is_gt),
        BinaryOp::Ge => compare(&left, &right, Ordering::is_ge),
        BinaryOp::Add => match (left, right) {
            (Value::Str(mut text), Value::Str(tail)) => {
                text.push_str(&tail);
                Ok(Value::Str(text))
            }
            (Value::Array(mut items), Value::Array(tail)) => {
                items.extend(tail);
                Ok(Value::Array(items))
            }
            (left, right) => arithmetic(Arith::Add, &left, &right),
        },
        BinaryOp::Mul => match (left, right) {
            (Value::Str(text), Value::Int(count)) => {
                let count = usize::try_from(count)
                    .map_err(|_| ScriptError::Type("negative argument".to_string()))?;
                Ok(Value::Str(text.repeat(count)))
            }
            (left, right) => arithmetic(Arith::Mul, &left, &right),
        },
        BinaryOp::Sub => arithmetic(Arith::Sub, &left, &right),
        BinaryOp::Div => arithmetic(Arith::Div, &left, &right),
        BinaryOp::Rem => arithmetic(Arith::Rem, &left, &right),
        BinaryOp::And | BinaryOp::Or => Ok(right),
    }
}

fn arithmetic(op: Arith, left: &Value, right: &Value) -> Result<Value, ScriptError> {
    if let (Value::Int(l), Value::Int(r)) = (left, right) {
        let (l, r) = (*l, *r);
        let value = match op {
            Arith::Add => l.wrapping_add(r),
            Arith::Sub => l.wrapping_sub(r),
            Arith::Mul => l.wrapping_mul(r),
            Arith::Div => floor_div(l, r)?,
            Arith::Rem => floor_rem(l, r)?,
        };
        return Ok(Value::Int(value));
    }
    match (as_float(left), as_float(right)) {
        (Some(l), Some(r)) => Ok(Value::Float(match op {
            Arith::Add => l + r,
            Arith::Sub => l - r,
            Arith::Mul => l * r,
            Arith::Div => l / r,
            Arith::Rem => l - r * (l / r).floor(),
        })),
        _ => Err(ScriptError::Type(format!(
            "{} can't be coerced into {}",
            right.type_name(),
            left.type_name()
        ))),
    }
}

/// Integer division rounding toward negative infinity.
fn floor_div(left: i64, right: i64) -> Result<i64, ScriptError> {
    if right == 0 {
        return Err(ScriptError::ZeroDivision);
    }
    let quotient = left.wrapping_div(right);
    if left.wrapping_rem(right) != 0 && ((left < 0) != (right < 0)) {
        Ok(quotient - 1)
    } else {
        Ok(quotient)
    }
}

/// Remainder taking the sign of the divisor.
fn floor_rem(left: i64, right: i64) -> Result<i64, ScriptError> {
    if right == 0 {
        return Err(ScriptError::ZeroDivision);
    }
    let remainder = left.wrapping_rem(right);
    if remainder != 0 && ((remainder < 0) != (right < 0)) {
        Ok(remainder + right)
    } else {
        Ok(remainder)
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(n) => Some(*n as f64),
        Value::Float(n) => Some(*n),
        _ => None,
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => {
            as_float(left) == as_float(right)
        }
        _ => left == right,
    }
}

fn compare(
    left: &Value,
    right: &Value,
    predicate: impl FnOnce(Ordering) -> bool,
) -> Result<Value, ScriptError> {
    let ordering = match (left, right) {
        (Value::Int(l), Value::Int(r)) => Some(l.cmp(r)),
        (Value::Str(l), Value::Str(r)) => Some(l.cmp(r)),
        _ => match (as_float(left), as_float(right)) {
            (Some(l), Some(r)) => l.partial_cmp(&r),
            _ => None,
        },
    };
    ordering.map(|ordering| Value::Bool(predicate(ordering))).ok_or_else(|| {
        ScriptError::Type(format!(
            "comparison of {} with {} failed",
            left.type_name(),
            right.type_name()
        ))
    })
}

fn index_value(target: &Value, index: &Value) -> Result<Value, ScriptError> {
    match (target, index) {
        (Value::Array(items), Value::Int(position)) => {
            Ok(resolve_position(*position, items.len())
                .and_then(|position| items.get(position).cloned())
                .unwrap_or(Value::Nil))
        }
        (Value::Str(text), Value::Int(position)) => {
            let count = text.chars().count();
            Ok(resolve_position(*position, count)
                .and_then(|position| text.chars().nth(position))
                .map_or(Value::Nil, |ch| Value::Str(ch.to_string())))
        }
        (Value::Map(_), key) => Ok(target.get(&key.to_text()).cloned().unwrap_or(Value::Nil)),
        (Value::Array(_) | Value::Str(_), other) => Err(ScriptError::Type(format!(
            "no implicit conversion of {} into integer",
            other.type_name()
        ))),
        (other, _) => Err(ScriptError::UndefinedMethod {
            method: "[]".to_string(),
            receiver: other.type_name(),
        }),
    }
}

/// Maps a possibly negative position onto `0..len`.
fn resolve_position(position: i64, len: usize) -> Option<usize> {
    if position >= 0 {
        usize::try_from(position).ok()
    } else {
        len.checked_sub(usize::try_from(position.unsigned_abs()).ok()?)
    }
}

fn call_method(receiver: Value, method: &str, args: &[Value]) -> Result<Value, ScriptError> {
    match (method, &receiver) {
        ("join", Value::Array(items)) => {
            let separator = match args {
                [] => String::new(),
                [Value::Str(separator)] => separator.clone(),
                [other] => {
                    return Err(ScriptError::Type(format!(
                        "no implicit conversion of {} into string",
                        other.type_name()
                    )));
                }
                _ => return Err(arity_error(method, args.len(), 1)),
            };
            let mut parts = Vec::new();
            flatten_text(items, &mut parts);
            Ok(Value::Str(parts.join(&separator)))
        }
        _ => {
            expect_arity(method, args.len(), 0)?;
            call_nullary(receiver, method)
        }
    }
}

fn call_nullary(receiver: Value, method: &str) -> Result<Value, ScriptError> {
    let value = match (method, receiver) {
        ("to_s", receiver) => Value::Str(receiver.to_text()),
        ("inspect", receiver) => Value::Str(receiver.inspect()),
        ("nil?", receiver) => Value::Bool(receiver.is_nil()),
        ("upcase", Value::Str(text)) => Value::Str(text.to_uppercase()),
        ("downcase", Value::Str(text)) => Value::Str(text.to_lowercase()),
        ("capitalize", Value::Str(text)) => {
            let mut chars = text.chars();
            let mut capitalized = String::with_capacity(text.len());
            if let Some(first) = chars.next() {
                capitalized.extend(first.to_uppercase());
                capitalized.push_str(&chars.as_str().to_lowercase());
            }
            Value::Str(capitalized)
        }
        ("strip", Value::Str(text)) => Value::Str(text.trim().to_string()),
        ("reverse", Value::Str(text)) => Value::Str(text.chars().rev().collect()),
        ("reverse", Value::Array(mut items)) => {
            items.reverse();
            Value::Array(items)
        }
        ("length" | "size", Value::Str(text)) => Value::Int(text.chars().count() as i64),
        ("length" | "size", Value::Array(items)) => Value::Int(items.len() as i64),
        ("length" | "size", Value::Map(pairs)) => Value::Int(pairs.len() as i64),
        ("empty?", Value::Str(text)) => Value::Bool(text.is_empty()),
        ("empty?", Value::Array(items)) => Value::Bool(items.is_empty()),
        ("empty?", Value::Map(pairs)) => Value::Bool(pairs.is_empty()),
        ("first", Value::Array(items)) => items.into_iter().next().unwrap_or_default(),
        ("last", Value::Array(items)) => items.into_iter().next_back().unwrap_or_default(),
        ("keys", Value::Map(pairs)) => {
            Value::Array(pairs.into_iter().map(|(key, _)| Value::Str(key)).collect())
        }
        ("values", Value::Map(pairs)) => {
            Value::Array(pairs.into_iter().map(|(_, value)| value).collect())
        }
        (_, receiver) => {
            return Err(ScriptError::UndefinedMethod {
                method: method.to_string(),
                receiver: receiver.type_name(),
            });
        }
    };
    Ok(value)
}

fn flatten_text(items: &[Value], out: &mut Vec<String>) {
    for item in items {
        match item {
            Value::Array(nested) => flatten_text(nested, out),
            other => out.push(other.to_text()),
        }
    }
}

fn expect_arity(method: &str, given: usize, expected: usize) -> Result<(), ScriptError> {
    if given == expected {
        return Ok(());
    }
    Err(arity_error(method, given, expected))
}

fn arity_error(method: &str, given: usize, expected: usize) -> ScriptError {
    ScriptError::Type(format!(
        "wrong number of arguments for `{method}` (given {given}, expected {expected})"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(code: &str) -> Value {
        Interpreter::new().run(code).expect("evaluation should succeed")
    }

    #[test]
    fn evaluates_arithmetic_with_precedence() {
        assert_eq!(eval("1 + 2 * 3"), Value::Int(7));
        assert_eq!(eval("(1 + 2) * 3"), Value::Int(9));
        assert_eq!(eval("7 / 2"), Value::Int(3));
        assert_eq!(eval("-7 / 2"), Value::Int(-4));
        assert_eq!(eval("-7 % 3"), Value::Int(2));
        assert_eq!(eval("1 + 0.5"), Value::Float(1.5));
    }

    #[test]
    fn rejects_division_by_zero() {
        let err = Interpreter::new().run("1 / 0").unwrap_err();
        assert_eq!(err, ScriptError::ZeroDivision);
    }

    #[test]
    fn logic_returns_operands() {
        assert_eq!(eval("nil || 'x'"), Value::from("x"));
        assert_eq!(eval("false && missing"), Value::Bool(false));
        assert_eq!(eval("!nil"), Value::Bool(true));
        assert_eq!(eval("1 == 1.0"), Value::Bool(true));
        assert_eq!(eval("'a' < 'b'"), Value::Bool(true));
    }

    #[test]
    fn assignments_persist_between_runs() {
        let mut interpreter = Interpreter::new();
        interpreter.run("x = 2; y = x * 5").expect("assign");
        assert_eq!(interpreter.run("y").expect("read"), Value::Int(10));
        assert_eq!(interpreter.local("x"), Some(&Value::Int(2)));
    }

    #[test]
    fn instance_variables_fall_back_to_plain_locals() {
        let mut interpreter = Interpreter::new().with_local("title", "Home");
        assert_eq!(interpreter.run("@title").expect("lookup"), Value::from("Home"));
    }

    #[test]
    fn interpolates_double_quoted_strings() {
        let mut interpreter = Interpreter::new().with_local("name", "Ann");
        let value = interpreter.run("\"hi #{name.upcase}!\"").expect("interpolate");
        assert_eq!(value, Value::from("hi ANN!"));
    }

    #[test]
    fn builds_hashes_and_indexes_them() {
        let value = eval("{a: 1, :b => [2, 3], 'c' => {d: true}}");
        assert_eq!(value.get("a"), Some(&Value::Int(1)));
        assert_eq!(eval("{a: [1, 2]}[:a][-1]"), Value::Int(2));
        assert_eq!(eval("{a: 1}['missing']"), Value::Nil);
    }

    #[test]
    fn calls_value_methods() {
        assert_eq!(eval("'hello world'.capitalize"), Value::from("Hello world"));
        assert_eq!(eval("'  x '.strip.length"), Value::Int(1));
        assert_eq!(eval("[1, [2, 3]].join('-')"), Value::from("1-2-3"));
        assert_eq!(eval("{a: 1, b: 2}.keys"), Value::from(vec!["a", "b"]));
        assert_eq!(eval("[].empty?"), Value::Bool(true));
        assert_eq!(eval("[3, 4].last"), Value::Int(4));
        assert_eq!(eval("nil.to_s"), Value::from(""));
    }

    #[test]
    fn reports_unknown_names_and_methods() {
        let err = Interpreter::new().run("missing").unwrap_err();
        assert_eq!(err, ScriptError::UndefinedVariable("missing".to_string()));

        let err = Interpreter::new().run("1.upcase").unwrap_err();
        assert_eq!(
            err,
            ScriptError::UndefinedMethod {
                method: "upcase".to_string(),
                receiver: "integer",
            }
        );

        let err = Interpreter::new().run("'a'.upcase(1)").unwrap_err();
        assert!(matches!(err, ScriptError::Type(_)));
    }

    #[test]
    fn mixed_comparisons_fail() {
        let err = Interpreter::new().run("1 < 'a'").unwrap_err();
        assert!(matches!(err, ScriptError::Type(_)));
    }
}
