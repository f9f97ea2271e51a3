//! Python-syntax config files, interpreted as a declarative subset
//!
//! The file is parsed to an AST and its top-level assignments are evaluated
//! over literals only. Nothing is executed: calls other than `dict(...)`,
//! control flow and definitions are rejected with the offending line.

use crate::error::{ConfigError, Result};
use crate::format::data::{float_value, value_kind};
use crate::format::Format;
use rustpython_parser::ast::{self, Constant, Expr, Operator, Ranged, Stmt, UnaryOp};
use rustpython_parser::Parse;
use serde_json::{Map, Value};
use std::path::Path;

type EvalResult<T> = std::result::Result<T, String>;

/// Upper bound on the size of any value built while evaluating, counted
/// in scalars, containers and string characters.
const MAX_VALUE_SIZE: usize = 1_000_000;

/// Parse a Python config and return its public top-level bindings.
///
/// Names starting with `_` are file-local and dropped, except `base_key`
/// which is kept so the loader can resolve inheritance.
pub fn parse_python(content: &str, path: &Path, base_key: &str) -> Result<Map<String, Value>> {
    let source_path = path.display().to_string();
    let suite = ast::Suite::parse(content, &source_path)
        .map_err(|e| ConfigError::parse(path, Format::Python, e.to_string()))?;

    let mut scope = Scope::default();
    for stmt in &suite {
        scope.exec(stmt).map_err(|msg| {
            let line = line_number(content, usize::from(stmt.range().start()));
            ConfigError::parse(path, Format::Python, format!("line {line}: {msg}"))
        })?;
    }

    Ok(scope.into_bindings(base_key))
}

fn line_number(content: &str, offset: usize) -> usize {
    let offset = offset.min(content.len());
    content.as_bytes()[..offset].iter().filter(|&&b| b == b'\n').count() + 1
}

/// Names bound so far, in first-assignment order.
#[derive(Default)]
struct Scope {
    names: Map<String, Value>,
}

impl Scope {
    fn into_bindings(self, base_key: &str) -> Map<String, Value> {
        self.names.into_iter().filter(|(name, _)| !name.starts_with('_') || name == base_key).collect()
    }

    fn exec(&mut self, stmt: &Stmt) -> EvalResult<()> {
        match stmt {
            Stmt::Assign(assign) => {
                let value = self.eval(&assign.value)?;
                for target in &assign.targets {
                    self.bind(target, value.clone())?;
                }
                Ok(())
            }
            Stmt::AnnAssign(assign) => match &assign.value {
                Some(value) => {
                    let value = self.eval(value)?;
                    self.bind(&assign.target, value)
                }
                // `x: int` declares without binding
                None => Ok(()),
            },
            Stmt::Import(_) | Stmt::ImportFrom(_) => {
                tracing::debug!("Ignoring import statement in Python config");
                Ok(())
            }
            Stmt::Pass(_) => Ok(()),
            Stmt::Expr(expr) if matches!(expr.value.as_ref(), Expr::Constant(_)) => Ok(()),
            other => Err(format!("unsupported statement: {}", statement_kind(other))),
        }
    }

    fn bind(&mut self, target: &Expr, value: Value) -> EvalResult<()> {
        match target {
            Expr::Name(name) => {
                self.names.insert(name.id.as_str().to_string(), value);
                Ok(())
            }
            Expr::Tuple(ast::ExprTuple { elts, .. }) | Expr::List(ast::ExprList { elts, .. }) => {
                let items = match value {
                    Value::Array(items) => items,
                    other => return Err(format!("cannot unpack {} into names", value_kind(&other))),
                };
                if items.len() != elts.len() {
                    return Err(format!(
                        "cannot unpack {} values into {} names",
                        items.len(),
                        elts.len()
                    ));
                }
                for (elt, item) in elts.iter().zip(items) {
                    self.bind(elt, item)?;
                }
                Ok(())
            }
            _ => Err("assignment target must be a plain name".to_string()),
        }
    }

    fn eval(&self, expr: &Expr) -> EvalResult<Value> {
        match expr {
            Expr::Constant(constant) => constant_value(&constant.value),
            Expr::List(ast::ExprList { elts, .. }) | Expr::Tuple(ast::ExprTuple { elts, .. }) => {
                Ok(Value::Array(self.eval_all(elts)?))
            }
            Expr::Dict(dict) => self.eval_dict(&dict.keys, &dict.values),
            Expr::Name(name) => self
                .names
                .get(name.id.as_str())
                .cloned()
                .ok_or_else(|| format!("name '{}' is not defined", name.id.as_str())),
            Expr::UnaryOp(unary) => unary_op(&unary.op, self.eval(&unary.operand)?),
            Expr::BinOp(binary) => {
                binary_op(self.eval(&binary.left)?, &binary.op, self.eval(&binary.right)?)
            }
            Expr::Call(call) => self.eval_call(call),
            other => Err(format!("unsupported expression: {}", expression_kind(other))),
        }
    }

    fn eval_all(&self, exprs: &[Expr]) -> EvalResult<Vec<Value>> {
        let mut budget = SizeBudget::default();
        exprs
            .iter()
            .map(|e| {
                let value = self.eval(e)?;
                budget.charge(value_size(&value))?;
                Ok(value)
            })
            .collect()
    }

    fn eval_dict(&self, keys: &[Option<Expr>], values: &[Expr]) -> EvalResult<Value> {
        let mut budget = SizeBudget::default();
        let mut map = Map::new();
        for (key, value) in keys.iter().zip(values) {
            let value = self.eval(value)?;
            budget.charge(value_size(&value))?;
            match key {
                Some(key) => {
                    map.insert(dict_key(self.eval(key)?)?, value);
                }
                None => splat_into(&mut map, value)?,
            }
        }
        Ok(Value::Object(map))
    }

    /// Only `dict(key=value, **other)` is allowed.
    fn eval_call(&self, call: &ast::ExprCall) -> EvalResult<Value> {
        let is_dict = matches!(call.func.as_ref(), Expr::Name(name) if name.id.as_str() == "dict");
        if !is_dict {
            return Err("function calls other than dict(...) are not supported".to_string());
        }
        if !call.args.is_empty() {
            return Err("dict(...) only accepts keyword arguments".to_string());
        }

        let mut budget = SizeBudget::default();
        let mut map = Map::new();
        for keyword in &call.keywords {
            let value = self.eval(&keyword.value)?;
            budget.charge(value_size(&value))?;
            match &keyword.arg {
                Some(arg) => {
                    map.insert(arg.as_str().to_string(), value);
                }
                None => splat_into(&mut map, value)?,
            }
        }
        Ok(Value::Object(map))
    }
}

/// Running size of a container under construction.
struct SizeBudget {
    used: usize,
}

impl Default for SizeBudget {
    fn default() -> Self {
        // the container itself
        Self { used: 1 }
    }
}

impl SizeBudget {
    fn charge(&mut self, size: usize) -> EvalResult<()> {
        self.used = self.used.saturating_add(size);
        if self.used > MAX_VALUE_SIZE {
            return Err(too_large());
        }
        Ok(())
    }
}

fn too_large() -> String {
    format!("value would exceed {MAX_VALUE_SIZE} elements")
}

fn value_size(value: &Value) -> usize {
    match value {
        Value::String(s) => s.chars().count().max(1),
        Value::Array(items) => items_size(items).saturating_add(1),
        Value::Object(map) => map.iter().fold(1, |acc: usize, (key, item)| {
            acc.saturating_add(key.chars().count()).saturating_add(value_size(item))
        }),
        _ => 1,
    }
}

fn items_size<'a>(items: impl IntoIterator<Item = &'a Value>) -> usize {
    items.into_iter().fold(0usize, |acc, item| acc.saturating_add(value_size(item)))
}

fn splat_into(map: &mut Map<String, Value>, value: Value) -> EvalResult<()> {
    match value {
        Value::Object(inner) => {
            map.extend(inner);
            Ok(())
        }
        other => Err(format!("cannot unpack {} with **", value_kind(&other))),
    }
}

fn dict_key(key: Value) -> EvalResult<String> {
    match key {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(true) => Ok("True".to_string()),
        Value::Bool(false) => Ok("False".to_string()),
        other => Err(format!("dict keys must be strings or numbers, found {}", value_kind(&other))),
    }
}

fn constant_value(constant: &Constant) -> EvalResult<Value> {
    match constant {
        Constant::None => Ok(Value::Null),
        Constant::Bool(b) => Ok(Value::Bool(*b)),
        Constant::Str(s) => Ok(Value::String(s.clone())),
        Constant::Int(i) => {
            let text = i.to_string();
            if let Ok(i) = text.parse::<i64>() {
                return Ok(Value::from(i));
            }
            text.parse::<u64>()
                .map(Value::from)
                .map_err(|_| format!("integer {text} does not fit in 64 bits"))
        }
        Constant::Float(f) => float_value(*f),
        Constant::Tuple(items) => {
            items.iter().map(constant_value).collect::<EvalResult<Vec<_>>>().map(Value::Array)
        }
        _ => Err("bytes, complex and ellipsis literals are not supported".to_string()),
    }
}

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn from_value(value: &Value) -> Option<Self> {
        let Value::Number(n) = value else { return None };
        match n.as_i64() {
            Some(i) => Some(Self::Int(i)),
            None => n.as_f64().map(Self::Float),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }
}

fn unary_op(op: &UnaryOp, operand: Value) -> EvalResult<Value> {
    if let (UnaryOp::Not, Value::Bool(b)) = (op, &operand) {
        return Ok(Value::Bool(!b));
    }
    match (op, Num::from_value(&operand)) {
        (UnaryOp::UAdd, Some(_)) => Ok(operand),
        (UnaryOp::USub, Some(Num::Int(i))) => {
            i.checked_neg().map(Value::from).ok_or_else(|| "integer overflow".to_string())
        }
        (UnaryOp::USub, Some(Num::Float(f))) => float_value(-f),
        _ => Err(format!("unsupported unary operator on {}", value_kind(&operand))),
    }
}

fn binary_op(left: Value, op: &Operator, right: Value) -> EvalResult<Value> {
    match (op, left, right) {
        (Operator::Add, Value::String(a), Value::String(b)) => {
            if a.chars().count().saturating_add(b.chars().count()) > MAX_VALUE_SIZE {
                return Err(too_large());
            }
            Ok(Value::String(a + &b))
        }
        (Operator::Add, Value::Array(mut a), Value::Array(b)) => {
            SizeBudget::default().charge(items_size(a.iter().chain(&b)))?;
            a.extend(b);
            Ok(Value::Array(a))
        }
        (Operator::Mult, Value::Array(items), count @ Value::Number(_))
        | (Operator::Mult, count @ Value::Number(_), Value::Array(items)) => {
            let times = repeat_count(&count, items_size(&items))?;
            Ok(Value::Array(items.iter().cloned().cycle().take(items.len() * times).collect()))
        }
        (Operator::Mult, Value::String(s), count @ Value::Number(_))
        | (Operator::Mult, count @ Value::Number(_), Value::String(s)) => {
            let times = repeat_count(&count, s.chars().count())?;
            Ok(Value::String(s.repeat(times)))
        }
        (op, left, right) => match (Num::from_value(&left), Num::from_value(&right)) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => int_arithmetic(op, a, b),
            (Some(a), Some(b)) => float_arithmetic(op, a.as_f64(), b.as_f64()),
            _ => Err(format!(
                "unsupported operand types for {}: {} and {}",
                operator_symbol(op),
                value_kind(&left),
                value_kind(&right)
            )),
        },
    }
}

fn repeat_count(count: &Value, unit_len: usize) -> EvalResult<usize> {
    let Some(Num::Int(n)) = Num::from_value(count) else {
        return Err("sequences can only be repeated by an integer".to_string());
    };
    // Python treats negative repeat counts as zero
    let times = usize::try_from(n.max(0)).unwrap_or(usize::MAX);
    match unit_len.checked_mul(times) {
        Some(total) if total < MAX_VALUE_SIZE => Ok(times),
        _ => Err(too_large()),
    }
}

fn int_arithmetic(op: &Operator, a: i64, b: i64) -> EvalResult<Value> {
    let result = match op {
        Operator::Add => a.checked_add(b),
        Operator::Sub => a.checked_sub(b),
        Operator::Mult => a.checked_mul(b),
        Operator::Div => return float_arithmetic(op, a as f64, b as f64),
        Operator::FloorDiv => {
            if b == 0 {
                return Err("integer division by zero".to_string());
            }
            a.checked_div(b).map(|q| if a % b != 0 && ((a < 0) != (b < 0)) { q - 1 } else { q })
        }
        Operator::Mod => {
            if b == 0 {
                return Err("integer modulo by zero".to_string());
            }
            a.checked_rem(b).map(|r| if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r })
        }
        Operator::Pow => {
            if b < 0 {
                return float_arithmetic(op, a as f64, b as f64);
            }
            u32::try_from(b).ok().and_then(|exp| a.checked_pow(exp))
        }
        other => return Err(format!("unsupported operator {}", operator_symbol(other))),
    };
    result.map(Value::from).ok_or_else(|| "integer overflow".to_string())
}

fn float_arithmetic(op: &Operator, a: f64, b: f64) -> EvalResult<Value> {
    let result = match op {
        Operator::Add => a + b,
        Operator::Sub => a - b,
        Operator::Mult => a * b,
        Operator::Div | Operator::FloorDiv | Operator::Mod if b == 0.0 => {
            return Err("float division by zero".to_string());
        }
        Operator::Div => a / b,
        Operator::FloorDiv => (a / b).floor(),
        Operator::Mod => a - b * (a / b).floor(),
        Operator::Pow => a.powf(b),
        other => return Err(format!("unsupported operator {}", operator_symbol(other))),
    };
    float_value(result)
}

fn operator_symbol(op: &Operator) -> &'static str {
    match op {
        Operator::Add => "+",
        Operator::Sub => "-",
        Operator::Mult => "*",
        Operator::MatMult => "@",
        Operator::Div => "/",
        Operator::Mod => "%",
        Operator::Pow => "**",
        Operator::LShift => "<<",
        Operator::RShift => ">>",
        Operator::BitOr => "|",
        Operator::BitXor => "^",
        Operator::BitAnd => "&",
        Operator::FloorDiv => "//",
    }
}

fn statement_kind(stmt: &Stmt) -> &'static str {
    match stmt {
        Stmt::FunctionDef(_) | Stmt::AsyncFunctionDef(_) => "function definition",
        Stmt::ClassDef(_) => "class definition",
        Stmt::If(_) => "if statement",
        Stmt::For(_) | Stmt::AsyncFor(_) | Stmt::While(_) => "loop",
        Stmt::With(_) | Stmt::AsyncWith(_) => "with statement",
        Stmt::Try(_) => "try statement",
        Stmt::AugAssign(_) => "augmented assignment",
        Stmt::Delete(_) => "del statement",
        Stmt::Expr(_) => "expression statement",
        _ => "statement",
    }
}

fn expression_kind(expr: &Expr) -> &'static str {
    match expr {
        Expr::Lambda(_) => "lambda",
        Expr::ListComp(_) | Expr::SetComp(_) | Expr::DictComp(_) | Expr::GeneratorExp(_) => {
            "comprehension"
        }
        Expr::Set(_) => "set literal",
        Expr::JoinedStr(_) => "f-string",
        Expr::Attribute(_) => "attribute access",
        Expr::Subscript(_) => "subscript",
        Expr::Compare(_) | Expr::BoolOp(_) => "comparison",
        Expr::IfExp(_) => "conditional expression",
        _ => "expression",
    }
}
