// File: src/interpreter/value.rs
//
// Runtime value types for the Bob language: the Value sum, callable objects,
// and the operator table with its promotion laws. Arrays and dicts are shared
// by reference; two Values may observe the same underlying container.

use crate::ast::Stmt;
use crate::errors::{ErrorKind, RuntimeError};
use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::{FromPrimitive, Signed, ToPrimitive, Zero};
use std::cell::RefCell;
use std::rc::Rc;

use super::environment::Environment;
use super::Interpreter;

/// A user-defined function: parameter list, body, and captured environment.
/// `owner_class` is set for methods, `source_module` for functions defined
/// while executing an imported module.
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Rc<Vec<Stmt>>,
    pub closure: Rc<Environment>,
    pub owner_class: String,
    pub source_module: String,
}

impl Function {
    pub fn new(
        name: impl Into<String>,
        params: Vec<String>,
        body: Rc<Vec<Stmt>>,
        closure: Rc<Environment>,
    ) -> Self {
        Function {
            name: name.into(),
            params,
            body,
            closure,
            owner_class: String::new(),
            source_module: String::new(),
        }
    }
}

pub type NativeFn = Box<dyn Fn(&mut Interpreter, Vec<Value>, u32, u32) -> Result<Value, RuntimeError>>;

/// A host-provided callable.
pub struct BuiltinFunction {
    pub name: String,
    pub func: NativeFn,
}

impl BuiltinFunction {
    pub fn new(name: impl Into<String>, func: NativeFn) -> Self {
        BuiltinFunction { name: name.into(), func }
    }
}

/// Pre-evaluated call state carried by thunks and the call machinery.
#[derive(Clone)]
pub struct CallInfo {
    pub receiver: Option<Value>,
    pub method_name: Option<String>,
    pub is_super_call: bool,
    pub arguments: Vec<Value>,
    pub line: u32,
    pub column: u32,
}

impl CallInfo {
    pub fn plain(arguments: Vec<Value>, line: u32, column: u32) -> Self {
        CallInfo { receiver: None, method_name: None, is_super_call: false, arguments, line, column }
    }
}

/// A deferred tail call: the resolved callee plus its evaluated call state.
/// The trampoline in `Interpreter::evaluate` unwinds these.
pub struct Thunk {
    pub callee: Value,
    pub call: CallInfo,
}

/// A named, immutable bundle of exports.
pub struct Module {
    pub name: String,
    pub exports: IndexMap<String, Value>,
}

pub type DictMap = IndexMap<String, Value>;

#[derive(Clone)]
pub enum Value {
    None,
    Boolean(bool),
    Integer(i64),
    BigInt(Rc<BigInt>),
    Number(f64),
    Str(Rc<String>),
    Array(Rc<RefCell<Vec<Value>>>),
    Dict(Rc<RefCell<DictMap>>),
    Function(Rc<Function>),
    Builtin(Rc<BuiltinFunction>),
    Thunk(Rc<Thunk>),
    Module(Rc<Module>),
}

/// Operator failure before a source site is attached.
#[derive(Debug)]
pub struct OpError {
    pub kind: ErrorKind,
    pub message: String,
}

impl OpError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        OpError { kind, message: message.into() }
    }

    fn unsupported(op: &str, left: &Value, right: &Value) -> Self {
        OpError::new(
            ErrorKind::RuntimeError,
            format!(
                "Operator '{}' not supported between {} and {}",
                op,
                left.type_name(),
                right.type_name()
            ),
        )
    }

    pub fn at(self, line: u32, column: u32) -> RuntimeError {
        RuntimeError::new(self.kind, self.message, line, column)
    }
}

type OpResult = Result<Value, OpError>;

impl Value {
    // Helper constructors, mirroring the shared-container representation.

    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(Rc::new(s.into()))
    }

    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    pub fn dict(map: DictMap) -> Self {
        Value::Dict(Rc::new(RefCell::new(map)))
    }

    pub fn bigint(value: BigInt) -> Self {
        Value::BigInt(Rc::new(value))
    }

    pub fn function(function: Function) -> Self {
        Value::Function(Rc::new(function))
    }

    pub fn builtin(name: impl Into<String>, func: NativeFn) -> Self {
        Value::Builtin(Rc::new(BuiltinFunction::new(name, func)))
    }

    // Predicates

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Value::Boolean(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Value::Integer(_))
    }

    pub fn is_bigint(&self) -> bool {
        matches!(self, Value::BigInt(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    /// Integer or Number (the index-position rule).
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Number(_))
    }

    /// Integer or BigInt (the bitwise-operand rule).
    pub fn is_integer_like(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::BigInt(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_dict(&self) -> bool {
        matches!(self, Value::Dict(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Value::Builtin(_))
    }

    pub fn is_thunk(&self) -> bool {
        matches!(self, Value::Thunk(_))
    }

    pub fn is_module(&self) -> bool {
        matches!(self, Value::Module(_))
    }

    // Extractors. On the wrong variant these return a defined default;
    // extraction is always explicit at call sites.

    pub fn as_integer(&self) -> i64 {
        match self {
            Value::Integer(i) => *i,
            _ => 0,
        }
    }

    pub fn as_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            _ => 0.0,
        }
    }

    pub fn as_boolean(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Value::Str(s) => s,
            _ => "",
        }
    }

    /// Numeric coercion for Integer/Number operands (index positions,
    /// math module arguments).
    pub fn to_f64(&self) -> f64 {
        match self {
            Value::Integer(i) => *i as f64,
            Value::Number(n) => *n,
            Value::BigInt(b) => b.to_f64().unwrap_or(f64::INFINITY),
            _ => 0.0,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::BigInt(_) => "bigint",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Dict(_) => "dict",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin_function",
            Value::Thunk(_) => "thunk",
            Value::Module(_) => "module",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Boolean(b) => *b,
            Value::Integer(i) => *i != 0,
            Value::BigInt(b) => !b.is_zero(),
            Value::Number(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Array(a) => !a.borrow().is_empty(),
            Value::Dict(d) => !d.borrow().is_empty(),
            Value::Function(_) | Value::Builtin(_) | Value::Thunk(_) | Value::Module(_) => true,
        }
    }

    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            // Integer and BigInt compare by mathematical value.
            (Value::Integer(a), Value::BigInt(b)) | (Value::BigInt(b), Value::Integer(a)) => {
                **b == BigInt::from(*a)
            }
            (Value::Integer(a), Value::Number(b)) | (Value::Number(b), Value::Integer(a)) => {
                *a as f64 == *b
            }
            (Value::Number(n), Value::Boolean(b)) | (Value::Boolean(b), Value::Number(n)) => {
                (*n != 0.0) == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (Value::Dict(a), Value::Dict(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.iter().all(|(k, v)| b.get(k).map(|w| v.equals(w)).unwrap_or(false))
            }
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => Rc::ptr_eq(a, b),
            (Value::Thunk(a), Value::Thunk(b)) => Rc::ptr_eq(a, b),
            (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn to_display_string(&self) -> String {
        let mut seen = Vec::new();
        self.stringify(&mut seen)
    }

    fn stringify(&self, seen: &mut Vec<usize>) -> String {
        match self {
            Value::None => "none".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::BigInt(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Str(s) => s.as_ref().clone(),
            Value::Array(a) => {
                let addr = Rc::as_ptr(a) as usize;
                if seen.contains(&addr) {
                    return "[...]".to_string();
                }
                seen.push(addr);
                let parts: Vec<String> =
                    a.borrow().iter().map(|v| v.stringify(seen)).collect();
                seen.pop();
                format!("[{}]", parts.join(", "))
            }
            Value::Dict(d) => {
                let addr = Rc::as_ptr(d) as usize;
                if seen.contains(&addr) {
                    return "{...}".to_string();
                }
                seen.push(addr);
                let parts: Vec<String> = d
                    .borrow()
                    .iter()
                    .map(|(k, v)| format!("\"{}\": {}", k, v.stringify(seen)))
                    .collect();
                seen.pop();
                format!("{{{}}}", parts.join(", "))
            }
            Value::Function(f) => {
                if f.name.is_empty() {
                    "<function>".to_string()
                } else {
                    format!("<function {}>", f.name)
                }
            }
            Value::Builtin(f) => format!("<builtin_function {}>", f.name),
            Value::Thunk(_) => "<thunk>".to_string(),
            Value::Module(m) => format!("<module {}>", m.name),
        }
    }

    // Operator table. Integer op Integer stays Integer unless it overflows,
    // then promotes to BigInt; mixing with Number widens to Number.

    pub fn add(&self, other: &Value) -> OpResult {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(match a.checked_add(*b) {
                Some(v) => Value::Integer(v),
                None => Value::bigint(BigInt::from(*a) + BigInt::from(*b)),
            }),
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::Integer(a), Value::Number(b)) => Ok(Value::Number(*a as f64 + b)),
            (Value::Number(a), Value::Integer(b)) => Ok(Value::Number(a + *b as f64)),
            (Value::BigInt(a), Value::BigInt(b)) => Ok(Value::bigint(a.as_ref() + b.as_ref())),
            (Value::BigInt(a), Value::Integer(b)) => {
                Ok(Value::bigint(a.as_ref() + BigInt::from(*b)))
            }
            (Value::Integer(a), Value::BigInt(b)) => {
                Ok(Value::bigint(BigInt::from(*a) + b.as_ref()))
            }
            (Value::BigInt(a), Value::Number(b)) => {
                Ok(Value::Number(a.to_f64().unwrap_or(f64::INFINITY) + b))
            }
            (Value::Number(a), Value::BigInt(b)) => {
                Ok(Value::Number(a + b.to_f64().unwrap_or(f64::INFINITY)))
            }
            (Value::Str(a), Value::Str(b)) => Ok(Value::str(format!("{}{}", a, b))),
            (Value::Str(a), b) if b.is_coercible_to_string() => {
                Ok(Value::str(format!("{}{}", a, b.to_display_string())))
            }
            (a, Value::Str(b)) if a.is_coercible_to_string() => {
                Ok(Value::str(format!("{}{}", a.to_display_string(), b)))
            }
            _ => Err(OpError::unsupported("+", self, other)),
        }
    }

    fn is_coercible_to_string(&self) -> bool {
        matches!(
            self,
            Value::Integer(_)
                | Value::BigInt(_)
                | Value::Number(_)
                | Value::Boolean(_)
                | Value::None
        )
    }

    pub fn sub(&self, other: &Value) -> OpResult {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(match a.checked_sub(*b) {
                Some(v) => Value::Integer(v),
                None => Value::bigint(BigInt::from(*a) - BigInt::from(*b)),
            }),
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
            (Value::Integer(a), Value::Number(b)) => Ok(Value::Number(*a as f64 - b)),
            (Value::Number(a), Value::Integer(b)) => Ok(Value::Number(a - *b as f64)),
            (Value::BigInt(a), Value::BigInt(b)) => Ok(Value::bigint(a.as_ref() - b.as_ref())),
            (Value::BigInt(a), Value::Integer(b)) => {
                Ok(Value::bigint(a.as_ref() - BigInt::from(*b)))
            }
            (Value::Integer(a), Value::BigInt(b)) => {
                Ok(Value::bigint(BigInt::from(*a) - b.as_ref()))
            }
            (Value::BigInt(a), Value::Number(b)) => {
                Ok(Value::Number(a.to_f64().unwrap_or(f64::INFINITY) - b))
            }
            (Value::Number(a), Value::BigInt(b)) => {
                Ok(Value::Number(a - b.to_f64().unwrap_or(f64::INFINITY)))
            }
            _ => Err(OpError::unsupported("-", self, other)),
        }
    }

    pub fn mul(&self, other: &Value) -> OpResult {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(match a.checked_mul(*b) {
                Some(v) => Value::Integer(v),
                None => Value::bigint(BigInt::from(*a) * BigInt::from(*b)),
            }),
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
            (Value::Integer(a), Value::Number(b)) => Ok(Value::Number(*a as f64 * b)),
            (Value::Number(a), Value::Integer(b)) => Ok(Value::Number(a * *b as f64)),
            (Value::BigInt(a), Value::BigInt(b)) => Ok(Value::bigint(a.as_ref() * b.as_ref())),
            (Value::BigInt(a), Value::Integer(b)) => {
                Ok(Value::bigint(a.as_ref() * BigInt::from(*b)))
            }
            (Value::Integer(a), Value::BigInt(b)) => {
                Ok(Value::bigint(BigInt::from(*a) * b.as_ref()))
            }
            (Value::BigInt(a), Value::Number(b)) => {
                Ok(Value::Number(a.to_f64().unwrap_or(f64::INFINITY) * b))
            }
            (Value::Number(a), Value::BigInt(b)) => {
                Ok(Value::Number(a.to_f64().unwrap_or(f64::INFINITY) * b.to_f64().unwrap_or(f64::INFINITY)))
            }
            (Value::Str(s), n) | (n, Value::Str(s)) if n.is_numeric() => {
                let count = match n {
                    Value::Integer(i) => *i,
                    Value::Number(f) => *f as i64,
                    _ => 0,
                };
                Ok(Value::str(s.repeat(count.max(0) as usize)))
            }
            (Value::Str(_), _) | (_, Value::Str(_)) => Err(OpError::new(
                ErrorKind::InvalidStringMultiplication,
                format!(
                    "Cannot multiply {} and {}",
                    self.type_name(),
                    other.type_name()
                ),
            )),
            _ => Err(OpError::unsupported("*", self, other)),
        }
    }

    pub fn div(&self, other: &Value) -> OpResult {
        if other.divisor_is_zero() {
            return Err(OpError::new(ErrorKind::DivisionByZero, "Division by zero"));
        }
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(match a.checked_div(*b) {
                Some(v) => Value::Integer(v),
                None => Value::bigint(BigInt::from(*a) / BigInt::from(*b)),
            }),
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
            (Value::Integer(a), Value::Number(b)) => Ok(Value::Number(*a as f64 / b)),
            (Value::Number(a), Value::Integer(b)) => Ok(Value::Number(a / *b as f64)),
            (Value::BigInt(a), Value::BigInt(b)) => Ok(Value::bigint(a.as_ref() / b.as_ref())),
            (Value::BigInt(a), Value::Integer(b)) => {
                Ok(Value::bigint(a.as_ref() / BigInt::from(*b)))
            }
            (Value::Integer(a), Value::BigInt(b)) => {
                Ok(Value::bigint(BigInt::from(*a) / b.as_ref()))
            }
            (Value::BigInt(a), Value::Number(b)) => {
                Ok(Value::Number(a.to_f64().unwrap_or(f64::INFINITY) / b))
            }
            (Value::Number(a), Value::BigInt(b)) => {
                Ok(Value::Number(a / b.to_f64().unwrap_or(f64::INFINITY)))
            }
            _ => Err(OpError::unsupported("/", self, other)),
        }
    }

    pub fn rem(&self, other: &Value) -> OpResult {
        if other.divisor_is_zero() {
            return Err(OpError::new(ErrorKind::ModuloByZero, "Modulo by zero"));
        }
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => {
                Ok(Value::Integer(a.checked_rem(*b).unwrap_or(0)))
            }
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a % b)),
            (Value::Integer(a), Value::Number(b)) => Ok(Value::Number(*a as f64 % b)),
            (Value::Number(a), Value::Integer(b)) => Ok(Value::Number(a % *b as f64)),
            (Value::BigInt(a), Value::BigInt(b)) => Ok(Value::bigint(a.as_ref() % b.as_ref())),
            (Value::BigInt(a), Value::Integer(b)) => {
                Ok(Value::bigint(a.as_ref() % BigInt::from(*b)))
            }
            (Value::Integer(a), Value::BigInt(b)) => {
                Ok(Value::bigint(BigInt::from(*a) % b.as_ref()))
            }
            _ => Err(OpError::unsupported("%", self, other)),
        }
    }

    fn divisor_is_zero(&self) -> bool {
        match self {
            Value::Integer(0) => true,
            Value::Number(n) => *n == 0.0,
            Value::BigInt(b) => b.is_zero(),
            _ => false,
        }
    }

    pub fn bitand(&self, other: &Value) -> OpResult {
        self.bitwise("&", other, |a, b| a & b, |a, b| a & b)
    }

    pub fn bitor(&self, other: &Value) -> OpResult {
        self.bitwise("|", other, |a, b| a | b, |a, b| a | b)
    }

    pub fn bitxor(&self, other: &Value) -> OpResult {
        self.bitwise("^", other, |a, b| a ^ b, |a, b| a ^ b)
    }

    fn bitwise(
        &self,
        op: &str,
        other: &Value,
        int_op: fn(i64, i64) -> i64,
        big_op: fn(&BigInt, &BigInt) -> BigInt,
    ) -> OpResult {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(int_op(*a, *b))),
            (Value::BigInt(a), Value::BigInt(b)) => Ok(Value::bigint(big_op(a, b))),
            (Value::BigInt(a), Value::Integer(b)) => {
                Ok(Value::bigint(big_op(a, &BigInt::from(*b))))
            }
            (Value::Integer(a), Value::BigInt(b)) => {
                Ok(Value::bigint(big_op(&BigInt::from(*a), b)))
            }
            _ => Err(OpError::unsupported(op, self, other)),
        }
    }

    pub fn shl(&self, other: &Value) -> OpResult {
        let amount = other.shift_amount("<<", self, other)?;
        match self {
            Value::Integer(a) => {
                if amount < 64 {
                    let wide = (*a as i128) << amount;
                    if let Ok(v) = i64::try_from(wide) {
                        return Ok(Value::Integer(v));
                    }
                }
                Ok(Value::bigint(BigInt::from(*a) << amount))
            }
            Value::BigInt(a) => Ok(Value::bigint(a.as_ref() << amount)),
            _ => Err(OpError::unsupported("<<", self, other)),
        }
    }

    pub fn shr(&self, other: &Value) -> OpResult {
        let amount = other.shift_amount(">>", self, other)?;
        match self {
            Value::Integer(a) => {
                if amount >= 64 {
                    Ok(Value::Integer(if *a < 0 { -1 } else { 0 }))
                } else {
                    Ok(Value::Integer(a >> amount))
                }
            }
            Value::BigInt(a) => Ok(Value::bigint(a.as_ref() >> amount)),
            _ => Err(OpError::unsupported(">>", self, other)),
        }
    }

    fn shift_amount(&self, op: &str, left: &Value, right: &Value) -> Result<usize, OpError> {
        match self {
            Value::Integer(n) if *n >= 0 => Ok(*n as usize),
            Value::BigInt(b) if !b.is_negative() => {
                b.to_usize().ok_or_else(|| {
                    OpError::new(ErrorKind::RuntimeError, "Shift amount too large")
                })
            }
            Value::Integer(_) | Value::BigInt(_) => {
                Err(OpError::new(ErrorKind::RuntimeError, "Negative shift amount"))
            }
            _ => Err(OpError::unsupported(op, left, right)),
        }
    }

    /// Comparison for `<`, `<=`, `>`, `>=`; defined for numeric variants and
    /// BigInt, including mixed operands.
    pub fn compare(&self, op: &str, other: &Value) -> OpResult {
        let ordering = match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.partial_cmp(b),
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Number(b)) => (*a as f64).partial_cmp(b),
            (Value::Number(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Value::BigInt(a), Value::BigInt(b)) => a.partial_cmp(b),
            (Value::BigInt(a), Value::Integer(b)) => a.as_ref().partial_cmp(&BigInt::from(*b)),
            (Value::Integer(a), Value::BigInt(b)) => BigInt::from(*a).partial_cmp(b.as_ref()),
            (Value::BigInt(a), Value::Number(b)) => {
                let rhs = BigInt::from_f64(b.trunc()).unwrap_or_default();
                a.as_ref().partial_cmp(&rhs)
            }
            (Value::Number(a), Value::BigInt(b)) => {
                let lhs = BigInt::from_f64(a.trunc()).unwrap_or_default();
                lhs.partial_cmp(b.as_ref())
            }
            _ => return Err(OpError::unsupported(op, self, other)),
        };

        let ordering = match ordering {
            Some(o) => o,
            None => return Ok(Value::Boolean(false)), // NaN comparisons
        };
        let result = match op {
            "<" => ordering == std::cmp::Ordering::Less,
            "<=" => ordering != std::cmp::Ordering::Greater,
            ">" => ordering == std::cmp::Ordering::Greater,
            ">=" => ordering != std::cmp::Ordering::Less,
            _ => return Err(OpError::unsupported(op, self, other)),
        };
        Ok(Value::Boolean(result))
    }

    /// Unary minus. `-i64::MIN` promotes to BigInt.
    pub fn negate(&self) -> OpResult {
        match self {
            Value::Integer(i) => Ok(match i.checked_neg() {
                Some(v) => Value::Integer(v),
                None => Value::bigint(-BigInt::from(*i)),
            }),
            Value::Number(n) => Ok(Value::Number(-n)),
            Value::BigInt(b) => Ok(Value::bigint(-b.as_ref().clone())),
            _ => Err(OpError::new(
                ErrorKind::RuntimeError,
                format!("Operand must be a number when using: -, got {}", self.type_name()),
            )),
        }
    }

    /// Bitwise not for integer-like values; Numbers are truncated first.
    pub fn bit_not(&self) -> OpResult {
        match self {
            Value::Integer(i) => Ok(Value::Integer(!i)),
            Value::Number(n) => Ok(Value::Number(!(*n as i64) as f64)),
            Value::BigInt(b) => Ok(Value::bigint(-(b.as_ref() + BigInt::from(1)))),
            _ => Err(OpError::new(
                ErrorKind::RuntimeError,
                format!("Operand must be a number when using: ~, got {}", self.type_name()),
            )),
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Boolean(b) => write!(f, "Boolean({})", b),
            Value::Integer(i) => write!(f, "Integer({})", i),
            Value::BigInt(b) => write!(f, "BigInt({})", b),
            Value::Number(n) => write!(f, "Number({})", n),
            Value::Str(s) => write!(f, "Str({:?})", s.as_ref()),
            Value::Array(a) => write!(f, "Array[{}]", a.borrow().len()),
            Value::Dict(d) => write!(f, "Dict{{{} keys}}", d.borrow().len()),
            Value::Function(func) => {
                write!(f, "Function({}, {} params)", func.name, func.params.len())
            }
            Value::Builtin(func) => write!(f, "Builtin({})", func.name),
            Value::Thunk(_) => write!(f, "Thunk"),
            Value::Module(m) => write!(f, "Module({}, {} exports)", m.name, m.exports.len()),
        }
    }
}

/// Shared pool of small integer values, used by literal evaluation.
pub struct SmallIntPool {
    values: Vec<Value>,
}

impl SmallIntPool {
    pub const MIN: i64 = -128;
    pub const MAX: i64 = 127;

    pub fn new() -> Self {
        SmallIntPool { values: (Self::MIN..=Self::MAX).map(Value::Integer).collect() }
    }

    pub fn get(&self, value: i64) -> Option<Value> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Some(self.values[(value - Self::MIN) as usize].clone())
        } else {
            None
        }
    }
}

impl Default for SmallIntPool {
    fn default() -> Self {
        Self::new()
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() || n.is_infinite() {
        return format!("{}", n);
    }
    if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_addition_promotes_on_overflow() {
        let result = Value::Integer(i64::MAX).add(&Value::Integer(1)).unwrap();
        assert!(result.is_bigint());
        assert_eq!(result.to_display_string(), "9223372036854775808");

        let result = Value::Integer(1).add(&Value::Integer(2)).unwrap();
        assert!(matches!(result, Value::Integer(3)));
    }

    #[test]
    fn mixing_with_number_widens() {
        let result = Value::Integer(3).add(&Value::Number(0.5)).unwrap();
        assert!(matches!(result, Value::Number(n) if n == 3.5));
        let result = Value::Number(1.5).mul(&Value::Integer(2)).unwrap();
        assert!(matches!(result, Value::Number(n) if n == 3.0));
    }

    #[test]
    fn string_concat_and_coercion() {
        let result = Value::str("a").add(&Value::str("b")).unwrap();
        assert_eq!(result.to_display_string(), "ab");
        let result = Value::str("n=").add(&Value::Integer(7)).unwrap();
        assert_eq!(result.to_display_string(), "n=7");
        let result = Value::Integer(7).add(&Value::str("!")).unwrap();
        assert_eq!(result.to_display_string(), "7!");
        let result = Value::str("x").add(&Value::None).unwrap();
        assert_eq!(result.to_display_string(), "xnone");
        assert!(Value::str("x").add(&Value::array(vec![])).is_err());
    }

    #[test]
    fn string_repetition() {
        let result = Value::str("ab").mul(&Value::Integer(3)).unwrap();
        assert_eq!(result.to_display_string(), "ababab");
        let result = Value::str("ab").mul(&Value::Integer(-2)).unwrap();
        assert_eq!(result.to_display_string(), "");
        let err = Value::str("ab").mul(&Value::str("cd")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidStringMultiplication);
    }

    #[test]
    fn division_and_modulo_by_zero() {
        let err = Value::Integer(1).div(&Value::Integer(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivisionByZero);
        let err = Value::Number(1.0).div(&Value::Number(0.0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivisionByZero);
        let err = Value::Integer(1).rem(&Value::Integer(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ModuloByZero);
    }

    #[test]
    fn bitwise_requires_integer_like() {
        assert!(Value::Integer(6).bitand(&Value::Integer(3)).is_ok());
        assert!(Value::Integer(6)
            .bitand(&Value::bigint(BigInt::from(3)))
            .is_ok());
        assert!(Value::Number(6.0).bitand(&Value::Number(3.0)).is_err());
    }

    #[test]
    fn shift_left_promotes_past_i64() {
        let result = Value::Integer(1).shl(&Value::Integer(10)).unwrap();
        assert!(matches!(result, Value::Integer(1024)));
        let result = Value::Integer(1).shl(&Value::Integer(70)).unwrap();
        assert!(result.is_bigint());
    }

    #[test]
    fn comparisons_across_numeric_variants() {
        let big = Value::bigint(BigInt::from(i64::MAX) * 2);
        assert!(Value::Integer(5).compare("<", &Value::Number(5.5)).unwrap().truthy());
        assert!(big.compare(">", &Value::Integer(10)).unwrap().truthy());
        assert!(Value::Number(1e20).compare(">", &Value::Integer(1)).unwrap().truthy());
        assert!(Value::str("a").compare("<", &Value::Integer(1)).is_err());
    }

    #[test]
    fn equality_laws() {
        // Reflexive and symmetric
        let arr = Value::array(vec![Value::Integer(1), Value::str("x")]);
        assert!(arr.equals(&arr));
        let other = Value::array(vec![Value::Integer(1), Value::str("x")]);
        assert!(arr.equals(&other) && other.equals(&arr));

        // Cross-variant rules
        assert!(Value::Integer(3).equals(&Value::Number(3.0)));
        assert!(Value::Number(0.0).equals(&Value::Boolean(false)));
        assert!(Value::Number(2.0).equals(&Value::Boolean(true)));
        assert!(Value::Integer(42).equals(&Value::bigint(BigInt::from(42))));
        assert!(!Value::Integer(0).equals(&Value::str("0")));
        assert!(!Value::None.equals(&Value::Boolean(false)));

        // Functions compare by identity
        let f = Value::builtin("f", Box::new(|_, _, _, _| Ok(Value::None)));
        let g = Value::builtin("f", Box::new(|_, _, _, _| Ok(Value::None)));
        assert!(f.equals(&f.clone()));
        assert!(!f.equals(&g));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::None.truthy());
        assert!(!Value::Integer(0).truthy());
        assert!(!Value::Number(0.0).truthy());
        assert!(!Value::str("").truthy());
        assert!(!Value::array(vec![]).truthy());
        assert!(Value::Integer(-1).truthy());
        assert!(Value::str("x").truthy());
        assert!(Value::array(vec![Value::None]).truthy());
    }

    #[test]
    fn stringification() {
        assert_eq!(Value::Integer(42).to_display_string(), "42");
        assert_eq!(Value::Number(1.5).to_display_string(), "1.5");
        assert_eq!(Value::Number(3.0).to_display_string(), "3");
        assert_eq!(
            Value::array(vec![Value::Integer(1), Value::str("a")]).to_display_string(),
            "[1, a]"
        );
        let mut map = DictMap::new();
        map.insert("k".to_string(), Value::Integer(2));
        assert_eq!(Value::dict(map).to_display_string(), "{\"k\": 2}");
    }

    #[test]
    fn cyclic_containers_stringify_finitely() {
        let arr = Value::array(vec![Value::Integer(1)]);
        if let Value::Array(inner) = &arr {
            inner.borrow_mut().push(arr.clone());
        }
        assert_eq!(arr.to_display_string(), "[1, [...]]");

        let dict = Value::dict(DictMap::new());
        if let Value::Dict(inner) = &dict {
            inner.borrow_mut().insert("self".to_string(), dict.clone());
        }
        assert_eq!(dict.to_display_string(), "{\"self\": {...}}");
    }

    #[test]
    fn negation_promotes_min_integer() {
        let result = Value::Integer(i64::MIN).negate().unwrap();
        assert!(result.is_bigint());
        assert_eq!(result.to_display_string(), "9223372036854775808");
    }

    #[test]
    fn shared_containers_alias() {
        let a = Value::array(vec![Value::Integer(1)]);
        let b = a.clone();
        if let Value::Array(arr) = &a {
            arr.borrow_mut().push(Value::Integer(2));
        }
        if let Value::Array(arr) = &b {
            assert_eq!(arr.borrow().len(), 2);
        }
    }

    #[test]
    fn small_int_pool_covers_range() {
        let pool = SmallIntPool::new();
        assert!(pool.get(-128).unwrap().equals(&Value::Integer(-128)));
        assert!(pool.get(127).unwrap().equals(&Value::Integer(127)));
        assert!(pool.get(128).is_none());
        assert!(pool.get(-129).is_none());
    }
}
