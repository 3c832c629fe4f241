// File: src/interpreter/evaluator.rs
//
// Expression evaluation: one exhaustive match over Expr, with the property
// read/write rules and the tail-call wrapping for Call nodes. Runs against
// the interpreter's current environment.

use crate::ast::{BinaryOp, Expr, IncrementOp, Literal, UnaryOp};
use crate::errors::{ErrorKind, RuntimeError};
use std::rc::Rc;

use super::value::{Function, Thunk, Value};
use super::{dict_class_of, Environment, Interpreter, CLASS_KEY, SUPER_KEY};

impl Interpreter {
    pub(crate) fn evaluate_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal { value, .. } => Ok(self.literal_value(value)),
            Expr::Grouping { expression } => self.evaluate(expression),
            Expr::Var { name, line, column } => self.lookup_variable(name, *line, *column),
            Expr::Unary { op, operand, line, column } => {
                let value = self.evaluate(operand)?;
                let result = match op {
                    UnaryOp::Minus => value.negate(),
                    UnaryOp::Bang => return Ok(Value::Boolean(!value.truthy())),
                    UnaryOp::BitNot => value.bit_not(),
                };
                result.map_err(|e| self.fail(*line, *column, e.kind, e.message))
            }
            Expr::Binary { left, op, right, line, column } => {
                self.evaluate_binary(left, *op, right, *line, *column)
            }
            Expr::Ternary { condition, then_expr, else_expr } => {
                let condition = self.evaluate(condition)?;
                if condition.truthy() {
                    self.evaluate(then_expr)
                } else {
                    self.evaluate(else_expr)
                }
            }
            Expr::Call { callee, arguments, is_tail_call, line, column } => {
                self.evaluate_call(callee, arguments, *is_tail_call, *line, *column)
            }
            Expr::Assign { name, op, value, line, column } => {
                self.evaluate_assign(name, *op, value, *line, *column)
            }
            Expr::Increment { op, operand, is_prefix, line, column } => {
                self.evaluate_increment(*op, operand, *is_prefix, *line, *column)
            }
            Expr::ArrayLiteral { elements } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate(element)?);
                }
                Ok(Value::array(values))
            }
            Expr::DictLiteral { pairs } => {
                let mut map = super::DictMap::new();
                for (key, value_expr) in pairs {
                    let value = self.evaluate(value_expr)?;
                    map.insert(key.clone(), value);
                }
                Ok(Value::dict(map))
            }
            Expr::ArrayIndex { collection, index, line, column } => {
                let collection = self.evaluate(collection)?;
                let index = self.evaluate(index)?;
                self.read_index(&collection, &index, *line, *column)
            }
            Expr::ArrayAssign { collection, index, value, line, column } => {
                let collection = self.evaluate(collection)?;
                let index = self.evaluate(index)?;
                let value = self.evaluate(value)?;
                self.write_index(&collection, &index, value, *line, *column)
            }
            Expr::Property { object, name, line, column } => {
                let object = self.evaluate(object)?;
                self.read_property(&object, name, *line, *column)
            }
            Expr::PropertyAssign { object, name, value, line, column } => {
                let object = self.evaluate(object)?;
                let value = self.evaluate(value)?;
                self.write_property(&object, name, value, *line, *column)
            }
            Expr::FunctionExpr { params, body } => {
                let closure = Environment::capture_for_closure(&self.environment());
                let function = Function::new("", params.clone(), Rc::clone(body), closure);
                Ok(Value::function(function))
            }
        }
    }

    fn literal_value(&self, literal: &Literal) -> Value {
        match literal {
            Literal::None => Value::None,
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::Integer(i) => self.small_ints.get(*i).unwrap_or(Value::Integer(*i)),
            Literal::BigIntLit(digits) => {
                let parsed = digits.parse().unwrap_or_default();
                Value::bigint(parsed)
            }
            Literal::Number(n) => Value::Number(*n),
            Literal::Str(s) => Value::str(s.clone()),
        }
    }

    fn lookup_variable(&mut self, name: &str, line: u32, column: u32) -> Result<Value, RuntimeError> {
        // `super` in a method frame resolves to a synthetic parent-class
        // object that drives super-dispatch.
        if name == "super" {
            if let Some(Value::Str(current_class)) = self.environment().get(super::CURRENT_CLASS_KEY)
            {
                let parent = self.class_registry.parent_of(&current_class);
                if !parent.is_empty() {
                    let mut map = super::DictMap::new();
                    map.insert(CLASS_KEY.to_string(), Value::str(parent));
                    map.insert(SUPER_KEY.to_string(), Value::Boolean(true));
                    return Ok(Value::dict(map));
                }
            }
        }

        match self.environment().get(name) {
            Some(value) => Ok(value),
            None => Err(self.fail(
                line,
                column,
                ErrorKind::RuntimeError,
                format!("Undefined variable '{}'", name),
            )),
        }
    }

    fn evaluate_binary(
        &mut self,
        left: &Expr,
        op: BinaryOp,
        right: &Expr,
        line: u32,
        column: u32,
    ) -> Result<Value, RuntimeError> {
        // Logical operators short-circuit and return the operand that
        // decided the outcome, not a coerced boolean.
        if op == BinaryOp::And {
            let left = self.evaluate(left)?;
            if !left.truthy() {
                return Ok(left);
            }
            return self.evaluate(right);
        }
        if op == BinaryOp::Or {
            let left = self.evaluate(left)?;
            if left.truthy() {
                return Ok(left);
            }
            return self.evaluate(right);
        }

        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;

        match op {
            BinaryOp::EqualEqual => Ok(Value::Boolean(left.equals(&right))),
            BinaryOp::BangEqual => Ok(Value::Boolean(!left.equals(&right))),
            _ => self
                .apply_binary_op(&left, op, &right)
                .map_err(|e| self.fail(line, column, e.kind, e.message)),
        }
    }

    pub(crate) fn apply_binary_op(
        &self,
        left: &Value,
        op: BinaryOp,
        right: &Value,
    ) -> Result<Value, super::value::OpError> {
        match op {
            BinaryOp::Plus => left.add(right),
            BinaryOp::Minus => left.sub(right),
            BinaryOp::Star => left.mul(right),
            BinaryOp::Slash => left.div(right),
            BinaryOp::Percent => left.rem(right),
            BinaryOp::BitAnd => left.bitand(right),
            BinaryOp::BitOr => left.bitor(right),
            BinaryOp::BitXor => left.bitxor(right),
            BinaryOp::Shl => left.shl(right),
            BinaryOp::Shr => left.shr(right),
            BinaryOp::Greater | BinaryOp::GreaterEqual | BinaryOp::Less | BinaryOp::LessEqual => {
                left.compare(op.lexeme(), right)
            }
            // Handled before dispatching here.
            BinaryOp::EqualEqual | BinaryOp::BangEqual | BinaryOp::And | BinaryOp::Or => {
                unreachable!("logical and equality operators are evaluated earlier")
            }
        }
    }

    fn evaluate_call(
        &mut self,
        callee_expr: &Expr,
        arguments: &[Expr],
        is_tail_call: bool,
        line: u32,
        column: u32,
    ) -> Result<Value, RuntimeError> {
        let (callee, info) = self.analyze_call(callee_expr, arguments, line, column)?;
        let callee = self.resolve_callee(callee, &info)?;

        if is_tail_call {
            let thunk = Rc::new(Thunk { callee, call: info });
            self.function_registry.add_thunk(Rc::clone(&thunk));
            return Ok(Value::Thunk(thunk));
        }

        // A non-tail call site needs a concrete value even while a thunk is
        // being unwound, so force here regardless of the trampoline flag.
        let result = self.execute_call(callee, &info)?;
        self.force_thunks(result)
    }

    fn evaluate_assign(
        &mut self,
        name: &str,
        op: Option<BinaryOp>,
        value_expr: &Expr,
        line: u32,
        column: u32,
    ) -> Result<Value, RuntimeError> {
        let value = self.evaluate(value_expr)?;

        let Some(op) = op else {
            // Assign first so references held by the old value are released,
            // then compact the registries.
            if self.environment().assign(name, value.clone()).is_err() {
                return Err(self.fail(
                    line,
                    column,
                    ErrorKind::RuntimeError,
                    format!("Undefined variable '{}'", name),
                ));
            }
            self.function_registry.force_compact();
            return Ok(value);
        };

        let current = self.lookup_variable(name, line, column)?;
        let new_value = self
            .apply_binary_op(&current, op, &value)
            .map_err(|e| self.fail(line, column, e.kind, e.message))?;
        if self.environment().assign(name, new_value.clone()).is_err() {
            return Err(self.fail(
                line,
                column,
                ErrorKind::RuntimeError,
                format!("Undefined variable '{}'", name),
            ));
        }
        Ok(new_value)
    }

    fn evaluate_increment(
        &mut self,
        op: IncrementOp,
        operand: &Expr,
        is_prefix: bool,
        line: u32,
        column: u32,
    ) -> Result<Value, RuntimeError> {
        let current = self.evaluate(operand)?;
        if !current.is_numeric() && !current.is_bigint() {
            return Err(self.fail(
                line,
                column,
                ErrorKind::RuntimeError,
                "Increment/decrement can only be applied to numbers or integers.",
            ));
        }

        let delta = Value::Integer(1);
        let new_value = match op {
            IncrementOp::Increment => current.add(&delta),
            IncrementOp::Decrement => current.sub(&delta),
        }
        .map_err(|e| self.fail(line, column, e.kind, e.message))?;

        match operand {
            Expr::Var { name, .. } => {
                if self.environment().assign(name, new_value.clone()).is_err() {
                    return Err(self.fail(
                        line,
                        column,
                        ErrorKind::RuntimeError,
                        format!("Undefined variable '{}'", name),
                    ));
                }
            }
            Expr::ArrayIndex { collection, index, line: bline, column: bcolumn } => {
                let collection = self.evaluate(collection)?;
                let index = self.evaluate(index)?;
                if collection.is_string() {
                    return Err(self.fail(
                        line,
                        column,
                        ErrorKind::RuntimeError,
                        "Cannot increment/decrement string characters (strings are immutable)",
                    ));
                }
                self.write_index(&collection, &index, new_value.clone(), *bline, *bcolumn)?;
            }
            Expr::Property { object, name, line: pline, column: pcolumn } => {
                let object = self.evaluate(object)?;
                self.write_property(&object, name, new_value.clone(), *pline, *pcolumn)?;
            }
            _ => {
                return Err(self.fail(
                    line,
                    column,
                    ErrorKind::RuntimeError,
                    "Increment/decrement can only be applied to variables, array elements, or properties.",
                ));
            }
        }

        Ok(if is_prefix { new_value } else { current })
    }

    pub(crate) fn read_index(
        &mut self,
        collection: &Value,
        index: &Value,
        line: u32,
        column: u32,
    ) -> Result<Value, RuntimeError> {
        match collection {
            Value::Array(array) => {
                if !index.is_numeric() {
                    return Err(self.fail(
                        line,
                        column,
                        ErrorKind::RuntimeError,
                        "Array index must be a number",
                    ));
                }
                let idx = index_as_i64(index);
                let array = array.borrow();
                if idx < 0 || idx as usize >= array.len() {
                    drop(array);
                    return Err(self.fail(
                        line,
                        column,
                        ErrorKind::RuntimeError,
                        "Array index out of bounds",
                    ));
                }
                Ok(array[idx as usize].clone())
            }
            Value::Dict(dict) => {
                let Value::Str(key) = index else {
                    return Err(self.fail(
                        line,
                        column,
                        ErrorKind::RuntimeError,
                        "Dictionary key must be a string",
                    ));
                };
                // Missing keys read as none, not an error.
                Ok(dict.borrow().get(key.as_str()).cloned().unwrap_or(Value::None))
            }
            Value::Str(text) => {
                if !index.is_numeric() {
                    return Err(self.fail(
                        line,
                        column,
                        ErrorKind::RuntimeError,
                        "String index must be a number",
                    ));
                }
                let chars: Vec<char> = text.chars().collect();
                let mut idx = index_as_i64(index);
                // Negative string indices wrap from the end.
                if idx < 0 {
                    idx += chars.len() as i64;
                }
                if idx < 0 || idx as usize >= chars.len() {
                    return Err(self.fail(
                        line,
                        column,
                        ErrorKind::RuntimeError,
                        "String index out of bounds",
                    ));
                }
                Ok(Value::str(chars[idx as usize].to_string()))
            }
            _ => Err(self.fail(
                line,
                column,
                ErrorKind::RuntimeError,
                "Can only index arrays, dictionaries, and strings",
            )),
        }
    }

    pub(crate) fn write_index(
        &mut self,
        collection: &Value,
        index: &Value,
        value: Value,
        line: u32,
        column: u32,
    ) -> Result<Value, RuntimeError> {
        match collection {
            Value::Array(array) => {
                if !index.is_numeric() {
                    return Err(self.fail(
                        line,
                        column,
                        ErrorKind::RuntimeError,
                        "Array index must be a number",
                    ));
                }
                let idx = index_as_i64(index);
                let mut array = array.borrow_mut();
                if idx < 0 || idx as usize >= array.len() {
                    drop(array);
                    return Err(self.fail(
                        line,
                        column,
                        ErrorKind::RuntimeError,
                        "Array index out of bounds",
                    ));
                }
                array[idx as usize] = value.clone();
                Ok(value)
            }
            Value::Dict(dict) => {
                let Value::Str(key) = index else {
                    return Err(self.fail(
                        line,
                        column,
                        ErrorKind::RuntimeError,
                        "Dictionary key must be a string",
                    ));
                };
                dict.borrow_mut().insert(key.as_ref().clone(), value.clone());
                Ok(value)
            }
            Value::Str(_) => Err(self.fail(
                line,
                column,
                ErrorKind::RuntimeError,
                "Cannot assign to string characters (strings are immutable)",
            )),
            _ => Err(self.fail(
                line,
                column,
                ErrorKind::RuntimeError,
                "Can only assign to array or dictionary elements",
            )),
        }
    }

    /// Property read rules, §ordered: modules read exports; class instances
    /// try methods, then stored fields, then dict built-ins; plain
    /// containers expose value properties and bound built-in methods.
    pub(crate) fn read_property(
        &mut self,
        object: &Value,
        name: &str,
        line: u32,
        column: u32,
    ) -> Result<Value, RuntimeError> {
        match object {
            Value::Module(module) => {
                Ok(module.exports.get(name).cloned().unwrap_or(Value::None))
            }
            Value::Dict(dict) => {
                if let Some(class_name) = dict_class_of(object) {
                    // Methods on the class or an ancestor win over fields.
                    if self.class_registry.has_method(&class_name, name)
                        || self.walk_class_extension_names(&class_name, name)
                    {
                        return Ok(self.make_instance_dispatcher(object, &class_name, name));
                    }
                }
                let stored = dict.borrow().get(name).cloned();
                if let Some(stored) = stored {
                    return Ok(stored);
                }
                if let Some(value) = self.dict_value_property(dict, name) {
                    return Ok(value);
                }
                if let Some(method) = self.builtin_method("dict", name, object) {
                    return Ok(method);
                }
                if let Some(found) = self.extension_registry.lookup("dict", name) {
                    return Ok(Value::Function(found));
                }
                if let Some(found) = self.extension_registry.lookup("any", name) {
                    return Ok(Value::Function(found));
                }
                Ok(Value::None)
            }
            Value::Array(array) => {
                let array_ref = array.borrow();
                match name {
                    "len" | "length" => return Ok(Value::Integer(array_ref.len() as i64)),
                    "empty" => return Ok(Value::Boolean(array_ref.is_empty())),
                    "first" => return Ok(array_ref.first().cloned().unwrap_or(Value::None)),
                    "last" => return Ok(array_ref.last().cloned().unwrap_or(Value::None)),
                    _ => {}
                }
                drop(array_ref);
                if let Some(method) = self.builtin_method("array", name, object) {
                    return Ok(method);
                }
                if let Some(found) = self.extension_registry.lookup("array", name) {
                    return Ok(Value::Function(found));
                }
                if let Some(found) = self.extension_registry.lookup("any", name) {
                    return Ok(Value::Function(found));
                }
                Ok(Value::None)
            }
            Value::Str(text) => {
                match name {
                    "len" | "length" => return Ok(Value::Integer(text.chars().count() as i64)),
                    "empty" => return Ok(Value::Boolean(text.is_empty())),
                    _ => {}
                }
                if let Some(found) = self.extension_registry.lookup("string", name) {
                    return Ok(Value::Function(found));
                }
                if let Some(found) = self.extension_registry.lookup("any", name) {
                    return Ok(Value::Function(found));
                }
                Ok(Value::None)
            }
            Value::Integer(_) | Value::Number(_) => {
                if let Some(method) = self.builtin_method("number", name, object) {
                    return Ok(method);
                }
                if let Some(found) = self.extension_registry.lookup("number", name) {
                    return Ok(Value::Function(found));
                }
                if let Some(found) = self.extension_registry.lookup("any", name) {
                    return Ok(Value::Function(found));
                }
                Ok(Value::None)
            }
            _ => Err(self.fail(
                line,
                column,
                ErrorKind::RuntimeError,
                format!("Cannot access property '{}' on {}", name, object.type_name()),
            )),
        }
    }

    fn walk_class_extension_names(&self, class_name: &str, method_name: &str) -> bool {
        let mut cursor = class_name.to_string();
        let mut guard = 0;
        while !cursor.is_empty() && guard < super::registries::INHERITANCE_DEPTH_GUARD {
            if self.extension_registry.lookup(&cursor, method_name).is_some() {
                return true;
            }
            cursor = self.class_registry.parent_of(&cursor);
            guard += 1;
        }
        false
    }

    fn dict_value_property(
        &self,
        dict: &Rc<std::cell::RefCell<super::DictMap>>,
        name: &str,
    ) -> Option<Value> {
        let dict = dict.borrow();
        match name {
            "len" | "length" => Some(Value::Integer(dict.len() as i64)),
            "empty" => Some(Value::Boolean(dict.is_empty())),
            _ => None,
        }
    }

    pub(crate) fn write_property(
        &mut self,
        object: &Value,
        name: &str,
        value: Value,
        line: u32,
        column: u32,
    ) -> Result<Value, RuntimeError> {
        match object {
            Value::Module(_) => Err(self.fail(
                line,
                column,
                ErrorKind::ImportError,
                format!("Cannot assign property '{}' on module (immutable)", name),
            )),
            Value::Dict(dict) => {
                dict.borrow_mut().insert(name.to_string(), value.clone());
                Ok(value)
            }
            _ => Err(self.fail(
                line,
                column,
                ErrorKind::RuntimeError,
                format!("Cannot assign property '{}' on {}", name, object.type_name()),
            )),
        }
    }

    /// Dimmed value echo for interactive expression statements.
    pub(crate) fn echo_value(&mut self, value: &Value) {
        use colored::Colorize;
        let rendered = format!("[{}]", value.to_display_string());
        println!("{}", rendered.dimmed());
    }

}

fn index_as_i64(index: &Value) -> i64 {
    match index {
        Value::Integer(i) => *i,
        Value::Number(n) => *n as i64,
        _ => 0,
    }
}
