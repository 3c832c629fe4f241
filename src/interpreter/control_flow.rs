// File: src/interpreter/control_flow.rs
//
// Per-call control token threaded through statement execution. Child
// statements set these flags to effect return/break/continue/throw without
// unwinding the host call stack across call boundaries.

use super::value::Value;

pub struct ExecutionContext {
    pub is_function_body: bool,
    pub has_return: bool,
    pub return_value: Value,
    pub should_break: bool,
    pub should_continue: bool,
    pub has_throw: bool,
    pub thrown_value: Value,
    pub throw_line: u32,
    pub throw_column: u32,
}

impl ExecutionContext {
    pub fn new() -> Self {
        ExecutionContext {
            is_function_body: false,
            has_return: false,
            return_value: Value::None,
            should_break: false,
            should_continue: false,
            has_throw: false,
            thrown_value: Value::None,
            throw_line: 0,
            throw_column: 0,
        }
    }

    pub fn function_body() -> Self {
        let mut ctx = Self::new();
        ctx.is_function_body = true;
        ctx
    }

    /// Loop bodies run in a child context so break/continue are observed
    /// locally while return and throw propagate.
    pub fn loop_child(&self) -> Self {
        let mut ctx = Self::new();
        ctx.is_function_body = self.is_function_body;
        ctx
    }

    /// True when any non-local transfer is pending.
    pub fn interrupted(&self) -> bool {
        self.has_return || self.should_break || self.should_continue || self.has_throw
    }

    pub fn set_throw(&mut self, value: Value, line: u32, column: u32) {
        self.has_throw = true;
        self.thrown_value = value;
        self.throw_line = line;
        self.throw_column = column;
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}
