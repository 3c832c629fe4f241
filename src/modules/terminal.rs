// File: src/modules/terminal.rs
//
// Terminal facts. size() falls back to 80x24 when stdout is not a tty.

use crate::interpreter::{Interpreter, Value};
use terminal_size::{terminal_size, Height, Width};

pub fn register(interp: &mut Interpreter) {
    interp.register_module("terminal", |m| {
        // size(): [width, height]
        m.func(
            "size",
            Box::new(|_, _, _, _| {
                let (columns, rows) = match terminal_size() {
                    Some((Width(w), Height(h))) => (w as i64, h as i64),
                    None => (80, 24),
                };
                Ok(Value::array(vec![Value::Integer(columns), Value::Integer(rows)]))
            }),
        );
    });
}
