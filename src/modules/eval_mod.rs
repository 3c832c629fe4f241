// File: src/modules/eval_mod.rs
//
// eval/evalFile as a module: runs code in the current interpreter, sharing
// its environment, with the reporter's source stack tracking the chunk.

use crate::errors::{ErrorKind, RuntimeError};
use crate::interpreter::{Interpreter, Value};

pub fn register(interp: &mut Interpreter) {
    interp.register_module("eval", |m| {
        m.func(
            "eval",
            Box::new(|interp, args, line, column| {
                let Some(Value::Str(code)) = args.first() else {
                    return Err(interp.fail(
                        line,
                        column,
                        ErrorKind::InvalidArguments,
                        "eval expects exactly 1 argument (string)",
                    ));
                };
                let code = code.as_ref().clone();
                match interp.eval_string(&code, "<eval>") {
                    Ok(()) => Ok(Value::None),
                    Err(error) => Err(RuntimeError::new(
                        ErrorKind::EvalError,
                        format!("Failed to evaluate code: {}", error.message),
                        line,
                        column,
                    )),
                }
            }),
        );
        m.func(
            "evalFile",
            Box::new(|interp, args, line, column| {
                let Some(Value::Str(path)) = args.first() else {
                    return Err(interp.fail(
                        line,
                        column,
                        ErrorKind::InvalidArguments,
                        "evalFile expects exactly 1 argument (path)",
                    ));
                };
                let path = path.as_ref().clone();
                let code = std::fs::read_to_string(&path).map_err(|_| {
                    interp.fail(
                        line,
                        column,
                        ErrorKind::EvalError,
                        format!("Could not open file: {}", path),
                    )
                })?;
                match interp.eval_string(&code, &path) {
                    Ok(()) => Ok(Value::None),
                    Err(error) => Err(RuntimeError::new(
                        ErrorKind::EvalError,
                        format!("Failed to evaluate file: {}", error.message),
                        line,
                        column,
                    )),
                }
            }),
        );
    });
}
