// File: src/stdlib.rs
//
// StdLib globals installed into the interpreter's root environment when a
// REPL or runner starts. These are the bare-name builtins; the module set
// under src/modules/ is imported explicitly by user code.

use crate::errors::{ErrorKind, RuntimeError};
use crate::interpreter::value::NativeFn;
use crate::interpreter::{Interpreter, Value};
use rand::Rng;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

fn define(interp: &mut Interpreter, name: &str, func: NativeFn) {
    let value = Value::builtin(name, func);
    if let Value::Builtin(builtin) = &value {
        interp.function_registry.add_builtin(Rc::clone(builtin));
    }
    interp.globals().define(name.to_string(), value);
}

fn arity_error(
    interp: &mut Interpreter,
    expected: &str,
    got: usize,
    line: u32,
    column: u32,
) -> RuntimeError {
    interp.fail(
        line,
        column,
        ErrorKind::StdLibError,
        format!("Expected {} but got {}.", expected, got),
    )
}

pub fn install_stdlib(interp: &mut Interpreter) {
    define(
        interp,
        "print",
        Box::new(|interp, args, line, column| {
            if args.len() != 1 {
                return Err(arity_error(interp, "1 argument", args.len(), line, column));
            }
            let text = args[0].to_display_string();
            interp.write_out(&text, true);
            Ok(Value::None)
        }),
    );

    // No trailing newline and an immediate flush, for ANSI escape sequences.
    define(
        interp,
        "printRaw",
        Box::new(|interp, args, line, column| {
            if args.len() != 1 {
                return Err(arity_error(interp, "1 argument", args.len(), line, column));
            }
            let text = args[0].to_display_string();
            interp.write_out(&text, false);
            Ok(Value::None)
        }),
    );

    define(
        interp,
        "toString",
        Box::new(|interp, args, line, column| {
            if args.len() != 1 {
                return Err(arity_error(interp, "1 argument", args.len(), line, column));
            }
            Ok(Value::str(args[0].to_display_string()))
        }),
    );

    define(
        interp,
        "toNumber",
        Box::new(|_, args, _, _| {
            let Some(Value::Str(text)) = args.first() else { return Ok(Value::None) };
            if args.len() != 1 {
                return Ok(Value::None);
            }
            match text.trim().parse::<f64>() {
                Ok(value) if !text.trim().is_empty() => Ok(Value::Number(value)),
                _ => Ok(Value::None),
            }
        }),
    );

    define(
        interp,
        "toInt",
        Box::new(|interp, args, line, column| {
            if args.len() != 1 {
                return Err(arity_error(interp, "1 argument", args.len(), line, column));
            }
            match &args[0] {
                Value::Integer(i) => Ok(Value::Integer(*i)),
                Value::BigInt(b) => Ok(Value::BigInt(Rc::clone(b))),
                Value::Number(n) => Ok(Value::Integer(*n as i64)),
                other => Err(interp.fail(
                    line,
                    column,
                    ErrorKind::StdLibError,
                    format!("toInt() can only be used on numbers, got {}", other.type_name()),
                )),
            }
        }),
    );

    define(
        interp,
        "toBoolean",
        Box::new(|interp, args, line, column| {
            if args.len() != 1 {
                return Err(arity_error(interp, "1 argument", args.len(), line, column));
            }
            Ok(Value::Boolean(args[0].truthy()))
        }),
    );

    define(
        interp,
        "len",
        Box::new(|interp, args, line, column| {
            if args.len() != 1 {
                return Err(arity_error(interp, "1 argument", args.len(), line, column));
            }
            match &args[0] {
                Value::Array(array) => Ok(Value::Integer(array.borrow().len() as i64)),
                Value::Str(text) => Ok(Value::Integer(text.chars().count() as i64)),
                Value::Dict(dict) => Ok(Value::Integer(dict.borrow().len() as i64)),
                _ => Err(interp.fail(
                    line,
                    column,
                    ErrorKind::StdLibError,
                    "len() can only be used on arrays, strings, and dictionaries",
                )),
            }
        }),
    );

    define(
        interp,
        "push",
        Box::new(|interp, args, line, column| {
            if args.len() < 2 {
                return Err(arity_error(interp, "at least 2 arguments", args.len(), line, column));
            }
            let Value::Array(array) = &args[0] else {
                return Err(interp.fail(
                    line,
                    column,
                    ErrorKind::StdLibError,
                    "First argument to push() must be an array",
                ));
            };
            array.borrow_mut().extend(args[1..].iter().cloned());
            Ok(args[0].clone())
        }),
    );

    define(
        interp,
        "pop",
        Box::new(|interp, args, line, column| {
            if args.len() != 1 {
                return Err(arity_error(interp, "1 argument", args.len(), line, column));
            }
            let Value::Array(array) = &args[0] else {
                return Err(interp.fail(
                    line,
                    column,
                    ErrorKind::StdLibError,
                    "pop() can only be used on arrays",
                ));
            };
            match array.borrow_mut().pop() {
                Some(value) => Ok(value),
                None => Err(interp.fail(
                    line,
                    column,
                    ErrorKind::StdLibError,
                    "Cannot pop from empty array",
                )),
            }
        }),
    );

    define(
        interp,
        "keys",
        Box::new(|interp, args, line, column| {
            if args.len() != 1 {
                return Err(arity_error(interp, "1 argument", args.len(), line, column));
            }
            let Value::Dict(dict) = &args[0] else {
                return Err(interp.fail(
                    line,
                    column,
                    ErrorKind::StdLibError,
                    "keys() can only be used on dictionaries",
                ));
            };
            let keys = dict.borrow().keys().map(|k| Value::str(k.clone())).collect();
            Ok(Value::array(keys))
        }),
    );

    define(
        interp,
        "values",
        Box::new(|interp, args, line, column| {
            if args.len() != 1 {
                return Err(arity_error(interp, "1 argument", args.len(), line, column));
            }
            let Value::Dict(dict) = &args[0] else {
                return Err(interp.fail(
                    line,
                    column,
                    ErrorKind::StdLibError,
                    "values() can only be used on dictionaries",
                ));
            };
            let values = dict.borrow().values().cloned().collect();
            Ok(Value::array(values))
        }),
    );

    define(
        interp,
        "has",
        Box::new(|interp, args, line, column| {
            if args.len() != 2 {
                return Err(arity_error(interp, "2 arguments", args.len(), line, column));
            }
            let Value::Dict(dict) = &args[0] else {
                return Err(interp.fail(
                    line,
                    column,
                    ErrorKind::StdLibError,
                    "First argument to has() must be a dictionary",
                ));
            };
            let Value::Str(key) = &args[1] else {
                return Err(interp.fail(
                    line,
                    column,
                    ErrorKind::StdLibError,
                    "Second argument to has() must be a string",
                ));
            };
            Ok(Value::Boolean(dict.borrow().contains_key(key.as_str())))
        }),
    );

    define(
        interp,
        "assert",
        Box::new(|interp, args, line, column| {
            if args.is_empty() || args.len() > 2 {
                return Err(arity_error(interp, "1 or 2 arguments", args.len(), line, column));
            }
            if args[0].truthy() {
                return Ok(Value::None);
            }
            let mut message = "condition is false".to_string();
            if let Some(Value::Str(detail)) = args.get(1) {
                message.push_str(" - ");
                message.push_str(detail);
            }
            Err(interp.fail(line, column, ErrorKind::AssertionFailed, message))
        }),
    );

    // Microseconds since the Unix epoch.
    define(
        interp,
        "time",
        Box::new(|interp, args, line, column| {
            if !args.is_empty() {
                return Err(arity_error(interp, "0 arguments", args.len(), line, column));
            }
            let micros = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_micros() as f64)
                .unwrap_or(0.0);
            Ok(Value::Number(micros))
        }),
    );

    define(
        interp,
        "sleep",
        Box::new(|interp, args, line, column| {
            if args.len() != 1 {
                return Err(arity_error(interp, "1 argument", args.len(), line, column));
            }
            if !args[0].is_numeric() {
                return Err(interp.fail(
                    line,
                    column,
                    ErrorKind::StdLibError,
                    "sleep() argument must be a number",
                ));
            }
            let seconds = args[0].to_f64();
            if seconds < 0.0 {
                return Err(interp.fail(
                    line,
                    column,
                    ErrorKind::StdLibError,
                    "sleep() argument cannot be negative",
                ));
            }
            std::thread::sleep(std::time::Duration::from_millis((seconds * 1000.0) as u64));
            Ok(Value::None)
        }),
    );

    define(
        interp,
        "random",
        Box::new(|interp, args, line, column| {
            if !args.is_empty() {
                return Err(arity_error(interp, "0 arguments", args.len(), line, column));
            }
            Ok(Value::Number(rand::thread_rng().gen::<f64>()))
        }),
    );

    define(
        interp,
        "input",
        Box::new(|interp, args, line, column| {
            if args.len() > 1 {
                return Err(arity_error(interp, "0 or 1 arguments", args.len(), line, column));
            }
            if let Some(prompt) = args.first() {
                let text = prompt.to_display_string();
                interp.write_out(&text, false);
            }
            let mut buffer = String::new();
            let _ = std::io::stdin().read_line(&mut buffer);
            while buffer.ends_with('\n') || buffer.ends_with('\r') {
                buffer.pop();
            }
            Ok(Value::str(buffer))
        }),
    );

    define(
        interp,
        "type",
        Box::new(|interp, args, line, column| {
            if args.len() != 1 {
                return Err(arity_error(interp, "1 argument", args.len(), line, column));
            }
            Ok(Value::str(args[0].type_name()))
        }),
    );

    // Compiles and runs a string in the current interpreter; bindings it
    // defines land in the current scope.
    define(
        interp,
        "eval",
        Box::new(|interp, args, line, column| {
            if args.len() != 1 {
                return Err(interp.fail(
                    line,
                    column,
                    ErrorKind::InvalidArguments,
                    "eval expects exactly 1 argument (string)",
                ));
            }
            let Value::Str(code) = &args[0] else {
                return Err(interp.fail(
                    line,
                    column,
                    ErrorKind::InvalidType,
                    "eval argument must be a string",
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

    define(
        interp,
        "readFile",
        Box::new(|interp, args, line, column| {
            if args.len() != 1 {
                return Err(arity_error(interp, "1 argument", args.len(), line, column));
            }
            let Value::Str(path) = &args[0] else {
                return Err(interp.fail(
                    line,
                    column,
                    ErrorKind::StdLibError,
                    "readFile() argument must be a string",
                ));
            };
            match std::fs::read_to_string(path.as_str()) {
                Ok(content) => Ok(Value::str(content)),
                Err(_) => Err(interp.fail(
                    line,
                    column,
                    ErrorKind::StdLibError,
                    format!("Could not open file: {}", path),
                )),
            }
        }),
    );

    define(
        interp,
        "writeFile",
        Box::new(|interp, args, line, column| {
            if args.len() != 2 {
                return Err(arity_error(interp, "2 arguments", args.len(), line, column));
            }
            let (Value::Str(path), Value::Str(content)) = (&args[0], &args[1]) else {
                return Err(interp.fail(
                    line,
                    column,
                    ErrorKind::StdLibError,
                    "writeFile() arguments must be strings",
                ));
            };
            match std::fs::write(path.as_str(), content.as_str()) {
                Ok(()) => Ok(Value::None),
                Err(_) => Err(interp.fail(
                    line,
                    column,
                    ErrorKind::StdLibError,
                    format!("Could not create file: {}", path),
                )),
            }
        }),
    );

    define(
        interp,
        "readLines",
        Box::new(|interp, args, line, column| {
            if args.len() != 1 {
                return Err(arity_error(interp, "1 argument", args.len(), line, column));
            }
            let Value::Str(path) = &args[0] else {
                return Err(interp.fail(
                    line,
                    column,
                    ErrorKind::StdLibError,
                    "readLines() argument must be a string",
                ));
            };
            match std::fs::read_to_string(path.as_str()) {
                Ok(content) => {
                    let lines = content.lines().map(Value::str).collect();
                    Ok(Value::array(lines))
                }
                Err(_) => Err(interp.fail(
                    line,
                    column,
                    ErrorKind::StdLibError,
                    format!("Could not open file: {}", path),
                )),
            }
        }),
    );

    define(
        interp,
        "fileExists",
        Box::new(|interp, args, line, column| {
            if args.len() != 1 {
                return Err(arity_error(interp, "1 argument", args.len(), line, column));
            }
            let Value::Str(path) = &args[0] else {
                return Err(interp.fail(
                    line,
                    column,
                    ErrorKind::StdLibError,
                    "fileExists() argument must be a string",
                ));
            };
            Ok(Value::Boolean(std::path::Path::new(path.as_str()).exists()))
        }),
    );

    define(
        interp,
        "exit",
        Box::new(|_, args, _, _| {
            let code = match args.first() {
                Some(Value::Integer(i)) => *i as i32,
                Some(Value::Number(n)) => *n as i32,
                _ => 0,
            };
            std::process::exit(code);
        }),
    );
}
