// File: src/modules/io.rs
//
// File I/O module: module-level mirrors of the StdLib file globals, with
// none/false results instead of errors so scripts can probe.

use crate::interpreter::{Interpreter, Value};

fn first_string(args: &[Value]) -> Option<String> {
    match args.first() {
        Some(Value::Str(s)) => Some(s.as_ref().clone()),
        _ => None,
    }
}

pub fn register(interp: &mut Interpreter) {
    interp.register_module("io", |m| {
        m.func(
            "readFile",
            Box::new(|_, args, _, _| {
                let Some(path) = first_string(&args) else { return Ok(Value::None) };
                Ok(std::fs::read_to_string(path).map(Value::str).unwrap_or(Value::None))
            }),
        );
        m.func(
            "writeFile",
            Box::new(|_, args, _, _| {
                let (Some(Value::Str(path)), Some(Value::Str(content))) =
                    (args.first(), args.get(1))
                else {
                    return Ok(Value::Boolean(false));
                };
                Ok(Value::Boolean(std::fs::write(path.as_str(), content.as_str()).is_ok()))
            }),
        );
        m.func(
            "readLines",
            Box::new(|_, args, _, _| {
                let Some(path) = first_string(&args) else { return Ok(Value::None) };
                match std::fs::read_to_string(path) {
                    Ok(content) => {
                        Ok(Value::array(content.lines().map(Value::str).collect()))
                    }
                    Err(_) => Ok(Value::None),
                }
            }),
        );
        m.func(
            "exists",
            Box::new(|_, args, _, _| {
                let Some(path) = first_string(&args) else { return Ok(Value::Boolean(false)) };
                Ok(Value::Boolean(std::path::Path::new(&path).exists()))
            }),
        );
    });
}
