// File: src/modules/base64_mod.rs
//
// Base64 encode/decode over the standard alphabet.

use crate::interpreter::{Interpreter, Value};
use base64::{engine::general_purpose, Engine as _};

pub fn register(interp: &mut Interpreter) {
    interp.register_module("base64", |m| {
        m.func(
            "encode",
            Box::new(|_, args, _, _| {
                let Some(Value::Str(text)) = args.first() else { return Ok(Value::None) };
                Ok(Value::str(general_purpose::STANDARD.encode(text.as_bytes())))
            }),
        );
        m.func(
            "decode",
            Box::new(|_, args, _, _| {
                let Some(Value::Str(text)) = args.first() else { return Ok(Value::None) };
                match general_purpose::STANDARD.decode(text.as_bytes()) {
                    Ok(bytes) => Ok(Value::str(String::from_utf8_lossy(&bytes).to_string())),
                    Err(_) => Ok(Value::None),
                }
            }),
        );
    });
}
