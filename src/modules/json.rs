// File: src/modules/json.rs
//
// JSON parse/stringify. Objects map to dicts and arrays to arrays; integral
// JSON numbers come back as Integer, everything else as Number. Values with
// no JSON representation (functions, modules) stringify to none.

use crate::interpreter::{DictMap, Interpreter, Value};

fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::None,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else {
                Value::Number(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Value::str(s.clone()),
        serde_json::Value::Array(items) => {
            Value::array(items.iter().map(from_json).collect())
        }
        serde_json::Value::Object(entries) => {
            let mut map = DictMap::new();
            for (key, value) in entries {
                map.insert(key.clone(), from_json(value));
            }
            Value::dict(map)
        }
    }
}

fn to_json(value: &Value) -> Option<serde_json::Value> {
    match value {
        Value::None => Some(serde_json::Value::Null),
        Value::Boolean(b) => Some(serde_json::Value::Bool(*b)),
        Value::Integer(i) => Some(serde_json::Value::from(*i)),
        Value::BigInt(b) => Some(serde_json::Value::String(b.to_string())),
        Value::Number(n) => serde_json::Number::from_f64(*n).map(serde_json::Value::Number),
        Value::Str(s) => Some(serde_json::Value::String(s.as_ref().clone())),
        Value::Array(items) => {
            let mut out = Vec::new();
            for item in items.borrow().iter() {
                out.push(to_json(item)?);
            }
            Some(serde_json::Value::Array(out))
        }
        Value::Dict(entries) => {
            let mut out = serde_json::Map::new();
            for (key, item) in entries.borrow().iter() {
                out.insert(key.clone(), to_json(item)?);
            }
            Some(serde_json::Value::Object(out))
        }
        _ => None,
    }
}

pub fn register(interp: &mut Interpreter) {
    interp.register_module("json", |m| {
        m.func(
            "parse",
            Box::new(|_, args, _, _| {
                let Some(Value::Str(text)) = args.first() else { return Ok(Value::None) };
                match serde_json::from_str::<serde_json::Value>(text.as_str()) {
                    Ok(parsed) => Ok(from_json(&parsed)),
                    Err(_) => Ok(Value::None),
                }
            }),
        );
        m.func(
            "stringify",
            Box::new(|_, args, _, _| {
                let Some(value) = args.first() else { return Ok(Value::None) };
                match to_json(value) {
                    Some(json) => Ok(Value::str(json.to_string())),
                    None => Ok(Value::None),
                }
            }),
        );
    });
}
