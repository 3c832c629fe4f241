// File: src/modules/path_mod.rs
//
// Path manipulation helpers, all pure string/path work.

use crate::interpreter::{Interpreter, Value};
use std::path::{Path, PathBuf};

fn first_string(args: &[Value]) -> Option<String> {
    match args.first() {
        Some(Value::Str(s)) => Some(s.as_ref().clone()),
        _ => None,
    }
}

pub fn register(interp: &mut Interpreter) {
    interp.register_module("path", |m| {
        m.func(
            "join",
            Box::new(|_, args, _, _| {
                let mut joined = PathBuf::new();
                for part in &args {
                    let Value::Str(part) = part else { return Ok(Value::None) };
                    joined.push(part.as_str());
                }
                Ok(Value::str(joined.to_string_lossy().to_string()))
            }),
        );
        m.func(
            "dirname",
            Box::new(|_, args, _, _| {
                let Some(path) = first_string(&args) else { return Ok(Value::None) };
                Ok(Value::str(
                    Path::new(&path)
                        .parent()
                        .map(|p| p.to_string_lossy().to_string())
                        .unwrap_or_default(),
                ))
            }),
        );
        m.func(
            "basename",
            Box::new(|_, args, _, _| {
                let Some(path) = first_string(&args) else { return Ok(Value::None) };
                Ok(Value::str(
                    Path::new(&path)
                        .file_name()
                        .map(|p| p.to_string_lossy().to_string())
                        .unwrap_or_default(),
                ))
            }),
        );
        // splitext("a/b.txt") -> ["a/b", "txt"]
        m.func(
            "splitext",
            Box::new(|_, args, _, _| {
                let Some(path) = first_string(&args) else { return Ok(Value::None) };
                let p = Path::new(&path);
                let extension =
                    p.extension().map(|e| e.to_string_lossy().to_string()).unwrap_or_default();
                let stem = if extension.is_empty() {
                    path.clone()
                } else {
                    path[..path.len() - extension.len() - 1].to_string()
                };
                Ok(Value::array(vec![Value::str(stem), Value::str(extension)]))
            }),
        );
        m.func(
            "normalize",
            Box::new(|_, args, _, _| {
                let Some(path) = first_string(&args) else { return Ok(Value::None) };
                let mut parts: Vec<String> = Vec::new();
                let absolute = path.starts_with('/');
                for component in path.split('/') {
                    match component {
                        "" | "." => {}
                        ".." => {
                            if parts.last().map(|p| p != "..").unwrap_or(false) {
                                parts.pop();
                            } else if !absolute {
                                parts.push("..".to_string());
                            }
                        }
                        other => parts.push(other.to_string()),
                    }
                }
                let mut result = parts.join("/");
                if absolute {
                    result.insert(0, '/');
                }
                if result.is_empty() {
                    result = ".".to_string();
                }
                Ok(Value::str(result))
            }),
        );
        m.func(
            "isabs",
            Box::new(|_, args, _, _| {
                let Some(path) = first_string(&args) else { return Ok(Value::Boolean(false)) };
                Ok(Value::Boolean(Path::new(&path).is_absolute()))
            }),
        );
        m.func(
            "absolute",
            Box::new(|_, args, _, _| {
                let Some(path) = first_string(&args) else { return Ok(Value::None) };
                let absolute = if Path::new(&path).is_absolute() {
                    PathBuf::from(&path)
                } else {
                    std::env::current_dir().unwrap_or_default().join(&path)
                };
                Ok(Value::str(absolute.to_string_lossy().to_string()))
            }),
        );
    });
}
