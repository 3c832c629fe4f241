// File: src/modules/os.rs
//
// Filesystem and process facts: cwd, directory listing and manipulation,
// environment variables, platform separators. Failures read as none or
// false; scripts that care probe with exists()/isdir() first.

use crate::interpreter::{DictMap, Interpreter, Value};

fn first_string(args: &[Value]) -> Option<String> {
    match args.first() {
        Some(Value::Str(s)) => Some(s.as_ref().clone()),
        _ => None,
    }
}

pub fn register(interp: &mut Interpreter) {
    interp.register_module("os", |m| {
        m.func(
            "getcwd",
            Box::new(|_, _, _, _| {
                Ok(std::env::current_dir()
                    .map(|p| Value::str(p.to_string_lossy().to_string()))
                    .unwrap_or(Value::None))
            }),
        );
        m.func(
            "chdir",
            Box::new(|_, args, _, _| {
                let Some(path) = first_string(&args) else { return Ok(Value::Boolean(false)) };
                Ok(Value::Boolean(std::env::set_current_dir(path).is_ok()))
            }),
        );
        m.func("getpid", Box::new(|_, _, _, _| Ok(Value::Integer(std::process::id() as i64))));
        m.func("name", Box::new(|_, _, _, _| Ok(Value::str(std::env::consts::OS))));
        m.func(
            "listdir",
            Box::new(|_, args, _, _| {
                let path = first_string(&args).unwrap_or_else(|| ".".to_string());
                let Ok(entries) = std::fs::read_dir(path) else { return Ok(Value::None) };
                let mut names = Vec::new();
                for entry in entries.flatten() {
                    names.push(Value::str(entry.file_name().to_string_lossy().to_string()));
                }
                Ok(Value::array(names))
            }),
        );
        m.func(
            "mkdir",
            Box::new(|_, args, _, _| {
                let Some(path) = first_string(&args) else { return Ok(Value::Boolean(false)) };
                Ok(Value::Boolean(std::fs::create_dir_all(path).is_ok()))
            }),
        );
        m.func(
            "rmdir",
            Box::new(|_, args, _, _| {
                let Some(path) = first_string(&args) else { return Ok(Value::Boolean(false)) };
                Ok(Value::Boolean(std::fs::remove_dir(path).is_ok()))
            }),
        );
        m.func(
            "remove",
            Box::new(|_, args, _, _| {
                let Some(path) = first_string(&args) else { return Ok(Value::Boolean(false)) };
                Ok(Value::Boolean(std::fs::remove_file(path).is_ok()))
            }),
        );
        m.func(
            "exists",
            Box::new(|_, args, _, _| {
                let Some(path) = first_string(&args) else { return Ok(Value::Boolean(false)) };
                Ok(Value::Boolean(std::path::Path::new(&path).exists()))
            }),
        );
        m.func(
            "isfile",
            Box::new(|_, args, _, _| {
                let Some(path) = first_string(&args) else { return Ok(Value::Boolean(false)) };
                Ok(Value::Boolean(std::path::Path::new(&path).is_file()))
            }),
        );
        m.func(
            "isdir",
            Box::new(|_, args, _, _| {
                let Some(path) = first_string(&args) else { return Ok(Value::Boolean(false)) };
                Ok(Value::Boolean(std::path::Path::new(&path).is_dir()))
            }),
        );
        m.func(
            "rename",
            Box::new(|_, args, _, _| {
                let (Some(Value::Str(from)), Some(Value::Str(to))) = (args.first(), args.get(1))
                else {
                    return Ok(Value::Boolean(false));
                };
                Ok(Value::Boolean(std::fs::rename(from.as_str(), to.as_str()).is_ok()))
            }),
        );
        m.func(
            "environ",
            Box::new(|_, _, _, _| {
                let mut map = DictMap::new();
                for (key, value) in std::env::vars() {
                    map.insert(key, Value::str(value));
                }
                Ok(Value::dict(map))
            }),
        );
        m.func(
            "getenv",
            Box::new(|_, args, _, _| {
                let Some(name) = first_string(&args) else { return Ok(Value::None) };
                Ok(std::env::var(name).map(Value::str).unwrap_or(Value::None))
            }),
        );
        m.func("sep", Box::new(|_, _, _, _| Ok(Value::str(std::path::MAIN_SEPARATOR.to_string()))));
        m.func(
            "linesep",
            Box::new(|_, _, _, _| {
                Ok(Value::str(if cfg!(windows) { "\r\n" } else { "\n" }))
            }),
        );
    });
}
