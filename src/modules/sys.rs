// File: src/modules/sys.rs
//
// Process and host metadata: platform, version, argv, executable path, a
// read-only module-cache snapshot, and exit.

use crate::interpreter::{DictMap, Interpreter, Value};

fn platform_name() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        "windows" => "win32",
        other => {
            if other == "linux" {
                "linux"
            } else {
                "unknown"
            }
        }
    }
}

pub fn register(interp: &mut Interpreter) {
    interp.register_module("sys", |m| {
        m.func("platform", Box::new(|_, _, _, _| Ok(Value::str(platform_name()))));
        m.func(
            "version",
            Box::new(|_, _, _, _| Ok(Value::str(env!("CARGO_PKG_VERSION")))),
        );
        m.func(
            "argv",
            Box::new(|interp, _, _, _| {
                let args = interp.argv().iter().map(|a| Value::str(a.clone())).collect();
                Ok(Value::array(args))
            }),
        );
        m.func(
            "executable",
            Box::new(|interp, _, _, _| Ok(Value::str(interp.executable_path().to_string()))),
        );
        // modules(): snapshot of the module cache, keyed by resolved spec.
        m.func(
            "modules",
            Box::new(|interp, _, _, _| {
                let mut map = DictMap::new();
                for (key, value) in interp.module_cache_snapshot() {
                    map.insert(key, value);
                }
                Ok(Value::dict(map))
            }),
        );
        m.func(
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
    });
}
