// File: src/modules/mod.rs
//
// Builtin module set. Each submodule registers one host module with the
// interpreter; user code reaches them with `import NAME;`.

mod base64_mod;
mod eval_mod;
mod io;
mod json;
mod math;
mod os;
mod path_mod;
mod random;
mod sys;
mod terminal;
mod time_mod;

use crate::interpreter::Interpreter;

pub fn register_all(interp: &mut Interpreter) {
    sys::register(interp);
    os::register(interp);
    eval_mod::register(interp);
    io::register(interp);
    time_mod::register(interp);
    random::register(interp);
    math::register(interp);
    path_mod::register(interp);
    base64_mod::register(interp);
    terminal::register(interp);
    json::register(interp);
}
