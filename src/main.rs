// File: src/main.rs
//
// Entry point for the Bob interpreter. With no argument, start the REPL;
// with a path, evaluate the file and exit non-zero on unhandled errors.

mod ast;
mod errors;
mod interpreter;
mod lexer;
mod module;
mod modules;
mod parser;
mod repl;
mod stdlib;

use clap::Parser as ClapParser;
use std::path::PathBuf;

#[derive(ClapParser)]
#[command(
    name = "bob",
    about = "Bob: a small dynamically-typed scripting language",
    version = env!("CARGO_PKG_VERSION"),
    long_about = None
)]
struct Cli {
    /// Path to a .bob script; omit to start the REPL
    script: Option<PathBuf>,

    /// Arguments passed through to the script
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    script_args: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    match cli.script {
        Some(script) => {
            let mut interp = interpreter::Interpreter::new(false);
            stdlib::install_stdlib(&mut interp);

            let executable = std::env::current_exe()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default();
            let mut argv = vec![script.to_string_lossy().to_string()];
            argv.extend(cli.script_args);
            interp.set_argv(argv, executable);

            if interp.eval_file(&script.to_string_lossy()).is_err() {
                std::process::exit(1);
            }
        }
        None => match repl::Repl::new() {
            Ok(mut repl) => {
                if let Err(e) = repl.run() {
                    eprintln!("REPL error: {}", e);
                    std::process::exit(1);
                }
            }
            Err(e) => {
                eprintln!("Failed to start REPL: {}", e);
                std::process::exit(1);
            }
        },
    }
}
