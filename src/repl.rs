// File: src/repl.rs
//
// Interactive REPL for the Bob language. Multi-line input continues while
// delimiters are unbalanced; state persists across inputs. Meta-commands:
// `history` prints the session history with 1-based indices, `clear` wipes
// it. Exits cleanly on EOF.

use crate::interpreter::Interpreter;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::stdlib;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::rc::Rc;

pub struct Repl {
    interpreter: Interpreter,
    editor: DefaultEditor,
    history: Vec<String>,
}

impl Repl {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let editor = DefaultEditor::new()?;
        let mut interpreter = Interpreter::new(true);
        stdlib::install_stdlib(&mut interpreter);
        Ok(Repl { interpreter, editor, history: Vec::new() })
    }

    fn show_banner(&self) {
        println!(
            "{} {}",
            "Bob".bright_cyan().bold(),
            format!("v{} interactive shell", env!("CARGO_PKG_VERSION")).dimmed()
        );
        println!("{}", "Type 'history' or 'clear' for the meta-commands; Ctrl-D exits.".dimmed());
        println!();
    }

    pub fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.show_banner();

        let mut buffer = String::new();
        loop {
            let prompt = if buffer.is_empty() {
                "bob> ".bright_green().to_string()
            } else {
                "...> ".bright_blue().to_string()
            };

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    if buffer.is_empty() {
                        match line.trim() {
                            "history" => {
                                self.show_history();
                                continue;
                            }
                            "clear" => {
                                let _ = self.editor.clear_history();
                                self.history.clear();
                                println!("{}", "History cleared".dimmed());
                                continue;
                            }
                            _ => {}
                        }
                    }
                    let _ = self.editor.add_history_entry(line.as_str());
                    if !line.trim().is_empty() {
                        self.history.push(line.clone());
                    }

                    buffer.push_str(&line);
                    buffer.push('\n');

                    if is_input_complete(&buffer) {
                        let input = std::mem::take(&mut buffer);
                        self.eval_input(&input);
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "^C".bright_yellow());
                    buffer.clear();
                }
                Err(ReadlineError::Eof) => {
                    break;
                }
                Err(err) => {
                    eprintln!("{} {}", "Error:".bright_red(), err);
                    break;
                }
            }
        }
        Ok(())
    }

    fn show_history(&self) {
        for (index, entry) in self.history.iter().enumerate() {
            println!("{:>4}  {}", index + 1, entry);
        }
    }

    fn eval_input(&mut self, input: &str) {
        if input.trim().is_empty() {
            return;
        }

        let reporter = self.interpreter.error_reporter();
        reporter.borrow_mut().reset_error_state();
        reporter.borrow_mut().load_source(input, "<repl>");

        let mut lexer = Lexer::new();
        lexer.set_error_reporter(Rc::clone(&reporter));
        let tokens = lexer.tokenize(input);
        let mut parser = Parser::new(tokens);
        parser.set_error_reporter(Rc::clone(&reporter));
        let statements = parser.parse();

        if reporter.borrow().had_error() {
            return;
        }

        // Runtime errors were already rendered by the reporter; keep the
        // session alive either way.
        let _ = self.interpreter.interpret(&statements);
    }
}

/// Input is complete once braces, brackets, parentheses, and strings are
/// balanced outside comments.
fn is_input_complete(input: &str) -> bool {
    let mut brace = 0i32;
    let mut bracket = 0i32;
    let mut paren = 0i32;
    let mut in_string = false;
    let mut escape_next = false;
    let mut in_comment = false;

    for c in input.chars() {
        if in_comment {
            if c == '\n' {
                in_comment = false;
            }
            continue;
        }
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '/' if !in_string => {}
            '{' if !in_string => brace += 1,
            '}' if !in_string => brace -= 1,
            '[' if !in_string => bracket += 1,
            ']' if !in_string => bracket -= 1,
            '(' if !in_string => paren += 1,
            ')' if !in_string => paren -= 1,
            _ => {}
        }
    }

    !in_string && brace <= 0 && bracket <= 0 && paren <= 0
}

#[cfg(test)]
mod tests {
    use super::is_input_complete;

    #[test]
    fn balanced_input_is_complete() {
        assert!(is_input_complete("var x = 1;"));
        assert!(is_input_complete("func f(){ return 1; }"));
        assert!(is_input_complete(""));
    }

    #[test]
    fn unbalanced_input_continues() {
        assert!(!is_input_complete("func f() {"));
        assert!(!is_input_complete("var a = [1, 2,"));
        assert!(!is_input_complete("print(\"unterminated"));
    }

    #[test]
    fn strings_hide_delimiters() {
        assert!(is_input_complete("print(\"{[(\");"));
    }
}
