// File: src/errors.rs
//
// Error kinds, the runtime error type threaded through evaluation, and the
// ErrorReporter that renders source-annotated diagnostics. The reporter is
// shared between lexer, parser, and interpreter; inside a try block it
// suppresses display and parks the error on a single-slot channel so a catch
// can ignore or surface it.

use colored::Colorize;
use std::fmt;

/// Stable error kind strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ParseError,
    RuntimeError,
    ImportError,
    StdLibError,
    DivisionByZero,
    ModuloByZero,
    InvalidStringMultiplication,
    AssertionFailed,
    EvalError,
    InvalidArguments,
    InvalidType,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ErrorKind::ParseError => "Parse Error",
            ErrorKind::RuntimeError => "Runtime Error",
            ErrorKind::ImportError => "Import Error",
            ErrorKind::StdLibError => "StdLib Error",
            ErrorKind::DivisionByZero => "Division by Zero",
            ErrorKind::ModuloByZero => "Modulo by Zero",
            ErrorKind::InvalidStringMultiplication => "Invalid String Multiplication",
            ErrorKind::AssertionFailed => "Assertion failed",
            ErrorKind::EvalError => "Eval Error",
            ErrorKind::InvalidArguments => "Invalid Arguments",
            ErrorKind::InvalidType => "Invalid Type",
        };
        write!(f, "{}", s)
    }
}

/// A runtime failure carrying its message and source site. Produced by the
/// evaluator and executor, observed by the statement driver (and converted to
/// a thrown value when it reaches a try block).
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, line: u32, column: u32) -> Self {
        RuntimeError { kind, message: message.into(), line, column }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// A reported error held on the reporter's last-error slot.
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    pub error_type: String,
    pub message: String,
    pub file_name: String,
    pub line: u32,
    pub column: u32,
    pub lexeme: String,
    pub show_arrow: bool,
}

/// Renders source-annotated diagnostics and tracks try depth.
pub struct ErrorReporter {
    source_lines: Vec<String>,
    current_file_name: String,
    // Nested sources for imported or eval'ed chunks
    source_stack: Vec<Vec<String>>,
    file_name_stack: Vec<String>,
    had_error: bool,
    try_depth: usize,
    last_error: Option<ErrorInfo>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        ErrorReporter {
            source_lines: Vec::new(),
            current_file_name: String::new(),
            source_stack: Vec::new(),
            file_name_stack: Vec::new(),
            had_error: false,
            try_depth: 0,
            last_error: None,
        }
    }

    pub fn load_source(&mut self, source: &str, file_name: &str) {
        self.current_file_name = file_name.to_string();
        self.source_lines = source.lines().map(str::to_string).collect();
    }

    /// Save the current source context and switch to a nested one.
    pub fn push_source(&mut self, source: &str, file_name: &str) {
        self.source_stack.push(std::mem::take(&mut self.source_lines));
        self.file_name_stack.push(std::mem::take(&mut self.current_file_name));
        self.load_source(source, file_name);
    }

    pub fn pop_source(&mut self) {
        self.source_lines = self.source_stack.pop().unwrap_or_default();
        self.current_file_name = self.file_name_stack.pop().unwrap_or_default();
    }

    pub fn current_file_name(&self) -> &str {
        &self.current_file_name
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    /// Reset between REPL inputs.
    pub fn reset_error_state(&mut self) {
        self.had_error = false;
        self.last_error = None;
    }

    pub fn enter_try(&mut self) {
        self.try_depth += 1;
    }

    pub fn exit_try(&mut self) {
        if self.try_depth > 0 {
            self.try_depth -= 1;
        }
    }

    pub fn is_in_try(&self) -> bool {
        self.try_depth > 0
    }

    /// Consume the parked error, if any. Called by catch handling.
    pub fn take_last_error(&mut self) -> Option<ErrorInfo> {
        self.last_error.take()
    }

    pub fn report_error(
        &mut self,
        line: u32,
        column: u32,
        error_type: &str,
        message: &str,
        lexeme: &str,
        show_arrow: bool,
    ) {
        let error = ErrorInfo {
            error_type: error_type.to_string(),
            message: message.to_string(),
            file_name: self.current_file_name.clone(),
            line,
            column,
            lexeme: lexeme.to_string(),
            show_arrow,
        };
        self.had_error = true;
        self.last_error = Some(error.clone());

        // Inside a try block the catch decides whether the error surfaces.
        if self.is_in_try() {
            return;
        }

        self.display_error(&error);
    }

    pub fn display_error(&self, error: &ErrorInfo) {
        eprintln!();
        self.display_source_context(error);
        eprintln!("{}{}", "Error: ".red(), error.error_type.bold());
        eprintln!("{}{}", "Message: ".bold(), error.message);
        eprintln!();
    }

    fn display_source_context(&self, error: &ErrorInfo) {
        if self.source_lines.is_empty() || error.line == 0 {
            return;
        }

        let total = self.source_lines.len() as u32;
        let start_line = error.line.saturating_sub(4).max(1);
        let end_line = (error.line + 2).min(total);

        // Window width: at least 80, wide enough for the longest shown line
        // and the arrow message, capped at 120.
        let mut max_width: usize = 80;
        for i in start_line..=end_line {
            if let Some(src) = self.source_lines.get(i as usize - 1) {
                max_width = max_width.max(src.len() + 8);
            }
        }
        max_width = max_width.max(8 + error.column as usize + 1 + error.message.len());
        max_width = max_width.min(120);

        eprintln!("{}", "Source Code Context:".bold());
        eprintln!("{}", format!("┌{}┐", "-".repeat(max_width)).blue());

        for i in start_line..=end_line {
            let prefix = format!("  {:>4} | ", i);
            let src = self.source_lines.get(i as usize - 1).map(String::as_str).unwrap_or("");
            if i == error.line {
                eprintln!("{}{}", prefix.red(), src.yellow());
                if error.show_arrow {
                    let safe_column = (error.column as usize).clamp(1, src.len() + 1);
                    eprintln!(
                        "{}{}{}",
                        "       | ".red(),
                        " ".repeat(safe_column - 1),
                        format!("^ {}", error.message).red()
                    );
                }
            } else {
                eprintln!("{}{}", prefix.blue(), src);
            }
        }

        eprintln!("{}", format!("└{}┘", "-".repeat(max_width)).blue());
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_depth_pairs_and_suppresses_display() {
        let mut reporter = ErrorReporter::new();
        assert!(!reporter.is_in_try());
        reporter.enter_try();
        assert!(reporter.is_in_try());
        reporter.report_error(1, 1, "Runtime Error", "boom", "", true);
        assert!(reporter.had_error());
        let parked = reporter.take_last_error().expect("error should be parked");
        assert_eq!(parked.message, "boom");
        reporter.exit_try();
        assert!(!reporter.is_in_try());
        // exit_try never underflows
        reporter.exit_try();
        assert!(!reporter.is_in_try());
    }

    #[test]
    fn source_stack_restores_outer_context() {
        let mut reporter = ErrorReporter::new();
        reporter.load_source("var a = 1;", "main.bob");
        reporter.push_source("var b = 2;", "lib.bob");
        assert_eq!(reporter.current_file_name(), "lib.bob");
        reporter.pop_source();
        assert_eq!(reporter.current_file_name(), "main.bob");
    }

    #[test]
    fn error_kind_strings_are_stable() {
        assert_eq!(ErrorKind::ParseError.to_string(), "Parse Error");
        assert_eq!(ErrorKind::DivisionByZero.to_string(), "Division by Zero");
        assert_eq!(ErrorKind::AssertionFailed.to_string(), "Assertion failed");
        assert_eq!(ErrorKind::InvalidStringMultiplication.to_string(), "Invalid String Multiplication");
    }
}
