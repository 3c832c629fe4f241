// File: src/ast.rs
//
// Abstract syntax tree for the Bob language. Expressions and statements are
// plain tagged sums; the evaluator and executor dispatch over them with
// exhaustive matches instead of a visitor hierarchy.

use std::rc::Rc;

/// Binary and compound-assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    EqualEqual,
    BangEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    And,
    Or,
}

impl BinaryOp {
    pub fn lexeme(self) -> &'static str {
        match self {
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Star => "*",
            BinaryOp::Slash => "/",
            BinaryOp::Percent => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::EqualEqual => "==",
            BinaryOp::BangEqual => "!=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Bang,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementOp {
    Increment,
    Decrement,
}

/// Literal payloads. Integer literals that overflow i64 at lex time are kept
/// as digit strings and surface as BigInt values.
#[derive(Debug, Clone)]
pub enum Literal {
    None,
    Boolean(bool),
    Integer(i64),
    BigIntLit(String),
    Number(f64),
    Str(String),
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal {
        value: Literal,
        line: u32,
        column: u32,
    },
    Var {
        name: String,
        line: u32,
        column: u32,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        line: u32,
        column: u32,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
        line: u32,
        column: u32,
    },
    Ternary {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Grouping {
        expression: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
        /// Set by the parser when the call is the sole expression of a
        /// return statement; the interpreter wraps the invocation in a Thunk.
        is_tail_call: bool,
        line: u32,
        column: u32,
    },
    /// Simple or compound assignment to a named variable. `op` is None for
    /// plain `=`, otherwise the arithmetic half of the compound operator.
    Assign {
        name: String,
        op: Option<BinaryOp>,
        value: Box<Expr>,
        line: u32,
        column: u32,
    },
    Increment {
        op: IncrementOp,
        operand: Box<Expr>,
        is_prefix: bool,
        line: u32,
        column: u32,
    },
    ArrayLiteral {
        elements: Vec<Expr>,
    },
    DictLiteral {
        pairs: Vec<(String, Expr)>,
    },
    ArrayIndex {
        collection: Box<Expr>,
        index: Box<Expr>,
        line: u32,
        column: u32,
    },
    ArrayAssign {
        collection: Box<Expr>,
        index: Box<Expr>,
        value: Box<Expr>,
        line: u32,
        column: u32,
    },
    Property {
        object: Box<Expr>,
        name: String,
        line: u32,
        column: u32,
    },
    PropertyAssign {
        object: Box<Expr>,
        name: String,
        value: Box<Expr>,
        line: u32,
        column: u32,
    },
    FunctionExpr {
        params: Vec<String>,
        body: Rc<Vec<Stmt>>,
    },
}

impl Expr {
    /// Source site of an expression, for error reporting.
    pub fn site(&self) -> (u32, u32) {
        match self {
            Expr::Literal { line, column, .. }
            | Expr::Var { line, column, .. }
            | Expr::Unary { line, column, .. }
            | Expr::Binary { line, column, .. }
            | Expr::Call { line, column, .. }
            | Expr::Assign { line, column, .. }
            | Expr::Increment { line, column, .. }
            | Expr::ArrayIndex { line, column, .. }
            | Expr::ArrayAssign { line, column, .. }
            | Expr::Property { line, column, .. }
            | Expr::PropertyAssign { line, column, .. } => (*line, *column),
            Expr::Ternary { condition, .. } => condition.site(),
            Expr::Grouping { expression } => expression.site(),
            Expr::ArrayLiteral { elements } => elements.first().map(Expr::site).unwrap_or((0, 0)),
            Expr::DictLiteral { pairs } => pairs.first().map(|(_, e)| e.site()).unwrap_or((0, 0)),
            Expr::FunctionExpr { .. } => (0, 0),
        }
    }
}

/// A class field declaration: name plus optional initializer expression.
#[derive(Debug, Clone)]
pub struct ClassField {
    pub name: String,
    pub initializer: Option<Expr>,
}

/// A function or method declaration.
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Rc<Vec<Stmt>>,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone)]
pub struct ImportItem {
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Block {
        statements: Vec<Stmt>,
    },
    Expression {
        expression: Expr,
    },
    Var {
        name: String,
        initializer: Option<Expr>,
        line: u32,
        column: u32,
    },
    Function(FunctionDecl),
    Return {
        value: Option<Expr>,
        line: u32,
        column: u32,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        condition: Expr,
    },
    For {
        initializer: Option<Box<Stmt>>,
        condition: Option<Expr>,
        increment: Option<Expr>,
        body: Box<Stmt>,
    },
    Foreach {
        name: String,
        collection: Expr,
        body: Box<Stmt>,
        line: u32,
        column: u32,
    },
    Break,
    Continue,
    Class {
        name: String,
        parent: Option<String>,
        fields: Vec<ClassField>,
        methods: Vec<FunctionDecl>,
        line: u32,
        column: u32,
    },
    Extension {
        target: String,
        methods: Vec<FunctionDecl>,
    },
    Try {
        try_block: Box<Stmt>,
        catch_var: Option<String>,
        catch_block: Option<Box<Stmt>>,
        finally_block: Option<Box<Stmt>>,
    },
    Throw {
        value: Expr,
        line: u32,
        column: u32,
    },
    Import {
        module: String,
        alias: Option<String>,
        line: u32,
        column: u32,
    },
    FromImport {
        module: String,
        /// Empty with `import_all` set for `from m import *`.
        items: Vec<ImportItem>,
        import_all: bool,
        line: u32,
        column: u32,
    },
}
