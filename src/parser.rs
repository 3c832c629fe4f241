// File: src/parser.rs
//
// Recursive-descent parser for the Bob language. Produces the Stmt/Expr
// sums in src/ast.rs. Parse errors go through the shared ErrorReporter and
// the parser resynchronizes at statement boundaries, so one bad statement
// does not hide later ones.
//
// The parser marks a Call node as a tail call when it is the sole expression
// of a return statement; the interpreter defers those through a Thunk.

use crate::ast::{
    BinaryOp, ClassField, Expr, FunctionDecl, ImportItem, IncrementOp, Literal, Stmt, UnaryOp,
};
use crate::errors::ErrorReporter;
use crate::lexer::{Token, TokenType};
use std::cell::RefCell;
use std::rc::Rc;

struct ParseError;

type PResult<T> = Result<T, ParseError>;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    function_depth: usize,
    reporter: Option<Rc<RefCell<ErrorReporter>>>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, current: 0, function_depth: 0, reporter: None }
    }

    pub fn set_error_reporter(&mut self, reporter: Rc<RefCell<ErrorReporter>>) {
        self.reporter = Some(reporter);
    }

    pub fn parse(&mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(_) => self.synchronize(),
            }
        }
        statements
    }

    // Token plumbing

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn check(&self, token_type: TokenType) -> bool {
        self.peek().token_type == token_type
    }

    fn matches(&mut self, token_type: TokenType) -> bool {
        if self.check(token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> PResult<Token> {
        if self.check(token_type) {
            Ok(self.advance().clone())
        } else {
            Err(self.error_at_current(message))
        }
    }

    fn error_at_current(&mut self, message: &str) -> ParseError {
        let token = self.peek().clone();
        self.report(&token, message)
    }

    fn report(&mut self, token: &Token, message: &str) -> ParseError {
        if let Some(reporter) = &self.reporter {
            reporter.borrow_mut().report_error(
                token.line,
                token.column,
                "Parse Error",
                message,
                &token.lexeme,
                true,
            );
        }
        ParseError
    }

    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().token_type == TokenType::Semicolon {
                return;
            }
            match self.peek().token_type {
                TokenType::Class
                | TokenType::Func
                | TokenType::Var
                | TokenType::For
                | TokenType::Foreach
                | TokenType::If
                | TokenType::While
                | TokenType::Do
                | TokenType::Return
                | TokenType::Try
                | TokenType::Throw
                | TokenType::Import
                | TokenType::From
                | TokenType::Extension => return,
                _ => {}
            }
            self.advance();
        }
    }

    // Declarations

    fn declaration(&mut self) -> PResult<Stmt> {
        if self.matches(TokenType::Var) {
            return self.var_declaration();
        }
        if self.check(TokenType::Func)
            && self.tokens.get(self.current + 1).map(|t| t.token_type) == Some(TokenType::Identifier)
        {
            self.advance();
            let decl = self.function_declaration("function")?;
            return Ok(Stmt::Function(decl));
        }
        if self.matches(TokenType::Class) {
            return self.class_declaration();
        }
        if self.matches(TokenType::Extension) {
            return self.extension_declaration();
        }
        self.statement()
    }

    fn var_declaration(&mut self) -> PResult<Stmt> {
        let name = self.consume(TokenType::Identifier, "Expected variable name")?;
        let initializer = if self.matches(TokenType::Equal) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::Semicolon, "Expected ';' after variable declaration")?;
        Ok(Stmt::Var { name: name.lexeme.clone(), initializer, line: name.line, column: name.column })
    }

    fn function_declaration(&mut self, kind: &str) -> PResult<FunctionDecl> {
        let name = self.consume(TokenType::Identifier, &format!("Expected {} name", kind))?;
        self.consume(TokenType::LeftParen, &format!("Expected '(' after {} name", kind))?;
        let params = self.parameter_list()?;
        self.consume(TokenType::LeftBrace, &format!("Expected '{{' before {} body", kind))?;
        self.function_depth += 1;
        let body = self.block_statements();
        self.function_depth -= 1;
        Ok(FunctionDecl {
            name: name.lexeme.clone(),
            params,
            body: Rc::new(body?),
            line: name.line,
            column: name.column,
        })
    }

    fn parameter_list(&mut self) -> PResult<Vec<String>> {
        let mut params = Vec::new();
        if !self.check(TokenType::RightParen) {
            loop {
                let param = self.consume(TokenType::Identifier, "Expected parameter name")?;
                params.push(param.lexeme.clone());
                if !self.matches(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expected ')' after parameters")?;
        Ok(params)
    }

    fn class_declaration(&mut self) -> PResult<Stmt> {
        let name = self.consume(TokenType::Identifier, "Expected class name")?;
        let parent = if self.matches(TokenType::Extends) {
            Some(self.consume(TokenType::Identifier, "Expected parent class name")?.lexeme.clone())
        } else {
            None
        };
        self.consume(TokenType::LeftBrace, "Expected '{' before class body")?;

        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            if self.matches(TokenType::Var) {
                let field_name = self.consume(TokenType::Identifier, "Expected field name")?;
                let initializer = if self.matches(TokenType::Equal) {
                    Some(self.expression()?)
                } else {
                    None
                };
                self.consume(TokenType::Semicolon, "Expected ';' after field declaration")?;
                fields.push(ClassField { name: field_name.lexeme.clone(), initializer });
            } else if self.matches(TokenType::Func) {
                methods.push(self.function_declaration("method")?);
            } else {
                return Err(self.error_at_current("Expected field or method declaration in class body"));
            }
        }
        self.consume(TokenType::RightBrace, "Expected '}' after class body")?;
        Ok(Stmt::Class {
            name: name.lexeme.clone(),
            parent,
            fields,
            methods,
            line: name.line,
            column: name.column,
        })
    }

    fn extension_declaration(&mut self) -> PResult<Stmt> {
        let target = self.consume(TokenType::Identifier, "Expected extension target")?;
        self.consume(TokenType::LeftBrace, "Expected '{' before extension body")?;
        let mut methods = Vec::new();
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            self.consume(TokenType::Func, "Expected method declaration in extension body")?;
            methods.push(self.function_declaration("method")?);
        }
        self.consume(TokenType::RightBrace, "Expected '}' after extension body")?;
        Ok(Stmt::Extension { target: target.lexeme.clone(), methods })
    }

    // Statements

    fn statement(&mut self) -> PResult<Stmt> {
        if self.matches(TokenType::If) {
            return self.if_statement();
        }
        if self.matches(TokenType::While) {
            return self.while_statement();
        }
        if self.matches(TokenType::Do) {
            return self.do_while_statement();
        }
        if self.matches(TokenType::For) {
            return self.for_statement();
        }
        if self.matches(TokenType::Foreach) {
            return self.foreach_statement();
        }
        if self.matches(TokenType::Return) {
            return self.return_statement();
        }
        if self.matches(TokenType::Break) {
            self.consume(TokenType::Semicolon, "Expected ';' after 'break'")?;
            return Ok(Stmt::Break);
        }
        if self.matches(TokenType::Continue) {
            self.consume(TokenType::Semicolon, "Expected ';' after 'continue'")?;
            return Ok(Stmt::Continue);
        }
        if self.matches(TokenType::Try) {
            return self.try_statement();
        }
        if self.matches(TokenType::Throw) {
            let keyword = self.previous().clone();
            let value = self.expression()?;
            self.consume(TokenType::Semicolon, "Expected ';' after throw value")?;
            return Ok(Stmt::Throw { value, line: keyword.line, column: keyword.column });
        }
        if self.matches(TokenType::Import) {
            return self.import_statement();
        }
        if self.matches(TokenType::From) {
            return self.from_import_statement();
        }
        if self.matches(TokenType::LeftBrace) {
            return Ok(Stmt::Block { statements: self.block_statements()? });
        }
        self.expression_statement()
    }

    fn block_statements(&mut self) -> PResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(_) => self.synchronize(),
            }
        }
        self.consume(TokenType::RightBrace, "Expected '}' after block")?;
        Ok(statements)
    }

    fn if_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expected '(' after 'if'")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expected ')' after if condition")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.matches(TokenType::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If { condition, then_branch, else_branch })
    }

    fn while_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expected '(' after 'while'")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expected ')' after while condition")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body })
    }

    fn do_while_statement(&mut self) -> PResult<Stmt> {
        let body = Box::new(self.statement()?);
        self.consume(TokenType::While, "Expected 'while' after do body")?;
        self.consume(TokenType::LeftParen, "Expected '(' after 'while'")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expected ')' after do-while condition")?;
        self.consume(TokenType::Semicolon, "Expected ';' after do-while")?;
        Ok(Stmt::DoWhile { body, condition })
    }

    fn for_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expected '(' after 'for'")?;

        let initializer = if self.matches(TokenType::Semicolon) {
            None
        } else if self.matches(TokenType::Var) {
            Some(Box::new(self.var_declaration()?))
        } else {
            Some(Box::new(self.expression_statement()?))
        };

        let condition = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::Semicolon, "Expected ';' after for condition")?;

        let increment = if self.check(TokenType::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::RightParen, "Expected ')' after for clauses")?;

        let body = Box::new(self.statement()?);
        Ok(Stmt::For { initializer, condition, increment, body })
    }

    fn foreach_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expected '(' after 'foreach'")?;
        let name = self.consume(TokenType::Identifier, "Expected loop variable name")?;
        let separator = self.consume(TokenType::Identifier, "Expected 'in' after loop variable")?;
        if separator.lexeme != "in" {
            return Err(self.report(&separator, "Expected 'in' after loop variable"));
        }
        let collection = self.expression()?;
        self.consume(TokenType::RightParen, "Expected ')' after foreach collection")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::Foreach {
            name: name.lexeme.clone(),
            collection,
            body,
            line: name.line,
            column: name.column,
        })
    }

    fn return_statement(&mut self) -> PResult<Stmt> {
        let keyword = self.previous().clone();
        if self.function_depth == 0 {
            return Err(self.report(&keyword, "'return' outside of a function"));
        }
        let value = if self.check(TokenType::Semicolon) {
            None
        } else {
            let mut expr = self.expression()?;
            // The sole expression of a return statement: a direct call here
            // is a tail call.
            if let Expr::Call { is_tail_call, .. } = &mut expr {
                *is_tail_call = true;
            }
            Some(expr)
        };
        self.consume(TokenType::Semicolon, "Expected ';' after return value")?;
        Ok(Stmt::Return { value, line: keyword.line, column: keyword.column })
    }

    fn try_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenType::LeftBrace, "Expected '{' after 'try'")?;
        let try_block = Box::new(Stmt::Block { statements: self.block_statements()? });

        let mut catch_var = None;
        let mut catch_block = None;
        if self.matches(TokenType::Catch) {
            self.consume(TokenType::LeftParen, "Expected '(' after 'catch'")?;
            let var = self.consume(TokenType::Identifier, "Expected catch variable name")?;
            self.consume(TokenType::RightParen, "Expected ')' after catch variable")?;
            self.consume(TokenType::LeftBrace, "Expected '{' after catch clause")?;
            catch_var = Some(var.lexeme.clone());
            catch_block = Some(Box::new(Stmt::Block { statements: self.block_statements()? }));
        }

        let finally_block = if self.matches(TokenType::Finally) {
            self.consume(TokenType::LeftBrace, "Expected '{' after 'finally'")?;
            Some(Box::new(Stmt::Block { statements: self.block_statements()? }))
        } else {
            None
        };

        if catch_block.is_none() && finally_block.is_none() {
            return Err(self.error_at_current("Expected 'catch' or 'finally' after try block"));
        }
        Ok(Stmt::Try { try_block, catch_var, catch_block, finally_block })
    }

    fn module_spec(&mut self) -> PResult<Token> {
        if self.check(TokenType::Identifier) || self.check(TokenType::StringLit) {
            Ok(self.advance().clone())
        } else {
            Err(self.error_at_current("Expected module name"))
        }
    }

    fn import_statement(&mut self) -> PResult<Stmt> {
        let keyword = self.previous().clone();
        let module = self.module_spec()?;
        let alias = if self.matches(TokenType::As) {
            Some(self.consume(TokenType::Identifier, "Expected alias name after 'as'")?.lexeme.clone())
        } else {
            None
        };
        self.consume(TokenType::Semicolon, "Expected ';' after import")?;
        Ok(Stmt::Import {
            module: module.lexeme.clone(),
            alias,
            line: keyword.line,
            column: keyword.column,
        })
    }

    fn from_import_statement(&mut self) -> PResult<Stmt> {
        let keyword = self.previous().clone();
        let module = self.module_spec()?;
        self.consume(TokenType::Import, "Expected 'import' after module name")?;

        if self.matches(TokenType::Star) {
            self.consume(TokenType::Semicolon, "Expected ';' after import")?;
            return Ok(Stmt::FromImport {
                module: module.lexeme.clone(),
                items: Vec::new(),
                import_all: true,
                line: keyword.line,
                column: keyword.column,
            });
        }

        let mut items = Vec::new();
        loop {
            let name = self.consume(TokenType::Identifier, "Expected imported name")?;
            let alias = if self.matches(TokenType::As) {
                Some(
                    self.consume(TokenType::Identifier, "Expected alias name after 'as'")?
                        .lexeme
                        .clone(),
                )
            } else {
                None
            };
            items.push(ImportItem { name: name.lexeme.clone(), alias });
            if !self.matches(TokenType::Comma) {
                break;
            }
        }
        self.consume(TokenType::Semicolon, "Expected ';' after import")?;
        Ok(Stmt::FromImport {
            module: module.lexeme.clone(),
            items,
            import_all: false,
            line: keyword.line,
            column: keyword.column,
        })
    }

    fn expression_statement(&mut self) -> PResult<Stmt> {
        let expression = self.expression()?;
        self.consume(TokenType::Semicolon, "Expected ';' after expression")?;
        Ok(Stmt::Expression { expression })
    }

    // Expressions, lowest precedence first

    fn expression(&mut self) -> PResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> PResult<Expr> {
        let expr = self.ternary()?;

        let compound = match self.peek().token_type {
            TokenType::Equal => None,
            TokenType::PlusEqual => Some(BinaryOp::Plus),
            TokenType::MinusEqual => Some(BinaryOp::Minus),
            TokenType::StarEqual => Some(BinaryOp::Star),
            TokenType::SlashEqual => Some(BinaryOp::Slash),
            TokenType::PercentEqual => Some(BinaryOp::Percent),
            TokenType::BinAndEqual => Some(BinaryOp::BitAnd),
            TokenType::BinOrEqual => Some(BinaryOp::BitOr),
            TokenType::BinXorEqual => Some(BinaryOp::BitXor),
            TokenType::ShlEqual => Some(BinaryOp::Shl),
            TokenType::ShrEqual => Some(BinaryOp::Shr),
            _ => return Ok(expr),
        };
        let op_token = self.advance().clone();
        let value = self.assignment()?;

        match expr {
            Expr::Var { name, .. } => Ok(Expr::Assign {
                name,
                op: compound,
                value: Box::new(value),
                line: op_token.line,
                column: op_token.column,
            }),
            Expr::Property { object, name, line, column } if compound.is_none() => {
                Ok(Expr::PropertyAssign {
                    object,
                    name,
                    value: Box::new(value),
                    line,
                    column,
                })
            }
            Expr::ArrayIndex { collection, index, line, column } if compound.is_none() => {
                Ok(Expr::ArrayAssign {
                    collection,
                    index,
                    value: Box::new(value),
                    line,
                    column,
                })
            }
            _ => Err(self.report(&op_token, "Invalid assignment target")),
        }
    }

    fn ternary(&mut self) -> PResult<Expr> {
        let condition = self.logic_or()?;
        if self.matches(TokenType::Question) {
            let then_expr = self.expression()?;
            self.consume(TokenType::Colon, "Expected ':' in ternary expression")?;
            let else_expr = self.expression()?;
            return Ok(Expr::Ternary {
                condition: Box::new(condition),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            });
        }
        Ok(condition)
    }

    fn binary_level(
        &mut self,
        operand: fn(&mut Self) -> PResult<Expr>,
        table: &[(TokenType, BinaryOp)],
    ) -> PResult<Expr> {
        let mut expr = operand(self)?;
        'outer: loop {
            for (token_type, op) in table {
                if self.matches(*token_type) {
                    let token = self.previous().clone();
                    let right = operand(self)?;
                    expr = Expr::Binary {
                        left: Box::new(expr),
                        op: *op,
                        right: Box::new(right),
                        line: token.line,
                        column: token.column,
                    };
                    continue 'outer;
                }
            }
            break;
        }
        Ok(expr)
    }

    fn logic_or(&mut self) -> PResult<Expr> {
        self.binary_level(
            Self::logic_and,
            &[(TokenType::OrOr, BinaryOp::Or), (TokenType::Or, BinaryOp::Or)],
        )
    }

    fn logic_and(&mut self) -> PResult<Expr> {
        self.binary_level(
            Self::bit_or,
            &[(TokenType::AndAnd, BinaryOp::And), (TokenType::And, BinaryOp::And)],
        )
    }

    fn bit_or(&mut self) -> PResult<Expr> {
        self.binary_level(Self::bit_xor, &[(TokenType::BinOr, BinaryOp::BitOr)])
    }

    fn bit_xor(&mut self) -> PResult<Expr> {
        self.binary_level(Self::bit_and, &[(TokenType::BinXor, BinaryOp::BitXor)])
    }

    fn bit_and(&mut self) -> PResult<Expr> {
        self.binary_level(Self::equality, &[(TokenType::BinAnd, BinaryOp::BitAnd)])
    }

    fn equality(&mut self) -> PResult<Expr> {
        self.binary_level(
            Self::comparison,
            &[
                (TokenType::EqualEqual, BinaryOp::EqualEqual),
                (TokenType::BangEqual, BinaryOp::BangEqual),
            ],
        )
    }

    fn comparison(&mut self) -> PResult<Expr> {
        self.binary_level(
            Self::shift,
            &[
                (TokenType::Greater, BinaryOp::Greater),
                (TokenType::GreaterEqual, BinaryOp::GreaterEqual),
                (TokenType::Less, BinaryOp::Less),
                (TokenType::LessEqual, BinaryOp::LessEqual),
            ],
        )
    }

    fn shift(&mut self) -> PResult<Expr> {
        self.binary_level(
            Self::term,
            &[(TokenType::Shl, BinaryOp::Shl), (TokenType::Shr, BinaryOp::Shr)],
        )
    }

    fn term(&mut self) -> PResult<Expr> {
        self.binary_level(
            Self::factor,
            &[(TokenType::Plus, BinaryOp::Plus), (TokenType::Minus, BinaryOp::Minus)],
        )
    }

    fn factor(&mut self) -> PResult<Expr> {
        self.binary_level(
            Self::unary,
            &[
                (TokenType::Star, BinaryOp::Star),
                (TokenType::Slash, BinaryOp::Slash),
                (TokenType::Percent, BinaryOp::Percent),
            ],
        )
    }

    fn unary(&mut self) -> PResult<Expr> {
        let op = match self.peek().token_type {
            TokenType::Bang => Some(UnaryOp::Bang),
            TokenType::Minus => Some(UnaryOp::Minus),
            TokenType::BinNot => Some(UnaryOp::BitNot),
            _ => None,
        };
        if let Some(op) = op {
            let token = self.advance().clone();
            let operand = self.unary()?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
                line: token.line,
                column: token.column,
            });
        }

        if self.check(TokenType::PlusPlus) || self.check(TokenType::MinusMinus) {
            let token = self.advance().clone();
            let op = if token.token_type == TokenType::PlusPlus {
                IncrementOp::Increment
            } else {
                IncrementOp::Decrement
            };
            let operand = self.unary()?;
            return Ok(Expr::Increment {
                op,
                operand: Box::new(operand),
                is_prefix: true,
                line: token.line,
                column: token.column,
            });
        }

        self.postfix()
    }

    fn postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.matches(TokenType::LeftParen) {
                let paren = self.previous().clone();
                let mut arguments = Vec::new();
                if !self.check(TokenType::RightParen) {
                    loop {
                        arguments.push(self.expression()?);
                        if !self.matches(TokenType::Comma) {
                            break;
                        }
                    }
                }
                self.consume(TokenType::RightParen, "Expected ')' after arguments")?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    arguments,
                    is_tail_call: false,
                    line: paren.line,
                    column: paren.column,
                };
            } else if self.matches(TokenType::LeftBracket) {
                let bracket = self.previous().clone();
                let index = self.expression()?;
                self.consume(TokenType::RightBracket, "Expected ']' after index")?;
                expr = Expr::ArrayIndex {
                    collection: Box::new(expr),
                    index: Box::new(index),
                    line: bracket.line,
                    column: bracket.column,
                };
            } else if self.matches(TokenType::Dot) {
                let name = self.consume(TokenType::Identifier, "Expected property name after '.'")?;
                expr = Expr::Property {
                    object: Box::new(expr),
                    name: name.lexeme.clone(),
                    line: name.line,
                    column: name.column,
                };
            } else if self.check(TokenType::PlusPlus) || self.check(TokenType::MinusMinus) {
                let token = self.advance().clone();
                let op = if token.token_type == TokenType::PlusPlus {
                    IncrementOp::Increment
                } else {
                    IncrementOp::Decrement
                };
                expr = Expr::Increment {
                    op,
                    operand: Box::new(expr),
                    is_prefix: false,
                    line: token.line,
                    column: token.column,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> PResult<Expr> {
        let token = self.peek().clone();
        match token.token_type {
            TokenType::None => {
                self.advance();
                Ok(Expr::Literal { value: Literal::None, line: token.line, column: token.column })
            }
            TokenType::True | TokenType::False => {
                self.advance();
                Ok(Expr::Literal {
                    value: Literal::Boolean(token.token_type == TokenType::True),
                    line: token.line,
                    column: token.column,
                })
            }
            TokenType::IntegerLit => {
                self.advance();
                let value = token.lexeme.parse::<i64>().map_err(|_| {
                    self.report(&token, "Integer literal out of range")
                })?;
                Ok(Expr::Literal {
                    value: Literal::Integer(value),
                    line: token.line,
                    column: token.column,
                })
            }
            TokenType::BigIntLit => {
                self.advance();
                Ok(Expr::Literal {
                    value: Literal::BigIntLit(token.lexeme.clone()),
                    line: token.line,
                    column: token.column,
                })
            }
            TokenType::NumberLit => {
                self.advance();
                let value = token.lexeme.parse::<f64>().map_err(|_| {
                    self.report(&token, "Invalid number literal")
                })?;
                Ok(Expr::Literal {
                    value: Literal::Number(value),
                    line: token.line,
                    column: token.column,
                })
            }
            TokenType::StringLit => {
                self.advance();
                Ok(Expr::Literal {
                    value: Literal::Str(token.lexeme.clone()),
                    line: token.line,
                    column: token.column,
                })
            }
            TokenType::Identifier | TokenType::This | TokenType::Super => {
                self.advance();
                Ok(Expr::Var { name: token.lexeme.clone(), line: token.line, column: token.column })
            }
            TokenType::LeftParen => {
                self.advance();
                let expression = self.expression()?;
                self.consume(TokenType::RightParen, "Expected ')' after expression")?;
                Ok(Expr::Grouping { expression: Box::new(expression) })
            }
            TokenType::LeftBracket => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check(TokenType::RightBracket) {
                    loop {
                        elements.push(self.expression()?);
                        if !self.matches(TokenType::Comma) {
                            break;
                        }
                    }
                }
                self.consume(TokenType::RightBracket, "Expected ']' after array elements")?;
                Ok(Expr::ArrayLiteral { elements })
            }
            TokenType::LeftBrace => {
                self.advance();
                let mut pairs = Vec::new();
                if !self.check(TokenType::RightBrace) {
                    loop {
                        let key =
                            self.consume(TokenType::StringLit, "Expected string key in dictionary")?;
                        self.consume(TokenType::Colon, "Expected ':' after dictionary key")?;
                        let value = self.expression()?;
                        pairs.push((key.lexeme.clone(), value));
                        if !self.matches(TokenType::Comma) {
                            break;
                        }
                    }
                }
                self.consume(TokenType::RightBrace, "Expected '}' after dictionary entries")?;
                Ok(Expr::DictLiteral { pairs })
            }
            TokenType::Func => {
                self.advance();
                self.consume(TokenType::LeftParen, "Expected '(' after 'func'")?;
                let params = self.parameter_list()?;
                self.consume(TokenType::LeftBrace, "Expected '{' before function body")?;
                self.function_depth += 1;
                let body = self.block_statements();
                self.function_depth -= 1;
                Ok(Expr::FunctionExpr { params, body: Rc::new(body?) })
            }
            _ => Err(self.error_at_current("Expected expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(source: &str) -> Vec<Stmt> {
        Parser::new(tokenize(source)).parse()
    }

    #[test]
    fn parses_precedence() {
        let stmts = parse("var x = 2 + 3 * 4;");
        let Stmt::Var { initializer: Some(Expr::Binary { op, right, .. }), .. } = &stmts[0] else {
            panic!("expected var with binary initializer");
        };
        assert_eq!(*op, BinaryOp::Plus);
        assert!(matches!(right.as_ref(), Expr::Binary { op: BinaryOp::Star, .. }));
    }

    #[test]
    fn marks_return_calls_as_tail_calls() {
        let stmts = parse("func f(n){ return f(n); }");
        let Stmt::Function(decl) = &stmts[0] else { panic!("expected function") };
        let Stmt::Return { value: Some(Expr::Call { is_tail_call, .. }), .. } = &decl.body[0]
        else {
            panic!("expected return with call");
        };
        assert!(is_tail_call);

        // A call that is part of a larger expression is not a tail call.
        let stmts = parse("func g(n){ return g(n) + 1; }");
        let Stmt::Function(decl) = &stmts[0] else { panic!("expected function") };
        let Stmt::Return { value: Some(Expr::Binary { left, .. }), .. } = &decl.body[0] else {
            panic!("expected return with binary");
        };
        assert!(matches!(left.as_ref(), Expr::Call { is_tail_call: false, .. }));
    }

    #[test]
    fn parses_class_with_fields_and_methods() {
        let stmts = parse("class Dog extends Animal { var name = \"rex\"; func bark(){ } }");
        let Stmt::Class { name, parent, fields, methods, .. } = &stmts[0] else {
            panic!("expected class");
        };
        assert_eq!(name, "Dog");
        assert_eq!(parent.as_deref(), Some("Animal"));
        assert_eq!(fields.len(), 1);
        assert_eq!(methods.len(), 1);
    }

    #[test]
    fn parses_try_catch_finally() {
        let stmts = parse("try { throw \"x\"; } catch (e) { } finally { }");
        let Stmt::Try { catch_var, catch_block, finally_block, .. } = &stmts[0] else {
            panic!("expected try");
        };
        assert_eq!(catch_var.as_deref(), Some("e"));
        assert!(catch_block.is_some());
        assert!(finally_block.is_some());
    }

    #[test]
    fn parses_import_forms() {
        let stmts = parse("import math; import math as m; from math import sin, cos as c; from math import *;");
        assert!(matches!(&stmts[0], Stmt::Import { module, alias: None, .. } if module == "math"));
        assert!(
            matches!(&stmts[1], Stmt::Import { alias: Some(a), .. } if a == "m")
        );
        let Stmt::FromImport { items, import_all: false, .. } = &stmts[2] else {
            panic!("expected from-import");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].alias.as_deref(), Some("c"));
        assert!(matches!(&stmts[3], Stmt::FromImport { import_all: true, .. }));
    }

    #[test]
    fn parses_foreach_with_contextual_in() {
        let stmts = parse("foreach (item in [1, 2]) { }");
        assert!(matches!(&stmts[0], Stmt::Foreach { name, .. } if name == "item"));
    }

    #[test]
    fn parses_increment_forms() {
        let stmts = parse("var x = 0; x++; ++x; x--;");
        assert!(matches!(
            &stmts[1],
            Stmt::Expression { expression: Expr::Increment { is_prefix: false, .. } }
        ));
        assert!(matches!(
            &stmts[2],
            Stmt::Expression { expression: Expr::Increment { is_prefix: true, .. } }
        ));
    }

    #[test]
    fn parses_compound_assignment() {
        let stmts = parse("var x = 1; x += 2; x <<= 1;");
        assert!(matches!(
            &stmts[1],
            Stmt::Expression { expression: Expr::Assign { op: Some(BinaryOp::Plus), .. } }
        ));
        assert!(matches!(
            &stmts[2],
            Stmt::Expression { expression: Expr::Assign { op: Some(BinaryOp::Shl), .. } }
        ));
    }

    #[test]
    fn dict_literals_require_string_keys() {
        let stmts = parse("var d = {\"a\": 1, \"b\": 2};");
        let Stmt::Var { initializer: Some(Expr::DictLiteral { pairs }), .. } = &stmts[0] else {
            panic!("expected dict literal");
        };
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn return_outside_function_is_rejected() {
        let stmts = parse("return 1;");
        assert!(stmts.is_empty());
    }
}
