// File: src/interpreter/executor.rs
//
// Statement execution: one exhaustive match over Stmt. Non-local transfer
// (return/break/continue/throw) travels through the ExecutionContext; every
// block and loop checks it after each child statement and short-circuits.
// A throw escaping a call shows up on the interpreter's pending-throw
// channel and is folded into the context here.

use crate::ast::{ClassField, FunctionDecl, Stmt};
use crate::errors::RuntimeError;
use crate::module::module_name_from_key;
use std::rc::Rc;

use super::control_flow::ExecutionContext;
use super::value::{Function, Value};
use super::{DictMap, Environment, Interpreter};

impl Interpreter {
    pub(crate) fn execute_stmt(
        &mut self,
        stmt: &Stmt,
        ctx: &mut ExecutionContext,
    ) -> Result<(), RuntimeError> {
        match stmt {
            Stmt::Block { statements } => {
                let env = Environment::with_parent(self.environment());
                self.execute_block(statements, env, ctx)
            }
            Stmt::Expression { expression } => {
                let value = self.evaluate(expression)?;
                if self.pending_to_context(ctx) {
                    return Ok(());
                }
                if self.is_interactive() {
                    self.echo_value(&value);
                }
                Ok(())
            }
            Stmt::Var { name, initializer, .. } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::None,
                };
                if self.pending_to_context(ctx) {
                    return Ok(());
                }
                self.environment().define(name.clone(), value);
                Ok(())
            }
            Stmt::Function(decl) => {
                let function = self.build_function(decl, "", self.current_module().to_string());
                self.function_registry.add_function(Rc::clone(&function));
                self.environment().define(decl.name.clone(), Value::Function(function));
                Ok(())
            }
            Stmt::Return { value, .. } => {
                let result = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::None,
                };
                if self.pending_to_context(ctx) {
                    return Ok(());
                }
                if ctx.is_function_body {
                    ctx.has_return = true;
                    ctx.return_value = result;
                }
                Ok(())
            }
            Stmt::If { condition, then_branch, else_branch } => {
                let condition = self.evaluate(condition)?;
                if self.pending_to_context(ctx) {
                    return Ok(());
                }
                if condition.truthy() {
                    self.execute_stmt(then_branch, ctx)
                } else if let Some(else_branch) = else_branch {
                    self.execute_stmt(else_branch, ctx)
                } else {
                    Ok(())
                }
            }
            Stmt::While { condition, body } => {
                let mut loop_ctx = ctx.loop_child();
                loop {
                    let condition = self.evaluate(condition)?;
                    if self.pending_to_context(ctx) {
                        return Ok(());
                    }
                    if !condition.truthy() {
                        break;
                    }
                    self.execute_stmt(body, &mut loop_ctx)?;
                    if self.drain_loop_iteration(&mut loop_ctx, ctx) {
                        break;
                    }
                }
                Ok(())
            }
            Stmt::DoWhile { body, condition } => {
                let mut loop_ctx = ctx.loop_child();
                loop {
                    self.execute_stmt(body, &mut loop_ctx)?;
                    if self.drain_loop_iteration(&mut loop_ctx, ctx) {
                        break;
                    }
                    let condition = self.evaluate(condition)?;
                    if self.pending_to_context(ctx) {
                        return Ok(());
                    }
                    if !condition.truthy() {
                        break;
                    }
                }
                Ok(())
            }
            Stmt::For { initializer, condition, increment, body } => {
                if let Some(initializer) = initializer {
                    self.execute_stmt(initializer, ctx)?;
                    if ctx.interrupted() {
                        return Ok(());
                    }
                }
                let mut loop_ctx = ctx.loop_child();
                loop {
                    if let Some(condition) = condition {
                        let condition = self.evaluate(condition)?;
                        if self.pending_to_context(ctx) {
                            return Ok(());
                        }
                        if !condition.truthy() {
                            break;
                        }
                    }
                    self.execute_stmt(body, &mut loop_ctx)?;
                    let stop = self.drain_loop_iteration(&mut loop_ctx, ctx);
                    if stop {
                        break;
                    }
                    if let Some(increment) = increment {
                        self.evaluate(increment)?;
                        if self.pending_to_context(ctx) {
                            return Ok(());
                        }
                    }
                }
                Ok(())
            }
            Stmt::Foreach { name, collection, body, line, column } => {
                self.execute_foreach(name, collection, body, *line, *column, ctx)
            }
            Stmt::Break => {
                ctx.should_break = true;
                Ok(())
            }
            Stmt::Continue => {
                ctx.should_continue = true;
                Ok(())
            }
            Stmt::Class { name, parent, fields, methods, .. } => {
                self.execute_class(name, parent.as_deref(), fields, methods)
            }
            Stmt::Extension { target, methods } => {
                for decl in methods {
                    let function =
                        self.build_function(decl, target, self.current_module().to_string());
                    self.function_registry.add_function(Rc::clone(&function));
                    self.extension_registry.register(target, function);
                }
                Ok(())
            }
            Stmt::Try { try_block, catch_var, catch_block, finally_block } => {
                self.execute_try(
                    try_block,
                    catch_var.as_deref(),
                    catch_block.as_deref(),
                    finally_block.as_deref(),
                    ctx,
                )
            }
            Stmt::Throw { value, line, column } => {
                let value = self.evaluate(value)?;
                if self.pending_to_context(ctx) {
                    return Ok(());
                }
                ctx.set_throw(value, *line, *column);
                Ok(())
            }
            Stmt::Import { module, alias, line, column } => {
                let value = self.import_module(module, *line, *column)?;
                let binding = alias.clone().unwrap_or_else(|| module_name_from_key(module));
                self.environment().define(binding, value);
                Ok(())
            }
            Stmt::FromImport { module, items, import_all, line, column } => {
                let pairs: Vec<(String, String)> = items
                    .iter()
                    .map(|item| {
                        (item.name.clone(), item.alias.clone().unwrap_or_else(|| item.name.clone()))
                    })
                    .collect();
                self.from_import(module, &pairs, *import_all, *line, *column)
            }
        }
    }

    pub(crate) fn execute_block(
        &mut self,
        statements: &[Stmt],
        env: Rc<Environment>,
        ctx: &mut ExecutionContext,
    ) -> Result<(), RuntimeError> {
        let previous = std::mem::replace(&mut self.environment, env);
        let mut result = Ok(());
        for stmt in statements {
            result = self.execute_stmt(stmt, ctx);
            if result.is_err() || ctx.interrupted() {
                break;
            }
        }
        self.set_environment(previous);
        result
    }

    /// Fold one loop-body run back into the enclosing context. Returns true
    /// when the loop should stop.
    fn drain_loop_iteration(
        &mut self,
        loop_ctx: &mut ExecutionContext,
        ctx: &mut ExecutionContext,
    ) -> bool {
        if loop_ctx.has_return {
            ctx.has_return = true;
            ctx.return_value = std::mem::replace(&mut loop_ctx.return_value, Value::None);
            return true;
        }
        if loop_ctx.has_throw {
            ctx.set_throw(
                std::mem::replace(&mut loop_ctx.thrown_value, Value::None),
                loop_ctx.throw_line,
                loop_ctx.throw_column,
            );
            return true;
        }
        if loop_ctx.should_break {
            return true;
        }
        if loop_ctx.should_continue {
            loop_ctx.should_continue = false;
        }
        false
    }

    fn execute_foreach(
        &mut self,
        name: &str,
        collection: &crate::ast::Expr,
        body: &Stmt,
        line: u32,
        column: u32,
        ctx: &mut ExecutionContext,
    ) -> Result<(), RuntimeError> {
        let collection = self.evaluate(collection)?;
        if self.pending_to_context(ctx) {
            return Ok(());
        }

        // Snapshot the iteration space so mutation inside the body cannot
        // invalidate it mid-loop.
        let items: Vec<Value> = match &collection {
            Value::Array(array) => array.borrow().clone(),
            Value::Dict(dict) => dict.borrow().keys().map(|k| Value::str(k.clone())).collect(),
            Value::Str(text) => text.chars().map(|c| Value::str(c.to_string())).collect(),
            _ => {
                return Err(self.fail(
                    line,
                    column,
                    crate::errors::ErrorKind::RuntimeError,
                    "foreach can only iterate arrays, dictionaries, and strings",
                ));
            }
        };

        let mut loop_ctx = ctx.loop_child();
        for item in items {
            let env = Environment::with_parent(self.environment());
            env.define(name.to_string(), item);
            let body_slice = std::slice::from_ref(body);
            self.execute_block(body_slice, env, &mut loop_ctx)?;
            if self.drain_loop_iteration(&mut loop_ctx, ctx) {
                break;
            }
        }
        Ok(())
    }

    fn build_function(
        &self,
        decl: &FunctionDecl,
        owner_class: &str,
        source_module: String,
    ) -> Rc<Function> {
        let mut function = Function::new(
            decl.name.clone(),
            decl.params.clone(),
            Rc::clone(&decl.body),
            self.environment(),
        );
        function.owner_class = owner_class.to_string();
        function.source_module = source_module;
        Rc::new(function)
    }

    fn execute_class(
        &mut self,
        name: &str,
        parent: Option<&str>,
        fields: &[ClassField],
        methods: &[FunctionDecl],
    ) -> Result<(), RuntimeError> {
        self.class_registry.register_class(name, parent.unwrap_or(""));

        for decl in methods {
            let function = self.build_function(decl, name, self.current_module().to_string());
            self.function_registry.add_function(Rc::clone(&function));
            self.class_registry.add_method_overload(name, function);
        }

        // Template of constant defaults; all declared fields get a slot so
        // instances carry the full shape. Initializer expressions are kept
        // in source order and re-evaluated at construction time.
        let mut template = DictMap::new();
        let mut initializers = Vec::new();
        for field in fields {
            match &field.initializer {
                Some(crate::ast::Expr::Literal { value, .. }) => {
                    let constant = match value {
                        crate::ast::Literal::None => Value::None,
                        crate::ast::Literal::Boolean(b) => Value::Boolean(*b),
                        crate::ast::Literal::Integer(i) => Value::Integer(*i),
                        crate::ast::Literal::Number(n) => Value::Number(*n),
                        crate::ast::Literal::Str(s) => Value::str(s.clone()),
                        crate::ast::Literal::BigIntLit(digits) => {
                            Value::bigint(digits.parse().unwrap_or_default())
                        }
                    };
                    template.insert(field.name.clone(), constant);
                }
                Some(_) => {
                    template.insert(field.name.clone(), Value::None);
                }
                None => {
                    template.insert(field.name.clone(), Value::None);
                }
            }
            if let Some(expr) = &field.initializer {
                initializers.push((field.name.clone(), expr.clone()));
            }
        }
        self.class_registry.set_template(name, template);
        self.class_registry.set_field_initializers(name, initializers);

        // The constructor is a builtin bound to the class name.
        let class_name = name.to_string();
        let constructor = Value::builtin(
            name,
            Box::new(move |interp, args, line, column| {
                interp.construct_instance(&class_name, &args, line, column)
            }),
        );
        if let Value::Builtin(builtin) = &constructor {
            self.function_registry.add_builtin(Rc::clone(builtin));
        }
        self.environment().define(name.to_string(), constructor);
        Ok(())
    }

    fn execute_try(
        &mut self,
        try_block: &Stmt,
        catch_var: Option<&str>,
        catch_block: Option<&Stmt>,
        finally_block: Option<&Stmt>,
        ctx: &mut ExecutionContext,
    ) -> Result<(), RuntimeError> {
        self.enter_try();
        let try_result = self.execute_stmt(try_block, ctx);
        self.exit_try();

        // A native failure inside the try becomes a thrown value: the
        // message binds to the catch variable like a user throw. When a
        // pending throw is the root cause, it wins over the surface error.
        if let Err(error) = try_result {
            if let Some((value, line, column)) = self.take_pending_throw() {
                ctx.set_throw(value, line, column);
            } else {
                ctx.set_throw(Value::str(error.message.clone()), error.line, error.column);
            }
        }

        if ctx.has_throw {
            if let Some(catch_block) = catch_block {
                let thrown = std::mem::replace(&mut ctx.thrown_value, Value::None);
                ctx.has_throw = false;
                ctx.throw_line = 0;
                ctx.throw_column = 0;
                // Consume the parked reporter error; the catch decides
                // whether anything surfaces.
                let _ = self.error_reporter().borrow_mut().take_last_error();

                let env = Environment::with_parent(self.environment());
                if let Some(var) = catch_var {
                    env.define(var.to_string(), thrown);
                }
                match catch_block {
                    Stmt::Block { statements } => self.execute_block(statements, env, ctx)?,
                    other => {
                        let body = std::slice::from_ref(other);
                        self.execute_block(body, env, ctx)?
                    }
                }
            }
        }

        // finally always runs; a transfer it sets supersedes any pending one.
        if let Some(finally_block) = finally_block {
            let saved_return = ctx.has_return;
            let saved_return_value = std::mem::replace(&mut ctx.return_value, Value::None);
            let saved_break = ctx.should_break;
            let saved_continue = ctx.should_continue;
            let saved_throw = ctx.has_throw;
            let saved_thrown = std::mem::replace(&mut ctx.thrown_value, Value::None);
            let saved_throw_site = (ctx.throw_line, ctx.throw_column);

            ctx.has_return = false;
            ctx.should_break = false;
            ctx.should_continue = false;
            ctx.has_throw = false;
            ctx.throw_line = 0;
            ctx.throw_column = 0;

            self.execute_stmt(finally_block, ctx)?;

            if !ctx.interrupted() {
                ctx.has_return = saved_return;
                ctx.return_value = saved_return_value;
                ctx.should_break = saved_break;
                ctx.should_continue = saved_continue;
                ctx.has_throw = saved_throw;
                ctx.thrown_value = saved_thrown;
                ctx.throw_line = saved_throw_site.0;
                ctx.throw_column = saved_throw_site.1;
            }
        }

        Ok(())
    }
}
