// File: src/interpreter/mod.rs
//
// Tree-walking interpreter for the Bob language. The Interpreter owns the
// environment chain, the function/class/extension registries, and the module
// cache; it drives statement execution (executor.rs) and expression
// evaluation (evaluator.rs), and unwinds tail-call thunks through the
// trampoline in `evaluate`.
//
// Non-local control flow inside call bodies travels through a per-call
// ExecutionContext; a `throw` escaping a call is parked on the interpreter's
// single-slot pending-throw channel and re-raised by the caller's statement
// driver, so try/catch composes with native error paths.

pub mod control_flow;
pub mod environment;
mod evaluator;
mod executor;
pub mod registries;
pub mod value;

pub use environment::Environment;
pub use value::{BuiltinFunction, CallInfo, DictMap, Function, Module, Thunk, Value};

use crate::ast::{Expr, Stmt};
use crate::errors::{ErrorKind, ErrorReporter, RuntimeError};
use crate::lexer::Lexer;
use crate::module::{module_name_from_key, ModuleBuilder, ModuleLoader, ResolvedSpec};
use crate::parser::Parser;
use control_flow::ExecutionContext;
use registries::{ClassRegistry, ExtensionRegistry, FunctionRegistry, INHERITANCE_DEPTH_GUARD};
use std::cell::RefCell;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;
use value::SmallIntPool;

/// Instance dicts carry their class under this key.
pub const CLASS_KEY: &str = "__class";
/// Synthetic super objects carry this marker.
pub const SUPER_KEY: &str = "__super";
/// Method frames bind the executing method's class under this name.
pub const CURRENT_CLASS_KEY: &str = "__currentClass";

pub struct Interpreter {
    environment: Rc<Environment>,
    globals: Rc<Environment>,
    interactive: bool,
    reporter: Rc<RefCell<ErrorReporter>>,
    pub(crate) function_registry: FunctionRegistry,
    pub(crate) class_registry: ClassRegistry,
    pub(crate) extension_registry: ExtensionRegistry,
    pub(crate) module_loader: ModuleLoader,
    pending_throw: Option<(Value, u32, u32)>,
    try_depth: usize,
    in_thunk_execution: bool,
    pub(crate) small_ints: SmallIntPool,
    argv: Vec<String>,
    executable_path: String,
    current_module: String,
    output: Option<Rc<RefCell<Vec<u8>>>>,
    last_error_site: (u32, u32),
}

impl Interpreter {
    pub fn new(interactive: bool) -> Self {
        let globals = Environment::new();
        let mut interpreter = Interpreter {
            environment: Rc::clone(&globals),
            globals,
            interactive,
            reporter: Rc::new(RefCell::new(ErrorReporter::new())),
            function_registry: FunctionRegistry::new(),
            class_registry: ClassRegistry::new(),
            extension_registry: ExtensionRegistry::new(),
            module_loader: ModuleLoader::new(),
            pending_throw: None,
            try_depth: 0,
            in_thunk_execution: false,
            small_ints: SmallIntPool::new(),
            argv: Vec::new(),
            executable_path: String::new(),
            current_module: String::new(),
            output: None,
            last_error_site: (0, 0),
        };
        crate::modules::register_all(&mut interpreter);
        interpreter
    }

    // Host embedding API

    pub fn set_error_reporter(&mut self, reporter: Rc<RefCell<ErrorReporter>>) {
        self.reporter = reporter;
    }

    pub fn error_reporter(&self) -> Rc<RefCell<ErrorReporter>> {
        Rc::clone(&self.reporter)
    }

    pub fn set_argv(&mut self, args: Vec<String>, executable_path: String) {
        self.argv = args;
        self.executable_path = executable_path;
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn executable_path(&self) -> &str {
        &self.executable_path
    }

    pub fn set_module_policy(
        &mut self,
        allow_files: bool,
        prefer_files: bool,
        search_paths: Vec<String>,
    ) {
        self.module_loader.set_policy(allow_files, prefer_files, search_paths);
    }

    pub fn set_builtin_module_policy(&mut self, allow: bool) {
        self.module_loader.registry.set_policy(allow);
    }

    pub fn set_builtin_module_allow_list(&mut self, allowed: Vec<String>) {
        self.module_loader.registry.set_allow_list(allowed);
    }

    pub fn set_builtin_module_deny_list(&mut self, denied: Vec<String>) {
        self.module_loader.registry.set_deny_list(denied);
    }

    pub fn register_module(&mut self, name: &str, init: impl Fn(&mut ModuleBuilder) + 'static) {
        self.module_loader.registry.register(name, Rc::new(init));
    }

    pub fn module_cache_snapshot(&self) -> DictMap {
        self.module_loader.cache_snapshot()
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Redirect print output into a buffer; used by tests and embedders.
    pub fn set_output(&mut self, sink: Rc<RefCell<Vec<u8>>>) {
        self.output = Some(sink);
    }

    pub(crate) fn write_out(&mut self, text: &str, newline: bool) {
        if let Some(sink) = &self.output {
            let mut sink = sink.borrow_mut();
            sink.extend_from_slice(text.as_bytes());
            if newline {
                sink.push(b'\n');
            }
        } else if newline {
            println!("{}", text);
        } else {
            print!("{}", text);
            let _ = std::io::stdout().flush();
        }
    }

    // Environment plumbing

    pub fn environment(&self) -> Rc<Environment> {
        Rc::clone(&self.environment)
    }

    pub(crate) fn set_environment(&mut self, env: Rc<Environment>) {
        self.environment = env;
    }

    pub fn globals(&self) -> Rc<Environment> {
        Rc::clone(&self.globals)
    }

    // Error plumbing

    /// Record the site, report through the shared reporter (which suppresses
    /// display inside a try), and build the error value for propagation.
    pub(crate) fn fail(
        &mut self,
        line: u32,
        column: u32,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> RuntimeError {
        let message = message.into();
        self.last_error_site = (line, column);
        self.reporter.borrow_mut().report_error(
            line,
            column,
            &kind.to_string(),
            &message,
            "",
            true,
        );
        RuntimeError::new(kind, message, line, column)
    }

    pub(crate) fn enter_try(&mut self) {
        self.try_depth += 1;
        self.reporter.borrow_mut().enter_try();
    }

    pub(crate) fn exit_try(&mut self) {
        if self.try_depth > 0 {
            self.try_depth -= 1;
        }
        self.reporter.borrow_mut().exit_try();
    }

    pub fn is_in_try(&self) -> bool {
        self.try_depth > 0
    }

    // Pending-throw channel

    pub(crate) fn set_pending_throw(&mut self, value: Value, line: u32, column: u32) {
        self.pending_throw = Some((value, line, column));
    }

    pub(crate) fn take_pending_throw(&mut self) -> Option<(Value, u32, u32)> {
        self.pending_throw.take()
    }

    /// Move a pending throw into the statement context. True when a throw
    /// was transferred and the current statement should unwind.
    pub(crate) fn pending_to_context(&mut self, ctx: &mut ExecutionContext) -> bool {
        if let Some((value, line, column)) = self.pending_throw.take() {
            ctx.set_throw(value, line, column);
            true
        } else {
            false
        }
    }

    // Evaluation boundary and trampoline

    /// Evaluate an expression, then drain any tail-call thunks. While a
    /// thunk runs, nested `evaluate` calls must not trampoline or thunks
    /// would be unwrapped too eagerly.
    pub(crate) fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        let result = self.evaluate_expr(expr)?;
        if self.in_thunk_execution {
            return Ok(result);
        }
        self.force_thunks(result)
    }

    /// The trampoline: repeatedly invoke thunks until a plain value remains.
    pub(crate) fn force_thunks(&mut self, initial: Value) -> Result<Value, RuntimeError> {
        let mut current = initial;
        while let Value::Thunk(thunk) = current {
            let previous = self.in_thunk_execution;
            self.in_thunk_execution = true;
            let result = self.execute_call(thunk.callee.clone(), &thunk.call);
            self.in_thunk_execution = previous;
            current = result?;
        }
        Ok(current)
    }

    // Call analysis, resolution, and invocation

    /// Classify the call, then evaluate receiver, callee, and arguments left
    /// to right.
    pub(crate) fn analyze_call(
        &mut self,
        callee_expr: &Expr,
        arguments: &[Expr],
        line: u32,
        column: u32,
    ) -> Result<(Value, CallInfo), RuntimeError> {
        let mut info = CallInfo::plain(Vec::new(), line, column);
        let mut callee = Value::None;

        if let Expr::Property { object, name, .. } = callee_expr {
            info.method_name = Some(name.clone());
            if matches!(object.as_ref(), Expr::Var { name, .. } if name == "super") {
                info.is_super_call = true;
                info.receiver = Some(self.environment.get("this").unwrap_or(Value::None));
            } else {
                let receiver = self.evaluate(object)?;
                callee = self.read_property(&receiver, name, line, column)?;
                info.receiver = Some(receiver);
            }
        } else {
            callee = self.evaluate(callee_expr)?;
        }

        for argument in arguments {
            info.arguments.push(self.evaluate(argument)?);
        }
        Ok((callee, info))
    }

    /// Resolve the callable per the dispatch order: direct value, super
    /// walk, or extension fallback. Fails when nothing callable remains.
    pub(crate) fn resolve_callee(
        &mut self,
        callee: Value,
        info: &CallInfo,
    ) -> Result<Value, RuntimeError> {
        let mut callee = callee;

        if info.is_super_call {
            let receiver = info.receiver.clone().unwrap_or(Value::None);
            let Value::Dict(_) = &receiver else {
                return Err(self.fail(
                    info.line,
                    info.column,
                    ErrorKind::RuntimeError,
                    "super can only be used inside class methods",
                ));
            };
            callee = self.resolve_super_method(&receiver, info)?;
        } else if info.method_name.is_some() && !callee.is_function() && !callee.is_builtin() {
            if let (Some(receiver), Some(name)) = (&info.receiver, &info.method_name) {
                if let Some(found) =
                    self.resolve_extension_method(receiver, name, info.arguments.len())
                {
                    callee = found;
                }
            }
        }

        if callee.is_function() || callee.is_builtin() {
            Ok(callee)
        } else {
            let message = if info.is_super_call {
                format!(
                    "Undefined super method '{}'",
                    info.method_name.as_deref().unwrap_or("")
                )
            } else {
                format!("Can only call functions, got {}", callee.type_name())
            };
            Err(self.fail(info.line, info.column, ErrorKind::RuntimeError, message))
        }
    }

    /// Super dispatch: start at the parent of the executing class and walk
    /// upward through methods and extensions.
    fn resolve_super_method(
        &mut self,
        receiver: &Value,
        info: &CallInfo,
    ) -> Result<Value, RuntimeError> {
        let method_name = info.method_name.clone().unwrap_or_default();
        let arity = info.arguments.len();

        // A synthetic super object names the parent class directly.
        if let Value::Dict(dict) = receiver {
            let dict = dict.borrow();
            let is_super_object =
                dict.get(SUPER_KEY).map(|marker| marker.truthy()).unwrap_or(false);
            if is_super_object {
                if let Some(Value::Str(parent)) = dict.get(CLASS_KEY) {
                    let parent = parent.as_ref().clone();
                    drop(dict);
                    if let Some(found) =
                        self.class_registry.lookup_overload(&parent, &method_name, arity)
                    {
                        return Ok(Value::Function(found));
                    }
                    if let Some(found) = self.walk_class_extensions(&parent, &method_name) {
                        return Ok(Value::Function(found));
                    }
                    return Ok(Value::None);
                }
            }
        }

        // Normal path: the executing class from the frame, else the
        // receiver's declared class.
        let mut current_class = match self.environment.get(CURRENT_CLASS_KEY) {
            Some(Value::Str(name)) => name.as_ref().clone(),
            _ => String::new(),
        };
        if current_class.is_empty() {
            current_class = dict_class_of(receiver).unwrap_or_default();
        }

        let mut cursor = self.class_registry.parent_of(&current_class);
        let mut guard = 0;
        while !cursor.is_empty() && guard < INHERITANCE_DEPTH_GUARD {
            if let Some(found) = self.class_registry.lookup_direct(&cursor, &method_name, arity) {
                return Ok(Value::Function(found));
            }
            if let Some(found) = self.extension_registry.lookup(&cursor, &method_name) {
                return Ok(Value::Function(found));
            }
            cursor = self.class_registry.parent_of(&cursor);
            guard += 1;
        }

        // Built-in fallbacks keep behavior consistent with plain dispatch.
        if let Some(found) = self.extension_registry.lookup_overload("dict", &method_name, arity) {
            return Ok(Value::Function(found));
        }
        if let Some(found) = self.extension_registry.lookup_overload("any", &method_name, arity) {
            return Ok(Value::Function(found));
        }
        Ok(Value::None)
    }

    fn walk_class_extensions(&self, class_name: &str, method_name: &str) -> Option<Rc<Function>> {
        let mut cursor = class_name.to_string();
        let mut guard = 0;
        while !cursor.is_empty() && guard < INHERITANCE_DEPTH_GUARD {
            if let Some(found) = self.extension_registry.lookup(&cursor, method_name) {
                return Some(found);
            }
            cursor = self.class_registry.parent_of(&cursor);
            guard += 1;
        }
        None
    }

    /// Extension/built-in method fallback used when a property read did not
    /// produce a callable.
    pub(crate) fn resolve_extension_method(
        &mut self,
        receiver: &Value,
        method_name: &str,
        arity: usize,
    ) -> Option<Value> {
        match receiver {
            Value::Array(_) => self
                .extension_registry
                .lookup_overload("array", method_name, arity)
                .or_else(|| self.extension_registry.lookup("array", method_name))
                .map(Value::Function)
                .or_else(|| self.builtin_method("array", method_name, receiver))
                .or_else(|| {
                    self.extension_registry.lookup("any", method_name).map(Value::Function)
                }),
            Value::Str(_) => self
                .extension_registry
                .lookup_overload("string", method_name, arity)
                .or_else(|| self.extension_registry.lookup("string", method_name))
                .map(Value::Function)
                .or_else(|| self.builtin_method("string", method_name, receiver))
                .or_else(|| {
                    self.extension_registry.lookup("any", method_name).map(Value::Function)
                }),
            Value::Integer(_) | Value::Number(_) => self
                .extension_registry
                .lookup_overload("number", method_name, arity)
                .or_else(|| self.extension_registry.lookup("number", method_name))
                .map(Value::Function)
                .or_else(|| self.builtin_method("number", method_name, receiver))
                .or_else(|| {
                    self.extension_registry.lookup("any", method_name).map(Value::Function)
                }),
            Value::Dict(_) => {
                // Class extensions along the inheritance chain first.
                if let Some(class_name) = dict_class_of(receiver) {
                    if let Some(found) = self.walk_class_extensions(&class_name, method_name) {
                        return Some(Value::Function(found));
                    }
                }
                self.extension_registry
                    .lookup("dict", method_name)
                    .map(Value::Function)
                    .or_else(|| self.builtin_method("dict", method_name, receiver))
                    .or_else(|| {
                        self.extension_registry.lookup("any", method_name).map(Value::Function)
                    })
            }
            _ => self.extension_registry.lookup("any", method_name).map(Value::Function),
        }
    }

    /// Built-in methods on the primitive targets, bound to their receiver.
    pub(crate) fn builtin_method(
        &self,
        target: &str,
        method_name: &str,
        receiver: &Value,
    ) -> Option<Value> {
        match (target, method_name) {
            ("array", "len") => {
                let receiver = receiver.clone();
                Some(Value::builtin(
                    "array.len",
                    Box::new(move |_, _, _, _| {
                        let Value::Array(arr) = &receiver else { return Ok(Value::Integer(0)) };
                        Ok(Value::Integer(arr.borrow().len() as i64))
                    }),
                ))
            }
            ("array", "push") => {
                let receiver = receiver.clone();
                Some(Value::builtin(
                    "array.push",
                    Box::new(move |_, args, _, _| {
                        if let Value::Array(arr) = &receiver {
                            arr.borrow_mut().extend(args);
                        }
                        Ok(receiver.clone())
                    }),
                ))
            }
            ("array", "pop") => {
                let receiver = receiver.clone();
                Some(Value::builtin(
                    "array.pop",
                    Box::new(move |_, _, _, _| {
                        let Value::Array(arr) = &receiver else { return Ok(Value::None) };
                        Ok(arr.borrow_mut().pop().unwrap_or(Value::None))
                    }),
                ))
            }
            ("string", "len") => {
                let receiver = receiver.clone();
                Some(Value::builtin(
                    "string.len",
                    Box::new(move |_, _, _, _| {
                        Ok(Value::Integer(receiver.as_str().chars().count() as i64))
                    }),
                ))
            }
            ("number", "toInt") => {
                let receiver = receiver.clone();
                Some(Value::builtin(
                    "number.toInt",
                    Box::new(move |_, _, _, _| match &receiver {
                        Value::Integer(i) => Ok(Value::Integer(*i)),
                        Value::Number(n) => Ok(Value::Integer(*n as i64)),
                        _ => Ok(Value::Integer(0)),
                    }),
                ))
            }
            ("dict", "len") => {
                let receiver = receiver.clone();
                Some(Value::builtin(
                    "dict.len",
                    Box::new(move |_, _, _, _| {
                        let Value::Dict(dict) = &receiver else { return Ok(Value::Integer(0)) };
                        Ok(Value::Integer(dict.borrow().len() as i64))
                    }),
                ))
            }
            ("dict", "keys") => {
                let receiver = receiver.clone();
                Some(Value::builtin(
                    "dict.keys",
                    Box::new(move |_, _, _, _| {
                        let Value::Dict(dict) = &receiver else { return Ok(Value::array(vec![])) };
                        let keys =
                            dict.borrow().keys().map(|k| Value::str(k.clone())).collect();
                        Ok(Value::array(keys))
                    }),
                ))
            }
            ("dict", "values") => {
                let receiver = receiver.clone();
                Some(Value::builtin(
                    "dict.values",
                    Box::new(move |_, _, _, _| {
                        let Value::Dict(dict) = &receiver else { return Ok(Value::array(vec![])) };
                        let values = dict.borrow().values().cloned().collect();
                        Ok(Value::array(values))
                    }),
                ))
            }
            ("dict", "has") => {
                let receiver = receiver.clone();
                Some(Value::builtin(
                    "dict.has",
                    Box::new(move |_, args, _, _| {
                        let Value::Dict(dict) = &receiver else {
                            return Ok(Value::Boolean(false));
                        };
                        let Some(Value::Str(key)) = args.first() else {
                            return Ok(Value::Boolean(false));
                        };
                        Ok(Value::Boolean(dict.borrow().contains_key(key.as_str())))
                    }),
                ))
            }
            _ => None,
        }
    }

    /// Bound method dispatcher handed out by property reads on class
    /// instances. Resolution happens at call time by (name, arity), so late
    /// registrations and overloads bind correctly.
    pub(crate) fn make_instance_dispatcher(&self, receiver: &Value, class_name: &str, method_name: &str) -> Value {
        let receiver = receiver.clone();
        let class_name = class_name.to_string();
        let method_name_owned = method_name.to_string();
        Value::builtin(
            format!("{}.{}", class_name, method_name),
            Box::new(move |interp, args, line, column| {
                let method_name = &method_name_owned;
                let arity = args.len();

                let mut selected = interp
                    .class_registry
                    .lookup_direct(&class_name, method_name, arity)
                    .or_else(|| {
                        interp
                            .extension_registry
                            .lookup_overload(&class_name, method_name, arity)
                    })
                    .or_else(|| {
                        interp.class_registry.lookup_overload(&class_name, method_name, arity)
                    })
                    .or_else(|| interp.walk_class_extensions(&class_name, method_name));
                if selected.is_none() {
                    selected = interp
                        .extension_registry
                        .lookup_overload("dict", method_name, arity)
                        .or_else(|| {
                            interp.extension_registry.lookup_overload("any", method_name, arity)
                        });
                }

                let Some(function) = selected else {
                    return Err(interp.fail(
                        line,
                        column,
                        ErrorKind::RuntimeError,
                        format!("Method '{}' not found", method_name),
                    ));
                };

                let owner = if function.owner_class.is_empty() {
                    class_name.clone()
                } else {
                    function.owner_class.clone()
                };
                interp.invoke_function(&function, Some(&receiver), false, Some(&owner), &args, line, column)
            }),
        )
    }

    /// Invoke the resolved callable, re-selecting method overloads by arity
    /// for non-super method calls.
    pub(crate) fn execute_call(
        &mut self,
        callee: Value,
        info: &CallInfo,
    ) -> Result<Value, RuntimeError> {
        if let Value::Builtin(builtin) = &callee {
            let builtin = Rc::clone(builtin);
            return (builtin.func)(self, info.arguments.clone(), info.line, info.column);
        }

        let mut function = match callee {
            Value::Function(function) => function,
            other => {
                let message = format!("Can only call functions, got {}", other.type_name());
                return Err(self.fail(info.line, info.column, ErrorKind::RuntimeError, message));
            }
        };

        // Method overloading by arity: class overloads for user instances,
        // else built-in/any extension overloads. Super calls keep the callee
        // already selected from the parent chain.
        if let (Some(name), false) = (&info.method_name, info.is_super_call) {
            let receiver = info.receiver.as_ref();
            let arity = info.arguments.len();
            let mut resolved = false;
            if let Some(class_name) = receiver.and_then(dict_class_of) {
                if let Some(selected) =
                    self.class_registry.lookup_overload(&class_name, name, arity)
                {
                    function = selected;
                    resolved = true;
                }
            }
            if !resolved {
                let target = receiver.map(extension_target_of).unwrap_or("");
                if !target.is_empty() {
                    if let Some(selected) =
                        self.extension_registry.lookup_overload(target, name, arity)
                    {
                        function = selected;
                    } else if let Some(selected) =
                        self.extension_registry.lookup_overload("any", name, arity)
                    {
                        function = selected;
                    }
                }
            }
        }

        let is_method = info.method_name.is_some();
        let receiver = if is_method { info.receiver.as_ref() } else { None };
        self.invoke_function(
            &function,
            receiver,
            info.is_super_call,
            None,
            &info.arguments,
            info.line,
            info.column,
        )
    }

    /// Shared invocation path: arity check, frame setup, body execution, and
    /// conversion of an escaping throw into the pending-throw channel.
    pub(crate) fn invoke_function(
        &mut self,
        function: &Rc<Function>,
        receiver: Option<&Value>,
        bind_super: bool,
        current_class: Option<&str>,
        args: &[Value],
        line: u32,
        column: u32,
    ) -> Result<Value, RuntimeError> {
        if args.len() != function.params.len() {
            return Err(self.fail(
                line,
                column,
                ErrorKind::RuntimeError,
                format!("Expected {} arguments but got {}.", function.params.len(), args.len()),
            ));
        }

        let frame = Environment::with_parent(Rc::clone(&function.closure));
        if let Some(this) = receiver {
            frame.define("this", this.clone());
            if bind_super {
                frame.define("super", this.clone());
            }
            let owner = current_class
                .map(str::to_string)
                .or_else(|| {
                    if function.owner_class.is_empty() {
                        None
                    } else {
                        Some(function.owner_class.clone())
                    }
                });
            if let Some(owner) = owner {
                frame.define(CURRENT_CLASS_KEY, Value::str(owner));
            }
        }
        for (param, arg) in function.params.iter().zip(args) {
            frame.define(param.clone(), arg.clone());
        }

        let previous = std::mem::replace(&mut self.environment, frame);
        let result = self.run_function_body(function);
        self.environment = previous;
        result
    }

    fn run_function_body(&mut self, function: &Rc<Function>) -> Result<Value, RuntimeError> {
        let mut ctx = ExecutionContext::function_body();
        for stmt in function.body.iter() {
            self.execute_stmt(stmt, &mut ctx)?;
            if ctx.has_throw {
                self.set_pending_throw(
                    std::mem::replace(&mut ctx.thrown_value, Value::None),
                    ctx.throw_line,
                    ctx.throw_column,
                );
                return Ok(Value::None);
            }
            if ctx.has_return {
                return Ok(ctx.return_value);
            }
        }
        Ok(ctx.return_value)
    }

    // Class instantiation

    /// Build an instance: merged template defaults, field initializers
    /// across the chain (parent first, child overriding), the class tag, and
    /// an optional `init` forward.
    pub(crate) fn construct_instance(
        &mut self,
        class_name: &str,
        args: &[Value],
        line: u32,
        column: u32,
    ) -> Result<Value, RuntimeError> {
        let mut fields = self.class_registry.merged_template(class_name);
        fields.insert(CLASS_KEY.to_string(), Value::str(class_name));
        let instance = Value::dict(fields);

        for class in self.class_registry.chain_root_first(class_name) {
            let initializers = match self.class_registry.field_initializers(&class) {
                Some(inits) => inits.clone(),
                None => continue,
            };
            for (field_name, init_expr) in initializers {
                let value = self.evaluate(&init_expr)?;
                if let Value::Dict(dict) = &instance {
                    dict.borrow_mut().insert(field_name, value);
                }
            }
        }

        if let Some(init) = self.class_registry.lookup_overload(class_name, "init", args.len()) {
            let owner = if init.owner_class.is_empty() {
                class_name.to_string()
            } else {
                init.owner_class.clone()
            };
            self.invoke_function(&init, Some(&instance), false, Some(&owner), args, line, column)?;
        } else if !args.is_empty() {
            return Err(self.fail(
                line,
                column,
                ErrorKind::RuntimeError,
                format!("Expected 0 arguments but got {}.", args.len()),
            ));
        }

        Ok(instance)
    }

    // Module imports

    /// Resolve a module spec to a Value, executing and caching file modules
    /// and building builtin modules on first use.
    pub fn import_module(
        &mut self,
        spec: &str,
        line: u32,
        column: u32,
    ) -> Result<Value, RuntimeError> {
        let base_dir = {
            let reporter = self.reporter.borrow();
            Path::new(reporter.current_file_name())
                .parent()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default()
        };

        match self.module_loader.resolve(spec, &base_dir) {
            ResolvedSpec::FileImportsDisabled => Err(self.fail(
                line,
                column,
                ErrorKind::ImportError,
                "File imports are disabled by policy",
            )),
            ResolvedSpec::NotFound => Err(self.fail(
                line,
                column,
                ErrorKind::ImportError,
                format!("Module not found: {}.{}", spec, crate::module::MODULE_EXTENSION),
            )),
            ResolvedSpec::Builtin(name) => {
                let key = format!("builtin:{}", name);
                if let Some(cached) = self.module_loader.cached(&key) {
                    return Ok(cached);
                }
                match self.module_loader.registry.create(&name) {
                    Some(value) => {
                        self.module_loader.insert_cache(&key, value.clone());
                        Ok(value)
                    }
                    // Cloaked by policy: indistinguishable from missing.
                    None => Err(self.fail(
                        line,
                        column,
                        ErrorKind::ImportError,
                        format!("Module not found: {}.{}", spec, crate::module::MODULE_EXTENSION),
                    )),
                }
            }
            ResolvedSpec::File(key) => {
                if let Some(cached) = self.module_loader.cached(&key) {
                    return Ok(cached);
                }
                self.load_file_module(&key, line, column)
            }
        }
    }

    fn load_file_module(
        &mut self,
        key: &str,
        line: u32,
        column: u32,
    ) -> Result<Value, RuntimeError> {
        let code = std::fs::read_to_string(key).map_err(|_| {
            self.fail(
                line,
                column,
                ErrorKind::ImportError,
                format!("Could not open module file: {}", key),
            )
        })?;

        let had_error_before = self.reporter.borrow().had_error();
        self.reporter.borrow_mut().push_source(&code, key);

        let mut lexer = Lexer::new();
        lexer.set_error_reporter(Rc::clone(&self.reporter));
        let tokens = lexer.tokenize(&code);
        let mut parser = Parser::new(tokens);
        parser.set_error_reporter(Rc::clone(&self.reporter));
        let statements = parser.parse();

        if self.reporter.borrow().had_error() && !had_error_before {
            self.reporter.borrow_mut().pop_source();
            return Err(RuntimeError::new(
                ErrorKind::ImportError,
                format!("Failed to parse module: {}", key),
                line,
                column,
            ));
        }

        // Execute in a child environment; exports snapshot its frame. A
        // module that fails mid-execution is not cached.
        let module_env = Environment::with_parent(self.environment());
        let saved_env = std::mem::replace(&mut self.environment, module_env);
        let saved_module = std::mem::replace(&mut self.current_module, key.to_string());

        let mut ctx = ExecutionContext::new();
        let mut failure: Option<RuntimeError> = None;
        for stmt in &statements {
            match self.execute_stmt(stmt, &mut ctx) {
                Ok(()) => {}
                Err(error) => {
                    failure = Some(error);
                    break;
                }
            }
            if ctx.has_throw {
                failure = Some(RuntimeError::new(
                    ErrorKind::ImportError,
                    format!(
                        "Uncaught exception in module {}: {}",
                        key,
                        ctx.thrown_value.to_display_string()
                    ),
                    ctx.throw_line,
                    ctx.throw_column,
                ));
                break;
            }
        }

        let module_env = std::mem::replace(&mut self.environment, saved_env);
        self.current_module = saved_module;
        self.reporter.borrow_mut().pop_source();

        if let Some(error) = failure {
            return Err(error);
        }

        let exports = module_env.get_all();
        let module = Value::Module(Rc::new(Module { name: module_name_from_key(key), exports }));
        self.module_loader.insert_cache(key, module.clone());
        Ok(module)
    }

    /// `from X import a, b as c` / `from X import *`.
    pub fn from_import(
        &mut self,
        spec: &str,
        items: &[(String, String)],
        import_all: bool,
        line: u32,
        column: u32,
    ) -> Result<(), RuntimeError> {
        let module = self.import_module(spec, line, column)?;
        let Value::Module(module) = &module else {
            return Err(self.fail(
                line,
                column,
                ErrorKind::ImportError,
                "Module did not evaluate to a module",
            ));
        };

        if import_all {
            for (name, value) in &module.exports {
                self.environment.define(name.clone(), value.clone());
            }
            return Ok(());
        }

        for (name, alias) in items {
            match module.exports.get(name) {
                Some(value) => self.environment.define(alias.clone(), value.clone()),
                None => {
                    return Err(self.fail(
                        line,
                        column,
                        ErrorKind::ImportError,
                        format!("Name not found in module: {}", name),
                    ));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn current_module(&self) -> &str {
        &self.current_module
    }

    // Top-level drivers

    /// Execute a parsed program. An uncaught throw surfaces here.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        let mut ctx = ExecutionContext::new();
        for stmt in statements {
            self.execute_stmt(stmt, &mut ctx)?;
            if ctx.has_throw {
                let message = format!(
                    "Uncaught exception: {}",
                    ctx.thrown_value.to_display_string()
                );
                return Err(self.fail(
                    ctx.throw_line,
                    ctx.throw_column,
                    ErrorKind::RuntimeError,
                    message,
                ));
            }
        }
        Ok(())
    }

    /// Compile and run a source string in the current interpreter. Used by
    /// the `eval` builtin and embedders.
    pub fn eval_string(&mut self, code: &str, file_name: &str) -> Result<(), RuntimeError> {
        let had_error_before = self.reporter.borrow().had_error();
        self.reporter.borrow_mut().push_source(code, file_name);

        let mut lexer = Lexer::new();
        lexer.set_error_reporter(Rc::clone(&self.reporter));
        let tokens = lexer.tokenize(code);
        let mut parser = Parser::new(tokens);
        parser.set_error_reporter(Rc::clone(&self.reporter));
        let statements = parser.parse();

        let result = if self.reporter.borrow().had_error() && !had_error_before {
            Err(RuntimeError::new(ErrorKind::ParseError, "Failed to parse input", 0, 0))
        } else {
            self.interpret(&statements)
        };
        self.reporter.borrow_mut().pop_source();
        result
    }

    pub fn eval_file(&mut self, path: &str) -> Result<(), RuntimeError> {
        let code = std::fs::read_to_string(path).map_err(|e| {
            RuntimeError::new(
                ErrorKind::RuntimeError,
                format!("Could not read file {}: {}", path, e),
                0,
                0,
            )
        })?;
        self.reporter.borrow_mut().load_source(&code, path);

        let mut lexer = Lexer::new();
        lexer.set_error_reporter(Rc::clone(&self.reporter));
        let tokens = lexer.tokenize(&code);
        let mut parser = Parser::new(tokens);
        parser.set_error_reporter(Rc::clone(&self.reporter));
        let statements = parser.parse();

        if self.reporter.borrow().had_error() {
            return Err(RuntimeError::new(ErrorKind::ParseError, "Failed to parse file", 0, 0));
        }
        self.interpret(&statements)
    }
}

/// The declared class of a dict instance, when tagged.
pub(crate) fn dict_class_of(value: &Value) -> Option<String> {
    let Value::Dict(dict) = value else { return None };
    match dict.borrow().get(CLASS_KEY) {
        Some(Value::Str(name)) => Some(name.as_ref().clone()),
        _ => None,
    }
}

/// Built-in extension target name for a receiver, empty when none applies.
pub(crate) fn extension_target_of(value: &Value) -> &'static str {
    match value {
        Value::Str(_) => "string",
        Value::Array(_) => "array",
        Value::Dict(_) => "dict",
        Value::Integer(_) | Value::Number(_) => "number",
        _ => "",
    }
}
