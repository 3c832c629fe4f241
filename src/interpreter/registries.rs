// File: src/interpreter/registries.rs
//
// Function, class, and extension registries. The function registry owns the
// Function/BuiltinFunction/Thunk objects created during execution and prunes
// entries nothing else references; the class registry keeps inheritance
// links, method overload tables keyed by (name, arity), field initializers,
// and class templates; the extension registry maps targets (built-in type
// names or class names) to method tables.

use crate::ast::Expr;
use ahash::AHashMap;
use indexmap::IndexMap;
use std::rc::Rc;

use super::value::{BuiltinFunction, Function, Thunk, Value};

/// Inheritance walks stop after this many links.
pub const INHERITANCE_DEPTH_GUARD: usize = 256;

/// Automatic thunk compaction kicks in after this many allocations.
const CLEANUP_THRESHOLD: usize = 10_000;

pub struct FunctionRegistry {
    functions: Vec<Rc<Function>>,
    builtins: Vec<Rc<BuiltinFunction>>,
    thunks: Vec<Rc<Thunk>>,
    thunk_creation_count: usize,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        FunctionRegistry {
            functions: Vec::new(),
            builtins: Vec::new(),
            thunks: Vec::new(),
            thunk_creation_count: 0,
        }
    }

    pub fn add_function(&mut self, function: Rc<Function>) {
        self.functions.push(function);
    }

    pub fn add_builtin(&mut self, builtin: Rc<BuiltinFunction>) {
        self.builtins.push(builtin);
    }

    pub fn add_thunk(&mut self, thunk: Rc<Thunk>) {
        self.thunks.push(thunk);
        self.thunk_creation_count += 1;
        if self.thunk_creation_count >= CLEANUP_THRESHOLD {
            self.compact_thunks();
            self.thunk_creation_count = 0;
        }
    }

    /// Drop tracked entries no Value refers to anymore.
    pub fn compact_thunks(&mut self) {
        self.thunks.retain(|t| Rc::strong_count(t) > 1);
    }

    pub fn compact_functions(&mut self) {
        self.functions.retain(|f| Rc::strong_count(f) > 1);
    }

    /// Forced on every variable reassignment.
    pub fn force_compact(&mut self) {
        self.compact_functions();
        self.compact_thunks();
        self.builtins.retain(|b| Rc::strong_count(b) > 1);
    }

    #[cfg(test)]
    pub fn tracked_thunks(&self) -> usize {
        self.thunks.len()
    }

    #[cfg(test)]
    pub fn tracked_functions(&self) -> usize {
        self.functions.len()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

type OverloadTable = AHashMap<String, AHashMap<String, AHashMap<usize, Rc<Function>>>>;

pub struct ClassRegistry {
    parents: AHashMap<String, String>,
    method_overloads: OverloadTable,
    templates: AHashMap<String, IndexMap<String, Value>>,
    field_initializers: AHashMap<String, Vec<(String, Expr)>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        ClassRegistry {
            parents: AHashMap::new(),
            method_overloads: AHashMap::new(),
            templates: AHashMap::new(),
            field_initializers: AHashMap::new(),
        }
    }

    pub fn register_class(&mut self, class_name: &str, parent_name: &str) {
        self.parents.insert(class_name.to_string(), parent_name.to_string());
    }

    /// Parent class name, empty when the chain terminates.
    pub fn parent_of(&self, class_name: &str) -> String {
        self.parents.get(class_name).cloned().unwrap_or_default()
    }

    pub fn add_method_overload(&mut self, class_name: &str, method: Rc<Function>) {
        self.method_overloads
            .entry(class_name.to_string())
            .or_default()
            .entry(method.name.clone())
            .or_default()
            .insert(method.params.len(), method);
    }

    /// Method defined on `class_name` itself, no inheritance walk.
    pub fn lookup_direct(
        &self,
        class_name: &str,
        method_name: &str,
        arity: usize,
    ) -> Option<Rc<Function>> {
        self.method_overloads
            .get(class_name)?
            .get(method_name)?
            .get(&arity)
            .cloned()
    }

    /// Walk the inheritance chain from `class_name` upward.
    pub fn lookup_overload(
        &self,
        class_name: &str,
        method_name: &str,
        arity: usize,
    ) -> Option<Rc<Function>> {
        let mut current = class_name.to_string();
        let mut guard = 0;
        while !current.is_empty() && guard < INHERITANCE_DEPTH_GUARD {
            if let Some(found) = self.lookup_direct(&current, method_name, arity) {
                return Some(found);
            }
            current = self.parent_of(&current);
            guard += 1;
        }
        None
    }

    /// True when `class_name` or an ancestor declares `method_name` at any arity.
    pub fn has_method(&self, class_name: &str, method_name: &str) -> bool {
        let mut current = class_name.to_string();
        let mut guard = 0;
        while !current.is_empty() && guard < INHERITANCE_DEPTH_GUARD {
            if self
                .method_overloads
                .get(&current)
                .and_then(|methods| methods.get(method_name))
                .is_some()
            {
                return true;
            }
            current = self.parent_of(&current);
            guard += 1;
        }
        false
    }

    pub fn set_template(&mut self, class_name: &str, template: IndexMap<String, Value>) {
        self.templates.insert(class_name.to_string(), template);
    }

    /// Merge templates across the inheritance chain: parent fields first,
    /// child overriding on conflict.
    pub fn merged_template(&self, class_name: &str) -> IndexMap<String, Value> {
        let mut chain = Vec::new();
        let mut current = class_name.to_string();
        let mut guard = 0;
        while !current.is_empty() && guard < INHERITANCE_DEPTH_GUARD {
            chain.push(current.clone());
            current = self.parent_of(&current);
            guard += 1;
        }

        let mut merged = IndexMap::new();
        for class in chain.iter().rev() {
            if let Some(template) = self.templates.get(class) {
                for (name, value) in template {
                    merged.insert(name.clone(), value.clone());
                }
            }
        }
        merged
    }

    pub fn set_field_initializers(&mut self, class_name: &str, inits: Vec<(String, Expr)>) {
        self.field_initializers.insert(class_name.to_string(), inits);
    }

    pub fn field_initializers(&self, class_name: &str) -> Option<&Vec<(String, Expr)>> {
        self.field_initializers.get(class_name)
    }

    /// Root-first list of classes in the inheritance chain of `class_name`.
    pub fn chain_root_first(&self, class_name: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = class_name.to_string();
        let mut guard = 0;
        while !current.is_empty() && guard < INHERITANCE_DEPTH_GUARD {
            chain.push(current.clone());
            current = self.parent_of(&current);
            guard += 1;
        }
        chain.reverse();
        chain
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Built-in extension targets; everything else is treated as a class name.
pub const BUILTIN_TARGETS: [&str; 5] = ["string", "array", "dict", "number", "any"];

pub struct ExtensionRegistry {
    builtin: AHashMap<String, AHashMap<String, AHashMap<usize, Rc<Function>>>>,
    classes: AHashMap<String, AHashMap<String, AHashMap<usize, Rc<Function>>>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        ExtensionRegistry { builtin: AHashMap::new(), classes: AHashMap::new() }
    }

    fn table_for(
        &self,
        target: &str,
    ) -> &AHashMap<String, AHashMap<String, AHashMap<usize, Rc<Function>>>> {
        if BUILTIN_TARGETS.contains(&target) {
            &self.builtin
        } else {
            &self.classes
        }
    }

    pub fn register(&mut self, target: &str, method: Rc<Function>) {
        let table = if BUILTIN_TARGETS.contains(&target) {
            &mut self.builtin
        } else {
            &mut self.classes
        };
        table
            .entry(target.to_string())
            .or_default()
            .entry(method.name.clone())
            .or_default()
            .insert(method.params.len(), method);
    }

    /// Any registered extension for (target, name), regardless of arity.
    pub fn lookup(&self, target: &str, method_name: &str) -> Option<Rc<Function>> {
        self.table_for(target)
            .get(target)?
            .get(method_name)?
            .values()
            .next()
            .cloned()
    }

    pub fn lookup_overload(
        &self,
        target: &str,
        method_name: &str,
        arity: usize,
    ) -> Option<Rc<Function>> {
        self.table_for(target)
            .get(target)?
            .get(method_name)?
            .get(&arity)
            .cloned()
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::environment::Environment;

    fn make_function(name: &str, arity: usize) -> Rc<Function> {
        let params = (0..arity).map(|i| format!("p{}", i)).collect();
        Rc::new(Function::new(name, params, Rc::new(Vec::new()), Environment::new()))
    }

    #[test]
    fn overload_lookup_walks_inheritance() {
        let mut registry = ClassRegistry::new();
        registry.register_class("Animal", "");
        registry.register_class("Dog", "Animal");
        registry.add_method_overload("Animal", make_function("speak", 0));
        registry.add_method_overload("Dog", make_function("fetch", 1));

        assert!(registry.lookup_direct("Dog", "speak", 0).is_none());
        assert!(registry.lookup_overload("Dog", "speak", 0).is_some());
        assert!(registry.lookup_overload("Dog", "fetch", 1).is_some());
        assert!(registry.lookup_overload("Dog", "fetch", 2).is_none());
        assert!(registry.has_method("Dog", "speak"));
        assert!(!registry.has_method("Dog", "swim"));
    }

    #[test]
    fn overloads_are_keyed_by_arity() {
        let mut registry = ClassRegistry::new();
        registry.register_class("Point", "");
        registry.add_method_overload("Point", make_function("scale", 1));
        registry.add_method_overload("Point", make_function("scale", 2));

        assert_eq!(registry.lookup_overload("Point", "scale", 1).unwrap().params.len(), 1);
        assert_eq!(registry.lookup_overload("Point", "scale", 2).unwrap().params.len(), 2);
    }

    #[test]
    fn inheritance_cycles_hit_the_depth_guard() {
        let mut registry = ClassRegistry::new();
        registry.register_class("A", "B");
        registry.register_class("B", "A");
        // Must terminate rather than loop forever.
        assert!(registry.lookup_overload("A", "missing", 0).is_none());
        assert!(!registry.has_method("A", "missing"));
    }

    #[test]
    fn merged_template_prefers_child_fields() {
        let mut registry = ClassRegistry::new();
        registry.register_class("Base", "");
        registry.register_class("Child", "Base");
        let mut base = IndexMap::new();
        base.insert("x".to_string(), Value::Integer(1));
        base.insert("y".to_string(), Value::Integer(2));
        registry.set_template("Base", base);
        let mut child = IndexMap::new();
        child.insert("y".to_string(), Value::Integer(20));
        registry.set_template("Child", child);

        let merged = registry.merged_template("Child");
        assert!(merged["x"].equals(&Value::Integer(1)));
        assert!(merged["y"].equals(&Value::Integer(20)));
    }

    #[test]
    fn extension_targets_split_builtin_and_class_tables() {
        let mut registry = ExtensionRegistry::new();
        registry.register("string", make_function("shout", 0));
        registry.register("Widget", make_function("draw", 0));

        assert!(registry.lookup("string", "shout").is_some());
        assert!(registry.lookup_overload("string", "shout", 0).is_some());
        assert!(registry.lookup_overload("string", "shout", 1).is_none());
        assert!(registry.lookup("Widget", "draw").is_some());
        assert!(registry.lookup("array", "shout").is_none());
    }

    #[test]
    fn function_registry_compaction_drops_unreferenced() {
        let mut registry = FunctionRegistry::new();
        let kept = make_function("kept", 0);
        registry.add_function(Rc::clone(&kept));
        registry.add_function(make_function("dropped", 0));
        assert_eq!(registry.tracked_functions(), 2);
        registry.force_compact();
        assert_eq!(registry.tracked_functions(), 1);
        drop(kept);
    }
}
