// File: src/module.rs
//
// Module resolution, caching, and the builtin-module registry. A module spec
// resolves to either a file path (executed once, exports snapshotted) or a
// host-registered builtin (built once from its registered initializer). The
// cache key is the resolved path, or "builtin:NAME".

use crate::interpreter::value::{Module, NativeFn, Value};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// File extension for Bob module files.
pub const MODULE_EXTENSION: &str = "bob";

/// Populates a builtin module's exports. Passed to the initializer callback
/// given to `Interpreter::register_module`.
pub struct ModuleBuilder {
    name: String,
    exports: IndexMap<String, Value>,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        ModuleBuilder { name: name.into(), exports: IndexMap::new() }
    }

    /// Export a native function.
    pub fn func(&mut self, name: &str, func: NativeFn) {
        let qualified = format!("{}.{}", self.name, name);
        self.exports.insert(name.to_string(), Value::builtin(qualified, func));
    }

    /// Export a constant value.
    pub fn val(&mut self, name: &str, value: Value) {
        self.exports.insert(name.to_string(), value);
    }

    pub fn into_value(self) -> Value {
        Value::Module(Rc::new(Module { name: self.name, exports: self.exports }))
    }
}

type ModuleInit = Rc<dyn Fn(&mut ModuleBuilder)>;

/// Host-registered builtin modules with an allow/deny policy.
pub struct ModuleRegistry {
    initializers: IndexMap<String, ModuleInit>,
    allow_builtins: bool,
    allow_list: Option<Vec<String>>,
    deny_list: Vec<String>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        ModuleRegistry {
            initializers: IndexMap::new(),
            allow_builtins: true,
            allow_list: None,
            deny_list: Vec::new(),
        }
    }

    pub fn register(&mut self, name: &str, init: ModuleInit) {
        self.initializers.insert(name.to_string(), init);
    }

    pub fn has(&self, name: &str) -> bool {
        self.initializers.contains_key(name)
    }

    pub fn set_policy(&mut self, allow: bool) {
        self.allow_builtins = allow;
    }

    pub fn set_allow_list(&mut self, allowed: Vec<String>) {
        self.allow_list = Some(allowed);
    }

    pub fn set_deny_list(&mut self, denied: Vec<String>) {
        self.deny_list = denied;
    }

    /// Policy check: builtin imports enabled, name not denied, and on the
    /// allow list when one is set.
    pub fn permitted(&self, name: &str) -> bool {
        if !self.allow_builtins {
            return false;
        }
        if self.deny_list.iter().any(|d| d == name) {
            return false;
        }
        match &self.allow_list {
            Some(allowed) => allowed.iter().any(|a| a == name),
            None => true,
        }
    }

    /// Build the module value. None when unregistered or cloaked by policy.
    pub fn create(&self, name: &str) -> Option<Value> {
        if !self.permitted(name) {
            return None;
        }
        let init = self.initializers.get(name)?;
        let mut builder = ModuleBuilder::new(name);
        init(&mut builder);
        Some(builder.into_value())
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of spec resolution, before any file I/O.
pub enum ResolvedSpec {
    File(String),
    Builtin(String),
    FileImportsDisabled,
    NotFound,
}

/// Resolution policy plus the module cache.
pub struct ModuleLoader {
    cache: IndexMap<String, Value>,
    pub registry: ModuleRegistry,
    allow_file_imports: bool,
    prefer_file_over_builtin: bool,
    search_paths: Vec<String>,
}

impl ModuleLoader {
    pub fn new() -> Self {
        ModuleLoader {
            cache: IndexMap::new(),
            registry: ModuleRegistry::new(),
            allow_file_imports: true,
            prefer_file_over_builtin: true,
            search_paths: vec![".".to_string(), "tests".to_string()],
        }
    }

    pub fn set_policy(&mut self, allow_files: bool, prefer_files: bool, search_paths: Vec<String>) {
        self.allow_file_imports = allow_files;
        self.prefer_file_over_builtin = prefer_files;
        self.search_paths = search_paths;
    }

    pub fn cached(&self, key: &str) -> Option<Value> {
        self.cache.get(key).cloned()
    }

    pub fn insert_cache(&mut self, key: &str, value: Value) {
        self.cache.insert(key.to_string(), value);
    }

    pub fn cache_snapshot(&self) -> IndexMap<String, Value> {
        self.cache.clone()
    }

    /// Resolve a module spec against the importing file's directory.
    ///
    /// A spec containing '/', '..', or ending in the module extension is a
    /// path spec; absolute paths are used as-is and everything else resolves
    /// against `base_dir`. Name specs try the search paths for NAME.bob when
    /// file imports are allowed and preferred, then fall back to builtins.
    pub fn resolve(&self, spec: &str, base_dir: &str) -> ResolvedSpec {
        let extension_suffix = format!(".{}", MODULE_EXTENSION);
        let looks_path =
            spec.contains('/') || spec.contains("..") || spec.ends_with(&extension_suffix);

        if looks_path {
            if !self.allow_file_imports {
                return ResolvedSpec::FileImportsDisabled;
            }
            let path = if Path::new(spec).is_absolute() {
                PathBuf::from(spec)
            } else {
                Path::new(base_dir).join(spec)
            };
            return ResolvedSpec::File(normalize(&path));
        }

        if self.allow_file_imports && self.prefer_file_over_builtin {
            let file_name = format!("{}.{}", spec, MODULE_EXTENSION);
            if let Some(found) = self.locate_file(base_dir, &file_name) {
                return ResolvedSpec::File(found);
            }
        }

        if self.registry.has(spec) {
            return ResolvedSpec::Builtin(spec.to_string());
        }

        ResolvedSpec::NotFound
    }

    /// Search base_dir, then each search path relative to base_dir.
    fn locate_file(&self, base_dir: &str, file_name: &str) -> Option<String> {
        let direct = Path::new(base_dir).join(file_name);
        if direct.exists() {
            return Some(normalize(&direct));
        }
        for search_path in &self.search_paths {
            let candidate = Path::new(base_dir).join(search_path).join(file_name);
            if candidate.exists() {
                return Some(normalize(&candidate));
            }
        }
        None
    }
}

impl Default for ModuleLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Lexically normalize a path: resolve "." and ".." components without
/// touching the filesystem.
fn normalize(path: &Path) -> String {
    let mut parts: Vec<std::ffi::OsString> = Vec::new();
    let mut prefix = String::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                let last_is_parent =
                    parts.last().map(|p| p.as_os_str() == "..").unwrap_or(false);
                if parts.is_empty() || last_is_parent {
                    parts.push("..".into());
                } else {
                    parts.pop();
                }
            }
            std::path::Component::CurDir => {}
            std::path::Component::RootDir => prefix = "/".to_string(),
            other => parts.push(other.as_os_str().to_os_string()),
        }
    }
    let joined: PathBuf = parts.iter().collect();
    format!("{}{}", prefix, joined.display())
}

/// Module display name: basename without the extension.
pub fn module_name_from_key(key: &str) -> String {
    let base = Path::new(key)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| key.to_string());
    let suffix = format!(".{}", MODULE_EXTENSION);
    base.strip_suffix(&suffix).map(str::to_string).unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_specs_resolve_against_base_dir() {
        let loader = ModuleLoader::new();
        match loader.resolve("./util.bob", "/proj/src") {
            ResolvedSpec::File(p) => assert_eq!(p, "/proj/src/util.bob"),
            _ => panic!("expected file resolution"),
        }
        match loader.resolve("../lib/util.bob", "/proj/src") {
            ResolvedSpec::File(p) => assert_eq!(p, "/proj/lib/util.bob"),
            _ => panic!("expected file resolution"),
        }
        match loader.resolve("/abs/util.bob", "/proj/src") {
            ResolvedSpec::File(p) => assert_eq!(p, "/abs/util.bob"),
            _ => panic!("expected file resolution"),
        }
    }

    #[test]
    fn path_specs_respect_file_policy() {
        let mut loader = ModuleLoader::new();
        loader.set_policy(false, true, vec![]);
        assert!(matches!(
            loader.resolve("./util.bob", "/proj"),
            ResolvedSpec::FileImportsDisabled
        ));
    }

    #[test]
    fn name_specs_fall_back_to_builtins() {
        let mut loader = ModuleLoader::new();
        loader.registry.register("math", Rc::new(|m| m.val("pi", Value::Number(3.14))));
        match loader.resolve("math", "/nonexistent-dir") {
            ResolvedSpec::Builtin(name) => assert_eq!(name, "math"),
            _ => panic!("expected builtin resolution"),
        }
        assert!(matches!(loader.resolve("nosuch", "/nonexistent-dir"), ResolvedSpec::NotFound));
    }

    #[test]
    fn registry_policy_lists() {
        let mut registry = ModuleRegistry::new();
        registry.register("math", Rc::new(|_| {}));
        registry.register("os", Rc::new(|_| {}));
        assert!(registry.permitted("math"));

        registry.set_deny_list(vec!["os".to_string()]);
        assert!(!registry.permitted("os"));
        assert!(registry.permitted("math"));

        registry.set_allow_list(vec!["math".to_string()]);
        assert!(registry.permitted("math"));
        assert!(!registry.permitted("time"));

        registry.set_policy(false);
        assert!(!registry.permitted("math"));
        assert!(registry.create("math").is_none());
    }

    #[test]
    fn builder_produces_module_values() {
        let mut registry = ModuleRegistry::new();
        registry.register(
            "demo",
            Rc::new(|m| {
                m.val("answer", Value::Integer(42));
                m.func("id", Box::new(|_, args, _, _| Ok(args.into_iter().next().unwrap_or(Value::None))));
            }),
        );
        let value = registry.create("demo").unwrap();
        let Value::Module(module) = &value else { panic!("expected module") };
        assert_eq!(module.name, "demo");
        assert!(module.exports["answer"].equals(&Value::Integer(42)));
        assert!(module.exports["id"].is_builtin());
    }

    #[test]
    fn module_names_strip_path_and_extension() {
        assert_eq!(module_name_from_key("/a/b/util.bob"), "util");
        assert_eq!(module_name_from_key("builtin:math"), "builtin:math");
    }
}
