// File: src/interpreter/environment.rs
//
// Lexical scoping for the Bob interpreter. An Environment is one frame of
// name -> Value bindings plus an optional parent; lookup walks the chain to
// the root, assignment mutates the nearest binding, and `define` always
// writes into the current frame.

use super::value::Value;
use ahash::AHashMap;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

pub struct Environment {
    values: RefCell<AHashMap<String, Value>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    pub fn new() -> Rc<Self> {
        Rc::new(Environment { values: RefCell::new(AHashMap::new()), parent: None })
    }

    pub fn with_parent(parent: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment { values: RefCell::new(AHashMap::new()), parent: Some(parent) })
    }

    pub fn parent(&self) -> Option<&Rc<Environment>> {
        self.parent.as_ref()
    }

    /// Define a name in the current frame, overwriting any shadow binding.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.values.borrow_mut().insert(name.into(), value);
    }

    /// Look a name up through the chain. A variable name references the
    /// binding at lookup time, not parse time.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values.borrow().get(name) {
            return Some(value.clone());
        }
        match &self.parent {
            Some(parent) => parent.get(name),
            None => None,
        }
    }

    /// Assign to the nearest enclosing binding. Err(()) when the name is not
    /// reachable anywhere in the chain.
    pub fn assign(&self, name: &str, value: Value) -> Result<(), ()> {
        if let Some(slot) = self.values.borrow_mut().get_mut(name) {
            *slot = value;
            return Ok(());
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => Err(()),
        }
    }

    /// Snapshot of the current frame's bindings, in no particular order,
    /// re-keyed into an insertion-ordered map. Used for module exports.
    pub fn get_all(&self) -> IndexMap<String, Value> {
        let values = self.values.borrow();
        let mut sorted: Vec<&String> = values.keys().collect();
        sorted.sort();
        sorted.into_iter().map(|k| (k.clone(), values[k].clone())).collect()
    }

    /// Closure capture: clone only the current frame and share the parent
    /// chain. Array and Dict bindings in the cloned frame are replaced with
    /// fresh empty containers so the closure does not alias caller-local
    /// mutable state.
    pub fn capture_for_closure(env: &Rc<Environment>) -> Rc<Environment> {
        let cloned: AHashMap<String, Value> = env
            .values
            .borrow()
            .iter()
            .map(|(k, v)| {
                let pruned = match v {
                    Value::Array(_) => Value::array(Vec::new()),
                    Value::Dict(_) => Value::dict(IndexMap::new()),
                    other => other.clone(),
                };
                (k.clone(), pruned)
            })
            .collect();
        Rc::new(Environment { values: RefCell::new(cloned), parent: env.parent.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_get_and_shadowing() {
        let global = Environment::new();
        global.define("x", Value::Integer(10));
        let inner = Environment::with_parent(Rc::clone(&global));
        assert!(inner.get("x").unwrap().equals(&Value::Integer(10)));

        inner.define("x", Value::Integer(20));
        assert!(inner.get("x").unwrap().equals(&Value::Integer(20)));
        assert!(global.get("x").unwrap().equals(&Value::Integer(10)));
    }

    #[test]
    fn assign_targets_nearest_binding() {
        let global = Environment::new();
        global.define("x", Value::Integer(1));
        let inner = Environment::with_parent(Rc::clone(&global));
        inner.assign("x", Value::Integer(2)).unwrap();
        assert!(global.get("x").unwrap().equals(&Value::Integer(2)));

        assert!(inner.assign("missing", Value::None).is_err());
    }

    #[test]
    fn define_is_overwriting() {
        let env = Environment::new();
        env.define("x", Value::Integer(1));
        env.define("x", Value::str("two"));
        assert!(env.get("x").unwrap().equals(&Value::str("two")));
    }

    #[test]
    fn closure_capture_prunes_containers_in_frame() {
        let global = Environment::new();
        global.define("shared", Value::array(vec![Value::Integer(1)]));
        let frame = Environment::with_parent(Rc::clone(&global));
        frame.define("local_arr", Value::array(vec![Value::Integer(1), Value::Integer(2)]));
        frame.define("local_num", Value::Integer(5));

        let captured = Environment::capture_for_closure(&frame);

        // Containers in the captured frame are fresh and empty.
        match captured.get("local_arr").unwrap() {
            Value::Array(a) => assert!(a.borrow().is_empty()),
            other => panic!("expected array, got {:?}", other),
        }
        // Non-container bindings are copied through.
        assert!(captured.get("local_num").unwrap().equals(&Value::Integer(5)));
        // The parent chain is shared, not pruned.
        match captured.get("shared").unwrap() {
            Value::Array(a) => assert_eq!(a.borrow().len(), 1),
            other => panic!("expected array, got {:?}", other),
        }
        // The original frame is untouched.
        match frame.get("local_arr").unwrap() {
            Value::Array(a) => assert_eq!(a.borrow().len(), 2),
            other => panic!("expected array, got {:?}", other),
        }
    }

    #[test]
    fn get_all_snapshots_frame_only() {
        let global = Environment::new();
        global.define("hidden", Value::Integer(1));
        let frame = Environment::with_parent(global);
        frame.define("b", Value::Integer(2));
        frame.define("a", Value::Integer(3));
        let all = frame.get_all();
        assert_eq!(all.len(), 2);
        assert!(all.contains_key("a") && all.contains_key("b"));
        assert!(!all.contains_key("hidden"));
    }
}
