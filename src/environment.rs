use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::object::Value;

/*
A mapping from name to value with an optional outer pointer, implementing lexical scope.
`get` walks the chain outward; `set` only ever touches the innermost scope, so a `let` in
an inner block shadows rather than mutates an outer binding.

Environments are shared via `Rc<RefCell<_>>` rather than copied by value: a closure
captures a reference to the environment live at the point its `Function` value was
created, and later mutations to that environment (further `let`s in the same scope) must
be visible to the closure. Cloning the environment per capture, as a naive port of a
tree-walking interpreter that captures `Environment` by value would do, breaks this —
two functions returned from the same call would stop sharing state the moment either one
ran.
*/
#[derive(Debug)]
pub struct Environment {
    values: HashMap<String, Value>,
    outer: Option<EnvironmentRef>,
}

pub type EnvironmentRef = Rc<RefCell<Environment>>;

impl Environment {
    pub fn new() -> EnvironmentRef {
        Rc::new(RefCell::new(Environment {
            values: HashMap::new(),
            outer: None,
        }))
    }

    pub fn enclosed(outer: &EnvironmentRef) -> EnvironmentRef {
        Rc::new(RefCell::new(Environment {
            values: HashMap::new(),
            outer: Some(Rc::clone(outer)),
        }))
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values.get(name) {
            return Some(value.clone());
        }
        self.outer.as_ref().and_then(|outer| outer.borrow().get(name))
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_scope_shadows_outer_binding() {
        let outer = Environment::new();
        outer.borrow_mut().set("x", Value::Integer(1));

        let inner = Environment::enclosed(&outer);
        inner.borrow_mut().set("x", Value::Integer(2));

        assert_eq!(inner.borrow().get("x"), Some(Value::Integer(2)));
        assert_eq!(outer.borrow().get("x"), Some(Value::Integer(1)));
    }

    #[test]
    fn inner_scope_sees_outer_bindings() {
        let outer = Environment::new();
        outer.borrow_mut().set("x", Value::Integer(1));

        let inner = Environment::enclosed(&outer);
        assert_eq!(inner.borrow().get("x"), Some(Value::Integer(1)));
    }

    #[test]
    fn unknown_name_is_none() {
        let env = Environment::new();
        assert_eq!(env.borrow().get("no_existo"), None);
    }

    #[test]
    fn mutating_outer_after_capture_is_visible_through_the_shared_reference() {
        let outer = Environment::new();
        let inner = Environment::enclosed(&outer);

        outer.borrow_mut().set("x", Value::Integer(1));
        assert_eq!(inner.borrow().get("x"), Some(Value::Integer(1)));

        outer.borrow_mut().set("x", Value::Integer(2));
        assert_eq!(inner.borrow().get("x"), Some(Value::Integer(2)));
    }
}
