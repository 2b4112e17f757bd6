use std::{cell::RefCell, collections::HashMap, rc::Rc};

use log::debug;

use crate::{stdlib, types::Value};

/// A scope of bindings. Lookups fall through to the parent
/// chain, but bindings are only ever created in the scope
/// they are set on, so inner scopes can shadow outer names
/// without being able to rebind them.
#[derive(Debug, Default)]
pub struct Env {
    values: HashMap<String, Value>,
    pub parent: Option<Rc<RefCell<Env>>>,
}

impl Env {
    /// Create the global environment, with the builtins in scope
    pub fn new() -> Rc<RefCell<Self>> {
        let mut env = Self::default();
        stdlib::init(&mut env);
        Rc::new(RefCell::new(env))
    }

    pub fn with_parent(parent: Rc<RefCell<Env>>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            parent: Some(parent),
            ..Default::default()
        }))
    }

    pub fn set(&mut self, name: &str, value: Value) -> Value {
        debug!("Set {name} -> {value:?}");
        self.values.insert(name.to_string(), value.clone());
        value
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        debug!("Get {name}");
        if let Some(value) = self.values.get(name) {
            return Some(value.clone());
        }
        if let Some(parent) = &self.parent {
            debug!("Get {name} from parent");
            return parent.borrow().get(name);
        }
        None
    }
}
