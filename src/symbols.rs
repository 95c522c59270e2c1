//! Name to value bindings.
//!
//! The evaluator only needs two operations from its symbol table, captured
//! by [`SymbolTable`]. [`Environment`] is the hash map backed table used by
//! [`crate::session::Session`].

use std::collections::HashMap;

use crate::arena::ValueRef;

/// Binding store consulted by the evaluator for symbol lookup and mutation
pub trait SymbolTable {
    /// The value bound to `name`, or `None` when unbound
    fn lookup(&self, name: &[u8]) -> Option<ValueRef>;

    /// Bind `name` to `value`, replacing any existing binding
    fn bind(&mut self, name: &[u8], value: ValueRef);
}

/// Global environment of a session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Environment {
    bindings: HashMap<Vec<u8>, ValueRef>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            bindings: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Get all bindings as (name, value) pairs sorted by name
    pub fn get_all_bindings(&self) -> Vec<(String, ValueRef)> {
        let mut result: Vec<_> = self
            .bindings
            .iter()
            .map(|(name, value)| (String::from_utf8_lossy(name).into_owned(), *value))
            .collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }
}

impl SymbolTable for Environment {
    fn lookup(&self, name: &[u8]) -> Option<ValueRef> {
        self.bindings.get(name).copied()
    }

    fn bind(&mut self, name: &[u8], value: ValueRef) {
        self.bindings.insert(name.to_vec(), value);
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;

    fn vref(index: u32) -> ValueRef {
        ValueRef::from_index(index).unwrap()
    }

    #[test]
    fn test_lookup_and_overwrite() {
        let mut env = Environment::new();
        assert!(env.is_empty());
        assert_eq!(env.lookup(b"x"), None);

        env.bind(b"x", vref(3));
        assert_eq!(env.lookup(b"x"), Some(vref(3)));

        env.bind(b"x", vref(9));
        assert_eq!(env.lookup(b"x"), Some(vref(9)));
        assert_eq!(env.len(), 1);

        // names are compared by bytes, not by prefix
        assert_eq!(env.lookup(b"xx"), None);
        assert_eq!(env.lookup(b""), None);
    }

    #[test]
    fn test_sorted_bindings() {
        let mut env = Environment::new();
        env.bind(b"zeta", vref(1));
        env.bind(b"alpha", vref(2));
        env.bind(b"mid", vref(3));
        let names: Vec<_> = env
            .get_all_bindings()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }
}
