//! Method registry
//!
//! Maps operation symbols (`kind::op`, e.g. `docs.MyStruct::call_say`) to
//! handlers that run against the heap. Field access and the default
//! constructor are served by the heap itself; everything else must be
//! registered here.

use rustc_hash::FxHashMap;
use std::rc::Rc;

use tether_sdk::{Handle, NativeCallResult, NativeValue, OperationId};

use crate::heap::Heap;

/// Method handler function type
///
/// Receives the heap, the receiver (`Handle::NULL` for constructors) and the
/// marshalled arguments. String arguments must be consumed with
/// [`Heap::take_string`].
pub type MethodFn = Rc<dyn Fn(&mut Heap, Handle, &[NativeValue]) -> NativeCallResult>;

/// Registry of native methods keyed by operation symbol
#[derive(Clone, Default)]
pub struct MethodRegistry {
    handlers: FxHashMap<String, MethodFn>,
}

impl MethodRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one operation
    pub fn register(
        &mut self,
        id: OperationId<'_>,
        handler: impl Fn(&mut Heap, Handle, &[NativeValue]) -> NativeCallResult + 'static,
    ) {
        self.handlers.insert(id.to_string(), Rc::new(handler));
    }

    /// Get a handler by operation
    pub fn get(&self, id: &OperationId<'_>) -> Option<MethodFn> {
        self.handlers.get(&id.to_string()).cloned()
    }

    /// Check if a handler is registered
    pub fn contains(&self, id: &OperationId<'_>) -> bool {
        self.handlers.contains_key(&id.to_string())
    }

    /// Get the number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered symbols, sorted
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }
}

impl std::fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("symbols", &self.symbols())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_sdk::Operation;

    #[test]
    fn test_register_and_get() {
        let mut registry = MethodRegistry::new();
        let id = OperationId::new("docs.MyStruct", Operation::Call("say"));
        registry.register(id, |_heap, _this, _args| NativeCallResult::Void);

        assert!(registry.contains(&id));
        assert!(!registry.contains(&OperationId::new("docs.MyStruct", Operation::CallMut("say"))));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.symbols(), vec!["docs.MyStruct::call_say"]);
    }
}
