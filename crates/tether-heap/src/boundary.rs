//! `NativeBoundary` over the in-process heap

use std::cell::{Ref, RefCell, RefMut};
use std::panic::{catch_unwind, AssertUnwindSafe};

use tether_sdk::{
    AbiResult, Handle, KindDescriptor, NativeBoundary, NativeCallResult, NativeError, NativeValue,
    Operation, OperationId,
};

use crate::config::HeapConfig;
use crate::heap::{Heap, HeapResult};
use crate::methods::MethodRegistry;

/// In-process native side.
///
/// Field access, the `new` constructor and release are served by the heap.
/// Other constructors and all methods dispatch through the [`MethodRegistry`].
/// A panicking handler is reported as a failed call.
pub struct HeapBoundary {
    heap: RefCell<Heap>,
    methods: MethodRegistry,
}

impl HeapBoundary {
    /// Create a boundary over an empty heap
    pub fn new(config: HeapConfig) -> Self {
        Self {
            heap: RefCell::new(Heap::new(config)),
            methods: MethodRegistry::new(),
        }
    }

    /// Register a kind with the heap
    pub fn register_kind(&mut self, kind: &'static KindDescriptor) -> HeapResult<()> {
        self.heap.get_mut().register(kind)
    }

    /// Register a method or constructor handler
    pub fn register_method(
        &mut self,
        id: OperationId<'_>,
        handler: impl Fn(&mut Heap, Handle, &[NativeValue]) -> NativeCallResult + 'static,
    ) {
        self.methods.register(id, handler);
    }

    /// Get the method registry
    pub fn methods(&self) -> &MethodRegistry {
        &self.methods
    }

    /// Borrow the heap
    pub fn heap(&self) -> Ref<'_, Heap> {
        self.heap.borrow()
    }

    /// Borrow the heap mutably
    pub fn heap_mut(&self) -> RefMut<'_, Heap> {
        self.heap.borrow_mut()
    }

    fn dispatch(&self, handle: Handle, op: &OperationId<'_>, args: &[NativeValue]) -> NativeCallResult {
        match op.op {
            Operation::Construct("new") if !self.methods.contains(op) => {
                let mut heap = self.heap.borrow_mut();
                NativeCallResult::from_result(heap.construct(op.kind), NativeCallResult::Handle)
            }
            Operation::Release => {
                let mut heap = self.heap.borrow_mut();
                let result = check_kind(&heap, handle, op.kind).and_then(|_| heap.free(handle));
                NativeCallResult::from_result(result, |_| NativeCallResult::Void)
            }
            Operation::Get(field) => {
                let mut heap = self.heap.borrow_mut();
                NativeCallResult::from_result(heap.read(handle, op.kind, field), NativeCallResult::Value)
            }
            Operation::Set(field) => {
                let mut heap = self.heap.borrow_mut();
                match args {
                    [value] => NativeCallResult::from_result(
                        heap.write(handle, op.kind, field, *value),
                        NativeCallResult::Handle,
                    ),
                    _ => {
                        discard_strings(&mut heap, args);
                        NativeCallResult::error(format!("{op} takes 1 argument, got {}", args.len()))
                    }
                }
            }
            Operation::Construct(_) | Operation::Call(_) | Operation::CallMut(_) => {
                self.call_method(handle, op, args)
            }
        }
    }

    fn call_method(&self, handle: Handle, op: &OperationId<'_>, args: &[NativeValue]) -> NativeCallResult {
        let Some(handler) = self.methods.get(op) else {
            discard_strings(&mut self.heap.borrow_mut(), args);
            return NativeCallResult::error(format!("no native symbol {op}"));
        };

        if op.op.needs_receiver() {
            let checked = check_kind(&self.heap.borrow(), handle, op.kind);
            if let Err(e) = checked {
                discard_strings(&mut self.heap.borrow_mut(), args);
                return NativeCallResult::error(e.to_string());
            }
        }

        let mut heap = self.heap.borrow_mut();
        catch_unwind(AssertUnwindSafe(|| handler(&mut *heap, handle, args))).unwrap_or_else(|panic| {
            let msg = if let Some(s) = panic.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            log::warn!("native handler {op} panicked: {msg}");
            NativeCallResult::error(format!("panic: {msg}"))
        })
    }
}

impl Default for HeapBoundary {
    fn default() -> Self {
        Self::new(HeapConfig::default())
    }
}

fn check_kind(heap: &Heap, handle: Handle, expected: &str) -> HeapResult<()> {
    let found = heap.kind_of(handle)?;
    if found != expected {
        return Err(crate::heap::HeapError::KindMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }
    Ok(())
}

/// Strings are consumed by the callee even when the call is rejected
fn discard_strings(heap: &mut Heap, args: &[NativeValue]) {
    for id in args.iter().filter_map(NativeValue::as_string_id) {
        let _ = heap.take_string(id);
    }
}

impl NativeBoundary for HeapBoundary {
    fn invoke(&self, handle: Handle, op: &OperationId<'_>, args: &[NativeValue]) -> NativeCallResult {
        log::trace!("invoke {op} on {handle:?} with {} arg(s)", args.len());
        let result = self.dispatch(handle, op, args);
        if let NativeCallResult::Error(message) = &result {
            log::debug!("{op} failed: {message}");
        }
        result
    }

    fn create_string(&self, s: &str) -> NativeValue {
        self.heap.borrow_mut().create_string(s)
    }

    fn read_string(&self, val: NativeValue) -> AbiResult<String> {
        let id = val
            .as_string_id()
            .ok_or_else(|| NativeError::mismatch("string", val.type_name()))?;
        self.heap
            .borrow_mut()
            .take_string(id)
            .map_err(|e| NativeError::AbiError(e.to_string()))
    }

    fn runtime_kind(&self, handle: Handle) -> AbiResult<String> {
        self.heap
            .borrow()
            .kind_of(handle)
            .map(str::to_string)
            .map_err(|e| NativeError::AbiError(e.to_string()))
    }
}
