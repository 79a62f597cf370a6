//! Kinds and boundaries shared by the integration tests

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use tether_core::{
    proxy_kind, AbiResult, BindingConfig, Handle, NativeBoundary, NativeValue, Runtime,
};
use tether_heap::{HeapBoundary, HeapConfig, Scalar};
use tether_sdk::{NativeCallResult, Operation, OperationId};

proxy_kind! {
    /// Plain struct with value fields only
    pub kind MyStruct("docs.MyStruct"): MyStructExt {
        a: value String { get_a, set_a },
        b: value i32 { get_b, set_b },
        c: value f64 { get_c, set_c },
    }
}

proxy_kind! {
    /// Struct holding a `MyStruct` behind a pointer
    pub kind MyOtherStruct("docs.MyOtherStruct"): MyOtherStructExt {
        a: value String { get_a, set_a },
        b: boxed MyStruct { get_b, set_b },
    }
}

proxy_kind! {
    /// Middle of an inline chain; also holds a boxed leaf
    pub kind Middle("test.Middle"): MiddleExt {
        tag: value i64 { get_tag, set_tag },
        leaf: inline MyStruct = 0x40 { get_leaf, set_leaf },
        boxed_leaf: boxed MyStruct { get_boxed_leaf, set_boxed_leaf },
    }
}

proxy_kind! {
    /// Root of an inline chain: `Outer.inner.leaf` is embedded all the way down
    pub kind Outer("test.Outer"): OuterExt {
        name: value String { get_name, set_name },
        inner: inline Middle = 0x100 { get_inner, set_inner },
    }
}

proxy_kind! {
    /// One field per primitive wire kind
    pub kind Scalars("test.Scalars"): ScalarsExt {
        flag: value bool { get_flag, set_flag },
        byte: value i8 { get_byte, set_byte },
        ch: value char { get_ch, set_ch },
        short: value i16 { get_short, set_short },
        int: value i32 { get_int, set_int },
        long: value i64 { get_long, set_long },
        float: value f32 { get_float, set_float },
        double: value f64 { get_double, set_double },
        text: value String { get_text, set_text },
    }
}

/// Heap boundary with every test kind and method registered
pub fn heap_boundary(config: HeapConfig) -> HeapBoundary {
    let mut boundary = HeapBoundary::new(config);
    for kind in [
        <MyStruct as tether_core::ProxyKind>::DESCRIPTOR,
        <MyOtherStruct as tether_core::ProxyKind>::DESCRIPTOR,
        <Middle as tether_core::ProxyKind>::DESCRIPTOR,
        <Outer as tether_core::ProxyKind>::DESCRIPTOR,
        <Scalars as tether_core::ProxyKind>::DESCRIPTOR,
    ] {
        boundary.register_kind(kind).unwrap();
    }

    // describe(): "<a>/<b>"
    boundary.register_method(
        OperationId::new("docs.MyStruct", Operation::Call("describe")),
        |heap, this, _args| {
            let (Ok(Scalar::Str(a)), Ok(Scalar::Int(b))) = (heap.scalar(this, "a"), heap.scalar(this, "b")) else {
                return NativeCallResult::error("corrupt MyStruct");
            };
            NativeCallResult::Value(heap.create_string(&format!("{a}/{b}")))
        },
    );

    // bump(n): b += n, answers with the receiver's new handle
    boundary.register_method(
        OperationId::new("docs.MyStruct", Operation::CallMut("bump")),
        |heap, this, args| {
            let (Ok(Scalar::Int(b)), Some(n)) = (heap.scalar(this, "b"), args.first().and_then(NativeValue::as_int)) else {
                return NativeCallResult::error("bump expects one int");
            };
            NativeCallResult::from_result(
                heap.write(this, "docs.MyStruct", "b", NativeValue::int(b + n)),
                NativeCallResult::Handle,
            )
        },
    );

    // with(a, b): named constructor
    boundary.register_method(
        OperationId::new("docs.MyStruct", Operation::Construct("with")),
        |heap, _this, args| {
            let [a, b] = args else {
                return NativeCallResult::error("with expects (string, int)");
            };
            let result = heap.construct("docs.MyStruct").and_then(|h| {
                let h = heap.write(h, "docs.MyStruct", "a", *a)?;
                heap.write(h, "docs.MyStruct", "b", *b)
            });
            NativeCallResult::from_result(result, NativeCallResult::Handle)
        },
    );

    // clone_b(): deep copy of field b as a new root
    boundary.register_method(
        OperationId::new("docs.MyOtherStruct", Operation::Call("clone_b")),
        |heap, this, _args| {
            let result = heap
                .read(this, "docs.MyOtherStruct", "b")
                .and_then(|b| match b.as_handle() {
                    Some(b) => heap.copy_root(b),
                    None => Err(tether_heap::HeapError::Dangling(this)),
                });
            NativeCallResult::from_result(result, NativeCallResult::Handle)
        },
    );

    // fail(): always reports a native error
    boundary.register_method(
        OperationId::new("docs.MyStruct", Operation::CallMut("fail")),
        |_heap, _this, _args| NativeCallResult::error("validation failed"),
    );

    boundary
}

/// Runtime over a fresh heap. The returned boundary is shared with the
/// runtime so tests can inspect the heap.
pub fn runtime(relocate: bool) -> (Runtime, Rc<HeapBoundary>) {
    runtime_with(relocate, BindingConfig::default())
}

/// Runtime over a fresh heap with an explicit binding configuration
pub fn runtime_with(relocate: bool, config: BindingConfig) -> (Runtime, Rc<HeapBoundary>) {
    let heap = HeapConfig {
        relocate_on_write: relocate,
        ..HeapConfig::default()
    };
    let boundary = Rc::new(heap_boundary(heap));
    (Runtime::with_config(Rc::clone(&boundary), config), boundary)
}

/// Boundary wrapper counting native invocations
pub struct Counting {
    pub inner: Rc<HeapBoundary>,
    pub calls: Rc<Cell<usize>>,
}

impl NativeBoundary for Counting {
    fn invoke(&self, handle: Handle, op: &OperationId<'_>, args: &[NativeValue]) -> NativeCallResult {
        self.calls.set(self.calls.get() + 1);
        self.inner.invoke(handle, op, args)
    }

    fn create_string(&self, s: &str) -> NativeValue {
        self.inner.create_string(s)
    }

    fn read_string(&self, val: NativeValue) -> AbiResult<String> {
        self.inner.read_string(val)
    }

    fn runtime_kind(&self, handle: Handle) -> AbiResult<String> {
        self.inner.runtime_kind(handle)
    }
}

/// Relocating runtime whose native calls are counted
pub fn counting_runtime() -> (Runtime, Rc<HeapBoundary>, Rc<Cell<usize>>) {
    let boundary = Rc::new(heap_boundary(HeapConfig::relocating()));
    let calls = Rc::new(Cell::new(0));
    let counting = Counting {
        inner: Rc::clone(&boundary),
        calls: Rc::clone(&calls),
    };
    (Runtime::new(counting), boundary, calls)
}
