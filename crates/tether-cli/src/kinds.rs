//! Demo kinds and their native methods

use tether_core::{proxy_kind, NativeValue, ProxyKind};
use tether_heap::{Heap, HeapBoundary, HeapConfig, HeapError, HeapResult, Scalar};
use tether_sdk::{Handle, NativeCallResult, Operation, OperationId};

proxy_kind! {
    /// A string, an int and a double
    pub kind MyStruct("docs.MyStruct"): MyStructExt {
        a: value String { get_a, set_a },
        b: value i32 { get_b, set_b },
        c: value f64 { get_c, set_c },
    }
}

proxy_kind! {
    /// A string plus a separately allocated `MyStruct`
    pub kind MyOtherStruct("docs.MyOtherStruct"): MyOtherStructExt {
        a: value String { get_a, set_a },
        b: boxed MyStruct { get_b, set_b },
    }
}

const OTHER: &str = "docs.MyOtherStruct";

fn take_str(heap: &mut Heap, value: &NativeValue) -> HeapResult<String> {
    match value.as_string_id() {
        Some(id) => heap.take_string(id),
        None => Err(HeapError::FieldType {
            field: "argument".to_string(),
            expected: "string".to_string(),
            got: value.type_name().to_string(),
        }),
    }
}

fn field_a(heap: &Heap, handle: Handle) -> HeapResult<String> {
    match heap.scalar(handle, "a")? {
        Scalar::Str(s) => Ok(s),
        other => Err(HeapError::FieldType {
            field: "a".to_string(),
            expected: "string".to_string(),
            got: other.kind().name().to_string(),
        }),
    }
}

fn answer(heap: &mut Heap, result: HeapResult<String>) -> NativeCallResult {
    match result {
        Ok(line) => NativeCallResult::Value(heap.create_string(&line)),
        Err(e) => NativeCallResult::error(e.to_string()),
    }
}

/// say_only(message): the message itself
fn say_only(heap: &mut Heap, _this: Handle, args: &[NativeValue]) -> NativeCallResult {
    let [message] = args else {
        return NativeCallResult::error("say_only expects (string)");
    };
    let result = take_str(heap, message);
    answer(heap, result)
}

/// say(p2): `b.a` followed by p2
fn say(heap: &mut Heap, this: Handle, args: &[NativeValue]) -> NativeCallResult {
    let [p2] = args else {
        return NativeCallResult::error("say expects (string)");
    };
    let result = take_str(heap, p2).and_then(|p2| {
        let b = heap
            .read(this, OTHER, "b")?
            .as_handle()
            .ok_or(HeapError::Dangling(this))?;
        Ok(format!("{}{}", field_a(heap, b)?, p2))
    });
    answer(heap, result)
}

/// say_with(p1, p2): `p1.a` followed by p2
fn say_with(heap: &mut Heap, _this: Handle, args: &[NativeValue]) -> NativeCallResult {
    let [p1, p2] = args else {
        return NativeCallResult::error("say_with expects (MyStruct, string)");
    };
    let result = take_str(heap, p2).and_then(|p2| {
        let p1 = p1.as_handle().ok_or(HeapError::Dangling(Handle::NULL))?;
        if heap.kind_of(p1)? != MyStruct::DESCRIPTOR.id {
            return Err(HeapError::KindMismatch {
                expected: MyStruct::DESCRIPTOR.id.to_string(),
                found: heap.kind_of(p1)?.to_string(),
            });
        }
        Ok(format!("{}{}", field_a(heap, p1)?, p2))
    });
    answer(heap, result)
}

/// Heap boundary with the demo kinds and methods registered
pub fn boundary(config: HeapConfig) -> anyhow::Result<HeapBoundary> {
    let mut boundary = HeapBoundary::new(config);
    boundary.register_kind(MyStruct::DESCRIPTOR)?;
    boundary.register_kind(MyOtherStruct::DESCRIPTOR)?;

    boundary.register_method(OperationId::new(OTHER, Operation::Call("say_only")), say_only);
    boundary.register_method(OperationId::new(OTHER, Operation::Call("say")), say);
    boundary.register_method(OperationId::new(OTHER, Operation::Call("say_with")), say_with);
    log::debug!("registered {} demo methods", boundary.methods().len());
    Ok(boundary)
}
