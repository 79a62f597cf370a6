//! Handle propagation through chains of owners
//!
//! Every test runs against the in-process heap. With relocation on, each
//! write moves the written block, so every mutation hands back a new handle
//! that has to travel up to the root.

mod common;

use std::rc::Rc;

use common::*;
use tether_core::{
    BindingConfig, FieldDescriptor, FieldRepr, FieldSlots, FieldUpdate, Handle, KindDescriptor,
    ProxyKind, Runtime,
};
use tether_heap::HeapConfig;

/// Owner whose field-update hook knows none of its fields
struct Opaque;

impl ProxyKind for Opaque {
    const DESCRIPTOR: &'static KindDescriptor = &KindDescriptor {
        id: "test.Opaque",
        fields: &[FieldDescriptor {
            name: "inner",
            repr: FieldRepr::Inline {
                kind: "docs.MyStruct",
                offset: 0x40,
            },
        }],
    };

    fn update_field(_slots: &mut FieldSlots, _field: &str, _handle: Handle) -> FieldUpdate {
        FieldUpdate::Unknown
    }
}

#[test]
fn test_hello_scenario_in_place() {
    let (rt, _boundary) = runtime(false);
    let mut root = rt.construct::<MyOtherStruct>().unwrap();

    root.set_a("Hello, ").unwrap();
    let b = root.get_b().unwrap();
    b.set_a("world!").unwrap();

    assert_eq!(root.get_a().unwrap(), "Hello, ");
    assert_eq!(root.get_b().unwrap().get_a().unwrap(), "world!");
    root.release().unwrap();
}

#[test]
fn test_hello_scenario_relocating() {
    let (rt, boundary) = runtime(true);
    let mut root = rt.construct::<MyOtherStruct>().unwrap();
    let first = root.handle();

    root.set_a("Hello, ").unwrap();
    assert_ne!(root.handle(), first);

    let b = root.get_b().unwrap();
    let b_before = b.handle();
    b.set_a("world!").unwrap();
    assert_ne!(b.handle(), b_before);

    assert_eq!(root.get_a().unwrap(), "Hello, ");
    assert_eq!(root.get_b().unwrap().get_a().unwrap(), "world!");

    root.release().unwrap();
    assert_eq!(boundary.heap().block_count(), 0);
}

#[test]
fn test_boxed_child_is_recorded_on_owner() {
    let (rt, _boundary) = runtime(true);
    let root = rt.construct::<MyOtherStruct>().unwrap();
    let root_handle = root.handle();

    let b = root.get_b().unwrap();
    assert_eq!(root.field_slot("b"), Some(b.handle()));
    assert_eq!(b.owner_field(), Some("b"));
    assert!(!b.is_root());

    b.set_b(42).unwrap();

    // The owner records the child's new handle but does not move itself.
    assert_eq!(root.field_slot("b"), Some(b.handle()));
    assert_eq!(root.handle(), root_handle);
    assert_eq!(root.get_b().unwrap().handle(), b.handle());
    assert_eq!(root.get_b().unwrap().get_b().unwrap(), 42);
}

#[test]
fn test_inline_chain_moves_every_owner() {
    let (rt, _boundary) = runtime(true);
    let root = rt.construct::<Outer>().unwrap();
    let inner = root.get_inner().unwrap();
    let leaf = inner.get_leaf().unwrap();

    let root_before = root.handle();
    let inner_before = inner.handle();
    assert_eq!(inner_before, root_before.offset_by(0x100));
    assert_eq!(leaf.handle(), inner_before.offset_by(0x40));

    leaf.set_b(7).unwrap();

    assert_ne!(root.handle(), root_before);
    assert_ne!(inner.handle(), inner_before);
    assert_eq!(inner.handle(), root.handle().offset_by(0x100));
    assert_eq!(leaf.handle(), inner.handle().offset_by(0x40));
    assert_eq!(root.get_inner().unwrap().get_leaf().unwrap().get_b().unwrap(), 7);
}

#[test]
fn test_chain_built_from_temporaries_reaches_root() {
    let (rt, _boundary) = runtime(true);
    let root = rt.construct::<Outer>().unwrap();
    let before = root.handle();

    // The intermediate `Middle` proxy is dropped at the end of the statement.
    let leaf = root.get_inner().unwrap().get_leaf().unwrap();
    leaf.set_a("deep").unwrap();

    assert_ne!(root.handle(), before);
    assert_eq!(root.get_inner().unwrap().get_leaf().unwrap().get_a().unwrap(), "deep");

    root.get_inner().unwrap().get_leaf().unwrap().set_c(2.5).unwrap();
    assert_eq!(root.get_inner().unwrap().get_leaf().unwrap().get_c().unwrap(), 2.5);
}

#[test]
fn test_root_moves_iff_middle_moves() {
    let (rt, _boundary) = runtime(true);
    let root = rt.construct::<Outer>().unwrap();
    let inner = root.get_inner().unwrap();

    // Boxed grandchild: the heap rebinds its pointer, the middle stays put.
    let (root_before, inner_before) = (root.handle(), inner.handle());
    inner.get_boxed_leaf().unwrap().set_b(1).unwrap();
    assert_eq!(inner.handle(), inner_before);
    assert_eq!(root.handle(), root_before);
    assert_eq!(root.get_inner().unwrap().get_boxed_leaf().unwrap().get_b().unwrap(), 1);

    // Inline grandchild: the middle moves, so the root moves too.
    inner.get_leaf().unwrap().set_b(2).unwrap();
    assert_ne!(inner.handle(), inner_before);
    assert_ne!(root.handle(), root_before);
}

#[test]
fn test_in_place_writes_stop_after_first_owner() {
    let (rt, _boundary) = runtime(false);
    let root = rt.construct::<Outer>().unwrap();
    let before = root.handle();
    let leaf = root.get_inner().unwrap().get_leaf().unwrap();

    leaf.set_b(3).unwrap();
    assert_eq!(root.handle(), before);
    // The middle derives the same handle it already has and stops there.
    assert_eq!(leaf.propagate(), 1);
}

#[test]
fn test_explicit_propagate_is_idempotent() {
    let (rt, _boundary) = runtime(true);
    let root = rt.construct::<Outer>().unwrap();
    let leaf = root.get_inner().unwrap().get_leaf().unwrap();
    leaf.set_b(1).unwrap();

    let settled = root.handle();
    assert_eq!(leaf.propagate(), 1);
    assert_eq!(root.handle(), settled);
    assert_eq!(root.propagate(), 0);
}

#[test]
fn test_propagation_depth_bound() {
    let config = BindingConfig {
        max_propagation_depth: 1,
        ..BindingConfig::default()
    };
    let (rt, _boundary) = runtime_with(true, config);
    let root = rt.construct::<Outer>().unwrap();
    let inner = root.get_inner().unwrap();
    let leaf = inner.get_leaf().unwrap();
    let root_before = root.handle();

    leaf.set_b(9).unwrap();

    // One hop reached the middle, the root was not told.
    assert_eq!(inner.handle(), leaf.handle().offset_back(0x40));
    assert_eq!(root.handle(), root_before);
    assert_ne!(root.handle(), inner.handle().offset_back(0x100));
}

#[test]
fn test_mutating_method_propagates() {
    let (rt, _boundary) = runtime(true);
    let root = rt.construct::<Outer>().unwrap();
    let before = root.handle();

    let leaf = root.get_inner().unwrap().get_leaf().unwrap();
    leaf.call_mut("bump", &[&5]).unwrap();
    leaf.call_mut("bump", &[&5]).unwrap();

    assert_ne!(root.handle(), before);
    assert_eq!(root.get_inner().unwrap().get_leaf().unwrap().get_b().unwrap(), 10);
}

#[test]
fn test_failed_mutation_installs_nothing() {
    let (rt, _boundary) = runtime(true);
    let root = rt.construct::<Outer>().unwrap();
    let leaf = root.get_inner().unwrap().get_leaf().unwrap();
    let (root_before, leaf_before) = (root.handle(), leaf.handle());

    let err = leaf.call_mut("fail", &[]).unwrap_err();
    assert!(matches!(err, tether_core::NativeError::NativeCallFailure { .. }));
    assert_eq!(leaf.handle(), leaf_before);
    assert_eq!(root.handle(), root_before);
}

#[test]
fn test_set_nested_copies_value() {
    let (rt, _boundary) = runtime(true);
    let root = rt.construct::<MyOtherStruct>().unwrap();
    let mut source = rt.construct::<MyStruct>().unwrap();
    source.set_a("copied").unwrap();
    source.set_b(11).unwrap();

    root.get_b().unwrap();
    root.set_b(&source).unwrap();
    assert_eq!(root.field_slot("b"), None);

    // Later changes to the source do not reach the copy.
    source.set_b(12).unwrap();
    let b = root.get_b().unwrap();
    assert_eq!(b.get_a().unwrap(), "copied");
    assert_eq!(b.get_b().unwrap(), 11);

    source.release().unwrap();
    assert_eq!(root.get_b().unwrap().get_b().unwrap(), 11);
}

#[test]
fn test_inline_set_nested_moves_owner() {
    let (rt, _boundary) = runtime(true);
    let root = rt.construct::<Outer>().unwrap();
    let replacement = rt.construct::<Middle>().unwrap();
    replacement.set_tag(-4).unwrap();
    replacement.get_leaf().unwrap().set_a("inline copy").unwrap();

    let inner = root.get_inner().unwrap();
    let before = root.handle();
    inner.set_leaf(&replacement.get_leaf().unwrap()).unwrap();
    root.set_inner(&replacement).unwrap();

    assert_ne!(root.handle(), before);
    let inner = root.get_inner().unwrap();
    assert_eq!(inner.get_tag().unwrap(), -4);
    assert_eq!(inner.get_leaf().unwrap().get_a().unwrap(), "inline copy");
}

#[test]
fn test_unknown_field_stops_walk() {
    let mut boundary = heap_boundary(HeapConfig::relocating());
    boundary.register_kind(Opaque::DESCRIPTOR).unwrap();
    let rt = Runtime::new(Rc::new(boundary));

    let owner = rt.construct::<Opaque>().unwrap();
    let before = owner.handle();
    let child = owner.nested::<MyStruct>("inner").unwrap();

    // The hook is asked once and declines, so the walk ends at the owner.
    assert_eq!(child.propagate(), 1);

    child.set_a("moved").unwrap();
    assert_eq!(child.get_a().unwrap(), "moved");
    assert_eq!(owner.handle(), before);
    assert_ne!(child.handle(), before.offset_by(0x40));
    assert_eq!(owner.field_slot("inner"), Some(before.offset_by(0x40)));

    // The owner never took the new handle; the child is now detached.
    assert_eq!(child.propagate(), 0);
}
