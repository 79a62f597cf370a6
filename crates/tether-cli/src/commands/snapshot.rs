//! `tether snapshot`: a nested proxy read before a write keeps the old value

use super::runtime;
use crate::config::TetherConfig;
use crate::kinds::{MyOtherStruct, MyOtherStructExt, MyStructExt};

pub fn execute(config: &TetherConfig) -> anyhow::Result<()> {
    let (rt, boundary) = runtime(config)?;
    let mut root = rt.construct::<MyOtherStruct>()?;
    root.get_b()?.set_a("first")?;

    let orig = root.get_b()?;
    println!("orig   {:?} a={:?}", orig.handle(), orig.get_a()?);

    root.get_b()?.set_a("X")?;
    let fresh = root.get_b()?;
    println!("orig   {:?} a={:?}", orig.handle(), orig.get_a()?);
    println!("fresh  {:?} a={:?}", fresh.handle(), fresh.get_a()?);

    if config.heap.relocate_on_write {
        println!("orig is a stale snapshot; read the field again for the latest value");
    } else {
        println!("writes happen in place, so orig and fresh share storage (try --relocate)");
    }

    print!("{}", boundary.heap().dump(root.handle())?);
    root.release()?;
    Ok(())
}
