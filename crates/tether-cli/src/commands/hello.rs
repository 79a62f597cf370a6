//! `tether hello`: field access on a root and a nested struct

use tether_core::Runtime;

use super::runtime;
use crate::config::TetherConfig;
use crate::kinds::{MyOtherStruct, MyOtherStructExt, MyStructExt};

fn fields(rt: &Runtime) -> anyhow::Result<()> {
    let mut s = rt.construct::<MyOtherStruct>()?;

    s.set_a("Hello,")?;
    print!("S: {}", s.get_a()?);
    s.set_a(" world!")?;
    println!("{}", s.get_a()?);

    s.get_b()?.set_a("2Hello,")?;
    print!("S: {}", s.get_b()?.get_a()?);
    s.get_b()?.set_a(" 2world!")?;
    println!("{}", s.get_b()?.get_a()?);

    s.release()?;
    Ok(())
}

fn methods(rt: &Runtime) -> anyhow::Result<()> {
    let mut s = rt.construct::<MyOtherStruct>()?;
    let b = s.get_b()?;

    println!("{}", s.call::<String>("say_only", &[&"First hello!"])?);
    s.get_b()?.set_a("Hello, ")?;
    println!("{}", s.call::<String>("say", &[&"world!"])?);
    println!("{}", s.call::<String>("say_with", &[&b.handle(), &"hello!"])?);
    b.set_a("Second ")?;
    println!("{}", s.call::<String>("say_with", &[&b.handle(), &"hello!"])?);

    s.release()?;
    Ok(())
}

pub fn execute(config: &TetherConfig) -> anyhow::Result<()> {
    let (rt, boundary) = runtime(config)?;
    fields(&rt)?;
    methods(&rt)?;
    log::debug!(
        "{} blocks and {} strings left on the heap",
        boundary.heap().block_count(),
        boundary.heap().pending_strings()
    );
    Ok(())
}
