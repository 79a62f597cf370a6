//! Subcommand implementations

pub mod config;
pub mod hello;
pub mod snapshot;

use std::rc::Rc;

use tether_core::Runtime;
use tether_heap::HeapBoundary;

use crate::config::TetherConfig;
use crate::kinds;

/// Runtime over a fresh demo heap. The boundary is shared so commands can
/// inspect the heap afterwards.
pub fn runtime(config: &TetherConfig) -> anyhow::Result<(Runtime, Rc<HeapBoundary>)> {
    let boundary = Rc::new(kinds::boundary(config.heap.clone())?);
    let runtime = Runtime::with_config(Rc::clone(&boundary), config.binding.clone());
    Ok((runtime, boundary))
}
