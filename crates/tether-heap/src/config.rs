//! Heap configuration (`[heap]` table of tether.toml)

use serde::{Deserialize, Serialize};

/// Layout and write policy of the in-process heap
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HeapConfig {
    /// Copy a block to a fresh address on every write instead of mutating in place
    pub relocate_on_write: bool,

    /// Address of the first block
    pub base_address: u64,

    /// Distance between consecutive blocks; inline offsets must stay below it
    pub block_stride: u64,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            relocate_on_write: false,
            base_address: 0x10000,
            block_stride: 0x1000,
        }
    }
}

impl HeapConfig {
    /// Default layout with relocation enabled
    pub fn relocating() -> Self {
        Self {
            relocate_on_write: true,
            ..Self::default()
        }
    }
}
