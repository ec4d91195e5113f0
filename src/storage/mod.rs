//! Origin-scoped key-value stores (`localStorage` / `sessionStorage`).
//!
//! Both stores share one shape, so a single [`KeyValueMirror`] type serves
//! either, selected by [`StoreScope`].

pub mod memory;
pub mod mirror;

pub use memory::MemoryStore;
pub use mirror::{KeyValueBackend, KeyValueMap, KeyValueMirror, StoreReplay, StoreScope};
