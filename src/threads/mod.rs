//! Per-thread decision state: how an inbound email maps to a thread,
//! how that thread's decision is persisted, and the state machine
//! that decides when the classifier needs to be consulted at all.

pub mod key;
pub mod locks;
pub mod machine;
pub mod state;
pub mod store;

pub use key::{KEY_LEN, ThreadKey, resolve_key};
pub use locks::KeyLocks;
pub use machine::{Outcome, ThreadError, ThreadStateMachine};
pub use state::{Decision, Status, ThreadMessage, ThreadState};
pub use store::{
    FileStore, MemoryStore, SharedStore, SqliteStore, StoreError, ThreadStateStore, open_store,
};
