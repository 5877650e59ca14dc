//! Client-side store for a shopping-list collection that must feel
//! instantaneous while a remote server stays the source of truth.
//!
//! Item-level mutations (removing an item, toggling its purchased flag) are
//! applied optimistically: the store captures a snapshot of everything the
//! operation may touch, mutates in memory, then calls the server. A
//! successful call replaces the optimistic guess with the server's canonical
//! entities; a failed call restores the snapshot verbatim. Operations whose
//! entities need a server-assigned id (creating a list, deleting a whole
//! list, adding an item) skip the optimistic step and apply the server
//! response directly.
//!
//! The store is single-threaded and event-driven; the only suspension point
//! in an operation is the remote call itself. State is persisted as an
//! opaque blob after every change and rehydrated once at startup.

pub mod api;
#[cfg(feature = "http")]
pub mod http;
pub mod model;
pub mod persistence;
pub mod stats;
pub mod store;

pub use api::{ApiError, ListApi};
#[cfg(feature = "http")]
pub use http::{HttpListApi, RemoteConfig};
pub use model::{
    Item, ItemAdded, ListBundle, ListStatistics, ListUpdate, NewItem, NewList, ShoppingList,
};
pub use persistence::{
    DirSnapshotStore, MemorySnapshotStore, SNAPSHOT_KEY, SnapshotError, SnapshotStore,
};
pub use stats::list_statistics;
pub use store::{ListStore, ListenerKey, StoreState};
