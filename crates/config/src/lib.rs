// View configuration persistence

pub mod session;
pub mod share;
pub mod snapshot;
pub mod store;
pub mod theme;

pub use session::ConfigSession;
pub use snapshot::{apply_snapshot, build_snapshot, migrate, Snapshot, SnapshotError, SETTINGS_VERSION};
pub use store::{FileStore, KeyValueStore, MemoryStore};
