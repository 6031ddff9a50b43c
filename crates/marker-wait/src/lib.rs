//! Marker wait engine
//!
//! Polls an object store for the markers an out-of-band job writes next to
//! its artifact (`<name>.started`, `<name>.ok`, `<name>.error`) and resolves
//! the size of `<name>.bz2.crypt` once the job is done.
//!
//! - `keys`: marker and artifact key derivation
//! - `store`: the object store capability and its errors
//! - `memory`: an in-process store
//! - `progress`: the serialized spinner/log display
//! - `watcher`: the three marker watchers
//! - `coordinator`: runs everything and picks the result

mod coordinator;
mod error;
mod keys;
mod memory;
mod progress;
mod state;
mod store;
mod watcher;

pub use coordinator::{WaitCoordinator, DEFAULT_WAIT_TIMEOUT};
pub use error::{StoreOp, WaitError, WaitResult};
pub use keys::{JobKeys, ARTIFACT_EXT, ERROR_EXT, OK_EXT, STARTED_EXT};
pub use memory::MemoryStore;
pub use progress::{
    format_clock, progress_channel, Frame, ProgressEvent, ProgressRenderer, ProgressSink,
    ProgressSurface, TerminalSurface, PROGRESS_QUEUE_DEPTH, TICK_INTERVAL,
};
pub use store::{ObjectMeta, ObjectStore, StoreError, StoreResult};
pub use watcher::{WaitOutcome, WatcherKind};
