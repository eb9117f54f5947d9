//! # Focustick Core Library
//!
//! Core business logic for the Focustick Pomodoro timer: the phase
//! state machine and the cross-process state synchronization layer.
//! All operations are available via a standalone CLI binary; GUI
//! surfaces are thin layers over the same library.
//!
//! ## Architecture
//!
//! - **Phase Engine**: pure transition functions over the canonical
//!   timer record; the caller supplies the clock
//! - **Stores**: a process-local durable store (SQLite) and a
//!   cross-process shared store (atomic JSON snapshot), merged only by
//!   the reconciliation procedure
//! - **Reconciliation**: derives true elapsed time from the write
//!   timestamp on every resume; a missed tick never loses time
//! - **Control channel**: toggle/skip/reset commands from any process,
//!   applied through the engine and written back atomically
//!
//! ## Key Components
//!
//! - [`TimerRecord`]: the authoritative state snapshot
//! - [`TimerService`]: the state-owning component and command entry point
//! - [`SharedStore`] / [`DurableStore`]: the two persistence channels
//! - [`Config`]: TOML-backed user configuration

pub mod codec;
pub mod control;
pub mod error;
pub mod events;
pub mod reconcile;
pub mod storage;
pub mod timer;

pub use control::{Command, Notify, TimerService};
pub use error::{ConfigError, CoreError, StoreError};
pub use events::Event;
pub use storage::{Config, DurableStore, SharedStore};
pub use timer::{Phase, RunState, TimerConfig, TimerRecord};
