pub mod engine;
mod phase;
mod record;

pub use phase::{Phase, RunState, TimerConfig};
pub use record::TimerRecord;
