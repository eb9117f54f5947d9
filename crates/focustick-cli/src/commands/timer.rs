use clap::Subcommand;
use focustick_core::{Command, TimerService};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start the timer if idle
    Start,
    /// Pause if running, resume if paused, start if idle
    Toggle,
    /// Pause the countdown
    Pause,
    /// Resume a paused countdown
    Resume,
    /// Advance to the next phase regardless of remaining time
    Skip,
    /// Reset to idle with zero completed sessions
    Reset,
    /// Print current timer state as JSON
    Status,
}

/// Every subcommand reads through reconciliation, so a stale shared
/// snapshot left by another process is rolled forward before the
/// command applies. This binary may be the only process running.
pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let service = TimerService::open()?;

    let event = match action {
        TimerAction::Start => service.start()?,
        TimerAction::Toggle => service.apply(Command::Toggle)?,
        TimerAction::Pause => service.pause()?,
        TimerAction::Resume => service.resume()?,
        TimerAction::Skip => service.apply(Command::Skip)?,
        TimerAction::Reset => service.apply(Command::ResetRequested)?,
        TimerAction::Status => service.snapshot()?,
    };
    println!("{}", serde_json::to_string_pretty(&event)?);
    Ok(())
}
