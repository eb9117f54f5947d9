use serde::{Deserialize, Serialize};

/// One segment of the Pomodoro cycle.
///
/// Transition order: WarmUp -> Work -> (ShortBreak | LongBreak) -> Work -> ...
/// WarmUp is optional; a zero-minute warm-up configuration skips it
/// entirely (see [`crate::timer::engine`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    WarmUp,
    Work,
    ShortBreak,
    LongBreak,
}

/// Whether the active phase's countdown is advancing, halted, or not
/// yet started. Idle is only entered via an explicit reset; completing
/// a phase always auto-starts the next one (Running).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Paused,
}

/// Per-session timer configuration snapshot.
///
/// Durations are whole minutes. `sessions_until_long_break == 0`
/// disables long breaks entirely (every Work completion yields a
/// ShortBreak).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_work_min")]
    pub work_min: u32,
    #[serde(default = "default_short_break_min")]
    pub short_break_min: u32,
    #[serde(default = "default_long_break_min")]
    pub long_break_min: u32,
    #[serde(default = "default_warm_up_min")]
    pub warm_up_min: u32,
    #[serde(default = "default_sessions_until_long_break")]
    pub sessions_until_long_break: u32,
}

fn default_work_min() -> u32 {
    25
}
fn default_short_break_min() -> u32 {
    5
}
fn default_long_break_min() -> u32 {
    15
}
fn default_warm_up_min() -> u32 {
    15
}
fn default_sessions_until_long_break() -> u32 {
    4
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work_min: default_work_min(),
            short_break_min: default_short_break_min(),
            long_break_min: default_long_break_min(),
            warm_up_min: default_warm_up_min(),
            sessions_until_long_break: default_sessions_until_long_break(),
        }
    }
}

impl TimerConfig {
    /// Full duration of `phase` in seconds.
    ///
    /// Uses saturating arithmetic to prevent overflow with large values.
    pub fn phase_secs(&self, phase: Phase) -> u64 {
        let min = match phase {
            Phase::WarmUp => self.warm_up_min,
            Phase::Work => self.work_min,
            Phase::ShortBreak => self.short_break_min,
            Phase::LongBreak => self.long_break_min,
        };
        (min as u64).saturating_mul(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let cfg = TimerConfig::default();
        assert_eq!(cfg.work_min, 25);
        assert_eq!(cfg.short_break_min, 5);
        assert_eq!(cfg.long_break_min, 15);
        assert_eq!(cfg.warm_up_min, 15);
        assert_eq!(cfg.sessions_until_long_break, 4);
    }

    #[test]
    fn phase_secs_converts_minutes() {
        let cfg = TimerConfig::default();
        assert_eq!(cfg.phase_secs(Phase::Work), 25 * 60);
        assert_eq!(cfg.phase_secs(Phase::ShortBreak), 5 * 60);
    }

    #[test]
    fn phase_secs_saturates() {
        let cfg = TimerConfig {
            work_min: u32::MAX,
            ..TimerConfig::default()
        };
        // Must not panic on overflow.
        assert_eq!(cfg.phase_secs(Phase::Work), u32::MAX as u64 * 60);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: TimerConfig = serde_json::from_str(r#"{"work_min": 50}"#).unwrap();
        assert_eq!(cfg.work_min, 50);
        assert_eq!(cfg.sessions_until_long_break, 4);
    }
}
