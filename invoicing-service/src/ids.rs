//! Human-readable, time-ordered identifiers such as `INV-20241215-143052-123456`.

use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Entity kinds and their id prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    User,
    Subscription,
    Plan,
    Preferences,
    Client,
    Invoice,
    UsageLog,
    Analytics,
}

impl IdKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            IdKind::User => "USR",
            IdKind::Subscription => "SUB",
            IdKind::Plan => "PLN",
            IdKind::Preferences => "PRF",
            IdKind::Client => "CLI",
            IdKind::Invoice => "INV",
            IdKind::UsageLog => "ULG",
            IdKind::Analytics => "ANL",
        }
    }
}

/// Issues `<PFX>-YYYYMMDD-HHMMSS-<micros>` ids from the UTC wall clock.
///
/// The generator remembers the last microsecond it handed out. When the clock
/// has not moved past it (two calls inside the same microsecond, or the clock
/// stepping backwards) the timestamp is bumped forward by one microsecond, so
/// ids from one generator are unique and strictly increasing.
pub struct IdGenerator {
    last_micros: Mutex<i64>,
}

impl IdGenerator {
    pub const fn new() -> Self {
        Self {
            last_micros: Mutex::new(i64::MIN),
        }
    }

    pub fn next(&self, kind: IdKind) -> String {
        self.next_at(kind, Utc::now())
    }

    fn next_at(&self, kind: IdKind, now: DateTime<Utc>) -> String {
        let micros = {
            let mut last = self
                .last_micros
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let candidate = now.timestamp_micros();
            let micros = if candidate <= *last { *last + 1 } else { candidate };
            *last = micros;
            micros
        };

        let ts = DateTime::<Utc>::from_timestamp_micros(micros).unwrap_or(now);
        format!(
            "{}-{}-{:06}",
            kind.prefix(),
            ts.format("%Y%m%d-%H%M%S"),
            ts.timestamp_subsec_micros()
        )
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

static GENERATOR: IdGenerator = IdGenerator::new();

/// Next id from the process-wide generator.
pub fn generate(kind: IdKind) -> String {
    GENERATOR.next(kind)
}
