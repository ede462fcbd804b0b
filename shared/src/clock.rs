use chrono::Local;

/// Source of the human-readable timestamps stamped on every task write.
pub trait Clock: Send + Sync {
    fn stamp(&self) -> String;
}

/// Local wall-clock time, e.g. `5/1/2024, 9:03:12 AM`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub const FORMAT: &'static str = "%-m/%-d/%Y, %-I:%M:%S %p";
}

impl Clock for SystemClock {
    fn stamp(&self) -> String {
        Local::now().format(Self::FORMAT).to_string()
    }
}
