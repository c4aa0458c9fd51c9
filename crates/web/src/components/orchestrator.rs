//! Background task execution consumed by handlers.
//!
//! The server only starts and stops the orchestrator; handlers submit work
//! through [`RequestExt::submit_task`](super::RequestExt::submit_task).

use std::ops::RangeInclusive;

use thiserror::Error;

/// A unit of background work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Identifies a submitted or scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(pub u64);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("no orchestrator configured")]
    Unavailable,

    #[error("orchestrator rejected the task: {reason}")]
    Rejected { reason: String },

    #[error("unknown cron field '{field}'")]
    InvalidCronField { field: String },

    #[error("cron field '{field}' out of range: {value}")]
    InvalidCronValue { field: &'static str, value: u32 },
}

impl OrchestratorError {
    pub fn rejected<S: ToString>(reason: S) -> Self {
        Self::Rejected { reason: reason.to_string() }
    }
}

/// Runs tasks off the request path.
///
/// `start` is called once before the server accepts connections and
/// `shutdown` once after the accept loop has ended, both from a blocking thread.
#[cfg_attr(test, mockall::automock)]
pub trait Orchestrator: Send + Sync {
    fn start(&self) {}

    /// Queues `task` for immediate execution.
    ///
    /// # Errors
    ///
    /// Implementations may reject tasks, typically after `shutdown`.
    fn submit(&self, task: Task) -> Result<TaskHandle, OrchestratorError>;

    /// Runs `task` on every instant matching `spec`.
    ///
    /// # Errors
    ///
    /// Implementations may reject tasks, typically after `shutdown`.
    fn schedule_cron(&self, task: Task, spec: CronSpec) -> Result<TaskHandle, OrchestratorError>;

    fn shutdown(&self);
}

/// One field of a [`CronSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CronField {
    /// Matches every value
    #[default]
    Any,
    At(u32),
}

impl CronField {
    pub fn matches(self, value: u32) -> bool {
        match self {
            CronField::Any => true,
            CronField::At(expected) => expected == value,
        }
    }
}

/// A calendar schedule, every field unset matches every second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CronSpec {
    pub second: CronField,
    pub minute: CronField,
    pub hour: CronField,
    pub day: CronField,
    pub month: CronField,
    pub year: CronField,
}

static FIELDS: [(&str, RangeInclusive<u32>); 6] = [
    ("second", 0..=59),
    ("minute", 0..=59),
    ("hour", 0..=23),
    ("day", 1..=31),
    ("month", 1..=12),
    ("year", 1970..=9999),
];

impl CronSpec {
    /// Builds a schedule from `(field, value)` pairs, as in `[("minute", 0), ("hour", 3)]`.
    ///
    /// # Errors
    ///
    /// Fails on a field name other than second, minute, hour, day, month and
    /// year, or on a value outside the field's range.
    pub fn from_fields<I, K>(fields: I) -> Result<Self, OrchestratorError>
    where
        I: IntoIterator<Item = (K, u32)>,
        K: AsRef<str>,
    {
        let mut spec = Self::default();
        for (key, value) in fields {
            let key = key.as_ref();
            let (name, range) = FIELDS
                .iter()
                .find(|(name, _)| *name == key)
                .ok_or_else(|| OrchestratorError::InvalidCronField { field: key.to_owned() })?;

            if !range.contains(&value) {
                return Err(OrchestratorError::InvalidCronValue { field: *name, value });
            }
            *spec.field_mut(name) = CronField::At(value);
        }
        Ok(spec)
    }

    fn field_mut(&mut self, name: &str) -> &mut CronField {
        match name {
            "second" => &mut self.second,
            "minute" => &mut self.minute,
            "hour" => &mut self.hour,
            "day" => &mut self.day,
            "month" => &mut self.month,
            _ => &mut self.year,
        }
    }

    /// Whether the calendar instant given as `[second, minute, hour, day, month, year]` is due.
    pub fn matches(&self, instant: [u32; 6]) -> bool {
        let fields = [self.second, self.minute, self.hour, self.day, self.month, self.year];
        fields.iter().zip(instant).all(|(field, value)| field.matches(value))
    }
}
