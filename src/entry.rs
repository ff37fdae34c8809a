//! Timer entry model.

use chrono::{DateTime, SubsecRound, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The category of a timed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Task,
    Break,
    Recreation,
    Hobby,
}

impl TimerKind {
    /// Lowercase tag stored in `habit_tracking.task_type`.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Break => "break",
            Self::Recreation => "recreation",
            Self::Hobby => "hobby",
        }
    }

    /// Inverse of [`TimerKind::tag`].
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "task" => Some(Self::Task),
            "break" => Some(Self::Break),
            "recreation" => Some(Self::Recreation),
            "hobby" => Some(Self::Hobby),
            _ => None,
        }
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for TimerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(&s.to_ascii_lowercase()).ok_or_else(|| format!("unknown timer kind: {s}"))
    }
}

/// One timed session.
///
/// `duration` is whole minutes between `start_time` and `end_time`, and
/// `end_time` never precedes `start_time`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerEntry {
    id: Uuid,
    kind: TimerKind,
    name: String,
    description: String,
    duration: i64,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

impl TimerEntry {
    /// Start a new entry at `now`.
    pub fn begin(
        kind: TimerKind,
        name: impl Into<String>,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        // Postgres TIMESTAMP keeps microseconds; trimming here keeps the
        // primary key identical after a round trip.
        let start_time = now.trunc_subsecs(6);
        Self {
            id: Uuid::new_v4(),
            kind,
            name: name.into(),
            description: description.into(),
            duration: 0,
            start_time,
            end_time: start_time,
        }
    }

    /// Rebuild an entry from persisted fields.
    pub(crate) fn restore(
        id: Uuid,
        kind: TimerKind,
        name: String,
        description: String,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        let mut entry = Self {
            id,
            kind,
            name,
            description,
            duration: 0,
            start_time,
            end_time: start_time,
        };
        entry.advance_to(end_time);
        entry
    }

    /// Refresh `end_time` and `duration` to `now`.
    pub fn advance_to(&mut self, now: DateTime<Utc>) {
        let now = now.trunc_subsecs(6);
        self.end_time = now.max(self.start_time);
        let elapsed = (self.end_time - self.start_time).num_seconds();
        self.duration = elapsed / 60;
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> TimerKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Elapsed whole minutes.
    pub fn duration(&self) -> i64 {
        self.duration
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }
}
