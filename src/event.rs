//! Typed timing events
//!
//! Replaces per-frame flag bits with values that carry their own timestamps.
//! Lap events carry the corrected crossing time, which can be one sample
//! older than the update that produced them.

/// How a standing start was detected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LaunchTrigger {
    /// Longitudinal acceleration spike
    GForce,
    /// Speed fallback when acceleration is noisy or missing
    Speed,
}

/// Events emitted by the timers
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Event {
    /// First start-point crossing of a session
    RaceStart { timestamp_ms: u32 },
    /// A lap (or stage run) began
    LapStart { lap: u32, timestamp_ms: u32 },
    /// A lap completed
    LapFinish {
        lap: u32,
        lap_time_ms: u32,
        is_best: bool,
        timestamp_ms: u32,
    },
    /// Point-to-point stage completed
    RaceFinish { timestamp_ms: u32 },
    /// Vehicle held still long enough to launch
    SprintReady { timestamp_ms: u32 },
    SprintLaunch { trigger: LaunchTrigger, timestamp_ms: u32 },
    SprintFinish { result_ms: u32, timestamp_ms: u32 },
    /// Run abandoned after a stall or false start
    SprintAbort { timestamp_ms: u32 },
}

/// Event discriminant, used to subscribe to one kind only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    RaceStart,
    LapStart,
    LapFinish,
    RaceFinish,
    SprintReady,
    SprintLaunch,
    SprintFinish,
    SprintAbort,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::RaceStart { .. } => EventKind::RaceStart,
            Event::LapStart { .. } => EventKind::LapStart,
            Event::LapFinish { .. } => EventKind::LapFinish,
            Event::RaceFinish { .. } => EventKind::RaceFinish,
            Event::SprintReady { .. } => EventKind::SprintReady,
            Event::SprintLaunch { .. } => EventKind::SprintLaunch,
            Event::SprintFinish { .. } => EventKind::SprintFinish,
            Event::SprintAbort { .. } => EventKind::SprintAbort,
        }
    }

    /// Trigger time (ms), corrected where the timer applies a correction
    pub fn timestamp_ms(&self) -> u32 {
        match *self {
            Event::RaceStart { timestamp_ms }
            | Event::LapStart { timestamp_ms, .. }
            | Event::LapFinish { timestamp_ms, .. }
            | Event::RaceFinish { timestamp_ms }
            | Event::SprintReady { timestamp_ms }
            | Event::SprintLaunch { timestamp_ms, .. }
            | Event::SprintFinish { timestamp_ms, .. }
            | Event::SprintAbort { timestamp_ms } => timestamp_ms,
        }
    }
}

/// Maximum events a single lap timer update can produce
pub const MAX_EVENTS_PER_UPDATE: usize = 2;

/// Fixed-capacity event list returned by one update (no allocation)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EventBuf {
    events: [Option<Event>; MAX_EVENTS_PER_UPDATE],
    len: usize,
}

impl EventBuf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event. The timers never produce more than capacity.
    pub(crate) fn push(&mut self, event: Event) {
        debug_assert!(self.len < MAX_EVENTS_PER_UPDATE, "EventBuf overflow");
        if let Some(slot) = self.events.get_mut(self.len) {
            *slot = Some(event);
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().flatten()
    }

    pub fn contains(&self, kind: EventKind) -> bool {
        self.iter().any(|e| e.kind() == kind)
    }
}

impl<'a> IntoIterator for &'a EventBuf {
    type Item = &'a Event;
    type IntoIter = core::iter::Flatten<core::slice::Iter<'a, Option<Event>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_buf_preserves_order() {
        let mut buf = EventBuf::new();
        assert!(buf.is_empty());

        buf.push(Event::RaceStart { timestamp_ms: 10 });
        buf.push(Event::LapStart { lap: 1, timestamp_ms: 10 });

        let kinds: Vec<EventKind> = buf.iter().map(Event::kind).collect();
        assert_eq!(kinds, vec![EventKind::RaceStart, EventKind::LapStart]);
        assert_eq!(buf.len(), 2);
        assert!(buf.contains(EventKind::LapStart));
        assert!(!buf.contains(EventKind::LapFinish));
    }

    #[test]
    fn test_event_timestamp() {
        let e = Event::LapFinish {
            lap: 3,
            lap_time_ms: 60_000,
            is_best: true,
            timestamp_ms: 61_000,
        };
        assert_eq!(e.timestamp_ms(), 61_000);
        assert_eq!(e.kind(), EventKind::LapFinish);
    }
}
