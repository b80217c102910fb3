//! Interval algebra over busy time.
//!
//! Busy ranges come from fixed calendar events (raw and buffered); free
//! intervals are the complement of the merged busy set within the workday.

use chrono::{DateTime, Duration, FixedOffset};

use crate::schedule::CalendarEvent;

/// Half-open `[start, end)` time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Interval {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl Interval {
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Self {
        Self { start, end }
    }

    /// Re-express both ends in `offset`; the instants are unchanged.
    pub fn in_offset(self, offset: &FixedOffset) -> Self {
        Self {
            start: self.start.with_timezone(offset),
            end: self.end.with_timezone(offset),
        }
    }
}

/// Merge overlapping intervals.
///
/// Touching intervals (`next.start == last.end`) are merged too. The result is
/// sorted by start and mutually disjoint.
pub(crate) fn merge_intervals(intervals: &[Interval]) -> Vec<Interval> {
    let mut sorted = intervals.to_vec();
    sorted.sort_by_key(|i| i.start);

    let mut merged: Vec<Interval> = Vec::with_capacity(sorted.len());
    for current in sorted {
        match merged.last_mut() {
            Some(last) if current.start <= last.end => {
                last.end = last.end.max(current.end);
            }
            _ => merged.push(current),
        }
    }
    merged
}

/// Free sub-ranges of `window` not covered by any busy interval.
///
/// Busy intervals are merged first; the cursor only ever moves forward, so
/// busy time outside the window is harmless.
pub(crate) fn free_intervals(window: Interval, busy: &[Interval]) -> Vec<Interval> {
    if busy.is_empty() {
        return vec![window];
    }

    let mut free = Vec::new();
    let mut cursor = window.start;

    for interval in merge_intervals(busy) {
        if interval.start >= window.end {
            break;
        }
        if cursor < interval.start {
            free.push(Interval::new(cursor, interval.start));
        }
        cursor = cursor.max(interval.end);
    }

    if cursor < window.end {
        free.push(Interval::new(cursor, window.end));
    }

    free
}

/// Event spans padded by `buffer_minutes` on each side.
///
/// Callers add the raw event spans to the busy set as well, so an event is
/// always blocked whatever the buffer is.
pub(crate) fn buffered_event_intervals(events: &[CalendarEvent], buffer_minutes: u32) -> Vec<Interval> {
    let buffer = Duration::minutes(i64::from(buffer_minutes));
    events
        .iter()
        .map(|event| Interval::new(event.start - buffer, event.end + buffer))
        .collect()
}

/// Raw, unpadded event spans.
pub(crate) fn event_intervals(events: &[CalendarEvent]) -> Vec<Interval> {
    events
        .iter()
        .map(|event| Interval::new(event.start, event.end))
        .collect()
}
