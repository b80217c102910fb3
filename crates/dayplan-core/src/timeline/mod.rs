//! Timeline arithmetic: busy/free interval computation for one workday.

mod interval;

pub(crate) use interval::{buffered_event_intervals, event_intervals, free_intervals, Interval};
