//! Day planner: packs tasks into pomodoro cycles around fixed events.
//!
//! One planning run:
//! - Copies every calendar event into the output verbatim
//! - Blocks each event's raw span plus a buffer on either side
//! - Walks the free intervals of the workday in order, repeatedly choosing the
//!   highest scoring task that fits the rest of the interval
//! - Places the chosen task atomically as work units separated by breaks, with
//!   a long break after every Nth work unit of the day
//!
//! The planner is a pure function of its inputs: identical requests (including
//! task order) produce identical plans.

mod pool;

use chrono::{DateTime, Duration, FixedOffset};
use tracing::{debug, info, warn};

use crate::schedule::{Block, PlanRequest, PlanResponse, Preferences, Task};
use crate::scoring;
use crate::summary::build_summary;
use crate::timeline::{buffered_event_intervals, event_intervals, free_intervals, Interval};

use pool::TaskPool;

/// Default padding around fixed events (minutes).
pub const DEFAULT_EVENT_BUFFER_MIN: u32 = 5;

/// Planner options that are not part of the user's preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerOptions {
    /// Padding kept free before and after every event (minutes). 0 disables it.
    pub event_buffer_min: u32,
    /// Begin packing here instead of at the workday start, if it falls inside
    /// the workday.
    pub start_at: Option<DateTime<FixedOffset>>,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            event_buffer_min: DEFAULT_EVENT_BUFFER_MIN,
            start_at: None,
        }
    }
}

/// Result of the packing pass, before summarising.
#[derive(Debug, Clone)]
pub struct Packing<'a> {
    /// Event and generated blocks, sorted by start.
    pub blocks: Vec<Block>,
    /// Tasks that did not fit anywhere, in pool order.
    pub unscheduled: Vec<&'a Task>,
    /// Whether packing started at [`PlannerOptions::start_at`].
    pub started_from_now: bool,
}

/// Greedy pomodoro packer.
#[derive(Debug, Clone, Default)]
pub struct DayPlanner {
    options: PlannerOptions,
}

impl DayPlanner {
    /// Create a planner with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom options
    pub fn with_options(options: PlannerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PlannerOptions {
        &self.options
    }

    /// Plan the day and summarise the result.
    pub fn plan(&self, request: &PlanRequest) -> PlanResponse {
        let packing = self.pack(request);
        let summary = build_summary(
            &packing.blocks,
            &request.tasks,
            &request.preferences,
            packing.started_from_now,
        );
        info!(
            blocks = packing.blocks.len(),
            work_units = summary.total_pomodoros,
            scheduled = summary.scheduled_tasks,
            unscheduled = packing.unscheduled.len(),
            "day planned"
        );
        PlanResponse {
            blocks: packing.blocks,
            summary,
        }
    }

    /// Place tasks into the free time around `request.events`.
    pub fn pack<'a>(&self, request: &'a PlanRequest) -> Packing<'a> {
        let prefs = &request.preferences;
        let offset = *prefs.workday_start.offset();

        let mut blocks: Vec<Block> = request.events.iter().map(Block::event).collect();

        let mut busy = buffered_event_intervals(&request.events, self.options.event_buffer_min);
        busy.extend(event_intervals(&request.events));
        let busy: Vec<Interval> = busy.into_iter().map(|i| i.in_offset(&offset)).collect();

        let (window, started_from_now) = self.window(prefs);
        let free = free_intervals(window, &busy);
        debug!(free_intervals = free.len(), "computed free time");

        let order = scoring::rank(&request.tasks, &prefs.workday_start);
        let mut pool = TaskPool::new(&request.tasks, &order);
        let mut cadence = CadenceCounter::new(prefs);

        for gap in &free {
            let mut cursor = gap.start;
            while cursor < gap.end && !pool.is_exhausted() {
                let Some(slot) = select(&pool, &cadence, cursor, gap.end) else {
                    break;
                };
                cursor = place(&mut blocks, &pool, slot, &mut cadence, cursor, gap.end);
                pool.assign(slot);
            }
        }

        // Only reordering step. Stable, so equal starts keep construction order.
        blocks.sort_by_key(|b| b.start);

        Packing {
            blocks,
            unscheduled: pool.remaining(),
            started_from_now,
        }
    }

    fn window(&self, prefs: &Preferences) -> (Interval, bool) {
        let offset = *prefs.workday_start.offset();
        let full = Interval::new(prefs.workday_start, prefs.workday_end.with_timezone(&offset));
        match self.options.start_at {
            Some(now) if now > full.start && now < full.end => {
                let start = ceil_to_minute(now.with_timezone(&offset));
                if start < full.end {
                    (Interval::new(start, full.end), true)
                } else {
                    (full, false)
                }
            }
            _ => (full, false),
        }
    }
}

/// Plan with default options.
pub fn plan_day(request: &PlanRequest) -> PlanResponse {
    DayPlanner::new().plan(request)
}

/// Global work unit counter driving the long-break rhythm across the day.
#[derive(Debug)]
struct CadenceCounter {
    completed: u32,
    pomodoro_min: u32,
    work: Duration,
    short_break: Duration,
    long_break: Duration,
    per_long_break: u32,
}

impl CadenceCounter {
    fn new(prefs: &Preferences) -> Self {
        Self {
            completed: 0,
            pomodoro_min: prefs.cadence.pomodoro_min,
            work: prefs.pomodoro(),
            short_break: prefs.short_break(),
            long_break: prefs.long_break(),
            per_long_break: prefs.cadence.cycles_per_long_break.max(1),
        }
    }

    /// Whether the break after work unit number `n` (1-based, day-wide) is long.
    fn is_long_after(&self, n: u32) -> bool {
        n % self.per_long_break == 0
    }

    fn break_after(&self, n: u32) -> Duration {
        if self.is_long_after(n) {
            self.long_break
        } else {
            self.short_break
        }
    }

    /// Minutes reserved for `cycles` work units, each counted with a short
    /// break. `None` on overflow.
    fn reservation_min(&self, cycles: u32) -> Option<i64> {
        (self.work.num_minutes() + self.short_break.num_minutes()).checked_mul(i64::from(cycles))
    }

    /// Exact minutes spanned by `cycles` work units and the breaks between
    /// them, given the day-wide counter. `None` on overflow.
    fn span_min(&self, cycles: u32) -> Option<i64> {
        if cycles == 0 {
            return Some(0);
        }
        let done = u64::from(self.completed);
        let per = u64::from(self.per_long_break);
        let breaks = i64::from(cycles - 1);
        // Multiples of N among units done+1 ..= done+cycles-1
        let long = i64::try_from((done + u64::from(cycles) - 1) / per - done / per).ok()?;
        let short = breaks - long;

        let work = self.work.num_minutes().checked_mul(i64::from(cycles))?;
        let long = self.long_break.num_minutes().checked_mul(long)?;
        let short = self.short_break.num_minutes().checked_mul(short)?;
        work.checked_add(long)?.checked_add(short)
    }

    /// Whether a task of `cycles` units fits in `remaining`, by both the
    /// reservation and the exact span.
    fn fits(&self, cycles: u32, remaining: Duration) -> bool {
        let available = remaining.num_minutes();
        let within = |need: Option<i64>| need.is_some_and(|need| need <= available);
        within(self.reservation_min(cycles)) && within(self.span_min(cycles))
    }
}

/// Pick the unassigned task with the strictly highest score at `cursor`
/// among those that fit before `end`. Ties go to the earlier pool slot.
fn select(
    pool: &TaskPool<'_>,
    cadence: &CadenceCounter,
    cursor: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
) -> Option<usize> {
    let remaining = end - cursor;

    let mut best: Option<(usize, i64)> = None;
    for (slot, task) in pool.unassigned() {
        let cycles = task.cycles_needed(cadence.pomodoro_min);
        if !cadence.fits(cycles, remaining) {
            continue;
        }
        let score = scoring::score(task, &cursor);
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((slot, score));
        }
    }

    if let Some((slot, score)) = best {
        debug!(task = %pool.task(slot).id, score, at = %cursor, "selected task");
    }
    best.map(|(slot, _)| slot)
}

/// Emit the work/break cycles of the task in `slot`; returns the new cursor.
fn place(
    blocks: &mut Vec<Block>,
    pool: &TaskPool<'_>,
    slot: usize,
    cadence: &mut CadenceCounter,
    mut cursor: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
) -> DateTime<FixedOffset> {
    let task = pool.task(slot);
    let cycles = task.cycles_needed(cadence.pomodoro_min);
    let is_last_in_pool = !pool.has_unassigned_after(slot);

    for i in 0..cycles {
        if cursor >= end {
            warn!(task = %task.id, cycle = i, "free interval exhausted mid-placement");
            break;
        }

        blocks.push(Block::work(cursor, cadence.work, task));
        cursor += cadence.work;
        cadence.completed += 1;

        let final_cycle = i + 1 == cycles;
        if final_cycle && is_last_in_pool {
            continue;
        }
        if cursor < end {
            let long = cadence.is_long_after(cadence.completed);
            let break_end = (cursor + cadence.break_after(cadence.completed)).min(end);
            blocks.push(Block::rest(cursor, break_end, long));
            cursor = break_end;
        }
    }

    cursor
}

fn ceil_to_minute(t: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    let secs = t.timestamp().rem_euclid(60);
    let nanos = i64::from(t.timestamp_subsec_nanos());
    if secs == 0 && nanos == 0 {
        t
    } else {
        t - Duration::seconds(secs) - Duration::nanoseconds(nanos) + Duration::minutes(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{BlockKind, CalendarEvent, Cadence};

    fn at(hh_mm: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(&format!("2025-08-25T{hh_mm}:00+00:00")).unwrap()
    }

    fn prefs(start: &str, end: &str) -> Preferences {
        Preferences::new(at(start), at(end), Cadence::default()).unwrap()
    }

    fn task(id: &str, estimate: u32, priority: u8) -> Task {
        Task::new(Some(id.into()), format!("Task {id}"), estimate)
            .unwrap()
            .with_priority(priority)
            .unwrap()
    }

    fn request(prefs: Preferences, tasks: Vec<Task>, events: Vec<CalendarEvent>) -> PlanRequest {
        PlanRequest {
            preferences: prefs,
            tasks,
            events,
        }
    }

    fn spans(blocks: &[Block]) -> Vec<(BlockKind, String, String)> {
        blocks
            .iter()
            .map(|b| {
                (
                    b.kind,
                    b.start.format("%H:%M").to_string(),
                    b.end.format("%H:%M").to_string(),
                )
            })
            .collect()
    }

    #[test]
    fn report_around_team_meeting() {
        let meeting = CalendarEvent::new(at("11:00"), at("12:00"), "Team meeting").unwrap();
        let req = request(
            prefs("09:00", "17:30"),
            vec![task("report", 50, 5)],
            vec![meeting],
        );
        let packing = DayPlanner::new().pack(&req);
        assert_eq!(
            spans(&packing.blocks),
            vec![
                (BlockKind::Work, "09:00".into(), "09:25".into()),
                (BlockKind::Break, "09:25".into(), "09:30".into()),
                (BlockKind::Work, "09:30".into(), "09:55".into()),
                (BlockKind::Event, "11:00".into(), "12:00".into()),
            ]
        );
        assert!(packing.unscheduled.is_empty());
    }

    #[test]
    fn long_break_follows_every_fourth_unit_day_wide() {
        let req = request(
            prefs("09:00", "17:00"),
            vec![task("a", 75, 5), task("b", 50, 4)],
            vec![],
        );
        let blocks = DayPlanner::new().pack(&req).blocks;
        let kinds: Vec<_> = blocks.iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![
                BlockKind::Work,
                BlockKind::Break,
                BlockKind::Work,
                BlockKind::Break,
                BlockKind::Work,
                BlockKind::Break,
                BlockKind::Work,
                BlockKind::LongBreak,
                BlockKind::Work,
            ]
        );
        let long = &blocks[7];
        assert_eq!(long.duration_minutes(), 15);
        assert_eq!(long.task_id, None);
    }

    #[test]
    fn higher_priority_wins_when_only_one_fits() {
        // 60 minutes free: room for exactly one 2-cycle task
        let req = request(
            prefs("09:00", "10:00"),
            vec![task("low", 50, 1), task("high", 50, 5)],
            vec![],
        );
        let packing = DayPlanner::new().pack(&req);
        assert!(packing
            .blocks
            .iter()
            .filter(|b| b.kind == BlockKind::Work)
            .all(|b| b.task_id.as_deref() == Some("high")));
        assert_eq!(packing.unscheduled.len(), 1);
        assert_eq!(packing.unscheduled[0].id, "low");
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let req = request(
            prefs("09:00", "09:30"),
            vec![task("first", 25, 3), task("second", 25, 3)],
            vec![],
        );
        let packing = DayPlanner::new().pack(&req);
        assert_eq!(packing.blocks[0].task_id.as_deref(), Some("first"));
        assert_eq!(packing.unscheduled[0].id, "second");
    }

    #[test]
    fn task_too_big_for_morning_gap_goes_after_event() {
        let standup = CalendarEvent::new(at("10:00"), at("10:15"), "Standup").unwrap();
        let req = request(
            prefs("09:00", "13:00"),
            vec![task("big", 100, 5), task("small", 25, 1)],
            vec![standup],
        );
        let packing = DayPlanner::new().pack(&req);
        let first_big = packing
            .blocks
            .iter()
            .find(|b| b.task_id.as_deref() == Some("big"))
            .unwrap();
        assert_eq!(first_big.start, at("10:20"));
        let small = packing
            .blocks
            .iter()
            .find(|b| b.task_id.as_deref() == Some("small"))
            .unwrap();
        assert_eq!(small.start, at("09:00"));
    }

    #[test]
    fn nothing_fits_leaves_everything_unscheduled() {
        let req = request(prefs("09:00", "09:20"), vec![task("a", 25, 5)], vec![]);
        let packing = DayPlanner::new().pack(&req);
        assert!(packing.blocks.is_empty());
        assert_eq!(packing.unscheduled.len(), 1);
    }

    #[test]
    fn zero_buffer_packs_right_up_to_event() {
        let meeting = CalendarEvent::new(at("09:30"), at("10:00"), "Sync").unwrap();
        let req = request(prefs("09:00", "10:00"), vec![task("a", 25, 3)], vec![meeting]);
        let planner = DayPlanner::with_options(PlannerOptions {
            event_buffer_min: 0,
            start_at: None,
        });
        let packing = planner.pack(&req);
        assert_eq!(packing.blocks[0].kind, BlockKind::Work);
        assert_eq!(packing.blocks[0].end, at("09:25"));

        let packing = DayPlanner::new().pack(&req);
        assert_eq!(packing.unscheduled.len(), 1);
    }

    #[test]
    fn start_at_moves_the_cursor() {
        let req = request(prefs("09:00", "12:00"), vec![task("a", 25, 3)], vec![]);
        let planner = DayPlanner::with_options(PlannerOptions {
            event_buffer_min: 5,
            start_at: Some(at("10:07") + Duration::seconds(30)),
        });
        let packing = planner.pack(&req);
        assert!(packing.started_from_now);
        assert_eq!(packing.blocks[0].start, at("10:08"));

        let planner = DayPlanner::with_options(PlannerOptions {
            event_buffer_min: 5,
            start_at: Some(at("18:00")),
        });
        let packing = planner.pack(&req);
        assert!(!packing.started_from_now);
        assert_eq!(packing.blocks[0].start, at("09:00"));
    }

    #[test]
    fn long_breaks_never_push_work_past_the_gap() {
        // 3 units done before the gap; a 2-unit task would need
        // 25 + 15 + 25 = 65 minutes but only 60 are reserved
        let meeting = CalendarEvent::new(at("10:45"), at("11:00"), "Call").unwrap();
        let mut prefs = prefs("09:00", "12:05");
        prefs.cadence = Cadence {
            cycles_per_long_break: 4,
            ..Cadence::default()
        };
        let req = request(
            prefs,
            vec![task("warmup", 75, 5), task("pair", 50, 1)],
            vec![meeting],
        );
        let packing = DayPlanner::new().pack(&req);
        for block in &packing.blocks {
            if block.kind != BlockKind::Event {
                assert!(block.end <= at("10:40") || block.start >= at("11:05"));
                assert!(block.end <= at("12:05"));
            }
        }
        assert_eq!(packing.unscheduled.len(), 1);
        assert_eq!(packing.unscheduled[0].id, "pair");
    }

    #[test]
    fn clipped_long_break_ends_at_the_gap() {
        // Unit 4 ends at 10:55; its 15-minute long break is cut at the
        // 11:05 buffer before the 11:10 event
        let review = CalendarEvent::new(at("11:10"), at("11:30"), "Review").unwrap();
        let req = request(
            prefs("09:00", "12:30"),
            vec![task("warmup", 75, 5), task("tail", 25, 3), task("later", 25, 1)],
            vec![review],
        );
        let response = DayPlanner::new().plan(&req);

        let long: Vec<_> = response
            .blocks
            .iter()
            .filter(|b| b.kind == BlockKind::LongBreak)
            .collect();
        assert_eq!(long.len(), 1);
        assert_eq!(long[0].start, at("10:55"));
        assert_eq!(long[0].end, at("11:05"));
        assert_eq!(long[0].duration_minutes(), 10);

        // three short breaks plus the clipped long one
        assert_eq!(response.summary.total_break_time, 25);
        assert_eq!(response.summary.total_pomodoros, 5);
        assert!(response.summary.unscheduled_tasks.is_empty());
    }

    #[test]
    fn huge_estimate_never_fits() {
        let mut prefs = prefs("09:00", "10:00");
        prefs.cadence = Cadence {
            pomodoro_min: 1,
            break_min: 1,
            long_break_min: 1,
            cycles_per_long_break: 4,
        };
        let req = request(
            prefs,
            vec![
                task("small", 3, 5),
                task("wraps", 2_147_483_658, 4),
                task("max", u32::MAX, 3),
            ],
            vec![],
        );
        let packing = DayPlanner::new().pack(&req);

        let units = |id: &str| {
            packing
                .blocks
                .iter()
                .filter(|b| b.kind == BlockKind::Work && b.task_id.as_deref() == Some(id))
                .count()
        };
        assert_eq!(units("small"), 3);
        assert_eq!(units("wraps"), 0);
        assert_eq!(units("max"), 0);
        let unscheduled: Vec<_> = packing.unscheduled.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(unscheduled, vec!["wraps", "max"]);
    }

    #[test]
    fn span_counts_long_breaks_from_the_day_counter() {
        let mut counter = CadenceCounter::new(&prefs("09:00", "17:00"));
        // 25/5/15 every 4th unit
        assert_eq!(counter.span_min(0), Some(0));
        assert_eq!(counter.span_min(1), Some(25));
        assert_eq!(counter.span_min(4), Some(100 + 15));
        assert_eq!(counter.span_min(5), Some(125 + 15 + 15));
        counter.completed = 3;
        assert_eq!(counter.span_min(2), Some(50 + 15));
        assert_eq!(counter.reservation_min(u32::MAX), Some(30 * i64::from(u32::MAX)));
        assert!(counter.span_min(u32::MAX).is_some());
        assert!(!counter.fits(u32::MAX, Duration::hours(8)));
        assert!(counter.fits(2, Duration::minutes(65)));
        assert!(!counter.fits(2, Duration::minutes(64)));
    }
}
