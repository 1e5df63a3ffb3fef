/// Monotonic loop time in milliseconds.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoopClock {
    pub now_ms: u64,
}

impl LoopClock {
    pub fn reset(&mut self) {
        self.now_ms = 0;
    }

    /// Moves the clock forward to `ms`. The clock never runs backwards.
    pub fn advance_to(&mut self, ms: u64) {
        self.now_ms = self.now_ms.max(ms);
    }
}

/// The two persistent timers the host runs for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Update,
    Render,
}

#[derive(Debug, Clone, Copy)]
struct ScheduledTimer {
    kind: TimerKind,
    due_ms: u64,
}

/// Fires each registered timer in due order. Timers are never cancelled;
/// after a firing the caller reschedules with whatever delay the current
/// state asks for.
#[derive(Debug, Default)]
pub struct Scheduler {
    clock: LoopClock,
    timers: Vec<ScheduledTimer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms
    }

    /// Registers `kind` to fire `delay_ms` from now. Timers registered first
    /// win ties. Due times saturate at `u64::MAX`, which never fires.
    pub fn schedule(&mut self, kind: TimerKind, delay_ms: u64) {
        let due_ms = self.clock.now_ms.saturating_add(delay_ms);
        match self.timers.iter_mut().find(|timer| timer.kind == kind) {
            Some(timer) => timer.due_ms = due_ms,
            None => self.timers.push(ScheduledTimer { kind, due_ms }),
        }
    }

    /// Returns the earliest timer due at or before `until_ms`, moving the
    /// clock to its due time. It stays due until rescheduled.
    pub fn next_due(&mut self, until_ms: u64) -> Option<TimerKind> {
        let timer = self
            .timers
            .iter()
            .filter(|timer| timer.due_ms <= until_ms)
            .min_by_key(|timer| timer.due_ms)
            .copied()?;
        self.clock.advance_to(timer.due_ms);
        Some(timer.kind)
    }

    /// Moves the clock to `until_ms` once every due timer has fired.
    pub fn settle(&mut self, until_ms: u64) {
        self.clock.advance_to(until_ms);
    }

    /// Earliest due time of any timer.
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.iter().map(|timer| timer.due_ms).min()
    }
}
