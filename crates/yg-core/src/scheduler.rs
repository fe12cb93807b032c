//! Time source and rate-limiting primitives
//!
//! Nothing here sleeps or spawns. The host calls into the engine on its own
//! timers and the engine decides, from an explicit [`Clock`], whether work is
//! due. Tests drive a [`ManualClock`].

use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{SystemTime, UNIX_EPOCH};

// =============================================================================
// Clocks
// =============================================================================

/// Millisecond wall clock.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self { now: Cell::new(start_ms) }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

// =============================================================================
// Throttle
// =============================================================================

/// Leading-edge throttle: the first call in a window runs, the rest of the
/// window is dropped (not queued).
#[derive(Debug, Clone)]
pub struct Throttle {
    window_ms: u64,
    last_fire: Option<u64>,
}

impl Throttle {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            last_fire: None,
        }
    }

    /// Returns true if the caller may run now, and opens a new window.
    pub fn try_acquire(&mut self, now_ms: u64) -> bool {
        match self.last_fire {
            Some(last) if now_ms.saturating_sub(last) < self.window_ms => false,
            _ => {
                self.last_fire = Some(now_ms);
                true
            }
        }
    }
}

// =============================================================================
// Interval Gate
// =============================================================================

/// Time gate for a periodic task: due once per interval, never stacked.
#[derive(Debug, Clone)]
pub struct IntervalGate {
    interval_ms: u64,
    last_run: Option<u64>,
}

impl IntervalGate {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_run: None,
        }
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        self.last_run
            .map_or(true, |last| now_ms.saturating_sub(last) >= self.interval_ms)
    }

    /// Record a run, whether or not it was triggered by the gate.
    pub fn mark(&mut self, now_ms: u64) {
        self.last_run = Some(now_ms);
    }

    /// `is_due` + `mark` in one step.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        if self.is_due(now_ms) {
            self.mark(now_ms);
            true
        } else {
            false
        }
    }
}

// =============================================================================
// Timer Queue
// =============================================================================

struct Entry<T> {
    due_ms: u64,
    seq: u64,
    item: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due_ms == other.due_ms && self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    // Reversed so the max-heap pops the earliest deadline first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due_ms
            .cmp(&self.due_ms)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Delayed work items, released in deadline order (FIFO on ties).
pub struct TimerQueue<T> {
    heap: BinaryHeap<Entry<T>>,
    next_seq: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }
}

impl<T> std::fmt::Debug for TimerQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerQueue")
            .field("pending", &self.heap.len())
            .field("next_due_ms", &self.next_due())
            .finish()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due_ms: u64, item: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry { due_ms, seq, item });
    }

    /// Remove and return every item due at or before `now_ms`.
    pub fn drain_due(&mut self, now_ms: u64) -> Vec<T> {
        let mut due = Vec::new();
        while self.heap.peek().is_some_and(|entry| entry.due_ms <= now_ms) {
            if let Some(entry) = self.heap.pop() {
                due.push(entry.item);
            }
        }
        due
    }

    pub fn next_due(&self) -> Option<u64> {
        self.heap.peek().map(|entry| entry.due_ms)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

// =============================================================================
// Formatting
// =============================================================================

/// `m:ss`, or `h:mm:ss` from one hour up.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}
