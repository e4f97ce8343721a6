use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle(u64);

impl TickHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Frame-synchronised callback source: callers request a tick, get a handle
/// back, and may cancel it before it fires.
pub trait FrameScheduler {
    fn request_tick(&mut self) -> TickHandle;
    fn cancel(&mut self, handle: TickHandle);
    fn is_pending(&self, handle: TickHandle) -> bool;
    fn pending_count(&self) -> usize;

    /// Waits until the oldest pending tick is due and hands it out.
    /// `None` when nothing is pending.
    fn next_due(&mut self) -> Option<TickHandle>;
}

#[derive(Debug, Default)]
struct PendingTicks {
    next_id: u64,
    queue: VecDeque<TickHandle>,
}

impl PendingTicks {
    fn request(&mut self) -> TickHandle {
        self.next_id += 1;
        let h = TickHandle(self.next_id);
        self.queue.push_back(h);
        h
    }

    fn cancel(&mut self, handle: TickHandle) {
        self.queue.retain(|h| *h != handle);
    }

    fn contains(&self, handle: TickHandle) -> bool {
        self.queue.contains(&handle)
    }
}

/// Real-time pacing: at most one tick per `1 / fps` seconds.
pub struct PacedScheduler {
    frame: Duration,
    last_fire: Option<Instant>,
    pending: PendingTicks,
}

impl PacedScheduler {
    pub fn new(fps: u32) -> Self {
        Self {
            frame: Duration::from_secs_f32(1.0 / fps.max(1) as f32),
            last_fire: None,
            pending: PendingTicks::default(),
        }
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame
    }

    /// Time left before the next tick may fire.
    pub fn time_until_due(&self) -> Duration {
        match self.last_fire {
            Some(t) => self.frame.saturating_sub(t.elapsed()),
            None => Duration::ZERO,
        }
    }
}

impl FrameScheduler for PacedScheduler {
    fn request_tick(&mut self) -> TickHandle {
        self.pending.request()
    }

    fn cancel(&mut self, handle: TickHandle) {
        self.pending.cancel(handle);
    }

    fn is_pending(&self, handle: TickHandle) -> bool {
        self.pending.contains(handle)
    }

    fn pending_count(&self) -> usize {
        self.pending.queue.len()
    }

    fn next_due(&mut self) -> Option<TickHandle> {
        if self.pending.queue.is_empty() {
            return None;
        }
        let wait = self.time_until_due();
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
        self.last_fire = Some(Instant::now());
        self.pending.queue.pop_front()
    }
}

/// Fires immediately with no pacing; tests drive it tick by tick.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    pending: PendingTicks,
    fired: u64,
    cancelled: u64,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fired(&self) -> u64 {
        self.fired
    }

    pub fn cancelled(&self) -> u64 {
        self.cancelled
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_tick(&mut self) -> TickHandle {
        self.pending.request()
    }

    fn cancel(&mut self, handle: TickHandle) {
        if self.pending.contains(handle) {
            self.cancelled += 1;
        }
        self.pending.cancel(handle);
    }

    fn is_pending(&self, handle: TickHandle) -> bool {
        self.pending.contains(handle)
    }

    fn pending_count(&self) -> usize {
        self.pending.queue.len()
    }

    fn next_due(&mut self) -> Option<TickHandle> {
        let h = self.pending.queue.pop_front()?;
        self.fired += 1;
        Some(h)
    }
}
