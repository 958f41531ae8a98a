//! Cancellable deferred tasks, run from the frame loop.
//!
//! Used for pulse intents: a press schedules its own clear. Everything runs on
//! the loop's thread, so a task can only fire between frames.

use std::time::Duration;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TaskId(u64);

struct Pending<T> {
    id: TaskId,
    due: Duration,
    task: T,
}

pub struct DeferredQueue<T> {
    next_id: u64,
    pending: Vec<Pending<T>>,
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        DeferredQueue { next_id: 0, pending: vec![] }
    }
}

impl<T> DeferredQueue<T> {
    pub fn new() -> Self {
        DeferredQueue::default()
    }

    pub fn schedule(&mut self, now: Duration, delay: Duration, task: T) -> TaskId {
        self.next_id += 1;
        let id = TaskId(self.next_id);
        self.pending.push(Pending { id, due: now + delay, task });
        id
    }

    #[cfg(test)]
    pub fn cancel(&mut self, id: TaskId) -> Option<T> {
        let idx = self.pending.iter().position(|p| p.id == id)?;
        Some(self.pending.remove(idx).task)
    }

    /// Cancel every pending task matching `pred`, returning them.
    pub fn cancel_where<F: FnMut(&T) -> bool>(&mut self, mut pred: F) -> Vec<T> {
        let mut cancelled = vec![];
        let mut kept = Vec::with_capacity(self.pending.len());
        for p in self.pending.drain(..) {
            if pred(&p.task) {
                cancelled.push(p.task);
            } else {
                kept.push(p);
            }
        }
        self.pending = kept;
        cancelled
    }

    pub fn cancel_all(&mut self) -> Vec<T> {
        self.pending.drain(..).map(|p| p.task).collect()
    }

    /// Remove and return every task due at or before `now`, earliest first.
    pub fn drain_due(&mut self, now: Duration) -> Vec<T> {
        self.pending.sort_by_key(|p| p.due);
        let split = self.pending.partition_point(|p| p.due <= now);
        self.pending.drain(..split).map(|p| p.task).collect()
    }

    #[cfg(test)]
    pub fn next_due(&self) -> Option<Duration> {
        self.pending.iter().map(|p| p.due).min()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn tasks_fire_when_due_in_order() {
        let mut q = DeferredQueue::new();
        q.schedule(ms(0), ms(30), "b");
        q.schedule(ms(0), ms(10), "a");
        assert!(q.drain_due(ms(5)).is_empty());
        assert_eq!(q.drain_due(ms(10)), vec!["a"]);
        assert_eq!(q.next_due(), Some(ms(30)));
        assert_eq!(q.drain_due(ms(100)), vec!["b"]);
        assert!(q.is_empty());
    }

    #[test]
    fn cancelled_task_never_fires() {
        let mut q = DeferredQueue::new();
        let id = q.schedule(ms(0), ms(10), 1);
        q.schedule(ms(0), ms(10), 2);
        assert_eq!(q.cancel(id), Some(1));
        assert_eq!(q.cancel(id), None);
        assert_eq!(q.drain_due(ms(10)), vec![2]);
    }

    #[test]
    fn cancel_where_filters() {
        let mut q = DeferredQueue::new();
        q.schedule(ms(0), ms(10), 1);
        q.schedule(ms(0), ms(10), 2);
        q.schedule(ms(0), ms(10), 3);
        assert_eq!(q.cancel_where(|&t| t % 2 == 1), vec![1, 3]);
        assert_eq!(q.len(), 1);
        assert_eq!(q.cancel_all(), vec![2]);
    }
}
