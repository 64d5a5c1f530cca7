use std::sync::Arc;

use uuid::Uuid;

use crate::invoke::ReceiverId;
use crate::scheduler::job::Job;

/// Ordered, growable, lazily-compacting FIFO of pending jobs.
///
/// Live jobs occupy indices `[head, tail)` of the backing array; slots
/// outside that range are empty. Cancellation leaves a hole (`None`) inside
/// the live range, skipped over on later dequeues rather than compacted
/// immediately. When `tail` hits capacity the array either grows by a fixed
/// step (when `head == 0`) or the live range is shifted to the front,
/// reclaiming the consumed prefix without reallocating.
#[derive(Debug)]
pub struct JobQueue {
    slots: Vec<Option<Arc<Job>>>,
    head: usize,
    tail: usize,
    growth_step: usize,
}

impl JobQueue {
    pub fn with_capacity(initial: usize, growth_step: usize) -> Self {
        Self {
            slots: vec![None; initial.max(1)],
            head: 0,
            tail: 0,
            growth_step: growth_step.max(1),
        }
    }

    /// Append at `tail`, making room first if the backing array is full.
    /// Amortized O(1).
    pub fn enqueue(&mut self, job: Arc<Job>) {
        if self.tail == self.slots.len() {
            if self.head == 0 {
                let new_len = self.slots.len() + self.growth_step;
                self.slots.resize(new_len, None);
            } else {
                self.compact();
            }
        }
        self.slots[self.tail] = Some(job);
        self.tail += 1;
    }

    /// Shift the live range to the front, freeing trailing capacity.
    /// Preserves FIFO order of still-live entries.
    fn compact(&mut self) {
        for i in self.head..self.tail {
            self.slots[i - self.head] = self.slots[i].take();
        }
        self.tail -= self.head;
        self.head = 0;
    }

    /// Take the job at `head`, advancing past any holes left by
    /// cancellation. Returns `None` when the live range is empty.
    pub fn dequeue_next(&mut self) -> Option<Arc<Job>> {
        while self.head < self.tail {
            let slot = self.slots[self.head].take();
            self.head += 1;
            if slot.is_some() {
                return slot;
            }
        }
        None
    }

    /// Read the head job without removing it, advancing past holes. Used by
    /// the cooperative executor to resume a job still mid-flight.
    pub fn peek_head(&mut self) -> Option<Arc<Job>> {
        while self.head < self.tail {
            if let Some(job) = &self.slots[self.head] {
                return Some(Arc::clone(job));
            }
            self.head += 1;
        }
        None
    }

    /// Clear the slot holding `id`, leaving a hole. Linear scan of the live
    /// range; reports whether the job was found.
    pub fn remove(&mut self, id: Uuid) -> bool {
        for i in self.head..self.tail {
            if self.slots[i].as_ref().is_some_and(|j| j.id() == id) {
                self.slots[i] = None;
                return true;
            }
        }
        false
    }

    /// First live job matching the (receiver, method) pair, in queue order.
    pub fn find(&self, receiver: ReceiverId, method: &str) -> Option<Arc<Job>> {
        self.slots[self.head..self.tail]
            .iter()
            .flatten()
            .find(|j| j.targets(receiver, method))
            .map(Arc::clone)
    }

    /// Number of live (non-hole) entries.
    pub fn len(&self) -> usize {
        self.slots[self.head..self.tail]
            .iter()
            .filter(|s| s.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::job::JobKind;

    fn job(method: &str) -> Arc<Job> {
        Arc::new(Job::new(
            JobKind::OneShot,
            ReceiverId(1),
            method.to_string(),
            Vec::new(),
        ))
    }

    #[test]
    fn fifo_order_preserved() {
        let mut q = JobQueue::with_capacity(4, 4);
        for name in ["a", "b", "c"] {
            q.enqueue(job(name));
        }
        assert_eq!(q.dequeue_next().unwrap().method(), "a");
        assert_eq!(q.dequeue_next().unwrap().method(), "b");
        assert_eq!(q.dequeue_next().unwrap().method(), "c");
        assert!(q.dequeue_next().is_none());
    }

    #[test]
    fn grows_by_step_when_full_at_front() {
        let mut q = JobQueue::with_capacity(2, 3);
        for i in 0..5 {
            q.enqueue(job(&format!("j{i}")));
        }
        // 2 -> 5 after one growth step of 3.
        assert_eq!(q.capacity(), 5);
        assert_eq!(q.len(), 5);
    }

    #[test]
    fn compacts_instead_of_growing_after_dequeues() {
        let mut q = JobQueue::with_capacity(3, 8);
        for i in 0..3 {
            q.enqueue(job(&format!("j{i}")));
        }
        q.dequeue_next();
        q.dequeue_next();

        // Tail is at capacity but the consumed prefix can be reclaimed.
        q.enqueue(job("j3"));
        assert_eq!(q.capacity(), 3);

        assert_eq!(q.dequeue_next().unwrap().method(), "j2");
        assert_eq!(q.dequeue_next().unwrap().method(), "j3");
    }

    #[test]
    fn compaction_preserves_order_across_many_cycles() {
        let mut q = JobQueue::with_capacity(4, 4);
        let mut next = 0;
        let mut expect = 0;
        for _ in 0..10 {
            for _ in 0..3 {
                q.enqueue(job(&format!("j{next}")));
                next += 1;
            }
            for _ in 0..3 {
                assert_eq!(q.dequeue_next().unwrap().method(), format!("j{expect}"));
                expect += 1;
            }
        }
        assert!(q.is_empty());
        // Live entries never exceeded capacity, so the array never grew.
        assert_eq!(q.capacity(), 4);
    }

    #[test]
    fn remove_leaves_hole_skipped_on_dequeue() {
        let mut q = JobQueue::with_capacity(4, 4);
        let a = job("a");
        let b = job("b");
        let c = job("c");
        let b_id = b.id();
        q.enqueue(a);
        q.enqueue(b);
        q.enqueue(c);

        assert!(q.remove(b_id));
        assert_eq!(q.len(), 2);

        assert_eq!(q.dequeue_next().unwrap().method(), "a");
        assert_eq!(q.dequeue_next().unwrap().method(), "c");
        assert!(q.dequeue_next().is_none());
    }

    #[test]
    fn remove_missing_job_reports_false() {
        let mut q = JobQueue::with_capacity(2, 2);
        q.enqueue(job("a"));
        assert!(!q.remove(Uuid::new_v4()));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn peek_head_skips_holes_and_keeps_job() {
        let mut q = JobQueue::with_capacity(4, 4);
        let a = job("a");
        let a_id = a.id();
        q.enqueue(a);
        q.enqueue(job("b"));
        assert!(q.remove(a_id));

        let head = q.peek_head().unwrap();
        assert_eq!(head.method(), "b");
        // Still there: peek does not consume.
        assert_eq!(q.dequeue_next().unwrap().method(), "b");
    }

    #[test]
    fn find_matches_receiver_and_method() {
        let mut q = JobQueue::with_capacity(4, 4);
        q.enqueue(Arc::new(Job::new(
            JobKind::OneShot,
            ReceiverId(1),
            "m".to_string(),
            Vec::new(),
        )));
        q.enqueue(Arc::new(Job::new(
            JobKind::OneShot,
            ReceiverId(2),
            "m".to_string(),
            Vec::new(),
        )));

        let found = q.find(ReceiverId(2), "m").unwrap();
        assert_eq!(found.receiver(), ReceiverId(2));
        assert!(q.find(ReceiverId(3), "m").is_none());
        assert!(q.find(ReceiverId(1), "other").is_none());
    }
}
