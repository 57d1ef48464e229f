//! The narrow producer/consumer queue at the adapter boundary.
//!
//! Platform adapters (window procedures, background pollers) push raw samples
//! from any thread. The owning device swaps the whole batch out once per tick,
//! so the lock is never held across dispatch.

use ::parking_lot::Mutex;
use ::std::{collections::VecDeque, fmt::Debug, sync::Arc};
use ::tracing::{trace, warn};

/// Consumer side of a bounded raw sample queue.
///
/// When full, the oldest unpinned samples are dropped (FIFO). Pinned samples,
/// such as key releases, are only dropped once nothing else is left to drop.
pub struct AdapterQueue<T> {
    shared: Arc<Mutex<VecDeque<T>>>,
    capacity: usize,
    pinned: fn(&T) -> bool,
}

/// Producer side of an [`AdapterQueue`]. Cheap to clone and [`Send`] whenever
/// the sample type is.
pub struct QueueProducer<T> {
    shared: Arc<Mutex<VecDeque<T>>>,
    capacity: usize,
    pinned: fn(&T) -> bool,
}

impl<T> Clone for QueueProducer<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            capacity: self.capacity,
            pinned: self.pinned,
        }
    }
}

impl<T: Debug> Debug for AdapterQueue<T> {
    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        f.debug_struct("AdapterQueue")
            .field("shared", &self.shared)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<T: Debug> Debug for QueueProducer<T> {
    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        f.debug_struct("QueueProducer")
            .field("capacity", &self.capacity)
            .finish()
    }
}

fn never_pinned<T>(_: &T) -> bool {
    false
}

impl<T: Debug> AdapterQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
            pinned: never_pinned::<T>,
        }
    }

    /// Mark the samples for which `pinned` holds as the last to be dropped
    /// when the queue overflows.
    pub fn with_pinned(self, pinned: fn(&T) -> bool) -> Self {
        Self { pinned, ..self }
    }

    pub fn producer(&self) -> QueueProducer<T> {
        QueueProducer {
            shared: Arc::clone(&self.shared),
            capacity: self.capacity,
            pinned: self.pinned,
        }
    }

    /// Take every pending sample, oldest first.
    pub fn drain(&self) -> VecDeque<T> {
        let mut batch = VecDeque::new();
        ::std::mem::swap(&mut *self.shared.lock(), &mut batch);
        batch
    }

    /// Discard every pending sample.
    pub fn clear(&self) {
        self.shared.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.shared.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Debug> QueueProducer<T> {
    /// Append a sample, dropping the oldest unpinned one if the queue is full.
    pub fn push(&self, sample: T) {
        let mut queue = self.shared.lock();
        queue.push_back(sample);

        // Trim queue to avoid growing continuously
        while queue.len() > self.capacity {
            let oldest = queue
                .iter()
                .position(|sample| !(self.pinned)(sample))
                .unwrap_or(0);
            match queue.remove(oldest) {
                Some(dropped) if (self.pinned)(&dropped) => {
                    warn!("Adapter queue full of pinned samples, dropped {dropped:?}.");
                }
                Some(dropped) => trace!("Trimming adapter queue, dropped {dropped:?}."),
                None => break,
            }
        }
    }

    pub fn extend(&self, samples: impl IntoIterator<Item = T>) {
        for sample in samples {
            self.push(sample);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ::pretty_assertions::assert_eq;

    #[test]
    fn test_drain_swaps_out_batch() {
        let queue = AdapterQueue::new(8);
        let producer = queue.producer();
        producer.extend([1, 2, 3]);

        assert_eq!(queue.drain().into_iter().collect::<Vec<_>>(), [1, 2, 3]);
        assert!(queue.is_empty());

        producer.push(4);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_trims_oldest_when_full() {
        let queue = AdapterQueue::new(3);
        queue.producer().extend(0..5);
        assert_eq!(queue.drain().into_iter().collect::<Vec<_>>(), [2, 3, 4]);
    }

    #[test]
    fn test_trim_skips_pinned_samples() {
        let queue = AdapterQueue::new(3).with_pinned(|sample: &i32| *sample < 0);
        queue.producer().extend([1, -1, 2, 3, 4]);
        assert_eq!(queue.drain().into_iter().collect::<Vec<_>>(), [-1, 3, 4]);
    }

    #[test]
    fn test_trim_drops_pinned_as_a_last_resort() {
        let queue = AdapterQueue::new(2).with_pinned(|sample: &i32| *sample < 0);
        queue.producer().extend([-1, -2, -3]);
        assert_eq!(queue.drain().into_iter().collect::<Vec<_>>(), [-2, -3]);
    }

    #[test]
    fn test_producer_from_other_thread() {
        let queue = AdapterQueue::new(16);
        let producer = queue.producer();
        ::std::thread::spawn(move || producer.extend(['a', 'b']))
            .join()
            .unwrap();
        assert_eq!(queue.drain().into_iter().collect::<String>(), "ab");
    }
}
