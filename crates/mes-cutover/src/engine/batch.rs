//! Fixed-size batch accumulation for upsert writes.

/// Accumulates mapped entities and hands back full chunks for the
/// caller to flush. Batching bounds memory and write-call overhead;
/// it carries no concurrency.
#[derive(Debug)]
pub struct Batcher<E> {
    buf: Vec<E>,
    capacity: usize,
}

impl<E> Batcher<E> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity.min(4096)),
            capacity: capacity.max(1),
        }
    }

    /// Push one entity. Returns a full chunk when the buffer reaches
    /// capacity; the caller must flush it before pushing more.
    #[must_use]
    pub fn push(&mut self, entity: E) -> Option<Vec<E>> {
        self.buf.push(entity);
        if self.buf.len() >= self.capacity {
            Some(std::mem::take(&mut self.buf))
        } else {
            None
        }
    }

    /// Drain the remainder at end of table.
    #[must_use]
    pub fn finish(self) -> Option<Vec<E>> {
        if self.buf.is_empty() {
            None
        } else {
            Some(self.buf)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flushes_at_capacity() {
        let mut b = Batcher::new(3);
        assert!(b.push(1).is_none());
        assert!(b.push(2).is_none());
        let chunk = b.push(3).unwrap();
        assert_eq!(chunk, vec![1, 2, 3]);

        assert!(b.push(4).is_none());
        assert_eq!(b.finish().unwrap(), vec![4]);
    }

    #[test]
    fn test_empty_finish() {
        let b: Batcher<i32> = Batcher::new(3);
        assert!(b.finish().is_none());
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut b = Batcher::new(0);
        assert!(b.push(1).is_some());
    }
}
