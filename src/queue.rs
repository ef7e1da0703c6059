//! Bounded response queue

use crate::response::Response;
use std::collections::VecDeque;
use tracing::debug;

/// Fixed-capacity FIFO of parsed responses.
///
/// When full, pushing evicts the oldest unread entry. Overflow is policy,
/// not an error: bounded memory wins over completeness and the caller is
/// never signalled.
pub struct ResponseQueue {
    items: VecDeque<Response>,
    capacity: usize,
}

impl ResponseQueue {
    pub fn new(capacity: usize) -> Self {
        ResponseQueue {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, response: Response) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
            debug!("response queue full, evicted oldest entry");
        }
        self.items.push_back(response);
    }

    pub fn pop_front(&mut self) -> Option<Response> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn response(status: u16) -> Response {
        Response::new(status, Bytes::new())
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = ResponseQueue::new(4);
        queue.push(response(200));
        queue.push(response(201));
        queue.push(response(202));

        assert_eq!(queue.pop_front().unwrap().status(), 200);
        assert_eq!(queue.pop_front().unwrap().status(), 201);
        assert_eq!(queue.pop_front().unwrap().status(), 202);
        assert!(queue.pop_front().is_none());
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let mut queue = ResponseQueue::new(3);
        for status in [200, 201, 202, 203] {
            queue.push(response(status));
        }

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop_front().unwrap().status(), 201);
        assert_eq!(queue.pop_front().unwrap().status(), 202);
        assert_eq!(queue.pop_front().unwrap().status(), 203);
    }

    #[test]
    fn test_capacity_bound_holds() {
        let mut queue = ResponseQueue::new(8);
        for status in 0..100u16 {
            queue.push(response(status));
        }
        assert_eq!(queue.len(), 8);
    }
}
