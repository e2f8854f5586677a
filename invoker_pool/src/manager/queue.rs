//manager/queue.rs
use std::collections::VecDeque;

use tokio::sync::oneshot;

/// FIFO of free worker ports plus the acquirers waiting for one.
pub struct Queue {
    free: VecDeque<u16>,
    waiting: VecDeque<oneshot::Sender<u16>>,
}

impl Queue {
    pub fn new(ports: impl IntoIterator<Item = u16>) -> Self {
        Self {
            free: ports.into_iter().collect(),
            waiting: VecDeque::new(),
        }
    }

    /// Takes the oldest free port. If there is none, registers a waiter that
    /// receives the next released port.
    pub fn try_acquire_slot(&mut self) -> Result<u16, oneshot::Receiver<u16>> {
        if let Some(port) = self.free.pop_front() {
            return Ok(port);
        }
        let (tx, rx) = oneshot::channel();
        self.waiting.push_back(tx);
        Err(rx)
    }

    /// Hands `port` to the first waiter still listening, otherwise puts it
    /// back on the free list. Returns whether a waiter took it.
    pub fn release_slot(&mut self, port: u16) -> bool {
        let mut port = port;
        while let Some(waiter) = self.waiting.pop_front() {
            match waiter.send(port) {
                Ok(()) => return true,
                Err(returned) => port = returned,
            }
        }
        self.free.push_back(port);
        false
    }

    /// Fails every pending acquirer.
    pub fn drop_waiters(&mut self) {
        self.waiting.clear();
    }

    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    pub fn waiting_len(&self) -> usize {
        self.waiting.iter().filter(|w| !w.is_closed()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_ports_come_out_in_order() {
        let mut queue = Queue::new([1, 2]);
        assert_eq!(queue.try_acquire_slot().ok(), Some(1));
        assert_eq!(queue.try_acquire_slot().ok(), Some(2));
        assert!(queue.try_acquire_slot().is_err());
    }

    #[tokio::test]
    async fn released_ports_go_to_waiters_first() {
        let mut queue = Queue::new([7]);
        let port = queue.try_acquire_slot().unwrap();
        let gone = queue.try_acquire_slot().unwrap_err();
        let waiter = queue.try_acquire_slot().unwrap_err();
        drop(gone);

        assert!(queue.release_slot(port));
        assert_eq!(waiter.await.unwrap(), 7);
        assert_eq!(queue.free_len(), 0);

        assert!(!queue.release_slot(7));
        assert_eq!(queue.free_len(), 1);
    }
}
