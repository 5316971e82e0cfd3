//! Single-consumer queue for running observer callbacks on one task.
//!
//! Page streams notify observers on whichever thread published. A UI that
//! must touch its state from one place wraps its observers with
//! [`ForegroundHandle::observer`] and drains the queue from its own loop.

use std::sync::Arc;

use tokio::sync::mpsc;

type Task = Box<dyn FnOnce() + Send + 'static>;

pub struct ForegroundQueue {
    receiver: mpsc::UnboundedReceiver<Task>,
    handle: ForegroundHandle,
}

/// Cloneable sender side of a [`ForegroundQueue`].
#[derive(Clone)]
pub struct ForegroundHandle {
    sender: mpsc::UnboundedSender<Task>,
}

impl ForegroundQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            receiver,
            handle: ForegroundHandle { sender },
        }
    }

    pub fn handle(&self) -> ForegroundHandle {
        self.handle.clone()
    }

    /// Run every task queued so far without waiting. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Wait for the next task and run it.
    ///
    /// Never returns `false` while the queue is alive, since it holds a
    /// handle of its own.
    pub async fn run_next(&mut self) -> bool {
        match self.receiver.recv().await {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }
}

impl Default for ForegroundQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ForegroundHandle {
    /// Queue `task`. Returns `false` if the queue has been dropped.
    pub fn post<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender.send(Box::new(task)).is_ok()
    }

    /// Wrap `f` so each notification is cloned and replayed on the queue.
    pub fn observer<T, F>(&self, f: F) -> impl Fn(&T) + Send + Sync + 'static
    where
        T: Clone + Send + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let sender = self.sender.clone();
        let f = Arc::new(f);
        move |value: &T| {
            let value = value.clone();
            let f = Arc::clone(&f);
            let _ = sender.send(Box::new(move || f(value)));
        }
    }
}

impl std::fmt::Debug for ForegroundQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForegroundQueue").finish_non_exhaustive()
    }
}

impl std::fmt::Debug for ForegroundHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForegroundHandle")
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}
