//! Teardown bag for generator implementations.

use std::future::Future;
use std::pin::Pin;

/// Future type for asynchronous teardown.
pub(crate) type BoxFutureUnit = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Cleanup registered by a generator implementation.
pub enum Teardown {
    Sync(Box<dyn FnOnce() + Send>),
    Async(Box<dyn FnOnce() -> BoxFutureUnit + Send>),
}

/// Teardowns with LIFO execution order.
///
/// Async teardowns run first (in reverse order), followed by sync ones.
#[derive(Default)]
pub(crate) struct DisposeBag {
    sync: Vec<Box<dyn FnOnce() + Send>>,
    asyncs: Vec<Box<dyn FnOnce() -> BoxFutureUnit + Send>>,
}

impl DisposeBag {
    pub(crate) fn push(&mut self, teardown: Teardown) {
        match teardown {
            Teardown::Sync(f) => self.sync.push(f),
            Teardown::Async(f) => self.asyncs.push(f),
        }
    }

    /// Moves every teardown of `other` into this bag, keeping their order.
    pub(crate) fn append(&mut self, other: &mut DisposeBag) {
        self.sync.append(&mut other.sync);
        self.asyncs.append(&mut other.asyncs);
    }

    pub(crate) fn run_all_sync_reverse(&mut self) {
        while let Some(f) = self.sync.pop() {
            (f)();
        }
    }

    pub(crate) async fn run_all_async_reverse(&mut self) {
        while let Some(f) = self.asyncs.pop() {
            (f)().await;
        }
    }

    /// Runs async teardowns, then sync ones.
    pub(crate) async fn dispose(&mut self) {
        self.run_all_async_reverse().await;
        self.run_all_sync_reverse();
    }

    pub(crate) fn len(&self) -> usize {
        self.sync.len() + self.asyncs.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.sync.is_empty() && self.asyncs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn async_then_sync_each_lifo() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bag = DisposeBag::default();

        for name in ["sync-1", "sync-2"] {
            let log = log.clone();
            bag.push(Teardown::Sync(Box::new(move || log.lock().unwrap().push(name))));
        }
        for name in ["async-1", "async-2"] {
            let log = log.clone();
            bag.push(Teardown::Async(Box::new(move || {
                Box::pin(async move { log.lock().unwrap().push(name) })
            })));
        }
        assert_eq!(bag.len(), 4);

        bag.dispose().await;
        assert!(bag.is_empty());
        assert_eq!(*log.lock().unwrap(), vec!["async-2", "async-1", "sync-2", "sync-1"]);
    }
}
