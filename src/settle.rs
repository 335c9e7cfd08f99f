use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

// counted before a message is sent, released after its handler returns.
// replication copies are counted before the write that caused them is released
#[derive(Debug, Default)]
pub(crate) struct Settle {
    pending: AtomicUsize,
    settled: Notify,
}

impl Settle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enter(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn leave(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.settled.notify_waiters();
        }
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.pending() == 0
    }

    pub(crate) async fn wait(&self) {
        loop {
            let notified = self.settled.notified();
            tokio::pin!(notified);
            // register before checking so a concurrent leave() is not missed
            notified.as_mut().enable();
            if self.is_settled() {
                return;
            }
            notified.await;
        }
    }

    pub(crate) async fn wait_for(&self, timeout: Duration) -> bool {
        if self.is_settled() {
            return true;
        }
        tokio::time::timeout(timeout, self.wait()).await.is_ok()
    }
}
