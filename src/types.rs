use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Rank of a participant in a bootstrap session (0-indexed).
pub type Rank = u32;

/// Caller-chosen discriminator for point-to-point messages.
pub type Tag = u32;

/// Magic used when every process derives the handle from an explicit
/// rendezvous address instead of receiving a generated one.
pub const DEFAULT_MAGIC: u64 = 0xdead_beef;

/// Largest world a session accepts.
pub const MAX_WORLD_SIZE: u32 = 1 << 20;

/// Shared abort flag, owned by whoever drives the job.
///
/// The transport consults it before each connect attempt and while
/// waiting in `accept`, so a stuck peer can be abandoned instead of
/// blocking forever. Setting it also makes `Bootstrap::close` skip the
/// pending-message leak check.
#[derive(Debug, Clone, Default)]
pub struct AbortFlag {
    inner: Arc<AbortInner>,
}

#[derive(Debug, Default)]
struct AbortInner {
    set: AtomicBool,
    notify: Notify,
}

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag and wake every task waiting in `cancelled()`.
    pub fn set(&self) {
        self.inner.set.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    pub fn is_set(&self) -> bool {
        self.inner.set.load(Ordering::Acquire)
    }

    /// Resolves once the flag has been raised.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_set() {
                return;
            }
            notified.await;
        }
    }
}
