// Pending result of a source load
//
// A load call returns a LoadHandle right away; the adapter keeps the matching
// LoadCompleter and settles it when the native engine reports ready or failed.
// A handle given a timeout arms a deadline thread that fails the load if
// nothing settles it first.

use crate::error::{AudioError, Result};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

type SettleCallback = Box<dyn FnOnce(&Result<()>) + Send>;
type ExpireHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Slot {
    result: Option<Result<()>>,
    callbacks: Vec<SettleCallback>,
}

#[derive(Default)]
struct Shared {
    slot: Mutex<Slot>,
    settled: Condvar,
    expired: AtomicBool,
}

impl Shared {
    /// Returns whether the load settled before `deadline`.
    fn wait_until(&self, deadline: Instant) -> bool {
        let mut slot = self.slot.lock();
        while slot.result.is_none() {
            if self.settled.wait_until(&mut slot, deadline).timed_out() {
                break;
            }
        }
        slot.result.is_some()
    }

    fn wait_settled(&self) -> Result<()> {
        let mut slot = self.slot.lock();
        loop {
            if let Some(result) = slot.result.clone() {
                return result;
            }
            self.settled.wait(&mut slot);
        }
    }

    fn result(&self) -> Option<Result<()>> {
        self.slot.lock().result.clone()
    }
}

/// Fail a still-pending load with [`AudioError::PrepareTimeout`]. The hook
/// runs at most once however many waiters reach the deadline.
fn expire_load(shared: &Arc<Shared>, timeout: Duration, on_expire: Option<&ExpireHook>) {
    if shared.result().is_some() || shared.expired.swap(true, Ordering::SeqCst) {
        return;
    }
    log::warn!("prepare did not finish within {:?}", timeout);
    if let Some(on_expire) = on_expire {
        on_expire();
    }
    // The expire hook may have raced with a real result; settle keeps the first.
    let timed_out = AudioError::PrepareTimeout(timeout.as_millis() as u64);
    LoadCompleter { shared: shared.clone() }.settle(Err(timed_out));
}

/// Create a connected completer/handle pair.
pub fn pending_load() -> (LoadCompleter, LoadHandle) {
    let shared = Arc::new(Shared::default());
    (
        LoadCompleter { shared: shared.clone() },
        LoadHandle {
            shared,
            timeout: None,
            on_expire: None,
        },
    )
}

/// Adapter side of a pending load
pub struct LoadCompleter {
    shared: Arc<Shared>,
}

impl LoadCompleter {
    /// Settle the load. Only the first call has an effect.
    pub fn settle(&self, result: Result<()>) -> bool {
        let callbacks = {
            let mut slot = self.shared.slot.lock();
            if slot.result.is_some() {
                return false;
            }
            slot.result = Some(result.clone());
            std::mem::take(&mut slot.callbacks)
        };
        self.shared.settled.notify_all();

        for callback in callbacks {
            callback(&result);
        }
        true
    }

    pub fn is_settled(&self) -> bool {
        self.shared.slot.lock().result.is_some()
    }
}

/// Caller side of a pending load
#[derive(Clone)]
pub struct LoadHandle {
    shared: Arc<Shared>,
    timeout: Option<Duration>,
    on_expire: Option<ExpireHook>,
}

impl LoadHandle {
    /// A handle that is already settled.
    pub fn settled(result: Result<()>) -> Self {
        let (completer, handle) = pending_load();
        completer.settle(result);
        handle
    }

    /// Fail the load once `timeout` elapses without a result.
    ///
    /// The deadline is armed now, so a caller that only registers
    /// [`on_settled`](Self::on_settled) still sees the timeout. `on_expire`
    /// runs on the deadline thread before the load is settled.
    pub fn with_timeout<F>(mut self, timeout: Option<Duration>, on_expire: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.timeout = timeout;
        self.on_expire = Some(Arc::new(on_expire));
        if let Some(timeout) = timeout {
            self.arm(timeout);
        }
        self
    }

    fn arm(&self, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        let shared = self.shared.clone();
        let on_expire = self.on_expire.clone();
        thread::spawn(move || {
            if !shared.wait_until(deadline) {
                expire_load(&shared, timeout, on_expire.as_ref());
            }
        });
    }

    pub fn is_settled(&self) -> bool {
        self.shared.slot.lock().result.is_some()
    }

    /// Non-blocking peek at the result.
    pub fn try_result(&self) -> Option<Result<()>> {
        self.shared.result()
    }

    /// Run `f` once the load settles (immediately if it already has).
    pub fn on_settled<F>(&self, f: F)
    where
        F: FnOnce(&Result<()>) + Send + 'static,
    {
        let mut slot = self.shared.slot.lock();
        match slot.result.clone() {
            Some(result) => {
                drop(slot);
                f(&result);
            }
            None => slot.callbacks.push(Box::new(f)),
        }
    }

    /// Block until the load settles or the configured timeout elapses.
    pub fn wait(&self) -> Result<()> {
        match self.timeout {
            Some(timeout) => self.wait_timeout(timeout),
            None => self.shared.wait_settled(),
        }
    }

    /// Block for at most `timeout`. On expiry the load is failed with
    /// [`AudioError::PrepareTimeout`] so a late ready signal is ignored.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<()> {
        if self.shared.wait_until(Instant::now() + timeout) {
            if let Some(result) = self.shared.result() {
                return result;
            }
        }
        // Whoever runs the expiry settles the load right after its hook.
        expire_load(&self.shared, timeout, self.on_expire.as_ref());
        self.shared.wait_settled()
    }
}

impl fmt::Debug for LoadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadHandle")
            .field("result", &self.try_result())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn settles_once() {
        let (completer, handle) = pending_load();
        assert!(completer.settle(Ok(())));
        assert!(!completer.settle(Err(AudioError::NotReady)));
        assert_eq!(handle.wait(), Ok(()));
    }

    #[test]
    fn wait_blocks_until_settled_from_another_thread() {
        let (completer, handle) = pending_load();
        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            completer.settle(Err(AudioError::PrepareFailed { what: 1, extra: 0 }));
        });

        assert_eq!(
            handle.wait_timeout(Duration::from_secs(5)),
            Err(AudioError::PrepareFailed { what: 1, extra: 0 })
        );
        worker.join().unwrap();
    }

    #[test]
    fn callbacks_run_on_settle_and_after() {
        let (completer, handle) = pending_load();
        let calls = Arc::new(AtomicUsize::new(0));

        let c = calls.clone();
        handle.on_settled(move |result| {
            assert!(result.is_ok());
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        completer.settle(Ok(()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let c = calls.clone();
        handle.on_settled(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn timeout_runs_expire_hook_and_settles() {
        let (completer, handle) = pending_load();
        let expired = Arc::new(AtomicBool::new(false));
        let flag = expired.clone();
        let handle = handle.with_timeout(Some(Duration::from_millis(10)), move || {
            flag.store(true, Ordering::SeqCst);
        });

        assert_eq!(handle.wait(), Err(AudioError::PrepareTimeout(10)));
        assert!(expired.load(Ordering::SeqCst));
        assert!(completer.is_settled());
        assert!(!completer.settle(Ok(())));
    }

    #[test]
    fn armed_deadline_settles_without_a_waiter() {
        let (completer, handle) = pending_load();
        let expired = Arc::new(AtomicUsize::new(0));
        let hook = expired.clone();
        let handle = handle.with_timeout(Some(Duration::from_millis(10)), move || {
            hook.fetch_add(1, Ordering::SeqCst);
        });

        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        handle.on_settled(move |result| {
            *sink.lock() = Some(result.clone());
        });

        thread::sleep(Duration::from_millis(200));
        assert_eq!(*seen.lock(), Some(Err(AudioError::PrepareTimeout(10))));
        assert_eq!(expired.load(Ordering::SeqCst), 1);
        assert!(completer.is_settled());

        // A late waiter sees the same result and does not re-run the hook.
        assert_eq!(handle.wait(), Err(AudioError::PrepareTimeout(10)));
        assert_eq!(expired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn armed_deadline_stands_down_when_settled_first() {
        let (completer, handle) = pending_load();
        let expired = Arc::new(AtomicBool::new(false));
        let flag = expired.clone();
        let handle = handle.with_timeout(Some(Duration::from_millis(30)), move || {
            flag.store(true, Ordering::SeqCst);
        });

        assert!(completer.settle(Ok(())));
        thread::sleep(Duration::from_millis(100));
        assert!(!expired.load(Ordering::SeqCst));
        assert_eq!(handle.try_result(), Some(Ok(())));
    }

    #[test]
    fn settled_constructor() {
        let handle = LoadHandle::settled(Err(AudioError::Cancelled));
        assert_eq!(handle.try_result(), Some(Err(AudioError::Cancelled)));
    }
}
