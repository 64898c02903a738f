use core::cell::RefCell;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::waitqueue::MultiWakerRegistration;

/// Owns a value and lets watchers wait until it changes.
pub struct Synchronizer<const WATCHER_COUNT: usize, M: RawMutex, T>(
    Mutex<M, RefCell<SynchronizerData<WATCHER_COUNT, T>>>,
);

struct SynchronizerData<const WATCHER_COUNT: usize, T> {
    value: T,
    wakers: MultiWakerRegistration<WATCHER_COUNT>,
    revision: usize,
}

impl<const WATCHER_COUNT: usize, M: RawMutex, T> Synchronizer<WATCHER_COUNT, M, T> {
    pub fn new(value: T) -> Self {
        Self(Mutex::new(RefCell::new(SynchronizerData {
            value,
            wakers: MultiWakerRegistration::new(),
            revision: 0,
        })))
    }

    /// f should not block
    pub fn read<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        self.0.lock(|v| f(&v.borrow().value))
    }

    /// Run `f` on the value. Watchers are only woken when `f` returns true.
    pub fn update(&self, f: impl FnOnce(&mut T) -> bool) -> bool {
        self.0.lock(|inner| {
            let mut s = inner.borrow_mut();
            let changed = f(&mut s.value);
            if changed {
                s.revision = s.revision.wrapping_add(1);
                s.wakers.wake();
            }
            changed
        })
    }

    pub fn revision(&self) -> usize {
        self.0.lock(|v| v.borrow().revision)
    }

    pub fn watch(&self) -> Watcher<'_, WATCHER_COUNT, M, T> {
        Watcher {
            last_revision: self.revision(),
            synchronizer: self,
        }
    }
}

pub struct Watcher<'a, const WATCHER_COUNT: usize, M: RawMutex, T> {
    synchronizer: &'a Synchronizer<WATCHER_COUNT, M, T>,
    last_revision: usize,
}

impl<'a, const WATCHER_COUNT: usize, M: RawMutex, T> Watcher<'a, WATCHER_COUNT, M, T> {
    /// Resolves once the value changed since the previous call, or since the watcher was created.
    pub fn changed<'s>(&'s mut self) -> ChangedFuture<'s, 'a, WATCHER_COUNT, M, T> {
        ChangedFuture(self)
    }
}

pub struct ChangedFuture<'s, 'a, const WATCHER_COUNT: usize, M: RawMutex, T>(
    &'s mut Watcher<'a, WATCHER_COUNT, M, T>,
);

impl<'s, 'a, const WATCHER_COUNT: usize, M: RawMutex, T> Future
    for ChangedFuture<'s, 'a, WATCHER_COUNT, M, T>
{
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let last_revision = self.0.last_revision;
        let revision = self.0.synchronizer.0.lock(|inner| {
            let mut s = inner.borrow_mut();
            if s.revision == last_revision {
                s.wakers.register(cx.waker());
            }
            s.revision
        });

        if revision != last_revision {
            self.0.last_revision = revision;
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}
