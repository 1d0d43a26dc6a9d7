//! Coalesces concurrent calls that share a key into a single execution.
//!
//! The first caller for a key becomes the owner and its future is the one that runs; callers arriving while it is
//! in flight wait on the same shared future and receive a clone of its result, errors included.
//!
//! The call table only holds weak references, so once every waiter for a key has been dropped the in-flight future
//! is dropped as well and the next caller starts a fresh one.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared, WeakShared};

use crate::errors::SingleflightError;

type SharedCall<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;
type WeakCall<T, E> = WeakShared<BoxFuture<'static, Result<T, E>>>;

pub struct Group<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + std::fmt::Display + 'static,
{
    calls: Mutex<HashMap<String, WeakCall<T, E>>>,
}

impl<T, E> Default for Group<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + std::fmt::Display + 'static,
{
    fn default() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }
}

impl<T, E> Group<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + std::fmt::Display + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute `fut` under `key`, or join the call already in flight for that key.
    ///
    /// Returns the result and whether this caller was the owner, i.e. whether `fut` itself was run.
    pub async fn work<F>(&self, key: &str, fut: F) -> (Result<T, SingleflightError<E>>, bool)
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        // Declared before `call` so it runs after every strong reference held here is gone.
        let _prune = PruneOnDrop { calls: &self.calls };

        let (call, is_owner) = {
            let Ok(mut calls) = self.calls.lock() else {
                return (Err(SingleflightError::CallTablePoisoned), false);
            };

            match calls.get(key).and_then(WeakShared::upgrade) {
                Some(call) => (call, false),
                None => {
                    let call: SharedCall<T, E> = fut.boxed().shared();
                    if let Some(weak) = call.downgrade() {
                        calls.insert(key.to_owned(), weak);
                    }
                    (call, true)
                },
            }
        };

        let result = call.clone().await;
        self.forget(key, &call);

        (result.map_err(SingleflightError::InternalError), is_owner)
    }

    /// Number of keys with a live call in flight.
    pub fn num_in_flight(&self) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.values().filter(|c| c.upgrade().is_some()).count())
            .unwrap_or(0)
    }

    fn forget(&self, key: &str, call: &SharedCall<T, E>) {
        let Ok(mut calls) = self.calls.lock() else {
            return;
        };

        let is_stale = match calls.get(key).map(WeakShared::upgrade) {
            Some(Some(existing)) => existing.ptr_eq(call),
            Some(None) => true,
            None => false,
        };

        if is_stale {
            calls.remove(key);
        }
    }
}

/// Drops table entries whose call has no waiters left, e.g. after every waiter was cancelled.
struct PruneOnDrop<'a, T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + std::fmt::Display + 'static,
{
    calls: &'a Mutex<HashMap<String, WeakCall<T, E>>>,
}

impl<T, E> Drop for PruneOnDrop<'_, T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + std::fmt::Display + 'static,
{
    fn drop(&mut self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.retain(|_, call| call.upgrade().is_some());
        }
    }
}
