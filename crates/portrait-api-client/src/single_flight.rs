//! Collapse concurrent identical operations into one.
//!
//! The first caller for a key starts the work on a spawned task; callers
//! arriving while it runs get the same result. Dropping a caller's future
//! does not cancel the work.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use portrait_core::AppError;
use tokio::sync::Mutex;

type SharedResult<T> = Shared<BoxFuture<'static, Result<T, AppError>>>;

pub struct SingleFlight<K, T> {
    in_flight: Arc<Mutex<HashMap<K, SharedResult<T>>>>,
}

impl<K, T> Default for SingleFlight<K, T> {
    fn default() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, T> Clone for SingleFlight<K, T> {
    fn clone(&self) -> Self {
        Self {
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` for `key`, or join the run already in flight for it.
    pub async fn run<F, Fut>(&self, key: K, work: F) -> Result<T, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        let shared = {
            let mut in_flight = self.in_flight.lock().await;
            match in_flight.get(&key) {
                Some(existing) => {
                    tracing::debug!("Joining in-flight operation");
                    existing.clone()
                }
                None => {
                    let shared = self.spawn(key.clone(), work());
                    in_flight.insert(key, shared.clone());
                    shared
                }
            }
        };

        shared.await
    }

    /// Number of keys with work in flight.
    pub async fn in_flight(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    fn spawn<Fut>(&self, key: K, work: Fut) -> SharedResult<T>
    where
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        let in_flight = Arc::clone(&self.in_flight);
        // The entry is inserted under the lock the caller holds, so this
        // removal always runs after it.
        let handle = tokio::spawn(async move {
            let result = work.await;
            in_flight.lock().await.remove(&key);
            result
        });

        async move {
            handle
                .await
                .unwrap_or_else(|e| Err(AppError::Internal(format!("Operation task failed: {}", e))))
        }
        .boxed()
        .shared()
    }
}
