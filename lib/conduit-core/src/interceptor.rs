//! Interceptor registries.
//!
//! An [`Interceptor`] is a pair of optional async handlers: one for a
//! successful predecessor, one for a failed one. Registries keep them in
//! registration order; ejecting leaves a tombstone so ids never shift.
//!
//! ```
//! use conduit_core::{Interceptor, InterceptorRegistry, RequestConfig};
//!
//! let registry = InterceptorRegistry::<RequestConfig>::new();
//! let id = registry.add(Interceptor::fulfilled(|config: RequestConfig| async move {
//!     Ok(config.header("X-Trace", "1"))
//! }));
//! assert_eq!(registry.len(), 1);
//!
//! assert!(registry.eject(id));
//! assert!(registry.is_empty());
//! ```

use std::fmt;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::{Error, RequestConfig, Response, Result};

type FulfilledHandler<T> = Arc<dyn Fn(T) -> BoxFuture<'static, Result<T>> + Send + Sync>;
type RejectedHandler<T> = Arc<dyn Fn(Error) -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// A pair of optional success and failure handlers.
pub struct Interceptor<T> {
    on_fulfilled: Option<FulfilledHandler<T>>,
    on_rejected: Option<RejectedHandler<T>>,
}

impl<T> Default for Interceptor<T> {
    fn default() -> Self {
        Self {
            on_fulfilled: None,
            on_rejected: None,
        }
    }
}

impl<T> Clone for Interceptor<T> {
    fn clone(&self) -> Self {
        Self {
            on_fulfilled: self.on_fulfilled.clone(),
            on_rejected: self.on_rejected.clone(),
        }
    }
}

impl<T> fmt::Debug for Interceptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("on_fulfilled", &self.on_fulfilled.is_some())
            .field("on_rejected", &self.on_rejected.is_some())
            .finish()
    }
}

impl<T: Send + 'static> Interceptor<T> {
    /// An interceptor with only a success handler.
    pub fn fulfilled<F, Fut>(handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self::default().on_fulfilled(handler)
    }

    /// An interceptor with only a failure handler.
    pub fn rejected<G, Fut>(handler: G) -> Self
    where
        G: Fn(Error) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self::default().on_rejected(handler)
    }

    /// Set the success handler.
    #[must_use]
    pub fn on_fulfilled<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.on_fulfilled = Some(Arc::new(move |value| handler(value).boxed()));
        self
    }

    /// Set the failure handler. Returning `Ok` recovers the chain.
    #[must_use]
    pub fn on_rejected<G, Fut>(mut self, handler: G) -> Self
    where
        G: Fn(Error) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.on_rejected = Some(Arc::new(move |error| handler(error).boxed()));
        self
    }

    /// Run this interceptor on its predecessor's outcome.
    ///
    /// A missing handler passes the outcome through unchanged.
    pub async fn handle(self, outcome: Result<T>) -> Result<T> {
        match outcome {
            Ok(value) => match self.on_fulfilled {
                Some(handler) => handler(value).await,
                None => Ok(value),
            },
            Err(error) => match self.on_rejected {
                Some(handler) => handler(error).await,
                None => Err(error),
            },
        }
    }
}

/// Identifier of a registered interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterceptorId(usize);

/// Ordered, thread-safe list of interceptors.
pub struct InterceptorRegistry<T> {
    entries: RwLock<Vec<Option<Interceptor<T>>>>,
}

impl<T> Default for InterceptorRegistry<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }
}

impl<T> InterceptorRegistry<T> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an interceptor, returning its id.
    pub fn add(&self, interceptor: Interceptor<T>) -> InterceptorId {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.push(Some(interceptor));
        InterceptorId(entries.len() - 1)
    }

    /// Remove an interceptor.
    ///
    /// Chains already snapshotted keep it. Returns `false` if the id was
    /// unknown or already ejected.
    pub fn eject(&self, id: InterceptorId) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.get_mut(id.0).and_then(Option::take).is_some()
    }

    /// Visit live interceptors in registration order.
    ///
    /// The visitor runs on a snapshot, so it may add or eject interceptors.
    pub fn for_each(&self, mut visit: impl FnMut(InterceptorId, &Interceptor<T>)) {
        let live: Vec<_> = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            entries
                .iter()
                .enumerate()
                .filter_map(|(index, entry)| entry.clone().map(|entry| (InterceptorId(index), entry)))
                .collect()
        };
        for (id, interceptor) in &live {
            visit(*id, interceptor);
        }
    }

    /// Live interceptors in registration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Interceptor<T>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.iter().flatten().cloned().collect()
    }

    /// Number of live interceptors.
    #[must_use]
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.iter().flatten().count()
    }

    /// Returns `true` if no interceptor is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> fmt::Debug for InterceptorRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorRegistry")
            .field("len", &self.len())
            .finish()
    }
}

/// The request and response registries of a client.
#[derive(Debug, Default)]
pub struct Interceptors {
    /// Run before dispatch, most recently added first.
    pub request: InterceptorRegistry<RequestConfig>,
    /// Run after dispatch, in registration order.
    pub response: InterceptorRegistry<Response>,
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    fn push(tag: &'static str) -> Interceptor<Vec<&'static str>> {
        Interceptor::fulfilled(move |mut trail: Vec<&'static str>| async move {
            trail.push(tag);
            Ok(trail)
        })
    }

    #[test]
    fn ids_are_stable_across_ejects() {
        let registry = InterceptorRegistry::new();
        let a = registry.add(push("a"));
        let b = registry.add(push("b"));

        check!(registry.eject(a));
        check!(!registry.eject(a));
        let c = registry.add(push("c"));

        check!(b != c);
        assert_eq!(registry.len(), 2);

        let mut seen = Vec::new();
        registry.for_each(|id, _| seen.push(id));
        assert_eq!(seen, vec![b, c]);
    }

    #[test]
    fn eject_unknown_id() {
        let registry = InterceptorRegistry::<Vec<&'static str>>::new();
        check!(!registry.eject(InterceptorId(7)));
    }

    #[test]
    fn snapshot_is_unaffected_by_later_eject() {
        let registry = InterceptorRegistry::new();
        let a = registry.add(push("a"));
        registry.add(push("b"));

        let snapshot = registry.snapshot();
        registry.eject(a);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.snapshot().len(), 1);
    }

    #[test]
    fn for_each_may_mutate_registry() {
        let registry = InterceptorRegistry::new();
        registry.add(push("a"));

        registry.for_each(|id, _| {
            registry.eject(id);
        });

        check!(registry.is_empty());
    }

    #[tokio::test]
    async fn handle_routes_by_outcome() {
        let interceptor = Interceptor::fulfilled(|n: u32| async move { Ok(n + 1) })
            .on_rejected(|_error| async move { Ok(0) });

        let_assert!(Ok(2) = interceptor.clone().handle(Ok(1)).await);
        let_assert!(Ok(0) = interceptor.handle(Err(Error::network("down"))).await);
    }

    #[tokio::test]
    async fn missing_handlers_pass_through() {
        let empty = Interceptor::<u32>::default();
        let_assert!(Ok(5) = empty.clone().handle(Ok(5)).await);
        let_assert!(Err(Error::Timeout { .. }) = empty.handle(Err(Error::timeout("slow"))).await);

        let only_rejected = Interceptor::rejected(|error: Error| async move { Err::<u32, _>(error) });
        let_assert!(Ok(9) = only_rejected.handle(Ok(9)).await);
    }
}
