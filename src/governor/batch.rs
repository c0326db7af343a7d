use futures::future::{BoxFuture, join_all, try_join_all};
use reqwest::Method;

use super::{RateLimitSignal, RequestGovernor};

/// One call queued for [`RequestGovernor::batch`].
///
/// `call` is not polled until the governor dispatches it, so building the request does not start
/// any network activity.
pub struct BatchRequest<'a, T, E> {
    /// Key used for spacing and caching, conventionally the request path.
    pub endpoint_key: String,
    /// HTTP verb; only `GET` is cached.
    pub method: Method,
    /// The deferred call.
    pub call: BoxFuture<'a, Result<T, E>>,
}

impl<'a, T, E> BatchRequest<'a, T, E> {
    pub fn new(
        endpoint_key: impl Into<String>,
        method: Method,
        call: impl Future<Output = Result<T, E>> + Send + 'a,
    ) -> Self {
        Self {
            endpoint_key: endpoint_key.into(),
            method,
            call: Box::pin(call),
        }
    }
}

impl<T: Clone + Send> RequestGovernor<T> {
    /// Runs `requests` in consecutive groups of at most `batch_size`, each group concurrently,
    /// pausing `batch_pause` between groups. Results keep the input order.
    ///
    /// The first failure inside a group ends the batch: the rest of that group is dropped and
    /// later groups never start. Use [`batch_settled`](Self::batch_settled) to collect every
    /// outcome instead.
    ///
    /// # Errors
    /// The first error returned by a call in the failing group.
    pub async fn batch<'a, E>(&self, requests: Vec<BatchRequest<'a, T, E>>) -> Result<Vec<T>, E>
    where
        E: RateLimitSignal,
    {
        let size = self.inner.config.batch_size;
        let total = requests.len();
        let mut results = Vec::with_capacity(total);
        let mut pending = requests.into_iter().peekable();

        while pending.peek().is_some() {
            let group: Vec<_> = pending.by_ref().take(size).collect();
            let settled = try_join_all(group.into_iter().map(|r| self.dispatch(r))).await?;
            results.extend(settled);
            if pending.peek().is_some() {
                tokio::time::sleep(self.inner.config.batch_pause).await;
            }
        }
        Ok(results)
    }

    /// Like [`batch`](Self::batch), but every request runs and each outcome is returned in input
    /// order, failures included.
    pub async fn batch_settled<'a, E>(
        &self,
        requests: Vec<BatchRequest<'a, T, E>>,
    ) -> Vec<Result<T, E>>
    where
        E: RateLimitSignal,
    {
        let size = self.inner.config.batch_size;
        let mut results = Vec::with_capacity(requests.len());
        let mut pending = requests.into_iter().peekable();

        while pending.peek().is_some() {
            let group: Vec<_> = pending.by_ref().take(size).collect();
            results.extend(join_all(group.into_iter().map(|r| self.dispatch(r))).await);
            if pending.peek().is_some() {
                tokio::time::sleep(self.inner.config.batch_pause).await;
            }
        }
        results
    }

    async fn dispatch<E>(&self, request: BatchRequest<'_, T, E>) -> Result<T, E>
    where
        E: RateLimitSignal,
    {
        let BatchRequest {
            endpoint_key,
            method,
            call,
        } = request;
        self.throttle(&endpoint_key, &method, || call).await
    }
}
