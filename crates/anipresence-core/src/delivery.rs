//! Single-slot debounced delivery to the presence relay.
//!
//! Every submission takes the slot: whatever was settling (or already on the
//! wire) for an older generation is cancelled in the same call, so the relay
//! only ever sees the last status of a burst.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::PresenceError;

/// Settle window used when the caller has no preference.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1000);

/// Issues the outbound call for a settled request.
pub trait Transport: Send + Sync + 'static {
    /// Perform a GET on `url`, returning the response status.
    fn get(&self, url: &str) -> impl Future<Output = Result<u16, PresenceError>> + Send;
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, PresenceError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<u16, PresenceError> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(status.as_u16())
        } else {
            Err(PresenceError::Status(status.as_u16()))
        }
    }
}

/// Result of a request that was not superseded.
pub type Delivery = Result<u16, PresenceError>;

/// The request currently owning the slot.
#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    cancel: Option<CancellationToken>,
}

struct Inner<T> {
    transport: T,
    slot: Mutex<Slot>,
}

impl<T> Inner<T> {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancel the current holder and take the slot. Returns the new generation.
    fn take_slot(&self, token: Option<CancellationToken>) -> u64 {
        let mut slot = self.slot();
        if let Some(previous) = slot.cancel.take() {
            previous.cancel();
        }
        slot.generation += 1;
        slot.cancel = token;
        slot.generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.slot().generation == generation
    }

    /// Release the slot if `generation` still owns it.
    fn release(&self, generation: u64) {
        let mut slot = self.slot();
        if slot.generation == generation {
            slot.cancel = None;
        }
    }
}

/// Coalescing dispatcher with at most one pending request.
pub struct DeliveryChannel<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for DeliveryChannel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> DeliveryChannel<T> {
    pub fn new(transport: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                slot: Mutex::new(Slot::default()),
            }),
        }
    }

    /// Queue `url` for delivery once `settle` elapses without a newer submission.
    ///
    /// The slot is taken before this returns, so ordering between submissions
    /// is the order of the calls, not of the returned futures. The future
    /// resolves to `None` if the request was superseded at any point, including
    /// while its network call was in flight (that call is aborted).
    pub fn submit(
        &self,
        url: String,
        settle: Duration,
    ) -> impl Future<Output = Option<Delivery>> + Send + 'static {
        let token = CancellationToken::new();
        let generation = self.inner.take_slot(Some(token.clone()));
        let inner = Arc::clone(&self.inner);

        async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(generation, "Delivery superseded while settling");
                    return None;
                }
                _ = tokio::time::sleep(settle) => {}
            }

            if !inner.is_current(generation) {
                return None;
            }

            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(generation, "In-flight delivery aborted");
                    return None;
                }
                outcome = inner.transport.get(&url) => outcome,
            };
            inner.release(generation);

            match &outcome {
                Ok(status) => debug!(generation, status, url = %url, "Delivered"),
                Err(e) => warn!(generation, error = %e, "Delivery failed"),
            }
            Some(outcome)
        }
    }

    /// Send `url` right away, superseding anything settling or in flight.
    ///
    /// Later submissions do not cancel this call.
    pub fn send_now(&self, url: String) -> impl Future<Output = Delivery> + Send + 'static {
        self.inner.take_slot(None);
        let inner = Arc::clone(&self.inner);

        async move {
            let outcome = inner.transport.get(&url).await;
            match &outcome {
                Ok(status) => debug!(status, url = %url, "Delivered immediately"),
                Err(e) => warn!(error = %e, "Immediate delivery failed"),
            }
            outcome
        }
    }

    /// Whether a debounced request currently holds the slot.
    pub fn is_settling(&self) -> bool {
        self.inner.slot().cancel.is_some()
    }
}
