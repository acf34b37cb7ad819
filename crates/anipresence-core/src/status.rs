//! Viewing status derivation and relay URL shaping.

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use url::Url;

use crate::delivery::{Delivery, DeliveryChannel, Transport};
use crate::error::PresenceError;
use crate::service::ServiceDescriptor;

/// What the relay should show.
///
/// An empty `product` means nothing eligible is playing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewingStatus {
    pub product: String,
    /// UNIX epoch millis such that `now - value` is the elapsed playback time.
    /// `0` means "no timestamp".
    pub elapsed_origin_timestamp: i64,
}

impl ViewingStatus {
    pub fn idle() -> Self {
        Self {
            product: String::new(),
            elapsed_origin_timestamp: 0,
        }
    }

    pub fn watching(product: impl Into<String>, elapsed_seconds: f64, origin_ms: i64) -> Self {
        Self {
            product: product.into(),
            elapsed_origin_timestamp: delivered_timestamp(elapsed_seconds, origin_ms),
        }
    }

    /// Product still shown, but without a running clock.
    pub fn paused(product: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            elapsed_origin_timestamp: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.product.is_empty()
    }
}

/// Origin timestamp to deliver for `elapsed_seconds` of playback observed at `origin_ms`.
///
/// Elapsed seconds are floored before scaling. Zero elapsed at origin zero is
/// the idle sentinel and yields `0`.
pub fn delivered_timestamp(elapsed_seconds: f64, origin_ms: i64) -> i64 {
    let elapsed = if elapsed_seconds.is_finite() && elapsed_seconds > 0.0 {
        elapsed_seconds.floor() as i64
    } else {
        0
    };
    if elapsed == 0 && origin_ms == 0 {
        return 0;
    }
    origin_ms - elapsed * 1000
}

/// Current wall-clock time in UNIX epoch millis.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Relay URL for `status` on `service`.
pub fn status_url(base: &Url, service: &ServiceDescriptor, status: &ViewingStatus) -> Url {
    if status.is_idle() {
        return idle_url(base);
    }
    let mut url = base.clone();
    url.set_query(None);
    url.query_pairs_mut()
        .append_pair("service", &service.name)
        .append_pair("product", &status.product)
        .append_pair("timestamp", &status.elapsed_origin_timestamp.to_string())
        .append_pair("sImgKey", &service.small_image_key);
    url
}

/// Relay URL that clears the presence.
pub fn idle_url(base: &Url) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    url.query_pairs_mut().append_pair("isIdle", "true");
    url
}

/// Turns statuses for one service into relay deliveries.
pub struct Dispatcher<T> {
    channel: DeliveryChannel<T>,
    base: Url,
    service: ServiceDescriptor,
    settle: Duration,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(
        channel: DeliveryChannel<T>,
        relay_url: &str,
        service: ServiceDescriptor,
        settle: Duration,
    ) -> Result<Self, PresenceError> {
        Ok(Self {
            channel,
            base: Url::parse(relay_url)?,
            service,
            settle,
        })
    }

    /// Debounced watching status for `elapsed_seconds` of playback.
    pub fn build_and_send(
        &self,
        product: &str,
        elapsed_seconds: f64,
        origin_ms: i64,
    ) -> impl Future<Output = Option<Delivery>> + Send + 'static {
        let status = ViewingStatus::watching(product, elapsed_seconds, origin_ms);
        tracing::debug!(
            product,
            elapsed_seconds,
            timestamp = status.elapsed_origin_timestamp,
            "Dispatching watching status"
        );
        self.send(&status)
    }

    /// Debounced paused status, so a quick resume never reaches the relay.
    pub fn send_paused(
        &self,
        product: &str,
    ) -> impl Future<Output = Option<Delivery>> + Send + 'static {
        tracing::debug!(product, "Dispatching paused status");
        self.send(&ViewingStatus::paused(product))
    }

    /// Clear the presence now, bypassing the settle window.
    pub fn send_idle_now(&self) -> impl Future<Output = Delivery> + Send + 'static {
        tracing::debug!(service = %self.service.name, "Dispatching idle status");
        self.channel.send_now(idle_url(&self.base).into())
    }

    fn send(
        &self,
        status: &ViewingStatus,
    ) -> impl Future<Output = Option<Delivery>> + Send + 'static {
        let url = status_url(&self.base, &self.service, status);
        self.channel.submit(url.into(), self.settle)
    }
}
