//! Poll-until-found helpers for elements that appear after the page loads.

use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};

/// Reference polling cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Poll `probe` every `interval` until it yields a value.
///
/// The first probe runs immediately. There is no timeout: if the element
/// never shows up the future stays pending until its owner drops it.
pub async fn await_element<T, F>(mut probe: F, interval: Duration) -> T
where
    F: FnMut() -> Option<T>,
{
    let mut ticker = time::interval(interval.max(MIN_POLL_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Some(found) = probe() {
            return found;
        }
    }
}

/// Like [`await_element`], but gives up after `limit`.
pub async fn await_element_within<T, F>(probe: F, interval: Duration, limit: Duration) -> Option<T>
where
    F: FnMut() -> Option<T>,
{
    time::timeout(limit, await_element(probe, interval)).await.ok()
}
