//! Host abstraction over a rendered page and its video player.
//!
//! Any binding to a real page (browser automation, webview bridge) implements
//! these traits; the rest of the crate never touches the DOM directly.

use tokio::sync::mpsc;

/// Structural-change notifications for an observed subtree.
///
/// Delivery is best-effort and unordered relative to [`PlayerEvent`]s.
pub type MutationStream = mpsc::UnboundedReceiver<()>;

/// Player lifecycle events the session reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Playback started or resumed.
    Play,
    Pause,
    /// The playback position jumped.
    Seeked,
    /// Playback reached the end of the content.
    Ended,
}

/// A `<video>`-like element.
pub trait Player: Send + Sync + 'static {
    /// Current playback position in seconds.
    fn current_time(&self) -> f64;

    fn is_paused(&self) -> bool;

    /// Attach listeners for lifecycle events.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<PlayerEvent>;
}

/// A loaded page.
///
/// Selector misses are plain `None`/empty results, never errors.
pub trait Page: Send + Sync + 'static {
    type Player: Player;

    /// Current address of the page.
    fn address(&self) -> String;

    /// Text content of the first element matching `selector`.
    fn text(&self, selector: &str) -> Option<String>;

    /// Text content of every element matching `selector`.
    fn texts(&self, selector: &str) -> Vec<String>;

    /// The player element matching `selector`, if it is present yet.
    fn player(&self, selector: &str) -> Option<Self::Player>;

    /// Subscribe to structural changes under the first element matching `selector`.
    fn observe(&self, selector: &str) -> Option<MutationStream>;
}
