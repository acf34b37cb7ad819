//! In-memory page, player and transport used by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::delivery::Transport;
use crate::error::PresenceError;
use crate::page::{MutationStream, Page, Player, PlayerEvent};

#[derive(Debug, Default)]
struct TransportLog {
    calls: Vec<(String, Instant)>,
    completed: Vec<String>,
}

/// Records every URL it is asked to fetch.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    log: Arc<Mutex<TransportLog>>,
    latency: Duration,
    fail: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Every call started, with the virtual time it started at.
    pub fn calls(&self) -> Vec<(String, Instant)> {
        self.log.lock().unwrap().calls.clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|(url, _)| url).collect()
    }

    /// Calls that ran to completion (were not aborted).
    pub fn completed(&self) -> Vec<String> {
        self.log.lock().unwrap().completed.clone()
    }
}

impl Transport for RecordingTransport {
    async fn get(&self, url: &str) -> Result<u16, PresenceError> {
        self.log
            .lock()
            .unwrap()
            .calls
            .push((url.to_string(), Instant::now()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.log.lock().unwrap().completed.push(url.to_string());
        if self.fail {
            Err(PresenceError::Status(503))
        } else {
            Ok(204)
        }
    }
}

#[derive(Debug, Default)]
struct PlayerState {
    time: f64,
    paused: bool,
    listeners: Vec<mpsc::UnboundedSender<PlayerEvent>>,
}

/// Scriptable `<video>` element.
#[derive(Debug, Clone, Default)]
pub struct FakePlayer {
    state: Arc<Mutex<PlayerState>>,
    subscriptions: Arc<AtomicUsize>,
}

impl FakePlayer {
    pub fn new() -> Self {
        let player = Self::default();
        player.state.lock().unwrap().paused = true;
        player
    }

    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    fn emit(&self, event: PlayerEvent) {
        let state = self.state.lock().unwrap();
        for listener in &state.listeners {
            let _ = listener.send(event);
        }
    }

    pub fn play_at(&self, time: f64) {
        {
            let mut state = self.state.lock().unwrap();
            state.time = time;
            state.paused = false;
        }
        self.emit(PlayerEvent::Play);
    }

    pub fn pause(&self) {
        self.state.lock().unwrap().paused = true;
        self.emit(PlayerEvent::Pause);
    }

    pub fn seek_to(&self, time: f64) {
        self.state.lock().unwrap().time = time;
        self.emit(PlayerEvent::Seeked);
    }

    pub fn end(&self) {
        self.state.lock().unwrap().paused = true;
        self.emit(PlayerEvent::Ended);
    }
}

impl Player for FakePlayer {
    fn current_time(&self) -> f64 {
        self.state.lock().unwrap().time
    }

    fn is_paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<PlayerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().unwrap().listeners.push(tx);
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        rx
    }
}

#[derive(Debug, Default)]
struct PageState {
    address: String,
    texts: HashMap<String, Vec<String>>,
    player_selector: Option<String>,
    observers: HashMap<String, Vec<mpsc::UnboundedSender<()>>>,
}

/// Page backed by a selector → text table.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    state: Arc<Mutex<PageState>>,
    player: FakePlayer,
    player_attached: Arc<AtomicBool>,
}

impl FakePage {
    pub fn new(address: &str) -> Self {
        let page = Self {
            player: FakePlayer::new(),
            ..Self::default()
        };
        page.state.lock().unwrap().address = address.to_string();
        page
    }

    pub fn player_handle(&self) -> FakePlayer {
        self.player.clone()
    }

    pub fn set_text(&self, selector: &str, text: &str) {
        self.set_texts(selector, &[text]);
    }

    pub fn set_texts(&self, selector: &str, texts: &[&str]) {
        self.state.lock().unwrap().texts.insert(
            selector.to_string(),
            texts.iter().map(|t| t.to_string()).collect(),
        );
    }

    /// Make the player available under `selector`.
    pub fn attach_player(&self, selector: &str) {
        self.state.lock().unwrap().player_selector = Some(selector.to_string());
        self.player_attached.store(true, Ordering::SeqCst);
    }

    pub fn detach_player(&self) {
        self.player_attached.store(false, Ordering::SeqCst);
    }

    /// Notify observers of `selector` that its subtree changed.
    pub fn mutate(&self, selector: &str) {
        let state = self.state.lock().unwrap();
        if let Some(observers) = state.observers.get(selector) {
            for observer in observers {
                let _ = observer.send(());
            }
        }
    }
}

impl Page for FakePage {
    type Player = FakePlayer;

    fn address(&self) -> String {
        self.state.lock().unwrap().address.clone()
    }

    fn text(&self, selector: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .texts
            .get(selector)
            .and_then(|t| t.first().cloned())
    }

    fn texts(&self, selector: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .texts
            .get(selector)
            .cloned()
            .unwrap_or_default()
    }

    fn player(&self, selector: &str) -> Option<FakePlayer> {
        let state = self.state.lock().unwrap();
        let attached = self.player_attached.load(Ordering::SeqCst);
        (attached && state.player_selector.as_deref() == Some(selector))
            .then(|| self.player.clone())
    }

    fn observe(&self, selector: &str) -> Option<MutationStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state
            .lock()
            .unwrap()
            .observers
            .entry(selector.to_string())
            .or_default()
            .push(tx);
        Some(rx)
    }
}
