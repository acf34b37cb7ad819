//! One page lifetime: resolve the service, wait for the player, check
//! eligibility, then turn player events into relay deliveries until the page
//! goes away.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::awaiter::await_element;
use crate::config::ObserverConfig;
use crate::delivery::{DeliveryChannel, HttpTransport, Transport};
use crate::error::PresenceError;
use crate::extractor::Extractor;
use crate::page::{MutationStream, Page, Player, PlayerEvent};
use crate::service::ServiceRegistry;
use crate::status::{now_millis, Dispatcher};

/// How a page session finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// No service matches the page address.
    Unsupported,
    /// The content failed the service's checks; nothing was sent.
    Ineligible,
    /// The player went away while the page stayed open.
    PlayerDetached,
    /// The page was torn down.
    TornDown,
}

/// Drives page sessions against one relay.
pub struct Observer<T> {
    registry: ServiceRegistry,
    channel: DeliveryChannel<T>,
    relay_url: String,
    settle: Duration,
    poll_interval: Duration,
}

impl Observer<HttpTransport> {
    /// Observer delivering over HTTP, with the user registry from `config` merged in.
    pub fn from_config(config: &ObserverConfig) -> Result<Self, PresenceError> {
        let registry = ServiceRegistry::with_user_file(config.services_file.as_deref())?;
        let transport = HttpTransport::new(config.request_timeout())?;
        Ok(Self::new(registry, transport, config))
    }
}

impl<T: Transport> Observer<T> {
    pub fn new(registry: ServiceRegistry, transport: T, config: &ObserverConfig) -> Self {
        Self {
            registry,
            channel: DeliveryChannel::new(transport),
            relay_url: config.relay_url.clone(),
            settle: config.settle_delay(),
            poll_interval: config.poll_interval(),
        }
    }

    /// Observe `page` until `teardown` fires or the player disappears.
    ///
    /// Only an unparsable relay URL is an error; every other failure path ends
    /// in a quiet [`SessionOutcome`].
    pub async fn run<P: Page>(
        &self,
        page: &P,
        teardown: CancellationToken,
    ) -> Result<SessionOutcome, PresenceError> {
        let address = page.address();
        let Some(service) = self.registry.resolve(&address) else {
            debug!(address = %address, "Unsupported page");
            return Ok(SessionOutcome::Unsupported);
        };
        info!(service = %service.name, "Service resolved");

        let extractor = Extractor::for_service(service);
        let dispatcher = Dispatcher::new(
            self.channel.clone(),
            &self.relay_url,
            service.clone(),
            self.settle,
        )?;

        let player_selector = extractor.selectors().player.clone();
        let player = tokio::select! {
            _ = teardown.cancelled() => {
                debug!("Page torn down before the player appeared");
                return Ok(SessionOutcome::TornDown);
            }
            player = await_element(|| page.player(&player_selector), self.poll_interval) => player,
        };

        let Some(eligible) = extractor.check_eligibility(page) else {
            info!(service = %service.name, "Content not eligible, staying quiet");
            return Ok(SessionOutcome::Ineligible);
        };
        info!(service = %service.name, product = %eligible.product, "Watching eligible content");

        let session = Session {
            page,
            player,
            extractor,
            dispatcher,
            product: eligible.product,
        };
        let outcome = session.run(teardown).await;
        info!(?outcome, "Session finished");
        Ok(outcome)
    }
}

/// Next step of the event loop.
enum Step {
    TornDown,
    Player(Option<PlayerEvent>),
    Identity(Option<()>),
    Container(Option<()>),
}

/// Per-page state once the content is known to be eligible.
struct Session<'p, P: Page, T> {
    page: &'p P,
    player: P::Player,
    extractor: Extractor,
    dispatcher: Dispatcher<T>,
    /// Latest product identity; refreshed on in-place episode switches.
    product: String,
}

impl<P: Page, T: Transport> Session<'_, P, T> {
    async fn run(mut self, teardown: CancellationToken) -> SessionOutcome {
        let mut events = self.player.subscribe();
        let mut identity = self.extractor.identity_root().and_then(|r| self.page.observe(r));
        let mut container = self
            .extractor
            .selectors()
            .player_container
            .as_deref()
            .and_then(|c| self.page.observe(c));

        loop {
            let step = tokio::select! {
                biased;
                _ = teardown.cancelled() => Step::TornDown,
                event = events.recv() => Step::Player(event),
                notice = next_mutation(&mut identity) => Step::Identity(notice),
                notice = next_mutation(&mut container) => Step::Container(notice),
            };

            match step {
                Step::TornDown => {
                    // The page is closing: no settle window will get to run.
                    let _ = self.dispatcher.send_idle_now().await;
                    return SessionOutcome::TornDown;
                }
                Step::Player(Some(event)) => self.on_player_event(event),
                Step::Player(None) => {
                    debug!("Player dropped its listeners");
                    let _ = self.dispatcher.send_idle_now().await;
                    return SessionOutcome::PlayerDetached;
                }
                Step::Identity(Some(())) => self.refresh_identity(),
                Step::Identity(None) => identity = None,
                Step::Container(Some(())) => {
                    if self.page.player(&self.extractor.selectors().player).is_none() {
                        debug!("Player removed from the page");
                        let _ = self.dispatcher.send_idle_now().await;
                        return SessionOutcome::PlayerDetached;
                    }
                }
                Step::Container(None) => container = None,
            }
        }
    }

    fn on_player_event(&self, event: PlayerEvent) {
        debug!(?event, product = %self.product, "Player event");
        match event {
            PlayerEvent::Play => self.send_watching(),
            PlayerEvent::Pause => {
                tokio::spawn(self.dispatcher.send_paused(&self.product));
            }
            PlayerEvent::Seeked => {
                if !self.player.is_paused() {
                    self.send_watching();
                }
            }
            PlayerEvent::Ended => {
                tokio::spawn(self.dispatcher.send_idle_now());
            }
        }
    }

    fn send_watching(&self) {
        tokio::spawn(self.dispatcher.build_and_send(
            &self.product,
            self.player.current_time(),
            now_millis(),
        ));
    }

    fn refresh_identity(&mut self) {
        let Some(product) = self.extractor.refresh_identity(self.page) else {
            return;
        };
        if product == self.product {
            return;
        }
        info!(from = %self.product, to = %product, "Product changed in place");
        self.product = product;
        if !self.player.is_paused() {
            self.send_watching();
        }
    }
}

/// Wait for the next notification, or forever if there is no stream.
async fn next_mutation(stream: &mut Option<MutationStream>) -> Option<()> {
    match stream {
        Some(stream) => stream.recv().await,
        None => std::future::pending().await,
    }
}
