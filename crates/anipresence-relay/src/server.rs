use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use tokio::net::TcpListener;

use anipresence_core::config::RelayConfig;

use crate::error::RelayError;
use crate::payload::{PresencePayload, RpcQuery};

/// Receiver of shaped presence updates.
pub trait PresenceSink: Send + Sync + 'static {
    fn update(&self, payload: PresencePayload);
    fn clear(&self);
}

/// Shared state of the relay endpoint.
#[derive(Clone)]
pub struct RelayState {
    sink: Arc<dyn PresenceSink>,
    config: Arc<RelayConfig>,
    /// Last payload forwarded; `None` while idle.
    last: Arc<Mutex<Option<PresencePayload>>>,
}

impl RelayState {
    pub fn new(sink: Arc<dyn PresenceSink>, config: RelayConfig) -> Self {
        Self {
            sink,
            config: Arc::new(config),
            last: Arc::new(Mutex::new(None)),
        }
    }

    /// Forward `query` to the sink, skipping repeats of the current activity.
    fn apply(&self, query: &RpcQuery) {
        let payload = PresencePayload::from_query(query, &self.config);
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);

        match payload {
            Some(payload) => {
                if last.as_ref() == Some(&payload) {
                    tracing::debug!(details = %payload.details, "Activity unchanged");
                    return;
                }
                tracing::info!(
                    details = %payload.details,
                    state = %payload.state,
                    start = ?payload.start_timestamp,
                    "Setting activity"
                );
                *last = Some(payload.clone());
                self.sink.update(payload);
            }
            None => {
                // Idle is always forwarded; clearing twice is harmless downstream.
                tracing::info!("Clearing activity");
                *last = None;
                self.sink.clear();
            }
        }
    }
}

async fn set_rpc(State(state): State<RelayState>, Query(query): Query<RpcQuery>) -> StatusCode {
    state.apply(&query);
    StatusCode::NO_CONTENT
}

/// Router with the single `/setRPC` endpoint.
pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/setRPC", get(set_rpc))
        .with_state(state)
}

/// Serve the relay on `listener` until Ctrl-C.
pub async fn serve(listener: TcpListener, state: RelayState) -> Result<(), RelayError> {
    tracing::info!(addr = %listener.local_addr()?, "Relay listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anipresence_core::AppConfig;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Update(PresencePayload),
        Clear,
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<Call>>,
    }

    impl PresenceSink for RecordingSink {
        fn update(&self, payload: PresencePayload) {
            self.calls.lock().unwrap().push(Call::Update(payload));
        }

        fn clear(&self) {
            self.calls.lock().unwrap().push(Call::Clear);
        }
    }

    fn setup() -> (Arc<RecordingSink>, Router) {
        let sink = Arc::new(RecordingSink::default());
        let state = RelayState::new(sink.clone(), AppConfig::default().relay);
        (sink, router(state))
    }

    async fn get_status(app: &Router, uri: &str) -> StatusCode {
        app.clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    const WATCHING: &str = "/setRPC?service=Prime+Video&product=SPY%C3%97FAMILY&timestamp=1700000000000&sImgKey=small_prime";

    #[tokio::test]
    async fn test_watching_update_is_forwarded() {
        let (sink, app) = setup();

        assert_eq!(get_status(&app, WATCHING).await, StatusCode::NO_CONTENT);

        let calls = sink.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            Call::Update(p) => {
                assert_eq!(p.details, "Now watching SPY×FAMILY");
                assert_eq!(p.state, "on Prime Video");
                assert_eq!(p.start_timestamp, Some(1_700_000_000_000));
                assert_eq!(p.small_image_key.as_deref(), Some("small_prime"));
            }
            other => panic!("Expected Update, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_repeated_activity_is_skipped() {
        let (sink, app) = setup();

        get_status(&app, WATCHING).await;
        get_status(&app, WATCHING).await;

        assert_eq!(sink.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_idle_is_always_forwarded() {
        let (sink, app) = setup();

        get_status(&app, "/setRPC?isIdle=true").await;
        get_status(&app, "/setRPC?isIdle=true").await;
        get_status(&app, WATCHING).await;

        let calls = sink.calls.lock().unwrap().clone();
        assert_eq!(calls[..2], [Call::Clear, Call::Clear]);
        assert!(matches!(calls[2], Call::Update(_)));
    }

    #[tokio::test]
    async fn test_same_activity_after_idle_is_forwarded_again() {
        let (sink, app) = setup();

        get_status(&app, WATCHING).await;
        get_status(&app, "/setRPC?isIdle=true").await;
        get_status(&app, WATCHING).await;

        assert_eq!(sink.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_malformed_timestamp_is_rejected() {
        let (sink, app) = setup();

        let status = get_status(&app, "/setRPC?product=x&timestamp=soon").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(sink.calls.lock().unwrap().is_empty());
    }
}
