//! Discord Rich Presence forwarding.
//!
//! Runs a `DiscordIpcClient` on a dedicated OS thread (IPC is blocking)
//! and exposes a cloneable `DiscordHandle` fed through an MPSC channel.
//! Connects lazily on the first update and reconnects after failures.

use std::sync::mpsc;

use discord_rich_presence::{activity, DiscordIpc, DiscordIpcClient};

use crate::payload::PresencePayload;
use crate::server::PresenceSink;

/// Commands sent to the Discord actor thread.
enum DiscordCommand {
    Update(PresencePayload),
    Clear,
    Shutdown,
}

/// Cloneable handle to the Discord actor thread.
#[derive(Clone)]
pub struct DiscordHandle {
    tx: mpsc::Sender<DiscordCommand>,
}

impl DiscordHandle {
    /// Spawn the Discord actor thread and return a handle.
    pub fn start(app_id: String) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();

        std::thread::Builder::new()
            .name("discord-rpc".into())
            .spawn(move || actor_loop(&app_id, rx))?;

        Ok(Self { tx })
    }

    /// Clear the activity and close the IPC connection.
    pub fn shutdown(&self) {
        let _ = self.tx.send(DiscordCommand::Shutdown);
    }
}

impl PresenceSink for DiscordHandle {
    fn update(&self, payload: PresencePayload) {
        let _ = self.tx.send(DiscordCommand::Update(payload));
    }

    fn clear(&self) {
        let _ = self.tx.send(DiscordCommand::Clear);
    }
}

/// The actor loop: owns the IPC client and processes commands.
fn actor_loop(app_id: &str, rx: mpsc::Receiver<DiscordCommand>) {
    let mut client: Option<DiscordIpcClient> = None;

    for cmd in rx {
        match cmd {
            DiscordCommand::Update(payload) => {
                // Lazy-connect on first update, and again after a failure.
                if client.is_none() {
                    let mut ipc = DiscordIpcClient::new(app_id);
                    if let Err(e) = ipc.connect() {
                        tracing::debug!(error = %e, "Discord not available");
                        continue;
                    }
                    tracing::info!("Connected to Discord IPC");
                    client = Some(ipc);
                }
                let Some(ipc) = client.as_mut() else {
                    continue;
                };

                let mut assets = activity::Assets::new()
                    .large_image(&payload.large_image_key)
                    .large_text(&payload.large_image_text);
                if let Some(key) = &payload.small_image_key {
                    assets = assets.small_image(key);
                }

                let mut activity = activity::Activity::new()
                    .details(&payload.details)
                    .assets(assets);
                if !payload.state.is_empty() {
                    activity = activity.state(&payload.state);
                }
                if let Some(start) = payload.start_timestamp {
                    activity = activity.timestamps(activity::Timestamps::new().start(start));
                }

                if let Err(e) = ipc.set_activity(activity) {
                    tracing::debug!(error = %e, "Failed to set Discord activity");
                    // Connection probably died; reconnect on the next update.
                    client = None;
                }
            }
            DiscordCommand::Clear => {
                if let Some(ipc) = client.as_mut() {
                    if let Err(e) = ipc.clear_activity() {
                        tracing::debug!(error = %e, "Failed to clear Discord activity");
                        client = None;
                    }
                }
            }
            DiscordCommand::Shutdown => {
                if let Some(ipc) = client.as_mut() {
                    let _ = ipc.clear_activity();
                    let _ = ipc.close();
                }
                break;
            }
        }
    }
}
