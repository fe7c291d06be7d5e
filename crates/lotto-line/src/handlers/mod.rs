//! Inbound event handling.
//!
//! Every message event first refreshes the sender group in the registry (when
//! recall is on); text messages are then matched against the command table.

use tracing::{debug, warn};

use crate::{router::AppState, webhook::InboundEvent};

mod commands;

pub use commands::Command;

pub async fn handle_event(state: &AppState, event: InboundEvent) {
    if event.is_message {
        remember_group(state, &event).await;
    }

    let Some(text) = event.text.as_deref() else {
        return;
    };
    match Command::parse(text) {
        Some(cmd) => {
            debug!(?cmd, "handling command");
            commands::run(state, &event.ctx, cmd).await;
        }
        None => debug!("ignoring non-command text"),
    }
}

/// Upsert the sender group with its current display name.
async fn remember_group(state: &AppState, event: &InboundEvent) {
    let Some(group_id) = event.ctx.group_id() else {
        return;
    };
    let registry = state.registry();
    if !registry.is_enabled().await {
        return;
    }

    let name = match state.dispatcher.platform().group_name(group_id).await {
        Ok(name) => name,
        Err(e) => {
            warn!(group_id, error = %e, "group summary lookup failed");
            None
        }
    };
    // Without a fresh name the registry keeps the previous one, or the id.
    registry.upsert(group_id, name.as_deref()).await;
}
