//! Dispatch loop: feeds channel updates through the controller one at a time.

use std::sync::Arc;

use futures::StreamExt;

use crate::channels::{Channel, IncomingUpdate};
use crate::controller::Controller;
use crate::error::ChannelError;
use crate::render;

/// Connects one channel to the controller.
pub struct Bot {
    controller: Arc<Controller>,
    channel: Arc<dyn Channel>,
}

impl Bot {
    pub fn new(controller: Arc<Controller>, channel: Arc<dyn Channel>) -> Self {
        Self {
            controller,
            channel,
        }
    }

    pub fn channel_name(&self) -> &str {
        self.channel.name()
    }

    /// Start the channel and process updates strictly in arrival order.
    ///
    /// Returns only with an error: either the transport failed or its
    /// stream ended. Shutdown is done by dropping this future.
    pub async fn run(&self) -> Result<(), ChannelError> {
        let mut updates = self.channel.start().await?;

        while let Some(item) = updates.next().await {
            let update = item?;
            self.dispatch(&update).await;
        }

        tracing::info!(channel = self.channel.name(), "Update stream ended");
        Err(ChannelError::Disconnected {
            name: self.channel.name().to_string(),
            reason: "update stream ended".into(),
        })
    }

    /// Handle one update and deliver the reply. Delivery failures are logged
    /// and do not stop the loop.
    pub async fn dispatch(&self, update: &IncomingUpdate) {
        tracing::debug!(
            user_id = update.user_id,
            action = ?update.action,
            "Dispatching update"
        );

        let reply = self.controller.handle(update.action.clone()).await;
        let rendered = render::render(&reply);

        if let Err(e) = self.channel.respond(update, rendered).await {
            tracing::error!(user_id = update.user_id, error = %e, "Failed to deliver reply");
        }
    }

    pub async fn shutdown(&self) -> Result<(), ChannelError> {
        self.channel.shutdown().await
    }
}
