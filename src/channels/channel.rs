//! The `Channel` trait and the update type every transport produces.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::controller::Action;
use crate::error::ChannelError;
use crate::render::OutgoingReply;

/// One user action delivered by a transport, with the addressing needed
/// to answer it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingUpdate {
    pub user_id: i64,
    pub chat_id: i64,
    /// Message the pressed button belongs to.
    pub message_id: Option<i64>,
    /// Set for button presses; the transport must acknowledge these.
    pub callback_id: Option<String>,
    pub action: Action,
}

/// Updates in arrival order. An `Err` item ends the stream; the supervisor
/// decides whether to restart it.
pub type UpdateStream = Pin<Box<dyn Stream<Item = Result<IncomingUpdate, ChannelError>> + Send>>;

/// A chat transport.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Begin receiving updates.
    async fn start(&self) -> Result<UpdateStream, ChannelError>;

    /// Deliver a rendered reply. `reply` is `None` when there is nothing to
    /// show, but button presses still have to be acknowledged.
    async fn respond(
        &self,
        update: &IncomingUpdate,
        reply: Option<OutgoingReply>,
    ) -> Result<(), ChannelError>;

    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError>;
}
