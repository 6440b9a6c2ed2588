//! Telegram channel: long-polls the Bot API for messages and button presses.
//!
//! Text commands and main-menu buttons become actions; inline button
//! callback data carries an option code or `finish_day`.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::channels::{Channel, IncomingUpdate, UpdateStream};
use crate::config::BotConfig;
use crate::controller::Action;
use crate::error::ChannelError;
use crate::render::{FINISH_DAY, MENU_HISTORY, MENU_STATS, MENU_TODAY, Markup, OutgoingReply};

const NAME: &str = "telegram";

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Extra time on top of the long-poll timeout before the HTTP request gives up.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Telegram channel: connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: SecretString,
    allowed_users: Vec<String>,
    poll_timeout: Duration,
    api_base: String,
    /// Next `getUpdates` offset. Outlives each poll task so a restarted
    /// stream resumes after the last update already handed out.
    offset: Arc<AtomicI64>,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString, allowed_users: Vec<String>) -> Self {
        Self {
            bot_token,
            allowed_users,
            poll_timeout: Duration::from_secs(20),
            api_base: DEFAULT_API_BASE.into(),
            offset: Arc::new(AtomicI64::new(0)),
            client: reqwest::Client::new(),
        }
    }

    /// Talk to a different Bot API server, e.g. a self-hosted one.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn from_config(config: &BotConfig) -> Self {
        let mut channel = Self::new(
            SecretString::from(config.token.expose_secret().to_owned()),
            config.allowed_users.clone(),
        );
        channel.poll_timeout = config.poll_timeout;
        channel
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.api_base,
            self.bot_token.expose_secret()
        )
    }

    /// Check if a username or numeric id is in the allowed list.
    pub fn is_user_allowed(&self, identity: &str) -> bool {
        check_user_allowed(&self.allowed_users, [identity])
    }

    async fn call(&self, method: &str, body: &Value) -> Result<(), ChannelError> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: NAME.into(),
                reason: format!("{method}: {}", e.without_url()),
            })?;

        if resp.status().is_success() {
            return Ok(());
        }

        let status = resp.status();
        let err = resp.text().await.unwrap_or_default();
        Err(ChannelError::SendFailed {
            name: NAME.into(),
            reason: format!("{method} returned {status}: {err}"),
        })
    }

    async fn send_message(&self, chat_id: i64, reply: &OutgoingReply) -> Result<(), ChannelError> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "text": reply.text,
        });
        if let Some(markup) = &reply.markup {
            body["reply_markup"] = markup_json(markup);
        }
        self.call("sendMessage", &body).await
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        reply: &OutgoingReply,
    ) -> Result<(), ChannelError> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": reply.text,
        });
        // Only inline keyboards can be attached to an edited message.
        if let Some(markup @ Markup::Inline(_)) = &reply.markup {
            body["reply_markup"] = markup_json(markup);
        }
        self.call("editMessageText", &body).await
    }

    async fn deliver(&self, update: &IncomingUpdate, reply: &OutgoingReply) -> Result<(), ChannelError> {
        let Some(message_id) = update.message_id.filter(|_| reply.edit_in_place) else {
            return self.send_message(update.chat_id, reply).await;
        };
        match self.edit_message(update.chat_id, message_id, reply).await {
            Ok(()) => Ok(()),
            // Pressing an already-picked option leaves the card unchanged.
            Err(e) if is_not_modified(&e) => Ok(()),
            Err(e) => {
                tracing::warn!(error = %e, "Telegram edit failed; sending a new message");
                self.send_message(update.chat_id, reply).await
            }
        }
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        notice: Option<&str>,
    ) -> Result<(), ChannelError> {
        let mut body = serde_json::json!({ "callback_query_id": callback_id });
        if let Some(text) = notice {
            body["text"] = Value::from(text);
        }
        self.call("answerCallbackQuery", &body).await
    }
}

// ── Channel trait implementation ────────────────────────────────────

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        NAME
    }

    async fn start(&self) -> Result<UpdateStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let url = self.api_url("getUpdates");
        let allowed_users = self.allowed_users.clone();
        let client = self.client.clone();
        let poll_timeout = self.poll_timeout;
        let offset = Arc::clone(&self.offset);

        tokio::spawn(async move {
            tracing::info!(
                offset = offset.load(Ordering::Acquire),
                "Telegram channel listening for updates..."
            );

            loop {
                let body = serde_json::json!({
                    "offset": offset.load(Ordering::Acquire),
                    "timeout": poll_timeout.as_secs(),
                    "allowed_updates": ["message", "callback_query"]
                });

                let results = match poll_once(&client, &url, &body, poll_timeout).await {
                    Ok(results) => results,
                    Err(e) => {
                        // The receiver ends the stream on the first error.
                        let _ = tx.send(Err(e));
                        return;
                    }
                };

                for update in &results {
                    // Advance offset past this update
                    if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                        offset.fetch_max(uid + 1, Ordering::AcqRel);
                    }

                    match parse_update(update, &allowed_users) {
                        Parsed::Update(incoming) => {
                            if tx.send(Ok(incoming)).is_err() {
                                tracing::info!("Telegram listener channel closed");
                                return;
                            }
                        }
                        Parsed::Unauthorized { identity } => {
                            tracing::warn!(identity, "Telegram: ignoring update from unauthorized user");
                        }
                        Parsed::Skip => {}
                    }
                }
            }
        });

        let stream = futures::stream::unfold((rx, false), |(mut rx, done)| async move {
            if done {
                return None;
            }
            let item = rx.recv().await?;
            let done = item.is_err();
            Some((item, (rx, done)))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        update: &IncomingUpdate,
        reply: Option<OutgoingReply>,
    ) -> Result<(), ChannelError> {
        let sent = match &reply {
            Some(reply) => self.deliver(update, reply).await,
            None => Ok(()),
        };

        // Always acknowledge the button press, even if delivery failed.
        if let Some(callback_id) = &update.callback_id {
            let notice = reply.as_ref().and_then(|r| r.notice.as_deref());
            self.answer_callback(callback_id, notice).await?;
        }
        sent
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: NAME.into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: NAME.into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// One `getUpdates` round trip.
async fn poll_once(
    client: &reqwest::Client,
    url: &str,
    body: &Value,
    poll_timeout: Duration,
) -> Result<Vec<Value>, ChannelError> {
    let resp = client
        .post(url)
        .json(body)
        .timeout(poll_timeout + POLL_GRACE)
        .send()
        .await
        .map_err(|e| ChannelError::Disconnected {
            name: NAME.into(),
            reason: format!("poll error: {}", e.without_url()),
        })?;

    let status = resp.status();
    if let Some(err) = poll_status_error(status.as_u16()) {
        return Err(err);
    }

    let data: Value = resp.json().await.map_err(|e| ChannelError::Disconnected {
        name: NAME.into(),
        reason: format!("parse error: {}", e.without_url()),
    })?;

    if data.get("ok").and_then(Value::as_bool) != Some(true) {
        let description = data
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(ChannelError::Disconnected {
            name: NAME.into(),
            reason: format!("getUpdates failed: {description}"),
        });
    }

    Ok(data
        .get("result")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default())
}

fn is_not_modified(err: &ChannelError) -> bool {
    matches!(err, ChannelError::SendFailed { reason, .. } if reason.contains("message is not modified"))
}

/// Classify a non-success `getUpdates` status.
fn poll_status_error(status: u16) -> Option<ChannelError> {
    match status {
        200..=299 => None,
        409 => Some(ChannelError::Conflict { name: NAME.into() }),
        401 | 404 => Some(ChannelError::StartupFailed {
            name: NAME.into(),
            reason: format!("getUpdates returned {status}; check TELEGRAM_BOT_TOKEN"),
        }),
        _ => Some(ChannelError::Disconnected {
            name: NAME.into(),
            reason: format!("getUpdates returned {status}"),
        }),
    }
}

/// What a raw update turned into.
#[derive(Debug, PartialEq)]
enum Parsed {
    Update(IncomingUpdate),
    Unauthorized { identity: String },
    Skip,
}

/// Map a raw `getUpdates` entry to an action, enforcing the allowlist.
fn parse_update(update: &Value, allowed_users: &[String]) -> Parsed {
    if let Some(query) = update.get("callback_query") {
        return parse_callback(query, allowed_users);
    }
    if let Some(message) = update.get("message") {
        return parse_message(message, allowed_users);
    }
    Parsed::Skip
}

fn parse_message(message: &Value, allowed_users: &[String]) -> Parsed {
    let Some(text) = message.get("text").and_then(Value::as_str) else {
        return Parsed::Skip;
    };
    let Some(chat_id) = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(Value::as_i64)
    else {
        return Parsed::Skip;
    };
    let Some(from) = message.get("from") else {
        return Parsed::Skip;
    };
    let user_id = match sender(from, allowed_users) {
        Ok(user_id) => user_id,
        Err(parsed) => return parsed,
    };

    Parsed::Update(IncomingUpdate {
        user_id,
        chat_id,
        message_id: None,
        callback_id: None,
        action: action_for_text(user_id, text),
    })
}

fn parse_callback(query: &Value, allowed_users: &[String]) -> Parsed {
    let Some(callback_id) = query.get("id").and_then(Value::as_str) else {
        return Parsed::Skip;
    };
    let Some(from) = query.get("from") else {
        return Parsed::Skip;
    };
    let user_id = match sender(from, allowed_users) {
        Ok(user_id) => user_id,
        Err(parsed) => return parsed,
    };

    let message = query.get("message");
    // Inline-mode callbacks carry no message; answer in the user's private chat.
    let chat_id = message
        .and_then(|m| m.get("chat"))
        .and_then(|c| c.get("id"))
        .and_then(Value::as_i64)
        .unwrap_or(user_id);
    let message_id = message
        .and_then(|m| m.get("message_id"))
        .and_then(Value::as_i64);
    let data = query.get("data").and_then(Value::as_str).unwrap_or_default();

    Parsed::Update(IncomingUpdate {
        user_id,
        chat_id,
        message_id,
        callback_id: Some(callback_id.to_string()),
        action: action_for_callback(user_id, data),
    })
}

/// Extract the sender id and check it, and the username, against the allowlist.
fn sender(from: &Value, allowed_users: &[String]) -> Result<i64, Parsed> {
    let Some(user_id) = from.get("id").and_then(Value::as_i64) else {
        return Err(Parsed::Skip);
    };
    let user_id_str = user_id.to_string();
    let username = from.get("username").and_then(Value::as_str);

    let mut identities = vec![user_id_str.as_str()];
    if let Some(name) = username {
        identities.push(name);
    }
    if !check_user_allowed(allowed_users, identities) {
        return Err(Parsed::Unauthorized {
            identity: format!("{}/{user_id}", username.unwrap_or("unknown")),
        });
    }
    Ok(user_id)
}

/// Map message text to an action. Anything unrecognized shows help.
fn action_for_text(user_id: i64, text: &str) -> Action {
    let text = text.trim();
    // "/stats@SomeBot" in group chats
    let command = text.split('@').next().unwrap_or(text);
    match command {
        "/start" | "/today" | MENU_TODAY => Action::StartSession { user_id },
        "/stats" | MENU_STATS => Action::QueryStats { user_id },
        "/history" | MENU_HISTORY => Action::ShowHistory { user_id },
        _ => Action::Help { user_id },
    }
}

fn action_for_callback(user_id: i64, data: &str) -> Action {
    if data == FINISH_DAY {
        Action::Finalize { user_id }
    } else {
        Action::SelectCategory {
            user_id,
            option_code: data.to_string(),
        }
    }
}

/// Bot API `reply_markup` for a keyboard.
fn markup_json(markup: &Markup) -> Value {
    match markup {
        Markup::Inline(rows) => {
            let rows: Vec<Vec<Value>> = rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|b| {
                            serde_json::json!({
                                "text": b.text,
                                "callback_data": b.callback_data,
                            })
                        })
                        .collect()
                })
                .collect();
            serde_json::json!({ "inline_keyboard": rows })
        }
        Markup::MainMenu => serde_json::json!({
            "keyboard": [
                [{ "text": MENU_TODAY }],
                [{ "text": MENU_STATS }, { "text": MENU_HISTORY }],
            ],
            "resize_keyboard": true,
        }),
    }
}

/// Check if any identity in the iterator matches the allowed users list.
fn check_user_allowed<'a>(
    allowed_users: &[String],
    identities: impl IntoIterator<Item = &'a str>,
) -> bool {
    let ids: Vec<&str> = identities.into_iter().collect();
    allowed_users
        .iter()
        .any(|u| u == "*" || ids.contains(&u.as_str()))
}

// ── Tests ───────────────────────────────────────────────────────────
