//! Telegram adapter: the outbound messenger the dispatcher pushes through,
//! plus the inbound webhook commands that create subscriptions. Thin by
//! design - every decision of consequence lives in the core crate.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use clickrace_core::constants::DEFAULT_TOP_N;
use clickrace_core::dispatch::{
    render_update, welcome_keyboard, Keyboard, KeyboardButton, MessengerError, MessengerTrait,
};

use crate::main_lib::AppState;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Error envelope of a failed Bot API call.
#[derive(Debug, Deserialize, Default)]
struct TgApiError {
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<TgErrorParameters>,
}

#[derive(Debug, Deserialize, Default)]
struct TgErrorParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

/// Maps a failed Bot API response onto the dispatcher's outcome taxonomy.
fn classify_api_error(status: u16, error: &TgApiError) -> MessengerError {
    if status == 429 || error.error_code == Some(429) {
        return MessengerError::RateLimited {
            retry_after: error.parameters.as_ref().and_then(|p| p.retry_after),
        };
    }
    let description = error.description.as_deref().unwrap_or_default();
    if description.contains("message to edit not found")
        || description.contains("message can't be edited")
    {
        return MessengerError::MessageGone;
    }
    MessengerError::Delivery(format!("telegram api {status}: {description}"))
}

fn keyboard_markup(keyboard: &Keyboard) -> Value {
    let rows: Vec<Vec<Value>> = keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|button| match button {
                    KeyboardButton::WebApp { label, url } => {
                        json!({ "text": label, "web_app": { "url": url } })
                    }
                    KeyboardButton::Callback { label, data } => {
                        json!({ "text": label, "callback_data": data })
                    }
                })
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}

/// Bot API client implementing the core messenger seam.
pub struct TelegramMessenger {
    client: Client,
    api_base: String,
    token: String,
}

impl TelegramMessenger {
    pub fn new(token: impl Into<String>) -> Self {
        TelegramMessenger {
            client: Client::new(),
            api_base: TELEGRAM_API_BASE.to_string(),
            token: token.into(),
        }
    }

    async fn call(&self, method: &str, payload: Value) -> Result<Value, MessengerError> {
        let url = format!("{}/bot{}/{method}", self.api_base, self.token);
        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| MessengerError::Delivery(e.to_string()))?;

        let status = response.status().as_u16();
        let body: Value = response
            .json()
            .await
            .map_err(|e| MessengerError::Delivery(e.to_string()))?;

        if body.get("ok").and_then(Value::as_bool) == Some(true) {
            return Ok(body.get("result").cloned().unwrap_or(Value::Null));
        }
        let error: TgApiError = serde_json::from_value(body).unwrap_or_default();
        Err(classify_api_error(status, &error))
    }

    /// Sends the welcome message and returns its message id (the future
    /// edit target).
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: &Keyboard,
    ) -> Result<i64, MessengerError> {
        let result = self
            .call(
                "sendMessage",
                json!({
                    "chat_id": chat_id,
                    "text": text,
                    "parse_mode": "HTML",
                    "reply_markup": keyboard_markup(keyboard),
                }),
            )
            .await?;
        result
            .get("message_id")
            .and_then(Value::as_i64)
            .ok_or_else(|| MessengerError::Delivery("sendMessage returned no message id".into()))
    }

    pub async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), MessengerError> {
        let mut payload = json!({ "callback_query_id": callback_id });
        if let Some(text) = text {
            payload["text"] = json!(text);
        }
        self.call("answerCallbackQuery", payload).await.map(|_| ())
    }
}

#[async_trait]
impl MessengerTrait for TelegramMessenger {
    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: &Keyboard,
    ) -> Result<(), MessengerError> {
        self.call(
            "editMessageText",
            json!({
                "chat_id": chat_id,
                "message_id": message_id,
                "text": text,
                "parse_mode": "HTML",
                "reply_markup": keyboard_markup(keyboard),
            }),
        )
        .await
        .map(|_| ())
    }
}

// --- Inbound webhook -------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TgUpdate {
    #[serde(default)]
    message: Option<TgMessage>,
    #[serde(default)]
    callback_query: Option<TgCallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    message_id: i64,
    chat: TgChat,
    #[serde(default)]
    from: Option<TgUser>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    id: i64,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgCallbackQuery {
    id: String,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    message: Option<TgMessage>,
    from: TgUser,
}

/// Builds the current broadcast body for one subscriber.
async fn snapshot_text(state: &AppState, user_id: i64, username: Option<&str>) -> anyhow::Result<String> {
    let me = state
        .counter_service
        .get_or_create_user(user_id, username)
        .await?;
    let global = state.counter_service.read_global_stable().await?;
    let top = state.counter_service.get_top(DEFAULT_TOP_N).await?;
    Ok(render_update(me.total, global, &top))
}

async fn handle_start(state: &AppState, message: &TgMessage) -> anyhow::Result<()> {
    let Some(from) = &message.from else {
        return Ok(());
    };
    let chat_id = message.chat.id;
    let text = snapshot_text(state, from.id, from.username.as_deref()).await?;
    let keyboard = welcome_keyboard(&state.miniapp_url);
    let message_id = state
        .telegram
        .send_message(chat_id, &text, &keyboard)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    // The sent message becomes the live edit target.
    state.registry.subscribe(chat_id, message_id);
    Ok(())
}

async fn handle_refresh(state: &AppState, callback: &TgCallbackQuery) -> anyhow::Result<()> {
    let Some(message) = &callback.message else {
        return Ok(());
    };
    let chat_id = message.chat.id;
    let text = snapshot_text(state, callback.from.id, callback.from.username.as_deref()).await?;
    let keyboard = welcome_keyboard(&state.miniapp_url);

    if let Err(e) = state
        .telegram
        .edit_message(chat_id, message.message_id, &text, &keyboard)
        .await
    {
        // An unedited message is not worth surfacing to the subscriber.
        warn!("manual refresh edit failed for chat {chat_id}: {e}");
        let _ = state.telegram.answer_callback(&callback.id, None).await;
        return Ok(());
    }

    let _ = state
        .telegram
        .answer_callback(&callback.id, Some("Refreshed ✅"))
        .await;
    state.registry.subscribe(chat_id, message.message_id);
    Ok(())
}

/// Webhook entry point. Always answers 200: Telegram retries non-2xx
/// responses and a broken update must not wedge the queue.
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    Json(update): Json<TgUpdate>,
) -> StatusCode {
    if let Some(message) = &update.message {
        let is_start = message
            .text
            .as_deref()
            .is_some_and(|text| text.trim().starts_with("/start"));
        if is_start {
            if let Err(e) = handle_start(&state, message).await {
                warn!("/start handling failed for chat {}: {e}", message.chat.id);
            }
        }
    }

    if let Some(callback) = &update.callback_query {
        if callback.data.as_deref() == Some("refresh") {
            if let Err(e) = handle_refresh(&state, callback).await {
                warn!("refresh handling failed: {e}");
            }
        }
    }

    StatusCode::OK
}
