use axum::{
    extract::{ws::Message, State, WebSocketUpgrade},
    response::Response,
};
use axum::extract::ws::WebSocket;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::controller::EditorState;
use crate::handlers;
use crate::languages::{highlight_language, LANGUAGES, PHP_EXAMPLES};
use crate::state::AppState;

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let client_uid = state.generate_client_uid();
    info!("New WebSocket connection: {}", client_uid);

    let controller = state.open_session(&client_uid);
    let mut updates = controller.subscribe();
    let (mut sender, mut receiver) = socket.split();

    let init = init_message(&updates.borrow_and_update());
    if let Err(e) = sender.send(Message::Text(init.to_string())).await {
        error!("Failed to send initial message: {}", e);
        state.close_session(&client_uid);
        return;
    }

    // Push every controller transition to the page.
    let forward = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let msg = state_message(&updates.borrow_and_update());
            if sender.send(Message::Text(msg.to_string())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Err(e) = handlers::handle_message(&state, &client_uid, &controller, &text) {
                    error!("Error handling message: {}", e);
                }
            }
            Ok(Message::Close(_)) => {
                info!("Client {} disconnected", client_uid);
                break;
            }
            Err(e) => {
                error!("WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    forward.abort();
    state.close_session(&client_uid);
    info!("Cleaned up client {}", client_uid);
}

/// First message on a connection: picker contents plus the initial state.
pub fn init_message(state: &EditorState) -> Value {
    json!({
        "type": "init",
        "languages": LANGUAGES
            .iter()
            .map(|name| json!({"name": name, "token": highlight_language(name)}))
            .collect::<Vec<_>>(),
        "examples": PHP_EXAMPLES,
        "state": state,
    })
}

pub fn state_message(state: &EditorState) -> Value {
    json!({
        "type": "state",
        "state": state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_message_lists_languages_with_tokens() {
        let msg = init_message(&EditorState::default());
        assert_eq!(msg["type"], "init");
        assert_eq!(msg["languages"].as_array().map(Vec::len), Some(LANGUAGES.len()));
        assert_eq!(msg["languages"][0], json!({"name": "C#", "token": "csharp"}));
        assert_eq!(msg["examples"][3]["name"], "Simple Class");
        assert_eq!(msg["state"]["sourceLanguage"], "PHP");
        assert_eq!(msg["state"]["targetLanguage"], "JavaScript");
    }

    #[test]
    fn state_message_uses_camel_case_fields() {
        let state = EditorState {
            converted_code: "x".into(),
            is_loading: true,
            ..EditorState::default()
        };
        let msg = state_message(&state);
        assert_eq!(msg["state"]["convertedCode"], "x");
        assert_eq!(msg["state"]["isLoading"], true);
        assert_eq!(msg["state"]["error"], Value::Null);
    }
}
