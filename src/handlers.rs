use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::controller::EditorController;
use crate::state::AppState;

/// Apply one client message to the connection's controller.
///
/// `convert` and `format` run as background tasks so the socket keeps
/// reading while the model answers.
pub fn handle_message(
    state: &AppState,
    client_uid: &str,
    controller: &Arc<EditorController>,
    text: &str,
) -> anyhow::Result<()> {
    let msg: Value = serde_json::from_str(text)?;
    let msg_type = msg.get("type").and_then(|v| v.as_str());
    debug!("Message from {}: {:?}", client_uid, msg_type);

    match msg_type {
        Some("set-source-code") => {
            controller.set_source_code(string_field(&msg, "code")?.to_string());
        }
        Some("set-source-language") => {
            controller.set_source_language(string_field(&msg, "language")?);
        }
        Some("set-target-language") => {
            controller.set_target_language(string_field(&msg, "language")?);
        }
        Some("swap-languages") => controller.swap_languages(),
        Some("clear-source") => controller.clear_source(),
        Some("load-example") => {
            controller.load_named_example(string_field(&msg, "name")?);
        }
        Some("copy-result") => {
            controller.mark_copied();
        }
        Some("convert") => {
            let editor = Arc::clone(controller);
            let task = tokio::spawn(async move { editor.request_conversion().await });
            state.track_task(client_uid, task.abort_handle());
        }
        Some("format") => {
            let editor = Arc::clone(controller);
            let task = tokio::spawn(async move { editor.request_format().await });
            state.track_task(client_uid, task.abort_handle());
        }
        _ => {
            warn!("Unknown message type: {:?}", msg_type);
        }
    }

    Ok(())
}

fn string_field<'a>(msg: &'a Value, field: &str) -> anyhow::Result<&'a str> {
    msg.get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("{} is required", field))
}
