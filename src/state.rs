use dashmap::DashMap;
use std::sync::Arc;
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::config::Config;
use crate::controller::EditorController;
use crate::converter::ConversionClient;
use crate::llm::CodeModel;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub client: ConversionClient,
    pub sessions: Arc<DashMap<String, Arc<EditorController>>>,
    pub running_tasks: Arc<DashMap<String, Vec<AbortHandle>>>,
}

impl AppState {
    pub fn new(config: Config, llm: Arc<dyn CodeModel>) -> Self {
        let client = ConversionClient::from_config(llm, &config.llm_config);
        Self {
            config,
            client,
            sessions: Arc::new(DashMap::new()),
            running_tasks: Arc::new(DashMap::new()),
        }
    }

    pub fn generate_client_uid(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Create and register the editor controller for a new connection.
    pub fn open_session(&self, client_uid: &str) -> Arc<EditorController> {
        let controller = Arc::new(EditorController::new(
            self.client.clone(),
            &self.config.ui_config,
        ));
        self.sessions
            .insert(client_uid.to_string(), Arc::clone(&controller));
        controller
    }

    /// Remember a spawned operation so it can be aborted on disconnect.
    pub fn track_task(&self, client_uid: &str, handle: AbortHandle) {
        let mut tasks = self.running_tasks.entry(client_uid.to_string()).or_default();
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    /// Drop the connection's controller and abort whatever it still runs,
    /// including its pending dismiss timers.
    pub fn close_session(&self, client_uid: &str) {
        if let Some((_, controller)) = self.sessions.remove(client_uid) {
            controller.shutdown();
        }
        if let Some((_, tasks)) = self.running_tasks.remove(client_uid) {
            for task in tasks {
                task.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedLLM;
    use std::time::Duration;

    #[tokio::test]
    async fn closing_a_session_aborts_its_tasks() {
        let state = AppState::new(Config::default(), Arc::new(ScriptedLLM::default()));
        let uid = state.generate_client_uid();
        state.open_session(&uid);
        assert_eq!(state.sessions.len(), 1);

        let task = tokio::spawn(tokio::time::sleep(Duration::from_secs(60)));
        state.track_task(&uid, task.abort_handle());

        state.close_session(&uid);
        assert!(state.sessions.is_empty());
        assert!(task.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn closing_a_session_releases_its_state_channel() {
        let state = AppState::new(Config::default(), Arc::new(ScriptedLLM::default()));
        let uid = state.generate_client_uid();
        let editor = state.open_session(&uid);

        // Arms the five second error timer
        editor.set_target_language("COBOL");
        let mut updates = editor.subscribe();
        drop(editor);

        state.close_session(&uid);
        let closed = tokio::time::timeout(Duration::from_secs(1), updates.changed()).await;
        assert!(matches!(closed, Ok(Err(_))));
    }
}
