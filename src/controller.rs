use futures::StreamExt;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::config::UiConfig;
use crate::converter::{ConversionClient, ConversionRequest};
use crate::error::ConversionError;
use crate::languages::{self, DEFAULT_SOURCE_LANGUAGE, DEFAULT_TARGET_LANGUAGE};

pub const EMPTY_FORMAT_INPUT: &str = "Please enter some PHP code to format.";
pub const SAME_LANGUAGES: &str = "Source and target languages cannot be the same.";

/// Everything the editor page renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorState {
    pub source_code: String,
    pub converted_code: String,
    pub source_language: String,
    pub target_language: String,
    pub is_loading: bool,
    pub is_formatting: bool,
    pub error: Option<String>,
    pub copied: bool,
}

impl Default for EditorState {
    fn default() -> Self {
        Self {
            source_code: String::new(),
            converted_code: String::new(),
            source_language: DEFAULT_SOURCE_LANGUAGE.to_string(),
            target_language: DEFAULT_TARGET_LANGUAGE.to_string(),
            is_loading: false,
            is_formatting: false,
            error: None,
            copied: false,
        }
    }
}

/// Sole mutator of one editor's [`EditorState`].
///
/// Every change goes through a single `watch` update, so subscribers never
/// observe a half-applied transition.
///
/// Overlapping conversions are resolved by generation: each
/// [`request_conversion`](Self::request_conversion) supersedes the previous
/// one, whose remaining chunks are dropped and whose stream is no longer read.
/// Generations are bumped and compared only while the `watch` value is held
/// for writing. Formats follow the same rule with their own counter.
pub struct EditorController {
    client: ConversionClient,
    state: Arc<watch::Sender<EditorState>>,
    generation: AtomicU64,
    format_generation: AtomicU64,
    error_seq: Arc<AtomicU64>,
    copy_seq: Arc<AtomicU64>,
    error_timer: Mutex<Option<AbortHandle>>,
    copy_timer: Mutex<Option<AbortHandle>>,
    error_dismiss: Duration,
    copy_feedback: Duration,
}

impl EditorController {
    pub fn new(client: ConversionClient, ui: &UiConfig) -> Self {
        let (state, _) = watch::channel(EditorState::default());
        Self {
            client,
            state: Arc::new(state),
            generation: AtomicU64::new(0),
            format_generation: AtomicU64::new(0),
            error_seq: Arc::new(AtomicU64::new(0)),
            copy_seq: Arc::new(AtomicU64::new(0)),
            error_timer: Mutex::new(None),
            copy_timer: Mutex::new(None),
            error_dismiss: ui.error_dismiss(),
            copy_feedback: ui.copy_feedback(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<EditorState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> EditorState {
        self.state.borrow().clone()
    }

    pub fn set_source_code(&self, code: String) {
        self.state.send_if_modified(|s| {
            if s.source_code == code {
                return false;
            }
            s.source_code = code;
            true
        });
    }

    pub fn set_source_language(&self, language: &str) {
        if !languages::is_supported(language) {
            self.set_error(format!("Unsupported language: {language}"));
            return;
        }
        self.state.send_modify(|s| s.source_language = language.to_string());
    }

    pub fn set_target_language(&self, language: &str) {
        if !languages::is_supported(language) {
            self.set_error(format!("Unsupported language: {language}"));
            return;
        }
        self.state.send_modify(|s| {
            s.target_language = language.to_string();
            s.copied = false;
        });
    }

    /// Exchange source and target in one transition.
    pub fn swap_languages(&self) {
        self.state.send_modify(|s| {
            std::mem::swap(&mut s.source_language, &mut s.target_language);
            s.copied = false;
        });
    }

    /// Empty the source pane. Result and error are left alone.
    pub fn clear_source(&self) {
        self.state.send_modify(|s| s.source_code.clear());
    }

    pub fn load_example(&self, code: &str) {
        self.state.send_modify(|s| {
            s.source_code = code.to_string();
            s.error = None;
            s.converted_code.clear();
            s.copied = false;
        });
    }

    pub fn load_named_example(&self, name: &str) {
        match languages::find_example(name) {
            Some(example) => self.load_example(example.code),
            None => self.set_error(format!("Unknown example: {name}")),
        }
    }

    /// Convert the current source, streaming the result into the output pane.
    pub async fn request_conversion(&self) {
        let (code, source_language, target_language) = {
            let s = self.state.borrow();
            (
                s.source_code.clone(),
                s.source_language.clone(),
                s.target_language.clone(),
            )
        };

        if code.trim().is_empty() {
            self.set_error(format!("Please enter some {source_language} code to convert."));
            return;
        }
        if source_language == target_language {
            self.set_error(SAME_LANGUAGES.to_string());
            return;
        }

        let mut generation = 0;
        self.state.send_modify(|s| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            s.is_loading = true;
            s.error = None;
            s.converted_code.clear();
            s.copied = false;
        });

        let request = ConversionRequest {
            code,
            source_language,
            target_language,
        };
        let outcome = self.pull_conversion(generation, &request).await;
        let succeeded = outcome.is_ok();
        let failure = outcome.err().map(|err| err.message);

        let finished = self.state.send_if_modified(|s| {
            if !self.is_current(generation) {
                return false;
            }
            s.is_loading = false;
            if let Some(message) = failure {
                self.raise_error(s, message);
            }
            true
        });

        if !finished {
            debug!("Conversion {} superseded, discarding outcome", generation);
        } else if succeeded {
            info!("Conversion {} complete", generation);
        }
    }

    async fn pull_conversion(&self, generation: u64, request: &ConversionRequest) -> Result<(), ConversionError> {
        let mut stream = self.client.convert_stream(request).await?;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            let applied = self.state.send_if_modified(|s| {
                if !self.is_current(generation) {
                    return false;
                }
                s.converted_code.push_str(&chunk);
                true
            });
            if !applied {
                return Ok(());
            }
        }
        Ok(())
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Reformat the source pane to PSR-12, replacing its contents on success.
    /// A newer format request discards the result of an older one.
    pub async fn request_format(&self) {
        let code = self.state.borrow().source_code.clone();
        if code.trim().is_empty() {
            self.set_error(EMPTY_FORMAT_INPUT.to_string());
            return;
        }

        let mut generation = 0;
        self.state.send_modify(|s| {
            generation = self.format_generation.fetch_add(1, Ordering::SeqCst) + 1;
            s.is_formatting = true;
            s.error = None;
        });

        let outcome = self.client.format(&code).await;

        let applied = self.state.send_if_modified(|s| {
            if self.format_generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            s.is_formatting = false;
            match outcome {
                Ok(formatted) => s.source_code = formatted,
                Err(err) => self.raise_error(s, err.message),
            }
            true
        });
        if !applied {
            debug!("Format {} superseded, discarding result", generation);
        }
    }

    /// Flag the result as copied; the flag drops after the feedback delay.
    /// Returns false when there is nothing to copy.
    pub fn mark_copied(&self) -> bool {
        self.state.send_if_modified(|s| {
            if s.converted_code.is_empty() {
                return false;
            }
            let seq = self.copy_seq.fetch_add(1, Ordering::SeqCst) + 1;
            s.copied = true;

            let state = Arc::clone(&self.state);
            let copy_seq = Arc::clone(&self.copy_seq);
            let delay = self.copy_feedback;
            let timer = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                state.send_if_modified(|s| {
                    copy_seq.load(Ordering::SeqCst) == seq && std::mem::replace(&mut s.copied, false)
                });
            });
            replace_timer(&self.copy_timer, timer.abort_handle());
            true
        })
    }

    /// Abort pending dismiss timers so nothing outlives the connection.
    pub fn shutdown(&self) {
        for slot in [&self.error_timer, &self.copy_timer] {
            let pending = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
            if let Some(timer) = pending {
                timer.abort();
            }
        }
    }

    fn set_error(&self, message: String) {
        self.state.send_modify(|s| self.raise_error(s, message));
    }

    /// Show `message` and schedule its removal unless a newer error replaces it.
    /// Must run inside a `watch` write so the sequence number and the error
    /// change together.
    fn raise_error(&self, s: &mut EditorState, message: String) {
        warn!("{}", message);
        let seq = self.error_seq.fetch_add(1, Ordering::SeqCst) + 1;
        s.error = Some(message);

        let state = Arc::clone(&self.state);
        let error_seq = Arc::clone(&self.error_seq);
        let delay = self.error_dismiss;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            state.send_if_modified(|s| {
                error_seq.load(Ordering::SeqCst) == seq && s.error.take().is_some()
            });
        });
        replace_timer(&self.error_timer, timer.abort_handle());
    }
}

fn replace_timer(slot: &Mutex<Option<AbortHandle>>, timer: AbortHandle) {
    let previous = slot
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(timer);
    if let Some(previous) = previous {
        previous.abort();
    }
}
