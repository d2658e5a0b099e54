//! In-process model doubles for unit tests.

use async_trait::async_trait;
use futures::channel::{mpsc, oneshot};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::llm_interface::{CodeModel, TextStream};
use crate::error::LlmError;

/// Replays a fixed script for every call.
#[derive(Default)]
pub(crate) struct ScriptedLLM {
    chunks: Vec<String>,
    mid_stream_failure: Option<String>,
    rejection: Option<String>,
    completion: String,
    calls: AtomicUsize,
    requests: Mutex<Vec<(String, f32)>>,
}

impl ScriptedLLM {
    pub fn streaming(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn completing(text: &str) -> Self {
        Self {
            completion: text.to_string(),
            ..Self::default()
        }
    }

    pub fn rejecting(message: &str) -> Self {
        Self {
            rejection: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn failing_after(mut self, message: &str) -> Self {
        self.mid_stream_failure = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(String, f32)> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, prompt: &str, temperature: f32) -> Result<(), LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((prompt.to_string(), temperature));
        match &self.rejection {
            Some(message) => Err(LlmError::Stream(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CodeModel for ScriptedLLM {
    async fn stream_generate(&self, prompt: &str, temperature: f32) -> Result<TextStream, LlmError> {
        self.record(prompt, temperature)?;
        let mut items: Vec<Result<String, LlmError>> =
            self.chunks.iter().cloned().map(Ok).collect();
        if let Some(message) = &self.mid_stream_failure {
            items.push(Err(LlmError::Stream(message.clone())));
        }
        Ok(Box::pin(futures::stream::iter(items)))
    }

    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, LlmError> {
        self.record(prompt, temperature)?;
        Ok(self.completion.clone())
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

pub(crate) type ChunkSender = mpsc::UnboundedSender<Result<String, LlmError>>;

/// Each streaming call takes the next channel; the test pushes fragments.
pub(crate) struct ChannelLLM {
    receivers: Mutex<VecDeque<mpsc::UnboundedReceiver<Result<String, LlmError>>>>,
}

impl ChannelLLM {
    pub fn new(streams: usize) -> (Self, Vec<ChunkSender>) {
        let (senders, receivers): (Vec<_>, VecDeque<_>) =
            (0..streams).map(|_| mpsc::unbounded()).unzip();
        let llm = Self {
            receivers: Mutex::new(receivers),
        };
        (llm, senders)
    }
}

#[async_trait]
impl CodeModel for ChannelLLM {
    async fn stream_generate(&self, _prompt: &str, _temperature: f32) -> Result<TextStream, LlmError> {
        let receiver = self
            .receivers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmError::Stream("no scripted stream left".into()))?;
        Ok(Box::pin(receiver))
    }

    async fn generate(&self, _prompt: &str, _temperature: f32) -> Result<String, LlmError> {
        Err(LlmError::Stream("not scripted".into()))
    }

    fn model(&self) -> &str {
        "channel"
    }
}

/// First stream never ends; every later one replays `tail`.
pub(crate) struct FloodingLLM {
    flood: &'static str,
    tail: Vec<String>,
    calls: AtomicUsize,
}

impl FloodingLLM {
    pub fn new(flood: &'static str, tail: &[&str]) -> Self {
        Self {
            flood,
            tail: tail.iter().map(|c| c.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CodeModel for FloodingLLM {
    async fn stream_generate(&self, _prompt: &str, _temperature: f32) -> Result<TextStream, LlmError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            let flood = self.flood;
            return Ok(Box::pin(futures::stream::repeat_with(move || Ok(flood.to_string()))));
        }
        let items: Vec<Result<String, LlmError>> = self.tail.iter().cloned().map(Ok).collect();
        Ok(Box::pin(futures::stream::iter(items)))
    }

    async fn generate(&self, _prompt: &str, _temperature: f32) -> Result<String, LlmError> {
        Err(LlmError::Stream("not scripted".into()))
    }

    fn model(&self) -> &str {
        "flooding"
    }
}

pub(crate) type CompletionSender = oneshot::Sender<Result<String, LlmError>>;

/// Each single-shot call waits on the next gate; the test opens them.
pub(crate) struct GatedLLM {
    gates: Mutex<VecDeque<oneshot::Receiver<Result<String, LlmError>>>>,
}

impl GatedLLM {
    pub fn new(calls: usize) -> (Self, Vec<CompletionSender>) {
        let (senders, receivers): (Vec<_>, VecDeque<_>) =
            (0..calls).map(|_| oneshot::channel()).unzip();
        let llm = Self {
            gates: Mutex::new(receivers),
        };
        (llm, senders)
    }
}

#[async_trait]
impl CodeModel for GatedLLM {
    async fn stream_generate(&self, _prompt: &str, _temperature: f32) -> Result<TextStream, LlmError> {
        Err(LlmError::Stream("not scripted".into()))
    }

    async fn generate(&self, _prompt: &str, _temperature: f32) -> Result<String, LlmError> {
        let gate = self
            .gates
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmError::Stream("no gate left".into()))?;
        gate.await
            .map_err(|_| LlmError::Stream("gate dropped".into()))?
    }

    fn model(&self) -> &str {
        "gated"
    }
}
