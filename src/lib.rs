//! Browser code converter backed by a hosted language model.
//!
//! The server keeps one [`controller::EditorController`] per browser
//! connection and streams the model's output into it chunk by chunk.

pub mod config;
pub mod controller;
pub mod converter;
pub mod error;
pub mod handlers;
pub mod languages;
pub mod llm;
pub mod prompt;
pub mod routes;
pub mod state;
pub mod websocket;
