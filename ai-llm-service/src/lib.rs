//! Hosted-LLM client layer: streaming chat with tool calls, batched
//! embeddings, health probes and env-driven profiles.

pub mod chat_types;
pub mod config;
pub mod error_handler;
pub mod health_service;
pub mod service_profiles;
pub mod services;
pub mod telemetry;
