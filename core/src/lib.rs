//! Asurada Core Library
//!
//! This crate provides the request pipeline for the Asurada service: audio
//! normalisation, speech recognition, external conversational queries and
//! response shaping through a swappable backend.

pub mod audio;
pub mod backend;
pub mod config;
pub mod orchestrator;
pub mod query;
pub mod server;
pub mod speech;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_support;
