//! `capture-core`: the output-orchestration layer for a capture/encode
//! subprocess (spec §1–§2).
//!
//! This crate is the core described by the specification: it owns the
//! scene of capture sources, the three concurrent outputs (recording,
//! replay buffer, streaming), the visibility and black-texture policies,
//! and the JSON command/event protocol spoken to a controlling parent
//! process over a `Channel`. The native capture/encode engine itself is an
//! external black box, modeled here as the `engine::Engine` trait.

pub mod audio;
pub mod black_texture;
pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod outputs;
pub mod protocol;
pub mod sources;
pub mod timers;
pub mod visibility;
