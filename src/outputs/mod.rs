//! The three concurrent outputs (recording, replay buffer, streaming) and
//! the lifecycle/statistics they share (spec §4.4–§4.8).

pub mod base;
pub mod recorder;
pub mod replay;
pub mod streamer;

pub use base::{OutputBase, OutputState, OutputStatistics};
pub use recorder::Recorder;
pub use replay::ReplayBuffer;
pub use streamer::Streamer;
