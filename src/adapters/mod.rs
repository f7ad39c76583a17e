//! Adapters implementing the tracker ports.

pub mod live;
pub mod memory;
pub mod recording;
pub mod replaying;
