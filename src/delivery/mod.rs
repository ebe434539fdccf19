//! Chunked streaming delivery to the avatar renderer.
//!
//! Production (synthesis + resampling) finishes with a whole reply at once;
//! consumption is one short chunk at a time.  [`DeliveryQueue`] decouples
//! the two while preserving chunk order, and [`AvatarSink`] is the seam the
//! renderer transport implements.

pub mod queue;
pub mod sink;

pub use queue::{AudioChunk, DeliveryQueue};
pub use sink::{AvatarSink, ChannelSink};
