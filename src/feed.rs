//! src/feed.rs
//!
//! Top-level `feed` module: sample sources, wire decoding and the
//! subscription that connects a source to a chart.

pub mod protocol;
pub mod source;
pub mod subscription;

/// Re-exports
pub use protocol::{Dtype, Endian, FeedFormat};
pub use source::{SampleSource, SerialSource, SimulatedSource, TcpSource};
pub use subscription::Subscription;
