//! Infoway Streaming Adapters
//!
//! WebSocket client for Infoway's push feed: one connection per market
//! segment, JSON frames keyed by a numeric `code`.

pub mod codec;
pub mod heartbeat;
pub mod messages;
pub mod reconnect;
pub mod segment;

pub use codec::{CodecError, IgnoreReason, InboundFrame, InfowayCodec};
pub use heartbeat::{HeartbeatConfig, HeartbeatEvent, HeartbeatManager, HeartbeatState};
pub use messages::{HeartbeatRequest, SubscribeRequest, generate_trace_id};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
pub use segment::{SegmentClient, SegmentClientConfig, SegmentClientError, SegmentConnection};
