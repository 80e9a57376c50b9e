//! Infoway WebSocket Message Types
//!
//! Wire format types for Infoway's push streams. Every frame is a JSON
//! object carrying a numeric `code` discriminator.
//!
//! # Codes
//!
//! | Code    | Direction | Meaning                      |
//! |---------|-----------|------------------------------|
//! | 10000   | out       | Subscribe request            |
//! | 10001   | in        | Subscribe acknowledgment     |
//! | 10002   | in        | Price push                   |
//! | 10010   | out       | Heartbeat                    |
//! | 10011   | in        | Heartbeat acknowledgment     |
//! | `< 0`   | in        | Error notification           |
//!
//! # Price Push (JSON)
//! ```json
//! {"code": 10002, "data": {"s": "EURUSD", "p": "1.08450", "t": 1700000000, "v": 100, "td": 1}}
//! ```

use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Subscribe request code.
pub const CODE_SUBSCRIBE: i64 = 10_000;
/// Subscribe acknowledgment code.
pub const CODE_SUBSCRIBE_ACK: i64 = 10_001;
/// Price push code.
pub const CODE_PRICE_PUSH: i64 = 10_002;
/// Heartbeat request code.
pub const CODE_HEARTBEAT: i64 = 10_010;
/// Heartbeat acknowledgment code.
pub const CODE_HEARTBEAT_ACK: i64 = 10_011;

const TRACE_ID_LEN: usize = 26;

/// Generate a random correlation token for an outbound request.
///
/// Uniqueness is probabilistic; the token is only used to correlate log
/// lines with upstream acknowledgments.
#[must_use]
pub fn generate_trace_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TRACE_ID_LEN)
        .map(char::from)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// =============================================================================
// Outbound
// =============================================================================

/// Payload of a subscribe request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeData {
    /// Comma-joined symbol list.
    pub codes: String,
}

/// Subscribe request.
///
/// # Wire Format (JSON)
/// ```json
/// {"code": 10000, "trace": "k2j4...", "data": {"codes": "EURUSD,GBPUSD"}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    /// Always [`CODE_SUBSCRIBE`].
    pub code: i64,
    /// Correlation token.
    pub trace: String,
    /// Symbols to subscribe.
    pub data: SubscribeData,
}

impl SubscribeRequest {
    /// Build a subscribe request for `symbols` with a fresh trace id.
    #[must_use]
    pub fn new<S: AsRef<str>>(symbols: &[S]) -> Self {
        let codes = symbols
            .iter()
            .map(|s| s.as_ref())
            .collect::<Vec<&str>>()
            .join(",");
        Self {
            code: CODE_SUBSCRIBE,
            trace: generate_trace_id(),
            data: SubscribeData { codes },
        }
    }

    /// Number of symbols in the request.
    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.data.codes.split(',').filter(|s| !s.is_empty()).count()
    }
}

/// Keep-alive frame.
///
/// # Wire Format (JSON)
/// ```json
/// {"code": 10010, "trace": "k2j4..."}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    /// Always [`CODE_HEARTBEAT`].
    pub code: i64,
    /// Correlation token.
    pub trace: String,
}

impl Envelope {
    /// `msg` as text. Non-string values are rendered as JSON.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self.msg.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl HeartbeatRequest {
    /// Build a heartbeat with a fresh trace id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            code: CODE_HEARTBEAT,
            trace: generate_trace_id(),
        }
    }
}

impl Default for HeartbeatRequest {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Inbound
// =============================================================================

/// Loosely typed inbound envelope.
///
/// Every field is optional: the upstream schema is not guaranteed, so
/// validation happens in the codec rather than in serde. Only `code` is
/// typed; `msg` and `trace` accept any JSON value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    /// Message code.
    #[serde(default)]
    pub code: Option<i64>,
    /// Human-readable message.
    #[serde(default)]
    pub msg: Option<Value>,
    /// Echoed correlation token.
    #[serde(default)]
    pub trace: Option<Value>,
    /// Code-specific payload.
    #[serde(default)]
    pub data: Option<Value>,
}

/// Payload of a price push, before validation.
///
/// Numeric fields may arrive as JSON numbers or strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PricePushData {
    /// Symbol.
    #[serde(default, rename = "s")]
    pub symbol: Option<String>,
    /// Last price.
    #[serde(default, rename = "p")]
    pub price: Option<Value>,
    /// Vendor timestamp.
    #[serde(default, rename = "t")]
    pub timestamp: Option<Value>,
    /// Volume.
    #[serde(default, rename = "v")]
    pub volume: Option<Value>,
    /// Trade direction code.
    #[serde(default, rename = "td")]
    pub direction: Option<Value>,
}
