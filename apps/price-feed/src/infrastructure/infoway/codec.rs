//! Infoway Frame Codec
//!
//! Decoding is total: every inbound frame maps to an [`InboundFrame`],
//! malformed input included. A single bad frame must never take down the
//! connection, so there is no decode error type, only
//! [`InboundFrame::Ignored`] with a reason.
//!
//! Numeric payload fields are accepted as JSON numbers or numeric strings.
//! Prices are parsed into exact decimals and must be strictly positive.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

use super::messages::{
    CODE_HEARTBEAT_ACK, CODE_PRICE_PUSH, CODE_SUBSCRIBE_ACK, Envelope, PricePushData,
};
use crate::domain::quote::{PriceUpdate, TradeDirection};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a frame was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Not valid JSON, or not a JSON object.
    Malformed,
    /// Binary payload that is not UTF-8.
    NonUtf8,
    /// Object without a numeric `code`.
    MissingCode,
    /// Code not handled by this service.
    UnknownCode,
    /// Price push without a `data` object.
    MissingData,
    /// Price push without a non-empty symbol.
    MissingSymbol,
    /// Price push whose price is absent, unparseable or not positive.
    InvalidPrice,
}

impl IgnoreReason {
    /// Stable label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::NonUtf8 => "non_utf8",
            Self::MissingCode => "missing_code",
            Self::UnknownCode => "unknown_code",
            Self::MissingData => "missing_data",
            Self::MissingSymbol => "missing_symbol",
            Self::InvalidPrice => "invalid_price",
        }
    }
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// Validated price push.
    Price(PriceUpdate),
    /// Subscription acknowledgment.
    SubscriptionAck {
        /// Server-provided message, if any.
        message: Option<String>,
    },
    /// Heartbeat acknowledgment.
    HeartbeatAck,
    /// Server-reported error (negative code).
    Error {
        /// Error code.
        code: i64,
        /// Server-provided message.
        message: String,
    },
    /// Frame dropped without side effects.
    Ignored(IgnoreReason),
}

/// JSON codec for Infoway push streams.
#[derive(Debug, Default, Clone, Copy)]
pub struct InfowayCodec;

impl InfowayCodec {
    /// Create a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Serialize an outbound request.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode<T: Serialize>(&self, request: &T) -> Result<String, CodecError> {
        Ok(serde_json::to_string(request)?)
    }

    /// Decode a WebSocket data frame.
    ///
    /// Control frames decode to [`InboundFrame::Ignored`]; the caller
    /// handles them before reaching the codec.
    #[must_use]
    pub fn decode(&self, message: &Message) -> InboundFrame {
        match message {
            Message::Text(text) => self.decode_text(text.as_str()),
            Message::Binary(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => self.decode_text(text),
                Err(_) => InboundFrame::Ignored(IgnoreReason::NonUtf8),
            },
            _ => InboundFrame::Ignored(IgnoreReason::Malformed),
        }
    }

    /// Decode a JSON text frame.
    #[must_use]
    pub fn decode_text(&self, text: &str) -> InboundFrame {
        let Ok(value) = serde_json::from_str::<Value>(text) else {
            return InboundFrame::Ignored(IgnoreReason::Malformed);
        };
        if !value.is_object() {
            return InboundFrame::Ignored(IgnoreReason::Malformed);
        }
        let Ok(envelope) = serde_json::from_value::<Envelope>(value) else {
            return InboundFrame::Ignored(IgnoreReason::Malformed);
        };

        match envelope.code {
            None => InboundFrame::Ignored(IgnoreReason::MissingCode),
            Some(CODE_PRICE_PUSH) => decode_price(envelope.data),
            Some(CODE_SUBSCRIBE_ACK) => InboundFrame::SubscriptionAck {
                message: envelope.message(),
            },
            Some(CODE_HEARTBEAT_ACK) => InboundFrame::HeartbeatAck,
            Some(code) if code < 0 => InboundFrame::Error {
                code,
                message: envelope.message().unwrap_or_default(),
            },
            Some(_) => InboundFrame::Ignored(IgnoreReason::UnknownCode),
        }
    }
}

fn decode_price(data: Option<Value>) -> InboundFrame {
    let Some(data) = data.filter(Value::is_object) else {
        return InboundFrame::Ignored(IgnoreReason::MissingData);
    };
    let Ok(push) = serde_json::from_value::<PricePushData>(data) else {
        return InboundFrame::Ignored(IgnoreReason::Malformed);
    };

    let symbol = match push.symbol.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => return InboundFrame::Ignored(IgnoreReason::MissingSymbol),
    };

    let price = match push.price.as_ref().and_then(parse_decimal) {
        Some(p) if p > Decimal::ZERO => p,
        _ => return InboundFrame::Ignored(IgnoreReason::InvalidPrice),
    };

    InboundFrame::Price(PriceUpdate {
        symbol,
        price,
        timestamp: push.timestamp.as_ref().and_then(parse_integer),
        volume: push.volume.as_ref().and_then(parse_decimal),
        direction: push
            .direction
            .as_ref()
            .and_then(parse_integer)
            .and_then(TradeDirection::from_code),
    })
}

fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => decimal_from_str(s.trim()),
        Value::Number(n) => n
            .as_i64()
            .map(Decimal::from)
            .or_else(|| decimal_from_str(&n.to_string())),
        _ => None,
    }
}

fn decimal_from_str(s: &str) -> Option<Decimal> {
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use test_case::test_case;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn decodes_price_push_with_string_price() {
        let codec = InfowayCodec::new();
        let frame = codec.decode_text(
            r#"{"code":10002,"data":{"s":"EURUSD","p":"1.08450","t":1700000000,"v":100,"td":1}}"#,
        );

        let InboundFrame::Price(update) = frame else {
            panic!("expected price, got {frame:?}");
        };
        assert_eq!(update.symbol, "EURUSD");
        assert_eq!(update.price, dec("1.08450"));
        assert_eq!(update.timestamp, Some(1_700_000_000));
        assert_eq!(update.volume, Some(Decimal::from(100)));
        assert_eq!(update.direction, Some(TradeDirection::Buy));
    }

    #[test]
    fn decodes_price_push_with_numeric_price() {
        let frame = InfowayCodec::new()
            .decode_text(r#"{"code":10002,"data":{"s":"BTCUSDT","p":43250.5}}"#);

        let InboundFrame::Price(update) = frame else {
            panic!("expected price, got {frame:?}");
        };
        assert_eq!(update.price, dec("43250.5"));
        assert!(update.timestamp.is_none());
        assert!(update.volume.is_none());
        assert!(update.direction.is_none());
    }

    #[test_case(r#"{"code":10002,"msg":0,"trace":123,"data":{"s":"EURUSD","p":"1.1"}}"# ; "numeric msg and trace")]
    #[test_case(r#"{"code":10002,"msg":{"k":1},"trace":null,"data":{"s":"EURUSD","p":"1.1"}}"# ; "object msg")]
    #[test_case(r#"{"code":10002,"extra":[1,2],"data":{"s":"EURUSD","p":"1.1"}}"# ; "unknown field")]
    fn unused_envelope_fields_never_drop_a_price(text: &str) {
        let frame = InfowayCodec::new().decode_text(text);
        assert!(
            matches!(frame, InboundFrame::Price(ref u) if u.symbol == "EURUSD" && u.price == dec("1.1")),
            "got {frame:?}"
        );
    }

    #[test]
    fn numeric_error_message_is_rendered() {
        assert_eq!(
            InfowayCodec::new().decode_text(r#"{"code":-7,"msg":429}"#),
            InboundFrame::Error {
                code: -7,
                message: "429".to_string()
            }
        );
    }

    #[test]
    fn binary_frames_are_decoded_as_text() {
        let payload = br#"{"code":10002,"data":{"s":"XAUUSD","p":"2031.10"}}"#;
        let frame = InfowayCodec::new().decode(&Message::Binary(payload.to_vec().into()));
        assert!(matches!(frame, InboundFrame::Price(ref u) if u.symbol == "XAUUSD"));
    }

    #[test]
    fn non_utf8_binary_is_ignored() {
        let frame = InfowayCodec::new().decode(&Message::Binary(vec![0xff, 0xfe].into()));
        assert_eq!(frame, InboundFrame::Ignored(IgnoreReason::NonUtf8));
    }

    #[test_case("not json", IgnoreReason::Malformed ; "not json")]
    #[test_case("[1,2,3]", IgnoreReason::Malformed ; "array")]
    #[test_case(r#"{"msg":"hi"}"#, IgnoreReason::MissingCode ; "no code")]
    #[test_case(r#"{"code":"10002"}"#, IgnoreReason::Malformed ; "string code")]
    #[test_case(r#"{"code":99999}"#, IgnoreReason::UnknownCode ; "unknown code")]
    #[test_case(r#"{"code":10002}"#, IgnoreReason::MissingData ; "no data")]
    #[test_case(r#"{"code":10002,"data":{"p":"1.0"}}"#, IgnoreReason::MissingSymbol ; "no symbol")]
    #[test_case(r#"{"code":10002,"data":{"s":"  ","p":"1.0"}}"#, IgnoreReason::MissingSymbol ; "blank symbol")]
    #[test_case(r#"{"code":10002,"data":{"s":"EURUSD"}}"#, IgnoreReason::InvalidPrice ; "no price")]
    #[test_case(r#"{"code":10002,"data":{"s":"EURUSD","p":"abc"}}"#, IgnoreReason::InvalidPrice ; "non numeric price")]
    #[test_case(r#"{"code":10002,"data":{"s":"EURUSD","p":"0"}}"#, IgnoreReason::InvalidPrice ; "zero price")]
    #[test_case(r#"{"code":10002,"data":{"s":"EURUSD","p":-1.5}}"#, IgnoreReason::InvalidPrice ; "negative price")]
    fn dropped_frames(text: &str, reason: IgnoreReason) {
        assert_eq!(InfowayCodec::new().decode_text(text), InboundFrame::Ignored(reason));
    }

    #[test]
    fn control_codes() {
        let codec = InfowayCodec::new();
        assert_eq!(
            codec.decode_text(r#"{"code":10001,"msg":"ok"}"#),
            InboundFrame::SubscriptionAck {
                message: Some("ok".to_string())
            }
        );
        assert_eq!(
            codec.decode_text(r#"{"code":10011}"#),
            InboundFrame::HeartbeatAck
        );
        assert_eq!(
            codec.decode_text(r#"{"code":-1,"msg":"invalid apikey"}"#),
            InboundFrame::Error {
                code: -1,
                message: "invalid apikey".to_string()
            }
        );
    }

    #[test]
    fn malformed_optional_fields_do_not_drop_price() {
        let frame = InfowayCodec::new().decode_text(
            r#"{"code":10002,"data":{"s":"EURUSD","p":"1.1","t":"soon","v":null,"td":7}}"#,
        );
        let InboundFrame::Price(update) = frame else {
            panic!("expected price, got {frame:?}");
        };
        assert!(update.timestamp.is_none());
        assert!(update.volume.is_none());
        assert!(update.direction.is_none());
    }

    #[test]
    fn encode_serializes_requests() {
        let codec = InfowayCodec::new();
        let json = codec
            .encode(&super::super::messages::SubscribeRequest::new(&["EURUSD"]))
            .unwrap();
        assert!(json.contains(r#""code":10000"#));
        assert!(json.contains(r#""codes":"EURUSD""#));
    }

    proptest! {
        #[test]
        fn decode_never_panics(text in ".*") {
            let _ = InfowayCodec::new().decode_text(&text);
        }

        #[test]
        fn decoded_prices_are_positive(symbol in "[A-Z]{3,8}", price in -1.0e6f64..1.0e6f64) {
            let text = format!(r#"{{"code":10002,"data":{{"s":"{symbol}","p":{price}}}}}"#);
            match InfowayCodec::new().decode_text(&text) {
                InboundFrame::Price(update) => prop_assert!(update.price > Decimal::ZERO),
                InboundFrame::Ignored(reason) => prop_assert_eq!(reason, IgnoreReason::InvalidPrice),
                other => prop_assert!(false, "unexpected frame {:?}", other),
            }
        }
    }
}
