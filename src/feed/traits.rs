//! Decoder abstraction and subscription message builders.

use super::wire::WireMessage;

/// A market-data decoder. `decode` is pure (no domain-pool allocation)
/// and may be called from the transport thread. Malformed input yields
/// [`WireMessage::MonoState`], which dispatches as a no-op.
pub trait MarketDecoder: Send {
    fn decode(&self, payload: &str) -> WireMessage;
}

/// Build a stream subscribe/unsubscribe request frame.
pub fn subscription_message(request_id: u64, streams: &[String], subscribe: bool) -> String {
    let method = if subscribe { "SUBSCRIBE" } else { "UNSUBSCRIBE" };
    let params = streams
        .iter()
        .map(|s| format!("\"{s}\""))
        .collect::<Vec<_>>()
        .join(",");
    format!("{{\"method\":\"{method}\",\"params\":[{params}],\"id\":{request_id}}}")
}

/// Build a depth-snapshot request frame. The request id embeds the symbol
/// so the response can be routed without extra state.
pub fn snapshot_request_message(symbol: &str, depth: u32) -> String {
    format!(
        "{{\"id\":\"snapshot_{symbol}\",\"method\":\"depth\",\"params\":{{\"symbol\":\"{symbol}\",\"limit\":{depth}}}}}"
    )
}

/// Stream names for one symbol's market-data subscription.
pub fn default_streams(symbol: &str) -> Vec<String> {
    let lower = symbol.to_ascii_lowercase();
    vec![
        format!("{lower}@depth"),
        format!("{lower}@aggTrade"),
        format!("{lower}@bookTicker"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_frame_shape() {
        let msg = subscription_message(7, &["btcusdc@depth".to_string()], true);
        assert_eq!(
            msg,
            r#"{"method":"SUBSCRIBE","params":["btcusdc@depth"],"id":7}"#
        );
    }

    #[test]
    fn snapshot_request_embeds_symbol() {
        let msg = snapshot_request_message("BTCUSDC", 1000);
        assert!(msg.contains("\"id\":\"snapshot_BTCUSDC\""));
        assert!(msg.contains("\"limit\":1000"));
    }
}
