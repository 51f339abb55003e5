use std::io::Read;

use anyhow::{bail, Result};
use axum::http::{header, HeaderMap};
use flate2::read::GzDecoder;

use telemetry_domain::{EventKind, InboundEvent};

/// Decodes an ingress body of the given kind, gunzipping it first when the
/// request says `Content-Encoding: gzip`. The inflated body may not exceed
/// `max_bytes`.
pub fn parse_inbound(
    kind: EventKind,
    headers: &HeaderMap,
    body: &[u8],
    max_bytes: u64,
) -> Result<InboundEvent> {
    let content = maybe_gunzip(headers, body, max_bytes)?;
    let event = match kind {
        EventKind::PlayerEvent => InboundEvent::Player(serde_json::from_slice(&content)?),
        EventKind::ServerEvent => InboundEvent::Server(serde_json::from_slice(&content)?),
    };
    Ok(event)
}

fn maybe_gunzip(headers: &HeaderMap, body: &[u8], max_bytes: u64) -> Result<Vec<u8>> {
    let gzipped = headers
        .get(header::CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().eq_ignore_ascii_case("gzip"))
        .unwrap_or(false);
    if !gzipped {
        return Ok(body.to_vec());
    }
    let mut out = Vec::new();
    GzDecoder::new(body)
        .take(max_bytes.saturating_add(1))
        .read_to_end(&mut out)?;
    if out.len() as u64 > max_bytes {
        bail!("inflated body exceeds {} bytes", max_bytes);
    }
    Ok(out)
}

pub fn idempotency_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Idempotency-Key")
        .and_then(|value| value.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const LIMIT: u64 = 4096;

    const PLAYER: &str = r#"{"player_id":"p","server_id":"s","action":"join","score":3,"timestamp":"2025-03-01T10:00:00"}"#;

    #[test]
    fn plain_json_is_parsed_for_the_requested_kind() {
        let event = parse_inbound(EventKind::PlayerEvent, &HeaderMap::new(), PLAYER.as_bytes(), LIMIT)
            .expect("parse");
        assert_eq!(event.kind(), EventKind::PlayerEvent);
        assert!(
            parse_inbound(EventKind::ServerEvent, &HeaderMap::new(), PLAYER.as_bytes(), LIMIT).is_err()
        );
    }

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).expect("write");
        encoder.finish().expect("finish")
    }

    fn gzip_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("GZIP"));
        headers
    }

    #[test]
    fn gzip_body_is_inflated() {
        let compressed = gzip(PLAYER.as_bytes());
        let event = parse_inbound(EventKind::PlayerEvent, &gzip_headers(), &compressed, LIMIT)
            .expect("parse");
        assert_eq!(event.kind(), EventKind::PlayerEvent);
    }

    #[test]
    fn gzip_header_with_plain_body_fails() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        assert!(parse_inbound(EventKind::PlayerEvent, &headers, PLAYER.as_bytes(), LIMIT).is_err());
    }

    #[test]
    fn inflated_size_is_capped() {
        let bomb = gzip(&vec![b' '; 1024 * 1024]);
        assert!((bomb.len() as u64) < LIMIT);
        let err = parse_inbound(EventKind::PlayerEvent, &gzip_headers(), &bomb, LIMIT)
            .expect_err("over limit");
        assert!(err.to_string().contains("exceeds 4096 bytes"));
    }

    #[test]
    fn body_exactly_at_limit_is_accepted() {
        let mut padded = PLAYER.as_bytes().to_vec();
        padded.resize(LIMIT as usize, b' ');
        let compressed = gzip(&padded);
        assert!(parse_inbound(EventKind::PlayerEvent, &gzip_headers(), &compressed, LIMIT).is_ok());
    }
}
