use std::io::Read;

use anyhow::Result;
use axum::http::HeaderMap;
use flate2::read::GzDecoder;

use backend_domain::{IngestEnvelope, RawEventPayload, RuntimeConfig};

/// Shared-key check on the `x-api-key` header. When no key is configured
/// the deployment is open and every caller passes.
pub fn authorize(config: &RuntimeConfig, headers: &HeaderMap) -> bool {
    if let Some(api_key) = &config.api_key {
        return extract_api_key(headers)
            .map(|v| v == *api_key)
            .unwrap_or(false);
    }
    true
}

pub fn parse_events(headers: &HeaderMap, body: &[u8]) -> Result<Vec<RawEventPayload>> {
    let content = maybe_gunzip(headers, body)?;
    let envelope: IngestEnvelope = serde_json::from_str(&content)?;
    Ok(envelope.events)
}

fn maybe_gunzip(headers: &HeaderMap, body: &[u8]) -> Result<String> {
    if let Some(encoding) = headers.get("Content-Encoding") {
        if encoding.to_str().unwrap_or("") == "gzip" {
            let mut decoder = GzDecoder::new(body);
            let mut out = String::new();
            decoder.read_to_string(&mut out)?;
            return Ok(out);
        }
    }
    Ok(String::from_utf8(body.to_vec())?)
}

fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("x-api-key")?.to_str().ok()?.trim();
    if value.is_empty() {
        return None;
    }
    Some(value.to_string())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use axum::http::HeaderValue;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    use super::*;

    fn config_with_key(key: Option<&str>) -> RuntimeConfig {
        RuntimeConfig {
            api_key: key.map(str::to_string),
            ..RuntimeConfig::default()
        }
    }

    #[test]
    fn missing_or_wrong_key_is_rejected_when_configured() {
        let config = config_with_key(Some("sekrit"));

        let empty = HeaderMap::new();
        assert!(!authorize(&config, &empty));

        let mut wrong = HeaderMap::new();
        wrong.insert("x-api-key", HeaderValue::from_static("guess"));
        assert!(!authorize(&config, &wrong));

        let mut right = HeaderMap::new();
        right.insert("x-api-key", HeaderValue::from_static("sekrit"));
        assert!(authorize(&config, &right));
    }

    #[test]
    fn open_deployment_accepts_everyone() {
        let config = config_with_key(None);
        assert!(authorize(&config, &HeaderMap::new()));
    }

    #[test]
    fn parses_plain_envelope() {
        let body = br#"{"events":[{"playerId":"p1","actionType":"SESSION_START"}]}"#;
        let events = parse_events(&HeaderMap::new(), body).expect("parse");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].player_id.as_deref(), Some("p1"));
    }

    #[test]
    fn parses_gzipped_envelope() {
        let json = r#"{"events":[{"playerId":"p1","actionType":"PLAYER_TICK"}]}"#;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(json.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("Content-Encoding", HeaderValue::from_static("gzip"));
        let events = parse_events(&headers, &compressed).expect("parse");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action_type.as_deref(), Some("PLAYER_TICK"));
    }

    #[test]
    fn envelope_without_events_is_empty_not_error() {
        let events = parse_events(&HeaderMap::new(), b"{}").expect("parse");
        assert!(events.is_empty());
    }
}
