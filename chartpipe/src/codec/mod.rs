//! Self-contained chart URL encoding.
//!
//! A chart's full rendering context is serialized to JSON, compressed
//! with zlib and base64-encoded into a single URL-safe query parameter,
//! so that a chart URL can be re-rendered later with no server-side
//! session state. The base64 alphabet is remapped (`+` to `-`, `/` to
//! `_`, `=` to `.`) to survive URL embedding without percent-encoding.

use crate::config::{EventTypeSpec, TileConfig};
use crate::statvar::StatVarSpec;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use thiserror::Error;

/// Errors from decoding a chart properties parameter.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("invalid compressed payload: {0}")]
    InvalidCompression(#[from] std::io::Error),
    #[error("invalid chart properties: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Everything needed to re-render one chart, independent of the query
/// that produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartProps {
    pub place: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enclosed_place_type: Option<String>,
    pub stat_var_spec: Vec<StatVarSpec>,
    pub tile_config: TileConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type_spec: Option<EventTypeSpec>,
}

/// Encodes chart properties into a URL-safe opaque token.
pub fn encode_chart_props(props: &ChartProps) -> Result<String, CodecError> {
    let json = serde_json::to_vec(props)?;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    let compressed = encoder.finish()?;
    let encoded = BASE64.encode(compressed);
    Ok(encoded
        .replace('+', "-")
        .replace('/', "_")
        .replace('=', "."))
}

/// Decodes a token produced by [`encode_chart_props`].
pub fn decode_chart_props(token: &str) -> Result<ChartProps, CodecError> {
    let standard = token
        .replace('-', "+")
        .replace('_', "/")
        .replace('.', "=");
    let compressed = BASE64.decode(standard.as_bytes())?;
    let mut decoder = ZlibDecoder::new(compressed.as_slice());
    let mut json = Vec::new();
    decoder.read_to_end(&mut json)?;
    Ok(serde_json::from_slice(&json)?)
}

/// Builds the chart endpoint URL for a set of chart properties.
pub fn chart_url(url_root: &str, api_key: &str, props: &ChartProps) -> Result<String, CodecError> {
    let token = encode_chart_props(props)?;
    let root = url_root.trim_end_matches('/');
    let mut url = format!("{}/nodejs/chart?config={}", root, token);
    if !api_key.is_empty() {
        url.push_str("&apikey=");
        url.push_str(api_key);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TileKind;

    fn sample_props() -> ChartProps {
        ChartProps {
            place: "geoId/06".to_string(),
            enclosed_place_type: Some("County".to_string()),
            stat_var_spec: vec![StatVarSpec {
                name: Some("Population".to_string()),
                ..StatVarSpec::for_stat_var("Count_Person")
            }],
            tile_config: TileConfig {
                title: "Population in ${placeName}".to_string(),
                kind: TileKind::Bar(Default::default()),
                ..Default::default()
            },
            event_type_spec: None,
        }
    }

    #[test]
    fn test_round_trip_preserves_props() {
        let props = sample_props();
        let token = encode_chart_props(&props).unwrap();
        let decoded = decode_chart_props(&token).unwrap();
        assert_eq!(decoded, props);
    }

    #[test]
    fn test_token_is_url_safe() {
        let token = encode_chart_props(&sample_props()).unwrap();
        assert!(!token.contains('+'));
        assert!(!token.contains('/'));
        assert!(!token.contains('='));
    }

    #[test]
    fn test_decode_garbage_is_an_error() {
        assert!(matches!(
            decode_chart_props("!!not base64!!"),
            Err(CodecError::InvalidBase64(_))
        ));
        // Valid base64, not a zlib stream.
        let bogus = BASE64.encode(b"plain text");
        assert!(matches!(
            decode_chart_props(&bogus),
            Err(CodecError::InvalidCompression(_))
        ));
    }

    #[test]
    fn test_chart_url_includes_api_key_when_set() {
        let props = sample_props();
        let url = chart_url("https://example.org/", "k123", &props).unwrap();
        assert!(url.starts_with("https://example.org/nodejs/chart?config="));
        assert!(url.ends_with("&apikey=k123"));
        let without = chart_url("https://example.org", "", &props).unwrap();
        assert!(!without.contains("apikey"));
    }
}
