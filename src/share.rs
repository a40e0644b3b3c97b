//! Compact, URL-safe share tokens for a mix.
//!
//! A token is the JSON payload `{"name", "tracks": [{"key", "title"?, "details"?}]}`
//! in base64 with the URL-safe alphabet and no padding. Decoding never fails
//! loudly: a bad token is logged and yields `None`.

use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::{Engine, alphabet};
use serde::Serialize;
use serde_json::Value;

use crate::key::{OpenKey, parse_key};
use crate::timeline::{Mix, Track, normalize_name};

pub const SHARED_MIX_NAME: &str = "Shared Mix";

const PADDING_INDIFFERENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);

/// Tokens are read in the URL-safe alphabet first, then the standard one,
/// with or without padding.
const DECODERS: [GeneralPurpose; 2] = [
    GeneralPurpose::new(&alphabet::URL_SAFE, PADDING_INDIFFERENT),
    GeneralPurpose::new(&alphabet::STANDARD, PADDING_INDIFFERENT),
];

#[derive(Serialize)]
struct EncodedPayload<'a> {
    name: &'a str,
    tracks: Vec<EncodedTrack<'a>>,
}

#[derive(Serialize)]
struct EncodedTrack<'a> {
    key: String,
    #[serde(skip_serializing_if = "str::is_empty")]
    title: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    details: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedTrack {
    pub key: OpenKey,
    pub title: String,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePayload {
    pub name: Option<String>,
    pub tracks: Vec<SharedTrack>,
}

pub fn encode(mix: &Mix) -> String {
    let payload = EncodedPayload {
        name: &mix.name,
        tracks: mix
            .tracks
            .iter()
            .map(|track| EncodedTrack {
                key: track.key.to_string(),
                title: &track.title,
                details: &track.details,
            })
            .collect(),
    };
    // Only string fields, so serialization cannot fail.
    let json = serde_json::to_string(&payload).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

pub fn decode(token: &str) -> Option<SharePayload> {
    let token = token.trim();
    let [url_safe, standard] = &DECODERS;
    let bytes = match url_safe.decode(token).or_else(|_| standard.decode(token)) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("share: token is not valid base64: {e}");
            return None;
        }
    };
    let json = match String::from_utf8(bytes) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!("share: decoded token is not UTF-8: {e}");
            return None;
        }
    };
    let value: Value = match serde_json::from_str(&json) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("share: decoded token is not JSON: {e}");
            return None;
        }
    };
    let Some(entries) = value.get("tracks").and_then(Value::as_array) else {
        tracing::warn!("share: payload has no tracks array");
        return None;
    };

    let text_field = |entry: &Value, field: &str| -> String {
        entry
            .get(field)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let tracks = entries
        .iter()
        .filter_map(|entry| {
            let key = entry.get("key").and_then(Value::as_str).and_then(parse_key);
            if key.is_none() {
                tracing::debug!("share: dropping track with unparsable key {:?}", entry.get("key"));
            }
            Some(SharedTrack {
                key: key?,
                title: text_field(entry, "title"),
                details: text_field(entry, "details"),
            })
        })
        .collect();

    Some(SharePayload {
        name: value.get("name").and_then(Value::as_str).map(str::to_string),
        tracks,
    })
}

impl Mix {
    /// Fresh mix (new ids) from a decoded share payload.
    pub fn from_share_payload(payload: SharePayload) -> Self {
        let name = normalize_name(payload.name.as_deref().unwrap_or_default(), SHARED_MIX_NAME);
        let tracks = payload
            .tracks
            .into_iter()
            .map(|shared| Track {
                title: shared.title,
                details: shared.details,
                ..Track::new(shared.key)
            })
            .collect();
        Mix::from_tracks(name, tracks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{CreateMixOptions, TrackUpdate};

    use base64::engine::general_purpose::STANDARD;

    fn token_for(json: &str) -> String {
        URL_SAFE_NO_PAD.encode(json.as_bytes())
    }

    fn sample_mix() -> Mix {
        let mut mix = Mix::create(CreateMixOptions {
            name: Some("Sunrise ~ set?".to_string()),
            seed_keys: vec![OpenKey::minor(8), OpenKey::major(8), OpenKey::minor(3)],
            start_key: None,
        });
        let id = mix.tracks[1].id.clone();
        mix.update_track_fields(
            &id,
            TrackUpdate {
                title: Some("Ägæis / ÿ".to_string()),
                details: Some("124 BPM".to_string()),
            },
        );
        mix
    }

    #[test]
    fn round_trip_preserves_name_keys_and_text() {
        let mix = sample_mix();
        let decoded = decode(&encode(&mix)).expect("token should decode");
        assert_eq!(decoded.name.as_deref(), Some("Sunrise ~ set?"));
        assert_eq!(decoded.tracks.len(), mix.tracks.len());
        for (shared, track) in decoded.tracks.iter().zip(&mix.tracks) {
            assert_eq!(shared.key, track.key);
            assert_eq!(shared.title, track.title);
            assert_eq!(shared.details, track.details);
        }
    }

    #[test]
    fn token_is_url_safe_without_padding() {
        let token = encode(&sample_mix());
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "token contains non URL-safe characters: {token}"
        );
    }

    #[test]
    fn empty_fields_are_omitted() {
        let mix = Mix::create(CreateMixOptions {
            name: Some("Bare".to_string()),
            seed_keys: vec![OpenKey::minor(1), OpenKey::minor(2)],
            start_key: None,
        });
        let bytes = URL_SAFE_NO_PAD.decode(encode(&mix)).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "name": "Bare",
                "tracks": [{ "key": "1m", "title": "Opening Track" }, { "key": "2m" }]
            })
        );
    }

    #[test]
    fn invalid_tokens_yield_none() {
        assert_eq!(decode("not-valid-base64!!"), None);
        assert_eq!(decode(""), None);
        assert_eq!(decode(&token_for("{not json")), None);
        assert_eq!(decode(&token_for(r#"{"name": "x"}"#)), None);
        assert_eq!(decode(&token_for(r#"{"tracks": 3}"#)), None);
        assert_eq!(decode(&token_for("[]")), None);
        assert_eq!(decode("e30="), None);
        assert_eq!(decode("a"), None);
        assert_eq!(decode("===="), None);
        assert_eq!(decode("%%%"), None);
    }

    #[test]
    fn unparsable_keys_are_dropped() {
        let token = token_for(
            r#"{"name": "Mixed", "tracks": [{"key": "8m"}, {"key": "13m"}, {"title": "no key"}, {"key": "9A", "title": 4}]}"#,
        );
        let payload = decode(&token).unwrap();
        let keys: Vec<String> = payload.tracks.iter().map(|t| t.key.to_string()).collect();
        assert_eq!(keys, vec!["8m", "9m"]);
        assert_eq!(payload.tracks[1].title, "");
    }

    #[test]
    fn padded_standard_alphabet_tokens_decode() {
        let token = STANDARD.encode(r#"{"tracks": [{"key": "4d"}]}"#);
        let payload = decode(&token).unwrap();
        assert_eq!(payload.name, None);
        assert_eq!(payload.tracks[0].key, OpenKey::major(4));
    }

    #[test]
    fn padding_and_surrounding_whitespace_are_tolerated() {
        let bare = token_for(r#"{"tracks":[]}"#);
        assert_eq!(bare, "eyJ0cmFja3MiOltdfQ");
        for token in [bare.clone(), format!("{bare}=="), format!("{bare}\n")] {
            let payload = decode(&token).unwrap();
            assert!(payload.tracks.is_empty());
        }
    }

    #[test]
    fn shared_payload_builds_fresh_mix() {
        let mix = sample_mix();
        let shared = Mix::from_share_payload(decode(&encode(&mix)).unwrap());
        assert_ne!(shared.id, mix.id);
        assert_eq!(shared.name, mix.name);
        assert_eq!(shared.start_key, OpenKey::minor(8));
        assert_eq!(shared.tracks.len(), 3);
        assert_ne!(shared.tracks[0].id, mix.tracks[0].id);

        let unnamed = Mix::from_share_payload(SharePayload {
            name: None,
            tracks: Vec::new(),
        });
        assert_eq!(unnamed.name, SHARED_MIX_NAME);
    }
}
