//! Build a mix from an external DJ playlist.
//!
//! File parsing happens elsewhere; this module only receives the ordered
//! track records and the playlist name.

use serde::Deserialize;

use crate::key::{DEFAULT_KEY, OpenKey};
use crate::timeline::{Mix, Track, normalize_name};

pub const IMPORTED_MIX_NAME: &str = "Imported Mix";

/// One track as extracted from the playlist file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExternalTrackRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub tempo: Option<f64>,
    #[serde(default)]
    pub raw_key_code: Option<i64>,
}

/// Traktor `MUSICAL_KEY` value (index) to Open Key. Values 0-11 are the
/// major keys C..B chromatically, 12-23 the minor keys Cm..Bm.
const EXTERNAL_KEY_TABLE: [OpenKey; 24] = [
    OpenKey::major(1),
    OpenKey::major(8),
    OpenKey::major(3),
    OpenKey::major(10),
    OpenKey::major(5),
    OpenKey::major(12),
    OpenKey::major(7),
    OpenKey::major(2),
    OpenKey::major(9),
    OpenKey::major(4),
    OpenKey::major(11),
    OpenKey::major(6),
    OpenKey::minor(10),
    OpenKey::minor(5),
    OpenKey::minor(12),
    OpenKey::minor(7),
    OpenKey::minor(2),
    OpenKey::minor(9),
    OpenKey::minor(4),
    OpenKey::minor(11),
    OpenKey::minor(6),
    OpenKey::minor(1),
    OpenKey::minor(8),
    OpenKey::minor(3),
];

pub fn map_external_key_code(code: i64) -> Option<OpenKey> {
    usize::try_from(code)
        .ok()
        .and_then(|index| EXTERNAL_KEY_TABLE.get(index))
        .copied()
}

fn import_title(record: &ExternalTrackRecord) -> String {
    let title = record.title.trim();
    let artist = record.artist.trim();
    match (title.is_empty(), artist.is_empty()) {
        (false, false) => format!("{title} - {artist}"),
        (false, true) => title.to_string(),
        (true, false) => artist.to_string(),
        (true, true) => String::new(),
    }
}

fn import_details(record: &ExternalTrackRecord) -> String {
    match record.tempo {
        Some(bpm) if bpm.is_finite() => format!("{} BPM", bpm.round() as i64),
        _ => String::new(),
    }
}

/// One track per record, in input order. Records whose key code does not
/// map still become tracks, keyed with `DEFAULT_KEY`.
pub fn build_mix_from_import(name: &str, records: &[ExternalTrackRecord]) -> Mix {
    let tracks = records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let key = match record.raw_key_code.and_then(map_external_key_code) {
                Some(key) => key,
                None => {
                    tracing::debug!(
                        "import: track {index} has unmapped key code {:?}, using {DEFAULT_KEY}",
                        record.raw_key_code
                    );
                    DEFAULT_KEY
                }
            };
            Track {
                title: import_title(record),
                details: import_details(record),
                ..Track::new(key)
            }
        })
        .collect();
    Mix::from_tracks(normalize_name(name, IMPORTED_MIX_NAME), tracks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn record(title: &str, artist: &str, tempo: Option<f64>, code: Option<i64>) -> ExternalTrackRecord {
        ExternalTrackRecord {
            title: title.to_string(),
            artist: artist.to_string(),
            tempo,
            raw_key_code: code,
        }
    }

    #[test]
    fn table_covers_every_wheel_position_once() {
        let keys: HashSet<OpenKey> = (0..24).filter_map(map_external_key_code).collect();
        assert_eq!(keys.len(), 24);
    }

    #[test]
    fn codes_outside_range_do_not_map() {
        assert_eq!(map_external_key_code(-1), None);
        assert_eq!(map_external_key_code(24), None);
        assert_eq!(map_external_key_code(i64::MAX), None);
    }

    #[test]
    fn table_spot_checks() {
        let text = |code| map_external_key_code(code).map(|k| k.to_string());
        assert_eq!(text(0).as_deref(), Some("1d"));
        assert_eq!(text(9).as_deref(), Some("4d"));
        assert_eq!(text(12).as_deref(), Some("10m"));
        assert_eq!(text(21).as_deref(), Some("1m"));
        assert_eq!(text(23).as_deref(), Some("3m"));
    }

    #[test]
    fn codes_zero_and_twelve_import_in_order() {
        let mix = build_mix_from_import(
            "Warmup",
            &[record("A", "", None, Some(0)), record("B", "", None, Some(12))],
        );
        let keys: Vec<String> = mix.tracks.iter().map(|t| t.key.to_string()).collect();
        assert_eq!(keys, vec!["1d", "10m"]);
        assert_eq!(mix.start_key, OpenKey::major(1));
        assert_eq!(mix.name, "Warmup");
    }

    #[test]
    fn titles_and_details() {
        let mix = build_mix_from_import(
            "Set",
            &[
                record("Xtal", "Aphex Twin", Some(122.6), Some(3)),
                record("Untitled", "", Some(127.4), None),
                record("", "Burial", None, Some(5)),
                record("", "", Some(f64::NAN), Some(7)),
            ],
        );
        let titles: Vec<&str> = mix.tracks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Xtal - Aphex Twin", "Untitled", "Burial", ""]);
        let details: Vec<&str> = mix.tracks.iter().map(|t| t.details.as_str()).collect();
        assert_eq!(details, vec!["123 BPM", "127 BPM", "", ""]);
    }

    #[test]
    fn unmapped_keys_keep_track_count() {
        let records = vec![
            record("One", "", None, Some(99)),
            record("Two", "", None, None),
            record("Three", "", None, Some(4)),
        ];
        let mix = build_mix_from_import("Set", &records);
        assert_eq!(mix.tracks.len(), records.len());
        assert_eq!(mix.tracks[0].key, DEFAULT_KEY);
        assert_eq!(mix.tracks[1].key, DEFAULT_KEY);
        assert_eq!(mix.tracks[2].key, OpenKey::major(5));
    }

    #[test]
    fn blank_name_falls_back() {
        let mix = build_mix_from_import("   ", &[]);
        assert_eq!(mix.name, IMPORTED_MIX_NAME);
        assert!(mix.tracks.is_empty());
        assert_eq!(mix.start_key, DEFAULT_KEY);
    }

    #[test]
    fn records_deserialize_with_missing_fields() {
        let records: Vec<ExternalTrackRecord> = serde_json::from_str(
            r#"[{"title": "Xtal", "artist": "Aphex Twin", "tempo": 122.0, "raw_key_code": 3}, {"title": "Bare"}]"#,
        )
        .unwrap();
        assert_eq!(records[0].raw_key_code, Some(3));
        assert_eq!(records[1].tempo, None);
        assert_eq!(records[1].artist, "");
    }
}
