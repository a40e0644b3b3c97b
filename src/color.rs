use crate::key::{OpenKey, parse_key};

/// Wheel palette, one colour per number. Minor and major keys on the same
/// number share a colour.
pub const COLORS: &[(u8, &str)] = &[
    (1, "#FF1AF1"),
    (2, "#B85FFF"),
    (3, "#068CFF"),
    (4, "#00CDFF"),
    (5, "#00EBE9"),
    (6, "#00D989"),
    (7, "#00FF00"),
    (8, "#70FF00"),
    (9, "#FFD400"),
    (10, "#FF8500"),
    (11, "#FF5500"),
    (12, "#FF2F3E"),
];

/// Shown for text that is not a key.
pub const NEUTRAL_COLOR: &str = "#9CA3AF";

pub fn key_color(key: OpenKey) -> &'static str {
    COLORS
        .iter()
        .find(|(number, _)| *number == key.number())
        .map(|(_, hex)| *hex)
        .unwrap_or(NEUTRAL_COLOR)
}

/// Colour for raw key text. Accepts anything `parse_key` does.
pub fn key_color_for_text(text: &str) -> &'static str {
    parse_key(text).map(key_color).unwrap_or(NEUTRAL_COLOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::all_keys;

    #[test]
    fn every_key_has_a_palette_color() {
        for key in all_keys() {
            assert_ne!(key_color(key), NEUTRAL_COLOR, "no colour for {key}");
        }
    }

    #[test]
    fn modes_share_color() {
        assert_eq!(key_color(OpenKey::minor(8)), "#70FF00");
        assert_eq!(key_color(OpenKey::major(8)), "#70FF00");
    }

    #[test]
    fn text_lookup_accepts_camelot_and_rejects_garbage() {
        assert_eq!(key_color_for_text("1A"), "#FF1AF1");
        assert_eq!(key_color_for_text("12d"), "#FF2F3E");
        assert_eq!(key_color_for_text("13m"), NEUTRAL_COLOR);
        assert_eq!(key_color_for_text(""), NEUTRAL_COLOR);
    }

    #[test]
    fn colors_sorted() {
        for w in COLORS.windows(2) {
            assert!(w[0].0 < w[1].0, "COLORS not sorted: {} >= {}", w[0].0, w[1].0);
        }
    }
}
