use serde::Serialize;

use crate::key::{OpenKey, parse_key};
use crate::timeline::{CreateMixOptions, Mix};

/// Starter key progression a new mix can be seeded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Template {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub keys: &'static [&'static str],
}

pub const TEMPLATES: &[Template] = &[
    Template {
        id: "adjacent-flow",
        name: "Adjacent Flow",
        description: "Ride clockwise neighbors (\u{b1}1) for butter-smooth phrasing and steady tension.",
        keys: &["7m", "8m", "9m", "10m"],
    },
    Template {
        id: "relative-lift",
        name: "Relative Mood Lift",
        description: "Alternate minor \u{2194} relative major (same number) to brighten vocals without clashes.",
        keys: &["8m", "8d", "9d", "9m"],
    },
    Template {
        id: "energy-boost",
        name: "Energy Boost",
        description: "Use +7/+2 jumps for semitone cross-wheel spikes, perfect for peak-time drops.",
        keys: &["8m", "3m", "10m", "5m"],
    },
    Template {
        id: "tension-release",
        name: "Tension & Release",
        description: "Creep through minors, then resolve into parallel/relative majors for payoff.",
        keys: &["9m", "10m", "10d", "9d"],
    },
];

pub fn template(id: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.id == id)
}

impl Template {
    pub fn seed_keys(&self) -> Vec<OpenKey> {
        self.keys.iter().filter_map(|text| parse_key(text)).collect()
    }

    pub fn create_mix(&self) -> Mix {
        Mix::create(CreateMixOptions {
            name: Some(self.name.to_string()),
            seed_keys: self.seed_keys(),
            start_key: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::OPENING_TRACK_TITLE;

    #[test]
    fn every_template_key_parses() {
        for template in TEMPLATES {
            assert_eq!(
                template.seed_keys().len(),
                template.keys.len(),
                "template {} has an unparsable key",
                template.id
            );
        }
    }

    #[test]
    fn lookup_by_id() {
        assert_eq!(template("energy-boost").map(|t| t.name), Some("Energy Boost"));
        assert!(template("missing").is_none());
    }

    #[test]
    fn create_mix_seeds_keys_and_name() {
        let mix = template("relative-lift").unwrap().create_mix();
        assert_eq!(mix.name, "Relative Mood Lift");
        let keys: Vec<String> = mix.tracks.iter().map(|t| t.key.to_string()).collect();
        assert_eq!(keys, vec!["8m", "8d", "9d", "9m"]);
        assert_eq!(mix.tracks[0].title, OPENING_TRACK_TITLE);
        assert_eq!(mix.start_key, OpenKey::minor(8));
    }

    #[test]
    fn energy_boost_follows_impact_rules() {
        let mix = template("energy-boost").unwrap().create_mix();
        let labels: Vec<String> = mix.transitions().into_iter().map(|t| t.label).collect();
        assert_eq!(
            labels,
            vec!["Start", "Boost One Semitone", "Boost One Semitone", "Boost One Semitone"]
        );
    }
}
