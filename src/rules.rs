//! The fixed catalogue of harmonic transitions.
//!
//! Catalogue order matters twice: `suggest` emits rules in that order, and
//! `match_rule` returns the first rule that explains a transition.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::key::{Mode, OpenKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleId {
    Maintain,
    AdjacentNumberUplift,
    AdjacentNumberDownlift,
    AdjacentLetterUplift,
    AdjacentLetterDownlift,
    BoostOneSemitone,
    BoostTwoSemitone,
    ParallelKeyMinor,
    ParallelKeyMajor,
}

impl RuleId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Maintain => "maintain",
            Self::AdjacentNumberUplift => "adjacent-number-uplift",
            Self::AdjacentNumberDownlift => "adjacent-number-downlift",
            Self::AdjacentLetterUplift => "adjacent-letter-uplift",
            Self::AdjacentLetterDownlift => "adjacent-letter-downlift",
            Self::BoostOneSemitone => "boost-one-semitone",
            Self::BoostTwoSemitone => "boost-two-semitone",
            Self::ParallelKeyMinor => "parallel-key-minor",
            Self::ParallelKeyMajor => "parallel-key-major",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CATALOGUE
            .iter()
            .map(|rule| rule.id)
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("unknown harmonic rule '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Smooth,
    Impact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Neutral,
    Tension,
    Darker,
    Brighter,
}

/// Energy class shown next to a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Energy {
    Smooth,
    Impact,
    Tension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Identity,
    Shift(i32),
    SetMode(Mode),
}

impl Transform {
    pub fn apply(self, key: OpenKey) -> OpenKey {
        match self {
            Self::Identity => key,
            Self::Shift(delta) => key.shift(delta),
            Self::SetMode(mode) => key.with_mode(mode),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub id: RuleId,
    pub name: &'static str,
    pub label: &'static str,
    pub category: Category,
    pub mood: Mood,
    pub description: &'static str,
    pub transform: Transform,
}

impl Rule {
    pub fn apply(&self, key: OpenKey) -> OpenKey {
        self.transform.apply(key)
    }

    /// Tension-mood rules read as tension regardless of category.
    pub fn energy(&self) -> Energy {
        if self.mood == Mood::Tension {
            return Energy::Tension;
        }
        match self.category {
            Category::Impact => Energy::Impact,
            Category::Smooth => Energy::Smooth,
        }
    }
}

pub static CATALOGUE: [Rule; 9] = [
    Rule {
        id: RuleId::Maintain,
        name: "Maintain",
        label: "same key",
        category: Category::Smooth,
        mood: Mood::Neutral,
        description: "Identical keys (e.g., 8m \u{2192} 8m) keep the blend seamless and neutral.",
        transform: Transform::Identity,
    },
    Rule {
        id: RuleId::AdjacentNumberUplift,
        name: "Adjacent Number Uplift",
        label: "+1",
        category: Category::Smooth,
        mood: Mood::Tension,
        description: "Move one number up (e.g., 8m \u{2192} 9m) to add drive and tension.",
        transform: Transform::Shift(1),
    },
    Rule {
        id: RuleId::AdjacentNumberDownlift,
        name: "Adjacent Number Downlift",
        label: "-1",
        category: Category::Smooth,
        mood: Mood::Darker,
        description: "Move one number down (e.g., 8m \u{2192} 7m) for a softer, darker feel.",
        transform: Transform::Shift(-1),
    },
    Rule {
        id: RuleId::AdjacentLetterUplift,
        name: "Adjacent Letter Uplift",
        label: "m \u{2192} d",
        category: Category::Smooth,
        mood: Mood::Brighter,
        description: "Switch minor to relative major (e.g., 8m \u{2192} 8d) to brighten.",
        transform: Transform::SetMode(Mode::Major),
    },
    Rule {
        id: RuleId::AdjacentLetterDownlift,
        name: "Adjacent Letter Downlift",
        label: "d \u{2192} m",
        category: Category::Smooth,
        mood: Mood::Darker,
        description: "Switch major to relative minor (e.g., 8d \u{2192} 8m) to add depth.",
        transform: Transform::SetMode(Mode::Minor),
    },
    Rule {
        id: RuleId::BoostOneSemitone,
        name: "Boost One Semitone",
        label: "+7",
        category: Category::Impact,
        mood: Mood::Tension,
        description: "Jump a semitone (e.g., 8m \u{2192} 3m) for dramatic, dissonant tension.",
        transform: Transform::Shift(7),
    },
    Rule {
        id: RuleId::BoostTwoSemitone,
        name: "Boost Two Semitone",
        label: "+2",
        category: Category::Impact,
        mood: Mood::Tension,
        description: "Go up two semitones (e.g., 8m \u{2192} 10m) for an intense energy spike.",
        transform: Transform::Shift(2),
    },
    Rule {
        id: RuleId::ParallelKeyMinor,
        name: "Parallel Key Minor",
        label: "-3",
        category: Category::Impact,
        mood: Mood::Darker,
        description: "Subtract three numbers (e.g., 8d \u{2192} 5d) to keep majors but darken the tone.",
        transform: Transform::Shift(-3),
    },
    Rule {
        id: RuleId::ParallelKeyMajor,
        name: "Parallel Key Major",
        label: "+3",
        category: Category::Impact,
        mood: Mood::Brighter,
        description: "Add three numbers (e.g., 8m \u{2192} 11m) to keep minors but lift the mood.",
        transform: Transform::Shift(3),
    },
];

/// Pseudo-rule for a key the user picked by hand. Not part of the catalogue
/// and never returned by `match_rule`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CustomRule {
    pub id: &'static str,
    pub name: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

pub const CUSTOM_RULE_ID: &str = "custom";

pub const CUSTOM_RULE: CustomRule = CustomRule {
    id: CUSTOM_RULE_ID,
    name: "Custom Key",
    label: "custom",
    description: "Pick any key on the wheel when none of the suggestions fit.",
};

pub fn rule(id: RuleId) -> &'static Rule {
    // RuleId variants are declared in catalogue order.
    &CATALOGUE[id as usize]
}

pub fn apply(id: RuleId, key: OpenKey) -> OpenKey {
    rule(id).apply(key)
}

/// Apply a rule named by its string id.
///
/// # Panics
///
/// Panics on an id outside the catalogue. Callers only pass ids they took
/// from the catalogue, so a miss means the two have drifted apart.
pub fn apply_by_id(id: &str, key: OpenKey) -> OpenKey {
    match id.parse::<RuleId>() {
        Ok(rule_id) => apply(rule_id, key),
        Err(e) => panic!("{e}"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub rule_id: RuleId,
    pub name: &'static str,
    pub label: &'static str,
    pub category: Category,
    pub mood: Mood,
    pub energy: Energy,
    pub description: &'static str,
    pub from_key: String,
    pub to_key: String,
}

/// One suggestion per catalogue rule, in catalogue order.
pub fn suggest(anchor: OpenKey) -> Vec<Suggestion> {
    let from_key = anchor.to_string();
    CATALOGUE
        .iter()
        .map(|rule| Suggestion {
            rule_id: rule.id,
            name: rule.name,
            label: rule.label,
            category: rule.category,
            mood: rule.mood,
            energy: rule.energy(),
            description: rule.description,
            from_key: from_key.clone(),
            to_key: rule.apply(anchor).to_string(),
        })
        .collect()
}

/// First catalogue rule that maps `from` to `to`.
pub fn match_rule(from: OpenKey, to: OpenKey) -> Option<&'static Rule> {
    CATALOGUE.iter().find(|rule| rule.apply(from) == to)
}
