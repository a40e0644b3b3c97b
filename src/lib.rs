//! Harmonic mixing on the Open Key wheel: keys, the transition rule
//! catalogue, mix timelines, playlist import, and share tokens.

pub mod color;
pub mod import;
pub mod key;
pub mod library;
pub mod rules;
pub mod share;
pub mod store;
pub mod templates;
pub mod timeline;

pub use key::{DEFAULT_KEY, Mode, OpenKey};
pub use rules::{Rule, RuleId};
pub use timeline::{Mix, Track};
