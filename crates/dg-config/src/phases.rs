// phases.rs — The workflow phase vocabulary, read from phases.yaml.
//
// Entries are either bare names or `{ id, description }` maps:
//
//   - research
//   - id: tdd
//     description: Write the failing test first

use serde::{Deserialize, Serialize};

use dg_policy::PhaseVocabulary;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PhaseEntry {
    Name(String),
    Detailed {
        id: String,
        #[serde(default)]
        description: String,
    },
}

impl PhaseEntry {
    pub fn id(&self) -> &str {
        match self {
            PhaseEntry::Name(id) => id,
            PhaseEntry::Detailed { id, .. } => id,
        }
    }
}

/// Phase vocabulary as loaded from disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhaseFile {
    pub phases: Vec<PhaseEntry>,
}

impl PhaseFile {
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.phases.iter().map(PhaseEntry::id)
    }
}

impl PhaseVocabulary for PhaseFile {
    fn contains_phase(&self, phase: &str) -> bool {
        self.ids().any(|id| id == phase)
    }
}
