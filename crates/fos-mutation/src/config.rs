//! Observation Configuration

use serde::{Deserialize, Serialize};

/// What a summary observer tracks besides child-list structure
///
/// Missing fields deserialize to their defaults, so a partial configuration
/// only overrides what it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserveOptions {
    /// Report attribute additions, removals and changes
    pub track_attributes: bool,

    /// Report character-data changes on text and comment nodes
    pub track_character_data: bool,
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self {
            track_attributes: true,
            track_character_data: true,
        }
    }
}

impl ObserveOptions {
    /// Structure only
    pub fn structure_only() -> Self {
        Self {
            track_attributes: false,
            track_character_data: false,
        }
    }

    pub fn with_attributes(mut self, enabled: bool) -> Self {
        self.track_attributes = enabled;
        self
    }

    pub fn with_character_data(mut self, enabled: bool) -> Self {
        self.track_character_data = enabled;
        self
    }
}
