// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Labels and their chat associations.

use serde::{Deserialize, Serialize};

/// The fixed palette the client apps render label colors with, indexed by
/// the numeric color id the engine carries.
pub const LABEL_COLOR_PALETTE: [&str; 20] = [
    "#ff9485", "#64c4ff", "#ffd429", "#dfaef0", "#99b6c1", "#55ccb3", "#ff9dff", "#d3a91d",
    "#6d7cce", "#d7e752", "#00d0e2", "#ffc5c7", "#93ceac", "#f74848", "#00a0f2", "#83e422",
    "#ffaf04", "#b5ebff", "#9ba6ff", "#9368cf",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
    /// Index into the client palette.
    pub color: u32,
    /// Resolved hex value, e.g. `#64c4ff`.
    pub color_hex: String,
}

impl Label {
    /// Resolves a palette index to its hex value, clamping unknown indices
    /// to the first entry the way client apps do.
    pub fn color_to_hex(color: u32) -> &'static str {
        LABEL_COLOR_PALETTE
            .get(color as usize)
            .copied()
            .unwrap_or(LABEL_COLOR_PALETTE[0])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelBody {
    pub name: String,
    pub color: u32,
}

/// Reference to an existing label in a set-labels request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetLabelsRequest {
    pub labels: Vec<LabelRef>,
}

/// Payload for `label.chat.added` / `label.chat.deleted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelChatAssociation {
    pub label_id: String,
    pub chat_id: String,
    /// The full label when it was known at event time.
    pub label: Option<Label>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_resolution_clamps_out_of_range() {
        assert_eq!(Label::color_to_hex(1), "#64c4ff");
        assert_eq!(Label::color_to_hex(19), "#9368cf");
        assert_eq!(Label::color_to_hex(500), LABEL_COLOR_PALETTE[0]);
    }
}
