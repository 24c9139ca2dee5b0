// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The exposed message-id codec.
//!
//! A message on the public surface is addressed by a single string built
//! from the engine key: `{true|false}_{chatId}_{engineId}[_{participant}]`.
//! Strict parsing round-trips this form exactly; soft parsing additionally
//! accepts a bare engine id and returns a partial key the call site must
//! complete from its own context.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// The fully-resolved identity of a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageKey {
    pub from_me: bool,
    pub chat_id: String,
    pub id: String,
    pub participant: Option<String>,
}

/// A possibly-partial key produced by [`MessageKey::parse_soft`].
///
/// Only `id` is guaranteed; callers fill the rest from request context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftKey {
    pub id: String,
    pub from_me: Option<bool>,
    pub chat_id: Option<String>,
    pub participant: Option<String>,
}

impl MessageKey {
    /// Serializes the key into the exposed message id.
    pub fn serialize(&self) -> String {
        let mut out = format!("{}_{}_{}", self.from_me, self.chat_id, self.id);
        if let Some(participant) = &self.participant {
            out.push('_');
            out.push_str(participant);
        }
        out
    }

    /// Strictly parses an exposed message id back into a key.
    ///
    /// Requires exactly three or four `_`-separated parts and a literal
    /// `true`/`false` direction flag.
    pub fn parse(value: &str) -> Result<Self, EngineError> {
        let parts: Vec<&str> = value.split('_').collect();
        if parts.len() != 3 && parts.len() != 4 {
            return Err(EngineError::precondition(format!(
                "invalid message id: '{value}'"
            )));
        }
        let from_me = match parts[0] {
            "true" => true,
            "false" => false,
            other => {
                return Err(EngineError::precondition(format!(
                    "invalid message id direction flag: '{other}'"
                )));
            }
        };
        Ok(MessageKey {
            from_me,
            chat_id: parts[1].to_string(),
            id: parts[2].to_string(),
            participant: parts.get(3).map(|p| p.to_string()),
        })
    }

    /// Soft-parses an exposed message id.
    ///
    /// A value with no separator at all is accepted as a bare engine id.
    pub fn parse_soft(value: &str) -> Result<SoftKey, EngineError> {
        if !value.contains('_') {
            return Ok(SoftKey {
                id: value.to_string(),
                from_me: None,
                chat_id: None,
                participant: None,
            });
        }
        let key = Self::parse(value)?;
        Ok(SoftKey {
            id: key.id,
            from_me: Some(key.from_me),
            chat_id: Some(key.chat_id),
            participant: key.participant,
        })
    }
}

/// Generates a prefixed random identifier, e.g. `evt_0190f5...`.
pub fn prefixed_id(prefix: &str) -> String {
    format!("{prefix}_{}", uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn serializes_with_and_without_participant() {
        let key = MessageKey {
            from_me: false,
            chat_id: "11111111111@c.us".into(),
            id: "AAAAAAAAAAAAAAAAAAAA".into(),
            participant: None,
        };
        assert_eq!(key.serialize(), "false_11111111111@c.us_AAAAAAAAAAAAAAAAAAAA");

        let group = MessageKey {
            from_me: true,
            chat_id: "123-456@g.us".into(),
            id: "BBBB".into(),
            participant: Some("22222222222@c.us".into()),
        };
        assert_eq!(group.serialize(), "true_123-456@g.us_BBBB_22222222222@c.us");
    }

    #[test]
    fn strict_parse_rejects_malformed_values() {
        assert!(MessageKey::parse("AAAA").is_err());
        assert!(MessageKey::parse("true_onlyone").is_err());
        assert!(MessageKey::parse("yes_123@c.us_AAAA").is_err());
        assert!(MessageKey::parse("true_a_b_c_d").is_err());
    }

    #[test]
    fn soft_parse_accepts_bare_engine_id() {
        let soft = MessageKey::parse_soft("AAAAAAAAAAAAAAAAAAAA").unwrap();
        assert_eq!(soft.id, "AAAAAAAAAAAAAAAAAAAA");
        assert_eq!(soft.from_me, None);
        assert_eq!(soft.chat_id, None);

        let soft = MessageKey::parse_soft("false_123@c.us_AAAA").unwrap();
        assert_eq!(soft.from_me, Some(false));
        assert_eq!(soft.chat_id.as_deref(), Some("123@c.us"));
    }

    #[test]
    fn prefixed_ids_are_unique() {
        let a = prefixed_id("evt");
        let b = prefixed_id("evt");
        assert!(a.starts_with("evt_"));
        assert_ne!(a, b);
    }

    proptest! {
        // Strict serialize/parse is a bijection over ids and jids that
        // contain no underscore, which matches the engine wire format.
        #[test]
        fn serialize_parse_roundtrip(
            from_me in any::<bool>(),
            chat in "[0-9]{5,15}",
            group in any::<bool>(),
            id in "[A-F0-9]{16,32}",
            participant in proptest::option::of("[0-9]{5,15}"),
        ) {
            let chat_id = if group {
                format!("{chat}@g.us")
            } else {
                format!("{chat}@c.us")
            };
            let key = MessageKey {
                from_me,
                chat_id,
                id,
                participant: participant.map(|p| format!("{p}@c.us")),
            };
            let parsed = MessageKey::parse(&key.serialize()).unwrap();
            prop_assert_eq!(parsed, key);
        }
    }
}
