// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Address classification and conversion between the public chat-id form
//! (`123@c.us`) and the engine-native jid form (`123@s.whatsapp.net`).
//!
//! Group, broadcast, newsletter, lid and bot addresses pass through both
//! directions unchanged, as does the literal `me`.

/// Native domain for direct user chats.
pub const USER_SERVER: &str = "s.whatsapp.net";
/// Public suffix for direct user chats.
pub const CUS_SUFFIX: &str = "c.us";
/// The status broadcast pseudo-chat.
pub const STATUS_BROADCAST_JID: &str = "status@broadcast";
/// Self-reference accepted anywhere a chat id is.
pub const MY_SELF: &str = "me";

pub fn is_jid_group(jid: &str) -> bool {
    jid.ends_with("@g.us")
}

pub fn is_jid_broadcast(jid: &str) -> bool {
    jid.ends_with("@broadcast")
}

pub fn is_jid_status_broadcast(jid: &str) -> bool {
    jid == STATUS_BROADCAST_JID
}

pub fn is_jid_newsletter(jid: &str) -> bool {
    jid.ends_with("@newsletter")
}

pub fn is_jid_lid(jid: &str) -> bool {
    jid.ends_with("@lid")
}

pub fn is_jid_bot(jid: &str) -> bool {
    jid.ends_with("@bot")
}

pub fn is_jid_cus(jid: &str) -> bool {
    jid.ends_with("@c.us")
}

pub fn is_jid_user(jid: &str) -> bool {
    jid.ends_with("@s.whatsapp.net")
}

fn is_special(jid: &str) -> bool {
    is_jid_group(jid)
        || is_jid_broadcast(jid)
        || is_jid_newsletter(jid)
        || is_jid_lid(jid)
        || is_jid_bot(jid)
        || jid == MY_SELF
}

/// Converts an engine-native jid to the public chat-id form.
///
/// Strips the domain and any `:device` suffix and appends `@c.us`; special
/// classes and `me` pass through unchanged.
pub fn to_chat_id(jid: &str) -> String {
    if is_special(jid) {
        return jid.to_string();
    }
    let number = jid.split('@').next().unwrap_or(jid);
    let number = number.split(':').next().unwrap_or(number);
    format!("{number}@{CUS_SUFFIX}")
}

/// Converts a public chat id (or bare phone number) to the engine-native jid.
pub fn to_jid(chat_id: &str) -> String {
    if is_special(chat_id) {
        return chat_id.to_string();
    }
    let number = chat_id.split('@').next().unwrap_or(chat_id);
    format!("{number}@{USER_SERVER}")
}

/// Appends `@c.us` when the value carries no domain at all.
pub fn ensure_suffix(phone_or_chat_id: &str) -> String {
    if phone_or_chat_id.contains('@') {
        phone_or_chat_id.to_string()
    } else {
        format!("{phone_or_chat_id}@{CUS_SUFFIX}")
    }
}

/// Extracts the numeric device id from a jid like `123:7@s.whatsapp.net`.
pub fn extract_device_id(jid: &str) -> Option<u32> {
    let local = jid.split('@').next()?;
    let (_, device) = local.split_once(':')?;
    device.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_user_jid_becomes_cus() {
        assert_eq!(to_chat_id("11111111111@s.whatsapp.net"), "11111111111@c.us");
    }

    #[test]
    fn device_suffix_is_stripped() {
        assert_eq!(to_chat_id("11111111111:13@s.whatsapp.net"), "11111111111@c.us");
        assert_eq!(extract_device_id("11111111111:13@s.whatsapp.net"), Some(13));
        assert_eq!(extract_device_id("11111111111@s.whatsapp.net"), None);
    }

    #[test]
    fn special_classes_pass_through_both_ways() {
        for jid in [
            "123-456@g.us",
            "status@broadcast",
            "1234@newsletter",
            "987@lid",
            "42@bot",
            "me",
        ] {
            assert_eq!(to_chat_id(jid), jid);
            assert_eq!(to_jid(jid), jid);
        }
    }

    #[test]
    fn cus_becomes_native_user_jid() {
        assert_eq!(to_jid("11111111111@c.us"), "11111111111@s.whatsapp.net");
        assert_eq!(to_jid("11111111111"), "11111111111@s.whatsapp.net");
    }

    #[test]
    fn ensure_suffix_only_when_bare() {
        assert_eq!(ensure_suffix("11111111111"), "11111111111@c.us");
        assert_eq!(ensure_suffix("123-456@g.us"), "123-456@g.us");
    }
}
