use std::fmt;

use crate::error::ChatError;

/// Composite room key: one broadcast scope per (group, channel) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomKey {
    pub group_id: String,
    pub channel: String,
}

impl RoomKey {
    pub fn new(group_id: &str, channel: &str) -> Result<Self, ChatError> {
        let group_id = group_id.trim();
        let channel = channel.trim();
        if group_id.is_empty() {
            return Err(ChatError::Validation("groupId must not be empty".into()));
        }
        if channel.is_empty() {
            return Err(ChatError::Validation("channel must not be empty".into()));
        }
        Ok(Self {
            group_id: group_id.to_owned(),
            channel: channel.to_owned(),
        })
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_builds() {
        let key = RoomKey::new(" g1 ", "general").unwrap();
        assert_eq!(key.group_id, "g1");
        assert_eq!(key.channel, "general");
        assert_eq!(key.to_string(), "g1:general");
    }

    #[test]
    fn rejects_empty_fields() {
        assert!(matches!(RoomKey::new("", "general"), Err(ChatError::Validation(_))));
        assert!(matches!(RoomKey::new("g1", "  "), Err(ChatError::Validation(_))));
    }
}
