/**
 * Room Roles, Share Permissions, and Event Vocabulary
 *
 * These enums round-trip through TEXT columns in the database. Parsing
 * is explicit: an unrecognized stored value is a data error surfaced by
 * the caller, never silently coerced.
 */
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a user within a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomRole {
    Owner,
    Moderator,
    Member,
}

impl RoomRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomRole::Owner => "owner",
            RoomRole::Moderator => "moderator",
            RoomRole::Member => "member",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "owner" => Some(RoomRole::Owner),
            "moderator" => Some(RoomRole::Moderator),
            "member" => Some(RoomRole::Member),
            _ => None,
        }
    }
}

impl fmt::Display for RoomRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission tier for a document shared into a room
///
/// Tiers are cumulative: read ⊂ write ⊂ admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharePermission {
    Read,
    Write,
    Admin,
}

impl SharePermission {
    pub fn as_str(&self) -> &'static str {
        match self {
            SharePermission::Read => "read",
            SharePermission::Write => "write",
            SharePermission::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "read" => Some(SharePermission::Read),
            "write" => Some(SharePermission::Write),
            "admin" => Some(SharePermission::Admin),
            _ => None,
        }
    }

    /// Derived capability flags for a stored tier
    pub fn can_read(&self) -> bool {
        true
    }

    pub fn can_write(&self) -> bool {
        matches!(self, SharePermission::Write | SharePermission::Admin)
    }

    pub fn can_admin(&self) -> bool {
        matches!(self, SharePermission::Admin)
    }
}

impl fmt::Display for SharePermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type of collaboration event recorded in a room's audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollabEventType {
    MemberKick,
    MemberPromotion,
    WhiteboardUpdate,
    WhiteboardClear,
    DocumentShare,
    DocumentUnshare,
}

impl CollabEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollabEventType::MemberKick => "member_kick",
            CollabEventType::MemberPromotion => "member_promotion",
            CollabEventType::WhiteboardUpdate => "whiteboard_update",
            CollabEventType::WhiteboardClear => "whiteboard_clear",
            CollabEventType::DocumentShare => "document_share",
            CollabEventType::DocumentUnshare => "document_unshare",
        }
    }
}

impl fmt::Display for CollabEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
