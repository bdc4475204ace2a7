/**
 * Role Capabilities and Presence
 *
 * The owner/moderator/member capability matrix is defined once here and
 * reused by every handler, instead of ad hoc role conditionals per
 * route.
 *
 * Kicking is the one check that depends on the target's role as well as
 * the actor's, so it gets its own function.
 */
use chrono::{DateTime, Duration, Utc};

use crate::shared::types::RoomRole;

/// Seconds since last_seen within which a member counts as online
pub const PRESENCE_WINDOW_SECS: i64 = 300;

/// Room actions gated by membership role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomAction {
    /// Kick a regular member
    KickMember,
    /// Clear the whiteboard
    ClearWhiteboard,
    /// Replace whiteboard state
    DrawWhiteboard,
    /// Unshare a document shared by someone else
    UnshareAnyDocument,
}

/// Capability matrix: which roles may perform which actions
pub fn can_perform(role: RoomRole, action: RoomAction) -> bool {
    match action {
        RoomAction::KickMember => matches!(role, RoomRole::Owner | RoomRole::Moderator),
        RoomAction::ClearWhiteboard => matches!(role, RoomRole::Owner | RoomRole::Moderator),
        RoomAction::DrawWhiteboard => true,
        RoomAction::UnshareAnyDocument => matches!(role, RoomRole::Owner | RoomRole::Moderator),
    }
}

/// Whether `actor_role` may kick a member holding `target_role`
///
/// The owner can never be kicked, and moderators cannot kick their
/// peers.
pub fn can_kick(actor_role: RoomRole, target_role: RoomRole) -> bool {
    if !can_perform(actor_role, RoomAction::KickMember) {
        return false;
    }
    match target_role {
        RoomRole::Owner => false,
        RoomRole::Moderator => actor_role == RoomRole::Owner,
        RoomRole::Member => true,
    }
}

/// Derived online flag for a membership
///
/// A member is online iff they were seen within the presence window.
/// Unset `last_seen` always reads as offline. No online state is
/// persisted.
pub fn is_online(last_seen: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last_seen {
        Some(seen) => now - seen < Duration::seconds(PRESENCE_WINDOW_SECS),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kick_requires_owner_or_moderator() {
        assert!(can_perform(RoomRole::Owner, RoomAction::KickMember));
        assert!(can_perform(RoomRole::Moderator, RoomAction::KickMember));
        assert!(!can_perform(RoomRole::Member, RoomAction::KickMember));
    }

    #[test]
    fn test_clear_requires_owner_or_moderator() {
        assert!(can_perform(RoomRole::Owner, RoomAction::ClearWhiteboard));
        assert!(can_perform(RoomRole::Moderator, RoomAction::ClearWhiteboard));
        assert!(!can_perform(RoomRole::Member, RoomAction::ClearWhiteboard));
    }

    #[test]
    fn test_every_role_can_draw() {
        for role in [RoomRole::Owner, RoomRole::Moderator, RoomRole::Member] {
            assert!(can_perform(role, RoomAction::DrawWhiteboard));
        }
    }

    #[test]
    fn test_owner_is_never_kickable() {
        assert!(!can_kick(RoomRole::Owner, RoomRole::Owner));
        assert!(!can_kick(RoomRole::Moderator, RoomRole::Owner));
        assert!(!can_kick(RoomRole::Member, RoomRole::Owner));
    }

    #[test]
    fn test_moderators_cannot_kick_peers() {
        assert!(!can_kick(RoomRole::Moderator, RoomRole::Moderator));
        assert!(can_kick(RoomRole::Owner, RoomRole::Moderator));
    }

    #[test]
    fn test_members_cannot_kick_anyone() {
        assert!(!can_kick(RoomRole::Member, RoomRole::Member));
        assert!(!can_kick(RoomRole::Member, RoomRole::Moderator));
    }

    #[test]
    fn test_presence_window() {
        let now = Utc::now();
        assert!(is_online(Some(now - Duration::seconds(10)), now));
        assert!(is_online(
            Some(now - Duration::seconds(PRESENCE_WINDOW_SECS - 1)),
            now
        ));
        assert!(!is_online(
            Some(now - Duration::seconds(PRESENCE_WINDOW_SECS)),
            now
        ));
        assert!(!is_online(
            Some(now - Duration::seconds(PRESENCE_WINDOW_SECS + 60)),
            now
        ));
    }

    #[test]
    fn test_unset_last_seen_is_offline() {
        assert!(!is_online(None, Utc::now()));
    }
}
