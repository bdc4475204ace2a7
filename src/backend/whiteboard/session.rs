/**
 * Whiteboard Mutation Phases
 *
 * Every state-replacing write is composed of two phases, kept as
 * separate functions so each is testable on its own:
 *
 * 1. `snapshot_before_mutation` - drafts the history row documenting
 *    the state being replaced, or nothing when the prior canvas was
 *    empty
 * 2. the version bump (`next_version`) and state swap, applied by the
 *    database layer with an optimistic `WHERE version = N` guard
 *
 * The ordering is load-bearing: history is written with the
 * *pre-mutation* version and state, so the history row tagged version N
 * always reconstructs the canvas exactly as it was at version N. The
 * live session row always holds the latest state.
 */
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::shared::canvas::CanvasState;

/// A whiteboard session as read from storage
///
/// `state_json` is the serialized canvas, NULL until the first write.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub room_id: Uuid,
    pub state_json: Option<String>,
    pub last_modified_by: Option<Uuid>,
    pub version: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRow {
    /// Deserialize the stored canvas state
    ///
    /// Unwritten or undecodable state reads as the empty canvas, so a
    /// corrupt blob can never wedge a room.
    pub fn canvas(&self) -> CanvasState {
        self.state_json
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_else(CanvasState::empty)
    }

    /// Total element count of the current canvas
    pub fn element_count(&self) -> usize {
        self.canvas().element_count()
    }
}

/// A history row drafted before a mutation is applied
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryDraft {
    /// The pre-mutation version this snapshot documents
    pub version: i32,
    /// The pre-mutation canvas, serialized
    pub state_json: String,
    /// Who produced the state being archived (falls back to the current
    /// actor for sessions that predate modifier tracking)
    pub modified_by: Uuid,
    pub change_description: String,
}

/// Phase one: draft the history snapshot for a pending mutation
///
/// Returns `None` when the session holds no elements yet; empty prior
/// states are not archived, which is why the very first write to a
/// fresh session produces no history row.
pub fn snapshot_before_mutation(
    session: &SessionRow,
    actor: Uuid,
    change_description: String,
) -> Option<HistoryDraft> {
    let state_json = session.state_json.as_deref()?;
    if session.canvas().is_empty() {
        return None;
    }

    Some(HistoryDraft {
        version: session.version,
        state_json: state_json.to_string(),
        modified_by: session.last_modified_by.unwrap_or(actor),
        change_description,
    })
}

/// Phase two's version: each state-replacing write advances by exactly 1
pub fn next_version(session: &SessionRow) -> i32 {
    session.version + 1
}

/// History description for a routine update
pub fn update_description(version: i32) -> String {
    format!("Version {version}")
}

/// History description for a clear
pub fn clear_description(version: i32) -> String {
    format!("Before clearing - Version {version}")
}
