//! Review notes, timeline events, and decoding of stored timeline rows.

use std::fmt;
use std::str::FromStr;

use cadence_core::{CadenceError, Timestamp};
use serde::{Deserialize, Serialize};

/// The author of a merge request.
///
/// # Examples
///
/// ```
/// use cadence_lifecycle::event::MergeRequestAuthor;
///
/// let author: MergeRequestAuthor = serde_json::from_str(
///     r#"{"externalId": "42", "createdAt": "2024-03-01T09:00:00Z"}"#,
/// ).unwrap();
/// assert_eq!(author.external_id, "42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequestAuthor {
    /// Forge user id of the author.
    pub external_id: String,
    /// When the merge request was opened.
    pub created_at: Timestamp,
}

/// A human review comment, distinct from timeline events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequestNote {
    /// Forge id of the note.
    pub external_id: String,
    /// When the note was written.
    pub created_at: Timestamp,
    /// Forge user id of the note's author.
    pub author_external_id: String,
}

/// Outcome of a submitted review.
///
/// # Examples
///
/// ```
/// use cadence_lifecycle::event::ReviewState;
///
/// let state: ReviewState = "APPROVED".parse().unwrap();
/// assert_eq!(state, ReviewState::Approved);
/// assert_eq!(ReviewState::ChangesRequested.to_string(), "changes_requested");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    /// Review started but not submitted.
    Pending,
    /// Reviewer approved the change.
    Approved,
    /// Reviewer asked for changes.
    ChangesRequested,
    /// Reviewer left comments without a verdict.
    Commented,
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewState::Pending => write!(f, "pending"),
            ReviewState::Approved => write!(f, "approved"),
            ReviewState::ChangesRequested => write!(f, "changes_requested"),
            ReviewState::Commented => write!(f, "commented"),
        }
    }
}

impl FromStr for ReviewState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ReviewState::Pending),
            "approved" => Ok(ReviewState::Approved),
            "changes_requested" => Ok(ReviewState::ChangesRequested),
            "commented" => Ok(ReviewState::Commented),
            other => Err(format!("unknown review state: {other}")),
        }
    }
}

/// A typed, timestamped lifecycle event recorded against a merge request.
///
/// # Examples
///
/// ```
/// use cadence_lifecycle::event::{ReviewState, TimelineEvent};
///
/// let event: TimelineEvent = serde_json::from_str(
///     r#"{"type": "reviewed", "timestamp": "2024-03-01T10:00:00Z", "actorId": "7", "state": "approved"}"#,
/// ).unwrap();
/// assert!(matches!(event, TimelineEvent::Reviewed { state: ReviewState::Approved, .. }));
/// assert_eq!(event.actor(), Some("7"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum TimelineEvent {
    /// A commit was pushed. Bot commits may have no committer id.
    Committed {
        /// When the commit was made.
        timestamp: Timestamp,
        /// Forge user id of the committer.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        committer_external_id: Option<String>,
    },
    /// A review was submitted.
    Reviewed {
        /// When the review was submitted.
        timestamp: Timestamp,
        /// Reviewer id.
        actor_id: String,
        /// Review outcome.
        state: ReviewState,
    },
    /// A timeline comment was posted.
    Commented {
        /// When the comment was posted.
        timestamp: Timestamp,
        /// Commenter id.
        actor_id: String,
    },
    /// A reviewer was requested.
    ReviewRequested {
        /// When the request was made.
        timestamp: Timestamp,
        /// Requester id.
        actor_id: String,
    },
    /// The merge request left draft state.
    ReadyForReview {
        /// When the state changed.
        timestamp: Timestamp,
        /// Who changed it.
        actor_id: String,
    },
    /// The merge request was turned back into a draft.
    ConvertToDraft {
        /// When the state changed.
        timestamp: Timestamp,
        /// Who changed it.
        actor_id: String,
    },
    /// The merge request was merged.
    Merged {
        /// When it was merged.
        timestamp: Timestamp,
        /// Who merged it.
        actor_id: String,
    },
    /// The merge request was closed.
    Closed {
        /// When it was closed.
        timestamp: Timestamp,
        /// Who closed it.
        actor_id: String,
    },
}

impl TimelineEvent {
    /// When the event happened.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            TimelineEvent::Committed { timestamp, .. }
            | TimelineEvent::Reviewed { timestamp, .. }
            | TimelineEvent::Commented { timestamp, .. }
            | TimelineEvent::ReviewRequested { timestamp, .. }
            | TimelineEvent::ReadyForReview { timestamp, .. }
            | TimelineEvent::ConvertToDraft { timestamp, .. }
            | TimelineEvent::Merged { timestamp, .. }
            | TimelineEvent::Closed { timestamp, .. } => *timestamp,
        }
    }

    /// Who caused the event; the committer for commits, if known.
    pub fn actor(&self) -> Option<&str> {
        match self {
            TimelineEvent::Committed {
                committer_external_id,
                ..
            } => committer_external_id.as_deref(),
            TimelineEvent::Reviewed { actor_id, .. }
            | TimelineEvent::Commented { actor_id, .. }
            | TimelineEvent::ReviewRequested { actor_id, .. }
            | TimelineEvent::ReadyForReview { actor_id, .. }
            | TimelineEvent::ConvertToDraft { actor_id, .. }
            | TimelineEvent::Merged { actor_id, .. }
            | TimelineEvent::Closed { actor_id, .. } => Some(actor_id.as_str()),
        }
    }

    /// The event's type without its payload.
    pub fn kind(&self) -> EventKind {
        match self {
            TimelineEvent::Committed { .. } => EventKind::Committed,
            TimelineEvent::Reviewed { .. } => EventKind::Reviewed,
            TimelineEvent::Commented { .. } => EventKind::Commented,
            TimelineEvent::ReviewRequested { .. } => EventKind::ReviewRequested,
            TimelineEvent::ReadyForReview { .. } => EventKind::ReadyForReview,
            TimelineEvent::ConvertToDraft { .. } => EventKind::ConvertToDraft,
            TimelineEvent::Merged { .. } => EventKind::Merged,
            TimelineEvent::Closed { .. } => EventKind::Closed,
        }
    }
}

/// Payload-free discriminant of a [`TimelineEvent`], spelled the way forges
/// and extraction storage spell the `type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `committed`
    Committed,
    /// `reviewed`
    Reviewed,
    /// `commented`
    Commented,
    /// `review_requested`
    ReviewRequested,
    /// `ready_for_review`
    ReadyForReview,
    /// `convert_to_draft`
    ConvertToDraft,
    /// `merged`
    Merged,
    /// `closed`
    Closed,
}

impl EventKind {
    /// The storage spelling of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Committed => "committed",
            EventKind::Reviewed => "reviewed",
            EventKind::Commented => "commented",
            EventKind::ReviewRequested => "review_requested",
            EventKind::ReadyForReview => "ready_for_review",
            EventKind::ConvertToDraft => "convert_to_draft",
            EventKind::Merged => "merged",
            EventKind::Closed => "closed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "committed" => Ok(EventKind::Committed),
            "reviewed" => Ok(EventKind::Reviewed),
            "commented" => Ok(EventKind::Commented),
            "review_requested" => Ok(EventKind::ReviewRequested),
            "ready_for_review" => Ok(EventKind::ReadyForReview),
            "convert_to_draft" => Ok(EventKind::ConvertToDraft),
            "merged" => Ok(EventKind::Merged),
            "closed" => Ok(EventKind::Closed),
            other => Err(format!("unknown event type: {other}")),
        }
    }
}

/// A timeline row as stored by extraction: a free-form `type` string and an
/// optional serialized JSON payload.
///
/// # Examples
///
/// ```
/// use cadence_lifecycle::event::{RawTimelineEvent, ReviewState, TimelineEvent};
///
/// let raw: RawTimelineEvent = serde_json::from_str(
///     r#"{"type": "reviewed", "timestamp": "2024-03-01T10:00:00Z", "actorId": "7", "data": "{\"state\":\"CHANGES_REQUESTED\"}"}"#,
/// ).unwrap();
/// let event = raw.decode().unwrap().unwrap();
/// assert!(matches!(event, TimelineEvent::Reviewed { state: ReviewState::ChangesRequested, .. }));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTimelineEvent {
    /// Event type as reported by the forge.
    #[serde(rename = "type")]
    pub kind: String,
    /// When the event happened.
    pub timestamp: Timestamp,
    /// Who caused the event.
    #[serde(default)]
    pub actor_id: Option<String>,
    /// Serialized JSON payload.
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventPayload {
    state: Option<String>,
    committer_external_id: Option<String>,
}

impl RawTimelineEvent {
    /// Convert the row into a typed event, parsing its payload once.
    ///
    /// Rows whose `type` is not one of the lifecycle event kinds (labels,
    /// assignments, ...) decode to `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`CadenceError::InvalidEvent`] if the payload is not valid
    /// JSON, a `reviewed` row has no recognizable state, or a non-commit row
    /// has no actor.
    pub fn decode(self) -> Result<Option<TimelineEvent>, CadenceError> {
        let Ok(kind) = self.kind.parse::<EventKind>() else {
            return Ok(None);
        };
        let payload = self.payload()?;
        let timestamp = self.timestamp;
        let actor = self.actor_id;
        let require_actor = |actor: Option<String>| {
            actor.ok_or_else(|| {
                CadenceError::InvalidEvent(format!("{kind} event at {timestamp} has no actor"))
            })
        };

        let event = match kind {
            EventKind::Committed => TimelineEvent::Committed {
                timestamp,
                committer_external_id: actor.or(payload.committer_external_id),
            },
            EventKind::Reviewed => {
                let state = payload
                    .state
                    .ok_or_else(|| {
                        CadenceError::InvalidEvent(format!(
                            "reviewed event at {timestamp} has no state"
                        ))
                    })?
                    .parse::<ReviewState>()
                    .map_err(CadenceError::InvalidEvent)?;
                TimelineEvent::Reviewed {
                    timestamp,
                    actor_id: require_actor(actor)?,
                    state,
                }
            }
            EventKind::Commented => TimelineEvent::Commented {
                timestamp,
                actor_id: require_actor(actor)?,
            },
            EventKind::ReviewRequested => TimelineEvent::ReviewRequested {
                timestamp,
                actor_id: require_actor(actor)?,
            },
            EventKind::ReadyForReview => TimelineEvent::ReadyForReview {
                timestamp,
                actor_id: require_actor(actor)?,
            },
            EventKind::ConvertToDraft => TimelineEvent::ConvertToDraft {
                timestamp,
                actor_id: require_actor(actor)?,
            },
            EventKind::Merged => TimelineEvent::Merged {
                timestamp,
                actor_id: require_actor(actor)?,
            },
            EventKind::Closed => TimelineEvent::Closed {
                timestamp,
                actor_id: require_actor(actor)?,
            },
        };

        Ok(Some(event))
    }

    fn payload(&self) -> Result<EventPayload, CadenceError> {
        match self.data.as_deref().map(str::trim) {
            None | Some("") => Ok(EventPayload::default()),
            Some(data) => serde_json::from_str(data).map_err(|e| {
                CadenceError::InvalidEvent(format!(
                    "{} event at {} has an unreadable payload: {e}",
                    self.kind, self.timestamp
                ))
            }),
        }
    }
}

/// Decode stored rows, dropping rows of unrelated types.
///
/// # Errors
///
/// Returns the first [`CadenceError::InvalidEvent`] encountered.
///
/// # Examples
///
/// ```
/// use cadence_lifecycle::event::{decode_events, RawTimelineEvent};
///
/// let rows: Vec<RawTimelineEvent> = serde_json::from_str(r#"[
///     {"type": "labeled", "timestamp": "2024-03-01T09:00:00Z", "actorId": "1"},
///     {"type": "merged", "timestamp": "2024-03-01T10:00:00Z", "actorId": "1"}
/// ]"#).unwrap();
/// let events = decode_events(rows).unwrap();
/// assert_eq!(events.len(), 1);
/// ```
pub fn decode_events(
    rows: impl IntoIterator<Item = RawTimelineEvent>,
) -> Result<Vec<TimelineEvent>, CadenceError> {
    let mut events = Vec::new();
    for row in rows {
        events.extend(row.decode()?);
    }
    Ok(events)
}

/// Sort events ascending by timestamp, keeping arrival order on ties.
pub fn sort_events(events: &mut [TimelineEvent]) {
    events.sort_by_key(TimelineEvent::timestamp);
}

/// Sort notes ascending by creation time, keeping arrival order on ties.
pub fn sort_notes(notes: &mut [MergeRequestNote]) {
    notes.sort_by_key(|note| note.created_at);
}
