//! Derivation of lifecycle timestamps and review signals.
//!
//! Every metric is an independent scan over the merge request's notes and
//! timeline events. Callers pass both streams sorted ascending by timestamp
//! (see [`crate::event::sort_events`] and [`crate::event::sort_notes`]).

use cadence_core::Timestamp;
use serde::{Deserialize, Serialize};

use crate::event::{MergeRequestAuthor, MergeRequestNote, ReviewState, TimelineEvent};

/// Derived lifecycle metrics for one merge request.
///
/// # Examples
///
/// ```
/// use cadence_lifecycle::classify::MergeRequestMetrics;
///
/// let metrics = MergeRequestMetrics::default();
/// assert!(metrics.started_review_at.is_none());
/// assert_eq!(metrics.review_depth, 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequestMetrics {
    /// First commit.
    pub started_coding_at: Option<Timestamp>,
    /// When the change was handed to reviewers.
    pub started_pickup_at: Option<Timestamp>,
    /// First review activity by someone other than the author.
    pub started_review_at: Option<Timestamp>,
    /// All notes plus review and comment events up to merge or close.
    pub review_depth: u32,
    /// Whether any review was submitted.
    pub reviewed: bool,
    /// Whether any review approved the change.
    pub approved: bool,
}

/// Classify a merge request's lifecycle.
///
/// Never fails: missing data yields absent timestamps, zero depth, and
/// `false` flags.
///
/// # Examples
///
/// ```
/// use chrono::DateTime;
/// use cadence_lifecycle::classify::classify;
/// use cadence_lifecycle::event::{MergeRequestAuthor, ReviewState, TimelineEvent};
///
/// let at = |secs| DateTime::from_timestamp(secs, 0).unwrap();
/// let author = MergeRequestAuthor { external_id: "1".into(), created_at: at(0) };
/// let events = vec![
///     TimelineEvent::Committed { timestamp: at(10), committer_external_id: Some("1".into()) },
///     TimelineEvent::Reviewed { timestamp: at(30), actor_id: "4".into(), state: ReviewState::Approved },
///     TimelineEvent::Merged { timestamp: at(40), actor_id: "1".into() },
/// ];
///
/// let metrics = classify(&author, &[], &events);
/// assert_eq!(metrics.started_coding_at, Some(at(10)));
/// assert_eq!(metrics.started_pickup_at, Some(at(10)));
/// assert_eq!(metrics.started_review_at, Some(at(30)));
/// assert_eq!(metrics.review_depth, 1);
/// assert!(metrics.reviewed && metrics.approved);
/// ```
pub fn classify(
    author: &MergeRequestAuthor,
    notes: &[MergeRequestNote],
    events: &[TimelineEvent],
) -> MergeRequestMetrics {
    let started_review_at = started_review_at(author, notes, events);

    MergeRequestMetrics {
        started_coding_at: started_coding_at(events),
        started_pickup_at: started_pickup_at(events, started_review_at),
        started_review_at,
        review_depth: review_depth(notes, events),
        reviewed: events
            .iter()
            .any(|e| matches!(e, TimelineEvent::Reviewed { .. })),
        approved: events.iter().any(|e| {
            matches!(
                e,
                TimelineEvent::Reviewed {
                    state: ReviewState::Approved,
                    ..
                }
            )
        }),
    }
}

fn commit_times(events: &[TimelineEvent]) -> impl Iterator<Item = Timestamp> + '_ {
    events.iter().filter_map(|e| match e {
        TimelineEvent::Committed { timestamp, .. } => Some(*timestamp),
        _ => None,
    })
}

fn started_coding_at(events: &[TimelineEvent]) -> Option<Timestamp> {
    commit_times(events).min()
}

/// The note wins only when strictly earlier than the first review or
/// comment event; on a tie the event's timestamp is used.
fn started_review_at(
    author: &MergeRequestAuthor,
    notes: &[MergeRequestNote],
    events: &[TimelineEvent],
) -> Option<Timestamp> {
    let first_note = notes
        .iter()
        .filter(|note| note.author_external_id != author.external_id)
        .map(|note| note.created_at)
        .min();

    let first_event = events
        .iter()
        .filter_map(|e| match e {
            TimelineEvent::Reviewed {
                timestamp,
                actor_id,
                ..
            }
            | TimelineEvent::Commented {
                timestamp,
                actor_id,
            } if *actor_id != author.external_id => Some(*timestamp),
            _ => None,
        })
        .min();

    match (first_note, first_event) {
        (Some(note), Some(event)) => Some(if note < event { note } else { event }),
        (note, event) => note.or(event),
    }
}

fn started_pickup_at(
    events: &[TimelineEvent],
    started_review_at: Option<Timestamp>,
) -> Option<Timestamp> {
    let before_review = |ts: &Timestamp| started_review_at.map_or(true, |review| *ts < review);

    let last_draft = events
        .iter()
        .filter_map(|e| match e {
            TimelineEvent::ConvertToDraft { timestamp, .. } => Some(*timestamp),
            _ => None,
        })
        .filter(before_review)
        .max();

    let ready = events
        .iter()
        .filter_map(|e| match e {
            TimelineEvent::ReadyForReview { timestamp, .. }
            | TimelineEvent::ReviewRequested { timestamp, .. } => Some(*timestamp),
            _ => None,
        })
        .filter(|ts| last_draft.map_or(true, |draft| *ts > draft))
        .min();

    ready.or_else(|| commit_times(events).filter(before_review).max())
}

fn review_depth(notes: &[MergeRequestNote], events: &[TimelineEvent]) -> u32 {
    let closed_at = events
        .iter()
        .filter_map(|e| match e {
            TimelineEvent::Merged { timestamp, .. } | TimelineEvent::Closed { timestamp, .. } => {
                Some(*timestamp)
            }
            _ => None,
        })
        .min();
    let open_at = |ts: Timestamp| closed_at.map_or(true, |closed| ts <= closed);

    // Notes always count; only review and comment events stop at close.
    let event_count = events
        .iter()
        .filter(|e| {
            matches!(
                e,
                TimelineEvent::Reviewed { .. } | TimelineEvent::Commented { .. }
            ) && open_at(e.timestamp())
        })
        .count();

    (notes.len() + event_count) as u32
}
