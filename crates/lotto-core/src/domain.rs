use serde::{Deserialize, Serialize};

use crate::lotto::normalize::pad_digits;

/// One drawing's result, ready for display.
///
/// Numbers are zero-padded display tokens, not arithmetic values. An empty
/// string marks a field the source did not provide.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LottoResult {
    date_th: String,
    first: String,
    last2: String,
    front3: [String; 2],
    last3: [String; 2],
}

impl LottoResult {
    /// Build a result, left-padding the short numeric fields to their widths.
    pub fn new(
        date_th: impl Into<String>,
        first: impl Into<String>,
        last2: impl Into<String>,
        front3: [&str; 2],
        last3: [&str; 2],
    ) -> Self {
        Self {
            date_th: date_th.into(),
            first: first.into(),
            last2: pad_digits(&last2.into(), 2),
            front3: front3.map(|v| pad_digits(v, 3)),
            last3: last3.map(|v| pad_digits(v, 3)),
        }
    }

    /// Draw date, spelled out in Thai.
    pub fn date_th(&self) -> &str {
        &self.date_th
    }

    /// First prize, six digits.
    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn last2(&self) -> &str {
        &self.last2
    }

    pub fn front3(&self) -> &[String; 2] {
        &self.front3
    }

    pub fn last3(&self) -> &[String; 2] {
        &self.last3
    }
}

/// Durable push/multicast destination (group, room or user id).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecipientId(pub String);

impl RecipientId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecipientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an inbound event came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventSource {
    Group {
        group_id: String,
        user_id: Option<String>,
    },
    Room {
        room_id: String,
        user_id: Option<String>,
    },
    User {
        user_id: String,
    },
}

impl EventSource {
    /// Best push target for this source: group, then room, then user.
    pub fn target_id(&self) -> Option<RecipientId> {
        let id = match self {
            EventSource::Group { group_id, .. } => group_id,
            EventSource::Room { room_id, .. } => room_id,
            EventSource::User { user_id } => user_id,
        };
        if id.trim().is_empty() {
            None
        } else {
            Some(RecipientId(id.clone()))
        }
    }

    /// Group id, if the event came from a group. Only groups are ever remembered.
    pub fn group_id(&self) -> Option<&str> {
        match self {
            EventSource::Group { group_id, .. } if !group_id.trim().is_empty() => Some(group_id),
            _ => None,
        }
    }
}

/// The slice of an inbound event the dispatch engine needs.
#[derive(Clone, Debug)]
pub struct EventContext {
    pub reply_token: Option<String>,
    pub source: Option<EventSource>,
}

impl EventContext {
    pub fn target_id(&self) -> Option<RecipientId> {
        self.source.as_ref().and_then(EventSource::target_id)
    }

    pub fn group_id(&self) -> Option<&str> {
        self.source.as_ref().and_then(EventSource::group_id)
    }
}
