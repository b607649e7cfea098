//! The Status Document served by a License Status Server.

use crate::error::ParsingResult;
use crate::link::{self, media_type, Link};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status reported by the server. Unknown values are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ready,
    Active,
    Revoked,
    Returned,
    Cancelled,
    Expired,
}

impl Status {
    /// Statuses after which the publication may no longer be read.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Revoked | Self::Returned | Self::Cancelled | Self::Expired
        )
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ready => "ready",
            Self::Active => "active",
            Self::Revoked => "revoked",
            Self::Returned => "returned",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Updated {
    pub license: DateTime<Utc>,
    pub status: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PotentialRights {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Register,
    Renew,
    Return,
    Revoke,
    Cancel,
    #[serde(other)]
    Other,
}

/// One entry of the server's event history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Device id that triggered the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// A parsed Status Document. Replaced wholesale on every refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDocument {
    pub id: String,
    pub status: Status,
    #[serde(default)]
    pub message: String,
    pub updated: Updated,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub potential_rights: Option<PotentialRights>,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl StatusDocument {
    /// Parses a Status Document.
    pub fn parse(bytes: &[u8]) -> ParsingResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serializes the document for persistence.
    pub fn to_json_bytes(&self) -> ParsingResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// When the server last changed the license itself.
    #[must_use]
    pub fn license_updated(&self) -> DateTime<Utc> {
        self.updated.license
    }

    #[must_use]
    pub fn status_updated(&self) -> DateTime<Utc> {
        self.updated.status
    }

    /// Link with `rel` usable for an API call: LCP media types or untyped
    /// links come before HTML pages.
    #[must_use]
    pub fn link(&self, rel: &str) -> Option<&Link> {
        link::find(&self.links, rel, Some(media_type::STATUS)).and_then(|found| {
            if found.media_type.as_deref() != Some(media_type::HTML) {
                return Some(found);
            }
            self.links
                .iter()
                .find(|l| l.has_rel(rel) && l.media_type.as_deref() != Some(media_type::HTML))
                .or(Some(found))
        })
    }

    /// Link with `rel` and exactly the given media type.
    #[must_use]
    pub fn link_of_type(&self, rel: &str, wanted: &str) -> Option<&Link> {
        self.links
            .iter()
            .find(|l| l.has_rel(rel) && l.media_type.as_deref() == Some(wanted))
    }

    /// Events of one kind, in server order.
    pub fn events(&self, kind: EventType) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |e| e.kind == kind)
    }

    /// Number of devices that registered this license.
    #[must_use]
    pub fn registered_devices(&self) -> usize {
        self.events(EventType::Register).count()
    }

    /// Latest timestamp among events of `kind`.
    #[must_use]
    pub fn last_event_date(&self, kind: EventType) -> Option<DateTime<Utc>> {
        self.events(kind).map(|e| e.timestamp).max()
    }

    /// End date the server would accept for a renewal.
    #[must_use]
    pub fn max_renew_date(&self) -> Option<DateTime<Utc>> {
        self.potential_rights.as_ref().and_then(|r| r.end)
    }
}
