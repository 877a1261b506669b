use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Canonical ticket lifecycle. Both older label sets (`Open / In Progress /
/// Resolved` and `submitted / under_review / ...`) parse into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    UnderReview,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 5] = [
        TicketStatus::Open,
        TicketStatus::UnderReview,
        TicketStatus::InProgress,
        TicketStatus::Resolved,
        TicketStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::UnderReview => "under_review",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }

    pub fn allowed_transitions(&self) -> &'static [TicketStatus] {
        use TicketStatus::*;
        match self {
            Open => &[UnderReview, InProgress, Resolved, Closed],
            UnderReview => &[Open, InProgress, Resolved, Closed],
            InProgress => &[UnderReview, Resolved, Closed],
            Resolved => &[InProgress, Closed],
            Closed => &[Open],
        }
    }

    pub fn can_transition_to(&self, next: TicketStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, TicketStatus::Resolved | TicketStatus::Closed)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "open" | "submitted" | "new" => Ok(TicketStatus::Open),
            "under_review" | "review" | "triage" => Ok(TicketStatus::UnderReview),
            "in_progress" => Ok(TicketStatus::InProgress),
            "resolved" => Ok(TicketStatus::Resolved),
            "closed" => Ok(TicketStatus::Closed),
            other => Err(format!("unknown ticket status '{}'", other)),
        }
    }
}

impl<'de> Deserialize<'de> for TicketStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" | "normal" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" | "urgent" => Ok(Priority::Critical),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Comment {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub body: String,
    /// Staff-only note, hidden from the requester.
    #[serde(default)]
    pub internal: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusChange {
    #[schema(value_type = String)]
    pub from: TicketStatus,
    #[schema(value_type = String)]
    pub to: TicketStatus,
    pub changed_by: Uuid,
    pub note: Option<String>,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Rating {
    pub score: u8,
    pub feedback: Option<String>,
    pub rated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Ticket {
    pub id: Uuid,
    pub ticket_number: String,
    pub title: String,
    pub description: String,
    pub category: String,
    #[schema(value_type = String)]
    #[serde(default)]
    pub priority: Priority,
    #[schema(value_type = String)]
    pub status: TicketStatus,
    pub created_by: Uuid,
    pub assigned_to: Option<Uuid>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub history: Vec<StatusChange>,
    pub rating: Option<Rating>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Moves the ticket to `to`, recording the change. Returns `false` when the
    /// ticket is already in that state. Transition legality is checked by the
    /// caller.
    pub fn apply_status(
        &mut self,
        to: TicketStatus,
        changed_by: Uuid,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> bool {
        if self.status == to {
            return false;
        }

        self.history.push(StatusChange {
            from: self.status,
            to,
            changed_by,
            note,
            changed_at: now,
        });
        self.status = to;

        match to {
            TicketStatus::Resolved => {
                self.resolved_at = Some(now);
                self.closed_at = None;
            }
            TicketStatus::Closed => {
                self.closed_at = Some(now);
            }
            _ => {
                self.resolved_at = None;
                self.closed_at = None;
                self.rating = None;
            }
        }
        true
    }

    pub fn without_internal_comments(mut self) -> Self {
        self.comments.retain(|c| !c.internal);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTicket {
    pub ticket_number: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: Priority,
    pub status: TicketStatus,
    pub created_by: Uuid,
    pub assigned_to: Option<Uuid>,
    pub comments: Vec<Comment>,
    pub history: Vec<StatusChange>,
    pub rating: Option<Rating>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(status: TicketStatus) -> Ticket {
        let now = Utc::now();
        Ticket {
            id: Uuid::new_v4(),
            ticket_number: "TKT-000001".into(),
            title: "VPN down".into(),
            description: "Cannot connect".into(),
            category: "network".into(),
            priority: Priority::High,
            status,
            created_by: Uuid::new_v4(),
            assigned_to: None,
            comments: Vec::new(),
            history: Vec::new(),
            rating: None,
            resolved_at: None,
            closed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn both_legacy_vocabularies_parse() {
        assert_eq!("submitted".parse::<TicketStatus>().unwrap(), TicketStatus::Open);
        assert_eq!("Open".parse::<TicketStatus>().unwrap(), TicketStatus::Open);
        assert_eq!("In Progress".parse::<TicketStatus>().unwrap(), TicketStatus::InProgress);
        assert_eq!("in-progress".parse::<TicketStatus>().unwrap(), TicketStatus::InProgress);
        assert_eq!("under_review".parse::<TicketStatus>().unwrap(), TicketStatus::UnderReview);
        assert_eq!("Resolved".parse::<TicketStatus>().unwrap(), TicketStatus::Resolved);
        assert!("done".parse::<TicketStatus>().is_err());
    }

    #[test]
    fn transition_table() {
        use TicketStatus::*;
        assert!(Open.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Resolved));
        assert!(Resolved.can_transition_to(Closed));
        assert!(Resolved.can_transition_to(InProgress));
        assert!(Closed.can_transition_to(Open));

        assert!(!Closed.can_transition_to(Resolved));
        assert!(!Closed.can_transition_to(InProgress));
        assert!(!Resolved.can_transition_to(Open));
        assert!(!InProgress.can_transition_to(Open));
        for s in TicketStatus::ALL {
            assert!(!s.can_transition_to(s));
        }
    }

    #[test]
    fn apply_status_records_history_and_stamps() {
        let actor = Uuid::new_v4();
        let now = Utc::now();
        let mut t = ticket(TicketStatus::InProgress);

        assert!(t.apply_status(TicketStatus::Resolved, actor, Some("rebooted".into()), now));
        assert_eq!(t.resolved_at, Some(now));
        assert_eq!(t.history.len(), 1);
        assert_eq!(t.history[0].from, TicketStatus::InProgress);
        assert_eq!(t.history[0].to, TicketStatus::Resolved);

        assert!(t.apply_status(TicketStatus::Closed, actor, None, now));
        assert_eq!(t.closed_at, Some(now));
        assert_eq!(t.resolved_at, Some(now));

        assert!(t.apply_status(TicketStatus::Open, actor, None, now));
        assert!(t.resolved_at.is_none());
        assert!(t.closed_at.is_none());

        assert!(!t.apply_status(TicketStatus::Open, actor, None, now));
        assert_eq!(t.history.len(), 3);
    }

    #[test]
    fn reopening_drops_the_rating() {
        let actor = Uuid::new_v4();
        let now = Utc::now();
        let mut t = ticket(TicketStatus::Resolved);
        t.resolved_at = Some(now);
        t.rating = Some(Rating {
            score: 1,
            feedback: Some("still broken".into()),
            rated_at: now,
        });

        assert!(t.apply_status(TicketStatus::Closed, actor, None, now));
        assert!(t.rating.is_some());

        assert!(t.apply_status(TicketStatus::Open, actor, None, now));
        assert!(t.rating.is_none());
    }

    #[test]
    fn internal_comments_can_be_stripped() {
        let mut t = ticket(TicketStatus::Open);
        for internal in [false, true] {
            t.comments.push(Comment {
                id: Uuid::new_v4(),
                author_id: Uuid::new_v4(),
                author_name: "Sam".into(),
                body: "note".into(),
                internal,
                created_at: Utc::now(),
            });
        }
        let public = t.without_internal_comments();
        assert_eq!(public.comments.len(), 1);
        assert!(!public.comments[0].internal);
    }
}
