use std::collections::BTreeMap;

use serde_json::Value as JsonValue;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::store::{JsonStore, Query, Table};
use crate::dto::ticket_dto::{
    CreateCommentPayload, CreateTicketPayload, RateTicketPayload, TicketListQuery, TicketStats,
    UpdateTicketPayload,
};
use crate::error::{Error, Result};
use crate::models::ticket::{Comment, NewTicket, Priority, Rating, Ticket, TicketStatus};
use crate::models::user::User;
use crate::services::user_service::UserService;
use crate::utils::{time, validation};

#[derive(Clone)]
pub struct TicketService {
    store: JsonStore,
    users: UserService,
}

/// Who may see a ticket: staff see everything, requesters see their own.
fn can_view(actor: &User, ticket: &Ticket) -> bool {
    actor.role.is_staff() || ticket.created_by == actor.id
}

fn ensure_can_view(actor: &User, ticket: &Ticket) -> Result<()> {
    if can_view(actor, ticket) {
        Ok(())
    } else {
        Err(Error::Forbidden("You do not have access to this ticket".into()))
    }
}

/// Checks the transition against the status graph and the actor's role.
/// Requesters may only accept (`resolved -> closed`) or reopen
/// (`resolved -> in_progress`) their own ticket.
pub fn authorize_transition(actor: &User, ticket: &Ticket, to: TicketStatus) -> Result<()> {
    let from = ticket.status;
    if from == to {
        return Ok(());
    }
    if !from.can_transition_to(to) {
        return Err(Error::Conflict(format!(
            "Cannot move ticket from {} to {}",
            from, to
        )));
    }
    if actor.role.is_staff() {
        return Ok(());
    }
    let owner_move = ticket.created_by == actor.id
        && from == TicketStatus::Resolved
        && matches!(to, TicketStatus::Closed | TicketStatus::InProgress);
    if owner_move {
        Ok(())
    } else {
        Err(Error::Forbidden(
            "Only IT staff can change this ticket's status".into(),
        ))
    }
}

fn next_ticket_number(rows: &[JsonValue]) -> String {
    let highest = rows
        .iter()
        .filter_map(|r| {
            r.get("ticket_number")?
                .as_str()?
                .strip_prefix("TKT-")?
                .parse::<u64>()
                .ok()
        })
        .max()
        .unwrap_or(0);
    format!("TKT-{:06}", highest + 1)
}

impl TicketService {
    pub fn new(store: JsonStore, users: UserService) -> Self {
        Self { store, users }
    }

    pub async fn create(&self, actor: &User, payload: CreateTicketPayload) -> Result<Ticket> {
        validation::require_non_blank("title", &payload.title)?;
        validation::require_non_blank("description", &payload.description)?;

        let ticket: Ticket = self
            .store
            .insert_with(Table::Tickets, |rows| {
                let new_ticket = NewTicket {
                    ticket_number: next_ticket_number(rows),
                    title: payload.title.trim().to_string(),
                    description: payload.description,
                    category: payload.category.trim().to_lowercase(),
                    priority: payload.priority.unwrap_or_default(),
                    status: TicketStatus::Open,
                    created_by: actor.id,
                    assigned_to: None,
                    comments: Vec::new(),
                    history: Vec::new(),
                    rating: None,
                    resolved_at: None,
                    closed_at: None,
                };
                Ok(serde_json::to_value(new_ticket)?)
            })
            .await?;

        info!(ticket_id = %ticket.id, number = %ticket.ticket_number, by = %actor.id, "ticket created");
        Ok(ticket)
    }

    pub async fn list(&self, actor: &User, query: TicketListQuery) -> Result<Vec<Ticket>> {
        let created_by = if actor.role.is_staff() {
            query.created_by
        } else {
            Some(actor.id)
        };

        let filter = Query::new()
            .eq_opt("assigned_to", query.assigned_to)
            .eq_opt("created_by", created_by);

        // rows may hold legacy labels; compare decoded values
        let category = query.category.map(|c| c.trim().to_lowercase());
        let mut tickets: Vec<Ticket> = self
            .store
            .find::<Ticket>(Table::Tickets, &filter)
            .await?
            .into_iter()
            .filter(|t| query.status.map_or(true, |s| t.status == s))
            .filter(|t| query.priority.map_or(true, |p| t.priority == p))
            .filter(|t| {
                category
                    .as_deref()
                    .map_or(true, |c| t.category.to_lowercase() == c)
            })
            .collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        if actor.role.is_staff() {
            Ok(tickets)
        } else {
            Ok(tickets
                .into_iter()
                .map(Ticket::without_internal_comments)
                .collect())
        }
    }

    pub async fn get(&self, actor: &User, id: Uuid) -> Result<Ticket> {
        let ticket = self.load(id).await?;
        ensure_can_view(actor, &ticket)?;
        Ok(self.present(actor, ticket))
    }

    pub async fn update(
        &self,
        actor: &User,
        id: Uuid,
        payload: UpdateTicketPayload,
    ) -> Result<Ticket> {
        if let Some(assignee) = payload.assigned_to {
            if !actor.role.is_staff() {
                return Err(Error::Forbidden("Only IT staff can assign tickets".into()));
            }
            if let Some(assignee) = assignee {
                self.users.get_assignable(assignee).await?;
            }
        }

        let now = time::now();
        let ticket = self
            .mutate(id, |ticket| {
                ensure_can_view(actor, ticket)?;

                let edits_fields = payload.title.is_some()
                    || payload.description.is_some()
                    || payload.category.is_some()
                    || payload.priority.is_some();
                if edits_fields
                    && !actor.role.is_staff()
                    && ticket.status != TicketStatus::Open
                {
                    return Err(Error::Conflict(
                        "Tickets can only be edited while they are open".into(),
                    ));
                }

                if let Some(title) = &payload.title {
                    validation::require_non_blank("title", title)?;
                    ticket.title = title.trim().to_string();
                }
                if let Some(description) = &payload.description {
                    ticket.description = description.clone();
                }
                if let Some(category) = &payload.category {
                    ticket.category = category.trim().to_lowercase();
                }
                if let Some(priority) = payload.priority {
                    ticket.priority = priority;
                }
                if let Some(assignee) = payload.assigned_to {
                    ticket.assigned_to = assignee;
                }
                if let Some(status) = payload.status {
                    authorize_transition(actor, ticket, status)?;
                    ticket.apply_status(status, actor.id, None, now);
                }
                Ok(())
            })
            .await?;

        Ok(self.present(actor, ticket))
    }

    pub async fn change_status(
        &self,
        actor: &User,
        id: Uuid,
        status: TicketStatus,
        note: Option<String>,
    ) -> Result<Ticket> {
        let now = time::now();
        let mut from = None;
        let ticket = self
            .mutate(id, |ticket| {
                ensure_can_view(actor, ticket)?;
                if let Err(e) = authorize_transition(actor, ticket, status) {
                    warn!(ticket_id = %ticket.id, from = %ticket.status, to = %status, by = %actor.id, "status change rejected");
                    return Err(e);
                }
                from = Some(ticket.status);
                ticket.apply_status(status, actor.id, note, now);
                Ok(())
            })
            .await?;

        if let Some(from) = from.filter(|f| *f != status) {
            info!(ticket_id = %ticket.id, %from, to = %status, by = %actor.id, "ticket status changed");
        }
        Ok(self.present(actor, ticket))
    }

    pub async fn assign(&self, actor: &User, id: Uuid, assignee: Option<Uuid>) -> Result<Ticket> {
        if !actor.role.is_staff() {
            return Err(Error::Forbidden("Only IT staff can assign tickets".into()));
        }
        if let Some(assignee) = assignee {
            self.users.get_assignable(assignee).await?;
        }

        let ticket = self
            .mutate(id, |ticket| {
                ticket.assigned_to = assignee;
                Ok(())
            })
            .await?;

        info!(ticket_id = %ticket.id, assignee = ?assignee, by = %actor.id, "ticket assignment changed");
        Ok(ticket)
    }

    pub async fn add_comment(
        &self,
        actor: &User,
        id: Uuid,
        payload: CreateCommentPayload,
    ) -> Result<Ticket> {
        validation::require_non_blank("body", &payload.body)?;
        let comment = Comment {
            id: Uuid::new_v4(),
            author_id: actor.id,
            author_name: actor.name.clone(),
            body: payload.body,
            internal: payload.internal && actor.role.is_staff(),
            created_at: time::now(),
        };

        let ticket = self
            .mutate(id, |ticket| {
                ensure_can_view(actor, ticket)?;
                ticket.comments.push(comment);
                Ok(())
            })
            .await?;

        Ok(self.present(actor, ticket))
    }

    pub async fn rate(&self, actor: &User, id: Uuid, payload: RateTicketPayload) -> Result<Ticket> {
        let ticket = self
            .mutate(id, |ticket| {
                if ticket.created_by != actor.id {
                    return Err(Error::Forbidden(
                        "Only the requester can rate a ticket".into(),
                    ));
                }
                if !ticket.status.is_finished() {
                    return Err(Error::Conflict(
                        "Only resolved or closed tickets can be rated".into(),
                    ));
                }
                ticket.rating = Some(Rating {
                    score: payload.score,
                    feedback: payload.feedback,
                    rated_at: time::now(),
                });
                Ok(())
            })
            .await?;

        info!(ticket_id = %ticket.id, score = payload.score, "ticket rated");
        Ok(self.present(actor, ticket))
    }

    pub async fn delete(&self, actor: &User, id: Uuid) -> Result<()> {
        if actor.role != crate::models::user::Role::Admin {
            return Err(Error::Forbidden("Only administrators can delete tickets".into()));
        }
        if !self.store.delete(Table::Tickets, id).await? {
            return Err(Error::NotFound("Ticket not found".into()));
        }
        info!(ticket_id = %id, by = %actor.id, "ticket deleted");
        Ok(())
    }

    pub async fn stats(&self, actor: &User) -> Result<TicketStats> {
        if !actor.role.is_staff() {
            return Err(Error::Forbidden("Only IT staff can view ticket statistics".into()));
        }
        let tickets: Vec<Ticket> = self.store.all(Table::Tickets).await?;
        Ok(compute_stats(&tickets))
    }

    pub async fn all_for_export(&self, actor: &User) -> Result<Vec<Ticket>> {
        if !actor.role.is_staff() {
            return Err(Error::Forbidden("Only IT staff can export tickets".into()));
        }
        let mut tickets: Vec<Ticket> = self.store.all(Table::Tickets).await?;
        tickets.sort_by(|a, b| a.ticket_number.cmp(&b.ticket_number));
        Ok(tickets)
    }

    async fn load(&self, id: Uuid) -> Result<Ticket> {
        self.store
            .get(Table::Tickets, id)
            .await?
            .ok_or_else(|| Error::NotFound("Ticket not found".into()))
    }

    async fn mutate<F>(&self, id: Uuid, f: F) -> Result<Ticket>
    where
        F: FnOnce(&mut Ticket) -> Result<()>,
    {
        self.store
            .update(Table::Tickets, id, f)
            .await
            .map_err(|e| match e {
                Error::NotFound(_) => Error::NotFound("Ticket not found".into()),
                other => other,
            })
    }

    fn present(&self, actor: &User, ticket: Ticket) -> Ticket {
        if actor.role.is_staff() {
            ticket
        } else {
            ticket.without_internal_comments()
        }
    }
}

pub fn compute_stats(tickets: &[Ticket]) -> TicketStats {
    let mut by_status: BTreeMap<String, usize> = TicketStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
    let mut by_priority: BTreeMap<String, usize> = Priority::ALL
        .iter()
        .map(|p| (p.as_str().to_string(), 0))
        .collect();

    let mut unassigned_open = 0;
    let mut scores = Vec::new();
    for ticket in tickets {
        *by_status.entry(ticket.status.as_str().to_string()).or_default() += 1;
        *by_priority.entry(ticket.priority.as_str().to_string()).or_default() += 1;
        if ticket.assigned_to.is_none() && !ticket.status.is_finished() {
            unassigned_open += 1;
        }
        if let Some(rating) = ticket.rating.as_ref().filter(|_| ticket.status.is_finished()) {
            scores.push(rating.score as f64);
        }
    }

    let average_rating = if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    };

    TicketStats {
        total: tickets.len(),
        by_status,
        by_priority,
        unassigned_open,
        rated: scores.len(),
        average_rating,
    }
}
