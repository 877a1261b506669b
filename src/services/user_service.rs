use tracing::info;
use uuid::Uuid;

use crate::database::store::{JsonStore, Query, Table};
use crate::dto::user_dto::{UpdateProfilePayload, UpdateRolePayload, UserListQuery};
use crate::error::{Error, Result};
use crate::models::user::User;

#[derive(Clone)]
pub struct UserService {
    store: JsonStore,
}

impl UserService {
    pub fn new(store: JsonStore) -> Self {
        Self { store }
    }

    pub async fn list(&self, query: UserListQuery) -> Result<Vec<User>> {
        let filter = Query::new()
            .eq_opt("role", query.role)
            .eq_opt("department", query.department);
        let mut users: Vec<User> = self.store.find(Table::Users, &filter).await?;
        users.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(users)
    }

    pub async fn get(&self, id: Uuid) -> Result<User> {
        self.store
            .get(Table::Users, id)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".into()))
    }

    /// Active admin or support user eligible to own tickets.
    pub async fn get_assignable(&self, id: Uuid) -> Result<User> {
        let user = self
            .store
            .get::<User>(Table::Users, id)
            .await?
            .ok_or_else(|| Error::BadRequest("Assignee does not exist".into()))?;
        if !user.role.is_staff() || !user.is_active {
            return Err(Error::BadRequest(
                "Tickets can only be assigned to active IT staff".into(),
            ));
        }
        Ok(user)
    }

    pub async fn update_profile(&self, id: Uuid, payload: UpdateProfilePayload) -> Result<User> {
        self.store
            .update(Table::Users, id, |user: &mut User| {
                if let Some(name) = payload.name {
                    crate::utils::validation::require_non_blank("name", &name)?;
                    user.name = name.trim().to_string();
                }
                if let Some(department) = payload.department {
                    user.department = Some(department.trim().to_string());
                }
                Ok(())
            })
            .await
            .map_err(not_found_as_user)
    }

    pub async fn update_role(
        &self,
        actor: &User,
        id: Uuid,
        payload: UpdateRolePayload,
    ) -> Result<User> {
        if actor.id == id && (payload.role.is_some() || payload.is_active == Some(false)) {
            return Err(Error::BadRequest(
                "Administrators cannot change their own role or disable themselves".into(),
            ));
        }

        let user = self
            .store
            .update(Table::Users, id, |user: &mut User| {
                if let Some(role) = payload.role {
                    user.role = role;
                }
                if let Some(active) = payload.is_active {
                    user.is_active = active;
                }
                Ok(())
            })
            .await
            .map_err(not_found_as_user)?;

        info!(user_id = %user.id, role = %user.role, active = user.is_active, by = %actor.id, "user access changed");
        Ok(user)
    }
}

fn not_found_as_user(err: Error) -> Error {
    match err {
        Error::NotFound(_) => Error::NotFound("User not found".into()),
        other => other,
    }
}
