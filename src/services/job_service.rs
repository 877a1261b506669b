use std::collections::HashSet;

use serde_json::Value as JsonValue;
use tracing::info;
use uuid::Uuid;

use crate::database::store::{JsonStore, Query, Table};
use crate::dto::job_dto::{CreateApplicationPayload, CreateJobPayload, JobListQuery, UpdateJobPayload};
use crate::error::{Error, Result};
use crate::models::application::{Application, ApplicationStatus, NewApplication};
use crate::models::job::{Job, JobStatus, NewJob};
use crate::models::user::{Role, User};

#[derive(Clone)]
pub struct JobService {
    store: JsonStore,
}

impl JobService {
    pub fn new(store: JsonStore) -> Self {
        Self { store }
    }

    pub async fn list_jobs(&self, query: JobListQuery) -> Result<Vec<Job>> {
        let filter = Query::new()
            .eq_opt("status", query.status)
            .eq_opt("department", query.department);
        let mut jobs: Vec<Job> = self.store.find(Table::Jobs, &filter).await?;
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    pub async fn get_job(&self, id: Uuid) -> Result<Job> {
        self.store
            .get(Table::Jobs, id)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".into()))
    }

    pub async fn create_job(&self, actor: &User, payload: CreateJobPayload) -> Result<Job> {
        if !actor.role.is_staff() {
            return Err(Error::Forbidden("Only staff can post jobs".into()));
        }
        let job: Job = self
            .store
            .insert(
                Table::Jobs,
                &NewJob {
                    title: payload.title.trim().to_string(),
                    department: payload.department,
                    location: payload.location,
                    employment_type: payload.employment_type,
                    salary_from: payload.salary_from,
                    salary_to: payload.salary_to,
                    description: payload.description,
                    status: payload.status.unwrap_or_default(),
                    posted_by: Some(actor.id),
                },
            )
            .await?;
        info!(job_id = %job.id, by = %actor.id, "job posted");
        Ok(job)
    }

    pub async fn update_job(&self, actor: &User, id: Uuid, payload: UpdateJobPayload) -> Result<Job> {
        if !actor.role.is_staff() {
            return Err(Error::Forbidden("Only staff can edit jobs".into()));
        }
        self.store
            .update(Table::Jobs, id, |job: &mut Job| {
                if let Some(title) = payload.title {
                    job.title = title.trim().to_string();
                }
                if payload.department.is_some() {
                    job.department = payload.department;
                }
                if payload.location.is_some() {
                    job.location = payload.location;
                }
                if payload.employment_type.is_some() {
                    job.employment_type = payload.employment_type;
                }
                if payload.salary_from.is_some() {
                    job.salary_from = payload.salary_from;
                }
                if payload.salary_to.is_some() {
                    job.salary_to = payload.salary_to;
                }
                if payload.description.is_some() {
                    job.description = payload.description;
                }
                if let Some(status) = payload.status {
                    job.status = status;
                }
                if let (Some(from), Some(to)) = (job.salary_from, job.salary_to) {
                    if from > to {
                        return Err(Error::BadRequest(
                            "salary_from must not exceed salary_to".into(),
                        ));
                    }
                }
                Ok(())
            })
            .await
            .map_err(|e| match e {
                Error::NotFound(_) => Error::NotFound("Job not found".into()),
                other => other,
            })
    }

    /// Admins see every application; everyone else sees what they submitted
    /// plus what was submitted to jobs they posted.
    pub async fn list_applications(&self, actor: &User) -> Result<Vec<Application>> {
        let mut applications: Vec<Application> = if actor.role == Role::Admin {
            self.store.all(Table::Applications).await?
        } else {
            let posted: HashSet<Uuid> = self
                .store
                .find::<Job>(Table::Jobs, &Query::new().eq("posted_by", actor.id))
                .await?
                .into_iter()
                .map(|j| j.id)
                .collect();
            self.store
                .all::<Application>(Table::Applications)
                .await?
                .into_iter()
                .filter(|a| a.applicant_id == actor.id || posted.contains(&a.job_id))
                .collect()
        };
        applications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(applications)
    }

    pub async fn apply(&self, actor: &User, payload: CreateApplicationPayload) -> Result<Application> {
        let job = self.get_job(payload.job_id).await?;
        if job.status != JobStatus::Open {
            return Err(Error::Conflict("Job is not accepting applications".into()));
        }

        let job_id = JsonValue::String(job.id.to_string());
        let applicant = JsonValue::String(actor.id.to_string());
        let application: Application = self
            .store
            .insert_with(Table::Applications, |rows| {
                let already = rows.iter().any(|r| {
                    r.get("job_id") == Some(&job_id) && r.get("applicant_id") == Some(&applicant)
                });
                if already {
                    return Err(Error::Conflict("You have already applied to this job".into()));
                }
                Ok(serde_json::to_value(NewApplication {
                    job_id: job.id,
                    applicant_id: actor.id,
                    cover_letter: payload.cover_letter,
                    status: ApplicationStatus::Submitted,
                })?)
            })
            .await?;

        info!(application_id = %application.id, job_id = %job.id, "application submitted");
        Ok(application)
    }

    pub async fn update_application_status(
        &self,
        actor: &User,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Application> {
        let application: Application = self
            .store
            .get(Table::Applications, id)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".into()))?;

        if actor.role != Role::Admin {
            let job = self.get_job(application.job_id).await?;
            if job.posted_by != Some(actor.id) {
                return Err(Error::Forbidden(
                    "Only the job poster or an administrator can review applications".into(),
                ));
            }
        }

        self.store
            .update(Table::Applications, id, |a: &mut Application| {
                a.status = status;
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::NewUser;

    async fn user(store: &JsonStore, email: &str, role: Role) -> User {
        store
            .insert(
                Table::Users,
                &NewUser {
                    name: email.to_string(),
                    email: email.to_string(),
                    password_hash: "unused".into(),
                    role,
                    department: None,
                    is_active: true,
                },
            )
            .await
            .unwrap()
    }

    fn job(title: &str) -> CreateJobPayload {
        CreateJobPayload {
            title: title.into(),
            department: Some("IT".into()),
            location: None,
            employment_type: None,
            salary_from: None,
            salary_to: None,
            description: None,
            status: None,
        }
    }

    #[tokio::test]
    async fn applications_are_scoped_by_ownership() {
        let store = JsonStore::in_memory();
        let svc = JobService::new(store.clone());
        let root = user(&store, "root@corp.io", Role::Admin).await;
        let sam = user(&store, "sam@corp.io", Role::Support).await;
        let alice = user(&store, "alice@corp.io", Role::User).await;
        let bob = user(&store, "bob@corp.io", Role::User).await;

        let posted = svc.create_job(&sam, job("Helpdesk tech")).await.unwrap();
        assert_eq!(posted.posted_by, Some(sam.id));

        svc.apply(&alice, CreateApplicationPayload { job_id: posted.id, cover_letter: None })
            .await
            .unwrap();
        svc.apply(&bob, CreateApplicationPayload { job_id: posted.id, cover_letter: None })
            .await
            .unwrap();

        assert_eq!(svc.list_applications(&root).await.unwrap().len(), 2);
        assert_eq!(svc.list_applications(&sam).await.unwrap().len(), 2);
        let mine = svc.list_applications(&alice).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].applicant_id, alice.id);

        let dup = svc
            .apply(&alice, CreateApplicationPayload { job_id: posted.id, cover_letter: None })
            .await;
        assert!(matches!(dup, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn closed_jobs_reject_applications() {
        let store = JsonStore::in_memory();
        let svc = JobService::new(store.clone());
        let sam = user(&store, "sam@corp.io", Role::Support).await;
        let alice = user(&store, "alice@corp.io", Role::User).await;

        let posted = svc.create_job(&sam, job("Network admin")).await.unwrap();
        svc.update_job(
            &sam,
            posted.id,
            UpdateJobPayload { status: Some(JobStatus::Closed), ..Default::default() },
        )
        .await
        .unwrap();

        let res = svc
            .apply(&alice, CreateApplicationPayload { job_id: posted.id, cover_letter: None })
            .await;
        assert!(matches!(res, Err(Error::Conflict(_))));
        assert!(matches!(svc.create_job(&alice, job("x")).await, Err(Error::Forbidden(_))));
    }

    #[tokio::test]
    async fn only_poster_or_admin_reviews() {
        let store = JsonStore::in_memory();
        let svc = JobService::new(store.clone());
        let sam = user(&store, "sam@corp.io", Role::Support).await;
        let kim = user(&store, "kim@corp.io", Role::Support).await;
        let alice = user(&store, "alice@corp.io", Role::User).await;

        let posted = svc.create_job(&sam, job("DBA")).await.unwrap();
        let app = svc
            .apply(&alice, CreateApplicationPayload { job_id: posted.id, cover_letter: Some("hi".into()) })
            .await
            .unwrap();

        let res = svc
            .update_application_status(&kim, app.id, ApplicationStatus::Accepted)
            .await;
        assert!(matches!(res, Err(Error::Forbidden(_))));

        let reviewed = svc
            .update_application_status(&sam, app.id, ApplicationStatus::Reviewing)
            .await
            .unwrap();
        assert_eq!(reviewed.status, ApplicationStatus::Reviewing);
    }
}
