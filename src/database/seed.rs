use rust_decimal::Decimal;
use tracing::info;

use crate::database::store::{JsonStore, Query, Table};
use crate::error::{Error, Result};
use crate::models::job::{Job, JobStatus, NewJob};
use crate::models::user::{NewUser, Role, User};
use crate::utils::crypto;

/// (name, email, password, role, department)
const DEMO_USERS: [(&str, &str, &str, Role, &str); 3] = [
    ("Admin", "admin@helpdesk.local", "admin", Role::Admin, "IT"),
    ("Support Agent", "support@helpdesk.local", "support", Role::Support, "IT"),
    ("Demo User", "user@helpdesk.local", "user", Role::User, "Operations"),
];

/// Inserts the demo accounts when the users table is empty.
/// Returns how many accounts were created.
pub async fn seed_demo_users(store: &JsonStore) -> Result<usize> {
    if store.count(Table::Users, &Query::new()).await? > 0 {
        return Ok(0);
    }

    for (name, email, password, role, department) in DEMO_USERS {
        let password_hash = crypto::hash_password(password)
            .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))?;
        let _: User = store
            .insert_unique(
                Table::Users,
                "email",
                &NewUser {
                    name: name.to_string(),
                    email: email.to_string(),
                    password_hash,
                    role,
                    department: Some(department.to_string()),
                    is_active: true,
                },
            )
            .await?;
    }

    info!(count = DEMO_USERS.len(), "seeded demo accounts");
    Ok(DEMO_USERS.len())
}

/// Inserts a couple of open positions when the jobs table is empty, posted by
/// the first admin account found.
pub async fn seed_demo_jobs(store: &JsonStore) -> Result<usize> {
    if store.count(Table::Jobs, &Query::new()).await? > 0 {
        return Ok(0);
    }

    let admin: Option<User> = store
        .find_one(Table::Users, &Query::new().eq("role", Role::Admin))
        .await?;
    let posted_by = admin.map(|a| a.id);

    let jobs = [
        NewJob {
            title: "IT Support Specialist".into(),
            department: Some("IT".into()),
            location: Some("Head office".into()),
            employment_type: Some("full_time".into()),
            salary_from: Some(Decimal::new(3_000, 0)),
            salary_to: Some(Decimal::new(4_500, 0)),
            description: Some("First-line support for hardware, accounts and network issues.".into()),
            status: JobStatus::Open,
            posted_by,
        },
        NewJob {
            title: "Systems Administrator".into(),
            department: Some("IT".into()),
            location: Some("Remote".into()),
            employment_type: Some("full_time".into()),
            salary_from: None,
            salary_to: None,
            description: Some("Maintains servers, backups and identity services.".into()),
            status: JobStatus::Open,
            posted_by,
        },
    ];

    for job in &jobs {
        let _: Job = store.insert(Table::Jobs, job).await?;
    }

    info!(count = jobs.len(), "seeded demo jobs");
    Ok(jobs.len())
}
