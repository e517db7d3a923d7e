//! Test helpers and fixtures for database tests
//!
//! Builders that cut down setup boilerplate in `#[sqlx::test]` tests.
//!
//! # Examples
//!
//! ```rust,ignore
//! use soxhub_server::features::shared::test_helpers::*;
//!
//! #[sqlx::test(migrations = "../../migrations")]
//! async fn test_something(pool: PgPool) -> sqlx::Result<()> {
//!     let admin = TestUser::admin("admin@example.com").insert(&pool).await?;
//!     let control = TestControl::new("FIN-001", "Bank reconciliation")
//!         .with_owner(admin.id)
//!         .insert(&pool)
//!         .await?;
//!     // ... test logic ...
//!     Ok(())
//! }
//! ```

use sqlx::PgPool;
use uuid::Uuid;

/// Builder for creating test users
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub roles: Vec<String>,
    pub active: bool,
}

impl TestUser {
    /// A user holding only the admin role
    pub fn admin(email: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: "Test Admin".to_string(),
            email: email.to_string(),
            roles: vec!["admin".to_string()],
            active: true,
        }
    }

    /// A user holding only the control-owner role
    pub fn owner(email: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: "Test Owner".to_string(),
            email: email.to_string(),
            roles: vec!["control-owner".to_string()],
            active: true,
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Replace the role set
    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.roles = roles.iter().map(|r| r.to_string()).collect();
        self
    }

    /// Set the active flag
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Insert the user into the database
    pub async fn insert(self, pool: &PgPool) -> sqlx::Result<Self> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, roles, active)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(self.id)
        .bind(&self.name)
        .bind(&self.email)
        .bind(&self.roles)
        .bind(self.active)
        .execute(pool)
        .await?;

        Ok(self)
    }
}

/// Builder for creating test controls
#[derive(Debug, Clone)]
pub struct TestControl {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: String,
    pub owner_id: Option<Uuid>,
    pub frequency: String,
    pub control_type: String,
    pub status: String,
    pub related_risks: Vec<String>,
    pub test_procedures: String,
    pub evidence_requirements: String,
}

impl TestControl {
    /// Create a new test control builder with sensible defaults
    pub fn new(code: &str, name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: name.to_string(),
            description: String::new(),
            owner_id: None,
            frequency: "monthly".to_string(),
            control_type: "preventive".to_string(),
            status: "active".to_string(),
            related_risks: Vec::new(),
            test_procedures: String::new(),
            evidence_requirements: String::new(),
        }
    }

    /// Assign an owner
    pub fn with_owner(mut self, owner_id: Uuid) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    /// Set the status
    pub fn with_status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    /// Set the frequency
    pub fn with_frequency(mut self, frequency: &str) -> Self {
        self.frequency = frequency.to_string();
        self
    }

    /// Set the control type
    pub fn with_type(mut self, control_type: &str) -> Self {
        self.control_type = control_type.to_string();
        self
    }

    /// Set the related risks
    pub fn with_risks(mut self, risks: &[&str]) -> Self {
        self.related_risks = risks.iter().map(|r| r.to_string()).collect();
        self
    }

    /// Insert the control into the database
    pub async fn insert(self, pool: &PgPool) -> sqlx::Result<Self> {
        sqlx::query(
            r#"
            INSERT INTO controls
                (id, code, name, description, owner_id, frequency, control_type,
                 status, related_risks, test_procedures, evidence_requirements)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(self.id)
        .bind(&self.code)
        .bind(&self.name)
        .bind(&self.description)
        .bind(self.owner_id)
        .bind(&self.frequency)
        .bind(&self.control_type)
        .bind(&self.status)
        .bind(&self.related_risks)
        .bind(&self.test_procedures)
        .bind(&self.evidence_requirements)
        .execute(pool)
        .await?;

        Ok(self)
    }
}

/// Builder for creating test change requests
#[derive(Debug, Clone)]
pub struct TestChangeRequest {
    pub id: Uuid,
    pub control_id: Uuid,
    pub requester_id: Option<Uuid>,
    pub proposed_changes: serde_json::Value,
    pub status: String,
    pub request_comment: Option<String>,
}

impl TestChangeRequest {
    /// Create a pending change request proposing a rename
    pub fn new(control_id: Uuid, requester_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            control_id,
            requester_id: Some(requester_id),
            proposed_changes: serde_json::json!({ "name": "Updated name" }),
            status: "pending".to_string(),
            request_comment: None,
        }
    }

    /// Replace the proposed change set
    pub fn with_changes(mut self, changes: serde_json::Value) -> Self {
        self.proposed_changes = changes;
        self
    }

    /// Set the status
    pub fn with_status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    /// Insert the change request into the database
    pub async fn insert(self, pool: &PgPool) -> sqlx::Result<Self> {
        sqlx::query(
            r#"
            INSERT INTO change_requests
                (id, control_id, requester_id, proposed_changes, status, request_comment)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(self.id)
        .bind(self.control_id)
        .bind(self.requester_id)
        .bind(&self.proposed_changes)
        .bind(&self.status)
        .bind(&self.request_comment)
        .execute(pool)
        .await?;

        Ok(self)
    }
}
