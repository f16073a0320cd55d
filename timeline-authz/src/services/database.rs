//! PostgreSQL store for the authorization core.
//!
//! Runtime-checked sqlx queries; status and role columns hold lowercase codes
//! that are parsed into closed enums on the way out.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, Postgres};
use sqlx::{FromRow, Transaction};
use uuid::Uuid;

use super::error::{AuthzError, AuthzResult};
use super::store::{AuthzStore, StoreTransaction};
use crate::db;
use crate::models::{
    Event, Membership, MembershipRecord, OrgRole, Organization, OrganizationStatus, Topic,
};

// ==================== Row Types ====================

#[derive(Debug, FromRow)]
struct OrganizationRow {
    organization_id: Uuid,
    org_name: String,
    status_code: String,
    created_by_user_id: Uuid,
    created_utc: DateTime<Utc>,
    reviewed_utc: Option<DateTime<Utc>>,
}

impl TryFrom<OrganizationRow> for Organization {
    type Error = AuthzError;

    fn try_from(row: OrganizationRow) -> Result<Self, Self::Error> {
        Ok(Organization {
            organization_id: row.organization_id,
            name: row.org_name,
            status: parse_code(&row.status_code)?,
            created_by_user_id: row.created_by_user_id,
            created_utc: row.created_utc,
            reviewed_utc: row.reviewed_utc,
        })
    }
}

#[derive(Debug, FromRow)]
struct MembershipRow {
    membership_id: Uuid,
    user_id: Uuid,
    organization_id: Uuid,
    role_code: String,
    created_utc: DateTime<Utc>,
}

impl TryFrom<MembershipRow> for Membership {
    type Error = AuthzError;

    fn try_from(row: MembershipRow) -> Result<Self, Self::Error> {
        Ok(Membership {
            membership_id: row.membership_id,
            user_id: row.user_id,
            organization_id: row.organization_id,
            role: parse_code(&row.role_code)?,
            created_utc: row.created_utc,
        })
    }
}

#[derive(Debug, FromRow)]
struct MembershipRecordRow {
    organization_id: Uuid,
    role_code: String,
    status_code: String,
}

impl TryFrom<MembershipRecordRow> for MembershipRecord {
    type Error = AuthzError;

    fn try_from(row: MembershipRecordRow) -> Result<Self, Self::Error> {
        Ok(MembershipRecord {
            organization_id: row.organization_id,
            role: parse_code(&row.role_code)?,
            organization_status: parse_code(&row.status_code)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct TopicRow {
    topic_id: Uuid,
    organization_id: Option<Uuid>,
    title: String,
    is_public: bool,
    created_by_user_id: Uuid,
    created_utc: DateTime<Utc>,
}

impl From<TopicRow> for Topic {
    fn from(row: TopicRow) -> Self {
        Topic {
            topic_id: row.topic_id,
            organization_id: row.organization_id,
            title: row.title,
            is_public: row.is_public,
            created_by_user_id: row.created_by_user_id,
            created_utc: row.created_utc,
        }
    }
}

#[derive(Debug, FromRow)]
struct EventRow {
    event_id: Uuid,
    topic_id: Uuid,
    title: String,
    created_utc: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            event_id: row.event_id,
            topic_id: row.topic_id,
            title: row.title,
            created_utc: row.created_utc,
        }
    }
}

fn parse_code<T>(code: &str) -> AuthzResult<T>
where
    T: std::str::FromStr<Err = String>,
{
    code.parse()
        .map_err(|e: String| AuthzError::Internal(anyhow::anyhow!(e)))
}

fn convert_all<R, T>(rows: Vec<R>) -> AuthzResult<Vec<T>>
where
    T: TryFrom<R, Error = AuthzError>,
{
    rows.into_iter().map(T::try_from).collect()
}

const MEMBERSHIP_RECORDS_SQL: &str = r#"
    SELECT m.organization_id, m.role_code, o.status_code
    FROM memberships m
    JOIN organizations o ON o.organization_id = m.organization_id
    WHERE m.user_id = $1 AND o.status_code = 'approved'
"#;

// ==================== Store ====================

/// PostgreSQL-backed [`AuthzStore`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthzStore for PgStore {
    async fn begin(&self) -> AuthzResult<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx: Some(tx) }))
    }

    async fn membership_records(&self, user_id: Uuid) -> AuthzResult<Vec<MembershipRecord>> {
        let rows = sqlx::query_as::<_, MembershipRecordRow>(MEMBERSHIP_RECORDS_SQL)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn find_organization(&self, organization_id: Uuid) -> AuthzResult<Option<Organization>> {
        sqlx::query_as::<_, OrganizationRow>(
            "SELECT * FROM organizations WHERE organization_id = $1",
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?
        .map(Organization::try_from)
        .transpose()
    }

    async fn list_organizations_by_status(
        &self,
        status: OrganizationStatus,
    ) -> AuthzResult<Vec<Organization>> {
        let rows = sqlx::query_as::<_, OrganizationRow>(
            "SELECT * FROM organizations WHERE status_code = $1 ORDER BY created_utc",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn list_organizations_for_user(&self, user_id: Uuid) -> AuthzResult<Vec<Organization>> {
        let rows = sqlx::query_as::<_, OrganizationRow>(
            r#"
            SELECT DISTINCT o.* FROM organizations o
            LEFT JOIN memberships m
                ON m.organization_id = o.organization_id AND m.user_id = $1
            WHERE o.created_by_user_id = $1 OR m.membership_id IS NOT NULL
            ORDER BY o.org_name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn list_memberships(&self, organization_id: Uuid) -> AuthzResult<Vec<Membership>> {
        let rows = sqlx::query_as::<_, MembershipRow>(
            "SELECT * FROM memberships WHERE organization_id = $1 ORDER BY created_utc",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn find_topic(&self, topic_id: Uuid) -> AuthzResult<Option<Topic>> {
        let row = sqlx::query_as::<_, TopicRow>("SELECT * FROM topics WHERE topic_id = $1")
            .bind(topic_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Topic::from))
    }

    async fn insert_topic(&self, topic: &Topic) -> AuthzResult<()> {
        sqlx::query(
            r#"
            INSERT INTO topics (topic_id, organization_id, title, is_public, created_by_user_id, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(topic.topic_id)
        .bind(topic.organization_id)
        .bind(&topic.title)
        .bind(topic.is_public)
        .bind(topic.created_by_user_id)
        .bind(topic.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_event(&self, event_id: Uuid) -> AuthzResult<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>("SELECT * FROM events WHERE event_id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Event::from))
    }

    async fn insert_event(&self, event: &Event) -> AuthzResult<()> {
        sqlx::query(
            "INSERT INTO events (event_id, topic_id, title, created_utc) VALUES ($1, $2, $3, $4)",
        )
        .bind(event.event_id)
        .bind(event.topic_id)
        .bind(&event.title)
        .bind(event.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn health_check(&self) -> AuthzResult<()> {
        db::health_check(&self.pool).await.map_err(|e| {
            tracing::error!("Database health check failed: {}", e);
            AuthzError::Database(e)
        })
    }
}

// ==================== Transaction ====================

struct PgTransaction {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgTransaction {
    fn tx(&mut self) -> AuthzResult<&mut Transaction<'static, Postgres>> {
        self.tx
            .as_mut()
            .ok_or_else(|| AuthzError::Internal(anyhow::anyhow!("Transaction already committed")))
    }
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn membership_records(&mut self, user_id: Uuid) -> AuthzResult<Vec<MembershipRecord>> {
        let tx = self.tx()?;
        let rows = sqlx::query_as::<_, MembershipRecordRow>(MEMBERSHIP_RECORDS_SQL)
            .bind(user_id)
            .fetch_all(&mut **tx)
            .await?;
        convert_all(rows)
    }

    async fn lock_organization(
        &mut self,
        organization_id: Uuid,
    ) -> AuthzResult<Option<Organization>> {
        let tx = self.tx()?;
        sqlx::query_as::<_, OrganizationRow>(
            "SELECT * FROM organizations WHERE organization_id = $1 FOR UPDATE",
        )
        .bind(organization_id)
        .fetch_optional(&mut **tx)
        .await?
        .map(Organization::try_from)
        .transpose()
    }

    async fn insert_organization(&mut self, organization: &Organization) -> AuthzResult<()> {
        let tx = self.tx()?;
        sqlx::query(
            r#"
            INSERT INTO organizations (organization_id, org_name, status_code, created_by_user_id, created_utc, reviewed_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(organization.organization_id)
        .bind(&organization.name)
        .bind(organization.status.as_str())
        .bind(organization.created_by_user_id)
        .bind(organization.created_utc)
        .bind(organization.reviewed_utc)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn set_organization_status(
        &mut self,
        organization_id: Uuid,
        status: OrganizationStatus,
        reviewed_utc: DateTime<Utc>,
    ) -> AuthzResult<()> {
        let tx = self.tx()?;
        let result = sqlx::query(
            "UPDATE organizations SET status_code = $1, reviewed_utc = $2 WHERE organization_id = $3",
        )
        .bind(status.as_str())
        .bind(reviewed_utc)
        .bind(organization_id)
        .execute(&mut **tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AuthzError::NotFound("Organization"));
        }
        Ok(())
    }

    async fn find_membership(&mut self, membership_id: Uuid) -> AuthzResult<Option<Membership>> {
        let tx = self.tx()?;
        sqlx::query_as::<_, MembershipRow>("SELECT * FROM memberships WHERE membership_id = $1")
            .bind(membership_id)
            .fetch_optional(&mut **tx)
            .await?
            .map(Membership::try_from)
            .transpose()
    }

    async fn lock_membership(&mut self, membership_id: Uuid) -> AuthzResult<Option<Membership>> {
        let tx = self.tx()?;
        sqlx::query_as::<_, MembershipRow>(
            "SELECT * FROM memberships WHERE membership_id = $1 FOR UPDATE",
        )
        .bind(membership_id)
        .fetch_optional(&mut **tx)
        .await?
        .map(Membership::try_from)
        .transpose()
    }

    async fn insert_membership_if_absent(&mut self, membership: &Membership) -> AuthzResult<bool> {
        let tx = self.tx()?;
        let result = sqlx::query(
            r#"
            INSERT INTO memberships (membership_id, user_id, organization_id, role_code, created_utc)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, organization_id) DO NOTHING
            "#,
        )
        .bind(membership.membership_id)
        .bind(membership.user_id)
        .bind(membership.organization_id)
        .bind(membership.role.as_str())
        .bind(membership.created_utc)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_membership_role(
        &mut self,
        membership_id: Uuid,
        role: OrgRole,
    ) -> AuthzResult<()> {
        let tx = self.tx()?;
        let result = sqlx::query("UPDATE memberships SET role_code = $1 WHERE membership_id = $2")
            .bind(role.as_str())
            .bind(membership_id)
            .execute(&mut **tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AuthzError::NotFound("Membership"));
        }
        Ok(())
    }

    async fn delete_membership(&mut self, membership_id: Uuid) -> AuthzResult<()> {
        let tx = self.tx()?;
        let result = sqlx::query("DELETE FROM memberships WHERE membership_id = $1")
            .bind(membership_id)
            .execute(&mut **tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AuthzError::NotFound("Membership"));
        }
        Ok(())
    }

    async fn commit(&mut self) -> AuthzResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| AuthzError::Internal(anyhow::anyhow!("Transaction already committed")))?;
        tx.commit().await?;
        Ok(())
    }
}
