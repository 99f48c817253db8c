use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::application::{ApplicationStatus, JobApplication};
use crate::models::assessment::{Assessment, ConflictPolicy};
use crate::models::attempt::{Attempt, NewAttempt};
use crate::models::certificate::{Certificate, NewCertificate};

use super::{
    AssessmentChanges, AssessmentFilter, NewAssessment, StoreError, StoreResult, SubmissionStore,
};

/// Production store backed by PostgreSQL. Conflict semantics lean on the
/// uniqueness constraints declared in the migrations: (user_id,
/// assessment_id) on attempts and attempt_id on certificates, so concurrent
/// submissions cannot slip past an application-level check-then-act.
#[derive(Clone)]
pub struct PgSubmissionStore {
    pool: PgPool,
}

impl PgSubmissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_store_err(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::Conflict,
        other => StoreError::Unavailable(other.to_string()),
    }
}

#[async_trait]
impl SubmissionStore for PgSubmissionStore {
    async fn insert_assessment(&self, new: NewAssessment) -> StoreResult<Assessment> {
        let assessment = sqlx::query_as::<_, Assessment>(
            r#"
            INSERT INTO assessments (
                title, description, kind, job_posting_id,
                time_limit_minutes, passing_score, questions, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(new.title)
        .bind(new.description)
        .bind(new.kind)
        .bind(new.job_posting_id)
        .bind(new.time_limit_minutes)
        .bind(new.passing_score)
        .bind(new.questions)
        .bind(new.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(map_store_err)?;

        Ok(assessment)
    }

    async fn update_assessment(
        &self,
        id: Uuid,
        changes: AssessmentChanges,
    ) -> StoreResult<Assessment> {
        let assessment = sqlx::query_as::<_, Assessment>(
            r#"
            UPDATE assessments
            SET
                title = COALESCE($1, title),
                description = COALESCE($2, description),
                time_limit_minutes = COALESCE($3, time_limit_minutes),
                passing_score = COALESCE($4, passing_score),
                questions = COALESCE($5, questions),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.time_limit_minutes)
        .bind(changes.passing_score)
        .bind(changes.questions)
        .bind(changes.is_active)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_store_err)?;

        Ok(assessment)
    }

    async fn delete_assessment(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM assessments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_store_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn fetch_assessment(&self, id: Uuid) -> StoreResult<Option<Assessment>> {
        let assessment = sqlx::query_as::<_, Assessment>("SELECT * FROM assessments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_store_err)?;
        Ok(assessment)
    }

    async fn assessment_for_job_posting(
        &self,
        job_posting_id: Uuid,
    ) -> StoreResult<Option<Assessment>> {
        let assessment = sqlx::query_as::<_, Assessment>(
            r#"SELECT * FROM assessments
               WHERE job_posting_id = $1 AND kind = 'preselection_test'
               ORDER BY created_at DESC
               LIMIT 1"#,
        )
        .bind(job_posting_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_store_err)?;
        Ok(assessment)
    }

    async fn list_assessments(
        &self,
        filter: AssessmentFilter,
        page: i64,
        per_page: i64,
    ) -> StoreResult<(Vec<Assessment>, i64)> {
        let offset = (page - 1) * per_page;
        let search = filter.search.map(|s| format!("%{}%", s));

        let rows = sqlx::query_as::<_, Assessment>(
            r#"
            SELECT * FROM assessments
            WHERE ($1::assessment_kind IS NULL OR kind = $1)
              AND ($2::bool IS NULL OR is_active = $2)
              AND ($3::text IS NULL OR (title ILIKE $3 OR description ILIKE $3))
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.kind)
        .bind(filter.is_active)
        .bind(search.clone())
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_store_err)?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM assessments
            WHERE ($1::assessment_kind IS NULL OR kind = $1)
              AND ($2::bool IS NULL OR is_active = $2)
              AND ($3::text IS NULL OR (title ILIKE $3 OR description ILIKE $3))
            "#,
        )
        .bind(filter.kind)
        .bind(filter.is_active)
        .bind(search)
        .fetch_one(&self.pool)
        .await
        .map_err(map_store_err)?;

        Ok((rows, total))
    }

    async fn record_attempt(
        &self,
        new: NewAttempt,
        policy: ConflictPolicy,
    ) -> StoreResult<Attempt> {
        let sql = match policy {
            ConflictPolicy::Upsert => {
                r#"
                INSERT INTO attempts (
                    user_id, assessment_id, score, passed,
                    time_spent_minutes, overtime, answers
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (user_id, assessment_id) DO UPDATE
                SET score = EXCLUDED.score,
                    passed = EXCLUDED.passed,
                    time_spent_minutes = EXCLUDED.time_spent_minutes,
                    overtime = EXCLUDED.overtime,
                    answers = EXCLUDED.answers,
                    completed_at = NOW()
                RETURNING *
                "#
            }
            ConflictPolicy::Reject => {
                r#"
                INSERT INTO attempts (
                    user_id, assessment_id, score, passed,
                    time_spent_minutes, overtime, answers
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
                "#
            }
        };

        let attempt = sqlx::query_as::<_, Attempt>(sql)
            .bind(new.user_id)
            .bind(new.assessment_id)
            .bind(new.score)
            .bind(new.passed)
            .bind(new.time_spent_minutes)
            .bind(new.overtime)
            .bind(new.answers)
            .fetch_one(&self.pool)
            .await
            .map_err(map_store_err)?;

        Ok(attempt)
    }

    async fn attempt_for_user(
        &self,
        user_id: Uuid,
        assessment_id: Uuid,
    ) -> StoreResult<Option<Attempt>> {
        let attempt = sqlx::query_as::<_, Attempt>(
            "SELECT * FROM attempts WHERE user_id = $1 AND assessment_id = $2",
        )
        .bind(user_id)
        .bind(assessment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_store_err)?;
        Ok(attempt)
    }

    async fn attempts_for_assessment(&self, assessment_id: Uuid) -> StoreResult<Vec<Attempt>> {
        let attempts = sqlx::query_as::<_, Attempt>(
            "SELECT * FROM attempts WHERE assessment_id = $1 ORDER BY completed_at DESC",
        )
        .bind(assessment_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_store_err)?;
        Ok(attempts)
    }

    async fn insert_certificate(&self, new: NewCertificate) -> StoreResult<Certificate> {
        let certificate = sqlx::query_as::<_, Certificate>(
            r#"
            INSERT INTO certificates (attempt_id, certificate_code)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(new.attempt_id)
        .bind(new.certificate_code)
        .fetch_one(&self.pool)
        .await
        .map_err(map_store_err)?;
        Ok(certificate)
    }

    async fn certificate_for_attempt(&self, attempt_id: Uuid) -> StoreResult<Option<Certificate>> {
        let certificate =
            sqlx::query_as::<_, Certificate>("SELECT * FROM certificates WHERE attempt_id = $1")
                .bind(attempt_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_store_err)?;
        Ok(certificate)
    }

    async fn certificate_by_code(&self, code: &str) -> StoreResult<Option<Certificate>> {
        let certificate = sqlx::query_as::<_, Certificate>(
            "SELECT * FROM certificates WHERE certificate_code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_store_err)?;
        Ok(certificate)
    }

    async fn fetch_application(&self, id: Uuid) -> StoreResult<Option<JobApplication>> {
        let application =
            sqlx::query_as::<_, JobApplication>("SELECT * FROM job_applications WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_store_err)?;
        Ok(application)
    }

    async fn record_test_outcome(
        &self,
        application_id: Uuid,
        status: ApplicationStatus,
        attempt_id: Uuid,
    ) -> StoreResult<bool> {
        // Guard and update in one statement so a concurrent status change
        // cannot interleave between check and write.
        let result = sqlx::query(
            r#"
            UPDATE job_applications
            SET status = $2, test_result_id = $3, updated_at = NOW()
            WHERE id = $1 AND status = $4
            "#,
        )
        .bind(application_id)
        .bind(status)
        .bind(attempt_id)
        .bind(ApplicationStatus::TestRequired)
        .execute(&self.pool)
        .await
        .map_err(map_store_err)?;

        Ok(result.rows_affected() > 0)
    }
}
