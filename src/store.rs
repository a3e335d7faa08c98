//! Lead persistence.
//!
//! A lead is written with a single insert into the `leads` table, either
//! directly over Postgres or through the Supabase REST interface. There is no
//! deduplication: every call inserts a new row.

use crate::config::SupabaseConfig;
use crate::errors::{AppError, ResultExt};
use crate::models::NewLeadRecord;
use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;

/// Destination for validated leads.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Insert one lead row.
    async fn insert(&self, record: &NewLeadRecord) -> Result<(), AppError>;
}

/// Writes leads straight into Postgres.
pub struct PgLeadStore {
    pool: PgPool,
}

impl PgLeadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadStore for PgLeadStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn insert(&self, record: &NewLeadRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO leads (
                id,
                form_kind,
                loan_amount,
                loan_purpose,
                tenure,
                full_name,
                email,
                phone,
                nationality,
                employment_status,
                monthly_income,
                company,
                agreed_to_terms,
                utm_source,
                utm_medium,
                utm_campaign,
                utm_content,
                utm_term,
                landing_page,
                variant,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                    $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
            "#,
        )
        .bind(record.id)
        .bind(record.form_kind.as_str())
        .bind(record.loan_amount)
        .bind(record.loan_purpose.as_str())
        .bind(record.tenure)
        .bind(&record.full_name)
        .bind(&record.email)
        .bind(&record.phone)
        .bind(record.nationality.as_str())
        .bind(record.employment_status.map(|s| s.as_str()))
        .bind(record.monthly_income)
        .bind(&record.company)
        .bind(record.agreed_to_terms)
        .bind(&record.utm_source)
        .bind(&record.utm_medium)
        .bind(&record.utm_campaign)
        .bind(&record.utm_content)
        .bind(&record.utm_term)
        .bind(&record.landing_page)
        .bind(&record.variant)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .context("Inserting lead row")?;

        tracing::info!("✓ Lead {} stored in Postgres", record.id);
        Ok(())
    }
}

/// Writes leads through the Supabase (PostgREST) REST endpoint using the
/// service-role key.
#[derive(Clone)]
pub struct SupabaseLeadStore {
    client: reqwest::Client,
    base_url: String,
    service_role_key: String,
}

impl SupabaseLeadStore {
    pub fn new(config: &SupabaseConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create Supabase client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            service_role_key: config.service_role_key.clone(),
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/leads", self.base_url)
    }
}

#[async_trait]
impl LeadStore for SupabaseLeadStore {
    fn name(&self) -> &'static str {
        "supabase"
    }

    async fn insert(&self, record: &NewLeadRecord) -> Result<(), AppError> {
        let response = self
            .client
            .post(self.table_url())
            .header("apikey", &self.service_role_key)
            .header(
                "Authorization",
                format!("Bearer {}", self.service_role_key),
            )
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await
            .map_err(|e| AppError::PersistenceError(format!("Supabase request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::PersistenceError(format!(
                "Supabase returned {}: {}",
                status, error_text
            )));
        }

        tracing::info!("✓ Lead {} stored via Supabase", record.id);
        Ok(())
    }
}
