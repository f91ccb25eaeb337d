use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{migrate::MigrateDatabase, Row};
use tracing::{debug, warn};

use super::{
    generate_proposal_id, generate_public_token, line_items_from_inputs, sections_from_inputs,
    MilestoneStamp, ProposalStorage, StorageConfig, StorageError, StorageResult,
};
use crate::types::{
    DiscountType, PricingType, Proposal, ProposalCreateInput, ProposalFilter, ProposalSignature,
    ProposalStatus, SowPrefix,
};

/// Attempts to allocate a sequential document number before giving up.
/// Conflicts only occur when the same account creates proposals
/// concurrently, so contention is short-lived.
const MAX_NUMBER_ALLOCATION_ATTEMPTS: u32 = 5;

/// SQLite implementation of ProposalStorage
pub struct SqliteProposalStorage {
    pool: SqlitePool,
}

impl SqliteProposalStorage {
    /// Create a new SqliteProposalStorage instance
    pub async fn new(config: &StorageConfig) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(StorageError::Io)?;
            }
        }

        let database_url = format!("sqlite:{}", config.path.display());

        if !sqlx::Sqlite::database_exists(&database_url)
            .await
            .map_err(StorageError::Sqlx)?
        {
            debug!("Creating database at: {}", database_url);
            sqlx::Sqlite::create_database(&database_url)
                .await
                .map_err(StorageError::Sqlx)?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.busy_timeout_seconds))
            .connect(&database_url)
            .await
            .map_err(StorageError::Sqlx)?;

        if config.enable_wal {
            sqlx::query("PRAGMA journal_mode = WAL")
                .execute(&pool)
                .await
                .map_err(StorageError::Sqlx)?;
        }

        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .map_err(StorageError::Sqlx)?;

        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&pool)
            .await
            .map_err(StorageError::Sqlx)?;

        Ok(Self { pool })
    }

    /// Convert a database row to a Proposal
    fn row_to_proposal(&self, row: &SqliteRow) -> StorageResult<Proposal> {
        let sections_json: String = row.try_get("sections")?;
        let line_items_json: String = row.try_get("line_items")?;
        let business_json: String = row.try_get("business")?;

        let status_str: String = row.try_get("status")?;
        let status = ProposalStatus::parse(&status_str)
            .ok_or_else(|| StorageError::Database(format!("unknown status: {status_str}")))?;

        let discount_type_str: String = row.try_get("discount_type")?;
        let discount_type = DiscountType::parse(&discount_type_str).ok_or_else(|| {
            StorageError::Database(format!("unknown discount type: {discount_type_str}"))
        })?;

        let default_pricing_str: String = row.try_get("default_pricing_type")?;
        let default_pricing_type = PricingType::parse(&default_pricing_str).ok_or_else(|| {
            StorageError::Database(format!("unknown pricing type: {default_pricing_str}"))
        })?;

        Ok(Proposal {
            id: row.try_get("id")?,
            token: row.try_get("token")?,
            account_id: row.try_get("account_id")?,
            is_template: row.try_get("is_template")?,
            title: row.try_get("title")?,
            proposal_date: row.try_get("proposal_date")?,
            expiration_date: row.try_get("expiration_date")?,
            client_first_name: row.try_get("client_first_name")?,
            client_last_name: row.try_get("client_last_name")?,
            client_email: row.try_get("client_email")?,
            client_company: row.try_get("client_company")?,
            contact_id: row.try_get("contact_id")?,
            business: serde_json::from_str(&business_json)?,
            sections: serde_json::from_str(&sections_json)?,
            line_items: serde_json::from_str(&line_items_json)?,
            terms: row.try_get("terms")?,
            show_pricing: row.try_get("show_pricing")?,
            show_terms: row.try_get("show_terms")?,
            show_sow_number: row.try_get("show_sow_number")?,
            require_signature: row.try_get("require_signature")?,
            discount_type,
            discount_value: row.try_get("discount_value")?,
            tax_rate: row.try_get("tax_rate")?,
            default_pricing_type,
            sow_number: row.try_get("sow_number")?,
            status,
            sent_at: row.try_get("sent_at")?,
            viewed_at: row.try_get("viewed_at")?,
            accepted_at: row.try_get("accepted_at")?,
            declined_at: row.try_get("declined_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_signature(&self, row: &SqliteRow) -> StorageResult<ProposalSignature> {
        Ok(ProposalSignature {
            id: row.try_get("id")?,
            proposal_id: row.try_get("proposal_id")?,
            signer_name: row.try_get("signer_name")?,
            signer_email: row.try_get("signer_email")?,
            signature_image_ref: row.try_get("signature_image_ref")?,
            document_hash: row.try_get("document_hash")?,
            accepted_terms: row.try_get("accepted_terms")?,
            signed_at: row.try_get("signed_at")?,
        })
    }

    fn row_to_prefix(&self, row: &SqliteRow) -> StorageResult<SowPrefix> {
        Ok(SowPrefix {
            account_id: row.try_get("account_id")?,
            prefix: row.try_get("prefix")?,
            locked: row.try_get("locked")?,
        })
    }

    async fn fetch_proposal(&self, id: &str) -> StorageResult<Proposal> {
        let row = sqlx::query("SELECT * FROM proposals WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;
        match row {
            Some(row) => self.row_to_proposal(&row),
            None => Err(StorageError::NotFound),
        }
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

#[async_trait]
impl ProposalStorage for SqliteProposalStorage {
    async fn initialize(&self) -> StorageResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS proposals (
                id TEXT PRIMARY KEY,
                token TEXT NOT NULL UNIQUE,
                account_id TEXT NOT NULL,
                is_template INTEGER NOT NULL DEFAULT 0,
                title TEXT NOT NULL,
                proposal_date TEXT NOT NULL,
                expiration_date TEXT,
                client_first_name TEXT NOT NULL DEFAULT '',
                client_last_name TEXT NOT NULL DEFAULT '',
                client_email TEXT NOT NULL DEFAULT '',
                client_company TEXT,
                contact_id TEXT,
                business TEXT NOT NULL,
                sections TEXT NOT NULL,
                line_items TEXT NOT NULL,
                terms TEXT NOT NULL DEFAULT '',
                show_pricing INTEGER NOT NULL DEFAULT 1,
                show_terms INTEGER NOT NULL DEFAULT 1,
                show_sow_number INTEGER NOT NULL DEFAULT 1,
                require_signature INTEGER NOT NULL DEFAULT 1,
                discount_type TEXT NOT NULL,
                discount_value REAL NOT NULL DEFAULT 0,
                tax_rate REAL NOT NULL DEFAULT 0,
                default_pricing_type TEXT NOT NULL,
                sow_number INTEGER,
                status TEXT NOT NULL DEFAULT 'draft',
                sent_at TEXT,
                viewed_at TEXT,
                accepted_at TEXT,
                declined_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        // Duplicate numbers for the same account are a constraint violation,
        // which the creation path retries on
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_proposals_account_sow
             ON proposals (account_id, sow_number)
             WHERE sow_number IS NOT NULL",
        )
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_proposals_account
             ON proposals (account_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS proposal_signatures (
                id TEXT PRIMARY KEY,
                proposal_id TEXT NOT NULL UNIQUE REFERENCES proposals(id),
                signer_name TEXT NOT NULL,
                signer_email TEXT NOT NULL,
                signature_image_ref TEXT,
                document_hash TEXT NOT NULL,
                accepted_terms INTEGER NOT NULL,
                signed_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sow_prefixes (
                account_id TEXT PRIMARY KEY,
                prefix TEXT NOT NULL,
                locked INTEGER NOT NULL DEFAULT 0
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        Ok(())
    }

    async fn create_proposal(&self, input: ProposalCreateInput) -> StorageResult<Proposal> {
        let now = Utc::now();
        let proposal = Proposal {
            id: generate_proposal_id(),
            token: generate_public_token(),
            account_id: input.account_id,
            is_template: input.is_template,
            title: input.title,
            proposal_date: input.proposal_date.unwrap_or(now),
            expiration_date: input.expiration_date,
            client_first_name: input.client_first_name,
            client_last_name: input.client_last_name,
            client_email: input.client_email,
            client_company: input.client_company,
            contact_id: input.contact_id,
            business: input.business,
            sections: sections_from_inputs(&input.sections),
            line_items: line_items_from_inputs(&input.line_items),
            terms: input.terms,
            show_pricing: input.show_pricing,
            show_terms: input.show_terms,
            show_sow_number: input.show_sow_number,
            require_signature: input.require_signature,
            discount_type: input.discount_type,
            discount_value: input.discount_value,
            tax_rate: input.tax_rate,
            default_pricing_type: input.default_pricing_type,
            sow_number: None,
            status: ProposalStatus::Draft,
            sent_at: None,
            viewed_at: None,
            accepted_at: None,
            declined_at: None,
            created_at: now,
            updated_at: now,
        };

        let sections_json = serde_json::to_string(&proposal.sections)?;
        let line_items_json = serde_json::to_string(&proposal.line_items)?;
        let business_json = serde_json::to_string(&proposal.business)?;

        let mut attempt = 0;
        let sow_number = loop {
            // Templates never participate in sequencing
            let candidate = if proposal.is_template {
                None
            } else {
                let max = self.max_sow_number(&proposal.account_id).await?;
                Some(max.unwrap_or(0) + 1)
            };

            let result = sqlx::query(
                "INSERT INTO proposals (
                    id, token, account_id, is_template, title, proposal_date,
                    expiration_date, client_first_name, client_last_name,
                    client_email, client_company, contact_id, business,
                    sections, line_items, terms, show_pricing, show_terms,
                    show_sow_number, require_signature, discount_type,
                    discount_value, tax_rate, default_pricing_type, sow_number,
                    status, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&proposal.id)
            .bind(&proposal.token)
            .bind(&proposal.account_id)
            .bind(proposal.is_template)
            .bind(&proposal.title)
            .bind(proposal.proposal_date)
            .bind(proposal.expiration_date)
            .bind(&proposal.client_first_name)
            .bind(&proposal.client_last_name)
            .bind(&proposal.client_email)
            .bind(&proposal.client_company)
            .bind(&proposal.contact_id)
            .bind(&business_json)
            .bind(&sections_json)
            .bind(&line_items_json)
            .bind(&proposal.terms)
            .bind(proposal.show_pricing)
            .bind(proposal.show_terms)
            .bind(proposal.show_sow_number)
            .bind(proposal.require_signature)
            .bind(proposal.discount_type.to_string())
            .bind(proposal.discount_value)
            .bind(proposal.tax_rate)
            .bind(proposal.default_pricing_type.to_string())
            .bind(candidate)
            .bind(proposal.status.to_string())
            .bind(proposal.created_at)
            .bind(proposal.updated_at)
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => break candidate,
                Err(error) if is_unique_violation(&error) => {
                    attempt += 1;
                    if attempt >= MAX_NUMBER_ALLOCATION_ATTEMPTS {
                        warn!(
                            account_id = %proposal.account_id,
                            "exhausted document number allocation attempts"
                        );
                        return Err(StorageError::NumberAllocation);
                    }
                    // A concurrent creation took this number; re-read and retry
                    continue;
                }
                Err(error) => return Err(StorageError::Sqlx(error)),
            }
        };

        // First use by a non-template proposal latches the account prefix
        if !proposal.is_template {
            sqlx::query("UPDATE sow_prefixes SET locked = 1 WHERE account_id = ? AND locked = 0")
                .bind(&proposal.account_id)
                .execute(&self.pool)
                .await
                .map_err(StorageError::Sqlx)?;
        }

        debug!(proposal_id = %proposal.id, sow_number = ?sow_number, "created proposal");
        Ok(Proposal {
            sow_number,
            ..proposal
        })
    }

    async fn get_proposal(&self, id: &str) -> StorageResult<Option<Proposal>> {
        let row = sqlx::query("SELECT * FROM proposals WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;
        row.map(|row| self.row_to_proposal(&row)).transpose()
    }

    async fn get_proposal_by_token(&self, token: &str) -> StorageResult<Option<Proposal>> {
        let row = sqlx::query("SELECT * FROM proposals WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;
        row.map(|row| self.row_to_proposal(&row)).transpose()
    }

    async fn list_proposals(
        &self,
        account_id: &str,
        filter: &ProposalFilter,
    ) -> StorageResult<Vec<Proposal>> {
        let mut sql = String::from("SELECT * FROM proposals WHERE account_id = ?");
        if filter.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        if filter.is_template.is_some() {
            sql.push_str(" AND is_template = ?");
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut query = sqlx::query(&sql).bind(account_id);
        if let Some(status) = filter.status {
            query = query.bind(status.to_string());
        }
        if let Some(is_template) = filter.is_template {
            query = query.bind(is_template);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;
        rows.iter().map(|row| self.row_to_proposal(row)).collect()
    }

    async fn update_content(&self, proposal: &Proposal) -> StorageResult<Proposal> {
        let sections_json = serde_json::to_string(&proposal.sections)?;
        let line_items_json = serde_json::to_string(&proposal.line_items)?;
        let business_json = serde_json::to_string(&proposal.business)?;

        let result = sqlx::query(
            "UPDATE proposals SET
                title = ?, proposal_date = ?, expiration_date = ?,
                client_first_name = ?, client_last_name = ?, client_email = ?,
                client_company = ?, contact_id = ?, business = ?, sections = ?,
                line_items = ?, terms = ?, show_pricing = ?, show_terms = ?,
                show_sow_number = ?, require_signature = ?, discount_type = ?,
                discount_value = ?, tax_rate = ?, default_pricing_type = ?,
                updated_at = ?
             WHERE id = ?",
        )
        .bind(&proposal.title)
        .bind(proposal.proposal_date)
        .bind(proposal.expiration_date)
        .bind(&proposal.client_first_name)
        .bind(&proposal.client_last_name)
        .bind(&proposal.client_email)
        .bind(&proposal.client_company)
        .bind(&proposal.contact_id)
        .bind(&business_json)
        .bind(&sections_json)
        .bind(&line_items_json)
        .bind(&proposal.terms)
        .bind(proposal.show_pricing)
        .bind(proposal.show_terms)
        .bind(proposal.show_sow_number)
        .bind(proposal.require_signature)
        .bind(proposal.discount_type.to_string())
        .bind(proposal.discount_value)
        .bind(proposal.tax_rate)
        .bind(proposal.default_pricing_type.to_string())
        .bind(proposal.updated_at)
        .bind(&proposal.id)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        self.fetch_proposal(&proposal.id).await
    }

    async fn delete_proposal(&self, id: &str) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM proposals WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn update_status(
        &self,
        id: &str,
        status: ProposalStatus,
        at: DateTime<Utc>,
    ) -> StorageResult<Proposal> {
        // Milestone columns are written through COALESCE so they are set at
        // most once; re-sending keeps the original sent_at
        let result = match MilestoneStamp::for_status(status) {
            Some(stamp) => {
                let sql = format!(
                    "UPDATE proposals SET status = ?, {col} = COALESCE({col}, ?), updated_at = ? WHERE id = ?",
                    col = stamp.column()
                );
                sqlx::query(&sql)
                    .bind(status.to_string())
                    .bind(at)
                    .bind(at)
                    .bind(id)
                    .execute(&self.pool)
                    .await
            }
            None => {
                sqlx::query("UPDATE proposals SET status = ?, updated_at = ? WHERE id = ?")
                    .bind(status.to_string())
                    .bind(at)
                    .bind(id)
                    .execute(&self.pool)
                    .await
            }
        }
        .map_err(StorageError::Sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        self.fetch_proposal(id).await
    }

    async fn mark_viewed(&self, id: &str, at: DateTime<Utc>) -> StorageResult<bool> {
        let result = sqlx::query(
            "UPDATE proposals SET status = 'viewed', viewed_at = ?, updated_at = ?
             WHERE id = ? AND status = 'sent' AND viewed_at IS NULL",
        )
        .bind(at)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_signature(
        &self,
        signature: ProposalSignature,
    ) -> StorageResult<ProposalSignature> {
        let mut tx = self.pool.begin().await.map_err(StorageError::Sqlx)?;

        let insert = sqlx::query(
            "INSERT INTO proposal_signatures (
                id, proposal_id, signer_name, signer_email,
                signature_image_ref, document_hash, accepted_terms, signed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&signature.id)
        .bind(&signature.proposal_id)
        .bind(&signature.signer_name)
        .bind(&signature.signer_email)
        .bind(&signature.signature_image_ref)
        .bind(&signature.document_hash)
        .bind(signature.accepted_terms)
        .bind(signature.signed_at)
        .execute(&mut *tx)
        .await;

        if let Err(error) = insert {
            if is_unique_violation(&error) {
                return Err(StorageError::AlreadySigned);
            }
            return Err(StorageError::Sqlx(error));
        }

        sqlx::query(
            "UPDATE proposals SET status = 'accepted',
                accepted_at = COALESCE(accepted_at, ?), updated_at = ?
             WHERE id = ?",
        )
        .bind(signature.signed_at)
        .bind(signature.signed_at)
        .bind(&signature.proposal_id)
        .execute(&mut *tx)
        .await
        .map_err(StorageError::Sqlx)?;

        tx.commit().await.map_err(StorageError::Sqlx)?;
        Ok(signature)
    }

    async fn get_signature(&self, proposal_id: &str) -> StorageResult<Option<ProposalSignature>> {
        let row = sqlx::query("SELECT * FROM proposal_signatures WHERE proposal_id = ?")
            .bind(proposal_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;
        row.map(|row| self.row_to_signature(&row)).transpose()
    }

    async fn get_prefix(&self, account_id: &str) -> StorageResult<Option<SowPrefix>> {
        let row = sqlx::query("SELECT * FROM sow_prefixes WHERE account_id = ?")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;
        row.map(|row| self.row_to_prefix(&row)).transpose()
    }

    async fn insert_prefix_if_absent(
        &self,
        account_id: &str,
        prefix: &str,
    ) -> StorageResult<SowPrefix> {
        sqlx::query(
            "INSERT INTO sow_prefixes (account_id, prefix, locked)
             VALUES (?, ?, 0)
             ON CONFLICT (account_id) DO NOTHING",
        )
        .bind(account_id)
        .bind(prefix)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        match self.get_prefix(account_id).await? {
            Some(existing) => Ok(existing),
            None => Err(StorageError::Database(
                "prefix missing after insert".to_string(),
            )),
        }
    }

    async fn max_sow_number(&self, account_id: &str) -> StorageResult<Option<i64>> {
        let row = sqlx::query(
            "SELECT MAX(sow_number) AS max_sow FROM proposals
             WHERE account_id = ? AND is_template = 0",
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;
        let max: Option<i64> = row.try_get("max_sow")?;
        Ok(max)
    }
}
