//! Sent mail repository for Outpost.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::types::{NewSentMail, SendStatus, SentMail};
use crate::{OutpostError, Result};

/// Internal struct for mapping database rows to SentMail.
#[derive(sqlx::FromRow)]
struct SentMailRow {
    id: i64,
    user_id: i64,
    recipient: String,
    cc: Option<String>,
    bcc: Option<String>,
    subject: String,
    body: String,
    message_id: Option<String>,
    status: String,
    sent_at: String,
}

impl From<SentMailRow> for SentMail {
    fn from(row: SentMailRow) -> Self {
        SentMail {
            id: row.id,
            user_id: row.user_id,
            to: row.recipient,
            cc: row.cc,
            bcc: row.bcc,
            subject: row.subject,
            body: row.body,
            message_id: row.message_id,
            status: row.status.parse().unwrap_or_default(),
            sent_at: parse_datetime(&row.sent_at).unwrap_or_else(Utc::now),
        }
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

const SELECT_COLUMNS: &str =
    "id, user_id, recipient, cc, bcc, subject, body, message_id, status, sent_at";

/// Repository for sent mail records.
pub struct SentMailRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SentMailRepository<'a> {
    /// Create a repository over the given pool.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a sent mail record, returning it with its assigned ID.
    pub async fn create(&self, mail: &NewSentMail) -> Result<SentMail> {
        let sent_at = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO sent_mails (user_id, recipient, cc, bcc, subject, body, message_id, status, sent_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(mail.user_id)
        .bind(&mail.to)
        .bind(&mail.cc)
        .bind(&mail.bcc)
        .bind(&mail.subject)
        .bind(&mail.body)
        .bind(&mail.message_id)
        .bind(mail.status.as_str())
        .bind(&sent_at)
        .execute(self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| OutpostError::Database("created record not found".to_string()))
    }

    /// Get a record by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<SentMail>> {
        let row: Option<SentMailRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM sent_mails WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(SentMail::from))
    }

    /// List a user's sent mail, newest first, with pagination.
    ///
    /// `page` is 1-based. Returns the page of records and the user's total
    /// record count. Only records owned by `user_id` are visible.
    pub async fn list_by_user(
        &self,
        user_id: i64,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<SentMail>, i64)> {
        let page = page.max(1);
        let offset = (page - 1) * limit;

        let rows: Vec<SentMailRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM sent_mails
             WHERE user_id = ?
             ORDER BY sent_at DESC, id DESC
             LIMIT ? OFFSET ?"
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let total = self.count_by_user(user_id).await?;
        Ok((rows.into_iter().map(SentMail::from).collect(), total))
    }

    /// Count a user's sent mail records.
    pub async fn count_by_user(&self, user_id: i64) -> Result<i64> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sent_mails WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(self.pool)
                .await?;
        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn sample(user_id: i64, to: &str, subject: &str) -> NewSentMail {
        NewSentMail::sent(user_id, to, subject, "body", format!("<{subject}@test>"))
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = setup_db().await;
        let repo = SentMailRepository::new(db.pool());

        let created = repo
            .create(&sample(1, "a@b.com", "Hello").with_bcc(Some("x@y.com".to_string())))
            .await
            .unwrap();

        assert!(created.id > 0);
        assert_eq!(created.user_id, 1);
        assert_eq!(created.to, "a@b.com");
        assert!(created.cc.is_none());
        assert_eq!(created.bcc.as_deref(), Some("x@y.com"));
        assert_eq!(created.status, SendStatus::Sent);
        assert_eq!(created.message_id.as_deref(), Some("<Hello@test>"));

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.subject, "Hello");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = setup_db().await;
        let repo = SentMailRepository::new(db.pool());
        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let db = setup_db().await;
        let repo = SentMailRepository::new(db.pool());

        repo.create(&sample(1, "a@b.com", "First")).await.unwrap();
        repo.create(&sample(1, "a@b.com", "Second")).await.unwrap();
        repo.create(&sample(1, "a@b.com", "Third")).await.unwrap();

        let (mails, total) = repo.list_by_user(1, 1, 20).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(mails.len(), 3);
        assert_eq!(mails[0].subject, "Third");
        assert_eq!(mails[2].subject, "First");
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let db = setup_db().await;
        let repo = SentMailRepository::new(db.pool());

        for i in 0..5 {
            repo.create(&sample(1, "a@b.com", &format!("Mail {i}")))
                .await
                .unwrap();
        }

        let (page1, total) = repo.list_by_user(1, 1, 2).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page1.len(), 2);
        assert_eq!(page1[0].subject, "Mail 4");

        let (page3, _) = repo.list_by_user(1, 3, 2).await.unwrap();
        assert_eq!(page3.len(), 1);
        assert_eq!(page3[0].subject, "Mail 0");

        let (page4, _) = repo.list_by_user(1, 4, 2).await.unwrap();
        assert!(page4.is_empty());
    }

    #[tokio::test]
    async fn test_list_page_zero_treated_as_first() {
        let db = setup_db().await;
        let repo = SentMailRepository::new(db.pool());

        repo.create(&sample(1, "a@b.com", "Only")).await.unwrap();

        let (mails, _) = repo.list_by_user(1, 0, 20).await.unwrap();
        assert_eq!(mails.len(), 1);
    }

    #[tokio::test]
    async fn test_owner_isolation() {
        let db = setup_db().await;
        let repo = SentMailRepository::new(db.pool());

        repo.create(&sample(1, "a@b.com", "Mine")).await.unwrap();
        repo.create(&sample(2, "c@d.com", "Theirs")).await.unwrap();

        let (mine, total) = repo.list_by_user(1, 1, 20).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].subject, "Mine");

        assert_eq!(repo.count_by_user(2).await.unwrap(), 1);
        assert_eq!(repo.count_by_user(3).await.unwrap(), 0);
    }
}
