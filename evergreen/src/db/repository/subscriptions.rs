use chrono::{DateTime, Utc};
use libsql::{params, Connection};
use nanoid::nanoid;

use crate::error::Result;
use crate::models::{PaymentConfirmation, SubscriptionRecord};

pub struct SubscriptionRepository;

impl SubscriptionRepository {
    pub async fn create(
        conn: &Connection,
        memorial_id: &str,
        member_id: &str,
        confirmation: &PaymentConfirmation,
    ) -> Result<SubscriptionRecord> {
        let record = SubscriptionRecord {
            id: nanoid!(),
            memorial_id: memorial_id.to_string(),
            member_id: member_id.to_string(),
            method: confirmation.method,
            reference: confirmation.reference.clone(),
            confirmed_at: confirmation.confirmed_at,
        };

        conn.execute(
            r#"
            INSERT INTO subscriptions (
                id, memorial_id, member_id, method, reference, confirmed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.id.clone(),
                record.memorial_id.clone(),
                record.member_id.clone(),
                record.method.to_string(),
                record.reference.clone(),
                record.confirmed_at.to_rfc3339(),
            ],
        )
        .await?;

        Ok(record)
    }

    pub async fn list_by_member(
        conn: &Connection,
        memorial_id: &str,
        member_id: &str,
    ) -> Result<Vec<SubscriptionRecord>> {
        let mut rows = conn
            .query(
                r#"
                SELECT id, memorial_id, member_id, method, reference, confirmed_at
                FROM subscriptions
                WHERE memorial_id = ?1 AND member_id = ?2
                ORDER BY confirmed_at ASC
                "#,
                params![memorial_id, member_id],
            )
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(Self::row_to_record(&row)?);
        }
        Ok(records)
    }

    fn row_to_record(row: &libsql::Row) -> Result<SubscriptionRecord> {
        Ok(SubscriptionRecord {
            id: row.get(0)?,
            memorial_id: row.get(1)?,
            member_id: row.get(2)?,
            method: row.get::<String>(3)?.parse().unwrap_or_default(),
            reference: row.get(4)?,
            confirmed_at: DateTime::parse_from_rfc3339(&row.get::<String>(5)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}
