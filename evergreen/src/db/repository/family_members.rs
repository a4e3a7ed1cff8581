use chrono::{DateTime, NaiveDate, Utc};
use libsql::{params, Connection};
use nanoid::nanoid;

use crate::error::Result;
use crate::models::{FamilyMember, NewFamilyMember};

const COLUMNS: &str = "id, memorial_id, parent_id, name, relationship, birth_date, death_date, \
                       bio, image_url, is_premium, created_at, updated_at";

pub struct FamilyMemberRepository;

impl FamilyMemberRepository {
    /// Insert a new member and return it with its assigned id.
    pub async fn create(
        conn: &Connection,
        memorial_id: &str,
        member: &NewFamilyMember,
    ) -> Result<FamilyMember> {
        let now = Utc::now();
        let record = FamilyMember {
            id: nanoid!(),
            memorial_id: memorial_id.to_string(),
            parent_id: member.parent_id.clone(),
            name: member.name.clone(),
            relationship: member.relationship.clone(),
            birth_date: member.birth_date,
            death_date: member.death_date,
            bio: member.bio.clone(),
            image_url: member.image_url.clone(),
            is_premium: member.is_premium,
            created_at: now,
            updated_at: now,
        };

        conn.execute(
            &format!(
                "INSERT INTO family_members ({COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
            ),
            params![
                record.id.clone(),
                record.memorial_id.clone(),
                record.parent_id.clone(),
                record.name.clone(),
                record.relationship.clone(),
                record.birth_date.map(|d| d.to_string()),
                record.death_date.map(|d| d.to_string()),
                record.bio.clone(),
                record.image_url.clone(),
                record.is_premium as i32,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )
        .await?;

        Ok(record)
    }

    /// Every member of a memorial in insertion order.
    pub async fn list_by_memorial(conn: &Connection, memorial_id: &str) -> Result<Vec<FamilyMember>> {
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {COLUMNS} FROM family_members \
                     WHERE memorial_id = ?1 ORDER BY created_at ASC, rowid ASC"
                ),
                params![memorial_id],
            )
            .await?;

        let mut members = Vec::new();
        while let Some(row) = rows.next().await? {
            members.push(Self::row_to_member(&row)?);
        }
        Ok(members)
    }

    pub async fn get(
        conn: &Connection,
        memorial_id: &str,
        id: &str,
    ) -> Result<Option<FamilyMember>> {
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {COLUMNS} FROM family_members WHERE memorial_id = ?1 AND id = ?2"
                ),
                params![memorial_id, id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_member(&row)?))
        } else {
            Ok(None)
        }
    }

    /// Overwrite the writable columns of an existing row. Returns false when
    /// no row matched.
    pub async fn update(conn: &Connection, member: &FamilyMember) -> Result<bool> {
        let rows_affected = conn
            .execute(
                r#"
                UPDATE family_members SET
                    parent_id = ?3,
                    name = ?4,
                    relationship = ?5,
                    birth_date = ?6,
                    death_date = ?7,
                    bio = ?8,
                    image_url = ?9,
                    is_premium = ?10,
                    updated_at = ?11
                WHERE memorial_id = ?1 AND id = ?2
                "#,
                params![
                    member.memorial_id.clone(),
                    member.id.clone(),
                    member.parent_id.clone(),
                    member.name.clone(),
                    member.relationship.clone(),
                    member.birth_date.map(|d| d.to_string()),
                    member.death_date.map(|d| d.to_string()),
                    member.bio.clone(),
                    member.image_url.clone(),
                    member.is_premium as i32,
                    member.updated_at.to_rfc3339(),
                ],
            )
            .await?;

        Ok(rows_affected > 0)
    }

    pub async fn set_premium(
        conn: &Connection,
        memorial_id: &str,
        id: &str,
        is_premium: bool,
    ) -> Result<bool> {
        let rows_affected = conn
            .execute(
                "UPDATE family_members SET is_premium = ?3, updated_at = ?4 \
                 WHERE memorial_id = ?1 AND id = ?2",
                params![memorial_id, id, is_premium as i32, Utc::now().to_rfc3339()],
            )
            .await?;

        Ok(rows_affected > 0)
    }

    pub fn row_to_member(row: &libsql::Row) -> Result<FamilyMember> {
        Ok(FamilyMember {
            id: row.get(0)?,
            memorial_id: row.get(1)?,
            parent_id: row.get(2)?,
            name: row.get(3)?,
            relationship: row.get(4)?,
            birth_date: parse_date(row.get::<Option<String>>(5)?),
            death_date: parse_date(row.get::<Option<String>>(6)?),
            bio: row.get(7)?,
            image_url: row.get(8)?,
            is_premium: row.get::<i32>(9)? != 0,
            created_at: DateTime::parse_from_rfc3339(&row.get::<String>(10)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            updated_at: DateTime::parse_from_rfc3339(&row.get::<String>(11)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

fn parse_date(value: Option<String>) -> Option<NaiveDate> {
    let value = value?;
    match value.parse() {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::warn!(value = %value, error = %e, "Ignoring malformed stored date");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_schema;
    use pretty_assertions::assert_eq;

    async fn setup_test_db() -> Connection {
        let conn = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .unwrap()
            .connect()
            .unwrap();
        init_schema(&conn).await.unwrap();
        conn
    }

    fn new_member(name: &str, parent_id: Option<&str>) -> NewFamilyMember {
        NewFamilyMember {
            parent_id: parent_id.map(str::to_string),
            name: name.to_string(),
            relationship: "Relative".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_round_trips_fields() {
        let conn = setup_test_db().await;
        let mut input = new_member("Edith", None);
        input.birth_date = NaiveDate::from_ymd_opt(1931, 3, 4);
        input.bio = Some("Kept bees.".to_string());

        let created = FamilyMemberRepository::create(&conn, "mem_1", &input)
            .await
            .unwrap();
        assert!(!created.id.is_empty());

        let fetched = FamilyMemberRepository::get(&conn, "mem_1", &created.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.name, "Edith");
        assert_eq!(fetched.birth_date, NaiveDate::from_ymd_opt(1931, 3, 4));
        assert_eq!(fetched.death_date, None);
        assert_eq!(fetched.bio.as_deref(), Some("Kept bees."));
        assert!(!fetched.is_premium);
    }

    #[tokio::test]
    async fn list_is_scoped_and_in_insertion_order() {
        let conn = setup_test_db().await;
        let a = FamilyMemberRepository::create(&conn, "mem_1", &new_member("A", None))
            .await
            .unwrap();
        FamilyMemberRepository::create(&conn, "mem_2", &new_member("Other", None))
            .await
            .unwrap();
        let b = FamilyMemberRepository::create(&conn, "mem_1", &new_member("B", Some(&a.id)))
            .await
            .unwrap();
        let c = FamilyMemberRepository::create(&conn, "mem_1", &new_member("C", None))
            .await
            .unwrap();

        let ids: Vec<String> = FamilyMemberRepository::list_by_memorial(&conn, "mem_1")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
    }

    #[tokio::test]
    async fn get_from_other_memorial_is_none() {
        let conn = setup_test_db().await;
        let a = FamilyMemberRepository::create(&conn, "mem_1", &new_member("A", None))
            .await
            .unwrap();

        assert!(FamilyMemberRepository::get(&conn, "mem_2", &a.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn update_and_set_premium() {
        let conn = setup_test_db().await;
        let mut a = FamilyMemberRepository::create(&conn, "mem_1", &new_member("A", None))
            .await
            .unwrap();

        a.name = "Agnes".to_string();
        a.death_date = NaiveDate::from_ymd_opt(2001, 5, 6);
        assert!(FamilyMemberRepository::update(&conn, &a).await.unwrap());

        assert!(FamilyMemberRepository::set_premium(&conn, "mem_1", &a.id, true)
            .await
            .unwrap());
        assert!(!FamilyMemberRepository::set_premium(&conn, "mem_1", "missing", true)
            .await
            .unwrap());

        let fetched = FamilyMemberRepository::get(&conn, "mem_1", &a.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.name, "Agnes");
        assert_eq!(fetched.death_date, NaiveDate::from_ymd_opt(2001, 5, 6));
        assert!(fetched.is_premium);
    }

    #[tokio::test]
    async fn malformed_stored_date_reads_as_none() {
        let conn = setup_test_db().await;
        let a = FamilyMemberRepository::create(&conn, "mem_1", &new_member("A", None))
            .await
            .unwrap();
        conn.execute(
            "UPDATE family_members SET birth_date = 'sometime in 1930' WHERE id = ?1",
            params![a.id.clone()],
        )
        .await
        .unwrap();

        let fetched = FamilyMemberRepository::get(&conn, "mem_1", &a.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.birth_date, None);
    }
}
