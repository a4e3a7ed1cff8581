use libsql::Connection;

use crate::error::Result;

pub async fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per person in a memorial's family tree. parent_id is not a
        -- foreign key: dangling parents are tolerated and rendered as roots.
        CREATE TABLE IF NOT EXISTS family_members (
            id TEXT PRIMARY KEY,
            memorial_id TEXT NOT NULL,
            parent_id TEXT,
            name TEXT NOT NULL,
            relationship TEXT NOT NULL,
            birth_date TEXT,
            death_date TEXT,
            bio TEXT,
            image_url TEXT,
            is_premium INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_family_members_memorial_id ON family_members(memorial_id);
        CREATE INDEX IF NOT EXISTS idx_family_members_parent_id ON family_members(parent_id);

        -- Confirmed premium subscriptions, one row per processor confirmation.
        CREATE TABLE IF NOT EXISTS subscriptions (
            id TEXT PRIMARY KEY,
            memorial_id TEXT NOT NULL,
            member_id TEXT NOT NULL,
            method TEXT NOT NULL,
            reference TEXT NOT NULL,
            confirmed_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_subscriptions_member_id ON subscriptions(member_id);
        "#,
    )
    .await?;

    add_column_if_missing(
        conn,
        "family_members",
        "updated_at",
        "TEXT NOT NULL DEFAULT '1970-01-01T00:00:00+00:00'",
    )
    .await?;

    Ok(())
}

async fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let exists = conn
        .query(
            "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
            [table, column],
        )
        .await?
        .next()
        .await?
        .map(|row| row.get::<i64>(0).unwrap_or(0) > 0)
        .unwrap_or(false);
    Ok(exists)
}

/// Databases created before `updated_at` was tracked gain the column here.
async fn add_column_if_missing(
    conn: &Connection,
    table: &str,
    column: &str,
    definition: &str,
) -> Result<()> {
    if column_exists(conn, table, column).await? {
        return Ok(());
    }

    tracing::info!(table, column, "Migrating table: adding column");
    conn.execute(
        &format!("ALTER TABLE {table} ADD COLUMN {column} {definition}"),
        (),
    )
    .await?;
    tracing::info!(table, column, "Migration complete");
    Ok(())
}
