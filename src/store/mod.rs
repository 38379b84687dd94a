//! Read-only access to the LiquidFeedback database.
//!
//! A single query joins issues, initiatives and areas of one unit. The
//! connection lives only for the duration of that query.

use crate::models::IssueRow;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::{Connection, PgConnection};
use tracing::{debug, info, warn};

/// Issues of one unit that are still open or were closed on or after the
/// given date, one row per initiative.
pub const DIGEST_QUERY: &str = "\
SELECT
    a.name AS area_name,
    ini.issue_id, ini.id, ini.name, ini.eligible, ini.rank,
    i.closed, i.fully_frozen, i.half_frozen, i.accepted, i.created
FROM
    issue i JOIN initiative ini ON i.id = ini.issue_id JOIN area a ON i.area_id = a.id
WHERE
    a.unit_id = $1 AND (i.closed IS NULL OR i.closed >= $2::date)";

/// Connect, fetch the digest rows and close the connection again.
///
/// The connection is closed whether or not the query succeeded.
pub async fn fetch_digest_rows(
    database_url: &str,
    unit_id: i32,
    since: NaiveDate,
) -> Result<Vec<IssueRow>> {
    info!("Connecting to database");
    let mut conn = PgConnection::connect(database_url)
        .await
        .context("Failed to connect to database")?;

    let fetched = query_rows(&mut conn, unit_id, since).await;
    let closed = conn.close().await;

    let rows = match fetched {
        Ok(rows) => rows,
        Err(e) => {
            if let Err(close_err) = closed {
                warn!("Failed to close database connection: {}", close_err);
            }
            return Err(e);
        }
    };
    closed.context("Failed to close database connection")?;

    info!("Fetched {} rows for unit {}", rows.len(), unit_id);
    Ok(rows)
}

/// Run the digest query on an open connection.
pub async fn query_rows(
    conn: &mut PgConnection,
    unit_id: i32,
    since: NaiveDate,
) -> Result<Vec<IssueRow>> {
    debug!("Querying unit {} since {}", unit_id, since);

    sqlx::query_as::<_, IssueRow>(DIGEST_QUERY)
        .bind(unit_id)
        .bind(since)
        .fetch_all(conn)
        .await
        .with_context(|| format!("Failed to query issues of unit {}", unit_id))
}
