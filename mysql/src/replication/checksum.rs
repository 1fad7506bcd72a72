//! Binlog checksum configuration queries.
//!
//! Servers from MySQL 5.6.2 onwards may append a trailing CRC32 checksum to
//! every binlog event. Whether they do is controlled by the global
//! `binlog_checksum` variable, which must be read before the stream is
//! decoded, and mirrored into the streaming session so the server knows the
//! client expects checksummed events.

use sqlx::error::DatabaseError;
use sqlx::mysql::MySqlDatabaseError;
use sqlx::{MySqlPool, Row};
use thiserror::Error;
use tracing::debug;

/// Server error number for `ER_UNKNOWN_SYSTEM_VARIABLE`.
///
/// Raised by servers older than MySQL 5.6.2, which predate the
/// `binlog_checksum` variable and never checksum their events.
const ER_UNKNOWN_SYSTEM_VARIABLE: u16 = 1193;

/// The sentinel value of `binlog_checksum` meaning no checksum is appended.
pub const CHECKSUM_NONE: &str = "NONE";

/// Errors that can occur while reading or aligning the checksum setting.
#[derive(Debug, Error)]
pub enum ChecksumError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("The binlog_checksum system variable is not known to the server")]
    UnknownSystemVariable,
}

/// Reads the global `binlog_checksum` setting from the server.
///
/// Returns [`ChecksumError::UnknownSystemVariable`] on servers that predate
/// the variable; callers treat that as "checksums disabled" rather than a
/// failure.
pub async fn fetch_binlog_checksum(pool: &MySqlPool) -> Result<String, ChecksumError> {
    let result = sqlx::query("SELECT @@GLOBAL.binlog_checksum AS checksum")
        .fetch_one(pool)
        .await;

    match result {
        Ok(row) => {
            let checksum: String = row.try_get("checksum")?;
            debug!("server reports binlog_checksum = {}", checksum);

            Ok(checksum)
        }
        Err(sqlx::Error::Database(db_err)) if is_unknown_system_variable(db_err.as_ref()) => {
            Err(ChecksumError::UnknownSystemVariable)
        }
        Err(err) => Err(err.into()),
    }
}

/// Aligns the streaming session's checksum expectation with the given value.
///
/// Must be executed on the session that will issue the binlog dump, since the
/// server consults the session-scoped `@master_binlog_checksum` variable when
/// deciding whether to append checksums to streamed events.
pub async fn apply_binlog_checksum(pool: &MySqlPool, value: &str) -> Result<(), sqlx::Error> {
    sqlx::query("SET @master_binlog_checksum = ?")
        .bind(value)
        .execute(pool)
        .await?;

    debug!("streaming session checksum aligned to {}", value);

    Ok(())
}

fn is_unknown_system_variable(err: &dyn DatabaseError) -> bool {
    err.try_downcast_ref::<MySqlDatabaseError>()
        .map(|mysql_err| mysql_err.number() == ER_UNKNOWN_SYSTEM_VARIABLE)
        .unwrap_or(false)
}
