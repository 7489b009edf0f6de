//! Pool construction, schema bootstrap and the attendance index repair.
//!
//! The pool is created lazily so the server comes up even when MySQL is
//! down; every request that then touches the database surfaces a 503.

use sqlx::MySqlPool;
use sqlx::mysql::{MySqlDatabaseError, MySqlPoolOptions};
use tracing::{debug, info, warn};

/// Obsolete unique index from the old schema, keyed on the legacy column.
pub const LEGACY_ATTENDANCE_INDEX: &str = "uq_attendance_emp_id_date";
/// Correct unique index, keyed on the current column.
pub const CURRENT_ATTENDANCE_INDEX: &str = "uq_attendance_employee_id_date";

// MySQL error numbers used for idempotent index repair.
const ER_DUP_KEYNAME: u32 = 1061;
const ER_CANT_DROP_KEY: u32 = 1091;

pub fn init_db(database_url: &str) -> MySqlPool {
    MySqlPoolOptions::new()
        .max_connections(10)
        .connect_lazy(database_url)
        .expect("Invalid DATABASE_URL")
}

/// Round-trip to the database. The error carries the connection failure
/// detail for the health endpoint.
pub async fn ping(pool: &MySqlPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// True when `e` is a duplicate-key rejection (SQLSTATE 23000).
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23000"),
        _ => false,
    }
}

fn mysql_error_number(e: &sqlx::Error) -> Option<u32> {
    match e {
        sqlx::Error::Database(db_err) => db_err
            .try_downcast_ref::<MySqlDatabaseError>()
            .map(|m| u32::from(m.number())),
        _ => None,
    }
}

/// Create the tables if they are missing. Safe to run on every startup.
pub async fn bootstrap_schema(pool: &MySqlPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS employees (
            id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY,
            employee_id VARCHAR(64) NOT NULL,
            full_name VARCHAR(255) NOT NULL,
            email VARCHAR(255) NOT NULL,
            department VARCHAR(255) NOT NULL,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
            UNIQUE KEY uq_employees_employee_id (employee_id),
            UNIQUE KEY uq_employees_email (email)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY,
            email VARCHAR(255) NOT NULL,
            password VARCHAR(255) NOT NULL,
            full_name VARCHAR(255) NOT NULL,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
            UNIQUE KEY uq_users_email (email)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Both key columns are nullable: legacy rows carry only emp_id, rows
    // written by this code carry both.
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS attendance (
            id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY,
            employee_id VARCHAR(64) NULL,
            emp_id VARCHAR(64) NULL,
            date DATE NOT NULL,
            status VARCHAR(16) NOT NULL,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL,
            UNIQUE KEY {CURRENT_ATTENDANCE_INDEX} (employee_id, date)
        )
        "#
    ))
    .execute(pool)
    .await?;

    Ok(())
}

/// True when the obsolete unique index still exists on the attendance
/// table. Consulted to classify duplicate-key conflicts instead of
/// inspecting error text.
pub async fn legacy_attendance_index_present(pool: &MySqlPool) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM information_schema.statistics
        WHERE table_schema = DATABASE()
          AND table_name = 'attendance'
          AND index_name = ?
        "#,
    )
    .bind(LEGACY_ATTENDANCE_INDEX)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

/// One-shot schema repair: drop the obsolete unique index, ensure the
/// correct one exists. Both steps are idempotent and neither is allowed to
/// block attendance operations, so failures are logged and swallowed.
pub async fn ensure_attendance_indexes(pool: &MySqlPool) {
    let drop_sql = format!("ALTER TABLE attendance DROP INDEX {LEGACY_ATTENDANCE_INDEX}");
    match sqlx::query(&drop_sql).execute(pool).await {
        Ok(_) => info!(index = LEGACY_ATTENDANCE_INDEX, "Dropped obsolete attendance index"),
        Err(e) if mysql_error_number(&e) == Some(ER_CANT_DROP_KEY) => {
            debug!(index = LEGACY_ATTENDANCE_INDEX, "Obsolete attendance index already gone");
        }
        Err(e) => warn!(error = %e, "Failed to drop obsolete attendance index"),
    }

    let create_sql = format!(
        "CREATE UNIQUE INDEX {CURRENT_ATTENDANCE_INDEX} ON attendance (employee_id, date)"
    );
    match sqlx::query(&create_sql).execute(pool).await {
        Ok(_) => info!(index = CURRENT_ATTENDANCE_INDEX, "Created attendance unique index"),
        Err(e) if mysql_error_number(&e) == Some(ER_DUP_KEYNAME) => {
            debug!(index = CURRENT_ATTENDANCE_INDEX, "Attendance unique index already present");
        }
        Err(e) => warn!(error = %e, "Failed to ensure attendance unique index"),
    }
}
