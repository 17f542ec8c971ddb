use chrono::NaiveDate;
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::AppError;

pub async fn special_day_exists(pool: &SqlitePool, date: NaiveDate) -> Result<bool, AppError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM special_days WHERE date = ?")
        .bind(date)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Registers the date if not already present.
pub async fn register_special_day(
    tx: &mut Transaction<'_, Sqlite>,
    date: NaiveDate,
) -> Result<(), AppError> {
    sqlx::query("INSERT OR IGNORE INTO special_days (date) VALUES (?)")
        .bind(date)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
