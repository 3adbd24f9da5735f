use shared::models::{SeckillVoucher, SeckillVoucherCreate};
use sqlx::{SqliteConnection, SqlitePool};

/// Insert a flash-sale voucher row
pub async fn insert(
    pool: &SqlitePool,
    data: &SeckillVoucherCreate,
    now: i64,
) -> Result<SeckillVoucher, sqlx::Error> {
    sqlx::query(
        "INSERT INTO tb_seckill_voucher (voucher_id, stock, begin_time, end_time, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(data.voucher_id)
    .bind(data.stock)
    .bind(data.begin_time)
    .bind(data.end_time)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(SeckillVoucher {
        voucher_id: data.voucher_id,
        stock: data.stock,
        begin_time: data.begin_time,
        end_time: data.end_time,
        created_at: now,
        updated_at: now,
    })
}

pub async fn find(pool: &SqlitePool, voucher_id: i64) -> Result<Option<SeckillVoucher>, sqlx::Error> {
    sqlx::query_as::<_, SeckillVoucher>(
        "SELECT voucher_id, stock, begin_time, end_time, created_at, updated_at
         FROM tb_seckill_voucher WHERE voucher_id = ?",
    )
    .bind(voucher_id)
    .fetch_optional(pool)
    .await
}

/// Guarded decrement: only succeeds while stock is still positive.
///
/// Returns false when no unit was left (or the voucher does not exist).
pub async fn decrement_stock(
    conn: &mut SqliteConnection,
    voucher_id: i64,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query(
        "UPDATE tb_seckill_voucher SET stock = stock - 1, updated_at = ?
         WHERE voucher_id = ? AND stock > 0",
    )
    .bind(now)
    .bind(voucher_id)
    .execute(conn)
    .await?
    .rows_affected();
    Ok(rows == 1)
}
