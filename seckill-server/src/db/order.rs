use shared::models::VoucherOrder;
use sqlx::{SqliteConnection, SqlitePool};

/// Whether the user already owns an order for the voucher
pub async fn exists_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
    voucher_id: i64,
) -> Result<bool, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM tb_voucher_order WHERE user_id = ? AND voucher_id = ?",
    )
    .bind(user_id)
    .bind(voucher_id)
    .fetch_one(conn)
    .await?;
    Ok(row.0 > 0)
}

pub async fn insert(conn: &mut SqliteConnection, order: &VoucherOrder) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO tb_voucher_order (id, user_id, voucher_id, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(order.voucher_id)
    .bind(order.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<VoucherOrder>, sqlx::Error> {
    sqlx::query_as::<_, VoucherOrder>(
        "SELECT id, user_id, voucher_id, created_at FROM tb_voucher_order WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn list_by_voucher(
    pool: &SqlitePool,
    voucher_id: i64,
) -> Result<Vec<VoucherOrder>, sqlx::Error> {
    sqlx::query_as::<_, VoucherOrder>(
        "SELECT id, user_id, voucher_id, created_at FROM tb_voucher_order
         WHERE voucher_id = ? ORDER BY id",
    )
    .bind(voucher_id)
    .fetch_all(pool)
    .await
}
