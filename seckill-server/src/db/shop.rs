use shared::models::{Shop, ShopUpdate};
use sqlx::SqlitePool;

pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Shop>, sqlx::Error> {
    sqlx::query_as::<_, Shop>(
        "SELECT id, name, type_id, area, address, x, y, avg_price, score, open_hours, updated_at
         FROM tb_shop WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn insert(pool: &SqlitePool, shop: &Shop) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO tb_shop (id, name, type_id, area, address, x, y, avg_price, score, open_hours, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(shop.id)
    .bind(&shop.name)
    .bind(shop.type_id)
    .bind(&shop.area)
    .bind(&shop.address)
    .bind(shop.x)
    .bind(shop.y)
    .bind(shop.avg_price)
    .bind(shop.score)
    .bind(&shop.open_hours)
    .bind(shop.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Partial update; absent fields keep their value. Returns false if no row matched.
pub async fn update(
    pool: &SqlitePool,
    id: i64,
    data: &ShopUpdate,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query(
        "UPDATE tb_shop SET
            name = COALESCE(?, name),
            area = COALESCE(?, area),
            address = COALESCE(?, address),
            avg_price = COALESCE(?, avg_price),
            score = COALESCE(?, score),
            open_hours = COALESCE(?, open_hours),
            updated_at = ?
         WHERE id = ?",
    )
    .bind(&data.name)
    .bind(&data.area)
    .bind(&data.address)
    .bind(data.avg_price)
    .bind(data.score)
    .bind(&data.open_hours)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?
    .rows_affected();
    Ok(rows == 1)
}
