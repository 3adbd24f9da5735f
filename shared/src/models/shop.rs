//! Shop Model

use serde::{Deserialize, Serialize};

/// Shop entity (hot, read-mostly; served through the logical-expire cache)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    pub id: i64,
    pub name: String,
    pub type_id: i64,
    pub area: Option<String>,
    pub address: String,
    pub x: f64,
    pub y: f64,
    pub avg_price: Option<i64>,
    pub score: i64,
    pub open_hours: Option<String>,
    pub updated_at: i64,
}

/// Update shop payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopUpdate {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub area: Option<String>,
    pub address: Option<String>,
    pub avg_price: Option<i64>,
    pub score: Option<i64>,
    pub open_hours: Option<String>,
}
