// src/models/calendar.rs

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Franja horaria ofrecida en el checkout.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DeliverySlot {
    pub id: i32,
    pub label: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
}

// Fecha bloqueada por la administración: no se aceptan entregas ese día.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BlockedDate {
    pub id: i32,
    pub date: NaiveDate,
    pub reason: Option<String>,
}
