// src/models/catalog.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// --- Tipos de producto ---
// Se guardan como TEXT en la base (tabla, especialidad, servicio, taller).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Tabla,
    Especialidad,
    Servicio,
    Taller,
}

// Unidad de costo de un ingrediente (gramo, unidad, mililitro).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CostUnit {
    G,
    U,
    Ml,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub display_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub id: i32,
    pub category_id: i32,
    pub name: String,
    pub cost: Decimal,
    pub cost_unit: CostUnit,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i32,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub short_desc: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub persons_min: Option<i32>,
    pub persons_max: Option<i32>,
    pub is_configurable: bool,
    pub is_fixed: bool,
    pub is_active: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage {
    pub id: i32,
    pub product_id: i32,
    pub image_url: String,
    pub alt_text: Option<String>,
    pub display_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub id: i32,
    pub product_id: i32,
    pub name: String,
    pub price: Decimal,
    pub description: Option<String>,
    pub is_active: bool,
}

// Regla de composición: "elegí N ingredientes de la categoría X".
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TablaRule {
    pub id: i32,
    pub product_id: i32,
    pub category_id: i32,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TablaFixedIngredient {
    pub id: i32,
    pub product_id: i32,
    pub ingredient_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    pub id: i32,
    pub product_id: i32,
    pub price_per_person: Option<Decimal>,
    pub min_persons: Option<i32>,
    pub includes_materials: bool,
    pub is_virtual: bool,
    pub requires_quote: bool,
}

// Vista completa de un producto para la página de detalle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub images: Vec<ProductImage>,
    pub variants: Vec<ProductVariant>,
    pub rules: Vec<TablaRule>,
    pub fixed_ingredients: Vec<TablaFixedIngredient>,
    pub service_config: Option<ServiceConfig>,
}
