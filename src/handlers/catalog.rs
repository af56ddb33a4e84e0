// src/handlers/catalog.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::{
    common::error::AppError,
    config::AppState,
    models::catalog::{CostUnit, ProductType},
};

// ---
// Validaciones a medida
// ---

fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let ok = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if ok {
        Ok(())
    } else {
        let mut err = ValidationError::new("slug");
        err.message = Some("El slug solo admite minúsculas, dígitos y guiones.".into());
        Err(err)
    }
}

fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.message = Some("El valor no puede ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

/// Slug URL-seguro a partir de un nombre con acentos y espacios.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        match c {
            'á' | 'à' | 'ä' => slug.push('a'),
            'é' | 'è' | 'ë' => slug.push('e'),
            'í' | 'ì' | 'ï' => slug.push('i'),
            'ó' | 'ò' | 'ö' => slug.push('o'),
            'ú' | 'ù' | 'ü' => slug.push('u'),
            'ñ' => slug.push('n'),
            c if c.is_ascii_lowercase() || c.is_ascii_digit() => slug.push(c),
            ' ' | '-' | '_' => {
                if !slug.ends_with('-') {
                    slug.push('-');
                }
            }
            _ => {}
        }
    }
    slug.trim_matches('-').to_string()
}

// ---
// Lecturas públicas
// ---

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    #[serde(rename = "type")]
    pub product_type: Option<ProductType>,
}

pub async fn list_products(
    State(app_state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let products = app_state
        .catalog_repo
        .list_active_products(query.product_type)
        .await?;
    Ok(Json(products))
}

pub async fn get_product(
    State(app_state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state
        .catalog_repo
        .get_product_detail(id)
        .await?
        .ok_or(AppError::ProductNotFound)?;

    // La vitrina pública no muestra productos dados de baja.
    if !detail.product.is_active {
        return Err(AppError::ProductNotFound);
    }

    Ok(Json(detail))
}

pub async fn list_categories(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let categories = app_state.catalog_repo.list_categories().await?;
    Ok(Json(categories))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientListQuery {
    pub category_id: Option<i32>,
}

pub async fn list_ingredients(
    State(app_state): State<AppState>,
    Query(query): Query<IngredientListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let ingredients = app_state
        .catalog_repo
        .list_available_ingredients(query.category_id)
        .await?;
    Ok(Json(ingredients))
}

// ---
// Payloads y handlers de administración: productos
// ---

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RulePayload {
    #[validate(range(min = 1, message = "categoryId inválido."))]
    pub category_id: i32,
    #[validate(range(min = 1, message = "La cantidad debe ser al menos 1."))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    #[serde(rename = "type")]
    pub product_type: ProductType,

    #[validate(length(min = 1, max = 200, message = "El nombre es obligatorio."))]
    pub name: String,

    #[validate(custom(function = "validate_slug"))]
    pub slug: String,

    #[validate(length(max = 2000, message = "La descripción supera los 2000 caracteres."))]
    pub description: Option<String>,

    #[validate(length(max = 300, message = "La descripción corta supera los 300 caracteres."))]
    pub short_desc: Option<String>,

    #[validate(custom(function = "validate_non_negative"))]
    pub price: Decimal,

    pub image_url: Option<String>,
    pub persons_min: Option<i32>,
    pub persons_max: Option<i32>,

    #[serde(default)]
    pub is_configurable: bool,
    #[serde(default)]
    pub is_fixed: bool,
    #[serde(default)]
    pub display_order: i32,

    // Reglas de composición e ingredientes fijos, opcionales al crear.
    #[validate(nested)]
    pub rules: Option<Vec<RulePayload>>,
    pub fixed_ingredients: Option<Vec<i32>>,
}

pub async fn create_product(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    // El encabezado y su composición se confirman juntos: un producto
    // configurable nunca queda persistido sin sus reglas.
    let mut tx = app_state.db_pool.begin().await?;

    let product = app_state
        .catalog_repo
        .create_product(
            &mut tx,
            payload.product_type,
            &payload.name,
            &payload.slug,
            payload.description.as_deref(),
            payload.short_desc.as_deref(),
            payload.price,
            payload.image_url.as_deref(),
            payload.persons_min,
            payload.persons_max,
            payload.is_configurable,
            payload.is_fixed,
            payload.display_order,
        )
        .await?;

    if let Some(rules) = &payload.rules {
        let pairs: Vec<(i32, i32)> = rules.iter().map(|r| (r.category_id, r.quantity)).collect();
        app_state
            .catalog_repo
            .replace_tabla_rules(&mut tx, product.id, &pairs)
            .await?;
    }
    if let Some(ids) = &payload.fixed_ingredients {
        app_state
            .catalog_repo
            .replace_fixed_ingredients(&mut tx, product.id, ids)
            .await?;
    }

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(product)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductPayload {
    #[validate(length(min = 1, max = 200, message = "El nombre no puede quedar vacío."))]
    pub name: Option<String>,

    pub slug: Option<String>,

    #[validate(length(max = 2000, message = "La descripción supera los 2000 caracteres."))]
    pub description: Option<String>,

    #[validate(length(max = 300, message = "La descripción corta supera los 300 caracteres."))]
    pub short_desc: Option<String>,

    pub price: Option<Decimal>,
    pub image_url: Option<String>,
    pub persons_min: Option<i32>,
    pub persons_max: Option<i32>,
    pub is_configurable: Option<bool>,
    pub is_fixed: Option<bool>,
    pub is_active: Option<bool>,
    pub display_order: Option<i32>,

    #[validate(nested)]
    pub rules: Option<Vec<RulePayload>>,
    pub fixed_ingredients: Option<Vec<i32>>,
}

pub async fn update_product(
    State(app_state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if let Some(slug) = &payload.slug {
        validate_slug(slug).map_err(|e| {
            let mut errors = validator::ValidationErrors::new();
            errors.add("slug", e);
            AppError::ValidationError(errors)
        })?;
    }
    if let Some(price) = &payload.price {
        validate_non_negative(price).map_err(|e| {
            let mut errors = validator::ValidationErrors::new();
            errors.add("price", e);
            AppError::ValidationError(errors)
        })?;
    }

    let mut tx = app_state.db_pool.begin().await?;

    let product = app_state
        .catalog_repo
        .update_product(
            &mut tx,
            id,
            payload.name.as_deref(),
            payload.slug.as_deref(),
            payload.description.as_deref(),
            payload.short_desc.as_deref(),
            payload.price,
            payload.image_url.as_deref(),
            payload.persons_min,
            payload.persons_max,
            payload.is_configurable,
            payload.is_fixed,
            payload.is_active,
            payload.display_order,
        )
        .await?;

    if let Some(rules) = &payload.rules {
        let pairs: Vec<(i32, i32)> = rules.iter().map(|r| (r.category_id, r.quantity)).collect();
        app_state
            .catalog_repo
            .replace_tabla_rules(&mut tx, product.id, &pairs)
            .await?;
    }
    if let Some(ids) = &payload.fixed_ingredients {
        app_state
            .catalog_repo
            .replace_fixed_ingredients(&mut tx, product.id, ids)
            .await?;
    }

    tx.commit().await?;

    Ok(Json(product))
}

/// DELETE de producto = baja lógica. Los pedidos históricos conservan
/// sus referencias.
pub async fn delete_product(
    State(app_state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    app_state.catalog_repo.deactivate_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Payloads y handlers de administración: categorías
// ---

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryPayload {
    #[validate(length(min = 1, max = 100, message = "El nombre es obligatorio."))]
    pub name: String,
    #[serde(default)]
    pub display_order: i32,
}

pub async fn create_category(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateCategoryPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let slug = slugify(&payload.name);
    let category = app_state
        .catalog_repo
        .create_category(&payload.name, &slug, payload.display_order)
        .await?;

    Ok((StatusCode::CREATED, Json(category)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryPayload {
    #[validate(length(min = 1, max = 100, message = "El nombre no puede quedar vacío."))]
    pub name: Option<String>,
    pub display_order: Option<i32>,
}

pub async fn update_category(
    State(app_state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCategoryPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let category = app_state
        .catalog_repo
        .update_category(id, payload.name.as_deref(), payload.display_order)
        .await?;

    Ok(Json(category))
}

pub async fn delete_category(
    State(app_state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    app_state.catalog_repo.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Payloads y handlers de administración: ingredientes
// ---

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateIngredientPayload {
    #[validate(range(min = 1, message = "categoryId inválido."))]
    pub category_id: i32,

    #[validate(length(min = 1, max = 200, message = "El nombre es obligatorio."))]
    pub name: String,

    #[validate(custom(function = "validate_non_negative"))]
    #[serde(default)]
    pub cost: Decimal,

    pub cost_unit: Option<CostUnit>,
    pub image_url: Option<String>,

    #[validate(length(max = 500, message = "La descripción supera los 500 caracteres."))]
    pub description: Option<String>,

    pub available: Option<bool>,
}

pub async fn create_ingredient(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateIngredientPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let ingredient = app_state
        .catalog_repo
        .create_ingredient(
            payload.category_id,
            &payload.name,
            payload.cost,
            payload.cost_unit.unwrap_or(CostUnit::U),
            payload.image_url.as_deref(),
            payload.description.as_deref(),
            payload.available.unwrap_or(true),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ingredient)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIngredientPayload {
    pub category_id: Option<i32>,

    #[validate(length(min = 1, max = 200, message = "El nombre no puede quedar vacío."))]
    pub name: Option<String>,

    pub cost: Option<Decimal>,
    pub cost_unit: Option<CostUnit>,
    pub image_url: Option<String>,

    #[validate(length(max = 500, message = "La descripción supera los 500 caracteres."))]
    pub description: Option<String>,

    pub available: Option<bool>,
}

pub async fn update_ingredient(
    State(app_state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateIngredientPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if let Some(cost) = &payload.cost {
        validate_non_negative(cost).map_err(|e| {
            let mut errors = validator::ValidationErrors::new();
            errors.add("cost", e);
            AppError::ValidationError(errors)
        })?;
    }

    let ingredient = app_state
        .catalog_repo
        .update_ingredient(
            id,
            payload.category_id,
            payload.name.as_deref(),
            payload.cost,
            payload.cost_unit,
            payload.image_url.as_deref(),
            payload.description.as_deref(),
            payload.available,
        )
        .await?;

    Ok(Json(ingredient))
}

/// DELETE de ingrediente = apagar `available`; la fila queda para los
/// pedidos históricos.
pub async fn delete_ingredient(
    State(app_state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    app_state.catalog_repo.deactivate_ingredient(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_normalizes_accents_and_spaces() {
        assert_eq!(slugify("Quesos Añejos"), "quesos-anejos");
        assert_eq!(slugify("  Carnes   Frías  "), "carnes-frias");
        assert_eq!(slugify("Miel & Mermeladas"), "miel-mermeladas");
    }

    #[test]
    fn slug_validation_rejects_uppercase_and_spaces() {
        assert!(validate_slug("tabla-clasica").is_ok());
        assert!(validate_slug("Tabla Clasica").is_err());
        assert!(validate_slug("").is_err());
    }
}
