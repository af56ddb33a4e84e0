// src/services/cart_service.rs

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{common::error::AppError, db::CatalogRepository, models::catalog::Product};

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    #[validate(range(min = 1, message = "productId inválido."))]
    pub product_id: i32,

    pub unit_price: Decimal,

    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, message = "La cantidad debe ser al menos 1."))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CartValidateRequest {
    #[validate(
        length(min = 1, max = 50, message = "El carrito debe tener entre 1 y 50 ítems."),
        nested
    )]
    pub items: Vec<CartItemRequest>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedCartItem {
    pub product_id: i32,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub current_price: Decimal,
    pub price_changed: bool,
    pub product_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub items: Vec<ValidatedCartItem>,
}

#[derive(Clone)]
pub struct CartService {
    catalog_repo: CatalogRepository,
}

impl CartService {
    pub fn new(catalog_repo: CatalogRepository) -> Self {
        Self { catalog_repo }
    }

    /// Revalida el carrito del cliente contra el catálogo vigente.
    /// Chequeo previo sin efectos: nunca muta estado.
    pub async fn validate_cart(
        &self,
        items: &[CartItemRequest],
    ) -> Result<CartValidationResult, AppError> {
        let ids: Vec<i32> = items.iter().map(|i| i.product_id).collect();

        // Un solo viaje a la base para todos los productos.
        let products = self.catalog_repo.get_products_by_ids(&ids).await?;

        Ok(annotate_items(items, &products))
    }
}

// Tolerancia de comparación de precios: protege contra redondeos del
// cliente, no contra precios desactualizados.
fn price_epsilon() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

/// Parte pura de la validación: cruza los ítems enviados con los
/// productos encontrados y anota cada divergencia.
fn annotate_items(items: &[CartItemRequest], products: &[Product]) -> CartValidationResult {
    let by_id: HashMap<i32, &Product> = products.iter().map(|p| (p.id, p)).collect();

    let mut errors = Vec::new();
    let mut validated = Vec::new();

    for item in items {
        let Some(product) = by_id.get(&item.product_id) else {
            errors.push(format!("El producto {} no existe", item.product_id));
            continue;
        };

        if !product.is_active {
            errors.push(format!("{} ya no está disponible", product.name));
            continue;
        }

        let price_changed = (product.price - item.unit_price).abs() > price_epsilon();

        validated.push(ValidatedCartItem {
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            current_price: product.price,
            price_changed,
            product_name: product.name.clone(),
        });
    }

    let valid = errors.is_empty() && validated.iter().all(|i| !i.price_changed);

    CartValidationResult {
        valid,
        errors,
        items: validated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::ProductType;
    use chrono::Utc;

    fn product(id: i32, name: &str, price: Decimal, is_active: bool) -> Product {
        Product {
            id,
            product_type: ProductType::Tabla,
            name: name.to_string(),
            slug: name.to_lowercase().replace(' ', "-"),
            description: None,
            short_desc: None,
            price,
            image_url: None,
            persons_min: None,
            persons_max: None,
            is_configurable: true,
            is_fixed: false,
            is_active,
            display_order: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item(product_id: i32, unit_price: Decimal) -> CartItemRequest {
        CartItemRequest {
            product_id,
            unit_price,
            quantity: 1,
        }
    }

    #[test]
    fn missing_product_produces_error_naming_the_id() {
        let result = annotate_items(&[item(99, Decimal::new(1000, 2))], &[]);
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("99")));
        assert!(result.items.is_empty());
    }

    #[test]
    fn inactive_product_is_excluded_with_error() {
        let products = vec![product(1, "Tabla Clásica", Decimal::new(2500000, 2), false)];
        let result = annotate_items(&[item(1, Decimal::new(2500000, 2))], &products);
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("Tabla Clásica")));
    }

    #[test]
    fn stale_price_flags_price_changed_and_invalidates() {
        // Guardado: 25000.00, enviado: 24000.00 → diverge más de 0.01.
        let products = vec![product(1, "Tabla Clásica", Decimal::new(2500000, 2), true)];
        let result = annotate_items(&[item(1, Decimal::new(2400000, 2))], &products);
        assert!(!result.valid);
        assert!(result.errors.is_empty());
        assert!(result.items[0].price_changed);
    }

    #[test]
    fn price_within_epsilon_is_accepted() {
        let products = vec![product(1, "Tabla Clásica", Decimal::new(2500000, 2), true)];
        let result = annotate_items(&[item(1, Decimal::new(2500001, 2))], &products);
        assert!(result.valid);
        assert!(!result.items[0].price_changed);
    }

    #[test]
    fn cart_item_serializes_in_camel_case() {
        let value = serde_json::to_value(item(1, Decimal::new(2500000, 2))).unwrap();
        assert_eq!(value["productId"], 1);
        assert_eq!(value["unitPrice"], 25000.0);
    }

    #[test]
    fn cart_over_fifty_items_fails_validation() {
        let items: Vec<CartItemRequest> =
            (1..=51).map(|i| item(i, Decimal::new(1000, 2))).collect();
        let req = CartValidateRequest { items };
        assert!(req.validate().is_err());
    }
}
