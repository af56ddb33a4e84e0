// src/models/order.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

// --- Estado del pedido ---
// pending -> confirmed -> preparing -> ready -> delivered | cancelled
// delivered y cancelled son terminales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Verified,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Sinpe,
    Transfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    Delivery,
    Pickup,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i32,
    pub order_number: String,
    pub customer_id: Option<String>,
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub status: OrderStatus,
    pub delivery_method: DeliveryMethod,
    pub delivery_date: NaiveDate,
    pub delivery_slot_id: Option<i32>,
    pub delivery_address: Option<String>,
    pub delivery_cost: Decimal,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub payment_method: Option<PaymentMethod>,
    pub payment_proof: Option<String>,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i32,
    pub order_id: i32,
    pub product_id: i32,
    pub variant_id: Option<i32>,
    pub quantity: i32,
    // Precio histórico, congelado al crear el pedido.
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemIngredient {
    pub id: i32,
    pub order_item_id: i32,
    pub ingredient_id: i32,
    pub category_id: i32,
}

// --- Vistas para el seguimiento público ---
// Expone solo datos no sensibles: primer nombre, sin id interno ni contacto.

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TrackedOrderItem {
    pub id: i32,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub notes: Option<String>,
    pub product_name: String,
    pub product_image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedOrder {
    pub order_number: String,
    pub status: OrderStatus,
    pub guest_name: String,
    pub delivery_method: DeliveryMethod,
    pub delivery_date: NaiveDate,
    pub delivery_slot: Option<String>,
    pub subtotal: Decimal,
    pub delivery_cost: Decimal,
    pub total: Decimal,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub items: Vec<TrackedOrderItem>,
}

// --- Payloads del pipeline de pedidos ---

fn validate_positive_price(price: &Decimal) -> Result<(), validator::ValidationError> {
    if price.is_sign_positive() && !price.is_zero() {
        return Ok(());
    }
    let mut err = validator::ValidationError::new("range");
    err.message = Some("El precio unitario debe ser mayor a cero.".into());
    Err(err)
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SelectedIngredientRequest {
    #[validate(range(min = 1, message = "ingredientId inválido."))]
    pub ingredient_id: i32,
    #[validate(range(min = 1, message = "categoryId inválido."))]
    pub category_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    #[validate(range(min = 1, message = "productId inválido."))]
    pub product_id: i32,
    pub variant_id: Option<i32>,

    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, message = "La cantidad debe ser al menos 1."))]
    pub quantity: i32,

    #[validate(custom(function = "validate_positive_price"))]
    pub unit_price: Decimal,

    #[validate(nested)]
    pub selected_ingredients: Option<Vec<SelectedIngredientRequest>>,

    #[validate(length(max = 500, message = "Las notas superan los 500 caracteres."))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 200, message = "El nombre es obligatorio."))]
    pub name: String,

    #[validate(email(message = "El correo no es válido."))]
    pub email: String,

    #[validate(length(min = 4, max = 20, message = "El teléfono no es válido."))]
    pub phone: String,

    pub delivery_method: DeliveryMethod,
    pub delivery_date: NaiveDate,
    pub delivery_slot: Option<i32>,

    #[validate(length(max = 500, message = "La dirección supera los 500 caracteres."))]
    pub address: Option<String>,

    pub payment_method: Option<PaymentMethod>,

    #[validate(length(max = 1000, message = "Las notas superan los 1000 caracteres."))]
    pub notes: Option<String>,

    #[validate(
        length(min = 1, message = "El pedido debe tener al menos un ítem."),
        nested
    )]
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order_number: String,
    pub order_id: i32,
}

// Transiciones de estado del back office. Cualquier valor fuera de las
// enumeraciones se rechaza en la deserialización.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_items_fails_validation() {
        let req = CreateOrderRequest {
            name: "Ana Solano".to_string(),
            email: "ana@example.com".to_string(),
            phone: "88881234".to_string(),
            delivery_method: DeliveryMethod::Pickup,
            delivery_date: NaiveDate::from_ymd_opt(2025, 9, 15).unwrap(),
            delivery_slot: None,
            address: None,
            payment_method: None,
            notes: None,
            items: vec![],
        };
        let result = req.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().field_errors().contains_key("items"));
    }

    #[test]
    fn zero_quantity_fails_validation() {
        let item = OrderItemRequest {
            product_id: 1,
            variant_id: None,
            quantity: 0,
            unit_price: Decimal::new(1500, 2),
            selected_ingredients: None,
            notes: None,
        };
        assert!(item.validate().is_err());
    }

    #[test]
    fn negative_unit_price_fails_validation() {
        let item = OrderItemRequest {
            product_id: 1,
            variant_id: None,
            quantity: 1,
            unit_price: Decimal::new(-100, 2),
            selected_ingredients: None,
            notes: None,
        };
        assert!(item.validate().is_err());
    }

    #[test]
    fn quantity_defaults_to_one() {
        let json = r#"{"productId": 3, "unitPrice": 12.5}"#;
        let item: OrderItemRequest = serde_json::from_str(json).unwrap();
        assert_eq!(item.quantity, 1);
        assert!(item.validate().is_ok());
    }

    #[test]
    fn item_payload_serializes_in_camel_case() {
        let item = OrderItemRequest {
            product_id: 3,
            variant_id: None,
            quantity: 2,
            unit_price: Decimal::new(1250, 2),
            selected_ingredients: Some(vec![SelectedIngredientRequest {
                ingredient_id: 7,
                category_id: 2,
            }]),
            notes: None,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["productId"], 3);
        assert_eq!(json["selectedIngredients"][0]["ingredientId"], 7);
    }

    #[test]
    fn order_status_serializes_in_lowercase() {
        let json = serde_json::to_string(&OrderStatus::Preparing).unwrap();
        assert_eq!(json, "\"preparing\"");

        let parsed: OrderStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(parsed, OrderStatus::Cancelled);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let parsed = serde_json::from_str::<OrderStatus>("\"shipped\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn delivery_method_roundtrip() {
        let parsed: DeliveryMethod = serde_json::from_str("\"pickup\"").unwrap();
        assert_eq!(parsed, DeliveryMethod::Pickup);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"pickup\"");
    }
}
