// src/services/order_service.rs

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::{CalendarRepository, CatalogRepository, OrderRepository},
    models::catalog::ProductVariant,
    models::order::{CreateOrderRequest, CreateOrderResponse, OrderItemRequest, TrackedOrder},
    services::{
        notification_service::{NotificationService, OrderEmailData, OrderEmailItem},
        order_number::generate_order_number,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub delivery_cost: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

/// Totales a partir de los precios ENVIADOS. El validador de carrito ya
/// los contrastó con el catálogo; esta capa no repite esa verificación.
pub fn compute_totals(items: &[OrderItemRequest]) -> OrderTotals {
    let subtotal: Decimal = items
        .iter()
        .map(|item| item.unit_price * Decimal::from(item.quantity))
        .sum::<Decimal>()
        .round_dp(2);

    // Costo de envío: cero para ambos métodos. El cálculo por zona sigue
    // pendiente; mientras tanto no se inventa una tarifa.
    let delivery_cost = Decimal::ZERO;

    // Sin motor de cupones: el descuento al crear siempre es cero.
    let discount = Decimal::ZERO;

    let total = (subtotal + delivery_cost - discount).round_dp(2);

    OrderTotals {
        subtotal,
        delivery_cost,
        discount,
        total,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItemRow {
    pub product_id: i32,
    pub variant_id: Option<i32>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub notes: Option<String>,
    // (ingredient_id, category_id)
    pub ingredients: Vec<(i32, i32)>,
}

/// Filas a persistir: una por ítem y una por ingrediente seleccionado.
/// Los precios quedan congelados a dos decimales acá; son valores
/// históricos y nunca se recalculan del catálogo.
pub fn build_item_rows(items: &[OrderItemRequest]) -> Vec<OrderItemRow> {
    items
        .iter()
        .map(|item| {
            let unit_price = item.unit_price.round_dp(2);
            OrderItemRow {
                product_id: item.product_id,
                variant_id: item.variant_id,
                quantity: item.quantity,
                unit_price,
                total_price: (unit_price * Decimal::from(item.quantity)).round_dp(2),
                notes: item.notes.clone(),
                ingredients: item
                    .selected_ingredients
                    .iter()
                    .flatten()
                    .map(|s| (s.ingredient_id, s.category_id))
                    .collect(),
            }
        })
        .collect()
}

/// Cada variante referida tiene que existir y pertenecer al producto de
/// su ítem; cualquier divergencia se rechaza antes de abrir la transacción.
fn check_variants(items: &[OrderItemRequest], variants: &[ProductVariant]) -> Result<(), AppError> {
    let by_id: HashMap<i32, i32> = variants.iter().map(|v| (v.id, v.product_id)).collect();

    for item in items {
        let Some(variant_id) = item.variant_id else {
            continue;
        };
        match by_id.get(&variant_id) {
            None => {
                return Err(AppError::InvalidInput(format!(
                    "La variante {variant_id} no existe"
                )));
            }
            Some(product_id) if *product_id != item.product_id => {
                return Err(AppError::InvalidInput(format!(
                    "La variante {variant_id} no corresponde al producto {}",
                    item.product_id
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

fn first_name(full_name: &str) -> String {
    full_name.split_whitespace().next().unwrap_or("").to_string()
}

#[derive(Clone)]
pub struct OrderService {
    pool: PgPool,
    order_repo: OrderRepository,
    catalog_repo: CatalogRepository,
    calendar_repo: CalendarRepository,
    notifier: NotificationService,
}

impl OrderService {
    pub fn new(
        pool: PgPool,
        order_repo: OrderRepository,
        catalog_repo: CatalogRepository,
        calendar_repo: CalendarRepository,
        notifier: NotificationService,
    ) -> Self {
        Self {
            pool,
            order_repo,
            catalog_repo,
            calendar_repo,
            notifier,
        }
    }

    /// Crea el pedido completo (encabezado + ítems + ingredientes
    /// seleccionados) en una sola transacción. Si algo falla adentro, no
    /// queda nada persistido.
    pub async fn create_order(
        &self,
        req: CreateOrderRequest,
    ) -> Result<CreateOrderResponse, AppError> {
        // --- Chequeo referencial previo ---
        // Más barato y con mejor mensaje que dejar reventar la FK adentro
        // de la transacción. Búsquedas en lote, un viaje por tabla.
        let product_ids: Vec<i32> = req
            .items
            .iter()
            .map(|i| i.product_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let products = self.catalog_repo.get_products_by_ids(&product_ids).await?;
        let product_names: HashMap<i32, String> =
            products.iter().map(|p| (p.id, p.name.clone())).collect();

        for item in &req.items {
            if !product_names.contains_key(&item.product_id) {
                return Err(AppError::InvalidInput(format!(
                    "El producto {} no existe",
                    item.product_id
                )));
            }
        }

        let ingredient_ids: Vec<i32> = req
            .items
            .iter()
            .flat_map(|i| i.selected_ingredients.iter().flatten())
            .map(|s| s.ingredient_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        if !ingredient_ids.is_empty() {
            let ingredients = self
                .catalog_repo
                .get_ingredients_by_ids(&ingredient_ids)
                .await?;
            let found: HashSet<i32> = ingredients.iter().map(|i| i.id).collect();
            for id in &ingredient_ids {
                if !found.contains(id) {
                    return Err(AppError::InvalidInput(format!(
                        "El ingrediente {id} no existe"
                    )));
                }
            }
        }

        let variant_ids: Vec<i32> = req
            .items
            .iter()
            .filter_map(|i| i.variant_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        if !variant_ids.is_empty() {
            let variants = self.catalog_repo.get_variants_by_ids(&variant_ids).await?;
            check_variants(&req.items, &variants)?;
        }

        if let Some(slot_id) = req.delivery_slot {
            self.calendar_repo
                .get_slot(slot_id)
                .await?
                .ok_or_else(|| {
                    AppError::InvalidInput(format!("La franja horaria {slot_id} no existe"))
                })?;
        }

        let totals = compute_totals(&req.items);
        let rows = build_item_rows(&req.items);
        let order_number = generate_order_number();

        // --- La transacción ---
        let mut tx = self.pool.begin().await?;

        let order = self
            .order_repo
            .insert_order(
                &mut tx,
                &order_number,
                &req.name,
                &req.email,
                &req.phone,
                req.delivery_method,
                req.delivery_date,
                req.delivery_slot,
                req.address.as_deref(),
                totals.delivery_cost,
                totals.subtotal,
                totals.total,
                req.payment_method,
                req.notes.as_deref(),
            )
            .await?;

        for row in &rows {
            let inserted = self
                .order_repo
                .insert_order_item(
                    &mut tx,
                    order.id,
                    row.product_id,
                    row.variant_id,
                    row.quantity,
                    row.unit_price,
                    row.total_price,
                    row.notes.as_deref(),
                )
                .await?;

            for (ingredient_id, category_id) in &row.ingredients {
                self.order_repo
                    .insert_order_item_ingredient(&mut tx, inserted.id, *ingredient_id, *category_id)
                    .await?;
            }
        }

        tx.commit().await?;

        // --- Notificación post-commit ---
        // Mejor esfuerzo: se despacha a una tarea aparte y la respuesta
        // al cliente no depende del resultado.
        let email_items = req
            .items
            .iter()
            .map(|item| OrderEmailItem {
                name: product_names
                    .get(&item.product_id)
                    .cloned()
                    .unwrap_or_else(|| "Producto".to_string()),
                quantity: item.quantity,
                unit_price: item.unit_price.round_dp(2),
                total_price: (item.unit_price * Decimal::from(item.quantity)).round_dp(2),
                notes: item.notes.clone(),
            })
            .collect();

        self.notifier.dispatch(OrderEmailData {
            order_number: order.order_number.clone(),
            customer_name: req.name.clone(),
            customer_email: req.email.clone(),
            items: email_items,
            subtotal: totals.subtotal,
            delivery_cost: totals.delivery_cost,
            total: totals.total,
            delivery_method: req.delivery_method,
            delivery_date: req.delivery_date,
            delivery_address: req.address.clone(),
            payment_method: req.payment_method,
            notes: req.notes.clone(),
        });

        Ok(CreateOrderResponse {
            order_number: order.order_number,
            order_id: order.id,
        })
    }

    /// Vista pública de seguimiento por número de pedido. Expone el primer
    /// nombre y los datos de entrega; nunca el id interno ni el contacto.
    pub async fn track_order(&self, order_number: &str) -> Result<TrackedOrder, AppError> {
        let order = self
            .order_repo
            .find_by_order_number(order_number)
            .await?
            .ok_or(AppError::OrderNotFound)?;

        let items = self.order_repo.get_items_with_product(order.id).await?;

        let delivery_slot = match order.delivery_slot_id {
            Some(slot_id) => self.calendar_repo.get_slot(slot_id).await?.map(|s| s.label),
            None => None,
        };

        Ok(TrackedOrder {
            order_number: order.order_number,
            status: order.status,
            guest_name: first_name(order.guest_name.as_deref().unwrap_or("")),
            delivery_method: order.delivery_method,
            delivery_date: order.delivery_date,
            delivery_slot,
            subtotal: order.subtotal,
            delivery_cost: order.delivery_cost,
            total: order.total,
            payment_method: order.payment_method,
            payment_status: order.payment_status,
            created_at: order.created_at,
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product_id: i32, unit_price: Decimal, quantity: i32) -> OrderItemRequest {
        OrderItemRequest {
            product_id,
            variant_id: None,
            quantity,
            unit_price,
            selected_ingredients: None,
            notes: None,
        }
    }

    #[test]
    fn subtotal_is_sum_of_unit_price_times_quantity() {
        let items = vec![
            item(1, Decimal::new(2500000, 2), 2), // 25000.00 x2
            item(2, Decimal::new(1850050, 2), 1), // 18500.50 x1
        ];
        let totals = compute_totals(&items);
        assert_eq!(totals.subtotal, Decimal::new(6850050, 2)); // 68500.50
        assert_eq!(totals.delivery_cost, Decimal::ZERO);
        assert_eq!(totals.discount, Decimal::ZERO);
        assert_eq!(totals.total, totals.subtotal);
    }

    #[test]
    fn totals_round_to_two_decimals() {
        // 3 x 10.333 = 30.999 → 31.00
        let items = vec![item(1, Decimal::new(10333, 3), 3)];
        let totals = compute_totals(&items);
        assert_eq!(totals.subtotal, Decimal::new(3100, 2));
        assert_eq!(totals.total, Decimal::new(3100, 2));
    }

    #[test]
    fn item_rows_freeze_prices_and_count_ingredient_rows() {
        use crate::models::order::SelectedIngredientRequest;

        let mut with_ingredients = item(1, Decimal::new(10333, 3), 3); // 10.333
        with_ingredients.selected_ingredients = Some(vec![
            SelectedIngredientRequest {
                ingredient_id: 4,
                category_id: 1,
            },
            SelectedIngredientRequest {
                ingredient_id: 5,
                category_id: 1,
            },
            SelectedIngredientRequest {
                ingredient_id: 9,
                category_id: 2,
            },
        ]);

        let rows = build_item_rows(&[with_ingredients, item(2, Decimal::new(1500, 2), 1)]);

        // Una fila por ítem, una por ingrediente seleccionado.
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].ingredients, vec![(4, 1), (5, 1), (9, 2)]);
        assert!(rows[1].ingredients.is_empty());

        // El unitario se congela a 10.33 y el total sale del congelado.
        assert_eq!(rows[0].unit_price, Decimal::new(1033, 2));
        assert_eq!(rows[0].total_price, Decimal::new(3099, 2));
    }

    fn variant(id: i32, product_id: i32) -> ProductVariant {
        ProductVariant {
            id,
            product_id,
            name: "Grande".to_string(),
            price: Decimal::new(3000000, 2),
            description: None,
            is_active: true,
        }
    }

    #[test]
    fn unknown_variant_is_rejected() {
        let mut req_item = item(1, Decimal::new(1000, 2), 1);
        req_item.variant_id = Some(9);

        let err = check_variants(&[req_item], &[]).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn variant_of_another_product_is_rejected() {
        let mut req_item = item(1, Decimal::new(1000, 2), 1);
        req_item.variant_id = Some(9);

        assert!(check_variants(&[req_item.clone()], &[variant(9, 2)]).is_err());
        assert!(check_variants(&[req_item], &[variant(9, 1)]).is_ok());
    }

    #[test]
    fn first_name_masks_the_rest() {
        assert_eq!(first_name("Ana María Solano"), "Ana");
        assert_eq!(first_name(""), "");
    }
}
