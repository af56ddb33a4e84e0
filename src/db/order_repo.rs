// src/db/order_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::{
    common::error::AppError,
    models::order::{
        DeliveryMethod, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus,
        TrackedOrderItem,
    },
};

#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Escrituras transaccionales
    // ---
    // Todas toman la conexión de la transacción abierta por el servicio:
    // el encabezado, los ítems y los ingredientes se confirman juntos o
    // no se confirma nada.

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_order(
        &self,
        conn: &mut PgConnection,
        order_number: &str,
        guest_name: &str,
        guest_email: &str,
        guest_phone: &str,
        delivery_method: DeliveryMethod,
        delivery_date: NaiveDate,
        delivery_slot_id: Option<i32>,
        delivery_address: Option<&str>,
        delivery_cost: Decimal,
        subtotal: Decimal,
        total: Decimal,
        payment_method: Option<PaymentMethod>,
        notes: Option<&str>,
    ) -> Result<Order, AppError> {
        sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (
                order_number, guest_name, guest_email, guest_phone,
                status, delivery_method, delivery_date, delivery_slot_id,
                delivery_address, delivery_cost, subtotal, total,
                payment_method, payment_status, notes
            )
            VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7, $8, $9, $10, $11, $12, 'pending', $13)
            RETURNING *
            "#,
        )
        .bind(order_number)
        .bind(guest_name)
        .bind(guest_email)
        .bind(guest_phone)
        .bind(delivery_method)
        .bind(delivery_date)
        .bind(delivery_slot_id)
        .bind(delivery_address)
        .bind(delivery_cost)
        .bind(subtotal)
        .bind(total)
        .bind(payment_method)
        .bind(notes)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                // El UNIQUE de order_number es la garantía de unicidad
                // autoritativa; una colisión llega hasta acá.
                if db_err.is_unique_violation() {
                    return AppError::OrderNumberConflict;
                }
            }
            AppError::DatabaseError(e)
        })
    }

    pub async fn insert_order_item(
        &self,
        conn: &mut PgConnection,
        order_id: i32,
        product_id: i32,
        variant_id: Option<i32>,
        quantity: i32,
        unit_price: Decimal,
        total_price: Decimal,
        notes: Option<&str>,
    ) -> Result<OrderItem, AppError> {
        let item = sqlx::query_as::<_, OrderItem>(
            r#"
            INSERT INTO order_items (order_id, product_id, variant_id, quantity, unit_price, total_price, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(product_id)
        .bind(variant_id)
        .bind(quantity)
        .bind(unit_price)
        .bind(total_price)
        .bind(notes)
        .fetch_one(&mut *conn)
        .await?;
        Ok(item)
    }

    pub async fn insert_order_item_ingredient(
        &self,
        conn: &mut PgConnection,
        order_item_id: i32,
        ingredient_id: i32,
        category_id: i32,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO order_item_ingredients (order_item_id, ingredient_id, category_id)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(order_item_id)
        .bind(ingredient_id)
        .bind(category_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    // ---
    // Lecturas
    // ---

    pub async fn find_by_order_number(
        &self,
        order_number: &str,
    ) -> Result<Option<Order>, AppError> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE order_number = $1")
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    /// Ítems con nombre e imagen del producto, para el seguimiento público
    /// y el listado de administración.
    pub async fn get_items_with_product(
        &self,
        order_id: i32,
    ) -> Result<Vec<TrackedOrderItem>, AppError> {
        let items = sqlx::query_as::<_, TrackedOrderItem>(
            r#"
            SELECT
                oi.id, oi.quantity, oi.unit_price, oi.total_price, oi.notes,
                p.name AS product_name, p.image_url AS product_image
            FROM order_items oi
            INNER JOIN products p ON p.id = oi.product_id
            WHERE oi.order_id = $1
            ORDER BY oi.id ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Los 100 pedidos más recientes, para el back office.
    pub async fn list_recent(&self) -> Result<Vec<Order>, AppError> {
        let orders =
            sqlx::query_as::<_, Order>("SELECT * FROM orders ORDER BY created_at DESC LIMIT 100")
                .fetch_all(&self.pool)
                .await?;
        Ok(orders)
    }

    /// Única mutación permitida sobre un pedido existente: transiciones
    /// de estado y de estado de pago. Los ítems jamás se tocan.
    pub async fn update_status(
        &self,
        id: i32,
        status: Option<OrderStatus>,
        payment_status: Option<PaymentStatus>,
    ) -> Result<Order, AppError> {
        let updated = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders SET
                status         = COALESCE($2, status),
                payment_status = COALESCE($3, payment_status),
                updated_at     = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(payment_status)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or(AppError::OrderNotFound)
    }
}
