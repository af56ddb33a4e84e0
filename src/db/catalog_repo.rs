// src/db/catalog_repo.rs

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::{
    common::error::AppError,
    models::catalog::{
        Category, CostUnit, Ingredient, Product, ProductDetail, ProductImage, ProductType,
        ProductVariant, ServiceConfig, TablaFixedIngredient, TablaRule,
    },
};

#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Lecturas públicas (vitrina)
    // ---

    pub async fn list_active_products(
        &self,
        product_type: Option<ProductType>,
    ) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE is_active = TRUE
              AND ($1::text IS NULL OR type = $1)
            ORDER BY display_order ASC, name ASC
            "#,
        )
        .bind(product_type)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    pub async fn get_product(&self, id: i32) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Producto con imágenes, variantes, reglas de composición,
    /// ingredientes fijos y configuración de servicio.
    pub async fn get_product_detail(&self, id: i32) -> Result<Option<ProductDetail>, AppError> {
        let Some(product) = self.get_product(id).await? else {
            return Ok(None);
        };

        let images = sqlx::query_as::<_, ProductImage>(
            "SELECT * FROM product_images WHERE product_id = $1 ORDER BY display_order ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let variants = sqlx::query_as::<_, ProductVariant>(
            "SELECT * FROM product_variants WHERE product_id = $1 AND is_active = TRUE",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let rules = sqlx::query_as::<_, TablaRule>(
            "SELECT * FROM tabla_rules WHERE product_id = $1",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let fixed_ingredients = sqlx::query_as::<_, TablaFixedIngredient>(
            "SELECT * FROM tabla_fixed_ingredients WHERE product_id = $1",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let service_config = sqlx::query_as::<_, ServiceConfig>(
            "SELECT * FROM service_config WHERE product_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(Some(ProductDetail {
            product,
            images,
            variants,
            rules,
            fixed_ingredients,
            service_config,
        }))
    }

    /// Búsqueda en lote: un solo viaje a la base para todos los ids.
    /// El validador de carrito y el pipeline de pedidos dependen de esto
    /// para no caer en una consulta por ítem.
    pub async fn get_products_by_ids(&self, ids: &[i32]) -> Result<Vec<Product>, AppError> {
        let products =
            sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await?;
        Ok(products)
    }

    pub async fn get_variants_by_ids(&self, ids: &[i32]) -> Result<Vec<ProductVariant>, AppError> {
        let variants = sqlx::query_as::<_, ProductVariant>(
            "SELECT * FROM product_variants WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(variants)
    }

    pub async fn get_ingredients_by_ids(&self, ids: &[i32]) -> Result<Vec<Ingredient>, AppError> {
        let ingredients =
            sqlx::query_as::<_, Ingredient>("SELECT * FROM ingredients WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await?;
        Ok(ingredients)
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories ORDER BY display_order ASC, name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    pub async fn list_available_ingredients(
        &self,
        category_id: Option<i32>,
    ) -> Result<Vec<Ingredient>, AppError> {
        let ingredients = sqlx::query_as::<_, Ingredient>(
            r#"
            SELECT * FROM ingredients
            WHERE available = TRUE
              AND ($1::int IS NULL OR category_id = $1)
            ORDER BY name ASC
            "#,
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ingredients)
    }

    // ---
    // Escrituras de administración
    // ---

    // Las escrituras de producto toman la conexión de la transacción del
    // handler: el encabezado y su composición se confirman juntos.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_product(
        &self,
        conn: &mut PgConnection,
        product_type: ProductType,
        name: &str,
        slug: &str,
        description: Option<&str>,
        short_desc: Option<&str>,
        price: Decimal,
        image_url: Option<&str>,
        persons_min: Option<i32>,
        persons_max: Option<i32>,
        is_configurable: bool,
        is_fixed: bool,
        display_order: i32,
    ) -> Result<Product, AppError> {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (
                type, name, slug, description, short_desc, price, image_url,
                persons_min, persons_max, is_configurable, is_fixed, display_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(product_type)
        .bind(name)
        .bind(slug)
        .bind(description)
        .bind(short_desc)
        .bind(price)
        .bind(image_url)
        .bind(persons_min)
        .bind(persons_max)
        .bind(is_configurable)
        .bind(is_fixed)
        .bind(display_order)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::SlugAlreadyExists(slug.to_string());
                }
            }
            AppError::DatabaseError(e)
        })
    }

    /// Actualización parcial: los campos en None conservan su valor.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_product(
        &self,
        conn: &mut PgConnection,
        id: i32,
        name: Option<&str>,
        slug: Option<&str>,
        description: Option<&str>,
        short_desc: Option<&str>,
        price: Option<Decimal>,
        image_url: Option<&str>,
        persons_min: Option<i32>,
        persons_max: Option<i32>,
        is_configurable: Option<bool>,
        is_fixed: Option<bool>,
        is_active: Option<bool>,
        display_order: Option<i32>,
    ) -> Result<Product, AppError> {
        let updated = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                name            = COALESCE($2, name),
                slug            = COALESCE($3, slug),
                description     = COALESCE($4, description),
                short_desc      = COALESCE($5, short_desc),
                price           = COALESCE($6, price),
                image_url       = COALESCE($7, image_url),
                persons_min     = COALESCE($8, persons_min),
                persons_max     = COALESCE($9, persons_max),
                is_configurable = COALESCE($10, is_configurable),
                is_fixed        = COALESCE($11, is_fixed),
                is_active       = COALESCE($12, is_active),
                display_order   = COALESCE($13, display_order),
                updated_at      = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(slug)
        .bind(description)
        .bind(short_desc)
        .bind(price)
        .bind(image_url)
        .bind(persons_min)
        .bind(persons_max)
        .bind(is_configurable)
        .bind(is_fixed)
        .bind(is_active)
        .bind(display_order)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::SlugAlreadyExists(slug.unwrap_or_default().to_string());
                }
            }
            AppError::DatabaseError(e)
        })?;

        updated.ok_or(AppError::ProductNotFound)
    }

    /// Baja lógica: el producto deja de listarse pero los pedidos
    /// históricos siguen apuntando a su fila.
    pub async fn deactivate_product(&self, id: i32) -> Result<(), AppError> {
        let result =
            sqlx::query("UPDATE products SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::ProductNotFound);
        }
        Ok(())
    }

    /// Reemplaza las reglas de composición de un producto configurable.
    /// Pensado para correr dentro de la transacción del servicio.
    pub async fn replace_tabla_rules(
        &self,
        conn: &mut PgConnection,
        product_id: i32,
        rules: &[(i32, i32)], // (category_id, quantity)
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM tabla_rules WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *conn)
            .await?;

        for (category_id, quantity) in rules {
            sqlx::query(
                "INSERT INTO tabla_rules (product_id, category_id, quantity) VALUES ($1, $2, $3)",
            )
            .bind(product_id)
            .bind(category_id)
            .bind(quantity)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_foreign_key_violation() {
                        return AppError::InvalidInput(format!(
                            "La categoría {category_id} no existe"
                        ));
                    }
                }
                AppError::DatabaseError(e)
            })?;
        }
        Ok(())
    }

    /// Reemplaza los ingredientes fijos de un producto no configurable.
    pub async fn replace_fixed_ingredients(
        &self,
        conn: &mut PgConnection,
        product_id: i32,
        ingredient_ids: &[i32],
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM tabla_fixed_ingredients WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *conn)
            .await?;

        for ingredient_id in ingredient_ids {
            sqlx::query(
                "INSERT INTO tabla_fixed_ingredients (product_id, ingredient_id) VALUES ($1, $2)",
            )
            .bind(product_id)
            .bind(ingredient_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_foreign_key_violation() {
                        return AppError::InvalidInput(format!(
                            "El ingrediente {ingredient_id} no existe"
                        ));
                    }
                }
                AppError::DatabaseError(e)
            })?;
        }
        Ok(())
    }

    pub async fn create_category(
        &self,
        name: &str,
        slug: &str,
        display_order: i32,
    ) -> Result<Category, AppError> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, slug, display_order) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(name)
        .bind(slug)
        .bind(display_order)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::SlugAlreadyExists(slug.to_string());
                }
            }
            AppError::DatabaseError(e)
        })
    }

    pub async fn update_category(
        &self,
        id: i32,
        name: Option<&str>,
        display_order: Option<i32>,
    ) -> Result<Category, AppError> {
        let updated = sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories SET
                name          = COALESCE($2, name),
                display_order = COALESCE($3, display_order)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(display_order)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or(AppError::CategoryNotFound)
    }

    /// Borrado real, pero la base lo rechaza si hay ingredientes o
    /// reglas apuntando a la categoría.
    pub async fn delete_category(&self, id: i32) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_foreign_key_violation() {
                        return AppError::CategoryInUse;
                    }
                }
                AppError::DatabaseError(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::CategoryNotFound);
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_ingredient(
        &self,
        category_id: i32,
        name: &str,
        cost: Decimal,
        cost_unit: CostUnit,
        image_url: Option<&str>,
        description: Option<&str>,
        available: bool,
    ) -> Result<Ingredient, AppError> {
        let ingredient = sqlx::query_as::<_, Ingredient>(
            r#"
            INSERT INTO ingredients (category_id, name, cost, cost_unit, image_url, description, available)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(category_id)
        .bind(name)
        .bind(cost)
        .bind(cost_unit)
        .bind(image_url)
        .bind(description)
        .bind(available)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_foreign_key_violation() {
                    return AppError::CategoryNotFound;
                }
            }
            AppError::DatabaseError(e)
        })?;
        Ok(ingredient)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update_ingredient(
        &self,
        id: i32,
        category_id: Option<i32>,
        name: Option<&str>,
        cost: Option<Decimal>,
        cost_unit: Option<CostUnit>,
        image_url: Option<&str>,
        description: Option<&str>,
        available: Option<bool>,
    ) -> Result<Ingredient, AppError> {
        let updated = sqlx::query_as::<_, Ingredient>(
            r#"
            UPDATE ingredients SET
                category_id = COALESCE($2, category_id),
                name        = COALESCE($3, name),
                cost        = COALESCE($4, cost),
                cost_unit   = COALESCE($5, cost_unit),
                image_url   = COALESCE($6, image_url),
                description = COALESCE($7, description),
                available   = COALESCE($8, available),
                updated_at  = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(category_id)
        .bind(name)
        .bind(cost)
        .bind(cost_unit)
        .bind(image_url)
        .bind(description)
        .bind(available)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or(AppError::IngredientNotFound)
    }

    /// Baja lógica del ingrediente: se apaga `available` y la fila queda
    /// para que los pedidos históricos no pierdan la referencia.
    pub async fn deactivate_ingredient(&self, id: i32) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE ingredients SET available = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::IngredientNotFound);
        }
        Ok(())
    }
}
