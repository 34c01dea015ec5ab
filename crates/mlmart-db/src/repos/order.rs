//! Order repository

use async_trait::async_trait;
use uuid::Uuid;

use mlmart_types::{ItemStatus, OrderStatus};

use super::PgUnitOfWork;
use crate::{DbOrder, DbOrderItem, DbResult, NewOrder, NewOrderItem, OrderRepository};

const ORDER_COLUMNS: &str = "id, buyer_id, global_status, shipping_payment_status, \
     total_products_amount, shipping_fee, payment_method, commissions_distributed_at, \
     created_at, updated_at";

const ITEM_COLUMNS: &str =
    "id, order_id, variant_id, seller_id, quantity, unit_price, item_status, created_at";

#[async_trait]
impl OrderRepository for PgUnitOfWork {
    async fn insert_order(&mut self, order: &NewOrder) -> DbResult<DbOrder> {
        let sql = format!(
            r#"
            INSERT INTO orders (buyer_id, total_products_amount, shipping_fee, payment_method)
            VALUES ($1, $2, $3, $4)
            RETURNING {ORDER_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, DbOrder>(&sql)
            .bind(order.buyer_id)
            .bind(order.total_products_amount)
            .bind(order.shipping_fee)
            .bind(&order.payment_method)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(created)
    }

    async fn insert_order_item(&mut self, item: &NewOrderItem) -> DbResult<DbOrderItem> {
        let sql = format!(
            r#"
            INSERT INTO order_items (order_id, variant_id, seller_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ITEM_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, DbOrderItem>(&sql)
            .bind(item.order_id)
            .bind(item.variant_id)
            .bind(item.seller_id)
            .bind(item.quantity)
            .bind(item.unit_price)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(created)
    }

    async fn find_order(&mut self, id: Uuid) -> DbResult<Option<DbOrder>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let order = sqlx::query_as::<_, DbOrder>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(order)
    }

    async fn find_order_item(&mut self, id: Uuid) -> DbResult<Option<DbOrderItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE id = $1");
        let item = sqlx::query_as::<_, DbOrderItem>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(item)
    }

    async fn order_items(&mut self, order_id: Uuid) -> DbResult<Vec<DbOrderItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY created_at, id"
        );
        let items = sqlx::query_as::<_, DbOrderItem>(&sql)
            .bind(order_id)
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(items)
    }

    async fn items_by_seller_and_status(
        &mut self,
        seller_id: Uuid,
        status: ItemStatus,
    ) -> DbResult<Vec<DbOrderItem>> {
        let sql = format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM order_items
            WHERE seller_id = $1 AND item_status = $2
            ORDER BY created_at
            "#
        );
        let items = sqlx::query_as::<_, DbOrderItem>(&sql)
            .bind(seller_id)
            .bind(status.as_str())
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(items)
    }

    async fn transition_order(
        &mut self,
        order_id: Uuid,
        from: &[OrderStatus],
        to: OrderStatus,
    ) -> DbResult<Option<DbOrder>> {
        let from: Vec<String> = from.iter().map(|s| s.as_str().to_string()).collect();

        // Check-and-set in one statement; a concurrent transition blocks on the
        // row lock and then re-evaluates the WHERE clause against the new status.
        let sql = format!(
            r#"
            UPDATE orders
            SET global_status = $3,
                commissions_distributed_at = CASE WHEN $3 = 'completed' THEN NOW()
                                                  ELSE commissions_distributed_at END,
                updated_at = NOW()
            WHERE id = $1 AND global_status = ANY($2)
            RETURNING {ORDER_COLUMNS}
            "#
        );
        let order = sqlx::query_as::<_, DbOrder>(&sql)
            .bind(order_id)
            .bind(&from)
            .bind(to.as_str())
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(order)
    }

    async fn mark_shipping_paid(&mut self, order_id: Uuid) -> DbResult<()> {
        sqlx::query(
            "UPDATE orders SET shipping_payment_status = 'paid', updated_at = NOW() WHERE id = $1",
        )
        .bind(order_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn set_order_items_status(
        &mut self,
        order_id: Uuid,
        status: ItemStatus,
    ) -> DbResult<u64> {
        let result = sqlx::query("UPDATE order_items SET item_status = $2 WHERE order_id = $1")
            .bind(order_id)
            .bind(status.as_str())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn transition_item(
        &mut self,
        item_id: Uuid,
        from: ItemStatus,
        to: ItemStatus,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE order_items SET item_status = $3 WHERE id = $1 AND item_status = $2",
        )
        .bind(item_id)
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
