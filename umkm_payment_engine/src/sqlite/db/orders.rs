use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusLog, OrderStatusType},
    order_state::OrderTransition,
};

/// Restricts an order query to orders owned by a particular party.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    Any,
    Buyer(i64),
    Merchant(i64),
}

impl OrderScope {
    fn push_where(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            OrderScope::Any => {},
            OrderScope::Buyer(id) => {
                builder.push(" AND buyer_id = ").push_bind(*id);
            },
            OrderScope::Merchant(id) => {
                builder.push(" AND merchant_id = ").push_bind(*id);
            },
        }
    }
}

/// Inserts a new order into the database using the given connection. The order starts out `Unpaid` / `Pending`.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                buyer_id,
                merchant_id,
                total_amount,
                receiver_name,
                receiver_phone,
                shipping_address
            ) VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(order.buyer_id)
    .bind(order.merchant_id)
    .bind(order.total_amount)
    .bind(order.receiver_name)
    .bind(order.receiver_phone)
    .bind(order.shipping_address)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Order {} inserted for merchant #{} ({})", order.id, order.merchant_id, order.total_amount);
    Ok(order)
}

pub async fn fetch_order(id: OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await
}

/// Fetches the order only if it is owned by the given scope.
pub async fn fetch_scoped_order(
    id: OrderId,
    scope: OrderScope,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM orders WHERE id = ");
    builder.push_bind(id);
    scope.push_where(&mut builder);
    builder.build_query_as::<Order>().fetch_optional(conn).await
}

/// Fetches all orders whose id is in `ids`, in ascending id order.
pub async fn fetch_orders_by_ids(ids: &[OrderId], conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(vec![]);
    }
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM orders WHERE id IN (");
    let mut list = builder.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    list.push_unseparated(") ORDER BY id ASC");
    trace!("📝️ Executing query: {}", builder.sql());
    builder.build_query_as::<Order>().fetch_all(conn).await
}

pub async fn fetch_orders_for_buyer(buyer_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE buyer_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(buyer_id)
        .fetch_all(conn)
        .await
}

pub async fn fetch_orders_for_merchant(
    merchant_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE merchant_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(merchant_id)
        .fetch_all(conn)
        .await
}

/// Applies `transition` to the order if, and only if, the order is currently in one of the transition's source
/// states (and owned by `scope`). The state check is part of the `UPDATE`, so concurrent transitions on the same order
/// cannot both succeed.
///
/// Returns `None` if no row matched: the order does not exist, is out of scope, or is not in a valid source state.
pub async fn transition_order(
    id: OrderId,
    transition: OrderTransition,
    scope: OrderScope,
    tracking_number: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let (payment_status, order_status) = transition.target();
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("UPDATE orders SET updated_at = CURRENT_TIMESTAMP, payment_status = ");
    builder.push_bind(payment_status);
    builder.push(", order_status = ");
    builder.push_bind(order_status);
    if let Some(tracking) = tracking_number {
        builder.push(", tracking_number = ");
        builder.push_bind(tracking.to_string());
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" AND order_status IN ");
    builder.push(transition.source_states_sql());
    match transition.required_payment_status() {
        Some(required) => {
            builder.push(" AND payment_status = ");
            builder.push_bind(required);
        },
        None => {
            builder.push(" AND payment_status <> 'PAID'");
        },
    }
    scope.push_where(&mut builder);
    builder.push(" RETURNING *");
    trace!("📝️ Executing query: {}", builder.sql());
    let order = builder.build_query_as::<Order>().fetch_optional(&mut *conn).await?;
    if let Some(order) = &order {
        insert_status_log(order.id, order.order_status, Some(&transition.to_string()), conn).await?;
        let (id, payment, status) = (order.id, order.payment_status, order.order_status);
        debug!("📝️ Order {id} transitioned ({transition}) to {payment}/{status}");
    }
    Ok(order)
}

pub async fn insert_status_log(
    id: OrderId,
    status: OrderStatusType,
    note: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO order_status_logs (order_id, status, note) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(status)
        .bind(note)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn fetch_status_log(id: OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderStatusLog>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_status_logs WHERE order_id = $1 ORDER BY id ASC").bind(id).fetch_all(conn).await
}
