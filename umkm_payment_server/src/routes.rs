//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, web, HttpResponse, Responder, ResponseError};
use log::*;
use umkm_payment_engine::{
    db_types::{Merchant, NewWithdrawal, OrderId, Role},
    traits::{AccountManagement, PaymentGatewayDatabase},
    AccountApi,
    DisputeApi,
    GatewayCallback,
    MerchantApi,
    OrderFlowApi,
    ReconciliationApi,
    WithdrawalApi,
};

use crate::{
    auth::JwtClaims,
    data_objects::{
        AuditLogQuery,
        DisputeParams,
        JsonResponse,
        RejectMerchantParams,
        ResolveDisputeParams,
        ShipOrderParams,
        TrackingParams,
        WithdrawalResponse,
    },
    errors::{AuthError, ServerError},
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),+])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}


// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

/// The merchant profile of the authenticated user. Users without one are refused with a 403.
pub async fn current_merchant<B: AccountManagement>(
    claims: &JwtClaims,
    api: &AccountApi<B>,
) -> Result<Merchant, ServerError> {
    api.merchant_for_user(claims.sub).await?.ok_or_else(|| {
        debug!("💻️ User #{} has no merchant profile", claims.sub);
        ServerError::AuthenticationError(AuthError::NoMerchantProfile)
    })
}

//----------------------------------------------   Midtrans  ----------------------------------------------------
route!(midtrans_callback => Post "/callback" impl PaymentGatewayDatabase);
/// Route handler for Midtrans payment notifications.
///
/// The gateway retries any notification that is not answered with a 2xx, so the status code matters:
/// * 200 - the callback was applied, was a no-op replay, or reported a still-pending transaction.
/// * 400 - the body, or the order id list in `custom_field1`, could not be read.
/// * 403 - the signature does not match.
/// * 404 - none of the listed orders exist.
/// * 500 - at least one order could not be written. Redelivery is safe, since every order is applied idempotently.
pub async fn midtrans_callback<B: PaymentGatewayDatabase>(
    body: web::Bytes,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received Midtrans callback");
    let callback = serde_json::from_slice::<GatewayCallback>(&body).map_err(|e| {
        warn!("💻️ Could not deserialize Midtrans callback. {e}");
        ServerError::InvalidRequestBody(e.to_string())
    })?;
    let report = match api.process_callback(&callback).await {
        Ok(report) => report,
        Err(e) => {
            let err = ServerError::from(e);
            return Ok(HttpResponse::build(err.status_code()).json(JsonResponse::failure(err)));
        },
    };
    if report.needs_retry() {
        let msg = format!("{} order(s) in {} could not be processed", report.failures.len(), report.transaction_id);
        return Ok(HttpResponse::InternalServerError().json(JsonResponse::failure(msg)));
    }
    let msg = format!("Transaction {} processed ({})", report.transaction_id, report.outcome);
    Ok(HttpResponse::Ok().json(JsonResponse::success(msg)))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(my_orders => Get "/orders/my" impl AccountManagement where requires [Role::User, Role::Umkm]);
/// The authenticated user's orders as a buyer, newest first.
pub async fn my_orders<B: AccountManagement>(
    claims: JwtClaims,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET my_orders for user #{}", claims.sub);
    let orders = api.orders_for_buyer(claims.sub).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(incoming_orders => Get "/orders/incoming" impl AccountManagement where requires [Role::Umkm]);
/// Orders received by the authenticated merchant, newest first.
pub async fn incoming_orders<B: AccountManagement>(
    claims: JwtClaims,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let merchant = current_merchant(&claims, api.as_ref()).await?;
    debug!("💻️ GET incoming orders for merchant #{}", merchant.id);
    let orders = api.orders_for_merchant(merchant.id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{id}" impl AccountManagement);
/// Fetches an order with its payment and status history.
///
/// Admins can see every order. Other users can see orders they bought, and orders placed with their store. Orders the
/// user has no access to are reported as not found.
pub async fn order_by_id<B: AccountManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    debug!("💻️ GET order {order_id} for user #{}", claims.sub);
    let not_found = || ServerError::NoRecordFound(format!("Order {order_id} does not exist"));
    let details = api.order_details(order_id).await?.ok_or_else(not_found)?;
    let allowed = claims.is_admin()
        || details.order.buyer_id == claims.sub
        || api.merchant_for_user(claims.sub).await?.is_some_and(|m| m.id == details.order.merchant_id);
    if !allowed {
        info!("💻️ User #{} tried to read order {order_id}, which is not theirs", claims.sub);
        return Err(not_found());
    }
    Ok(HttpResponse::Ok().json(details))
}

route!(ship_order => Patch "/orders/{id}/ship" impl PaymentGatewayDatabase where requires [Role::Umkm]);
/// The merchant marks a paid order as shipped. The `trackingNumber` body field is optional, and so is the body.
pub async fn ship_order<B: PaymentGatewayDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: Option<web::Json<ShipOrderParams>>,
    accounts: web::Data<AccountApi<B>>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let merchant = current_merchant(&claims, accounts.as_ref()).await?;
    let order_id = OrderId(path.into_inner());
    let params = body.map(web::Json::into_inner).unwrap_or_default();
    debug!("💻️ PATCH ship order {order_id} for merchant #{}", merchant.id);
    let order = api.ship_order(merchant.id, order_id, params.tracking_number.as_deref()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_tracking => Patch "/orders/{id}/tracking" impl PaymentGatewayDatabase where requires [Role::Umkm]);
pub async fn update_tracking<B: PaymentGatewayDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<TrackingParams>,
    accounts: web::Data<AccountApi<B>>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let merchant = current_merchant(&claims, accounts.as_ref()).await?;
    let order_id = OrderId(path.into_inner());
    debug!("💻️ PATCH tracking for order {order_id} by merchant #{}", merchant.id);
    let order = api.update_tracking(merchant.id, order_id, &body.tracking_number).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(complete_order => Patch "/orders/{id}/complete" impl PaymentGatewayDatabase
    where requires [Role::User, Role::Umkm]);
/// The buyer confirms receipt, releasing the escrowed funds to the merchant.
pub async fn complete_order<B: PaymentGatewayDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    debug!("💻️ PATCH complete order {order_id} for buyer #{}", claims.sub);
    let movement = api.complete_order(claims.sub, order_id).await?;
    Ok(HttpResponse::Ok().json(movement.order))
}

route!(open_dispute => Post "/orders/{id}/dispute" impl PaymentGatewayDatabase where requires [Role::User, Role::Umkm]);
pub async fn open_dispute<B: PaymentGatewayDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<DisputeParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    debug!("💻️ POST dispute on order {order_id} by buyer #{}", claims.sub);
    let dispute = api.open_dispute(claims.sub, order_id, &body.reason).await?;
    Ok(HttpResponse::Created().json(dispute))
}

//----------------------------------------------   Wallet  ----------------------------------------------------
route!(my_wallet => Get "/umkm/wallet" impl AccountManagement where requires [Role::Umkm]);
pub async fn my_wallet<B: AccountManagement>(
    claims: JwtClaims,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let merchant = current_merchant(&claims, api.as_ref()).await?;
    debug!("💻️ GET wallet for merchant #{}", merchant.id);
    let wallet = api
        .wallet_for_merchant(merchant.id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Merchant #{} does not have a wallet yet", merchant.id)))?;
    Ok(HttpResponse::Ok().json(wallet))
}

route!(my_wallet_transactions => Get "/umkm/wallet/transactions" impl AccountManagement where requires [Role::Umkm]);
/// Ledger entries for the authenticated merchant's wallet, oldest first.
pub async fn my_wallet_transactions<B: AccountManagement>(
    claims: JwtClaims,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let merchant = current_merchant(&claims, api.as_ref()).await?;
    debug!("💻️ GET wallet transactions for merchant #{}", merchant.id);
    let transactions = api.wallet_history(merchant.id).await?.map(|h| h.transactions).unwrap_or_default();
    Ok(HttpResponse::Ok().json(transactions))
}

route!(withdraw => Post "/umkm/withdraw" impl PaymentGatewayDatabase where requires [Role::Umkm]);
/// Requests a payout of part of the available balance. The amount is reserved immediately.
pub async fn withdraw<B: PaymentGatewayDatabase>(
    claims: JwtClaims,
    body: web::Json<NewWithdrawal>,
    accounts: web::Data<AccountApi<B>>,
    api: web::Data<WithdrawalApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let merchant = current_merchant(&claims, accounts.as_ref()).await?;
    let withdrawal = body.into_inner();
    debug!("💻️ POST withdrawal of {} for merchant #{}", withdrawal.amount, merchant.id);
    let (request, wallet) = api.request_withdrawal(merchant.id, withdrawal).await?;
    Ok(HttpResponse::Created().json(WithdrawalResponse { request, wallet }))
}

route!(my_withdrawals => Get "/umkm/withdrawals" impl AccountManagement where requires [Role::Umkm]);
pub async fn my_withdrawals<B: AccountManagement>(
    claims: JwtClaims,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let merchant = current_merchant(&claims, api.as_ref()).await?;
    let withdrawals = api.withdrawals_for_merchant(merchant.id).await?;
    Ok(HttpResponse::Ok().json(withdrawals))
}

//----------------------------------------------   Admin  ----------------------------------------------------
route!(open_disputes => Get "/admin/disputes" impl PaymentGatewayDatabase where requires [Role::Admin]);
pub async fn open_disputes<B: PaymentGatewayDatabase>(
    api: web::Data<DisputeApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET open disputes");
    let disputes = api.open_disputes().await?;
    Ok(HttpResponse::Ok().json(disputes))
}

route!(resolve_dispute => Patch "/admin/disputes/{id}/resolve" impl PaymentGatewayDatabase
    where requires [Role::Admin]);
/// Resolves a dispute with a `REFUND` to the buyer or a `RELEASE` to the merchant.
pub async fn resolve_dispute<B: PaymentGatewayDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<ResolveDisputeParams>,
    api: web::Data<DisputeApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let dispute_id = path.into_inner();
    info!("💻️ PATCH resolve dispute #{dispute_id} with {} by admin #{}", body.decision, claims.sub);
    let (dispute, _) = api.resolve_dispute(claims.sub, dispute_id, &body.decision).await?;
    Ok(HttpResponse::Ok().json(dispute))
}

route!(pending_merchants => Get "/admin/umkm/pending" impl PaymentGatewayDatabase where requires [Role::Admin]);
pub async fn pending_merchants<B: PaymentGatewayDatabase>(
    api: web::Data<MerchantApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let merchants = api.pending_merchants().await?;
    Ok(HttpResponse::Ok().json(merchants))
}

route!(approve_merchant => Patch "/admin/umkm/{id}/approve" impl PaymentGatewayDatabase where requires [Role::Admin]);
/// Activates a pending merchant and opens their wallet.
pub async fn approve_merchant<B: PaymentGatewayDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<MerchantApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let merchant_id = path.into_inner();
    info!("💻️ PATCH approve merchant #{merchant_id} by admin #{}", claims.sub);
    let (merchant, _) = api.approve(claims.sub, merchant_id).await?;
    Ok(HttpResponse::Ok().json(merchant))
}

route!(reject_merchant => Patch "/admin/umkm/{id}/reject" impl PaymentGatewayDatabase where requires [Role::Admin]);
pub async fn reject_merchant<B: PaymentGatewayDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<RejectMerchantParams>,
    api: web::Data<MerchantApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let merchant_id = path.into_inner();
    info!("💻️ PATCH reject merchant #{merchant_id} by admin #{}", claims.sub);
    let merchant = api.reject(claims.sub, merchant_id, &body.reason).await?;
    Ok(HttpResponse::Ok().json(merchant))
}

route!(audit_logs => Get "/admin/audit-logs" impl AccountManagement where requires [Role::Admin]);
/// The most recent audit log entries, newest first. `?limit=n` caps the number returned.
pub async fn audit_logs<B: AccountManagement>(
    query: web::Query<AuditLogQuery>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let entries = api.audit_logs(query.limit()).await?;
    Ok(HttpResponse::Ok().json(entries))
}
