use std::time::Duration;

use actix_web::{
    dev::{Server, Service},
    error::{JsonPayloadError, PathError, QueryPayloadError},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpRequest,
    HttpServer,
    Scope,
};
use futures::{future::ok, FutureExt};
use log::*;
use umkm_payment_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    sqlite_audit_sink,
    traits::PaymentGatewayDatabase,
    AccountApi,
    DisputeApi,
    MerchantApi,
    OrderFlowApi,
    ReconciliationApi,
    SqliteDatabase,
    WithdrawalApi,
};

use crate::{
    auth::TokenVerifier,
    config::{ServerConfig, ServerOptions},
    errors::{AuthError, ServerError},
    helpers::{get_remote_ip, peer_is_allowed},
    middleware::JwtMiddlewareFactory,
    routes::{
        health,
        ApproveMerchantRoute,
        AuditLogsRoute,
        CompleteOrderRoute,
        IncomingOrdersRoute,
        MidtransCallbackRoute,
        MyOrdersRoute,
        MyWalletRoute,
        MyWalletTransactionsRoute,
        MyWithdrawalsRoute,
        OpenDisputeRoute,
        OpenDisputesRoute,
        OrderByIdRoute,
        PendingMerchantsRoute,
        RejectMerchantRoute,
        ResolveDisputeRoute,
        ShipOrderRoute,
        UpdateTrackingRoute,
        WithdrawRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Could not run migrations. {e}")))?;
    let handlers = EventHandlers::new(config.event_buffer_size, default_hooks(&db));
    let producers = handlers.producers();
    handlers.start_handlers();
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// The audit log is written by a subscriber to admin actions, so a failing audit write never fails the action itself.
fn default_hooks(db: &SqliteDatabase) -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_admin_action(sqlite_audit_sink(db.clone()))
        .on_order_paid(|ev| {
            Box::pin(async move {
                let order = ev.order;
                info!("📬️ Order {} paid. {} is held for merchant #{}", order.id, order.total_amount, order.merchant_id);
            })
        })
        .on_withdrawal_requested(|ev| {
            Box::pin(async move {
                info!("📬️ Withdrawal #{} of {} is waiting to be paid out", ev.request.id, ev.request.amount);
            })
        })
        .on_dispute_resolved(|ev| {
            Box::pin(async move {
                let decision = ev.dispute.decision.map(|d| d.to_string()).unwrap_or_default();
                info!("📬️ Dispute #{} on order {} resolved with {decision}", ev.dispute.id, ev.order.id);
            })
        });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let options = ServerOptions::from_config(&config);
    let verifier = TokenVerifier::new(&config.auth);
    let server_key = config.midtrans.server_key.clone();
    let min_withdrawal = config.min_withdrawal;
    let srv = HttpServer::new(move || {
        let reconciliation_api = ReconciliationApi::new(db.clone(), producers.clone(), server_key.clone());
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let disputes_api = DisputeApi::new(db.clone(), producers.clone());
        let withdrawals_api = WithdrawalApi::new(db.clone(), producers.clone(), min_withdrawal);
        let merchants_api = MerchantApi::new(db.clone(), producers.clone());
        let accounts_api = AccountApi::new(db.clone());
        let options = options.clone();
        let midtrans_scope = midtrans_scope::<SqliteDatabase>().wrap_fn(move |req, srv| {
            let peer = get_remote_ip(req.request(), options.use_x_forwarded_for, options.use_forwarded);
            if peer_is_allowed(peer, options.midtrans_whitelist.as_deref()) {
                srv.call(req)
            } else {
                warn!("💻️ Refused a Midtrans callback from {peer:?}, which is not on the whitelist");
                ok(req.error_response(ServerError::AuthenticationError(AuthError::ForbiddenPeer))).boxed_local()
            }
        });
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("ums::access_log"))
            .app_data(json_config())
            .app_data(path_config())
            .app_data(query_config())
            .app_data(web::Data::new(reconciliation_api))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(disputes_api))
            .app_data(web::Data::new(withdrawals_api))
            .app_data(web::Data::new(merchants_api))
            .app_data(web::Data::new(accounts_api))
            .service(api_scope::<SqliteDatabase>().wrap(JwtMiddlewareFactory::new(verifier.clone())))
            .service(midtrans_scope)
            .service(health)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Routes that require a bearer token. The caller wraps the scope in the JWT middleware.
///
/// `/orders/my` and `/orders/incoming` must be registered before `/orders/{id}`.
pub fn api_scope<B: PaymentGatewayDatabase + 'static>() -> Scope {
    web::scope("/api")
        .service(MyOrdersRoute::<B>::new())
        .service(IncomingOrdersRoute::<B>::new())
        .service(OrderByIdRoute::<B>::new())
        .service(ShipOrderRoute::<B>::new())
        .service(UpdateTrackingRoute::<B>::new())
        .service(CompleteOrderRoute::<B>::new())
        .service(OpenDisputeRoute::<B>::new())
        .service(MyWalletRoute::<B>::new())
        .service(MyWalletTransactionsRoute::<B>::new())
        .service(WithdrawRoute::<B>::new())
        .service(MyWithdrawalsRoute::<B>::new())
        .service(OpenDisputesRoute::<B>::new())
        .service(ResolveDisputeRoute::<B>::new())
        .service(PendingMerchantsRoute::<B>::new())
        .service(ApproveMerchantRoute::<B>::new())
        .service(RejectMerchantRoute::<B>::new())
        .service(AuditLogsRoute::<B>::new())
}

/// Payment gateway notifications. These are authenticated by signature, and optionally by the caller's IP address.
pub fn midtrans_scope<B: PaymentGatewayDatabase + 'static>() -> Scope {
    web::scope("/midtrans").service(MidtransCallbackRoute::<B>::new())
}

/// Extractor failures are reported in the same JSON shape as every other error.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
        debug!("💻️ Could not read JSON body. {err}");
        ServerError::InvalidRequestBody(err.to_string()).into()
    })
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err: PathError, _req: &HttpRequest| ServerError::InvalidRequestPath(err.to_string()).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err: QueryPayloadError, _req: &HttpRequest| {
        ServerError::InvalidRequestBody(err.to_string()).into()
    })
}
