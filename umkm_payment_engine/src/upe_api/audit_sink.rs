use log::*;

use crate::{
    events::{AdminActionEvent, HookFuture},
    traits::PaymentGatewayDatabase,
    SqliteDatabase,
};

/// Builds the `on_admin_action` hook that persists admin actions to the audit log.
///
/// Failures are logged and swallowed. The admin action itself has already been committed by the time the event
/// arrives.
pub fn sqlite_audit_sink(db: SqliteDatabase) -> impl Fn(AdminActionEvent) -> HookFuture + Send + Sync + 'static {
    move |event: AdminActionEvent| {
        let db = db.clone();
        Box::pin(async move {
            let action = event.entry.action.clone();
            let target = format!("{} #{}", event.entry.target_type, event.entry.target_id);
            match db.insert_audit_log(event.entry).await {
                Ok(entry) => debug!("📝️ Audit entry #{} recorded: {action} on {target}", entry.id),
                Err(e) => error!("📝️ Could not record audit entry for {action} on {target}. {e}"),
            }
        })
    }
}
