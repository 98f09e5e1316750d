use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::events::{
    AdminActionEvent,
    DisputeResolvedEvent,
    EventHandler,
    EventProducer,
    Handler,
    OrderPaidEvent,
    WithdrawalRequestedEvent,
};

pub type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_paid_producer: Vec<EventProducer<OrderPaidEvent>>,
    pub dispute_resolved_producer: Vec<EventProducer<DisputeResolvedEvent>>,
    pub withdrawal_requested_producer: Vec<EventProducer<WithdrawalRequestedEvent>>,
    pub admin_action_producer: Vec<EventProducer<AdminActionEvent>>,
}

impl EventProducers {
    pub async fn publish_order_paid(&self, event: OrderPaidEvent) {
        for emitter in &self.order_paid_producer {
            trace!("📬️ Notifying order paid subscribers");
            emitter.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_dispute_resolved(&self, event: DisputeResolvedEvent) {
        for emitter in &self.dispute_resolved_producer {
            trace!("📬️ Notifying dispute resolved subscribers");
            emitter.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_withdrawal_requested(&self, event: WithdrawalRequestedEvent) {
        for emitter in &self.withdrawal_requested_producer {
            trace!("📬️ Notifying withdrawal subscribers");
            emitter.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_admin_action(&self, event: AdminActionEvent) {
        for emitter in &self.admin_action_producer {
            trace!("📬️ Notifying admin action subscribers");
            emitter.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_paid: Option<EventHandler<OrderPaidEvent>>,
    pub on_dispute_resolved: Option<EventHandler<DisputeResolvedEvent>>,
    pub on_withdrawal_requested: Option<EventHandler<WithdrawalRequestedEvent>>,
    pub on_admin_action: Option<EventHandler<AdminActionEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_paid = hooks.on_order_paid.map(|f| EventHandler::new(buffer_size, f));
        let on_dispute_resolved = hooks.on_dispute_resolved.map(|f| EventHandler::new(buffer_size, f));
        let on_withdrawal_requested = hooks.on_withdrawal_requested.map(|f| EventHandler::new(buffer_size, f));
        let on_admin_action = hooks.on_admin_action.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_paid, on_dispute_resolved, on_withdrawal_requested, on_admin_action }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_paid {
            result.order_paid_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_dispute_resolved {
            result.dispute_resolved_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_withdrawal_requested {
            result.withdrawal_requested_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_admin_action {
            result.admin_action_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns every configured handler onto the runtime.
    pub fn start_handlers(self) {
        if let Some(handler) = self.on_order_paid {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_dispute_resolved {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_withdrawal_requested {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_admin_action {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_paid: Option<Handler<OrderPaidEvent>>,
    pub on_dispute_resolved: Option<Handler<DisputeResolvedEvent>>,
    pub on_withdrawal_requested: Option<Handler<WithdrawalRequestedEvent>>,
    pub on_admin_action: Option<Handler<AdminActionEvent>>,
}

impl EventHooks {
    pub fn on_order_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPaidEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_paid = Some(Arc::new(f));
        self
    }

    pub fn on_dispute_resolved<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DisputeResolvedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_dispute_resolved = Some(Arc::new(f));
        self
    }

    pub fn on_withdrawal_requested<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(WithdrawalRequestedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_withdrawal_requested = Some(Arc::new(f));
        self
    }

    pub fn on_admin_action<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(AdminActionEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_admin_action = Some(Arc::new(f));
        self
    }
}
