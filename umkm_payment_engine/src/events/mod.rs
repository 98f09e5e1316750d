//! Engine events.
//!
//! The order-flow, dispute and withdrawal APIs publish events after their database transaction has committed.
//! Subscribers (the audit-log sink, notifications) are fire-and-forget: a failing subscriber never affects the
//! request that produced the event.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers, HookFuture};
