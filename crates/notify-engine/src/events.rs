use notify_types::{MessageRecord, Subscription, Topic};

/// Caller-visible events (spec.md §4.1 "Events emitted to callers").
#[derive(Debug, Clone)]
pub enum EngineEvent {
    NotifySubscription(Subscription),
    NotifyUpdate(Subscription),
    NotifyDelete(Topic),
    NotifySubscriptionsChanged(Vec<Subscription>),
    NotifyMessage(MessageRecord),
}
