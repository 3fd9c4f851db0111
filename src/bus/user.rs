use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::event::Event;

use super::{Unsubscribe, SUBSCRIBER_CHANNEL_CAPACITY};

#[derive(Default)]
struct Structural {
    subscribers: HashMap<i64, HashMap<u64, mpsc::Sender<Event>>>,
}

/// Per-account fan-out with no mute filtering — backs the per-user
/// `timeline:<account-id>` channel.
pub struct UserBus {
    intake_tx: mpsc::Sender<(i64, Event)>,
    structural: Arc<Mutex<Structural>>,
    delivery: Arc<Mutex<()>>,
    next_sub_id: Arc<AtomicU64>,
    forwarder: JoinHandle<()>,
}

impl Default for UserBus {
    fn default() -> Self {
        Self::new()
    }
}

impl UserBus {
    pub fn new() -> Self {
        let (intake_tx, intake_rx) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);
        let structural = Arc::new(Mutex::new(Structural::default()));
        let delivery = Arc::new(Mutex::new(()));

        let forwarder = tokio::spawn(run_forwarder(intake_rx, structural.clone(), delivery.clone()));

        Self {
            intake_tx,
            structural,
            delivery,
            next_sub_id: Arc::new(AtomicU64::new(0)),
            forwarder,
        }
    }

    pub async fn publish(&self, account: i64, event: Event) {
        let _ = self.intake_tx.send((account, event)).await;
    }

    pub async fn subscribe(&self, account: i64) -> (mpsc::Receiver<Event>, Unsubscribe) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);
        let sub_id = self.next_sub_id.fetch_add(1, Ordering::Relaxed);

        {
            let mut guard = self.structural.lock().await;
            guard.subscribers.entry(account).or_default().insert(sub_id, tx);
        }

        let structural = self.structural.clone();
        let delivery = self.delivery.clone();
        let unsubscribe = Unsubscribe::new(move || async move {
            {
                let mut guard = structural.lock().await;
                if let Some(subs) = guard.subscribers.get_mut(&account) {
                    subs.remove(&sub_id);
                    if subs.is_empty() {
                        guard.subscribers.remove(&account);
                    }
                }
            }
            let _guard = delivery.lock().await;
        });

        (rx, unsubscribe)
    }

    pub async fn close(self) {
        drop(self.intake_tx);
        let _ = self.forwarder.await;

        let mut structural = self.structural.lock().await;
        let _delivery = self.delivery.lock().await;
        structural.subscribers.clear();
    }
}

async fn run_forwarder(
    mut intake_rx: mpsc::Receiver<(i64, Event)>,
    structural: Arc<Mutex<Structural>>,
    delivery: Arc<Mutex<()>>,
) {
    while let Some((account, event)) = intake_rx.recv().await {
        let guard = structural.lock().await;
        let _delivery_guard = delivery.lock().await;

        let mut sends = Vec::new();
        if let Some(subs) = guard.subscribers.get(&account) {
            for tx in subs.values().cloned() {
                let event = event.clone();
                sends.push(tokio::spawn(async move {
                    let _ = tx.send(event).await;
                }));
            }
        }

        drop(guard);

        for handle in sends {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> Event {
        serde_json::from_str(r#"{"event":"update","payload":{}}"#).unwrap()
    }

    #[tokio::test]
    async fn publish_only_reaches_subscribers_of_the_matching_account() {
        let bus = UserBus::new();
        let (mut rx_a, _unsub_a) = bus.subscribe(1).await;
        let (mut rx_b, _unsub_b) = bus.subscribe(2).await;

        bus.publish(1, event()).await;

        assert!(rx_a.recv().await.is_some());
        tokio::time::timeout(std::time::Duration::from_millis(50), rx_b.recv())
            .await
            .expect_err("account 2 should not receive account 1's event");
    }

    #[tokio::test]
    async fn unsubscribe_drops_the_subscriber() {
        let bus = UserBus::new();
        let (mut rx, unsub) = bus.subscribe(5).await;
        unsub.call().await;

        bus.publish(5, event()).await;
        assert!(rx.recv().await.is_none());
    }
}
