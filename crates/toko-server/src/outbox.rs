// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Duration;
use toko_store::{OrderEvent, OutboxStatus, Store};
use tracing::{error, info, warn};

/// Delivery target for committed order events.
pub trait Notifier: Send + Sync {
    fn deliver(&self, event: &OrderEvent) -> Result<(), String>;
}

/// Writes each event to the log stream. Stands in for a mail or webhook
/// sender in deployments that have neither.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn deliver(&self, event: &OrderEvent) -> Result<(), String> {
        info!(
            event_id = event.id,
            order_id = event.order_id.get(),
            kind = %event.kind,
            payload = %event.payload,
            "order event"
        );
        Ok(())
    }
}

/// One drain pass over the pending queue. Returns how many events were
/// delivered. Store calls run on blocking workers since the store is
/// synchronous.
pub async fn drain_pending(
    store: &Arc<Store>,
    notifier: &Arc<dyn Notifier>,
    batch_size: usize,
    max_attempts: u32,
) -> Result<usize, String> {
    let events = {
        let store = Arc::clone(store);
        tokio::task::spawn_blocking(move || store.pending_events(batch_size))
            .await
            .map_err(|e| format!("outbox load task failed: {e}"))?
            .map_err(|e| format!("outbox load failed: {e}"))?
    };
    let mut delivered = 0usize;
    for event in events {
        match notifier.deliver(&event) {
            Ok(()) => {
                let store = Arc::clone(store);
                let event_id = event.id;
                tokio::task::spawn_blocking(move || store.mark_event_delivered(event_id))
                    .await
                    .map_err(|e| format!("outbox ack task failed: {e}"))?
                    .map_err(|e| format!("outbox ack failed: {e}"))?;
                delivered += 1;
            }
            Err(reason) => {
                warn!(event_id = event.id, "order event delivery failed: {reason}");
                let store = Arc::clone(store);
                let event_id = event.id;
                let status =
                    tokio::task::spawn_blocking(move || {
                        store.record_event_failure(event_id, max_attempts)
                    })
                    .await
                    .map_err(|e| format!("outbox failure task failed: {e}"))?
                    .map_err(|e| format!("outbox failure record failed: {e}"))?;
                if status == OutboxStatus::Failed {
                    error!(
                        event_id = event.id,
                        order_id = event.order_id.get(),
                        "order event gave up after {max_attempts} attempts"
                    );
                }
            }
        }
    }
    Ok(delivered)
}

pub fn spawn_outbox_worker(
    store: Arc<Store>,
    notifier: Arc<dyn Notifier>,
    drain_interval: Duration,
    batch_size: usize,
    max_attempts: u32,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(drain_interval);
        loop {
            interval.tick().await;
            if let Err(e) = drain_pending(&store, &notifier, batch_size, max_attempts).await {
                error!("outbox drain error: {e}");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use toko_model::{OrderDraft, PaymentMethod, ShippingAddress, UserId};
    use toko_store::{FakePaymentGateway, NewProduct};

    struct CountingNotifier {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingNotifier {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl Notifier for CountingNotifier {
        fn deliver(&self, _event: &OrderEvent) -> Result<(), String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err("notifier down".to_string())
            } else {
                Ok(())
            }
        }
    }

    fn store_with_order() -> Arc<Store> {
        let store = Store::open_in_memory().expect("open store");
        let state = store.insert_state("Jawa Barat").expect("state");
        let city = store.insert_city(state.id, "Bandung").expect("city");
        let category = store.insert_category("Pakaian").expect("category");
        let product = store
            .insert_product(&NewProduct {
                name: "Kaos Polos".to_string(),
                slug: None,
                description: "Katun".to_string(),
                image: None,
                price: 100_000.0,
                weight_kg: 0.4,
                stock: 5,
                category_ids: vec![category.id],
            })
            .expect("product");
        let user = UserId::new(1).expect("user id");
        store.upsert_cart_line(user, product.id, 1).expect("cart");
        let address = ShippingAddress::new(
            "Rina".to_string(),
            "0812".to_string(),
            state.id,
            city.id,
            "Jl. Braga 10".to_string(),
            "40111".to_string(),
        );
        let draft = OrderDraft::new(
            PaymentMethod::ManualTransfer,
            "jne".to_string(),
            "REG".to_string(),
            9_000.0,
            address,
            None,
        );
        let gateway = FakePaymentGateway::succeeding("tok-test");
        store.place_order(user, &draft, &gateway).expect("place order");
        Arc::new(store)
    }

    #[tokio::test]
    async fn drain_delivers_and_acks_pending_events() {
        let store = store_with_order();
        let notifier: Arc<dyn Notifier> = Arc::new(CountingNotifier::new(false));
        let delivered = drain_pending(&store, &notifier, 8, 3).await.expect("drain");
        assert_eq!(delivered, 1);
        assert!(store.pending_events(8).expect("pending").is_empty());

        let delivered = drain_pending(&store, &notifier, 8, 3).await.expect("drain");
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn failed_delivery_keeps_event_pending_until_attempts_run_out() {
        let store = store_with_order();
        let failing: Arc<dyn Notifier> = Arc::new(CountingNotifier::new(true));
        for _ in 0..2 {
            let delivered = drain_pending(&store, &failing, 8, 3).await.expect("drain");
            assert_eq!(delivered, 0);
            assert_eq!(store.pending_events(8).expect("pending").len(), 1);
        }

        // Third failure exhausts max_attempts and parks the event.
        drain_pending(&store, &failing, 8, 3).await.expect("drain");
        assert!(store.pending_events(8).expect("pending").is_empty());

        let ok: Arc<dyn Notifier> = Arc::new(CountingNotifier::new(false));
        let delivered = drain_pending(&store, &ok, 8, 3).await.expect("drain");
        assert_eq!(delivered, 0);
    }
}
