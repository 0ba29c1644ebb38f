use std::sync::Arc;

use tokio::sync::broadcast;

use crate::directory::RiderDirectory;
use crate::dispatch::DispatchService;
use crate::notify::{BroadcastNotifier, NotificationEvent};
use crate::observability::metrics::Metrics;
use crate::registry::DeliveryRegistry;
use crate::stores::{BusinessStore, OrderStore};

pub struct AppState {
    pub directory: Arc<RiderDirectory>,
    pub registry: Arc<DeliveryRegistry>,
    pub orders: Arc<OrderStore>,
    pub businesses: Arc<BusinessStore>,
    pub dispatch: DispatchService,
    pub tracking_events_tx: broadcast::Sender<NotificationEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(event_buffer_size: usize, default_search_radius_km: f64) -> Self {
        let directory = Arc::new(RiderDirectory::new());
        let registry = Arc::new(DeliveryRegistry::new());
        let orders = Arc::new(OrderStore::new());
        let businesses = Arc::new(BusinessStore::new());
        let metrics = Metrics::new();
        let (tracking_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        let notifier = Arc::new(BroadcastNotifier::new(
            tracking_events_tx.clone(),
            metrics.clone(),
        ));

        let dispatch = DispatchService::new(
            directory.clone(),
            registry.clone(),
            orders.clone(),
            businesses.clone(),
            notifier,
            metrics.clone(),
            default_search_radius_km,
        );

        Self {
            directory,
            registry,
            orders,
            businesses,
            dispatch,
            tracking_events_tx,
            metrics,
        }
    }
}
