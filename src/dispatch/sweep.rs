use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::time::{interval, Duration as TokioDuration};
use tracing::{info, warn};

use crate::directory::RiderDirectory;
use crate::models::delivery::DeliveryStatus;
use crate::models::rider::RiderStatus;
use crate::registry::DeliveryRegistry;

/// The assignment flow is reserve-then-commit across two aggregates; if the
/// process dies between the phases a rider can stay on-delivery with no
/// live pairing. This sweep is the recovery path: it releases riders whose
/// referenced delivery is missing, terminal, or still pending, once the
/// reservation is older than the grace period.
pub async fn run_reconciliation_sweep(
    directory: Arc<RiderDirectory>,
    registry: Arc<DeliveryRegistry>,
    sweep_interval: TokioDuration,
    grace: Duration,
) {
    info!(
        interval_secs = sweep_interval.as_secs(),
        grace_secs = grace.num_seconds(),
        "reconciliation sweep started"
    );

    let mut ticker = interval(sweep_interval);
    loop {
        ticker.tick().await;
        let released = sweep_once(&directory, &registry, grace);
        if released > 0 {
            warn!(released, "reconciliation sweep released stranded riders");
        }
    }
}

pub fn sweep_once(
    directory: &RiderDirectory,
    registry: &DeliveryRegistry,
    grace: Duration,
) -> usize {
    let cutoff = Utc::now() - grace;
    let mut released = 0;

    for rider in directory.all() {
        if rider.status != RiderStatus::OnDelivery || rider.last_updated > cutoff {
            continue;
        }

        let consistent = rider
            .current_delivery_id
            .and_then(|id| registry.get(id))
            .is_some_and(|delivery| {
                delivery.rider_id == Some(rider.id)
                    && !delivery.status.is_terminal()
                    && delivery.status != DeliveryStatus::Pending
            });

        if !consistent && directory.release(rider.id) {
            warn!(
                rider_id = %rider.id,
                delivery_id = ?rider.current_delivery_id,
                "released rider with no consistent delivery pairing"
            );
            released += 1;
        }
    }

    released
}
