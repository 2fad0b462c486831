// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Periodic housekeeping: heartbeat-gap offline marking, pairing-code
//! expiry, and task-lease reclaim.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use skz_core::CentralHub;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::metrics::HubMetrics;

const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// One sweep pass. Returns (offline, purged, reclaimed).
pub async fn sweep_once(
    hub: &Arc<Mutex<CentralHub>>,
    metrics: &HubMetrics,
) -> Result<(usize, usize, usize), skz_core::StorageError> {
    let hub = hub.lock().await;
    let now = Utc::now();
    let offline_after = hub.config().offline_after;
    let cutoff = now - chrono::Duration::seconds(offline_after.as_secs() as i64);

    let offline = hub.storage().mark_stale_devices_offline(cutoff)?;
    let purged = hub.storage().purge_expired_pairing_codes(now)?;
    let reclaimed = hub.storage().reclaim_expired_tasks(now)?;

    metrics.devices_marked_offline.inc_by(offline as u64);
    metrics.pairing_codes_purged.inc_by(purged as u64);
    metrics.tasks_reclaimed.inc_by(reclaimed as u64);

    if offline + purged + reclaimed > 0 {
        info!(offline, purged, reclaimed, "sweep applied changes");
    }
    Ok((offline, purged, reclaimed))
}

/// Sweep loop. Exits when `shutdown` flips to true.
pub async fn run(
    hub: Arc<Mutex<CentralHub>>,
    metrics: HubMetrics,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    loop {
        if let Err(e) = sweep_once(&hub, &metrics).await {
            error!(error = %e, "sweep failed");
        }
        tokio::select! {
            _ = tokio::time::sleep(SWEEP_INTERVAL) => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skz_core::fleet::RegistrationRequest;
    use skz_core::{DeviceMode, DeviceStatus, HubConfig};

    #[tokio::test]
    async fn sweep_marks_stale_devices_offline() {
        let dir = tempfile::tempdir().unwrap();
        let config = HubConfig {
            data_dir: dir.path().to_path_buf(),
            offline_after: Duration::from_secs(60),
            ..HubConfig::default()
        };
        let hub = CentralHub::in_memory(config).unwrap();

        let (device, _) = hub
            .register_device(RegistrationRequest {
                hardware_id: "hw-sweep".into(),
                mode: DeviceMode::Direct,
                hub_id: None,
                ip: None,
                name: None,
            })
            .unwrap();
        hub.storage()
            .set_device_status(device.id, DeviceStatus::Active)
            .unwrap();
        hub.storage()
            .set_device_last_seen(device.id, Utc::now() - chrono::Duration::minutes(10))
            .unwrap();

        let hub = Arc::new(Mutex::new(hub));
        let metrics = HubMetrics::new();
        let (offline, _, _) = sweep_once(&hub, &metrics).await.unwrap();
        assert_eq!(offline, 1);
        assert_eq!(metrics.devices_marked_offline.get(), 1);

        let hub = hub.lock().await;
        let fetched = hub.get_device(device.id).unwrap();
        assert_eq!(fetched.status, DeviceStatus::Offline);
    }
}
