// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Prometheus metrics for the hub daemon.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

/// Daemon-side counters and gauges.
#[derive(Clone)]
pub struct HubMetrics {
    registry: Registry,
    pub tasks_processed: IntCounter,
    pub tasks_failed: IntCounter,
    pub tasks_reclaimed: IntCounter,
    pub devices_marked_offline: IntCounter,
    pub pairing_codes_purged: IntCounter,
    pub queued_tasks: IntGauge,
}

impl HubMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let tasks_processed = IntCounter::new(
            "skz_hub_tasks_processed_total",
            "Background tasks completed",
        )
        .expect("metric definition");
        let tasks_failed = IntCounter::new(
            "skz_hub_tasks_failed_total",
            "Background tasks failed terminally",
        )
        .expect("metric definition");
        let tasks_reclaimed = IntCounter::new(
            "skz_hub_tasks_reclaimed_total",
            "Leased tasks returned to the queue by the sweeper",
        )
        .expect("metric definition");
        let devices_marked_offline = IntCounter::new(
            "skz_hub_devices_marked_offline_total",
            "Devices marked offline on heartbeat gap",
        )
        .expect("metric definition");
        let pairing_codes_purged = IntCounter::new(
            "skz_hub_pairing_codes_purged_total",
            "Expired pairing codes removed",
        )
        .expect("metric definition");
        let queued_tasks =
            IntGauge::new("skz_hub_queued_tasks", "Tasks currently queued").expect("metric definition");

        for collector in [
            Box::new(tasks_processed.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(tasks_failed.clone()),
            Box::new(tasks_reclaimed.clone()),
            Box::new(devices_marked_offline.clone()),
            Box::new(pairing_codes_purged.clone()),
            Box::new(queued_tasks.clone()),
        ] {
            registry.register(collector).expect("metric registration");
        }

        HubMetrics {
            registry,
            tasks_processed,
            tasks_failed,
            tasks_reclaimed,
            devices_marked_offline,
            pairing_codes_purged,
            queued_tasks,
        }
    }

    /// Renders the registry in the Prometheus text format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if encoder
            .encode(&self.registry.gather(), &mut buffer)
            .is_err()
        {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for HubMetrics {
    fn default() -> Self {
        Self::new()
    }
}
