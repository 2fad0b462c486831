// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Pair-and-push end-to-end: registration, pairing, assignment, push,
//! composition, and sync invalidation.

use std::sync::Arc;

use chrono::Utc;
use skz_core::api::NewLayout;
use skz_core::content::{Content, ContentRef};
use skz_core::layout::{BackgroundType, ContentSource, LayerType, Orientation};
use skz_core::playlist::{LoopMode, NewPlaylist, PlaylistSyncStatus, PlaylistTrigger};
use skz_core::{
    AssignmentTrigger, CentralHub, HubConfig, SyncState, TaskExecutor, Tenant,
};
use tokio::sync::Mutex;
use uuid::Uuid;

fn test_hub(dir: &std::path::Path) -> CentralHub {
    let config = HubConfig {
        data_dir: dir.to_path_buf(),
        feature_dim: 16,
        ..HubConfig::default()
    };
    CentralHub::in_memory(config).unwrap()
}

fn seed_tenant(hub: &CentralHub) -> Uuid {
    let tenant = Tenant {
        id: Uuid::new_v4(),
        slug: "mall-west".into(),
        name: "Mall West".into(),
        created_at: Utc::now(),
    };
    hub.storage().create_tenant(&tenant).unwrap();
    tenant.id
}

fn seed_content(hub: &CentralHub, tenant_id: Uuid, name: &str, duration: Option<u32>) -> Uuid {
    let content = Content {
        id: Uuid::new_v4(),
        tenant_id,
        filename: format!("{name}.mp4"),
        mime_type: "video/mp4".into(),
        duration,
        download_url: format!("/api/v1/content/{name}/download"),
        created_at: Utc::now(),
    };
    hub.create_content(&content).unwrap();
    content.id
}

#[tokio::test]
async fn pair_and_push_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let hub = test_hub(dir.path());
    let tenant_id = seed_tenant(&hub);

    // Device registers and requests a pairing code.
    let issued = hub.request_pairing_code("jetson-0042", None).unwrap();
    assert_eq!(issued.pairing_code.len(), 6);
    let status = hub.pairing_status("jetson-0042").unwrap();
    assert!(!status.paired);

    // Operator verifies the code with the required store metadata.
    let (device, tenant) = hub
        .verify_pairing(&issued.pairing_code, tenant_id, "Store 4", "4 Main St")
        .unwrap();
    assert_eq!(tenant.id, tenant_id);
    assert_eq!(device.tenant_id, Some(tenant_id));

    // Playlist with two items.
    let playlist = hub
        .create_playlist(NewPlaylist {
            tenant_id,
            name: "Window Loop".into(),
            description: None,
            trigger_type: PlaylistTrigger::Manual,
            trigger_config: None,
            loop_mode: LoopMode::Continuous,
            priority: 0,
            start_at: None,
            end_at: None,
        })
        .unwrap();
    let video = seed_content(&hub, tenant_id, "promo", Some(42));
    let image = seed_content(&hub, tenant_id, "poster", None);
    hub.add_playlist_item(playlist.id, ContentRef::Local(video), None)
        .unwrap();
    hub.add_playlist_item(playlist.id, ContentRef::Local(image), Some(7))
        .unwrap();
    // Two item additions bumped 1 -> 3; treat 3 as the pushed version.
    let playlist = hub.get_playlist(playlist.id).unwrap();
    assert_eq!(playlist.version, 3);

    // Assignment under the default trigger is created enabled.
    let assignment = hub
        .assign_playlist(device.id, playlist.id, AssignmentTrigger::Default, 0)
        .unwrap();
    assert!(assignment.is_enabled);

    // Layout with one playlist layer, bound directly to the device.
    let layout = hub
        .create_layout(NewLayout {
            name: "Single Zone".into(),
            canvas_width: 1920,
            canvas_height: 1080,
            orientation: Orientation::Landscape,
            background_type: BackgroundType::Solid,
            background_color: "#000000".into(),
            background_opacity: 1.0,
            background_content: None,
            is_template: false,
        })
        .unwrap();
    hub.add_layer(skz_core::api::NewLayer {
        layout_id: layout.id,
        name: "Main".into(),
        layer_type: LayerType::Content,
        x: 0,
        y: 0,
        width: 1920,
        height: 1080,
        opacity: 1.0,
        content_source: ContentSource::Playlist,
        playlist_id: Some(playlist.id),
        content_id: None,
        is_primary: true,
        content_config: None,
    })
    .unwrap();
    hub.set_device_layout(device.id, Some(layout.id)).unwrap();

    // Push, then let the worker deliver.
    let push = hub.push_playlist(playlist.id).unwrap();
    assert_eq!(push.device_count, 1);
    assert_eq!(push.version, 3);
    let row = hub
        .storage()
        .get_sync_row(device.id, playlist.id)
        .unwrap()
        .unwrap();
    assert_eq!(row.state, SyncState::Syncing);

    let shared = Arc::new(Mutex::new(hub));
    let executor = TaskExecutor::new(shared.clone());
    executor.tick().await.unwrap();

    let hub = shared.lock().await;
    let row = hub
        .storage()
        .get_sync_row(device.id, playlist.id)
        .unwrap()
        .unwrap();
    assert_eq!(row.state, SyncState::Synced);
    assert_eq!(row.synced_version, Some(3));

    let playlist = hub.get_playlist(playlist.id).unwrap();
    assert_eq!(playlist.sync_status, PlaylistSyncStatus::InSync);

    // The composed document lists both items with effective durations.
    let composed = hub.compose_device_layout("jetson-0042").unwrap();
    let layout_doc = composed.layout.expect("paired device has a layout");
    assert_eq!(layout_doc.layers.len(), 1);
    let items = &layout_doc.layers[0].items;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].duration, 42); // intrinsic video duration
    assert_eq!(items[1].duration, 7); // per-item override
    assert_eq!(items[0].order, 0);
    assert_eq!(items[1].order, 1);

    // Continuation: a third item invalidates the sync.
    let extra = seed_content(&hub, tenant_id, "extra", None);
    let (_, version) = hub
        .add_playlist_item(playlist.id, ContentRef::Local(extra), None)
        .unwrap();
    assert_eq!(version, 4);

    let playlist = hub.get_playlist(playlist.id).unwrap();
    assert_eq!(playlist.sync_status, PlaylistSyncStatus::Pending);
    let row = hub
        .storage()
        .get_sync_row(device.id, playlist.id)
        .unwrap()
        .unwrap();
    assert_eq!(row.state, SyncState::Pending);
    assert_eq!(row.synced_version, Some(3));

    let report = hub.playlist_sync_status(playlist.id, false).unwrap();
    assert_eq!(report.synced_count, 0);
    assert_eq!(report.pending_count, 1);
    assert_eq!(report.failed_count, 0);

    // The composer default applies where neither override nor intrinsic
    // duration exists.
    let composed = hub.compose_device_layout("jetson-0042").unwrap();
    let items = &composed.layout.unwrap().layers[0].items;
    assert_eq!(items[2].duration, 10);
}

#[test]
fn static_layer_without_override_composes_null_content() {
    let dir = tempfile::tempdir().unwrap();
    let hub = test_hub(dir.path());
    let tenant_id = seed_tenant(&hub);

    let issued = hub.request_pairing_code("jetson-0099", None).unwrap();
    let (device, _) = hub
        .verify_pairing(&issued.pairing_code, tenant_id, "Store 9", "9 Side St")
        .unwrap();

    let layout = hub
        .create_layout(NewLayout {
            name: "Static Zone".into(),
            canvas_width: 1080,
            canvas_height: 1920,
            orientation: Orientation::Portrait,
            background_type: BackgroundType::Transparent,
            background_color: "#ffffff".into(),
            background_opacity: 1.0,
            background_content: None,
            is_template: false,
        })
        .unwrap();
    hub.add_layer(skz_core::api::NewLayer {
        layout_id: layout.id,
        name: "Poster".into(),
        layer_type: LayerType::Image,
        x: 0,
        y: 0,
        width: 1080,
        height: 960,
        opacity: 1.0,
        content_source: ContentSource::Static,
        playlist_id: None,
        content_id: None,
        is_primary: true,
        content_config: None,
    })
    .unwrap();
    hub.set_device_layout(device.id, Some(layout.id)).unwrap();

    let composed = hub.compose_device_layout(&device.external_id).unwrap();
    let layers = composed.layout.unwrap().layers;
    assert_eq!(layers.len(), 1);
    assert!(layers[0].override_content.is_none());
    assert!(layers[0].items.is_empty());
}

#[test]
fn device_changes_bump_the_poll_counter() {
    let dir = tempfile::tempdir().unwrap();
    let hub = test_hub(dir.path());
    let tenant_id = seed_tenant(&hub);

    let issued = hub.request_pairing_code("jetson-0007", None).unwrap();
    let (device, _) = hub
        .verify_pairing(&issued.pairing_code, tenant_id, "Store 7", "7 High St")
        .unwrap();
    assert_eq!(device.pending_sync_version, 0);

    let layout = hub
        .create_layout(NewLayout {
            name: "L".into(),
            canvas_width: 1920,
            canvas_height: 1080,
            orientation: Orientation::Landscape,
            background_type: BackgroundType::Solid,
            background_color: "#000000".into(),
            background_opacity: 1.0,
            background_content: None,
            is_template: false,
        })
        .unwrap();

    let v1 = hub.set_device_layout(device.id, Some(layout.id)).unwrap();
    let v2 = hub.set_device_layout(device.id, None).unwrap();
    assert!(v2 > v1);
    assert_eq!(
        hub.compose_device_layout(&device.external_id)
            .unwrap()
            .pending_sync_version,
        v2
    );
}
