// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Schema migrations, in order.

use super::migration::Migration;

/// Returns every schema migration, oldest first.
pub fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            name: "fleet_and_catalog",
            sql: r#"
            CREATE TABLE tenants (
                id TEXT PRIMARY KEY,
                slug TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE hubs (
                id TEXT PRIMARY KEY,
                code TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                tenant_id TEXT NOT NULL REFERENCES tenants(id),
                status TEXT NOT NULL DEFAULT 'pending',
                ip TEXT,
                mac TEXT,
                hostname TEXT,
                last_heartbeat INTEGER,
                api_token TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE devices (
                id TEXT PRIMARY KEY,
                external_id TEXT NOT NULL UNIQUE,
                hardware_id TEXT NOT NULL UNIQUE,
                tenant_id TEXT REFERENCES tenants(id),
                hub_id TEXT REFERENCES hubs(id),
                mode TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                name TEXT,
                store_name TEXT,
                store_address TEXT,
                ip TEXT,
                last_seen INTEGER,
                layout_id TEXT,
                pending_sync_version INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX idx_devices_hub ON devices(hub_id);
            CREATE INDEX idx_devices_tenant ON devices(tenant_id);

            CREATE TABLE device_id_counters (
                pool TEXT PRIMARY KEY,
                next_value INTEGER NOT NULL
            );

            CREATE TABLE pairing_codes (
                code TEXT PRIMARY KEY,
                hardware_id TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            );

            CREATE TABLE missing_persons (
                id TEXT PRIMARY KEY,
                case_id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                age_at_disappearance INTEGER,
                disappearance_date TEXT,
                last_known_location TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                feature_vector BLOB NOT NULL,
                pending_photo INTEGER NOT NULL DEFAULT 0,
                photo_path TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE INDEX idx_missing_persons_status ON missing_persons(status);

            CREATE TABLE loyalty_members (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL REFERENCES tenants(id),
                member_code TEXT NOT NULL,
                name TEXT NOT NULL,
                email TEXT,
                phone TEXT,
                assigned_playlist_id TEXT,
                last_seen_at INTEGER,
                last_seen_store TEXT,
                feature_vector BLOB NOT NULL,
                pending_photo INTEGER NOT NULL DEFAULT 0,
                photo_path TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE(tenant_id, member_code)
            );

            CREATE TABLE index_artifacts (
                id TEXT PRIMARY KEY,
                scope TEXT NOT NULL,
                version INTEGER NOT NULL,
                record_count INTEGER NOT NULL,
                hash TEXT NOT NULL,
                path TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                UNIQUE(scope, version)
            );
            "#,
        },
        Migration {
            version: 2,
            name: "screens",
            sql: r#"
            CREATE TABLE content (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                filename TEXT NOT NULL,
                mime_type TEXT NOT NULL,
                duration INTEGER,
                download_url TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE playlists (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                trigger_type TEXT NOT NULL DEFAULT 'manual',
                trigger_config TEXT,
                loop_mode TEXT NOT NULL DEFAULT 'continuous',
                priority INTEGER NOT NULL DEFAULT 0,
                start_at INTEGER,
                end_at INTEGER,
                is_active INTEGER NOT NULL DEFAULT 1,
                version INTEGER NOT NULL DEFAULT 1,
                sync_status TEXT NOT NULL DEFAULT 'pending',
                last_synced_at INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE INDEX idx_playlists_tenant ON playlists(tenant_id);

            CREATE TABLE playlist_items (
                id TEXT PRIMARY KEY,
                playlist_id TEXT NOT NULL REFERENCES playlists(id) ON DELETE CASCADE,
                content_kind TEXT NOT NULL,
                content_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                duration_override INTEGER
            );
            CREATE INDEX idx_playlist_items_playlist ON playlist_items(playlist_id);

            CREATE TABLE device_playlist_assignments (
                id TEXT PRIMARY KEY,
                device_id TEXT NOT NULL REFERENCES devices(id),
                playlist_id TEXT NOT NULL REFERENCES playlists(id),
                trigger_type TEXT NOT NULL,
                priority INTEGER NOT NULL DEFAULT 0,
                is_enabled INTEGER NOT NULL DEFAULT 0,
                start_at INTEGER,
                end_at INTEGER,
                created_at INTEGER NOT NULL,
                UNIQUE(device_id, trigger_type)
            );
            CREATE INDEX idx_assignments_playlist ON device_playlist_assignments(playlist_id);

            CREATE TABLE device_playlist_sync (
                device_id TEXT NOT NULL REFERENCES devices(id),
                playlist_id TEXT NOT NULL REFERENCES playlists(id),
                synced_version INTEGER,
                state TEXT NOT NULL DEFAULT 'pending',
                last_attempt INTEGER,
                last_success INTEGER,
                error TEXT,
                PRIMARY KEY (device_id, playlist_id)
            );

            CREATE TABLE layouts (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                canvas_width INTEGER NOT NULL,
                canvas_height INTEGER NOT NULL,
                orientation TEXT NOT NULL DEFAULT 'landscape',
                background_type TEXT NOT NULL DEFAULT 'solid',
                background_color TEXT NOT NULL DEFAULT '#000000',
                background_opacity REAL NOT NULL DEFAULT 1.0,
                background_content TEXT,
                is_template INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE layers (
                id TEXT PRIMARY KEY,
                layout_id TEXT NOT NULL REFERENCES layouts(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                layer_type TEXT NOT NULL DEFAULT 'content',
                x INTEGER NOT NULL,
                y INTEGER NOT NULL,
                width INTEGER NOT NULL,
                height INTEGER NOT NULL,
                z_index INTEGER NOT NULL,
                opacity REAL NOT NULL DEFAULT 1.0,
                background_type TEXT NOT NULL DEFAULT 'transparent',
                background_color TEXT,
                is_visible INTEGER NOT NULL DEFAULT 1,
                is_locked INTEGER NOT NULL DEFAULT 0,
                content_source TEXT NOT NULL DEFAULT 'none',
                playlist_id TEXT,
                content_id TEXT,
                is_primary INTEGER NOT NULL DEFAULT 0,
                content_config TEXT
            );
            CREATE INDEX idx_layers_layout ON layers(layout_id);

            CREATE TABLE device_layouts (
                id TEXT PRIMARY KEY,
                device_id TEXT NOT NULL REFERENCES devices(id),
                layout_id TEXT NOT NULL REFERENCES layouts(id),
                priority INTEGER NOT NULL DEFAULT 0,
                start_at INTEGER,
                end_at INTEGER,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX idx_device_layouts_device ON device_layouts(device_id);

            CREATE TABLE device_layer_overrides (
                id TEXT PRIMARY KEY,
                device_id TEXT NOT NULL REFERENCES devices(id),
                layer_id TEXT NOT NULL REFERENCES layers(id),
                content_mode TEXT NOT NULL,
                static_file_id TEXT,
                static_file_url TEXT,
                pdf_page_duration INTEGER NOT NULL DEFAULT 5,
                ticker_items TEXT,
                ticker_speed INTEGER NOT NULL DEFAULT 50,
                ticker_direction TEXT NOT NULL DEFAULT 'left',
                UNIQUE(device_id, layer_id)
            );

            CREATE TABLE layer_playlist_triggers (
                id TEXT PRIMARY KEY,
                device_id TEXT NOT NULL REFERENCES devices(id),
                layer_id TEXT NOT NULL REFERENCES layers(id),
                playlist_id TEXT NOT NULL REFERENCES playlists(id),
                trigger_type TEXT NOT NULL,
                priority INTEGER NOT NULL DEFAULT 0,
                UNIQUE(device_id, layer_id, playlist_id)
            );
            "#,
        },
        Migration {
            version: 3,
            name: "alerts_and_tasks",
            sql: r#"
            CREATE TABLE alerts (
                id TEXT PRIMARY KEY,
                tenant_id TEXT,
                hub_id TEXT,
                device_id TEXT,
                alert_type TEXT NOT NULL,
                case_ref TEXT,
                member_ref TEXT,
                confidence REAL NOT NULL,
                captured_image_path TEXT,
                detected_at INTEGER NOT NULL,
                received_at INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'new',
                reviewer TEXT,
                reviewed_at INTEGER,
                notes TEXT
            );
            CREATE INDEX idx_alerts_status ON alerts(status);
            CREATE INDEX idx_alerts_type ON alerts(alert_type);
            CREATE INDEX idx_alerts_received ON alerts(received_at);

            CREATE TABLE notification_rules (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                channel TEXT NOT NULL,
                recipients TEXT NOT NULL,
                delay_minutes INTEGER NOT NULL DEFAULT 0,
                enabled INTEGER NOT NULL DEFAULT 1,
                description TEXT,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE notification_log (
                id TEXT PRIMARY KEY,
                alert_id TEXT NOT NULL REFERENCES alerts(id) ON DELETE CASCADE,
                channel TEXT NOT NULL,
                recipient TEXT NOT NULL,
                sent_at INTEGER NOT NULL,
                status TEXT NOT NULL,
                error TEXT,
                message_id TEXT
            );
            CREATE INDEX idx_notification_log_alert ON notification_log(alert_id);

            CREATE TABLE tasks (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                payload TEXT NOT NULL,
                run_at INTEGER NOT NULL,
                attempts INTEGER NOT NULL DEFAULT 0,
                max_attempts INTEGER NOT NULL,
                lease_expires_at INTEGER,
                status TEXT NOT NULL DEFAULT 'queued',
                last_error TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE INDEX idx_tasks_due ON tasks(status, run_at);
            "#,
        },
        Migration {
            version: 4,
            name: "sent_once_guard",
            sql: r#"
            CREATE UNIQUE INDEX idx_notification_sent_once
                ON notification_log(alert_id, channel, recipient)
                WHERE status = 'sent';
            "#,
        },
    ]
}
