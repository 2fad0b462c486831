// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Remote commands proxied to the device's local HTTP agent.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use super::device::Device;

/// The closed remote-command vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteCommand {
    Minimize,
    Maximize,
    Restart,
    Reboot,
    ShowPairing,
    ResetPairing,
}

impl RemoteCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteCommand::Minimize => "minimize",
            RemoteCommand::Maximize => "maximize",
            RemoteCommand::Restart => "restart",
            RemoteCommand::Reboot => "reboot",
            RemoteCommand::ShowPairing => "show_pairing",
            RemoteCommand::ResetPairing => "reset_pairing",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "minimize" => Some(RemoteCommand::Minimize),
            "maximize" => Some(RemoteCommand::Maximize),
            "restart" => Some(RemoteCommand::Restart),
            "reboot" => Some(RemoteCommand::Reboot),
            "show_pairing" => Some(RemoteCommand::ShowPairing),
            "reset_pairing" => Some(RemoteCommand::ResetPairing),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum AgentError {
    /// The device has never reported an IP address.
    #[error("device {0} has no known address")]
    NoAddress(String),

    /// Transport-level failure reaching the agent (maps to 502). The
    /// device's status is not changed here; only the heartbeat gap marks
    /// a device offline.
    #[error("device agent unreachable: {0}")]
    Unreachable(String),

    /// The agent answered with a non-success status.
    #[error("device agent error: {0}")]
    Agent(String),
}

/// HTTP client for device agents.
pub struct DeviceAgentClient {
    client: reqwest::Client,
    agent_port: u16,
}

impl DeviceAgentClient {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        DeviceAgentClient {
            client,
            agent_port: 8321,
        }
    }

    pub fn with_port(mut self, agent_port: u16) -> Self {
        self.agent_port = agent_port;
        self
    }

    /// Sends one command to the device's agent and returns its JSON
    /// response.
    pub async fn send_command(
        &self,
        device: &Device,
        command: RemoteCommand,
    ) -> Result<serde_json::Value, AgentError> {
        let ip = device
            .ip
            .as_deref()
            .ok_or_else(|| AgentError::NoAddress(device.external_id.clone()))?;
        let url = format!("http://{ip}:{}/command", self.agent_port);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "command": command.as_str() }))
            .send()
            .await
            .map_err(|e| {
                warn!(device = %device.external_id, error = %e, "device agent unreachable");
                AgentError::Unreachable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Agent(format!("{status}: {body}")));
        }
        response
            .json()
            .await
            .map_err(|e| AgentError::Agent(format!("bad agent response: {e}")))
    }

    /// Notifies a device's agent that a playlist version is ready to
    /// fetch. Used by the sync delivery task.
    pub async fn notify_sync(
        &self,
        device: &Device,
        playlist_id: uuid::Uuid,
        version: u32,
    ) -> Result<(), AgentError> {
        let ip = device
            .ip
            .as_deref()
            .ok_or_else(|| AgentError::NoAddress(device.external_id.clone()))?;
        let url = format!("http://{ip}:{}/sync", self.agent_port);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "playlist_id": playlist_id,
                "version": version,
            }))
            .send()
            .await
            .map_err(|e| AgentError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Agent(format!("{status}: {body}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::{DeviceMode, DeviceStatus};
    use chrono::Utc;
    use uuid::Uuid;

    fn device(ip: Option<&str>) -> Device {
        Device {
            id: Uuid::new_v4(),
            external_id: "SKZ-D-0001".into(),
            hardware_id: "hw".into(),
            tenant_id: None,
            hub_id: None,
            mode: DeviceMode::Direct,
            status: DeviceStatus::Active,
            name: None,
            store_name: None,
            store_address: None,
            ip: ip.map(str::to_string),
            last_seen: None,
            layout_id: None,
            pending_sync_version: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn command_vocabulary_is_closed() {
        for s in [
            "minimize",
            "maximize",
            "restart",
            "reboot",
            "show_pairing",
            "reset_pairing",
        ] {
            assert_eq!(RemoteCommand::parse(s).unwrap().as_str(), s);
        }
        assert_eq!(RemoteCommand::parse("shutdown"), None);
    }

    #[tokio::test]
    async fn missing_address_is_reported() {
        let client = DeviceAgentClient::new(Duration::from_millis(100));
        let err = client
            .send_command(&device(None), RemoteCommand::Restart)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::NoAddress(_)));
    }

    #[tokio::test]
    async fn unreachable_agent_is_reported() {
        // A reserved address nothing listens on, with a very short
        // timeout.
        let client = DeviceAgentClient::new(Duration::from_millis(50));
        let err = client
            .send_command(&device(Some("127.0.0.1")), RemoteCommand::Restart)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Unreachable(_)));
    }
}
