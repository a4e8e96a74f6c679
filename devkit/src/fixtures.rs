/*!
JSON fixtures shaped like `ListPhysicalDevices` responses

Builders emit `serde_json::Value` so tests exercise the same deserialization
path as real API traffic.
*/

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

/// Builder for one physical device entry
#[derive(Debug, Clone)]
pub struct DeviceFixture {
    id: String,
    name: String,
    logical_id: String,
    logical_name: String,
    topology: &'static str,
    role: Option<(&'static str, i32)>,
    connection_state: &'static str,
    health: &'static str,
    model: String,
    address: String,
    version: String,
    contexts: Vec<(String, bool)>,
}

impl DeviceFixture {
    /// Connected standalone device with no cluster role.
    pub fn new(id: &str, name: &str, logical_id: &str, logical_name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            logical_id: logical_id.to_string(),
            logical_name: logical_name.to_string(),
            topology: "TOPOLOGY_TYPE_STANDALONE",
            role: None,
            connection_state: "PHYSICAL_DEVICE_CONNECTION_STATE_CONNECTED",
            health: "PHYSICAL_DEVICE_HEALTH_STATUS_HEALTHY",
            model: "FG-VM64".to_string(),
            address: String::new(),
            version: String::new(),
            contexts: Vec::new(),
        }
    }

    /// Mark the owning logical device as active/standby.
    pub fn clustered(mut self) -> Self {
        self.topology = "TOPOLOGY_TYPE_ACTIVE_STANDBY";
        self
    }

    pub fn active(mut self, priority: i32) -> Self {
        self.role = Some(("ACTIVE_STANDBY_ROLE_ACTIVE", priority));
        self
    }

    pub fn standby(mut self, priority: i32) -> Self {
        self.role = Some(("ACTIVE_STANDBY_ROLE_STANDBY", priority));
        self
    }

    pub fn disconnected(mut self) -> Self {
        self.connection_state = "PHYSICAL_DEVICE_CONNECTION_STATE_DISCONNECTED";
        self.health = "PHYSICAL_DEVICE_HEALTH_STATUS_CRITICAL";
        self
    }

    pub fn model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn address(mut self, address: &str) -> Self {
        self.address = address.to_string();
        self
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn context(mut self, name: &str, is_default: bool) -> Self {
        self.contexts.push((name.to_string(), is_default));
        self
    }

    pub fn build(&self) -> Value {
        let contexts: Vec<Value> = self
            .contexts
            .iter()
            .enumerate()
            .map(|(i, (name, is_default))| {
                json!({ "id": format!("vc-{}", i + 1), "name": name, "isDefault": is_default })
            })
            .collect();

        let last_connected = Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();

        let mut device = json!({
            "id": self.id,
            "name": self.name,
            "description": format!("{} fixture", self.name),
            "model": self.model,
            "serialNumber": format!("SN-{}", self.id),
            "connectionState": self.connection_state,
            "address": self.address,
            "lastConnectedAt": last_connected,
            "softwareVersion": self.version,
            "productVersion": "",
            "healthStatus": self.health,
            "logicalDevice": {
                "id": self.logical_id,
                "name": self.logical_name,
                "topologyType": self.topology,
                "virtualContexts": contexts,
            }
        });

        if let Some((role, priority)) = self.role {
            device["asNode"] = json!({
                "priority": priority,
                "role": role,
                "syncLinkIp": "169.254.0.1",
                "syncLinkPort": 7000,
            });
        }
        device
    }
}

/// Full `ListPhysicalDevices` response body.
pub fn device_list(devices: Vec<DeviceFixture>) -> Value {
    let entries: Vec<Value> = devices.iter().map(DeviceFixture::build).collect();
    json!({ "total": entries.len(), "physicalDevices": entries })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_shape() {
        let device = DeviceFixture::new("pd-1", "fw", "L1", "edge")
            .clustered()
            .standby(3)
            .context("root", true)
            .build();
        assert_eq!(device["logicalDevice"]["topologyType"], "TOPOLOGY_TYPE_ACTIVE_STANDBY");
        assert_eq!(device["asNode"]["role"], "ACTIVE_STANDBY_ROLE_STANDBY");
        assert_eq!(device["asNode"]["priority"], 3);
        assert_eq!(device["logicalDevice"]["virtualContexts"][0]["isDefault"], true);

        let standalone = DeviceFixture::new("pd-2", "fw2", "L2", "x").build();
        assert!(standalone.get("asNode").is_none());
    }

    #[test]
    fn test_device_list_total() {
        let list = device_list(vec![
            DeviceFixture::new("a", "a", "L", "l"),
            DeviceFixture::new("b", "b", "L", "l"),
        ]);
        assert_eq!(list["total"], 2);
        assert_eq!(list["physicalDevices"].as_array().map(Vec::len), Some(2));
    }
}
