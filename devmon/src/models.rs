//! Wire model of the management API
//!
//! Field names follow the JSON returned by `ListPhysicalDevices`; enum strings
//! map to typed variants and anything unknown falls back to `Unspecified`.

use serde::{Deserialize, Deserializer, Serialize};

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Response body of `ListPhysicalDevices`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceList {
    #[serde(default, deserialize_with = "null_as_default")]
    pub physical_devices: Vec<PhysicalDevice>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: i64,
}

/// Body of the `Login` request
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub login: &'a str,
    pub password: &'a str,
}

/// Body of the `ListPhysicalDevices` request
#[derive(Debug, Serialize)]
pub struct LimitRequest {
    pub limit: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhysicalDevice {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub model: String,
    #[serde(deserialize_with = "null_as_default")]
    pub serial_number: String,
    pub connection_state: ConnectionState,
    #[serde(deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(deserialize_with = "null_as_default")]
    pub last_connected_at: String,
    #[serde(deserialize_with = "null_as_default")]
    pub software_version: String,
    #[serde(deserialize_with = "null_as_default")]
    pub product_version: String,
    pub health_status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_node: Option<AsNode>,
    /// Owning logical device, embedded by the API. Grouping only relies on its id.
    #[serde(deserialize_with = "null_as_default")]
    pub logical_device: LogicalDevice,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogicalDevice {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    pub topology_type: TopologyType,
    #[serde(deserialize_with = "null_as_default")]
    pub virtual_contexts: Vec<VirtualContext>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VirtualContext {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub is_default: bool,
}

/// Cluster-node facet of a physical device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AsNode {
    #[serde(deserialize_with = "null_as_default")]
    pub priority: i32,
    pub role: NodeRole,
    #[serde(deserialize_with = "null_as_default")]
    pub sync_link_ip: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sync_link_port: u16,
}

/// Declares an enum backed by the API's string constants. Unknown strings
/// and `null` deserialize to `Unspecified`.
macro_rules! wire_enum {
    ($name:ident, $unspecified:literal, { $($variant:ident => $wire:literal $(| $alias:literal)*),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(from = "Option<String>", into = "&'static str")]
        pub enum $name {
            #[default]
            Unspecified,
            $($variant),+
        }

        impl $name {
            pub fn wire(self) -> &'static str {
                match self {
                    $name::Unspecified => $unspecified,
                    $($name::$variant => $wire),+
                }
            }
        }

        impl From<Option<String>> for $name {
            fn from(value: Option<String>) -> Self {
                match value.as_deref() {
                    $(Some($wire $(| $alias)*) => $name::$variant,)+
                    _ => $name::Unspecified,
                }
            }
        }

        impl From<$name> for &'static str {
            fn from(value: $name) -> Self {
                value.wire()
            }
        }
    };
}

wire_enum!(ConnectionState, "PHYSICAL_DEVICE_CONNECTION_STATE_UNSPECIFIED", {
    Connecting => "PHYSICAL_DEVICE_CONNECTION_STATE_CONNECTING",
    Connected => "PHYSICAL_DEVICE_CONNECTION_STATE_CONNECTED",
    Disconnected => "PHYSICAL_DEVICE_CONNECTION_STATE_DISCONNECTED",
});

wire_enum!(TopologyType, "TOPOLOGY_TYPE_UNSPECIFIED", {
    Standalone => "TOPOLOGY_TYPE_STANDALONE",
    ActiveStandby => "TOPOLOGY_TYPE_ACTIVE_STANDBY" | "TOPOLOGY_TYPE_CLUSTER",
});

wire_enum!(NodeRole, "ACTIVE_STANDBY_ROLE_UNSPECIFIED", {
    Active => "ACTIVE_STANDBY_ROLE_ACTIVE",
    Standby => "ACTIVE_STANDBY_ROLE_STANDBY",
});

wire_enum!(HealthStatus, "PHYSICAL_DEVICE_HEALTH_STATUS_UNSPECIFIED", {
    Healthy => "PHYSICAL_DEVICE_HEALTH_STATUS_HEALTHY",
    Warning => "PHYSICAL_DEVICE_HEALTH_STATUS_WARNING",
    Critical => "PHYSICAL_DEVICE_HEALTH_STATUS_CRITICAL",
});

impl ConnectionState {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Connected => "CONNECTED",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Disconnected => "DISCONNECTED",
            ConnectionState::Unspecified => "UNSPECIFIED",
        }
    }
}

impl TopologyType {
    pub fn label(self) -> &'static str {
        match self {
            TopologyType::Standalone => "STANDALONE",
            TopologyType::ActiveStandby => "ACTIVE_STANDBY",
            TopologyType::Unspecified => "UNSPECIFIED",
        }
    }

    pub fn is_cluster(self) -> bool {
        matches!(self, TopologyType::ActiveStandby)
    }
}

impl NodeRole {
    pub fn label(self) -> &'static str {
        match self {
            NodeRole::Active => "ACTIVE",
            NodeRole::Standby => "STANDBY",
            NodeRole::Unspecified => "UNSPECIFIED",
        }
    }
}

impl HealthStatus {
    pub fn label(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "HEALTHY",
            HealthStatus::Warning => "WARNING",
            HealthStatus::Critical => "CRITICAL",
            HealthStatus::Unspecified => "UNSPECIFIED",
        }
    }
}

impl PhysicalDevice {
    pub fn logical_device_id(&self) -> &str {
        &self.logical_device.id
    }

    /// Node role, `None` for devices that are not cluster members.
    pub fn role(&self) -> Option<NodeRole> {
        self.as_node.as_ref().map(|node| node.role)
    }

    pub fn version_label(&self) -> &str {
        if !self.product_version.is_empty() {
            &self.product_version
        } else if !self.software_version.is_empty() {
            &self.software_version
        } else {
            "-"
        }
    }
}

impl LogicalDevice {
    /// Virtual contexts as `name (default), other`
    pub fn contexts_label(&self) -> String {
        self.virtual_contexts
            .iter()
            .map(|vc| {
                if vc.is_default {
                    format!("{} (default)", vc.name)
                } else {
                    vc.name.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}
