//! Grouping of the flat device inventory by logical device
//!
//! Members keep fetch order. Display order (by logical-device name) is applied
//! by the layout engine, not here.

use crate::models::{LogicalDevice, NodeRole, PhysicalDevice};
use chrono::{DateTime, Local};
use std::collections::HashMap;

/// One logical device and the physical devices mapped to it
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceGroup {
    pub logical_device: LogicalDevice,
    pub members: Vec<PhysicalDevice>,
    pub is_cluster: bool,
    /// Index into `members` of the first active node (clusters only)
    pub active: Option<usize>,
    /// Indices into `members` of standby nodes (clusters only)
    pub standby: Vec<usize>,
}

impl DeviceGroup {
    pub fn active_node(&self) -> Option<&PhysicalDevice> {
        self.active.map(|index| &self.members[index])
    }

    pub fn standby_nodes(&self) -> impl Iterator<Item = &PhysicalDevice> {
        self.standby.iter().map(|&index| &self.members[index])
    }
}

/// Snapshot of the inventory grouped for display
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedView {
    pub groups: Vec<DeviceGroup>,
    pub total_devices: usize,
    pub fetched_at: DateTime<Local>,
}

impl GroupedView {
    /// Groups ordered by logical-device name, ascending and case-sensitive.
    pub fn sorted_groups(&self) -> Vec<&DeviceGroup> {
        let mut groups: Vec<&DeviceGroup> = self.groups.iter().collect();
        groups.sort_by(|a, b| a.logical_device.name.cmp(&b.logical_device.name));
        groups
    }
}

/// Partition devices by logical-device id, in order of first appearance.
pub fn group(devices: &[PhysicalDevice]) -> GroupedView {
    group_at(devices, Local::now())
}

pub fn group_at(devices: &[PhysicalDevice], fetched_at: DateTime<Local>) -> GroupedView {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<DeviceGroup> = Vec::new();

    for device in devices {
        let slot = *index.entry(device.logical_device_id()).or_insert_with(|| {
            groups.push(DeviceGroup {
                logical_device: device.logical_device.clone(),
                members: Vec::new(),
                is_cluster: false,
                active: None,
                standby: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].members.push(device.clone());
    }

    for group in &mut groups {
        group.is_cluster = group.logical_device.topology_type.is_cluster();
        if !group.is_cluster {
            continue;
        }
        for (i, member) in group.members.iter().enumerate() {
            match member.role() {
                Some(NodeRole::Active) if group.active.is_none() => group.active = Some(i),
                Some(NodeRole::Standby) => group.standby.push(i),
                _ => {}
            }
        }
    }

    GroupedView {
        groups,
        total_devices: devices.len(),
        fetched_at,
    }
}
