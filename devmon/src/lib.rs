//! devmon - full-screen monitor for physical devices behind a management API
//!
//! The binary logs in, polls `ListPhysicalDevices` on a fixed interval and
//! redraws a dashboard grouping physical devices by logical device.

pub mod client;
pub mod config;
pub mod display;
pub mod error;
pub mod grouping;
pub mod models;
pub mod retry;
pub mod scheduler;

pub use client::{DeviceSource, SessionClient};
pub use config::{Command, MonitorConfig};
pub use error::{MonitorError, Result};
pub use grouping::{group, DeviceGroup, GroupedView};
pub use retry::RetryPolicy;
pub use scheduler::{Scheduler, SchedulerHandle, SchedulerState};
