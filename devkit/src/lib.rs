/*!
# devmon DevKit - test doubles for the device monitor

Helpers for exercising the monitor without a real management appliance:
- `StubManagementApi`: local HTTP server speaking the `Login` /
  `ListPhysicalDevices` protocol, with scripted replies and session expiry
- JSON fixture builders for physical devices
- Output capture and polling helpers for async tests
*/

pub mod fixtures;
pub mod stub_api;
pub mod test_utils;

pub use fixtures::{device_list, DeviceFixture};
pub use stub_api::{CookieName, StubManagementApi};
pub use test_utils::{init_logging, wait_until, SharedBuffer};
