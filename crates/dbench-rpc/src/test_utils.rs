//! Test utilities for the backend seam
//!
//! Provides device constructors and [`FakeBackend`], a scriptable
//! implementation of the [`Backend`](crate::Backend) trait so stores can
//! be tested without a daemon process.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use dbench_core::prelude::*;
use dbench_core::Device;

use crate::backend::Backend;

/// Creates a test device with the given connection status.
pub fn test_device(serial: &str, status: &str) -> Device {
    Device::summary(serial, status)
}

/// Creates a test device in the ready ("device") state.
pub fn online_device(serial: &str) -> Device {
    test_device(serial, "device")
}

#[derive(Default)]
struct FakeState {
    /// Scripted results for successive `get_devices` calls; `None`
    /// simulates a failure. When the queue is empty the last successful
    /// list is repeated.
    device_lists: VecDeque<Option<Vec<Device>>>,
    last_list: Vec<Device>,
    /// `getprop` name -> value served through `adb_shell`
    properties: HashMap<String, String>,
    failing_properties: HashSet<String>,
    data_dir: Option<String>,
    fail_data_dir: bool,
    failing_dirs: HashSet<String>,
    ensured_dirs: Vec<String>,
    devices_delay: Duration,
    /// Operations forced to fail regardless of other scripting
    failing_ops: HashSet<String>,
}

/// Scriptable stand-in for the backend daemon.
///
/// Every operation is counted by name, so tests can assert how many
/// fetches an interaction actually issued.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next `get_devices` call
    pub fn push_device_list(&self, list: Vec<Device>) {
        self.lock_state().device_lists.push_back(Some(list));
    }

    /// Queue a `get_devices` failure
    pub fn push_device_failure(&self) {
        self.lock_state().device_lists.push_back(None);
    }

    /// Delay every `get_devices` call, keeping the fetch in flight
    pub fn set_devices_delay(&self, delay: Duration) {
        self.lock_state().devices_delay = delay;
    }

    /// Serve `getprop <name>` with the given value
    pub fn set_property(&self, name: &str, value: &str) {
        self.lock_state()
            .properties
            .insert(name.to_string(), value.to_string());
    }

    /// Make `getprop <name>` fail
    pub fn fail_property(&self, name: &str) {
        self.lock_state()
            .failing_properties
            .insert(name.to_string());
    }

    pub fn set_data_dir(&self, path: &str) {
        self.lock_state().data_dir = Some(path.to_string());
    }

    pub fn fail_data_dir(&self) {
        self.lock_state().fail_data_dir = true;
    }

    /// Make `ensure_dir` fail for the given path
    pub fn fail_dir(&self, path: &str) {
        self.lock_state().failing_dirs.insert(path.to_string());
    }

    /// Force the named operation to fail
    pub fn fail_op(&self, op: &str) {
        self.lock_state().failing_ops.insert(op.to_string());
    }

    /// Paths `ensure_dir` was asked to create, in call order
    pub fn ensured_dirs(&self) -> Vec<String> {
        self.lock_state().ensured_dirs.clone()
    }

    /// Number of calls issued against the named operation
    pub fn calls(&self, op: &str) -> usize {
        *self
            .calls
            .lock()
            .expect("fake call counter poisoned")
            .get(op)
            .unwrap_or(&0)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake state poisoned")
    }

    fn record(&self, op: &str) -> Result<()> {
        *self
            .calls
            .lock()
            .expect("fake call counter poisoned")
            .entry(op.to_string())
            .or_insert(0) += 1;

        if self.lock_state().failing_ops.contains(op) {
            Err(Error::backend(format!("simulated {op} failure")))
        } else {
            Ok(())
        }
    }

    fn tool_output(&self, op: &str) -> Result<String> {
        self.record(op)?;
        Ok(String::new())
    }
}

impl Backend for FakeBackend {
    async fn get_devices(&self) -> Result<Vec<Device>> {
        self.record("get_devices")?;

        let delay = self.lock_state().devices_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock_state();
        match state.device_lists.pop_front() {
            Some(Some(list)) => {
                state.last_list = list.clone();
                Ok(list)
            }
            Some(None) => Err(Error::backend("simulated enumeration failure")),
            None => Ok(state.last_list.clone()),
        }
    }

    async fn adb_shell(&self, cmd: &str, _device: Option<&str>) -> Result<String> {
        self.record("adb_shell")?;

        let state = self.lock_state();
        let prop = cmd.strip_prefix("getprop ").map(str::trim);
        match prop {
            Some(name) if state.failing_properties.contains(name) => {
                Err(Error::backend(format!("getprop {name} failed")))
            }
            Some(name) => {
                let value = state.properties.get(name).cloned().unwrap_or_default();
                Ok(format!("{value}\n"))
            }
            None => Ok(String::new()),
        }
    }

    async fn adb_install(&self, _apk_path: &str, _device: Option<&str>) -> Result<String> {
        self.tool_output("adb_install")
    }

    async fn adb_uninstall(&self, _package: &str, _device: Option<&str>) -> Result<String> {
        self.tool_output("adb_uninstall")
    }

    async fn adb_push(&self, _local: &str, _remote: &str, _device: Option<&str>) -> Result<String> {
        self.tool_output("adb_push")
    }

    async fn adb_pull(&self, _remote: &str, _local: &str, _device: Option<&str>) -> Result<String> {
        self.tool_output("adb_pull")
    }

    async fn adb_reboot(&self, _mode: Option<&str>, _device: Option<&str>) -> Result<String> {
        self.tool_output("adb_reboot")
    }

    async fn adb_connect(&self, _address: &str) -> Result<String> {
        self.tool_output("adb_connect")
    }

    async fn adb_disconnect(&self, _address: Option<&str>) -> Result<String> {
        self.tool_output("adb_disconnect")
    }

    async fn extract_apk(
        &self,
        _package: &str,
        _output_dir: &str,
        _device: Option<&str>,
    ) -> Result<String> {
        self.tool_output("extract_apk")
    }

    async fn adb_sideload(&self, _ota_path: &str, _device: Option<&str>) -> Result<String> {
        self.tool_output("adb_sideload")
    }

    async fn start_logcat(&self, _device: Option<&str>) -> Result<String> {
        self.tool_output("start_logcat")
    }

    async fn clear_logcat(&self, _device: Option<&str>) -> Result<String> {
        self.tool_output("clear_logcat")
    }

    async fn take_screenshot(
        &self,
        _device: Option<&str>,
        _output_dir: Option<&str>,
    ) -> Result<String> {
        self.tool_output("take_screenshot")
    }

    async fn start_record(
        &self,
        _device: Option<&str>,
        _output_dir: Option<&str>,
    ) -> Result<String> {
        self.tool_output("start_record")
    }

    async fn fastboot_devices(&self) -> Result<String> {
        self.tool_output("fastboot_devices")
    }

    async fn fastboot_flash(&self, _partition: &str, _image_path: &str) -> Result<String> {
        self.tool_output("fastboot_flash")
    }

    async fn fastboot_reboot(&self, _mode: Option<&str>) -> Result<String> {
        self.tool_output("fastboot_reboot")
    }

    async fn fastboot_unlock(&self) -> Result<String> {
        self.tool_output("fastboot_unlock")
    }

    async fn fastboot_get_var(&self, _var: &str) -> Result<String> {
        self.tool_output("fastboot_get_var")
    }

    async fn fastboot_set_active(&self, _slot: &str) -> Result<String> {
        self.tool_output("fastboot_set_active")
    }

    async fn fastboot_erase(&self, _partition: &str) -> Result<String> {
        self.tool_output("fastboot_erase")
    }

    async fn get_data_dir(&self) -> Result<String> {
        self.record("get_data_dir")?;

        let state = self.lock_state();
        if state.fail_data_dir {
            return Err(Error::backend("simulated data dir failure"));
        }
        Ok(state
            .data_dir
            .clone()
            .unwrap_or_else(|| "/fake/data".to_string()))
    }

    async fn ensure_dir(&self, path: &str) -> Result<()> {
        self.record("ensure_dir")?;

        let mut state = self.lock_state();
        state.ensured_dirs.push(path.to_string());
        if state.failing_dirs.contains(path) {
            Err(Error::backend(format!("cannot create {path}")))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_serves_queued_lists_then_repeats_last() {
        let fake = FakeBackend::new();
        fake.push_device_list(vec![online_device("a")]);
        fake.push_device_list(vec![online_device("a"), online_device("b")]);

        assert_eq!(fake.get_devices().await.unwrap().len(), 1);
        assert_eq!(fake.get_devices().await.unwrap().len(), 2);
        // Queue drained: last list repeats
        assert_eq!(fake.get_devices().await.unwrap().len(), 2);
        assert_eq!(fake.calls("get_devices"), 3);
    }

    #[tokio::test]
    async fn test_fake_scripted_failure() {
        let fake = FakeBackend::new();
        fake.push_device_failure();

        assert!(fake.get_devices().await.is_err());
    }

    #[tokio::test]
    async fn test_fake_properties() {
        let fake = FakeBackend::new();
        fake.set_property("ro.product.model", "Pixel 8");
        fake.fail_property("ro.product.brand");

        let model = fake
            .adb_shell("getprop ro.product.model", Some("a"))
            .await
            .unwrap();
        assert_eq!(model, "Pixel 8\n");

        assert!(fake
            .adb_shell("getprop ro.product.brand", Some("a"))
            .await
            .is_err());

        // Unknown properties come back empty, like a real getprop
        let missing = fake.adb_shell("getprop ro.missing", None).await.unwrap();
        assert_eq!(missing, "\n");
    }

    #[tokio::test]
    async fn test_fake_fail_op_and_counters() {
        let fake = FakeBackend::new();
        fake.fail_op("adb_connect");

        assert!(fake.adb_connect("10.0.0.5:5555").await.is_err());
        assert!(fake.adb_connect("10.0.0.5:5555").await.is_err());
        assert_eq!(fake.calls("adb_connect"), 2);
        assert_eq!(fake.calls("adb_shell"), 0);
    }

    #[tokio::test]
    async fn test_fake_ensure_dir_records_paths() {
        let fake = FakeBackend::new();
        fake.fail_dir("/data/bad");

        fake.ensure_dir("/data/good").await.unwrap();
        assert!(fake.ensure_dir("/data/bad").await.is_err());

        assert_eq!(fake.ensured_dirs(), vec!["/data/good", "/data/bad"]);
    }
}
