//! Backend capability surface
//!
//! [`Backend`] has one method per operation the backend daemon exposes;
//! it is the seam the stores depend on, so a test double can stand in for
//! the whole daemon. [`RpcBackend`] is the production implementation: a
//! stateless mapping of each operation onto the generic
//! `invoke(name, params)` mechanism. It forwards results and failures
//! unchanged, except `adb_connect`, which wraps the call in a bounded
//! retry.

use std::time::Duration;

use serde_json::{json, Value};

use dbench_core::prelude::*;
use dbench_core::Device;

use crate::invoke::{retry_with_delay, InvokeClient};

/// Total attempts for `adb_connect` (one call plus two retries)
pub const CONNECT_ATTEMPTS: u32 = 3;

/// Fixed pause between `adb_connect` attempts
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Operation catalog of the backend daemon.
///
/// Returned strings are the raw tool output; callers decide how much of
/// it to surface. `device` selects a serial when several devices are
/// attached; `None` lets the backend pick the only one.
#[trait_variant::make(Backend: Send)]
pub trait LocalBackend {
    /// Enumerate attached devices (summary rows: serial + status)
    async fn get_devices(&self) -> Result<Vec<Device>>;

    async fn adb_shell(&self, cmd: &str, device: Option<&str>) -> Result<String>;
    async fn adb_install(&self, apk_path: &str, device: Option<&str>) -> Result<String>;
    async fn adb_uninstall(&self, package: &str, device: Option<&str>) -> Result<String>;
    async fn adb_push(&self, local: &str, remote: &str, device: Option<&str>) -> Result<String>;
    async fn adb_pull(&self, remote: &str, local: &str, device: Option<&str>) -> Result<String>;
    async fn adb_reboot(&self, mode: Option<&str>, device: Option<&str>) -> Result<String>;
    /// Connect to a device over the network; the only retried operation
    async fn adb_connect(&self, address: &str) -> Result<String>;
    async fn adb_disconnect(&self, address: Option<&str>) -> Result<String>;
    async fn extract_apk(
        &self,
        package: &str,
        output_dir: &str,
        device: Option<&str>,
    ) -> Result<String>;
    async fn adb_sideload(&self, ota_path: &str, device: Option<&str>) -> Result<String>;
    async fn start_logcat(&self, device: Option<&str>) -> Result<String>;
    async fn clear_logcat(&self, device: Option<&str>) -> Result<String>;
    async fn take_screenshot(&self, device: Option<&str>, output_dir: Option<&str>)
        -> Result<String>;
    async fn start_record(&self, device: Option<&str>, output_dir: Option<&str>) -> Result<String>;

    async fn fastboot_devices(&self) -> Result<String>;
    async fn fastboot_flash(&self, partition: &str, image_path: &str) -> Result<String>;
    async fn fastboot_reboot(&self, mode: Option<&str>) -> Result<String>;
    async fn fastboot_unlock(&self) -> Result<String>;
    async fn fastboot_get_var(&self, var: &str) -> Result<String>;
    async fn fastboot_set_active(&self, slot: &str) -> Result<String>;
    async fn fastboot_erase(&self, partition: &str) -> Result<String>;

    /// Resolve the output root directory next to the backend installation
    async fn get_data_dir(&self) -> Result<String>;
    /// Create a directory (and parents) if missing
    async fn ensure_dir(&self, path: &str) -> Result<()>;
}

/// Production [`Backend`]: forwards every operation to the daemon through
/// an [`InvokeClient`].
#[derive(Debug, Clone)]
pub struct RpcBackend {
    client: InvokeClient,
}

impl RpcBackend {
    pub fn new(client: InvokeClient) -> Self {
        Self { client }
    }

    async fn invoke_string(&self, method: &str, params: Value) -> Result<String> {
        expect_string(self.client.invoke(method, params).await?)
    }
}

/// Backend results for tool operations are strings; tolerate `null` from
/// operations with nothing to say.
fn expect_string(value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        other => Err(Error::protocol(format!(
            "expected string result, got: {other}"
        ))),
    }
}

impl Backend for RpcBackend {
    async fn get_devices(&self) -> Result<Vec<Device>> {
        let value = self.client.invoke("get_devices", json!({})).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn adb_shell(&self, cmd: &str, device: Option<&str>) -> Result<String> {
        self.invoke_string("adb_shell", json!({ "cmd": cmd, "device": device }))
            .await
    }

    async fn adb_install(&self, apk_path: &str, device: Option<&str>) -> Result<String> {
        self.invoke_string("adb_install", json!({ "apkPath": apk_path, "device": device }))
            .await
    }

    async fn adb_uninstall(&self, package: &str, device: Option<&str>) -> Result<String> {
        self.invoke_string("adb_uninstall", json!({ "package": package, "device": device }))
            .await
    }

    async fn adb_push(&self, local: &str, remote: &str, device: Option<&str>) -> Result<String> {
        self.invoke_string(
            "adb_push",
            json!({ "local": local, "remote": remote, "device": device }),
        )
        .await
    }

    async fn adb_pull(&self, remote: &str, local: &str, device: Option<&str>) -> Result<String> {
        self.invoke_string(
            "adb_pull",
            json!({ "remote": remote, "local": local, "device": device }),
        )
        .await
    }

    async fn adb_reboot(&self, mode: Option<&str>, device: Option<&str>) -> Result<String> {
        self.invoke_string("adb_reboot", json!({ "mode": mode, "device": device }))
            .await
    }

    async fn adb_connect(&self, address: &str) -> Result<String> {
        let value = retry_with_delay(CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY, || {
            self.client.invoke("adb_connect", json!({ "address": address }))
        })
        .await?;
        expect_string(value)
    }

    async fn adb_disconnect(&self, address: Option<&str>) -> Result<String> {
        self.invoke_string("adb_disconnect", json!({ "address": address }))
            .await
    }

    async fn extract_apk(
        &self,
        package: &str,
        output_dir: &str,
        device: Option<&str>,
    ) -> Result<String> {
        self.invoke_string(
            "extract_apk",
            json!({ "package": package, "outputDir": output_dir, "device": device }),
        )
        .await
    }

    async fn adb_sideload(&self, ota_path: &str, device: Option<&str>) -> Result<String> {
        self.invoke_string("adb_sideload", json!({ "otaPath": ota_path, "device": device }))
            .await
    }

    async fn start_logcat(&self, device: Option<&str>) -> Result<String> {
        self.invoke_string("start_logcat", json!({ "device": device }))
            .await
    }

    async fn clear_logcat(&self, device: Option<&str>) -> Result<String> {
        self.invoke_string("clear_logcat", json!({ "device": device }))
            .await
    }

    async fn take_screenshot(
        &self,
        device: Option<&str>,
        output_dir: Option<&str>,
    ) -> Result<String> {
        self.invoke_string(
            "take_screenshot",
            json!({ "device": device, "outputDir": output_dir }),
        )
        .await
    }

    async fn start_record(&self, device: Option<&str>, output_dir: Option<&str>) -> Result<String> {
        self.invoke_string(
            "start_record",
            json!({ "device": device, "outputDir": output_dir }),
        )
        .await
    }

    async fn fastboot_devices(&self) -> Result<String> {
        self.invoke_string("fastboot_devices", json!({})).await
    }

    async fn fastboot_flash(&self, partition: &str, image_path: &str) -> Result<String> {
        self.invoke_string(
            "fastboot_flash",
            json!({ "partition": partition, "imagePath": image_path }),
        )
        .await
    }

    async fn fastboot_reboot(&self, mode: Option<&str>) -> Result<String> {
        self.invoke_string("fastboot_reboot", json!({ "mode": mode }))
            .await
    }

    async fn fastboot_unlock(&self) -> Result<String> {
        self.invoke_string("fastboot_unlock", json!({})).await
    }

    async fn fastboot_get_var(&self, var: &str) -> Result<String> {
        self.invoke_string("fastboot_get_var", json!({ "var": var }))
            .await
    }

    async fn fastboot_set_active(&self, slot: &str) -> Result<String> {
        self.invoke_string("fastboot_set_active", json!({ "slot": slot }))
            .await
    }

    async fn fastboot_erase(&self, partition: &str) -> Result<String> {
        self.invoke_string("fastboot_erase", json!({ "partition": partition }))
            .await
    }

    async fn get_data_dir(&self) -> Result<String> {
        self.invoke_string("get_data_dir", json!({})).await
    }

    async fn ensure_dir(&self, path: &str) -> Result<()> {
        self.client.invoke("ensure_dir", json!({ "path": path })).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Backend, RpcBackend};
    use dbench_core::prelude::*;
    use serde_json::{json, Value};
    use std::time::Duration;
    use crate::invoke::{InvokeClient, RequestTracker};
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    /// Simulated daemon: records every request and answers through the
    /// given closure (call index, method, params) -> Ok(result)/Err(error).
    struct BackendSim {
        backend: RpcBackend,
        requests: Arc<Mutex<Vec<(String, Value)>>>,
    }

    fn backend_sim<F>(respond: F) -> BackendSim
    where
        F: Fn(usize, &str, &Value) -> std::result::Result<Value, Value> + Send + 'static,
    {
        let (stdin_tx, mut stdin_rx) = mpsc::channel::<String>(32);
        let tracker = Arc::new(RequestTracker::new());
        let requests: Arc<Mutex<Vec<(String, Value)>>> = Arc::new(Mutex::new(Vec::new()));

        let sim_tracker = tracker.clone();
        let sim_requests = requests.clone();
        tokio::spawn(async move {
            let mut call = 0usize;
            while let Some(line) = stdin_rx.recv().await {
                let parsed: Value = serde_json::from_str(&line).unwrap();
                let id = parsed["id"].as_u64().unwrap();
                let method = parsed["method"].as_str().unwrap().to_string();
                let params = parsed["params"].clone();

                sim_requests.lock().unwrap().push((method.clone(), params.clone()));

                let (result, error) = match respond(call, &method, &params) {
                    Ok(value) => (Some(value), None),
                    Err(err) => (None, Some(err)),
                };
                call += 1;

                sim_tracker.handle_response(id, result, error).await;
            }
        });

        BackendSim {
            backend: RpcBackend::new(InvokeClient::new(stdin_tx, tracker)),
            requests,
        }
    }

    #[tokio::test]
    async fn test_shell_maps_operation_and_args() {
        let sim = backend_sim(|_, _, _| Ok(json!("Pixel 8\n")));

        let out = sim
            .backend
            .adb_shell("getprop ro.product.model", Some("R5CT10XYZ"))
            .await
            .unwrap();
        assert_eq!(out, "Pixel 8\n");

        let requests = sim.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let (method, params) = &requests[0];
        assert_eq!(method, "adb_shell");
        assert_eq!(params["cmd"], "getprop ro.product.model");
        assert_eq!(params["device"], "R5CT10XYZ");
    }

    #[tokio::test]
    async fn test_omitted_device_is_null() {
        let sim = backend_sim(|_, _, _| Ok(json!("")));

        sim.backend.clear_logcat(None).await.unwrap();

        let requests = sim.requests.lock().unwrap();
        assert!(requests[0].1["device"].is_null());
    }

    #[tokio::test]
    async fn test_get_devices_parses_list() {
        let sim = backend_sim(|_, _, _| {
            Ok(json!([
                {"serial": "R5CT10XYZ", "status": "device"},
                {"serial": "emulator-5554", "status": "offline"},
            ]))
        });

        let devices = sim.backend.get_devices().await.unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].serial, "R5CT10XYZ");
        assert_eq!(devices[1].status, "offline");
    }

    #[tokio::test]
    async fn test_get_devices_malformed_list_is_error() {
        let sim = backend_sim(|_, _, _| Ok(json!({"not": "a list"})));

        let err = sim.backend.get_devices().await.unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[tokio::test]
    async fn test_install_camel_case_params() {
        let sim = backend_sim(|_, _, _| Ok(json!("Success")));

        sim.backend
            .adb_install("/tmp/app.apk", None)
            .await
            .unwrap();
        sim.backend
            .extract_apk("com.example", "/out", Some("serial-1"))
            .await
            .unwrap();
        sim.backend
            .fastboot_flash("boot", "/tmp/boot.img")
            .await
            .unwrap();

        let requests = sim.requests.lock().unwrap();
        assert_eq!(requests[0].1["apkPath"], "/tmp/app.apk");
        assert_eq!(requests[1].1["outputDir"], "/out");
        assert_eq!(requests[2].1["imagePath"], "/tmp/boot.img");
    }

    #[tokio::test]
    async fn test_ensure_dir_accepts_null_result() {
        let sim = backend_sim(|_, _, _| Ok(Value::Null));

        sim.backend.ensure_dir("/data/screenshots").await.unwrap();

        let requests = sim.requests.lock().unwrap();
        assert_eq!(requests[0].0, "ensure_dir");
        assert_eq!(requests[0].1["path"], "/data/screenshots");
    }

    #[tokio::test]
    async fn test_non_string_result_is_protocol_error() {
        let sim = backend_sim(|_, _, _| Ok(json!(42)));

        let err = sim.backend.fastboot_unlock().await.unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_retries_three_times_with_delay() {
        let sim = backend_sim(|_, _, _| Err(json!("cannot connect to 10.0.0.5:5555")));
        let start = tokio::time::Instant::now();

        let err = sim.backend.adb_connect("10.0.0.5:5555").await.unwrap_err();

        // Exactly 3 attempts, ~500ms apart, final error surfaced
        assert!(err.to_string().contains("cannot connect"));
        assert_eq!(start.elapsed(), Duration::from_millis(1000));
        let requests = sim.requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert!(requests.iter().all(|(method, _)| method == "adb_connect"));
        assert!(requests.iter().all(|(_, p)| p["address"] == "10.0.0.5:5555"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_stops_retrying_on_success() {
        let sim = backend_sim(|call, _, _| {
            if call == 0 {
                Err(json!("connection refused"))
            } else {
                Ok(json!("connected to 10.0.0.5:5555"))
            }
        });

        let out = sim.backend.adb_connect("10.0.0.5:5555").await.unwrap();
        assert!(out.contains("connected"));
        assert_eq!(sim.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_other_operations_do_not_retry() {
        let sim = backend_sim(|_, _, _| Err(json!("DELETE_FAILED_INTERNAL_ERROR")));

        let err = sim
            .backend
            .adb_uninstall("com.example", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("DELETE_FAILED_INTERNAL_ERROR"));
        assert_eq!(sim.requests.lock().unwrap().len(), 1);
    }
}
