//! Device list and selection state
//!
//! Owns the device list, the current selection, and the cached detail
//! record for the selected device, and keeps them fresh through a
//! recurring poll. Nothing else mutates this state.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use dbench_core::prelude::*;
use dbench_core::{ConsoleLog, Device, UNKNOWN_PROPERTY};
use dbench_rpc::Backend;

/// Default polling period for the device monitor
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 5000;

#[derive(Default)]
struct DeviceState {
    devices: Vec<Device>,
    current: Option<String>,
    info: Option<Device>,
}

/// Clears the loading flag on every exit path, panics included.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Client-side device state with a polling monitor.
///
/// All methods take `&self`; state lives behind short-lived locks that
/// are never held across awaits. Overlapping refreshes are collapsed by
/// the loading flag rather than queued.
pub struct DeviceStore<B> {
    backend: Arc<B>,
    console: Arc<ConsoleLog>,
    state: Mutex<DeviceState>,
    loading: AtomicBool,
    connected: AtomicBool,
    refresh_interval_ms: AtomicU64,
    monitor: Mutex<Option<JoinHandle<()>>>,
    /// Handle to ourselves for the tasks we spawn
    weak: Weak<DeviceStore<B>>,
}

impl<B: Backend + Sync + 'static> DeviceStore<B> {
    pub fn new(backend: Arc<B>, console: Arc<ConsoleLog>, refresh_interval_ms: u64) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            backend,
            console,
            state: Mutex::new(DeviceState::default()),
            loading: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            refresh_interval_ms: AtomicU64::new(refresh_interval_ms.max(1)),
            monitor: Mutex::new(None),
            weak: weak.clone(),
        })
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn devices(&self) -> Vec<Device> {
        self.lock_state().devices.clone()
    }

    pub fn current_device(&self) -> Option<String> {
        self.lock_state().current.clone()
    }

    pub fn device_info(&self) -> Option<Device> {
        self.lock_state().info.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn refresh_interval_ms(&self) -> u64 {
        self.refresh_interval_ms.load(Ordering::SeqCst)
    }

    pub fn is_monitoring(&self) -> bool {
        self.lock_monitor().is_some()
    }

    // ── Refresh ──────────────────────────────────────────────────────

    /// Fetch the device list and reconcile the selection.
    ///
    /// No-op while another refresh is in flight, so timer ticks and
    /// manual triggers never issue overlapping fetches. Failures are
    /// logged and degrade nothing but the console.
    pub async fn refresh_devices(&self) {
        if self.loading.swap(true, Ordering::SeqCst) {
            return;
        }
        let _guard = LoadingGuard(&self.loading);

        let list = match self.backend.get_devices().await {
            Ok(list) => list,
            Err(e) => {
                debug!("Device refresh failed: {e}");
                self.console.error(format!("Failed to refresh devices: {e}"));
                return;
            }
        };

        self.connected.store(!list.is_empty(), Ordering::SeqCst);

        let needs_info_refresh = {
            let mut state = self.lock_state();
            state.devices = list;

            let still_present = state
                .current
                .as_ref()
                .map(|serial| state.devices.iter().any(|d| &d.serial == serial))
                .unwrap_or(false);

            if state.current.is_some() && !still_present {
                // Selected device went away: fall over to the first
                // remaining device, or clear everything.
                match state.devices.first() {
                    Some(first) => {
                        state.current = Some(first.serial.clone());
                        true
                    }
                    None => {
                        state.current = None;
                        state.info = None;
                        false
                    }
                }
            } else if state.current.is_none() && !state.devices.is_empty() {
                state.current = Some(state.devices[0].serial.clone());
                true
            } else {
                false
            }
        };

        if needs_info_refresh {
            self.refresh_device_info().await;
        }
    }

    /// Fetch model, brand, and Android version for the selected device.
    ///
    /// The three property reads run concurrently; each one degrades to an
    /// empty value on its own failure so the others still land.
    pub async fn refresh_device_info(&self) {
        let Some(serial) = self.current_device() else {
            self.lock_state().info = None;
            return;
        };

        let (model, brand, android) = tokio::join!(
            self.fetch_prop(&serial, "ro.product.model"),
            self.fetch_prop(&serial, "ro.product.brand"),
            self.fetch_prop(&serial, "ro.build.version.release"),
        );

        let info = Device {
            serial,
            status: "device".to_string(),
            model: Some(presentable(model)),
            brand: Some(presentable(brand)),
            android: Some(presentable(android)),
        };

        self.lock_state().info = Some(info);
    }

    async fn fetch_prop(&self, serial: &str, prop: &str) -> String {
        match self
            .backend
            .adb_shell(&format!("getprop {prop}"), Some(serial))
            .await
        {
            Ok(output) => output,
            Err(e) => {
                debug!("getprop {prop} failed for {serial}: {e}");
                String::new()
            }
        }
    }

    // ── Selection ────────────────────────────────────────────────────

    /// Change the current selection; redundant reselection is a no-op so
    /// it never re-fetches detail info. The detail refresh runs in the
    /// background without blocking the caller.
    pub fn select_device(&self, serial: &str) {
        {
            let mut state = self.lock_state();
            if state.current.as_deref() == Some(serial) {
                return;
            }
            state.current = Some(serial.to_string());
        }

        let store = self.shared();
        tokio::spawn(async move {
            store.refresh_device_info().await;
        });
    }

    // ── Monitor lifecycle ────────────────────────────────────────────

    /// Start the polling monitor: one immediate refresh, then a fixed
    /// period at the current interval. No-op if already running.
    pub fn start_monitor(&self) {
        let mut monitor = self.lock_monitor();
        if monitor.is_some() {
            return;
        }
        *monitor = Some(self.spawn_monitor());
    }

    /// Cancel the polling monitor. Safe to call when not running. A
    /// request already sent to the daemon still runs there; only the
    /// client side stops.
    pub fn stop_monitor(&self) {
        if let Some(handle) = self.lock_monitor().take() {
            handle.abort();
        }
    }

    /// Update the polling period. A running monitor is stopped and
    /// restarted under the same lock so the new interval takes effect
    /// immediately and no two timers ever coexist.
    pub fn set_refresh_interval_ms(&self, ms: u64) {
        self.refresh_interval_ms.store(ms.max(1), Ordering::SeqCst);

        let mut monitor = self.lock_monitor();
        if let Some(handle) = monitor.take() {
            handle.abort();
            *monitor = Some(self.spawn_monitor());
        }
    }

    fn spawn_monitor(&self) -> JoinHandle<()> {
        let store = self.shared();
        let period = Duration::from_millis(self.refresh_interval_ms());

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                // First tick completes immediately.
                ticker.tick().await;
                store.refresh_devices().await;
            }
        })
    }

    // ── Internals ────────────────────────────────────────────────────

    fn shared(&self) -> Arc<Self> {
        // Methods only run through the Arc this store was created in, so
        // the upgrade cannot fail while we are borrowed.
        self.weak.upgrade().expect("device store dropped")
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, DeviceState> {
        self.state.lock().expect("device state lock poisoned")
    }

    fn lock_monitor(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.monitor.lock().expect("monitor lock poisoned")
    }
}

/// Trimmed property value, or the placeholder when nothing usable came back
fn presentable(raw: String) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        UNKNOWN_PROPERTY.to_string()
    } else {
        trimmed.to_string()
    }
}
