//! Test doubles for the substrate, transfers and the config server

use crate::artifact::{ArtifactFetcher, ArtifactTransfer};
use crate::config::schema::SubstrateConfig;
use crate::error::{MastersError, MastersResult};
use crate::orchestration::{
    BuildSettings, MachineHandle, MachineLookup, MasterBuilder, MasterSpec, StagedArtifacts,
    Substrate, VBoxManage,
};
use crate::preseed::ConfigServer;
use crate::registry::BuildRecipe;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Recipe for `id` with an ISO under `http://mirror.example.com/`
pub fn recipe(id: &str) -> BuildRecipe {
    toml::from_str(&format!(
        r#"
        id = "{id}"
        name = "{id}"
        os_family = "ubuntu"
        os_version = "11.04"
        os_64bit = true
        os_type_id = "Ubuntu_64"
        iso = "http://mirror.example.com/{id}.iso"
        preseed_cfg = "d-i netcfg/get_hostname string {id}"
        "#
    ))
    .expect("test recipe parses")
}

/// Transfer that writes a small file instead of downloading
#[derive(Default)]
pub struct FakeTransfer {
    urls: Mutex<Vec<String>>,
    produce_nothing: bool,
}

impl FakeTransfer {
    /// Reports success without writing the destination
    pub fn producing_nothing() -> Self {
        Self {
            produce_nothing: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.urls.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactTransfer for FakeTransfer {
    async fn fetch(&self, url: &str, destination: &Path) -> MastersResult<PathBuf> {
        self.urls.lock().unwrap().push(url.to_string());
        tokio::task::yield_now().await;
        if !self.produce_nothing {
            tokio::fs::write(destination, url.as_bytes())
                .await
                .map_err(|e| MastersError::io("fake transfer", e))?;
        }
        Ok(destination.to_path_buf())
    }
}

/// Config server that only records its lifecycle
#[derive(Default)]
pub struct FakeConfigServer {
    starts: AtomicUsize,
    stops: AtomicUsize,
    running: AtomicBool,
    content: Mutex<Option<String>>,
    fail_start: bool,
}

impl FakeConfigServer {
    /// Refuses every start
    pub fn failing() -> Self {
        Self {
            fail_start: true,
            ..Default::default()
        }
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn last_content(&self) -> Option<String> {
        self.content.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConfigServer for FakeConfigServer {
    async fn start(&self, base_url: &str, content: &str) -> MastersResult<()> {
        if self.fail_start {
            return Err(MastersError::ConfigServer(format!(
                "cannot listen for {}",
                base_url
            )));
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(MastersError::ConfigServer("already running".to_string()));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        *self.content.lock().unwrap() = Some(content.to_string());
        Ok(())
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }
}

/// In-memory substrate
#[derive(Default)]
pub struct FakeSubstrate {
    machines: Mutex<HashMap<String, MachineHandle>>,
    lookup_failure: Option<String>,
    create_failure: Mutex<Option<String>>,
    created: Mutex<Vec<MasterSpec>>,
    lookups: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeSubstrate {
    /// Substrate that already has a machine called `name`
    pub fn with_machine(name: &str) -> Self {
        let substrate = Self::default();
        substrate.insert_machine(MachineHandle {
            id: format!("{}-id", name),
            name: name.to_string(),
        });
        substrate
    }

    /// Every lookup fails with `reason`
    pub fn failing_lookup(reason: &str) -> Self {
        Self {
            lookup_failure: Some(reason.to_string()),
            ..Default::default()
        }
    }

    /// Every create fails with `reason` until cleared
    pub fn failing_create(reason: &str) -> Self {
        Self {
            create_failure: Mutex::new(Some(reason.to_string())),
            ..Default::default()
        }
    }

    pub fn clear_create_failure(&self) {
        *self.create_failure.lock().unwrap() = None;
    }

    pub fn insert_machine(&self, handle: MachineHandle) {
        self.machines
            .lock()
            .unwrap()
            .insert(handle.name.clone(), handle);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Number of create attempts, failed ones included
    pub fn creates(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn created_specs(&self) -> Vec<MasterSpec> {
        self.created.lock().unwrap().clone()
    }

    /// Highest number of creates observed running at once
    pub fn max_concurrent_creates(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Substrate for FakeSubstrate {
    async fn find_machine(&self, name: &str) -> MachineLookup {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.lookup_failure {
            return MachineLookup::Failed(reason.clone());
        }
        match self.machines.lock().unwrap().get(name) {
            Some(handle) => MachineLookup::Found(handle.clone()),
            None => MachineLookup::NotFound,
        }
    }

    async fn create_and_install(&self, spec: &MasterSpec) -> MastersResult<MachineHandle> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        self.created.lock().unwrap().push(spec.clone());

        tokio::time::sleep(Duration::from_millis(10)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let failure = self.create_failure.lock().unwrap().clone();
        if let Some(reason) = failure {
            return Err(MastersError::command_exec("VBoxManage startvm", reason));
        }

        let handle = MachineHandle {
            id: uuid::Uuid::new_v4().to_string(),
            name: spec.vm.name.clone(),
        };
        self.insert_machine(handle.clone());
        Ok(handle)
    }

    fn substrate_name(&self) -> &'static str {
        "fake"
    }
}

/// Stateful stand-in for the `VBoxManage` binary.
///
/// Every invocation is appended to `state/calls.log`. A registered machine
/// is a `state/vm-<name>` file holding its VMState; `startvm` sets it to
/// `running` and the next `showvminfo` moves it to the install outcome.
#[cfg(unix)]
const FAKE_VBOXMANAGE: &str = r#"#!/bin/sh
state="$(dirname "$0")/state"
echo "$*" >> "$state/calls.log"
case "$1" in
  --version)
    echo "7.0.14r161095"
    ;;
  showvminfo)
    if [ -f "$state/lookup-error" ]; then
      cat "$state/lookup-error" >&2
      exit 1
    fi
    if [ ! -f "$state/vm-$2" ]; then
      echo "VBoxManage: error: Could not find a registered machine named '$2'" >&2
      echo "VBoxManage: error: Details: code VBOX_E_OBJECT_NOT_FOUND (0x80bb0001)" >&2
      exit 1
    fi
    vmstate=$(cat "$state/vm-$2")
    echo "name=\"$2\""
    echo "UUID=\"7c1e6b4a-5d0b-4a43-9a43-5f4f0f1c3e21\""
    echo "VMState=\"$vmstate\""
    if [ "$vmstate" = "running" ]; then
      cp "$state/install-outcome" "$state/vm-$2"
    fi
    ;;
  createvm)
    echo poweroff > "$state/vm-$3"
    ;;
  startvm)
    if [ -f "$state/startvm-error" ]; then
      cat "$state/startvm-error" >&2
      exit 1
    fi
    echo running > "$state/vm-$2"
    ;;
  unregistervm)
    rm -f "$state/vm-$2"
    ;;
esac
exit 0
"#;

/// Temp directory holding an executable fake `VBoxManage`
#[cfg(unix)]
pub struct FakeVBoxManage {
    dir: TempDir,
}

#[cfg(unix)]
impl FakeVBoxManage {
    pub fn new() -> Self {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("state")).unwrap();
        std::fs::write(dir.path().join("state/install-outcome"), "poweroff\n").unwrap();

        let binary = dir.path().join("VBoxManage");
        std::fs::write(&binary, FAKE_VBOXMANAGE).unwrap();
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();

        Self { dir }
    }

    /// Driver pointed at the fake binary, polling once a second
    pub fn substrate(&self) -> VBoxManage {
        VBoxManage::new(&SubstrateConfig {
            vboxmanage: self.dir.path().join("VBoxManage").display().to_string(),
            version: Some("7.0.14r161095".to_string()),
            install_poll_secs: 1,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn state(&self, file: &str) -> PathBuf {
        self.dir.path().join("state").join(file)
    }

    /// Register `name` in `vm_state`
    pub fn register(&self, name: &str, vm_state: &str) {
        std::fs::write(self.state(&format!("vm-{}", name)), format!("{}\n", vm_state)).unwrap();
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.state(&format!("vm-{}", name)).exists()
    }

    /// `showvminfo` fails with `stderr` that is not a not-found error
    pub fn fail_lookups(&self, stderr: &str) {
        std::fs::write(self.state("lookup-error"), stderr).unwrap();
    }

    /// `startvm` fails with `stderr` until cleared
    pub fn fail_startvm(&self, stderr: &str) {
        std::fs::write(self.state("startvm-error"), stderr).unwrap();
    }

    pub fn clear_startvm_failure(&self) {
        let _ = std::fs::remove_file(self.state("startvm-error"));
    }

    /// State the machine ends the install in
    pub fn install_ends_in(&self, vm_state: &str) {
        std::fs::write(self.state("install-outcome"), format!("{}\n", vm_state)).unwrap();
    }

    /// Arguments of every invocation so far, one line each
    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.state("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

/// Build settings used by tests, with disks under `working_dir`
pub fn build_settings(working_dir: &Path) -> BuildSettings {
    BuildSettings {
        working_dir: working_dir.to_path_buf(),
        key_sequence: "<Esc> hostname=HOSTNAME <Enter>".to_string(),
        preconfiguration_url: "http://10.0.2.2:23232/preseed.cfg".to_string(),
        master_port: 2222,
        guest_additions_url:
            "http://download.virtualbox.org/virtualbox/4.1.8/VBoxGuestAdditions_4.1.8.iso"
                .to_string(),
    }
}

/// Full spec for the `base-linux` recipe as `machine_name`
pub fn master_spec(working_dir: &Path, machine_name: &str) -> MasterSpec {
    let fetcher = Arc::new(ArtifactFetcher::new(
        working_dir.join("isos"),
        Arc::new(FakeTransfer::default()),
    ));
    let builder = MasterBuilder::new(
        Arc::new(FakeSubstrate::default()),
        fetcher,
        build_settings(working_dir),
    );
    let staged = StagedArtifacts {
        install_iso: working_dir.join("isos").join("base-linux.iso"),
        guest_additions_iso: working_dir.join("isos").join("VBoxGuestAdditions_4.1.8.iso"),
    };
    builder.master_spec(&recipe("base-linux"), machine_name, &staged)
}
