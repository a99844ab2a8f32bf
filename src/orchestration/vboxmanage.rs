//! VirtualBox substrate driven through the VBoxManage CLI

use crate::config::schema::SubstrateConfig;
use crate::error::{MastersError, MastersResult};
use crate::orchestration::spec::{CleanupMode, MasterSpec, NetworkAttachment, NetworkInterfaceCard};
use crate::orchestration::substrate::{MachineHandle, MachineLookup, Substrate};
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Host-only interface used for `hostonly` adapters
const HOST_ONLY_INTERFACE: &str = "vboxnet0";

/// Pause inserted for a `<Wait>` token
const KEY_WAIT: Duration = Duration::from_secs(1);

/// One step of an installer key sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStroke {
    /// Literal text typed as-is
    Text(String),
    /// Raw make/break scancodes
    Scancodes(&'static [&'static str]),
    /// Pause before continuing
    Wait,
}

/// Split a key sequence into strokes.
///
/// `<Esc>`, `<Enter>` and `<Wait>` are special; any other text, including
/// unknown `<...>` tokens, is typed verbatim.
pub fn parse_key_sequence(sequence: &str) -> Vec<KeyStroke> {
    let mut strokes = Vec::new();
    let mut text = String::new();
    let mut rest = sequence;

    while !rest.is_empty() {
        let special = [
            ("<Esc>", KeyStroke::Scancodes(&["01", "81"])),
            ("<Enter>", KeyStroke::Scancodes(&["1c", "9c"])),
            ("<Wait>", KeyStroke::Wait),
        ]
        .into_iter()
        .find(|(token, _)| rest.starts_with(token));

        match special {
            Some((token, stroke)) => {
                if !text.is_empty() {
                    strokes.push(KeyStroke::Text(std::mem::take(&mut text)));
                }
                strokes.push(stroke);
                rest = &rest[token.len()..];
            }
            None => {
                let mut chars = rest.chars();
                if let Some(c) = chars.next() {
                    text.push(c);
                }
                rest = chars.as_str();
            }
        }
    }

    if !text.is_empty() {
        strokes.push(KeyStroke::Text(text));
    }
    strokes
}

/// Parse `showvminfo --machinereadable` output into key/value pairs
pub fn parse_machine_info(output: &str) -> HashMap<String, String> {
    output
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let unquote = |s: &str| s.trim().trim_matches('"').to_string();
            Some((unquote(key), unquote(value)))
        })
        .collect()
}

/// Whether VBoxManage stderr says the machine does not exist
pub fn is_machine_not_found(stderr: &str) -> bool {
    stderr.contains("VBOX_E_OBJECT_NOT_FOUND")
        || stderr.contains("Could not find a registered machine")
}

/// VirtualBox manager
#[derive(Debug, Clone)]
pub struct VBoxManage {
    binary: String,
    poll_interval: Duration,
}

impl VBoxManage {
    /// Create a new VBoxManage driver
    pub fn new(config: &SubstrateConfig) -> Self {
        Self {
            binary: config.vboxmanage.clone(),
            poll_interval: Duration::from_secs(config.install_poll_secs.max(1)),
        }
    }

    fn display(&self, args: &[&str]) -> String {
        format!("{} {}", self.binary, args.join(" "))
    }

    async fn output(&self, args: &[&str]) -> MastersResult<Output> {
        debug!("Running: {}", self.display(args));
        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MastersError::VBoxManageNotFound
                } else {
                    MastersError::command_failed(self.display(args), e)
                }
            })
    }

    /// Run a command, returning stdout on success
    async fn run(&self, args: &[&str]) -> MastersResult<String> {
        let output = self.output(args).await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(MastersError::command_exec(
                self.display(args),
                stderr.trim(),
            ))
        }
    }

    /// Check if VBoxManage is installed
    pub async fn is_installed(&self) -> bool {
        self.run(&["--version"]).await.is_ok()
    }

    /// Get the VirtualBox version string (e.g. "7.0.14r161095")
    pub async fn version(&self) -> MastersResult<String> {
        Ok(self.run(&["--version"]).await?.trim().to_string())
    }

    /// Get the machine's `VMState` ("running", "poweroff", ...)
    pub async fn vm_state(&self, name: &str) -> MastersResult<String> {
        let info = self.run(&["showvminfo", name, "--machinereadable"]).await?;
        parse_machine_info(&info)
            .remove("VMState")
            .ok_or_else(|| MastersError::Substrate {
                machine: name.to_string(),
                reason: "VMState missing from showvminfo output".to_string(),
            })
    }

    async fn unregister(&self, name: &str, mode: CleanupMode) -> MastersResult<()> {
        info!("Removing existing machine {}", name);
        let _ = self.run(&["controlvm", name, "poweroff"]).await;
        match mode {
            CleanupMode::Full => self.run(&["unregistervm", name, "--delete"]).await?,
            CleanupMode::UnregisterOnly => self.run(&["unregistervm", name]).await?,
        };
        Ok(())
    }

    async fn configure_nic(&self, name: &str, nic: &NetworkInterfaceCard) -> MastersResult<()> {
        let index = nic.slot + 1;
        let nic_flag = format!("--nic{}", index);

        match nic.adapter.attachment {
            NetworkAttachment::Nat => {
                self.run(&["modifyvm", name, &nic_flag, "nat"]).await?;
            }
            NetworkAttachment::HostOnly => {
                let adapter_flag = format!("--hostonlyadapter{}", index);
                self.run(&[
                    "modifyvm",
                    name,
                    &nic_flag,
                    "hostonly",
                    &adapter_flag,
                    HOST_ONLY_INTERFACE,
                ])
                .await?;
            }
        }

        let natpf_flag = format!("--natpf{}", index);
        for rule in &nic.adapter.redirects {
            let value = format!(
                "{}-{},{},{},{},{},{}",
                rule.protocol,
                rule.host_port,
                rule.protocol,
                rule.host_ip,
                rule.host_port,
                rule.guest_ip,
                rule.guest_port
            );
            self.run(&["modifyvm", name, &natpf_flag, &value]).await?;
        }
        Ok(())
    }

    async fn attach_storage(&self, spec: &MasterSpec) -> MastersResult<()> {
        let name = spec.vm.name.as_str();

        for controller in &spec.vm.controllers {
            let ctl = controller.name.as_str();
            self.run(&["storagectl", name, "--name", ctl, "--add", controller.bus.as_arg()])
                .await?;

            for disk in &controller.hard_disks {
                let path = disk.path.to_string_lossy();
                if !disk.path.exists() {
                    let size = disk.size_mb.to_string();
                    let format = disk.format.to_uppercase();
                    self.run(&[
                        "createmedium", "disk", "--filename", &path, "--size", &size, "--format",
                        &format,
                    ])
                    .await?;
                }
                let port = disk.controller_port.to_string();
                let slot = disk.device_slot.to_string();
                self.run(&[
                    "storageattach", name, "--storagectl", ctl, "--port", &port, "--device",
                    &slot, "--type", "hdd", "--medium", &path,
                ])
                .await?;
            }

            for iso in &controller.isos {
                let path = iso.path.to_string_lossy();
                let port = iso.controller_port.to_string();
                let slot = iso.device_slot.to_string();
                self.run(&[
                    "storageattach", name, "--storagectl", ctl, "--port", &port, "--device",
                    &slot, "--type", "dvddrive", "--medium", &path,
                ])
                .await?;
            }
        }
        Ok(())
    }

    /// Type an installer key sequence into a running machine
    pub async fn send_keys(&self, name: &str, sequence: &str) -> MastersResult<()> {
        for stroke in parse_key_sequence(sequence) {
            match stroke {
                KeyStroke::Text(text) => {
                    self.run(&["controlvm", name, "keyboardputstring", &text])
                        .await?;
                }
                KeyStroke::Scancodes(codes) => {
                    let mut args = vec!["controlvm", name, "keyboardputscancode"];
                    args.extend_from_slice(codes);
                    self.run(&args).await?;
                }
                KeyStroke::Wait => tokio::time::sleep(KEY_WAIT).await,
            }
        }
        Ok(())
    }

    /// Wait for the installer to power the machine off
    async fn wait_for_poweroff(&self, name: &str) -> MastersResult<()> {
        loop {
            let state = self.vm_state(name).await?;
            match state.as_str() {
                "poweroff" => return Ok(()),
                "aborted" | "gurumeditation" => {
                    return Err(MastersError::Substrate {
                        machine: name.to_string(),
                        reason: format!("installation ended in state {}", state),
                    })
                }
                _ => {
                    debug!("Master {} is {}, waiting", name, state);
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    /// Configure a freshly registered machine and run its installation
    async fn install(&self, spec: &MasterSpec) -> MastersResult<()> {
        let name = spec.vm.name.as_str();

        let memory = spec.vm.memory_mb.to_string();
        self.run(&["modifyvm", name, "--memory", &memory]).await?;

        for nic in &spec.network.nics {
            self.configure_nic(name, nic).await?;
        }
        self.attach_storage(spec).await?;

        self.run(&["startvm", name, "--type", "headless"]).await?;
        info!("Installing {} from {}", name, spec.iso.source_path.display());
        self.send_keys(name, &spec.iso.installation_script).await?;
        self.wait_for_poweroff(name).await
    }
}

#[async_trait]
impl Substrate for VBoxManage {
    async fn find_machine(&self, name: &str) -> MachineLookup {
        let output = match self.output(&["showvminfo", name, "--machinereadable"]).await {
            Ok(output) => output,
            Err(e) => return MachineLookup::Failed(e.to_string()),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_machine_not_found(&stderr) {
                return MachineLookup::NotFound;
            }
            return MachineLookup::Failed(stderr.trim().to_string());
        }

        let info = parse_machine_info(&String::from_utf8_lossy(&output.stdout));
        match info.get("UUID").map(|id| Uuid::parse_str(id)) {
            Some(Ok(id)) => MachineLookup::Found(MachineHandle {
                id: id.to_string(),
                name: info.get("name").cloned().unwrap_or_else(|| name.to_string()),
            }),
            Some(Err(e)) => MachineLookup::Failed(format!("invalid machine UUID: {}", e)),
            None => MachineLookup::Failed("UUID missing from showvminfo output".to_string()),
        }
    }

    async fn create_and_install(&self, spec: &MasterSpec) -> MastersResult<MachineHandle> {
        let name = spec.vm.name.as_str();

        if spec.vm.force_overwrite {
            if let MachineLookup::Found(_) = self.find_machine(name).await {
                self.unregister(name, spec.vm.cleanup_mode).await?;
            }
        }

        info!("Creating VirtualBox machine {}", name);
        let mut create = vec!["createvm", "--name", name, "--register"];
        if !spec.vm.os_type_id.is_empty() {
            create.extend_from_slice(&["--ostype", spec.vm.os_type_id.as_str()]);
        }
        self.run(&create).await?;

        // A registered but half-installed machine would be found as a master
        if let Err(e) = self.install(spec).await {
            if let Err(cleanup) = self.unregister(name, spec.vm.cleanup_mode).await {
                warn!("Failed to remove {} after failed install: {}", name, cleanup);
            }
            return Err(e);
        }

        match self.find_machine(name).await {
            MachineLookup::Found(handle) => {
                info!("Master {} installed", handle);
                Ok(handle)
            }
            MachineLookup::NotFound => Err(MastersError::Substrate {
                machine: name.to_string(),
                reason: "machine disappeared after installation".to_string(),
            }),
            MachineLookup::Failed(reason) => {
                warn!("Lookup after install of {} failed", name);
                Err(MastersError::Substrate {
                    machine: name.to_string(),
                    reason,
                })
            }
        }
    }

    fn substrate_name(&self) -> &'static str {
        "VirtualBox"
    }
}
