//! Integration tests for the masters CLI

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const IMAGES: &str = r#"
[[image]]
id = "ubuntu-11.04"
name = "Ubuntu 11.04"
os_family = "ubuntu"
os_version = "11.04"
os_64bit = true
os_type_id = "Ubuntu_64"
iso = "http://releases.ubuntu.com/11.04/ubuntu-11.04-server-amd64.iso"
preseed_cfg = "d-i debian-installer/locale string en_US"

[[image]]
id = "debian-6"
os_family = "debian"
os_version = "6.0"
iso = "http://cdimage.debian.org/debian-6.0.3-i386-netinst.iso"
preseed_cfg = "d-i mirror/country string manual"
"#;

    fn masters() -> Command {
        cargo_bin_cmd!("masters")
    }

    /// Workspace with a config that never touches a real VirtualBox
    struct Workspace {
        dir: TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let config = format!(
                "[workspace]\nworking_dir = {:?}\n\n[substrate]\nvboxmanage = \"/nonexistent/VBoxManage\"\nversion = \"7.0.14r161095\"\n",
                dir.path().join("workingdir")
            );
            std::fs::write(dir.path().join("config.toml"), config).unwrap();
            std::fs::write(dir.path().join("images.toml"), IMAGES).unwrap();
            Self { dir }
        }

        fn config(&self) -> PathBuf {
            self.dir.path().join("config.toml")
        }

        fn images(&self) -> PathBuf {
            self.dir.path().join("images.toml")
        }

        fn cmd(&self) -> Command {
            let mut cmd = masters();
            cmd.env_remove("MASTERS_IMAGES")
                .arg("--config")
                .arg(self.config())
                .arg("--images")
                .arg(self.images());
            cmd
        }
    }

    fn path_arg(path: &Path) -> String {
        path.display().to_string()
    }

    #[test]
    fn help_displays() {
        masters()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("build-once cache"));
    }

    #[test]
    fn version_displays() {
        masters()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("masters"));
    }

    #[test]
    fn config_path_honors_flag() {
        let ws = Workspace::new();
        masters()
            .args(["--config", &path_arg(&ws.config()), "config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains(path_arg(&ws.config())));
    }

    #[test]
    fn config_show_defaults() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("none.toml");
        masters()
            .args(["--config", &path_arg(&missing), "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[naming]"))
            .stdout(predicate::str::contains("masters-image-"));
    }

    #[test]
    fn config_init_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        masters()
            .args(["--config", &path_arg(&path), "config", "init"])
            .assert()
            .success();
        assert!(path.exists());
    }

    #[test]
    fn invalid_config_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[network]\nmaster_port = \"ssh\"\n").unwrap();
        masters()
            .args(["--config", &path_arg(&path), "config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn images_table() {
        Workspace::new()
            .cmd()
            .arg("images")
            .assert()
            .success()
            .stdout(predicate::str::contains("ubuntu-11.04"))
            .stdout(predicate::str::contains("debian-6"))
            .stdout(predicate::str::contains("2 image(s)"));
    }

    #[test]
    fn images_json() {
        let output = Workspace::new()
            .cmd()
            .args(["images", "--format", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let images: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let ids: Vec<&str> = images
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["debian-6", "ubuntu-11.04"]);
    }

    #[test]
    fn images_missing_file_is_empty() {
        let ws = Workspace::new();
        masters()
            .env_remove("MASTERS_IMAGES")
            .args(["--config", &path_arg(&ws.config())])
            .args(["--images", &path_arg(&ws.dir.path().join("none.toml"))])
            .args(["images", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));
    }

    #[test]
    fn duplicate_image_ids_rejected() {
        let ws = Workspace::new();
        let doubled = format!("{}{}", IMAGES, IMAGES);
        std::fs::write(ws.images(), doubled).unwrap();
        ws.cmd()
            .arg("images")
            .assert()
            .failure()
            .stderr(predicate::str::contains("duplicate image id"));
    }

    #[test]
    fn get_rejects_separator_in_key() {
        Workspace::new()
            .cmd()
            .args(["get", "ubuntu-0x0-clone", "--format", "plain"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid image key"))
            .stderr(predicate::str::contains("masters images"));
    }

    #[test]
    fn stage_unknown_image() {
        Workspace::new()
            .cmd()
            .args(["stage", "windows-xp"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("no recipe registered"));
    }

    #[test]
    fn status_without_virtualbox() {
        Workspace::new()
            .cmd()
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("not found"));
    }
}
