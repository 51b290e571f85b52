//! End-to-end destroy tests against a scratch filesystem layout.
//!
//! The PKICTL_* environment variables are passed per child process, so these
//! tests never touch the packaged /var/lib and /usr/share locations and can
//! run unprivileged.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const DEFAULT_CFG: &str = "\
# packaged defaults
pki_instance_name=pki-tomcat
pki_stop_command=true
destroy_scriptlets=initialization configuration webapp_deployment subsystem_layout security_databases instance_layout finalization
";

struct Layout {
    base: TempDir,
    share: TempDir,
    logs: TempDir,
}

impl Layout {
    fn new() -> Self {
        let layout = Self {
            base: TempDir::new().unwrap(),
            share: TempDir::new().unwrap(),
            logs: TempDir::new().unwrap(),
        };
        let etc = layout.share.path().join("server").join("etc");
        fs::create_dir_all(&etc).unwrap();
        fs::write(etc.join("default.cfg"), DEFAULT_CFG).unwrap();
        layout
    }

    fn with_default_cfg(content: &str) -> Self {
        let layout = Self::new();
        fs::write(
            layout.share.path().join("server/etc/default.cfg"),
            content,
        )
        .unwrap();
        layout
    }

    fn instance_dir(&self) -> std::path::PathBuf {
        self.base.path().join("pki-tomcat")
    }

    /// Lay out a deployed CA subsystem
    fn deploy_ca(&self) {
        let root = self.instance_dir();
        fs::create_dir_all(root.join("ca/registry/ca")).unwrap();
        fs::write(
            root.join("ca/registry/ca/deployment.cfg"),
            "[CA]\npki_admin_email=caadmin@example.com\n",
        )
        .unwrap();
        fs::create_dir_all(root.join("conf/ca")).unwrap();
        fs::create_dir_all(root.join("conf/alias")).unwrap();
        fs::create_dir_all(root.join("conf/Catalina/localhost")).unwrap();
        fs::write(root.join("conf/Catalina/localhost/ca.xml"), "<Context/>\n").unwrap();
        fs::create_dir_all(root.join("webapps")).unwrap();
        fs::create_dir_all(self.logs.path().join("pki-tomcat")).unwrap();
    }

    fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("pkictl").unwrap();
        cmd.env("PKICTL_BASE_DIR", self.base.path())
            .env("PKICTL_SHARE_DIR", self.share.path())
            .env("PKICTL_LOG_DIR", self.logs.path());
        cmd
    }
}

#[test]
fn test_missing_instance_exits_two() {
    let layout = Layout::new();

    layout
        .command()
        .args(["destroy", "CA", "-i", "pki-tomcat"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Instance does not exist"));
}

#[test]
fn test_missing_subsystem_exits_two() {
    let layout = Layout::new();
    fs::create_dir_all(layout.instance_dir()).unwrap();

    layout
        .command()
        .args(["destroy", "KRA", "-i", "pki-tomcat"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("KRA subsystem does not exist"));
}

#[test]
fn test_full_destroy_removes_instance() {
    let layout = Layout::new();
    layout.deploy_ca();

    layout
        .command()
        .args(["destroy", "CA", "-i", "pki-tomcat", "--remove-logs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Uninstalling CA from"))
        .stdout(predicate::str::contains("Uninstallation complete."));

    assert!(!layout.instance_dir().exists());
    assert!(!layout.logs.path().join("pki-tomcat").exists());
}

#[test]
fn test_subsystem_name_is_case_insensitive() {
    let layout = Layout::new();
    layout.deploy_ca();

    layout
        .command()
        .args(["destroy", "ca", "-i", "pki-tomcat"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Uninstalling CA from"));
}

#[test]
fn test_forced_destroy_converges_on_missing_instance() {
    let layout = Layout::new();

    // nothing deployed at all; --force downgrades the preconditions and
    // every stage tolerates the missing state
    layout
        .command()
        .args(["destroy", "CA", "-i", "pki-tomcat", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Uninstallation complete."));
}

#[test]
fn test_stage_failure_reports_command_and_aborts() {
    let layout = Layout::with_default_cfg(
        "pki_instance_name=pki-tomcat\n\
         pki_stop_command=false\n\
         destroy_scriptlets=initialization configuration subsystem_layout\n",
    );
    layout.deploy_ca();

    layout
        .command()
        .args(["destroy", "CA", "-i", "pki-tomcat"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "Uninstallation failed: Command failed: false",
        ));

    // the failing stage aborted the run before any removal happened
    assert!(layout.instance_dir().join("ca").exists());
    assert!(layout.instance_dir().join("conf/ca").exists());
}

#[test]
fn test_unknown_stage_fails_before_any_stage_runs() {
    let layout = Layout::with_default_cfg(
        "pki_instance_name=pki-tomcat\n\
         pki_stop_command=true\n\
         destroy_scriptlets=initialization no_such_stage subsystem_layout\n",
    );
    layout.deploy_ca();

    layout
        .command()
        .args(["destroy", "CA", "-i", "pki-tomcat"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Unknown scriptlet: no_such_stage"));

    // pre-flight resolution failed, so even the first stage never ran
    assert!(layout.instance_dir().join("ca").exists());
}

#[test]
fn test_legacy_scriptlet_key_still_drives_teardown() {
    let layout = Layout::with_default_cfg(
        "pki_instance_name=pki-tomcat\n\
         pki_stop_command=true\n\
         destroy_scriplets=initialization subsystem_layout\n",
    );
    layout.deploy_ca();

    layout
        .command()
        .args(["destroy", "CA", "-i", "pki-tomcat"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Uninstallation complete."));

    assert!(!layout.instance_dir().join("ca").exists());
}

#[test]
fn test_interactive_quit_cancels_cleanly() {
    let layout = Layout::new();
    layout.deploy_ca();

    layout
        .command()
        .arg("destroy")
        .write_stdin("ca\npki-tomcat\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Uninstallation canceled."));

    // nothing was removed
    assert!(layout.instance_dir().join("ca").exists());
}

#[test]
fn test_interactive_confirmation_runs_teardown() {
    let layout = Layout::new();
    layout.deploy_ca();

    layout
        .command()
        .arg("destroy")
        .write_stdin("ca\npki-tomcat\nyes\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Uninstallation complete."));

    assert!(!layout.instance_dir().exists());
}

#[test]
fn test_empty_stage_list_is_a_noop_success() {
    let layout = Layout::with_default_cfg(
        "pki_instance_name=pki-tomcat\n\
         destroy_scriptlets=\n",
    );
    layout.deploy_ca();

    layout
        .command()
        .args(["destroy", "CA", "-i", "pki-tomcat"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Uninstallation complete."));

    // no stage ran, so nothing was removed
    assert!(layout.instance_dir().join("ca").exists());
}

#[test]
fn test_log_file_records_failure_diagnostics() {
    let layout = Layout::with_default_cfg(
        "pki_instance_name=pki-tomcat\n\
         pki_stop_command=false\n\
         destroy_scriptlets=initialization\n",
    );
    layout.deploy_ca();
    let log_path = layout.base.path().join("destroy.log");

    layout
        .command()
        .args([
            "destroy",
            "CA",
            "-i",
            "pki-tomcat",
            "--log-file",
            log_path.to_str().unwrap(),
        ])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Uninstallation log:"));

    let content = fs::read_to_string(&log_path).unwrap();
    assert!(content.contains("\"stage\": \"initialization\""));
    assert!(content.contains("teardown"));
}

#[test]
fn test_destroy_keeps_sibling_subsystem() {
    let layout = Layout::new();
    layout.deploy_ca();
    // a KRA shares the instance
    fs::create_dir_all(layout.instance_dir().join("kra")).unwrap();

    layout
        .command()
        .args(["destroy", "CA", "-i", "pki-tomcat"])
        .assert()
        .success();

    assert!(!layout.instance_dir().join("ca").exists());
    assert!(layout.instance_dir().join("kra").exists());
    assert!(layout.instance_dir().join("conf/alias").exists());
}
