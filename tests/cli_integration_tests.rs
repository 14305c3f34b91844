//! Integration tests for the command surface
//!
//! Commands are parsed with clap and executed against a temporary config
//! file and stub tools, the same way `main` drives them.

#![cfg(unix)]

use camino::Utf8PathBuf;
use clap::Parser;
use qimba::cli::{AppContext, Cli};
use qimba::{ConfigManager, Settings};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use tempfile::TempDir;
use tokio::sync::watch;

struct Harness {
    _temp_dir: TempDir,
    root: Utf8PathBuf,
    config_path: Utf8PathBuf,
    _cancel_tx: watch::Sender<bool>,
    cancel_rx: watch::Receiver<bool>,
}

impl Harness {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        fs::create_dir_all(root.join("raw")).unwrap();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            _temp_dir: temp_dir,
            config_path: root.join("config.yaml"),
            root,
            _cancel_tx: cancel_tx,
            cancel_rx,
        }
    }

    fn stub(&self, name: &str, body: &str) -> String {
        let path = self.root.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string()
    }

    fn context(&self, settings: Settings) -> AppContext {
        AppContext {
            config: ConfigManager::with_path(&self.config_path),
            settings,
            verbose: false,
            cancel: self.cancel_rx.clone(),
        }
    }

    fn loaded_context(&self) -> AppContext {
        let settings = ConfigManager::with_path(&self.config_path).load();
        self.context(settings)
    }

    fn parse(&self, args: &[&str]) -> Cli {
        let mut argv = vec!["qimba", "--config", self.config_path.as_str()];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }
}

#[tokio::test]
async fn test_config_edit_persists() {
    let harness = Harness::new();

    let cli = harness.parse(&["config", "edit", "qc.min_quality", "31"]);
    cli.execute(&harness.loaded_context()).await.unwrap();

    let cli = harness.parse(&["config", "edit", "threads", "4"]);
    cli.execute(&harness.loaded_context()).await.unwrap();

    let saved = ConfigManager::with_path(&harness.config_path).try_load().unwrap();
    assert_eq!(saved.qc.min_quality, 31);
    assert_eq!(saved.threads, 4);
}

#[tokio::test]
async fn test_config_edit_rejects_unknown_setting() {
    let harness = Harness::new();

    let cli = harness.parse(&["config", "edit", "qc.colour", "red"]);
    let error = cli.execute(&harness.loaded_context()).await.unwrap_err();

    assert!(error.to_string().contains("Unknown setting: qc.colour"));
    assert!(!harness.config_path.exists());
}

#[tokio::test]
async fn test_config_init_requires_force() {
    let harness = Harness::new();

    let cli = harness.parse(&["config", "init"]);
    cli.execute(&harness.loaded_context()).await.unwrap();
    assert!(harness.config_path.exists());

    let cli = harness.parse(&["config", "init"]);
    let error = cli.execute(&harness.loaded_context()).await.unwrap_err();
    assert!(error.to_string().contains("--force"));

    let cli = harness.parse(&["config", "init", "--force"]);
    cli.execute(&harness.loaded_context()).await.unwrap();
}

#[tokio::test]
async fn test_config_show() {
    let harness = Harness::new();

    let cli = harness.parse(&["config"]);
    cli.execute(&harness.loaded_context()).await.unwrap();
}

#[tokio::test]
async fn test_qc_requires_existing_input() {
    let harness = Harness::new();
    let missing = harness.root.join("nope");

    let cli = harness.parse(&["qc", missing.as_str()]);
    let error = cli.execute(&harness.loaded_context()).await.unwrap_err();

    assert!(error.to_string().contains("Input directory does not exist"));
}

#[tokio::test]
async fn test_qc_default_output_dir() {
    let harness = Harness::new();
    let mut settings = Settings::default();
    settings.qc.tool = harness.stub("qc-tool", "touch \"$2/report.txt\"");

    let input = harness.root.join("raw");
    let cli = harness.parse(&["qc", input.as_str(), "-q", "25"]);
    cli.execute(&harness.context(settings)).await.unwrap();

    assert!(input.join("qc_results/report.txt").exists());
}

#[tokio::test]
async fn test_denoise_explicit_output_dir() {
    let harness = Harness::new();
    let mut settings = Settings::default();
    settings.denoise.tool = harness.stub("denoise-tool", "touch \"$4/asv.txt\"");

    let input = harness.root.join("raw");
    let output = harness.root.join("denoised");
    let cli = harness.parse(&["denoise", input.as_str(), "-o", output.as_str(), "--max-ee", "0.5"]);
    cli.execute(&harness.context(settings)).await.unwrap();

    assert!(output.join("asv.txt").exists());
}

#[tokio::test]
async fn test_run_failure_is_an_error() {
    let harness = Harness::new();
    let mut settings = Settings::default();
    settings.qc.tool = harness.stub("qc-tool", "echo 'bad header' >&2\nexit 1");
    settings.denoise.tool = harness.stub("denoise-tool", "touch \"$4/asv.txt\"");

    let input = harness.root.join("raw");
    let output = harness.root.join("out");
    let cli = harness.parse(&["run", input.as_str(), "-o", output.as_str()]);
    let error = cli.execute(&harness.context(settings)).await.unwrap_err();

    assert!(error.to_string().contains("bad header"));
    assert!(!output.join("denoise_results").exists());
}

#[tokio::test]
async fn test_run_skip_qc() {
    let harness = Harness::new();
    let mut settings = Settings::default();
    settings.qc.tool = harness.stub("qc-tool", "exit 1");
    settings.denoise.tool = harness.stub("denoise-tool", "touch \"$4/asv.txt\"");

    let input = harness.root.join("raw");
    let output = harness.root.join("out");
    let cli = harness.parse(&["run", input.as_str(), "-o", output.as_str(), "--skip-qc"]);
    cli.execute(&harness.context(settings)).await.unwrap();

    assert!(output.join("denoise_results/asv.txt").exists());
}

#[tokio::test]
async fn test_config_edit_keeps_malformed_file() {
    let harness = Harness::new();
    let original = "threads: 8\nqc: [this is: not: valid\n";
    fs::write(&harness.config_path, original).unwrap();

    let cli = harness.parse(&["config", "edit", "qc.min_quality", "31"]);
    let error = cli.execute(&harness.loaded_context()).await.unwrap_err();

    assert!(error.to_string().contains("Refusing to edit"));
    assert_eq!(fs::read_to_string(&harness.config_path).unwrap(), original);
}

#[tokio::test]
async fn test_config_edit_repairs_invalid_value() {
    let harness = Harness::new();
    fs::write(&harness.config_path, "threads: 0\nqc:\n  min_quality: 33\n").unwrap();

    let cli = harness.parse(&["config", "edit", "threads", "4"]);
    cli.execute(&harness.loaded_context()).await.unwrap();

    let saved = ConfigManager::with_path(&harness.config_path).try_load().unwrap();
    assert_eq!(saved.threads, 4);
    assert_eq!(saved.qc.min_quality, 33);
}
