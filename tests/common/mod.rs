//! Shared integration-test helpers: fixture paths, in-memory tournaments and
//! a runner for the `rostrum` binary against a scratch copy of the data file.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Arc;

use rostrum::Tournament;
use rostrum::config::ConfigLoader;
use rostrum::model::{Round, ScoreRecord, Team, TeamScore};
use rostrum::observability::EventEmitter;
use rostrum::store::{MemoryStore, Snapshot, snapshot};
use tempfile::TempDir;

/// Returns the path to a test fixture.
#[must_use]
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Verified teams with the given names.
pub fn roster(names: &[&str]) -> Vec<Team> {
    names
        .iter()
        .map(|n| Team {
            id: format!("s-{}", n.to_lowercase()),
            name: (*n).to_string(),
            verified: true,
        })
        .collect()
}

/// Rounds as `(name, phase)` pairs, created in the given order.
pub fn rounds(defs: &[(&str, &str)]) -> Vec<Round> {
    defs.iter()
        .enumerate()
        .map(|(i, (name, phase))| Round {
            id: format!("r{i}"),
            name: (*name).to_string(),
            phase: (*phase).to_string(),
            created_at: Some(
                chrono::DateTime::from_timestamp(1_746_867_600 + i64::try_from(i).unwrap() * 3600, 0)
                    .unwrap(),
            ),
        })
        .collect()
}

/// A judge's submission.
pub fn judged(round: &str, judge: &str, scores: &[(&str, u32)]) -> ScoreRecord {
    ScoreRecord::judged(
        round,
        judge,
        scores.iter().map(|(t, p)| TeamScore::new(*t, *p)).collect(),
    )
}

/// Opens a tournament from YAML and a snapshot, keeping a handle on the store.
pub async fn open(config_yaml: &str, snapshot: Snapshot) -> (Tournament, Arc<MemoryStore>) {
    let loaded = ConfigLoader::with_defaults()
        .load_str(config_yaml, Path::new("inline.yaml"))
        .expect("config should load");
    let store = Arc::new(MemoryStore::new(snapshot));
    let tournament = Tournament::open(loaded.config, store.clone(), Arc::new(EventEmitter::noop()))
        .await
        .expect("tournament should open");
    (tournament, store)
}

/// Opens the fixture tournament (`tournament.yaml` + `data.json`).
pub async fn open_fixture() -> (Tournament, Arc<MemoryStore>) {
    let raw = std::fs::read_to_string(fixture_path("tournament.yaml")).unwrap();
    let data = snapshot::load(&fixture_path("data.json")).unwrap();
    open(&raw, data).await
}

/// A scratch copy of the fixture data file.
pub struct Scratch {
    dir: TempDir,
}

impl Scratch {
    /// Copies `data.json` into a fresh temporary directory.
    #[allow(clippy::missing_panics_doc)]
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::copy(fixture_path("data.json"), dir.path().join("data.json"))
            .expect("copy data fixture");
        Self { dir }
    }

    /// Path of the scratch data file.
    pub fn data(&self) -> PathBuf {
        self.dir.path().join("data.json")
    }

    /// Path for an events file inside the scratch directory.
    pub fn events(&self) -> PathBuf {
        self.dir.path().join("events.jsonl")
    }

    /// Current contents of the scratch data file.
    pub fn snapshot(&self) -> Snapshot {
        snapshot::load(&self.data()).expect("scratch data should stay valid")
    }

    /// Runs `rostrum <command> -c tournament.yaml -d <scratch> <rest...>`.
    pub fn run(&self, command: &str, rest: &[&str]) -> Output {
        let config = fixture_path("tournament.yaml");
        let data = self.data();
        let mut args = vec![
            command,
            "-c",
            config.to_str().expect("non-UTF-8 fixture path"),
            "-d",
            data.to_str().expect("non-UTF-8 temp path"),
        ];
        args.extend_from_slice(rest);
        run(&args)
    }
}

/// Runs the `rostrum` binary with the given arguments.
#[allow(clippy::missing_panics_doc)]
pub fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rostrum"))
        .args(args)
        .arg("--quiet")
        .env_remove("ROSTRUM_CONFIG")
        .env_remove("ROSTRUM_DATA")
        .env_remove("ROSTRUM_EVENTS")
        .env_remove("ROSTRUM_METRICS_PORT")
        .env_remove("ROSTRUM_LOG_LEVEL")
        .output()
        .expect("failed to run rostrum")
}

/// Stdout of a finished command as JSON.
pub fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("invalid JSON ({e}): {stdout}"))
}
