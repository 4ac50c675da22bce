//! Persistent snapshot store: an original baseline plus an append-only
//! change log of deltas.
//!
//! Two shapes live on disk. A master file (`<name>-master.json`) holds a flat
//! data object and is never rewritten by the planner. A current file
//! (`<name>-current.json`) holds `{ original, changeLog }`; replaying the log
//! over the baseline reconstructs the live data, so runs are resumable and
//! every executed prerequisite stays auditable. A fresh baseline is never
//! regenerated automatically.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

static SNAPSHOT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?<stem>.+?)-(?:master|current)\.json$").expect("valid name regex"));

/// One auditable entry in the append-only change log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEntry {
    /// Status (or other label) the executed prerequisite reached.
    pub label: String,
    pub test_file: String,
    /// Flat key/value delta; replay is a shallow merge, last write wins.
    pub delta: Map<String, Value>,
    /// Seconds since the unix epoch.
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotFile {
    original: Map<String, Value>,
    change_log: Vec<ChangeEntry>,
}

/// In-memory view of a persisted snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    data: Map<String, Value>,
    original: Map<String, Value>,
    change_log: Vec<ChangeEntry>,
    source_path: PathBuf,
}

impl Snapshot {
    /// Load a snapshot for `path`.
    ///
    /// Master files are read directly. For any other name, the
    /// `-current.json` sibling is preferred when present, then the
    /// `-master.json` sibling, then the bare file itself as a baseline.
    pub fn load(path: &Path) -> Result<Self> {
        if is_master(path) {
            let original = read_flat(path)?;
            return Ok(Self::from_parts(original, Vec::new(), path));
        }
        let current = current_path_for(path);
        if current.exists() {
            let file = read_snapshot_file(&current)?;
            return Ok(Self::from_parts(file.original, file.change_log, path));
        }
        let master = master_path_for(path);
        if master.exists() {
            let original = read_flat(&master)?;
            return Ok(Self::from_parts(original, Vec::new(), path));
        }
        if path.exists() {
            let original = read_flat(path)?;
            return Ok(Self::from_parts(original, Vec::new(), path));
        }
        Err(anyhow!("no snapshot found for {}", path.display()))
    }

    fn from_parts(original: Map<String, Value>, change_log: Vec<ChangeEntry>, source: &Path) -> Self {
        let data = replay(&original, &change_log);
        debug!(
            path = %source.display(),
            entries = change_log.len(),
            "snapshot loaded"
        );
        Self {
            data,
            original,
            change_log,
            source_path: source.to_path_buf(),
        }
    }

    /// Record one executed prerequisite as an append-only delta.
    pub fn append(&mut self, entry: ChangeEntry) {
        for (key, value) in &entry.delta {
            self.data.insert(key.clone(), value.clone());
        }
        self.change_log.push(entry);
    }

    /// Persist to the `-current.json` sibling of `path`.
    ///
    /// The original baseline is reconstructed by removing every
    /// changelog-introduced key from the live data, then overlaying the true
    /// master baseline when one exists on disk. This keeps the append-only
    /// history intact however many times `data` was mutated in memory.
    pub fn save(&mut self, path: &Path) -> Result<PathBuf> {
        let delta_path = current_path_for(path);

        let mut original = self.data.clone();
        for entry in &self.change_log {
            for key in entry.delta.keys() {
                original.remove(key);
            }
        }
        let master = master_path_for(path);
        if master.exists() {
            let baseline = read_flat(&master)?;
            for (key, value) in baseline {
                original.insert(key, value);
            }
        }
        self.original = original.clone();

        let file = SnapshotFile {
            original,
            change_log: self.change_log.clone(),
        };
        write_json_atomic(&delta_path, &file)?;
        debug!(
            path = %delta_path.display(),
            entries = self.change_log.len(),
            "snapshot saved"
        );
        Ok(delta_path)
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn original(&self) -> &Map<String, Value> {
        &self.original
    }

    pub fn change_log(&self) -> &[ChangeEntry] {
        &self.change_log
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Global run status (`data.status`).
    pub fn status(&self) -> Option<&str> {
        self.data.get("status").and_then(Value::as_str)
    }

    /// Entity-scoped status (`data[entity].status`), the secondary axis.
    pub fn entity_status(&self, entity: &str) -> Option<&str> {
        self.data.get(entity)?.get("status")?.as_str()
    }

    /// Read a nested value through a dotted path.
    pub fn get_path(&self, dotted: &str) -> Option<&Value> {
        let mut parts = dotted.split('.');
        let mut current = self.data.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Set a nested value through a dotted path, creating intermediate
    /// objects and replacing non-objects along the way.
    pub fn set_path(&mut self, dotted: &str, value: Value) {
        let mut parts: Vec<&str> = dotted.split('.').collect();
        let Some(last) = parts.pop() else {
            return;
        };
        if parts.is_empty() {
            self.data.insert(last.to_string(), value);
            return;
        }

        let first = parts.remove(0);
        let mut current = self
            .data
            .entry(first.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        for part in parts {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            let Some(obj) = current.as_object_mut() else {
                return;
            };
            current = obj
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        if let Some(obj) = current.as_object_mut() {
            obj.insert(last.to_string(), value);
        }
    }

    /// First element of the `field` array whose `key` equals `value`.
    pub fn get_from_array(&self, field: &str, key: &str, value: &Value) -> Option<&Value> {
        self.data
            .get(field)?
            .as_array()?
            .iter()
            .find(|item| item.get(key) == Some(value))
    }

    /// Append to the `field` array, creating it when missing.
    pub fn push_to_array(&mut self, field: &str, value: Value) {
        let slot = self
            .data
            .entry(field.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = slot {
            items.push(value);
        } else {
            *slot = Value::Array(vec![value]);
        }
    }
}

/// Apply each delta in order over the baseline; last write per key wins.
fn replay(original: &Map<String, Value>, change_log: &[ChangeEntry]) -> Map<String, Value> {
    let mut data = original.clone();
    for entry in change_log {
        for (key, value) in &entry.delta {
            data.insert(key.clone(), value.clone());
        }
    }
    data
}

/// Derive the `-current.json` sibling for any snapshot path.
pub fn current_path_for(path: &Path) -> PathBuf {
    sibling(path, "current")
}

/// Derive the `-master.json` sibling for any snapshot path.
pub fn master_path_for(path: &Path) -> PathBuf {
    sibling(path, "master")
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let stem = match SNAPSHOT_NAME_RE.captures(name) {
        Some(caps) => caps["stem"].to_string(),
        None => name.strip_suffix(".json").unwrap_or(name).to_string(),
    };
    path.with_file_name(format!("{stem}-{suffix}.json"))
}

fn is_master(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with("-master.json"))
}

/// Seconds since the unix epoch; zero if the clock predates it.
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

fn read_flat(path: &Path) -> Result<Map<String, Value>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read snapshot {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse snapshot {}", path.display()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(anyhow!("snapshot {} is not a JSON object", path.display())),
    }
}

fn read_snapshot_file(path: &Path) -> Result<SnapshotFile> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read snapshot {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse snapshot {}", path.display()))
}

/// Atomic write (temp file + rename), pretty JSON with trailing newline.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("snapshot path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let mut buf = serde_json::to_string_pretty(value)?;
    buf.push('\n');
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, &buf)
        .with_context(|| format!("write temp snapshot {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace snapshot {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_file(path: &Path, value: &Value) {
        let mut buf = serde_json::to_string_pretty(value).expect("serialize");
        buf.push('\n');
        fs::write(path, buf).expect("write");
    }

    fn entry(label: &str, delta: Value) -> ChangeEntry {
        ChangeEntry {
            label: label.to_string(),
            test_file: format!("tests/{label}.test.js"),
            delta: delta.as_object().expect("object").clone(),
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn sibling_names_follow_the_convention() {
        assert_eq!(
            current_path_for(Path::new("data/loan-master.json")),
            PathBuf::from("data/loan-current.json")
        );
        assert_eq!(
            master_path_for(Path::new("data/loan-current.json")),
            PathBuf::from("data/loan-master.json")
        );
        assert_eq!(
            current_path_for(Path::new("data/loan.json")),
            PathBuf::from("data/loan-current.json")
        );
        assert_eq!(
            current_path_for(Path::new("data/loan")),
            PathBuf::from("data/loan-current.json")
        );
    }

    #[test]
    fn master_file_is_read_directly() {
        let temp = tempfile::tempdir().expect("tempdir");
        let master = temp.path().join("loan-master.json");
        write_file(&master, &json!({"status": "draft"}));
        // A current sibling must not shadow an explicit master read.
        write_file(
            &temp.path().join("loan-current.json"),
            &json!({"original": {"status": "accepted"}, "changeLog": []}),
        );

        let snapshot = Snapshot::load(&master).expect("load");
        assert_eq!(snapshot.status(), Some("draft"));
        assert!(snapshot.change_log().is_empty());
    }

    #[test]
    fn current_sibling_is_preferred_over_master() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_file(&temp.path().join("loan-master.json"), &json!({"status": "draft"}));
        write_file(
            &temp.path().join("loan-current.json"),
            &json!({
                "original": {"status": "draft"},
                "changeLog": [{
                    "label": "submitted",
                    "testFile": "tests/submitted.test.js",
                    "delta": {"status": "submitted"},
                    "timestamp": 1
                }]
            }),
        );

        let snapshot = Snapshot::load(&temp.path().join("loan.json")).expect("load");
        assert_eq!(snapshot.status(), Some("submitted"));
        assert_eq!(snapshot.change_log().len(), 1);
    }

    /// Load, save, and reload must yield identical data: the replay model is
    /// lossless.
    #[test]
    fn save_load_round_trip_is_lossless() {
        let temp = tempfile::tempdir().expect("tempdir");
        let master = temp.path().join("loan-master.json");
        write_file(&master, &json!({"status": "draft", "amount": 100}));

        let data_path = temp.path().join("loan.json");
        let mut snapshot = Snapshot::load(&data_path).expect("load");
        snapshot.append(entry("submitted", json!({"status": "submitted"})));
        snapshot.append(entry("accepted", json!({"status": "accepted", "accepted": true})));
        snapshot.save(&data_path).expect("save");

        let reloaded = Snapshot::load(&data_path).expect("reload");
        assert_eq!(reloaded.data(), snapshot.data());
        assert_eq!(reloaded.change_log(), snapshot.change_log());
        assert_eq!(reloaded.original().get("status"), Some(&json!("draft")));
        assert_eq!(reloaded.status(), Some("accepted"));
    }

    /// The reconstructed original must keep the master baseline even for keys
    /// the change log later overwrote.
    #[test]
    fn save_preserves_master_baseline() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_file(
            &temp.path().join("loan-master.json"),
            &json!({"status": "draft", "owner": "alice"}),
        );

        let data_path = temp.path().join("loan.json");
        let mut snapshot = Snapshot::load(&data_path).expect("load");
        snapshot.append(entry("submitted", json!({"status": "submitted"})));
        let saved = snapshot.save(&data_path).expect("save");
        assert!(saved.ends_with("loan-current.json"));

        let reloaded = Snapshot::load(&data_path).expect("reload");
        assert_eq!(reloaded.original().get("status"), Some(&json!("draft")));
        assert_eq!(reloaded.original().get("owner"), Some(&json!("alice")));
        assert_eq!(reloaded.status(), Some("submitted"));
    }

    #[test]
    fn replay_applies_last_write_per_key() {
        let original = json!({"status": "draft"}).as_object().expect("object").clone();
        let log = vec![
            entry("submitted", json!({"status": "submitted"})),
            entry("accepted", json!({"status": "accepted"})),
        ];
        let data = replay(&original, &log);
        assert_eq!(data.get("status"), Some(&json!("accepted")));
    }

    #[test]
    fn entity_status_reads_the_secondary_axis() {
        let temp = tempfile::tempdir().expect("tempdir");
        let master = temp.path().join("run-master.json");
        write_file(
            &master,
            &json!({"status": "registered", "loan": {"status": "loan_opened"}}),
        );

        let snapshot = Snapshot::load(&master).expect("load");
        assert_eq!(snapshot.status(), Some("registered"));
        assert_eq!(snapshot.entity_status("loan"), Some("loan_opened"));
        assert_eq!(snapshot.entity_status("card"), None);
    }

    #[test]
    fn dotted_path_get_and_set() {
        let temp = tempfile::tempdir().expect("tempdir");
        let master = temp.path().join("run-master.json");
        write_file(&master, &json!({"loan": {"status": "open"}}));

        let mut snapshot = Snapshot::load(&master).expect("load");
        assert_eq!(
            snapshot.get_path("loan.status"),
            Some(&json!("open"))
        );
        snapshot.set_path("loan.terms.months", json!(12));
        assert_eq!(snapshot.get_path("loan.terms.months"), Some(&json!(12)));
        snapshot.set_path("flag", json!(true));
        assert_eq!(snapshot.get_path("flag"), Some(&json!(true)));
    }

    #[test]
    fn array_helpers_find_and_push() {
        let temp = tempfile::tempdir().expect("tempdir");
        let master = temp.path().join("run-master.json");
        write_file(&master, &json!({"documents": [{"id": "d1", "kind": "id"}]}));

        let mut snapshot = Snapshot::load(&master).expect("load");
        let found = snapshot
            .get_from_array("documents", "id", &json!("d1"))
            .expect("element");
        assert_eq!(found.get("kind"), Some(&json!("id")));

        snapshot.push_to_array("documents", json!({"id": "d2"}));
        snapshot.push_to_array("notes", json!("first"));
        assert_eq!(
            snapshot.data().get("documents").and_then(Value::as_array).map(Vec::len),
            Some(2)
        );
        assert_eq!(snapshot.get_path("notes"), Some(&json!(["first"])));
    }

    #[test]
    fn missing_snapshot_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = Snapshot::load(&temp.path().join("absent.json")).expect_err("missing");
        assert!(err.to_string().contains("no snapshot found"));
    }
}
