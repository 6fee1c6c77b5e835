use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use uuid::Uuid;

/// A named, per-structure rendering state saved by the viewer.
///
/// Every property is a typed field; the client sends and receives the whole
/// record. Overlay payloads (labels, distances, selections) are opaque
/// client text and stored verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewRecord {
    pub pdb_id: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub saved_at: u64,
    #[serde(default = "public_user")]
    pub creator: String,
    #[serde(default = "public_user")]
    pub modifier: String,
    #[serde(default)]
    pub lock: bool,
    #[serde(default)]
    pub show: DisplayToggles,
    #[serde(default)]
    pub focus: Focus,
    #[serde(default = "empty_overlay")]
    pub labels: String,
    #[serde(default = "empty_overlay")]
    pub distances: String,
    #[serde(default = "empty_overlay")]
    pub selected: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub camera: CameraState,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayToggles {
    #[serde(default)]
    pub sidechain: bool,
    #[serde(default)]
    pub hydrogen: bool,
    #[serde(default)]
    pub ca_trace: bool,
    #[serde(default)]
    pub trace: bool,
    #[serde(default)]
    pub water: bool,
    #[serde(default)]
    pub ribbon: bool,
    #[serde(default)]
    pub backbone: bool,
    #[serde(default)]
    pub all_atom: bool,
    #[serde(default)]
    pub ligands: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Focus {
    #[serde(default)]
    pub res_id: String,
    #[serde(default = "no_atom")]
    pub i_atom: i64,
}

impl Default for Focus {
    fn default() -> Self {
        Self {
            res_id: String::new(),
            i_atom: -1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraState {
    #[serde(default)]
    pub z_front: f64,
    #[serde(default)]
    pub z_back: f64,
    #[serde(default = "unit_zoom")]
    pub zoom: f64,
    #[serde(default)]
    pub pos: [f64; 3],
    #[serde(default = "unit_y")]
    pub up: [f64; 3],
    #[serde(default = "unit_z", rename = "in")]
    pub toward: [f64; 3],
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            z_front: 0.0,
            z_back: 0.0,
            zoom: unit_zoom(),
            pos: [0.0; 3],
            up: unit_y(),
            toward: unit_z(),
        }
    }
}

fn public_user() -> String {
    "public".to_string()
}

fn empty_overlay() -> String {
    "[];".to_string()
}

fn no_atom() -> i64 {
    -1
}

fn unit_zoom() -> f64 {
    1.0
}

fn unit_y() -> [f64; 3] {
    [0.0, 1.0, 0.0]
}

fn unit_z() -> [f64; 3] {
    [0.0, 0.0, 1.0]
}

/// One JSON file per (structure, view) under the view root.
#[derive(Debug, Clone)]
pub struct ViewStore {
    root: PathBuf,
}

impl ViewStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Upsert a view. Fills in a fresh id when the client sent none and
    /// stamps the save time; returns the record as persisted.
    pub async fn save(&self, mut view: ViewRecord) -> Result<ViewRecord> {
        if view.id.is_empty() {
            view.id = Uuid::new_v4().to_string();
        }
        check_view_id(&view.id)?;
        view.saved_at = unix_now();

        let dir = self.root.join(&view.pdb_id);
        fs::create_dir_all(&dir)
            .await
            .context("failed to create view directory")?;
        let path = dir.join(format!("{}.json", view.id));
        let json = serde_json::to_string_pretty(&view).context("failed to encode view")?;
        fs::write(&path, json)
            .await
            .with_context(|| format!("failed to write view {}", path.display()))?;
        tracing::debug!(pdb_id = %view.pdb_id, view_id = %view.id, "view saved");
        Ok(view)
    }

    /// All views for a structure, sorted by their ordering key.
    pub async fn list(&self, pdb_id: &str) -> Result<Vec<ViewRecord>> {
        let dir = self.root.join(pdb_id);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("failed to list views"),
        };

        let mut views = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let json = fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read view {}", path.display()))?;
            let view: ViewRecord = serde_json::from_str(&json)
                .with_context(|| format!("failed to decode view {}", path.display()))?;
            views.push(view);
        }
        views.sort_by_key(|v| v.order);
        Ok(views)
    }

    /// Remove a view; deleting one that does not exist is a no-op.
    pub async fn delete(&self, pdb_id: &str, view_id: &str) -> Result<bool> {
        check_view_id(view_id)?;
        let path = self.root.join(pdb_id).join(format!("{view_id}.json"));
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("failed to delete view {}", path.display())),
        }
    }
}

/// View ids become file names; restrict them accordingly.
fn check_view_id(id: &str) -> Result<()> {
    let ok = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if ok {
        Ok(())
    } else {
        anyhow::bail!("view id {id:?} contains unsupported characters")
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
