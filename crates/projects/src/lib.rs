//! Durable JSON-document project store.
//!
//! Each project is a directory under the store root:
//!
//! ```text
//! projects/<slug>/
//!   project.json     — metadata (display name, description, timestamps)
//!   agents.json      — the agent roster document
//!   room_plan.json   — the room plan document
//!   kb/<tag>/*.txt   — per-project knowledge snippets
//! ```
//!
//! Semantics are last-write-wins on local files; durability beyond that is an
//! explicit non-goal. Project ids are slugified before touching the
//! filesystem, and resolved paths are checked against the store root.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use showroom_core::{ProjectError, slugify};
use tracing::{info, warn};

/// Project metadata document (`project.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMeta {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub created_ms: i64,
    pub updated_ms: i64,
}

/// One entry in a project's knowledge listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub tag: String,
    pub name: String,
    pub file: String,
}

/// A loaded knowledge snippet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeText {
    pub tag: String,
    pub name: String,
    pub text: String,
}

/// Aggregate view of one project.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetails {
    pub project: ProjectMeta,
    pub agents: Vec<Value>,
    pub room_plan: Value,
    pub knowledge: Vec<KnowledgeEntry>,
}

/// The project store.
pub struct ProjectStore {
    root: PathBuf,
    template_room_plan: Option<PathBuf>,
    template_agents: Option<PathBuf>,
}

impl ProjectStore {
    /// Open (creating if needed) a store rooted at `root`. New projects are
    /// seeded from the template documents when those exist.
    pub fn open(
        root: impl Into<PathBuf>,
        template_room_plan: Option<PathBuf>,
        template_agents: Option<PathBuf>,
    ) -> Result<Self, ProjectError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        info!(root = %root.display(), "Project store initialized");
        Ok(Self { root, template_room_plan, template_agents })
    }

    /// List all projects, skipping directories whose metadata is unreadable.
    pub fn list_projects(&self) -> Vec<ProjectMeta> {
        let mut out = Vec::new();
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return out;
        };
        let mut dirs: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();

        for dir in dirs {
            let id = dir.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
            match self.load_meta(&id) {
                Ok(meta) => out.push(meta),
                Err(e) => warn!(project = %id, error = %e, "Skipping unloadable project"),
            }
        }
        info!(count = out.len(), "Project list loaded");
        out
    }

    /// Create a new project, seeded from the template documents.
    pub fn create_project(
        &self,
        display_name: &str,
        project_id: Option<&str>,
        description: &str,
    ) -> Result<ProjectMeta, ProjectError> {
        let slug = slugify(project_id.unwrap_or(display_name));
        let dir = self.project_dir(&slug)?;
        if dir.exists() {
            return Err(ProjectError::AlreadyExists(slug));
        }
        std::fs::create_dir_all(dir.join("kb"))?;

        let now = now_ms();
        let meta = ProjectMeta {
            id: slug.clone(),
            display_name: if display_name.is_empty() { slug.clone() } else { display_name.to_string() },
            description: description.to_string(),
            created_ms: now,
            updated_ms: now,
        };
        write_json(&dir.join("project.json"), &serde_json::to_value(&meta)?)?;

        let agents = self
            .template_agents
            .as_deref()
            .and_then(read_json_opt)
            .unwrap_or_else(|| json!({"agents": []}));
        let room_plan = self
            .template_room_plan
            .as_deref()
            .and_then(read_json_opt)
            .unwrap_or_else(|| json!({}));
        write_json(&dir.join("agents.json"), &agents)?;
        write_json(&dir.join("room_plan.json"), &room_plan)?;

        info!(project = %slug, "Project created");
        Ok(meta)
    }

    /// Update display name and/or description; bumps `updated_ms`.
    pub fn update_metadata(
        &self,
        project_id: &str,
        display_name: Option<&str>,
        description: Option<&str>,
    ) -> Result<ProjectMeta, ProjectError> {
        self.require_project(project_id)?;
        let mut meta = self.load_meta(project_id)?;
        if let Some(name) = display_name {
            meta.display_name = name.to_string();
        }
        if let Some(desc) = description {
            meta.description = desc.to_string();
        }
        meta.updated_ms = now_ms();
        write_json(
            &self.project_dir(project_id)?.join("project.json"),
            &serde_json::to_value(&meta)?,
        )?;
        info!(project = %project_id, "Metadata saved");
        Ok(meta)
    }

    /// The roster entries of a project's agents document.
    pub fn load_agents(&self, project_id: &str) -> Result<Vec<Value>, ProjectError> {
        self.require_project(project_id)?;
        let path = self.project_dir(project_id)?.join("agents.json");
        if !path.exists() {
            return Ok(Vec::new());
        }
        let doc = read_json(&path)?;
        Ok(doc
            .get("agents")
            .and_then(|a| a.as_array())
            .cloned()
            .unwrap_or_default())
    }

    /// Replace a project's agents document.
    pub fn save_agents(&self, project_id: &str, agents: &[Value]) -> Result<(), ProjectError> {
        self.require_project(project_id)?;
        write_json(
            &self.project_dir(project_id)?.join("agents.json"),
            &json!({"agents": agents}),
        )?;
        self.touch(project_id, "agents saved")
    }

    /// A project's room plan document; empty object when absent.
    pub fn load_room_plan(&self, project_id: &str) -> Result<Value, ProjectError> {
        self.require_project(project_id)?;
        let path = self.project_dir(project_id)?.join("room_plan.json");
        if !path.exists() {
            return Ok(json!({}));
        }
        read_json(&path)
    }

    /// Replace a project's room plan document.
    pub fn save_room_plan(&self, project_id: &str, room_plan: &Value) -> Result<(), ProjectError> {
        self.require_project(project_id)?;
        write_json(&self.project_dir(project_id)?.join("room_plan.json"), room_plan)?;
        self.touch(project_id, "room plan saved")
    }

    /// List a project's knowledge snippets.
    pub fn list_knowledge(&self, project_id: &str) -> Result<Vec<KnowledgeEntry>, ProjectError> {
        self.require_project(project_id)?;
        let kb_root = self.kb_root(project_id)?;
        let mut items = Vec::new();
        let Ok(entries) = std::fs::read_dir(&kb_root) else {
            return Ok(items);
        };
        let mut tag_dirs: Vec<PathBuf> =
            entries.flatten().map(|e| e.path()).filter(|p| p.is_dir()).collect();
        tag_dirs.sort();

        for tag_dir in tag_dirs {
            let tag = tag_dir.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
            let Ok(files) = std::fs::read_dir(&tag_dir) else {
                continue;
            };
            let mut paths: Vec<PathBuf> = files.flatten().map(|e| e.path()).collect();
            paths.sort();
            for path in paths {
                let is_text = matches!(
                    path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref(),
                    Some("txt") | Some("md")
                );
                if path.is_file() && is_text {
                    items.push(KnowledgeEntry {
                        tag: tag.clone(),
                        name: path.file_stem().map(|n| n.to_string_lossy().to_string()).unwrap_or_default(),
                        file: path
                            .strip_prefix(&kb_root)
                            .unwrap_or(&path)
                            .to_string_lossy()
                            .to_string(),
                    });
                }
            }
        }
        Ok(items)
    }

    /// Read one knowledge snippet, trying `.txt` then `.md`.
    pub fn read_knowledge(
        &self,
        project_id: &str,
        tag: &str,
        name: &str,
    ) -> Result<KnowledgeText, ProjectError> {
        self.require_project(project_id)?;
        let kb_root = self.kb_root(project_id)?;
        let safe_tag = slugify(tag);
        let safe_name = slugify(name);
        for ext in ["txt", "md"] {
            let path = kb_root.join(&safe_tag).join(format!("{safe_name}.{ext}"));
            if path.exists() {
                return Ok(KnowledgeText {
                    tag: safe_tag,
                    name: safe_name,
                    text: std::fs::read_to_string(&path)?,
                });
            }
        }
        Err(ProjectError::KnowledgeNotFound { tag: safe_tag, name: safe_name })
    }

    /// Create or update a knowledge snippet.
    pub fn upsert_knowledge(
        &self,
        project_id: &str,
        tag: &str,
        name: &str,
        text: &str,
        overwrite: bool,
    ) -> Result<KnowledgeEntry, ProjectError> {
        self.require_project(project_id)?;
        if tag.trim().is_empty() || name.trim().is_empty() {
            return Err(ProjectError::MissingTagOrName);
        }
        let kb_root = self.kb_root(project_id)?;
        let safe_tag = slugify(tag);
        let safe_name = slugify(name);
        let tag_dir = kb_root.join(&safe_tag);
        std::fs::create_dir_all(&tag_dir)?;

        let path = tag_dir.join(format!("{safe_name}.txt"));
        if path.exists() && !overwrite {
            return Err(ProjectError::KnowledgeExists { tag: safe_tag, name: safe_name });
        }
        std::fs::write(&path, text)?;
        self.touch(project_id, "knowledge saved")?;
        Ok(KnowledgeEntry {
            tag: safe_tag,
            name: safe_name,
            file: path.strip_prefix(&kb_root).unwrap_or(&path).to_string_lossy().to_string(),
        })
    }

    /// Delete a knowledge snippet, trying `.txt` then `.md`.
    pub fn delete_knowledge(
        &self,
        project_id: &str,
        tag: &str,
        name: &str,
    ) -> Result<(), ProjectError> {
        self.require_project(project_id)?;
        let kb_root = self.kb_root(project_id)?;
        let safe_tag = slugify(tag);
        let safe_name = slugify(name);
        for ext in ["txt", "md"] {
            let path = kb_root.join(&safe_tag).join(format!("{safe_name}.{ext}"));
            if path.exists() {
                std::fs::remove_file(&path)?;
                self.touch(project_id, "knowledge deleted")?;
                return Ok(());
            }
        }
        Err(ProjectError::KnowledgeNotFound { tag: safe_tag, name: safe_name })
    }

    /// Aggregate view: metadata, roster, room plan, knowledge listing.
    pub fn get_project_details(&self, project_id: &str) -> Result<ProjectDetails, ProjectError> {
        self.require_project(project_id)?;
        Ok(ProjectDetails {
            project: self.load_meta(project_id)?,
            agents: self.load_agents(project_id)?,
            room_plan: self.load_room_plan(project_id)?,
            knowledge: self.list_knowledge(project_id)?,
        })
    }

    /// The knowledge root of a project, for building a per-project index.
    pub fn project_kb_root(&self, project_id: &str) -> Result<PathBuf, ProjectError> {
        self.require_project(project_id)?;
        self.kb_root(project_id)
    }

    // --- internals ---

    fn project_dir(&self, project_id: &str) -> Result<PathBuf, ProjectError> {
        let slug = slugify(project_id);
        let path = self.root.join(&slug);
        // slugify leaves no separators, but keep the traversal guard anyway
        if path.parent() != Some(self.root.as_path()) {
            return Err(ProjectError::InvalidPath);
        }
        Ok(path)
    }

    fn kb_root(&self, project_id: &str) -> Result<PathBuf, ProjectError> {
        Ok(self.project_dir(project_id)?.join("kb"))
    }

    fn require_project(&self, project_id: &str) -> Result<(), ProjectError> {
        if !self.project_dir(project_id)?.exists() {
            return Err(ProjectError::NotFound(slugify(project_id)));
        }
        Ok(())
    }

    fn load_meta(&self, project_id: &str) -> Result<ProjectMeta, ProjectError> {
        let path = self.project_dir(project_id)?.join("project.json");
        if !path.exists() {
            // directory without metadata still counts as a project
            let now = now_ms();
            return Ok(ProjectMeta {
                id: slugify(project_id),
                display_name: project_id.to_string(),
                description: String::new(),
                created_ms: now,
                updated_ms: now,
            });
        }
        let doc = read_json(&path)?;
        serde_json::from_value(doc).map_err(|e| ProjectError::MalformedDocument {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn touch(&self, project_id: &str, reason: &str) -> Result<(), ProjectError> {
        let mut meta = self.load_meta(project_id)?;
        meta.updated_ms = now_ms();
        write_json(
            &self.project_dir(project_id)?.join("project.json"),
            &serde_json::to_value(&meta)?,
        )?;
        info!(project = %project_id, reason, "Project touched");
        Ok(())
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn read_json(path: &Path) -> Result<Value, ProjectError> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| ProjectError::MalformedDocument {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn read_json_opt(path: &Path) -> Option<Value> {
    std::fs::read_to_string(path).ok().and_then(|raw| serde_json::from_str(&raw).ok())
}

fn write_json(path: &Path, value: &Value) -> Result<(), ProjectError> {
    let pretty = serde_json::to_string_pretty(value)?;
    std::fs::write(path, pretty)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, ProjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::open(dir.path().join("projects"), None, None).unwrap();
        (dir, store)
    }

    #[test]
    fn create_and_list() {
        let (_dir, store) = store();
        let meta = store.create_project("Demo Booth", None, "a demo").unwrap();
        assert_eq!(meta.id, "demo_booth");
        let listed = store.list_projects();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].display_name, "Demo Booth");
    }

    #[test]
    fn duplicate_create_rejected() {
        let (_dir, store) = store();
        store.create_project("Demo", None, "").unwrap();
        assert!(matches!(
            store.create_project("Demo", None, ""),
            Err(ProjectError::AlreadyExists(_))
        ));
    }

    #[test]
    fn metadata_update_bumps_timestamp() {
        let (_dir, store) = store();
        let created = store.create_project("Demo", None, "").unwrap();
        let updated = store.update_metadata("demo", Some("Renamed"), None).unwrap();
        assert_eq!(updated.display_name, "Renamed");
        assert!(updated.updated_ms >= created.updated_ms);
        assert_eq!(updated.description, "");
    }

    #[test]
    fn unknown_project_is_not_found() {
        let (_dir, store) = store();
        assert!(matches!(
            store.load_agents("ghost"),
            Err(ProjectError::NotFound(_))
        ));
    }

    #[test]
    fn agents_roundtrip() {
        let (_dir, store) = store();
        store.create_project("Demo", None, "").unwrap();
        let roster = vec![json!({"id": "ada", "display_name": "Ada"})];
        store.save_agents("demo", &roster).unwrap();
        let loaded = store.load_agents("demo").unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0]["id"], "ada");
    }

    #[test]
    fn room_plan_roundtrip() {
        let (_dir, store) = store();
        store.create_project("Demo", None, "").unwrap();
        let plan = json!({"zones": [{"id": "lab"}]});
        store.save_room_plan("demo", &plan).unwrap();
        assert_eq!(store.load_room_plan("demo").unwrap()["zones"][0]["id"], "lab");
    }

    #[test]
    fn knowledge_crud() {
        let (_dir, store) = store();
        store.create_project("Demo", None, "").unwrap();

        let entry = store
            .upsert_knowledge("demo", "Products", "Widget Specs", "Specs here.", true)
            .unwrap();
        assert_eq!(entry.tag, "products");
        assert_eq!(entry.name, "widget_specs");

        let listed = store.list_knowledge("demo").unwrap();
        assert_eq!(listed.len(), 1);

        let text = store.read_knowledge("demo", "products", "widget_specs").unwrap();
        assert_eq!(text.text, "Specs here.");

        store.delete_knowledge("demo", "products", "widget_specs").unwrap();
        assert!(store.list_knowledge("demo").unwrap().is_empty());
        assert!(matches!(
            store.read_knowledge("demo", "products", "widget_specs"),
            Err(ProjectError::KnowledgeNotFound { .. })
        ));
    }

    #[test]
    fn upsert_without_overwrite_rejected() {
        let (_dir, store) = store();
        store.create_project("Demo", None, "").unwrap();
        store.upsert_knowledge("demo", "t", "n", "v1", true).unwrap();
        assert!(matches!(
            store.upsert_knowledge("demo", "t", "n", "v2", false),
            Err(ProjectError::KnowledgeExists { .. })
        ));
    }

    #[test]
    fn blank_tag_or_name_rejected() {
        let (_dir, store) = store();
        store.create_project("Demo", None, "").unwrap();
        assert!(matches!(
            store.upsert_knowledge("demo", " ", "n", "", true),
            Err(ProjectError::MissingTagOrName)
        ));
    }

    #[test]
    fn details_aggregate() {
        let (_dir, store) = store();
        store.create_project("Demo", None, "desc").unwrap();
        store.upsert_knowledge("demo", "t", "n", "text", true).unwrap();
        let details = store.get_project_details("demo").unwrap();
        assert_eq!(details.project.description, "desc");
        assert_eq!(details.knowledge.len(), 1);
        assert!(details.agents.is_empty());
    }

    #[test]
    fn templates_seed_new_projects() {
        let dir = tempfile::tempdir().unwrap();
        let tpl_agents = dir.path().join("agents.json");
        std::fs::write(&tpl_agents, r#"{"agents": [{"id": "seed"}]}"#).unwrap();
        let store = ProjectStore::open(
            dir.path().join("projects"),
            None,
            Some(tpl_agents),
        )
        .unwrap();
        store.create_project("Demo", None, "").unwrap();
        let agents = store.load_agents("demo").unwrap();
        assert_eq!(agents[0]["id"], "seed");
    }

    #[test]
    fn traversal_attempts_are_slugified_away() {
        let (_dir, store) = store();
        // slugification turns the separators into underscores; no escape
        assert!(matches!(
            store.load_agents("../../etc"),
            Err(ProjectError::NotFound(_))
        ));
    }
}
