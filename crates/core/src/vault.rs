//! Filesystem-backed note store rooted at a vault directory.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tokio::task;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::{ConflictPolicy, MoveConfig, VaultConfig};
use crate::error::{ConfigError, NoteError};
use crate::extractor;
use crate::models::EntryRef;
use crate::paths;
use crate::store::NoteStore;

pub struct FsVault {
    root: PathBuf,
    excludes: GlobSet,
    extensions: Vec<String>,
    create_missing_folders: bool,
    conflict: ConflictPolicy,
    // Serializes the collision check and rename so concurrent moves never
    // claim the same free name.
    commit: Mutex<()>,
}

impl FsVault {
    pub fn open(root: &Path, vault: &VaultConfig, moves: &MoveConfig) -> Result<Self, ConfigError> {
        if !root.is_dir() {
            return Err(ConfigError::Vault(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        let root = root
            .canonicalize()
            .map_err(|e| ConfigError::Vault(format!("{}: {e}", root.display())))?;
        Ok(FsVault {
            root,
            excludes: build_globset(&vault.exclude)?,
            extensions: vault.extensions.iter().map(|e| e.to_lowercase()).collect(),
            create_missing_folders: moves.create_missing_folders,
            conflict: moves.conflict,
            commit: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn to_fs_path(&self, vault_path: &str) -> Result<PathBuf, NoteError> {
        if paths::has_parent_segment(vault_path) {
            return Err(NoteError::InvalidPath {
                path: vault_path.to_string(),
            });
        }
        let normalized = paths::normalize(vault_path);
        let mut out = self.root.clone();
        for segment in normalized.split('/').filter(|s| !s.is_empty()) {
            out.push(segment);
        }
        Ok(out)
    }

    /// Vault path of a filesystem path under the root, if it is one.
    pub fn to_vault_path(&self, fs_path: &Path) -> Option<String> {
        let rel = fs_path.strip_prefix(&self.root).ok()?;
        Some(paths::normalize(&rel.to_string_lossy()))
    }

    /// True for files the vault treats as notes: matching extension, not
    /// hidden, not excluded.
    pub fn is_note(&self, fs_path: &Path) -> bool {
        let Some(rel) = fs_path.strip_prefix(&self.root).ok() else {
            return false;
        };
        if rel.components().any(|c| is_hidden(Path::new(c.as_os_str()))) {
            return false;
        }
        if self.excludes.is_match(rel) {
            return false;
        }
        has_extension(fs_path, &self.extensions)
    }

    /// Moves a note to an exact vault path. Refuses to overwrite.
    pub async fn relocate(&self, from: &str, to: &str) -> Result<(), NoteError> {
        let source = self.to_fs_path(from)?;
        let target = self.to_fs_path(to)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| NoteError::from_io(&paths::parent_folder(to), &e))?;
        }
        let _guard = self.commit.lock().await;
        if fs::metadata(&target).await.is_ok() {
            return Err(NoteError::Collision {
                path: paths::normalize(to),
            });
        }
        fs::rename(&source, &target)
            .await
            .map_err(|e| NoteError::from_io(from, &e))
    }

    async fn prepare_folder(&self, folder: &str) -> Result<(), NoteError> {
        match self.resolve(folder).await {
            EntryRef::Folder(_) => Ok(()),
            EntryRef::File(path) => Err(NoteError::NotAFolder { path }),
            EntryRef::NotFound if self.create_missing_folders => {
                let dir = self.to_fs_path(folder)?;
                // create_dir_all tolerates a concurrent creator.
                fs::create_dir_all(&dir)
                    .await
                    .map_err(|e| NoteError::from_io(folder, &e))?;
                debug!(folder, "created folder");
                Ok(())
            }
            EntryRef::NotFound => Err(NoteError::MissingFolder {
                path: folder.to_string(),
            }),
        }
    }

    async fn free_name(&self, folder: &str, name: &str) -> Result<String, NoteError> {
        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (name, None),
        };
        let mut counter = 1;
        loop {
            let candidate = match ext {
                Some(ext) => format!("{stem}_{counter}.{ext}"),
                None => format!("{stem}_{counter}"),
            };
            let path = paths::join(folder, &candidate);
            if fs::metadata(self.to_fs_path(&path)?).await.is_err() {
                return Ok(path);
            }
            counter += 1;
        }
    }
}

#[async_trait::async_trait]
impl NoteStore for FsVault {
    async fn list_notes(&self) -> Result<Vec<String>, NoteError> {
        let root = self.root.clone();
        let excludes = self.excludes.clone();
        let extensions = self.extensions.clone();
        let walked = task::spawn_blocking(move || walk_notes(&root, &excludes, &extensions))
            .await
            .map_err(|e| NoteError::Io {
                path: "/".to_string(),
                reason: e.to_string(),
            })?;
        let mut notes: Vec<String> = walked
            .iter()
            .filter_map(|p| self.to_vault_path(p))
            .collect();
        notes.sort();
        Ok(notes)
    }

    async fn read_tags(&self, path: &str) -> Result<BTreeSet<String>, NoteError> {
        let file = self.to_fs_path(path)?;
        let content = fs::read_to_string(&file)
            .await
            .map_err(|e| NoteError::TagRead {
                path: paths::normalize(path),
                reason: e.to_string(),
            })?;
        Ok(extractor::extract_tags(&content))
    }

    async fn resolve(&self, path: &str) -> EntryRef {
        let Ok(fs_path) = self.to_fs_path(path) else {
            return EntryRef::NotFound;
        };
        match fs::metadata(&fs_path).await {
            Ok(meta) if meta.is_dir() => EntryRef::Folder(paths::normalize(path)),
            Ok(_) => EntryRef::File(paths::normalize(path)),
            Err(_) => EntryRef::NotFound,
        }
    }

    async fn move_note(&self, path: &str, folder: &str) -> Result<String, NoteError> {
        let path = paths::normalize(path);
        let folder = paths::normalize(folder);
        match self.resolve(&path).await {
            EntryRef::File(_) => {}
            EntryRef::Folder(path) => return Err(NoteError::NotANote { path }),
            EntryRef::NotFound => return Err(NoteError::NoteNotFound { path }),
        }
        if paths::same_folder(&paths::parent_folder(&path), &folder) {
            return Ok(path);
        }
        self.prepare_folder(&folder).await?;

        let name = paths::file_name(&path).to_string();
        let _guard = self.commit.lock().await;
        let mut dest = paths::join(&folder, &name);
        if fs::metadata(self.to_fs_path(&dest)?).await.is_ok() {
            match self.conflict {
                ConflictPolicy::Fail => return Err(NoteError::Collision { path: dest }),
                ConflictPolicy::Rename => dest = self.free_name(&folder, &name).await?,
            }
        }
        fs::rename(self.to_fs_path(&path)?, self.to_fs_path(&dest)?)
            .await
            .map_err(|e| NoteError::from_io(&path, &e))?;
        Ok(dest)
    }
}

fn walk_notes(root: &Path, excludes: &GlobSet, extensions: &[String]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || should_descend(root, e.path(), excludes))
    {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            out.push(entry.into_path());
        }
    }
    out
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat)
            .map_err(|e| ConfigError::Invalid(format!("exclude pattern {pat:?}: {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| ConfigError::Invalid(e.to_string()))
}

fn should_descend(root: &Path, path: &Path, excludes: &GlobSet) -> bool {
    if is_hidden(path) {
        return false;
    }
    match path.strip_prefix(root) {
        Ok(rel) => !excludes.is_match(rel),
        Err(_) => true,
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| x == &e.to_lowercase()))
        .unwrap_or(false)
}
