//! Common test utilities and helpers for sitesync tests

use anyhow::{anyhow, Result};
use assert_fs::prelude::*;
use assert_fs::TempDir;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use sitesync::{ExclusionRules, RemoteSession, RuleSpec, SyncConfig};

pub const REMOTE_ROOT: &str = "/htdocs";

/// In-memory session that records calls and fails on demand
#[derive(Debug, Default)]
pub struct RecordingSession {
    pub fail_dirs: HashSet<String>,
    pub fail_uploads: HashSet<String>,
    pub ensured: Vec<String>,
    pub uploads: Vec<(PathBuf, String)>,
    pub disconnects: usize,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_dir(mut self, remote_path: &str) -> Self {
        self.fail_dirs.insert(remote_path.to_string());
        self
    }

    pub fn failing_upload(mut self, remote_path: &str) -> Self {
        self.fail_uploads.insert(remote_path.to_string());
        self
    }

    pub fn uploaded_remote_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.uploads.iter().map(|(_, remote)| remote.as_str()).collect();
        paths.sort();
        paths
    }
}

impl RemoteSession for RecordingSession {
    fn ensure_dir(&mut self, path: &str) -> Result<()> {
        self.ensured.push(path.to_string());
        if self.fail_dirs.contains(path) {
            return Err(anyhow!("550 Create directory operation failed: {}", path));
        }
        Ok(())
    }

    fn upload_file(&mut self, local_path: &Path, remote_path: &str) -> Result<u64> {
        if self.fail_uploads.contains(remote_path) {
            return Err(anyhow!("451 Transfer aborted: {}", remote_path));
        }
        let size = std::fs::metadata(local_path)?.len();
        self.uploads
            .push((local_path.to_path_buf(), remote_path.to_string()));
        Ok(size)
    }

    fn disconnect(&mut self) -> Result<()> {
        self.disconnects += 1;
        Ok(())
    }
}

/// Create a local site tree from relative file paths
pub fn site_tree(files: &[&str]) -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp dir");
    for file in files {
        temp.child(file)
            .write_str(&format!("content of {}", file))
            .expect("Failed to write test file");
    }
    temp
}

pub fn sync_config(root: &Path, rules: Vec<RuleSpec>) -> SyncConfig {
    SyncConfig {
        local_root: root.to_path_buf(),
        remote_root: REMOTE_ROOT.to_string(),
        exclude_rules: ExclusionRules::compile(&rules).expect("Failed to compile rules"),
        max_file_size: None,
    }
}

pub fn sorted(mut paths: Vec<&str>) -> Vec<&str> {
    paths.sort();
    paths
}
