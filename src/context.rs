// File: ./src/context.rs
/*! Where a calendar install keeps its files.

Each site an editor schedules for can get its own profile: a `sites/<host>`
directory under the platform config dir holding `edcal.toml`, and a matching
one under the data dir for the log file. Without a profile the base
directories are used.

Config loading and logger setup take the context explicitly.
*/

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub const CONFIG_FILE: &str = "edcal.toml";
pub const LOG_FILE: &str = "edcal.log";

pub trait AppContext: Send + Sync + std::fmt::Debug {
    /// Directory that holds the config file. Created on demand.
    fn config_dir(&self) -> Result<PathBuf>;

    /// Directory for the log file, or `None` when file logging is unavailable.
    fn log_dir(&self) -> Option<PathBuf>;

    fn config_path(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join(CONFIG_FILE))
    }

    fn log_path(&self) -> Option<PathBuf> {
        self.log_dir().map(|d| d.join(LOG_FILE))
    }
}

/// Turns a site name or host into a directory-safe profile key.
///
/// `"https://News.Example.com/"` and `"news.example.com"` map to the same key.
pub fn profile_key(site: &str) -> Option<String> {
    let trimmed = site.trim();
    let host = trimmed
        .split_once("://")
        .map_or(trimmed, |(_, rest)| rest)
        .trim_end_matches('/');
    let key: String = host
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '.' | '-' => c,
            'A'..='Z' => c.to_ascii_lowercase(),
            _ => '_',
        })
        .collect();
    let key = key.trim_matches(|c| c == '.' || c == '_').to_string();
    if key.is_empty() { None } else { Some(key) }
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf> {
    std::fs::create_dir_all(&path)
        .with_context(|| format!("Failed to create directory: {:?}", path))?;
    Ok(path)
}

/// Platform directories, optionally narrowed to one site's profile.
#[derive(Clone, Debug, Default)]
pub struct SiteContext {
    profile: Option<String>,
}

impl SiteContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for one site. Names that reduce to nothing fall back to the
    /// base directories.
    pub fn for_site(site: &str) -> Self {
        Self {
            profile: profile_key(site),
        }
    }

    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("org", "edcal", "edcal")
            .ok_or_else(|| anyhow::anyhow!("No home directory"))
    }

    fn scoped(&self, base: PathBuf) -> PathBuf {
        match &self.profile {
            Some(p) => base.join("sites").join(p),
            None => base,
        }
    }
}

impl AppContext for SiteContext {
    fn config_dir(&self) -> Result<PathBuf> {
        let proj = Self::project_dirs()?;
        ensure_dir(self.scoped(proj.config_dir().to_path_buf()))
    }

    fn log_dir(&self) -> Option<PathBuf> {
        let proj = Self::project_dirs().ok()?;
        ensure_dir(self.scoped(proj.data_dir().to_path_buf())).ok()
    }
}

/// A throwaway root under the temp dir, removed on drop.
#[derive(Debug)]
pub struct TestContext {
    pub root: PathBuf,
    profile: Option<String>,
}

impl TestContext {
    pub fn new() -> Self {
        let root = std::env::temp_dir().join(format!("edcal_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&root).expect("failed to create TestContext temp dir");
        Self {
            root,
            profile: None,
        }
    }

    pub fn for_site(site: &str) -> Self {
        let mut ctx = Self::new();
        ctx.profile = profile_key(site);
        ctx
    }

    fn scoped(&self, dir: &str) -> PathBuf {
        match &self.profile {
            Some(p) => self.root.join(dir).join("sites").join(p),
            None => self.root.join(dir),
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AppContext for TestContext {
    fn config_dir(&self) -> Result<PathBuf> {
        ensure_dir(self.scoped("config"))
    }

    fn log_dir(&self) -> Option<PathBuf> {
        ensure_dir(self.scoped("logs")).ok()
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}
