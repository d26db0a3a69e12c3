use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use directories::BaseDirs;

#[cfg(windows)]
const PATH_LIST_SEPARATOR: char = ';';
#[cfg(not(windows))]
const PATH_LIST_SEPARATOR: char = ':';

/// Common locations of a host CPython standard library. Pure-Python modules
/// found there are importable by the embedded interpreter.
const HOST_STDLIB_CANDIDATES: &[&str] = &[
    "/usr/local/lib/python3.13",
    "/usr/local/lib/python3.12",
    "/usr/local/lib/python3.11",
    "/usr/local/lib/python3.10",
    "/usr/lib/python3",
    "/usr/lib/python3.12",
    "/usr/lib/python3.11",
    "/usr/lib/python3.10",
];

const DEFAULT_RECURSION_LIMIT: usize = 1000;

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inner: default_map(),
            config_path: default_config_path(),
        }
    }
}

impl Config {
    /// Defaults, then `.pyreplrc`, then environment variables.
    pub fn load() -> Self {
        let config_path = default_config_path();
        match Self::load_from(&config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!("ignoring unreadable config {}: {e:#}", config_path.display());
                Self::default()
            }
        }
    }

    /// Like [`Config::load`] but reads the rc file at `config_path`. A missing
    /// file is not an error.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let mut map = default_map();

        if config_path.exists() {
            let file = fs::File::open(config_path)
                .with_context(|| format!("opening config file: {}", config_path.display()))?;
            for line in BufReader::new(file).lines() {
                let line = line
                    .with_context(|| format!("reading config file: {}", config_path.display()))?;
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((k, v)) = line.split_once('=') {
                    map.insert(k.trim().to_string(), v.trim().to_string());
                }
            }
        }

        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Ok(Self {
            inner: map,
            config_path: config_path.to_path_buf(),
        })
    }

    /// Defaults overlaid with explicit pairs; neither the rc file nor the
    /// environment is consulted at construction.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = default_map();
        for (k, v) in pairs {
            map.insert(k.into(), v.into());
        }
        Self {
            inner: map,
            config_path: default_config_path(),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        // ENV first
        if let Ok(v) = env::var(key) {
            return Some(v);
        }
        self.inner.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn sanitize_input(&self) -> bool {
        self.get_bool("PYREPL_SANITIZE_INPUT")
    }

    /// Maximum Python call depth before `RecursionError`.
    pub fn recursion_limit(&self) -> usize {
        self.get("PYREPL_RECURSION_LIMIT")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_RECURSION_LIMIT)
    }

    /// `sys.path` entries for the interpreter: configured paths first, then
    /// any host stdlib directories that exist.
    pub fn stdlib_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .get("PYREPL_STDLIB_PATHS")
            .map(|v| {
                v.split(PATH_LIST_SEPARATOR)
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        if self.get_bool("PYREPL_HOST_STDLIB") {
            paths.extend(
                HOST_STDLIB_CANDIDATES
                    .iter()
                    .filter(|p| Path::new(p).is_dir())
                    .map(|p| p.to_string()),
            );
        }
        paths
    }
}

fn is_config_key(k: &str) -> bool {
    k.starts_with("PYREPL_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("pyrepl").join(".pyreplrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert("PYREPL_SANITIZE_INPUT".into(), "false".into());
    m.insert("PYREPL_STDLIB_PATHS".into(), String::new());
    m.insert("PYREPL_HOST_STDLIB".into(), "true".into());
    m.insert("PYREPL_RECURSION_LIMIT".into(), DEFAULT_RECURSION_LIMIT.to_string());
    m
}
