//! Configuration assembly: YAML files plus environment variables
//!
//! Mirrors how the commands build their configuration: every environment
//! variable with the configured prefix lands under the `env` key, every
//! listed YAML file is mounted under its file-stem key, and the merged
//! value is resolved to its fixed point.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::engine::{ResolveError, Resolver};
use crate::value::Value;

/// Environment variables with this prefix are merged by default
pub const DEFAULT_ENV_PREFIX: &str = "OPTIONS_";

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration files must be named `<key>.yaml`
    #[error("config filename without .yaml suffix: {filename}")]
    BadFilename { filename: String },

    /// The initial value and the `env` key must be mappings
    #[error("{what} must be a mapping, got a {kind}")]
    NotAMapping { what: &'static str, kind: &'static str },

    #[error("error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Loads and resolves a configuration from a directory of YAML files
pub struct ConfigLoader {
    home: PathBuf,
    env_prefix: String,
    files: Vec<String>,
    resolver: Resolver,
}

impl ConfigLoader {
    /// Loader over `home` with the default env prefix, loading every
    /// `*.yaml` file in the directory
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            files: Vec::new(),
            resolver: Resolver::new(),
        }
    }

    /// Override the environment variable prefix
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load only the named files instead of scanning the directory
    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.files = files;
        self
    }

    /// Use a caller-built resolver (custom engine or iteration bound)
    pub fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Load, merge, and resolve starting from an empty mapping
    pub fn load(&self) -> Result<Value, ConfigError> {
        self.load_with_initial(Value::mapping())
    }

    /// Load, merge, and resolve on top of a caller-supplied initial mapping
    pub fn load_with_initial(&self, initial: Value) -> Result<Value, ConfigError> {
        let kind = initial.kind();
        let Value::Mapping(mut map) = initial else {
            return Err(ConfigError::NotAMapping {
                what: "initial configuration",
                kind,
            });
        };

        self.merge_env(&mut map)?;

        for filename in self.files_to_load()? {
            let Some(stem) = filename.strip_suffix(".yaml") else {
                return Err(ConfigError::BadFilename { filename });
            };
            let path = self.home.join(&filename);
            let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            let value = Value::from_yaml(&text).map_err(|source| ConfigError::Yaml {
                path: path.clone(),
                source,
            })?;
            debug!(file = %path.display(), key = stem, "mounted config file");
            map.insert(stem.to_string(), value);
        }

        Ok(self.resolver.resolve(&Value::Mapping(map))?)
    }

    /// Merge prefixed environment variables under the `env` key,
    /// full variable name as the key
    fn merge_env(&self, map: &mut BTreeMap<String, Value>) -> Result<(), ConfigError> {
        for (key, value) in std::env::vars() {
            if !key.starts_with(&self.env_prefix) {
                continue;
            }
            let env = map.entry("env".to_string()).or_insert_with(Value::mapping);
            let kind = env.kind();
            let Some(env_map) = env.as_mapping_mut() else {
                return Err(ConfigError::NotAMapping { what: "the env key", kind });
            };
            env_map.insert(key, Value::String(value));
        }
        Ok(())
    }

    fn files_to_load(&self) -> Result<Vec<String>, ConfigError> {
        if !self.files.is_empty() {
            return Ok(self.files.clone());
        }
        // No explicit list: every *.yaml in the directory, in name order
        let entries = std::fs::read_dir(&self.home).map_err(|source| ConfigError::Io {
            path: self.home.clone(),
            source,
        })?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ConfigError::Io {
                path: self.home.clone(),
                source,
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".yaml") {
                files.push(name);
            }
        }
        files.sort();
        Ok(files)
    }

    /// The directory this loader reads from
    pub fn home(&self) -> &Path {
        &self.home
    }
}

/// Owns a loader and the resolved configuration for one process invocation
///
/// The first `get_or_load` resolves; later calls return the cached value.
/// Construct one per invocation instead of sharing it globally.
pub struct ConfigContext {
    loader: ConfigLoader,
    cached: Option<Value>,
}

impl ConfigContext {
    pub fn new(loader: ConfigLoader) -> Self {
        Self {
            loader,
            cached: None,
        }
    }

    /// Resolved configuration, loading it on first use
    pub fn get_or_load(&mut self) -> Result<&Value, ConfigError> {
        if self.cached.is_none() {
            self.cached = Some(self.loader.load()?);
        }
        Ok(self.cached.as_ref().expect("cache filled above"))
    }
}
