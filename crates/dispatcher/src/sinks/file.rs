//! File destination - one timestamped log file per sink

use contracts::ContractError;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::{debug, instrument};

use crate::output::Destination;

/// Configuration for the file destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSinkConfig {
    /// Directory the log file is created in
    pub dir: PathBuf,
    /// File name prefix, followed by unix seconds and `.log`
    pub prefix: String,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            prefix: "bulk".to_string(),
        }
    }
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let defaults = Self::default();
        Self {
            dir: params.get("dir").map(PathBuf::from).unwrap_or(defaults.dir),
            prefix: params.get("prefix").cloned().unwrap_or(defaults.prefix),
        }
    }

    /// Path of the file opened at `unix_seconds`
    pub fn file_path(&self, unix_seconds: i64) -> PathBuf {
        self.dir.join(format!("{}{}.log", self.prefix, unix_seconds))
    }
}

/// Create (or append to) `<dir>/<prefix><unix-seconds>.log`.
///
/// The directory is created if missing. The file stays open until every
/// worker of the sink has released its clone of the destination.
#[instrument(name = "file_destination_open", skip(config), fields(dir = %config.dir.display()))]
pub fn file_destination(
    sink_name: &str,
    config: &FileSinkConfig,
) -> Result<Destination, ContractError> {
    let unavailable = |e: std::io::Error| {
        ContractError::destination_unavailable(sink_name, format!("{}: {e}", config.dir.display()))
    };

    fs::create_dir_all(&config.dir).map_err(unavailable)?;

    let path = config.file_path(chrono::Utc::now().timestamp());
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(unavailable)?;

    debug!(sink = sink_name, path = %path.display(), "Log file opened");
    Ok(Destination::new(
        path.display().to_string(),
        BufWriter::new(file),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::WriteLock;
    use tempfile::TempDir;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_params_defaults() {
        let config = FileSinkConfig::from_params(&HashMap::new());
        assert_eq!(config, FileSinkConfig::default());
        assert_eq!(config.file_path(1700000000), PathBuf::from("./bulk1700000000.log"));
    }

    #[test]
    fn test_from_params_overrides() {
        let config =
            FileSinkConfig::from_params(&params(&[("dir", "/var/log"), ("prefix", "run-")]));
        assert_eq!(config.dir, PathBuf::from("/var/log"));
        assert_eq!(config.file_path(42), PathBuf::from("/var/log/run-42.log"));
    }

    #[test]
    fn test_writes_land_in_timestamped_file() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested");
        let config = FileSinkConfig::from_params(&params(&[("dir", dir.to_str().unwrap())]));

        let dest = file_destination("file", &config).unwrap();
        assert!(dest.label().ends_with(".log"));

        let lock = WriteLock::new();
        lock.write_line(&dest, "bulk: a, b").unwrap();
        lock.write_line(&dest, "bulk: c").unwrap();
        drop(dest);

        let entries: Vec<_> = fs::read_dir(&dir).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let path = entries[0].as_ref().unwrap().path();
        let name = path.file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("bulk"));
        assert!(name.ends_with(".log"));

        let content = fs::read_to_string(path).unwrap();
        assert_eq!(content, "bulk: a, b\nbulk: c\n");
    }

    #[test]
    fn test_unavailable_directory() {
        let temp = TempDir::new().unwrap();
        // A regular file where the directory should be
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, b"").unwrap();
        let config = FileSinkConfig {
            dir: blocker.join("sub"),
            prefix: "bulk".to_string(),
        };

        let err = file_destination("file", &config).unwrap_err();
        assert!(matches!(err, ContractError::DestinationUnavailable { .. }));
    }
}
