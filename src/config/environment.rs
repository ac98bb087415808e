//! Loading from the process environment and the local config locations

use super::executor::Session;
use super::{Config, ConfigError};
use std::path::{Path, PathBuf};

/// Prefixes marking environment variables that become bindings
const ENV_PREFIXES: [&str; 2] = ["_CONDOR_", "_condor_"];

/// Names the primary configuration file
pub const CONDOR_CONFIG_VAR: &str = "CONDOR_CONFIG";

/// `CONDOR_CONFIG` value that skips all file loading
pub const ONLY_ENV: &str = "ONLY_ENV";

/// Tried in order when `CONDOR_CONFIG` is unset
const DEFAULT_CONFIG_PATHS: [&str; 2] = ["/etc/condor/condor_config", "/usr/local/etc/condor_config"];

/// Split a `LOCAL_CONFIG_*` list on commas and whitespace
fn split_config_list(list: &str) -> Vec<&str> {
    list.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|item| !item.is_empty())
        .collect()
}

impl Config {
    /// A default store loaded from the current process environment
    pub fn from_environment() -> Result<Self, ConfigError> {
        let mut config = Config::new();
        config.load_environment()?;
        Ok(config)
    }

    /// [`Config::load_from_env_vars`] with the current process environment
    pub fn load_environment(&mut self) -> Result<(), ConfigError> {
        self.load_from_env_vars(std::env::vars())
    }

    /// Import `_CONDOR_`-prefixed variables, then load the primary file
    /// named by `CONDOR_CONFIG` (or the first existing default location),
    /// then `LOCAL_CONFIG_DIR` and `LOCAL_CONFIG_FILE`.
    ///
    /// `CONDOR_CONFIG=ONLY_ENV` stops after the import. Finding no primary
    /// file at all is not an error.
    pub fn load_from_env_vars<I, K, V>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut primary = None;
        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref());
            if key == CONDOR_CONFIG_VAR {
                primary = Some(value.to_string());
            } else if let Some(name) = ENV_PREFIXES.iter().find_map(|p| key.strip_prefix(p)) {
                if !name.is_empty() {
                    self.set(name, value);
                }
            }
        }

        let path = match primary.as_deref() {
            Some(ONLY_ENV) => return Ok(()),
            Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
            _ => DEFAULT_CONFIG_PATHS
                .iter()
                .map(Path::new)
                .find(|p| p.is_file())
                .map(Path::to_path_buf),
        };

        match path {
            Some(path) => self.load_file(&path)?,
            None => log::debug!("no primary configuration file found"),
        }

        self.process_local_config_dir()?;
        self.process_local_config_file()
    }

    /// Execute every file in each `LOCAL_CONFIG_DIR` directory, in
    /// lexicographic order. Missing directories and subdirectories are
    /// skipped.
    pub fn process_local_config_dir(&mut self) -> Result<(), ConfigError> {
        let Some(list) = self.get("LOCAL_CONFIG_DIR") else {
            return Ok(());
        };

        for dir in split_config_list(&list) {
            let dir = Path::new(dir);
            if !dir.is_dir() {
                continue;
            }
            let entries = std::fs::read_dir(dir).map_err(|source| ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let mut files: Vec<PathBuf> = entries
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| !path.is_dir())
                .collect();
            files.sort();

            for file in files {
                self.load_file(&file)?;
            }
        }
        Ok(())
    }

    /// Execute each `LOCAL_CONFIG_FILE` entry in order. A comma-separated
    /// entry ending in `|` is a command line whose output is executed.
    pub fn process_local_config_file(&mut self) -> Result<(), ConfigError> {
        let Some(list) = self.get("LOCAL_CONFIG_FILE") else {
            return Ok(());
        };

        for segment in list.split(',') {
            if let Some(command) = segment.trim().strip_suffix('|') {
                self.include_command(command.trim(), &mut Session::default())?;
                continue;
            }
            for path in split_config_list(segment) {
                self.load_file(path)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn bare() -> Config {
        Config::builder().defaults(&[]).without_probe().build()
    }

    #[test]
    fn split_lists() {
        assert_eq!(split_config_list("a, b  c,d"), vec!["a", "b", "c", "d"]);
        assert!(split_config_list(" , ").is_empty());
    }

    #[test]
    fn only_env_imports_prefixed_variables() {
        let mut config = bare();
        config
            .load_from_env_vars([
                ("_CONDOR_SCHEDD_NAME", "sched1"),
                ("_condor_LOWER", "yes"),
                ("PATH", "/bin"),
                ("CONDOR_CONFIG", "ONLY_ENV"),
            ])
            .unwrap();
        assert_eq!(config.get("SCHEDD_NAME").as_deref(), Some("sched1"));
        assert_eq!(config.get("LOWER").as_deref(), Some("yes"));
        assert!(!config.contains("PATH"));
    }

    #[test]
    fn primary_file_then_local_dir_then_local_file() {
        let dir = TempDir::new().unwrap();
        let local_dir = dir.path().join("config.d");
        fs::create_dir(&local_dir).unwrap();
        fs::create_dir(local_dir.join("nested")).unwrap();
        fs::write(local_dir.join("b.conf"), "TRAIL = $(TRAIL) dir-b\n").unwrap();
        fs::write(local_dir.join("a.conf"), "TRAIL = $(TRAIL) dir-a\n").unwrap();

        let local_file = dir.path().join("local.conf");
        fs::write(&local_file, "TRAIL = $(TRAIL) file\n").unwrap();

        let primary = dir.path().join("condor_config");
        fs::write(
            &primary,
            format!(
                "TRAIL = primary\nLOCAL_CONFIG_DIR = {}, /nonexistent/dir\nLOCAL_CONFIG_FILE = {}\n",
                local_dir.display(),
                local_file.display()
            ),
        )
        .unwrap();

        let mut config = bare();
        config
            .load_from_env_vars([("CONDOR_CONFIG", primary.to_string_lossy().as_ref())])
            .unwrap();
        assert_eq!(
            config.get("TRAIL").as_deref(),
            Some("primary dir-a dir-b file")
        );
    }

    #[test]
    fn missing_primary_file_is_an_error() {
        let mut config = bare();
        let err = config
            .load_from_env_vars([("CONDOR_CONFIG", "/nonexistent/condor_config")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::IncludeNotFound(_)));
    }
}
