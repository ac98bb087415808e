//! `include` directives: files, glob patterns and command output

use super::executor::Session;
use super::{Config, ConfigError};
use crate::ast::IncludeDirective;
use std::path::{Path, PathBuf};

fn has_glob_meta(path: &str) -> bool {
    path.contains(['*', '?', '[', ']'])
}

/// Canonical form used on the include stack; falls back to an absolute
/// path when the file cannot be resolved
fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    })
}

impl Config {
    pub(crate) fn execute_include(
        &mut self,
        include: &IncludeDirective,
        session: &mut Session,
    ) -> Result<(), ConfigError> {
        let target = self
            .expand(&include.path)
            .map_err(|source| ConfigError::Expansion {
                context: format!("{} path {:?}", include.kind, include.path),
                source,
            })?;
        let optional = include.kind.is_optional();

        if include.kind.is_command() {
            return match self.include_command(&target, session) {
                Err(ConfigError::Command { command, message }) if optional => {
                    log::debug!("ignoring failed command {:?}: {}", command, message);
                    Ok(())
                }
                other => other,
            };
        }

        if has_glob_meta(&target) {
            self.include_glob(&target, optional, session)
        } else {
            self.include_path(Path::new(&target), optional, session)
        }
    }

    fn include_glob(&mut self, pattern: &str, optional: bool, session: &mut Session) -> Result<(), ConfigError> {
        let paths = match glob::glob(pattern) {
            Ok(paths) => paths,
            Err(_) if optional => return Ok(()),
            Err(e) => {
                return Err(ConfigError::Glob {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                })
            }
        };

        let mut matches: Vec<PathBuf> = paths.filter_map(Result::ok).collect();
        matches.sort();
        if matches.is_empty() && !optional {
            return Err(ConfigError::NoGlobMatch(pattern.to_string()));
        }
        for path in matches {
            self.include_path(&path, optional, session)?;
        }
        Ok(())
    }

    /// Execute one file, keeping it on the include stack while it runs
    pub(crate) fn include_path(
        &mut self,
        path: &Path,
        optional: bool,
        session: &mut Session,
    ) -> Result<(), ConfigError> {
        let key = canonical(path);
        if session.include_stack.contains(&key) {
            return Err(ConfigError::CircularInclude(path.display().to_string()));
        }

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if optional {
                    return Ok(());
                }
                return Err(ConfigError::IncludeNotFound(path.display().to_string()));
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        log::debug!("including {}", path.display());
        session.include_stack.push(key);
        let result = self.execute_text(&text, session);
        session.include_stack.pop();
        result
    }

    /// Run `command` and execute its output as configuration
    pub(crate) fn include_command(&mut self, command: &str, session: &mut Session) -> Result<(), ConfigError> {
        log::debug!("including output of {:?}", command);
        let output = self
            .runner
            .run(command)
            .map_err(|message| ConfigError::Command {
                command: command.to_string(),
                message,
            })?;
        self.execute_text(&output, session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CommandRunner;
    use std::fs;
    use tempfile::TempDir;

    struct Echo;

    impl CommandRunner for Echo {
        fn run(&self, command: &str) -> Result<String, String> {
            match command.strip_prefix("emit ") {
                Some(text) => Ok(text.replace(';', "\n")),
                None => Err(format!("unknown command {}", command)),
            }
        }
    }

    fn config() -> Config {
        Config::builder()
            .defaults(&[])
            .without_probe()
            .command_runner(Echo)
            .build()
    }

    #[test]
    fn glob_meta_detection() {
        assert!(has_glob_meta("/etc/*.conf"));
        assert!(has_glob_meta("file?.conf"));
        assert!(has_glob_meta("file[12].conf"));
        assert!(!has_glob_meta("/etc/condor_config"));
    }

    #[test]
    fn include_file_and_glob() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("10-a.conf"), "A = 1\nORDER = $(ORDER) a\n").unwrap();
        fs::write(dir.path().join("20-b.conf"), "B = 2\nORDER = $(ORDER) b\n").unwrap();

        let mut config = config();
        let text = format!("include : {}/*.conf\n", dir.path().display());
        config.load_str(&text).unwrap();
        assert_eq!(config.get("A").as_deref(), Some("1"));
        assert_eq!(config.get("B").as_deref(), Some("2"));
        assert_eq!(config.get("ORDER").as_deref(), Some(" a b"));
    }

    #[test]
    fn missing_files() {
        let mut config = config();
        let err = config.load_str("include : /nonexistent/condor.conf\n").unwrap_err();
        assert!(matches!(err, ConfigError::IncludeNotFound(_)));

        config.load_str("include ifexist : /nonexistent/condor.conf\n").unwrap();
        let err = config.load_str("include : /nonexistent/*.conf\n").unwrap_err();
        assert!(matches!(err, ConfigError::NoGlobMatch(_)));
        config.load_str("include ifexist : /nonexistent/*.conf\n").unwrap();
    }

    #[test]
    fn command_includes() {
        let mut config = config();
        config.load_str("include command : emit A = 1;B = 2\n").unwrap();
        assert_eq!(config.get("B").as_deref(), Some("2"));

        config.load_str("include : \"emit C = 3 |\"\n").unwrap();
        assert_eq!(config.get("C").as_deref(), Some("3"));

        let err = config.load_str("include command : fail\n").unwrap_err();
        assert!(matches!(err, ConfigError::Command { .. }));
        config.load_str("include ifexist command : fail\n").unwrap();
    }

    #[test]
    fn including_same_file_twice_is_fine() {
        let dir = TempDir::new().unwrap();
        let part = dir.path().join("part.conf");
        fs::write(&part, "COUNT = $(COUNT)x\n").unwrap();
        let mut config = config();
        let text = format!("include : {0}\ninclude : {0}\n", part.display());
        config.load_str(&text).unwrap();
        assert_eq!(config.get("COUNT").as_deref(), Some("xx"));
    }

    #[test]
    fn self_include_is_circular() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("self.conf");
        fs::write(&path, format!("include : {}\n", path.display())).unwrap();
        let err = config().load_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::CircularInclude(_)));
    }
}
