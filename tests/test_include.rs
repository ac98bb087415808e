//! Integration tests for include directives

#[path = "common/mod.rs"]
mod common;
use common::{bare, write_file, ConfigError};

#[test]
fn test_include_sees_and_sets_outer_values() {
    let dir = tempfile::tempdir().unwrap();
    let part = write_file(dir.path(), "part.conf", "GREETING = hello $(WHO)\nWHO = world\n");

    let mut config = bare();
    config
        .load_str(&format!("WHO = nobody\ninclude : {}\nAFTER = $(GREETING)\n", part.display()))
        .unwrap();
    assert_eq!(config.get("AFTER").as_deref(), Some("hello world"));
}

#[test]
fn test_include_path_is_expanded() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "site.conf", "SITE = yes\n");

    let mut config = bare();
    config
        .load_str(&format!("CONF_DIR = {}\ninclude : $(CONF_DIR)/site.conf\n", dir.path().display()))
        .unwrap();
    assert_eq!(config.get("SITE").as_deref(), Some("yes"));
}

#[test]
fn test_quoted_include_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "quoted.conf", "Q = 1\n");

    let mut config = bare();
    config.load_str(&format!("include \"{}\"\n", path.display())).unwrap();
    assert_eq!(config.get("Q").as_deref(), Some("1"));
}

#[test]
fn test_glob_includes_in_sorted_order() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "20-second.conf", "ORDER = $(ORDER),second\n");
    write_file(dir.path(), "10-first.conf", "ORDER = first\n");
    write_file(dir.path(), "notes.txt", "ORDER = wrong\n");

    let mut config = bare();
    config.load_str(&format!("include : {}/*.conf\n", dir.path().display())).unwrap();
    assert_eq!(config.get("ORDER").as_deref(), Some("first,second"));
}

#[test]
fn test_nested_include_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.conf");
    let b = dir.path().join("b.conf");
    std::fs::write(&a, format!("A = 1\ninclude : {}\n", b.display())).unwrap();
    std::fs::write(&b, format!("B = 1\ninclude : {}\n", a.display())).unwrap();

    let err = bare().load_file(&a).unwrap_err();
    assert!(matches!(err, ConfigError::CircularInclude(_)), "{}", err);
}

#[test]
fn test_syntax_error_in_included_file() {
    let dir = tempfile::tempdir().unwrap();
    let bad = write_file(dir.path(), "bad.conf", "if true\nA = 1\n");
    let err = bare().load_str(&format!("include : {}\n", bad.display())).unwrap_err();
    assert!(matches!(err, ConfigError::Syntax(_)));
}

#[test]
fn test_optional_include_of_missing_file() {
    let mut config = bare();
    config
        .load_str("include ifexist : /nonexistent/condor/local.conf\nAFTER = 1\n")
        .unwrap();
    assert_eq!(config.get("AFTER").as_deref(), Some("1"));
}

#[cfg(unix)]
#[test]
fn test_command_include_with_shell() {
    let mut config = bare();
    config
        .load_str("include command : printf 'FROM_CMD = 42\\n'\n")
        .unwrap();
    assert_eq!(config.get("FROM_CMD").as_deref(), Some("42"));
}

#[cfg(unix)]
#[test]
fn test_failing_command() {
    let err = bare().load_str("include command : exit 3\n").unwrap_err();
    assert!(matches!(err, ConfigError::Command { .. }));
    bare().load_str("include ifexist command : exit 3\n").unwrap();
}
