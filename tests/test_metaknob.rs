//! Integration tests for `use` templates

#[path = "common/mod.rs"]
mod common;
use common::{bare, Config, ConfigError};

fn with_defaults(input: &str) -> Result<Config, ConfigError> {
    let mut config = Config::builder().without_probe().build();
    config.load_str(input)?;
    Ok(config)
}

#[test]
fn test_policy_names_are_case_insensitive_in_category() {
    let config = with_defaults("use policy : ALWAYS_RUN_JOBS\n").unwrap();
    assert_eq!(config.get("WANT_VACATE").as_deref(), Some("True"));
}

#[test]
fn test_later_assignments_override_template_output() {
    let input = "\
use POLICY : ALWAYS_RUN_JOBS
KILL = (CurrentTime - EnteredCurrentActivity) > 3600
";
    let config = with_defaults(input).unwrap();
    assert_eq!(
        config.get("KILL").as_deref(),
        Some("(CurrentTime - EnteredCurrentActivity) > 3600")
    );
}

#[test]
fn test_two_preempt_policies_chain() {
    let input = "\
SLOW = (RemoteWallClockTime > 7200)
use POLICY : PREEMPT_IF(SLOW)
use POLICY : PREEMPT_IF_MEMORY_EXCEEDED
";
    let config = with_defaults(input).unwrap();
    assert_eq!(
        config.get("PREEMPT").as_deref(),
        Some("(isDefined(MemoryUsage) && MemoryUsage > RequestMemory) || (RemoteWallClockTime > 7200) || False")
    );
    assert_eq!(
        config.get("MAXJOBRETIREMENTTIME").as_deref(),
        Some("ifthenelse((isDefined(MemoryUsage) && MemoryUsage > RequestMemory),-1,ifthenelse((RemoteWallClockTime > 7200),-1,0))")
    );
}

#[test]
fn test_template_argument_from_macro() {
    let input = "\
WHICH = LONG_RUNNING
LONG_RUNNING = (RemoteWallClockTime > 86400)
use POLICY : PREEMPT_IF($(WHICH))
";
    let config = with_defaults(input).unwrap();
    assert_eq!(
        config.get("PREEMPT").as_deref(),
        Some("(RemoteWallClockTime > 86400) || False")
    );
}

#[test]
fn test_template_error_message() {
    let err = with_defaults("use POLICY : PREEMPT_IF\n").unwrap_err();
    assert_eq!(
        err.to_string(),
        "configuration error: PREEMPT_IF requires an argument"
    );
}

#[test]
fn test_role_fallback_with_bare_store() {
    let config = {
        let mut config = bare();
        config.load_str("use ROLE_GROUP : Personal\n").unwrap();
        config
    };
    assert_eq!(config.get("ROLE").as_deref(), Some("ROLE_GROUP : Personal"));
}

#[test]
fn test_custom_template_with_aggregate_parameters() {
    let mut config = bare();
    config.set(
        "$FEATURE.GPUS",
        "\
if $(0?)
  GPU_DEVICES = $(0)
  GPU_COUNT = $(0#)
else
  GPU_DEVICES = auto
endif
GPU_EXTRA = $(2+:none)
",
    );
    config.load_str("use FEATURE : GPUS(CUDA0, CUDA1, CUDA2)\n").unwrap();
    assert_eq!(config.get("GPU_DEVICES").as_deref(), Some("CUDA0, CUDA1, CUDA2"));
    assert_eq!(config.get("GPU_COUNT").as_deref(), Some("3"));
    assert_eq!(config.get("GPU_EXTRA").as_deref(), Some("CUDA1, CUDA2"));

    config.load_str("use FEATURE : GPUS\n").unwrap();
    assert_eq!(config.get("GPU_DEVICES").as_deref(), Some("auto"));
    assert_eq!(config.get("GPU_EXTRA").as_deref(), Some("none"));
}

#[test]
fn test_mutually_recursive_templates_are_capped() {
    let mut config = bare();
    config.set("$FEATURE.PING", "use FEATURE : PONG\n");
    config.set("$FEATURE.PONG", "use FEATURE : PING\n");
    let err = config.load_str("use FEATURE : PING\n").unwrap_err();
    assert!(matches!(err, ConfigError::TemplateRecursion(_)));
    assert!(!config.contains("1"));
}
