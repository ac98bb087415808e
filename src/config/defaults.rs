//! Default parameter table
//!
//! Values are stored unexpanded and seed a new store before the built-in
//! constants. Entries named `$TYPE.NAME` are templates for
//! `use TYPE : NAME`.

/// One default binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamDefault {
    pub name: &'static str,
    pub default: &'static str,
    /// Replaces `default` when running on Windows
    pub win32_default: Option<&'static str>,
}

const fn param(name: &'static str, default: &'static str) -> ParamDefault {
    ParamDefault {
        name,
        default,
        win32_default: None,
    }
}

const fn param_win32(
    name: &'static str,
    default: &'static str,
    win32: &'static str,
) -> ParamDefault {
    ParamDefault {
        name,
        default,
        win32_default: Some(win32),
    }
}

const ALWAYS_RUN_JOBS: &str = "\
WANT_SUSPEND = False
WANT_VACATE = True
SUSPEND = False
CONTINUE = True
PREEMPT = False
START = True
KILL = False
PREEMPTION_REQUIREMENTS = False
";

const PREEMPT_IF: &str = "\
if ! $(1?)
  error : PREEMPT_IF requires an argument
endif
if defined PREEMPT
  PREEMPT = $($(1)) || $(PREEMPT)
else
  PREEMPT = $($(1))
endif
MAXJOBRETIREMENTTIME = ifthenelse($($(1)),-1,$(MAXJOBRETIREMENTTIME:0))
if defined WANT_SUSPEND
  WANT_SUSPEND = $($(1)) =!= true && $(WANT_SUSPEND)
else
  WANT_SUSPEND = $($(1)) =!= true
endif
";

const PREEMPT_IF_MEMORY_EXCEEDED: &str = "\
MEMORY_EXCEEDED = (isDefined(MemoryUsage) && MemoryUsage > RequestMemory)
use POLICY : PREEMPT_IF(MEMORY_EXCEEDED)
";

const WANT_HOLD_IF: &str = "\
if ! $(2?)
  error : WANT_HOLD_IF requires a condition and a hold subcode
endif
use POLICY : PREEMPT_IF($(1))
WANT_HOLD = (JobUniverse != 1 && $($(1)))
WANT_HOLD_SUBCODE = ifThenElse($($(1)), $(2) , UNDEFINED)
WANT_HOLD_REASON = ifThenElse($($(1)), \"$(3+)\", UNDEFINED)
";

/// The bundled defaults
pub static DEFAULT_PARAMS: &[ParamDefault] = &[
    param("CONDOR_HOST", "$(FULL_HOSTNAME)"),
    param("COLLECTOR_HOST", "$(CONDOR_HOST)"),
    param_win32("RELEASE_DIR", "/usr", "C:\\Condor"),
    param("BIN", "$(RELEASE_DIR)/bin"),
    param("SBIN", "$(RELEASE_DIR)/sbin"),
    param("LIBEXEC", "$(RELEASE_DIR)/libexec"),
    param_win32("LOCAL_DIR", "/var", "$(RELEASE_DIR)"),
    param("LOG", "$(LOCAL_DIR)/log/condor"),
    param("SPOOL", "$(LOCAL_DIR)/lib/condor/spool"),
    param("EXECUTE", "$(LOCAL_DIR)/lib/condor/execute"),
    param("LOCK", "$(LOG)"),
    param_win32("MASTER", "$(SBIN)/condor_master", "$(SBIN)\\condor_master.exe"),
    param("DAEMON_LIST", "MASTER"),
    param("SHUTDOWN_FAST_TIMEOUT", "300"),
    param("SHUTDOWN_GRACEFUL_TIMEOUT", "3600"),
    param("PREEN_INTERVAL", "86400"),
    param("MAX_DEFAULT_LOG", "10 * 1024 * 1024"),
    param("START", "True"),
    param("SUSPEND", "False"),
    param("CONTINUE", "True"),
    param("PREEMPT", "False"),
    param("KILL", "False"),
    param("WANT_SUSPEND", "False"),
    param("WANT_VACATE", "True"),
    param("$POLICY.ALWAYS_RUN_JOBS", ALWAYS_RUN_JOBS),
    param("$POLICY.PREEMPT_IF", PREEMPT_IF),
    param("$POLICY.PREEMPT_IF_MEMORY_EXCEEDED", PREEMPT_IF_MEMORY_EXCEEDED),
    param("$POLICY.WANT_HOLD_IF", WANT_HOLD_IF),
];
