//! Host facts seeded into a new store (`HOSTNAME`, `DETECTED_CPUS`, ...)

use std::path::Path;

/// Supplies seed bindings describing the host and process
pub trait HostProbe {
    fn values(&self) -> Vec<(String, String)>;
}

/// Probes the running system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl HostProbe for SystemProbe {
    fn values(&self) -> Vec<(String, String)> {
        let mut values = Vec::new();
        let mut push = |name: &str, value: String| values.push((name.to_string(), value));

        let full = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_default();
        let short = full.split('.').next().unwrap_or_default().to_string();
        push("HOSTNAME", short);
        push("FULL_HOSTNAME", full);

        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_default();
        if !user.is_empty() {
            push("USERNAME", user);
        }

        push("CONFIG_ROOT", config_root(std::env::var("CONDOR_CONFIG").ok().as_deref()));

        let cpus = std::thread::available_parallelism().map_or(1, |n| n.get());
        push("DETECTED_CPUS", cpus.to_string());
        push("DETECTED_CORES", cpus.to_string());
        let limit = cpu_limit(
            cpus,
            std::env::var("OMP_THREAD_LIMIT").ok().as_deref(),
            std::env::var("SLURM_CPUS_ON_NODE").ok().as_deref(),
        );
        push("DETECTED_CPUS_LIMIT", limit.to_string());

        push("ARCH", condor_arch(std::env::consts::ARCH));
        push("OPSYS", condor_opsys(std::env::consts::OS));

        push("PID", std::process::id().to_string());
        #[cfg(unix)]
        push("PPID", std::os::unix::process::parent_id().to_string());

        values
    }
}

/// Directory holding the primary config file
fn config_root(condor_config: Option<&str>) -> String {
    match condor_config.filter(|p| !p.is_empty() && *p != "ONLY_ENV") {
        Some(path) => Path::new(path)
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default(),
        None if cfg!(windows) => "C:\\Condor".to_string(),
        None => "/etc/condor".to_string(),
    }
}

/// `detected` lowered by any positive `OMP_THREAD_LIMIT` or
/// `SLURM_CPUS_ON_NODE` below it
fn cpu_limit(detected: usize, omp: Option<&str>, slurm: Option<&str>) -> usize {
    [omp, slurm]
        .into_iter()
        .flatten()
        .filter_map(|v| v.trim().parse::<usize>().ok())
        .filter(|&v| v > 0)
        .fold(detected, usize::min)
}

fn condor_arch(arch: &str) -> String {
    match arch {
        "x86_64" => "X86_64".to_string(),
        "x86" => "INTEL".to_string(),
        "aarch64" => "ARM64".to_string(),
        "arm" => "ARM".to_string(),
        "powerpc64" => "PPC64".to_string(),
        "s390x" => "S390X".to_string(),
        other => other.to_ascii_uppercase(),
    }
}

fn condor_opsys(os: &str) -> String {
    match os {
        "macos" => "OSX".to_string(),
        other => other.to_ascii_uppercase(),
    }
}
