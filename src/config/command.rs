//! Running external commands for `include command` and
//! `LOCAL_CONFIG_FILE` entries ending in `|`

use std::process::{Command, Stdio};

/// Runs a command line and returns its standard output.
/// A failure is reported as a message.
pub trait CommandRunner {
    fn run(&self, command: &str) -> Result<String, String>;
}

/// Runs commands through the platform shell (`sh -c` or `cmd /C`)
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str) -> Result<String, String> {
        let mut cmd = if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(command);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            cmd
        };

        let output = cmd
            .stdin(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| e.to_string())?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let code = output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            return Err(format!("exited with {}: {}", code, stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
