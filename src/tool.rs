use std::fmt::Display;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info};

use crate::utils::{Error, Result};

/// A program and its arguments, spawned relative to some working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Whether `program` resolves on the search path. Never cached.
pub fn is_available(program: &str) -> bool {
    match which::which(program) {
        Ok(path) => {
            debug!(program, path = %path.display(), "tool found");
            true
        }
        Err(err) => {
            debug!(program, %err, "tool not found");
            false
        }
    }
}

/// Picks `primary` when its program is installed, otherwise `fallback` when
/// that one is.
pub fn resolve<'a>(
    primary: &'a Invocation,
    fallback: Option<&'a Invocation>,
) -> Option<&'a Invocation> {
    if is_available(&primary.program) {
        return Some(primary);
    }
    let fallback = fallback.filter(|fallback| is_available(&fallback.program))?;
    info!(
        primary = %primary.program,
        fallback = %fallback.program,
        "primary tool missing, using fallback"
    );
    Some(fallback)
}

/// Runs the command with the terminal attached and waits for it.
pub fn run(invocation: &Invocation, workdir: &Path) -> Result<()> {
    debug!(command = %invocation, workdir = %workdir.display(), "spawning");
    let status = Command::new(&invocation.program)
        .args(&invocation.args)
        .current_dir(workdir)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|source| Error::ProcessSpawn {
            program: invocation.program.clone(),
            source,
        })?;
    if !status.success() {
        return Err(Error::ProcessExit {
            command: invocation.to_string(),
            code: status.code(),
        });
    }
    Ok(())
}

/// Runs the command silently and reports whether it exited successfully.
pub fn succeeds(invocation: &Invocation) -> bool {
    Command::new(&invocation.program)
        .args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// First dotted version number printed by the command, e.g. `22.19.0` out
/// of `v22.19.0` or `1.24.4` out of `go version go1.24.4 linux/amd64`.
pub fn version_of(invocation: &Invocation) -> Option<String> {
    let output = Command::new(&invocation.program)
        .args(&invocation.args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    extract_version(&String::from_utf8_lossy(&output.stdout))
}

fn extract_version(text: &str) -> Option<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"[0-9]+(\.[0-9]+)+").unwrap());
    pattern.find(text).map(|found| found.as_str().to_string())
}

/// Component-wise numeric comparison, missing components count as zero.
pub fn version_at_least(installed: &str, required: &str) -> bool {
    fn parts(version: &str) -> Vec<u64> {
        version
            .trim_start_matches('v')
            .split('.')
            .map(|part| {
                part.chars()
                    .take_while(char::is_ascii_digit)
                    .collect::<String>()
                    .parse()
                    .unwrap_or(0)
            })
            .collect()
    }
    let (installed, required) = (parts(installed), parts(required));
    let len = installed.len().max(required.len());
    for i in 0..len {
        let have = installed.get(i).copied().unwrap_or(0);
        let need = required.get(i).copied().unwrap_or(0);
        if have != need {
            return have > need;
        }
    }
    true
}

/// Advice about the local Docker setup the generated compose files rely on.
pub fn docker_hints(network: &str) -> Vec<String> {
    let mut hints = Vec::new();
    if !is_available("docker") {
        hints.push(String::from(
            "Docker was not found. Install Docker Desktop or Docker Engine.",
        ));
        return hints;
    }
    let compose_plugin = succeeds(&Invocation::new("docker", ["compose", "version"]));
    if !compose_plugin {
        if is_available("docker-compose") {
            hints.push(String::from(
                "Only the legacy 'docker-compose' binary is installed; the Makefile expects 'docker compose'.",
            ));
        } else {
            hints.push(String::from(
                "Neither 'docker compose' nor 'docker-compose' was found. Install the Compose plugin.",
            ));
        }
    }
    if !succeeds(&Invocation::new("docker", ["network", "inspect", network])) {
        hints.push(format!(
            "The external network '{network}' does not exist yet: docker network create {network}"
        ));
    }
    hints
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_as_a_command_line() {
        let invocation = Invocation::new("ng", ["new", "app", "--ssr"]);
        assert_eq!(invocation.to_string(), "ng new app --ssr");
        assert_eq!(Invocation::new("make", Vec::<String>::new()).to_string(), "make");
    }

    #[test]
    fn extracts_versions_from_tool_output() {
        assert_eq!(extract_version("v22.19.0\n").as_deref(), Some("22.19.0"));
        assert_eq!(
            extract_version("go version go1.24.4 linux/amd64").as_deref(),
            Some("1.24.4")
        );
        assert_eq!(extract_version("no digits here"), None);
    }

    #[test]
    fn compares_versions_numerically() {
        assert!(version_at_least("22.19.0", "22.19.0"));
        assert!(version_at_least("22.20.0", "22.19.0"));
        assert!(version_at_least("v23.0", "22.19.0"));
        assert!(version_at_least("1.24.10", "1.24.4"));
        assert!(!version_at_least("1.9.9", "1.24.4"));
        assert!(!version_at_least("22.18", "22.19.0"));
    }

    #[test]
    fn missing_program_is_unavailable() {
        assert!(!is_available("starter-definitely-not-installed"));
        let missing = Invocation::new("starter-definitely-not-installed", ["x"]);
        assert_eq!(resolve(&missing, None), None);
        assert!(!succeeds(&missing));
        assert_eq!(version_of(&missing), None);
    }

    #[test]
    fn spawn_failure_is_reported() {
        let missing = Invocation::new("starter-definitely-not-installed", ["x"]);
        let err = run(&missing, Path::new(".")).unwrap_err();
        assert!(matches!(
            err,
            Error::ProcessSpawn { ref program, .. } if program == "starter-definitely-not-installed"
        ));
    }

    #[cfg(unix)]
    #[test]
    fn exit_status_is_reported() {
        let failing = Invocation::new("sh", ["-c", "exit 7"]);
        let err = run(&failing, Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::ProcessExit { code: Some(7), .. }));
        run(&Invocation::new("sh", ["-c", "exit 0"]), Path::new(".")).unwrap();
    }
}
