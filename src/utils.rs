use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("cancelled: {0}")]
    UserCancelled(String),
    #[error("'{tool}' is not available: {hint}")]
    ToolUnavailable { tool: String, hint: String },
    #[error("failed to start '{program}'")]
    ProcessSpawn {
        program: String,
        source: std::io::Error,
    },
    #[error("'{command}' exited with {}", describe_exit(.code))]
    ProcessExit { command: String, code: Option<i32> },
    #[error("failed to write '{}'", .path.display())]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Render(#[from] minijinja::Error),
    #[error("failed to patch '{}': {reason}", .path.display())]
    Patch { path: PathBuf, reason: String },
    #[error("{step}")]
    Step { step: String, source: Box<Error> },
}

impl Error {
    pub(crate) fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn in_step(self, step: impl Into<String>) -> Self {
        Self::Step {
            step: step.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, looking through step wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Self::Step { source, .. } => source.root(),
            other => other,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => String::from("a signal"),
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) fn relative_display(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_wrapping_keeps_root_cause() {
        let err = Error::ProcessExit {
            command: String::from("ng new app"),
            code: Some(3),
        }
        .in_step("create application");
        assert_eq!(err.to_string(), "create application");
        assert!(matches!(err.root(), Error::ProcessExit { code: Some(3), .. }));
        assert_eq!(err.root().to_string(), "'ng new app' exited with status 3");
    }

    #[test]
    fn relative_display_strips_root() {
        let root = Path::new("/tmp/project");
        assert_eq!(
            relative_display(&root.join("docker/compose.yaml"), root),
            "docker/compose.yaml"
        );
        assert_eq!(relative_display(Path::new("/elsewhere"), root), "/elsewhere");
    }
}
