use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::tool::Invocation;
use crate::utils::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Host {
    GitHub,
    GitLab,
    BitBucket,
}

impl FromStr for Host {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "github" => Ok(Self::GitHub),
            "gitlab" => Ok(Self::GitLab),
            "bitbucket" => Ok(Self::BitBucket),
            _ => Err(Error::InvalidInput(format!("unidentified git host: '{s}'"))),
        }
    }
}

impl Display for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GitHub => write!(f, "github.com"),
            Self::GitLab => write!(f, "gitlab.com"),
            Self::BitBucket => write!(f, "bitbucket.org"),
        }
    }
}

/// Where a project template is cloned from: a `github:owner/repo` style
/// shorthand or any URL git understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Hosted {
        host: Host,
        owner: String,
        repo: String,
    },
    Url(String),
}

impl Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hosted { host, owner, repo } => write!(f, "https://{host}/{owner}/{repo}.git"),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

impl FromStr for Source {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"^(github|gitlab|bitbucket):([a-zA-Z0-9._-]+)\/([a-zA-Z0-9._-]+)$").unwrap()
        });
        let s = s.trim();
        if let Some(captures) = pattern.captures(s) {
            let (_, [host, owner, repo]) = captures.extract();
            return Ok(Self::Hosted {
                host: host.parse()?,
                owner: owner.to_string(),
                repo: repo.trim_end_matches(".git").to_string(),
            });
        }
        const SCHEMES: [&str; 5] = ["https://", "http://", "ssh://", "git@", "file://"];
        if SCHEMES.iter().any(|scheme| s.starts_with(scheme)) || Path::new(s).is_absolute() {
            return Ok(Self::Url(s.to_string()));
        }
        Err(Error::InvalidInput(format!(
            "--template: '{s}' is neither a URL nor a host:owner/repo shorthand"
        )))
    }
}

impl Source {
    /// Shallow clone of a single tag into `dst`, relative to the working
    /// directory the command runs in.
    pub fn clone_invocation(&self, tag: &str, dst: &str) -> Invocation {
        let url = self.to_string();
        Invocation::new(
            "git",
            ["clone", "--branch", tag, "--depth", "1", url.as_str(), dst],
        )
    }
}
