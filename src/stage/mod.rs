//! Scaffold recipes and the state machine that plays them.
//!
//! A stage is validated, confirmed, then its generators run one by one and
//! its artifacts are emitted in order. The first failure aborts the run and
//! nothing is rolled back: re-running the same command is the recovery path,
//! since generators skip work that is already done and files users edit are
//! written with [`WritePolicy::CreateIfAbsent`]. Output of a generator is
//! only replaced or patched in the invocation that generated it, see
//! [`Emit::owned_by`].

pub mod angular_go;
pub mod angular_ssr;
pub mod astro_go;

use std::collections::HashSet;
use std::fmt::Display;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use colored::Colorize;
use tracing::{debug, info};

use crate::artifact::{self, Artifact, WriteOutcome, WritePolicy};
use crate::gate::Gate;
use crate::template::Renderer;
use crate::tool::{self, Invocation};
use crate::utils::{relative_display, Error, Result};

pub trait Stage: Sized {
    /// Raw values as they come from the command line.
    type Options;

    const NAME: &'static str;

    /// Checks and normalises the raw values. Nothing may be written here.
    fn validate(options: Self::Options) -> Result<Self>;

    /// Directory the project is generated into.
    fn root(&self) -> &Path;

    /// Resolved values shown before the first confirmation.
    fn summary(&self) -> Vec<(&'static str, String)>;

    fn confirmations(&self) -> Vec<String>;

    fn generators(&self) -> Vec<Step>;

    /// Rendered artifacts in emission order. Called once the generators ran.
    fn artifacts(&self, renderer: &Renderer) -> Result<Vec<Emit>>;

    fn next_steps(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Work done before any artifact is written.
#[derive(Debug, Clone)]
pub enum Step {
    EnsureDir(PathBuf),
    Require(Requirement),
    Run(RunStep),
    Remove(PathBuf),
}

/// A tool that must be installed, optionally in a minimum version.
#[derive(Debug, Clone)]
pub struct Requirement {
    pub tool: String,
    pub version: Option<(Invocation, String)>,
    pub hint: String,
}

impl Requirement {
    pub fn new(tool: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            version: None,
            hint: hint.into(),
        }
    }

    pub fn at_least(mut self, probe: Invocation, minimum: impl Into<String>) -> Self {
        self.version = Some((probe, minimum.into()));
        self
    }
}

/// An external command, with an optional fallback used when the primary
/// program is not installed.
#[derive(Debug, Clone)]
pub struct RunStep {
    pub label: String,
    pub primary: Invocation,
    pub fallback: Option<Invocation>,
    pub workdir: PathBuf,
    /// The step is skipped when this path exists.
    pub unless_exists: Option<PathBuf>,
    pub hint: String,
    /// Removed after the command actually ran, never when it was skipped.
    pub cleanup: Vec<PathBuf>,
}

impl RunStep {
    pub fn new(label: impl Into<String>, primary: Invocation, workdir: impl Into<PathBuf>) -> Self {
        let hint = format!("install '{}' and make sure it is on PATH", primary.program);
        Self {
            label: label.into(),
            primary,
            fallback: None,
            workdir: workdir.into(),
            unless_exists: None,
            hint,
            cleanup: Vec::new(),
        }
    }

    pub fn fallback(mut self, fallback: Invocation) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn unless_exists(mut self, path: impl Into<PathBuf>) -> Self {
        self.unless_exists = Some(path.into());
        self
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = hint.into();
        self
    }

    pub fn cleanup(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.cleanup.extend(paths);
        self
    }
}

/// One unit of the emission phase.
pub enum Emit {
    Dir(PathBuf),
    File(Artifact),
    Patch(Patch),
    /// Applied as is only when the run step labelled `generator` ran in this
    /// invocation. Otherwise files fall back to
    /// [`WritePolicy::CreateIfAbsent`] and patches are skipped.
    Owned { generator: String, emit: Box<Emit> },
}

impl Emit {
    pub fn owned_by(self, generator: &str) -> Self {
        Self::Owned {
            generator: generator.to_string(),
            emit: Box::new(self),
        }
    }

    /// The wrapped emission, whoever owns it.
    pub fn into_inner(self) -> Self {
        match self {
            Self::Owned { emit, .. } => emit.into_inner(),
            other => other,
        }
    }
}

pub(crate) fn file(path: PathBuf, content: String, policy: WritePolicy) -> Emit {
    Emit::File(Artifact::new(path, content, policy))
}

type Edit = Box<dyn Fn(&str) -> std::result::Result<String, String>>;

/// Read-modify-write of a file produced by a generator. The result always
/// replaces the file on disk.
pub struct Patch {
    pub path: PathBuf,
    pub optional: bool,
    edit: Edit,
}

impl Patch {
    pub fn new(
        path: impl Into<PathBuf>,
        edit: impl Fn(&str) -> std::result::Result<String, String> + 'static,
    ) -> Self {
        Self {
            path: path.into(),
            optional: false,
            edit: Box::new(edit),
        }
    }

    /// A missing file is not an error, the patch is simply not applied.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// `None` when an optional file is absent.
    pub fn apply(&self) -> Result<Option<WriteOutcome>> {
        let source = match fs::read_to_string(&self.path) {
            Ok(source) => source,
            Err(err) if err.kind() == ErrorKind::NotFound && self.optional => return Ok(None),
            Err(err) => {
                return Err(Error::Patch {
                    path: self.path.clone(),
                    reason: err.to_string(),
                })
            }
        };
        let patched = (self.edit)(&source).map_err(|reason| Error::Patch {
            path: self.path.clone(),
            reason,
        })?;
        artifact::write(&self.path, &patched, WritePolicy::AlwaysOverwrite).map(Some)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    NotStarted,
    ValidatingInput,
    ConfirmingWithUser,
    InvokingGenerators,
    EmittingArtifacts,
    Done,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ran,
    Found(Option<String>),
    Created,
    Overwritten,
    Patched,
    Removed,
    Skipped,
    Failed(String),
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ran => write!(f, "done"),
            Self::Found(Some(version)) => write!(f, "found {version}"),
            Self::Found(None) => write!(f, "found"),
            Self::Created => write!(f, "created"),
            Self::Overwritten => write!(f, "overwritten"),
            Self::Patched => write!(f, "patched"),
            Self::Removed => write!(f, "removed"),
            Self::Skipped => write!(f, "already present"),
            Self::Failed(reason) => write!(f, "{reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub label: String,
    pub path: Option<PathBuf>,
    pub status: Status,
}

/// What a successful run did, in order.
#[derive(Debug, Clone)]
pub struct Report {
    pub stage: &'static str,
    pub root: PathBuf,
    pub results: Vec<StepResult>,
    pub next_steps: Vec<String>,
}

impl Report {
    /// Files created, overwritten or patched.
    pub fn generated(&self) -> impl Iterator<Item = &StepResult> {
        self.results.iter().filter(|result| {
            result.path.is_some()
                && matches!(
                    result.status,
                    Status::Created | Status::Overwritten | Status::Patched
                )
        })
    }

    /// Files left untouched because they already existed.
    pub fn skipped(&self) -> impl Iterator<Item = &StepResult> {
        self.results
            .iter()
            .filter(|result| result.path.is_some() && result.status == Status::Skipped)
    }

    pub fn print_manifest(&self) {
        println!();
        println!("{} {}", "Project ready in".green().bold(), self.root.display());
        let generated = self.generated().collect::<Vec<_>>();
        if !generated.is_empty() {
            println!("Generated:");
            for result in generated {
                println!("  {} ({})", result.label, result.status);
            }
        }
        let skipped = self.skipped().collect::<Vec<_>>();
        if !skipped.is_empty() {
            println!("Skipped, already present:");
            for result in skipped {
                println!("  {}", result.label);
            }
        }
        if !self.next_steps.is_empty() {
            println!("Next steps:");
            for step in &self.next_steps {
                println!("  {step}");
            }
        }
    }
}

pub struct Orchestrator<'g> {
    gate: &'g mut dyn Gate,
    renderer: Renderer,
    state: State,
    results: Vec<StepResult>,
    /// Labels of the run steps that executed in the current run.
    ran: HashSet<String>,
}

impl<'g> Orchestrator<'g> {
    pub fn new(gate: &'g mut dyn Gate) -> Result<Self> {
        Ok(Self {
            gate,
            renderer: Renderer::new()?,
            state: State::NotStarted,
            results: Vec::new(),
            ran: HashSet::new(),
        })
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Every step recorded so far, including the failed one after an abort.
    pub fn results(&self) -> &[StepResult] {
        &self.results
    }

    pub fn run<S: Stage>(&mut self, options: S::Options) -> Result<Report> {
        self.results.clear();
        self.ran.clear();
        let outcome = self.drive::<S>(options);
        self.enter(if outcome.is_ok() {
            State::Done
        } else {
            State::Aborted
        });
        outcome
    }

    fn drive<S: Stage>(&mut self, options: S::Options) -> Result<Report> {
        self.enter(State::ValidatingInput);
        let stage = S::validate(options)?;
        let root = stage.root().to_path_buf();

        self.enter(State::ConfirmingWithUser);
        println!("{} {}", "Stage".bold(), S::NAME);
        for (key, value) in stage.summary() {
            println!("  {key:<16} {value}");
        }
        for prompt in stage.confirmations() {
            if !self.gate.confirm(&prompt, true) {
                return Err(Error::UserCancelled(format!("declined '{prompt}'")));
            }
        }

        self.enter(State::InvokingGenerators);
        for step in stage.generators() {
            self.generate(step, &root)?;
        }

        self.enter(State::EmittingArtifacts);
        let emits = stage
            .artifacts(&self.renderer)
            .map_err(|err| self.fail("render artifacts", err))?;
        for emit in emits {
            self.emit(emit, &root)?;
        }

        Ok(Report {
            stage: S::NAME,
            root,
            results: self.results.clone(),
            next_steps: stage.next_steps(),
        })
    }

    fn enter(&mut self, state: State) {
        debug!(from = ?self.state, to = ?state, "stage transition");
        self.state = state;
    }

    fn generate(&mut self, step: Step, root: &Path) -> Result<()> {
        match step {
            Step::EnsureDir(path) => {
                let label = format!("directory {}", show(&path, root));
                let existed = path.is_dir();
                artifact::ensure_dir(&path).map_err(|err| self.fail(&label, err))?;
                let status = if existed {
                    Status::Skipped
                } else {
                    Status::Created
                };
                self.record(label, None, status);
            }
            Step::Require(requirement) => {
                let label = format!("check {}", requirement.tool);
                let version = require(&requirement).map_err(|err| self.fail(&label, err))?;
                self.record(label, None, Status::Found(version));
            }
            Step::Run(run) => self.invoke(run, root)?,
            Step::Remove(path) => self.remove(&path, root)?,
        }
        Ok(())
    }

    fn invoke(&mut self, run: RunStep, root: &Path) -> Result<()> {
        if let Some(marker) = &run.unless_exists {
            if marker.exists() {
                info!(step = %run.label, marker = %marker.display(), "already done, skipping");
                self.record(run.label, None, Status::Skipped);
                return Ok(());
            }
        }
        let Some(invocation) = tool::resolve(&run.primary, run.fallback.as_ref()) else {
            let tool = match &run.fallback {
                Some(fallback) => format!("{} (or {})", run.primary.program, fallback.program),
                None => run.primary.program.clone(),
            };
            let err = Error::ToolUnavailable {
                tool,
                hint: run.hint.clone(),
            };
            return Err(self.fail(&run.label, err));
        };
        println!("{} {}", "$".dimmed(), invocation);
        tool::run(invocation, &run.workdir).map_err(|err| self.fail(&run.label, err))?;
        self.record(run.label.clone(), None, Status::Ran);
        self.ran.insert(run.label.clone());
        for path in &run.cleanup {
            self.remove(path, root)?;
        }
        Ok(())
    }

    fn remove(&mut self, path: &Path, root: &Path) -> Result<()> {
        let label = format!("remove {}", show(path, root));
        match remove_path(path) {
            Ok(true) => self.record(label, Some(path.to_path_buf()), Status::Removed),
            Ok(false) => debug!(path = %path.display(), "nothing to remove"),
            Err(err) => return Err(self.fail(&label, Error::file_write(path, err))),
        }
        Ok(())
    }

    fn emit(&mut self, emit: Emit, root: &Path) -> Result<()> {
        match emit {
            Emit::Dir(path) => {
                let label = format!("{}/", show(&path, root));
                let existed = path.is_dir();
                artifact::ensure_dir(&path).map_err(|err| self.fail(&label, err))?;
                if !existed {
                    self.record(label, None, Status::Created);
                }
            }
            Emit::File(artifact) => {
                let label = show(&artifact.path, root);
                let outcome = artifact.write().map_err(|err| self.fail(&label, err))?;
                let status = match outcome {
                    WriteOutcome::Created => Status::Created,
                    WriteOutcome::Overwritten => Status::Overwritten,
                    WriteOutcome::Skipped => Status::Skipped,
                };
                self.record(label, Some(artifact.path), status);
            }
            Emit::Patch(patch) => {
                let label = show(&patch.path, root);
                match patch.apply().map_err(|err| self.fail(&label, err))? {
                    Some(_) => self.record(label, Some(patch.path), Status::Patched),
                    None => debug!(path = %patch.path.display(), "optional patch target missing"),
                }
            }
            Emit::Owned { generator, emit } if self.ran.contains(&generator) => {
                self.emit(*emit, root)?;
            }
            Emit::Owned { generator, emit } => match emit.into_inner() {
                Emit::File(mut artifact) => {
                    artifact.policy = WritePolicy::CreateIfAbsent;
                    self.emit(Emit::File(artifact), root)?;
                }
                Emit::Patch(patch) => {
                    info!(
                        path = %patch.path.display(),
                        %generator,
                        "generator did not run, keeping its output"
                    );
                    let label = show(&patch.path, root);
                    self.record(label, Some(patch.path), Status::Skipped);
                }
                other => self.emit(other, root)?,
            },
        }
        Ok(())
    }

    fn record(&mut self, label: String, path: Option<PathBuf>, status: Status) {
        let tag = match status {
            Status::Skipped => "[SKIP]".yellow(),
            Status::Failed(_) => "[KO]".red(),
            _ => "[OK]".green(),
        };
        println!("- {tag} {label} ({status})");
        self.results.push(StepResult {
            label,
            path,
            status,
        });
    }

    /// Records the failure and wraps it with the step label.
    fn fail(&mut self, label: &str, err: Error) -> Error {
        self.record(label.to_string(), None, Status::Failed(err.root().to_string()));
        err.in_step(label)
    }
}

fn require(requirement: &Requirement) -> Result<Option<String>> {
    let unavailable = |hint: String| Error::ToolUnavailable {
        tool: requirement.tool.clone(),
        hint,
    };
    if !tool::is_available(&requirement.tool) {
        return Err(unavailable(requirement.hint.clone()));
    }
    let Some((probe, minimum)) = &requirement.version else {
        return Ok(None);
    };
    match tool::version_of(probe) {
        Some(found) if tool::version_at_least(&found, minimum) => Ok(Some(found)),
        Some(found) => Err(unavailable(format!(
            "version {found} found, {minimum} or newer required; {}",
            requirement.hint
        ))),
        None => Err(unavailable(format!(
            "could not read the installed version; {}",
            requirement.hint
        ))),
    }
}

/// Deletes a file or a whole directory. `false` when nothing was there.
fn remove_path(path: &Path) -> io::Result<bool> {
    match fs::symlink_metadata(path) {
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
        Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(path).map(|_| true),
        Ok(_) => fs::remove_file(path).map(|_| true),
    }
}

fn show(path: &Path, root: &Path) -> String {
    match relative_display(path, root) {
        relative if relative.is_empty() => path.display().to_string(),
        relative => relative,
    }
}
