//! Read-modify-write edits of JSON manifests produced by project generators.

use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Dev-server settings written into `architect.serve.options`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServeOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub poll: Option<u32>,
    pub allowed_hosts: Vec<String>,
}

/// Edits applied to an `angular.json` workspace file. Keys not named here
/// are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AngularPatch {
    /// Project to edit, the first one in the file when `None`.
    pub project: Option<String>,
    pub output_path: Option<String>,
    /// `(maximumWarning, maximumError)` of the production component style budget.
    pub style_budget: Option<(String, String)>,
    pub serve: ServeOptions,
    pub serve_build_targets: bool,
    pub disable_analytics: bool,
}

pub fn angular_json(source: &str, patch: &AngularPatch) -> Result<String, String> {
    let mut root = parse_object(source)?;

    let projects = match root.get_mut("projects") {
        Some(Value::Object(projects)) => projects,
        _ => return Err(String::from("no \"projects\" object")),
    };
    let key = match &patch.project {
        Some(name) if projects.contains_key(name) => name.clone(),
        Some(name) => return Err(format!("project \"{name}\" not found")),
        None => projects
            .keys()
            .next()
            .cloned()
            .ok_or_else(|| String::from("\"projects\" is empty"))?,
    };
    let project = match projects.get_mut(&key) {
        Some(Value::Object(project)) => project,
        _ => return Err(format!("projects.{key} is not an object")),
    };
    let architect = object(project, "architect");

    let build = object(architect, "build");
    if let Some(output_path) = &patch.output_path {
        object(build, "options").insert("outputPath".into(), output_path.clone().into());
    }
    if let Some((warning, error)) = &patch.style_budget {
        let production = object(object(build, "configurations"), "production");
        set_style_budget(array(production, "budgets"), warning, error);
    }

    let serve = object(architect, "serve");
    let options = object(serve, "options");
    if let Some(host) = &patch.serve.host {
        options.insert("host".into(), host.clone().into());
    }
    if let Some(port) = patch.serve.port {
        options.insert("port".into(), port.into());
    }
    if let Some(poll) = patch.serve.poll {
        options.insert("poll".into(), poll.into());
    }
    if !patch.serve.allowed_hosts.is_empty() {
        options.insert("allowedHosts".into(), patch.serve.allowed_hosts.clone().into());
    }
    if patch.serve_build_targets {
        let configurations = object(serve, "configurations");
        for mode in ["production", "development"] {
            let mut target = Map::new();
            target.insert("buildTarget".into(), format!("{key}:build:{mode}").into());
            configurations.insert(mode.into(), Value::Object(target));
        }
    }

    if patch.disable_analytics {
        object(&mut root, "cli").insert("analytics".into(), false.into());
    }

    render(root)
}

/// Replaces the whole `scripts` table of a `package.json`.
pub fn package_scripts(source: &str, scripts: &IndexMap<String, String>) -> Result<String, String> {
    let mut root = parse_object(source)?;
    let table = scripts
        .iter()
        .map(|(name, command)| (name.clone(), Value::from(command.as_str())))
        .collect::<Map<_, _>>();
    root.insert("scripts".into(), Value::Object(table));
    render(root)
}

fn parse_object(source: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(source) {
        Ok(Value::Object(root)) => Ok(root),
        Ok(_) => Err(String::from("top-level value is not an object")),
        Err(err) => Err(format!("invalid JSON: {err}")),
    }
}

fn render(root: Map<String, Value>) -> Result<String, String> {
    let mut out =
        serde_json::to_string_pretty(&Value::Object(root)).map_err(|err| err.to_string())?;
    out.push('\n');
    Ok(out)
}

fn set_style_budget(budgets: &mut Vec<Value>, warning: &str, error: &str) {
    let existing = budgets.iter_mut().find_map(|budget| match budget {
        Value::Object(budget)
            if budget.get("type").and_then(Value::as_str) == Some("anyComponentStyle") =>
        {
            Some(budget)
        }
        _ => None,
    });
    match existing {
        Some(budget) => {
            budget.insert("maximumWarning".into(), warning.into());
            budget.insert("maximumError".into(), error.into());
        }
        None => {
            let mut budget = Map::new();
            budget.insert("type".into(), "anyComponentStyle".into());
            budget.insert("maximumWarning".into(), warning.into());
            budget.insert("maximumError".into(), error.into());
            budgets.push(Value::Object(budget));
        }
    }
}

/// `map[key]` as an object, created (or replacing a non-object) as needed.
fn object<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let slot = map
        .entry(key)
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(inner) => inner,
        _ => unreachable!("slot was just made an object"),
    }
}

/// `map[key]` as an array, created (or replacing a non-array) as needed.
fn array<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Vec<Value> {
    let slot = map.entry(key).or_insert_with(|| Value::Array(Vec::new()));
    if !slot.is_array() {
        *slot = Value::Array(Vec::new());
    }
    match slot {
        Value::Array(inner) => inner,
        _ => unreachable!("slot was just made an array"),
    }
}
