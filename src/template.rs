use minijinja::{context, AutoEscape, Environment, Value};
use serde::Serialize;

use crate::params::ScaffoldParameters;
use crate::utils::Result;

macro_rules! embed {
    ($($name:literal),* $(,)?) => {
        &[$(($name, include_str!(concat!("../templates/", $name)))),*]
    };
}

/// Every artifact template, compiled into the binary.
pub const TEMPLATES: &[(&str, &str)] = embed![
    "shared/compose.yaml",
    "shared/compose.deploy.yaml",
    "shared/env.root",
    "shared/env.api",
    "shared/init-volume-db.js",
    "shared/Makefile",
    "shared/releaserc.json",
    "shared/gitignore",
    "shared/workflow.yml",
    "shared/README.md",
    "shared/styles.css",
    "angular_ssr/app.dockerfile",
    "angular_ssr/env.app",
    "angular_ssr/entrypoint.sh",
    "angular_ssr/postcss.config.json",
    "astro_go/front.dockerfile",
    "astro_go/api.dockerfile",
    "astro_go/env.front",
    "astro_go/astro.config.mjs",
    "astro_go/air.toml",
    "astro_go/gitignore.api",
    "astro_go/entrypoint.sh",
    "astro_go/main.go",
    "astro_go/health.go",
    "astro_go/mongo.go",
];

/// One container of the generated stack. Its directory, dockerfile and
/// compose service all carry `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Service {
    pub name: String,
    /// Environment variable holding the Traefik rule, e.g. `HOST_TRAEFIK_APP`.
    pub host_var: String,
    pub host: String,
    pub shell: &'static str,
    pub node: bool,
    pub database: bool,
    pub tests: Option<String>,
}

impl Service {
    pub fn new(name: &str, host: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            host_var: format!("HOST_TRAEFIK_{}", name.to_uppercase()),
            host: host.into(),
            shell: "sh",
            node: false,
            database: false,
            tests: None,
        }
    }

    pub fn node(mut self) -> Self {
        self.node = true;
        self
    }

    pub fn shell(mut self, shell: &'static str) -> Self {
        self.shell = shell;
        self
    }

    pub fn database(mut self) -> Self {
        self.database = true;
        self
    }

    pub fn tests(mut self, command: impl Into<String>) -> Self {
        self.tests = Some(command.into());
        self
    }
}

/// Shape of the stack a stage produces, shared by the compose files, the
/// Makefile and the workflows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Layout {
    pub title: String,
    pub services: Vec<Service>,
    pub database: bool,
}

pub struct Renderer {
    environment: Environment<'static>,
}

impl Renderer {
    pub fn new() -> Result<Self> {
        let mut environment = Environment::new();
        environment.set_keep_trailing_newline(true);
        environment.set_trim_blocks(true);
        environment.set_lstrip_blocks(true);
        environment.set_auto_escape_callback(|_| AutoEscape::None);
        environment.add_filter("host_rule", host_rule);
        environment.add_filter("env_ref", env_ref);
        environment.add_filter("js_array", js_array);
        environment.add_filter("registry_host", registry_host);
        environment.add_filter("cors_origins", cors_origins);
        for &(name, source) in TEMPLATES {
            environment.add_template(name, source)?;
        }
        Ok(Self { environment })
    }

    pub fn render(
        &self,
        name: &str,
        params: &ScaffoldParameters,
        layout: &Layout,
    ) -> Result<String> {
        self.render_with(name, params, layout, None)
    }

    /// Renders the `preprod` or `prod` variant of a deploy template.
    pub fn render_for(
        &self,
        name: &str,
        params: &ScaffoldParameters,
        layout: &Layout,
        deploy_env: &str,
    ) -> Result<String> {
        self.render_with(name, params, layout, Some(deploy_env))
    }

    fn render_with(
        &self,
        name: &str,
        params: &ScaffoldParameters,
        layout: &Layout,
        deploy_env: Option<&str>,
    ) -> Result<String> {
        let template = self.environment.get_template(name)?;
        let ctx = context! {
            layout => layout,
            deploy_env => deploy_env,
            ..Value::from_serialize(params)
        };
        Ok(template.render(ctx)?)
    }
}

fn host_rule(host: &str) -> String {
    format!("Host(`{host}`)")
}

fn env_ref(name: &str) -> String {
    format!("${{{name}}}")
}

fn js_array(items: Vec<String>) -> String {
    let quoted = items
        .iter()
        .map(|item| format!("'{item}'"))
        .collect::<Vec<_>>();
    format!("[{}]", quoted.join(", "))
}

fn registry_host(registry: &str) -> String {
    registry.split('/').next().unwrap_or(registry).to_string()
}

/// `https://` origins for the main host and every exact allowed host.
fn cors_origins(host: &str, allowed_hosts: Vec<String>) -> String {
    let mut origins = vec![format!("https://{host}")];
    for allowed in allowed_hosts.iter().filter(|allowed| !allowed.starts_with('.')) {
        let origin = format!("https://{allowed}");
        if !origins.contains(&origin) {
            origins.push(origin);
        }
    }
    origins.join(",")
}
