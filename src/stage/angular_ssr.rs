use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::artifact::WritePolicy::{AlwaysOverwrite, CreateIfAbsent};
use crate::artifact::Artifact;
use crate::params::{Defaults, ScaffoldParameters};
use crate::patch::{self, AngularPatch, ServeOptions};
use crate::sanitize;
use crate::stage::{file, Emit, Patch, RunStep, Stage, Step};
use crate::template::{Layout, Renderer, Service};
use crate::tool::Invocation;
use crate::utils::{Error, Result};

const NG_NEW: [&str; 4] = ["new", "app", "--ssr", "--skip-git"];

/// Run step that produces `app/`. Files it owns are only rewritten when it ran.
const CREATE_APP: &str = "create Angular application";

#[derive(Debug, Clone)]
pub struct Options {
    /// Parent of the project directory.
    pub dir: PathBuf,
    pub name: String,
    pub host: String,
    pub allowed_hosts: Vec<String>,
    pub node_version: Option<String>,
    pub port: u16,
    pub defaults: Defaults,
}

/// Angular application with server-side rendering, served by its own
/// container behind Traefik. No backend.
#[derive(Debug)]
pub struct AngularSsr {
    root: PathBuf,
    params: ScaffoldParameters,
    layout: Layout,
}

impl AngularSsr {
    fn app(&self) -> PathBuf {
        self.root.join("app")
    }

    fn angular_patch(&self) -> AngularPatch {
        AngularPatch {
            project: None,
            output_path: Some(String::from("dist/app")),
            style_budget: Some((String::from("500kB"), String::from("1MB"))),
            serve: ServeOptions {
                host: Some(String::from("0.0.0.0")),
                port: Some(self.params.port),
                poll: Some(2000),
                allowed_hosts: self.params.allowed_hosts.clone(),
            },
            serve_build_targets: true,
            disable_analytics: true,
        }
    }
}

impl Stage for AngularSsr {
    type Options = Options;
    const NAME: &'static str = "angular-ssr";

    fn validate(options: Options) -> Result<Self> {
        let name = sanitize::project_name(&options.name)?;
        let host = sanitize::host("--host", &options.host)?;
        let allowed_hosts = options
            .allowed_hosts
            .iter()
            .map(|host| sanitize::allowed_host("--allowed-host", host))
            .collect::<Result<Vec<_>>>()?;
        if options.port == 0 {
            return Err(Error::InvalidInput(String::from(
                "--port must be between 1 and 65535",
            )));
        }
        let mut defaults = options.defaults;
        if let Some(version) = &options.node_version {
            defaults.runtimes.node = sanitize::runtime_version("--node-version", version)?;
        }

        let params = ScaffoldParameters::builder(&name)
            .defaults(&defaults)
            .host(host)
            .allowed_hosts(allowed_hosts)
            .port(options.port)
            .build();
        let layout = Layout {
            title: String::from("Angular application with server-side rendering"),
            services: vec![Service::new("app", &params.host)
                .node()
                .tests("npm run test -- --watch=false")],
            database: false,
        };
        Ok(Self {
            root: options.dir.join(&name),
            params,
            layout,
        })
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.params.name.clone()),
            ("directory", self.root.display().to_string()),
            ("host", format!("Host(`{}`)", self.params.host)),
            ("allowed hosts", self.params.allowed_hosts.join(", ")),
            ("node", self.params.runtimes.node.clone()),
            ("port", self.params.port.to_string()),
        ]
    }

    fn confirmations(&self) -> Vec<String> {
        vec![
            String::from("Are these values right?"),
            String::from("Run the Angular CLI now?"),
        ]
    }

    fn generators(&self) -> Vec<Step> {
        let app = self.app();
        let npx = ["-y", "@angular/cli@latest"].into_iter().chain(NG_NEW);
        vec![
            Step::EnsureDir(self.root.clone()),
            Step::Run(
                RunStep::new(CREATE_APP, Invocation::new("ng", NG_NEW), &self.root)
                    .fallback(Invocation::new("npx", npx))
                    .unless_exists(&app)
                    .hint(
                        "install Node.js (for npx) or the Angular CLI: npm install -g @angular/cli",
                    ),
            ),
            Step::Run(
                RunStep::new(
                    "install @tailwindcss/postcss",
                    Invocation::new("npm", ["install", "-D", "@tailwindcss/postcss"]),
                    &app,
                )
                .hint("install Node.js, npm ships with it"),
            ),
        ]
    }

    fn artifacts(&self, renderer: &Renderer) -> Result<Vec<Emit>> {
        let (params, layout) = (&self.params, &self.layout);
        let render = |name: &str| renderer.render(name, params, layout);
        let deploy = |name: &str, env: &str| renderer.render_for(name, params, layout, env);
        let root = &self.root;
        let app = self.app();

        let env_root = render("shared/env.root")?;
        let env_app = render("angular_ssr/env.app")?;
        let angular = self.angular_patch();
        let scripts = scripts();

        Ok(vec![
            Emit::Dir(root.join("docker")),
            file(
                root.join("docker/app.dockerfile"),
                render("angular_ssr/app.dockerfile")?,
                CreateIfAbsent,
            ),
            file(root.join("docker/compose.yaml"), render("shared/compose.yaml")?, CreateIfAbsent),
            file(
                root.join("docker/compose.preprod.yaml"),
                deploy("shared/compose.deploy.yaml", "preprod")?,
                CreateIfAbsent,
            ),
            file(
                root.join("docker/compose.prod.yaml"),
                deploy("shared/compose.deploy.yaml", "prod")?,
                CreateIfAbsent,
            ),
            file(root.join(".env"), env_root.clone(), CreateIfAbsent),
            file(root.join(".env.dist"), env_root, CreateIfAbsent),
            file(app.join(".env"), env_app.clone(), CreateIfAbsent),
            file(app.join(".env.dist"), env_app, CreateIfAbsent),
            file(root.join("Makefile"), render("shared/Makefile")?, CreateIfAbsent),
            Emit::File(
                Artifact::new(
                    app.join("entrypoint.sh"),
                    render("angular_ssr/entrypoint.sh")?,
                    CreateIfAbsent,
                )
                .executable(),
            ),
            file(root.join(".releaserc.json"), render("shared/releaserc.json")?, CreateIfAbsent),
            file(root.join(".gitignore"), render("shared/gitignore")?, CreateIfAbsent),
            Emit::Dir(root.join(".github/workflows")),
            file(
                root.join(".github/workflows/preprod.yml"),
                deploy("shared/workflow.yml", "preprod")?,
                CreateIfAbsent,
            ),
            file(
                root.join(".github/workflows/prod.yml"),
                deploy("shared/workflow.yml", "prod")?,
                CreateIfAbsent,
            ),
            file(root.join("README.md"), render("shared/README.md")?, AlwaysOverwrite),
            file(
                app.join("postcss.config.json"),
                render("angular_ssr/postcss.config.json")?,
                AlwaysOverwrite,
            )
            .owned_by(CREATE_APP),
            Emit::Dir(app.join("src")),
            file(app.join("src/styles.css"), render("shared/styles.css")?, AlwaysOverwrite)
                .owned_by(CREATE_APP),
            Emit::Patch(Patch::new(app.join("angular.json"), move |source| {
                patch::angular_json(source, &angular)
            }))
            .owned_by(CREATE_APP),
            Emit::Patch(Patch::new(app.join("package.json"), move |source| {
                patch::package_scripts(source, &scripts)
            }))
            .owned_by(CREATE_APP),
        ])
    }

    fn next_steps(&self) -> Vec<String> {
        vec![
            format!("cd {}", self.root.display()),
            String::from("make up"),
            format!("open https://{}", self.params.host),
        ]
    }
}

fn scripts() -> IndexMap<String, String> {
    [
        ("ng", "ng"),
        ("start", "ng serve"),
        ("build", "ng build"),
        ("build:ssr", "ng build --configuration production"),
        ("watch", "ng build --watch --configuration development"),
        ("test", "ng test --browsers=ChromeHeadlessNoSandbox --watch --poll=2000"),
        ("test:ci", "ng test --watch=false --browsers=ChromeHeadlessNoSandbox"),
        ("serve:ssr:app", "node dist/app/server/server.mjs"),
    ]
    .into_iter()
    .map(|(name, command)| (name.to_string(), command.to_string()))
    .collect()
}
