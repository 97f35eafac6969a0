use std::path::{Path, PathBuf};

use crate::artifact::WritePolicy::{AlwaysOverwrite, CreateIfAbsent};
use crate::git::Source;
use crate::params::{Defaults, ScaffoldParameters};
use crate::patch::{self, AngularPatch, ServeOptions};
use crate::sanitize;
use crate::stage::{file, Emit, Patch, RunStep, Stage, Step};
use crate::template::{Layout, Renderer, Service};
use crate::utils::Result;

/// Files this stage renders. The template repository ships placeholder
/// copies of them which are dropped right after a fresh clone.
const RENDERED: [&str; 12] = [
    "docker/compose.yaml",
    "docker/compose.preprod.yaml",
    "docker/compose.prod.yaml",
    "docker/mongo-init/init-volume-db.js",
    ".env.dist",
    ".env",
    "api/.env.dist",
    "api/.env",
    "Makefile",
    ".github/workflows/preprod.yml",
    ".github/workflows/prod.yml",
    "README.md",
];

#[derive(Debug, Clone)]
pub struct Options {
    pub dir: PathBuf,
    pub name: String,
    /// Tag of the template repository to clone.
    pub version: String,
    pub allowed_hosts: Vec<String>,
    pub host_traefik: Option<String>,
    pub db_name: Option<String>,
    pub deploy_folder: Option<String>,
    /// Template repository, the configured one when `None`.
    pub template: Option<String>,
    pub defaults: Defaults,
}

/// Angular SSR front and Go API cloned from a template repository, then
/// wired to the project name and hosts.
#[derive(Debug)]
pub struct AngularGo {
    dir: PathBuf,
    root: PathBuf,
    source: Source,
    params: ScaffoldParameters,
    layout: Layout,
}

impl Stage for AngularGo {
    type Options = Options;
    const NAME: &'static str = "angular-go";

    fn validate(options: Options) -> Result<Self> {
        let name = sanitize::project_name(&options.name)?;
        let version = sanitize::tag(&options.version)?;
        let host = match &options.host_traefik {
            Some(raw) => sanitize::host("--host-traefik", raw)?,
            None => format!("{}.local", name.replace('_', "-")),
        };
        let allowed_hosts = options
            .allowed_hosts
            .iter()
            .map(|host| sanitize::allowed_host("--allowed-host", host))
            .collect::<Result<Vec<_>>>()?;
        let db_name = options
            .db_name
            .as_deref()
            .map(|raw| sanitize::slug("--db-name", raw))
            .transpose()?;
        let deploy_folder = options
            .deploy_folder
            .as_deref()
            .map(|raw| sanitize::slug("--deploy-folder", raw))
            .transpose()?;
        let source = options
            .template
            .as_deref()
            .unwrap_or(&options.defaults.template)
            .parse::<Source>()?;

        let api_host = format!("api.{host}");
        let params = ScaffoldParameters::builder(&name)
            .defaults(&options.defaults)
            .version(version)
            .host(host)
            .api_host(api_host.clone())
            .allowed_hosts(allowed_hosts)
            .db_name(db_name)
            .deploy_folder(deploy_folder)
            .build();
        let layout = Layout {
            title: String::from("Angular SSR front with a Go API and MongoDB"),
            services: vec![
                Service::new("app", &params.host)
                    .node()
                    .tests("npm run test -- --watch=false"),
                Service::new("api", api_host)
                    .shell("bash")
                    .database()
                    .tests("go test ./..."),
            ],
            database: true,
        };
        Ok(Self {
            root: options.dir.join(&name),
            dir: options.dir,
            source,
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
            ("template", self.source.to_string()),
            ("version", self.params.version.clone().unwrap_or_default()),
            ("host", format!("Host(`{}`)", self.params.host)),
            ("allowed hosts", self.params.allowed_hosts.join(", ")),
            ("database", self.params.db_name.clone()),
            ("deploy folder", self.params.deploy_folder.clone()),
        ]
    }

    fn confirmations(&self) -> Vec<String> {
        vec![String::from("Are these values right?")]
    }

    fn generators(&self) -> Vec<Step> {
        let tag = self.params.version.as_deref().unwrap_or_default();
        let cleanup = std::iter::once(self.root.join(".git"))
            .chain(RENDERED.iter().map(|path| self.root.join(path)));
        vec![
            Step::EnsureDir(self.dir.clone()),
            Step::Run(
                RunStep::new(
                    format!("clone template {tag}"),
                    self.source.clone_invocation(tag, &self.params.name),
                    &self.dir,
                )
                .unless_exists(&self.root)
                .hint("install git: https://git-scm.com/downloads")
                .cleanup(cleanup),
            ),
        ]
    }

    fn artifacts(&self, renderer: &Renderer) -> Result<Vec<Emit>> {
        let (params, layout) = (&self.params, &self.layout);
        let render = |name: &str| renderer.render(name, params, layout);
        let deploy = |name: &str, env: &str| renderer.render_for(name, params, layout, env);
        let root = &self.root;

        let env_root = render("shared/env.root")?;
        let env_api = render("shared/env.api")?;
        let angular = AngularPatch {
            serve: ServeOptions {
                allowed_hosts: params.allowed_hosts.clone(),
                ..ServeOptions::default()
            },
            ..AngularPatch::default()
        };

        Ok(vec![
            Emit::Dir(root.join("docker/mongo-init")),
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
            file(
                root.join("docker/mongo-init/init-volume-db.js"),
                render("shared/init-volume-db.js")?,
                CreateIfAbsent,
            ),
            file(root.join(".env.dist"), env_root.clone(), CreateIfAbsent),
            file(root.join(".env"), env_root, CreateIfAbsent),
            Emit::Dir(root.join("api")),
            file(root.join("api/.env.dist"), env_api.clone(), CreateIfAbsent),
            file(root.join("api/.env"), env_api, CreateIfAbsent),
            file(root.join("Makefile"), render("shared/Makefile")?, CreateIfAbsent),
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
            Emit::Patch(
                Patch::new(root.join("app/angular.json"), move |source| {
                    patch::angular_json(source, &angular)
                })
                .optional(),
            ),
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
