use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::artifact::Artifact;
use crate::artifact::WritePolicy::{AlwaysOverwrite, CreateIfAbsent};
use crate::params::{Defaults, ScaffoldParameters, DEFAULT_PORT};
use crate::patch;
use crate::sanitize;
use crate::stage::{file, Emit, Patch, Requirement, RunStep, Stage, Step};
use crate::template::{Layout, Renderer, Service};
use crate::tool::Invocation;
use crate::utils::Result;

/// Run step that produces `front/`.
const CREATE_FRONT: &str = "create Astro project";

const API_DEPENDENCIES: [&str; 3] = [
    "github.com/gin-gonic/gin",
    "github.com/gin-contrib/cors",
    "go.mongodb.org/mongo-driver/mongo",
];

#[derive(Debug, Clone)]
pub struct Options {
    pub dir: PathBuf,
    pub name: String,
    pub host_front: String,
    pub host_api: String,
    pub db_name: Option<String>,
    pub deploy_folder: Option<String>,
    /// Hosts the Vite dev server answers to, `.local` when empty.
    pub allowed_hosts: Vec<String>,
    pub defaults: Defaults,
}

/// Astro front rendered on the server, a Go API and a MongoDB database.
#[derive(Debug)]
pub struct AstroGo {
    root: PathBuf,
    params: ScaffoldParameters,
    layout: Layout,
}

impl AstroGo {
    fn front(&self) -> PathBuf {
        self.root.join("front")
    }

    fn api(&self) -> PathBuf {
        self.root.join("api")
    }
}

impl Stage for AstroGo {
    type Options = Options;
    const NAME: &'static str = "astro-go";

    fn validate(options: Options) -> Result<Self> {
        let name = sanitize::project_name(&options.name)?;
        let host_front = sanitize::host("--host-front", &options.host_front)?;
        let host_api = sanitize::host("--host-api", &options.host_api)?;
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
        let mut allowed_hosts = options
            .allowed_hosts
            .iter()
            .map(|host| sanitize::allowed_host("--allowed-host", host))
            .collect::<Result<Vec<_>>>()?;
        if allowed_hosts.is_empty() {
            allowed_hosts.push(String::from(".local"));
        }

        let params = ScaffoldParameters::builder(&name)
            .defaults(&options.defaults)
            .host(host_front)
            .api_host(host_api.clone())
            .allowed_hosts(allowed_hosts)
            .db_name(db_name)
            .deploy_folder(deploy_folder)
            .port(DEFAULT_PORT)
            .build();
        let layout = Layout {
            title: String::from("Astro front rendered on the server with a Go API and MongoDB"),
            services: vec![
                Service::new("front", &params.host).node().shell("bash"),
                Service::new("api", host_api)
                    .shell("bash")
                    .database()
                    .tests("go test ./..."),
            ],
            database: true,
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
        let api_host = self.params.api_host.clone().unwrap_or_default();
        vec![
            ("name", self.params.name.clone()),
            ("directory", self.root.display().to_string()),
            ("front host", format!("Host(`{}`)", self.params.host)),
            ("api host", format!("Host(`{api_host}`)")),
            ("allowed hosts", self.params.allowed_hosts.join(", ")),
            ("database", self.params.db_name.clone()),
            ("deploy folder", self.params.deploy_folder.clone()),
            ("node", self.params.runtimes.node.clone()),
            ("go", self.params.runtimes.go.clone()),
            ("mongo", self.params.runtimes.mongo.clone()),
        ]
    }

    fn confirmations(&self) -> Vec<String> {
        vec![
            String::from("Are these values right?"),
            String::from("Create the Astro project now?"),
        ]
    }

    fn generators(&self) -> Vec<Step> {
        let runtimes = &self.params.runtimes;
        let (front, api) = (self.front(), self.api());
        let module = format!("{}/api", self.params.name);
        let pnpm_hint = "install pnpm: npm install -g pnpm (or corepack enable pnpm)";
        vec![
            Step::Require(
                Requirement::new(
                    "node",
                    format!("install Node.js {} or newer: https://nodejs.org", runtimes.node),
                )
                .at_least(Invocation::new("node", ["--version"]), &runtimes.node),
            ),
            Step::Require(Requirement::new("pnpm", pnpm_hint)),
            Step::Require(
                Requirement::new(
                    "go",
                    format!("install Go {} or newer: https://go.dev/dl", runtimes.go),
                )
                .at_least(Invocation::new("go", ["version"]), &runtimes.go),
            ),
            Step::EnsureDir(self.root.clone()),
            Step::Run(
                RunStep::new(
                    CREATE_FRONT,
                    Invocation::new("pnpm", ["create", "astro@latest", "front"]),
                    &self.root,
                )
                .unless_exists(&front)
                .hint(pnpm_hint),
            ),
            Step::Run(
                RunStep::new(
                    "add Astro dependencies",
                    Invocation::new(
                        "pnpm",
                        ["add", "@astrojs/node", "astro", "@tailwindcss/vite", "tailwindcss"],
                    ),
                    &front,
                )
                .hint(pnpm_hint),
            ),
            Step::Run(
                RunStep::new(
                    "add Astro dev dependencies",
                    Invocation::new("pnpm", ["add", "-D", "@astrojs/check", "typescript"]),
                    &front,
                )
                .hint(pnpm_hint),
            ),
            // The front container installs its own dependencies.
            Step::Remove(front.join("node_modules")),
            Step::EnsureDir(api.clone()),
            Step::Run(
                RunStep::new(
                    "init Go module",
                    Invocation::new("go", ["mod", "init", module.as_str()]),
                    &api,
                )
                .unless_exists(api.join("go.mod")),
            ),
            Step::Run(RunStep::new(
                "add Go dependencies",
                Invocation::new("go", ["get"].into_iter().chain(API_DEPENDENCIES)),
                &api,
            )),
        ]
    }

    fn artifacts(&self, renderer: &Renderer) -> Result<Vec<Emit>> {
        let (params, layout) = (&self.params, &self.layout);
        let render = |name: &str| renderer.render(name, params, layout);
        let deploy = |name: &str, env: &str| renderer.render_for(name, params, layout, env);
        let root = &self.root;
        let (front, api) = (self.front(), self.api());

        let env_front = render("astro_go/env.front")?;
        let env_api = render("shared/env.api")?;
        let env_root = render("shared/env.root")?;
        let scripts = scripts(params.port);

        Ok(vec![
            // front
            file(
                front.join("astro.config.mjs"),
                render("astro_go/astro.config.mjs")?,
                AlwaysOverwrite,
            )
            .owned_by(CREATE_FRONT),
            Emit::Patch(Patch::new(front.join("package.json"), move |source| {
                patch::package_scripts(source, &scripts)
            }))
            .owned_by(CREATE_FRONT),
            Emit::File(
                Artifact::new(
                    front.join("entrypoint.sh"),
                    render("astro_go/entrypoint.sh")?,
                    CreateIfAbsent,
                )
                .executable(),
            ),
            Emit::Dir(front.join("src/styles")),
            file(front.join("src/styles/global.css"), render("shared/styles.css")?, CreateIfAbsent),
            file(front.join(".env"), env_front.clone(), CreateIfAbsent),
            file(front.join(".env.dist"), env_front, CreateIfAbsent),
            // api
            Emit::Dir(api.join("cmd/api")),
            Emit::Dir(api.join("internal/controller")),
            Emit::Dir(api.join("internal/database")),
            Emit::Dir(api.join("tmp/air/api")),
            file(api.join(".air.toml"), render("astro_go/air.toml")?, CreateIfAbsent),
            file(api.join(".env"), env_api.clone(), CreateIfAbsent),
            file(api.join(".env.dist"), env_api, CreateIfAbsent),
            file(api.join(".gitignore"), render("astro_go/gitignore.api")?, CreateIfAbsent),
            file(api.join("tmp/.gitkeep"), String::new(), CreateIfAbsent),
            file(api.join("tmp/air/api/.gitkeep"), String::new(), CreateIfAbsent),
            file(api.join("cmd/api/main.go"), render("astro_go/main.go")?, CreateIfAbsent),
            file(
                api.join("internal/controller/health.go"),
                render("astro_go/health.go")?,
                CreateIfAbsent,
            ),
            file(
                api.join("internal/database/mongo.go"),
                render("astro_go/mongo.go")?,
                CreateIfAbsent,
            ),
            // docker
            Emit::Dir(root.join("docker/mongo-init")),
            file(
                root.join("docker/front.dockerfile"),
                render("astro_go/front.dockerfile")?,
                CreateIfAbsent,
            ),
            file(
                root.join("docker/api.dockerfile"),
                render("astro_go/api.dockerfile")?,
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
            file(
                root.join("docker/mongo-init/init-volume-db.js"),
                render("shared/init-volume-db.js")?,
                CreateIfAbsent,
            ),
            // root
            file(root.join("Makefile"), render("shared/Makefile")?, CreateIfAbsent),
            file(root.join(".env"), env_root.clone(), CreateIfAbsent),
            file(root.join(".env.dist"), env_root, CreateIfAbsent),
            file(root.join(".gitignore"), render("shared/gitignore")?, CreateIfAbsent),
            file(root.join("README.md"), render("shared/README.md")?, AlwaysOverwrite),
            // ci
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
        ])
    }

    fn next_steps(&self) -> Vec<String> {
        vec![
            format!("cd {}", self.root.display()),
            String::from("cd api && go mod tidy && cd .."),
            String::from("make up"),
        ]
    }
}

fn scripts(port: u16) -> IndexMap<String, String> {
    IndexMap::from([
        (
            String::from("dev"),
            format!("astro dev --host 0.0.0.0 --port {port} --poll 2000"),
        ),
        (String::from("build"), String::from("astro check && astro build")),
        (
            String::from("preview"),
            format!("astro preview --host 0.0.0.0 --port {port}"),
        ),
        (String::from("astro"), String::from("astro")),
        (String::from("check"), String::from("astro check")),
    ])
}

#[cfg(test)]
mod tests {
    use crate::artifact::WritePolicy;

    use super::*;

    fn options() -> Options {
        Options {
            dir: PathBuf::from("/work"),
            name: String::from("myapp"),
            host_front: String::from("myapp.local"),
            host_api: String::from("api.myapp.local"),
            db_name: None,
            deploy_folder: Some(String::from("My App")),
            allowed_hosts: Vec::new(),
            defaults: Defaults::default(),
        }
    }

    #[test]
    fn derives_defaults() {
        let stage = AstroGo::validate(options()).unwrap();
        assert_eq!(stage.params.allowed_hosts, [".local"]);
        assert_eq!(stage.params.db_name, "myapp");
        assert_eq!(stage.params.deploy_folder, "my-app");
        assert_eq!(stage.params.api_host.as_deref(), Some("api.myapp.local"));
        assert_eq!(stage.layout.services[1].host_var, "HOST_TRAEFIK_API");
    }

    #[test]
    fn rejects_bad_hosts() {
        let mut bad = options();
        bad.host_api = String::from("api host");
        assert!(AstroGo::validate(bad).is_err());

        let mut bad = options();
        bad.host_front = String::from(".local");
        assert!(AstroGo::validate(bad).is_err());

        let mut bad = options();
        bad.db_name = Some(String::from("***"));
        assert!(AstroGo::validate(bad).is_err());
    }

    #[test]
    fn checks_prerequisites_before_creating_anything() {
        let stage = AstroGo::validate(options()).unwrap();
        let generators = stage.generators();
        let required = generators
            .iter()
            .take_while(|step| matches!(step, Step::Require(_)))
            .map(|step| match step {
                Step::Require(requirement) => requirement.tool.as_str(),
                _ => unreachable!(),
            })
            .collect::<Vec<_>>();
        assert_eq!(required, ["node", "pnpm", "go"]);
        let Step::Require(go) = &generators[2] else {
            panic!("expected a requirement");
        };
        assert_eq!(go.version.as_ref().unwrap().1, "1.24.4");
    }

    #[test]
    fn generators_are_resumable() {
        let stage = AstroGo::validate(options()).unwrap();
        let runs = stage
            .generators()
            .into_iter()
            .filter_map(|step| match step {
                Step::Run(run) => Some(run),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(runs[0].unless_exists, Some(stage.root.join("front")));
        assert_eq!(runs[3].primary.to_string(), "go mod init myapp/api");
        assert_eq!(runs[3].unless_exists, Some(stage.root.join("api/go.mod")));
        assert_eq!(
            runs[4].primary.to_string(),
            "go get github.com/gin-gonic/gin github.com/gin-contrib/cors go.mongodb.org/mongo-driver/mongo"
        );
        assert!(stage.generators().iter().any(|step| {
            matches!(step, Step::Remove(path) if path.ends_with("front/node_modules"))
        }));
    }

    #[test]
    fn emits_the_full_tree() {
        let stage = AstroGo::validate(options()).unwrap();
        let files = stage
            .artifacts(&Renderer::new().unwrap())
            .unwrap()
            .into_iter()
            .filter_map(|emit| match emit.into_inner() {
                Emit::File(artifact) => Some((
                    artifact.path.strip_prefix(&stage.root).unwrap().display().to_string(),
                    artifact.policy,
                )),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(files.len(), 27);
        let overwritten = files
            .iter()
            .filter(|(_, policy)| *policy == WritePolicy::AlwaysOverwrite)
            .map(|(path, _)| path.as_str())
            .collect::<Vec<_>>();
        assert_eq!(overwritten, ["front/astro.config.mjs", "README.md"]);
        for expected in [
            "api/cmd/api/main.go",
            "api/tmp/air/api/.gitkeep",
            "docker/mongo-init/init-volume-db.js",
            ".github/workflows/prod.yml",
        ] {
            assert!(files.iter().any(|(path, _)| path == expected), "{expected}");
        }
    }

    #[test]
    fn astro_output_is_only_rewritten_by_a_fresh_create() {
        let stage = AstroGo::validate(options()).unwrap();
        let owned = stage
            .artifacts(&Renderer::new().unwrap())
            .unwrap()
            .into_iter()
            .filter_map(|emit| match emit {
                Emit::Owned { generator, emit } => Some((generator, emit.into_inner())),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(owned.len(), 2);
        assert!(owned.iter().all(|(generator, _)| generator == CREATE_FRONT));
        assert!(matches!(
            &owned[1].1,
            Emit::Patch(patch) if patch.path.ends_with("front/package.json")
        ));
    }

    #[test]
    fn dev_script_listens_on_all_interfaces() {
        let scripts = scripts(3000);
        assert_eq!(scripts["dev"], "astro dev --host 0.0.0.0 --port 3000 --poll 2000");
        assert_eq!(scripts.keys().next().map(String::as_str), Some("dev"));
    }
}
