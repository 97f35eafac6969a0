#![cfg(unix)]

use std::fs;
use std::io::Write as _;
use std::os::unix::fs::PermissionsExt as _;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;
use walkdir::WalkDir;

/// A private HOME, a PATH made only of fake tools and an empty working
/// directory.
struct Sandbox {
    home: TempDir,
    bin: TempDir,
    work: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            home: TempDir::new().unwrap(),
            bin: TempDir::new().unwrap(),
            work: TempDir::new().unwrap(),
        }
    }

    fn tool(&self, name: &str, body: &str) {
        let path = self.bin.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn run(&self, args: &[&str], stdin: &str) -> Output {
        let mut child = Command::new(env!("CARGO_BIN_EXE_starter"))
            .args(args)
            .current_dir(self.work.path())
            .env("PATH", self.bin.path())
            .env("HOME", self.home.path())
            .env_remove("STARTER_CONFIG")
            .env_remove("STARTER_LOG")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        if let Some(mut input) = child.stdin.take() {
            // the process may exit before reading, e.g. on a usage error
            let _ = input.write_all(stdin.as_bytes());
        }
        child.wait_with_output().unwrap()
    }

    fn project(&self, name: &str) -> std::path::PathBuf {
        self.work.path().join(name)
    }

    fn read(&self, path: impl AsRef<Path>) -> String {
        fs::read_to_string(self.work.path().join(path)).unwrap()
    }

    fn entries(&self) -> Vec<String> {
        WalkDir::new(self.work.path())
            .min_depth(1)
            .into_iter()
            .map(|entry| {
                let entry = entry.unwrap();
                entry
                    .path()
                    .strip_prefix(self.work.path())
                    .unwrap()
                    .display()
                    .to_string()
            })
            .collect()
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

const FAKE_GIT: &str = r#"echo "$@" >> "$HOME/git.log"
dest="$7"
/bin/mkdir -p "$dest/.git" "$dest/app" "$dest/api"
echo "PLACEHOLDER=1" > "$dest/.env"
echo '{"projects":{"app":{"architect":{"serve":{"options":{}}}}}}' > "$dest/app/angular.json""#;

const FAKE_NPX: &str = r#"echo "$@" >> "$HOME/npx.log"
/bin/mkdir -p app/src
echo '{"projects":{"app":{"architect":{"build":{"options":{}},"serve":{}}}}}' > app/angular.json
echo '{"name":"app","scripts":{"start":"ng serve"}}' > app/package.json"#;

const FAKE_PNPM: &str = r#"echo "$@" >> "$HOME/pnpm.log"
case "$1" in
create)
    /bin/mkdir -p "$3/node_modules"
    echo '{"name":"front","scripts":{"dev":"astro dev"}}' > "$3/package.json"
    ;;
add) /bin/mkdir -p node_modules ;;
esac"#;

const FAKE_GO: &str = r#"case "$1" in
version) echo "go version go1.24.4 linux/amd64" ;;
mod) echo "module $3" > go.mod ;;
esac"#;

#[test]
fn angular_go_from_scratch() {
    let sandbox = Sandbox::new();
    sandbox.tool("git", FAKE_GIT);

    let output = sandbox.run(&["angular-go", "--name", "myapp", "--version", "v1.0.0"], "y\n");
    assert!(output.status.success(), "{}", stderr(&output));

    let root = sandbox.project("myapp");
    for file in [
        "docker/compose.yaml",
        "docker/compose.preprod.yaml",
        "docker/compose.prod.yaml",
        "docker/mongo-init/init-volume-db.js",
        ".env",
        ".env.dist",
        "api/.env",
        "api/.env.dist",
        "Makefile",
        ".github/workflows/preprod.yml",
        ".github/workflows/prod.yml",
        "README.md",
    ] {
        assert!(root.join(file).is_file(), "{file} missing");
    }
    assert!(!root.join(".git").exists());

    let env = sandbox.read("myapp/.env");
    assert!(!env.contains("PLACEHOLDER"));
    assert!(env.contains("HOST_TRAEFIK_APP=Host(`myapp.local`)"));
    assert!(env.contains("HOST_TRAEFIK_API=Host(`api.myapp.local`)"));
    let compose = sandbox.read("myapp/docker/compose.yaml");
    assert!(compose.contains("container_name: myapp_${APP_ENV}_app"));
    assert!(compose.contains("container_name: myapp_${APP_ENV}_db"));
    let angular = sandbox.read("myapp/app/angular.json");
    assert!(angular.contains("\"allowedHosts\""));
    assert!(angular.contains("\"myapp.local\""));

    let log = fs::read_to_string(sandbox.home.path().join("git.log")).unwrap();
    assert_eq!(
        log.trim(),
        "clone --branch v1.0.0 --depth 1 https://github.com/nsevendev/temp-angssr-go.git myapp"
    );
    let out = stdout(&output);
    assert!(out.contains("[OK]"));
    assert!(out.contains("Docker was not found"));
}

#[test]
fn rerun_keeps_user_edits() {
    let sandbox = Sandbox::new();
    sandbox.tool("git", FAKE_GIT);
    let args = ["angular-go", "--name", "myapp", "--version", "v1.0.0"];

    assert!(sandbox.run(&args, "y\n").status.success());
    fs::write(sandbox.project("myapp").join(".env"), "EDITED=1\n").unwrap();

    let output = sandbox.run(&args, "y\n");
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(sandbox.read("myapp/.env"), "EDITED=1\n");
    let out = stdout(&output);
    assert!(out.contains("[SKIP] clone template v1.0.0"));
    assert!(out.contains("[SKIP] .env"));

    let log = fs::read_to_string(sandbox.home.path().join("git.log")).unwrap();
    assert_eq!(log.lines().count(), 1);
}

#[test]
fn missing_name_is_a_usage_error() {
    let sandbox = Sandbox::new();
    sandbox.tool("git", FAKE_GIT);

    let output = sandbox.run(&["angular-go", "--version", "v1.0.0"], "y\n");
    assert_eq!(output.status.code(), Some(2));
    assert!(sandbox.entries().is_empty());
}

#[test]
fn unusable_name_writes_nothing() {
    let sandbox = Sandbox::new();
    sandbox.tool("git", FAKE_GIT);

    let output = sandbox.run(&["angular-go", "--name", "***", "--version", "v1.0.0"], "y\n");
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("--name"));
    assert!(sandbox.entries().is_empty());
}

#[test]
fn declining_cancels_cleanly() {
    let sandbox = Sandbox::new();
    sandbox.tool("git", FAKE_GIT);

    let output = sandbox.run(&["angular-go", "--name", "myapp", "--version", "v1.0.0"], "n\n");
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("Cancelled:"));
    assert!(sandbox.entries().is_empty());
}

#[test]
fn angular_ssr_falls_back_to_npx() {
    let sandbox = Sandbox::new();
    sandbox.tool("npx", FAKE_NPX);
    sandbox.tool("npm", "exit 0");

    let output = sandbox.run(
        &["angular-ssr", "--name", "Shop", "--host", "shop.local"],
        "y\ny\n",
    );
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("npx -y @angular/cli@latest new app --ssr --skip-git"));

    let angular: serde_json::Value =
        serde_json::from_str(&sandbox.read("shop/app/angular.json")).unwrap();
    let options = &angular["projects"]["app"]["architect"]["serve"]["options"];
    assert_eq!(options["port"], 3000);
    assert_eq!(options["host"], "0.0.0.0");
    assert_eq!(options["allowedHosts"], serde_json::json!(["shop.local"]));
    assert_eq!(angular["cli"]["analytics"], false);

    let package: serde_json::Value =
        serde_json::from_str(&sandbox.read("shop/app/package.json")).unwrap();
    assert_eq!(package["scripts"]["serve:ssr:app"], "node dist/app/server/server.mjs");
    assert_eq!(package["name"], "app");

    let root = sandbox.project("shop");
    assert!(root.join("app/src/styles.css").is_file());
    assert!(root.join("app/postcss.config.json").is_file());
    assert!(root.join(".releaserc.json").is_file());
    let mode = fs::metadata(root.join("app/entrypoint.sh")).unwrap().permissions().mode();
    assert_eq!(mode & 0o111, 0o111);
}

#[test]
fn rerun_keeps_edits_to_the_generated_workspace() {
    let sandbox = Sandbox::new();
    sandbox.tool("npx", FAKE_NPX);
    sandbox.tool("npm", "exit 0");
    let args = ["angular-ssr", "--name", "shop", "--host", "shop.local"];

    assert!(sandbox.run(&args, "y\ny\n").status.success());
    let styles = sandbox.project("shop").join("app/src/styles.css");
    let mut css = sandbox.read("shop/app/src/styles.css");
    css.push_str("body { color: red; }\n");
    fs::write(&styles, &css).unwrap();
    let package_path = sandbox.project("shop").join("app/package.json");
    let mut package: serde_json::Value =
        serde_json::from_str(&sandbox.read("shop/app/package.json")).unwrap();
    package["scripts"]["lint"] = serde_json::json!("ng lint");
    fs::write(&package_path, serde_json::to_string_pretty(&package).unwrap()).unwrap();
    let angular = sandbox.read("shop/app/angular.json");

    let output = sandbox.run(&args, "y\ny\n");
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(sandbox.read("shop/app/src/styles.css"), css);
    let package: serde_json::Value =
        serde_json::from_str(&sandbox.read("shop/app/package.json")).unwrap();
    assert_eq!(package["scripts"]["lint"], "ng lint");
    assert_eq!(
        package["scripts"]["test:ci"],
        "ng test --watch=false --browsers=ChromeHeadlessNoSandbox"
    );
    assert_eq!(sandbox.read("shop/app/angular.json"), angular);

    let out = stdout(&output);
    assert!(out.contains("[SKIP] create Angular application"), "{out}");
    assert!(out.contains("[SKIP] app/src/styles.css"), "{out}");
    assert!(out.contains("[SKIP] app/package.json"), "{out}");
    let log = fs::read_to_string(sandbox.home.path().join("npx.log")).unwrap();
    assert_eq!(log.lines().count(), 1);
}

const ASTRO_GO: [&str; 7] = [
    "astro-go",
    "--name",
    "myapp",
    "--host-front",
    "myapp.local",
    "--host-api",
    "api.myapp.local",
];

#[test]
fn astro_go_refuses_an_old_node() {
    let sandbox = Sandbox::new();
    sandbox.tool("node", "echo v20.0.0");
    sandbox.tool("pnpm", FAKE_PNPM);
    sandbox.tool("go", FAKE_GO);

    let output = sandbox.run(&ASTRO_GO, "y\ny\n");
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("[KO] check node"), "{}", stdout(&output));
    let err = stderr(&output);
    assert!(err.contains("version 20.0.0 found, 22.19.0 or newer required"), "{err}");
    assert!(!sandbox.project("myapp").exists());
    assert!(!sandbox.home.path().join("pnpm.log").exists());
}

#[test]
fn astro_go_from_scratch() {
    let sandbox = Sandbox::new();
    sandbox.tool("node", "echo v22.19.0");
    sandbox.tool("pnpm", FAKE_PNPM);
    sandbox.tool("go", FAKE_GO);

    let output = sandbox.run(&ASTRO_GO, "y\ny\n");
    assert!(output.status.success(), "{}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("[OK] check node (found 22.19.0)"), "{out}");
    assert!(out.contains("[OK] check go (found 1.24.4)"), "{out}");

    let root = sandbox.project("myapp");
    assert!(!root.join("front/node_modules").exists());
    assert!(root.join("api/cmd/api/main.go").is_file());
    assert_eq!(sandbox.read("myapp/api/go.mod"), "module myapp/api\n");
    let package: serde_json::Value =
        serde_json::from_str(&sandbox.read("myapp/front/package.json")).unwrap();
    assert_eq!(package["scripts"]["dev"], "astro dev --host 0.0.0.0 --port 3000 --poll 2000");
    assert!(sandbox.read("myapp/front/astro.config.mjs").contains("allowedHosts: ['.local']"));
    let mode = fs::metadata(root.join("front/entrypoint.sh")).unwrap().permissions().mode();
    assert_eq!(mode & 0o111, 0o111);

    let log = fs::read_to_string(sandbox.home.path().join("pnpm.log")).unwrap();
    assert_eq!(
        log.lines().collect::<Vec<_>>(),
        [
            "create astro@latest front",
            "add @astrojs/node astro @tailwindcss/vite tailwindcss",
            "add -D @astrojs/check typescript",
        ]
    );
}

#[test]
fn missing_generator_names_the_tool() {
    let sandbox = Sandbox::new();

    let output = sandbox.run(
        &["--yes", "angular-ssr", "--name", "shop", "--host", "shop.local"],
        "",
    );
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("create Angular application"), "{err}");
    assert!(err.contains("'ng (or npx)' is not available"), "{err}");
    assert!(stdout(&output).contains("[KO] create Angular application"));
    assert!(!sandbox.project("shop").join(".env").exists());
}

#[test]
fn config_prints_and_initialises() {
    let sandbox = Sandbox::new();

    let output = sandbox.run(&["config"], "");
    assert!(output.status.success());
    assert!(stdout(&output).contains("node_version = \"22.19.0\""));
    let path = sandbox.home.path().join(".starter.config.toml");
    assert!(!path.exists());

    let output = sandbox.run(&["config", "--init"], "");
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(fs::read_to_string(&path).unwrap().contains("network = \"traefik-nseven\""));

    fs::write(&path, "network = \"proxy\"\n").unwrap();
    let output = sandbox.run(&["config", "--init"], "");
    assert!(stdout(&output).contains("[SKIP]"));
    assert!(stdout(&sandbox.run(&["config"], "")).contains("network = \"proxy\""));
}
