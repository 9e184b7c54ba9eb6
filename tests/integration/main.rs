//! Integration tests for packwright

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    /// The binary with a private config file and no inherited overrides
    fn packwright(temp: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("packwright");
        cmd.env("PACKWRIGHT_CONFIG", temp.path().join("config.toml"))
            .env_remove("PACKWRIGHT_RUNTIME")
            .env_remove("PACKWRIGHT_DEVMODE")
            .env_remove("PACKWRIGHT_STACK_ID");
        cmd
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        packwright(&temp)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("buildpack layer lifecycle engine"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        packwright(&temp)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("packwright"));
    }

    #[test]
    fn config_path_honors_env() {
        let temp = TempDir::new().unwrap();
        packwright(&temp)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_init_then_show() {
        let temp = TempDir::new().unwrap();
        packwright(&temp).args(["config", "init"]).assert().success();
        assert!(temp.path().join("config.toml").exists());

        packwright(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[build]"))
            .stdout(predicate::str::contains("stack_id = \"google.22\""));
    }

    #[test]
    fn select_npm_versions() {
        let temp = TempDir::new().unwrap();
        packwright(&temp)
            .args(["select", "npm", "8.3.1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("npm ci"))
            .stdout(predicate::str::contains("yes"));

        packwright(&temp)
            .args(["select", "npm", "5.0.1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("npm install"))
            .stdout(predicate::str::contains("no"));
    }

    #[test]
    fn select_rejects_prerelease() {
        let temp = TempDir::new().unwrap();
        packwright(&temp)
            .args(["select", "npm", "9.0.0-rc.1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unsupported version"));
    }

    #[test]
    fn detect_reports_reasons() {
        let temp = TempDir::new().unwrap();
        let app = temp.path().join("app");
        std::fs::create_dir_all(&app).unwrap();
        std::fs::write(app.join("package.json"), "{}").unwrap();

        packwright(&temp)
            .arg("detect")
            .arg(&app)
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "dotnet-sdk: opted out: no project files or .dll files found",
            ))
            .stdout(predicate::str::contains(
                "nodejs-npm: opted in: found package.json",
            ));
    }

    #[test]
    fn build_fails_when_nothing_detected() {
        let temp = TempDir::new().unwrap();
        let app = temp.path().join("app");
        std::fs::create_dir_all(&app).unwrap();
        std::fs::write(app.join("package.json"), "{}").unwrap();

        packwright(&temp)
            .arg("build")
            .arg(&app)
            .args(["--runtime", "python"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("no buildpack opted in"))
            .stderr(predicate::str::contains("PACKWRIGHT_RUNTIME not set to"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn devmode_env_overrides_config_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.toml"), "[build]\ndev_mode = true\n").unwrap();
        let app = temp.path().join("app");
        std::fs::create_dir_all(&app).unwrap();

        packwright(&temp)
            .arg("build")
            .arg(&app)
            .args(["--runtime", "python"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("dev mode"))
            .stdout(predicate::str::contains(": on"));

        packwright(&temp)
            .env("PACKWRIGHT_DEVMODE", "false")
            .arg("build")
            .arg(&app)
            .args(["--runtime", "python"])
            .assert()
            .failure()
            .stdout(predicate::str::contains(": off"));

        packwright(&temp)
            .arg("build")
            .arg(&app)
            .args(["--runtime", "python", "--dev-mode=false"])
            .assert()
            .failure()
            .stdout(predicate::str::contains(": off"));
    }

    #[test]
    fn build_missing_app_dir() {
        let temp = TempDir::new().unwrap();
        packwright(&temp)
            .args(["build", "/nonexistent/app/dir"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Path not found"));
    }
}

mod lifecycle_tests {
    use async_trait::async_trait;
    use packwright::error::CAPABILITY_MISMATCH_PREFIX;
    use packwright::install::{CommandOutput, CommandRunner, CommandSpec, InstallRequest, Installer};
    use packwright::layer::{LayerRecord, FINGERPRINT_KEY};
    use packwright::lifecycle::{
        BuildContext, Buildpack, DetectContext, DetectDecision, DetectOverrides, Lifecycle,
        LifecyclePhase, LifecycleSettings, PhaseState,
    };
    use packwright::toolchain::{DotnetSdkBuildpack, NpmBuildpack};
    use packwright::{PackError, PackResult};
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Counts installs and drops a tracer file into the layer
    #[derive(Default)]
    struct FakeInstaller {
        installs: AtomicU32,
        fail: AtomicBool,
    }

    impl FakeInstaller {
        fn installs(&self) -> u32 {
            self.installs.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Installer for FakeInstaller {
        async fn install(&self, request: &InstallRequest, target: &Path) -> PackResult<()> {
            self.installs.fetch_add(1, Ordering::SeqCst);
            std::fs::write(target.join("tracer"), &request.version).unwrap();
            if self.fail.load(Ordering::SeqCst) {
                return Err(PackError::installation("sdk", "archive checksum mismatch"));
            }
            Ok(())
        }
    }

    /// Answers `--version` probes and records every command
    struct FakeRunner {
        version: String,
        commands: Mutex<Vec<String>>,
    }

    impl FakeRunner {
        fn new(version: &str) -> Self {
            Self {
                version: version.to_string(),
                commands: Mutex::new(Vec::new()),
            }
        }

        fn commands(&self) -> Vec<String> {
            self.commands.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for FakeRunner {
        async fn run(&self, spec: &CommandSpec) -> PackResult<CommandOutput> {
            self.commands.lock().unwrap().push(spec.to_string());
            if spec.args == ["--version"] {
                return Ok(CommandOutput {
                    stdout: format!("{}\n", self.version),
                    lines: vec![self.version.clone()],
                });
            }
            Ok(CommandOutput::default())
        }
    }

    /// Opts in and counts builds
    #[derive(Default)]
    struct CountingBuildpack {
        builds: AtomicU32,
    }

    #[async_trait]
    impl Buildpack for CountingBuildpack {
        fn id(&self) -> &str {
            "counting"
        }

        fn runtime(&self) -> &str {
            "counting"
        }

        async fn detect(&self, _ctx: &DetectContext) -> PackResult<DetectDecision> {
            Ok(DetectDecision::opt_in("always"))
        }

        async fn build(&self, _ctx: &mut BuildContext) -> PackResult<()> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Fixture {
        temp: TempDir,
        installer: Arc<FakeInstaller>,
        runner: Arc<FakeRunner>,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            std::fs::create_dir_all(temp.path().join("app")).unwrap();
            Self {
                temp,
                installer: Arc::new(FakeInstaller::default()),
                runner: Arc::new(FakeRunner::new("8.3.1")),
            }
        }

        fn app(&self) -> PathBuf {
            self.temp.path().join("app")
        }

        fn layers(&self) -> PathBuf {
            self.temp.path().join("layers")
        }

        fn dotnet_app(&self, sdk: &str) {
            std::fs::write(self.app().join("App.csproj"), "<Project/>").unwrap();
            std::fs::write(
                self.app().join("global.json"),
                format!(r#"{{"sdk": {{"version": "{}"}}}}"#, sdk),
            )
            .unwrap();
        }

        fn settings(&self, stack_id: &str, dev_mode: bool) -> LifecycleSettings {
            let mut platform_env = BTreeMap::new();
            platform_env.insert("PATH".to_string(), "/usr/bin".to_string());
            LifecycleSettings {
                app_dir: self.app(),
                layers_dir: self.layers(),
                stack_id: stack_id.to_string(),
                dev_mode,
                platform_env,
                event_log: true,
            }
        }

        fn lifecycle(&self, dev_mode: bool, overrides: DetectOverrides) -> Lifecycle {
            Lifecycle::new(
                self.settings("google.22", dev_mode),
                overrides,
                self.installer.clone(),
                self.runner.clone(),
            )
        }

        fn sdk_record(&self) -> Option<LayerRecord> {
            let path = self.layers().join("dotnet-sdk/sdk.toml");
            let content = std::fs::read_to_string(path).ok()?;
            toml::from_str(&content).ok()
        }
    }

    fn dotnet() -> Vec<Arc<dyn Buildpack>> {
        vec![Arc::new(DotnetSdkBuildpack::default())]
    }

    #[tokio::test]
    async fn fresh_install_builds_sdk_layer() {
        let fx = Fixture::new();
        fx.dotnet_app("3.1.100");

        let outcome = fx.lifecycle(false, DetectOverrides::none()).run(&dotnet()).await;

        assert!(outcome.succeeded(), "{:?}", outcome.failure);
        assert_eq!(fx.installer.installs(), 1);
        assert!(outcome.report.contains("Cache miss for layer sdk"));

        let sdk_dir = fx.layers().join("dotnet-sdk/sdk");
        let sdk = sdk_dir.display().to_string();
        assert_eq!(outcome.build_env["DOTNET_ROOT"], sdk);
        assert_eq!(outcome.build_env["PATH"], format!("{}:/usr/bin", sdk));
        assert!(!outcome.launch_env.contains_key("DOTNET_ROOT"));
        assert!(sdk_dir.join("env.build/DOTNET_ROOT.default").is_file());

        let record = fx.sdk_record().unwrap();
        assert_eq!(
            record.metadata[FINGERPRINT_KEY],
            "version:3.1.100,devMode:false"
        );
        assert!(record.types.build && record.types.cache && !record.types.launch);
        assert!(fx.layers().join("build-events.log").is_file());
    }

    #[tokio::test]
    async fn second_build_is_a_cache_hit() {
        let fx = Fixture::new();
        fx.dotnet_app("3.1.100");

        let first = fx.lifecycle(false, DetectOverrides::none()).run(&dotnet()).await;
        assert!(first.succeeded());
        let record = fx.sdk_record().unwrap();

        let second = fx.lifecycle(false, DetectOverrides::none()).run(&dotnet()).await;
        assert!(second.succeeded());
        assert_eq!(fx.installer.installs(), 1);
        assert!(second.report.contains("Cache hit for layer sdk"));
        assert!(second
            .report
            .contains(".NET SDK cache hit, skipping installation."));
        assert_eq!(second.report.counters("sdk").hits, 1);
        assert_eq!(second.report.counters("sdk").misses, 0);
        assert_eq!(fx.sdk_record().unwrap(), record);

        // Env scopes persisted by the first build still reach later consumers
        assert_eq!(second.build_env["DOTNET_ROOT"], first.build_env["DOTNET_ROOT"]);
    }

    #[tokio::test]
    async fn changed_version_invalidates_layer() {
        let fx = Fixture::new();
        fx.dotnet_app("3.1.100");
        assert!(fx.lifecycle(false, DetectOverrides::none()).run(&dotnet()).await.succeeded());

        let leftover = fx.layers().join("dotnet-sdk/sdk/leftover");
        std::fs::write(&leftover, "from 3.1.100").unwrap();

        fx.dotnet_app("3.1.200");
        let outcome = fx.lifecycle(false, DetectOverrides::none()).run(&dotnet()).await;

        assert!(outcome.succeeded());
        assert_eq!(fx.installer.installs(), 2);
        assert!(outcome
            .report
            .contains("Cache miss for layer sdk (was version:3.1.100,devMode:false)"));
        assert!(!leftover.exists());
        assert_eq!(
            std::fs::read_to_string(fx.layers().join("dotnet-sdk/sdk/tracer")).unwrap(),
            "3.1.200"
        );
        assert_eq!(
            fx.sdk_record().unwrap().metadata[FINGERPRINT_KEY],
            "version:3.1.200,devMode:false"
        );
    }

    #[tokio::test]
    async fn dev_mode_change_invalidates_layer() {
        let fx = Fixture::new();
        fx.dotnet_app("3.1.100");
        assert!(fx.lifecycle(false, DetectOverrides::none()).run(&dotnet()).await.succeeded());

        let outcome = fx.lifecycle(true, DetectOverrides::none()).run(&dotnet()).await;
        assert!(outcome.succeeded());
        assert_eq!(fx.installer.installs(), 2);

        let sdk = fx.layers().join("dotnet-sdk/sdk").display().to_string();
        assert_eq!(outcome.launch_env["DOTNET_ROOT"], sdk);
        assert_eq!(outcome.launch_env["DOTNET_RUNNING_IN_CONTAINER"], "true");
        assert_eq!(outcome.launch_env["PATH"], sdk);
        assert_eq!(outcome.build_env["DOTNET_ROOT"], sdk);
        assert!(!outcome.build_env.contains_key("DOTNET_RUNNING_IN_CONTAINER"));
        assert!(fx.sdk_record().unwrap().types.launch);
    }

    #[tokio::test]
    async fn failed_install_keeps_previous_record() {
        let fx = Fixture::new();
        fx.dotnet_app("3.1.100");
        assert!(fx.lifecycle(false, DetectOverrides::none()).run(&dotnet()).await.succeeded());
        let before = fx.sdk_record().unwrap();

        fx.dotnet_app("3.1.200");
        fx.installer.fail.store(true, Ordering::SeqCst);
        let outcome = fx.lifecycle(false, DetectOverrides::none()).run(&dotnet()).await;

        let failure = outcome.failure.as_ref().unwrap();
        assert_eq!(failure.buildpack.as_deref(), Some("dotnet-sdk"));
        assert_eq!(failure.phase, LifecyclePhase::Build);
        assert!(matches!(
            failure.error,
            PackError::Installation { ref reason, .. } if reason == "archive checksum mismatch"
        ));
        assert!(matches!(
            outcome.run("dotnet-sdk").unwrap().state(),
            PhaseState::Failed { .. }
        ));
        assert_eq!(fx.sdk_record().unwrap(), before);

        // The directory was cleared, so the old fingerprint must not hit
        fx.dotnet_app("3.1.100");
        fx.installer.fail.store(false, Ordering::SeqCst);
        let retry = fx.lifecycle(false, DetectOverrides::none()).run(&dotnet()).await;
        assert!(retry.succeeded());
        assert_eq!(retry.report.counters("sdk").misses, 1);
        assert_eq!(fx.installer.installs(), 3);
    }

    #[tokio::test]
    async fn minimal_stack_sets_invariant_globalization() {
        let fx = Fixture::new();
        fx.dotnet_app("6.0.100");

        let lifecycle = Lifecycle::new(
            fx.settings("google.min.22", false),
            DetectOverrides::none(),
            fx.installer.clone(),
            fx.runner.clone(),
        );
        let outcome = lifecycle.run(&dotnet()).await;

        assert!(outcome.succeeded());
        assert_eq!(outcome.build_env["DOTNET_SYSTEM_GLOBALIZATION_INVARIANT"], "true");
        assert!(!outcome
            .launch_env
            .contains_key("DOTNET_SYSTEM_GLOBALIZATION_INVARIANT"));
    }

    #[tokio::test]
    async fn forced_opt_out_never_builds() {
        let fx = Fixture::new();
        fx.dotnet_app("3.1.100");
        let counting = Arc::new(CountingBuildpack::default());
        let buildpacks: Vec<Arc<dyn Buildpack>> = vec![
            counting.clone(),
            Arc::new(DotnetSdkBuildpack::default()),
        ];

        let overrides = DetectOverrides::none().force("counting", false, "disabled for this app");
        let outcome = fx.lifecycle(false, overrides).run(&buildpacks).await;

        assert!(outcome.succeeded());
        assert_eq!(counting.builds.load(Ordering::SeqCst), 0);
        assert_eq!(
            outcome.run("counting").unwrap().reason(),
            Some("disabled for this app")
        );
        assert!(outcome
            .report
            .contains("counting: opted out: disabled for this app"));
    }

    #[tokio::test]
    async fn runtime_override_selects_buildpack() {
        let fx = Fixture::new();
        std::fs::write(fx.app().join("package.json"), "{}").unwrap();
        let counting = Arc::new(CountingBuildpack::default());
        let buildpacks: Vec<Arc<dyn Buildpack>> =
            vec![Arc::new(NpmBuildpack::new(true)), counting.clone()];

        let outcome = fx
            .lifecycle(false, DetectOverrides::none().with_runtime("counting"))
            .run(&buildpacks)
            .await;

        assert!(outcome.succeeded());
        assert_eq!(counting.builds.load(Ordering::SeqCst), 1);
        assert!(outcome
            .report
            .contains("nodejs-npm: opted out: PACKWRIGHT_RUNTIME not set to \"nodejs\""));
        assert!(fx.runner.commands().is_empty());
    }

    #[tokio::test]
    async fn npm_build_selects_ci_and_warns_without_lockfile() {
        let fx = Fixture::new();
        std::fs::write(fx.app().join("package.json"), r#"{"engines": {"npm": "^8.1.0"}}"#).unwrap();
        let buildpacks: Vec<Arc<dyn Buildpack>> = vec![Arc::new(NpmBuildpack::new(true))];

        let outcome = fx.lifecycle(false, DetectOverrides::none()).run(&buildpacks).await;

        assert!(outcome.succeeded(), "{:?}", outcome.failure);
        assert_eq!(
            fx.runner.commands(),
            vec!["npm --version".to_string(), "npm ci --quiet".to_string()]
        );
        assert!(outcome.report.contains(
            "WARNING: package-lock.json not found, dependencies may be resolved differently"
        ));

        let modules = fx.layers().join("nodejs-npm/npm_modules/node_modules");
        assert_eq!(outcome.launch_env["NODE_PATH"], modules.display().to_string());
        assert_eq!(outcome.build_env["NODE_PATH"], modules.display().to_string());
    }

    #[tokio::test]
    async fn npm_lockfile_change_invalidates_modules() {
        let fx = Fixture::new();
        std::fs::write(fx.app().join("package.json"), "{}").unwrap();
        std::fs::write(fx.app().join("package-lock.json"), r#"{"lockfileVersion": 2}"#).unwrap();
        let buildpacks: Vec<Arc<dyn Buildpack>> = vec![Arc::new(NpmBuildpack::new(true))];

        let first = fx.lifecycle(false, DetectOverrides::none()).run(&buildpacks).await;
        assert!(first.succeeded());
        assert!(!first.report.has_line_starting_with("WARNING:"));

        let second = fx.lifecycle(false, DetectOverrides::none()).run(&buildpacks).await;
        assert_eq!(second.report.counters("npm_modules").hits, 1);

        std::fs::write(fx.app().join("package-lock.json"), r#"{"lockfileVersion": 3}"#).unwrap();
        let third = fx.lifecycle(false, DetectOverrides::none()).run(&buildpacks).await;
        assert_eq!(third.report.counters("npm_modules").misses, 1);
    }

    #[tokio::test]
    async fn old_npm_installs_without_prune_support() {
        let mut fx = Fixture::new();
        fx.runner = Arc::new(FakeRunner::new("5.0.1"));
        std::fs::write(fx.app().join("package.json"), "{}").unwrap();
        let buildpacks: Vec<Arc<dyn Buildpack>> = vec![Arc::new(NpmBuildpack::new(true))];

        let outcome = fx.lifecycle(false, DetectOverrides::none()).run(&buildpacks).await;

        assert!(outcome.succeeded());
        assert_eq!(
            fx.runner.commands(),
            vec!["npm --version".to_string(), "npm install --quiet".to_string()]
        );
        assert!(outcome.report.contains("does not support prune"));
    }

    #[tokio::test]
    async fn npm_between_prune_and_ci_prunes() {
        let mut fx = Fixture::new();
        fx.runner = Arc::new(FakeRunner::new("5.7.0"));
        std::fs::write(fx.app().join("package.json"), "{}").unwrap();
        let buildpacks: Vec<Arc<dyn Buildpack>> = vec![Arc::new(NpmBuildpack::new(true))];

        let outcome = fx.lifecycle(false, DetectOverrides::none()).run(&buildpacks).await;

        assert!(outcome.succeeded());
        assert_eq!(
            fx.runner.commands(),
            vec![
                "npm --version".to_string(),
                "npm install --quiet".to_string(),
                "npm prune --production".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn conflicting_engines_npm_is_capability_mismatch() {
        let fx = Fixture::new();
        std::fs::write(fx.app().join("package.json"), r#"{"engines": {"npm": "6.x"}}"#).unwrap();
        let buildpacks: Vec<Arc<dyn Buildpack>> = vec![Arc::new(NpmBuildpack::new(true))];

        let outcome = fx.lifecycle(false, DetectOverrides::none()).run(&buildpacks).await;

        let err = outcome.error().unwrap();
        assert!(matches!(err, PackError::CapabilityMismatch(_)));
        assert!(err.to_string().starts_with(CAPABILITY_MISMATCH_PREFIX));
        assert!(!fx.layers().join("nodejs-npm/npm_modules.toml").exists());
    }

    #[tokio::test]
    async fn engines_npm_ranges_accept_installed_version() {
        for range in [">=6", "<9", "6 || 8", ">=7 <9", "latest"] {
            let fx = Fixture::new();
            std::fs::write(
                fx.app().join("package.json"),
                format!(r#"{{"engines": {{"npm": "{}"}}}}"#, range),
            )
            .unwrap();
            let buildpacks: Vec<Arc<dyn Buildpack>> = vec![Arc::new(NpmBuildpack::new(true))];

            let outcome = fx.lifecycle(false, DetectOverrides::none()).run(&buildpacks).await;

            assert!(outcome.succeeded(), "{}: {:?}", range, outcome.failure);
        }
    }

    #[tokio::test]
    async fn engines_npm_minimum_above_installed_is_mismatch() {
        let fx = Fixture::new();
        std::fs::write(fx.app().join("package.json"), r#"{"engines": {"npm": "^8.4.0"}}"#).unwrap();
        let buildpacks: Vec<Arc<dyn Buildpack>> = vec![Arc::new(NpmBuildpack::new(true))];

        let outcome = fx.lifecycle(false, DetectOverrides::none()).run(&buildpacks).await;

        let err = outcome.error().unwrap();
        assert_eq!(
            err.to_string(),
            format!(
                "{}package.json requests npm ^8.4.0 but npm 8.3.1 is installed",
                CAPABILITY_MISMATCH_PREFIX
            )
        );
    }

    #[tokio::test]
    async fn malformed_global_json_fails_build() {
        let fx = Fixture::new();
        std::fs::write(fx.app().join("App.csproj"), "<Project/>").unwrap();
        std::fs::write(fx.app().join("global.json"), "{ nope").unwrap();

        let outcome = fx.lifecycle(false, DetectOverrides::none()).run(&dotnet()).await;

        let failure = outcome.failure.as_ref().unwrap();
        assert!(failure.error.is_detection());
        assert_eq!(fx.installer.installs(), 0);
    }
}
