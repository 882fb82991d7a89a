//! The build pipeline.
//!
//! Sequences configuration resolution, repository synchronization, argv
//! construction, and build execution. Each phase only starts after the
//! previous one succeeded; nothing is retried.

use crate::cli::FlagInputs;
use crate::command::{self, Renderer};
use crate::config::{self, BuildConfig, Validator};
use crate::error::{BuilderError, Result};
use crate::exit_codes;
use crate::process::Executor;
use crate::sync::{self, SyncAction};
use std::path::Path;
use tracing::{debug, info};

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Synchronization step taken, `None` with `--no-clone`.
    pub sync: Option<SyncAction>,
    /// The argv the build was executed with.
    pub argv: Vec<String>,
}

/// Runs one build with injected collaborators.
pub struct Orchestrator<'a> {
    validator: &'a dyn Validator,
    renderer: &'a dyn Renderer,
    executor: &'a dyn Executor,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        validator: &'a dyn Validator,
        renderer: &'a dyn Renderer,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            validator,
            renderer,
            executor,
        }
    }

    /// Resolve `flags` and run the build, relaying output to `sink`.
    pub fn run(&self, flags: &FlagInputs, sink: &mut dyn FnMut(&str)) -> Result<BuildReport> {
        let config = config::resolve(flags, self.validator)?;
        self.run_config(&config, sink)
    }

    /// Run the build for an already resolved configuration.
    pub fn run_config(
        &self,
        config: &BuildConfig,
        sink: &mut dyn FnMut(&str),
    ) -> Result<BuildReport> {
        debug!(
            work_dir = %config.work_dir().display(),
            no_clone = config.no_clone(),
            no_push = config.no_push(),
            substituters = config.substituters().len(),
            "resolved build configuration"
        );

        // Reject a disallowed command before touching the filesystem.
        command::parse_command(config.build_command())?;

        ensure_dir(config.work_dir())?;

        let sync = match config.clone_spec() {
            Some(spec) => Some(sync::synchronize(config.work_dir(), spec)?),
            None => {
                info!("Skipping repository sync (no-clone)");
                None
            }
        };

        let argv = command::build(config, self.renderer)?;

        info!("Start building...");
        let status = self.executor.execute(&argv, config.work_dir(), sink)?;
        if !status.success() {
            return Err(BuilderError::BuildFailure { code: status.code });
        }
        info!("Build finished!");

        Ok(BuildReport { sync, argv })
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| {
        BuilderError::Io(format!(
            "failed to create working directory '{}': {}",
            dir.display(),
            e
        ))
    })
}

/// Map a pipeline outcome onto the process exit code.
pub fn exit_code<T>(result: &Result<T>) -> i32 {
    match result {
        Ok(_) => exit_codes::SUCCESS,
        Err(err) => err.exit_code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::DhallRenderer;
    use crate::config::JsonSchemaValidator;
    use crate::process::ProcessStatus;
    use crate::test_support::{commit_file, create_test_repo};
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Executor that records argv and replays scripted output.
    struct ScriptedExecutor {
        output: Vec<&'static str>,
        code: Option<i32>,
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl ScriptedExecutor {
        fn new(output: Vec<&'static str>, code: Option<i32>) -> Self {
            Self {
                output,
                code,
                calls: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.borrow().clone()
        }
    }

    impl Executor for ScriptedExecutor {
        fn execute(
            &self,
            argv: &[String],
            _cwd: &Path,
            sink: &mut dyn FnMut(&str),
        ) -> Result<ProcessStatus> {
            self.calls.borrow_mut().push(argv.to_vec());
            for line in &self.output {
                sink(line);
            }
            Ok(ProcessStatus { code: self.code })
        }
    }

    fn flags_for(upstream: &Path, work_dir: &Path) -> FlagInputs {
        FlagInputs {
            dir: work_dir.to_path_buf(),
            repository: Some(upstream.to_string_lossy().to_string()),
            command: Some("nix build .#default".to_string()),
            no_push: true,
            ..FlagInputs::new()
        }
    }

    fn run_with(
        executor: &ScriptedExecutor,
        flags: &FlagInputs,
    ) -> (Result<BuildReport>, Vec<String>) {
        let validator = JsonSchemaValidator::new().unwrap();
        let orchestrator = Orchestrator::new(&validator, &DhallRenderer, executor);
        let mut relayed = Vec::new();
        let result = orchestrator.run(flags, &mut |line| relayed.push(line.to_string()));
        (result, relayed)
    }

    #[test]
    fn test_successful_build() {
        let upstream = create_test_repo();
        let scratch = TempDir::new().unwrap();
        let work_dir = scratch.path().join("checkout");
        let executor = ScriptedExecutor::new(vec!["building", "done"], Some(0));

        let (result, relayed) = run_with(&executor, &flags_for(upstream.path(), &work_dir));

        let report = result.unwrap();
        assert_eq!(report.sync, Some(SyncAction::Clone));
        assert_eq!(report.argv, vec!["nix", "build", ".#default"]);
        assert_eq!(relayed, vec!["building", "done"]);
        assert!(work_dir.join("README.md").exists());
        assert_eq!(exit_code(&Ok::<(), BuilderError>(())), exit_codes::SUCCESS);
    }

    #[test]
    fn test_build_failure_maps_to_exit_one_after_relay() {
        let upstream = create_test_repo();
        let scratch = TempDir::new().unwrap();
        let work_dir = scratch.path().join("checkout");
        let executor = ScriptedExecutor::new(vec!["error: build failed", "last line"], Some(3));

        let (result, relayed) = run_with(&executor, &flags_for(upstream.path(), &work_dir));

        assert_eq!(relayed, vec!["error: build failed", "last line"]);
        assert!(matches!(
            result,
            Err(BuilderError::BuildFailure { code: Some(3) })
        ));
        assert_eq!(exit_code(&result), exit_codes::FAILURE);
    }

    #[test]
    fn test_signal_terminated_build_is_failure() {
        let scratch = TempDir::new().unwrap();
        let flags = FlagInputs {
            dir: scratch.path().join("work"),
            no_clone: true,
            no_push: true,
            command: Some("nix build".to_string()),
            ..FlagInputs::new()
        };
        let executor = ScriptedExecutor::new(vec![], None);

        let (result, _) = run_with(&executor, &flags);
        assert!(matches!(result, Err(BuilderError::BuildFailure { code: None })));
        assert_eq!(exit_code(&result), exit_codes::FAILURE);
    }

    #[test]
    fn test_disallowed_command_has_no_side_effects() {
        let upstream = create_test_repo();
        let scratch = TempDir::new().unwrap();
        let work_dir = scratch.path().join("checkout");
        let flags = FlagInputs {
            command: Some("echo hi".to_string()),
            ..flags_for(upstream.path(), &work_dir)
        };
        let executor = ScriptedExecutor::new(vec![], Some(0));

        let (result, _) = run_with(&executor, &flags);

        assert!(matches!(result, Err(BuilderError::DisallowedCommand(_))));
        assert_eq!(exit_code(&result), exit_codes::DISALLOWED_COMMAND);
        assert!(!work_dir.exists());
        assert!(executor.calls().is_empty());
    }

    #[test]
    fn test_config_error_has_no_side_effects() {
        let scratch = TempDir::new().unwrap();
        let work_dir = scratch.path().join("checkout");
        let flags = FlagInputs {
            dir: work_dir.clone(),
            command: Some("nix build".to_string()),
            no_push: true,
            ..FlagInputs::new()
        };
        let executor = ScriptedExecutor::new(vec![], Some(0));

        let (result, _) = run_with(&executor, &flags);

        assert!(matches!(result, Err(BuilderError::Config(_))));
        assert_eq!(exit_code(&result), exit_codes::FAILURE);
        assert!(!work_dir.exists());
        assert!(executor.calls().is_empty());
    }

    #[test]
    fn test_sync_failure_stops_before_build() {
        let scratch = TempDir::new().unwrap();
        let flags = FlagInputs {
            dir: scratch.path().join("checkout"),
            repository: Some(scratch.path().join("missing").to_string_lossy().to_string()),
            command: Some("nix build".to_string()),
            no_push: true,
            ..FlagInputs::new()
        };
        let executor = ScriptedExecutor::new(vec![], Some(0));

        let (result, _) = run_with(&executor, &flags);

        assert!(matches!(result, Err(BuilderError::Sync(_))));
        assert_eq!(exit_code(&result), exit_codes::FAILURE);
        assert!(executor.calls().is_empty());
    }

    #[test]
    fn test_no_clone_builds_in_existing_dir() {
        let scratch = TempDir::new().unwrap();
        let work_dir = scratch.path().join("work");
        let flags = FlagInputs {
            dir: work_dir.clone(),
            no_clone: true,
            no_push: true,
            command: Some("nix-build".to_string()),
            ..FlagInputs::new()
        };
        let executor = ScriptedExecutor::new(vec![], Some(0));

        let (result, _) = run_with(&executor, &flags);

        let report = result.unwrap();
        assert_eq!(report.sync, None);
        assert_eq!(report.argv, vec!["nix-build"]);
        assert!(work_dir.is_dir());
    }

    #[test]
    fn test_push_renders_config_and_wraps_build() {
        let upstream = create_test_repo();
        let scratch = TempDir::new().unwrap();
        let work_dir = scratch.path().join("checkout");
        let flags = FlagInputs {
            no_push: false,
            target: Some("https://caches.example/mycache".to_string()),
            api_key: Some("token".to_string()),
            signing_key: Some("sign".to_string()),
            ..flags_for(upstream.path(), &work_dir)
        };
        let executor = ScriptedExecutor::new(vec![], Some(0));

        let (result, _) = run_with(&executor, &flags);

        let report = result.unwrap();
        assert_eq!(
            report.argv,
            vec![
                "cachix",
                "-c",
                "./cachix.dhall",
                "watch-exec",
                "mycache",
                "--",
                "nix",
                "build",
                ".#default"
            ]
        );
        let rendered = std::fs::read_to_string(work_dir.join("cachix.dhall")).unwrap();
        assert!(rendered.contains("hostname = \"https://caches.example/\""));
        assert!(rendered.contains("name = \"mycache\""));
    }

    #[test]
    fn test_repeated_runs_pull_and_produce_identical_argv() {
        let upstream = create_test_repo();
        let scratch = TempDir::new().unwrap();
        let work_dir = scratch.path().join("checkout");
        let flags = FlagInputs {
            no_push: false,
            target: Some("https://caches.example/mycache".to_string()),
            api_key: Some("token".to_string()),
            signing_key: Some("sign".to_string()),
            substituter: vec!["https://a".to_string()],
            trusted_key: vec!["k1".to_string()],
            ..flags_for(upstream.path(), &work_dir)
        };
        let executor = ScriptedExecutor::new(vec![], Some(0));

        let (initial, _) = run_with(&executor, &flags);
        assert_eq!(initial.unwrap().sync, Some(SyncAction::Clone));

        let (first, _) = run_with(&executor, &flags);
        let (second, _) = run_with(&executor, &flags);
        let first = first.unwrap();
        let second = second.unwrap();

        assert_eq!(first.sync, Some(SyncAction::Pull));
        assert_eq!(second.sync, Some(SyncAction::Pull));
        assert_eq!(first.argv, second.argv);
    }

    #[test]
    fn test_upstream_changes_are_pulled_before_build() {
        let upstream = create_test_repo();
        let scratch = TempDir::new().unwrap();
        let work_dir = scratch.path().join("checkout");
        let flags = flags_for(upstream.path(), &work_dir);
        let executor = ScriptedExecutor::new(vec![], Some(0));

        run_with(&executor, &flags).0.unwrap();
        commit_file(upstream.path(), "flake.nix", "{ outputs = _: { }; }\n");

        let report = run_with(&executor, &flags).0.unwrap();
        assert_eq!(report.sync, Some(SyncAction::Pull));
        assert!(work_dir.join("flake.nix").exists());
    }

    #[test]
    fn test_json_request_runs_build() {
        let upstream = create_test_repo();
        let scratch = TempDir::new().unwrap();
        let work_dir = scratch.path().join("checkout");
        let document = serde_json::json!({
            "git_config": { "repository": upstream.path().to_string_lossy(), "noclone": false },
            "build_options": {
                "command": "nix build",
                "substituters": [{ "url": "https://a", "public_signing_keys": ["k1", "k2"] }]
            },
            "cachix_config": { "push": false }
        });
        let flags = FlagInputs {
            dir: work_dir.clone(),
            json: Some(document.to_string()),
            ..FlagInputs::new()
        };
        let executor = ScriptedExecutor::new(vec![], Some(0));

        let report = run_with(&executor, &flags).0.unwrap();
        assert_eq!(
            report.argv,
            vec![
                "nix",
                "build",
                "--option",
                "extra-trusted-public-keys",
                "k1 k2",
                "--option",
                "extra-substituters",
                "https://a"
            ]
        );
        assert_eq!(executor.calls(), vec![report.argv.clone()]);
    }

    #[test]
    fn test_json_with_flags_is_rejected() {
        let scratch = TempDir::new().unwrap();
        let flags = FlagInputs {
            dir: scratch.path().join("checkout"),
            json: Some("{}".to_string()),
            no_push: true,
            ..FlagInputs::new()
        };
        let executor = ScriptedExecutor::new(vec![], Some(0));

        let (result, _) = run_with(&executor, &flags);
        assert!(matches!(
            result,
            Err(BuilderError::Config(
                crate::error::ConfigError::MutuallyExclusive { .. }
            ))
        ));
    }
}
