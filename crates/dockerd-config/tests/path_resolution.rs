//! Integration tests for configuration path resolution.

#![cfg(unix)]

use std::cell::RefCell;
use std::path::PathBuf;

use rstest::{fixture, rstest};
use rstest_bdd_macros::{given, scenario, then, when};

use clap::Command;
use dockerd_config::{
    DaemonConfig, DaemonFlags, ExecutionMode, FlagInstaller, FlagSetBuilder, HostEndpoint,
    MapEnvironment, PathResolutionError, ResolvedPaths, certs_dir, config_file,
};

struct Harness {
    env: RefCell<MapEnvironment>,
    resolved: RefCell<Option<Result<ResolvedPaths, PathResolutionError>>>,
}

impl Harness {
    fn new() -> Self {
        Self {
            env: RefCell::new(MapEnvironment::new().with_uid(1000)),
            resolved: RefCell::new(None),
        }
    }

    fn set_var(&self, key: &str, value: &str) {
        self.env.borrow_mut().set_var(key, value);
    }

    fn resolve(&self, mode: ExecutionMode) {
        let result = ResolvedPaths::resolve(mode, &*self.env.borrow());
        *self.resolved.borrow_mut() = Some(result);
    }

    fn paths(&self) -> ResolvedPaths {
        match self.resolved.borrow().as_ref() {
            Some(Ok(paths)) => paths.clone(),
            Some(Err(error)) => panic!("path resolution failed: {error}"),
            None => panic!("paths were not resolved"),
        }
    }
}

#[fixture]
fn harness() -> Harness {
    Harness::new()
}

#[given("the XDG config home is \"{path}\"")]
fn given_config_home(harness: &Harness, path: String) {
    harness.set_var("XDG_CONFIG_HOME", &path);
}

#[given("the XDG runtime dir is \"{path}\"")]
fn given_runtime_dir(harness: &Harness, path: String) {
    harness.set_var("XDG_RUNTIME_DIR", &path);
}

#[given("the home directory is \"{path}\"")]
fn given_home(harness: &Harness, path: String) {
    harness.set_var("HOME", &path);
}

#[when("paths are resolved in rootful mode")]
fn when_resolved_rootful(harness: &Harness) {
    harness.resolve(ExecutionMode::Rootful);
}

#[when("paths are resolved in rootless mode")]
fn when_resolved_rootless(harness: &Harness) {
    harness.resolve(ExecutionMode::Rootless);
}

#[then("the config file is \"{path}\"")]
fn then_config_file(harness: &Harness, path: String) {
    assert_eq!(harness.paths().config_file(), PathBuf::from(path));
}

#[then("the data root is \"{path}\"")]
fn then_data_root(harness: &Harness, path: String) {
    assert_eq!(harness.paths().data_root(), PathBuf::from(path));
}

#[then("the pid file is \"{path}\"")]
fn then_pidfile(harness: &Harness, path: String) {
    assert_eq!(harness.paths().pidfile(), PathBuf::from(path));
}

#[then("the certs dir is \"{path}\"")]
fn then_certs_dir(harness: &Harness, path: String) {
    assert_eq!(harness.paths().certs_dir(), PathBuf::from(path));
}

#[then("the default host is \"{host}\"")]
fn then_default_host(harness: &Harness, host: String) {
    assert_eq!(harness.paths().default_host().to_string(), host);
}

#[then("resolution fails naming \"{variable}\"")]
fn then_resolution_fails(harness: &Harness, variable: String) {
    match harness.resolved.borrow().as_ref() {
        Some(Err(PathResolutionError::HomeUnavailable { variable: named })) => {
            assert_eq!(*named, variable);
        }
        Some(Ok(paths)) => panic!("resolution unexpectedly succeeded: {paths:?}"),
        None => panic!("paths were not resolved"),
    }
}

#[scenario(path = "tests/features/path_resolution.feature")]
fn path_resolution(#[from(harness)] harness: Harness) {
    let _ = harness;
}

#[rstest]
#[case(MapEnvironment::new())]
#[case(MapEnvironment::new().with_var("XDG_CONFIG_HOME", "/elsewhere"))]
#[case(MapEnvironment::new().with_var("HOME", "/home/carol"))]
fn rootful_config_file_ignores_environment(#[case] env: MapEnvironment) {
    let path = config_file(ExecutionMode::Rootful, &env).expect("rootful path resolves");
    assert_eq!(path, PathBuf::from("/etc/docker/daemon.json"));
}

#[test]
fn relative_xdg_config_home_falls_back_to_home() {
    let env = MapEnvironment::new()
        .with_var("XDG_CONFIG_HOME", "relative")
        .with_var("HOME", "/home/dave");
    let path = config_file(ExecutionMode::Rootless, &env).expect("rootless path resolves");
    assert_eq!(path, PathBuf::from("/home/dave/.config/docker/daemon.json"));
}

#[test]
fn runtime_dir_falls_back_to_the_user_run_directory() {
    let env = MapEnvironment::new()
        .with_var("HOME", "/home/erin")
        .with_uid(1234);
    let paths = ResolvedPaths::resolve(ExecutionMode::Rootless, &env).expect("paths resolve");
    assert_eq!(paths.exec_root(), PathBuf::from("/run/user/1234/docker"));
}

#[test]
fn tls_material_defaults_to_docker_cert_path() {
    let env = MapEnvironment::new()
        .with_var("DOCKER_CERT_PATH", "/srv/tls")
        .with_var("HOME", "/home/frank");
    let paths = ResolvedPaths::resolve(ExecutionMode::Rootful, &env).expect("paths resolve");
    let config = DaemonConfig::new(&paths);
    assert_eq!(config.tls.cert, PathBuf::from("/srv/tls/cert.pem"));
}

#[test]
fn certs_dir_matches_resolved_paths() {
    let env = MapEnvironment::new().with_var("HOME", "/home/gina");
    let paths = ResolvedPaths::resolve(ExecutionMode::Rootless, &env).expect("paths resolve");
    assert_eq!(paths.certs_dir(), certs_dir(ExecutionMode::Rootless, &env));
}

#[test]
fn stock_installer_accepts_resolved_defaults() {
    let env = MapEnvironment::new().with_var("HOME", "/home/hana");
    let paths = ResolvedPaths::resolve(ExecutionMode::Rootless, &env).expect("paths resolve");
    let mut builder = FlagSetBuilder::new();
    DaemonFlags
        .install(&DaemonConfig::new(&paths), &mut builder)
        .expect("installer accepts defaults");
    let flags = builder.finish().expect("flag names are unique");
    assert!(flags.contains("host"));
    assert!(flags.contains("data-root"));
}

#[rstest]
#[case("/tmp/run#1")]
#[case("/tmp/a%41")]
fn default_host_follows_runtime_dir_verbatim(#[case] runtime_dir: &str) {
    let env = MapEnvironment::new()
        .with_var("HOME", "/home/ines")
        .with_var("XDG_RUNTIME_DIR", runtime_dir);
    let paths = ResolvedPaths::resolve(ExecutionMode::Rootless, &env).expect("paths resolve");
    let mut builder = FlagSetBuilder::new();
    DaemonFlags
        .install(&DaemonConfig::new(&paths), &mut builder)
        .expect("installer accepts defaults");
    let flags = builder.finish().expect("flag names are unique");
    let matches = flags
        .args()
        .fold(Command::new("dockerd"), |command, arg| command.arg(arg.clone()))
        .try_get_matches_from(["dockerd"])
        .expect("no arguments parse");

    let config = flags
        .bind(&matches, DaemonConfig::new(&paths))
        .expect("defaults bind");

    let socket = PathBuf::from(runtime_dir).join("docker.sock");
    assert_eq!(config.hosts, vec![HostEndpoint::unix(&socket)]);
    assert_eq!(config.exec_root, PathBuf::from(runtime_dir).join("docker"));
}

#[test]
fn stock_installer_rejects_relative_roots() {
    let paths = ResolvedPaths::resolve(ExecutionMode::Rootful, &MapEnvironment::new())
        .expect("paths resolve");
    let mut defaults = DaemonConfig::new(&paths);
    defaults.data_root = PathBuf::from("docker");
    let mut builder = FlagSetBuilder::new();
    let error = DaemonFlags
        .install(&defaults, &mut builder)
        .expect_err("relative default should be rejected");
    assert_eq!(
        error.to_string(),
        "invalid default for --data-root: 'docker' is not an absolute path"
    );
}
