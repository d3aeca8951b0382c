//! Behavioural tests for the launch sequence.

use std::cell::RefCell;
use std::process::ExitCode;

use dockerd_config::ROOTLESSKIT_STATE_DIR;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use super::support::{self, LaunchEvent, TestFlags, TestWorld};

type StepResult = Result<(), String>;

#[fixture]
fn world() -> RefCell<TestWorld> {
    support::world()
}

#[given("RootlessKit state is exported")]
fn given_rootlesskit(world: &RefCell<TestWorld>) {
    world.borrow_mut().enter_rootless();
}

#[given("a rootful environment")]
fn given_rootful(world: &RefCell<TestWorld>) {
    world
        .borrow_mut()
        .environment
        .remove_var(ROOTLESSKIT_STATE_DIR);
}

#[given("a runtime helper named \"{name}\" exiting with {code}")]
fn given_helper(world: &RefCell<TestWorld>, name: String, code: String) -> StepResult {
    let code = parse_code(&code)?;
    world.borrow().runtime.provide_helper(&name, code);
    Ok(())
}

#[given("a runtime failing with \"{message}\"")]
fn given_failing_runtime(world: &RefCell<TestWorld>, message: String) {
    world.borrow().runtime.fail_with(&message);
}

#[given("a flag installer that redefines \"{name}\"")]
fn given_colliding_installer(world: &RefCell<TestWorld>, name: String) {
    world.borrow_mut().flags = TestFlags::redefining(&name);
}

#[when("dockerd is launched with arguments \"{arguments}\"")]
fn when_launched_with(world: &RefCell<TestWorld>, arguments: String) {
    let args: Vec<&str> = arguments.split_whitespace().collect();
    world.borrow_mut().launch("dockerd", &args);
}

#[when("dockerd is launched without arguments")]
fn when_launched(world: &RefCell<TestWorld>) {
    world.borrow_mut().launch("dockerd", &[]);
}

#[when("\"{program}\" is executed")]
fn when_program_executed(world: &RefCell<TestWorld>, program: String) {
    world.borrow_mut().launch(&program, &[]);
}

#[then("the exit code is {code}")]
fn then_exit_code(world: &RefCell<TestWorld>, code: String) -> StepResult {
    let expected = ExitCode::from(parse_code(&code)?);
    let world = world.borrow();
    let outcome = world.outcome();
    if outcome.code == expected {
        Ok(())
    } else {
        Err(format!(
            "expected exit code {code}, got {:?}; stderr: {}",
            outcome.code, outcome.stderr
        ))
    }
}

#[then("standard output contains \"{text}\"")]
fn then_stdout_contains(world: &RefCell<TestWorld>, text: String) {
    let world = world.borrow();
    let stdout = &world.outcome().stdout;
    assert!(stdout.contains(&text), "stdout missing {text:?}: {stdout}");
}

#[then("standard error contains \"{text}\"")]
fn then_stderr_contains(world: &RefCell<TestWorld>, text: String) {
    let world = world.borrow();
    let stderr = &world.outcome().stderr;
    assert!(stderr.contains(&text), "stderr missing {text:?}: {stderr}");
}

#[then("the daemon did not run")]
fn then_daemon_not_run(world: &RefCell<TestWorld>) {
    assert_eq!(world.borrow().runtime.runs(), 0);
}

#[then("the daemon ran once")]
fn then_daemon_ran_once(world: &RefCell<TestWorld>) {
    assert_eq!(world.borrow().runtime.runs(), 1);
}

#[then("logging was not installed")]
fn then_logging_not_installed(world: &RefCell<TestWorld>) {
    assert_eq!(world.borrow().logging.installs(), 0);
}

#[then("the execution mode is \"{mode}\"")]
fn then_execution_mode(world: &RefCell<TestWorld>, mode: String) -> StepResult {
    let events = world.borrow().reporter.events();
    let detected = events.iter().find_map(|event| match event {
        LaunchEvent::ModeDetected(detected) => Some(detected.to_string()),
        _ => None,
    });
    match detected {
        Some(detected) if detected == mode => Ok(()),
        other => Err(format!("expected mode {mode}, detected {other:?}")),
    }
}

#[then("no command was built")]
fn then_no_command(world: &RefCell<TestWorld>) {
    assert!(!world.borrow().reporter.command_was_built());
}

#[scenario(path = "tests/features/launch.feature")]
fn launch_sequence(world: RefCell<TestWorld>) -> Result<(), String> {
    let _ = world;
    Ok(())
}

fn parse_code(value: &str) -> Result<u8, String> {
    value
        .parse::<u8>()
        .map_err(|error| format!("invalid exit code '{value}': {error}"))
}
