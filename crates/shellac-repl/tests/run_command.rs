//! Non-interactive runs: exit codes and single-command mode.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rstest::rstest;
use shellac_kernel::{CommandError, CommandSpec, Handler, Shell, ShellConfig, Value};
use shellac_repl::demo::{self, Bakery, Deploy};
use shellac_repl::Repl;

fn repl(config: ShellConfig) -> Repl<demo::Bakery> {
    Repl::new(demo::shell(config, Deploy::default()).expect("register")).expect("repl")
}

#[rstest]
#[case::success("cake make", 0)]
#[case::chain_recovers("cake make -layers 99 || cake make", 0)]
#[case::validation("cake make -layers 99", 2)]
#[case::not_found("bake", 127)]
#[case::parse_error("cake make &", 2)]
#[case::last_link_wins("cake show; cake make -flavor lemon", 2)]
fn exit_code_is_propagated(#[case] line: &str, #[case] expected: u8) {
    let repl = repl(ShellConfig::named("bakery"));
    assert_eq!(repl.run_command(line), expected);
}

#[rstest]
#[case::validation("cake make -layers 99")]
#[case::not_found("bake")]
fn propagation_can_be_turned_off(#[case] line: &str) {
    let repl = repl(ShellConfig::named("bakery").with_exit_code_propagation(false));
    assert_eq!(repl.run_command(line), 0);
}

#[test]
fn async_commands_finish_before_returning() {
    let repl = repl(ShellConfig::named("bakery"));
    let result = repl.execute("deploy production -steps 1");
    assert_eq!(result.out, "Deployed to production in 1 steps");
    assert_eq!(
        repl.shell().app().deployment(),
        Some(demo::Deployment::Finished {
            target: "production".to_string()
        })
    );
}

#[test]
fn state_carries_across_lines() {
    let repl = repl(ShellConfig::named("bakery"));
    repl.execute("cake make -layers 4 -flavor marble");
    let result = repl.execute("cake show");
    assert_eq!(result.out, "1. 4 layers of marble");
}

#[test]
fn single_command_takes_raw_arguments() {
    let repl = repl(ShellConfig::named("cake-make").with_single_command("cake make"));
    let code = repl
        .run_single(vec!["-flavor".to_string(), "chocolate".to_string()])
        .expect("single command configured");
    assert_eq!(code, 0);
    assert_eq!(repl.shell().app().cakes()[0].flavor, "chocolate");
}

#[test]
fn single_command_reports_validation_failures() {
    let repl = repl(ShellConfig::named("cake-make").with_single_command("cake make"));
    let code = repl
        .run_single(vec!["-layers".to_string(), "1".to_string()])
        .expect("single command configured");
    assert_eq!(code, 2);
    assert!(repl.shell().app().cakes().is_empty());
}

#[test]
fn single_command_needs_configuring() {
    let repl = repl(ShellConfig::named("bakery"));
    assert!(repl.run_single(Vec::new()).is_err());
}

/// The demo commands without the demo's start and exit commands.
fn bare_shell() -> Shell<Bakery> {
    let mut shell = Shell::with_config(Bakery::default(), ShellConfig::named("bakery"));
    for spec in demo::commands(Deploy::default()) {
        shell.register(spec).expect("register");
    }
    shell
}

#[test]
fn failed_start_command_stops_the_run() {
    let mut shell = bare_shell();
    shell
        .set_start_command(CommandSpec::new(
            "preheat",
            Handler::sync(|_, _: &Bakery| Err(CommandError::failed("oven is broken"))),
        ))
        .expect("start command");
    let repl = Repl::new(shell).expect("repl");

    assert_eq!(repl.run_command("cake make"), 1);
    assert!(repl.shell().app().cakes().is_empty());
}

#[test]
fn exit_command_runs_after_the_line() {
    let closed = Arc::new(AtomicBool::new(false));
    let flag = closed.clone();
    let mut shell = bare_shell();
    shell
        .set_exit_command(CommandSpec::new(
            "lock up",
            Handler::sync(move |_, bakery: &Bakery| {
                flag.store(bakery.cakes().len() == 1, Ordering::SeqCst);
                Ok(Value::Null)
            }),
        ))
        .expect("exit command");
    let repl = Repl::new(shell).expect("repl");

    assert_eq!(repl.run_command("cake make"), 0);
    assert!(closed.load(Ordering::SeqCst));
}

#[test]
fn demo_shop_is_closed_after_a_command() {
    let repl = repl(ShellConfig::named("bakery"));
    assert_eq!(repl.run_command("cake make"), 0);
    assert!(!repl.shell().app().is_open());
    assert_eq!(repl.shell().app().cakes().len(), 1);
}
