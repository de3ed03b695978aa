//! The demo application behind `shellac-demo`.
//!
//! A cake shop with a deployment pipeline: enough to show multi-word
//! commands, validated parameters, shared application state and a
//! cancellable long-running job. The shop opens with the start command and
//! closes with the exit command.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use shellac_kernel::{
    Args, AsyncCommand, CommandError, CommandResult, CommandSpec, Handler, JobContext, ParamSpec,
    RegistrationConflict, Shell, ShellConfig, Validator, Value,
};

pub const FLAVORS: [&str; 3] = ["chocolate", "vanilla", "marble"];
pub const TOPPINGS: [&str; 4] = ["sprinkles", "cherries", "nuts", "frosting"];

/// Progress of the most recent deployment.
#[derive(Debug, Clone, PartialEq)]
pub enum Deployment {
    Running { target: String, step: i64, steps: i64 },
    Finished { target: String },
    RolledBack { target: String, step: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cake {
    pub layers: i64,
    pub flavor: String,
    pub toppings: Vec<String>,
}

/// Shared state every command sees.
#[derive(Debug, Default)]
pub struct Bakery {
    deployment: Mutex<Option<Deployment>>,
    cakes: Mutex<Vec<Cake>>,
    open: AtomicBool,
}

impl Bakery {
    pub fn deployment(&self) -> Option<Deployment> {
        self.deployment.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_deployment(&self, state: Deployment) {
        *self.deployment.lock().unwrap_or_else(|e| e.into_inner()) = Some(state);
    }

    pub fn cakes(&self) -> Vec<Cake> {
        self.cakes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn add_cake(&self, cake: Cake) {
        self.cakes.lock().unwrap_or_else(|e| e.into_inner()).push(cake);
    }

    fn clear_cakes(&self) -> usize {
        std::mem::take(&mut *self.cakes.lock().unwrap_or_else(|e| e.into_inner())).len()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// `deploy [target] [-steps n]`: walks through the steps slowly.
///
/// Cancelling rolls back and records where it stopped.
pub struct Deploy {
    pub step_time: Duration,
}

impl Default for Deploy {
    fn default() -> Self {
        Self {
            step_time: Duration::from_millis(500),
        }
    }
}

#[async_trait]
impl AsyncCommand<Bakery> for Deploy {
    async fn run(&self, args: Args, ctx: JobContext<Bakery>) -> CommandResult {
        let target = args.get_string("target").unwrap_or_default();
        let steps = args.get_int("steps").unwrap_or(5);

        for step in 1..=steps {
            ctx.app().set_deployment(Deployment::Running {
                target: target.clone(),
                step,
                steps,
            });
            if let Err(e) = ctx.sleep(self.step_time).await {
                tracing::debug!(job = %ctx.job_id(), step, "deployment rolled back");
                ctx.app().set_deployment(Deployment::RolledBack {
                    target: target.clone(),
                    step,
                });
                return Err(e);
            }
        }

        ctx.app().set_deployment(Deployment::Finished {
            target: target.clone(),
        });
        Ok(Value::String(format!("Deployed to {} in {} steps", target, steps)))
    }
}

fn deploy_status(_args: Args, bakery: &Bakery) -> CommandResult {
    let status = match bakery.deployment() {
        None => "No deployments yet".to_string(),
        Some(Deployment::Running { target, step, steps }) => {
            format!("Deploying to {}: step {}/{}", target, step, steps)
        }
        Some(Deployment::Finished { target }) => format!("Deployed to {}", target),
        Some(Deployment::RolledBack { target, step }) => {
            format!("Deployment to {} rolled back at step {}", target, step)
        }
    };
    Ok(Value::String(status))
}

fn cake_make(args: Args, bakery: &Bakery) -> CommandResult {
    let layers = args
        .get_int("layers")
        .ok_or_else(|| CommandError::failed("layers missing"))?;
    let flavor = args
        .get_string("flavor")
        .ok_or_else(|| CommandError::failed("flavor missing"))?;

    let toppings = args.get_list("toppings");

    let mut message = format!("Baked a {}-layer {} cake", layers, flavor);
    if !toppings.is_empty() {
        message.push_str(&format!(" with {}", toppings.join(", ")));
    }
    bakery.add_cake(Cake {
        layers,
        flavor,
        toppings,
    });
    Ok(Value::String(message))
}

fn cake_discard(_args: Args, bakery: &Bakery) -> CommandResult {
    let count = bakery.clear_cakes();
    Ok(Value::String(format!("Threw away {} cakes", count)))
}

fn open_shop(_args: Args, bakery: &Bakery) -> CommandResult {
    bakery.open.store(true, Ordering::SeqCst);
    Ok(Value::from("The bakery is open"))
}

fn close_shop(_args: Args, bakery: &Bakery) -> CommandResult {
    bakery.open.store(false, Ordering::SeqCst);
    Ok(Value::String(format!("Closing with {} cakes on the shelf", bakery.cakes().len())))
}

fn cake_show(_args: Args, bakery: &Bakery) -> CommandResult {
    let cakes = bakery.cakes();
    if cakes.is_empty() {
        return Ok(Value::from("No cakes yet"));
    }
    let lines: Vec<String> = cakes
        .iter()
        .enumerate()
        .map(|(i, cake)| format!("{}. {} layers of {}", i + 1, cake.layers, cake.flavor))
        .collect();
    Ok(Value::String(lines.join("\n")))
}

/// Every demo command, ready to register.
pub fn commands(deploy: Deploy) -> Vec<CommandSpec<Bakery>> {
    vec![
        CommandSpec::new("deploy", Handler::from_async(deploy))
            .docs("Deploy the bakery.\n\nRuns one step at a time and can be cancelled with `kill`.")
            .group("Deployment")
            .param(
                ParamSpec::positional("target", Validator::choices(["staging", "production"]))
                    .default("staging")
                    .describe("where to deploy"),
            )
            .param(
                ParamSpec::named("steps", Validator::range(1, 100))
                    .default(5)
                    .describe("number of steps"),
            ),
        CommandSpec::new("deploy status", Handler::sync(deploy_status))
            .docs("Show how the latest deployment is going.")
            .group("Deployment"),
        CommandSpec::new("cake make", Handler::sync(cake_make))
            .docs("Bake a cake.")
            .group("Cakes")
            .param(
                ParamSpec::named("layers", Validator::range(2, 10))
                    .default(3)
                    .describe("how tall"),
            )
            .param(
                ParamSpec::named("flavor", Validator::choices(FLAVORS))
                    .default("vanilla")
                    .describe("what kind"),
            )
            .param(ParamSpec::list("toppings", Validator::choices(TOPPINGS)).describe("what goes on top")),
        CommandSpec::new("cake show", Handler::sync(cake_show))
            .docs("List the cakes baked so far.")
            .group("Cakes"),
    ]
}

/// A shell with the demo commands registered.
pub fn shell(config: ShellConfig, deploy: Deploy) -> Result<Shell<Bakery>, RegistrationConflict> {
    let mut shell = Shell::with_config(Bakery::default(), config);
    for spec in commands(deploy) {
        shell.register(spec)?;
    }

    let bakery = Arc::clone(shell.app());
    shell.register(
        CommandSpec::new("cake discard", Handler::sync(cake_discard))
            .docs("Throw away every cake on the shelf.")
            .group("Cakes")
            .hidden_when(move || bakery.cakes().is_empty()),
    )?;
    shell.set_start_command(CommandSpec::new("open", Handler::sync(open_shop)))?;
    shell.set_exit_command(CommandSpec::new("close", Handler::sync(close_shop)))?;
    Ok(shell)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo() -> Shell<Bakery> {
        shell(ShellConfig::named("demo"), Deploy::default()).expect("register")
    }

    #[tokio::test]
    async fn make_a_cake_with_defaults() {
        let shell = demo();
        let result = shell.execute("cake make").await;
        assert_eq!(result.out, "Baked a 3-layer vanilla cake");
        assert_eq!(
            shell.app().cakes(),
            vec![Cake {
                layers: 3,
                flavor: "vanilla".to_string(),
                toppings: Vec::new(),
            }]
        );
    }

    #[tokio::test]
    async fn toppings_take_several_values() {
        let shell = demo();
        let result = shell
            .execute("cake make -toppings sprinkles nuts -flavor marble")
            .await;
        assert_eq!(result.out, "Baked a 3-layer marble cake with sprinkles, nuts");
        assert_eq!(shell.app().cakes()[0].toppings, vec!["sprinkles", "nuts"]);

        let bad = shell.execute("cake make -toppings gravel").await;
        assert_eq!(bad.code, 2);
        assert_eq!(shell.app().cakes().len(), 1);
    }

    #[tokio::test]
    async fn discard_is_hidden_until_there_are_cakes() {
        let shell = demo();
        assert!(!shell.execute("help").await.out.contains("cake discard"));

        shell.execute("cake make").await;
        assert!(shell.execute("help").await.out.contains("cake discard"));

        assert_eq!(shell.execute("cake discard").await.out, "Threw away 1 cakes");
        assert!(!shell.execute("help").await.out.contains("cake discard"));
    }

    #[tokio::test]
    async fn shop_opens_and_closes() {
        let shell = demo();
        assert!(!shell.app().is_open());
        let opened = shell.run_start_command(Vec::new()).await.expect("start command");
        assert_eq!(opened.out, "The bakery is open");
        assert!(shell.app().is_open());

        shell.execute("cake make").await;
        let closed = shell.run_exit_command().await.expect("exit command");
        assert_eq!(closed.out, "Closing with 1 cakes on the shelf");
        assert!(!shell.app().is_open());
    }

    #[tokio::test]
    async fn question_mark_shows_command_help() {
        let shell = demo();
        let help = shell.execute("cake make ?").await;
        assert!(help.ok());
        assert!(help
            .out
            .starts_with("usage: cake make [-layers <int>] [-flavor <choice>] [-toppings <choice>...]"));
        assert!(shell.app().cakes().is_empty());
    }

    #[tokio::test]
    async fn layer_count_is_range_checked() {
        let shell = demo();
        let result = shell.execute("cake make -layers 1").await;
        assert_eq!(result.code, 2);
        assert_eq!(result.err, r#"layers: "1" is not an integer in the range {2-10}."#);
        assert!(shell.app().cakes().is_empty());
    }

    #[tokio::test]
    async fn flavor_must_be_known() {
        let shell = demo();
        let result = shell.execute("cake make -flavor bogus").await;
        assert_eq!(result.code, 2);
        assert_eq!(
            result.err,
            r#"flavor: "bogus" must be one of chocolate, vanilla, marble."#
        );
    }

    #[tokio::test]
    async fn show_lists_cakes_in_order() {
        let shell = demo();
        shell
            .execute("cake make -layers 2 -flavor marble && cake make -flavor chocolate")
            .await;
        let result = shell.execute("cake show").await;
        assert_eq!(result.out, "1. 2 layers of marble\n2. 3 layers of chocolate");
    }

    #[tokio::test(start_paused = true)]
    async fn deploy_runs_in_the_foreground() {
        let shell = demo();
        let result = shell.execute("deploy production -steps 3").await;
        assert_eq!(result.out, "Deployed to production in 3 steps");
        assert_eq!(
            shell.app().deployment(),
            Some(Deployment::Finished {
                target: "production".to_string()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn status_reports_progress_of_a_background_deploy() {
        let shell = demo();
        let started = shell.execute("deploy -steps 4 -background").await;
        assert_eq!(started.out, "Job 1 is running in the background");

        tokio::time::sleep(Duration::from_millis(1200)).await;
        let status = shell.execute("deploy status").await;
        assert_eq!(status.out, "Deploying to staging: step 3/4");
    }

    #[tokio::test(start_paused = true)]
    async fn kill_rolls_back() {
        let shell = demo();
        shell.execute("deploy -background").await;
        tokio::time::sleep(Duration::from_millis(700)).await;

        shell.execute("kill 1").await;
        let result = shell.execute("fg 1").await;
        assert_eq!(result.code, 1);
        assert_eq!(result.err, "cancelled");
        assert_eq!(
            shell.app().deployment(),
            Some(Deployment::RolledBack {
                target: "staging".to_string(),
                step: 2
            })
        );
    }
}
