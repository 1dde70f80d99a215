//! Command line definition and dispatch.

use std::path::PathBuf;

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::driver::{self, Faults, UniverseSetup};
use crate::settings;

/// Build the `restore-orchestrator` command
#[must_use]
pub fn command() -> Command {
    Command::new("restore-orchestrator")
        .version(restore_core::VERSION)
        .about("Universe restore orchestrator harness")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            with_common_args(Command::new("plan").about("Print the restore plan as JSON")),
        )
        .subcommand(
            with_common_args(
                Command::new("run")
                    .about("Run a restore against in-memory collaborators"),
            )
            .arg(
                Arg::new("fail-at")
                    .long("fail-at")
                    .value_parser(value_parser!(usize))
                    .help("Fail the restore subtask at this index"),
            )
            .arg(
                Arg::new("cancel-at")
                    .long("cancel-at")
                    .value_parser(value_parser!(usize))
                    .help("Cancel while the restore subtask at this index runs"),
            )
            .arg(
                Arg::new("fail-post-step")
                    .long("fail-post-step")
                    .action(ArgAction::SetTrue)
                    .help("Fail re-enabling the load balancer"),
            ),
        )
}

fn with_common_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("request")
            .long("request")
            .required(true)
            .value_parser(value_parser!(PathBuf))
            .help("Path to the JSON restore request"),
    )
    .arg(
        Arg::new("config")
            .long("config")
            .value_parser(value_parser!(PathBuf))
            .help("Path to the TOML configuration"),
    )
    .arg(
        Arg::new("controller-version")
            .long("controller-version")
            .conflicts_with("no-controller")
            .help("Controller agent version deployed on the universe"),
    )
    .arg(
        Arg::new("no-controller")
            .long("no-controller")
            .action(ArgAction::SetTrue)
            .help("Universe runs without the controller agent (default)"),
    )
}

fn universe_setup(args: &ArgMatches) -> UniverseSetup {
    let controller_version = if args.get_flag("no-controller") {
        None
    } else {
        args.get_one::<String>("controller-version").cloned()
    };
    UniverseSetup { controller_version }
}

/// Run the parsed command, writing JSON to stdout
///
/// Returns whether the restore succeeded.
///
/// # Errors
/// Unreadable inputs, or a plan that cannot be built.
pub async fn dispatch(matches: &ArgMatches) -> anyhow::Result<bool> {
    let Some((name, args)) = matches.subcommand() else {
        anyhow::bail!("no subcommand given");
    };

    let config = settings::load_config(args.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    settings::init_tracing(&config.logging);

    let request_path = args
        .get_one::<PathBuf>("request")
        .context("--request is required")?;
    let request = settings::load_request(request_path)?;
    let universe = universe_setup(args);

    match name {
        "plan" => {
            let plan = driver::plan(&request, &config, &universe)?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
            Ok(true)
        }
        "run" => {
            let faults = Faults {
                fail_at: args.get_one::<usize>("fail-at").copied(),
                cancel_at: args.get_one::<usize>("cancel-at").copied(),
                fail_post_step: args.get_flag("fail-post-step"),
            };
            let (report, result) = driver::run(request, config, &universe, faults).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if let Err(e) = &result {
                tracing::error!(error = %e, "restore failed");
            }
            Ok(result.is_ok())
        }
        other => anyhow::bail!("unknown subcommand {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_well_formed() {
        command().debug_assert();
    }

    #[test]
    fn run_parses_fault_flags() {
        let matches = command()
            .try_get_matches_from([
                "restore-orchestrator",
                "run",
                "--request",
                "req.json",
                "--fail-at",
                "2",
                "--fail-post-step",
            ])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        assert_eq!(args.get_one::<usize>("fail-at"), Some(&2));
        assert!(args.get_flag("fail-post-step"));
        assert_eq!(args.get_one::<usize>("cancel-at"), None);
    }

    fn setup_for(extra: &[&str]) -> UniverseSetup {
        let mut argv = vec!["restore-orchestrator", "plan", "--request", "req.json"];
        argv.extend_from_slice(extra);
        let matches = command().try_get_matches_from(argv).unwrap();
        let (_, args) = matches.subcommand().unwrap();
        universe_setup(args)
    }

    #[test]
    fn controller_flags_select_universe_setup() {
        assert_eq!(
            setup_for(&["--controller-version", "1.3"]).controller_version,
            Some("1.3".to_string())
        );
        assert_eq!(setup_for(&["--no-controller"]).controller_version, None);
        assert_eq!(setup_for(&[]).controller_version, None);
    }

    #[test]
    fn controller_flags_conflict() {
        let result = command().try_get_matches_from([
            "restore-orchestrator",
            "plan",
            "--request",
            "req.json",
            "--controller-version",
            "1.3",
            "--no-controller",
        ]);
        assert!(result.is_err());
    }
}
