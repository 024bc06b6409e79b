// src/cli.rs
use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::*;
use std::{env, path::PathBuf};

use crate::{
    commands::{self, report::ReportArgs, run::RunArgs},
    core::models::Framework,
    infra::t,
};

const DEFAULT_WORKSPACE: &str = "/tmp/benchmark_workspace";

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for `--lang <VALUE>` or `--lang=<VALUE>`.
fn pre_parse_language() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    for (pos, arg) in args.iter().enumerate() {
        if let Some(lang) = arg.strip_prefix("--lang=") {
            return Some(lang.to_string());
        }
        if arg == "--lang" {
            return args.get(pos + 1).cloned();
        }
    }
    None
}

fn path_arg(name: &'static str, value_name: &'static str, help: String) -> Arg {
    Arg::new(name)
        .long(name)
        .help(help)
        .value_name(value_name)
        .value_parser(clap::value_parser!(PathBuf))
        .action(ArgAction::Set)
}

fn workspace_arg(locale: &str) -> Arg {
    Arg::new("workspace")
        .long("workspace")
        .help(t!("cli.arg_workspace", locale = locale).to_string())
        .value_name("WORKSPACE")
        .default_value(DEFAULT_WORKSPACE)
        .action(ArgAction::Set)
}

pub fn build_cli(locale: &str) -> Command {
    Command::new("bench-harness")
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli.about", locale = locale).to_string())
        .arg_required_else_help(true)
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli.arg_lang", locale = locale).to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .subcommand(
            Command::new("run")
                .about(t!("cli.cmd_run_about", locale = locale).to_string())
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .help(t!("cli.arg_config", locale = locale).to_string())
                        .value_name("CONFIG")
                        .required(true)
                        .value_delimiter(',')
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Append),
                )
                .arg(workspace_arg(locale))
                .arg(
                    Arg::new("bench-home")
                        .long("bench-home")
                        .help(t!("cli.arg_bench_home", locale = locale).to_string())
                        .value_name("BENCH_HOME")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("set")
                        .long("set")
                        .help(t!("cli.arg_set", locale = locale).to_string())
                        .value_name("KEY=VALUE")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("test")
                        .short('t')
                        .long("test")
                        .help(t!("cli.arg_test", locale = locale).to_string())
                        .value_name("TEST_ID")
                        .value_delimiter(',')
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("total-runners")
                        .long("total-runners")
                        .help(t!("cli.arg_total_runners", locale = locale).to_string())
                        .value_name("TOTAL_RUNNERS")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set)
                        .requires("runner-index"),
                )
                .arg(
                    Arg::new("runner-index")
                        .long("runner-index")
                        .help(t!("cli.arg_runner_index", locale = locale).to_string())
                        .value_name("RUNNER_INDEX")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set)
                        .requires("total-runners"),
                )
                .arg(
                    Arg::new("upload")
                        .long("upload")
                        .help(t!("cli.arg_upload", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(path_arg("html", "HTML", t!("cli.arg_html", locale = locale).to_string()))
                .arg(path_arg("json", "JSON", t!("cli.arg_json", locale = locale).to_string()))
                .arg(
                    Arg::new("debug-level")
                        .long("debug-level")
                        .help(t!("cli.arg_debug_level", locale = locale).to_string())
                        .value_name("LEVEL")
                        .default_value("0")
                        .value_parser(clap::value_parser!(u8))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("quiet")
                        .short('q')
                        .long("quiet")
                        .help(t!("cli.arg_quiet", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("report")
                .about(t!("cli.cmd_report_about", locale = locale).to_string())
                .arg(
                    Arg::new("dir")
                        .help(t!("cli.arg_report_dir", locale = locale).to_string())
                        .value_name("DIR")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("framework")
                        .long("framework")
                        .help(t!("cli.arg_framework", locale = locale).to_string())
                        .value_name("FRAMEWORK")
                        .value_parser(Framework::all().map(|f| f.key()))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .help(t!("cli.arg_report_config", locale = locale).to_string())
                        .value_name("CONFIG")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("upload")
                        .long("upload")
                        .help(t!("cli.arg_upload", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(path_arg("html", "HTML", t!("cli.arg_html", locale = locale).to_string()))
                .arg(path_arg("json", "JSON", t!("cli.arg_json", locale = locale).to_string()))
                .arg(workspace_arg(locale)),
        )
        .subcommand(
            Command::new("init")
                .about(t!("cli.cmd_init_about", locale = locale).to_string())
                .arg(
                    Arg::new("non-interactive")
                        .long("non-interactive")
                        .help(t!("cli.arg_non_interactive", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

fn workspace(matches: &ArgMatches) -> String {
    matches
        .get_one::<String>("workspace")
        .cloned()
        .unwrap_or_else(|| DEFAULT_WORKSPACE.to_string())
}

fn run_args(matches: &ArgMatches) -> RunArgs {
    RunArgs {
        configs: matches
            .get_many::<PathBuf>("config")
            .map(|values| values.cloned().collect())
            .unwrap_or_default(),
        workspace: workspace(matches),
        bench_home: matches.get_one::<String>("bench-home").cloned(),
        overrides: strings(matches, "set"),
        tests: strings(matches, "test"),
        total_runners: matches.get_one::<usize>("total-runners").copied(),
        runner_index: matches.get_one::<usize>("runner-index").copied(),
        upload: matches.get_flag("upload"),
        html: matches.get_one::<PathBuf>("html").cloned(),
        json: matches.get_one::<PathBuf>("json").cloned(),
        debug_level: matches.get_one::<u8>("debug-level").copied().unwrap_or(0),
        quiet: matches.get_flag("quiet"),
    }
}

fn report_args(matches: &ArgMatches) -> Result<ReportArgs> {
    let framework = matches
        .get_one::<String>("framework")
        .map(|name| name.parse::<Framework>())
        .transpose()?;
    Ok(ReportArgs {
        dir: matches.get_one::<PathBuf>("dir").cloned().unwrap_or_default(),
        framework,
        config: matches.get_one::<PathBuf>("config").cloned(),
        upload: matches.get_flag("upload"),
        html: matches.get_one::<PathBuf>("html").cloned(),
        json: matches.get_one::<PathBuf>("json").cloned(),
        workspace: workspace(matches),
    })
}

pub async fn run() -> Result<()> {
    // Pre-parse language and initialize i18n first.
    let requested = pre_parse_language();
    let language = crate::init_locale(requested.as_deref());

    let matches = build_cli(&language).get_matches();

    match matches.subcommand() {
        Some(("run", run_matches)) => {
            commands::run::execute(run_args(run_matches), &language).await?;
        }
        Some(("report", report_matches)) => {
            commands::report::execute(report_args(report_matches)?, &language).await?;
        }
        Some(("init", init_matches)) => {
            let non_interactive = init_matches.get_flag("non-interactive");

            if requested.is_none() && !non_interactive {
                println!(
                    "{}",
                    t!("cli.system_language_detected", locale = &language, lang = &language).cyan()
                );
            }
            commands::init::run_init_wizard(&language, non_interactive)?;
        }
        _ => {
            // Clap has already printed the help text.
        }
    }
    Ok(())
}
