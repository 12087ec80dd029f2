//! The `noodles` command-line entry point.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::bail;
use clap::Parser;
use noodles_core::RunPlan;
use noodles_remote::ShellExecutor;
use noodles_runner::Scheduler;
use noodles_spec::load_plan;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Deploy spec-driven experiments to the servers that satisfy them.
#[derive(Debug, Parser)]
#[command(name = "noodles", version, about)]
struct Cli {
    /// Command type to run, e.g. "run", "stop" or "download".
    command_type: String,

    /// Path to the spec file, optionally with an experiment filter
    /// appended: `spec.yml:exp1,exp2`.
    spec: String,

    /// Show informational logs.
    #[arg(short, long)]
    verbose: bool,

    /// Show debug logs.
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.debug);

    let (path, filter) = split_spec_argument(&cli.spec);
    let mut plan = load_plan(Path::new(path), &cli.command_type)?;
    if let Some(names) = filter {
        apply_filter(&mut plan, &names)?;
    }

    let executor = ShellExecutor;
    let summary = Scheduler::new(&plan, &executor).run().await?;

    if summary.total > 0 {
        info!(
            "Deployed {}/{} experiments ({:.1}%) in {:.3}s",
            summary.deployed,
            summary.total,
            100.0 * summary.deployed as f64 / summary.total as f64,
            summary.elapsed.as_secs_f64(),
        );
    } else {
        info!(
            "Nothing to deploy; finished in {:.3}s",
            summary.elapsed.as_secs_f64()
        );
    }

    Ok(())
}

fn init_logging(verbose: bool, debug: bool) {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Split an optional `:exp1,exp2` experiment filter off the spec path.
fn split_spec_argument(spec: &str) -> (&str, Option<Vec<String>>) {
    match spec.rsplit_once(':') {
        Some((path, names)) if !path.is_empty() && !names.is_empty() => {
            let names = names.split(',').map(str::to_string).collect();
            (path, Some(names))
        }
        _ => (spec, None),
    }
}

/// Restrict the plan's main-stage experiments to the named ones.
///
/// The before/after stages are never filtered. Naming an experiment the
/// spec does not define is an error.
fn apply_filter(plan: &mut RunPlan, names: &[String]) -> Result<(), anyhow::Error> {
    let known: BTreeSet<&str> = plan
        .experiments
        .iter()
        .map(|experiment| experiment.name.as_str())
        .collect();
    for name in names {
        if !known.contains(name.as_str()) {
            bail!("the spec does not define an experiment named {:?}", name);
        }
    }

    plan.experiments
        .retain(|experiment| names.iter().any(|name| name == &experiment.name));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use noodles_core::Experiment;
    use std::collections::BTreeMap;

    fn named_experiment(name: &str) -> Experiment {
        Experiment {
            name: name.to_string(),
            commands: Vec::new(),
            envs: BTreeMap::new(),
            requirement_groups: Vec::new(),
            depends_on: Vec::new(),
            outputs: Default::default(),
        }
    }

    #[test]
    fn test_split_without_filter() {
        assert_eq!(split_spec_argument("specs/train.yml"), ("specs/train.yml", None));
    }

    #[test]
    fn test_split_with_filter() {
        let (path, names) = split_spec_argument("specs/train.yml:exp1,exp2");
        assert_eq!(path, "specs/train.yml");
        assert_eq!(names, Some(vec!["exp1".to_string(), "exp2".to_string()]));
    }

    #[test]
    fn test_split_trailing_colon_is_not_a_filter() {
        assert_eq!(split_spec_argument("train.yml:"), ("train.yml:", None));
    }

    #[test]
    fn test_filter_keeps_only_named_experiments() {
        let mut plan = RunPlan {
            experiments: vec![
                named_experiment("exp1"),
                named_experiment("exp2"),
                named_experiment("exp3"),
            ],
            ..Default::default()
        };

        apply_filter(&mut plan, &["exp3".to_string(), "exp1".to_string()]).unwrap();

        let names: Vec<&str> = plan
            .experiments
            .iter()
            .map(|experiment| experiment.name.as_str())
            .collect();
        assert_eq!(names, vec!["exp1", "exp3"]);
    }

    #[test]
    fn test_filter_rejects_unknown_names() {
        let mut plan = RunPlan {
            experiments: vec![named_experiment("exp1")],
            ..Default::default()
        };

        assert!(apply_filter(&mut plan, &["missing".to_string()]).is_err());
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::parse_from(["noodles", "run", "spec.yml", "-v"]);
        assert_eq!(cli.command_type, "run");
        assert_eq!(cli.spec, "spec.yml");
        assert!(cli.verbose);
        assert!(!cli.debug);
    }
}
