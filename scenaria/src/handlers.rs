use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use scenaria_core::explore::{
    ANCHOR_SAMPLE_SIZE, DEFAULT_FANOUT, DEFAULT_PATH_DEPTH, DEFAULT_TREE_DEPTH,
    ExploreProgressCallback,
};
use scenaria_core::report::{
    ExplorationMode, ExplorationReport, generate_path_report, generate_tree_report,
};
use scenaria_core::{
    AnchorSample, AnchorSelection, LinkProvider, Orchestrator, ScenarioPath, StopSignal,
};
use scenaria_sources::{SparqlLinkProvider, VectorFormat, WordVectors};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use tracing_subscriber::filter::LevelFilter;

/// Install the fmt subscriber: warnings by default, debug with `--verbose`.
pub fn init_tracing(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Expand `~` and environment variables in a user-supplied path.
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            debug!("Could not expand '{}': {}", path, e);
            PathBuf::from(shellexpand::tilde(path).as_ref())
        }
    }
}

/// Stop signal carrying the optional `--deadline` limit.
pub fn stop_signal_for(deadline_secs: Option<u64>) -> StopSignal {
    match deadline_secs {
        Some(secs) => StopSignal::new().with_deadline(Duration::from_secs(secs)),
        None => StopSignal::new(),
    }
}

/// Numbered list of second-anchor candidates, as shown before prompting.
pub fn format_anchor_sample(sample: &AnchorSample) -> String {
    let mut out = format!("Links of '{}':\n", sample.anchor);
    for (i, candidate) in sample.candidates.iter().enumerate() {
        out.push_str(&format!("  [{:>2}] {}\n", i, candidate));
    }
    out
}

/// Resolve the user's answer to the second-anchor prompt.
pub fn parse_anchor_choice(sample: &AnchorSample, input: &str) -> Result<String> {
    if input.trim().is_empty() {
        bail!("No second keyword given");
    }
    Ok(sample.resolve(&AnchorSelection::parse(input)))
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> Result<String> {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush()?;
    let mut response = String::new();
    io::stdin()
        .read_line(&mut response)
        .context("Failed to read from stdin")?;
    Ok(response.trim().to_string())
}

fn prompt_second_anchor(sample: &AnchorSample) -> Result<String> {
    println!();
    print!("{}", format_anchor_sample(sample));
    println!();
    let input = print_prompt("Pick a number or type a keyword for the second anchor:")?;
    parse_anchor_choice(sample, &input)
}

/// The second anchor: `given` when present, otherwise `pick` chooses from a
/// random sample of the first anchor's links.
pub async fn choose_second_anchor<P, O, F>(
    orchestrator: &Orchestrator<P, O>,
    first: &str,
    given: Option<&String>,
    pick: F,
) -> Result<String>
where
    P: LinkProvider,
    F: FnOnce(&AnchorSample) -> Result<String>,
{
    if let Some(second) = given {
        return Ok(second.clone());
    }
    let sample = orchestrator
        .sample_second_anchors(first, ANCHOR_SAMPLE_SIZE, &mut rand::thread_rng())
        .await?;
    pick(&sample)
}

fn new_spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn spinner_callback(spinner: &ProgressBar) -> ExploreProgressCallback {
    let spinner = spinner.clone();
    Arc::new(move |msg: String| spinner.set_message(msg))
}

/// Set `stop` on Ctrl-C so the run winds down with partial results.
fn install_interrupt_handler(stop: StopSignal) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing current branch");
            stop.stop();
        }
    });
}

fn build_provider(args: &ArgMatches) -> Result<SparqlLinkProvider> {
    let endpoint = args
        .get_one::<String>("endpoint")
        .context("--endpoint is required")?;
    let delay_ms = *args.get_one::<u64>("delay-ms").unwrap_or(&500);
    let timeout = *args.get_one::<u64>("timeout").unwrap_or(&30);

    let provider = SparqlLinkProvider::with_timeout(timeout)
        .context("Failed to build HTTP client")?
        .with_endpoint(endpoint.as_str())?
        .with_min_interval(Duration::from_millis(delay_ms));
    Ok(provider)
}

fn colorize_report(report: &str) -> String {
    report
        .lines()
        .map(|line| {
            if line.starts_with('#') || line.starts_with('━') {
                line.bright_blue().bold().to_string()
            } else if line.starts_with("[Scenario") || line.starts_with("--- Scenario") {
                line.bright_white().bold().to_string()
            } else if line.trim_start().starts_with('(') {
                line.yellow().to_string()
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn write_report<T: Serialize>(report: &ExplorationReport<T>, output: Option<&String>) -> Result<()> {
    if let Some(output) = output {
        let path = expand_path(output);
        report
            .write_json(&path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!(
            "{} Scenarios saved to {}",
            "✓".green().bold(),
            path.display().to_string().bright_white()
        );
    }
    Ok(())
}

fn print_header(title: &str, settings: &[(&str, String)]) {
    print_divider();
    println!("{}", format!("  {}", title).bright_white().bold());
    print_divider();
    for (name, value) in settings {
        println!("{} {}: {}", "→".blue(), name, value.bright_white());
    }
    println!();
}

fn report_interruption(stop: &StopSignal) {
    if stop.is_stopped() {
        println!(
            "{} Exploration stopped early, showing partial results",
            "⚠".yellow().bold()
        );
    }
}

pub async fn handle_path(args: &ArgMatches, quiet: bool) -> Result<()> {
    let first = args
        .get_one::<String>("first")
        .context("--first is required")?
        .clone();
    let max_depth = *args
        .get_one::<usize>("max-depth")
        .unwrap_or(&DEFAULT_PATH_DEPTH);
    let fanout = *args.get_one::<usize>("fanout").unwrap_or(&DEFAULT_FANOUT);

    let stop = stop_signal_for(args.get_one::<u64>("deadline").copied());

    let spinner = new_spinner(quiet);
    let orchestrator = Orchestrator::new(build_provider(args)?)
        .with_fanout(fanout)
        .with_stop_signal(stop.clone())
        .with_progress_callback(spinner_callback(&spinner));

    spinner.set_message(format!("Sampling links of '{}'", first));
    let second = choose_second_anchor(
        &orchestrator,
        &first,
        args.get_one::<String>("second"),
        |sample| spinner.suspend(|| prompt_second_anchor(sample)),
    )
    .await?;

    // registered only now so Ctrl-C at the prompt still ends the process
    install_interrupt_handler(stop.clone());

    if !quiet {
        spinner.suspend(|| {
            print_header(
                "SCENARIO PATHS",
                &[
                    ("Anchors", format!("{} → {}", first, second)),
                    ("Max depth", max_depth.to_string()),
                    ("Fanout", fanout.to_string()),
                ],
            )
        });
    }

    let runs = orchestrator
        .build_scenario_paths(&first, &second, max_depth)
        .await?;
    spinner.finish_and_clear();
    report_interruption(&stop);

    if runs.is_empty() {
        println!(
            "{} No links shared by '{}' and '{}'",
            "✗".red().bold(),
            first,
            second
        );
        return Ok(());
    }

    println!("{}", colorize_report(&generate_path_report(&runs)));

    let scenarios: Vec<ScenarioPath> = runs.into_iter().map(|run| run.steps).collect();
    let report = ExplorationReport::new(
        ExplorationMode::Path,
        vec![first, second],
        max_depth,
        scenarios,
    );
    write_report(&report, args.get_one::<String>("output"))
}

pub async fn handle_tree(args: &ArgMatches, quiet: bool) -> Result<()> {
    let start = args
        .get_one::<String>("start")
        .context("--start is required")?
        .clone();
    let model = expand_path(args.get_one::<String>("model").context("--model is required")?);
    let format = if args.get_flag("text-model") {
        VectorFormat::Text
    } else {
        VectorFormat::Binary
    };
    let max_depth = *args
        .get_one::<usize>("max-depth")
        .unwrap_or(&DEFAULT_TREE_DEPTH);
    let fanout = *args.get_one::<usize>("fanout").unwrap_or(&DEFAULT_FANOUT);

    let stop = stop_signal_for(args.get_one::<u64>("deadline").copied());
    install_interrupt_handler(stop.clone());
    let provider = build_provider(args)?;

    if !quiet {
        print_header(
            "SCENARIO TREES",
            &[
                ("Start", start.clone()),
                ("Model", model.display().to_string()),
                ("Max depth", max_depth.to_string()),
                ("Fanout", fanout.to_string()),
            ],
        );
    }

    let spinner = new_spinner(quiet);
    spinner.set_message(format!("Loading word vectors from {}", model.display()));
    let model_path = model.clone();
    let vectors = tokio::task::spawn_blocking(move || WordVectors::load(&model_path, format))
        .await?
        .with_context(|| format!("Failed to load model {}", model.display()))?;

    let orchestrator = Orchestrator::new(provider)
        .with_oracle(vectors)
        .with_stop_signal(stop.clone())
        .with_progress_callback(spinner_callback(&spinner));

    let runs = orchestrator
        .build_scenario_trees(&start, max_depth, fanout)
        .await?;
    spinner.finish_and_clear();
    report_interruption(&stop);

    if runs.is_empty() {
        println!(
            "{} No links of '{}' are known to the model",
            "✗".red().bold(),
            start
        );
        return Ok(());
    }

    println!("{}", colorize_report(&generate_tree_report(&runs)));

    let trees = runs.into_iter().map(|run| run.tree).collect();
    let report = ExplorationReport::new(ExplorationMode::Tree, vec![start], max_depth, trees);
    write_report(&report, args.get_one::<String>("output"))
}
