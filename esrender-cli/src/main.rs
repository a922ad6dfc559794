mod cli;

use clap::Parser;
use cli::Cli;
use esrender_core::{ensure_available, render_tree, CoreError, CoreResult, RenderParameters};
use owo_colors::OwoColorize;
use std::process::exit;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Cli::parse();

    if let Err(e) = ctrlc::set_handler(esrender_core::request_interrupt) {
        log::warn!("cannot install the interrupt handler: {e}");
    }

    match run(args) {
        Ok(()) => {}
        Err(CoreError::Interrupted) => {
            eprintln!("{} interrupted", "error:".red().bold());
            exit(130);
        }
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            exit(1);
        }
    }
}

fn run(args: Cli) -> CoreResult<()> {
    let params = args.into_parameters()?;
    preflight(&params)?;
    if params.input.is_dir() {
        run_batch(&params)
    } else {
        run_single(&params)
    }
}

/// Probes every tool the requested render will invoke, so a missing
/// executable is reported before any artifact is touched.
fn preflight(params: &RenderParameters) -> CoreResult<()> {
    ensure_available(&params.tools.ffmpeg, "-version")?;
    if params.wants_video() {
        ensure_available(&params.tools.size, "--help")?;
        ensure_available(&params.tools.es_to_frames, "--help")?;
    }
    if params.wants_audio() {
        ensure_available(&params.tools.synth, "--help")?;
    }
    Ok(())
}

fn run_single(params: &RenderParameters) -> CoreResult<()> {
    let outcome = esrender_core::render_file(params)?;
    let elapsed = outcome.elapsed.as_secs_f64();
    if outcome.frames > 0 {
        println!(
            "{} {} ({} frames in {elapsed:.1} s)",
            "rendered".green().bold(),
            outcome.plan.primary().display(),
            outcome.frames,
        );
    } else {
        println!(
            "{} {} ({elapsed:.1} s)",
            "rendered".green().bold(),
            outcome.plan.primary().display(),
        );
    }
    Ok(())
}

fn run_batch(params: &RenderParameters) -> CoreResult<()> {
    let report = render_tree(params, &params.input, params.output_dir.as_deref())?;
    for (path, error) in &report.failures {
        eprintln!("{} {}: {error}", "failed".red().bold(), path.display());
    }
    println!(
        "{} {}/{} file(s) rendered",
        "done".green().bold(),
        report.succeeded,
        report.attempted,
    );
    if report.all_ok() {
        return Ok(());
    }
    if matches!(report.failures.last(), Some((_, CoreError::Interrupted))) {
        return Err(CoreError::Interrupted);
    }
    Err(CoreError::Other(format!(
        "{} of {} renders failed",
        report.failures.len(),
        report.attempted,
    )))
}
