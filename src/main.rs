mod cli;

use clap::Parser as _;
use cli::Cli;
use cli::Commands;
use colored::Colorize as _;
use cvs_fast_export_rs::config::ExportConfig;
use cvs_fast_export_rs::driver::Driver;
use cvs_fast_export_rs::driver::DriverOptions;
use cvs_fast_export_rs::driver::ExportInput;
use cvs_fast_export_rs::log;
use cvs_fast_export_rs::scene;
use std::io::Write as _;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Cli::parse();
    log::init(log::level_from_verbosity(
        args.log_level.verbose,
        args.log_level.quiet,
    ));

    let result = match &args.command {
        Commands::Export(export_args) => run_export(export_args),
        Commands::Authors(authors_args) => run_authors(authors_args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run_export(args: &cli::ExportArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ExportConfig::load(path)?,
        None => ExportConfig::default(),
    };
    if args.canonical {
        config.report_mode = cvs_fast_export_rs::config::ReportMode::Canonical;
    }
    config.compress_blobs |= args.compress_blobs;
    if !args.timezone.is_empty() {
        config.timezone = args.timezone.clone();
    }
    if args.output.is_some() {
        config.output = args.output.clone();
    }
    if !args.branch_prefix.is_empty() {
        config.branch_prefix = args.branch_prefix.clone();
    }
    config.force_dates |= args.force_dates;
    if let Some(window) = args.commit_time_window {
        config.commit_time_window = window;
    }
    config.reposurgeon |= args.reposurgeon;
    config.embed_ids |= args.embed_ids;
    if args.revision_map.is_some() {
        config.revision_map = args.revision_map.clone();
    }
    if let Some(fromtime) = args.fromtime {
        config.fromtime = fromtime;
    }
    config.validate_timezone()?;

    let scene = scene::load_scene(&args.scene)?;
    let input = ExportInput {
        branches: scene.branches,
        tags: scene.tags,
        timezone: config.timezone.clone(),
    };

    // The real CVS master-file sizes that `adaptive` mode weighs are supplied
    // by the (out-of-scope) RCS reader; a scene file carries none, so
    // adaptive always behaves as if the history is small enough for
    // canonical mode here.
    let canonical = config.resolve_canonical(0);
    let options = DriverOptions {
        timezone: config.timezone.clone(),
        branch_prefix: config.branch_prefix.clone(),
        force_dates: config.force_dates,
        commit_time_window: config.commit_time_window,
        reposurgeon: config.reposurgeon,
        embed_ids: config.embed_ids,
        revision_map: config.revision_map.clone(),
        fromtime: config.fromtime,
        compress_blobs: config.compress_blobs,
    };

    let stats = match &config.output {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            let mut driver = Driver::new(std::io::BufWriter::new(file), options)?;
            dispatch(&mut driver, &input, canonical)?;
            driver.into_stats()
        }
        None => {
            let stdout = std::io::stdout();
            let mut driver = Driver::new(stdout.lock(), options)?;
            dispatch(&mut driver, &input, canonical)?;
            driver.into_stats()
        }
    };

    tracing::info!("{}", stats.to_string().green());
    Ok(())
}

fn dispatch<W: std::io::Write>(
    driver: &mut Driver<W>,
    input: &ExportInput,
    canonical: bool,
) -> anyhow::Result<()> {
    if canonical {
        driver.run_canonical(input)?;
    } else {
        driver.run_fast(input)?;
    }
    Ok(())
}

fn run_authors(args: &cli::AuthorsArgs) -> anyhow::Result<()> {
    let scene = scene::load_scene(&args.scene)?;
    let authors = cvs_fast_export_rs::driver::list_authors(&scene.branches);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for author in authors {
        writeln!(out, "{author}")?;
    }
    Ok(())
}
