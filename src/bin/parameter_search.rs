use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::de::DeserializeOwned;

use timetable_optimization_lib::algorithms::input::{parse_csv, TimetableInput};
use timetable_optimization_lib::algorithms::models::{GwoParameters, OptimizationProgress};
use timetable_optimization_lib::algorithms::optimizer::ProgressReporter;
use timetable_optimization_lib::algorithms::tune::{optimize_by_range, ParamRange, TuningReport};
use timetable_optimization_lib::{run_experiments, ExperimentSummary};

/// Runs repeated GWO experiments on CSV roster data and exports the traces.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Directory holding lecturers.csv, courses.csv, teaching.csv, days.csv,
    /// rooms.csv, periods.csv and (optionally) preferences.csv
    #[arg(default_value = "data")]
    data_dir: PathBuf,

    #[arg(short, long, default_value_t = 30)]
    population: usize,

    #[arg(short, long, default_value_t = 30)]
    iterations: usize,

    /// Number of independent runs
    #[arg(short, long, default_value_t = 10)]
    experiments: usize,

    /// Base seed; run k uses seed + k
    #[arg(long)]
    seed: Option<u64>,

    /// Workbook for the fitness traces
    #[arg(short, long, default_value = "gwo_experiments.xlsx")]
    output: PathBuf,

    /// Best schedule as JSON
    #[arg(long, default_value = "best_schedule.json")]
    schedule_output: PathBuf,

    /// Also run the coordinate parameter search
    #[arg(long)]
    tune: bool,

    #[arg(long, default_value_t = 10)]
    pop_min: usize,
    #[arg(long, default_value_t = 50)]
    pop_max: usize,
    #[arg(long, default_value_t = 10)]
    pop_step: usize,
    #[arg(long, default_value_t = 30)]
    iter_min: usize,
    #[arg(long, default_value_t = 150)]
    iter_max: usize,
    #[arg(long, default_value_t = 30)]
    iter_step: usize,
}

fn read_table<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<Vec<T>> {
    let path = dir.join(name);
    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_csv(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn load_input(dir: &Path) -> Result<TimetableInput> {
    let preferences = if dir.join("preferences.csv").exists() {
        read_table(dir, "preferences.csv")?
    } else {
        warn!("No preferences.csv in {}, running without preferences", dir.display());
        Vec::new()
    };

    Ok(TimetableInput {
        lecturers: read_table(dir, "lecturers.csv")?,
        courses: read_table(dir, "courses.csv")?,
        teaching: read_table(dir, "teaching.csv")?,
        days: read_table(dir, "days.csv")?,
        rooms: read_table(dir, "rooms.csv")?,
        periods: read_table(dir, "periods.csv")?,
        preferences,
    })
}

/// Sheet 1: one row of best-fitness values per experiment.
fn export_fitness_traces(
    workbook: &mut Workbook,
    params: &GwoParameters,
    summary: &ExperimentSummary,
) -> Result<(), XlsxError> {
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Fitness")?;
    let bold = Format::new().set_bold();

    let label = format!("Population {}", params.population_size);
    worksheet.write_with_format(0, 0, label.as_str(), &bold)?;

    let longest = summary
        .fitness_histories
        .iter()
        .map(Vec::len)
        .max()
        .unwrap_or(0);
    worksheet.write_with_format(1, 0, "Experiment", &bold)?;
    for k in 0..longest {
        let header = format!("Iteration {}", k + 1);
        worksheet.write_with_format(1, k as u16 + 1, header.as_str(), &bold)?;
    }

    for (run, history) in summary.fitness_histories.iter().enumerate() {
        let row = run as u32 + 2;
        worksheet.write(row, 0, run as u32 + 1)?;
        for (k, fitness) in history.iter().enumerate() {
            worksheet.write(row, k as u16 + 1, *fitness)?;
        }
    }

    Ok(())
}

/// Sheet 2: every parameter trial, one sub-table per tuned parameter.
fn export_tuning(workbook: &mut Workbook, report: &TuningReport) -> Result<(), XlsxError> {
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Tuning")?;
    let bold = Format::new().set_bold();
    let headers = ["population_size", "max_iterations", "mean_fitness"];

    let mut current_row = 0;
    for (param_name, trials) in &report.experiments {
        let title = format!("=== {} ===", param_name.replace('_', " ").to_uppercase());
        worksheet.write_with_format(current_row, 0, title.as_str(), &bold)?;
        current_row += 1;

        for (col, title) in headers.iter().enumerate() {
            worksheet.write_with_format(current_row, col as u16, *title, &bold)?;
        }
        current_row += 1;

        for (params, fitness) in trials {
            worksheet.write(current_row, 0, params.population_size as u32)?;
            worksheet.write(current_row, 1, params.max_iterations as u32)?;
            worksheet.write(current_row, 2, *fitness)?;
            current_row += 1;
        }

        current_row += 2;
    }

    Ok(())
}

fn spinner() -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
            .template("{spinner:.cyan} {msg}")?,
    );
    pb.set_message("Optimizing timetable...");
    Ok(pb)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    info!("Reading CSV tables from {}", cli.data_dir.display());
    let problem = load_input(&cli.data_dir)?.prepare()?;
    info!(
        "Loaded {} demands on a grid of {} slots",
        problem.demands.len(),
        problem.grid.len()
    );

    let params = GwoParameters {
        population_size: cli.population,
        max_iterations: cli.iterations,
        seed: cli.seed,
        num_runs: Some(cli.experiments),
    };
    params.validate()?;
    let range = ParamRange {
        population_size: (cli.pop_min, cli.pop_max),
        max_iterations: (cli.iter_min, cli.iter_max),
        population_step: cli.pop_step,
        iteration_step: cli.iter_step,
    };

    let stop_flag = Arc::new(AtomicBool::new(false));
    {
        let stop_flag = stop_flag.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing the current generation");
                stop_flag.store(true, Ordering::Relaxed);
            }
        });
    }

    let start_time = Instant::now();
    let pb = spinner()?;
    let worker_pb = pb.clone();
    let worker_params = params.clone();
    let tune = cli.tune;

    let (summary, tuning) = tokio::task::spawn_blocking(move || -> Result<_> {
        let report_progress = |p: &OptimizationProgress| {
            if !p.is_finished {
                worker_pb.set_message(format!(
                    "Run {}/{} - iteration {} - best fitness {:.2}",
                    p.current_run.unwrap_or(1),
                    p.total_runs.unwrap_or(1),
                    p.iteration,
                    p.best_fitness
                ));
            }
        };
        let reporter: &(dyn ProgressReporter + Sync) = &report_progress;

        let summary =
            run_experiments(&problem, &worker_params, stop_flag.clone(), Some(reporter))?;
        let tuning = if tune {
            worker_pb.set_message("Searching parameter ranges...");
            Some(optimize_by_range(
                &problem,
                &range,
                &worker_params,
                stop_flag,
            )?)
        } else {
            None
        };
        Ok((summary, tuning))
    })
    .await??;

    pb.finish_with_message("Optimization finished.");

    let elapsed = start_time.elapsed();
    println!(
        "Total time: {} min {} s",
        elapsed.as_secs() / 60,
        elapsed.as_secs() % 60
    );
    println!("=== Best run ({}) ===", summary.best_run);
    println!("Fitness  : {:.2}", summary.best.best_fitness);
    println!(
        "Coverage : {}/{} demands placed ({:.1}%)",
        summary.best.coverage.placed,
        summary.best.coverage.total,
        summary.best.coverage.ratio() * 100.0
    );
    println!(
        "Mean fitness over {} runs: {:.4}",
        summary.all_best_fitness.len(),
        summary.mean_fitness()
    );
    if let Some(report) = &tuning {
        println!("=== Best parameters ===");
        println!("Population Size : {}", report.best_params.population_size);
        println!("Max Iterations  : {}", report.best_params.max_iterations);
        println!("Mean Fitness    : {:.4}", report.best_fitness);
    }

    let mut workbook = Workbook::new();
    export_fitness_traces(&mut workbook, &params, &summary)?;
    if let Some(report) = &tuning {
        export_tuning(&mut workbook, report)?;
    }
    workbook
        .save(&cli.output)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    info!("Fitness traces written to {}", cli.output.display());

    let file = File::create(&cli.schedule_output)
        .with_context(|| format!("failed to create {}", cli.schedule_output.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &summary.best)?;
    info!("Best schedule written to {}", cli.schedule_output.display());

    Ok(())
}
