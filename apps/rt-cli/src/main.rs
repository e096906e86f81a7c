use clap::{Parser, Subcommand};
use rt_app::{
    AppError, AppResult, RunOptions, RunProgressEvent, RunRequest, RunStage, project_service,
    query, run_service,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "rotortune")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Rotor speed tuning for pressure-rise targets", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a case file
    Validate {
        /// Path to the case YAML or JSON file
        case_path: PathBuf,
    },
    /// Run the control loop for a case
    Run {
        /// Path to the case YAML or JSON file
        case_path: PathBuf,
        /// Skip cache and force re-run
        #[arg(long)]
        no_cache: bool,
    },
    /// List cached runs for a case
    Runs {
        /// Path to the case YAML or JSON file
        case_path: PathBuf,
    },
    /// Show details of a cached run
    ShowRun {
        /// Path to the case YAML or JSON file
        case_path: PathBuf,
        /// Run ID to display
        run_id: String,
    },
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::InvalidInput(format!("Failed to install logger: {}", e)))?;

    match cli.command {
        Commands::Validate { case_path } => cmd_validate(&case_path),
        Commands::Run {
            case_path,
            no_cache,
        } => cmd_run(&case_path, !no_cache),
        Commands::Runs { case_path } => cmd_runs(&case_path),
        Commands::ShowRun { case_path, run_id } => cmd_show_run(&case_path, &run_id),
    }
}

fn cmd_validate(case_path: &Path) -> AppResult<()> {
    println!("Validating case: {}", case_path.display());
    let case = project_service::load_case(case_path)?;
    project_service::validate_case(&case)?;
    println!("✓ Case is valid");

    let summary = project_service::summarize_case(&case);
    println!("  Name: {}", summary.name);
    println!("  Target: {:.2} Pa", summary.target_pa);
    println!("  Step cap: {}", summary.max_steps);
    println!("  Residual flags: {}", summary.residual_flags);
    if !summary.has_plant {
        println!("  No plant section; dry runs use the default surrogate");
    }
    Ok(())
}

fn cmd_run(case_path: &Path, use_cache: bool) -> AppResult<()> {
    println!("Running case: {}", case_path.display());

    let request = RunRequest {
        case_path,
        options: RunOptions {
            use_cache,
            ..RunOptions::default()
        },
    };

    let mut last_emit = Instant::now();
    let mut last_stage: Option<RunStage> = None;
    let response = run_service::ensure_run_with_progress(
        &request,
        Some(&mut |event| {
            let emit_now =
                last_stage != Some(event.stage) || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_stage = Some(event.stage);
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    if response.loaded_from_cache {
        println!("✓ Loaded from cache: {}", response.run_id);
    } else {
        println!("✓ Run completed: {}", response.run_id);
    }
    println!("  Elapsed: {:.3}s", response.elapsed_wall_s);

    let case = project_service::load_case(case_path)?;
    print_summary(&query::run_summary(&response.manifest, &case));
    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    match (&event.stage, &event.control) {
        (RunStage::Controlling, Some(c)) => {
            let width = 28usize;
            let fraction = if c.max_steps > 0 {
                (c.solver_iteration as f64 / c.max_steps as f64).min(1.0)
            } else {
                0.0
            };
            let filled = ((fraction * width as f64).round() as usize).min(width);
            let bar = format!(
                "{}{}",
                "#".repeat(filled),
                "-".repeat(width.saturating_sub(filled))
            );
            let mut line = format!(
                "\r[{}] iter={}/{}  decisions={}",
                bar, c.solver_iteration, c.max_steps, c.control_iterations
            );
            if let Some(w) = c.actuation_rad_s {
                line.push_str(&format!("  omega={:.3} rad/s", w));
            }
            if let Some(dp) = c.output_pa {
                line.push_str(&format!("  dp={:.1}/{:.1} Pa", dp, c.target_pa));
            }
            line.push_str(&format!("  elapsed={:.1}s", event.elapsed_wall_s));
            print!("{}", line);
            let _ = io::stdout().flush();
        }
        _ => {
            let spinner = ['|', '/', '-', '\\'];
            let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
            let mut line = format!(
                "\r{} {}  elapsed={:.2}s",
                spinner[spin_idx],
                event.stage.label(),
                event.elapsed_wall_s
            );
            if let Some(msg) = &event.message {
                line.push_str(&format!("  {}", msg));
            }
            print!("{}", line);
            let _ = io::stdout().flush();
        }
    }
}

fn print_summary(summary: &query::RunSummary) {
    if summary.provisional {
        println!("  Termination: {} (provisional)", summary.termination);
    } else {
        println!("  Termination: {}", summary.termination);
    }
    println!(
        "  Decisions: {}  Solver iterations: {}",
        summary.control_iterations, summary.total_iterations
    );
    println!(
        "  Rotation: {:.3} rad/s ({:.1} rpm)",
        summary.rotation_rad_s, summary.rotation_rpm
    );
    println!(
        "  Pressure rise: {:.2} Pa ({:+.2} Pa from target)",
        summary.pressure_rise_pa, summary.target_error_pa
    );
    println!("  Head: {:.4} m", summary.head_m);
    if let Some(ns) = summary.specific_speed {
        println!("  Specific speed: {:.4}", ns);
    }
    if let Some(ds) = summary.specific_diameter {
        println!("  Specific diameter: {:.4}", ds);
    }
    match summary.efficiency {
        Some(eta) => println!("  Hydraulic efficiency: {:.1}%", eta * 100.0),
        None => println!("  Hydraulic efficiency: n/a (torque not recorded)"),
    }
}

fn cmd_runs(case_path: &Path) -> AppResult<()> {
    let runs = run_service::list_runs(case_path)?;

    if runs.is_empty() {
        println!("No cached runs found for case: {}", case_path.display());
    } else {
        println!("Cached runs for case '{}':", runs[0].case_name);
        for manifest in runs {
            let flag = if manifest.is_provisional() {
                "  (provisional)"
            } else {
                ""
            };
            println!("  {} ({}){}", manifest.run_id, manifest.timestamp, flag);
        }
    }

    Ok(())
}

fn cmd_show_run(case_path: &Path, run_id: &str) -> AppResult<()> {
    println!("Loading run: {}", run_id);

    let case = project_service::load_case(case_path)?;
    let (manifest, records) = run_service::load_run(case_path, run_id)?;

    println!("\nRun Summary:");
    println!("  Case: {}", manifest.case_name);
    println!("  Timestamp: {}", manifest.timestamp);
    println!("  Solver: {}", manifest.solver_version);
    print_summary(&query::run_summary(&manifest, &case));

    println!("\nIterations:");
    println!(
        "  {:>4} {:>8} {:>10} {:>12} {:>12} {:>6}",
        "#", "iter", "regime", "omega", "dp", "ok"
    );
    for r in &records {
        let ok = match (r.within_target, r.residuals_ok) {
            (true, true) => "yes",
            (true, false) => "res",
            (false, true) => "dp",
            (false, false) => "no",
        };
        println!(
            "  {:>4} {:>8} {:>10} {:>12.4} {:>12.2} {:>6}",
            r.index, r.solver_iteration, r.regime, r.actuation_after_rad_s, r.output_after_pa, ok
        );
    }

    Ok(())
}
