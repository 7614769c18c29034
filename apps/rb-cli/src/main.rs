use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use rb_app::{
    AppError, AppResult, ProcessEngine, RunProgressEvent, RunRequest, RunResponse,
    RunTimingSummary, check_config, load_mapping, render_dataset, run_adapter_with_progress,
    soil_properties,
};
use rb_mapping::MappingRole;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rrbridge")]
#[command(about = "Run a Talsim engine dataset from forecasting shell exports", long_about = None)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check an adapter configuration and the files it names
    Validate {
        /// Path to the adapter YAML file
        config_path: PathBuf,
    },
    /// Convert inputs, run the engine and write the output document
    Run {
        /// Path to the adapter YAML file
        config_path: PathBuf,
    },
    /// Fill the templates of a dataset from a parameter document
    Render {
        dataset_dir: PathBuf,
        dataset_name: String,
        /// Parameter JSON document
        parameters: PathBuf,
    },
    /// Print depth-averaged soil properties of a dataset's soil profiles
    Soil {
        dataset_dir: PathBuf,
        dataset_name: String,
    },
    /// Load a mapping table and print its records
    Mapping {
        table: PathBuf,
        #[arg(long, value_enum)]
        role: RoleArg,
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Validate { .. } => "validate",
            Commands::Run { .. } => "run",
            Commands::Render { .. } => "render",
            Commands::Soil { .. } => "soil",
            Commands::Mapping { .. } => "mapping",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Ingestion,
    Variable,
    Output,
}

impl From<RoleArg> for MappingRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Ingestion => MappingRole::Ingestion,
            RoleArg::Variable => MappingRole::Variable,
            RoleArg::Output => MappingRole::Output,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    tracing::debug!(command = cli.command.name(), "dispatching command");

    let result = match cli.command {
        Commands::Validate { config_path } => cmd_validate(&config_path),
        Commands::Run { config_path } => cmd_run(&config_path),
        Commands::Render {
            dataset_dir,
            dataset_name,
            parameters,
        } => cmd_render(&dataset_dir, &dataset_name, &parameters),
        Commands::Soil {
            dataset_dir,
            dataset_name,
        } => cmd_soil(&dataset_dir, &dataset_name),
        Commands::Mapping { table, role, json } => cmd_mapping(&table, role.into(), json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::EngineExecution { message, .. }) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_validate(config_path: &Path) -> AppResult<()> {
    println!("Validating configuration: {}", config_path.display());
    let config = check_config(config_path)?;
    println!("✓ Configuration is valid");
    println!(
        "  Dataset: {} in {}",
        config.simulation.dataset_name,
        config.simulation.dataset_folder.display()
    );
    match ProcessEngine::new(&config.engine.executable).version() {
        Ok(version) => println!(
            "  Engine: {} (version {version})",
            config.engine.executable.display()
        ),
        Err(err) => println!("  Engine: {} ({err})", config.engine.executable.display()),
    }
    println!("  Input files: {}", config.input.timeseries_files.len());
    if !config.output.result_variables.is_empty() {
        println!(
            "  Result variables: {}",
            config.output.result_variables.join(", ")
        );
    }
    Ok(())
}

fn cmd_run(config_path: &Path) -> AppResult<()> {
    let request = RunRequest { config_path };
    tracing::info!(config = %config_path.display(), "starting adapter run");

    let mut last_emit = Instant::now();
    let mut last_stage = String::new();
    let response = run_adapter_with_progress(
        &request,
        Some(&mut |event| {
            let stage_key = event.stage.label().to_string();
            let emit_now = stage_key != last_stage || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_stage = stage_key;
                last_emit = Instant::now();
            }
        }),
    );
    clear_progress_line();
    let response = response?;

    print_run_summary(&response);
    Ok(())
}

fn cmd_render(dataset_dir: &Path, dataset_name: &str, parameters: &Path) -> AppResult<()> {
    let written = render_dataset(dataset_dir, dataset_name, parameters)?;
    if written.is_empty() {
        println!("No templates found in {}", dataset_dir.display());
    }
    for file in written {
        println!("  wrote {}", file.display());
    }
    Ok(())
}

fn cmd_soil(dataset_dir: &Path, dataset_name: &str) -> AppResult<()> {
    let averages = soil_properties(dataset_dir, dataset_name)?;
    println!("{:<10} {:>10} {:>10} {:>10}", "Soil", "WP", "FK", "GPV");
    for soil in &averages {
        println!(
            "{:<10} {:>10.4} {:>10.4} {:>10.4}",
            soil.soil_id, soil.wilting_point, soil.field_capacity, soil.pore_volume
        );
    }
    Ok(())
}

fn cmd_mapping(path: &Path, role: MappingRole, json: bool) -> AppResult<()> {
    let table = load_mapping(path, role)?;

    if json {
        let text = serde_json::to_string_pretty(table.records())
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;
        println!("{text}");
        return Ok(());
    }

    println!("{} table {} ({} records):", role.label(), table.name(), table.len());
    for record in table.records() {
        let mut line = format!("  {} -> {}", record.key(), record.target_key);
        if !record.scale.is_identity() {
            line.push_str(&format!(
                "  x {} / {} x {}",
                record.scale.area_factor, record.scale.area, record.scale.unit_factor
            ));
        }
        if let Some(unit) = &record.unit {
            line.push_str(&format!("  [{unit}]"));
        }
        println!("{line}");
    }
    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(100));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
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

fn print_run_summary(response: &RunResponse) {
    println!("✓ Run completed: {}", response.output_file.display());
    println!(
        "  Simulation period: {} - {}",
        response.window.start, response.window.end
    );
    println!(
        "  Input series: {} ({} values)",
        response.input_files.len(),
        response.input_points
    );
    if !response.state_files.is_empty() {
        println!("  State files: {}", response.state_files.len());
    }
    println!("  Output series: {}", response.output_series);

    if !response.parameter_errors.is_empty() {
        println!("\nParameters not written:");
        for err in &response.parameter_errors {
            println!("  {err}");
        }
    }
    if let Some(warnings) = &response.engine.warnings {
        println!("\nEngine warnings:\n{}", warnings.trim_end());
    }

    print_timing_summary(&response.timing);
}

fn print_timing_summary(timing: &RunTimingSummary) {
    let total = timing.total_time_s.max(1.0e-12);
    println!("\nTiming summary:");
    for (label, seconds) in &timing.stages {
        println!(
            "  {:<18} {:.3}s ({:.1}%)",
            label,
            seconds,
            100.0 * seconds / total
        );
    }
    println!("  {:<18} {:.3}s", "total", timing.total_time_s);
}
