use curators_core::Settings;
use curators_runner::config::{DEFAULT_SETTINGS, SETTINGS_ENV};
use curators_runner::{MainConfig, plan, run_pool};
use std::path::PathBuf;
use std::sync::Arc;

fn print_help() {
    eprintln!(
        r#"Curators - curator strategy co-evolution

USAGE:
    curators [RESUME_FOLDER]

ARGUMENTS:
    RESUME_FOLDER       Folder of _<rule>_<copy>.json snapshots to resume from

ENVIRONMENT VARIABLES:
    CURATORS_SETTINGS   Settings file (default: settings.json)
    RUST_LOG            Log level filter (default: info)

EXAMPLES:
    # Fresh runs for every rule set
    curators

    # Continue the strategies of a previous sweep
    curators environments_output
"#
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let mut resume: Option<PathBuf> = None;
    for arg in &args[1..] {
        match arg.as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            flag if flag.starts_with('-') => {
                eprintln!("Unknown argument: {flag}");
                print_help();
                std::process::exit(1);
            }
            folder if resume.is_none() => resume = Some(PathBuf::from(folder)),
            extra => {
                eprintln!("Unexpected argument: {extra}");
                print_help();
                std::process::exit(1);
            }
        }
    }

    let settings_path =
        std::env::var(SETTINGS_ENV).unwrap_or_else(|_| DEFAULT_SETTINGS.to_string());
    log::info!("Loading settings from: {settings_path}");
    let settings = Settings::from_file(&settings_path)?;
    let main = MainConfig::from_settings(&settings)?;

    let jobs = plan(&settings, &main, resume.as_deref())?;
    log::info!("{} jobs on {} threads", jobs.len(), main.threads());

    let reports = run_pool(Arc::new(settings), jobs, main.threads())?;
    let failed = reports.iter().filter(|r| r.result.is_err()).count();
    for report in &reports {
        if let Ok(summary) = &report.result {
            log::info!(
                "{}: {} sessions, {} votes, {:.4} paid out",
                report.job.name(),
                summary.sessions,
                summary.votes,
                summary.paid_out
            );
        }
    }

    if failed > 0 {
        log::error!("{failed} of {} jobs failed", reports.len());
        std::process::exit(1);
    }
    Ok(())
}
