use clap::Parser;
use std::path::PathBuf;
use tutor_sched::config::cli::execute;
use tutor_sched::config::toml_config::SessionLedger;
use tutor_sched::domain::ports::Clock;
use tutor_sched::utils::error::ErrorSeverity;
use tutor_sched::utils::{logger, validation::Validate};
use tutor_sched::{CliConfig, SchedulerConfig, SchedulingError, SchedulingService, SystemClock};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting tutor-sched CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 載入並驗證名冊
    let mut config = match SchedulerConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    let state_path = cli
        .state
        .clone()
        .map(PathBuf::from)
        .unwrap_or_else(|| SchedulerConfig::state_path_for(&cli.config));
    match config.apply_ledger(&state_path) {
        Ok(true) => tracing::info!("📂 Loaded sessions from {}", state_path.display()),
        Ok(false) => tracing::debug!("No session state at {}", state_path.display()),
        Err(e) => fail(&e),
    }

    if let Err(e) = config.validate() {
        fail(&e);
    }

    let clock = SystemClock;
    let store = match config.build_store(clock.now()).await {
        Ok(store) => store,
        Err(e) => fail(&e),
    };
    let service = SchedulingService::over_store(&store, clock)
        .with_storage_timeout(config.storage_timeout());

    match execute(&service, &cli.command).await {
        Ok(output) => {
            if cli.command.is_mutating() {
                let ledger = SessionLedger::snapshot(&store).await;
                if let Err(e) = ledger.save(&state_path) {
                    fail(&e);
                }
                tracing::info!(
                    "💾 Saved {} sessions to {}",
                    ledger.sessions.len(),
                    state_path.display()
                );
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => fail(&e),
    }
}

fn fail(e: &SchedulingError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 2,
        ErrorSeverity::Medium => 3,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 4,
    };
    std::process::exit(exit_code);
}
