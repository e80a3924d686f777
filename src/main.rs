//! snowguard - a metadata-only guardrail for the Snowflake CLI.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use snowguard::catalog::ObjectRef;
use snowguard::cli::{Cli, Command, StaleArgs};
use snowguard::config::{Config, ConfigStore};
use snowguard::error::{GuardError, Result};
use snowguard::executor::{Session, SnowCli};
use snowguard::guardrail::Guardrail;
use snowguard::logging;
use snowguard::repository::{StalenessChecker, SyncOrchestrator};
use snowguard::safety::ExclusionChecker;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    if cli.log_file {
        logging::init_file_logging();
    } else {
        logging::init_stderr_logging();
    }

    match run(cli).await {
        Ok(value) => print_json(&value),
        Err(e) => {
            error!("{}: {}", e.category(), e.message());
            print_json(&e.to_envelope());
            std::process::exit(1);
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("Failed to render output: {e}");
            std::process::exit(1);
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| GuardError::invalid_input(format!("Failed to render response: {e}")))
}

async fn run(cli: Cli) -> Result<Value> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let store = ConfigStore::open(config_path)?;

    let mut config: Config = (*store.current()).clone();
    cli.apply_overrides(&mut config);

    let exclusions = ExclusionChecker::new(&config.exclusions)?;
    let session = Session::from_config(Arc::new(SnowCli::new(&config.cli.binary)), &config.cli);

    match cli.command {
        Command::Query { sql } => {
            let guardrail = Guardrail::new(session, exclusions);
            to_json(&guardrail.execute_query(&sql).await?)
        }
        Command::Classify { sql } => {
            let guardrail = Guardrail::new(session, exclusions);
            to_json(&guardrail.inspect(&sql))
        }
        Command::Describe { name } => {
            let guardrail = Guardrail::new(session, exclusions);
            to_json(&guardrail.describe_object(&name).await?)
        }
        Command::List { object_type, scope } => {
            let guardrail = Guardrail::new(session, exclusions);
            to_json(&guardrail.list_objects(object_type, scope.as_deref()).await?)
        }
        Command::Ddl { object_type, name } => {
            let guardrail = Guardrail::new(session, exclusions);
            to_json(&guardrail.get_ddl(object_type, &name).await?)
        }
        Command::Sync(args) => {
            let options = args.to_options(&config);
            let orchestrator = SyncOrchestrator::new(session, exclusions);
            to_json(&orchestrator.sync(&options).await?)
        }
        Command::Stale(args) => {
            let checker = StalenessChecker::new(session, exclusions);
            run_stale(&checker, &args, &config).await
        }
    }
}

async fn run_stale(checker: &StalenessChecker, args: &StaleArgs, config: &Config) -> Result<Value> {
    let target_dir = args.target_dir(config);
    if args.all {
        return to_json(&checker.check_repository(&target_dir).await?);
    }

    let (Some(object_type), Some(name)) = (args.object_type, args.name.as_deref()) else {
        return Err(GuardError::invalid_input("stale needs TYPE and NAME, or --all"));
    };
    let object = ObjectRef::parse(object_type, name)?;
    let check = match &args.local_path {
        Some(path) => checker.check_staleness(&object, path).await?,
        None => checker.check_in_repository(&object, &target_dir).await?,
    };
    to_json(&check)
}
