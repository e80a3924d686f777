//! Command-line argument parsing for snowguard.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::catalog::ObjectCategory;
use crate::config::Config;
use crate::repository::SyncOptions;

fn parse_category(s: &str) -> Result<ObjectCategory, String> {
    ObjectCategory::parse(s).ok_or_else(|| {
        format!(
            "Unknown object type: {s}. Expected one of: database, schema, table, view, \
             function, procedure, stage, task"
        )
    })
}

/// Metadata-only guardrail in front of the Snowflake CLI.
#[derive(Parser, Debug)]
#[command(name = "snowguard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", global = true, env = "SNOWGUARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Named CLI connection
    #[arg(short = 'c', long, value_name = "NAME", global = true)]
    pub connection: Option<String>,

    /// Warehouse to run statements on
    #[arg(long, value_name = "NAME", global = true)]
    pub warehouse: Option<String>,

    /// Role to assume
    #[arg(long, value_name = "NAME", global = true)]
    pub role: Option<String>,

    /// Per-call timeout in milliseconds
    #[arg(long, value_name = "MS", global = true)]
    pub timeout_ms: Option<u64>,

    /// Write logs to the state directory instead of stderr
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Run a statement through the guardrail; only schema and row count are returned
    Query {
        #[arg(value_name = "SQL")]
        sql: String,
    },

    /// Show how a statement would be classified and which objects it touches
    Classify {
        #[arg(value_name = "SQL")]
        sql: String,
    },

    /// Describe a table's columns
    Describe {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// List objects of one type
    List {
        #[arg(value_name = "TYPE", value_parser = parse_category)]
        object_type: ObjectCategory,

        /// Database or database.schema to list in
        #[arg(long = "in", value_name = "SCOPE")]
        scope: Option<String>,
    },

    /// Print one object's DDL
    Ddl {
        #[arg(value_name = "TYPE", value_parser = parse_category)]
        object_type: ObjectCategory,

        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Mirror DDL into the local repository
    Sync(SyncArgs),

    /// Compare local DDL with the warehouse
    Stale(StaleArgs),
}

#[derive(Args, Debug, PartialEq)]
pub struct SyncArgs {
    /// Repository directory (defaults to the configured one)
    #[arg(long, value_name = "DIR")]
    pub target_dir: Option<PathBuf>,

    /// Only sync this database (repeatable)
    #[arg(long = "database", value_name = "NAME")]
    pub databases: Vec<String>,

    #[arg(long)]
    pub no_tables: bool,

    #[arg(long)]
    pub no_views: bool,

    #[arg(long)]
    pub no_functions: bool,

    #[arg(long)]
    pub no_procedures: bool,

    #[arg(long)]
    pub no_stages: bool,

    #[arg(long)]
    pub no_tasks: bool,

    /// Record failed DDL fetches as errors instead of dropping them
    #[arg(long)]
    pub record_fetch_failures: bool,
}

impl SyncArgs {
    /// Builds sync options, falling back to the configured target directory.
    pub fn to_options(&self, config: &Config) -> SyncOptions {
        let target_dir = self
            .target_dir
            .clone()
            .unwrap_or_else(|| config.repository.target_dir.clone());
        SyncOptions {
            databases: (!self.databases.is_empty()).then(|| self.databases.clone()),
            include_tables: !self.no_tables,
            include_views: !self.no_views,
            include_functions: !self.no_functions,
            include_procedures: !self.no_procedures,
            include_stages: !self.no_stages,
            include_tasks: !self.no_tasks,
            record_fetch_failures: self.record_fetch_failures,
            ..SyncOptions::new(target_dir)
        }
    }
}

#[derive(Args, Debug, PartialEq)]
pub struct StaleArgs {
    #[arg(
        value_name = "TYPE",
        value_parser = parse_category,
        required_unless_present = "all"
    )]
    pub object_type: Option<ObjectCategory>,

    /// Fully-qualified name
    #[arg(value_name = "NAME", required_unless_present = "all")]
    pub name: Option<String>,

    /// Check every synced object in the repository
    #[arg(long, conflicts_with_all = ["object_type", "name", "local_path"])]
    pub all: bool,

    /// Local DDL file (defaults to its place in the repository)
    #[arg(long, value_name = "PATH")]
    pub local_path: Option<PathBuf>,

    /// Repository directory (defaults to the configured one)
    #[arg(long, value_name = "DIR")]
    pub target_dir: Option<PathBuf>,
}

impl StaleArgs {
    pub fn target_dir(&self, config: &Config) -> PathBuf {
        self.target_dir
            .clone()
            .unwrap_or_else(|| config.repository.target_dir.clone())
    }
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Applies command-line selectors over the loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(connection) = &self.connection {
            config.cli.connection = Some(connection.clone());
        }
        if let Some(warehouse) = &self.warehouse {
            config.cli.warehouse = Some(warehouse.clone());
        }
        if let Some(role) = &self.role {
            config.cli.role = Some(role.clone());
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.cli.timeout_ms = timeout_ms;
        }
    }
}
