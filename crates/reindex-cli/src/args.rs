//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use reindex_core::config::{DEFAULT_BULK_REPORT_THRESHOLD, DEFAULT_MAX_DEPTH};
use reindex_core::{CacheMode, ReindexConfig, SessionMode};

use crate::formatter::OutputFormat;

/// Reindex inspection tool
#[derive(Parser, Debug)]
#[command(name = "reindex")]
#[command(version, about = "Inspect and dry-run dependent-object reindexing")]
pub struct Args {
    /// Schema declaration (JSON)
    #[arg(short, long, global = true, default_value = "schema.json")]
    pub schema: PathBuf,

    /// Output format
    #[arg(long, global = true, default_value = "table", value_enum)]
    pub format: OutputFormat,

    /// Walk size at which a summary line is logged
    #[arg(long, default_value_t = DEFAULT_BULK_REPORT_THRESHOLD)]
    pub bulk_threshold: usize,

    /// Maximum walk depth
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// Let walk sessions read through caches
    #[arg(long)]
    pub use_cache: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the dependency graph
    Graph,

    /// Print the dependents queries issued for one entity
    Plan {
        /// Entity type
        #[arg(short = 't', long = "type")]
        entity_type: String,

        /// Entity id
        #[arg(short, long)]
        id: i64,
    },

    /// Walk from one entity against a fixture and report what was indexed
    Walk {
        /// Entity type
        #[arg(short = 't', long = "type")]
        entity_type: String,

        /// Entity id
        #[arg(short, long)]
        id: i64,

        /// Fixture with the stored entities (JSON)
        #[arg(short, long)]
        data: PathBuf,
    },
}

impl Args {
    /// Convert command-line arguments to engine configuration.
    pub fn into_config(self) -> ReindexConfig {
        let mut config = ReindexConfig::new()
            .with_bulk_report_threshold(self.bulk_threshold)
            .with_max_depth(self.max_depth);

        if self.use_cache {
            let mut mode = SessionMode::reindexing();
            mode.cache = CacheMode::Normal;
            config = config.with_session_mode(mode);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reindex_core::FlushMode;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["reindex", "graph"]);
        assert_eq!(args.schema, PathBuf::from("schema.json"));
        assert_eq!(args.format, OutputFormat::Table);

        let config = args.into_config();
        assert_eq!(config.bulk_report_threshold, 10);
        assert_eq!(config.max_depth, 256);
        assert!(config.max_in_flight >= 1);
        assert_eq!(config.session_mode, SessionMode::reindexing());
    }

    #[test]
    fn test_walk_args() {
        let args = Args::parse_from([
            "reindex",
            "--use-cache",
            "walk",
            "--type",
            "Customer",
            "--id",
            "7",
            "--data",
            "rows.json",
            "--format",
            "json",
        ]);
        assert_eq!(args.format, OutputFormat::Json);
        match &args.command {
            Command::Walk {
                entity_type,
                id,
                data,
            } => {
                assert_eq!(entity_type, "Customer");
                assert_eq!(*id, 7);
                assert_eq!(data, &PathBuf::from("rows.json"));
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let config = args.into_config();
        assert_eq!(config.session_mode.flush, FlushMode::Auto);
        assert_eq!(config.session_mode.cache, CacheMode::Normal);
    }

    #[test]
    fn test_no_pool_flags() {
        // Dry runs walk inline, so pool sizing is not configurable here.
        let result = Args::try_parse_from(["reindex", "--max-in-flight", "2", "graph"]);
        assert!(result.is_err());
    }
}
