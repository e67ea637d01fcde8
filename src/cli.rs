//! Command-line interface for the provider.

use clap::{Parser, Subcommand};

use crate::catalog::{CatalogAdapter, DataCiteAdapter, PostgresAdapter};
use crate::config::{Backend, Config};
use crate::error::Result;
use crate::provider::{OaiProvider, OaiRequest};

/// OAI-PMH provider for DOI and institutional-repository catalogs.
#[derive(Parser)]
#[command(name = "oai-provider")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve a single OAI-PMH request and print the response XML.
    Request {
        /// Protocol verb (e.g., Identify, ListRecords)
        verb: String,

        /// identifier argument
        #[arg(long)]
        identifier: Option<String>,

        /// metadataPrefix argument
        #[arg(long)]
        metadata_prefix: Option<String>,

        /// set argument
        #[arg(long)]
        set: Option<String>,

        /// from argument (YYYY-MM-DD or YYYY-MM-DDThh:mm:ssZ)
        #[arg(long)]
        from: Option<String>,

        /// until argument (YYYY-MM-DD or YYYY-MM-DDThh:mm:ssZ)
        #[arg(long)]
        until: Option<String>,

        /// resumptionToken argument from a previous response
        #[arg(long)]
        resumption_token: Option<String>,
    },
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Request {
            verb,
            identifier,
            metadata_prefix,
            set,
            from,
            until,
            resumption_token,
        } => {
            let request = OaiRequest {
                verb: Some(verb),
                identifier,
                metadata_prefix,
                set,
                from,
                until,
                resumption_token,
            };
            request_command(&request)
        }
    }
}

/// Execute one protocol request against the configured backend.
fn request_command(request: &OaiRequest) -> Result<()> {
    let config = Config::from_env()?;

    let adapter: Box<dyn CatalogAdapter> = match config.backend {
        Backend::DataCite => Box::new(DataCiteAdapter::new(&config)?),
        Backend::Postgres => Box::new(PostgresAdapter::new(&config)?),
    };

    let provider = OaiProvider::new(config, adapter);
    let response = provider.handle(request)?;
    println!("{response}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_request() {
        let cli = Cli::parse_from(["oai-provider", "request", "Identify"]);

        let Commands::Request { verb, identifier, .. } = cli.command;
        assert_eq!(verb, "Identify");
        assert!(identifier.is_none());
    }

    #[test]
    fn test_cli_parse_request_with_arguments() {
        let cli = Cli::parse_from([
            "oai-provider",
            "request",
            "ListRecords",
            "--metadata-prefix",
            "oai_dc",
            "--set",
            "BL.CCSD",
            "--from",
            "2020-01-01",
        ]);

        let Commands::Request {
            verb,
            metadata_prefix,
            set,
            from,
            ..
        } = cli.command;
        assert_eq!(verb, "ListRecords");
        assert_eq!(metadata_prefix, Some("oai_dc".to_string()));
        assert_eq!(set, Some("BL.CCSD".to_string()));
        assert_eq!(from, Some("2020-01-01".to_string()));
    }
}
