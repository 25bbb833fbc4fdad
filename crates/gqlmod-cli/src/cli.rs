use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gqlmod")]
#[command(about = "gqlmod CLI: inspect and query the composed demo application")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level used when RUST_LOG is not set
    #[arg(short, long, global = true, env = "GQLMOD_LOG", default_value = "warn")]
    pub log_level: String,

    /// Composition config file (TOML, `[composition]` table)
    #[arg(short, long, global = true, env = "GQLMOD_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the merged SDL
    Sdl,
    /// Print the modules in dependency order
    Graph,
    /// Run a GraphQL operation and print the JSON response
    Query(QueryArgs),
}

#[derive(clap::Args)]
pub struct QueryArgs {
    /// GraphQL document, e.g. '{ users { name } }'
    pub query: String,

    /// Request header as name=value (repeatable)
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Variables as a JSON object
    #[arg(long)]
    pub variables: Option<String>,

    /// Operation to run when the document has several
    #[arg(long)]
    pub operation: Option<String>,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("header name is empty in '{raw}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("X-User = 1").unwrap(),
            ("X-User".to_string(), "1".to_string())
        );
        assert_eq!(
            parse_header("authorization=Bearer a=b").unwrap(),
            ("authorization".to_string(), "Bearer a=b".to_string())
        );
        assert!(parse_header("no-separator").is_err());
        assert!(parse_header("=value").is_err());
    }

    #[test]
    fn test_query_command_parses() {
        let cli = Cli::try_parse_from([
            "gqlmod",
            "--log-level",
            "debug",
            "query",
            "{ users { name } }",
            "-H",
            "x-user=1",
            "--header",
            "x-trace=abc",
        ])
        .unwrap();

        assert_eq!(cli.log_level, "debug");
        let Commands::Query(args) = cli.command else {
            panic!("expected query command");
        };
        assert_eq!(args.query, "{ users { name } }");
        assert_eq!(args.headers.len(), 2);
    }
}
