mod cli;
mod config;
mod demo;
mod observability;
mod output;

use anyhow::{Context, Result, bail};
use async_graphql::{Request, Variables};
use clap::Parser;
use gqlmod_core::{APP_MODULE_NAME, Application, ModuleRequest};
use tracing::debug;

use crate::cli::{Cli, Commands, QueryArgs};
use crate::output::{print_error, print_json, print_module};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    observability::init_tracing_with_level(&cli.log_level);

    let config = config::load(cli.config.as_deref())?;
    let app = demo::application(config);

    match cli.command {
        Commands::Sdl => {
            print!("{}", app.type_defs()?);
        }
        Commands::Graph => {
            let graph = app.graph()?;
            let modules = graph
                .modules()
                .iter()
                .filter(|module| module.name() != APP_MODULE_NAME);
            for (index, module) in modules.enumerate() {
                let imports: Vec<String> = module
                    .imports()
                    .iter()
                    .map(|import| import.name().to_string())
                    .collect();
                print_module(index + 1, module.name(), &imports);
            }
        }
        Commands::Query(args) => query(&app, args).await?,
    }

    Ok(())
}

async fn query(app: &Application, args: QueryArgs) -> Result<()> {
    let mut request = ModuleRequest::new();
    for (name, value) in &args.headers {
        request = request.with_header(name, value.clone());
    }
    debug!(request_id = %request.request_id, headers = args.headers.len(), "Running query");

    let mut operation = Request::new(args.query);
    if let Some(raw) = &args.variables {
        let variables: serde_json::Value =
            serde_json::from_str(raw).context("--variables is not valid JSON")?;
        if !variables.is_object() {
            bail!("--variables must be a JSON object");
        }
        operation = operation.variables(Variables::from_json(variables));
    }
    if let Some(name) = args.operation {
        operation = operation.operation_name(name);
    }

    let response = app.execute(request, operation).await;
    let failed = response.is_err();
    print_json(&serde_json::to_value(&response)?)?;

    if failed {
        bail!("query returned errors");
    }
    Ok(())
}
