//! Chartpipe CLI - serve the chart endpoints or run one-off queries.

mod error;

use chartpipe::codec::{decode_chart_props, encode_chart_props, ChartProps};
use chartpipe::logging::init_logging;
use chartpipe::observation::ReqwestObservationClient;
use chartpipe::query::{QueryMode, QueryOptions, QueryOrchestrator, ReqwestNlClient};
use chartpipe::server::{serve, AppState};
use chartpipe::tile::TileContext;
use clap::{Parser, Subcommand};
use error::CliError;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

const DEFAULT_API_ROOT: &str = "https://datacommons.org";

#[derive(Parser)]
#[command(name = "chartpipe")]
#[command(about = "Resolve data charts and serve the chart endpoints", long_about = None)]
#[command(version = chartpipe::VERSION)]
struct Args {
    /// Root URL of the data API
    #[arg(long, global = true, default_value = DEFAULT_API_ROOT)]
    api_root: String,

    /// API key forwarded in generated chart URLs
    #[arg(long, global = true, default_value = "")]
    api_key: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the /nodejs/chart and /nodejs/query endpoints
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,
    },
    /// Run one query and print the result JSON
    Query {
        /// The natural-language query
        q: String,
        /// Resolve every tile instead of capping the result count
        #[arg(long)]
        all_results: bool,
        /// Consumer identifier for the chart type allow-list
        #[arg(long, default_value = "")]
        client: String,
        /// Query mode: default or strict
        #[arg(long, default_value = "default")]
        mode: String,
    },
    /// Encode chart properties JSON (from stdin) into a chart URL token
    Encode,
    /// Decode a chart URL token and print the properties JSON
    Decode {
        /// The `config` parameter value from a chart URL
        token: String,
    },
}

fn build_state(api_root: &str, api_key: &str) -> Result<AppState, CliError> {
    let api = ReqwestObservationClient::new(api_root)
        .map_err(|e| CliError::ClientCreation(e.to_string()))?;
    let nl = ReqwestNlClient::new(api_root)
        .map_err(|e| CliError::ClientCreation(e.to_string()))?;
    let ctx = TileContext::new(Arc::new(api), api_root, api_key);
    let orchestrator = Arc::new(QueryOrchestrator::new(Arc::new(nl), ctx.clone()));
    Ok(AppState { ctx, orchestrator })
}

async fn run(args: Args) -> Result<(), CliError> {
    match args.command {
        Command::Serve { addr } => {
            let state = build_state(&args.api_root, &args.api_key)?;
            info!(%addr, api_root = %args.api_root, "starting server");
            serve(addr, state).await.map_err(CliError::Serve)
        }
        Command::Query {
            q,
            all_results,
            client,
            mode,
        } => {
            let state = build_state(&args.api_root, &args.api_key)?;
            let opts = QueryOptions {
                all_results,
                client,
                mode: QueryMode::parse(&mode),
            };
            let result = state.orchestrator.run_query(&q, &opts).await;
            let json = serde_json::to_string_pretty(&result)
                .map_err(|e| CliError::Input(e.to_string()))?;
            println!("{}", json);
            Ok(())
        }
        Command::Encode => {
            let mut input = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut input)
                .map_err(|e| CliError::Input(e.to_string()))?;
            let props: ChartProps =
                serde_json::from_str(&input).map_err(|e| CliError::Input(e.to_string()))?;
            let token =
                encode_chart_props(&props).map_err(|e| CliError::Input(e.to_string()))?;
            println!("{}", token);
            Ok(())
        }
        Command::Decode { token } => {
            let props = decode_chart_props(&token)
                .map_err(|e| CliError::InvalidChartLink(e.to_string()))?;
            let json = serde_json::to_string_pretty(&props)
                .map_err(|e| CliError::Input(e.to_string()))?;
            println!("{}", json);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let _guard = init_logging();
    if let Err(err) = run(args).await {
        err.exit();
    }
}
