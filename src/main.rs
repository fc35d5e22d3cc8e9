mod answer;
mod check;
mod cli;
mod config;
mod embedding;
mod faq;
mod gemini;
mod index;
mod pipeline;
mod session;
mod translate;

pub const USER_AGENT: &str = concat!("polyglot-faq/", env!("CARGO_PKG_VERSION"));

use clap::Parser;
use cli::Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("polyglot_faq=info".parse()?),
        )
        .init();

    cli::run(Cli::parse())
        .await
        .inspect_err(|e| tracing::error!("{e}"))
}
