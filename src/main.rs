use clap::Parser;
use ollama_mcp_client::Cli;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.server.is_none() {
        eprintln!("{}", ollama_mcp_client::usage());
        return ExitCode::FAILURE;
    }

    match ollama_mcp_client::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
