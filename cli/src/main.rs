use clap::Parser;
use harload_cli::commands::{cli, load, validate};
use harload_cli::logging::init_tracing;
use harload_core::api::CliError;

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            e.exit_code()
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, CliError> {
    let args = cli::Args::parse();
    let cfg = harload_core::api::load_default().map_err(|e| CliError::Config(e.to_string()))?;
    init_tracing(&cfg.logging).map_err(CliError::Command)?;

    match args.command {
        cli::Commands::Load(load_args) => load::handle_load(load_args, cfg).await,
        cli::Commands::Validate(validate_args) => validate::handle_validate(validate_args),
    }
}
