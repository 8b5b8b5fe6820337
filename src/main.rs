use log::error;
use mcp_github_actions_versions::{cli, config::Config, server, tools::ToolContext};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let matches = cli::build_cli().get_matches();
    let log_level = matches.get_one::<String>("log-level").cloned();

    cli::init_logging(log_level.as_deref());

    if matches.get_flag("version") {
        println!("{} {}", server::SERVER_NAME, env!("CARGO_PKG_VERSION"));
        return;
    }

    if let Err(e) = run().await {
        error!("Fatal error in main(): {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cfg = Config::from_env().map_err(anyhow::Error::msg)?;
    if cfg.token.is_none() {
        log::info!("no GitHub token configured; requests are unauthenticated");
    }
    let ctx = ToolContext::new(cfg)?;
    server::run_stdio_server(ctx).await
}
