use clap::Parser;
use tracing::{debug, error, warn};

use livectl::config::Config;

#[derive(Parser)]
#[command(version)]
struct Args {
    /// Set config file path
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg = Config::parse(args.config)?;

    utils::set_log(utils::log_directive(&cfg.log.level));

    warn!("set log level : {}", cfg.log.level);
    debug!("config : {:?}", cfg);

    let listener = match tokio::net::TcpListener::bind(cfg.http.listen).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("bind {} error: {}", cfg.http.listen, e);
            return Err(e.into());
        }
    };

    livectl::serve(cfg, listener, livectl::utils::shutdown_signal()).await;
    Ok(())
}
