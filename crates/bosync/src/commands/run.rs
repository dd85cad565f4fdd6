//! Long-running scheduler.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::GlobalOpts;
use crate::commands::build_engine;
use crate::error::CliError;

/// Synchronize every account on its refresh interval until Ctrl-C.
pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let (engine, accounts) = build_engine(global)?;
    info!(accounts = accounts.len(), "starting scheduler");

    let cancel = CancellationToken::new();
    let scheduler = {
        let engine = engine.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { engine.run(cancel).await })
    };

    tokio::signal::ctrl_c().await?;
    info!("interrupt received, stopping scheduler");
    cancel.cancel();

    if let Err(e) = scheduler.await {
        warn!(error = %e, "scheduler task ended abnormally");
    }
    Ok(())
}
