//! One-shot synchronization.

use serde::Serialize;
use tracing::error;

use bosync_core::{AccountId, SyncOutcome};

use crate::cli::{GlobalOpts, SyncArgs};
use crate::commands::build_engine;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct AccountResult {
    account: AccountId,
    #[serde(flatten)]
    outcome: SyncOutcome,
}

pub async fn handle(args: &SyncArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (engine, accounts) = build_engine(global)?;

    let targets = match args.account {
        Some(raw) => {
            let id = AccountId(raw);
            if !accounts.contains(&id) {
                return Err(CliError::NotFound {
                    resource_type: "account".into(),
                    identifier: id.to_string(),
                    list_command: "config show".into(),
                });
            }
            vec![id]
        }
        None => accounts,
    };

    let mut results = Vec::with_capacity(targets.len());
    let mut first_error = None;
    for id in targets {
        let outcome = if args.subscribe {
            engine.run_cycle(id).await
        } else {
            engine.sync_account(id).await
        };
        match outcome {
            Ok(outcome) => results.push(AccountResult {
                account: id,
                outcome,
            }),
            Err(e) => {
                error!(account = %id, error = %e, "synchronization failed");
                first_error.get_or_insert(e);
            }
        }
    }

    let out = output::render(global.output, &results, |results| {
        let mut lines: Vec<String> = results
            .iter()
            .map(|r| format!("account {}: {}", r.account, describe(&r.outcome)))
            .collect();
        let platform = engine.platform();
        lines.push(format!(
            "dry run: {} asset types, {} assets recorded",
            platform.asset_type_count(),
            platform.asset_count()
        ));
        lines.join("\n")
    })?;
    output::print_output(&out);

    match first_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn describe(outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::Disabled => "disabled".into(),
        SyncOutcome::AlreadyRunning => "already running".into(),
        SyncOutcome::UpToDate { version } => format!("up to date (version {version})"),
        SyncOutcome::Synced(s) => format!(
            "synced version {}: {} asset types, {} nodes ({} created), {} datapoints, {} warnings",
            s.version, s.asset_types, s.nodes, s.assets_created, s.datapoints, s.warnings
        ),
    }
}
