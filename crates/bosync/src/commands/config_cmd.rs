//! Config subcommand handlers.

use std::fmt::Write;

use bosync_config::{AccountProfile, Config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, InitArgs};
use crate::commands::{config_path, load_config};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking secrets.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    let d = &cfg.defaults;
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "api_url = \"{}\"", d.api_url);
    let _ = writeln!(out, "token_url = \"{}\"", d.token_url);
    let _ = writeln!(out, "token_scope = \"{}\"", d.token_scope);
    if let Some(ref url) = d.webhook_url {
        let _ = writeln!(out, "webhook_url = \"{url}\"");
    }
    let _ = writeln!(out, "timeout = {}", d.timeout);
    let _ = writeln!(out, "refresh_interval = {}", d.refresh_interval);

    for (name, p) in &cfg.accounts {
        let _ = writeln!(out);
        let _ = writeln!(out, "[accounts.{name}]");
        let _ = writeln!(out, "id = {}", p.id);
        let _ = writeln!(out, "gateway_id = \"{}\"", p.gateway_id);
        let _ = writeln!(out, "client_id = \"{}\"", p.client_id);
        if p.client_secret.is_some() {
            let _ = writeln!(out, "client_secret = \"****\"");
        }
        if let Some(ref env) = p.client_secret_env {
            let _ = writeln!(out, "client_secret_env = \"{env}\"");
        }
        let _ = writeln!(out, "enable = {}", p.enable);
        if !p.project_ids.is_empty() {
            let _ = writeln!(out, "project_ids = {:?}", p.project_ids);
        }
        if let Some(ref url) = p.webhook_url {
            let _ = writeln!(out, "webhook_url = \"{url}\"");
        }
        for (i, group) in p.filter.0.iter().enumerate() {
            let rules: Vec<String> = group
                .iter()
                .map(|r| format!("{} =~ /{}/", r.parameter, r.regex))
                .collect();
            let _ = writeln!(out, "# filter group {}: {}", i + 1, rules.join(" AND "));
        }
    }

    out.trim_end().to_owned()
}

fn profile_from_args(args: &InitArgs) -> AccountProfile {
    AccountProfile {
        id: args.id,
        gateway_id: args.gateway_id.clone(),
        client_id: args.client_id.clone(),
        client_secret: None,
        client_secret_env: args.client_secret_env.clone(),
        enable: true,
        project_ids: args.project_ids.clone(),
        filter: bosync_core::AssetFilter::default(),
        api_url: None,
        token_url: None,
        webhook_url: args.webhook_url.clone(),
        timeout: None,
        refresh_interval: None,
    }
}

// ── Handlers ────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config_path(global).display().to_string());
            Ok(())
        }

        ConfigCommand::Show => {
            let mut cfg = load_config(global)?;
            for profile in cfg.accounts.values_mut() {
                if profile.client_secret.is_some() {
                    profile.client_secret = Some("****".into());
                }
            }
            let out = output::render(global.output, &cfg, format_config_redacted)?;
            output::print_output(&out);
            Ok(())
        }

        ConfigCommand::Init(init) => {
            if init.id <= 0 {
                return Err(CliError::Validation {
                    field: "id".into(),
                    reason: format!("must be positive, got {}", init.id),
                });
            }

            let mut cfg = load_config(global)?;
            if cfg.accounts.contains_key(&init.name) && !init.force {
                return Err(CliError::Conflict {
                    resource_type: "account".into(),
                    identifier: init.name,
                });
            }
            if let Some((other, _)) = cfg
                .accounts
                .iter()
                .find(|(name, p)| p.id == init.id && **name != init.name)
            {
                return Err(CliError::Validation {
                    field: "id".into(),
                    reason: format!("id {} is already used by account '{other}'", init.id),
                });
            }

            cfg.accounts.insert(init.name.clone(), profile_from_args(&init));
            let path = config_path(global);
            bosync_config::save_config_to(&cfg, &path)?;

            output::print_output(&format!(
                "account '{}' written to {}",
                init.name,
                path.display()
            ));
            if init.client_secret_env.is_none() {
                output::print_output(&format!(
                    "store the client secret in the system keyring (service 'bosync', user '{}/client-secret')",
                    init.name
                ));
            }
            Ok(())
        }
    }
}
