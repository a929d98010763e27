// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use bulkpay::auth::{AuthorizationPort, StaffAccess, Unrestricted};
use bulkpay::config::Config;
use bulkpay::{cli, commands, db, notify};

fn main() -> Result<()> {
    let cfg = Config::load();
    let filter = EnvFilter::try_new(&cfg.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let mut conn = db::open_or_init(&cfg)?;

    let actor = matches
        .get_one::<String>("as")
        .cloned()
        .or_else(|| cfg.actor.clone());
    let auth: Box<dyn AuthorizationPort> = match actor {
        Some(username) => Box::new(StaffAccess::load(&conn, username.trim())?),
        None => Box::new(Unrestricted),
    };
    let notifier = notify::from_config(&cfg)?;

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", db::db_path(&cfg)?.display());
        }
        Some(("currency", sub)) => commands::currency::handle(&conn, sub)?,
        Some(("branch", sub)) => commands::branches::handle(&conn, sub)?,
        Some(("staff", sub)) => commands::staff::handle(&conn, sub)?,
        Some(("customer", sub)) => commands::customers::handle(&conn, sub)?,
        Some(("order", sub)) => commands::orders::handle(&mut conn, sub, auth.as_ref())?,
        Some(("debtors", sub)) => commands::debtors::handle(&conn, sub, auth.as_ref())?,
        Some(("pay", sub)) => {
            commands::payments::handle(&mut conn, sub, auth.as_ref(), notifier.as_ref())?
        }
        Some(("history", sub)) => commands::history::handle(&conn, sub, auth.as_ref())?,
        Some(("export", sub)) => commands::exporter::handle(&conn, sub, auth.as_ref())?,
        Some(("doctor", _)) => commands::doctor::handle(&conn)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
