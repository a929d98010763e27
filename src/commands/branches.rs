// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{id_for_center, pretty_table};
use anyhow::{Context, Result};
use rusqlite::{Connection, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            let center = sub.get_one::<String>("center").unwrap().trim();
            let center_id = id_for_center(conn, center)?;
            conn.execute(
                "INSERT INTO branches(name, center_id) VALUES (?1, ?2)",
                params![name, center_id],
            )
            .with_context(|| format!("Add branch '{}'", name))?;
            println!("Added branch '{}' (center: {})", name, center);
        }
        Some(("list", _)) => {
            let mut stmt = conn.prepare(
                "SELECT b.id, b.name, c.name FROM branches b JOIN centers c ON b.center_id=c.id
                 ORDER BY c.name, b.name",
            )?;
            let rows = stmt.query_map([], |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                ))
            })?;
            let mut data = Vec::new();
            for row in rows {
                let (id, name, center) = row?;
                data.push(vec![id.to_string(), name, center]);
            }
            println!("{}", pretty_table(&["ID", "Branch", "Center"], data));
        }
        _ => {}
    }
    Ok(())
}
