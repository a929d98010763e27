// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::StaffRole;
use crate::utils::{id_for_branch, id_for_center, pretty_table};
use anyhow::{Context, Result};
use rusqlite::{Connection, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", _)) => list(conn)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let username = sub.get_one::<String>("username").unwrap().trim();
    let full_name = sub
        .get_one::<String>("name")
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    let role: StaffRole = sub.get_one::<String>("role").unwrap().parse()?;
    let branch_id = match sub.get_one::<String>("branch") {
        Some(b) => Some(id_for_branch(conn, b.trim())?),
        None => None,
    };
    let center_id = match sub.get_one::<String>("center") {
        Some(c) => Some(id_for_center(conn, c.trim())?),
        None => None,
    };
    conn.execute(
        "INSERT INTO staff(username, full_name, role, branch_id, center_id, is_superuser, can_manage_bulk_payments, can_view_all_orders)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
        params![
            username,
            full_name,
            role.as_str(),
            branch_id,
            center_id,
            sub.get_flag("superuser"),
            sub.get_flag("bulk_payments"),
            sub.get_flag("view_all")
        ],
    )
    .with_context(|| format!("Add staff member '{}'", username))?;
    println!("Added {} '{}'", role.as_str(), username);
    Ok(())
}

fn list(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT s.username, s.full_name, s.role, COALESCE(b.name,''), s.is_superuser, s.can_manage_bulk_payments
         FROM staff s LEFT JOIN branches b ON s.branch_id=b.id ORDER BY s.username",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, bool>(4)?,
            r.get::<_, bool>(5)?,
        ))
    })?;
    let yes_no = |b: bool| if b { "yes".to_string() } else { String::new() };
    let mut data = Vec::new();
    for row in rows {
        let (user, name, role, branch, su, bulk) = row?;
        data.push(vec![user, name, role, branch, yes_no(su), yes_no(bulk)]);
    }
    println!(
        "{}",
        pretty_table(
            &["Username", "Name", "Role", "Branch", "Superuser", "Bulk payments"],
            data
        )
    );
    Ok(())
}
