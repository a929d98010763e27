// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::Customer;
use crate::utils::{maybe_print_json, pretty_table, validate_phone};
use anyhow::Result;
use rusqlite::{Connection, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            let phone = match sub.get_one::<String>("phone") {
                Some(p) => validate_phone(p)?,
                None => String::new(),
            };
            let is_agency = sub.get_flag("agency");
            let telegram_id = sub.get_one::<i64>("telegram_id").copied();
            conn.execute(
                "INSERT INTO customers(name, phone, is_agency, telegram_id) VALUES (?1,?2,?3,?4)",
                params![name, phone, is_agency, telegram_id],
            )?;
            println!(
                "Added customer #{} '{}' ({})",
                conn.last_insert_rowid(),
                name,
                if is_agency { "agency" } else { "individual" }
            );
        }
        Some(("list", sub)) => {
            let data = list_customers(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .iter()
                    .map(|c| {
                        vec![
                            c.id.to_string(),
                            c.name.clone(),
                            c.phone.clone(),
                            c.customer_type().to_string(),
                        ]
                    })
                    .collect();
                println!("{}", pretty_table(&["ID", "Name", "Phone", "Type"], rows));
            }
        }
        _ => {}
    }
    Ok(())
}

pub fn list_customers(conn: &Connection) -> Result<Vec<Customer>> {
    let mut stmt =
        conn.prepare("SELECT id, name, phone, is_agency, telegram_id FROM customers ORDER BY name, id")?;
    let rows = stmt.query_map([], |r| {
        Ok(Customer {
            id: r.get(0)?,
            name: r.get(1)?,
            phone: r.get(2)?,
            is_agency: r.get(3)?,
            telegram_id: r.get(4)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
