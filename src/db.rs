// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("com.alphavelocity", "Bulkpay", "bulkpay"));

pub fn db_path(cfg: &Config) -> Result<PathBuf> {
    if let Some(p) = &cfg.db_path {
        return Ok(p.clone());
    }
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("bulkpay.sqlite"))
}

pub fn open_or_init(cfg: &Config) -> Result<Connection> {
    let path = db_path(cfg)?;
    open_at(&path, Duration::from_millis(cfg.busy_timeout_ms))
}

/// Opens a file database in WAL mode so concurrent payments wait on the busy handler.
pub fn open_at(path: &Path, busy_timeout: Duration) -> Result<Connection> {
    let mut conn =
        Connection::open(path).with_context(|| format!("Open DB at {}", path.display()))?;
    conn.busy_timeout(busy_timeout)?;
    let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |r| r.get(0))?;
    init_schema(&mut conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory()?;
    init_schema(&mut conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS centers(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS branches(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        center_id INTEGER NOT NULL,
        FOREIGN KEY(center_id) REFERENCES centers(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS staff(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        full_name TEXT NOT NULL DEFAULT '',
        role TEXT NOT NULL CHECK(role IN ('owner','manager','staff')),
        branch_id INTEGER,
        center_id INTEGER,
        is_superuser INTEGER NOT NULL DEFAULT 0,
        can_manage_bulk_payments INTEGER NOT NULL DEFAULT 0,
        can_view_all_orders INTEGER NOT NULL DEFAULT 0,
        FOREIGN KEY(branch_id) REFERENCES branches(id) ON DELETE SET NULL,
        FOREIGN KEY(center_id) REFERENCES centers(id) ON DELETE SET NULL
    );

    CREATE TABLE IF NOT EXISTS customers(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        phone TEXT NOT NULL DEFAULT '',
        is_agency INTEGER NOT NULL DEFAULT 0,
        telegram_id INTEGER,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS orders(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        customer_id INTEGER NOT NULL,
        branch_id INTEGER,
        assigned_to INTEGER,
        product TEXT NOT NULL DEFAULT '',
        total_price TEXT NOT NULL DEFAULT '0',
        extra_fee TEXT NOT NULL DEFAULT '0',
        extra_fee_description TEXT NOT NULL DEFAULT '',
        received TEXT NOT NULL DEFAULT '0',
        payment_accepted_fully INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'pending',
        payment_received_by INTEGER,
        payment_received_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY(customer_id) REFERENCES customers(id) ON DELETE CASCADE,
        FOREIGN KEY(branch_id) REFERENCES branches(id) ON DELETE SET NULL,
        FOREIGN KEY(assigned_to) REFERENCES staff(id) ON DELETE SET NULL,
        FOREIGN KEY(payment_received_by) REFERENCES staff(id) ON DELETE SET NULL
    );
    CREATE INDEX IF NOT EXISTS idx_orders_customer ON orders(customer_id, created_at);

    CREATE TABLE IF NOT EXISTS bulk_payments(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        customer_id INTEGER NOT NULL,
        amount TEXT NOT NULL,
        payment_method TEXT NOT NULL CHECK(payment_method IN ('cash','bank_transfer','card','other')),
        receipt_note TEXT NOT NULL DEFAULT '',
        processed_by INTEGER,
        branch_id INTEGER,
        orders_count INTEGER NOT NULL DEFAULT 0,
        fully_paid_orders INTEGER NOT NULL DEFAULT 0,
        remaining_debt_after TEXT NOT NULL DEFAULT '0',
        created_at TEXT NOT NULL,
        FOREIGN KEY(customer_id) REFERENCES customers(id) ON DELETE CASCADE,
        FOREIGN KEY(processed_by) REFERENCES staff(id) ON DELETE SET NULL,
        FOREIGN KEY(branch_id) REFERENCES branches(id) ON DELETE SET NULL
    );
    CREATE INDEX IF NOT EXISTS idx_bulk_payments_created ON bulk_payments(created_at);

    CREATE TABLE IF NOT EXISTS payment_order_links(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        bulk_payment_id INTEGER NOT NULL,
        order_id INTEGER NOT NULL,
        amount_applied TEXT NOT NULL,
        previous_received TEXT NOT NULL,
        new_received TEXT NOT NULL,
        fully_paid INTEGER NOT NULL DEFAULT 0,
        UNIQUE(bulk_payment_id, order_id),
        FOREIGN KEY(bulk_payment_id) REFERENCES bulk_payments(id) ON DELETE CASCADE,
        FOREIGN KEY(order_id) REFERENCES orders(id) ON DELETE CASCADE
    );
    "#,
    )?;
    Ok(())
}
