// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON object per line"),
    )
}

fn customer_arg() -> Arg {
    Arg::new("customer")
        .long("customer")
        .required(true)
        .value_parser(value_parser!(i64))
        .help("Customer id")
}

fn order_id_arg() -> Arg {
    Arg::new("id")
        .long("id")
        .required(true)
        .value_parser(value_parser!(i64))
        .help("Order id")
}

fn period_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("period")
            .long("period")
            .default_value("month")
            .help("all|today|week|month|year|custom"),
    )
    .arg(Arg::new("from").long("from").help("Custom period start (YYYY-MM-DD)"))
    .arg(Arg::new("to").long("to").help("Custom period end (YYYY-MM-DD)"))
    .arg(
        Arg::new("customer")
            .long("customer")
            .value_parser(value_parser!(i64))
            .help("Only payments from this customer"),
    )
    .arg(
        Arg::new("method")
            .long("method")
            .help("cash|bank_transfer|card|other"),
    )
    .arg(Arg::new("type").long("type").help("agency|individual"))
}

pub fn build_cli() -> Command {
    Command::new("bulkpay")
        .about("FIFO bulk-payment settlement of customer order debts")
        .version(clap::crate_version!())
        .arg(
            Arg::new("as")
                .long("as")
                .global(true)
                .value_name("USERNAME")
                .help("Staff member performing the command"),
        )
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(
            Command::new("currency")
                .about("Display currency")
                .subcommand(
                    Command::new("set").arg(Arg::new("currency").required(true).help("e.g. UZS")),
                )
                .subcommand(Command::new("show")),
        )
        .subcommand(
            Command::new("branch")
                .about("Branches and their translation centers")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("center").long("center").required(true)),
                )
                .subcommand(Command::new("list")),
        )
        .subcommand(
            Command::new("staff")
                .about("Staff members and their permissions")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("username").long("username").required(true))
                        .arg(Arg::new("name").long("name"))
                        .arg(
                            Arg::new("role")
                                .long("role")
                                .default_value("staff")
                                .help("owner|manager|staff"),
                        )
                        .arg(Arg::new("branch").long("branch").help("Branch name"))
                        .arg(Arg::new("center").long("center").help("Center name (owners)"))
                        .arg(
                            Arg::new("superuser")
                                .long("superuser")
                                .action(ArgAction::SetTrue),
                        )
                        .arg(
                            Arg::new("bulk_payments")
                                .long("bulk-payments")
                                .action(ArgAction::SetTrue)
                                .help("Allow managing bulk payments"),
                        )
                        .arg(
                            Arg::new("view_all")
                                .long("view-all")
                                .action(ArgAction::SetTrue)
                                .help("See every order of the branch"),
                        ),
                )
                .subcommand(Command::new("list")),
        )
        .subcommand(
            Command::new("customer")
                .about("Customers")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("phone").long("phone"))
                        .arg(Arg::new("agency").long("agency").action(ArgAction::SetTrue))
                        .arg(
                            Arg::new("telegram_id")
                                .long("telegram-id")
                                .value_parser(value_parser!(i64)),
                        ),
                )
                .subcommand(json_flags(Command::new("list"))),
        )
        .subcommand(
            Command::new("order")
                .about("Orders and single-order payment operations")
                .subcommand(
                    Command::new("add")
                        .arg(customer_arg())
                        .arg(Arg::new("price").long("price").required(true))
                        .arg(Arg::new("fee").long("fee"))
                        .arg(Arg::new("received").long("received"))
                        .arg(Arg::new("product").long("product"))
                        .arg(Arg::new("branch").long("branch").help("Branch name"))
                        .arg(
                            Arg::new("assigned_to")
                                .long("assigned-to")
                                .help("Staff username"),
                        )
                        .arg(Arg::new("status").long("status").default_value("pending"))
                        .arg(
                            Arg::new("created")
                                .long("created")
                                .help("YYYY-MM-DD[ HH:MM[:SS]], defaults to now"),
                        ),
                )
                .subcommand(json_flags(
                    Command::new("list").arg(customer_arg()).arg(
                        Arg::new("all")
                            .long("all")
                            .action(ArgAction::SetTrue)
                            .help("Include cancelled orders"),
                    ),
                ))
                .subcommand(
                    Command::new("pay")
                        .about("Record money received for one order")
                        .arg(order_id_arg())
                        .arg(Arg::new("amount").long("amount").required(true)),
                )
                .subcommand(
                    Command::new("fee")
                        .arg(order_id_arg())
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("description").long("description").default_value("")),
                )
                .subcommand(
                    Command::new("accept").arg(order_id_arg()).arg(
                        Arg::new("force")
                            .long("force")
                            .action(ArgAction::SetTrue)
                            .help("Accept even when underpaid"),
                    ),
                )
                .subcommand(
                    Command::new("reset")
                        .about("Clear received money; owners and superusers only")
                        .arg(order_id_arg()),
                )
                .subcommand(
                    Command::new("status")
                        .arg(order_id_arg())
                        .arg(Arg::new("status").long("status").required(true)),
                ),
        )
        .subcommand(
            Command::new("debtors")
                .about("Customers with outstanding debt")
                .subcommand(json_flags(
                    Command::new("top")
                        .arg(Arg::new("type").long("type").help("agency|individual"))
                        .arg(Arg::new("branch").long("branch").help("Branch name"))
                        .arg(Arg::new("min_debt").long("min-debt"))
                        .arg(Arg::new("max_debt").long("max-debt"))
                        .arg(
                            Arg::new("sort")
                                .long("sort")
                                .default_value("debt_desc")
                                .help("debt_desc|debt_asc|orders_desc|orders_asc|name_asc|name_desc"),
                        )
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .default_value("50")
                                .value_parser(value_parser!(usize)),
                        ),
                ))
                .subcommand(json_flags(
                    Command::new("search").arg(Arg::new("query").long("query").required(true)),
                ))
                .subcommand(json_flags(Command::new("show").arg(customer_arg()))),
        )
        .subcommand(
            Command::new("pay")
                .about("Bulk payments")
                .subcommand(json_flags(
                    Command::new("preview")
                        .arg(customer_arg())
                        .arg(Arg::new("amount").long("amount").required(true)),
                ))
                .subcommand(
                    Command::new("process")
                        .arg(customer_arg())
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(
                            Arg::new("method")
                                .long("method")
                                .default_value("cash")
                                .help("cash|bank_transfer|card|other"),
                        )
                        .arg(Arg::new("note").long("note").default_value(""))
                        .arg(
                            Arg::new("json")
                                .long("json")
                                .action(ArgAction::SetTrue)
                                .help("Print the result object"),
                        ),
                ),
        )
        .subcommand(
            Command::new("history")
                .about("Recorded bulk payments")
                .subcommand(json_flags(period_args(Command::new("list"))))
                .subcommand(json_flags(
                    Command::new("show").arg(
                        Arg::new("id")
                            .long("id")
                            .required(true)
                            .value_parser(value_parser!(i64)),
                    ),
                )),
        )
        .subcommand(
            Command::new("export")
                .about("Export payment history")
                .subcommand(period_args(
                    Command::new("payments")
                        .arg(
                            Arg::new("format")
                                .long("format")
                                .default_value("csv")
                                .help("csv|json"),
                        )
                        .arg(Arg::new("out").long("out").required(true)),
                )),
        )
        .subcommand(Command::new("doctor").about("Audit stored payments"))
}
