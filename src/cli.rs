// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, crate_version};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print as JSON lines"),
    )
}

pub fn build_cli() -> Command {
    Command::new("pocketledger")
        .version(crate_version!())
        .about("Personal debt ledger and open-banking account sync")
        .subcommand(Command::new("init").about("Initialize the database"))
        .subcommand(
            Command::new("person")
                .about("People in the debt ledger")
                .subcommand(
                    Command::new("add").about("Add a person").arg(
                        Arg::new("name")
                            .long("name")
                            .required(true)
                            .help("Unique name"),
                    ),
                )
                .subcommand(json_flags(
                    Command::new("list").about("List people with net balances"),
                )),
        )
        .subcommand(
            Command::new("debt")
                .about("Debts and repayments")
                .subcommand(
                    Command::new("add")
                        .about("Record a new debt")
                        .arg(Arg::new("person").long("person").required(true))
                        .arg(
                            Arg::new("kind")
                                .long("kind")
                                .required(true)
                                .help("owed-by-me or owed-to-me"),
                        )
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("description").long("description"))
                        .arg(Arg::new("currency").long("currency")),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .about("List debts with paid/remaining amounts")
                        .arg(Arg::new("kind").long("kind")),
                ))
                .subcommand(
                    Command::new("repay")
                        .about("Record a partial repayment")
                        .arg(Arg::new("id").long("id").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("note").long("note")),
                )
                .subcommand(json_flags(
                    Command::new("totals").about("Global I-owe / owed-to-me totals"),
                )),
        )
        .subcommand(
            Command::new("sync")
                .about("Ingest aggregator payloads")
                .subcommand(
                    Command::new("accounts")
                        .about("Ingest a session-exchange payload")
                        .arg(Arg::new("path").long("path").required(true)),
                )
                .subcommand(
                    Command::new("refresh")
                        .about("Refresh known accounts from a payload")
                        .arg(Arg::new("path").long("path").required(true)),
                ),
        )
        .subcommand(
            Command::new("account")
                .about("Synced bank accounts")
                .subcommand(json_flags(
                    Command::new("list").about("List accounts with their transactions"),
                )),
        )
        .subcommand(Command::new("doctor").about("Run integrity checks"))
}
