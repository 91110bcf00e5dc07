//! fee-runner: headless front end for the fee ledger.
//!
//! Usage:
//!   fee-runner --records records.json --student S-104 --year 2024-2025
//!   fee-runner --db fees.db --student S-104 --year 2024-2025 --as-of 2025-01-15
//!   fee-runner --db fees.db --options
//!   fee-runner --db fees.db --ipc-mode
//!
//! In IPC mode one JSON command is read per stdin line and one JSON
//! response is written per stdout line.

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use feeledger_core::{
    academic_year::year_options,
    config::EngineConfig,
    model::{BillingRef, PaymentMethod},
    service::{reconcile_from_source, CustomFeeDraft, FeeDesk},
    source::RecordSnapshot,
    store::FeeStore,
    types::Money,
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Reconcile {
        student_id: String,
        academic_year: String,
        #[serde(default)]
        as_of: Option<NaiveDate>,
    },
    YearOptions,
    CreateCustomFee {
        student_id: String,
        academic_year: String,
        draft: CustomFeeDraft,
    },
    UpdateCustomFee {
        custom_fee_id: String,
        draft: CustomFeeDraft,
    },
    RecordPayment {
        billing: BillingRef,
        amount_paid: Money,
        method: PaymentMethod,
    },
    VerifyPayment {
        payment_id: String,
    },
    RevertPromotion {
        student_id: String,
        academic_year: String,
    },
    Events {
        student_id: String,
    },
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let show_options = args.iter().any(|a| a == "--options");
    let db = string_arg(&args, "--db");
    let records = string_arg(&args, "--records");
    let student = string_arg(&args, "--student");
    let year = string_arg(&args, "--year");

    let config = match string_arg(&args, "--config") {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let as_of = match string_arg(&args, "--as-of") {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("--as-of expects YYYY-MM-DD, got {s}"))?,
        None => Utc::now().date_naive(),
    };

    if show_options {
        let window = &config.year_window;
        let labels: Vec<String> = year_options(window.before, window.after, as_of)
            .into_iter()
            .map(|y| y.to_string())
            .collect();
        println!("{}", serde_json::to_string_pretty(&labels)?);
        if student.is_none() && !ipc_mode {
            return Ok(());
        }
    }

    match (db, records) {
        (Some(db), _) => {
            let store = FeeStore::open(db)?;
            store.migrate()?;
            let desk = FeeDesk::new(&store, config);
            if ipc_mode {
                return run_ipc_loop(&desk);
            }
            let (student, year) = query_args(student, year)?;
            let result = desk.reconcile(student, year, as_of)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        (None, Some(path)) => {
            if ipc_mode {
                bail!("--ipc-mode needs --db; a records file is read-only");
            }
            let snapshot = RecordSnapshot::load(path)?;
            let (student, year) = query_args(student, year)?;
            let result = reconcile_from_source(&snapshot, &config, student, year, as_of)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        (None, None) => bail!("one of --db or --records is required"),
    }

    Ok(())
}

fn run_ipc_loop(desk: &FeeDesk<'_>) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        if matches!(cmd, IpcCommand::Quit) {
            break;
        }

        let response = match handle_command(desk, cmd) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("command failed: {e:#}");
                serde_json::json!({ "error": format!("{e:#}") })
            }
        };
        writeln!(stdout, "{}", response)?;
        stdout.flush()?;
    }
    Ok(())
}

fn handle_command(desk: &FeeDesk<'_>, cmd: IpcCommand) -> Result<serde_json::Value> {
    let now = Utc::now();
    let value = match cmd {
        IpcCommand::Reconcile {
            student_id,
            academic_year,
            as_of,
        } => {
            let as_of = as_of.unwrap_or_else(|| now.date_naive());
            serde_json::to_value(desk.reconcile(&student_id, &academic_year, as_of)?)?
        }
        IpcCommand::YearOptions => {
            let labels: Vec<String> = desk
                .year_options(now.date_naive())
                .into_iter()
                .map(|y| y.to_string())
                .collect();
            serde_json::to_value(labels)?
        }
        IpcCommand::CreateCustomFee {
            student_id,
            academic_year,
            draft,
        } => serde_json::to_value(desk.create_custom_fee(&student_id, &academic_year, draft, now)?)?,
        IpcCommand::UpdateCustomFee {
            custom_fee_id,
            draft,
        } => serde_json::to_value(desk.update_custom_fee(&custom_fee_id, draft, now)?)?,
        IpcCommand::RecordPayment {
            billing,
            amount_paid,
            method,
        } => serde_json::to_value(desk.record_payment(billing, amount_paid, method, now)?)?,
        IpcCommand::VerifyPayment { payment_id } => {
            serde_json::to_value(desk.verify_offline_payment(&payment_id, now)?)?
        }
        IpcCommand::RevertPromotion {
            student_id,
            academic_year,
        } => serde_json::to_value(desk.revert_promotion(&student_id, &academic_year, now)?)?,
        IpcCommand::Events { student_id } => {
            serde_json::to_value(desk.events_for_student(&student_id)?)?
        }
        IpcCommand::Quit => serde_json::Value::Null,
    };
    Ok(value)
}

fn query_args<'a>(student: Option<&'a str>, year: Option<&'a str>) -> Result<(&'a str, &'a str)> {
    match (student, year) {
        (Some(s), Some(y)) => Ok((s, y)),
        _ => bail!("--student and --year are required"),
    }
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
