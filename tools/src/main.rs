//! fee-audit: payment pattern audit over a ledger database.
//!
//! Usage:
//!   fee-audit --db ledger.db [--config data/audit_config.json] [--format text|table|json] [--out report.txt]
//!   fee-audit seed --db ledger.db [--seed 42] [--clients 25]

use anyhow::{Context, Result};
use feeaudit_core::{
    report::emit, synth, AuditConfig, AuditEngine, AuditReport, LedgerStore, ReportFormat,
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = flag_value(&args, "--db").unwrap_or(":memory:");

    if args.get(1).map(String::as_str) == Some("seed") {
        return run_seed(&args, db);
    }
    run_audit(&args, db)
}

fn run_seed(args: &[String], db: &str) -> Result<()> {
    let seed = parse_arg(args, "--seed", 42u64);
    let clients = parse_arg(args, "--clients", 25usize);

    let store = LedgerStore::open(db).with_context(|| format!("opening ledger {db}"))?;
    store.migrate()?;
    let ledger = synth::generate_ledger(seed, clients)?;
    let payments = synth::seed_store(&store, &ledger)?;

    println!("fee-audit seed");
    println!("  db:        {db}");
    println!("  seed:      {seed}");
    println!("  clients:   {clients}");
    println!("  payments:  {payments}");
    Ok(())
}

fn run_audit(args: &[String], db: &str) -> Result<()> {
    let config = match flag_value(args, "--config") {
        Some(path) => AuditConfig::load(path).with_context(|| format!("loading config {path}"))?,
        None => AuditConfig::default(),
    };
    let format: ReportFormat = flag_value(args, "--format").unwrap_or("text").parse()?;

    let store = LedgerStore::open(db).with_context(|| format!("opening ledger {db}"))?;
    store.migrate()?;
    log::info!("auditing {db} ({format:?})");

    let engine = AuditEngine::new(config);
    let outcome = engine.run(&store)?;
    let report = AuditReport::new(outcome, engine.config().report.clone());

    match flag_value(args, "--out") {
        Some(path) => {
            emit(&report, format, path)?;
            let s = &report.summary;
            println!("Analysis complete. Report saved to {path}");
            println!(
                "  {} entities, {} schedule / {} fee mismatches, {} missing payments",
                s.total_entities, s.schedule_mismatch_count, s.fee_mismatch_count, s.total_missing
            );
        }
        None => println!("{}", report.render(format)?),
    }
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
