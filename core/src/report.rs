//! Report rendering and emission.
//!
//! RULE: rendering is pure; `emit` is the only step that touches the
//! filesystem, and every write failure surfaces as `ReportEmission`.

use crate::{
    config::ReportConfig,
    engine::AuditOutcome,
    error::{AuditError, AuditResult},
    reconcile::{Finding, FindingStatus},
    summary::{AggregateSummary, EntityRef},
    types::{RecordedFeeModel, RunId},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::str::FromStr;

const RULE: &str = "================================================================================";
const THIN_RULE: &str = "--------------------------------------------------------------------------------";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Table,
    Json,
}

impl FromStr for ReportFormat {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            other => Err(AuditError::InvalidConfig {
                reason: format!("unknown report format '{other}' (expected text, table or json)"),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub run_id: RunId,
    pub generated_at: DateTime<Utc>,
    pub findings: Vec<Finding>,
    pub summary: AggregateSummary,
    #[serde(skip)]
    limits: ReportConfig,
}

impl AuditReport {
    pub fn new(outcome: AuditOutcome, limits: ReportConfig) -> Self {
        Self {
            run_id: format!("audit-{}", uuid::Uuid::new_v4()),
            generated_at: Utc::now(),
            findings: outcome.findings,
            summary: outcome.summary,
            limits,
        }
    }

    pub fn render(&self, format: ReportFormat) -> AuditResult<String> {
        match format {
            ReportFormat::Text => Ok(self.render_text()),
            ReportFormat::Table => Ok(self.render_table()),
            ReportFormat::Json => self.to_json(),
        }
    }

    pub fn to_json(&self) -> AuditResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    // ── Detailed text ──────────────────────────────────────────

    pub fn render_text(&self) -> String {
        let mut out = Vec::new();
        self.push_header(&mut out, "PAYMENT PATTERN AUDIT");

        let s = &self.summary;
        out.push(format!("Total Entities Analyzed: {}", s.total_entities));
        if s.skipped_entities > 0 {
            out.push(format!("Entities Skipped (no data): {}", s.skipped_entities));
        }
        out.push(format!("Entities with Schedule Mismatches: {}", s.schedule_mismatch_count));
        out.push(format!("Entities with Fee Structure Mismatches: {}", s.fee_mismatch_count));
        out.push(format!("Entities with Missing Payments: {}", s.entities_with_missing));
        out.push(format!("Total Missing Payments: {}", s.total_missing));
        out.push(format!("Entities with Makeup Payments: {}", s.entities_with_makeup));
        out.push(String::new());
        out.push(RULE.to_string());
        out.push(String::new());
        out.push("DETAILED FINDINGS BY ENTITY".to_string());
        out.push(RULE.to_string());

        for f in &self.findings {
            self.push_finding(&mut out, f);
        }
        out.join("\n")
    }

    fn push_header(&self, out: &mut Vec<String>, title: &str) {
        out.push(title.to_string());
        out.push(RULE.to_string());
        out.push(format!("Run: {}", self.run_id));
        out.push(format!("Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")));
        out.push(String::new());
    }

    fn push_finding(&self, out: &mut Vec<String>, f: &Finding) {
        let e = &f.entity;
        out.push(String::new());
        out.push(format!("CLIENT: {} (ID: {})", e.label, e.key.client_id));
        out.push(format!(
            "Provider: {} (Contract ID: {})",
            e.provider_name.as_deref().unwrap_or("Unknown"),
            e.key.contract_id
        ));
        out.push(THIN_RULE.to_string());

        match &f.status {
            FindingStatus::NoPayments => {
                out.push("STATUS: No payments found for this entity.".to_string());
                return;
            }
            FindingStatus::NoData { reason } => {
                out.push(format!("STATUS: Skipped, payment data unavailable ({reason})."));
                return;
            }
            FindingStatus::Analyzed => {}
        }

        out.push(format!(
            "Payment History: {} payments from {} to {}",
            f.event_count,
            fmt_date(f.first_event),
            fmt_date(f.last_event)
        ));

        // Schedule
        out.push(String::new());
        out.push("PAYMENT SCHEDULE ANALYSIS:".to_string());
        let sch = &f.schedule;
        if sch.label.is_periodic() {
            out.push(format!(
                "  Inferred Schedule: {} (confidence: {:.2})",
                sch.label.as_str(),
                sch.confidence
            ));
            if let Some(mean) = sch.mean_gap {
                out.push(format!("  Average Gap: {mean:.1} days"));
            }
            if !sch.gap_months.is_empty() {
                let hist: Vec<String> = sch
                    .gap_months
                    .iter()
                    .map(|(months, n)| format!("{months}: {n}"))
                    .collect();
                out.push(format!("  Gap Analysis: {{{}}} (in months)", hist.join(", ")));
            }
            out.push(format!("  Recorded Setting: {}", e.recorded_schedule.label()));
            if f.schedule_mismatch {
                out.push(format!(
                    "  ** MISMATCH DETECTED: Data suggests {}, record says {}",
                    sch.label.as_str(),
                    e.recorded_schedule.label()
                ));
            }
        } else {
            out.push(format!(
                "  Inferred Schedule: {} (insufficient data for determination)",
                sch.label.as_str()
            ));
        }

        // Fee structure
        out.push(String::new());
        out.push("FEE STRUCTURE ANALYSIS:".to_string());
        let fee = &f.fee;
        if fee.label.is_conclusive() {
            out.push(format!(
                "  Inferred Structure: {} (confidence: {:.2})",
                fee.label.as_str(),
                fee.confidence
            ));
            if let (Some(c), Some(cv)) = (fee.consistency, fee.cv) {
                out.push(format!("  Consistency: {c:?} (CV: {cv:.4})"));
            }
            match fee.inferred_value {
                Some(v) if fee.label.is_percentage_family() => {
                    out.push(format!("  Inferred Rate: {}", fmt_percentage(v)));
                }
                Some(v) => out.push(format!("  Inferred Amount: {}", fmt_currency(v))),
                None => {}
            }
            out.push(format!("  Recorded Setting: {}", e.recorded_fee_model.label()));
            match (e.recorded_fee_model, e.recorded_rate) {
                (RecordedFeeModel::Percentage, Some(r)) => {
                    out.push(format!("  Recorded Rate: {}", fmt_percentage(r)));
                }
                (RecordedFeeModel::Flat, Some(r)) => {
                    out.push(format!("  Recorded Amount: {}", fmt_currency(r)));
                }
                _ => {}
            }
            if let Some(delta) = f.rate_comparison.as_ref().and_then(|rc| rc.relative_delta) {
                out.push(format!("  Deviation from Record: {:+.1}%", delta * 100.0));
            }
            if f.fee_mismatch {
                out.push(format!(
                    "  ** MISMATCH DETECTED: Data suggests {}, record says {}",
                    fee.label.as_str(),
                    e.recorded_fee_model.label()
                ));
            }
        } else {
            out.push(format!(
                "  Inferred Structure: {} (insufficient data for determination)",
                fee.label.as_str()
            ));
        }

        // Missing
        out.push(String::new());
        out.push("MISSING PAYMENT ANALYSIS:".to_string());
        if !sch.label.is_periodic() {
            out.push("  Cannot determine missing payments (schedule unclear)".to_string());
        } else if f.missing.is_empty() {
            out.push("  No missing payments detected".to_string());
        } else {
            out.push(format!("  Potential Missing Payments: {}", f.missing.len()));
            out.push(format!(
                "  Missing Dates: {}",
                list_dates(&f.missing.missing, self.limits.max_dates_listed)
            ));
        }

        // Makeup
        if f.has_makeup() {
            out.push(String::new());
            out.push("POTENTIAL MAKEUP PAYMENTS:".to_string());
            for m in &f.makeup {
                let covers: Vec<String> = m
                    .candidate_missing_dates
                    .iter()
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .collect();
                out.push(format!(
                    "  {}: {} ({:.1}x avg) - may cover: {}",
                    m.date.format("%Y-%m-%d"),
                    fmt_currency(m.amount),
                    m.ratio_to_mean,
                    covers.join(", ")
                ));
            }
        }
    }

    // ── Concise table ──────────────────────────────────────────

    pub fn render_table(&self) -> String {
        let mut out = Vec::new();
        self.push_header(&mut out, "PAYMENT PATTERN AUDIT (SUMMARY)");

        out.push(format!(
            "{:<32} {:>8} {:<22} {:<28} {:>7} {:>6}",
            "Client", "Contract", "Schedule (rec)", "Fee (rec)", "Missing", "Makeup"
        ));
        out.push(THIN_RULE.to_string());

        for f in &self.findings {
            let e = &f.entity;
            let (schedule, fee) = match f.status {
                FindingStatus::Analyzed => (
                    format!(
                        "{}{} ({})",
                        flag(f.schedule_mismatch),
                        f.schedule.label.as_str(),
                        e.recorded_schedule.label()
                    ),
                    format!(
                        "{}{} ({})",
                        flag(f.fee_mismatch),
                        f.fee.label.as_str(),
                        e.recorded_fee_model.label()
                    ),
                ),
                FindingStatus::NoPayments => ("no payments".to_string(), "-".to_string()),
                FindingStatus::NoData { .. } => ("skipped".to_string(), "-".to_string()),
            };
            let missing = if f.schedule.label.is_periodic() {
                f.missing.len().to_string()
            } else {
                "-".to_string()
            };
            out.push(format!(
                "{:<32} {:>8} {:<22} {:<28} {:>7} {:>6}",
                truncate(&e.label, 32),
                e.key.contract_id,
                schedule,
                fee,
                missing,
                f.makeup.len()
            ));
        }

        let s = &self.summary;
        out.push(String::new());
        out.push(format!(
            "{} entities, {} schedule mismatches, {} fee mismatches, {} missing payments across {} entities",
            s.total_entities,
            s.schedule_mismatch_count,
            s.fee_mismatch_count,
            s.total_missing,
            s.entities_with_missing
        ));
        out.push(String::new());
        out.push("CRITICAL ISSUES".to_string());
        out.push(RULE.to_string());

        let limit = self.limits.max_entities_listed;
        let mut any = false;
        if !s.schedule_mismatches.is_empty() {
            any = true;
            out.push(format!(
                "Schedule mismatches ({}): {}",
                s.schedule_mismatch_count,
                list_entities(&s.schedule_mismatches, limit)
            ));
        }
        if !s.fee_mismatches.is_empty() {
            any = true;
            out.push(format!(
                "Fee structure mismatches ({}): {}",
                s.fee_mismatch_count,
                list_entities(&s.fee_mismatches, limit)
            ));
        }
        if !s.significant_missing.is_empty() {
            any = true;
            let shown: Vec<String> = s
                .significant_missing
                .iter()
                .take(limit)
                .map(|t| format!("{} ({})", t.entity.label, t.missing))
                .collect();
            out.push(format!(
                "Significant missing payments (>= {}): {}{}",
                self.limits.significant_missing_count,
                shown.join(", "),
                more_suffix(s.significant_missing.len(), limit)
            ));
        }
        if !any {
            out.push("None".to_string());
        }
        out.join("\n")
    }
}

/// Render and write a report. The only fallible terminal step of a run.
pub fn emit(report: &AuditReport, format: ReportFormat, path: &str) -> AuditResult<()> {
    let body = report.render(format)?;
    std::fs::write(path, body).map_err(|source| AuditError::ReportEmission {
        path: path.to_string(),
        source,
    })?;
    log::info!("report {} written to {path}", report.run_id);
    Ok(())
}

// ── Formatting helpers ─────────────────────────────────────────────

/// Up to `limit` dates, then "(plus N more)".
pub fn list_dates(dates: &[NaiveDate], limit: usize) -> String {
    let shown: Vec<String> = dates
        .iter()
        .take(limit)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect();
    let mut s = shown.join(", ");
    if dates.len() > limit {
        s.push_str(&format!(" (plus {} more)", dates.len() - limit));
    }
    s
}

fn list_entities(refs: &[EntityRef], limit: usize) -> String {
    let shown: Vec<&str> = refs.iter().take(limit).map(|r| r.label.as_str()).collect();
    format!("{}{}", shown.join(", "), more_suffix(refs.len(), limit))
}

fn more_suffix(total: usize, limit: usize) -> String {
    if total > limit {
        format!(" ... and {} more", total - limit)
    } else {
        String::new()
    }
}

fn flag(mismatch: bool) -> &'static str {
    if mismatch {
        "!"
    } else {
        ""
    }
}

fn fmt_date(d: Option<NaiveDate>) -> String {
    d.map_or_else(|| "Unknown".to_string(), |d| d.format("%Y-%m-%d").to_string())
}

/// `$1,234.56`
pub fn fmt_currency(v: f64) -> String {
    let cents = (v.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if v < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}.{:02}", cents % 100)
}

/// Fraction rendered as a percentage, e.g. 0.0025 → `0.250%`.
pub fn fmt_percentage(v: f64) -> String {
    format!("{:.3}%", v * 100.0)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
