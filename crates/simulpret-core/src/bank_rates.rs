//! Published bank rates and rate alerts.
//!
//! The table is read-only input: a feed refreshes it outside the engine and
//! callers pass it in. A built-in reference table covers the major French
//! networks when a feed omits them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Months, RatePct};
use crate::SimulationResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One lender's published rates per duration bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankRate {
    pub bank_name: String,
    pub rate_10_years: RatePct,
    pub rate_15_years: RatePct,
    pub rate_20_years: RatePct,
    pub rate_25_years: RatePct,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_30_years: Option<RatePct>,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default)]
    pub is_promotional: bool,
}

impl BankRate {
    /// Published (years, rate) pairs, shortest first. Zero rates mean the
    /// feed had no figure for that bucket and are left out.
    pub fn buckets(&self) -> Vec<(u32, RatePct)> {
        [
            (10, Some(self.rate_10_years)),
            (15, Some(self.rate_15_years)),
            (20, Some(self.rate_20_years)),
            (25, Some(self.rate_25_years)),
            (30, self.rate_30_years),
        ]
        .into_iter()
        .filter_map(|(years, rate)| rate.filter(|r| *r > Decimal::ZERO).map(|r| (years, r)))
        .collect()
    }

    /// Rate of the smallest bucket covering `term_months`; terms beyond the
    /// longest bucket use the longest one.
    pub fn rate_for_term(&self, term_months: Months) -> Option<RatePct> {
        let years = term_months.div_ceil(12);
        let buckets = self.buckets();
        buckets
            .iter()
            .find(|(bucket, _)| *bucket >= years)
            .or_else(|| buckets.last())
            .map(|(_, rate)| *rate)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankRateTable {
    pub rates: Vec<BankRate>,
}

impl BankRateTable {
    /// Reference rates of the eight major networks, stamped `as_of`.
    pub fn reference(as_of: DateTime<Utc>) -> Self {
        let rows: [(&str, [Decimal; 4]); 8] = [
            ("Crédit Agricole", [dec!(3.20), dec!(3.45), dec!(3.65), dec!(3.85)]),
            ("BNP Paribas", [dec!(3.25), dec!(3.50), dec!(3.70), dec!(3.90)]),
            ("Société Générale", [dec!(3.15), dec!(3.40), dec!(3.60), dec!(3.80)]),
            ("Crédit Mutuel", [dec!(3.30), dec!(3.55), dec!(3.75), dec!(3.95)]),
            ("LCL", [dec!(3.35), dec!(3.60), dec!(3.80), dec!(4.00)]),
            ("Caisse d'Épargne", [dec!(3.28), dec!(3.52), dec!(3.72), dec!(3.92)]),
            ("Banque Populaire", [dec!(3.32), dec!(3.57), dec!(3.77), dec!(3.97)]),
            ("CIC", [dec!(3.27), dec!(3.52), dec!(3.72), dec!(3.92)]),
        ];

        let rates = rows
            .into_iter()
            .map(|(bank_name, [r10, r15, r20, r25])| BankRate {
                bank_name: bank_name.to_string(),
                rate_10_years: r10,
                rate_15_years: r15,
                rate_20_years: r20,
                rate_25_years: r25,
                rate_30_years: None,
                last_updated: as_of,
                source_url: None,
                is_promotional: false,
            })
            .collect();
        Self { rates }
    }

    pub fn from_json_str(s: &str) -> SimulationResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Overlay `fetched` on this table: fetched rows replace rows of the same
    /// bank, new banks are appended, banks missing from the feed are kept.
    pub fn merge(mut self, fetched: BankRateTable) -> Self {
        for row in fetched.rates {
            match self.rates.iter_mut().find(|r| r.bank_name == row.bank_name) {
                Some(existing) => *existing = row,
                None => self.rates.push(row),
            }
        }
        self
    }

    pub fn find(&self, bank_name: &str) -> Option<&BankRate> {
        self.rates.iter().find(|r| r.bank_name == bank_name)
    }

    /// Lowest published rate for a term, with the bank offering it.
    /// Ties keep the first bank in table order.
    pub fn best_for_term(&self, term_months: Months) -> Option<(&BankRate, RatePct)> {
        self.rates
            .iter()
            .filter_map(|r| r.rate_for_term(term_months).map(|rate| (r, rate)))
            .fold(None, |best: Option<(&BankRate, RatePct)>, (row, rate)| match best {
                Some((_, best_rate)) if best_rate <= rate => best,
                _ => Some((row, rate)),
            })
    }
}

/// Parse a scraped rate such as `"3,45 %"`.
pub fn parse_rate_text(text: &str) -> Option<RatePct> {
    let cleaned = text.replace('%', "").replace(',', ".");
    cleaned.trim().parse::<Decimal>().ok()
}

// ---------------------------------------------------------------------------
// Rate alerts
// ---------------------------------------------------------------------------

/// "Tell me when this bank's rate for this duration drops to the target."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateAlert {
    pub bank_name: String,
    pub duration_months: Months,
    pub target_rate_pct: RatePct,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_rate_pct: Option<RatePct>,
    #[serde(default)]
    pub notified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvaluation {
    /// The alert with its current rate refreshed and `notified` set once fired
    pub alert: RateAlert,
    /// Fired by this evaluation
    pub triggered: bool,
}

/// Check alerts against the table. An alert fires once, the first time the
/// bank's rate for its duration is at or below the target.
pub fn evaluate_alerts(table: &BankRateTable, alerts: &[RateAlert]) -> Vec<AlertEvaluation> {
    alerts
        .iter()
        .map(|alert| {
            let mut alert = alert.clone();
            let current = table
                .find(&alert.bank_name)
                .and_then(|row| row.rate_for_term(alert.duration_months));

            let triggered = match current {
                Some(rate) => {
                    alert.current_rate_pct = Some(rate);
                    rate <= alert.target_rate_pct && !alert.notified
                }
                None => false,
            };
            if triggered {
                tracing::info!(
                    bank = %alert.bank_name,
                    duration = alert.duration_months,
                    target = %alert.target_rate_pct,
                    "rate alert triggered"
                );
                alert.notified = true;
            }
            AlertEvaluation { alert, triggered }
        })
        .collect()
}
