//! Cost rates and the date-effective tables that hold them.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::availability::start_date_na;
use crate::duration::TimeUnit;

/// Number of cost-rate tables carried by a resource.
pub const COST_RATE_TABLE_COUNT: usize = 5;

/// Number of rates held by each cost-rate table entry.
pub const RATES_PER_ENTRY: usize = 5;

/// An amount of money per unit of time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Rate {
    pub amount: f64,
    pub unit: TimeUnit,
}

impl Rate {
    pub fn new(amount: f64, unit: TimeUnit) -> Self {
        Self { amount, unit }
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0.0
    }

    /// Compares optional rates, treating a missing rate as zero.
    pub fn equivalent(a: Option<&Rate>, b: Option<&Rate>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => a == b,
            (Some(rate), None) | (None, Some(rate)) => rate.is_zero(),
            (None, None) => true,
        }
    }
}

/// Zero amounts compare equal whatever their unit.
impl PartialEq for Rate {
    fn eq(&self, other: &Self) -> bool {
        if self.is_zero() && other.is_zero() {
            return true;
        }
        self.amount == other.amount && self.unit == other.unit
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.amount, self.unit)
    }
}

fn default_end() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2049, 12, 31)
        .and_then(|date| date.and_hms_opt(23, 59, 0))
        .unwrap_or(NaiveDateTime::MAX)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRateTableEntry {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub rates: [Option<Rate>; RATES_PER_ENTRY],
    #[serde(default)]
    pub cost_per_use: f64,
}

impl Default for CostRateTableEntry {
    /// The entry every table starts with: no rates, effective 1984-01-01 to 2049-12-31 23:59.
    fn default() -> Self {
        Self {
            start: start_date_na(),
            end: default_end(),
            rates: [None; RATES_PER_ENTRY],
            cost_per_use: 0.0,
        }
    }
}

impl CostRateTableEntry {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start,
            end,
            ..Self::default()
        }
    }

    pub fn with_rate(mut self, index: usize, rate: Rate) -> Self {
        if let Some(slot) = self.rates.get_mut(index) {
            *slot = Some(rate);
        }
        self
    }

    pub fn with_cost_per_use(mut self, cost_per_use: f64) -> Self {
        self.cost_per_use = cost_per_use;
        self
    }

    pub fn standard_rate(&self) -> Option<&Rate> {
        self.rates[0].as_ref()
    }

    pub fn overtime_rate(&self) -> Option<&Rate> {
        self.rates[1].as_ref()
    }

    pub fn rate(&self, index: usize) -> Option<&Rate> {
        self.rates.get(index).and_then(Option::as_ref)
    }

    pub fn all_rates_are_zero(&self) -> bool {
        self.rates.iter().all(|rate| Rate::equivalent(rate.as_ref(), None))
    }
}

/// Entries kept in ascending end-date order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostRateTable {
    entries: Vec<CostRateTableEntry>,
}

impl CostRateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table holding only the default entry.
    pub fn with_default_entry() -> Self {
        Self {
            entries: vec![CostRateTableEntry::default()],
        }
    }

    pub fn add(&mut self, entry: CostRateTableEntry) {
        self.entries.push(entry);
        self.entries.sort_by_key(|entry| entry.end);
    }

    pub fn entries(&self) -> &[CostRateTableEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CostRateTableEntry> {
        self.entries.get(index)
    }

    /// The first entry whose end lies after `date`.
    pub fn entry_by_date(&self, date: NaiveDateTime) -> Option<&CostRateTableEntry> {
        self.index_by_date(date).map(|index| &self.entries[index])
    }

    pub fn index_by_date(&self, date: NaiveDateTime) -> Option<usize> {
        self.entries.iter().position(|entry| date < entry.end)
    }

    /// False for an empty table or one holding a single entry without rates.
    pub fn table_is_populated(&self) -> bool {
        match self.entries.as_slice() {
            [] => false,
            [only] => !only.all_rates_are_zero(),
            _ => true,
        }
    }
}
