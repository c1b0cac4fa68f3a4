use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

const DURATION_EPSILON: f64 = 0.00001;

const ELAPSED_MINUTES_PER_DAY: f64 = 60.0 * 24.0;
const ELAPSED_MINUTES_PER_WEEK: f64 = ELAPSED_MINUTES_PER_DAY * 7.0;
const ELAPSED_MINUTES_PER_MONTH: f64 = ELAPSED_MINUTES_PER_DAY * 30.0;
const ELAPSED_MINUTES_PER_YEAR: f64 = ELAPSED_MINUTES_PER_WEEK * 52.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
    Percent,
    ElapsedMinutes,
    ElapsedHours,
    ElapsedDays,
    ElapsedWeeks,
    ElapsedMonths,
    ElapsedYears,
    ElapsedPercent,
}

impl TimeUnit {
    pub const ALL: [TimeUnit; 14] = [
        TimeUnit::Minutes,
        TimeUnit::Hours,
        TimeUnit::Days,
        TimeUnit::Weeks,
        TimeUnit::Months,
        TimeUnit::Years,
        TimeUnit::Percent,
        TimeUnit::ElapsedMinutes,
        TimeUnit::ElapsedHours,
        TimeUnit::ElapsedDays,
        TimeUnit::ElapsedWeeks,
        TimeUnit::ElapsedMonths,
        TimeUnit::ElapsedYears,
        TimeUnit::ElapsedPercent,
    ];

    /// Elapsed units measure clock time and never consult a working calendar.
    pub fn is_elapsed(self) -> bool {
        matches!(
            self,
            TimeUnit::ElapsedMinutes
                | TimeUnit::ElapsedHours
                | TimeUnit::ElapsedDays
                | TimeUnit::ElapsedWeeks
                | TimeUnit::ElapsedMonths
                | TimeUnit::ElapsedYears
                | TimeUnit::ElapsedPercent
        )
    }

    pub fn abbreviation(self) -> &'static str {
        match self {
            TimeUnit::Minutes => "m",
            TimeUnit::Hours => "h",
            TimeUnit::Days => "d",
            TimeUnit::Weeks => "w",
            TimeUnit::Months => "mo",
            TimeUnit::Years => "y",
            TimeUnit::Percent => "%",
            TimeUnit::ElapsedMinutes => "em",
            TimeUnit::ElapsedHours => "eh",
            TimeUnit::ElapsedDays => "ed",
            TimeUnit::ElapsedWeeks => "ew",
            TimeUnit::ElapsedMonths => "emo",
            TimeUnit::ElapsedYears => "ey",
            TimeUnit::ElapsedPercent => "e%",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeUnit::ALL
            .into_iter()
            .find(|unit| unit.abbreviation() == s)
            .ok_or_else(|| format!("unknown time unit '{s}'"))
    }
}

/// Conversion constants for working-time units.
pub trait TimeUnitDefaults {
    fn minutes_per_day(&self) -> u32;
    fn minutes_per_week(&self) -> u32;
    fn minutes_per_month(&self) -> u32;
    fn minutes_per_year(&self) -> u32;
    fn days_per_month(&self) -> u32;
}

/// The fixed defaults used when ordering durations of different units.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDefaults;

impl TimeUnitDefaults for StandardDefaults {
    fn minutes_per_day(&self) -> u32 {
        480
    }

    fn minutes_per_week(&self) -> u32 {
        2400
    }

    fn minutes_per_month(&self) -> u32 {
        480 * 20
    }

    fn minutes_per_year(&self) -> u32 {
        480 * 20 * 12
    }

    fn days_per_month(&self) -> u32 {
        20
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Duration {
    pub amount: f64,
    pub unit: TimeUnit,
}

impl Duration {
    pub fn new(amount: f64, unit: TimeUnit) -> Self {
        Self { amount, unit }
    }

    pub fn zero(unit: TimeUnit) -> Self {
        Self::new(0.0, unit)
    }

    pub fn minutes(amount: f64) -> Self {
        Self::new(amount, TimeUnit::Minutes)
    }

    pub fn hours(amount: f64) -> Self {
        Self::new(amount, TimeUnit::Hours)
    }

    pub fn days(amount: f64) -> Self {
        Self::new(amount, TimeUnit::Days)
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0.0
    }

    pub fn convert_units(&self, unit: TimeUnit, defaults: &dyn TimeUnitDefaults) -> Duration {
        if unit == self.unit {
            return *self;
        }
        convert_amount(
            self.amount,
            self.unit,
            unit,
            f64::from(defaults.minutes_per_day()),
            f64::from(defaults.minutes_per_week()),
            f64::from(defaults.days_per_month()),
        )
    }

    /// `self + other`, expressed in `self`'s units.
    pub fn add(&self, other: &Duration, defaults: &dyn TimeUnitDefaults) -> Duration {
        let other = other.convert_units(self.unit, defaults);
        Duration::new(self.amount + other.amount, self.unit)
    }

    pub fn negate(&self) -> Duration {
        if self.is_zero() {
            *self
        } else {
            Duration::new(-self.amount, self.unit)
        }
    }

    /// Tolerant comparison of the amounts only.
    pub fn amount_equals(&self, other: &Duration) -> bool {
        (self.amount - other.amount).abs() < DURATION_EPSILON
    }
}

/// Sums two optional durations, keeping whichever side is present.
pub fn add_optional(
    a: Option<Duration>,
    b: Option<Duration>,
    defaults: &dyn TimeUnitDefaults,
) -> Option<Duration> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.add(&b, defaults)),
        (a, b) => a.or(b),
    }
}

fn convert_amount(
    amount: f64,
    from: TimeUnit,
    to: TimeUnit,
    minutes_per_day: f64,
    minutes_per_week: f64,
    days_per_month: f64,
) -> Duration {
    let minutes = amount
        * match from {
            TimeUnit::Years => minutes_per_week * 52.0,
            TimeUnit::ElapsedYears => ELAPSED_MINUTES_PER_YEAR,
            TimeUnit::Months => minutes_per_day * days_per_month,
            TimeUnit::ElapsedMonths => ELAPSED_MINUTES_PER_MONTH,
            TimeUnit::Weeks => minutes_per_week,
            TimeUnit::ElapsedWeeks => ELAPSED_MINUTES_PER_WEEK,
            TimeUnit::Days => minutes_per_day,
            TimeUnit::ElapsedDays => ELAPSED_MINUTES_PER_DAY,
            TimeUnit::Hours | TimeUnit::ElapsedHours => 60.0,
            _ => 1.0,
        };

    let divisor = match to {
        TimeUnit::Hours | TimeUnit::ElapsedHours => 60.0,
        TimeUnit::Days => minutes_per_day,
        TimeUnit::ElapsedDays => ELAPSED_MINUTES_PER_DAY,
        TimeUnit::Weeks => minutes_per_week,
        TimeUnit::ElapsedWeeks => ELAPSED_MINUTES_PER_WEEK,
        TimeUnit::Months => minutes_per_day * days_per_month,
        TimeUnit::ElapsedMonths => ELAPSED_MINUTES_PER_MONTH,
        TimeUnit::Years => minutes_per_week * 52.0,
        TimeUnit::ElapsedYears => ELAPSED_MINUTES_PER_YEAR,
        _ => 1.0,
    };

    let converted = if divisor == 0.0 { 0.0 } else { minutes / divisor };
    Duration::new(converted, to)
}

impl PartialEq for Duration {
    fn eq(&self, other: &Self) -> bool {
        self.unit == other.unit && self.amount_equals(other)
    }
}

impl PartialOrd for Duration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let other = other.convert_units(self.unit, &StandardDefaults);
        if self.amount_equals(&other) {
            Some(Ordering::Equal)
        } else {
            self.amount.partial_cmp(&other.amount)
        }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit)
    }
}

impl FromStr for Duration {
    type Err = String;

    /// Parses `<amount><unit>`, e.g. `8h`, `1.5d` or `3ed`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
            .ok_or_else(|| format!("missing time unit in '{s}'"))?;
        let (amount, unit) = s.split_at(split);
        let amount = amount
            .parse::<f64>()
            .map_err(|err| format!("invalid duration amount '{amount}': {err}"))?;
        Ok(Duration::new(amount, unit.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minutes_to_days_and_back_is_exact() {
        let days = Duration::minutes(480.0).convert_units(TimeUnit::Days, &StandardDefaults);
        assert_eq!(days, Duration::days(1.0));
        let minutes = days.convert_units(TimeUnit::Minutes, &StandardDefaults);
        assert_eq!(minutes.amount, 480.0);
    }

    #[test]
    fn zero_divisor_yields_zero() {
        struct NoDays;
        impl TimeUnitDefaults for NoDays {
            fn minutes_per_day(&self) -> u32 {
                0
            }
            fn minutes_per_week(&self) -> u32 {
                0
            }
            fn minutes_per_month(&self) -> u32 {
                0
            }
            fn minutes_per_year(&self) -> u32 {
                0
            }
            fn days_per_month(&self) -> u32 {
                0
            }
        }
        let days = Duration::hours(8.0).convert_units(TimeUnit::Days, &NoDays);
        assert_eq!(days, Duration::zero(TimeUnit::Days));
    }

    #[test]
    fn elapsed_units_ignore_working_defaults() {
        let elapsed = Duration::new(1.0, TimeUnit::ElapsedDays)
            .convert_units(TimeUnit::ElapsedHours, &StandardDefaults);
        assert_eq!(elapsed.amount, 24.0);
    }

    #[test]
    fn equality_requires_matching_units() {
        assert_ne!(Duration::days(1.0), Duration::hours(8.0));
        assert_eq!(Duration::days(1.0), Duration::days(1.000001));
    }

    #[test]
    fn ordering_converts_with_fixed_defaults() {
        assert_eq!(
            Duration::days(1.0).partial_cmp(&Duration::hours(8.0)),
            Some(Ordering::Equal)
        );
        assert!(Duration::hours(9.0) > Duration::days(1.0));
    }

    #[test]
    fn add_converts_into_left_units() {
        let sum = Duration::days(1.0).add(&Duration::hours(4.0), &StandardDefaults);
        assert_eq!(sum, Duration::days(1.5));
        assert_eq!(Duration::zero(TimeUnit::Hours).negate().amount, 0.0);
    }

    #[test]
    fn parses_compact_notation() {
        assert_eq!("8h".parse::<Duration>().unwrap(), Duration::hours(8.0));
        assert_eq!(
            "2ed".parse::<Duration>().unwrap(),
            Duration::new(2.0, TimeUnit::ElapsedDays)
        );
        assert!("8".parse::<Duration>().is_err());
    }
}
