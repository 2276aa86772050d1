//! Schedule expressions.
//!
//! Accepted forms:
//!
//! - five-field cron (`min hour dom mon dow`), run at second zero, with
//!   standard weekday numbers (0-6 from Sunday, 7 is Sunday again)
//! - six-field cron with leading seconds, seven-field with trailing year,
//!   weekdays numbered 1-7 from Sunday as the `cron` crate reads them
//! - `@yearly`, `@monthly`, `@weekly`, `@daily`, `@hourly`
//! - `@every <duration>` in `humantime` syntax (`30m`, `1h30m`, `1h 2m`)

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::error::WatchError;

#[derive(Debug, Clone)]
enum Kind {
    Every(Duration),
    Cron(Box<cron::Schedule>),
}

/// When a watch job fires.
#[derive(Debug, Clone)]
pub struct Schedule {
    expr: String,
    kind: Kind,
}

impl Schedule {
    pub fn parse(expr: &str) -> Result<Self, WatchError> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Err(WatchError::MissingSchedule);
        }

        let kind = if let Some(rest) = expr.strip_prefix("@every") {
            let interval =
                parse_every(rest.trim()).map_err(|reason| WatchError::invalid(expr, reason))?;
            Kind::Every(interval)
        } else if expr.starts_with('@') {
            Kind::Cron(Box::new(parse_cron(expr)?))
        } else {
            let fields: Vec<&str> = expr.split_whitespace().collect();
            let normalized = match fields.len() {
                5 => {
                    let weekdays = shift_weekdays(fields[4])
                        .map_err(|reason| WatchError::invalid(expr, reason))?;
                    format!("0 {} {}", fields[..4].join(" "), weekdays)
                }
                6 | 7 => expr.to_string(),
                n => {
                    return Err(WatchError::invalid(
                        expr,
                        format!("expected 5, 6 or 7 fields, found {}", n),
                    ));
                }
            };
            Kind::Cron(Box::new(parse_cron(&normalized).map_err(|e| match e {
                WatchError::InvalidSchedule { reason, .. } => WatchError::invalid(expr, reason),
                other => other,
            })?))
        };

        Ok(Self {
            expr: expr.to_string(),
            kind,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.expr
    }

    /// Time from `now` until the next fire, or `None` if the schedule has
    /// no further fire times.
    pub fn next_delay(&self, now: DateTime<Utc>) -> Option<Duration> {
        match &self.kind {
            Kind::Every(interval) => Some(*interval),
            Kind::Cron(schedule) => {
                let next = schedule.after(&now).next()?;
                Some(next.signed_duration_since(now).to_std().unwrap_or_default())
            }
        }
    }
}

impl FromStr for Schedule {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}

fn parse_cron(expr: &str) -> Result<cron::Schedule, WatchError> {
    cron::Schedule::from_str(expr).map_err(|e| WatchError::invalid(expr, e.to_string()))
}

fn parse_every(body: &str) -> Result<Duration, String> {
    if body.is_empty() {
        return Err("missing duration".to_string());
    }
    let interval = humantime::parse_duration(body).map_err(|e| e.to_string())?;
    if interval.is_zero() {
        return Err("duration must be positive".to_string());
    }
    Ok(interval)
}

/// Rewrite a standard day-of-week field into the `cron` crate's numbering.
///
/// Numeric items (single days, ranges, steps) are expanded to the days they
/// cover and renumbered from Sunday = 1. Names and a bare `*` or `?` pass
/// through unchanged.
fn shift_weekdays(field: &str) -> Result<String, String> {
    let mut days = BTreeSet::new();
    let mut named = Vec::new();

    for item in field.split(',') {
        match standard_weekdays(item)? {
            Some(covered) => days.extend(covered),
            None => named.push(item),
        }
    }

    let mut items: Vec<String> = days.iter().map(|d| (d + 1).to_string()).collect();
    items.extend(named.into_iter().map(str::to_string));
    Ok(items.join(","))
}

/// Days (0 = Sunday) covered by one numeric list item, or `None` when the
/// item is not numeric.
fn standard_weekdays(item: &str) -> Result<Option<BTreeSet<u8>>, String> {
    let (base, step) = match item.split_once('/') {
        Some((base, step)) => {
            let step = step
                .parse::<u8>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| format!("invalid day-of-week step '{}'", step))?;
            (base, step)
        }
        None => (item, 1),
    };

    let (start, end) = if base == "*" || base == "?" {
        if step == 1 {
            return Ok(None);
        }
        (0, 6)
    } else if let Some((a, b)) = base.split_once('-') {
        match (a.parse::<u8>(), b.parse::<u8>()) {
            (Ok(a), Ok(b)) => (a, b),
            _ => return Ok(None),
        }
    } else {
        match base.parse::<u8>() {
            Ok(n) if step > 1 => (n, 6),
            Ok(n) => (n, n),
            Err(_) => return Ok(None),
        }
    };

    if end > 7 || start > end {
        return Err(format!("day of week '{}' out of range 0-7", item));
    }
    Ok(Some(
        (start..=end)
            .step_by(usize::from(step))
            .map(|d| d % 7)
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    // 2026-03-01 is a Sunday.
    fn on(day: u32, h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, h, m, s).unwrap()
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        on(2, h, m, s)
    }

    fn hours(n: u64) -> Option<Duration> {
        Some(Duration::from_secs(n * 3600))
    }

    #[test]
    fn every_durations_parse() {
        let s = Schedule::parse("@every 30m").unwrap();
        assert_eq!(s.next_delay(Utc::now()), Some(Duration::from_secs(1800)));

        let s = Schedule::parse("@every 1h30m").unwrap();
        assert_eq!(s.next_delay(Utc::now()), Some(Duration::from_secs(5400)));

        let s = Schedule::parse("  @every 45s ").unwrap();
        assert_eq!(s.as_str(), "@every 45s");
        assert_eq!(s.next_delay(Utc::now()), Some(Duration::from_secs(45)));

        let s = Schedule::parse("@every 1h 2m").unwrap();
        assert_eq!(s.next_delay(Utc::now()), Some(Duration::from_secs(3720)));
    }

    #[test]
    fn every_rejects_bad_durations() {
        for expr in ["@every", "@every 0s", "@every 5", "@every m", "@every soon"] {
            assert!(
                matches!(Schedule::parse(expr), Err(WatchError::InvalidSchedule { .. })),
                "{expr} should be rejected"
            );
        }
    }

    #[test]
    fn five_field_cron_fires_at_second_zero() {
        let s = Schedule::parse("*/15 * * * *").unwrap();
        assert_eq!(s.next_delay(at(10, 7, 30)), Some(Duration::from_secs(7 * 60 + 30)));
    }

    #[test]
    fn six_field_cron_uses_leading_seconds() {
        let s = Schedule::parse("30 0 * * * *").unwrap();
        assert_eq!(s.next_delay(at(10, 0, 0)), Some(Duration::from_secs(30)));
    }

    #[test]
    fn macros_parse() {
        let s: Schedule = "@hourly".parse().unwrap();
        assert_eq!(s.next_delay(at(10, 59, 0)), Some(Duration::from_secs(60)));
        assert!(Schedule::parse("@daily").is_ok());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(Schedule::parse(""), Err(WatchError::MissingSchedule)));
        assert!(matches!(Schedule::parse("   "), Err(WatchError::MissingSchedule)));
        for expr in ["not a schedule", "* * *", "61 * * * *", "@sometimes"] {
            match Schedule::parse(expr) {
                Err(WatchError::InvalidSchedule { expr: reported, .. }) => assert_eq!(reported, expr),
                other => panic!("{expr} should be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn five_field_weekdays_count_from_sunday_zero() {
        // Sunday 08:00 -> Monday 09:00
        let s = Schedule::parse("0 9 * * 1-5").unwrap();
        assert_eq!(s.next_delay(on(1, 8, 0, 0)), hours(25));

        // Monday 10:00 -> Sunday 00:00
        let s = Schedule::parse("0 0 * * 0").unwrap();
        assert_eq!(s.next_delay(on(2, 10, 0, 0)), hours(134));
        let s = Schedule::parse("0 0 * * 7").unwrap();
        assert_eq!(s.next_delay(on(2, 10, 0, 0)), hours(134));

        // Monday 10:00 -> Saturday 00:00
        let s = Schedule::parse("0 0 * * 6").unwrap();
        assert_eq!(s.next_delay(on(2, 10, 0, 0)), hours(110));

        let s = Schedule::parse("* * * * 0").unwrap();
        assert_eq!(s.next_delay(on(1, 8, 0, 30)), Some(Duration::from_secs(30)));
    }

    #[test]
    fn five_field_weekday_lists_steps_and_names() {
        // Saturday 2026-03-07 12:00 -> Sunday 00:00
        let s = Schedule::parse("0 0 * * 5-7").unwrap();
        assert_eq!(s.next_delay(on(7, 12, 0, 0)), hours(12));

        let s = Schedule::parse("0 0 * * */2").unwrap();
        assert_eq!(s.next_delay(on(2, 10, 0, 0)), hours(14));

        let s = Schedule::parse("0 9 * * MON-FRI").unwrap();
        assert_eq!(s.next_delay(on(1, 8, 0, 0)), hours(25));

        assert_eq!(shift_weekdays("0,3,7").unwrap(), "1,4");
        assert_eq!(shift_weekdays("*").unwrap(), "*");

        for expr in ["0 0 * * 8", "0 0 * * 5-2", "0 0 * * */0"] {
            assert!(
                matches!(Schedule::parse(expr), Err(WatchError::InvalidSchedule { .. })),
                "{expr} should be rejected"
            );
        }
    }
}
