use anyhow::{anyhow, Context, Result};
use chrono::{prelude::*, Days, Duration, Months};

/// Parse a due-date specification relative to the local clock.
///
/// Accepts `today`, `tomorrow`, `+Nd`, `+Nw`, `+Nm`, a weekday name,
/// `YYYY-MM-DD` and RFC3339. Calendar dates resolve to local midnight, the
/// same instant a date picker produces.
pub fn parse_due(spec: &str) -> Result<DateTime<Utc>> {
    parse_due_from(spec, Local::now())
}

pub fn parse_due_from<Tz: TimeZone>(spec: &str, now: DateTime<Tz>) -> Result<DateTime<Utc>> {
    let trimmed = spec.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Due date cannot be empty"));
    }

    let lower = trimmed.to_ascii_lowercase();
    let tz = now.timezone();
    let today = now.date_naive();

    match lower.as_str() {
        "today" => return start_of_day(today, &tz),
        "tomorrow" => return start_of_day(today + Duration::days(1), &tz),
        _ => {}
    }

    if let Some(offset) = lower.strip_prefix('+') {
        return parse_offset(offset, today, &tz);
    }

    if let Some(weekday) = parse_weekday(&lower) {
        let mut days_ahead = (weekday.num_days_from_monday() as i64
            - today.weekday().num_days_from_monday() as i64)
            .rem_euclid(7);
        if days_ahead == 0 {
            days_ahead = 7;
        }
        return start_of_day(today + Duration::days(days_ahead), &tz);
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return start_of_day(date, &tz);
    }

    Err(anyhow!(
        "Unrecognized due date '{}'. Try YYYY-MM-DD, today, tomorrow, +3d, fri",
        spec
    ))
}

fn parse_offset<Tz: TimeZone>(offset: &str, today: NaiveDate, tz: &Tz) -> Result<DateTime<Utc>> {
    let unit = offset
        .chars()
        .last()
        .ok_or_else(|| anyhow!("Relative date '+{}' is too short", offset))?;
    let number = &offset[..offset.len() - unit.len_utf8()];
    if number.is_empty() {
        return Err(anyhow!("Relative date '+{}' is too short", offset));
    }
    let value: u32 = number
        .parse()
        .with_context(|| format!("Invalid relative offset '+{}'", offset))?;
    let date = match unit {
        'd' => today.checked_add_days(Days::new(value.into())),
        'w' => today.checked_add_days(Days::new(u64::from(value) * 7)),
        'm' => today.checked_add_months(Months::new(value)),
        other => {
            return Err(anyhow!(
                "Unsupported relative unit '{}'. Use d, w, or m.",
                other
            ))
        }
    }
    .ok_or_else(|| anyhow!("Relative date '+{}' is out of range", offset))?;
    start_of_day(date, tz)
}

fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Result<DateTime<Utc>> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("Invalid date {}", date))?;
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("Could not resolve local midnight for {}", date))
}

fn parse_weekday(label: &str) -> Option<Weekday> {
    match label {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}
