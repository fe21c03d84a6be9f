use chrono::{Duration, Local};
use once_cell::sync::Lazy;
use regex::Regex;

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").unwrap());
static ISO_DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").unwrap());

/// Parse a fuzzy salary string like "$60k-$90k", "70,000 to 90,000 GBP" or
/// "up to 85000" into a (min, max) range.
///
/// Every numeric group is extracted; values under 1000 are read as thousands
/// ("60k" style shorthand). A single value yields (v, v); no values yields
/// (None, None).
pub fn parse_salary_range(text: &str) -> (Option<f64>, Option<f64>) {
    let mut values: Vec<f64> = Vec::new();
    for m in NUMBER_RE.find_iter(text) {
        let cleaned = m.as_str().replace(',', "");
        if let Ok(mut v) = cleaned.parse::<f64>() {
            if v <= 0.0 {
                continue;
            }
            if v < 1000.0 {
                v *= 1000.0;
            }
            values.push(v);
        }
    }
    if values.is_empty() {
        return (None, None);
    }
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    (Some(min), Some(max))
}

/// Parse a single labelled amount like "70K", "75,000" or "70K/yr".
pub fn parse_salary_amount(text: &str) -> Option<f64> {
    if text.is_empty() {
        return None;
    }
    let cleaned = text.replace(',', "").replace("/yr", "");
    let cleaned = cleaned.trim();
    let multiplier = if cleaned.to_uppercase().ends_with('K') {
        1000.0
    } else {
        1.0
    };
    let cleaned = cleaned.trim_end_matches(['K', 'k']);
    cleaned.parse::<f64>().ok().map(|v| v * multiplier)
}

/// Convert relative posting dates ("3 hours ago", "Reposted 2 days ago") to
/// YYYY-MM-DD. Anything unrecognisable resolves to today, which guards
/// against garbled card text.
pub fn resolve_relative_date(text: &str) -> String {
    let today = Local::now().format("%Y-%m-%d").to_string();
    if text.is_empty() {
        return today;
    }

    let clean = text.trim().to_lowercase();
    let clean = clean
        .strip_prefix("reposted ")
        .or_else(|| clean.strip_prefix("posted "))
        .unwrap_or(&clean)
        .to_string();

    if ISO_DATE_RE.is_match(&clean) {
        return clean[..10].to_string();
    }

    static TIME_WORD_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(just now|moment|today|second|minute|hour|day|week|month|year|ago)").unwrap()
    });
    if !TIME_WORD_RE.is_match(&clean) {
        return today;
    }

    if clean.contains("just now") || clean.contains("moment") || clean.contains("today") {
        return today;
    }

    static UNIT_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(\d+)\s*(second|minute|hour|day|week|month|year)").unwrap());
    if let Some(caps) = UNIT_RE.captures(&clean) {
        let n: i64 = caps[1].parse().unwrap_or(0);
        let days = match &caps[2] {
            "second" | "minute" | "hour" => 0,
            "day" => n,
            "week" => n * 7,
            "month" => n * 30,
            "year" => n * 365,
            _ => 0,
        };
        return (Local::now() - Duration::days(days))
            .format("%Y-%m-%d")
            .to_string();
    }

    today
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_dollar_k_range() {
        assert_eq!(
            parse_salary_range("$60k-$90k"),
            (Some(60000.0), Some(90000.0))
        );
    }

    #[test]
    fn parses_full_numbers_with_commas() {
        assert_eq!(
            parse_salary_range("70,000 to 95,000 GBP"),
            (Some(70000.0), Some(95000.0))
        );
    }

    #[test]
    fn single_value_yields_equal_bounds() {
        assert_eq!(parse_salary_range("circa 85000"), (Some(85000.0), Some(85000.0)));
    }

    #[test]
    fn no_numbers_yields_none() {
        assert_eq!(parse_salary_range("competitive"), (None, None));
        assert_eq!(parse_salary_range(""), (None, None));
    }

    #[test]
    fn small_values_read_as_thousands() {
        assert_eq!(parse_salary_range("60 - 90"), (Some(60000.0), Some(90000.0)));
    }

    #[test]
    fn badge_amounts_parse() {
        assert_eq!(parse_salary_amount("70K"), Some(70000.0));
        assert_eq!(parse_salary_amount("70K/yr"), Some(70000.0));
        assert_eq!(parse_salary_amount("75,000"), Some(75000.0));
        assert_eq!(parse_salary_amount("not a number"), None);
    }

    #[test]
    fn relative_dates_resolve_against_today() {
        let today = Local::now().format("%Y-%m-%d").to_string();
        assert_eq!(resolve_relative_date("3 hours ago"), today);
        assert_eq!(resolve_relative_date("just now"), today);
        assert_eq!(resolve_relative_date("Posted today"), today);

        let two_days = (Local::now() - Duration::days(2)).format("%Y-%m-%d").to_string();
        assert_eq!(resolve_relative_date("2 days ago"), two_days);
        assert_eq!(resolve_relative_date("Reposted 2 days ago"), two_days);

        let week = (Local::now() - Duration::days(7)).format("%Y-%m-%d").to_string();
        assert_eq!(resolve_relative_date("1 week ago"), week);
    }

    #[test]
    fn iso_dates_pass_through() {
        assert_eq!(resolve_relative_date("2025-11-03"), "2025-11-03");
    }

    #[test]
    fn garbled_text_falls_back_to_today() {
        let today = Local::now().format("%Y-%m-%d").to_string();
        assert_eq!(resolve_relative_date("Company re"), today);
        assert_eq!(resolve_relative_date(""), today);
    }
}
