//! Reply text for a successful lookup.

use covid_stats::CountryStats;
use time::{
    format_description::BorrowedFormatItem, macros::format_description, OffsetDateTime, UtcOffset,
};

const RFC_850: &[BorrowedFormatItem<'static>] = format_description!(
    "[weekday], [day]-[month repr:short]-[year repr:last_two] [hour]:[minute]:[second] UTC"
);

/// Upper-cases the first letter of every word and lower-cases the rest.
/// A word starts after any character that is not alphanumeric.
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut word_start = true;
    for c in input.chars() {
        if c.is_alphanumeric() {
            if word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            word_start = false;
        } else {
            out.push(c);
            word_start = true;
        }
    }
    out
}

/// Renders `at` as an RFC 850 date in UTC, e.g. `Sunday, 18-Oct-26 09:05:03 UTC`.
/// The offset of `at` is converted away, never printed.
pub fn rfc850(at: OffsetDateTime) -> String {
    let utc = at.to_offset(UtcOffset::UTC);
    utc.format(RFC_850).unwrap_or_else(|_| utc.to_string())
}

/// The reply for a found country: a greeting naming `country` in title case
/// and the time of the lookup, then today's cases, recovered, deaths and
/// total cases, one per line.
pub fn format_summary(country: &str, stats: &CountryStats, at: OffsetDateTime) -> String {
    format!(
        "👋 Here's the summary of the Covid-19 cases in {} as at {}\n\n\
         Today Cases: {}\n\
         Recovered Cases: {}\n\
         Deaths Recorded: {}\n\
         Total Cases: {}\n",
        title_case(country),
        rfc850(at),
        stats.today_cases,
        stats.recovered,
        stats.deaths,
        stats.cases,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn stats() -> CountryStats {
        CountryStats {
            today_cases: 10,
            recovered: 5,
            deaths: 1,
            cases: 100,
        }
    }

    #[test]
    fn title_cases_any_input() {
        assert_eq!(title_case("nigeria"), "Nigeria");
        assert_eq!(title_case("NIGERIA"), "Nigeria");
        assert_eq!(title_case("nIgErIa"), "Nigeria");
        assert_eq!(title_case("united states"), "United States");
        assert_eq!(title_case("guinea-bissau"), "Guinea-Bissau");
        assert_eq!(title_case("ÎLE maurice"), "Île Maurice");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn formats_rfc850_in_utc() {
        assert_eq!(
            rfc850(datetime!(2026-10-18 09:05:03 UTC)),
            "Sunday, 18-Oct-26 09:05:03 UTC"
        );
        assert_eq!(
            rfc850(datetime!(2020-04-01 23:30:00 -2)),
            "Thursday, 02-Apr-20 01:30:00 UTC"
        );
    }

    #[test]
    fn formats_full_summary() {
        let text = format_summary("nigeria", &stats(), datetime!(2026-10-18 09:05:03 UTC));
        assert_eq!(
            text,
            "👋 Here's the summary of the Covid-19 cases in Nigeria as at Sunday, 18-Oct-26 09:05:03 UTC\n\n\
             Today Cases: 10\n\
             Recovered Cases: 5\n\
             Deaths Recorded: 1\n\
             Total Cases: 100\n"
        );
    }

    #[test]
    fn greeting_is_title_cased_whatever_the_query_case() {
        let at = datetime!(2026-10-18 09:05:03 UTC);
        assert_eq!(
            format_summary("NIGERIA", &stats(), at),
            format_summary("nigeria", &stats(), at)
        );
    }
}
