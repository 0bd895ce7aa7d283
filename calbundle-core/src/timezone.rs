//! TZID resolution.
//!
//! Calendars subscribed through Exchange name their zones the Windows way
//! (`W. Europe Standard Time`) and ship a VTIMEZONE block describing them.
//! A TZID is resolved, in order, as an IANA name, as a Windows zone name,
//! and finally through the VTIMEZONE definitions of the file it came from.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc, Weekday};
use chrono_tz::Tz;
use icalendar::parser::Component;

/// Windows zone name to IANA zone (CLDR windowsZones, territory 001).
static WINDOWS_ZONES: &[(&str, &str)] = &[
    ("Dateline Standard Time", "Etc/GMT+12"),
    ("UTC-11", "Etc/GMT+11"),
    ("Hawaiian Standard Time", "Pacific/Honolulu"),
    ("Alaskan Standard Time", "America/Anchorage"),
    ("Pacific Standard Time (Mexico)", "America/Tijuana"),
    ("Pacific Standard Time", "America/Los_Angeles"),
    ("US Mountain Standard Time", "America/Phoenix"),
    ("Mountain Standard Time (Mexico)", "America/Mazatlan"),
    ("Mountain Standard Time", "America/Denver"),
    ("Central America Standard Time", "America/Guatemala"),
    ("Central Standard Time", "America/Chicago"),
    ("Central Standard Time (Mexico)", "America/Mexico_City"),
    ("Canada Central Standard Time", "America/Regina"),
    ("SA Pacific Standard Time", "America/Bogota"),
    ("Eastern Standard Time", "America/New_York"),
    ("Eastern Standard Time (Mexico)", "America/Cancun"),
    ("US Eastern Standard Time", "America/Indiana/Indianapolis"),
    ("Cuba Standard Time", "America/Havana"),
    ("Venezuela Standard Time", "America/Caracas"),
    ("Paraguay Standard Time", "America/Asuncion"),
    ("Atlantic Standard Time", "America/Halifax"),
    ("SA Western Standard Time", "America/La_Paz"),
    ("Pacific SA Standard Time", "America/Santiago"),
    ("Newfoundland Standard Time", "America/St_Johns"),
    ("E. South America Standard Time", "America/Sao_Paulo"),
    ("SA Eastern Standard Time", "America/Cayenne"),
    ("Argentina Standard Time", "America/Argentina/Buenos_Aires"),
    ("Greenland Standard Time", "America/Nuuk"),
    ("Montevideo Standard Time", "America/Montevideo"),
    ("UTC-02", "Etc/GMT+2"),
    ("Azores Standard Time", "Atlantic/Azores"),
    ("Cape Verde Standard Time", "Atlantic/Cape_Verde"),
    ("UTC", "Etc/UTC"),
    ("GMT Standard Time", "Europe/London"),
    ("Greenwich Standard Time", "Atlantic/Reykjavik"),
    ("Morocco Standard Time", "Africa/Casablanca"),
    ("W. Europe Standard Time", "Europe/Berlin"),
    ("Central Europe Standard Time", "Europe/Budapest"),
    ("Romance Standard Time", "Europe/Paris"),
    ("Central European Standard Time", "Europe/Warsaw"),
    ("W. Central Africa Standard Time", "Africa/Lagos"),
    ("GTB Standard Time", "Europe/Bucharest"),
    ("Middle East Standard Time", "Asia/Beirut"),
    ("Egypt Standard Time", "Africa/Cairo"),
    ("E. Europe Standard Time", "Europe/Chisinau"),
    ("South Africa Standard Time", "Africa/Johannesburg"),
    ("FLE Standard Time", "Europe/Kyiv"),
    ("Israel Standard Time", "Asia/Jerusalem"),
    ("Kaliningrad Standard Time", "Europe/Kaliningrad"),
    ("Jordan Standard Time", "Asia/Amman"),
    ("Arabic Standard Time", "Asia/Baghdad"),
    ("Turkey Standard Time", "Europe/Istanbul"),
    ("Arab Standard Time", "Asia/Riyadh"),
    ("Belarus Standard Time", "Europe/Minsk"),
    ("Russian Standard Time", "Europe/Moscow"),
    ("E. Africa Standard Time", "Africa/Nairobi"),
    ("Iran Standard Time", "Asia/Tehran"),
    ("Arabian Standard Time", "Asia/Dubai"),
    ("Azerbaijan Standard Time", "Asia/Baku"),
    ("Mauritius Standard Time", "Indian/Mauritius"),
    ("Georgian Standard Time", "Asia/Tbilisi"),
    ("Caucasus Standard Time", "Asia/Yerevan"),
    ("Afghanistan Standard Time", "Asia/Kabul"),
    ("West Asia Standard Time", "Asia/Tashkent"),
    ("Ekaterinburg Standard Time", "Asia/Yekaterinburg"),
    ("Pakistan Standard Time", "Asia/Karachi"),
    ("India Standard Time", "Asia/Kolkata"),
    ("Sri Lanka Standard Time", "Asia/Colombo"),
    ("Nepal Standard Time", "Asia/Kathmandu"),
    ("Central Asia Standard Time", "Asia/Almaty"),
    ("Bangladesh Standard Time", "Asia/Dhaka"),
    ("Myanmar Standard Time", "Asia/Yangon"),
    ("SE Asia Standard Time", "Asia/Bangkok"),
    ("North Asia Standard Time", "Asia/Krasnoyarsk"),
    ("China Standard Time", "Asia/Shanghai"),
    ("North Asia East Standard Time", "Asia/Irkutsk"),
    ("Singapore Standard Time", "Asia/Singapore"),
    ("W. Australia Standard Time", "Australia/Perth"),
    ("Taipei Standard Time", "Asia/Taipei"),
    ("Tokyo Standard Time", "Asia/Tokyo"),
    ("Korea Standard Time", "Asia/Seoul"),
    ("Yakutsk Standard Time", "Asia/Yakutsk"),
    ("Cen. Australia Standard Time", "Australia/Adelaide"),
    ("AUS Central Standard Time", "Australia/Darwin"),
    ("E. Australia Standard Time", "Australia/Brisbane"),
    ("AUS Eastern Standard Time", "Australia/Sydney"),
    ("West Pacific Standard Time", "Pacific/Port_Moresby"),
    ("Tasmania Standard Time", "Australia/Hobart"),
    ("Vladivostok Standard Time", "Asia/Vladivostok"),
    ("Magadan Standard Time", "Asia/Magadan"),
    ("Central Pacific Standard Time", "Pacific/Guadalcanal"),
    ("UTC+12", "Etc/GMT-12"),
    ("New Zealand Standard Time", "Pacific/Auckland"),
    ("Fiji Standard Time", "Pacific/Fiji"),
    ("Tonga Standard Time", "Pacific/Tongatapu"),
    ("Samoa Standard Time", "Pacific/Apia"),
];

/// Look up a TZID in the tz database, directly or via its Windows name.
pub fn known_zone(tzid: &str) -> Option<Tz> {
    if let Ok(tz) = tzid.parse::<Tz>() {
        return Some(tz);
    }
    WINDOWS_ZONES
        .iter()
        .find(|(windows, _)| *windows == tzid)
        .and_then(|(_, iana)| iana.parse::<Tz>().ok())
}

/// One STANDARD or DAYLIGHT observance of a VTIMEZONE.
#[derive(Debug, Clone)]
struct Observance {
    start: NaiveDateTime,
    /// Seconds east of UTC
    offset_to: i32,
    yearly: Option<YearlyRule>,
}

/// The `FREQ=YEARLY;BYMONTH=m;BYDAY=nDD` shape VTIMEZONE rules use.
#[derive(Debug, Clone, Copy)]
struct YearlyRule {
    month: u32,
    /// Weekday and its ordinal in the month; negative counts from the end
    by_day: Option<(i32, Weekday)>,
}

/// VTIMEZONE definitions of one ICS file, keyed by TZID.
#[derive(Debug, Default)]
pub struct VTimezones {
    zones: HashMap<String, Vec<Observance>>,
}

impl VTimezones {
    pub fn from_components(components: &[Component]) -> Self {
        let zones = components
            .iter()
            .filter(|c| c.name == "VTIMEZONE")
            .filter_map(|vtz| {
                let tzid = vtz.find_prop("TZID")?.val.to_string();
                let observances: Vec<Observance> =
                    vtz.components.iter().filter_map(parse_observance).collect();
                (!observances.is_empty()).then_some((tzid, observances))
            })
            .collect();

        VTimezones { zones }
    }

    /// Convert a local time in `tzid` to UTC using the file's VTIMEZONE.
    pub fn to_utc(&self, local: &NaiveDateTime, tzid: &str) -> Option<DateTime<Utc>> {
        let observances = self.zones.get(tzid)?;
        let offset = offset_at(observances, local)?;
        local
            .checked_sub_signed(Duration::seconds(i64::from(offset)))
            .map(|naive| naive.and_utc())
    }
}

fn parse_observance(component: &Component) -> Option<Observance> {
    if component.name != "STANDARD" && component.name != "DAYLIGHT" {
        return None;
    }
    let start = NaiveDateTime::parse_from_str(
        component.find_prop("DTSTART")?.val.as_ref(),
        "%Y%m%dT%H%M%S",
    )
    .ok()?;
    let offset_to = parse_utc_offset(component.find_prop("TZOFFSETTO")?.val.as_ref())?;
    let yearly = component
        .find_prop("RRULE")
        .and_then(|p| parse_yearly_rule(p.val.as_ref()));

    Some(Observance {
        start,
        offset_to,
        yearly,
    })
}

/// `+0200`, `-0500`, `+053000` to seconds east of UTC
fn parse_utc_offset(value: &str) -> Option<i32> {
    let (sign, digits) = match value.split_at_checked(1)? {
        ("+", rest) => (1, rest),
        ("-", rest) => (-1, rest),
        _ => return None,
    };
    if !(digits.len() == 4 || digits.len() == 6) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[0..2].parse().ok()?;
    let minutes: i32 = digits[2..4].parse().ok()?;
    let seconds: i32 = digits.get(4..6).map_or(Some(0), |s| s.parse().ok())?;
    Some(sign * (hours * 3600 + minutes * 60 + seconds))
}

fn parse_yearly_rule(value: &str) -> Option<YearlyRule> {
    let mut freq = None;
    let mut month = None;
    let mut by_day = None;

    for part in value.split(';') {
        let (key, val) = part.split_once('=')?;
        match key {
            "FREQ" => freq = Some(val),
            "BYMONTH" => month = val.parse().ok(),
            "BYDAY" => by_day = parse_by_day(val),
            _ => {}
        }
    }

    if freq != Some("YEARLY") {
        return None;
    }
    Some(YearlyRule {
        month: month?,
        by_day,
    })
}

/// `-1SU`, `2SU`, `SU` (treated as the first)
fn parse_by_day(value: &str) -> Option<(i32, Weekday)> {
    let split = value.len().checked_sub(2)?;
    let (ordinal, day) = value.split_at_checked(split)?;
    let weekday = match day {
        "MO" => Weekday::Mon,
        "TU" => Weekday::Tue,
        "WE" => Weekday::Wed,
        "TH" => Weekday::Thu,
        "FR" => Weekday::Fri,
        "SA" => Weekday::Sat,
        "SU" => Weekday::Sun,
        _ => return None,
    };
    let ordinal = match ordinal.trim_start_matches('+') {
        "" => 1,
        n => n.parse().ok()?,
    };
    Some((ordinal, weekday))
}

/// Offset in force at `local`: the observance whose latest onset at or
/// before `local` is most recent. Onsets are compared in local time.
fn offset_at(observances: &[Observance], local: &NaiveDateTime) -> Option<i32> {
    let latest = observances
        .iter()
        .filter_map(|o| last_onset(o, local).map(|onset| (onset, o.offset_to)))
        .max_by_key(|(onset, _)| *onset);

    match latest {
        Some((_, offset)) => Some(offset),
        // Before every onset: the earliest defined observance applies
        None => observances
            .iter()
            .min_by_key(|o| o.start)
            .map(|o| o.offset_to),
    }
}

fn last_onset(observance: &Observance, local: &NaiveDateTime) -> Option<NaiveDateTime> {
    let Some(rule) = observance.yearly else {
        return (observance.start <= *local).then_some(observance.start);
    };

    let year = local.year();
    [year, year - 1]
        .into_iter()
        .filter_map(|y| onset_in_year(observance, rule, y))
        .find(|onset| onset <= local && *onset >= observance.start)
}

fn onset_in_year(observance: &Observance, rule: YearlyRule, year: i32) -> Option<NaiveDateTime> {
    let date = match rule.by_day {
        Some((ordinal, weekday)) => nth_weekday(year, rule.month, ordinal, weekday)?,
        None => NaiveDate::from_ymd_opt(year, rule.month, observance.start.day())?,
    };
    Some(date.and_time(observance.start.time()))
}

fn nth_weekday(year: i32, month: u32, ordinal: i32, weekday: Weekday) -> Option<NaiveDate> {
    if ordinal > 0 {
        return NaiveDate::from_weekday_of_month_opt(year, month, weekday, u8::try_from(ordinal).ok()?);
    }
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let mut day = NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()?;
    while day.weekday() != weekday {
        day = day.pred_opt()?;
    }
    let weeks_back = i64::from(ordinal.checked_neg()? - 1);
    let candidate = day.checked_sub_signed(Duration::weeks(weeks_back))?;
    (candidate.month() == month).then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use icalendar::parser::{read_calendar, unfold};

    const CUSTOM_ZONE: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VTIMEZONE\r\n\
TZID:Office Time\r\n\
BEGIN:STANDARD\r\n\
DTSTART:16010101T030000\r\n\
TZOFFSETFROM:+0200\r\n\
TZOFFSETTO:+0100\r\n\
RRULE:FREQ=YEARLY;INTERVAL=1;BYDAY=-1SU;BYMONTH=10\r\n\
END:STANDARD\r\n\
BEGIN:DAYLIGHT\r\n\
DTSTART:16010101T020000\r\n\
TZOFFSETFROM:+0100\r\n\
TZOFFSETTO:+0200\r\n\
RRULE:FREQ=YEARLY;INTERVAL=1;BYDAY=-1SU;BYMONTH=3\r\n\
END:DAYLIGHT\r\n\
END:VTIMEZONE\r\n\
END:VCALENDAR\r\n";

    fn naive(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    fn custom_zones() -> VTimezones {
        let unfolded = unfold(CUSTOM_ZONE);
        let calendar = read_calendar(&unfolded).unwrap();
        VTimezones::from_components(&calendar.components)
    }

    #[test]
    fn test_windows_zone_names_map_to_iana() {
        assert_eq!(known_zone("W. Europe Standard Time"), Some(chrono_tz::Europe::Berlin));
        assert_eq!(known_zone("Europe/Helsinki"), Some(chrono_tz::Europe::Helsinki));
        assert_eq!(known_zone("Nowhere Standard Time"), None);
    }

    #[test]
    fn test_every_windows_mapping_names_a_known_iana_zone() {
        for (windows, iana) in WINDOWS_ZONES {
            assert!(iana.parse::<Tz>().is_ok(), "{windows} maps to unknown {iana}");
        }
    }

    #[test]
    fn test_vtimezone_daylight_offset_in_summer() {
        let utc = custom_zones()
            .to_utc(&naive("2024-07-01T09:00:00"), "Office Time")
            .unwrap();
        assert_eq!(utc, naive("2024-07-01T07:00:00").and_utc());
    }

    #[test]
    fn test_vtimezone_standard_offset_in_winter() {
        let zones = custom_zones();
        assert_eq!(
            zones.to_utc(&naive("2024-01-15T09:00:00"), "Office Time"),
            Some(naive("2024-01-15T08:00:00").and_utc())
        );
        assert_eq!(
            zones.to_utc(&naive("2024-11-15T09:00:00"), "Office Time"),
            Some(naive("2024-11-15T08:00:00").and_utc())
        );
    }

    #[test]
    fn test_vtimezone_unknown_tzid_is_unresolved() {
        assert_eq!(
            custom_zones().to_utc(&naive("2024-07-01T09:00:00"), "Elsewhere"),
            None
        );
    }

    #[test]
    fn test_last_sunday_of_month() {
        assert_eq!(
            nth_weekday(2024, 3, -1, Weekday::Sun),
            NaiveDate::from_ymd_opt(2024, 3, 31)
        );
        assert_eq!(
            nth_weekday(2024, 10, -1, Weekday::Sun),
            NaiveDate::from_ymd_opt(2024, 10, 27)
        );
        assert_eq!(
            nth_weekday(2024, 3, 2, Weekday::Sun),
            NaiveDate::from_ymd_opt(2024, 3, 10)
        );
    }

    #[test]
    fn test_parse_utc_offset() {
        assert_eq!(parse_utc_offset("+0200"), Some(7200));
        assert_eq!(parse_utc_offset("-0330"), Some(-12600));
        assert_eq!(parse_utc_offset("+053045"), Some(19845));
        assert_eq!(parse_utc_offset("0200"), None);
    }
}
