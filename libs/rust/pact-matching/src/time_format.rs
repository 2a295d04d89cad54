//! Date and time patterns in the `yyyy-MM-dd` style used by pact files,
//! translated to chrono format strings.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

/// Translate a pattern such as `yyyy-MM-dd'T'HH:mm:ss.SSSXXX` to chrono's
/// `strftime` syntax. Unknown letters are kept literally.
#[must_use]
pub fn to_chrono_format(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            i += 1;
            if chars.get(i) == Some(&'\'') {
                out.push('\'');
                i += 1;
                continue;
            }
            while i < chars.len() && chars[i] != '\'' {
                push_literal(&mut out, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }

        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }
        i += run;

        let translated = match (c, run) {
            ('y' | 'u', 2) => "%y",
            ('y' | 'u', _) => "%Y",
            ('M', 1 | 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', _) => "%d",
            ('D', _) => "%j",
            ('H', _) => "%H",
            ('k', _) => "%k",
            ('h', _) => "%I",
            ('m', _) => "%M",
            ('s', _) => "%S",
            ('S', 1..=3) => "%3f",
            ('S', 4..=6) => "%6f",
            ('S', _) => "%9f",
            ('a', _) => "%p",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            ('X' | 'x', _) => "%#z",
            ('Z', 1..=3) => "%z",
            ('Z', _) => "%:z",
            _ => {
                for _ in 0..run {
                    push_literal(&mut out, c);
                }
                continue;
            }
        };
        out.push_str(translated);
    }
    out
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

/// Check a date against a pattern.
#[must_use]
pub fn is_valid_date(value: &str, pattern: &str) -> bool {
    NaiveDate::parse_from_str(value, &to_chrono_format(pattern)).is_ok()
}

/// Check a time of day against a pattern.
#[must_use]
pub fn is_valid_time(value: &str, pattern: &str) -> bool {
    NaiveTime::parse_from_str(value, &to_chrono_format(pattern)).is_ok()
}

/// Check a timestamp against a pattern.
#[must_use]
pub fn is_valid_timestamp(value: &str, pattern: &str) -> bool {
    let format = to_chrono_format(pattern);
    if format.contains('z') {
        DateTime::parse_from_str(value, &format).is_ok()
    } else {
        NaiveDateTime::parse_from_str(value, &format).is_ok()
    }
}
