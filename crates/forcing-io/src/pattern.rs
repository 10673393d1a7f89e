//! Date and lead-time placeholders in file names.
//!
//! | token    | value                          |
//! |----------|--------------------------------|
//! | `@YYYY@` | base year                      |
//! | `@YY@`   | base year, two digits          |
//! | `@MM@`   | base month                     |
//! | `@DD@`   | base day                       |
//! | `@HH@`   | base hour                      |
//! | `@L@`    | lead time in hours             |
//! | `@LL@`   | lead time, at least two digits |
//! | `@LLL@`  | lead time, three digits        |
//! | `@LLLL@` | lead time, four digits         |

use chrono::{DateTime, Utc};

/// Substitute the placeholders of `pattern`.
///
/// The lead time is the whole number of hours from `basetime` to
/// `validtime`.
pub fn parse_file_pattern(
    pattern: &str,
    basetime: DateTime<Utc>,
    validtime: DateTime<Utc>,
) -> String {
    let lead = (validtime - basetime).num_hours();
    pattern
        .replace("@YYYY@", &basetime.format("%Y").to_string())
        .replace("@YY@", &basetime.format("%y").to_string())
        .replace("@MM@", &basetime.format("%m").to_string())
        .replace("@DD@", &basetime.format("%d").to_string())
        .replace("@HH@", &basetime.format("%H").to_string())
        .replace("@LLLL@", &format!("{:04}", lead))
        .replace("@LLL@", &format!("{:03}", lead))
        .replace("@LL@", &format!("{:02}", lead))
        .replace("@L@", &lead.to_string())
}
