// SPDX-License-Identifier: GPL-3.0-only

//! Line-based parsing of WhatsApp chat exports.
//!
//! This module turns the plain-text transcript produced by WhatsApp's
//! "export chat" feature into an ordered sequence of [`Message`] records.
//!
//! # Format Overview
//!
//! Every message starts with a header line:
//!
//! ```text
//! 13/01/18, 01:23 - Alice: Hello
//! ```
//!
//! The date/time portion varies by locale and platform: field order and
//! separators differ (`13/01/18`, `19-02-18`, `12.02.19`, `2016-06-27`),
//! iOS exports wrap the timestamp in square brackets, and some locales use
//! a 12-hour clock. System notices (encryption banners, subject changes)
//! look like headers but carry no `Author: ` segment.
//!
//! Messages containing newlines span several physical lines; every line
//! that does not match the header pattern is a continuation of the message
//! that precedes it.
//!
//! # Example
//!
//! ```
//! use wa2html::parser::{parse_transcript, ParseOptions};
//!
//! let text = "13/01/18, 01:23 - Alice: Hello\nworld\n13/01/18, 01:24 - Bob: Hi\n";
//! let messages = parse_transcript(text, &ParseOptions::default()).unwrap();
//!
//! assert_eq!(messages.len(), 2);
//! assert_eq!(messages[0].author.as_deref(), Some("Alice"));
//! assert_eq!(messages[0].text, "Hello\nworld");
//! ```

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use snafu::prelude::*;

/// Error type for transcript parsing failures.
///
/// Both variants are only produced under [`Strictness::Strict`]; lenient
/// parsing degrades the offending lines to continuations instead.
#[derive(Debug, Snafu)]
pub enum ParseError {
    /// A header-shaped line carried a timestamp that could not be parsed.
    #[snafu(display("line {line_number}: unrecognized timestamp {timestamp:?}"))]
    Timestamp {
        /// 1-based line number of the offending line.
        line_number: usize,
        /// The date/time text that failed to parse.
        timestamp: String,
    },

    /// A continuation line appeared before any message header.
    #[snafu(display("line {line_number}: content before the first message header: {line:?}"))]
    LeadingContent {
        /// 1-based line number of the offending line.
        line_number: usize,
        /// The offending line.
        line: String,
    },
}

/// A single message from the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// When the message was sent, as written in the export (no timezone).
    pub timestamp: NaiveDateTime,

    /// The sender's name, or `None` for system notices such as the
    /// end-to-end-encryption banner.
    pub author: Option<String>,

    /// The message body. Continuation lines are joined with `\n`.
    pub text: String,

    /// Filename of an exported media file, when the body is an
    /// attachment marker like `IMG-20180113-WA0001.jpg (file attached)`.
    pub attachment: Option<String>,
}

/// Field order for numeric dates without a four-digit leading year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateOrder {
    /// `13/01/18` is the 13th of January (most export locales).
    #[default]
    DayFirst,
    /// `1/13/18` is the 13th of January (US-style exports).
    MonthFirst,
}

/// How to treat lines that are malformed rather than mere continuations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Degrade malformed header-like lines to continuations and discard
    /// content preceding the first header.
    #[default]
    Lenient,
    /// Surface malformed lines as [`ParseError`]s.
    Strict,
}

/// Configuration for [`parse_transcript`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Date field order for regional export variants.
    pub date_order: DateOrder,
    /// Error policy for malformed lines.
    pub strictness: Strictness,
}

// The export header format keeps changing and every locale has its own
// date rules, so the pattern is deliberately loose: any three numeric
// fields, any of three separators, optional brackets, optional 12-hour
// suffix. Calendar validation happens when the timestamp is interpreted.
const DATETIME_RE: &str = r"^\[?(?P<date>\d+[-./]\d+[-./]\d+),? (?P<time>[\d:]+(?: [AP]M)?)\]?(?: - |: | )";

static MESSAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("{DATETIME_RE}(?P<author>[^:]+): (?P<body>.*)$")).unwrap());

static NOTICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("{DATETIME_RE}(?P<body>.*)$")).unwrap());

static ATTACHMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<file>\S+\.\w+) \((?:file attached|attached file|archivo adjunto)\)$")
        .unwrap()
});

/// Parses a transcript into an ordered list of messages.
///
/// This is the main entry point for parsing. A leading UTF-8 BOM is
/// stripped before scanning. Records are returned in input order;
/// timestamps are not required to be non-decreasing and are never used
/// to reorder.
///
/// # Errors
///
/// Under [`Strictness::Strict`], returns an error for a header-shaped
/// line with an unparseable timestamp or for content preceding the first
/// header. Lenient parsing never fails.
///
/// # Example
///
/// ```
/// use wa2html::parser::{parse_transcript, ParseOptions};
///
/// let messages = parse_transcript(
///     "1/1/20, 10:00 - Alice: Hello\nworld\n",
///     &ParseOptions::default(),
/// )
/// .unwrap();
///
/// assert_eq!(messages.len(), 1);
/// assert_eq!(messages[0].text, "Hello\nworld");
/// ```
pub fn parse_transcript(input: &str, opts: &ParseOptions) -> Result<Vec<Message>, ParseError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut messages = Vec::new();
    let mut current: Option<Message> = None;

    for (index, raw) in input.lines().enumerate() {
        let line_number = index + 1;
        let line = raw.trim_end_matches('\r');

        if let Some((timestamp, author, body)) = match_header(line, line_number, opts)? {
            if let Some(done) = current.take() {
                messages.push(done);
            }
            current = Some(Message {
                timestamp,
                author,
                attachment: detect_attachment(body),
                text: body.to_owned(),
            });
        } else if let Some(message) = current.as_mut() {
            message.text.push('\n');
            message.text.push_str(line.trim());
        } else {
            ensure!(
                matches!(opts.strictness, Strictness::Lenient),
                LeadingContentSnafu {
                    line_number,
                    line: line.to_owned(),
                }
            );
        }
    }

    messages.extend(current);
    Ok(messages)
}

/// Matches a line against the header patterns.
///
/// Returns the parsed timestamp, the author (`None` for the authorless
/// notice form), and the remainder of the line. `Ok(None)` means the line
/// is a continuation.
fn match_header<'a>(
    line: &'a str,
    line_number: usize,
    opts: &ParseOptions,
) -> Result<Option<(NaiveDateTime, Option<String>, &'a str)>, ParseError> {
    // The authored form takes priority: the notice form would otherwise
    // swallow "Alice: Hello" whole as a body.
    let (captures, has_author) = if let Some(c) = MESSAGE_RE.captures(line) {
        (c, true)
    } else if let Some(c) = NOTICE_RE.captures(line) {
        (c, false)
    } else {
        return Ok(None);
    };

    let date = captures.name("date").map_or("", |m| m.as_str());
    let time = captures.name("time").map_or("", |m| m.as_str());
    let body = captures.name("body").map_or("", |m| m.as_str());
    let author = has_author.then(|| captures["author"].to_owned());

    match parse_timestamp(date, time, opts.date_order) {
        Some(timestamp) => Ok(Some((timestamp, author, body))),
        None => {
            ensure!(
                matches!(opts.strictness, Strictness::Lenient),
                TimestampSnafu {
                    line_number,
                    timestamp: format!("{date} {time}"),
                }
            );
            Ok(None)
        }
    }
}

fn parse_timestamp(date: &str, time: &str, order: DateOrder) -> Option<NaiveDateTime> {
    Some(NaiveDateTime::new(
        parse_date(date, order)?,
        parse_time(time)?,
    ))
}

/// Interprets a numeric date like `13/01/18`, `19-02-18`, or `2016-06-27`.
///
/// A four-digit leading field means year-month-day order; otherwise the
/// configured [`DateOrder`] applies and the trailing field is the year.
fn parse_date(s: &str, order: DateOrder) -> Option<NaiveDate> {
    let fields: Vec<&str> = s.split(['-', '.', '/']).collect();
    let [first, second, third] = fields.as_slice() else {
        return None;
    };
    let numbers = [
        first.parse::<u32>().ok()?,
        second.parse::<u32>().ok()?,
        third.parse::<u32>().ok()?,
    ];

    let (year, month, day) = if first.len() == 4 {
        (numbers[0], numbers[1], numbers[2])
    } else {
        let year = if third.len() == 4 {
            numbers[2]
        } else {
            expand_year(numbers[2])
        };
        match order {
            DateOrder::DayFirst => (year, numbers[1], numbers[0]),
            DateOrder::MonthFirst => (year, numbers[0], numbers[1]),
        }
    };

    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
}

/// Expands a two-digit year: `< 70` lands in the 2000s, the rest in the 1900s.
const fn expand_year(year: u32) -> u32 {
    if year < 70 { 2000 + year } else { 1900 + year }
}

/// Interprets a clock time like `01:23`, `22:55:45`, or `8:04:08 AM`.
fn parse_time(s: &str) -> Option<NaiveTime> {
    let (clock, meridiem) = if let Some(rest) = s.strip_suffix(" AM") {
        (rest, Some(false))
    } else if let Some(rest) = s.strip_suffix(" PM") {
        (rest, Some(true))
    } else {
        (s, None)
    };

    let fields: Vec<u32> = clock
        .split(':')
        .map(|f| f.parse().ok())
        .collect::<Option<_>>()?;
    let (mut hour, minute, second) = match fields.as_slice() {
        &[h, m] => (h, m, 0),
        &[h, m, s] => (h, m, s),
        _ => return None,
    };

    match meridiem {
        Some(true) if hour != 12 => hour += 12,
        Some(false) if hour == 12 => hour = 0,
        _ => {}
    }

    NaiveTime::from_hms_opt(hour, minute, second)
}

/// Recognizes export attachment markers like
/// `IMG-20180113-WA0001.jpg (file attached)` in a message body.
fn detect_attachment(body: &str) -> Option<String> {
    ATTACHMENT_RE
        .captures(body)
        .map(|c| c["file"].to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Vec<Message> {
        parse_transcript(text, &ParseOptions::default()).unwrap()
    }

    fn strict() -> ParseOptions {
        ParseOptions {
            strictness: Strictness::Strict,
            ..Default::default()
        }
    }

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn accumulates_multiline_message() {
        let messages = parse("13/01/18, 01:23 - Fake Name: line1\nline2\n");

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].timestamp, ts(2018, 1, 13, 1, 23, 0));
        assert_eq!(messages[0].author.as_deref(), Some("Fake Name"));
        assert_eq!(messages[0].text, "line1\nline2");
    }

    #[test]
    fn header_finalizes_previous_message() {
        let messages = parse(
            "13/01/18, 01:23 - Fake Name: line1\nline2\n13/01/18, 01:24 - Name Two: single line\n",
        );

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "line1\nline2");
        assert_eq!(messages[1].author.as_deref(), Some("Name Two"));
        assert_eq!(messages[1].text, "single line");
        assert_eq!(messages[1].timestamp, ts(2018, 1, 13, 1, 24, 0));
    }

    #[test]
    fn one_record_per_header_line() {
        let messages = parse(
            "13/01/18, 01:23 - A: one\n13/01/18, 01:24 - A: two\n13/01/18, 01:25 - B: three\n",
        );

        assert_eq!(messages.len(), 3);
    }

    #[test]
    fn colon_in_body_does_not_start_a_record() {
        let messages =
            parse("13/01/18, 01:23 - Alice: see: this link\nnote: still the same message\n");

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "see: this link\nnote: still the same message");
    }

    #[test]
    fn empty_body_between_headers() {
        let messages = parse("13/01/18, 01:23 - Alice: \n13/01/18, 01:24 - Bob: hi\n");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "");
        assert_eq!(messages[1].text, "hi");
    }

    #[test]
    fn authorless_notice_has_no_author() {
        let messages = parse(
            "14/04/18, 22:08 - Nesta conversa, (…)\n14/04/18, 22:08 - Alguém: Olá!\n",
        );

        assert_eq!(messages.len(), 2);
        assert!(messages[0].author.is_none());
        assert_eq!(messages[0].text, "Nesta conversa, (…)");
        assert_eq!(messages[1].author.as_deref(), Some("Alguém"));
        assert_eq!(messages[1].text, "Olá!");
    }

    #[test]
    fn parses_dashed_date_variant() {
        let messages = parse(
            "19-02-18 17:02 - Los mensajes y llamadas en este chat ahora están \
             protegidos con cifrado de extremo a extremo.\n\
             19-02-18 17:02 - human1: Hola\n19-02-18 17:14 - human2: como estás?\n",
        );

        assert_eq!(messages.len(), 3);
        assert!(messages[0].author.is_none());
        assert_eq!(messages[1].timestamp, ts(2018, 2, 19, 17, 2, 0));
        assert_eq!(messages[1].author.as_deref(), Some("human1"));
        assert_eq!(messages[2].timestamp, ts(2018, 2, 19, 17, 14, 0));
    }

    #[test]
    fn parses_dotted_date_and_phone_number_author() {
        let messages = parse(
            "12.02.19, 14:22 - Сообщения в данной группе теперь защищены.\n\
             17.02.19, 12:28 - +7 982 111-11-11: Пётр,  ждём! Развязки\n",
        );

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].timestamp, ts(2019, 2, 12, 14, 22, 0));
        assert!(messages[0].author.is_none());
        assert_eq!(messages[1].author.as_deref(), Some("+7 982 111-11-11"));
        assert_eq!(messages[1].text, "Пётр,  ждём! Развязки");
    }

    #[test]
    fn parses_bracketed_datetime() {
        let messages = parse("[02-12-18 22:55:45] Ewout: Test\n");

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].timestamp, ts(2018, 12, 2, 22, 55, 45));
        assert_eq!(messages[0].author.as_deref(), Some("Ewout"));
        assert_eq!(messages[0].text, "Test");
    }

    #[test]
    fn parses_bracketed_datetime_sequence() {
        let messages = parse(
            "[02-12-18 22:55:45] Ewout: Test\n\
             [02-12-18 22:56:00] Ewout: Does this work?\n\
             [02-12-18 22:56:20] Ewout: Sending a message to myself\n",
        );

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].timestamp, ts(2018, 12, 2, 22, 56, 0));
        assert_eq!(messages[2].text, "Sending a message to myself");
    }

    #[test]
    fn parses_twelve_hour_clock() {
        let messages = parse("2016-06-27, 8:04:08 AM: Neil: Hi\n");

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].timestamp, ts(2016, 6, 27, 8, 4, 8));
        assert_eq!(messages[0].author.as_deref(), Some("Neil"));
        assert_eq!(messages[0].text, "Hi");
    }

    #[test]
    fn twelve_hour_boundaries() {
        assert_eq!(parse_time("12:00 AM"), NaiveTime::from_hms_opt(0, 0, 0));
        assert_eq!(parse_time("12:30 PM"), NaiveTime::from_hms_opt(12, 30, 0));
        assert_eq!(parse_time("1:05 PM"), NaiveTime::from_hms_opt(13, 5, 0));
    }

    #[test]
    fn expands_two_digit_years() {
        let messages = parse("01/01/99, 10:00 - A: old\n01/01/20, 10:00 - A: new\n");

        assert_eq!(messages[0].timestamp, ts(1999, 1, 1, 10, 0, 0));
        assert_eq!(messages[1].timestamp, ts(2020, 1, 1, 10, 0, 0));
    }

    #[test]
    fn month_first_order_swaps_fields() {
        let opts = ParseOptions {
            date_order: DateOrder::MonthFirst,
            ..Default::default()
        };
        let messages = parse_transcript("1/13/18, 10:00 - A: hi\n", &opts).unwrap();

        assert_eq!(messages[0].timestamp, ts(2018, 1, 13, 10, 0, 0));
    }

    #[test]
    fn rejects_non_dates() {
        assert!(parse_date("hissing cat", DateOrder::DayFirst).is_none());
        assert!(parse_date("", DateOrder::DayFirst).is_none());
        assert!(parse_date("02-12-18", DateOrder::DayFirst).is_some());
        assert!(parse_date("13/01/18", DateOrder::DayFirst).is_some());
    }

    #[test]
    fn leading_content_discarded_when_lenient() {
        let messages = parse("noise before the export\n13/01/18, 01:23 - A: hi\n");

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "hi");
    }

    #[test]
    fn leading_content_errors_when_strict() {
        let result = parse_transcript("noise before the export\n", &strict());

        assert!(matches!(
            result,
            Err(ParseError::LeadingContent { line_number: 1, .. })
        ));
    }

    #[test]
    fn bad_timestamp_becomes_continuation_when_lenient() {
        // Month 13 is header-shaped but not a calendar date.
        let messages = parse("13/01/18, 01:23 - A: hi\n13/13/18, 01:24 - B: bogus\n");

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "hi\n13/13/18, 01:24 - B: bogus");
    }

    #[test]
    fn bad_timestamp_errors_when_strict() {
        let result =
            parse_transcript("13/01/18, 01:23 - A: hi\n13/13/18, 99:99 - B: bogus\n", &strict());

        assert!(matches!(
            result,
            Err(ParseError::Timestamp { line_number: 2, .. })
        ));
    }

    #[test]
    fn strips_leading_bom() {
        let messages = parse("\u{feff}13/01/18, 01:23 - A: hi\n");

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].author.as_deref(), Some("A"));
    }

    #[test]
    fn strips_carriage_returns() {
        let messages = parse("13/01/18, 01:23 - A: hi\r\nsecond\r\n");

        assert_eq!(messages[0].text, "hi\nsecond");
    }

    #[test]
    fn detects_file_attachment() {
        let messages = parse("13/01/18, 01:23 - A: IMG-20180113-WA0001.jpg (file attached)\n");

        assert_eq!(
            messages[0].attachment.as_deref(),
            Some("IMG-20180113-WA0001.jpg")
        );
    }

    #[test]
    fn detects_localized_attachment_marker() {
        let messages = parse("13/01/18, 01:23 - A: PTT-20180113-WA0002.opus (archivo adjunto)\n");

        assert_eq!(
            messages[0].attachment.as_deref(),
            Some("PTT-20180113-WA0002.opus")
        );
    }

    #[test]
    fn plain_body_has_no_attachment() {
        let messages = parse("13/01/18, 01:23 - A: just text (not a file)\n");

        assert!(messages[0].attachment.is_none());
    }

    #[test]
    fn empty_input_yields_no_messages() {
        assert!(parse("").is_empty());
    }
}
