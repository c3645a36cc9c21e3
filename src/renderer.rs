// SPDX-License-Identifier: GPL-3.0-only

//! HTML rendering for parsed chat transcripts.
//!
//! This module transforms an ordered list of [`Message`] records into a
//! single self-contained HTML document: inline stylesheet, no external
//! assets beyond the exported media files a transcript may reference.
//!
//! # Output Format
//!
//! The rendered page contains:
//! - A title heading
//! - A date index linking to the first run of messages on each day
//! - Message runs: consecutive messages by the same author, shown with
//!   the author name and the run's first timestamp
//! - Attachment markers rendered as inline images or links
//!
//! Message order is preserved exactly; grouping is presentation only.
//! All author names and message text are HTML-escaped.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use wa2html::parser::Message;
//! use wa2html::renderer::{render_transcript, RenderOptions};
//!
//! let messages = vec![Message {
//!     timestamp: NaiveDate::from_ymd_opt(2018, 1, 13)
//!         .unwrap()
//!         .and_hms_opt(1, 23, 0)
//!         .unwrap(),
//!     author: Some("Alice".into()),
//!     text: "Hello".into(),
//!     attachment: None,
//! }];
//!
//! let html = render_transcript(&messages, &RenderOptions::default());
//! assert!(html.starts_with("<!DOCTYPE html>"));
//! assert!(html.contains("Alice"));
//! ```

use crate::parser::Message;
use chrono::{Datelike, NaiveDate};
use std::fmt::Write;

/// Configuration options for HTML rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Page title. Falls back to "Chat archive" when `None`; the CLI
    /// fills this in from the input filename.
    pub title: Option<String>,

    /// Whether to include the per-month date index at the top of the page.
    pub show_date_index: bool,

    /// Whether to show the first timestamp of each message run.
    pub show_timestamps: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            title: None,
            show_date_index: true,
            show_timestamps: true,
        }
    }
}

const STYLESHEET: &str = "\
body {
    font-family: Arial, Helvetica, sans-serif;
    font-size: 10px;
    background-color: rgb(255, 255, 255);
    display: flex;
    width: 100%;
    flex-direction: column;
}
@media screen and (min-width: 600px) {
    body, ol.users { flex-direction: column; width: 600px; }
}
ol.users {
    list-style-type: none;
    list-style-position: inside;
    margin: 1em;
    padding: 0;
    background-color: rgb(250, 240, 227);
    border-radius: 7px;
}
ol.messages {
    list-style-type: none;
    list-style-position: inside;
    margin: 1em;
    padding-left: 1.5em;
}
ol.messages li {
    font-size: 12px;
    margin: 0.3em 1em 0 0;
    padding: 0.8em;
    border: 1px solid rgb(225, 245, 212);
    border-radius: 7px;
    background: #dcf8c8;
}
li.notice ol.messages li {
    background: #f3f3f3;
    border-color: #e0e0e0;
    font-style: italic;
    color: rgb(90, 90, 90);
}
span.username {
    color: rgb(26, 26, 26);
    font-size: 14px;
    font-weight: bolder;
}
span.date {
    color: rgb(20, 20, 20);
    font-style: oblique;
    font-size: 10px;
}
li.attachment img {
    max-width: 400px;
    display: block;
}
ol.date-index {
    list-style: none;
}
";

/// Renders parsed messages as a complete HTML document.
///
/// This is the main entry point for rendering. Messages are emitted in
/// input order, grouped into runs of consecutive messages by the same
/// author.
#[must_use]
pub fn render_transcript(messages: &[Message], opts: &RenderOptions) -> String {
    let title = opts.title.as_deref().unwrap_or("Chat archive");
    let runs = author_runs(messages);

    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    out.push_str("<meta charset=\"utf-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    writeln!(out, "<title>{}</title>", escape_html(title)).unwrap();
    writeln!(out, "<style>\n{STYLESHEET}</style>").unwrap();
    out.push_str("</head>\n<body>\n");
    writeln!(out, "<h1>{}</h1>", escape_html(title)).unwrap();

    if opts.show_date_index {
        render_date_index(&mut out, &runs);
    }
    render_runs(&mut out, &runs, opts);

    out.push_str("</body>\n</html>\n");
    out
}

/// Splits messages into runs of consecutive records by the same author.
fn author_runs(messages: &[Message]) -> Vec<&[Message]> {
    let mut runs = Vec::new();
    let mut start = 0;
    for end in 1..=messages.len() {
        if end == messages.len() || messages[end].author != messages[start].author {
            runs.push(&messages[start..end]);
            start = end;
        }
    }
    runs
}

/// First date of each run, deduplicated, grouped by year-month.
fn month_index(runs: &[&[Message]]) -> Vec<((i32, u32), Vec<NaiveDate>)> {
    let mut dates: Vec<NaiveDate> = Vec::new();
    for run in runs {
        let date = run[0].timestamp.date();
        if dates.last() != Some(&date) {
            dates.push(date);
        }
    }

    let mut months: Vec<((i32, u32), Vec<NaiveDate>)> = Vec::new();
    for date in dates {
        let key = (date.year(), date.month());
        match months.last_mut() {
            Some((month, days)) if *month == key => days.push(date),
            _ => months.push((key, vec![date])),
        }
    }
    months
}

fn render_date_index(out: &mut String, runs: &[&[Message]]) {
    let months = month_index(runs);
    if months.is_empty() {
        return;
    }

    out.push_str("<ol class=\"date-index\">\n");
    for ((year, month), days) in months {
        write!(out, "<li>{year}-{month:02}").unwrap();
        for day in days {
            write!(out, " <a href=\"#{}\">{}</a>", day.format("%Y-%m-%d"), day.day()).unwrap();
        }
        out.push_str("</li>\n");
    }
    out.push_str("</ol>\n");
}

fn render_runs(out: &mut String, runs: &[&[Message]], opts: &RenderOptions) {
    out.push_str("<ol class=\"users\">\n");
    let mut anchored: Option<NaiveDate> = None;

    for run in runs {
        let first = &run[0];
        let date = first.timestamp.date();

        if first.author.is_some() {
            out.push_str("<li>\n");
        } else {
            out.push_str("<li class=\"notice\">\n");
        }

        // One anchor per calendar day, on the first run of that day.
        if anchored != Some(date) {
            writeln!(out, "<a id=\"{}\"></a>", date.format("%Y-%m-%d")).unwrap();
            anchored = Some(date);
        }

        if let Some(author) = &first.author {
            write!(out, "<span class=\"username\">{}</span>", escape_html(author)).unwrap();
        }
        if opts.show_timestamps {
            write!(
                out,
                " <span class=\"date\">{}</span>",
                first.timestamp.format("%Y-%m-%d %H:%M")
            )
            .unwrap();
        }
        out.push('\n');

        out.push_str("<ol class=\"messages\">\n");
        for message in run.iter() {
            render_message(out, message);
        }
        out.push_str("</ol>\n</li>\n");
    }
    out.push_str("</ol>\n");
}

fn render_message(out: &mut String, message: &Message) {
    if let Some(file) = &message.attachment {
        let href = escape_html(file);
        if is_image(file) {
            writeln!(
                out,
                "<li class=\"attachment\"><a href=\"{href}\" target=\"_blank\">\
                 <img src=\"{href}\" alt=\"{href}\"></a></li>"
            )
            .unwrap();
        } else {
            writeln!(
                out,
                "<li class=\"attachment\"><a href=\"{href}\" target=\"_blank\">{href}</a></li>"
            )
            .unwrap();
        }
        return;
    }

    writeln!(out, "<li>{}</li>", escape_html(&message.text).replace('\n', "<br>")).unwrap();
}

/// Returns `true` for filenames with a common image extension.
fn is_image(file: &str) -> bool {
    let Some((_, extension)) = file.rsplit_once('.') else {
        return false;
    };
    matches!(
        extension.to_ascii_lowercase().as_str(),
        "jpg" | "jpeg" | "png" | "gif" | "webp"
    )
}

/// Escapes text for safe embedding in HTML content and attribute values.
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
