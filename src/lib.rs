// SPDX-License-Identifier: GPL-3.0-only

//! Convert WhatsApp chat exports to static HTML.
//!
//! This crate provides parsing and rendering functionality for transforming
//! the plain-text transcript produced by WhatsApp's "export chat" feature
//! into a single self-contained HTML document.
//!
//! # Overview
//!
//! WhatsApp exports a conversation as one text file with one header line
//! per message (`13/01/18, 01:23 - Alice: Hello`) and bare continuation
//! lines for messages containing newlines. This crate:
//!
//! 1. Scans the transcript line by line into typed message records
//! 2. Renders the records as an HTML page with an inline stylesheet
//!
//! # Example
//!
//! ```
//! use wa2html::{parser, renderer};
//!
//! let text = "13/01/18, 01:23 - Alice: Hello\nworld\n";
//! let messages = parser::parse_transcript(text, &parser::ParseOptions::default()).unwrap();
//! assert_eq!(messages.len(), 1);
//! assert_eq!(messages[0].text, "Hello\nworld");
//!
//! let html = renderer::render_transcript(&messages, &renderer::RenderOptions::default());
//! assert!(html.contains("Hello"));
//! ```
//!
//! # Modules
//!
//! - [`parser`]: line-based parsing of exported transcripts
//! - [`renderer`]: HTML generation with configurable output options

#![deny(missing_docs)]

pub mod parser;
pub mod renderer;
