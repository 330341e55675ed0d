//! Header metadata lookup over GROBID's TEI output.
//!
//! GROBID answers `processHeaderDocument` with a TEI document shaped roughly like:
//! ```xml
//! <TEI xmlns="http://www.tei-c.org/ns/1.0">
//!   <teiHeader>
//!     <fileDesc>
//!       <titleStmt><title level="a" type="main">Some Paper</title></titleStmt>
//!       <publicationStmt><date type="published" when="2019">2019</date></publicationStmt>
//!       <sourceDesc><biblStruct><analytic>
//!         <author><persName><forename>Jane</forename><surname>Doe</surname></persName></author>
//!       </analytic></biblStruct></sourceDesc>
//!     </fileDesc>
//!   </teiHeader>
//! </TEI>
//! ```
//!
//! Elements are matched on their local name, so `tei:persName` and `persName`
//! are the same element. The walk is a single streaming pass; nothing is kept
//! beyond the open-element stack and the three fields being collected.

use std::collections::HashSet;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

use crate::record::ExtractedRecord;

/// The TEI text could not be read as a well-formed XML document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("document is empty")]
    Empty,
    #[error("malformed XML at byte {position}: {reason}")]
    Malformed { position: u64, reason: String },
}

impl ParseError {
    /// The record reported in place of a parsed one: every field "Not Found".
    pub fn fallback(&self) -> ExtractedRecord {
        ExtractedRecord::not_found()
    }
}

/// A record plus the parse failure that forced it to the sentinel values, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub record: ExtractedRecord,
    pub parse_error: Option<ParseError>,
}

/// Parse TEI text into a record, degrading to all "Not Found" on malformed input.
///
/// Never fails: the parse error, if any, is returned alongside the fallback record.
pub fn extract_record(tei_xml: &str) -> Extraction {
    match parse_tei(tei_xml) {
        Ok(record) => Extraction {
            record,
            parse_error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "failed to parse TEI returned by GROBID");
            Extraction {
                record: e.fallback(),
                parse_error: Some(e),
            }
        }
    }
}

/// Parse TEI text into a record.
///
/// Lookup rules:
/// - title: direct text of the first `title` whose parent is `titleStmt`;
/// - authors: full text of every `persName`, falling back to `orgName` when no
///   person name has any text, de-duplicated in document order;
/// - year: first `date` whose direct text contains an ASCII digit.
///
/// Each rule falls back to "Not Found" on its own; only malformed markup is an error.
pub fn parse_tei(tei_xml: &str) -> Result<ExtractedRecord, ParseError> {
    let tei_xml = tei_xml.trim_start_matches('\u{feff}');
    if tei_xml.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let mut reader = Reader::from_str(tei_xml);
    let mut walk = Walk::default();

    loop {
        let position = reader.buffer_position() as u64;
        let malformed = move |reason: String| ParseError::Malformed { position, reason };

        match reader.read_event() {
            Ok(Event::Start(e)) => {
                check_start_tag(&e).map_err(malformed)?;
                walk.open(e.local_name().as_ref()).map_err(malformed)?;
            }
            Ok(Event::Empty(e)) => {
                check_start_tag(&e).map_err(malformed)?;
                walk.open(e.local_name().as_ref()).map_err(malformed)?;
                walk.close().map_err(malformed)?;
            }
            Ok(Event::End(_)) => {
                walk.close().map_err(malformed)?;
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|err| malformed(err.to_string()))?;
                walk.text(&text).map_err(malformed)?;
            }
            Ok(Event::CData(e)) => {
                let bytes = e.into_inner();
                let text = std::str::from_utf8(&bytes).map_err(|err| malformed(err.to_string()))?;
                walk.text(text).map_err(malformed)?;
            }
            Ok(Event::Comment(_)) | Ok(Event::PI(_)) => walk.child_node(),
            Ok(Event::Decl(_)) | Ok(Event::DocType(_)) => {}
            Ok(Event::Eof) => break,
            Err(e) => return Err(malformed(e.to_string())),
        }
    }

    walk.finish().map_err(|reason| ParseError::Malformed {
        position: reader.buffer_position() as u64,
        reason,
    })
}

/// The reader only splits tags; names and attributes are checked here.
fn check_start_tag(e: &BytesStart<'_>) -> Result<(), String> {
    let name = e.name();
    if !is_xml_name(name.as_ref()) {
        return Err(format!(
            "invalid element name `{}`",
            String::from_utf8_lossy(name.as_ref())
        ));
    }
    for attr in e.attributes() {
        let attr = attr.map_err(|err| err.to_string())?;
        if !is_xml_name(attr.key.as_ref()) {
            return Err(format!(
                "invalid attribute name `{}`",
                String::from_utf8_lossy(attr.key.as_ref())
            ));
        }
        attr.unescape_value().map_err(|err| err.to_string())?;
    }
    Ok(())
}

/// ASCII approximation of the XML `Name` production; non-ASCII bytes pass.
fn is_xml_name(name: &[u8]) -> bool {
    let Some((&first, rest)) = name.split_first() else {
        return false;
    };
    let starts = |b: u8| b.is_ascii_alphabetic() || b == b'_' || b == b':' || b >= 0x80;
    starts(first)
        && rest
            .iter()
            .all(|&b| starts(b) || b.is_ascii_digit() || b == b'-' || b == b'.')
}

/// What an open element contributes to the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Other,
    Title,
    Date,
    /// Index into `Walk::persons` or `Walk::orgs`.
    Person(usize),
    Org(usize),
}

#[derive(Debug)]
struct Frame {
    local: Vec<u8>,
    role: Role,
    /// Text before the first child node.
    direct_text: String,
    direct_open: bool,
}

#[derive(Default)]
struct Walk {
    stack: Vec<Frame>,
    root_seen: bool,
    title_claimed: bool,
    title: Option<String>,
    year: Option<String>,
    /// Text fragments per `persName`, in document order of the start tags.
    persons: Vec<Vec<String>>,
    orgs: Vec<Vec<String>>,
}

impl Walk {
    fn open(&mut self, local: &[u8]) -> Result<(), String> {
        if self.stack.is_empty() {
            if self.root_seen {
                return Err("more than one root element".to_string());
            }
            self.root_seen = true;
        }
        self.child_node();

        let parent = self.stack.last().map(|f| f.local.as_slice());
        let role = match local {
            b"title" if parent == Some(b"titleStmt".as_slice()) && !self.title_claimed => {
                self.title_claimed = true;
                Role::Title
            }
            b"date" => Role::Date,
            b"persName" => {
                self.persons.push(Vec::new());
                Role::Person(self.persons.len() - 1)
            }
            b"orgName" => {
                self.orgs.push(Vec::new());
                Role::Org(self.orgs.len() - 1)
            }
            _ => Role::Other,
        };

        self.stack.push(Frame {
            local: local.to_vec(),
            role,
            direct_text: String::new(),
            direct_open: true,
        });
        Ok(())
    }

    fn close(&mut self) -> Result<(), String> {
        let mut frame = self
            .stack
            .pop()
            .ok_or_else(|| "closing tag without a matching opening tag".to_string())?;
        self.settle(&mut frame);
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<(), String> {
        let Some(top) = self.stack.last_mut() else {
            if text.trim().is_empty() {
                return Ok(());
            }
            return Err("text outside the root element".to_string());
        };
        if top.direct_open {
            top.direct_text.push_str(text);
        }

        // Names take every descendant text node, so feed all open name elements.
        for frame in &self.stack {
            match frame.role {
                Role::Person(i) => self.persons[i].push(text.to_string()),
                Role::Org(i) => self.orgs[i].push(text.to_string()),
                _ => {}
            }
        }
        Ok(())
    }

    /// A child element, comment or processing instruction ends the parent's direct text.
    fn child_node(&mut self) {
        if let Some(mut top) = self.stack.pop() {
            self.settle(&mut top);
            self.stack.push(top);
        }
    }

    fn settle(&mut self, frame: &mut Frame) {
        if !frame.direct_open {
            return;
        }
        frame.direct_open = false;
        let text = frame.direct_text.trim();
        match frame.role {
            Role::Title if !text.is_empty() => self.title = Some(text.to_string()),
            Role::Date if self.year.is_none() && text.chars().any(|c| c.is_ascii_digit()) => {
                self.year = Some(text.to_string());
            }
            _ => {}
        }
    }

    fn finish(self) -> Result<ExtractedRecord, String> {
        if let Some(open) = self.stack.last() {
            return Err(format!(
                "unexpected end of document inside <{}>",
                String::from_utf8_lossy(&open.local)
            ));
        }
        if !self.root_seen {
            return Err("no root element".to_string());
        }

        let mut authors = collect_names(&self.persons);
        if authors.is_empty() {
            authors = collect_names(&self.orgs);
        }
        Ok(ExtractedRecord::from_parts(self.title, authors, self.year))
    }
}

/// Join each name's text fragments, drop empty names, de-duplicate in order.
fn collect_names(names: &[Vec<String>]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|parts| {
            parts
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}
