//! Extraction of vote records from the XML documents the Senate site
//! publishes next to its roll-call pages.
//!
//! Documents are first folded into a loose [`Value`] tree with the same
//! conventions the site's XML has always been consumed with: attributes are
//! dropped, the root element is unwrapped, an element holding only text
//! becomes a string (untrimmed), an empty element becomes `""`, and repeated
//! children collapse into an array while a lone child stays a plain value.
//! Text that sits next to child elements is kept under the `_` key unless it
//! is only whitespace.

use crate::schema::{Tally, VoteSummary};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde_json::{Map, Value};
use thiserror::Error;

const TEXT_KEY: &str = "_";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed xml: {0}")]
    Malformed(#[from] quick_xml::Error),
    #[error("malformed xml: {0}")]
    Structure(String),
    #[error("missing `{0}` element")]
    MissingElement(&'static str),
}

struct Frame {
    name: String,
    children: Map<String, Value>,
    text: String,
}

impl Frame {
    fn new(name: String) -> Self {
        Self {
            name,
            children: Map::new(),
            text: String::new(),
        }
    }

    fn finish(self) -> (String, Value) {
        let value = if self.children.is_empty() {
            Value::String(self.text)
        } else {
            let mut children = self.children;
            // indentation between children is not content
            if !self.text.trim().is_empty() {
                children.insert(TEXT_KEY.to_string(), Value::String(self.text));
            }
            Value::Object(children)
        };
        (self.name, value)
    }
}

/// Parses an XML fragment into a loose tree (see module docs).
pub fn to_value(xml: &str) -> Result<Value, ParseError> {
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if stack.is_empty() && root.is_some() {
                    return Err(ParseError::Structure(
                        "more than one root element".to_string(),
                    ));
                }
                check_attributes(&e)?;
                stack.push(Frame::new(element_name(e.name().as_ref())));
            }
            Event::Empty(e) => {
                check_attributes(&e)?;
                let name = element_name(e.name().as_ref());
                attach(&mut stack, &mut root, name, Value::String(String::new()))?;
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| ParseError::Structure("unexpected end tag".to_string()))?;
                let (name, value) = frame.finish();
                attach(&mut stack, &mut root, name, value)?;
            }
            Event::Text(e) => {
                let text = e.unescape()?;
                push_text(&mut stack, &text)?;
            }
            Event::CData(e) => {
                let raw = e.into_inner();
                push_text(&mut stack, &String::from_utf8_lossy(&raw))?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ParseError::Structure(format!(
            "unclosed element <{}>",
            open.name
        )));
    }
    root.ok_or_else(|| ParseError::Structure("document has no root element".to_string()))
}

/// Attribute values are dropped, but broken attribute markup still makes the
/// document malformed.
fn check_attributes(start: &BytesStart<'_>) -> Result<(), ParseError> {
    for attr in start.attributes() {
        attr.map_err(quick_xml::Error::from)?;
    }
    Ok(())
}

fn element_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Text is kept as written; only whitespace may sit outside the root.
fn push_text(stack: &mut [Frame], text: &str) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(frame) => {
            frame.text.push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(ParseError::Structure(
            "text outside of the root element".to_string(),
        )),
    }
}

fn attach(
    stack: &mut [Frame],
    root: &mut Option<Value>,
    name: String,
    value: Value,
) -> Result<(), ParseError> {
    let Some(parent) = stack.last_mut() else {
        if root.is_some() {
            return Err(ParseError::Structure(
                "more than one root element".to_string(),
            ));
        }
        *root = Some(value);
        return Ok(());
    };

    match parent.children.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            parent.children.insert(name, value);
        }
    }
    Ok(())
}

/// Flattens a leaf to a string: missing or null is `""`, a string is
/// itself, anything structured is its JSON form.
fn scalar(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// One-or-many children of `container` named `key`, as a list.
fn entries<'a>(container: &'a Value, key: &str) -> Vec<&'a Value> {
    match container.get(key) {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(item) => vec![item],
        None => Vec::new(),
    }
}

/// Normalizes a vote's `issue` field.
///
/// The site emits either plain text or an anchor (`<issue><A>..</A></issue>`);
/// any other structure is kept as its JSON form.
pub fn normalize_issue(issue: Option<&Value>) -> String {
    match issue {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(map)) => match map.get("A") {
            Some(anchor) => scalar(Some(anchor)),
            None => Value::Object(map.clone()).to_string(),
        },
        Some(other) => other.to_string(),
    }
}

/// Extracts every vote listed in a session summary document
/// (`<vote_summary>` with `congress`, `session`, `congress_year`, `votes`).
/// Each record is tagged with the session's selector value `url`.
pub fn parse_summary_shape(xml: &str, url: &str) -> Result<Vec<VoteSummary>, ParseError> {
    let doc = to_value(xml)?;
    let votes = doc
        .get("votes")
        .ok_or(ParseError::MissingElement("votes"))?;

    let congress = scalar(doc.get("congress"));
    let session = scalar(doc.get("session"));
    let congress_year = scalar(doc.get("congress_year"));

    let summaries = entries(votes, "vote")
        .into_iter()
        .map(|vote| VoteSummary {
            congress: congress.clone(),
            congress_year: congress_year.clone(),
            issue: normalize_issue(vote.get("issue")),
            session: session.clone(),
            title: scalar(vote.get("title")),
            vote_number: scalar(vote.get("vote_number")),
            vote_date: scalar(vote.get("vote_date")),
            url: url.to_string(),
        })
        .collect();
    Ok(summaries)
}

/// Extracts member tallies from a vote detail document
/// (`<roll_call_vote>` with a `members` list), stamping each with the
/// parent vote's issue and title.
pub fn parse_member_shape(xml: &str, summary: &VoteSummary) -> Result<Vec<Tally>, ParseError> {
    let doc = to_value(xml)?;
    let members = doc
        .get("members")
        .ok_or(ParseError::MissingElement("members"))?;

    let tallies = entries(members, "member")
        .into_iter()
        .map(|member| Tally {
            issue: summary.issue.clone(),
            name: format!(
                "{} {}",
                scalar(member.get("first_name")),
                scalar(member.get("last_name"))
            ),
            party: scalar(member.get("party")),
            state: scalar(member.get("state")),
            title: summary.title.clone(),
            vote_cast: scalar(member.get("vote_cast")),
        })
        .collect();
    Ok(tallies)
}
