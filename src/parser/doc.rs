//! Documentation comment parser: "Given" / "Returned" sections.
//!
//! ERFA comments use a fixed layout:
//!
//! ```text
//! **  Given:
//! **     rc,dc  double     ICRS astrometric RA,Dec (radians)
//! **     astrom eraASTROM* star-independent astrometry parameters:
//! **      pmt    double       PM time interval (SSB, Julian years)
//! **      ...
//! **
//! **  Returned:
//! **     ri,di  double     CIRS RA,Dec (radians)
//! ```
//!
//! A section runs from its header to the first line ending in two spaces,
//! which after normalisation is the blank `**` separator line.

use crate::error::GenError;
use crate::model::*;
use regex::Regex;
use std::collections::VecDeque;
use std::sync::LazyLock;

// -- Regex patterns -----------------------------------------------------------

static RE_GIVEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)Given([^\n]*):.*?\n(.+?)  \n").unwrap());

static RE_GIVEN_RETURNED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)Given and returned([^\n]*):\n(.+?)  \n").unwrap());

static RE_RETURNED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)Returned([^\n]*):.*?\n(.+?)  \n").unwrap());

static RE_FUNCTION_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Returned \(function value\)([^\n]*):\n(.+?)  \n").unwrap()
});

// `   name   type   description`
static RE_ARG_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ +([^ ]+) +([^ ]+) +(.+)").unwrap());

// -- Public API ---------------------------------------------------------------

/// Parse the comment block that follows a prototype.
pub fn parse(raw: &str) -> Result<FunctionDoc, GenError> {
    let text = normalize(raw);
    let mut inferred_counts = Vec::new();

    let mut inputs = Vec::new();
    for re in [&*RE_GIVEN, &*RE_GIVEN_RETURNED] {
        if let Some(lines) = section(re, &text) {
            inputs.extend(argument_docs(lines, &mut inferred_counts)?);
        }
    }

    let mut outputs = Vec::new();
    for re in [&*RE_GIVEN_RETURNED, &*RE_RETURNED] {
        if let Some(lines) = section(re, &text) {
            outputs.extend(argument_docs(lines, &mut inferred_counts)?);
        }
    }
    inferred_counts.dedup();

    let ret = match section(&RE_FUNCTION_VALUE, &text) {
        Some(body) => Some(parse_return(body)?),
        None => None,
    };

    Ok(FunctionDoc {
        text,
        inputs,
        outputs,
        ret,
        inferred_counts,
    })
}

/// Parse one documentation row; `None` for anything else (blank, prose).
pub fn parse_argument_doc(line: &str) -> Option<ArgumentDoc> {
    let caps = RE_ARG_LINE.captures(line)?;
    Some(ArgumentDoc {
        name: caps[1].replace('*', ""),
        ctype: caps[2].to_string(),
        doc: caps[3].to_string(),
    })
}

// -- Helpers ------------------------------------------------------------------

/// Turn comment markers into plain indentation.
fn normalize(raw: &str) -> String {
    raw.replace("**", "      ")
        .replace("/*\n", "")
        .replace("*/", "")
        .replace("/*+\n", "")
        .replace("*  ", "        ")
        .replace("*\n", "\n")
}

fn section<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text).and_then(|c| c.get(2)).map(|m| m.as_str())
}

/// Collect the argument rows of one section, skipping record member rows.
fn argument_docs(
    body: &str,
    inferred_counts: &mut Vec<String>,
) -> Result<Vec<ArgumentDoc>, GenError> {
    let mut docs: Vec<ArgumentDoc> = Vec::new();
    let mut skip: VecDeque<&'static str> = VecDeque::new();

    for line in body.split('\n') {
        let Some(doc) = parse_argument_doc(line) else {
            continue;
        };
        if let Some(&expected) = skip.front() {
            if expected != doc.name {
                return Err(GenError::SkipOrder {
                    expected: expected.to_string(),
                    found: doc.name,
                });
            }
            skip.pop_front();
            continue;
        }
        if let Some(kind) = RecordKind::from_type(&doc.ctype) {
            if kind.takes_count() {
                if let Some(count) = docs.pop() {
                    inferred_counts.push(count.name);
                }
            }
            skip = kind.members().iter().copied().collect();
        }
        docs.push(doc);
    }

    Ok(docs)
}

/// Parse the "Returned (function value)" body, including any status table.
fn parse_return(body: &str) -> Result<ReturnDoc, GenError> {
    let infoline = body.split('\n').next().unwrap_or("").trim();
    let mut words = infoline.split_whitespace();
    let ctype = words.next().unwrap_or("").to_string();
    let description = words.next().unwrap_or("").to_string();

    let status_codes = if description.starts_with("status") {
        let table = body.find(':').map_or("", |i| &body[i + 1..]);
        Some(parse_status_codes(table)?)
    } else {
        None
    };

    Ok(ReturnDoc {
        ctype,
        description,
        status_codes,
    })
}

fn parse_status_codes(table: &str) -> Result<Vec<StatusCode>, GenError> {
    let mut codes: Vec<StatusCode> = Vec::new();
    for line in table.split('\n') {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((code, message)) = line.split_once(" = ") {
            let key = match code.trim() {
                "else" => StatusKey::Else,
                other => StatusKey::Code(
                    other
                        .parse()
                        .map_err(|_| GenError::MalformedStatusCode(line.to_string()))?,
                ),
            };
            codes.push(StatusCode {
                key,
                message: message.trim().to_string(),
            });
        } else if let Some(last) = codes.last_mut() {
            // continuation of the previous message
            last.message.push(' ');
            last.message.push_str(line);
        }
    }
    Ok(codes)
}
