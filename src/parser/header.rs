//! Master header scan: section-delimited groups of function declarations.

use crate::error::GenError;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

// `/* Section/Subsection */` followed by declarations up to a blank line
static RE_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\* (\w*)/(\w*) \*/\n(.*?)\n\n").unwrap());

static RE_DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s) (\w+)\(.*?\);").unwrap());

/// Section holding functions that are not part of the upstream library and
/// whose sources ship next to the templates.
pub const EXTRA_SECTION: &str = "Extra";

/// One `/* Section/Subsection */` group of the master header.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub section: String,
    pub subsection: String,
    /// Declaration text of the group, as written in the header.
    pub block: String,
    /// Declared function names, in header order.
    pub functions: Vec<String>,
}

impl Section {
    pub fn is_extra(&self) -> bool {
        self.section == EXTRA_SECTION
    }
}

/// Discover every section and its declared functions.
///
/// A name declared twice keeps its first occurrence; the duplicate is
/// reported on stderr and dropped.
pub fn discover(header: &str) -> Vec<Section> {
    let mut seen = HashSet::new();
    let mut sections = Vec::new();
    for caps in RE_SECTION.captures_iter(header) {
        let block = caps[3].to_string();
        let mut functions = Vec::new();
        for decl in RE_DECLARATION.captures_iter(&block) {
            let name = decl[1].to_string();
            if seen.insert(name.clone()) {
                functions.push(name);
            } else {
                eprintln!("warning: {} declared more than once, keeping the first", name);
            }
        }
        sections.push(Section {
            section: caps[1].to_string(),
            subsection: caps[2].to_string(),
            block,
            functions,
        });
    }
    sections
}

/// Text before `(` on the line declaring `name`, e.g. `int eraCal2jd`.
///
/// Used to find the definition in an amalgamated source file, where a
/// plain name search could hit a call of the function first.
pub fn declaration_prefix(block: &str, name: &str) -> Result<String, GenError> {
    let needle = format!("{}(", name);
    block
        .lines()
        .find(|line| line.contains(&needle))
        .and_then(|line| line.split('(').next())
        .map(|prefix| prefix.trim().to_string())
        .ok_or_else(|| GenError::DeclarationNotFound(name.to_string()))
}
