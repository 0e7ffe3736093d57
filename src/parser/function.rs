//! Prototype parser: locate a function's source and build its Function.

use crate::error::GenError;
use crate::model::*;
use crate::parser::{argument, doc};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static RE_PARAMETERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]+)\)").unwrap());

/// Un-prefixed lowercase name: `eraC2ixys` → `c2ixys`.
pub fn short_name(name: &str) -> String {
    name.rsplit_once("era")
        .map_or(name, |(_, rest)| rest)
        .to_lowercase()
}

/// Load `name` from `source`.
///
/// A directory means the standard layout with one `<short>.c` per function;
/// a file means all functions live in it. `match_line`, if given, skips the
/// file up to the first line starting with it, so a call of the function
/// earlier in the file is never mistaken for its definition.
pub fn load(name: &str, source: &Path, match_line: Option<&str>) -> Result<Function, GenError> {
    let pyname = short_name(name);
    let path = if source.is_dir() {
        source.join(format!("{}.c", pyname))
    } else {
        source.to_path_buf()
    };
    let content = fs::read_to_string(&path).map_err(|_| GenError::PrototypeNotFound {
        name: name.to_string(),
        path: path.clone(),
    })?;

    let content = match match_line {
        Some(prefix) => {
            let start = content
                .lines()
                .position(|l| l.starts_with(prefix))
                .ok_or_else(|| GenError::MatchLineNotFound {
                    line: prefix.to_string(),
                    path: path.clone(),
                })?;
            let rest: Vec<&str> = content.lines().skip(start).collect();
            format!("\n{}\n", rest.join("\n"))
        }
        None => content,
    };

    parse(name, &content, path)
}

/// Parse the first prototype of `name` followed by a comment block.
pub fn parse(name: &str, content: &str, path: PathBuf) -> Result<Function, GenError> {
    let pattern = format!(
        r"(?s)\n([^\n]+{} ?\([^)]+\)).+?(/\*.+?\*/)",
        regex::escape(name)
    );
    let re = Regex::new(&pattern)?;
    let not_found = || GenError::PrototypeNotFound {
        name: name.to_string(),
        path: path.clone(),
    };
    let caps = re.captures(content).ok_or_else(not_found)?;

    let prototype = caps[1].split_whitespace().collect::<Vec<_>>().join(" ");
    let doc = doc::parse(&caps[2])?;

    let ret_type = prototype
        .find(name)
        .map(|i| prototype[..i].trim().to_string())
        .ok_or_else(not_found)?;

    let params = RE_PARAMETERS
        .captures(&prototype)
        .map(|c| c[1].to_string())
        .ok_or_else(not_found)?;

    let mut args = Vec::new();
    for definition in params.split(',').map(str::trim) {
        if definition.is_empty() || definition == "void" {
            continue;
        }
        args.push(argument::parse(definition, &doc)?);
    }

    if !args.is_empty() && !doc.has_sections() {
        return Err(GenError::MissingSection {
            function: name.to_string(),
        });
    }
    for arg in &args {
        if arg.inout_state == InoutState::Unset && !doc.inferred_counts.contains(&arg.name) {
            return Err(GenError::UndocumentedArgument {
                function: name.to_string(),
                argument: arg.name.clone(),
            });
        }
    }

    if ret_type != "void" {
        args.push(Argument::return_value(&ret_type)?);
    }

    Ok(Function {
        name: name.to_string(),
        pyname: short_name(name),
        path,
        prototype,
        ret_type,
        args,
        doc,
    })
}
