//! Constants header parser: `#define ERFA_<NAME> <value>` groups.

use crate::model::Constant;
use regex::Regex;
use std::sync::LazyLock;

static RE_DEFINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#define (ERFA_\w+?) (.+?)$").unwrap());

static RE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\* (.+?) \*/\n").unwrap());

const PREFIX: &str = "ERFA_";

/// Parse every constant in the header, in file order.
///
/// Blank lines separate groups; each group's comments document all of its
/// defines.
pub fn parse(header: &str) -> Vec<Constant> {
    let mut constants = Vec::new();
    for chunk in header.split("\n\n") {
        let defines: Vec<_> = RE_DEFINE.captures_iter(chunk).collect();
        if defines.is_empty() {
            continue;
        }
        let doc = RE_COMMENT
            .captures_iter(chunk)
            .map(|c| c[1].to_string())
            .collect::<Vec<_>>()
            .join(" ");
        for caps in defines {
            constants.push(Constant {
                name: caps[1].replace(PREFIX, ""),
                value: caps[2].trim_end().replace(PREFIX, ""),
                doc: doc.clone(),
            });
        }
    }
    constants
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_define_with_comment() {
        let constants = parse("/* comment */\n#define ERFA_DPI 3.141592653589793\n");
        assert_eq!(
            constants,
            [Constant {
                name: "DPI".to_string(),
                value: "3.141592653589793".to_string(),
                doc: "comment".to_string(),
            }]
        );
    }

    #[test]
    fn group_shares_joined_doc() {
        let header = "/* Pi */\n#define ERFA_DPI (3.141592653589793238462643)\n\n\
                      /* 2Pi */\n/* twice */\n#define ERFA_D2PI (6.283185307179586476925287)\n\
                      #define ERFA_DR2D (180.0/ERFA_DPI)\n";
        let constants = parse(header);
        assert_eq!(constants.len(), 3);
        assert_eq!(constants[0].doc, "Pi");
        assert_eq!(constants[1].doc, "2Pi twice");
        assert_eq!(constants[2].doc, "2Pi twice");
        assert_eq!(constants[2].value, "(180.0/DPI)");
    }

    #[test]
    fn function_like_macros_are_ignored() {
        let header = "/* max */\n#define ERFA_GMAX(A,B) (((A)>(B))?(A):(B))\n";
        assert!(parse(header).is_empty());
    }

    #[test]
    fn chunk_without_defines_is_skipped() {
        assert!(parse("#ifndef ERFAMHDEF\n\n/* nothing */\n").is_empty());
    }
}
