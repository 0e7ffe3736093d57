//! C test body → Python test body.
//!
//! Heuristic, not a C translator. Each statement of the test is run through
//! a fixed table of rules in priority order; the first rule whose matcher
//! accepts the statement rewrites it into zero or more Python lines. A
//! statement no rule accepts is an error, so an unexpected idiom in the C
//! tests stops the run instead of producing a silently wrong test.
//!
//! Declaration rules see the raw statement. The remaining rules see it after
//! the fixed textual idioms below have been substituted.

use crate::error::GenError;
use crate::model::{Dtype, RecordKind, TestFunction};
use crate::parser::argument;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Module the translated calls and dtypes are taken from.
pub const DEFAULT_PREFIX: &str = "erfa_ufunc.";

/// Literal substitutions applied to every non-declaration statement.
const IDIOMS: &[(&str, &str)] = &[
    ("ERFA_", "erfa."),
    ("(void)", ""),
    ("(int)", ""),
    ("pv[0]", "pv['p']"),
    ("pv[1]", "pv['v']"),
    // sign character comparisons, e.g. viv(s, '-', ...)
    ("s, '-'", "s[0], b'-'"),
    ("s, '+'", "s[0], b'+'"),
];

/// Calls whose status is kept as an extra `j` output.
const STATUS_HELPERS: &[&str] = &["atioq", "atio13", "apio13"];

static RE_BODY_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^n = \d+$").unwrap());

static RE_ARRAY_INIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^double (\w+)\[\] = \{(.*)\}$").unwrap());

static RE_DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(double|int|char|eraASTROM|eraLDBODY)\s+(.+)$").unwrap());

static RE_CHECK_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v\w*\(").unwrap());

static RE_ERA_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bera[A-Z]\w*\s*\(").unwrap());

// -- Rule table ---------------------------------------------------------------

type Matcher = fn(&Translator<'_>, &str) -> bool;
type Rewriter = fn(&mut Translator<'_>, &str) -> Result<Vec<String>, GenError>;

struct Rule {
    matches: Matcher,
    rewrite: Rewriter,
}

const DECLARATION_RULES: &[Rule] = &[
    // n = 3 (body count)
    Rule {
        matches: |t, s| t.test.body_list && RE_BODY_COUNT.is_match(s),
        rewrite: |_, _| Ok(Vec::new()),
    },
    // double a = 1.0, b = 2.0
    Rule {
        matches: |_, s| s.starts_with("double") && s.contains('='),
        rewrite: initialized_doubles,
    },
    // double a, r[3][3]
    Rule {
        matches: |_, s| RE_DECLARATION.is_match(s),
        rewrite: declare_arrays,
    },
];

const STATEMENT_RULES: &[Rule] = &[
    // vvd(eraFoo(a), ...)
    Rule {
        matches: |_, s| RE_CHECK_CALL.is_match(s),
        rewrite: check_call,
    },
    // j = eraFoo(a, b, &c)
    Rule {
        matches: |t, s| s.contains(&format!("{}(", t.test.cname)),
        rewrite: call_under_test,
    },
    // eraApco13(..., &astrom, &eo)
    Rule {
        matches: |_, s| s.starts_with("eraA"),
        rewrite: astrometry_helper,
    },
    // eraS06(d1, d2, x, y)
    Rule {
        matches: |_, s| s.starts_with("eraS"),
        rewrite: time_helper,
    },
    // x = 1.0; C calls and address-of have no Python reading here
    Rule {
        matches: |_, s| s.contains('=') && !s.contains('&') && !RE_ERA_CALL.is_match(s),
        rewrite: assignment,
    },
];

// -- Translator ---------------------------------------------------------------

/// Translation state for one test function.
pub struct Translator<'a> {
    test: &'a TestFunction,
    prefix: &'a str,
    /// Dtype tag of every array variable declared so far.
    var_dtypes: HashMap<String, String>,
    astrom_allocated: bool,
}

/// Translate `test` with the default module prefix.
pub fn translate(test: &TestFunction) -> Result<Vec<String>, GenError> {
    Translator::new(test, DEFAULT_PREFIX).run()
}

impl<'a> Translator<'a> {
    pub fn new(test: &'a TestFunction, prefix: &'a str) -> Self {
        Translator {
            test,
            prefix,
            var_dtypes: HashMap::new(),
            astrom_allocated: false,
        }
    }

    pub fn run(mut self) -> Result<Vec<String>, GenError> {
        let mut out = Vec::new();
        for statement in statements(&self.test.name, &self.test.lines)? {
            if let Some(lines) = self.apply(DECLARATION_RULES, &statement)? {
                out.extend(lines);
                continue;
            }
            let line = apply_idioms(&statement);
            match self.apply(STATEMENT_RULES, &line)? {
                Some(lines) => out.extend(lines),
                None => {
                    return Err(GenError::UntranslatableLine {
                        test: self.test.name.clone(),
                        line,
                    })
                }
            }
        }
        Ok(out)
    }

    fn apply(&mut self, rules: &[Rule], line: &str) -> Result<Option<Vec<String>>, GenError> {
        match rules.iter().find(|rule| (rule.matches)(&*self, line)) {
            Some(rule) => (rule.rewrite)(self, line).map(Some),
            None => Ok(None),
        }
    }

    fn module(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }
}

// -- Rewriters ---------------------------------------------------------------

fn initialized_doubles(_: &mut Translator<'_>, line: &str) -> Result<Vec<String>, GenError> {
    if let Some(caps) = RE_ARRAY_INIT.captures(line) {
        return Ok(vec![format!("{} = np.array([{}])", &caps[1], &caps[2])]);
    }
    let rest = line.strip_prefix("double").unwrap_or(line);
    Ok(rest.split(',').map(|part| part.trim().to_string()).collect())
}

/// Allocate every array variable; scalars need no Python declaration.
fn declare_arrays(t: &mut Translator<'_>, line: &str) -> Result<Vec<String>, GenError> {
    let (ctype, variables) = line.split_once(' ').unwrap_or((line, ""));
    let mut defines = Vec::new();
    for var in variables.split(',').map(str::trim) {
        let Some((name, dims)) = var.split_once('[') else {
            continue;
        };
        // iymdf and friends are outputs only
        if dims.starts_with("4]") {
            continue;
        }
        if ctype == "eraLDBODY" {
            let count = dims.split(']').next().unwrap_or_default();
            let tag = Dtype::Record(RecordKind::BodyList).tag();
            defines.push(format!(
                "{} = np.empty({}, {}).view(np.recarray)",
                name,
                count,
                t.module(&tag)
            ));
            t.var_dtypes.insert(name.to_string(), tag);
            continue;
        }

        let arg = argument::parse_declaration(&format!("{} {}", ctype, var))?;
        let shape = if arg.signature_shape() == "()" {
            "()".to_string()
        } else {
            python_tuple(&arg.shape)
        };
        let element = arg.dtype.element();
        let dtype = if element == "dt_double" {
            "float".to_string()
        } else {
            t.module(&element)
        };
        defines.push(format!("{} = np.empty({}, {})", arg.name, shape, dtype));
        t.var_dtypes.insert(arg.name, arg.dtype.tag());
    }
    Ok(defines)
}

fn check_call(t: &mut Translator<'_>, line: &str) -> Result<Vec<String>, GenError> {
    let name = &t.test.name;
    let line = line
        .replace(&t.test.cname, name)
        .replace(&format!("{}(", name), &format!("{}(", t.module(name)));
    Ok(vec![line])
}

fn call_under_test(t: &mut Translator<'_>, line: &str) -> Result<Vec<String>, GenError> {
    let line = line.replace(&t.test.cname, &t.module(&t.test.name));
    let (start, args) = split_call(&line);
    let mut args: Vec<String> = args.into_iter().map(strip_leading_zeros).collect();
    if t.test.body_list {
        drop_body_count(t, &line, &mut args)?;
    }

    let nin = t.test.nin + t.test.ninout;
    let nout = t.test.nout + t.test.ninout;
    let in_args: Vec<String> = args.iter().take(nin).map(|a| a.replace('&', "")).collect();
    let out_args: Vec<String> = if args.len() > t.test.nin {
        args[args.len().saturating_sub(nout)..]
            .iter()
            .map(|a| a.replace('&', ""))
            .collect()
    } else {
        Vec::new()
    };

    let call = if start.contains('=') {
        let mut targets = out_args.clone();
        targets.push(start.to_string());
        format!("{}({})", targets.join(", "), in_args.join(", "))
    } else {
        format!("{} = {}({})", out_args.join(", "), start, in_args.join(", "))
    };

    let mut lines = vec![call];
    if out_args.iter().any(|a| a == "astrom") {
        t.astrom_allocated = true;
        lines.push("astrom = astrom.view(np.recarray)".to_string());
    }
    Ok(lines)
}

/// The body count is inferred from the array length: remove the argument
/// right before the body list.
fn drop_body_count(t: &Translator<'_>, line: &str, args: &mut Vec<String>) -> Result<(), GenError> {
    let body_tag = Dtype::Record(RecordKind::BodyList).tag();
    let position = args
        .iter()
        .position(|a| t.var_dtypes.get(a) == Some(&body_tag));
    match position {
        Some(i) if i > 0 => {
            args.remove(i - 1);
            Ok(())
        }
        _ => Err(GenError::UntranslatableLine {
            test: t.test.name.clone(),
            line: line.to_string(),
        }),
    }
}

/// `eraA*` helpers: address-of arguments are the outputs.
fn astrometry_helper(t: &mut Translator<'_>, line: &str) -> Result<Vec<String>, GenError> {
    let line = line.replace("eraA", &t.module("a"));
    let (start, args) = split_call(&line);
    let (outs, ins): (Vec<&String>, Vec<&String>) = args.iter().partition(|a| a.contains('&'));
    let outs: Vec<String> = outs.iter().map(|a| a.replace('&', "")).collect();
    let ins: Vec<&str> = ins.iter().map(|a| a.as_str()).collect();
    if outs.iter().any(|a| a == "astrom") {
        t.astrom_allocated = true;
    }

    let mut line = format!("{} = {}({})", outs.join(", "), start, ins.join(", "));
    if STATUS_HELPERS.iter().any(|h| start.ends_with(h)) {
        line = line.replacen(" =", ", j =", 1);
    }
    Ok(vec![line])
}

/// `eraS*` helpers: a two-part date in, everything else out.
fn time_helper(t: &mut Translator<'_>, line: &str) -> Result<Vec<String>, GenError> {
    let line = line.replace("eraS", &t.module("s"));
    let (start, args) = split_call(&line);
    let split = args.len().min(2);
    Ok(vec![format!(
        "{} = {}({})",
        args[split..].join(", "),
        start,
        args[..split].join(", ")
    )])
}

fn assignment(t: &mut Translator<'_>, line: &str) -> Result<Vec<String>, GenError> {
    let mut line = line.replace("=  ", "= ");
    let mut lines = Vec::new();
    if line.starts_with("astrom") && !t.astrom_allocated {
        t.astrom_allocated = true;
        lines.push(format!(
            "astrom = np.zeros((), {}).view(np.recarray)",
            t.module("dt_eraASTROM")
        ));
    }
    // p/v access on pv variables not named `pv`
    if let Some((name, rest)) = line.split_once('[') {
        let is_pv = t.var_dtypes.get(name).is_some_and(|tag| tag == "dt_pv");
        let field = match rest.chars().next() {
            Some('0') => Some("'p'"),
            Some('1') => Some("'v'"),
            _ => None,
        };
        if let (true, Some(field)) = (is_pv, field) {
            line = format!("{}[{}{}", name, field, &rest[1..]);
        }
    }
    lines.push(line);
    Ok(lines)
}

// -- Helpers ------------------------------------------------------------------

/// Logical statements: lines merged up to a trailing `;`, braces, blank
/// lines and `/* ... */` comments dropped, the `;` stripped.
///
/// Text left over without a closing `;` is an error for `test`.
fn statements(test: &str, lines: &[String]) -> Result<Vec<String>, GenError> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_comment = false;
    for part in lines {
        let part = strip_comments(part, &mut in_comment);
        let part = part.trim();
        if matches!(part, "" | "{" | "}") {
            continue;
        }
        current.push_str(part);
        current.push(' ');
        if part.ends_with(';') {
            let statement = current.trim();
            statements.push(statement[..statement.len() - 1].trim_end().to_string());
            current.clear();
        }
    }
    if !current.trim().is_empty() {
        return Err(GenError::UntranslatableLine {
            test: test.to_string(),
            line: current.trim().to_string(),
        });
    }
    Ok(statements)
}

/// Remove comment text from one line, tracking comments spanning lines.
fn strip_comments(line: &str, in_comment: &mut bool) -> String {
    let mut out = String::new();
    let mut rest = line;
    loop {
        if *in_comment {
            match rest.find("*/") {
                Some(end) => {
                    rest = &rest[end + 2..];
                    *in_comment = false;
                }
                None => return out,
            }
        } else {
            match rest.find("/*") {
                Some(start) => {
                    out.push_str(&rest[..start]);
                    rest = &rest[start + 2..];
                    *in_comment = true;
                }
                None => {
                    out.push_str(rest);
                    return out;
                }
            }
        }
    }
}

fn apply_idioms(statement: &str) -> String {
    IDIOMS
        .iter()
        .fold(statement.to_string(), |line, (from, to)| line.replace(from, to))
        .trim()
        .to_string()
}

/// Split `start(a, b, c)` into `start` and its trimmed arguments.
fn split_call(line: &str) -> (&str, Vec<String>) {
    let (start, arguments) = line.split_once('(').unwrap_or((line, ""));
    let arguments = arguments.strip_suffix(')').unwrap_or(arguments);
    let args = if arguments.trim().is_empty() {
        Vec::new()
    } else {
        arguments.split(',').map(|a| a.trim().to_string()).collect()
    };
    (start, args)
}

/// Python rejects `06`: drop leading zeros from integer literals.
fn strip_leading_zeros(arg: String) -> String {
    let mut s = arg.as_str();
    while s.len() > 1 && s.starts_with('0') && s.as_bytes()[1].is_ascii_digit() {
        s = &s[1..];
    }
    s.to_string()
}

/// Python tuple literal for a shape: `(3,)`, `(3, 3)`.
fn python_tuple(shape: &[usize]) -> String {
    match shape {
        [single] => format!("({},)", single),
        _ => format!(
            "({})",
            shape.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
        ),
    }
}
