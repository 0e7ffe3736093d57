//! Fatal generator errors.
//!
//! Every variant aborts the run. They split into two families: format
//! mismatches (the upstream text convention changed and a human has to
//! update either the sources or the rules here) and discovery failures (a
//! name or file the header promised is not where it should be).

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum GenError {
    /// A record's member rows were not documented in the expected order.
    SkipOrder { expected: String, found: String },

    /// A (ctype, shape) pair with no dtype rule.
    UnsupportedType { ctype: String, shape: Vec<usize> },

    /// A parameter string that is not `ctype name[dims]`.
    MalformedArgument(String),

    /// A status-code line whose code is neither an integer nor `else`.
    MalformedStatusCode(String),

    /// A function with parameters whose doc has no argument section at all.
    MissingSection { function: String },

    /// A prototype parameter with no entry in any doc section.
    UndocumentedArgument { function: String, argument: String },

    /// A test statement no translation rule recognises.
    UntranslatableLine { test: String, line: String },

    /// The source root (directory or single file) does not exist.
    SourceNotFound(PathBuf),

    /// No prototype followed by a comment block for `name` in `path`.
    PrototypeNotFound { name: String, path: PathBuf },

    /// Single-file layout: no line starts with the header's declaration prefix.
    MatchLineNotFound { line: String, path: PathBuf },

    /// Single-file layout: the header block that listed `name` has no line for it.
    DeclarationNotFound(String),

    /// No `static void t_<name>(` body in the C test file.
    TestNotFound(String),

    Regex(regex::Error),
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenError::SkipOrder { expected, found } => write!(
                f,
                "expected to skip record member '{}' but '{}' encountered",
                expected, found
            ),
            GenError::UnsupportedType { ctype, shape } => {
                write!(f, "ctype {} with shape {:?} not recognized", ctype, shape)
            }
            GenError::MalformedArgument(def) => {
                write!(f, "cannot parse argument definition '{}'", def)
            }
            GenError::MalformedStatusCode(line) => {
                write!(f, "cannot parse status code line '{}'", line)
            }
            GenError::MissingSection { function } => write!(
                f,
                "{}: documentation has no Given/Returned section",
                function
            ),
            GenError::UndocumentedArgument { function, argument } => write!(
                f,
                "{}: argument '{}' is not documented as input or output",
                function, argument
            ),
            GenError::UntranslatableLine { test, line } => {
                write!(f, "t_{}: no translation rule for '{}'", test, line)
            }
            GenError::SourceNotFound(path) => {
                write!(f, "source not found: {}", path.display())
            }
            GenError::PrototypeNotFound { name, path } => write!(
                f,
                "prototype of {} not found in {}",
                name,
                path.display()
            ),
            GenError::MatchLineNotFound { line, path } => write!(
                f,
                "could not find the match line \"{}\" in {}",
                line,
                path.display()
            ),
            GenError::DeclarationNotFound(name) => {
                write!(f, "no header declaration line for {}", name)
            }
            GenError::TestNotFound(name) => {
                write!(f, "test function t_{} not found", name)
            }
            GenError::Regex(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for GenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenError::Regex(e) => Some(e),
            _ => None,
        }
    }
}

impl From<regex::Error> for GenError {
    fn from(e: regex::Error) -> Self {
        GenError::Regex(e)
    }
}
