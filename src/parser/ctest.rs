//! C regression-test file: locate the body of `t_<name>`.

use crate::error::GenError;
use crate::model::{Function, InoutState, TestFunction};
use regex::Regex;

/// Build the test model for `func` from the C test source.
///
/// The body runs from the first line starting with `{` after the test's
/// signature to the first line starting with `}` or ` }`.
pub fn extract(source: &str, func: &Function) -> Result<TestFunction, GenError> {
    let pattern = format!(
        r"(?ms)\nstatic void t_{}\(.+?(^\{{.+?^\s?\}})",
        regex::escape(&func.pyname)
    );
    let re = Regex::new(&pattern)?;
    let caps = re
        .captures(source)
        .ok_or_else(|| GenError::TestNotFound(func.pyname.clone()))?;

    Ok(TestFunction {
        name: func.pyname.clone(),
        cname: func.name.clone(),
        nin: func.count(InoutState::In),
        ninout: func.count(InoutState::Inout),
        nout: func.count(InoutState::Out),
        body_list: func.has_body_list(),
        lines: caps[1].split('\n').map(str::to_string).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Argument, Dtype, FunctionDoc};
    use std::path::PathBuf;

    const SOURCE: &str = "#include \"erfa.h\"

static void t_anp(int *status)
/*
**  Test eraAnp function.
*/
{
   vvd(eraAnp(-0.1), 6.183185307179586477, 1e-12, \"eraAnp\", \"\", status);
}

static void t_anpm(int *status)
{
   vvd(eraAnpm(-4.0), 2.283185307179586477, 1e-12, \"eraAnpm\", \"\", status);
}
";

    fn anp() -> Function {
        Function {
            name: "eraAnp".to_string(),
            pyname: "anp".to_string(),
            path: PathBuf::new(),
            prototype: "double eraAnp(double a)".to_string(),
            ret_type: "double".to_string(),
            args: vec![
                Argument {
                    name: "a".to_string(),
                    ctype: "double".to_string(),
                    shape: Vec::new(),
                    is_pointer: false,
                    inout_state: InoutState::In,
                    dtype: Dtype::Double,
                },
                Argument::return_value("double").unwrap(),
            ],
            doc: FunctionDoc::default(),
        }
    }

    #[test]
    fn body_between_braces() {
        let t = extract(SOURCE, &anp()).unwrap();
        assert_eq!(t.lines.first().map(String::as_str), Some("{"));
        assert_eq!(t.lines.last().map(String::as_str), Some("}"));
        assert_eq!(t.lines.len(), 3);
        assert!(t.lines[1].contains("eraAnp(-0.1)"));
        assert_eq!((t.nin, t.ninout, t.nout), (1, 0, 0));
        assert!(!t.body_list);
    }

    #[test]
    fn name_prefix_does_not_match_longer_test() {
        let mut f = anp();
        f.pyname = "anpm".to_string();
        f.name = "eraAnpm".to_string();
        let t = extract(SOURCE, &f).unwrap();
        assert!(t.lines[1].contains("eraAnpm(-4.0)"));
    }

    #[test]
    fn missing_test_is_fatal() {
        let mut f = anp();
        f.pyname = "ir".to_string();
        assert!(matches!(extract(SOURCE, &f), Err(GenError::TestNotFound(_))));
    }
}
