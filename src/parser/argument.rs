//! C parameter parser: `ctype[*] name[dims]` into a classified Argument.

use crate::error::GenError;
use crate::model::*;

/// Parse one parameter of a prototype and classify it against the docs.
pub fn parse(definition: &str, doc: &FunctionDoc) -> Result<Argument, GenError> {
    let mut arg = parse_declaration(definition)?;
    arg.inout_state = classify(&arg.name, doc);
    Ok(arg)
}

/// Parse a parameter or variable declaration without classifying it.
///
/// Rules, in order: a `*`-prefixed name is a pointer; a trailing `[]` is a
/// pointer too; remaining `[N]` groups are the shape, outermost first.
pub fn parse_declaration(definition: &str) -> Result<Argument, GenError> {
    let malformed = || GenError::MalformedArgument(definition.to_string());

    let (ctype, ptr_name_arr) = definition.trim().rsplit_once(' ').ok_or_else(malformed)?;
    let ctype = ctype.trim();

    let (mut is_pointer, mut name_arr) = match ptr_name_arr.strip_prefix('*') {
        Some(rest) => (true, rest),
        None => (false, ptr_name_arr),
    };
    if let Some(rest) = name_arr.strip_suffix("[]") {
        is_pointer = true;
        name_arr = rest;
    }

    let (name, shape) = match name_arr.split_once('[') {
        Some((name, dims)) => {
            let dims = dims.strip_suffix(']').ok_or_else(malformed)?;
            let shape = dims
                .split("][")
                .map(|d| d.trim().parse::<usize>().map_err(|_| malformed()))
                .collect::<Result<Vec<_>, _>>()?;
            (name, shape)
        }
        None => (name_arr, Vec::new()),
    };
    if ctype.is_empty() || name.is_empty() {
        return Err(malformed());
    }

    Ok(Argument {
        name: name.to_string(),
        ctype: ctype.to_string(),
        dtype: Dtype::resolve(ctype, &shape, name)?,
        shape,
        is_pointer,
        inout_state: InoutState::Unset,
    })
}

/// Inputs only → `in`, outputs only → `out`, both → `inout`, neither → unset.
pub fn classify(name: &str, doc: &FunctionDoc) -> InoutState {
    let is_input = doc.inputs.iter().any(|d| d.documents(name));
    let is_output = doc.outputs.iter().any(|d| d.documents(name));
    match (is_input, is_output) {
        (true, true) => InoutState::Inout,
        (true, false) => InoutState::In,
        (false, true) => InoutState::Out,
        (false, false) => InoutState::Unset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(inputs: &[&str], outputs: &[&str]) -> FunctionDoc {
        let rows = |names: &[&str]| {
            names
                .iter()
                .map(|n| ArgumentDoc {
                    name: n.to_string(),
                    ctype: "double".to_string(),
                    doc: String::new(),
                })
                .collect()
        };
        FunctionDoc {
            inputs: rows(inputs),
            outputs: rows(outputs),
            ..Default::default()
        }
    }

    #[test]
    fn pv_array_shape() {
        let arg = parse_declaration("double pv[2][3]").unwrap();
        assert_eq!(arg.name, "pv");
        assert_eq!(arg.shape, [2, 3]);
        assert_eq!(arg.dtype, Dtype::Pv);
        assert!(!arg.is_pointer);
        assert_eq!(arg.size(), 6);
    }

    #[test]
    fn star_marks_pointer() {
        let arg = parse_declaration("double *djm0").unwrap();
        assert_eq!(arg.name, "djm0");
        assert!(arg.is_pointer);
        assert!(arg.shape.is_empty());
        assert_eq!(arg.name_for_call(), "_djm0");
    }

    #[test]
    fn empty_brackets_mark_pointer() {
        let arg = parse_declaration("eraLDBODY b[]").unwrap();
        assert_eq!(arg.name, "b");
        assert!(arg.is_pointer);
        assert!(arg.is_body_list());
        assert_eq!(arg.dtype.tag(), "dt_eraLDBODY");
    }

    #[test]
    fn body_list_call_passes_count_first() {
        let arg = parse_declaration("eraLDBODY *b").unwrap();
        assert_eq!(arg.name_for_call(), "nb, _b");
        assert_eq!(arg.signature_shape(), "(n)");
    }

    #[test]
    fn const_char_pointer() {
        let arg = parse_declaration("const char *scale").unwrap();
        assert_eq!(arg.ctype, "const char");
        assert_eq!(arg.dtype, Dtype::Bytes);
        assert_eq!(arg.dtype.view(), Some("dt_bytes12"));
    }

    #[test]
    fn int4_layout_by_name() {
        assert_eq!(parse_declaration("int idmsf[4]").unwrap().dtype, Dtype::Dmsf);
        assert!(matches!(
            parse_declaration("int iabcd[4]"),
            Err(GenError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn malformed_declarations() {
        assert!(matches!(
            parse_declaration("double"),
            Err(GenError::MalformedArgument(_))
        ));
        assert!(matches!(
            parse_declaration("double a[x]"),
            Err(GenError::MalformedArgument(_))
        ));
    }

    #[test]
    fn classification_uses_joined_names() {
        let d = doc(&["x,y", "r"], &["r", "z"]);
        assert_eq!(classify("y", &d), InoutState::In);
        assert_eq!(classify("r", &d), InoutState::Inout);
        assert_eq!(classify("z", &d), InoutState::Out);
        assert_eq!(classify("w", &d), InoutState::Unset);
    }

    #[test]
    fn parse_classifies() {
        let d = doc(&["rc2i"], &[]);
        let arg = parse("double rc2i[3][3]", &d).unwrap();
        assert_eq!(arg.inout_state, InoutState::In);
        assert_eq!(arg.dtype, Dtype::Matrix);
    }
}
