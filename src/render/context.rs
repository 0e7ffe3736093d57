//! Template context: the model flattened into serializable records.
//!
//! Every value a template needs is precomputed here so the templates only
//! iterate and substitute. All fields are always present (`None` becomes
//! `null`), which keeps strict-mode rendering happy.

use crate::error::GenError;
use crate::model::*;
use crate::translate;
use serde::Serialize;

const INPUTS: &[InoutState] = &[InoutState::In, InoutState::Inout];
const OUTPUTS: &[InoutState] = &[
    InoutState::Inout,
    InoutState::Out,
    InoutState::Ret,
    InoutState::Stat,
];
const RETURNS: &[InoutState] = &[InoutState::Inout, InoutState::Out, InoutState::Ret];

#[derive(Debug, Serialize)]
pub struct ArgContext {
    pub name: String,
    pub ctype: String,
    pub dtype: String,
    pub element_dtype: String,
    pub view_dtype: Option<&'static str>,
    pub npy_type: String,
    pub cshape: String,
    pub shape: Vec<usize>,
    pub ndim: usize,
    pub size: usize,
    pub is_ptr: bool,
    pub is_return: bool,
    pub inout: &'static str,
    pub name_for_call: String,
    pub signature_shape: &'static str,
    /// Type column of the documentation row, e.g. `double[3][3]`.
    pub doc_ctype: String,
    pub doc: String,
}

impl ArgContext {
    fn new(arg: &Argument, doc: &FunctionDoc) -> Self {
        let (doc_ctype, description) = match (arg.is_return(), doc.describe(&arg.name)) {
            (false, Some(d)) => (d.ctype.clone(), d.doc.clone()),
            (true, _) => match &doc.ret {
                Some(ret) => (ret.ctype.clone(), ret.description.clone()),
                None => (arg.ctype.clone(), String::new()),
            },
            (false, None) => (arg.ctype.clone(), String::new()),
        };
        ArgContext {
            name: arg.name.clone(),
            ctype: arg.ctype.clone(),
            dtype: arg.dtype.tag(),
            element_dtype: arg.dtype.element(),
            view_dtype: arg.dtype.view(),
            npy_type: arg.npy_type(),
            cshape: arg.cshape(),
            shape: arg.shape.clone(),
            ndim: arg.ndim(),
            size: arg.size(),
            is_ptr: arg.is_pointer,
            is_return: arg.is_return(),
            inout: arg.inout_state.as_str(),
            name_for_call: arg.name_for_call(),
            signature_shape: arg.signature_shape(),
            doc_ctype,
            doc: description,
        }
    }
}

/// One pointer of the ufunc inner loop.
///
/// An in/out argument has two: `<name>_in` on the input side and `<name>`
/// on the output side, which is the one handed to the C function.
///
/// Arguments with core dimensions carry what the loop needs to fall back
/// to a contiguous local buffer when numpy hands it strided data.
#[derive(Debug, Serialize)]
pub struct LoopArg {
    pub var: String,
    pub ctype: String,
    pub cshape: String,
    pub npy_type: String,
    pub element_dtype: String,
    /// Index of the outer step in `steps[]`.
    pub step: usize,
    pub core: bool,
    pub body_list: bool,
    /// Suffix of the `copy_to_*`/`copy_from_*` helpers.
    pub copy_suffix: &'static str,
    /// Core steps (and body count) passed to the copy helpers.
    pub copy_args: String,
    /// C condition under which the buffer is used.
    pub copy_condition: String,
    pub copy_in: bool,
    pub copy_out: bool,
}

/// A core-dimension step, read after all outer steps.
#[derive(Debug, Serialize)]
pub struct CoreStep {
    pub var: String,
    pub index: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusContext {
    /// Python literal of the code: `-1` or `'else'`.
    pub key: String,
    pub message: String,
    /// True for codes that signal an error rather than a warning.
    pub is_error: bool,
}

#[derive(Debug, Serialize)]
pub struct FunctionContext {
    pub name: String,
    pub pyname: String,
    pub title: String,
    /// Title on one line, safe inside C and Python string literals.
    pub summary: String,
    pub doc: String,
    pub prototype: String,
    /// File name of the C source the function was read from.
    pub source: String,
    pub signature: Option<String>,
    pub user_dtype: Option<String>,
    pub python_call: String,
    pub ret_ctype: String,
    pub args: Vec<ArgContext>,
    pub inputs: Vec<ArgContext>,
    pub outputs: Vec<ArgContext>,
    /// Outputs handed back to the Python caller; the status is checked instead.
    pub returns: Vec<ArgContext>,
    pub inouts: Vec<String>,
    pub loop_args: Vec<LoopArg>,
    pub core_steps: Vec<CoreStep>,
    /// numpy type numbers of the loop, for plain ufuncs.
    pub loop_types: Vec<String>,
    /// Element dtypes of the loop, for ufuncs on structured dtypes.
    pub loop_dtypes: Vec<String>,
    pub call_args: Vec<String>,
    pub input_names: Vec<String>,
    pub output_names: Vec<String>,
    pub return_names: Vec<String>,
    pub status_codes: Option<Vec<StatusContext>>,
    pub has_status: bool,
    pub has_return: bool,
    pub nin: usize,
    pub nout: usize,
    pub nargs: usize,
    pub body_list: bool,
    /// Index of the body count in `dimensions[]`.
    pub body_dim: usize,
}

impl FunctionContext {
    pub fn new(func: &Function) -> Self {
        let arg_contexts = |states: &[InoutState]| -> Vec<ArgContext> {
            func.args_by_inout(states)
                .map(|a| ArgContext::new(a, &func.doc))
                .collect()
        };
        let names = |states: &[InoutState]| -> Vec<String> {
            func.args_by_inout(states).map(|a| a.name.clone()).collect()
        };

        let mut loop_args = Vec::new();
        for arg in func.args_by_inout(INPUTS) {
            let var = if arg.inout_state == InoutState::Inout {
                format!("{}_in", arg.name)
            } else {
                arg.name.clone()
            };
            loop_args.push(loop_arg(var, arg, loop_args.len(), true));
        }
        for arg in func.args_by_inout(OUTPUTS) {
            loop_args.push(loop_arg(arg.name.clone(), arg, loop_args.len(), false));
        }
        let (core_steps, body_dim) = core_layout(func, &loop_args);

        let status_codes = func
            .doc
            .ret
            .as_ref()
            .and_then(|r| r.status_codes.as_ref())
            .map(|codes| codes.iter().map(status_context).collect());

        FunctionContext {
            name: func.name.clone(),
            pyname: func.pyname.clone(),
            title: func.doc.title(),
            summary: summary(&func.doc.title()),
            doc: func.doc.cleaned_text(),
            prototype: func.prototype.clone(),
            source: func
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            signature: func.signature(),
            user_dtype: func.required_dtype().map(Dtype::tag),
            python_call: func.python_call(),
            ret_ctype: func.ret_type.clone(),
            args: arg_contexts(&[InoutState::In, InoutState::Inout, InoutState::Out]),
            inputs: arg_contexts(INPUTS),
            outputs: arg_contexts(OUTPUTS),
            returns: arg_contexts(RETURNS),
            inouts: names(&[InoutState::Inout]),
            loop_types: loop_args.iter().map(|l| l.npy_type.clone()).collect(),
            loop_dtypes: loop_args.iter().map(|l| l.element_dtype.clone()).collect(),
            nargs: loop_args.len(),
            loop_args,
            call_args: func
                .args
                .iter()
                .filter(|a| !a.is_return() && a.inout_state != InoutState::Unset)
                .map(Argument::name_for_call)
                .collect(),
            input_names: names(INPUTS),
            output_names: names(OUTPUTS),
            return_names: names(RETURNS),
            has_status: func.count(InoutState::Stat) > 0,
            has_return: func.ret_type != "void",
            status_codes,
            nin: func.args_by_inout(INPUTS).count(),
            nout: func.args_by_inout(OUTPUTS).count(),
            body_list: func.has_body_list(),
            body_dim,
            core_steps,
        }
    }
}

/// Core-dimension names of an operand, as they appear in the signature.
fn core_dims(dtype: &Dtype) -> &'static [&'static str] {
    match dtype {
        Dtype::Vector => &["3"],
        Dtype::Matrix => &["3", "3"],
        Dtype::Record(RecordKind::BodyList) => &["n"],
        _ => &[],
    }
}

fn loop_arg(var: String, arg: &Argument, step: usize, input: bool) -> LoopArg {
    let steps: Vec<String> = (0..core_dims(&arg.dtype).len())
        .map(|k| format!("is_{}{}", var, k))
        .collect();
    let (copy_suffix, copy_args, copy_condition) = match (&arg.dtype, steps.as_slice()) {
        (Dtype::Vector, [s0]) => ("double3", s0.clone(), format!("{} != sizeof(double)", s0)),
        (Dtype::Matrix, [s0, s1]) => (
            "double33",
            format!("{}, {}", s0, s1),
            format!("{} != 3 * sizeof(double) || {} != sizeof(double)", s0, s1),
        ),
        (Dtype::Record(RecordKind::BodyList), [s0]) => (
            "eraLDBODY",
            format!("{}, nb", s0),
            format!("nb > 1 && {} != sizeof(eraLDBODY)", s0),
        ),
        _ => ("", String::new(), String::new()),
    };
    let core = !steps.is_empty();
    LoopArg {
        ctype: arg.ctype.clone(),
        cshape: arg.cshape(),
        npy_type: arg.npy_type(),
        element_dtype: arg.dtype.element(),
        step,
        core,
        body_list: arg.is_body_list(),
        copy_suffix,
        copy_args,
        copy_condition,
        copy_in: core && input,
        copy_out: core && !input,
        var,
    }
}

/// Core steps in operand order, following the outer steps, and the
/// position of the body count among the distinct core dimensions.
fn core_layout(func: &Function, loop_args: &[LoopArg]) -> (Vec<CoreStep>, usize) {
    let operands = func
        .args_by_inout(INPUTS)
        .chain(func.args_by_inout(OUTPUTS))
        .zip(loop_args);
    let mut steps = Vec::new();
    let mut seen: Vec<&str> = Vec::new();
    let mut body_dim = 0;
    for (arg, loop_arg) in operands {
        for (k, dim) in core_dims(&arg.dtype).iter().enumerate() {
            steps.push(CoreStep {
                var: format!("is_{}{}", loop_arg.var, k),
                index: loop_args.len() + steps.len(),
            });
            if !seen.contains(dim) {
                seen.push(*dim);
                if *dim == "n" {
                    body_dim = seen.len();
                }
            }
        }
    }
    (steps, body_dim)
}

fn summary(title: &str) -> String {
    title
        .split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
}

fn status_context(code: &StatusCode) -> StatusContext {
    let (key, is_error) = match code.key {
        StatusKey::Code(n) => (n.to_string(), n < 0),
        StatusKey::Else => ("'else'".to_string(), true),
    };
    StatusContext {
        key,
        message: code.message.replace('\'', "\\'"),
        is_error,
    }
}

#[derive(Debug, Serialize)]
pub struct ConstantContext {
    pub name: String,
    pub value: String,
    pub doc: String,
}

#[derive(Debug, Serialize)]
pub struct TestContext {
    pub name: String,
    pub xfail: Option<&'static str>,
    pub lines: Vec<String>,
}

impl TestContext {
    pub fn new(test: &TestFunction) -> Result<Self, GenError> {
        Ok(TestContext {
            name: test.name.clone(),
            xfail: test.xfail(),
            lines: translate::translate(test)?,
        })
    }
}
