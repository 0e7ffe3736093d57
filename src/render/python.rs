//! `core.py`: Python wrappers around the ufuncs, plus the constants.

use crate::model::Library;
use crate::render::context::{ConstantContext, FunctionContext};
use crate::render::Renderer;
use anyhow::Result;
use serde::Serialize;

pub struct PythonRenderer;

#[derive(Serialize)]
struct CoreContext {
    funcs: Vec<FunctionContext>,
    constants: Vec<ConstantContext>,
    /// Public names: wrappers first, then constants.
    all_names: Vec<String>,
}

impl Renderer for PythonRenderer {
    fn template(&self) -> &str {
        "core.py.hbs"
    }

    fn output(&self) -> &str {
        "core.py"
    }

    fn context(&self, lib: &Library) -> Result<serde_json::Value> {
        let funcs: Vec<FunctionContext> = lib.funcs.iter().map(FunctionContext::new).collect();
        let constants: Vec<ConstantContext> = lib
            .constants
            .iter()
            .map(|c| ConstantContext {
                name: c.name.clone(),
                value: c.value.clone(),
                doc: c.doc.clone(),
            })
            .collect();
        let all_names = funcs
            .iter()
            .map(|f| f.pyname.clone())
            .chain(constants.iter().map(|c| c.name.clone()))
            .collect();
        Ok(serde_json::to_value(CoreContext {
            funcs,
            constants,
            all_names,
        })?)
    }
}
