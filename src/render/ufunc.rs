//! `ufunc.c`: the numpy extension module.

use crate::model::Library;
use crate::render::context::FunctionContext;
use crate::render::Renderer;
use anyhow::Result;
use serde::Serialize;

pub struct UfuncRenderer;

#[derive(Serialize)]
struct UfuncContext {
    funcs: Vec<FunctionContext>,
}

impl Renderer for UfuncRenderer {
    fn template(&self) -> &str {
        "ufunc.c.hbs"
    }

    fn output(&self) -> &str {
        "ufunc.c"
    }

    fn context(&self, lib: &Library) -> Result<serde_json::Value> {
        let funcs = lib.funcs.iter().map(FunctionContext::new).collect();
        Ok(serde_json::to_value(UfuncContext { funcs })?)
    }
}
