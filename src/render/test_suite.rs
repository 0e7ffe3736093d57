//! `tests/test_ufunc.py`: the C regression tests, translated.

use crate::model::Library;
use crate::render::context::TestContext;
use crate::render::Renderer;
use anyhow::{Context, Result};
use serde::Serialize;

pub struct TestSuiteRenderer;

#[derive(Serialize)]
struct SuiteContext {
    test_funcs: Vec<TestContext>,
}

impl Renderer for TestSuiteRenderer {
    fn template(&self) -> &str {
        "tests/test_ufunc.py.hbs"
    }

    fn output(&self) -> &str {
        "tests/test_ufunc.py"
    }

    fn context(&self, lib: &Library) -> Result<serde_json::Value> {
        let mut test_funcs = Vec::with_capacity(lib.test_funcs.len());
        for test in &lib.test_funcs {
            test_funcs.push(
                TestContext::new(test)
                    .with_context(|| format!("failed to translate t_{}", test.name))?,
            );
        }
        Ok(serde_json::to_value(SuiteContext { test_funcs })?)
    }
}
