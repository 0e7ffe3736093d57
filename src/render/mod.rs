//! Renderer module: one Handlebars template per generated file.

pub mod context;
pub mod helpers;
pub mod python;
pub mod test_suite;
pub mod ufunc;

use crate::model::Library;
use anyhow::{Context, Result};
use handlebars::Handlebars;
use std::path::{Path, PathBuf};

/// A generated file: which template, where it goes, and what it sees.
pub trait Renderer {
    /// Template path, relative to the template directory.
    fn template(&self) -> &str;
    /// Output path, relative to the template directory.
    fn output(&self) -> &str;
    fn context(&self, lib: &Library) -> Result<serde_json::Value>;
}

/// Every generated file, in the order it is written.
pub fn renderers() -> Vec<Box<dyn Renderer>> {
    vec![
        Box::new(python::PythonRenderer),
        Box::new(ufunc::UfuncRenderer),
        Box::new(test_suite::TestSuiteRenderer),
    ]
}

/// A rendered file, not yet written.
#[derive(Debug)]
pub struct Rendered {
    pub path: PathBuf,
    pub content: String,
}

/// Templates of one template directory, registered under their relative path.
pub struct TemplateSet {
    dir: PathBuf,
    registry: Handlebars<'static>,
}

impl TemplateSet {
    pub fn load(dir: &Path, renderers: &[Box<dyn Renderer>]) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry.set_strict_mode(true);
        helpers::register(&mut registry);

        for renderer in renderers {
            let path = dir.join(renderer.template());
            registry
                .register_template_file(renderer.template(), &path)
                .with_context(|| format!("failed to load template {}", path.display()))?;
        }

        Ok(TemplateSet {
            dir: dir.to_path_buf(),
            registry,
        })
    }

    pub fn render(&self, renderer: &dyn Renderer, lib: &Library) -> Result<Rendered> {
        let data = renderer.context(lib)?;
        let content = self
            .registry
            .render(renderer.template(), &data)
            .with_context(|| format!("failed to render {}", renderer.template()))?;
        Ok(Rendered {
            path: self.dir.join(renderer.output()),
            content,
        })
    }
}

/// Render every file into memory; nothing is written here.
pub fn render_all(dir: &Path, lib: &Library) -> Result<Vec<Rendered>> {
    let renderers = renderers();
    let templates = TemplateSet::load(dir, &renderers)?;
    renderers
        .iter()
        .map(|r| templates.render(r.as_ref(), lib))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Constant;
    use std::fs;

    fn write_templates(dir: &Path, core: &str) {
        fs::create_dir_all(dir.join("tests")).unwrap();
        fs::write(dir.join("core.py.hbs"), core).unwrap();
        fs::write(dir.join("ufunc.c.hbs"), "{{#each funcs}}{{name}}{{/each}}").unwrap();
        fs::write(
            dir.join("tests/test_ufunc.py.hbs"),
            "{{#each test_funcs}}{{name}}{{/each}}",
        )
        .unwrap();
    }

    #[test]
    fn renders_every_output_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        write_templates(dir.path(), "{{join all_names \", \"}}");
        let lib = Library {
            constants: vec![Constant {
                name: "DPI".to_string(),
                value: "3.141592653589793".to_string(),
                doc: "Pi".to_string(),
            }],
            ..Default::default()
        };

        let rendered = render_all(dir.path(), &lib).unwrap();
        let outputs: Vec<PathBuf> = rendered
            .iter()
            .map(|r| r.path.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            outputs,
            [
                PathBuf::from("core.py"),
                PathBuf::from("ufunc.c"),
                PathBuf::from("tests/test_ufunc.py"),
            ]
        );
        assert_eq!(rendered[0].content, "DPI");
        assert!(!dir.path().join("core.py").exists());
    }

    #[test]
    fn strict_mode_rejects_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        write_templates(dir.path(), "{{no_such_field}}");
        assert!(render_all(dir.path(), &Library::default()).is_err());
    }

    #[test]
    fn missing_template_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = TemplateSet::load(dir.path(), &renderers()).err().unwrap();
        assert!(err.to_string().contains("core.py.hbs"));
    }
}
