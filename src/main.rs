//! erfagen generates the numpy ufunc layer of pyerfa from the ERFA sources.
//!
//! Reads the master header (`erfa.h`), the constants header (`erfam.h`), the
//! per-function C sources and the C regression tests (`t_erfa_c.c`), then
//! renders three files from the templates in the template directory:
//!
//! - `core.py`: documented Python wrappers and constants
//! - `ufunc.c`: the extension module registering one ufunc per function
//! - `tests/test_ufunc.py`: the C tests translated to pytest
//!
//! Any parse failure aborts the run before a single file is written.

mod error;
mod model;
mod parser;
mod render;
mod translate;

use anyhow::{Context, Result};
use clap::Parser;
use error::GenError;
use model::{Function, Library};
use parser::{constants, ctest, function, header};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SOURCE: &str = "liberfa/erfa/src";
const DEFAULT_TEMPLATES: &str = "templates";

const HEADER_FILE: &str = "erfa.h";
const CONSTANTS_FILE: &str = "erfam.h";
const TESTS_FILE: &str = "t_erfa_c.c";

#[derive(Parser)]
#[command(
    name = "erfagen",
    about = "Generate numpy ufunc bindings, Python wrappers and tests from the ERFA C sources"
)]
struct Cli {
    /// Directory holding the ERFA C sources and headers, or a single
    /// amalgamated C file living next to erfa.h
    #[arg(default_value = DEFAULT_SOURCE)]
    source: PathBuf,

    /// Directory holding core.py.hbs, ufunc.c.hbs and tests/test_ufunc.py.hbs.
    /// Generated files are written here too.
    #[arg(short = 't', long = "template-loc", default_value = DEFAULT_TEMPLATES)]
    template_loc: PathBuf,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,
}

/// Everything one generator run needs.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub source: PathBuf,
    pub template_dir: PathBuf,
    pub verbose: bool,
}

impl From<&Cli> for GenerateConfig {
    fn from(cli: &Cli) -> Self {
        GenerateConfig {
            source: cli.source.clone(),
            template_dir: cli.template_loc.clone(),
            verbose: !cli.quiet,
        }
    }
}

impl GenerateConfig {
    fn progress(&self, message: impl Display) {
        if self.verbose {
            println!("{}", message);
        }
    }
}

/// Where the inputs live for a given source argument.
#[derive(Debug, PartialEq)]
struct SourceLayout {
    /// Directory of erfa.h, erfam.h and t_erfa_c.c.
    root: PathBuf,
    /// The source argument itself.
    functions: PathBuf,
    /// All functions in one file rather than one file per function.
    single_file: bool,
}

impl SourceLayout {
    fn resolve(source: &Path) -> Result<Self, GenError> {
        if source.is_dir() {
            Ok(SourceLayout {
                root: source.to_path_buf(),
                functions: source.to_path_buf(),
                single_file: false,
            })
        } else if source.is_file() {
            let root = source
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            Ok(SourceLayout {
                root: root.to_path_buf(),
                functions: source.to_path_buf(),
                single_file: true,
            })
        } else {
            Err(GenError::SourceNotFound(source.to_path_buf()))
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    generate(&GenerateConfig::from(&cli))
}

/// Run the whole pipeline: parse, render into memory, then write.
fn generate(config: &GenerateConfig) -> Result<()> {
    let layout = SourceLayout::resolve(&config.source)?;

    let erfa_h = read(&layout.root.join(HEADER_FILE))?;
    config.progress("read erfa header");

    let t_erfa_c = read(&layout.root.join(TESTS_FILE))?;
    config.progress("read C tests");

    let lib = build_library(config, &layout, &erfa_h, &t_erfa_c)?;

    config.progress("Rendering templates");
    let rendered = render::render_all(&config.template_dir, &lib)?;

    let outputs: Vec<String> = rendered
        .iter()
        .map(|r| {
            r.path
                .strip_prefix(&config.template_dir)
                .unwrap_or(&r.path)
                .display()
                .to_string()
        })
        .collect();
    config.progress(format!("Saving to {}", outputs.join(", ")));
    for file in &rendered {
        if let Some(parent) = file.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
        fs::write(&file.path, &file.content)
            .with_context(|| format!("failed to write {}", file.path.display()))?;
    }

    config.progress("Done!");
    Ok(())
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Parse every function, constant and test the headers announce.
fn build_library(
    config: &GenerateConfig,
    layout: &SourceLayout,
    erfa_h: &str,
    t_erfa_c: &str,
) -> Result<Library> {
    let mut funcs: Vec<Function> = Vec::new();
    for section in header::discover(erfa_h) {
        config.progress(format!("{}.{}", section.section, section.subsection));
        for name in &section.functions {
            config.progress(format!("{}.{}.{}...", section.section, section.subsection, name));
            let func = if section.is_extra() {
                function::load(name, &config.template_dir, None)
            } else if layout.single_file {
                header::declaration_prefix(&section.block, name)
                    .and_then(|line| function::load(name, &layout.functions, Some(&line)))
            } else {
                function::load(name, &layout.functions, None)
            };
            funcs.push(func.with_context(|| format!("failed to parse {}", name))?);
        }
    }

    let mut by_name: Vec<&Function> = funcs.iter().collect();
    by_name.sort_by(|a, b| a.name.cmp(&b.name));
    let test_funcs = by_name
        .into_iter()
        .map(|f| {
            ctest::extract(t_erfa_c, f)
                .with_context(|| format!("failed to read the C test of {}", f.name))
        })
        .collect::<Result<Vec<_>>>()?;

    let erfam_h = read(&layout.root.join(CONSTANTS_FILE))?;
    let constants = constants::parse(&erfam_h);

    Ok(Library {
        funcs,
        constants,
        test_funcs,
    })
}
