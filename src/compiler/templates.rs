//! Page templates.
//!
//! Four named templates are always available: the built-in copies embedded
//! in the binary, each replaceable by a file of the same name in the
//! templates directory. Syntax errors surface when the set is loaded.

use crate::{log, utils::path::tag_page_href};
use anyhow::{Context, Result};
use minijinja::{AutoEscape, Environment, Error, ErrorKind, Output, State, Value};
use std::{
    env,
    fmt::Write,
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use super::freshness::mtime;

pub const BASE: &str = "base.html";
pub const PAGE: &str = "page.html";
pub const TAG: &str = "tag.html";
pub const INDEX: &str = "index.html";

const EMBEDDED: &[(&str, &str)] = &[
    (BASE, include_str!("../embed/templates/base.html")),
    (PAGE, include_str!("../embed/templates/page.html")),
    (TAG, include_str!("../embed/templates/tag.html")),
    (INDEX, include_str!("../embed/templates/index.html")),
];

pub struct Templates {
    env: Environment<'static>,
    overrides: Vec<PathBuf>,
}

impl Templates {
    /// Built-in templates only.
    pub fn embedded() -> Result<Self> {
        Self::load(None)
    }

    /// Built-in templates, replaced by any same-named file under `dir`.
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        let mut env = Environment::new();
        env.set_formatter(html_formatter);
        env.add_filter("tag_page", |tag: String| tag_page_href(&tag));
        let mut overrides = Vec::new();

        for &(name, source) in EMBEDDED {
            let path = dir.map(|dir| dir.join(name)).filter(|path| path.is_file());
            match path {
                Some(path) => {
                    let source = fs::read_to_string(&path)
                        .with_context(|| format!("failed to read template {}", path.display()))?;
                    env.add_template_owned(name, source)
                        .with_context(|| format!("invalid template {}", path.display()))?;
                    overrides.push(path);
                }
                None => env
                    .add_template(name, source)
                    .with_context(|| format!("invalid built-in template {name}"))?,
            }
        }

        if !overrides.is_empty() {
            log!("templates"; "{} override(s) loaded", overrides.len());
        }

        Ok(Self { env, overrides })
    }

    /// Reference template time: the newest of the override files, the
    /// config file and the running executable (which carries the built-in
    /// templates). Unix epoch when none can be read.
    pub fn reference_mtime(&self, config_path: &Path) -> SystemTime {
        let exe = env::current_exe().ok().and_then(|exe| mtime(&exe));

        self.overrides
            .iter()
            .filter_map(|path| mtime(path))
            .chain(mtime(config_path))
            .chain(exe)
            .max()
            .unwrap_or(SystemTime::UNIX_EPOCH)
    }

    pub fn render(&self, name: &str, ctx: Value) -> Result<String> {
        let template = self.env.get_template(name)?;
        let html = template
            .render(ctx)
            .with_context(|| format!("failed to render {name}"))?;
        Ok(html)
    }
}

/// Escapes markup characters only. The default HTML escaping also encodes
/// `/`, which would mangle every relative URL in an attribute.
fn html_formatter(out: &mut Output, state: &State, value: &Value) -> Result<(), Error> {
    let written = if value.is_safe() || matches!(state.auto_escape(), AutoEscape::None) {
        write!(out, "{value}")
    } else {
        write!(out, "{}", quick_xml::escape::escape(value.to_string().as_str()))
    };
    written.map_err(|_| Error::new(ErrorKind::WriteFailure, "failed to write template output"))
}
