// src/tasks/templates.rs

//! `templates`: render `views/**` through tera into the distribution root.
//!
//! Every template under `views/`, `layouts/` and `components/` is registered
//! under its path relative to the source root, so a view can
//! `{% extends "layouts/base.html" %}` or `{% include "components/nav.html" %}`.
//! Only views are rendered top-level.
//!
//! Rendering is all-or-nothing: every view is rendered in memory first, and
//! nothing is written unless all of them succeed.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use tera::{Context, Tera};
use tracing::debug;

use crate::config::{Paths, TemplatesSection};
use crate::errors::{Result, SitepipeError};
use crate::fs::{collect_files, relative_slash_path, FileSystem};
use crate::watch::patterns::build_globset;

use super::{blocking, TaskContext, TaskId};

const VIEWS_PREFIX: &str = "views/";

/// Exposed to templates as `page`.
#[derive(Debug, Serialize)]
struct PageInfo<'a> {
    /// Output path relative to the distribution root, e.g. `blog/index.html`.
    path: &'a str,
    /// Source template name, e.g. `views/blog/index.html`.
    template: &'a str,
}

pub async fn run(ctx: &TaskContext) -> Result<Vec<PathBuf>> {
    let fs = Arc::clone(&ctx.fs);
    let paths = ctx.paths.clone();
    let settings = ctx.config.templates.clone();

    blocking(TaskId::Templates, move || {
        let pages = render_site(fs.as_ref(), &paths, &settings)?;
        write_pages(fs.as_ref(), pages)
    })
    .await
}

/// Render every view, returning `(destination, markup)` pairs.
pub fn render_site(
    fs: &dyn FileSystem,
    paths: &Paths,
    settings: &TemplatesSection,
) -> Result<Vec<(PathBuf, String)>> {
    let ext = settings.ext();
    let globs = build_globset(&[format!("{{views,layouts,components}}/**/*.{ext}")])?;

    let mut sources = Vec::new();
    for file in collect_files(fs, &paths.src, &globs)? {
        let Some(name) = relative_slash_path(&paths.src, &file) else {
            continue;
        };
        let body = fs.read_to_string(&file)?;
        sources.push((name, body));
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(sources.iter().map(|(n, b)| (n.as_str(), b.as_str())))
        .map_err(|e| SitepipeError::compile(TaskId::Templates.as_str(), &e))?;

    let mut pages = Vec::new();
    for (name, _) in &sources {
        let Some(view) = name.strip_prefix(VIEWS_PREFIX) else {
            continue;
        };
        let out_rel = output_name(view, ext);

        let mut context = Context::new();
        context.insert(
            "page",
            &PageInfo {
                path: &out_rel,
                template: name,
            },
        );

        let markup = tera
            .render(name, &context)
            .map_err(|e| SitepipeError::compile(TaskId::Templates.as_str(), &e))?;
        let markup = if settings.pretty {
            prettify(&markup)
        } else {
            markup
        };

        debug!(template = %name, output = %out_rel, "rendered view");
        pages.push((paths.dist.join(&out_rel), markup));
    }

    Ok(pages)
}

fn write_pages(fs: &dyn FileSystem, pages: Vec<(PathBuf, String)>) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(pages.len());
    for (dest, markup) in pages {
        fs.write_atomic(&dest, markup.as_bytes())?;
        written.push(dest);
    }
    Ok(written)
}

/// `blog/post.tera` becomes `blog/post.html`; `.html` views keep their name.
fn output_name(view: &str, ext: &str) -> String {
    if ext == "html" {
        return view.to_string();
    }
    Path::new(view)
        .with_extension("html")
        .to_string_lossy()
        .replace('\\', "/")
}

/// Strip trailing whitespace, drop leading blank lines, and collapse runs of
/// blank lines (mostly left behind by block tags) into one. Indentation is
/// kept as the templates wrote it.
///
/// `<pre>`, `<textarea>` and `<script>` elements are copied verbatim.
pub fn prettify(markup: &str) -> String {
    let mut tidy = Tidy::with_capacity(markup.len());
    let mut rest = 0;

    for block in RAW_BLOCK.find_iter(markup) {
        tidy.text(&markup[rest..block.start()]);
        tidy.line.push_str(block.as_str());
        rest = block.end();
    }
    tidy.text(&markup[rest..]);

    tidy.finish()
}

static RAW_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<pre\b[^>]*>.*?</pre\s*>|<textarea\b[^>]*>.*?</textarea\s*>|<script\b[^>]*>.*?</script\s*>",
    )
    .unwrap_or_else(|e| panic!("invalid raw block regex: {e}"))
});

/// Line accumulator behind [`prettify`].
struct Tidy {
    out: String,
    line: String,
    previous_blank: bool,
}

impl Tidy {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            out: String::with_capacity(capacity),
            line: String::new(),
            previous_blank: true,
        }
    }

    fn text(&mut self, text: &str) {
        let mut parts = text.split('\n');
        if let Some(first) = parts.next() {
            self.line.push_str(first);
        }
        for part in parts {
            self.end_line();
            self.line.push_str(part);
        }
    }

    fn end_line(&mut self) {
        let line = self.line.trim_end();
        let blank = line.is_empty();
        if !(blank && self.previous_blank) {
            self.out.push_str(line);
            self.out.push('\n');
            self.previous_blank = blank;
        }
        self.line.clear();
    }

    fn finish(mut self) -> String {
        self.end_line();
        while self.out.ends_with("\n\n") {
            self.out.pop();
        }
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathsSection;
    use crate::fs::mock::MockFileSystem;

    fn site() -> (MockFileSystem, Paths) {
        let fs = MockFileSystem::new();
        let paths = Paths::resolve("/p", &PathsSection::default());
        (fs, paths)
    }

    #[test]
    fn views_extend_layouts_and_include_components() {
        let (fs, paths) = site();
        fs.add_file(
            "/p/src/layouts/base.html",
            "<body>{% block content %}{% endblock content %}</body>",
        );
        fs.add_file("/p/src/components/nav.html", "<nav>{{ page.path | safe }}</nav>");
        fs.add_file(
            "/p/src/views/blog/index.html",
            "{% extends \"layouts/base.html\" %}{% block content %}{% include \"components/nav.html\" %}{% endblock content %}",
        );

        let pages = render_site(&fs, &paths, &TemplatesSection::default()).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].0, PathBuf::from("/p/docs/blog/index.html"));
        assert_eq!(pages[0].1, "<body><nav>blog/index.html</nav></body>\n");
    }

    #[test]
    fn syntax_error_is_a_compile_error() {
        let (fs, paths) = site();
        fs.add_file("/p/src/views/ok.html", "fine");
        fs.add_file("/p/src/views/broken.html", "{% if %}");

        let err = render_site(&fs, &paths, &TemplatesSection::default()).unwrap_err();
        match err {
            SitepipeError::Compile { task, message } => {
                assert_eq!(task, "templates");
                assert!(message.contains("broken.html"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn custom_extension_renders_to_html() {
        let (fs, paths) = site();
        fs.add_file("/p/src/views/index.tera", "hi");
        let settings = TemplatesSection {
            extension: ".tera".into(),
            pretty: false,
        };

        let pages = render_site(&fs, &paths, &settings).unwrap();
        assert_eq!(pages[0].0, PathBuf::from("/p/docs/index.html"));
        assert_eq!(pages[0].1, "hi");
    }

    #[test]
    fn prettify_collapses_blank_runs() {
        let raw = "\n\n<ul>   \n\n\n  <li>a</li>\t\n\n</ul>\n\n";
        assert_eq!(prettify(raw), "<ul>\n\n  <li>a</li>\n\n</ul>\n");
    }

    #[test]
    fn prettify_leaves_preformatted_content_alone() {
        let raw = "<body>  \n\n\n<pre>line1   \n\n\n\nline5</pre>   \n<TEXTAREA rows=\"2\">a  \n\n\nb</TEXTAREA>\n<script>\nlet s = `x  \n\n\ny`;\n</script>\n</body>\n";
        assert_eq!(
            prettify(raw),
            "<body>\n\n<pre>line1   \n\n\n\nline5</pre>\n<TEXTAREA rows=\"2\">a  \n\n\nb</TEXTAREA>\n<script>\nlet s = `x  \n\n\ny`;\n</script>\n</body>\n"
        );
    }

    #[test]
    fn rendered_pre_block_survives_pretty_output() {
        let (fs, paths) = site();
        fs.add_file("/p/src/views/code.html", "<pre>line1   \n\n\n\nline5</pre>");

        let pages = render_site(&fs, &paths, &TemplatesSection::default()).unwrap();
        assert_eq!(pages[0].1, "<pre>line1   \n\n\n\nline5</pre>\n");
    }
}
