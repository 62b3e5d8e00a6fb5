// src/config/model.rs

use serde::Deserialize;

use crate::engine::TriggerWhileRunningBehaviour;

/// Configuration exactly as deserialized from `Sitepipe.toml`.
///
/// ```toml
/// [paths]
/// dist = "./docs"
/// src = "./src"
///
/// [server]
/// port = 3000
/// open = false
///
/// [styles]
/// stages = ["sass --embed-source-map {input} {output}"]
/// minifier = "csso {input} --output {output}"
/// ```
///
/// Every section is optional. Use [`ConfigFile::try_from`] to validate.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub paths: PathsSection,
    #[serde(default)]
    pub config: ConfigSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub templates: TemplatesSection,
    #[serde(default)]
    pub styles: StylesSection,
    #[serde(default)]
    pub scripts: ScriptsSection,
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub paths: PathsSection,
    pub config: ConfigSection,
    pub server: ServerSection,
    pub templates: TemplatesSection,
    pub styles: StylesSection,
    pub scripts: ScriptsSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            paths: raw.paths,
            config: raw.config,
            server: raw.server,
            templates: raw.templates,
            styles: raw.styles,
            scripts: raw.scripts,
        }
    }
}

/// `[paths]`: the four logical roots, relative to the project root.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsSection {
    /// Distribution output directory (deleted by `clean`).
    pub dist: String,
    /// Asset subdirectory of `dist` receiving `css/` and `js/`.
    pub assets: String,
    /// Source directory holding views, layouts, components, libs, sass, js.
    pub src: String,
    /// Static files copied verbatim into `dist`.
    pub public: String,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            dist: "./docs".to_string(),
            assets: "./docs/assets".to_string(),
            src: "./src".to_string(),
            public: "./public".to_string(),
        }
    }
}

/// `[config]` section: watch re-trigger handling.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigSection {
    /// `"queue"` (default) or `"cancel"`.
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Maximum number of queued trigger batches to remember.
    pub queue_length: usize,

    /// Filesystem events arriving within this window after the first one are
    /// folded into a single batch of triggers.
    pub debounce_ms: u64,
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::Queue,
            queue_length: 1,
            debounce_ms: 200,
        }
    }
}

/// `[server]` section for the live-reload dev server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub host: String,
    /// `0` lets the OS pick a free port.
    pub port: u16,
    /// Only plain HTTP is served; `true` is rejected during validation.
    pub https: bool,
    /// Open the default browser once the server is listening.
    pub open: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            https: false,
            open: false,
        }
    }
}

/// `[templates]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplatesSection {
    /// Template file extension, without the dot.
    pub extension: String,
    /// Strip trailing whitespace and collapse blank lines in rendered markup.
    pub pretty: bool,
}

impl TemplatesSection {
    /// The extension without a leading dot.
    pub fn ext(&self) -> &str {
        self.extension.trim_start_matches('.')
    }
}

impl Default for TemplatesSection {
    fn default() -> Self {
        Self {
            extension: "html".to_string(),
            pretty: true,
        }
    }
}

/// `[styles]` section for the `styles-dev` pipeline and the `styles-lib`
/// minifier.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StylesSection {
    /// Shell command lines run in order; `{input}` / `{output}` are replaced
    /// by quoted paths. Each stage reads the previous stage's output.
    pub stages: Vec<String>,
    /// Exported as `BROWSERSLIST` to every stage.
    pub browserslist: String,
    /// Minifies the concatenated vendor stylesheet.
    pub minifier: String,
}

impl Default for StylesSection {
    fn default() -> Self {
        Self {
            stages: vec![
                "sass --embed-source-map {input} {output}".to_string(),
                "postcss {input} --use autoprefixer --map inline -o {output}".to_string(),
            ],
            browserslist: "last 10 versions".to_string(),
            minifier: "csso {input} --output {output}".to_string(),
        }
    }
}

/// `[scripts]` section for the `scripts-dev` bundler.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptsSection {
    pub bundler: String,
}

impl Default for ScriptsSection {
    fn default() -> Self {
        Self {
            bundler: "rollup {input} --file {output} --format cjs --sourcemap inline --plugin babel"
                .to_string(),
        }
    }
}
