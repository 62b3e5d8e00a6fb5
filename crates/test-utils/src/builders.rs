use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sitepipe::config::{ConfigFile, Paths, RawConfigFile};
use sitepipe::server::ReloadHub;
use sitepipe::tasks::TaskContext;
use sitepipe::engine::TriggerWhileRunningBehaviour;
use tempfile::TempDir;

/// Validated [`ConfigFile`] starting from defaults.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    /// Replace the style stages, e.g. with `cp {input} {output}`.
    pub fn with_style_stages(mut self, stages: &[&str]) -> Self {
        self.config.styles.stages = stages.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_minifier(mut self, minifier: &str) -> Self {
        self.config.styles.minifier = minifier.to_string();
        self
    }

    pub fn with_bundler(mut self, bundler: &str) -> Self {
        self.config.scripts.bundler = bundler.to_string();
        self
    }

    pub fn with_behaviour(mut self, behaviour: TriggerWhileRunningBehaviour, queue_length: usize) -> Self {
        self.config.config.triggered_while_running_behaviour = behaviour;
        self.config.config.queue_length = queue_length;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.config.config.debounce_ms = ms;
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.config.templates.pretty = pretty;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).unwrap_or_else(|e| panic!("builder produced invalid config: {e}"))
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A throwaway project directory with the default layout
/// (`src/`, `public/`, output in `docs/`).
pub struct SiteFixture {
    dir: TempDir,
}

impl SiteFixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp project dir"),
        }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().canonicalize().expect("canonicalize temp dir")
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    /// Write `content` at `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: impl AsRef<[u8]>) -> &Self {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, content).expect("write fixture file");
        self
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).unwrap_or_else(|e| panic!("reading {rel}: {e}"))
    }

    pub fn read_bytes(&self, rel: &str) -> Vec<u8> {
        fs::read(self.path(rel)).unwrap_or_else(|e| panic!("reading {rel}: {e}"))
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    pub fn paths(&self, cfg: &ConfigFile) -> Paths {
        Paths::resolve(self.root(), &cfg.paths)
    }

    pub fn context(&self, cfg: ConfigFile) -> TaskContext {
        let paths = self.paths(&cfg);
        TaskContext::new(cfg, paths)
    }

    pub fn context_with_reload(&self, cfg: ConfigFile, reload: ReloadHub) -> Arc<TaskContext> {
        Arc::new(self.context(cfg).with_reload(reload))
    }

    /// Every file under `rel` as `(relative path, bytes)`, sorted.
    pub fn snapshot(&self, rel: &str) -> Vec<(String, Vec<u8>)> {
        let base = self.path(rel);
        let mut out = Vec::new();
        collect(&base, &base, &mut out);
        out.sort();
        out
    }
}

impl Default for SiteFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn collect(base: &Path, dir: &Path, out: &mut Vec<(String, Vec<u8>)>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries {
        let path = entry.expect("dir entry").path();
        if path.is_dir() {
            collect(base, &path, out);
        } else {
            let rel = path
                .strip_prefix(base)
                .expect("entry under base")
                .to_string_lossy()
                .replace('\\', "/");
            out.push((rel, fs::read(&path).expect("read snapshot file")));
        }
    }
}
