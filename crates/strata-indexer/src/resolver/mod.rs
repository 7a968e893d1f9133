//! Import-to-file resolution

pub mod aliases;
pub mod local_modules;
pub mod stdlib;

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use strata_core::{ImportRecord, Language};

pub use aliases::AliasConfig;
pub use local_modules::LocalModules;

/// Probe order for script imports without an extension.
pub const SCRIPT_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];

/// Where an import that produced no edge points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportCategory {
    /// Project code that could not be pinned to a file.
    Local,
    ThirdParty,
    StandardLibrary,
}

/// Outcome of resolving one import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(PathBuf),
    Unresolved(ImportCategory),
}

impl Resolution {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Resolution::Resolved(path) => Some(path),
            Resolution::Unresolved(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct PackageEntry {
    main: Option<String>,
}

/// Maps import specifiers to project files.
///
/// Probing consults the set of files known to the current build first and
/// falls back to the filesystem, so every path it returns exists.
#[derive(Debug, Clone)]
pub struct ImportResolver {
    root: PathBuf,
    aliases: AliasConfig,
    files: HashSet<PathBuf>,
}

impl ImportResolver {
    pub fn new(root: &Path, aliases: AliasConfig, files: impl IntoIterator<Item = PathBuf>) -> Self {
        ImportResolver {
            root: root.to_path_buf(),
            aliases,
            files: files.into_iter().collect(),
        }
    }

    /// Resolver with aliases read from the project's tsconfig/jsconfig.
    pub fn load(root: &Path, files: impl IntoIterator<Item = PathBuf>) -> Self {
        ImportResolver::new(root, AliasConfig::load(root), files)
    }

    pub fn aliases(&self) -> &AliasConfig {
        &self.aliases
    }

    /// Resolve `record`, written in `importer`, to a file.
    pub fn resolve(
        &self,
        record: &ImportRecord,
        importer: &Path,
        language: Language,
        modules: &LocalModules,
    ) -> Resolution {
        match language {
            Language::Python => self.resolve_python(record, importer, modules),
            Language::JavaScript | Language::TypeScript => {
                self.resolve_script(&record.specifier, importer, modules)
            }
            Language::Unknown => Resolution::Unresolved(ImportCategory::ThirdParty),
        }
    }

    /// True when `path` is one of the files this build indexes.
    pub fn is_indexed(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    /// Category for a file found on disk that the build does not index.
    pub fn outside_index_category(&self, path: &Path) -> ImportCategory {
        let vendored = path
            .strip_prefix(&self.root)
            .unwrap_or(path)
            .components()
            .any(|c| c.as_os_str() == "node_modules");
        if vendored {
            ImportCategory::ThirdParty
        } else {
            ImportCategory::Local
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains(path) || path.is_file()
    }

    fn resolve_script(&self, specifier: &str, importer: &Path, modules: &LocalModules) -> Resolution {
        if let Some(candidate) = self.aliases.substitute(specifier) {
            if let Some(found) = self.probe_script(&candidate) {
                return Resolution::Resolved(found);
            }
        }

        let is_relative = specifier.starts_with("./")
            || specifier.starts_with("../")
            || specifier == "."
            || specifier == "..";
        if is_relative || specifier.starts_with('/') {
            let base = if is_relative {
                importer.parent().unwrap_or(self.root.as_path()).join(specifier)
            } else {
                self.root.join(specifier.trim_start_matches('/'))
            };
            return match self.probe_script(&normalize_path(&base)) {
                Some(found) => Resolution::Resolved(found),
                None => Resolution::Unresolved(ImportCategory::Local),
            };
        }

        if let Some(base_url) = &self.aliases.base_url {
            if let Some(found) = self.probe_script(&normalize_path(&base_url.join(specifier))) {
                return Resolution::Resolved(found);
            }
        }

        if let Some(found) = self.package_entry(specifier) {
            return Resolution::Resolved(found);
        }

        if modules.contains(Language::JavaScript, specifier) {
            Resolution::Unresolved(ImportCategory::Local)
        } else if stdlib::is_node_builtin(specifier) {
            Resolution::Unresolved(ImportCategory::StandardLibrary)
        } else {
            Resolution::Unresolved(ImportCategory::ThirdParty)
        }
    }

    /// Exact file, then each extension, then `index.<ext>` inside a
    /// directory. `./x.js` written against a TypeScript source also finds
    /// `x.ts`.
    fn probe_script(&self, base: &Path) -> Option<PathBuf> {
        if self.exists(base) {
            return Some(base.to_path_buf());
        }

        let file_name = base.file_name()?.to_str()?;
        for ext in SCRIPT_EXTENSIONS {
            let candidate = base.with_file_name(format!("{file_name}.{ext}"));
            if self.exists(&candidate) {
                return Some(candidate);
            }
        }

        for (written, sources) in [("js", &["ts", "tsx"][..]), ("jsx", &["tsx"][..])] {
            if let Some(stem) = file_name.strip_suffix(&format!(".{written}")) {
                for ext in sources {
                    let candidate = base.with_file_name(format!("{stem}.{ext}"));
                    if self.exists(&candidate) {
                        return Some(candidate);
                    }
                }
            }
        }

        for ext in SCRIPT_EXTENSIONS {
            let candidate = base.join(format!("index.{ext}"));
            if self.exists(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    /// `node_modules/<pkg>` honouring `package.json` `main`, falling back to
    /// `index.js`.
    fn package_entry(&self, specifier: &str) -> Option<PathBuf> {
        let package_dir = self.root.join("node_modules").join(specifier);
        if !package_dir.is_dir() {
            return None;
        }

        let manifest = package_dir.join("package.json");
        let main = std::fs::read_to_string(&manifest)
            .ok()
            .and_then(|text| serde_json::from_str::<PackageEntry>(&text).ok())
            .and_then(|entry| entry.main);
        if let Some(main) = main {
            if let Some(found) = self.probe_script(&normalize_path(&package_dir.join(main))) {
                return Some(found);
            }
        }

        let index = package_dir.join("index.js");
        self.exists(&index).then_some(index)
    }

    fn resolve_python(&self, record: &ImportRecord, importer: &Path, modules: &LocalModules) -> Resolution {
        let module = record.specifier.trim_start_matches('.');

        if record.level > 0 {
            let mut dir = importer.parent().unwrap_or(self.root.as_path()).to_path_buf();
            for _ in 1..record.level {
                if dir == self.root {
                    break;
                }
                match dir.parent() {
                    Some(parent) => dir = parent.to_path_buf(),
                    None => break,
                }
            }

            // `from . import sibling` names modules through its symbols
            if module.is_empty() {
                for symbol in &record.symbols {
                    if let Some(found) = self.probe_python(&dir, symbol) {
                        return Resolution::Resolved(found);
                    }
                }
                let init = dir.join("__init__.py");
                return if self.exists(&init) {
                    Resolution::Resolved(init)
                } else {
                    Resolution::Unresolved(ImportCategory::Local)
                };
            }

            return match self.probe_python(&dir, module) {
                Some(found) => Resolution::Resolved(found),
                None => Resolution::Unresolved(ImportCategory::Local),
            };
        }

        for base in self.python_roots() {
            if let Some(found) = self.probe_python(&base, module) {
                return Resolution::Resolved(found);
            }
        }

        if stdlib::is_python_stdlib(module) {
            Resolution::Unresolved(ImportCategory::StandardLibrary)
        } else if modules.contains(Language::Python, module) {
            Resolution::Unresolved(ImportCategory::Local)
        } else {
            Resolution::Unresolved(ImportCategory::ThirdParty)
        }
    }

    /// Project root, plus `src/` for src-layout projects.
    fn python_roots(&self) -> Vec<PathBuf> {
        let mut roots = vec![self.root.clone()];
        let src = self.root.join("src");
        if src.is_dir() {
            roots.push(src);
        }
        roots
    }

    /// Longest dotted prefix of `module` under `base` that exists as a
    /// module file or a package.
    fn probe_python(&self, base: &Path, module: &str) -> Option<PathBuf> {
        let parts: Vec<&str> = module.split('.').filter(|p| !p.is_empty()).collect();
        for len in (1..=parts.len()).rev() {
            let dir = parts[..len].iter().fold(base.to_path_buf(), |acc, p| acc.join(p));
            let file = dir.with_extension("py");
            if self.exists(&file) {
                return Some(file);
            }
            let init = dir.join("__init__.py");
            if self.exists(&init) {
                return Some(init);
            }
        }
        None
    }
}

/// Lexically resolve `.` and `..` components without touching the
/// filesystem. `..` never climbs above the filesystem root.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
