//! Package and module names defined inside the project

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use strata_core::Language;

#[derive(Deserialize)]
struct PackageManifest {
    name: Option<String>,
}

/// Names that refer to project code even when they look like third-party
/// imports. Computed once per build and passed to the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalModules {
    python: BTreeSet<String>,
    packages: BTreeSet<String>,
}

impl LocalModules {
    /// Collect top-level Python packages and modules from `sources`, and the
    /// `name` of every `package.json` in `manifests`.
    pub fn discover(root: &Path, sources: &[PathBuf], manifests: &[PathBuf]) -> Self {
        let mut modules = LocalModules::default();

        for path in sources {
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let parts: Vec<&str> = relative
                .components()
                .filter_map(|c| match c {
                    Component::Normal(s) => s.to_str(),
                    _ => None,
                })
                .collect();
            match parts.as_slice() {
                [file] => {
                    if let Some(stem) = file.strip_suffix(".py") {
                        modules.insert_python(stem);
                    }
                }
                [dir, "__init__.py"] => modules.insert_python(dir),
                _ => {}
            }
        }

        for manifest in manifests {
            let Ok(text) = std::fs::read_to_string(manifest) else {
                continue;
            };
            match serde_json::from_str::<PackageManifest>(&text) {
                Ok(PackageManifest { name: Some(name) }) => modules.insert_package(&name),
                Ok(_) => {}
                Err(e) => tracing::debug!("Skipping manifest {}: {}", manifest.display(), e),
            }
        }

        modules
    }

    /// Private names (leading underscore) are never treated as local roots.
    pub fn insert_python(&mut self, name: &str) {
        if !name.is_empty() && !name.starts_with('_') {
            self.python.insert(name.to_string());
        }
    }

    pub fn insert_package(&mut self, name: &str) {
        if !name.is_empty() {
            self.packages.insert(name.to_string());
        }
    }

    /// True if the root segment of `specifier` names project code.
    pub fn contains(&self, language: Language, specifier: &str) -> bool {
        match language {
            Language::Python => {
                let root = specifier.split('.').next().unwrap_or(specifier);
                self.python.contains(root)
            }
            Language::JavaScript | Language::TypeScript => {
                self.packages.contains(package_root(specifier))
            }
            Language::Unknown => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.python.is_empty() && self.packages.is_empty()
    }
}

/// `@scope/name/deep` -> `@scope/name`, `name/deep` -> `name`.
pub fn package_root(specifier: &str) -> &str {
    let mut slashes = specifier.match_indices('/');
    let cut = if specifier.starts_with('@') {
        slashes.nth(1)
    } else {
        slashes.next()
    };
    match cut {
        Some((idx, _)) => &specifier[..idx],
        None => specifier,
    }
}
