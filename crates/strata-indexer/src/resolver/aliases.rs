//! Path aliases from tsconfig.json / jsconfig.json

use std::path::{Path, PathBuf};

use serde::Deserialize;

const ALIAS_CONFIG_FILES: &[&str] = &["tsconfig.json", "jsconfig.json"];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompilerConfig {
    #[serde(default)]
    compiler_options: CompilerOptions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompilerOptions {
    base_url: Option<String>,
    #[serde(default)]
    paths: std::collections::BTreeMap<String, Vec<String>>,
}

/// Prefix substitutions declared by the project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasConfig {
    /// Declared `baseUrl`, absolute. Bare specifiers are also tried under it.
    pub base_url: Option<PathBuf>,
    exact: Vec<(String, PathBuf)>,
    /// `(prefix, target prefix)`, longest prefix first.
    prefixes: Vec<(String, String)>,
    base_dir: PathBuf,
}

impl AliasConfig {
    /// Read the first alias config found at `root`. A missing file yields an
    /// empty config; a malformed one is logged and ignored.
    pub fn load(root: &Path) -> Self {
        for name in ALIAS_CONFIG_FILES {
            let path = root.join(name);
            let Ok(text) = std::fs::read_to_string(&path) else {
                continue;
            };
            match AliasConfig::parse(&text, root) {
                Ok(config) => {
                    tracing::debug!(
                        "Loaded {} path aliases from {}",
                        config.len(),
                        path.display()
                    );
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Ignoring aliases in {}: {}", path.display(), e);
                    return AliasConfig::default();
                }
            }
        }
        AliasConfig::default()
    }

    /// Parse tsconfig-style JSON. Comments and trailing commas are accepted.
    pub fn parse(text: &str, root: &Path) -> Result<Self, serde_json::Error> {
        let config: CompilerConfig = serde_json::from_str(&strip_jsonc(text))?;
        let options = config.compiler_options;

        let base_dir = match &options.base_url {
            Some(base) => crate::resolver::normalize_path(&root.join(base)),
            None => root.to_path_buf(),
        };

        let mut exact = Vec::new();
        let mut prefixes = Vec::new();
        for (key, targets) in options.paths {
            let Some(target) = targets.into_iter().next() else {
                continue;
            };
            match key.find('*') {
                Some(star) => {
                    let target_prefix = match target.find('*') {
                        Some(t) => target[..t].to_string(),
                        None => target,
                    };
                    prefixes.push((key[..star].to_string(), target_prefix));
                }
                None => exact.push((key, crate::resolver::normalize_path(&base_dir.join(target)))),
            }
        }
        prefixes.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        Ok(AliasConfig {
            base_url: options
                .base_url
                .map(|_| base_dir.clone()),
            exact,
            prefixes,
            base_dir,
        })
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Absolute candidate path for `specifier`, if an alias applies.
    pub fn substitute(&self, specifier: &str) -> Option<PathBuf> {
        if let Some((_, target)) = self.exact.iter().find(|(key, _)| key == specifier) {
            return Some(target.clone());
        }
        let (prefix, target) = self
            .prefixes
            .iter()
            .find(|(prefix, _)| specifier.starts_with(prefix.as_str()))?;
        let rest = &specifier[prefix.len()..];
        let joined = format!("{target}{rest}");
        Some(crate::resolver::normalize_path(&self.base_dir.join(joined)))
    }
}

/// Remove `//` and `/* */` comments outside strings, then trailing commas
/// before `}` or `]`.
fn strip_jsonc(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match (c, chars.peek().copied()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    prev = skipped;
                }
            }
            _ => out.push(c),
        }
    }

    strip_trailing_commas(&out)
}

fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
            out.push(c);
        } else if c == ',' {
            let next = chars[i + 1..].iter().copied().find(|ch| !ch.is_whitespace());
            if !matches!(next, Some('}') | Some(']')) {
                out.push(c);
            }
        } else {
            out.push(c);
        }
        i += 1;
    }
    out
}
