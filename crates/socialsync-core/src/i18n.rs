use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, anyhow};
use tracing::{debug, warn};

const FRENCH_DICTIONARY: &str = include_str!("../locales/fr.toml");
pub const DEFAULT_LOCALE: &str = "fr";

/// Flat key -> text lookup. Missing keys render as the key itself.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    locale: String,
    entries: HashMap<String, String>,
}

impl Dictionary {
    /// Embedded dictionary for `locale`; every locale currently falls back to French.
    pub fn for_locale(locale: &str) -> anyhow::Result<Self> {
        if locale != DEFAULT_LOCALE {
            warn!(locale, fallback = DEFAULT_LOCALE, "no dictionary for locale; falling back");
        }
        Self::parse(DEFAULT_LOCALE, FRENCH_DICTIONARY)
    }

    #[tracing::instrument(skip(path))]
    pub fn load(locale: &str, path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read dictionary {}", path.display()))?;
        Self::parse(locale, &raw).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn parse(locale: &str, raw: &str) -> anyhow::Result<Self> {
        let table: toml::Table = toml::from_str(raw)?;
        let mut entries = HashMap::new();
        flatten_into(&mut entries, "", &table)?;
        debug!(locale, keys = entries.len(), "loaded dictionary");
        Ok(Self {
            locale: locale.to_string(),
            entries,
        })
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn t(&self, key: &str) -> String {
        self.translate(key, &[])
    }

    /// Looks up `key` and substitutes every `{{name}}` from `params`.
    pub fn translate(&self, key: &str, params: &[(&str, &str)]) -> String {
        let mut value = self
            .entries
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string());

        for (name, replacement) in params {
            value = value.replace(&format!("{{{{{name}}}}}"), replacement);
        }
        value
    }
}

fn flatten_into(
    out: &mut HashMap<String, String>,
    prefix: &str,
    table: &toml::Table,
) -> anyhow::Result<()> {
    for (key, value) in table {
        let full = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::String(text) => {
                out.insert(full, text.clone());
            }
            toml::Value::Table(nested) => flatten_into(out, &full, nested)?,
            other => {
                return Err(anyhow!(
                    "dictionary entry {full} must be a string, found {}",
                    other.type_str()
                ));
            }
        }
    }
    Ok(())
}
