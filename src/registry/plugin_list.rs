//! Plugin list parsing.
//!
//! A plugin list is a text file with one entry per line:
//!
//! ```text
//! formats.in.FakeReader              # comment
//! formats.in.PnmReader[tiles=true]
//! formats.in.SlideBookReader[type=external]
//! ```
//!
//! Entries resolve against a [`PluginCatalog`]; their order is the dispatch
//! priority. Options are stored as `<identifier>.<key>`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::{Factory, PluginCatalog};
use crate::error::{IoError, RegistryError};

/// What an unresolved, non-external entry means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    /// Log an error and drop the line
    #[default]
    Lenient,
    /// Fail the whole list
    Strict,
}

/// One parsed line: identifier plus bracketed options.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    identifier: String,
    options: Vec<(String, String)>,
}

impl Entry {
    fn is_external(&self) -> bool {
        self.options
            .iter()
            .any(|(key, value)| key == "type" && value == "external")
    }
}

/// Parse one line; `Ok(None)` for blank and comment-only lines.
fn parse_line(line: usize, raw: &str) -> Result<Option<Entry>, RegistryError> {
    let content = raw.split('#').next().unwrap_or_default().trim();
    if content.is_empty() {
        return Ok(None);
    }
    let malformed = |reason: &str| RegistryError::ConfigParse {
        line,
        content: content.to_string(),
        reason: reason.to_string(),
    };

    let (identifier, options) = if let Some(body) = content.strip_suffix(']') {
        let open = body.find('[').ok_or_else(|| malformed("']' without '['"))?;
        let mut options = Vec::new();
        for pair in body[open + 1..].split(',') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| malformed("option without '='"))?;
            options.push((key.trim().to_string(), value.trim().to_string()));
        }
        (body[..open].trim(), options)
    } else if content.contains('[') {
        return Err(malformed("'[' without closing ']'"));
    } else {
        (content, Vec::new())
    };

    if identifier.is_empty() {
        return Err(malformed("empty identifier"));
    }
    Ok(Some(Entry {
        identifier: identifier.to_string(),
        options,
    }))
}

/// An ordered list of resolved plugins.
pub struct PluginList<T> {
    entries: Vec<(String, Factory<T>)>,
    options: BTreeMap<String, String>,
    diagnostics: Vec<RegistryError>,
}

impl<T> PluginList<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            options: BTreeMap::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Parse a plugin list, resolving each entry against `catalog`.
    ///
    /// Malformed lines are logged and recorded as diagnostics. Unresolved
    /// entries marked `type=external` are skipped quietly; other unresolved
    /// entries are logged (lenient) or fail the parse (strict).
    pub fn parse(
        text: &str,
        catalog: &PluginCatalog<T>,
        strictness: Strictness,
    ) -> Result<Self, RegistryError> {
        let mut list = Self::new();

        for (index, raw) in text.lines().enumerate() {
            let entry = match parse_line(index + 1, raw) {
                Ok(Some(entry)) => entry,
                Ok(None) => continue,
                Err(e) => {
                    warn!(error = %e, "Skipping malformed plugin entry");
                    list.diagnostics.push(e);
                    continue;
                }
            };

            let Some(factory) = catalog.factory(&entry.identifier) else {
                if entry.is_external() {
                    debug!(identifier = %entry.identifier, "External plugin not available");
                    continue;
                }
                let e = RegistryError::UnresolvedPlugin {
                    identifier: entry.identifier,
                };
                if strictness == Strictness::Strict {
                    return Err(e);
                }
                error!(error = %e, "Dropping plugin entry");
                list.diagnostics.push(e);
                continue;
            };

            for (key, value) in entry.options {
                list.options
                    .insert(format!("{}.{}", entry.identifier, key), value);
            }
            list.entries.push((entry.identifier, factory));
        }

        debug!(plugins = list.entries.len(), "Loaded plugin list");
        Ok(list)
    }

    /// Read and parse a plugin list file.
    pub async fn load(
        path: impl AsRef<Path>,
        catalog: &PluginCatalog<T>,
        strictness: Strictness,
    ) -> Result<Self, RegistryError> {
        let text = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(IoError::from)?;
        Self::parse(&text, catalog, strictness)
    }

    /// Append every plugin of `other` after ours.
    pub fn append(&mut self, other: &PluginList<T>) {
        self.entries.extend(other.entries.iter().cloned());
        self.merge_options(other);
    }

    /// Insert every plugin of `other` before ours, keeping its order.
    pub fn prepend(&mut self, other: &PluginList<T>) {
        let mut entries = other.entries.clone();
        entries.append(&mut self.entries);
        self.entries = entries;
        self.merge_options(other);
    }

    fn merge_options(&mut self, other: &PluginList<T>) {
        for (key, value) in &other.options {
            self.options.insert(key.clone(), value.clone());
        }
    }

    /// Add a single resolved plugin at the end.
    pub fn push(&mut self, identifier: impl Into<String>, factory: Factory<T>) {
        self.entries.push((identifier.into(), factory));
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(identifier, _)| identifier.as_str())
    }

    /// Fresh instances of every plugin, in priority order.
    pub fn instantiate(&self) -> Vec<T> {
        self.entries.iter().map(|(_, factory)| factory()).collect()
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    pub fn diagnostics(&self) -> &[RegistryError] {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for PluginList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for PluginList<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            options: self.options.clone(),
            diagnostics: self.diagnostics.clone(),
        }
    }
}

impl<T> std::fmt::Debug for PluginList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginList")
            .field("identifiers", &self.identifiers().collect::<Vec<_>>())
            .field("options", &self.options)
            .field("diagnostics", &self.diagnostics.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> PluginCatalog<&'static str> {
        let mut catalog = PluginCatalog::new();
        catalog
            .register("test.A", || "a")
            .register("test.B", || "b")
            .register("test.C", || "c");
        catalog
    }

    // -------------------------------------------------------------------------
    // Line parsing
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_line_variants() {
        assert_eq!(parse_line(1, "   # only a comment").unwrap(), None);
        assert_eq!(parse_line(1, "").unwrap(), None);

        let entry = parse_line(1, " test.A[x=1, y = two] # trailing").unwrap().unwrap();
        assert_eq!(entry.identifier, "test.A");
        assert_eq!(
            entry.options,
            vec![
                ("x".to_string(), "1".to_string()),
                ("y".to_string(), "two".to_string())
            ]
        );

        let entry = parse_line(1, "test.B[]").unwrap().unwrap();
        assert!(entry.options.is_empty());
    }

    #[test]
    fn test_parse_line_errors() {
        for line in ["test.A]", "test.A[x=1", "test.A[novalue]", "[x=1]"] {
            assert!(
                matches!(parse_line(3, line), Err(RegistryError::ConfigParse { line: 3, .. })),
                "{line} should be rejected"
            );
        }
    }

    // -------------------------------------------------------------------------
    // List parsing
    // -------------------------------------------------------------------------

    #[test]
    fn test_order_and_duplicates_kept() {
        let list =
            PluginList::parse("test.C\ntest.A\ntest.C\n", &catalog(), Strictness::Lenient).unwrap();
        assert_eq!(
            list.identifiers().collect::<Vec<_>>(),
            vec!["test.C", "test.A", "test.C"]
        );
        assert_eq!(list.instantiate(), vec!["c", "a", "c"]);
    }

    #[test]
    fn test_options_are_namespaced() {
        let list =
            PluginList::parse("test.A[tiles=true,level=2]", &catalog(), Strictness::Lenient)
                .unwrap();
        assert_eq!(list.option("test.A.tiles"), Some("true"));
        assert_eq!(list.option("test.A.level"), Some("2"));
        assert_eq!(list.option("tiles"), None);
    }

    #[test]
    fn test_lenient_drops_unknown_entries() {
        let text = "test.A\ntest.Missing\ntest.B\n";
        let list = PluginList::parse(text, &catalog(), Strictness::Lenient).unwrap();
        assert_eq!(list.instantiate(), vec!["a", "b"]);
        assert!(matches!(
            list.diagnostics(),
            [RegistryError::UnresolvedPlugin { identifier }] if identifier == "test.Missing"
        ));
    }

    #[test]
    fn test_strict_rejects_unknown_entries() {
        let result = PluginList::parse("test.A\ntest.Missing\n", &catalog(), Strictness::Strict);
        assert!(matches!(
            result,
            Err(RegistryError::UnresolvedPlugin { .. })
        ));
    }

    #[test]
    fn test_external_entries_tolerated_when_strict() {
        let text = "test.Vendor[type=external]\ntest.B";
        let list = PluginList::parse(text, &catalog(), Strictness::Strict).unwrap();
        assert_eq!(list.instantiate(), vec!["b"]);
        assert!(list.diagnostics().is_empty());
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let text = "test.A]\ntest.B\ntest.C[oops";
        let list = PluginList::parse(text, &catalog(), Strictness::Strict).unwrap();
        assert_eq!(list.instantiate(), vec!["b"]);
        assert_eq!(list.diagnostics().len(), 2);
    }

    #[test]
    fn test_append_and_prepend() {
        let first = PluginList::parse("test.A\ntest.B", &catalog(), Strictness::Lenient).unwrap();
        let second = PluginList::parse("test.C[k=v]", &catalog(), Strictness::Lenient).unwrap();

        let mut appended = first.clone();
        appended.append(&second);
        assert_eq!(appended.instantiate(), vec!["a", "b", "c"]);
        assert_eq!(appended.option("test.C.k"), Some("v"));

        let mut prepended = first.clone();
        prepended.prepend(&second);
        assert_eq!(prepended.instantiate(), vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readers.txt");
        std::fs::write(&path, "# custom\ntest.B\n").unwrap();

        let list = PluginList::load(&path, &catalog(), Strictness::Lenient)
            .await
            .unwrap();
        assert_eq!(list.instantiate(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result =
            PluginList::load("/nonexistent/readers.txt", &catalog(), Strictness::Lenient).await;
        assert!(matches!(
            result,
            Err(RegistryError::Io(IoError::NotFound(_)))
        ));
    }
}
