use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::domain::normalize::normalize;

/// A stable field identity together with the spellings it is known under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalColumn {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl CanonicalColumn {
    pub fn new(name: &str, aliases: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            aliases: aliases.iter().map(|alias| alias.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    column: CanonicalColumn,
    key: String,
    alias_keys: Vec<String>,
}

/// Static table of canonical columns, resolved in declaration order.
#[derive(Debug, Clone)]
pub struct AliasCatalog {
    entries: Vec<CatalogEntry>,
}

impl AliasCatalog {
    /// Builds a catalog, keeping only aliases that can actually resolve to
    /// their column: empty normalized forms, spellings equal to another
    /// column's name and spellings already claimed by an earlier column are
    /// dropped.
    pub fn from_columns(columns: Vec<CanonicalColumn>) -> Self {
        let names: HashSet<String> = columns.iter().map(|column| normalize(&column.name)).collect();
        let mut claimed: HashMap<String, String> = HashMap::new();
        let mut entries = Vec::with_capacity(columns.len());

        for column in columns {
            let key = normalize(&column.name);
            let mut aliases = Vec::new();
            let mut alias_keys = Vec::new();

            for alias in column.aliases {
                let alias_key = normalize(&alias);
                if alias_key.is_empty() {
                    warn!("alias {alias:?} of {:?} has no comparable characters, dropped", column.name);
                    continue;
                }
                if alias_key != key && names.contains(&alias_key) {
                    debug!("alias {alias:?} of {:?} is another column's name, dropped", column.name);
                    continue;
                }
                match claimed.get(&alias_key) {
                    Some(owner) if owner != &column.name => {
                        debug!("alias {alias:?} already belongs to {owner:?}, dropped from {:?}", column.name);
                        continue;
                    }
                    Some(_) => continue,
                    None => {}
                }
                claimed.insert(alias_key.clone(), column.name.clone());
                aliases.push(alias);
                alias_keys.push(alias_key);
            }

            entries.push(CatalogEntry {
                column: CanonicalColumn {
                    name: column.name,
                    aliases,
                },
                key,
                alias_keys,
            });
        }

        Self { entries }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let columns: Vec<CanonicalColumn> = serde_json::from_str(json)?;
        Ok(Self::from_columns(columns))
    }

    /// Resolves a destination header to its canonical column. A direct match
    /// on a column name beats any alias; otherwise the first column declaring
    /// a matching alias wins.
    pub fn resolve(&self, header: &str) -> Option<&CanonicalColumn> {
        let key = normalize(header);
        if key.is_empty() {
            return None;
        }

        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|entry| entry.alias_keys.iter().any(|alias| *alias == key))
            })
            .map(|entry| &entry.column)
    }

    /// Folds an extraction-service field name onto its canonical column,
    /// keeping the trimmed raw name when the catalog does not know it.
    pub fn canonicalize_field(&self, field: &str) -> String {
        match self.resolve(field) {
            Some(column) => column.name.clone(),
            None => field.trim().to_string(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.column.name == name)
    }

    pub fn columns(&self) -> impl Iterator<Item = &CanonicalColumn> {
        self.entries.iter().map(|entry| &entry.column)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns().map(|column| column.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for AliasCatalog {
    /// Cable-laying protocol columns.
    fn default() -> Self {
        Self::from_columns(vec![
            CanonicalColumn::new(
                "Kabelnummer",
                &[
                    "kabelnummer",
                    "kabel-nummer",
                    "kabel-nr",
                    "kabel-nr.",
                    "kabelnr",
                    "knr",
                    "kabnr",
                ],
            ),
            CanonicalColumn::new(
                "Kabeltyp",
                &["typ", "kabel-typ", "kabeltype", "kabel-type"],
            ),
            CanonicalColumn::new(
                "Trommelnummer",
                &["trommel", "trommelnummer", "trommel-nr", "trommel-nummer"],
            ),
            CanonicalColumn::new(
                "Durchmesser",
                &[
                    "durchmesser",
                    "dm",
                    "ømm",
                    "Ø mm",
                    "Ø (mm)",
                    "durchmesser in mm",
                    "durch-messer in mm",
                ],
            ),
            CanonicalColumn::new("von Ort", &["von ort", "start ort"]),
            CanonicalColumn::new("bis Ort", &["bis ort", "ziel ort", "end ort"]),
            CanonicalColumn::new(
                "von km",
                &["von km", "von kilometer", "start km", "anfang km"],
            ),
            CanonicalColumn::new("bis km", &["bis km", "bis kilometer", "ziel km", "end km"]),
            CanonicalColumn::new("Metr. (von)", &["metr. von", "metr", "meter"]),
            CanonicalColumn::new("Metr. (bis)", &["metr. bis"]),
            CanonicalColumn::new("SOLL", &["soll", "sollwert", "soll m"]),
            CanonicalColumn::new("IST", &["ist", "istwert", "ist m"]),
            CanonicalColumn::new("Verlegeart", &["verlegeart", "verlegung", "verlegungsart"]),
            CanonicalColumn::new(
                "Bemerkung",
                &["bemerkung", "bemerkungen", "notiz", "kommentar", "anmerkung"],
            ),
        ])
    }
}
