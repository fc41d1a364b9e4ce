use regex::Regex;
use crate::utils;

/// Label ids and their display names, indexed by the model's label channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelTable {
    labels: Vec<String>,
    display: Vec<String>,
}

impl LabelTable {
    /// Display names default to the ids when `display` is shorter.
    pub fn new(labels: Vec<String>, display: Vec<String>) -> Self {
        Self { labels, display }
    }

    pub fn from_strs(labels: &[&str], display: &[&str]) -> Self {
        Self::new(
            labels.iter().map(|s| s.to_string()).collect(),
            display.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Loads both tables from newline separated files.
    pub fn from_files(labels_path: &str, display_path: &str) -> anyhow::Result<Self> {
        let labels = utils::file_to_vec(labels_path.to_string())?;
        let display = utils::file_to_vec(display_path.to_string())?;
        if labels.len() != display.len() {
            log::warn!("Label table has {} ids but {} display names", labels.len(), display.len());
        }
        Ok(Self::new(labels, display))
    }

    /// Parses model metadata of the form `{0: 'object', 1: 'label', ...}`.
    pub fn from_names_metadata(names: &str) -> anyhow::Result<Self> {
        let re = Regex::new(r#"(['"])([-()\w '"]+)(['"])"#)?;
        let mut labels = vec![];
        for (_, [_, name, _]) in re.captures_iter(names).map(|x| x.extract()) {
            labels.push(name.to_string());
        }
        if labels.is_empty() {
            anyhow::bail!("No class names found in model metadata");
        }
        Ok(Self::new(labels.clone(), labels))
    }

    /// Single-entry table for the bay-endpoint model.
    pub fn bay() -> Self {
        Self::from_strs(&["bay"], &["bay"])
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `(label, display_label)` for a label channel index. Unknown indices get a `# n` placeholder.
    pub fn get(&self, index: usize) -> (String, String) {
        let label = self.labels.get(index).cloned().unwrap_or_else(|| format!("# {}", index));
        let display = self.display.get(index).cloned().unwrap_or_else(|| label.clone());
        (label, display)
    }
}
