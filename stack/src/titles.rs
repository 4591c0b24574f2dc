//! Display titles for stack section headers.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;

use report_sorter_core::table::parse_records;
use tracing::debug;

use crate::error::Result;

const HEADER_CELLS: [&str; 3] = ["filename", "file", "source"];

/// Maps source file names to human-readable titles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleMap {
    titles: HashMap<String, String>,
}

impl TitleMap {
    /// Loads a two-column CSV. A missing file gives an empty map.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::StackError::Io) if the file exists but cannot
    /// be read.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let map = Self::from_csv(&text);
                debug!(path = %path.display(), titles = map.len(), "loaded title map");
                Ok(map)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no title map");
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Parses CSV rows of `source file name, display title`.
    ///
    /// A first row whose first cell is `filename`, `file` or `source` is
    /// treated as a header. Rows with fewer than two cells or an empty cell
    /// are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use report_sorter_stack::TitleMap;
    ///
    /// let titles = TitleMap::from_csv("filename,title\n240314_Cams.md,\"Cameras, March 14\"\n");
    /// assert_eq!(titles.title_for("240314_Cams.md"), "Cameras, March 14");
    /// assert_eq!(titles.title_for("other.md"), "other.md");
    /// ```
    pub fn from_csv(text: &str) -> Self {
        let mut titles = HashMap::new();
        for (i, record) in parse_records(text).into_iter().enumerate() {
            let [source, title, ..] = record.as_slice() else {
                continue;
            };
            let (source, title) = (source.trim(), title.trim());
            if i == 0 && HEADER_CELLS.contains(&source.to_lowercase().as_str()) {
                continue;
            }
            if source.is_empty() || title.is_empty() {
                continue;
            }
            titles.insert(source.to_string(), title.to_string());
        }
        Self { titles }
    }

    /// The display title for `file_name`, or the name itself.
    pub fn title_for<'a>(&'a self, file_name: &'a str) -> &'a str {
        self.titles
            .get(file_name)
            .map(String::as_str)
            .unwrap_or(file_name)
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_row_is_optional() {
        let with_header = TitleMap::from_csv("Source,Title\na.md,Alpha\n");
        let without = TitleMap::from_csv("a.md,Alpha\n");
        assert_eq!(with_header, without);
        assert_eq!(without.len(), 1);
    }

    #[test]
    fn test_short_and_blank_rows_are_ignored() {
        let titles = TitleMap::from_csv("a.md\n,Nameless\nb.md,  \nc.md, Gamma \n");
        assert_eq!(titles.len(), 1);
        assert_eq!(titles.title_for("c.md"), "Gamma");
    }

    #[test]
    fn test_missing_file_gives_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let titles = TitleMap::load(&dir.path().join("readable_titles.csv")).unwrap();
        assert!(titles.is_empty());
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("titles.csv");
        std::fs::write(&path, "filename,title\r\na.md,Alpha\r\n").unwrap();
        assert_eq!(TitleMap::load(&path).unwrap().title_for("a.md"), "Alpha");
    }
}
