/// File categorization by extension.
///
/// A [`CategoryTable`] is an ordered list of named categories, each owning a
/// set of lowercase extensions, plus a catch-all category for everything
/// else. Lookups walk the list in order and the first match wins, so a table
/// with overlapping extensions still classifies deterministically.
///
/// # Examples
///
/// ```
/// use smartsort::file_category::CategoryTable;
///
/// let table = CategoryTable::default();
/// assert_eq!(table.classify("JPG"), "Images");
/// assert_eq!(table.classify(".pdf"), "Documents");
/// assert_eq!(table.classify("xyz"), "Others");
/// ```
use std::collections::BTreeSet;

/// Name of the catch-all category in the built-in table.
pub const DEFAULT_CATCH_ALL: &str = "Others";

/// A named group of file extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    name: String,
    extensions: BTreeSet<String>,
}

impl Category {
    /// Creates a category, normalizing every extension to lowercase without a leading dot.
    pub fn new<I, S>(name: impl Into<String>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            extensions: extensions
                .into_iter()
                .map(|ext| normalize_extension(ext.as_ref()))
                .filter(|ext| !ext.is_empty())
                .collect(),
        }
    }

    /// The category name, also used as its directory name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The normalized extensions of this category.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    /// Returns true if the (already normalized) extension belongs to this category.
    pub fn contains(&self, normalized_ext: &str) -> bool {
        self.extensions.contains(normalized_ext)
    }
}

/// An extension claimed by more than one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlap {
    pub extension: String,
    /// The category that wins lookups for this extension.
    pub winner: String,
    /// A later category that also lists it.
    pub shadowed: String,
}

/// Ordered mapping from category name to extension set, with a catch-all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    categories: Vec<Category>,
    catch_all: String,
}

impl CategoryTable {
    /// Creates an empty table where everything falls into `catch_all`.
    pub fn new(catch_all: impl Into<String>) -> Self {
        Self {
            categories: Vec::new(),
            catch_all: catch_all.into(),
        }
    }

    /// Appends a category at the end of the lookup order.
    pub fn push(&mut self, category: Category) {
        self.categories.push(category);
    }

    /// Builder-style variant of [`CategoryTable::push`].
    pub fn with_category<I, S>(mut self, name: &str, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.push(Category::new(name, extensions));
        self
    }

    /// The catch-all category name.
    pub fn catch_all(&self) -> &str {
        &self.catch_all
    }

    /// Categories in lookup order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Maps a file extension to a category name.
    ///
    /// The extension is compared case-insensitively and a leading dot is
    /// ignored. Unknown or empty extensions map to the catch-all.
    ///
    /// # Examples
    ///
    /// ```
    /// use smartsort::file_category::CategoryTable;
    ///
    /// let table = CategoryTable::new("Misc")
    ///     .with_category("Text", ["txt", "md"])
    ///     .with_category("Notes", ["md"]);
    ///
    /// assert_eq!(table.classify("MD"), "Text");
    /// assert_eq!(table.classify(""), "Misc");
    /// ```
    pub fn classify(&self, ext: &str) -> &str {
        let ext = normalize_extension(ext);
        if ext.is_empty() {
            return &self.catch_all;
        }

        self.categories
            .iter()
            .find(|category| category.contains(&ext))
            .map(Category::name)
            .unwrap_or(&self.catch_all)
    }

    /// Lists every extension that appears in more than one category.
    ///
    /// Lookups stay deterministic (first category wins) but a shadowed entry
    /// is almost always a configuration mistake.
    pub fn overlaps(&self) -> Vec<Overlap> {
        let mut overlaps = Vec::new();
        for (i, earlier) in self.categories.iter().enumerate() {
            for later in &self.categories[i + 1..] {
                for ext in earlier.extensions.intersection(&later.extensions) {
                    // Only report against the category that actually wins.
                    let winner = self.classify(ext);
                    if winner == earlier.name {
                        overlaps.push(Overlap {
                            extension: ext.clone(),
                            winner: earlier.name.clone(),
                            shadowed: later.name.clone(),
                        });
                    }
                }
            }
        }
        overlaps
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::new(DEFAULT_CATCH_ALL)
            .with_category(
                "Images",
                ["jpg", "jpeg", "png", "gif", "bmp", "svg", "ico", "webp"],
            )
            .with_category("Videos", ["mp4", "avi", "mkv", "mov", "wmv", "flv", "webm"])
            .with_category(
                "Documents",
                [
                    "pdf", "doc", "docx", "txt", "rtf", "odt", "xls", "xlsx", "ppt", "pptx",
                ],
            )
            .with_category("Audio", ["mp3", "wav", "flac", "aac", "ogg", "wma", "m4a"])
            .with_category("Archives", ["zip", "rar", "7z", "tar", "gz", "bz2"])
            .with_category(
                "Programming",
                [
                    "py", "js", "html", "css", "java", "cpp", "c", "php", "json", "xml",
                ],
            )
            .with_category("Applications", ["exe", "msi", "apk", "dmg", "deb", "rpm"])
    }
}

/// Lowercases an extension and strips one leading dot.
pub fn normalize_extension(ext: &str) -> String {
    ext.strip_prefix('.').unwrap_or(ext).to_lowercase()
}
