/// File placement engine.
///
/// This module moves the regular files directly inside a source directory
/// into category and/or year/month subdirectories of that same directory.
/// Each entry is handled independently: a failure on one file is recorded
/// in the run report and the run moves on to the next file.
use crate::config::CompiledFilters;
use crate::file_category::CategoryTable;
use chrono::{DateTime, Datelike, Local};
use serde::Serialize;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during file organization.
///
/// `SourceNotFound`, `SourceNotDirectory` and `ReadDirFailed` abort a run
/// before any entry is touched. The others are per-entry failures that end
/// up in an [`EntryOutcome::Failed`].
#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("Source directory does not exist: {}", .path.display())]
    SourceNotFound { path: PathBuf },

    #[error("Source path is not a directory: {}", .path.display())]
    SourceNotDirectory { path: PathBuf },

    #[error("Failed to read directory {}: {}", .path.display(), .source)]
    ReadDirFailed { path: PathBuf, source: io::Error },

    #[error("File has no usable name: {}", .path.display())]
    InvalidFileName { path: PathBuf },

    #[error("Failed to create directory {}: {}", .path.display(), .source)]
    DirectoryCreationFailed { path: PathBuf, source: io::Error },

    #[error("Failed to move {} to {}: {}", .from.display(), .to.display(), .source)]
    FileMoveFailed {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Which folder levels to build, and whether to touch the filesystem at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrganizeOptions {
    /// Nest files under their category name.
    pub by_type: bool,
    /// Nest files under `<year>/<MM-Month>` from their modification time.
    pub by_date: bool,
    /// Compute and report placements without creating or moving anything.
    pub dry_run: bool,
}

impl Default for OrganizeOptions {
    fn default() -> Self {
        Self {
            by_type: true,
            by_date: true,
            dry_run: false,
        }
    }
}

/// Per-entry facts needed to place a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// File name exactly as on disk; need not be valid UTF-8.
    pub name: OsString,
    /// Extension as found on disk (original case), if any.
    pub extension: Option<String>,
    pub modified: DateTime<Local>,
    /// True when the modification time could not be read and `modified` is "now".
    pub modified_is_fallback: bool,
    pub category: String,
}

impl FileRecord {
    /// Reads name, extension and modification time of `path` and classifies it.
    ///
    /// An unreadable modification time is not an error: the current time is
    /// used instead and `modified_is_fallback` is set.
    pub fn inspect(path: &Path, table: &CategoryTable) -> OrganizeResult<Self> {
        let name = path
            .file_name()
            .ok_or_else(|| OrganizeError::InvalidFileName {
                path: path.to_path_buf(),
            })?
            .to_os_string();

        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned());

        let (modified, modified_is_fallback) =
            match fs::metadata(path).and_then(|meta| meta.modified()) {
                Ok(time) => (DateTime::<Local>::from(time), false),
                Err(e) => {
                    log::warn!(
                        "Could not read modification time of {}: {}; using current time",
                        path.display(),
                        e
                    );
                    (Local::now(), true)
                }
            };

        let category = table
            .classify(extension.as_deref().unwrap_or_default())
            .to_string();

        Ok(Self {
            name,
            extension,
            modified,
            modified_is_fallback,
            category,
        })
    }
}

/// Month folder name: zero-padded month number and full English month name.
///
/// ```
/// use chrono::{Local, TimeZone};
/// use smartsort::file_organizer::month_folder;
///
/// let date = Local.with_ymd_and_hms(2024, 3, 9, 10, 0, 0).unwrap();
/// assert_eq!(month_folder(&date), "03-March");
/// ```
pub fn month_folder(date: &DateTime<Local>) -> String {
    format!("{:02}-{}", date.month(), date.format("%B"))
}

/// Builds the destination path for a record under `root`.
///
/// Segments are appended in order: category (if `by_type`), then year and
/// month (if `by_date`), then the unchanged file name.
pub fn compute_destination(
    root: &Path,
    record: &FileRecord,
    by_type: bool,
    by_date: bool,
) -> PathBuf {
    let mut destination = root.to_path_buf();
    if by_type {
        destination.push(&record.category);
    }
    if by_date {
        destination.push(format!("{:04}", record.modified.year()));
        destination.push(month_folder(&record.modified));
    }
    destination.push(&record.name);
    destination
}

/// Returns `path` if nothing exists there, otherwise the first free
/// `<stem>_<n><.ext>` sibling for n = 1, 2, ...
///
/// ```no_run
/// use smartsort::file_organizer::resolve_collision;
/// use std::path::Path;
///
/// // With reports/report.pdf already present:
/// let safe = resolve_collision(Path::new("reports/report.pdf"));
/// assert_eq!(safe, Path::new("reports/report_1.pdf"));
/// ```
pub fn resolve_collision(path: &Path) -> PathBuf {
    resolve_collision_with(path, path_is_occupied)
}

/// Collision resolution against an arbitrary occupancy check.
///
/// The loop ends as soon as `is_taken` reports a free name; with a
/// filesystem-backed check that is bounded by the number of existing entries.
pub fn resolve_collision_with<F>(path: &Path, is_taken: F) -> PathBuf
where
    F: Fn(&Path) -> bool,
{
    if !is_taken(path) {
        return path.to_path_buf();
    }

    let stem = path.file_stem().unwrap_or_default();
    let extension = path.extension();

    let mut counter: u64 = 1;
    loop {
        let mut candidate_name = stem.to_os_string();
        candidate_name.push(format!("_{counter}"));
        if let Some(ext) = extension {
            candidate_name.push(".");
            candidate_name.push(ext);
        }
        let candidate = path.with_file_name(candidate_name);
        if !is_taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Occupied means anything is there, including a dangling symlink.
fn path_is_occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Renames, falling back to copy-and-delete across filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}

/// Why an entry was left where it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Name starts with the hidden-file prefix.
    Hidden,
    /// Matched an exclusion filter.
    Excluded,
    /// The computed destination is the file's current location.
    AlreadyInPlace,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hidden => write!(f, "hidden file"),
            Self::Excluded => write!(f, "excluded by filter"),
            Self::AlreadyInPlace => write!(f, "already in place"),
        }
    }
}

/// Result of processing one entry.
#[derive(Debug)]
pub enum EntryOutcome {
    /// Moved (or, in a dry run, would be moved) to `destination`.
    Organized {
        destination: PathBuf,
        category: String,
    },
    Skipped(SkipReason),
    Failed(OrganizeError),
}

/// One entry's source path and outcome.
#[derive(Debug)]
pub struct EntryReport {
    pub source: PathBuf,
    pub outcome: EntryOutcome,
}

/// Counters for a single run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    pub total: usize,
    pub organized: usize,
    pub skipped: usize,
    pub errored: usize,
}

impl RunStatistics {
    /// Counts one entry outcome.
    pub fn record(&mut self, outcome: &EntryOutcome) {
        match outcome {
            EntryOutcome::Organized { .. } => self.organized += 1,
            EntryOutcome::Skipped(_) => self.skipped += 1,
            EntryOutcome::Failed(_) => self.errored += 1,
        }
    }

    /// Organized entries as a percentage of all entries; 0 for an empty run.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.organized as f64 / self.total as f64 * 100.0
    }
}

/// Everything a run produced.
#[derive(Debug)]
pub struct RunReport {
    pub root: PathBuf,
    pub dry_run: bool,
    pub statistics: RunStatistics,
    pub entries: Vec<EntryReport>,
}

/// Receives progress from [`FileOrganizer::run_with_observer`].
///
/// Any `FnMut(&EntryReport)` closure is an observer that ignores the start
/// notification.
pub trait RunObserver {
    /// Called once, after listing, with the number of entries to process.
    fn started(&mut self, _total: usize) {}

    /// Called after each entry has been processed.
    fn entry(&mut self, report: &EntryReport);
}

impl<F> RunObserver for F
where
    F: FnMut(&EntryReport),
{
    fn entry(&mut self, report: &EntryReport) {
        self(report)
    }
}

/// Organizes the files of one directory according to a category table.
#[derive(Debug, Clone)]
pub struct FileOrganizer {
    table: CategoryTable,
    filters: CompiledFilters,
    hidden_prefix: String,
    options: OrganizeOptions,
}

impl FileOrganizer {
    /// Creates an organizer with no exclusion filters, `.` as the hidden
    /// prefix and default options (by type and by date, not a dry run).
    pub fn new(table: CategoryTable) -> Self {
        Self {
            table,
            filters: CompiledFilters::default(),
            hidden_prefix: ".".to_string(),
            options: OrganizeOptions::default(),
        }
    }

    pub fn with_filters(mut self, filters: CompiledFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_hidden_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.hidden_prefix = prefix.into();
        self
    }

    pub fn with_options(mut self, options: OrganizeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn table(&self) -> &CategoryTable {
        &self.table
    }

    pub fn options(&self) -> OrganizeOptions {
        self.options
    }

    /// Organizes `source_dir` and returns the full report.
    pub fn run(&self, source_dir: &Path) -> OrganizeResult<RunReport> {
        self.run_with_observer(source_dir, &mut |_: &EntryReport| {})
    }

    /// Organizes `source_dir`, notifying `observer` as entries are processed.
    ///
    /// Only regular files directly inside `source_dir` are considered;
    /// subdirectories (including ones created by earlier runs) are left
    /// alone. Entries are processed in file-name order.
    ///
    /// # Errors
    ///
    /// Fails before touching anything if `source_dir` is missing, is not a
    /// directory, or cannot be listed. Per-entry failures never fail the run.
    pub fn run_with_observer<O>(
        &self,
        source_dir: &Path,
        observer: &mut O,
    ) -> OrganizeResult<RunReport>
    where
        O: RunObserver + ?Sized,
    {
        let files = self.list_files(source_dir)?;
        log::info!(
            "Organizing {} file(s) in {} (by_type={}, by_date={}, dry_run={})",
            files.len(),
            source_dir.display(),
            self.options.by_type,
            self.options.by_date,
            self.options.dry_run
        );

        observer.started(files.len());

        let mut statistics = RunStatistics {
            total: files.len(),
            ..Default::default()
        };
        let mut planned = HashSet::new();
        let mut entries = Vec::with_capacity(files.len());

        for path in files {
            let outcome = self.process_entry_planned(source_dir, &path, &mut planned);
            statistics.record(&outcome);

            let report = EntryReport {
                source: path,
                outcome,
            };
            observer.entry(&report);
            entries.push(report);
        }

        Ok(RunReport {
            root: source_dir.to_path_buf(),
            dry_run: self.options.dry_run,
            statistics,
            entries,
        })
    }

    /// Processes a single file that lives directly under `root`.
    pub fn process_entry(&self, root: &Path, path: &Path) -> EntryOutcome {
        self.process_entry_planned(root, path, &mut HashSet::new())
    }

    /// `planned` holds destinations claimed earlier in a dry run, which do
    /// not exist on disk yet but must still count as taken.
    fn process_entry_planned(
        &self,
        root: &Path,
        path: &Path,
        planned: &mut HashSet<PathBuf>,
    ) -> EntryOutcome {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if name.starts_with(&self.hidden_prefix) {
            log::debug!("Skipping hidden file {}", path.display());
            return EntryOutcome::Skipped(SkipReason::Hidden);
        }
        if self.filters.is_excluded(&name) {
            log::debug!("Skipping excluded file {}", path.display());
            return EntryOutcome::Skipped(SkipReason::Excluded);
        }

        match self.place(root, path, planned) {
            Ok(Some((destination, category))) => {
                log::info!("Moved {} -> {}", path.display(), destination.display());
                EntryOutcome::Organized {
                    destination,
                    category,
                }
            }
            Ok(None) => EntryOutcome::Skipped(SkipReason::AlreadyInPlace),
            Err(e) => {
                log::warn!("{}", e);
                EntryOutcome::Failed(e)
            }
        }
    }

    /// Computes the destination and performs the move. `None` means the file
    /// is already where it would go.
    fn place(
        &self,
        root: &Path,
        path: &Path,
        planned: &mut HashSet<PathBuf>,
    ) -> OrganizeResult<Option<(PathBuf, String)>> {
        let record = FileRecord::inspect(path, &self.table)?;
        let target = compute_destination(root, &record, self.options.by_type, self.options.by_date);

        if target == path {
            return Ok(None);
        }

        if self.options.dry_run {
            let destination =
                resolve_collision_with(&target, |p| planned.contains(p) || path_is_occupied(p));
            planned.insert(destination.clone());
            return Ok(Some((destination, record.category)));
        }

        if let Some(dir) = target.parent() {
            fs::create_dir_all(dir).map_err(|e| OrganizeError::DirectoryCreationFailed {
                path: dir.to_path_buf(),
                source: e,
            })?;
        }

        let destination = resolve_collision(&target);
        move_file(path, &destination).map_err(|e| OrganizeError::FileMoveFailed {
            from: path.to_path_buf(),
            to: destination.clone(),
            source: e,
        })?;

        Ok(Some((destination, record.category)))
    }

    /// Regular files directly under `source_dir`, sorted by name.
    fn list_files(&self, source_dir: &Path) -> OrganizeResult<Vec<PathBuf>> {
        if !source_dir.exists() {
            return Err(OrganizeError::SourceNotFound {
                path: source_dir.to_path_buf(),
            });
        }
        if !source_dir.is_dir() {
            return Err(OrganizeError::SourceNotDirectory {
                path: source_dir.to_path_buf(),
            });
        }

        let entries = fs::read_dir(source_dir).map_err(|e| OrganizeError::ReadDirFailed {
            path: source_dir.to_path_buf(),
            source: e,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry in {}: {}", source_dir.display(), e);
                    continue;
                }
            };
            if let Ok(file_type) = entry.file_type()
                && file_type.is_file()
            {
                files.push(entry.path());
            }
        }

        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }
}

impl Default for FileOrganizer {
    fn default() -> Self {
        Self::new(CategoryTable::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn record(name: &str, category: &str, year: i32, month: u32) -> FileRecord {
        FileRecord {
            name: OsString::from(name),
            extension: Path::new(name)
                .extension()
                .map(|e| e.to_string_lossy().into_owned()),
            modified: Local.with_ymd_and_hms(year, month, 15, 12, 0, 0).unwrap(),
            modified_is_fallback: false,
            category: category.to_string(),
        }
    }

    fn set_mtime(path: &Path, year: i32, month: u32) {
        let when = Local.with_ymd_and_hms(year, month, 15, 12, 0, 0).unwrap();
        let file = fs::File::options()
            .write(true)
            .open(path)
            .expect("Failed to open file");
        file.set_modified(SystemTime::from(when))
            .expect("Failed to set modification time");
    }

    #[test]
    fn test_month_folder_names() {
        let jan = Local.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let dec = Local.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap();
        assert_eq!(month_folder(&jan), "01-January");
        assert_eq!(month_folder(&dec), "12-December");
    }

    #[test]
    fn test_compute_destination_all_segment_combinations() {
        let root = Path::new("/data");
        let rec = record("photo.JPG", "Images", 2024, 3);

        assert_eq!(
            compute_destination(root, &rec, true, true),
            Path::new("/data/Images/2024/03-March/photo.JPG")
        );
        assert_eq!(
            compute_destination(root, &rec, true, false),
            Path::new("/data/Images/photo.JPG")
        );
        assert_eq!(
            compute_destination(root, &rec, false, true),
            Path::new("/data/2024/03-March/photo.JPG")
        );
        assert_eq!(
            compute_destination(root, &rec, false, false),
            Path::new("/data/photo.JPG")
        );
    }

    #[test]
    fn test_resolve_collision_unique_path_unchanged() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("report.pdf");
        assert_eq!(resolve_collision(&path), path);
    }

    #[test]
    fn test_resolve_collision_appends_counter() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("report.pdf");
        fs::write(&path, "a").unwrap();
        fs::write(temp_dir.path().join("report_1.pdf"), "b").unwrap();

        let safe = resolve_collision(&path);
        assert_eq!(safe, temp_dir.path().join("report_2.pdf"));
        assert!(!safe.exists());
    }

    #[test]
    fn test_resolve_collision_name_shapes() {
        let taken: HashSet<PathBuf> = ["d/README", "d/archive.tar.gz"]
            .iter()
            .map(PathBuf::from)
            .collect();
        let is_taken = |p: &Path| taken.contains(p);

        assert_eq!(
            resolve_collision_with(Path::new("d/README"), is_taken),
            Path::new("d/README_1")
        );
        assert_eq!(
            resolve_collision_with(Path::new("d/archive.tar.gz"), is_taken),
            Path::new("d/archive.tar_1.gz")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_collision_keeps_non_utf8_bytes() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new("d").join(OsStr::from_bytes(b"caf\xe9.jpg"));
        let taken: HashSet<PathBuf> = [path.clone()].into_iter().collect();

        let safe = resolve_collision_with(&path, |p| taken.contains(p));
        assert_eq!(
            safe,
            Path::new("d").join(OsStr::from_bytes(b"caf\xe9_1.jpg"))
        );
    }

    #[test]
    fn test_file_record_inspect() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("Song.MP3");
        fs::write(&path, "x").unwrap();
        set_mtime(&path, 2021, 7);

        let rec = FileRecord::inspect(&path, &CategoryTable::default()).unwrap();
        assert_eq!(rec.name, "Song.MP3");
        assert_eq!(rec.extension.as_deref(), Some("MP3"));
        assert_eq!(rec.category, "Audio");
        assert_eq!(rec.modified.year(), 2021);
        assert_eq!(rec.modified.month(), 7);
        assert!(!rec.modified_is_fallback);
    }

    #[test]
    fn test_file_record_falls_back_to_now_for_missing_metadata() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("ghost.txt");

        let before = Local::now();
        let rec = FileRecord::inspect(&path, &CategoryTable::default()).unwrap();
        assert!(rec.modified_is_fallback);
        assert!(rec.modified >= before);
        assert_eq!(rec.category, "Documents");
    }

    #[test]
    fn test_process_entry_skips_hidden_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join(".env");
        fs::write(&path, "x").unwrap();

        let outcome = FileOrganizer::default().process_entry(temp_dir.path(), &path);
        assert!(matches!(outcome, EntryOutcome::Skipped(SkipReason::Hidden)));
        assert!(path.exists());
    }

    #[test]
    fn test_process_entry_custom_hidden_prefix() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("_draft.txt");
        fs::write(&path, "x").unwrap();

        let organizer = FileOrganizer::default().with_hidden_prefix("_");
        let outcome = organizer.process_entry(temp_dir.path(), &path);
        assert!(matches!(outcome, EntryOutcome::Skipped(SkipReason::Hidden)));
    }

    #[test]
    fn test_process_entry_already_in_place_when_no_nesting() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("notes.txt");
        fs::write(&path, "x").unwrap();

        let organizer = FileOrganizer::default().with_options(OrganizeOptions {
            by_type: false,
            by_date: false,
            dry_run: false,
        });
        let outcome = organizer.process_entry(temp_dir.path(), &path);
        assert!(matches!(
            outcome,
            EntryOutcome::Skipped(SkipReason::AlreadyInPlace)
        ));
        assert!(path.exists());
    }

    #[test]
    fn test_process_entry_moves_by_type() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("setup.exe");
        fs::write(&path, "x").unwrap();

        let organizer = FileOrganizer::default().with_options(OrganizeOptions {
            by_type: true,
            by_date: false,
            dry_run: false,
        });
        match organizer.process_entry(temp_dir.path(), &path) {
            EntryOutcome::Organized {
                destination,
                category,
            } => {
                assert_eq!(category, "Applications");
                assert_eq!(destination, temp_dir.path().join("Applications/setup.exe"));
                assert!(destination.exists());
                assert!(!path.exists());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_statistics_record_and_success_rate() {
        let mut stats = RunStatistics {
            total: 4,
            ..Default::default()
        };
        stats.record(&EntryOutcome::Organized {
            destination: PathBuf::from("a"),
            category: "Others".to_string(),
        });
        stats.record(&EntryOutcome::Skipped(SkipReason::Hidden));
        stats.record(&EntryOutcome::Failed(OrganizeError::InvalidFileName {
            path: PathBuf::from("b"),
        }));

        assert_eq!(stats.organized, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.errored, 1);
        assert!((stats.success_rate() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_success_rate_empty_run_is_zero() {
        assert_eq!(RunStatistics::default().success_rate(), 0.0);
    }

    #[test]
    fn test_run_rejects_file_as_source() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("plain.txt");
        fs::write(&path, "x").unwrap();

        let result = FileOrganizer::default().run(&path);
        assert!(matches!(
            result,
            Err(OrganizeError::SourceNotDirectory { .. })
        ));
    }
}
