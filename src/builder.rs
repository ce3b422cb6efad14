//! Index builder
//!
//! Walks a directory tree of line-delimited CIDR files (one file per country)
//! and loads every valid line into a [`ContainmentIndex`]. The file name minus
//! its extension becomes the label of every prefix in that file.
//!
//! Malformed lines are logged and skipped. Failing to open or read a file
//! aborts the whole build.
//!
//! # Example
//!
//! ```rust,ignore
//! use ipblocks::builder::{IndexBuilder, LabelMode};
//!
//! let built = IndexBuilder::new("./cidr/ipv4")
//!     .label_mode(LabelMode::StripExtension)
//!     .require_entries(true)
//!     .build()?;
//! println!("{} prefixes from {} files", built.stats.entries, built.stats.files);
//! ```

use crate::index::{ContainmentIndex, Entry};
use crate::prefix::NetworkPrefix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Fatal build failure
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("unable to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no prefixes found under {}", root.display())]
    Empty { root: PathBuf },
}

impl BuildError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// How a file name is turned into a label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelMode {
    /// Remove exactly one trailing `.ext` (`at.txt` -> `at`)
    #[default]
    StripExtension,
    /// Trim every trailing character that appears in the extension string
    /// (`at.txt` -> `a`). Matches labels produced by older deployments.
    TrimExtensionChars,
}

impl fmt::Display for LabelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelMode::StripExtension => write!(f, "strip-extension"),
            LabelMode::TrimExtensionChars => write!(f, "trim-chars"),
        }
    }
}

impl FromStr for LabelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strip-extension" | "strip" => Ok(LabelMode::StripExtension),
            "trim-chars" | "trim-extension-chars" | "trim" => Ok(LabelMode::TrimExtensionChars),
            _ => Err(format!(
                "Unknown label mode '{}'. Valid modes: strip-extension, trim-chars",
                s
            )),
        }
    }
}

/// Derive a label from a file path
pub fn label_for(path: &Path, mode: LabelMode) -> String {
    let base = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    // extension is everything from the last dot of the base name, dot included
    let ext = base.rfind('.').map(|i| &base[i..]).unwrap_or("");
    if ext.is_empty() {
        return base;
    }
    match mode {
        LabelMode::StripExtension => base
            .strip_suffix(ext)
            .map(str::to_string)
            .unwrap_or_else(|| base.clone()),
        LabelMode::TrimExtensionChars => base
            .trim_end_matches(|c: char| ext.contains(c))
            .to_string(),
    }
}

/// Counters collected while building
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Files read
    pub files: usize,
    /// Prefixes inserted
    pub entries: usize,
    /// Malformed lines skipped
    pub skipped_lines: usize,
}

/// A freshly built index with its build counters
#[derive(Debug, Clone, Default)]
pub struct BuiltIndex {
    pub index: ContainmentIndex,
    pub stats: BuildStats,
}

/// Parsed content of one source file
struct FileEntries {
    label: String,
    prefixes: Vec<NetworkPrefix>,
    skipped: usize,
}

/// Builder for a [`ContainmentIndex`] loaded from a directory tree
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    root: PathBuf,
    label_mode: LabelMode,
    extension: Option<String>,
    require_entries: bool,
}

impl IndexBuilder {
    /// Create a builder reading from `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            label_mode: LabelMode::default(),
            extension: None,
            require_entries: false,
        }
    }

    /// Set the file name to label strategy
    pub fn label_mode(mut self, mode: LabelMode) -> Self {
        self.label_mode = mode;
        self
    }

    /// Only read files with this extension (without the dot); `None` reads all files
    pub fn only_extension(mut self, extension: Option<String>) -> Self {
        self.extension = extension.map(|e| e.trim_start_matches('.').to_string());
        self
    }

    /// Fail with [`BuildError::Empty`] when nothing was inserted
    pub fn require_entries(mut self, require: bool) -> Self {
        self.require_entries = require;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the tree and build a new index
    pub fn build(&self) -> Result<BuiltIndex, BuildError> {
        let mut files = Vec::new();
        collect_files(&self.root, &mut files)?;
        files.retain(|p| self.wants(p));
        // sorted paths keep insertion order, and so result order, stable across builds
        files.sort();

        let parsed: Vec<FileEntries> = files
            .par_iter()
            .map(|path| read_file(path, self.label_mode))
            .collect::<Result<_, _>>()?;

        let mut built = BuiltIndex::default();
        for file in parsed {
            built.stats.files += 1;
            built.stats.skipped_lines += file.skipped;
            built.stats.entries += file.prefixes.len();
            for prefix in file.prefixes {
                built.index.insert(Entry::new(prefix, file.label.as_str()));
            }
        }

        info!(
            "built index from {}: {} files, {} prefixes, {} lines skipped",
            self.root.display(),
            built.stats.files,
            built.stats.entries,
            built.stats.skipped_lines
        );

        if self.require_entries && built.index.is_empty() {
            return Err(BuildError::Empty {
                root: self.root.clone(),
            });
        }
        Ok(built)
    }

    fn wants(&self, path: &Path) -> bool {
        match &self.extension {
            None => true,
            Some(ext) => path.extension().map(|e| e == ext.as_str()).unwrap_or(false),
        }
    }
}

/// Build an index from `root` with default settings
pub fn build(root: impl AsRef<Path>) -> Result<BuiltIndex, BuildError> {
    IndexBuilder::new(root.as_ref()).build()
}

/// Build a brand-new index from `root`; the caller decides when to publish it
pub fn rebuild(root: impl AsRef<Path>) -> Result<BuiltIndex, BuildError> {
    build(root)
}

/// Recursively collect regular files under `dir`, skipping hidden entries.
///
/// Symlinked directories are never descended; symlinks to files are read.
fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), BuildError> {
    let read_dir = std::fs::read_dir(dir).map_err(|e| BuildError::io(dir, e))?;
    for item in read_dir {
        let item = item.map_err(|e| BuildError::io(dir, e))?;
        let path = item.path();
        if item.file_name().to_string_lossy().starts_with('.') {
            debug!("skipping hidden path {}", path.display());
            continue;
        }
        // file_type does not follow symlinks
        let file_type = item.file_type().map_err(|e| BuildError::io(&path, e))?;
        if file_type.is_dir() {
            collect_files(&path, files)?;
        } else if file_type.is_symlink() && !path.is_file() {
            debug!("skipping symlink {} (not a regular file)", path.display());
        } else {
            files.push(path);
        }
    }
    Ok(())
}

fn read_file(path: &Path, mode: LabelMode) -> Result<FileEntries, BuildError> {
    let file = File::open(path).map_err(|e| BuildError::io(path, e))?;
    let label = label_for(path, mode);
    debug!("reading {} as label '{}'", path.display(), label);

    let mut prefixes = Vec::new();
    let mut skipped = 0;
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| BuildError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        match NetworkPrefix::parse(&line) {
            Ok(prefix) => prefixes.push(prefix),
            Err(e) => {
                warn!("{}:{}: skipping line: {}", path.display(), idx + 1, e);
                skipped += 1;
            }
        }
    }

    Ok(FileEntries {
        label,
        prefixes,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;
    use tempfile::TempDir;

    fn setup_test_dir() -> TempDir {
        tempfile::tempdir().unwrap()
    }

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    fn labels_for(index: &ContainmentIndex, ip: &str) -> Vec<String> {
        let ip: IpAddr = ip.parse().unwrap();
        index
            .containing_networks(&ip)
            .into_iter()
            .map(|e| e.label.clone())
            .collect()
    }

    #[test]
    fn test_label_strip_extension() {
        let mode = LabelMode::StripExtension;
        assert_eq!(label_for(Path::new("/data/us.txt"), mode), "us");
        assert_eq!(label_for(Path::new("at.txt"), mode), "at");
        assert_eq!(label_for(Path::new("txt.txt"), mode), "txt");
        assert_eq!(label_for(Path::new("ipv4/de.cidr"), mode), "de");
        assert_eq!(label_for(Path::new("germany"), mode), "germany");
        assert_eq!(label_for(Path::new("a.b.txt"), mode), "a.b");
    }

    #[test]
    fn test_label_trim_extension_chars() {
        let mode = LabelMode::TrimExtensionChars;
        assert_eq!(label_for(Path::new("us.txt"), mode), "us");
        assert_eq!(label_for(Path::new("at.txt"), mode), "a");
        assert_eq!(label_for(Path::new("txt.txt"), mode), "");
        assert_eq!(label_for(Path::new("germany.txt"), mode), "germany");
        assert_eq!(label_for(Path::new("germany"), mode), "germany");
    }

    #[test]
    fn test_label_mode_from_str() {
        assert_eq!(
            "strip-extension".parse::<LabelMode>().unwrap(),
            LabelMode::StripExtension
        );
        assert_eq!(
            "trim-chars".parse::<LabelMode>().unwrap(),
            LabelMode::TrimExtensionChars
        );
        assert!("other".parse::<LabelMode>().is_err());
        assert_eq!(LabelMode::TrimExtensionChars.to_string(), "trim-chars");
    }

    #[test]
    fn test_build_derives_label_from_filename() {
        let dir = setup_test_dir();
        write(dir.path(), "germany.txt", "1.2.3.0/24\n");

        let built = build(dir.path()).unwrap();
        assert_eq!(labels_for(&built.index, "1.2.3.5"), vec!["germany"]);
        assert_eq!(built.stats.files, 1);
        assert_eq!(built.stats.entries, 1);
    }

    #[test]
    fn test_build_skips_malformed_lines() {
        let dir = setup_test_dir();
        let mut content = String::new();
        for i in 0..9 {
            content.push_str(&format!("10.{}.0.0/16\n", i));
        }
        content.push_str("this is not a cidr\n");
        write(dir.path(), "xx.txt", &content);
        write(dir.path(), "yy.txt", "192.0.2.0/24\n");

        let built = build(dir.path()).unwrap();
        assert_eq!(built.stats.entries, 10);
        assert_eq!(built.stats.skipped_lines, 1);
        assert_eq!(built.index.len(), 10);
        assert_eq!(labels_for(&built.index, "10.8.1.1"), vec!["xx"]);
        assert_eq!(labels_for(&built.index, "192.0.2.7"), vec!["yy"]);
    }

    #[test]
    fn test_build_ignores_blank_lines() {
        let dir = setup_test_dir();
        write(dir.path(), "fr.txt", "\n  \n10.0.0.0/8\n\n");
        let built = build(dir.path()).unwrap();
        assert_eq!(built.stats.entries, 1);
        assert_eq!(built.stats.skipped_lines, 0);
    }

    #[test]
    fn test_build_recurses_and_mixes_families() {
        let dir = setup_test_dir();
        write(dir.path(), "ipv4/nl.cidr", "145.0.0.0/8\n");
        write(dir.path(), "ipv6/nl.cidr", "2001:610::/32\n");
        write(dir.path(), ".git/objects/blob", "\u{0}binary");

        let built = build(dir.path()).unwrap();
        assert_eq!(built.stats.files, 2);
        assert_eq!(labels_for(&built.index, "145.1.2.3"), vec!["nl"]);
        assert_eq!(labels_for(&built.index, "2001:610::1"), vec!["nl"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_build_does_not_follow_symlinked_dirs() {
        use std::os::unix::fs::symlink;

        let dir = setup_test_dir();
        write(dir.path(), "ipv4/us.txt", "8.0.0.0/8\n");
        write(dir.path(), "sub/de.txt", "5.0.0.0/8\n");
        symlink(dir.path(), dir.path().join("sub/loop")).unwrap();
        symlink(dir.path().join("ipv4"), dir.path().join("latest")).unwrap();
        symlink(dir.path().join("sub/de.txt"), dir.path().join("de-link.txt")).unwrap();

        let built = build(dir.path()).unwrap();
        assert_eq!(built.stats.files, 3);
        assert_eq!(labels_for(&built.index, "8.8.8.8"), vec!["us"]);
        assert_eq!(labels_for(&built.index, "5.1.1.1"), vec!["de-link", "de"]);
    }

    #[test]
    fn test_build_extension_filter() {
        let dir = setup_test_dir();
        write(dir.path(), "be.cidr", "193.190.0.0/15\n");
        write(dir.path(), "README.md", "# country blocks\n");

        let built = IndexBuilder::new(dir.path())
            .only_extension(Some(".cidr".to_string()))
            .build()
            .unwrap();
        assert_eq!(built.stats.files, 1);
        assert_eq!(built.stats.skipped_lines, 0);
    }

    #[test]
    fn test_build_missing_root_is_fatal() {
        let dir = setup_test_dir();
        let res = build(dir.path().join("does-not-exist"));
        assert!(matches!(res, Err(BuildError::Io { .. })));
    }

    #[test]
    fn test_build_unreadable_file_is_fatal() {
        let dir = setup_test_dir();
        write(dir.path(), "ok.txt", "10.0.0.0/8\n");
        std::fs::write(dir.path().join("bad.txt"), [0xff, 0xfe, 0x00, b'\n']).unwrap();

        let res = build(dir.path());
        assert!(matches!(res, Err(BuildError::Io { .. })));
    }

    #[test]
    fn test_build_require_entries() {
        let dir = setup_test_dir();
        write(dir.path(), "empty.txt", "\n");

        assert!(build(dir.path()).unwrap().index.is_empty());
        let res = IndexBuilder::new(dir.path()).require_entries(true).build();
        assert!(matches!(res, Err(BuildError::Empty { .. })));
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let dir = setup_test_dir();
        write(dir.path(), "a.txt", "10.0.0.0/8\n10.1.0.0/16\n");
        write(dir.path(), "b.txt", "10.1.0.0/16\n0.0.0.0/0\n2001:db8::/32\n");
        write(dir.path(), "sub/c.txt", "10.1.2.0/24\n::/0\n");

        let first = rebuild(dir.path()).unwrap();
        let second = rebuild(dir.path()).unwrap();
        assert_eq!(first.stats, second.stats);
        for ip in ["10.1.2.3", "10.9.9.9", "8.8.8.8", "2001:db8::5", "fe80::1"] {
            assert_eq!(labels_for(&first.index, ip), labels_for(&second.index, ip));
        }
        assert_eq!(labels_for(&first.index, "10.1.2.3"), vec!["b", "a", "a", "b", "c"]);
    }
}
