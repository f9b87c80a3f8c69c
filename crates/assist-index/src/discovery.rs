//! Locating metadata files inside classpath roots (output directories and jars).

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use assist_config::MetadataConfig;
use assist_metadata::{MetadataSource, ADDITIONAL_METADATA_FILE_NAME, METADATA_FILE_NAME};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("zip error in {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

impl DiscoveryError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        DiscoveryError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn zip(path: &Path, source: zip::result::ZipError) -> Self {
        DiscoveryError::Zip {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClasspathRoot {
    Directory(PathBuf),
    Jar(PathBuf),
}

impl ClasspathRoot {
    /// Classify `path` by what is on disk: directories, and `.jar`/`.zip` files.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        if path.is_dir() {
            return Some(ClasspathRoot::Directory(path));
        }
        let is_archive = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jar") || ext.eq_ignore_ascii_case("zip"));
        (is_archive && path.is_file()).then_some(ClasspathRoot::Jar(path))
    }

    pub fn path(&self) -> &Path {
        match self {
            ClasspathRoot::Directory(path) | ClasspathRoot::Jar(path) => path,
        }
    }
}

/// A metadata file that has been found but not yet read.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileHandle {
    File(PathBuf),
    JarEntry { jar: PathBuf, entry: String },
}

impl FileHandle {
    pub fn read_bytes(&self) -> Result<Vec<u8>, DiscoveryError> {
        match self {
            FileHandle::File(path) => std::fs::read(path).map_err(|err| DiscoveryError::io(path, err)),
            FileHandle::JarEntry { jar, entry } => {
                let file = std::fs::File::open(jar).map_err(|err| DiscoveryError::io(jar, err))?;
                let mut archive =
                    zip::ZipArchive::new(file).map_err(|err| DiscoveryError::zip(jar, err))?;
                let mut entry = archive
                    .by_name(entry)
                    .map_err(|err| DiscoveryError::zip(jar, err))?;
                let mut bytes = Vec::with_capacity(initial_capacity(entry.size()));
                entry
                    .read_to_end(&mut bytes)
                    .map_err(|err| DiscoveryError::io(jar, err))?;
                Ok(bytes)
            }
        }
    }

    pub fn source(&self) -> MetadataSource {
        MetadataSource::new(self.to_string())
    }
}

/// Upper bound on what a jar entry's declared size may pre-allocate. The
/// header is untrusted; larger entries grow while reading.
const MAX_PREALLOCATED_ENTRY_BYTES: u64 = 1 << 20;

fn initial_capacity(declared_size: u64) -> usize {
    declared_size.min(MAX_PREALLOCATED_ENTRY_BYTES) as usize
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileHandle::File(path) => write!(f, "{}", path.display()),
            FileHandle::JarEntry { jar, entry } => write!(f, "{}!/{entry}", jar.display()),
        }
    }
}

/// Depth below a directory root at which `META-INF` may sit. A module's build
/// directory (`target/`, `build/`) holds the class output one or two levels down.
const MAX_META_INF_DEPTH: usize = 3;

#[derive(Clone, Debug)]
pub struct MetadataDiscovery {
    file_names: Vec<String>,
}

impl Default for MetadataDiscovery {
    fn default() -> Self {
        Self::new([METADATA_FILE_NAME, ADDITIONAL_METADATA_FILE_NAME])
    }
}

impl MetadataDiscovery {
    pub fn new<S: Into<String>>(file_names: impl IntoIterator<Item = S>) -> Self {
        Self {
            file_names: file_names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &MetadataConfig) -> Self {
        Self::new(config.effective_file_names())
    }

    pub fn file_names(&self) -> &[String] {
        &self.file_names
    }

    /// Metadata files under `root`. Missing roots yield nothing.
    pub fn find_in_root(&self, root: &ClasspathRoot) -> Result<Vec<FileHandle>, DiscoveryError> {
        match root {
            ClasspathRoot::Directory(dir) => Ok(self.find_in_dir(dir)),
            ClasspathRoot::Jar(jar) => self.find_in_jar(jar),
        }
    }

    /// Like [`MetadataDiscovery::find_in_root`] over many roots; failing roots
    /// are logged and skipped.
    pub fn find_in_roots<'a>(&self, roots: impl IntoIterator<Item = &'a ClasspathRoot>) -> Vec<FileHandle> {
        let mut out = Vec::new();
        for root in roots {
            match self.find_in_root(root) {
                Ok(found) => out.extend(found),
                Err(err) => {
                    tracing::warn!(
                        target = "assist.index",
                        root = %root.path().display(),
                        error = %err,
                        "skipping unreadable classpath root"
                    );
                }
            }
        }
        out
    }

    fn find_in_dir(&self, dir: &Path) -> Vec<FileHandle> {
        if !dir.is_dir() {
            return Vec::new();
        }

        let direct: Vec<FileHandle> = self
            .file_names
            .iter()
            .map(|name| dir.join("META-INF").join(name))
            .filter(|path| path.is_file())
            .map(FileHandle::File)
            .collect();
        if !direct.is_empty() {
            return direct;
        }

        let mut found = Vec::new();
        let walker = walkdir::WalkDir::new(dir)
            .min_depth(2)
            .max_depth(MAX_META_INF_DEPTH + 1)
            .sort_by_file_name();
        for entry in walker.into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let in_meta_inf = entry
                .path()
                .parent()
                .and_then(Path::file_name)
                .is_some_and(|name| name == "META-INF");
            let wanted = entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.file_names.iter().any(|wanted| wanted == name));
            if in_meta_inf && wanted {
                found.push(FileHandle::File(entry.into_path()));
            }
        }
        found
    }

    fn find_in_jar(&self, jar: &Path) -> Result<Vec<FileHandle>, DiscoveryError> {
        if !jar.is_file() {
            return Ok(Vec::new());
        }
        let file = std::fs::File::open(jar).map_err(|err| DiscoveryError::io(jar, err))?;
        let mut archive = zip::ZipArchive::new(file).map_err(|err| DiscoveryError::zip(jar, err))?;

        let mut out = Vec::new();
        for name in &self.file_names {
            let entry = format!("META-INF/{name}");
            match archive.by_name(&entry) {
                Ok(_) => out.push(FileHandle::JarEntry {
                    jar: jar.to_path_buf(),
                    entry,
                }),
                Err(zip::result::ZipError::FileNotFound) => continue,
                Err(err) => return Err(DiscoveryError::zip(jar, err)),
            }
        }
        Ok(out)
    }
}

/// Every jar under `dir`, sorted by path.
pub fn jar_roots_in_dir(dir: &Path) -> Result<Vec<ClasspathRoot>, DiscoveryError> {
    let jars = assist_core::collect_files_with_extension(dir, "jar")
        .map_err(|err| DiscoveryError::io(dir, err))?;
    Ok(jars.into_iter().map(ClasspathRoot::Jar).collect())
}
