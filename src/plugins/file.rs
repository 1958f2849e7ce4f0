//! Config files.
//!
//! A [`File`] is a walker: the file is read when the session inspects it and
//! decoded onto the struct when the session parses it, so values from files
//! land in the plugin order like any other source. A missing optional file
//! contributes nothing.

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde_json::Value as Tree;
use tracing::debug;

use crate::error::PlugfigError;
use crate::field::Root;
use crate::plugin::{Plugin, Source, Walker};
use crate::plugins::decode::{UnknownKeys, apply, toml_to_tree};

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Json,
}

impl Format {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> Option<Format> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "toml" => Some(Format::Toml),
            "json" => Some(Format::Json),
            _ => None,
        }
    }

    fn decode(self, content: &str, path: &Path) -> Result<Tree, PlugfigError> {
        let parse_error = |reason: String| PlugfigError::Parse {
            path: path.to_path_buf(),
            reason,
        };
        match self {
            Format::Toml => toml::from_str::<toml::Table>(content)
                .map(|table| toml_to_tree(toml::Value::Table(table)))
                .map_err(|e| parse_error(e.to_string())),
            Format::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string())),
        }
    }
}

/// A config file source.
pub struct File {
    path: PathBuf,
    format: Format,
    optional: bool,
    unknown: UnknownKeys,
    reader: Option<Box<dyn Read>>,
    content: Option<String>,
    root: Option<Root>,
}

impl File {
    pub fn new(path: impl Into<PathBuf>, format: Format, optional: bool) -> Self {
        Self {
            path: path.into(),
            format,
            optional,
            unknown: UnknownKeys::Ignore,
            reader: None,
            content: None,
            root: None,
        }
    }

    /// Like [`new`](Self::new), picking the format from the extension.
    pub fn detect(path: impl Into<PathBuf>, optional: bool) -> Result<Self, PlugfigError> {
        let path = path.into();
        let format = Format::from_path(&path)
            .ok_or_else(|| PlugfigError::UnsupportedExtension(path.clone()))?;
        Ok(Self::new(path, format, optional))
    }

    /// Decode from an already open source. `name` identifies it in errors and
    /// in the usage output.
    pub fn from_reader(
        name: impl Into<PathBuf>,
        reader: impl Read + 'static,
        format: Format,
    ) -> Self {
        let mut file = Self::new(name, format, false);
        file.reader = Some(Box::new(reader));
        file
    }

    /// Fail on keys matching no field instead of ignoring them.
    pub fn strict(mut self, strict: bool) -> Self {
        self.unknown = if strict {
            UnknownKeys::Reject
        } else {
            UnknownKeys::Ignore
        };
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&mut self) -> Result<Option<String>, PlugfigError> {
        let io_error = |source| PlugfigError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(mut reader) = self.reader.take() {
            let mut content = String::new();
            reader.read_to_string(&mut content).map_err(io_error)?;
            return Ok(Some(content));
        }

        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if self.optional && e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "optional config file not found");
                Ok(None)
            }
            Err(e) => Err(io_error(e)),
        }
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("optional", &self.optional)
            .field("unknown", &self.unknown)
            .finish_non_exhaustive()
    }
}

impl Walker for File {
    fn walk(&mut self, root: &Root) -> Result<(), PlugfigError> {
        self.content = self.read()?;
        self.root = Some(root.clone());
        Ok(())
    }

    fn file_path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

impl Source for File {
    fn parse(&mut self) -> Result<(), PlugfigError> {
        let (Some(content), Some(root)) = (self.content.take(), self.root.as_ref()) else {
            return Ok(());
        };

        let tree = self.format.decode(&content, &self.path)?;
        let Tree::Object(table) = tree else {
            return Err(PlugfigError::Parse {
                path: self.path.clone(),
                reason: "expected a table at the top level".to_string(),
            });
        };

        debug!(path = %self.path.display(), keys = table.len(), "applying config file");
        let mut guard = root.borrow_mut();
        let target = guard.target_mut().ok_or(PlugfigError::UnexpectedType)?;
        apply(target, &table, &self.path, self.unknown)
    }
}

impl From<File> for Plugin {
    fn from(file: File) -> Self {
        Plugin::walker(file)
    }
}

/// One entry of a [`Files`] list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub path: PathBuf,
    pub format: Format,
    pub optional: bool,
}

/// An ordered list of config files; later files override earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Files(Vec<FileSpec>);

impl Files {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, path: impl Into<PathBuf>, format: Format) -> Self {
        self.push(path.into(), format, false);
        self
    }

    pub fn optional_file(mut self, path: impl Into<PathBuf>, format: Format) -> Self {
        self.push(path.into(), format, true);
        self
    }

    pub fn push(&mut self, path: PathBuf, format: Format, optional: bool) {
        self.0.push(FileSpec {
            path,
            format,
            optional,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileSpec> {
        self.0.iter()
    }

    /// One walker plugin per file, in list order.
    pub fn plugins(&self) -> Vec<Plugin> {
        self.0
            .iter()
            .map(|spec| File::new(spec.path.clone(), spec.format, spec.optional).into())
            .collect()
    }
}
