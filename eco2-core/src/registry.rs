//! Registry - the thermostats we know, persisted as one XML document
//!
//! The whole document is read once and written back once. Writes replace the
//! file atomically, so a failed save leaves the previous registry intact.
//! There is no locking: one process at a time owns the registry.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::thermostat::Thermostat;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read registry {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse registry {path}: {source}")]
    Parse {
        path: PathBuf,
        source: quick_xml::de::DeError,
    },
    #[error("failed to serialize registry: {0}")]
    Serialize(#[from] quick_xml::se::SeError),
    #[error("failed to write registry {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// On-disk shape: `<Thermostats><Thermostat>...</Thermostat>...</Thermostats>`
#[derive(Debug, Default, Deserialize)]
#[serde(rename = "Thermostats")]
struct Document {
    #[serde(rename = "Thermostat", default)]
    thermostats: Vec<Thermostat>,
}

#[derive(Serialize)]
#[serde(rename = "Thermostats")]
struct DocumentRef<'a> {
    #[serde(rename = "Thermostat")]
    thermostats: &'a [Thermostat],
}

/// All known thermostats, in insertion order, unique by serial
#[derive(Debug, Clone)]
pub struct Registry {
    path: PathBuf,
    thermostats: Vec<Thermostat>,
}

impl Registry {
    /// Load the registry at `path`
    ///
    /// A missing file is a first run and yields an empty registry.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();

        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no registry yet, starting empty");
                return Ok(Self::empty(path));
            }
            Err(source) => return Err(RegistryError::Read { path, source }),
        };

        if data.trim().is_empty() {
            return Ok(Self::empty(path));
        }

        let document: Document = match quick_xml::de::from_str(&data) {
            Ok(document) => document,
            Err(source) => return Err(RegistryError::Parse { path, source }),
        };

        tracing::debug!(
            path = %path.display(),
            count = document.thermostats.len(),
            "loaded registry"
        );

        Ok(Self {
            path,
            thermostats: document.thermostats,
        })
    }

    /// An empty registry that will be saved to `path`
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            thermostats: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write every record, replacing the file in one rename
    pub fn save(&self) -> Result<(), RegistryError> {
        let xml = self.to_xml()?;

        let write_error = |source| RegistryError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(write_error)?;

        let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(write_error)?;
        staged.write_all(xml.as_bytes()).map_err(write_error)?;
        staged.as_file().sync_all().map_err(write_error)?;
        staged.persist(&self.path).map_err(|e| write_error(e.error))?;

        tracing::debug!(
            path = %self.path.display(),
            count = self.thermostats.len(),
            "saved registry"
        );
        Ok(())
    }

    fn to_xml(&self) -> Result<String, RegistryError> {
        let mut xml = String::from(XML_DECLARATION);
        xml.push('\n');

        let mut serializer = quick_xml::se::Serializer::new(&mut xml);
        serializer.indent(' ', 2);
        DocumentRef {
            thermostats: &self.thermostats,
        }
        .serialize(serializer)?;

        xml.push('\n');
        Ok(xml)
    }

    /// The record for `serial`, created and appended if it does not exist
    pub fn record_with_serial(&mut self, serial: &str) -> &mut Thermostat {
        let index = match self.position(serial) {
            Some(index) => index,
            None => {
                self.thermostats.push(Thermostat::new(serial));
                self.thermostats.len() - 1
            }
        };
        &mut self.thermostats[index]
    }

    /// Remove the record for `serial`, returns whether there was one
    pub fn remove_with_serial(&mut self, serial: &str) -> bool {
        match self.position(serial) {
            Some(index) => {
                self.thermostats.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn has_secret_and_uuid_for(&self, serial: &str) -> bool {
        self.get(serial).is_some_and(Thermostat::has_secret_and_uuid)
    }

    pub fn get(&self, serial: &str) -> Option<&Thermostat> {
        self.thermostats.iter().find(|t| t.serial == serial)
    }

    pub fn get_mut(&mut self, serial: &str) -> Option<&mut Thermostat> {
        self.thermostats.iter_mut().find(|t| t.serial == serial)
    }

    /// A working copy of the record for `serial`, without inserting it
    ///
    /// Pair with [`Registry::commit`] once the copy is final.
    pub fn snapshot(&self, serial: &str) -> Thermostat {
        self.get(serial)
            .cloned()
            .unwrap_or_else(|| Thermostat::new(serial))
    }

    /// Store a working copy, replacing the record with the same serial in place
    pub fn commit(&mut self, thermostat: Thermostat) {
        match self.position(&thermostat.serial) {
            Some(index) => self.thermostats[index] = thermostat,
            None => self.thermostats.push(thermostat),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Thermostat> {
        self.thermostats.iter()
    }

    pub fn len(&self) -> usize {
        self.thermostats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thermostats.is_empty()
    }

    fn position(&self, serial: &str) -> Option<usize> {
        self.thermostats.iter().position(|t| t.serial == serial)
    }
}
