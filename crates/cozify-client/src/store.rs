use std::fs::{self, File};
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use tracing::{debug, info};

use crate::error::Result;

/// Section holding the cloud session.
pub const CLOUD: &str = "Cloud";
/// Section holding the default hub pointer.
pub const HUBS: &str = "Hubs";
/// Optional section holding `http` and `https` proxy addresses.
pub const PROXIES: &str = "Proxies";

/// Keys of the cloud section.
pub mod cloud_keys {
    /// Account email address.
    pub const EMAIL: &str = "email";
    /// Cloud token.
    pub const TOKEN: &str = "remotetoken";
    /// Last successful cloud token renewal, `%Y-%m-%dT%H:%M:%S` local time.
    pub const LAST_REFRESH: &str = "last_refresh";
}

/// Keys of a hub section.
pub mod hub_keys {
    /// Default hub pointer, stored in the [`HUBS`](super::HUBS) section.
    pub const DEFAULT: &str = "default";
    /// Hub token.
    pub const TOKEN: &str = "hubtoken";
    /// Last known local address. Empty when unknown.
    pub const HOST: &str = "host";
    /// Display name.
    pub const NAME: &str = "hubname";
    /// Whether calls are relayed through the cloud.
    pub const REMOTE: &str = "remote";
    /// Whether the remote flag follows observed reachability.
    pub const AUTOREMOTE: &str = "autoremote";
}

const TRUNCATED_SECTION: usize = 10;
const TRUNCATED_KEY: usize = 13;
const TRUNCATED_VALUE: usize = 100;

type Section = IndexMap<String, String>;

/// Returns the name of the section holding a hub.
#[must_use]
pub fn hub_section(hub_id: &str) -> String {
    format!("{HUBS}.{hub_id}")
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|value| !value.is_empty()).map(str::to_owned)
}

/// The cloud session as persisted.
///
/// A present token is not assumed valid: validity is only known after a
/// successful call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloudSession {
    /// Account email address.
    pub email: Option<String>,
    /// Cloud token.
    pub cloud_token: Option<String>,
    /// Last successful renewal timestamp, as stored.
    pub last_refresh: Option<String>,
}

/// A hub as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hub {
    /// Hub identifier assigned by the cloud.
    pub hub_id: String,
    /// Display name.
    pub name: Option<String>,
    /// Last known local address. Best-effort, may be stale or missing.
    pub host: Option<String>,
    /// Hub token.
    pub hub_token: Option<String>,
    /// Whether calls are relayed through the cloud.
    pub remote: bool,
    /// Whether the remote flag follows observed reachability.
    pub autoremote: bool,
}

/// A durable mapping of named sections to key/value attributes.
///
/// Every write is flushed to disk before returning. The file is readable by
/// its owner only since it stores live bearer tokens.
///
/// Concurrent writers, in the same process or not, are not coordinated.
#[derive(Debug, Clone, PartialEq)]
pub struct Store {
    path: Option<PathBuf>,
    sections: IndexMap<String, Section>,
}

impl Store {
    /// Creates a [`Store`] which is never written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        let mut store = Self {
            path: None,
            sections: IndexMap::new(),
        };
        store.ensure_base_sections();
        store
    }

    /// Opens the [`Store`] at the given path, creating it when missing.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, is not a valid state file, or
    /// cannot be written back.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let sections = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            toml::from_str::<IndexMap<String, Section>>(&contents)?
        } else {
            debug!("State file {} does not exist, creating it", path.display());
            IndexMap::new()
        };

        let mut store = Self {
            path: Some(path),
            sections,
        };
        store.ensure_base_sections();
        store.commit()?;
        Ok(store)
    }

    /// Returns the file backing the [`Store`], if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the value of an attribute.
    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|attributes| attributes.get(key))
            .map(String::as_str)
    }

    /// Checks whether an attribute is present and non-empty.
    #[must_use]
    pub fn exists(&self, section: &str, key: &str) -> bool {
        self.get(section, key).is_some_and(|value| !value.is_empty())
    }

    /// Checks whether a section is present.
    #[must_use]
    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    /// Returns all attributes of a section.
    #[must_use]
    pub fn section(&self, section: &str) -> Option<&IndexMap<String, String>> {
        self.sections.get(section)
    }

    /// Returns the names of all sections in storage order.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Sets an attribute, creating its section when missing, and flushes.
    ///
    /// # Errors
    ///
    /// Fails when the state cannot be written to disk.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) -> Result<()> {
        let attributes = self.sections.entry(section.to_owned()).or_default();
        if !attributes.contains_key(key) {
            info!("Attribute {key} was not already in {section} state, new attribute created.");
        }
        let _ = attributes.insert(key.to_owned(), value.into());
        self.commit()
    }

    /// Stores a boolean attribute.
    ///
    /// # Errors
    ///
    /// Fails when the state cannot be written to disk.
    pub fn set_bool(&mut self, section: &str, key: &str, value: bool) -> Result<()> {
        self.set(section, key, if value { "true" } else { "false" })
    }

    /// Reads a boolean attribute, returning `default` when missing or not
    /// readable as a boolean.
    #[must_use]
    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.get(section, key).and_then(parse_bool).unwrap_or(default)
    }

    /// Removes an attribute and flushes.
    ///
    /// # Errors
    ///
    /// Fails when the state cannot be written to disk.
    pub fn remove(&mut self, section: &str, key: &str) -> Result<Option<String>> {
        let removed = self
            .sections
            .get_mut(section)
            .and_then(|attributes| attributes.shift_remove(key));
        self.commit()?;
        Ok(removed)
    }

    /// Empties a section, keeping it present, and flushes.
    ///
    /// # Errors
    ///
    /// Fails when the state cannot be written to disk.
    pub fn clear_section(&mut self, section: &str) -> Result<()> {
        let _ = self.sections.insert(section.to_owned(), Section::new());
        self.commit()
    }

    /// Writes the whole state to disk.
    ///
    /// The file is replaced atomically and restricted to its owner. An
    /// in-memory [`Store`] ignores the call.
    ///
    /// # Errors
    ///
    /// Fails when the directory or the file cannot be written.
    pub fn commit(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                create_private_dir(parent)?;
            }
        }

        let contents = toml::to_string(&self.sections)?;

        let mut staging = path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        let mut file = open_private(&staging)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&staging, path)?;
        Ok(())
    }

    /// Renders the state for debugging. Long values are truncated.
    #[must_use]
    pub fn dump(&self) -> String {
        self.to_string()
    }

    /// Returns the persisted cloud session.
    #[must_use]
    pub fn cloud(&self) -> CloudSession {
        CloudSession {
            email: non_empty(self.get(CLOUD, cloud_keys::EMAIL)),
            cloud_token: non_empty(self.get(CLOUD, cloud_keys::TOKEN)),
            last_refresh: non_empty(self.get(CLOUD, cloud_keys::LAST_REFRESH)),
        }
    }

    /// Returns the identifier of the default hub.
    #[must_use]
    pub fn default_hub(&self) -> Option<&str> {
        self.get(HUBS, hub_keys::DEFAULT)
            .filter(|hub_id| !hub_id.is_empty())
    }

    /// Checks whether a hub is known.
    #[must_use]
    pub fn hub_exists(&self, hub_id: &str) -> bool {
        self.has_section(&hub_section(hub_id))
    }

    /// Returns a persisted hub.
    #[must_use]
    pub fn hub(&self, hub_id: &str) -> Option<Hub> {
        let section = hub_section(hub_id);
        if !self.has_section(&section) {
            return None;
        }
        Some(Hub {
            hub_id: hub_id.to_owned(),
            name: non_empty(self.get(&section, hub_keys::NAME)),
            host: non_empty(self.get(&section, hub_keys::HOST)),
            hub_token: non_empty(self.get(&section, hub_keys::TOKEN)),
            remote: self.get_bool(&section, hub_keys::REMOTE, false),
            autoremote: self.get_bool(&section, hub_keys::AUTOREMOTE, true),
        })
    }

    /// Returns all persisted hubs in storage order.
    #[must_use]
    pub fn hubs(&self) -> Vec<Hub> {
        let prefix = format!("{HUBS}.");
        self.sections()
            .filter_map(|section| section.strip_prefix(prefix.as_str()))
            .filter_map(|hub_id| self.hub(hub_id))
            .collect()
    }

    fn ensure_base_sections(&mut self) {
        for section in [CLOUD, HUBS] {
            if !self.sections.contains_key(section) {
                let _ = self.sections.insert(section.to_owned(), Section::new());
            }
        }
    }
}

impl std::fmt::Display for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (section, attributes) in &self.sections {
            writeln!(f, "[{section:.TRUNCATED_SECTION$}]")?;
            for (key, value) in attributes {
                writeln!(
                    f,
                    "  {key:<TRUNCATED_KEY$.TRUNCATED_KEY$} = {value:>10.TRUNCATED_VALUE$}"
                )?;
            }
        }
        Ok(())
    }
}

// Creates a fresh file which is never readable by other users, not even
// while it is being filled.
fn open_private(path: &Path) -> Result<File> {
    match fs::remove_file(path) {
        Err(error) if error.kind() != IoErrorKind::NotFound => return Err(error.into()),
        _ => {}
    }

    let mut options = fs::OpenOptions::new();
    let _ = options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        let _ = options.mode(0o600);
    }
    Ok(options.open(path)?)
}

#[cfg(unix)]
fn create_private_dir(path: &Path) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(path)?;
    Ok(())
}

#[cfg(not(unix))]
fn create_private_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}
