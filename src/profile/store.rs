//! # Profile Store
//!
//! Loads, persists and migrates the mapping profile document.
//!
//! The in-memory profile is held behind an `Arc` that is swapped as a whole
//! on every load or mutation, so readers (the engine loop) always see either
//! the complete old profile or the complete new one.

use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};

use super::{AxisDirection, MappingProfile, Mode, ModeMap};
use crate::error::Result;

/// What `load()` found in the backing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A two-mode document was read as-is.
    Loaded,
    /// The file was missing, empty or unreadable; a default was written.
    Initialized,
    /// A legacy `{"buttons": ...}` document was converted and rewritten.
    Migrated,
}

/// File-backed mapping profile shared between the engine and editors.
#[derive(Debug)]
pub struct ProfileStore {
    path: PathBuf,
    current: RwLock<Arc<MappingProfile>>,
    /// Serializes read-modify-write mutations.
    writer: Mutex<()>,
}

impl ProfileStore {
    /// Opens the store at `path` and loads it.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read, or if the
    /// self-healing rewrite fails.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use joypad_remap::profile::{Mode, ProfileStore};
    ///
    /// let store = ProfileStore::open("config/profile.json")?;
    /// store.set_button_mapping(Mode::Analog, 304, "BTN_A")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            current: RwLock::new(Arc::new(MappingProfile::default())),
            writer: Mutex::new(()),
        };
        store.load()?;
        Ok(store)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the backing file, replacing the in-memory profile.
    ///
    /// Missing, empty or unparsable files are replaced with the default
    /// two-mode structure. A legacy flat `buttons` document is migrated into
    /// `analog.buttons` and written back.
    pub fn load(&self) -> Result<LoadOutcome> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let contents = match fs::read(&self.path) {
            Ok(contents) => Some(contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let (profile, outcome) = match contents {
            None => {
                info!("No mapping profile at {}, creating default", self.path.display());
                (MappingProfile::default(), LoadOutcome::Initialized)
            }
            Some(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => {
                info!("Mapping profile {} is empty, creating default", self.path.display());
                (MappingProfile::default(), LoadOutcome::Initialized)
            }
            Some(bytes) => match parse_document(&bytes) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(
                        "Mapping profile {} is unreadable ({}), resetting to default",
                        self.path.display(),
                        e
                    );
                    (MappingProfile::default(), LoadOutcome::Initialized)
                }
            },
        };

        if outcome != LoadOutcome::Loaded {
            write_document(&self.path, &profile)?;
        }
        if outcome == LoadOutcome::Migrated {
            info!("Migrated legacy mapping profile at {}", self.path.display());
        }

        self.replace(profile);
        Ok(outcome)
    }

    /// Writes the current in-memory profile to the backing file.
    pub fn save(&self) -> Result<()> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        write_document(&self.path, &self.snapshot())
    }

    /// Returns the current profile. Cheap; the engine calls this per event batch.
    #[must_use]
    pub fn snapshot(&self) -> Arc<MappingProfile> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Binds a physical key code under `mode` and persists immediately.
    pub fn set_button_mapping(&self, mode: Mode, code: u16, virtual_name: &str) -> Result<()> {
        self.mutate(|profile| profile.set_button(mode, code, virtual_name))?;
        info!("[{}] button {} -> {}", mode, code, virtual_name);
        Ok(())
    }

    /// Binds a physical axis (optionally one direction) under `mode` and persists immediately.
    pub fn set_axis_mapping(
        &self,
        mode: Mode,
        code: u16,
        direction: Option<AxisDirection>,
        virtual_name: &str,
    ) -> Result<()> {
        self.mutate(|profile| profile.set_axis(mode, code, direction, virtual_name))?;
        info!("[{}] axis {} ({:?}) -> {}", mode, code, direction, virtual_name);
        Ok(())
    }

    /// See [`MappingProfile::translate_button`].
    #[must_use]
    pub fn translate_button(&self, mode: Mode, code: u16) -> Option<String> {
        self.snapshot().translate_button(mode, code).map(str::to_owned)
    }

    /// See [`MappingProfile::translate_axis`].
    #[must_use]
    pub fn translate_axis(
        &self,
        mode: Mode,
        code: u16,
        direction: Option<AxisDirection>,
    ) -> Option<String> {
        self.snapshot()
            .translate_axis(mode, code, direction)
            .map(str::to_owned)
    }

    /// See [`MappingProfile::has_axis_direction_mappings`].
    #[must_use]
    pub fn has_axis_direction_mappings(&self, mode: Mode, code: u16) -> bool {
        self.snapshot().has_axis_direction_mappings(mode, code)
    }

    /// See [`MappingProfile::is_empty`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    fn mutate<F: FnOnce(&mut MappingProfile)>(&self, edit: F) -> Result<()> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut profile = MappingProfile::clone(&self.snapshot());
        edit(&mut profile);
        write_document(&self.path, &profile)?;
        self.replace(profile);
        Ok(())
    }

    fn replace(&self, profile: MappingProfile) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(profile);
    }
}

/// Parses a profile document, recognizing the legacy flat layout.
fn parse_document(bytes: &[u8]) -> Result<(MappingProfile, LoadOutcome)> {
    let value: Value = serde_json::from_slice(bytes)?;

    let is_legacy = value.get("buttons").is_some()
        && value.get("analog").is_none()
        && value.get("digital").is_none();

    if is_legacy {
        let buttons = serde_json::from_value(value["buttons"].clone())?;
        let profile = MappingProfile {
            analog: ModeMap {
                buttons,
                ..ModeMap::default()
            },
            digital: ModeMap::default(),
        };
        return Ok((profile, LoadOutcome::Migrated));
    }

    Ok((serde_json::from_value(value)?, LoadOutcome::Loaded))
}

/// Writes `profile` next to `path` and renames it into place.
fn write_document(path: &Path, profile: &MappingProfile) -> Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    let mut contents = serde_json::to_string_pretty(profile)?;
    contents.push('\n');

    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path)?;
    debug!("Saved mapping profile to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ProfileStore {
        ProfileStore::open(dir.path().join("config").join("profile.json")).unwrap()
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_missing_file_initializes_default() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(store.is_empty());
        assert!(store.path().exists(), "default profile should be persisted");

        let doc = read_json(store.path());
        assert!(doc["analog"]["buttons"].as_object().unwrap().is_empty());
        assert!(doc["digital"]["axes"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_empty_file_initializes_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profile.json");
        fs::write(&path, "   \n").unwrap();

        let store = ProfileStore::open(&path).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.load().unwrap(), LoadOutcome::Loaded);
    }

    #[test]
    fn test_corrupt_file_self_heals() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profile.json");
        fs::write(&path, "{ not json").unwrap();

        let store = ProfileStore::open(&path).unwrap();
        assert!(store.is_empty());
        // The broken file was replaced by a valid document
        let doc = read_json(&path);
        assert!(doc.get("analog").is_some());
        assert!(doc.get("digital").is_some());
    }

    #[test]
    fn test_invalid_utf8_file_self_heals() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profile.json");
        fs::write(&path, [0xff, 0xfe, b'{', b'}']).unwrap();

        let store = ProfileStore::open(&path).unwrap();
        assert!(store.is_empty());
        let doc = read_json(&path);
        assert!(doc.get("analog").is_some());
        assert_eq!(store.load().unwrap(), LoadOutcome::Loaded);
    }

    #[test]
    fn test_legacy_document_is_migrated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profile.json");
        fs::write(&path, r#"{"buttons": {"1": "BTN_A"}}"#).unwrap();

        let store = ProfileStore::open(&path).unwrap();
        assert_eq!(store.translate_button(Mode::Analog, 1).as_deref(), Some("BTN_A"));
        assert_eq!(store.translate_button(Mode::Digital, 1), None);

        let doc = read_json(&path);
        assert_eq!(doc["analog"]["buttons"]["1"], "BTN_A");
        assert!(doc["digital"]["buttons"].as_object().unwrap().is_empty());
        assert!(doc.get("buttons").is_none());
    }

    #[test]
    fn test_load_reports_migration_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profile.json");
        fs::write(&path, r#"{"buttons": {"2": "BTN_B"}}"#).unwrap();

        let store = ProfileStore::open(&path).unwrap();
        // File was rewritten in the new layout, so a reload is a plain load
        assert_eq!(store.load().unwrap(), LoadOutcome::Loaded);
        assert_eq!(store.translate_button(Mode::Analog, 2).as_deref(), Some("BTN_B"));
    }

    #[test]
    fn test_set_mapping_persists_immediately() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.set_button_mapping(Mode::Analog, 304, "BTN_A").unwrap();
        store
            .set_axis_mapping(Mode::Digital, 16, Some(AxisDirection::Negative), "BTN_DPAD_LEFT")
            .unwrap();

        let doc = read_json(store.path());
        assert_eq!(doc["analog"]["buttons"]["304"], "BTN_A");
        assert_eq!(doc["digital"]["axes"]["16:-1"], "BTN_DPAD_LEFT");
        assert!(!store.is_empty());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.set_button_mapping(Mode::Analog, 288, "BTN_X").unwrap();
        store.set_button_mapping(Mode::Digital, 289, "BTN_Y").unwrap();
        store
            .set_axis_mapping(Mode::Analog, 17, Some(AxisDirection::Positive), "BTN_DPAD_DOWN")
            .unwrap();
        store.set_axis_mapping(Mode::Analog, 16, None, "ABS_HAT0X").unwrap();
        let before = store.snapshot();

        store.save().unwrap();
        let reopened = ProfileStore::open(store.path()).unwrap();
        assert_eq!(*reopened.snapshot(), *before);
    }

    #[test]
    fn test_snapshot_is_not_affected_by_later_mutation() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let old = store.snapshot();

        store.set_button_mapping(Mode::Analog, 304, "BTN_A").unwrap();

        assert!(old.is_empty());
        assert!(!store.snapshot().is_empty());
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.set_button_mapping(Mode::Analog, 304, "BTN_A").unwrap();

        let leftovers: Vec<_> = fs::read_dir(store.path().parent().unwrap())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
