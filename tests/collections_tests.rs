//! Integration tests for the collection types
//!
//! Persists a settings document built from the collections through the atomic
//! I/O layer and reads it back.

#![cfg(feature = "serde")]

use common_utils::collections::{LanguageSet, LanguageTag, MultiMap, Named, NamedCollection};
use common_utils::io::{atomic_read, atomic_write_with};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Preset {
    name: String,
    id: Uuid,
    languages: LanguageSet,
}

impl Named for Preset {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Settings {
    presets: NamedCollection<Preset>,
    shortcuts: MultiMap<String, String>,
}

fn preset(name: &str, languages: &str) -> Preset {
    Preset {
        name: name.to_string(),
        id: Uuid::new_v4(),
        languages: languages.parse().unwrap(),
    }
}

#[test]
fn test_settings_persist_through_atomic_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    let mut settings = Settings {
        presets: NamedCollection::new(),
        shortcuts: MultiMap::new(),
    };
    settings.presets.push(preset("Work", "en-US, de")).unwrap();
    settings.presets.push(preset("Home", "nl")).unwrap();
    settings.shortcuts.insert("save".to_string(), "Ctrl+S".to_string());
    settings.shortcuts.insert("save".to_string(), "F2".to_string());

    atomic_write_with(&path, Default::default(), |w| {
        serde_json::to_writer_pretty(&mut *w, &settings).map_err(std::io::Error::from)?;
        Ok(())
    })
    .unwrap();

    let loaded: Settings = serde_json::from_slice(&atomic_read(&path).unwrap()).unwrap();
    let names: Vec<_> = loaded.presets.names().collect();
    assert_eq!(names, ["Work", "Home"]);
    assert_eq!(loaded.presets.get("Work"), settings.presets.get("Work"));
    assert_eq!(loaded.shortcuts.get("save"), ["Ctrl+S", "F2"]);
}

#[test]
fn test_failed_serialization_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "previous").unwrap();

    let result = atomic_write_with(&path, Default::default(), |w| {
        std::io::Write::write_all(w, b"{ half")?;
        Err(common_utils::CommonError::DuplicateName("Work".to_string()))
    });

    assert!(result.is_err());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous");
}

#[test]
fn test_preset_selection_by_language() {
    let presets = NamedCollection::try_from(vec![
        preset("Europe", "de, fr, nl"),
        preset("Americas", "en-US, pt-BR, es-419"),
    ])
    .unwrap();

    let wanted: Vec<LanguageTag> = ["pt-BR", "en-GB"]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();

    let chosen = presets
        .iter()
        .find(|p| p.languages.best_match(&wanted).is_some())
        .unwrap();
    assert_eq!(chosen.name(), "Americas");

    let swiss: LanguageTag = "de-CH".parse().unwrap();
    assert!(presets.get("Europe").unwrap().languages.matches(&swiss));
}

#[test]
fn test_duplicate_preset_in_file_is_rejected() {
    let json = format!(
        r#"[{{"name":"A","id":"{id}","languages":"en"}},{{"name":"A","id":"{id}","languages":"de"}}]"#,
        id = Uuid::nil()
    );
    let result: Result<NamedCollection<Preset>, _> = serde_json::from_str(&json);
    assert!(result.is_err());
}
