#![no_main]

use common_utils::collections::{LanguageSet, Named, NamedCollection};
use libfuzzer_sys::fuzz_target;

#[derive(serde::Deserialize, serde::Serialize)]
struct Item {
    name: String,
    #[serde(default)]
    languages: Option<LanguageSet>,
}

impl Named for Item {
    fn name(&self) -> &str {
        &self.name
    }
}

fuzz_target!(|data: &[u8]| {
    // Malformed or duplicate-laden documents must fail cleanly, never panic
    if let Ok(collection) = serde_json::from_slice::<NamedCollection<Item>>(data) {
        for (position, item) in collection.iter().enumerate() {
            assert_eq!(collection.index_of(item.name()), Some(position));
        }
        let json = serde_json::to_vec(&collection).expect("serializable");
        let again: NamedCollection<Item> = serde_json::from_slice(&json).expect("round trip");
        assert_eq!(again.len(), collection.len());
    }
});
