#![no_main]

use common_utils::collections::{LanguageSet, LanguageTag};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(set) = LanguageSet::parse(s) {
        // Display output must parse back to the same set
        let reparsed = LanguageSet::parse(&set.to_string()).expect("display output is parseable");
        assert_eq!(set, reparsed);

        for tag in &set {
            assert!(set.matches(tag));
            assert_eq!(set.best_match([tag]), Some(tag));
            assert_eq!(tag.fallback_chain().next().as_ref(), Some(tag));
        }
    }

    if let Ok(tag) = s.parse::<LanguageTag>() {
        assert_eq!(LanguageTag::parse(tag.as_str()).ok(), Some(tag));
    }
});
