use meshmap_topology::{canonical_route, find_parent, Route};
use proptest::prelude::*;

fn hex_label() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[0-9a-f]{1,4}(\\.[0-9a-f]{4}){0,3}").unwrap()
}

proptest! {
    #[test]
    fn canonical_routes_are_deterministic_bit_strings(label in hex_label()) {
        let first = canonical_route(&label).expect("hex label");
        let second = canonical_route(&label).expect("hex label");
        prop_assert_eq!(&first, &second);
        prop_assert!(first.chars().all(|c| c == '0' || c == '1'));
    }

    #[test]
    fn canonicalization_never_panics_on_arbitrary_input(label in "\\PC{0,32}") {
        let _ = canonical_route(&label);
    }

    /// If one canonical route properly prefixes another, the longer row's
    /// parent is at least as long as that prefix.
    #[test]
    fn parent_is_at_least_as_long_as_any_proper_prefix(
        prefix in "[01]{0,6}",
        extension in "[01]{1,6}",
        noise in "[01]{0,8}",
    ) {
        let child = format!("{prefix}{extension}");
        let routes = vec![
            Route { ip: "p".to_string(), bits: prefix.clone(), quality: 1.0 },
            Route { ip: "c".to_string(), bits: child, quality: 1.0 },
            Route { ip: "n".to_string(), bits: noise, quality: 1.0 },
        ];
        let parent = find_parent(&routes, 1).expect("a proper prefix exists");
        prop_assert!(routes[parent].bits.len() >= prefix.len());
    }
}
