//! Integration tests for column addresses.
//!
//! Addresses are dotted paths where a trailing `#` (or a digit run in a
//! concrete header) marks a repeated segment.

use herbarium::path::{self, Segment};

// ============================================================================
// Normalization
// ============================================================================

#[test]
fn test_concrete_headers_normalize_to_declared_address() {
    assert_eq!(path::normalize("Size.Wingspan2"), "size.wingspan#");
    assert_eq!(path::normalize("habitat12"), "habitat#");
    assert_eq!(path::normalize("habitat#"), "habitat#");
}

#[test]
fn test_validity() {
    assert!(path::is_valid("size.wingspan#"));
    assert!(path::is_valid("habitat2.name"));
    assert!(!path::is_valid("size..wingspan"));
    assert!(!path::is_valid("2size"));
    assert!(!path::is_valid("size."));
    assert!(!path::is_valid(""));
}

// ============================================================================
// Segments
// ============================================================================

#[test]
fn test_segments_split_repeat_markers() {
    assert_eq!(
        path::segments("habit#.name"),
        vec![
            Segment::Name("habit".to_string()),
            Segment::Repeat,
            Segment::Name("name".to_string()),
        ]
    );
}

#[test]
fn test_segments_round_trip_through_address() {
    for address in ["notes", "habit#", "habit#.name", "size.wingspan#"] {
        let segments = path::segments(address);
        assert_eq!(path::segments_to_address(&segments), address);
    }
}

#[test]
fn test_key_and_parent() {
    assert_eq!(path::key("size.wingspan#"), "wingspan");
    assert_eq!(path::key("notes"), "notes");
    assert_eq!(path::parent("size.wingspan#").as_deref(), Some("size"));
    assert_eq!(path::parent("notes"), None);
    assert_eq!(
        path::intermediate_addresses("a.b#.c"),
        vec!["a".to_string(), "a.b#".to_string()]
    );
}

#[test]
fn test_with_position_replaces_marker() {
    assert_eq!(path::with_position("size.wingspan#", 3), "size.wingspan3");
    assert!(path::is_repeated("size.wingspan#"));
    assert!(!path::is_repeated("size"));
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn test_classify_against_declared_addresses() {
    let known = ["habitat#", "size", "size.wingspan#", "notes"];

    let size = path::classify(&known, "size");
    assert!(size.is_root);
    assert!(size.has_children);
    assert!(!size.is_leaf);
    assert!(!size.is_simple_item);

    let wingspan = path::classify(&known, "size.wingspan#");
    assert!(!wingspan.is_root);
    assert!(wingspan.is_leaf);

    let notes = path::classify(&known, "notes");
    assert!(notes.is_simple_item);
}

#[test]
fn test_classify_sees_children_of_repeated_address() {
    let known = ["habit#", "habit#.name"];
    assert!(path::classify(&known, "habit").has_children);
    assert!(path::classify(&known, "habit#").has_children);
}
