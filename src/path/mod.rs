//! Addresses naming schema columns and compiled record fields.
//!
//! An address is a dot-separated list of segments. A segment is a name,
//! optionally followed by a positional number (`habit1`) or the repeat
//! marker (`habit#`). Both forms mean "an item of a repeated field", so
//! addresses are compared in their normalized form where every digit run
//! has been replaced by the marker:
//!
//! ```text
//! Size.Wingspan12   ──normalize──▶   size.wingspan#
//! ```
//!
//! The path model only classifies well-formed input. Malformed addresses are
//! reported by the schema engine through [`is_valid`].

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Separator between address segments.
pub const SEPARATOR: char = '.';

/// Marker denoting a repeated (list-valued) segment.
pub const REPEAT_MARKER: char = '#';

static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").unwrap());

static WELL_FORMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z]+(?:[0-9]+|#)?(?:\.[A-Za-z]+(?:[0-9]+|#)?)*$").unwrap()
});

/// One segment of an address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A field name, always lower-case after parsing.
    Name(String),
    /// The repeat marker that follows a repeated field name.
    Repeat,
}

impl Segment {
    /// The field name, or `None` for the repeat marker.
    pub fn name(&self) -> Option<&str> {
        match self {
            Segment::Name(name) => Some(name),
            Segment::Repeat => None,
        }
    }

    pub fn is_repeat(&self) -> bool {
        matches!(self, Segment::Repeat)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Name(name) => write!(f, "{}", name),
            Segment::Repeat => write!(f, "{}", REPEAT_MARKER),
        }
    }
}

/// Structural flags of an address relative to a set of known addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AddressClass {
    /// The address has no separator.
    pub is_root: bool,
    /// Some other known address is nested below this one.
    pub has_children: bool,
    /// Nothing is nested below this address.
    pub is_leaf: bool,
    /// Root and leaf at the same time.
    pub is_simple_item: bool,
}

/// Lower-case the address and replace every digit run with the repeat marker.
pub fn normalize(address: &str) -> String {
    DIGIT_RUN
        .replace_all(&address.to_lowercase(), REPEAT_MARKER.to_string().as_str())
        .into_owned()
}

/// Whether the address only uses letters, digits, separators and repeat markers
/// in the allowed positions.
pub fn is_valid(address: &str) -> bool {
    WELL_FORMED.is_match(address)
}

/// Split an address into segments.
///
/// The address is normalized first, so `habit2.name` and `habit#.name` yield
/// the same segments.
pub fn segments(address: &str) -> Vec<Segment> {
    let normalized = normalize(address);
    let mut out = Vec::new();
    for part in normalized.split(SEPARATOR) {
        match part.strip_suffix(REPEAT_MARKER) {
            Some(name) => {
                if !name.is_empty() {
                    out.push(Segment::Name(name.to_string()));
                }
                out.push(Segment::Repeat);
            }
            None => out.push(Segment::Name(part.to_string())),
        }
    }
    out
}

/// Join segments back into an address string.
pub fn segments_to_address(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Name(name) => {
                if !out.is_empty() {
                    out.push(SEPARATOR);
                }
                out.push_str(name);
            }
            Segment::Repeat => out.push(REPEAT_MARKER),
        }
    }
    out
}

/// Classify `address` against every address in `known`.
pub fn classify<S: AsRef<str>>(known: &[S], address: &str) -> AddressClass {
    let address = normalize(address);
    let dotted = format!("{}{}", address, SEPARATOR);
    let repeated = format!("{}{}", address, REPEAT_MARKER);

    let has_children = known.iter().any(|other| {
        let other = normalize(other.as_ref());
        other != address && (other.starts_with(&dotted) || other.starts_with(&repeated))
    });
    let is_root = !address.contains(SEPARATOR);
    let is_leaf = !has_children;

    AddressClass {
        is_root,
        has_children,
        is_leaf,
        is_simple_item: is_root && is_leaf,
    }
}

/// The address one level up, or `None` for a root address.
pub fn parent(address: &str) -> Option<String> {
    let normalized = normalize(address);
    normalized
        .rfind(SEPARATOR)
        .map(|idx| normalized[..idx].to_string())
}

/// Every address implied by `address` above it, outermost first.
///
/// `a.b#.c` implies `a` and `a.b#`.
pub fn intermediate_addresses(address: &str) -> Vec<String> {
    let normalized = normalize(address);
    normalized
        .match_indices(SEPARATOR)
        .map(|(idx, _)| normalized[..idx].to_string())
        .collect()
}

/// The last segment's key, without repeat marker.
pub fn key(address: &str) -> String {
    let normalized = normalize(address);
    let last = normalized.rsplit(SEPARATOR).next().unwrap_or_default();
    last.trim_end_matches(REPEAT_MARKER).to_string()
}

/// Whether the address denotes a list of items.
pub fn is_repeated(address: &str) -> bool {
    normalize(address).ends_with(REPEAT_MARKER)
}

/// Replace the trailing repeat marker with a concrete position (1-based).
pub fn with_position(address: &str, position: usize) -> String {
    match address.strip_suffix(REPEAT_MARKER) {
        Some(prefix) => format!("{}{}", prefix, position),
        None => format!("{}{}", address, position),
    }
}
