//! Declarative integrity rules attached to schema columns.

use std::sync::LazyLock;

use regex::Regex;

use crate::path;

/// Allowed shape of a cell's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentClass {
    /// Anything goes.
    Text,
    /// One of an enumerated set of values (case-insensitive).
    List(&'static [&'static str]),
    /// A bare column name: a letter followed by letters or digits.
    ColumnName,
    /// A CSS color: hex, functional notation, or a named color.
    CssColor,
    /// A file name carrying one of the allowed extensions.
    Filename(&'static [&'static str]),
    /// An absolute URL.
    Url,
    /// A well-formed column address.
    Address,
    /// A regular expression that compiles.
    Regex,
}

/// What to do when a value appears twice in a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    Allowed,
    Disallowed,
    /// Empty cells may repeat, everything else must be unique.
    DisallowedExceptEmpty,
}

/// The full rule set for one schema column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrityRule {
    pub content: ContentClass,
    pub allow_empty: bool,
    pub duplicates: DuplicatePolicy,
    /// Substituted for empty cells before any check runs.
    pub default: Option<&'static str>,
    /// The column may carry `:lang` variants.
    pub multilingual: bool,
}

impl IntegrityRule {
    /// Optional content of the given class, duplicates allowed.
    pub const fn of(content: ContentClass) -> Self {
        Self {
            content,
            allow_empty: true,
            duplicates: DuplicatePolicy::Allowed,
            default: None,
            multilingual: false,
        }
    }

    pub const fn required(mut self) -> Self {
        self.allow_empty = false;
        self
    }

    pub const fn unique(mut self) -> Self {
        self.duplicates = DuplicatePolicy::Disallowed;
        self
    }

    pub const fn unique_except_empty(mut self) -> Self {
        self.duplicates = DuplicatePolicy::DisallowedExceptEmpty;
        self
    }

    pub const fn default_value(mut self, value: &'static str) -> Self {
        self.default = Some(value);
        self
    }

    pub const fn multilingual(mut self) -> Self {
        self.multilingual = true;
        self
    }
}

static COLUMN_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]*$").unwrap());

static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").unwrap()
});

static FUNCTIONAL_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?i:rgba?|hsla?)\(\s*-?[0-9.]+(?:deg|%)?\s*(?:[,\s]\s*-?[0-9.]+%?\s*){2}(?:[,/]\s*[0-9.]+%?\s*)?\)$",
    )
    .unwrap()
});

static FILENAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\\/:*?<>|]+\.([A-Za-z0-9]+)$").unwrap());

/// CSS level 4 named colors.
const NAMED_COLORS: &[&str] = &[
    "aliceblue", "antiquewhite", "aqua", "aquamarine", "azure", "beige", "bisque", "black",
    "blanchedalmond", "blue", "blueviolet", "brown", "burlywood", "cadetblue", "chartreuse",
    "chocolate", "coral", "cornflowerblue", "cornsilk", "crimson", "cyan", "darkblue",
    "darkcyan", "darkgoldenrod", "darkgray", "darkgreen", "darkgrey", "darkkhaki",
    "darkmagenta", "darkolivegreen", "darkorange", "darkorchid", "darkred", "darksalmon",
    "darkseagreen", "darkslateblue", "darkslategray", "darkslategrey", "darkturquoise",
    "darkviolet", "deeppink", "deepskyblue", "dimgray", "dimgrey", "dodgerblue", "firebrick",
    "floralwhite", "forestgreen", "fuchsia", "gainsboro", "ghostwhite", "gold", "goldenrod",
    "gray", "green", "greenyellow", "grey", "honeydew", "hotpink", "indianred", "indigo",
    "ivory", "khaki", "lavender", "lavenderblush", "lawngreen", "lemonchiffon", "lightblue",
    "lightcoral", "lightcyan", "lightgoldenrodyellow", "lightgray", "lightgreen", "lightgrey",
    "lightpink", "lightsalmon", "lightseagreen", "lightskyblue", "lightslategray",
    "lightslategrey", "lightsteelblue", "lightyellow", "lime", "limegreen", "linen", "magenta",
    "maroon", "mediumaquamarine", "mediumblue", "mediumorchid", "mediumpurple",
    "mediumseagreen", "mediumslateblue", "mediumspringgreen", "mediumturquoise",
    "mediumvioletred", "midnightblue", "mintcream", "mistyrose", "moccasin", "navajowhite",
    "navy", "oldlace", "olive", "olivedrab", "orange", "orangered", "orchid", "palegoldenrod",
    "palegreen", "paleturquoise", "palevioletred", "papayawhip", "peachpuff", "peru", "pink",
    "plum", "powderblue", "purple", "rebeccapurple", "red", "rosybrown", "royalblue",
    "saddlebrown", "salmon", "sandybrown", "seagreen", "seashell", "sienna", "silver",
    "skyblue", "slateblue", "slategray", "slategrey", "snow", "springgreen", "steelblue", "tan",
    "teal", "thistle", "tomato", "transparent", "turquoise", "violet", "wheat", "white",
    "whitesmoke", "yellow", "yellowgreen",
];

impl ContentClass {
    /// Whether a non-empty `value` belongs to this class.
    pub fn accepts(&self, value: &str) -> bool {
        let value = value.trim();
        match self {
            ContentClass::Text => true,
            ContentClass::List(options) => options.iter().any(|o| o.eq_ignore_ascii_case(value)),
            ContentClass::ColumnName => COLUMN_NAME.is_match(value),
            ContentClass::CssColor => is_css_color(value),
            ContentClass::Filename(extensions) => FILENAME
                .captures(value)
                .and_then(|caps| caps.get(1))
                .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext.as_str()))),
            ContentClass::Url => url::Url::parse(value).is_ok_and(|u| u.has_host()),
            ContentClass::Address => path::is_valid(value),
            ContentClass::Regex => Regex::new(value).is_ok(),
        }
    }

    /// Human-readable name used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            ContentClass::Text => "text".to_string(),
            ContentClass::List(options) => format!("choice (one of: {})", options.join(", ")),
            ContentClass::ColumnName => "column name".to_string(),
            ContentClass::CssColor => "CSS color".to_string(),
            ContentClass::Filename(extensions) => {
                format!("file name ({})", extensions.join(", "))
            }
            ContentClass::Url => "absolute URL".to_string(),
            ContentClass::Address => "column address".to_string(),
            ContentClass::Regex => "regular expression".to_string(),
        }
    }
}

pub fn is_css_color(value: &str) -> bool {
    HEX_COLOR.is_match(value)
        || FUNCTIONAL_COLOR.is_match(value)
        || NAMED_COLORS.contains(&value.to_ascii_lowercase().as_str())
}
