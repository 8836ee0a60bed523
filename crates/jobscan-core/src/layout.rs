//! Selector rule sets as plain data.
//!
//! A [`Layout`] describes where each [`Field`] of a listing lives in a job
//! board's HTML. The rules are evaluated by an [`Extractor`](crate::traits::Extractor)
//! implementation; this module only owns the data and the text shaping that
//! runs on every extracted value.

use url::Url;

/// A listing field that a selector rule can populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Company,
    Location,
    Description,
    Link,
    PostedAgo,
    Salary,
    LogoUrl,
    ApplyStatus,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Company => "company",
            Field::Location => "location",
            Field::Description => "description",
            Field::Link => "link",
            Field::PostedAgo => "postedAgo",
            Field::Salary => "salary",
            Field::LogoUrl => "logoUrl",
            Field::ApplyStatus => "applyStatus",
        }
    }
}

/// How the value is read from a matched element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessor {
    /// Descendant text nodes, joined with spaces.
    Text,
    /// Value of the named attribute.
    Attr(&'static str),
    /// `src` of an `<img>` inside the element, falling back to the markup
    /// wrapped in a nested `<noscript>`.
    NoscriptImage,
}

/// Field-specific clean-up applied after baseline normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Remove every occurrence of a decorative label (ASCII case-insensitive).
    Strip(&'static str),
    /// Replace the first occurrence of `from` with `to`.
    Replace {
        from: &'static str,
        to: &'static str,
    },
}

impl Transform {
    fn apply(&self, value: &str) -> String {
        match self {
            Transform::Strip(label) => strip_ignore_ascii_case(value, label),
            Transform::Replace { from, to } => value.replacen(from, to, 1),
        }
    }
}

/// One `field <- selector -> accessor -> transforms` rule.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: Field,
    pub selector: &'static str,
    pub accessor: Accessor,
    pub transforms: &'static [Transform],
}

impl FieldRule {
    pub const fn text(field: Field, selector: &'static str) -> Self {
        Self {
            field,
            selector,
            accessor: Accessor::Text,
            transforms: &[],
        }
    }

    pub const fn attr(field: Field, selector: &'static str, attr: &'static str) -> Self {
        Self {
            field,
            selector,
            accessor: Accessor::Attr(attr),
            transforms: &[],
        }
    }

    pub const fn with(mut self, transforms: &'static [Transform]) -> Self {
        self.transforms = transforms;
        self
    }

    pub const fn via(mut self, accessor: Accessor) -> Self {
        self.accessor = accessor;
        self
    }

    /// Turn a raw extracted value into the stored value.
    ///
    /// Returns `None` when nothing meaningful is left, so a blank match is
    /// indistinguishable from no match at all. Links are resolved against
    /// `base_url`.
    pub fn shape(&self, raw: &str, base_url: &str) -> Option<String> {
        let mut value = normalize_text(raw)?;
        for transform in self.transforms {
            value = transform.apply(&value);
        }
        let value = normalize_text(&value)?;

        if self.field == Field::Link {
            return absolutize(base_url, &value);
        }
        Some(value)
    }
}

/// Where the repeating listing structure lives in a page.
#[derive(Debug, Clone, Copy)]
pub enum Layout {
    /// Each listing is a card element; field selectors are scoped to the card.
    Cards {
        card: &'static str,
        fields: &'static [FieldRule],
    },
    /// Each field selector runs over the whole page and the Nth match of
    /// every field forms listing N. The listing count is the shortest column.
    Columns { fields: &'static [FieldRule] },
}

impl Layout {
    pub fn fields(&self) -> &'static [FieldRule] {
        match self {
            Layout::Cards { fields, .. } | Layout::Columns { fields } => fields,
        }
    }
}

/// Collapse whitespace runs (non-breaking spaces included) to a single space
/// and trim. Empty results become `None`.
pub fn normalize_text(raw: &str) -> Option<String> {
    let collapsed = raw
        .replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Resolve a possibly relative `href` against the source's base URL.
pub fn absolutize(base_url: &str, href: &str) -> Option<String> {
    let base = Url::parse(base_url).ok()?;
    base.join(href).ok().map(String::from)
}

fn strip_ignore_ascii_case(value: &str, label: &str) -> String {
    if label.is_empty() {
        return value.to_string();
    }
    // ASCII lowercasing keeps byte offsets aligned with the original.
    let haystack = value.to_ascii_lowercase();
    let needle = label.to_ascii_lowercase();

    let mut out = String::with_capacity(value.len());
    let mut cursor = 0;
    while let Some(pos) = haystack[cursor..].find(&needle) {
        out.push_str(&value[cursor..cursor + pos]);
        cursor += pos + needle.len();
    }
    out.push_str(&value[cursor..]);
    out
}
