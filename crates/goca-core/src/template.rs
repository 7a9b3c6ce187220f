//! Dynamic template decoding.
//!
//! OpenNebula templates mix well-known attributes with arbitrary user-defined
//! ones. Two decoding strategies are offered for the part that is not modeled
//! as fixed fields:
//!
//! - [`TemplateMap`] collapses children into a key → value map. When a key
//!   repeats, the last occurrence wins.
//! - [`Template`] keeps an ordered list of [`Pair`]s, so repeated keys such as
//!   several `NIC` blocks are preserved.
//!
//! Both are pure functions of the input element. [`Template`] also renders
//! back to the OpenNebula template syntax accepted by `allocate` and `update`.

use crate::error::{Error, Result};
use crate::xml::XmlElement;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Value of a template attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairValue {
    /// Single value attribute, e.g. `CPU="1"`
    Text(String),
    /// Vector attribute, e.g. `NIC=[NETWORK="private"]`
    Vector(Vec<(String, String)>),
}

impl PairValue {
    fn from_element(element: &XmlElement) -> Self {
        if element.is_leaf() {
            Self::Text(element.text.clone())
        } else {
            Self::Vector(
                element
                    .children
                    .iter()
                    .map(|c| (c.name.clone(), c.text.clone()))
                    .collect(),
            )
        }
    }

    /// The text, for single value attributes.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Vector(_) => None,
        }
    }

    /// The sub-attributes, for vector attributes.
    #[must_use]
    pub fn as_vector(&self) -> Option<&[(String, String)]> {
        match self {
            Self::Vector(v) => Some(v),
            Self::Text(_) => None,
        }
    }
}

/// One attribute of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    /// Attribute name
    pub key: String,
    /// Attribute value
    pub value: PairValue,
}

impl Pair {
    /// Single value pair.
    pub fn text(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: PairValue::Text(value.into()),
        }
    }

    /// Look up a sub-attribute of a vector pair.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.value
            .as_vector()
            .and_then(|v| v.iter().find(|(k, _)| k == key))
            .map(|(_, v)| v.as_str())
    }
}

/// Ordered template attributes, repeated keys preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    pairs: Vec<Pair>,
}

impl Template {
    /// Empty template.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the children of `element`.
    #[must_use]
    pub fn from_element(element: &XmlElement) -> Self {
        Self {
            pairs: element
                .children
                .iter()
                .map(|c| Pair {
                    key: c.name.clone(),
                    value: PairValue::from_element(c),
                })
                .collect(),
        }
    }

    /// Parse a document and decode the children of its root.
    ///
    /// # Errors
    ///
    /// Returns an `Unmarshal` client error for malformed XML.
    pub fn from_xml(xml: &str) -> Result<Self> {
        XmlElement::parse(xml).map(|root| Self::from_element(&root))
    }

    /// All pairs in document order.
    #[must_use]
    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True when the template has no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Every pair named `key`, possibly none.
    #[must_use]
    pub fn get_all(&self, key: &str) -> Vec<&Pair> {
        self.pairs.iter().filter(|p| p.key == key).collect()
    }

    /// The single pair named `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Template`] when there is no such pair or more than one.
    pub fn get_unique(&self, key: &str) -> Result<&Pair> {
        let mut matches = self.pairs.iter().filter(|p| p.key == key);
        match (matches.next(), matches.next()) {
            (Some(pair), None) => Ok(pair),
            (None, _) => Err(Error::Template(format!("key {key} not found"))),
            (Some(_), Some(_)) => Err(Error::Template(format!(
                "key {key} is not unique: {} occurrences",
                self.get_all(key).len()
            ))),
        }
    }

    /// Text of the single pair named `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Template`] when the key is missing, repeated, or a vector.
    pub fn get_str(&self, key: &str) -> Result<&str> {
        self.get_unique(key)?
            .value
            .as_text()
            .ok_or_else(|| Error::Template(format!("key {key} is a vector attribute")))
    }

    /// Integer value of the single pair named `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Template`] when the value is missing or not an integer.
    pub fn get_int(&self, key: &str) -> Result<i64> {
        let raw = self.get_str(key)?;
        raw.trim()
            .parse()
            .map_err(|_| Error::Template(format!("key {key} is not an integer: {raw}")))
    }

    /// Float value of the single pair named `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Template`] when the value is missing or not a number.
    pub fn get_float(&self, key: &str) -> Result<f64> {
        let raw = self.get_str(key)?;
        raw.trim()
            .parse()
            .map_err(|_| Error::Template(format!("key {key} is not a number: {raw}")))
    }

    /// Sub-attribute lists of every vector pair named `key`.
    #[must_use]
    pub fn get_vectors(&self, key: &str) -> Vec<&[(String, String)]> {
        self.pairs
            .iter()
            .filter(|p| p.key == key)
            .filter_map(|p| p.value.as_vector())
            .collect()
    }

    /// Append a single value pair.
    pub fn add(&mut self, key: impl Into<String>, value: impl ToString) -> &mut Self {
        self.pairs.push(Pair::text(key, value.to_string()));
        self
    }

    /// Append a vector pair.
    pub fn add_vector<K, V>(
        &mut self,
        key: impl Into<String>,
        values: impl IntoIterator<Item = (K, V)>,
    ) -> &mut Self
    where
        K: Into<String>,
        V: ToString,
    {
        self.pairs.push(Pair {
            key: key.into(),
            value: PairValue::Vector(
                values
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.to_string()))
                    .collect(),
            ),
        });
        self
    }

    /// Remove every pair named `key`, returning how many were removed.
    pub fn del(&mut self, key: &str) -> usize {
        let before = self.pairs.len();
        self.pairs.retain(|p| p.key != key);
        before - self.pairs.len()
    }
}

fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

impl fmt::Display for Template {
    /// Render in OpenNebula template syntax, one attribute per line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pair) in self.pairs.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            match &pair.value {
                PairValue::Text(value) => write!(f, "{}={}", pair.key, quote(value))?,
                PairValue::Vector(values) => {
                    write!(f, "{}=[", pair.key)?;
                    for (j, (k, v)) in values.iter().enumerate() {
                        let sep = if j + 1 == values.len() { " " } else { "," };
                        write!(f, "\n  {k}={}{sep}", quote(v))?;
                    }
                    write!(f, "]")?;
                }
            }
        }
        Ok(())
    }
}

/// Template attributes collapsed into a map; the last repeated key wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateMap {
    entries: HashMap<String, PairValue>,
}

impl TemplateMap {
    /// Decode the children of `element`.
    #[must_use]
    pub fn from_element(element: &XmlElement) -> Self {
        let mut entries = HashMap::with_capacity(element.children.len());
        for child in &element.children {
            if entries
                .insert(child.name.clone(), PairValue::from_element(child))
                .is_some()
            {
                debug!(key = %child.name, "repeated template key overwritten");
            }
        }
        Self { entries }
    }

    /// Parse a document and decode the children of its root.
    ///
    /// # Errors
    ///
    /// Returns an `Unmarshal` client error for malformed XML.
    pub fn from_xml(xml: &str) -> Result<Self> {
        XmlElement::parse(xml).map(|root| Self::from_element(&root))
    }

    /// Value stored for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PairValue> {
        self.entries.get(key)
    }

    /// Text stored for `key`, if it is a single value attribute.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PairValue::as_text)
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no keys were decoded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PairValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl From<&Template> for TemplateMap {
    fn from(template: &Template) -> Self {
        Self {
            entries: template
                .pairs
                .iter()
                .map(|p| (p.key.clone(), p.value.clone()))
                .collect(),
        }
    }
}
