//! Minimal XML element tree.
//!
//! OpenNebula bodies are small documents whose fixed fields are decoded with
//! serde; the parts that are not known ahead of time (template attributes) are
//! read from this tree instead.

use crate::error::{ClientErrorKind, Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// One XML element with its attributes, text and child elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Tag name
    pub name: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Concatenated text and CDATA content, whitespace preserved for leaves
    pub text: String,
    /// Child elements in document order
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// Create an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parse a document and return its root element.
    ///
    /// # Errors
    ///
    /// Returns an `Unmarshal` client error for malformed or truncated documents.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);

        let mut stack: Vec<XmlElement> = Vec::new();

        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(open(&start)?),
                Event::Empty(start) => {
                    let element = open(&start)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => return Ok(element),
                    }
                }
                Event::End(_) => {
                    let mut element = stack.pop().ok_or_else(|| unbalanced("closing tag"))?;
                    // Indentation between child elements is not content.
                    if !element.children.is_empty() && element.text.trim().is_empty() {
                        element.text.clear();
                    }
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => return Ok(element),
                    }
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text.unescape()?);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current
                            .text
                            .push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => return Err(unbalanced("end of document")),
                _ => {}
            }
        }
    }

    /// True when the element has no child elements.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// First child with the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text of the first child with the given name.
    #[must_use]
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }

    /// Value of an attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

fn open(start: &BytesStart<'_>) -> Result<XmlElement> {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()));
    for attribute in start.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        element.attributes.push((
            String::from_utf8_lossy(attribute.key.as_ref()).into_owned(),
            attribute.unescape_value()?.into_owned(),
        ));
    }
    Ok(element)
}

fn unbalanced(at: &str) -> Error {
    Error::client(
        ClientErrorKind::Unmarshal,
        format!("unbalanced XML document: unexpected {at}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_document() {
        let xml = r#"<VM id="1"><ID>7</ID><TEMPLATE><CPU><![CDATA[0.5]]></CPU><NIC><NETWORK>private</NETWORK></NIC></TEMPLATE></VM>"#;
        let root = XmlElement::parse(xml).unwrap();

        assert_eq!(root.name, "VM");
        assert_eq!(root.attribute("id"), Some("1"));
        assert_eq!(root.child_text("ID"), Some("7"));

        let template = root.child("TEMPLATE").unwrap();
        assert_eq!(template.child_text("CPU"), Some("0.5"));
        let nic = template.child("NIC").unwrap();
        assert!(!nic.is_leaf());
        assert_eq!(nic.child_text("NETWORK"), Some("private"));
    }

    #[test]
    fn handles_empty_elements_and_entities() {
        let root = XmlElement::parse("<T><A/><B>x &amp; y</B><A>2</A></T>").unwrap();
        assert_eq!(root.children.len(), 3);
        assert_eq!(root.children_named("A").count(), 2);
        assert_eq!(root.child_text("B"), Some("x & y"));
    }

    #[test]
    fn leaf_whitespace_is_preserved() {
        let root = XmlElement::parse("<T>\n  <A> padded </A>\n</T>").unwrap();
        assert!(root.text.is_empty());
        assert_eq!(root.child_text("A"), Some(" padded "));
    }

    #[test]
    fn self_closing_root() {
        let root = XmlElement::parse("<?xml version=\"1.0\"?><EMPTY/>").unwrap();
        assert_eq!(root.name, "EMPTY");
        assert!(root.is_leaf());
    }

    #[test]
    fn truncated_document_is_an_error() {
        let err = XmlElement::parse("<VM><ID>1</ID>").unwrap_err();
        assert_eq!(err.client_kind(), Some(ClientErrorKind::Unmarshal));
    }
}
