//! # XML Element Tree
//!
//! Minimal DOM for the XML-shaped wire format.
//!
//! Game frames are small machine-generated documents
//! (`<msg t="sys"><body action="pubMsg" r="1"><txt><![CDATA[hi]]></txt></body></msg>`),
//! so the tree keeps attributes in document order and distinguishes CDATA
//! from plain text, which is what makes an unmutated parse/serialize cycle
//! reproduce the frame byte-for-byte. Attribute values are normalized to
//! double quotes on output.

use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{RelayError, Result};

/// A single XML element with ordered attributes and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// A child of an [`Element`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
}

impl Element {
    /// Create an element with no attributes or children
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Look up an attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing an existing value in place
    pub fn set_attr<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        let name = name.into();
        match self.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value.into(),
            None => self.attrs.push((name, value.into())),
        }
    }

    /// First child element with the given name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find_map(|node| match node {
            Node::Element(el) if el.name == name => Some(el),
            _ => None,
        })
    }

    /// Mutable variant of [`Element::child`]
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|node| match node {
            Node::Element(el) if el.name == name => Some(el),
            _ => None,
        })
    }

    /// Concatenated text and CDATA content of direct children
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                Node::Text(t) | Node::CData(t) => out.push_str(t),
                Node::Element(_) => {}
            }
        }
        out
    }

    /// Replace the element's content with a single CDATA section
    pub fn set_cdata<S: Into<String>>(&mut self, text: S) {
        self.children = vec![Node::CData(text.into())];
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| RelayError::Parse(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| RelayError::Parse(e.to_string()))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(Element {
        name,
        attrs,
        children: Vec::new(),
    })
}

/// Parse a document into its root element
pub fn parse(input: &str) -> Result<Element> {
    let mut reader = Reader::from_str(input);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                stack.push(element_from_start(&start)?);
            }
            Ok(Event::Empty(start)) => {
                let element = element_from_start(&start)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(element)),
                    None => root = Some(element),
                }
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| RelayError::Parse(String::from("unbalanced closing tag")))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(element)),
                    None => root = Some(element),
                }
            }
            Ok(Event::Text(text)) => {
                let text = text
                    .unescape()
                    .map_err(|e| RelayError::Parse(e.to_string()))?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Text(text.into_owned()));
                }
            }
            Ok(Event::CData(cdata)) => {
                let text = String::from_utf8_lossy(cdata.into_inner().as_ref()).into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::CData(text));
                }
            }
            Ok(Event::Eof) => break,
            // Declarations, comments and processing instructions never occur
            // in game frames; skip them rather than fail.
            Ok(_) => {}
            Err(e) => return Err(RelayError::Parse(e.to_string())),
        }
    }

    root.ok_or_else(|| RelayError::Parse(String::from("document has no root element")))
}

/// Serialize an element tree back to document text
pub fn serialize(element: &Element) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, element)?;
    String::from_utf8(writer.into_inner()).map_err(|e| RelayError::Parse(e.to_string()))
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attrs {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        writer
            .write_event(Event::Empty(start))
            .map_err(|e| RelayError::Parse(e.to_string()))?;
        return Ok(());
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| RelayError::Parse(e.to_string()))?;

    for node in &element.children {
        match node {
            Node::Element(child) => write_element(writer, child)?,
            Node::Text(text) => writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(|e| RelayError::Parse(e.to_string()))?,
            Node::CData(text) => writer
                .write_event(Event::CData(BytesCData::new(text)))
                .map_err(|e| RelayError::Parse(e.to_string()))?,
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(|e| RelayError::Parse(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    const PUB_MSG: &str = r#"<msg t="sys"><body action="pubMsg" r="1"><txt><![CDATA[hello]]></txt></body></msg>"#;

    #[test]
    fn test_roundtrip_preserves_machine_frame() {
        let root = parse(PUB_MSG).unwrap();
        assert_eq!(serialize(&root).unwrap(), PUB_MSG);
    }

    #[test]
    fn test_attribute_lookup() {
        let root = parse(PUB_MSG).unwrap();
        assert_eq!(root.attr("t"), Some("sys"));
        assert_eq!(root.child("body").unwrap().attr("action"), Some("pubMsg"));
        assert_eq!(root.attr("missing"), None);
    }

    #[test]
    fn test_cdata_text_content() {
        let root = parse(PUB_MSG).unwrap();
        let txt = root.child("body").unwrap().child("txt").unwrap();
        assert_eq!(txt.text(), "hello");
    }

    #[test]
    fn test_self_closing_roundtrip() {
        let frame = r#"<msg t="sys"><body action="verChk" r="0"><ver v="153"/></body></msg>"#;
        let root = parse(frame).unwrap();
        assert_eq!(serialize(&root).unwrap(), frame);
    }

    #[test]
    fn test_mutation_then_serialize() {
        let mut root = parse(PUB_MSG).unwrap();
        root.child_mut("body")
            .unwrap()
            .child_mut("txt")
            .unwrap()
            .set_cdata("rewritten");

        let out = serialize(&root).unwrap();
        assert!(out.contains("<![CDATA[rewritten]]>"));
        assert!(!out.contains("hello"));
    }

    #[test]
    fn test_unbalanced_document_rejected() {
        assert!(parse("<msg><body></msg>").is_err());
        assert!(parse("").is_err());
    }
}
