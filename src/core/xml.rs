//! Owned XML tree built from quick-xml events
//!
//! Start tags are stored as the original `BytesStart` so attributes and
//! namespace declarations are written back byte-for-byte. Only text content
//! is unescaped on read and escaped again on write.

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::error::DocumentError;

/// A node inside an element
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Unescaped character data
    Text(String),
    /// Comments, processing instructions, CDATA
    Other(Event<'static>),
}

/// An XML element with its children
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    start: BytesStart<'static>,
    pub children: Vec<Node>,
}

impl Element {
    /// Create an empty element with the given qualified name
    pub fn new(name: &str) -> Self {
        Self::from_start(BytesStart::new(name.to_string()))
    }

    fn from_start(start: BytesStart<'static>) -> Self {
        Self {
            start,
            children: Vec::new(),
        }
    }

    /// Add an attribute (value is escaped on write)
    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.start.push_attribute((key, value));
        self
    }

    /// Append a child node, builder style
    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Qualified name, e.g. `w:p`
    pub fn name(&self) -> &[u8] {
        self.start.name().into_inner()
    }

    pub fn is(&self, name: &str) -> bool {
        self.name() == name.as_bytes()
    }

    /// Unescaped value of an attribute
    pub fn attribute(&self, key: &str) -> Option<String> {
        self.start
            .attributes()
            .flatten()
            .find(|attr| attr.key.as_ref() == key.as_bytes())
            .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
    }

    /// Child elements, skipping text and other nodes
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    /// First child element with the given name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|el| el.is(name))
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.elements_mut().find(|el| el.is(name))
    }

    /// Concatenated text of all descendant text nodes
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Element(el) => el.collect_text(out),
                Node::Other(_) => {}
            }
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_string())
    }
}

/// A parsed XML part: prolog events plus a single root element
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    prolog: Vec<Event<'static>>,
    pub root: Element,
}

impl XmlDocument {
    /// Parse a UTF-8 XML document
    pub fn parse(bytes: &[u8]) -> Result<Self, DocumentError> {
        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::new();
        let mut prolog = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(start) => stack.push(Element::from_start(start.into_owned())),
                Event::Empty(start) => {
                    attach(&mut stack, &mut root, Element::from_start(start.into_owned()))?
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| DocumentError::Malformed("unexpected closing tag".into()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    // Whitespace outside the root is not kept
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(Node::Text(text.unescape()?.into_owned()));
                    }
                }
                Event::Eof => break,
                other => match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Other(other.into_owned())),
                    None if root.is_none() => prolog.push(other.into_owned()),
                    None => {}
                },
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(DocumentError::Malformed("unclosed element".into()));
        }
        let root = root.ok_or_else(|| DocumentError::Malformed("no root element".into()))?;

        Ok(Self { prolog, root })
    }

    /// Serialize back to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        let mut writer = Writer::new(Vec::new());
        for event in &self.prolog {
            writer.write_event(event.borrow())?;
        }
        write_element(&mut writer, &self.root)?;
        Ok(writer.into_inner())
    }
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), DocumentError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(DocumentError::Malformed("more than one root element".into())),
    }
    Ok(())
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<(), DocumentError> {
    if element.children.is_empty() {
        writer.write_event(Event::Empty(element.start.borrow()))?;
        return Ok(());
    }

    writer.write_event(Event::Start(element.start.borrow()))?;
    for child in &element.children {
        match child {
            Node::Element(el) => write_element(writer, el)?,
            Node::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
            Node::Other(event) => writer.write_event(event.borrow())?,
        }
    }
    writer.write_event(Event::End(element.start.to_end()))?;
    Ok(())
}
