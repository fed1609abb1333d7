//! Owned XML tree for WordprocessingML parts.
//!
//! Text and attribute values are kept in their escaped source form so a part
//! that is parsed and written back without edits keeps every character
//! reference and entity exactly as it was. Values set through the API are
//! escaped on the way in.

use std::borrow::Cow;

use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::FormatError;

const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    /// Escaped character data.
    Text(String),
    CData(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub name: String,
    /// Attribute names with escaped values, in source order.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub declaration: bool,
    pub root: XmlElement,
}

impl XmlElement {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.is(name))
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|e| e.is(name))
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.child(name).is_some()
    }

    /// Unescaped attribute value.
    pub fn attr(&self, name: &str) -> Option<Cow<'_, str>> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, raw)| unescape(raw).unwrap_or(Cow::Borrowed(raw.as_str())))
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        let escaped = escape(value).into_owned();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, raw)) => *raw = escaped,
            None => self.attributes.push((name.to_string(), escaped)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attributes.retain(|(key, _)| key != name);
    }

    /// Concatenated, unescaped text content of the direct text children.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                XmlNode::Text(raw) => {
                    out.push_str(&unescape(raw).unwrap_or(Cow::Borrowed(raw.as_str())))
                }
                XmlNode::CData(data) => out.push_str(data),
                _ => {}
            }
        }
        out
    }

    /// Returns the named child, inserting an empty one where the schema
    /// sequence `order` places it when the element does not have one yet.
    ///
    /// Children whose names are not listed in `order` are treated as coming
    /// after every listed name.
    pub fn ensure_child(&mut self, name: &str, order: &[&str]) -> &mut XmlElement {
        let index = match self.position_of(name) {
            Some(index) => index,
            None => {
                let index = self.insertion_index(name, order);
                self.children
                    .insert(index, XmlNode::Element(XmlElement::new(name)));
                index
            }
        };
        match &mut self.children[index] {
            XmlNode::Element(element) => element,
            _ => unreachable!("index was taken from an element child"),
        }
    }

    fn position_of(&self, name: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|node| matches!(node, XmlNode::Element(e) if e.is(name)))
    }

    fn insertion_index(&self, name: &str, order: &[&str]) -> usize {
        let rank = |n: &str| order.iter().position(|o| *o == n).unwrap_or(usize::MAX);
        let target = rank(name);
        self.children
            .iter()
            .position(|node| matches!(node, XmlNode::Element(e) if rank(&e.name) > target))
            .unwrap_or(self.children.len())
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, raw) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&raw.replace('"', "&quot;"));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for node in &self.children {
            match node {
                XmlNode::Element(element) => element.write_to(out),
                XmlNode::Text(raw) => out.push_str(raw),
                XmlNode::CData(data) => {
                    out.push_str("<![CDATA[");
                    out.push_str(data);
                    out.push_str("]]>");
                }
                XmlNode::Comment(comment) => {
                    out.push_str("<!--");
                    out.push_str(comment);
                    out.push_str("-->");
                }
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

impl XmlDocument {
    /// Parses a part. `part` names the part in error messages.
    pub fn parse(part: &str, xml: &str) -> Result<Self, FormatError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut declaration = false;
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            let event = reader.read_event().map_err(|e| xml_error(part, e))?;
            match event {
                Event::Decl(_) => declaration = true,
                Event::Start(start) => stack.push(element_from(part, &start)?),
                Event::Empty(start) => {
                    let element = element_from(part, &start)?;
                    attach(part, &mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| xml_error(part, "unexpected closing tag"))?;
                    attach(part, &mut stack, &mut root, element)?;
                }
                Event::Text(text) => push_text(&mut stack, utf8(part, &text)?),
                Event::GeneralRef(reference) => {
                    let name = utf8(part, &reference)?;
                    push_text(&mut stack, &format!("&{};", name));
                }
                Event::CData(data) => {
                    if let Some(parent) = stack.last_mut() {
                        let data = utf8(part, &data)?.to_string();
                        parent.children.push(XmlNode::CData(data));
                    }
                }
                Event::Comment(comment) => {
                    if let Some(parent) = stack.last_mut() {
                        let comment = utf8(part, &comment)?.to_string();
                        parent.children.push(XmlNode::Comment(comment));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(xml_error(part, "unclosed element at end of input"));
        }
        let root = root.ok_or_else(|| xml_error(part, "no root element"))?;
        Ok(Self { declaration, root })
    }

    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        if self.declaration {
            out.push_str(DECLARATION);
            out.push_str("\r\n");
        }
        self.root.write_to(&mut out);
        out
    }
}

fn element_from(part: &str, start: &BytesStart<'_>) -> Result<XmlElement, FormatError> {
    let name = utf8(part, start.name().as_ref())?.to_string();
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| xml_error(part, e))?;
        let key = utf8(part, attribute.key.as_ref())?.to_string();
        let value = utf8(part, &attribute.value)?.to_string();
        attributes.push((key, value));
    }
    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn attach(
    part: &str,
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), FormatError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(xml_error(part, "more than one root element")),
    }
    Ok(())
}

/// Appends escaped text, merging with a preceding text node so entity
/// references split out by the reader end up in one run of text.
fn push_text(stack: &mut [XmlElement], raw: &str) {
    let Some(parent) = stack.last_mut() else {
        return;
    };
    if let Some(XmlNode::Text(existing)) = parent.children.last_mut() {
        existing.push_str(raw);
    } else {
        parent.children.push(XmlNode::Text(raw.to_string()));
    }
}

fn utf8<'a>(part: &str, bytes: &'a [u8]) -> Result<&'a str, FormatError> {
    std::str::from_utf8(bytes).map_err(|_| FormatError::Encoding {
        part: part.to_string(),
    })
}

fn xml_error(part: &str, message: impl std::fmt::Display) -> FormatError {
    FormatError::Xml {
        part: part.to_string(),
        message: message.to_string(),
    }
}
