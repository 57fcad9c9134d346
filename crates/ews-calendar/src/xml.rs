//! Namespaced XML element tree for EWS documents
//!
//! Builders assemble an owned [`Element`] tree; [`Element::write`] serializes
//! it through `quick_xml::Writer`. The root element declares every prefix the
//! document uses.

use crate::error::{CalendarError, Result};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Write;

pub const MSG_NS: &str = "http://schemas.microsoft.com/exchange/services/2006/messages";
pub const TYPE_NS: &str = "http://schemas.microsoft.com/exchange/services/2006/types";
pub const SOAP_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// XML namespaces used by EWS requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// `m:` message elements
    Messages,
    /// `t:` type elements
    Types,
    /// `s:` SOAP envelope
    Soap,
}

impl Namespace {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Messages => "m",
            Self::Types => "t",
            Self::Soap => "s",
        }
    }

    pub fn uri(&self) -> &'static str {
        match self {
            Self::Messages => MSG_NS,
            Self::Types => TYPE_NS,
            Self::Soap => SOAP_NS,
        }
    }
}

/// Child of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// Namespaced XML element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    namespace: Namespace,
    name: &'static str,
    attributes: Vec<(&'static str, String)>,
    children: Vec<Node>,
}

/// Serialization settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Indent nested elements by two spaces
    pub pretty: bool,
    /// Emit `<?xml version="1.0" encoding="utf-8"?>` first
    pub xml_declaration: bool,
}

impl Element {
    pub fn new(namespace: Namespace, name: &'static str) -> Self {
        Self {
            namespace,
            name,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Message-namespace element
    pub fn m(name: &'static str) -> Self {
        Self::new(Namespace::Messages, name)
    }

    /// Type-namespace element
    pub fn t(name: &'static str) -> Self {
        Self::new(Namespace::Types, name)
    }

    /// SOAP envelope element
    pub fn s(name: &'static str) -> Self {
        Self::new(Namespace::Soap, name)
    }

    pub fn with_attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attributes.push((name, value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.push(child);
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Prefixed name, e.g. `t:CalendarItem`
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.namespace.prefix(), self.name)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Concatenated direct text content
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Child elements in document order
    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Child elements with the given prefixed name
    pub fn children_named<'a>(&'a self, qname: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children().filter(move |e| e.matches(qname))
    }

    /// First child element with the given prefixed name
    pub fn child(&self, qname: &str) -> Option<&Element> {
        self.children().find(|e| e.matches(qname))
    }

    /// Follow a `/`-separated path of prefixed names from this element
    pub fn find(&self, path: &str) -> Option<&Element> {
        path.split('/')
            .filter(|step| !step.is_empty())
            .try_fold(self, |current, step| current.child(step))
    }

    /// This element and all nested elements, depth first
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = vec![self];
        for child in self.children() {
            out.extend(child.descendants());
        }
        out
    }

    fn matches(&self, qname: &str) -> bool {
        match qname.split_once(':') {
            Some((prefix, name)) => prefix == self.namespace.prefix() && name == self.name,
            None => qname == self.name,
        }
    }

    fn uses_namespace(&self, namespace: Namespace) -> bool {
        self.namespace == namespace || self.children().any(|c| c.uses_namespace(namespace))
    }

    /// Serialize the tree as a document rooted at this element
    pub fn write(&self, options: WriteOptions) -> Result<String> {
        let mut writer = if options.pretty {
            Writer::new_with_indent(Vec::new(), b' ', 2)
        } else {
            Writer::new(Vec::new())
        };

        if options.xml_declaration {
            writer
                .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
                .map_err(write_error)?;
        }

        let declared: Vec<Namespace> = [Namespace::Soap, Namespace::Messages, Namespace::Types]
            .into_iter()
            .filter(|ns| *ns != Namespace::Soap || self.uses_namespace(Namespace::Soap))
            .collect();

        self.write_into(&mut writer, &declared)?;

        String::from_utf8(writer.into_inner()).map_err(|e| CalendarError::XmlWrite(e.to_string()))
    }

    /// Compact serialization without a declaration
    pub fn to_xml_string(&self) -> Result<String> {
        self.write(WriteOptions::default())
    }

    fn write_into<W: Write>(&self, writer: &mut Writer<W>, declare: &[Namespace]) -> Result<()> {
        let qname = self.qualified_name();
        let mut start = BytesStart::new(qname.as_str());

        for ns in declare {
            let key = format!("xmlns:{}", ns.prefix());
            start.push_attribute((key.as_str(), ns.uri()));
        }
        for (key, value) in &self.attributes {
            start.push_attribute((*key, value.as_str()));
        }

        if self.children.is_empty() {
            return writer.write_event(Event::Empty(start)).map_err(write_error);
        }

        writer.write_event(Event::Start(start)).map_err(write_error)?;
        for node in &self.children {
            match node {
                Node::Element(child) => child.write_into(writer, &[])?,
                Node::Text(text) => writer
                    .write_event(Event::Text(BytesText::new(text)))
                    .map_err(write_error)?,
            }
        }
        writer
            .write_event(Event::End(BytesEnd::new(qname.as_str())))
            .map_err(write_error)
    }
}

fn write_error(e: impl std::fmt::Display) -> CalendarError {
    CalendarError::XmlWrite(e.to_string())
}
