//! Lossless XML tree used as the transformable document.
//!
//! Text, attribute values and markup are kept in their escaped source form so
//! an unmodified tree serializes back to exactly the bytes it was read from.

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fmt::{self, Write as _};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed XML in {path}")]
    Syntax {
        path: PathBuf,
        #[source]
        source: quick_xml::Error,
    },
    #[error("malformed attribute in {path}")]
    Attribute {
        path: PathBuf,
        #[source]
        source: AttrError,
    },
    #[error("unbalanced element <{name}> in {path}")]
    Unbalanced { path: PathBuf, name: String },
    #[error("{path} has no root element")]
    NoRoot { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    /// Escaped value as written in the source.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
    /// Written as `<name/>` when it still has no children.
    pub self_closing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    Declaration(String),
    DocType(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    pub nodes: Vec<Node>,
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Updates the attribute in place, or appends it.
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value.to_string(),
            None => self.attributes.push(Attribute {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    fn from_start(start: &BytesStart<'_>, self_closing: bool) -> Result<Self, AttrError> {
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute?;
            attributes.push(Attribute {
                name: lossy(attribute.key.as_ref()),
                value: lossy(&attribute.value),
            });
        }
        Ok(Self {
            name: lossy(start.name().as_ref()),
            attributes,
            children: Vec::new(),
            self_closing,
        })
    }

    fn write_to(&self, out: &mut String) -> fmt::Result {
        write!(out, "<{}", self.name)?;
        for attribute in &self.attributes {
            let quote = if attribute.value.contains('"') { '\'' } else { '"' };
            write!(out, " {}={quote}{}{quote}", attribute.name, attribute.value)?;
        }
        if self.children.is_empty() && self.self_closing {
            return out.write_str("/>");
        }
        out.write_char('>')?;
        for child in &self.children {
            child.write_to(out)?;
        }
        write!(out, "</{}>", self.name)
    }
}

impl Node {
    fn write_to(&self, out: &mut String) -> fmt::Result {
        match self {
            Node::Element(element) => element.write_to(out),
            Node::Text(text) => out.write_str(text),
            Node::CData(data) => write!(out, "<![CDATA[{data}]]>"),
            Node::Comment(comment) => write!(out, "<!--{comment}-->"),
            Node::ProcessingInstruction(content) | Node::Declaration(content) => {
                write!(out, "<?{content}?>")
            }
            Node::DocType(content) => write!(out, "<!DOCTYPE {}>", content.trim_start()),
        }
    }
}

impl XmlDocument {
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let content = fs::read_to_string(path).map_err(|source| DocumentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parses `content`; `origin` is only used in error messages.
    pub fn parse(content: &str, origin: &Path) -> Result<Self, DocumentError> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(false);

        let mut open: Vec<Element> = Vec::new();
        let mut nodes: Vec<Node> = Vec::new();

        loop {
            let event = reader.read_event().map_err(|source| DocumentError::Syntax {
                path: origin.to_path_buf(),
                source,
            })?;
            let attribute_error = |source| DocumentError::Attribute {
                path: origin.to_path_buf(),
                source,
            };

            let node = match event {
                Event::Start(start) => {
                    open.push(Element::from_start(&start, false).map_err(attribute_error)?);
                    continue;
                }
                Event::End(end) => match open.pop() {
                    Some(element) => Node::Element(element),
                    None => {
                        return Err(DocumentError::Unbalanced {
                            path: origin.to_path_buf(),
                            name: lossy(end.name().as_ref()),
                        })
                    }
                },
                Event::Empty(start) => {
                    Node::Element(Element::from_start(&start, true).map_err(attribute_error)?)
                }
                Event::Text(text) => Node::Text(lossy(&text)),
                Event::CData(data) => Node::CData(lossy(&data)),
                Event::Comment(comment) => Node::Comment(lossy(&comment)),
                Event::Decl(decl) => Node::Declaration(lossy(&decl)),
                Event::PI(instruction) => Node::ProcessingInstruction(lossy(&instruction)),
                Event::DocType(doctype) => Node::DocType(lossy(&doctype)),
                Event::Eof => break,
            };

            match open.last_mut() {
                Some(parent) => parent.children.push(node),
                None => nodes.push(node),
            }
        }

        if let Some(unclosed) = open.pop() {
            return Err(DocumentError::Unbalanced {
                path: origin.to_path_buf(),
                name: unclosed.name,
            });
        }

        let document = Self { nodes };
        if document.root().is_none() {
            return Err(DocumentError::NoRoot {
                path: origin.to_path_buf(),
            });
        }
        Ok(document)
    }

    pub fn root(&self) -> Option<&Element> {
        self.nodes.iter().find_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    /// Creates or overwrites `path` with the serialized document.
    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        fs::write(path, self.to_string()).map_err(|source| DocumentError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl fmt::Display for XmlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        for node in &self.nodes {
            node.write_to(&mut out)?;
        }
        f.write_str(&out)
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
