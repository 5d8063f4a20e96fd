//! A subset of XML-Document-Transform (XDT), the overlay language used by
//! `Web.Debug.config`-style files.
//!
//! Elements in the transform are matched by name against the children of the
//! elements matched one level up, optionally narrowed by
//! `xdt:Locator="Match(attr, ...)"`. `xdt:Transform` then decides what happens
//! to the matched elements. Elements without a transform only navigate.

use crate::app::diagnostics::Diagnostics;
use crate::app::document::{Attribute, DocumentError, Element, Node, XmlDocument};
use crate::app::engine::TransformEngine;
use std::path::Path;
use thiserror::Error;

pub const XDT_NAMESPACE: &str = "http://schemas.microsoft.com/XML-Document-Transform";
const DEFAULT_PREFIX: &str = "xdt";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum XdtError {
    #[error("unsupported transform '{0}'")]
    UnsupportedTransform(String),
    #[error("unsupported locator '{0}'")]
    UnsupportedLocator(String),
    #[error("locator attribute '{attribute}' is missing on <{element}>")]
    MissingLocatorAttribute { element: String, attribute: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Directive {
    Replace,
    Insert,
    InsertIfMissing,
    Remove,
    RemoveAll,
    /// Empty means every attribute of the transform element.
    SetAttributes(Vec<String>),
    RemoveAttributes(Vec<String>),
}

impl Directive {
    fn parse(value: &str) -> Result<Self, XdtError> {
        let (name, arguments) = split_call(value);
        let directive = match (name, arguments.is_empty()) {
            ("Replace", true) => Self::Replace,
            ("Insert", true) => Self::Insert,
            ("InsertIfMissing", true) => Self::InsertIfMissing,
            ("Remove", true) => Self::Remove,
            ("RemoveAll", true) => Self::RemoveAll,
            ("SetAttributes", _) => Self::SetAttributes(arguments),
            ("RemoveAttributes", false) => Self::RemoveAttributes(arguments),
            _ => return Err(XdtError::UnsupportedTransform(value.to_string())),
        };
        Ok(directive)
    }
}

/// Splits `Name(a, b)` into `("Name", ["a", "b"])`.
fn split_call(value: &str) -> (&str, Vec<String>) {
    let value = value.trim();
    match value.find('(') {
        Some(open) if value.ends_with(')') => {
            let arguments = value[open + 1..value.len() - 1]
                .split(',')
                .map(str::trim)
                .filter(|argument| !argument.is_empty())
                .map(String::from)
                .collect();
            (value[..open].trim(), arguments)
        }
        _ => (value, Vec::new()),
    }
}

struct Transformation<'a> {
    prefixes: Vec<String>,
    log: Diagnostics<'a>,
}

impl Transformation<'_> {
    fn xdt_attribute<'e>(&self, element: &'e Element, local: &str) -> Option<&'e str> {
        element
            .attributes
            .iter()
            .find(|attribute| self.xdt_local_name(&attribute.name) == Some(local))
            .map(|attribute| attribute.value.as_str())
    }

    fn xdt_local_name<'n>(&self, name: &'n str) -> Option<&'n str> {
        let (prefix, local) = name.split_once(':')?;
        self.prefixes.iter().any(|p| p == prefix).then_some(local)
    }

    fn is_transform_markup(&self, attribute: &Attribute) -> bool {
        self.xdt_local_name(&attribute.name).is_some()
            || (attribute.name.starts_with("xmlns:") && attribute.value == XDT_NAMESPACE)
    }

    /// Copy of a transform element with every XDT attribute removed.
    fn clean(&self, element: &Element) -> Element {
        Element {
            name: element.name.clone(),
            attributes: element
                .attributes
                .iter()
                .filter(|attribute| !self.is_transform_markup(attribute))
                .cloned()
                .collect(),
            children: element
                .children
                .iter()
                .map(|node| match node {
                    Node::Element(child) => Node::Element(self.clean(child)),
                    other => other.clone(),
                })
                .collect(),
            self_closing: element.self_closing,
        }
    }

    fn locate(&self, targets: &[Node], spec: &Element) -> Result<Vec<usize>, XdtError> {
        let keys = match self.xdt_attribute(spec, "Locator") {
            None => Vec::new(),
            Some(locator) => match split_call(locator) {
                ("Match", keys) if !keys.is_empty() => keys,
                _ => return Err(XdtError::UnsupportedLocator(locator.to_string())),
            },
        };

        let mut expected = Vec::with_capacity(keys.len());
        for key in &keys {
            let value = spec
                .attribute(key)
                .ok_or_else(|| XdtError::MissingLocatorAttribute {
                    element: spec.name.clone(),
                    attribute: key.clone(),
                })?;
            expected.push((key.as_str(), value));
        }

        Ok(targets
            .iter()
            .enumerate()
            .filter_map(|(index, node)| match node {
                Node::Element(element)
                    if element.name == spec.name
                        && expected
                            .iter()
                            .all(|(key, value)| element.attribute(key) == Some(*value)) =>
                {
                    Some(index)
                }
                _ => None,
            })
            .collect())
    }

    fn apply(&self, targets: &mut Vec<Node>, spec: &Element) -> Result<(), XdtError> {
        let directive = self
            .xdt_attribute(spec, "Transform")
            .map(Directive::parse)
            .transpose()?;
        let matches = self.locate(targets, spec)?;

        match directive {
            Some(Directive::Insert) => targets.push(Node::Element(self.clean(spec))),
            Some(Directive::InsertIfMissing) => {
                if matches.is_empty() {
                    targets.push(Node::Element(self.clean(spec)));
                }
            }
            _ if matches.is_empty() => {
                self.log.warn(format_args!(
                    "No element in the source document matches <{}>",
                    spec.name
                ));
            }
            Some(Directive::Replace) => {
                targets[matches[0]] = Node::Element(self.clean(spec));
            }
            Some(Directive::Remove) => {
                targets.remove(matches[0]);
            }
            Some(Directive::RemoveAll) => {
                for index in matches.into_iter().rev() {
                    targets.remove(index);
                }
            }
            Some(Directive::SetAttributes(names)) => {
                let source = self.clean(spec);
                for element in matched_elements(targets, &matches) {
                    for attribute in &source.attributes {
                        if names.is_empty() || names.contains(&attribute.name) {
                            element.set_attribute(&attribute.name, &attribute.value);
                        }
                    }
                }
                self.apply_children(targets, &matches, spec)?;
            }
            Some(Directive::RemoveAttributes(names)) => {
                for element in matched_elements(targets, &matches) {
                    element
                        .attributes
                        .retain(|attribute| !names.contains(&attribute.name));
                }
                self.apply_children(targets, &matches, spec)?;
            }
            None => self.apply_children(targets, &matches, spec)?,
        }
        Ok(())
    }

    fn apply_children(
        &self,
        targets: &mut [Node],
        matches: &[usize],
        spec: &Element,
    ) -> Result<(), XdtError> {
        for element in matched_elements(targets, matches) {
            for child in spec.child_elements() {
                self.apply(&mut element.children, child)?;
            }
        }
        Ok(())
    }
}

fn matched_elements<'t>(
    targets: &'t mut [Node],
    matches: &'t [usize],
) -> impl Iterator<Item = &'t mut Element> {
    targets
        .iter_mut()
        .enumerate()
        .filter(|(index, _)| matches.contains(index))
        .filter_map(|(_, node)| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
}

/// Applies `transform` to `document` in place. On error the document may be
/// partially modified and should be discarded.
pub fn apply_transform(
    document: &mut XmlDocument,
    transform: &XmlDocument,
    log: Diagnostics<'_>,
) -> Result<(), XdtError> {
    let Some(spec) = transform.root() else {
        return Ok(());
    };

    let mut prefixes: Vec<String> = spec
        .attributes
        .iter()
        .filter(|attribute| attribute.value == XDT_NAMESPACE)
        .filter_map(|attribute| attribute.name.strip_prefix("xmlns:"))
        .map(String::from)
        .collect();
    if prefixes.is_empty() {
        prefixes.push(DEFAULT_PREFIX.to_string());
    }

    Transformation { prefixes, log }.apply(&mut document.nodes, spec)
}

/// The default engine: `XmlDocument` plus XDT overlays.
pub struct XdtEngine<'a> {
    log: Diagnostics<'a>,
}

impl<'a> XdtEngine<'a> {
    pub fn new(log: Diagnostics<'a>) -> Self {
        Self { log }
    }
}

impl TransformEngine for XdtEngine<'_> {
    type Document = XmlDocument;

    fn load(&self, path: &Path) -> Result<XmlDocument, DocumentError> {
        XmlDocument::load(path)
    }

    fn apply(&self, transform: &Path, document: &mut XmlDocument) -> Result<bool, DocumentError> {
        let overlay = XmlDocument::load(transform)?;
        match apply_transform(document, &overlay, self.log) {
            Ok(()) => Ok(true),
            Err(err) => {
                self.log
                    .error(format_args!("Transform {} failed: {}", transform.display(), err));
                Ok(false)
            }
        }
    }

    fn save(&self, document: &XmlDocument, path: &Path) -> Result<(), DocumentError> {
        document.save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::diagnostics::testing::CapturingLogger;
    use log::Level;
    use std::fs;

    const BASE: &str = r#"<configuration>
  <appSettings>
    <add key="Mode" value="dev"/>
    <add key="Other" value="x"/>
  </appSettings>
  <connectionStrings>
    <add name="db" connectionString="dev-db"/>
  </connectionStrings>
  <system.web>
    <compilation debug="true" targetFramework="4.8"/>
  </system.web>
</configuration>"#;

    fn overlay(body: &str) -> String {
        format!(
            r#"<configuration xmlns:xdt="{XDT_NAMESPACE}">{body}</configuration>"#
        )
    }

    fn transform_with(body: &str, logger: &CapturingLogger) -> Result<String, XdtError> {
        let mut document = XmlDocument::parse(BASE, Path::new("Web.config")).unwrap();
        let transform =
            XmlDocument::parse(&overlay(body), Path::new("Web.Debug.config")).unwrap();
        apply_transform(&mut document, &transform, Diagnostics::new(logger, "test"))?;
        Ok(document.to_string())
    }

    fn transform(body: &str) -> Result<String, XdtError> {
        transform_with(body, &CapturingLogger::default())
    }

    #[test]
    fn set_attributes_on_located_element() {
        let output = transform(
            r#"<appSettings>
  <add key="Mode" value="prod" xdt:Transform="SetAttributes" xdt:Locator="Match(key)"/>
</appSettings>"#,
        )
        .unwrap();

        assert_eq!(output, BASE.replace(r#"value="dev""#, r#"value="prod""#));
    }

    #[test]
    fn set_named_attributes_only() {
        let output = transform(
            r#"<system.web><compilation debug="false" targetFramework="9" xdt:Transform="SetAttributes(debug)"/></system.web>"#,
        )
        .unwrap();

        assert!(output.contains(r#"<compilation debug="false" targetFramework="4.8"/>"#));
    }

    #[test]
    fn replace_swaps_element_and_drops_xdt_markup() {
        let output = transform(
            r#"<connectionStrings xdt:Transform="Replace"><add name="db" connectionString="prod-db"/></connectionStrings>"#,
        )
        .unwrap();

        assert!(output.contains(
            r#"<connectionStrings><add name="db" connectionString="prod-db"/></connectionStrings>"#
        ));
        assert!(!output.contains("dev-db"));
        assert!(!output.contains("xdt"));
    }

    #[test]
    fn insert_appends_clean_copy() {
        let output = transform(
            r#"<appSettings><add key="New" value="1" xdt:Transform="Insert"/></appSettings>"#,
        )
        .unwrap();

        assert!(output.contains(r#"<add key="New" value="1"/>"#));
        assert_eq!(output.matches("<add key=").count(), 3);
    }

    #[test]
    fn insert_if_missing_only_inserts_once() {
        let body = r#"<appSettings><add key="Mode" value="new" xdt:Transform="InsertIfMissing" xdt:Locator="Match(key)"/></appSettings>"#;
        let output = transform(body).unwrap();
        assert!(!output.contains(r#"value="new""#));

        let body = body.replace(r#"key="Mode""#, r#"key="Fresh""#);
        let output = transform(&body).unwrap();
        assert!(output.contains(r#"<add key="Fresh" value="new"/>"#));
    }

    #[test]
    fn remove_takes_first_match_and_remove_all_takes_every_match() {
        let output =
            transform(r#"<appSettings><add xdt:Transform="Remove"/></appSettings>"#).unwrap();
        assert!(!output.contains(r#"key="Mode""#));
        assert!(output.contains(r#"key="Other""#));

        let output =
            transform(r#"<appSettings><add xdt:Transform="RemoveAll"/></appSettings>"#).unwrap();
        assert!(!output.contains("<add key="));
    }

    #[test]
    fn remove_attributes() {
        let output = transform(
            r#"<system.web><compilation xdt:Transform="RemoveAttributes(debug)"/></system.web>"#,
        )
        .unwrap();

        assert!(output.contains(r#"<compilation targetFramework="4.8"/>"#));
    }

    #[test]
    fn unmatched_element_warns_but_succeeds() {
        let logger = CapturingLogger::default();
        let output = transform_with(
            r#"<missing><child xdt:Transform="Remove"/></missing>"#,
            &logger,
        )
        .unwrap();

        assert_eq!(output, BASE);
        assert_eq!(logger.messages(Level::Warn).len(), 1);
    }

    #[test]
    fn unsupported_directives_fail() {
        assert_eq!(
            transform(r#"<appSettings xdt:Transform="InsertAfter(/configuration/x)"/>"#),
            Err(XdtError::UnsupportedTransform(
                "InsertAfter(/configuration/x)".to_string()
            ))
        );
        assert_eq!(
            transform(r#"<appSettings xdt:Locator="XPath(/configuration)"/>"#),
            Err(XdtError::UnsupportedLocator("XPath(/configuration)".to_string()))
        );
        assert!(matches!(
            transform(r#"<appSettings><add xdt:Transform="Remove" xdt:Locator="Match(key)"/></appSettings>"#),
            Err(XdtError::MissingLocatorAttribute { .. })
        ));
    }

    #[test]
    fn honours_declared_prefix() {
        let mut document = XmlDocument::parse(BASE, Path::new("Web.config")).unwrap();
        let transform = XmlDocument::parse(
            &format!(
                r#"<configuration xmlns:t="{XDT_NAMESPACE}"><connectionStrings t:Transform="Remove"/></configuration>"#
            ),
            Path::new("Web.Release.config"),
        )
        .unwrap();

        apply_transform(
            &mut document,
            &transform,
            Diagnostics::new(&CapturingLogger::default(), "test"),
        )
        .unwrap();

        assert!(!document.to_string().contains("connectionStrings"));
    }

    #[test]
    fn engine_reports_failure_and_missing_transform_file() {
        let dir = tempfile::tempdir().unwrap();
        let logger = CapturingLogger::default();
        let engine = XdtEngine::new(Diagnostics::new(&logger, "test"));
        let bad = dir.path().join("Web.Bad.config");
        fs::write(&bad, overlay(r#"<appSettings xdt:Transform="Merge"/>"#)).unwrap();

        let mut document = XmlDocument::parse(BASE, Path::new("Web.config")).unwrap();
        assert!(!engine.apply(&bad, &mut document).unwrap());
        assert_eq!(logger.messages(Level::Error).len(), 1);

        let missing = dir.path().join("Web.Missing.config");
        assert!(matches!(
            engine.apply(&missing, &mut document),
            Err(DocumentError::Read { .. })
        ));
    }
}
