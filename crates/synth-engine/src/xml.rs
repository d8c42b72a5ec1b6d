//! XML engine: every render is parsed into an element tree.

use crate::engine::{Engine, EngineCore, EngineKind};
use crate::error::EngineError;
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::sync::Arc;
use synth_template::{TemplateData, TemplateStore};
use thiserror::Error;

/// Failures while reading or writing XML documents.
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("XML syntax error: {0}")]
    Syntax(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    Attribute(#[from] AttrError),

    #[error("XML write error: {0}")]
    Write(#[from] std::io::Error),

    #[error("XML structure error: {0}")]
    Structure(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Child elements, skipping text.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    /// Concatenated direct text and CDATA content.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                XmlNode::Text(text) | XmlNode::CData(text) => Some(text.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    /// Parse a document with exactly one root element. Whitespace-only text is dropped.
    pub fn parse(xml: &str) -> Result<Self, XmlError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(start_element(&start)?),
                Event::Empty(start) => {
                    let element = start_element(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| XmlError::Structure("unexpected closing tag".to_string()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let text = text.unescape()?.into_owned();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(XmlNode::Text(text)),
                        None if text.trim().is_empty() => {}
                        None => {
                            return Err(XmlError::Structure(
                                "text outside the root element".to_string(),
                            ))
                        }
                    }
                }
                Event::CData(data) => {
                    let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(XmlNode::CData(text)),
                        None => {
                            return Err(XmlError::Structure(
                                "CDATA outside the root element".to_string(),
                            ))
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(XmlError::Structure(format!(
                "element '{}' is not closed",
                stack.last().map(|e| e.name.as_str()).unwrap_or_default()
            )));
        }
        root.ok_or_else(|| XmlError::Structure("document has no root element".to_string()))
    }

    /// Serialize this element with an XML declaration.
    pub fn to_document(&self) -> Result<String, XmlError> {
        write_document(std::slice::from_ref(self), None)
    }
}

/// Serialize `elements` as one document. With `wrapper`, elements are enclosed in an
/// element of that name; otherwise exactly one element is expected.
pub fn write_document(elements: &[XmlElement], wrapper: Option<&str>) -> Result<String, XmlError> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    match wrapper {
        Some(name) => {
            writer.write_event(Event::Start(BytesStart::new(name)))?;
            for element in elements {
                write_element(&mut writer, element)?;
            }
            writer.write_event(Event::End(BytesEnd::new(name)))?;
        }
        None => {
            let [element] = elements else {
                return Err(XmlError::Structure(format!(
                    "expected a single root element, got {}",
                    elements.len()
                )));
            };
            write_element(&mut writer, element)?;
        }
    }
    String::from_utf8(writer.into_inner())
        .map_err(|e| XmlError::Structure(e.to_string()))
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<(), XmlError> {
    let start = BytesStart::new(element.name.as_str()).with_attributes(
        element
            .attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str())),
    );
    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        match child {
            XmlNode::Element(child) => write_element(writer, child)?,
            XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
            XmlNode::CData(text) => writer.write_event(Event::CData(BytesCData::new(text)))?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

fn start_element(start: &BytesStart<'_>) -> Result<XmlElement, XmlError> {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()));
    for attribute in start.attributes() {
        let attribute = attribute?;
        element.attributes.push((
            String::from_utf8_lossy(attribute.key.as_ref()).into_owned(),
            attribute.unescape_value()?.into_owned(),
        ));
    }
    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(XmlError::Structure(
                "document has more than one root element".to_string(),
            ))
        }
    }
    Ok(())
}

#[derive(Debug)]
pub struct XmlEngine {
    core: EngineCore,
}

impl XmlEngine {
    pub fn new(
        store: Arc<TemplateStore>,
        provider: &str,
        template_name: &str,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            core: EngineCore::initialize(EngineKind::Xml, store, provider, template_name)?,
        })
    }

    /// Serialize payloads into one document, wrapped in `wrapper` when given.
    pub fn serialize(
        &self,
        elements: &[XmlElement],
        wrapper: Option<&str>,
    ) -> Result<String, EngineError> {
        write_document(elements, wrapper).map_err(|e| self.core.format_error(e))
    }
}

impl Engine for XmlEngine {
    type Output = XmlElement;

    fn kind(&self) -> EngineKind {
        EngineKind::Xml
    }

    fn template(&self) -> &TemplateData {
        self.core.template()
    }

    fn build_payload(&self, worker: usize) -> Result<XmlElement, EngineError> {
        let rendered = self.core.render(worker)?;
        XmlElement::parse(&rendered).map_err(|e| self.core.format_error(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_document() {
        let doc = r#"<?xml version="1.0"?>
<Order id="7" status="new &amp; open">
  <Line sku="a"/>
  <Line sku="b">two &lt; three</Line>
  <Note><![CDATA[raw <text>]]></Note>
</Order>"#;
        let root = XmlElement::parse(doc).unwrap();
        assert_eq!(root.name, "Order");
        assert_eq!(root.attribute("id"), Some("7"));
        assert_eq!(root.attribute("status"), Some("new & open"));

        let children: Vec<&XmlElement> = root.elements().collect();
        assert_eq!(children.len(), 3);
        assert_eq!(children[0].attribute("sku"), Some("a"));
        assert_eq!(children[1].text(), "two < three");
        assert_eq!(children[2].text(), "raw <text>");
    }

    #[test]
    fn test_parse_rejects_bad_documents() {
        assert!(XmlElement::parse("<a><b></a>").is_err());
        assert!(XmlElement::parse("<a/><b/>").is_err());
        assert!(XmlElement::parse("just text").is_err());
        assert!(XmlElement::parse("").is_err());
    }

    #[test]
    fn test_write_and_reparse() {
        let element = XmlElement::new("Reading")
            .with_child(XmlElement::new("Value").with_text("1 < 2"))
            .with_child(XmlElement::new("Empty"));
        let document = element.to_document().unwrap();
        assert!(document.starts_with("<?xml"));
        assert_eq!(XmlElement::parse(&document).unwrap(), element);
    }

    #[test]
    fn test_wrapper_holds_many_elements() {
        let elements = vec![XmlElement::new("A"), XmlElement::new("B")];
        let document = write_document(&elements, Some("Batch")).unwrap();
        let batch = XmlElement::parse(&document).unwrap();
        assert_eq!(batch.name, "Batch");
        assert_eq!(batch.elements().count(), 2);
        assert!(write_document(&elements, None).is_err());
    }

    #[test]
    fn test_engine_parses_render() {
        let store = Arc::new(TemplateStore::from_sources(
            [(
                "r.template.xml".to_string(),
                "<Reading device=\"{{MacAddress:MacAddress}}\"><Value>{{Number:Range:1..1.4:0}}</Value></Reading>"
                    .to_string(),
            )],
            [],
        ));
        let engine = XmlEngine::new(store, "readings", "r.template.xml").unwrap();
        let element = engine.build_payload(0).unwrap();
        assert_eq!(element.name, "Reading");
        assert_eq!(element.attribute("device").map(str::len), Some(17));
        assert_eq!(element.elements().next().unwrap().text(), "1");
    }
}
