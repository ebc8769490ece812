//! The API documentation store.
//!
//! Documentation is keyed by type or function name and kept as opaque strings; it is only
//! ever copied into generated doc comments. The store is read from XML:
//!
//! ```xml
//! <apis>
//!   <api name="RECT">
//!     <description>Defines a rectangle.</description>
//!     <helplink>https://learn.microsoft.com/...</helplink>
//!     <field name="left">The x-coordinate of the upper-left corner.</field>
//!   </api>
//!   <api name="GetTickCount">
//!     <description>Retrieves the number of milliseconds since boot.</description>
//!     <return>The number of milliseconds.</return>
//!   </api>
//! </apis>
//! ```

use std::{collections::HashMap, path::Path};

use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};

use crate::{Error, Result};

/// Documentation of one type or function
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiDetails {
    /// Summary
    pub description: Option<String>,
    /// Remarks section
    pub remarks: Option<String>,
    /// Link to the reference page
    pub help_link: Option<String>,
    /// Struct members and enum values, by name
    pub fields: HashMap<String, String>,
    /// Function parameters, by name
    pub params: HashMap<String, String>,
    /// Description of a function's return value
    pub return_value: Option<String>,
}

/// Documentation store keyed by API name
#[derive(Debug, Clone, Default)]
pub struct ApiDocs {
    apis: HashMap<String, ApiDetails>,
}

/// Element whose text is being collected
enum Slot {
    Description,
    Remarks,
    HelpLink,
    Field(String),
    Param(String),
    Return,
}

fn name_attribute(element: &BytesStart<'_>) -> Result<String> {
    let attribute = element
        .try_get_attribute("name")
        .map_err(|error| Error::Xml(error.to_string()))?
        .ok_or_else(|| {
            Error::Xml(format!(
                "<{}> without a name attribute",
                String::from_utf8_lossy(element.name().as_ref())
            ))
        })?;

    Ok(attribute.unescape_value()?.into_owned())
}

impl ApiDocs {
    /// An empty store.
    #[must_use]
    pub fn new() -> ApiDocs {
        ApiDocs::default()
    }

    /// Reads a store from the XML file at `path`.
    ///
    /// # Errors
    /// Returns [`Error::FileError`] if the file cannot be read and [`Error::Xml`] if it is
    /// not a well-formed store.
    pub fn from_file(path: &Path) -> Result<ApiDocs> {
        let xml = std::fs::read_to_string(path)?;
        ApiDocs::from_xml(&xml)
    }

    /// Parses a store from XML text.
    ///
    /// # Arguments
    ///
    /// * `xml` - An `<apis>` document; unknown elements are ignored
    ///
    /// # Errors
    /// Returns [`Error::Xml`] if the text is not well-formed or an `<api>`, `<field>` or
    /// `<param>` element has no `name`.
    pub fn from_xml(xml: &str) -> Result<ApiDocs> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut apis = HashMap::new();
        let mut current: Option<(String, ApiDetails)> = None;
        let mut slot: Option<Slot> = None;
        let mut text = String::new();

        loop {
            match reader.read_event()? {
                Event::Start(element) => match element.name().as_ref() {
                    b"api" => {
                        current = Some((name_attribute(&element)?, ApiDetails::default()));
                    }
                    b"description" => slot = Some(Slot::Description),
                    b"remarks" => slot = Some(Slot::Remarks),
                    b"helplink" => slot = Some(Slot::HelpLink),
                    b"field" => slot = Some(Slot::Field(name_attribute(&element)?)),
                    b"param" => slot = Some(Slot::Param(name_attribute(&element)?)),
                    b"return" => slot = Some(Slot::Return),
                    _ => {}
                },
                Event::Text(content) => {
                    if slot.is_some() {
                        text.push_str(&content.unescape()?);
                    }
                }
                Event::CData(content) => {
                    if slot.is_some() {
                        text.push_str(&String::from_utf8_lossy(&content));
                    }
                }
                Event::End(element) => match element.name().as_ref() {
                    b"api" => {
                        if let Some((name, details)) = current.take() {
                            apis.insert(name, details);
                        }
                    }
                    _ => {
                        if let (Some(filled), Some((_, details))) = (slot.take(), current.as_mut())
                        {
                            let value = std::mem::take(&mut text);
                            match filled {
                                Slot::Description => details.description = Some(value),
                                Slot::Remarks => details.remarks = Some(value),
                                Slot::HelpLink => details.help_link = Some(value),
                                Slot::Field(name) => {
                                    details.fields.insert(name, value);
                                }
                                Slot::Param(name) => {
                                    details.params.insert(name, value);
                                }
                                Slot::Return => details.return_value = Some(value),
                            }
                        }
                        text.clear();
                    }
                },
                Event::Eof => break,
                _ => {}
            }
        }

        if current.is_some() {
            return Err(Error::Xml("unterminated <api> element".to_string()));
        }

        Ok(ApiDocs { apis })
    }

    /// Adds or replaces the documentation of `name`.
    pub fn insert(&mut self, name: impl Into<String>, details: ApiDetails) {
        self.apis.insert(name.into(), details);
    }

    /// The documentation of `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ApiDetails> {
        self.apis.get(name)
    }

    /// Number of documented APIs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.apis.len()
    }

    /// Returns `true` if nothing is documented.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.apis.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_store() {
        let docs = ApiDocs::from_xml(
            r#"<?xml version="1.0"?>
            <apis>
              <api name="RECT">
                <description>Defines a rectangle &amp; its corners.</description>
                <helplink>https://example.invalid/rect</helplink>
                <field name="left">Left edge.</field>
                <field name="top"><![CDATA[Top <edge>.]]></field>
              </api>
              <api name="GetTickCount">
                <description>Milliseconds since boot.</description>
                <remarks>Wraps after 49.7 days.</remarks>
                <param name="unused">Nothing.</param>
                <return>The tick count.</return>
              </api>
            </apis>"#,
        )
        .unwrap();

        assert_eq!(docs.len(), 2);
        let rect = docs.get("RECT").unwrap();
        assert_eq!(
            rect.description.as_deref(),
            Some("Defines a rectangle & its corners.")
        );
        assert_eq!(rect.help_link.as_deref(), Some("https://example.invalid/rect"));
        assert_eq!(rect.fields["left"], "Left edge.");
        assert_eq!(rect.fields["top"], "Top <edge>.");
        assert!(rect.remarks.is_none());

        let ticks = docs.get("GetTickCount").unwrap();
        assert_eq!(ticks.remarks.as_deref(), Some("Wraps after 49.7 days."));
        assert_eq!(ticks.params["unused"], "Nothing.");
        assert_eq!(ticks.return_value.as_deref(), Some("The tick count."));
        assert!(docs.get("POINT").is_none());
    }

    #[test]
    fn malformed_store() {
        assert!(matches!(
            ApiDocs::from_xml("<apis><api><description>x</description></api></apis>"),
            Err(Error::Xml(_))
        ));
        assert!(ApiDocs::from_xml("<apis><api name=\"A\">").is_err());
        assert!(ApiDocs::from_xml("").unwrap().is_empty());
    }
}
