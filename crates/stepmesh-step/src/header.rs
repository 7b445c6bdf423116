//! HEADER section metadata.

use serde::Serialize;

use crate::parser::ParsedValue;

/// Application protocol detected from `FILE_SCHEMA`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// AP203 configuration-controlled design.
    Ap203,
    /// AP214 automotive design.
    Ap214,
    /// AP242 managed model-based 3D engineering.
    Ap242,
    /// Anything else, or no schema given.
    #[default]
    Unknown,
}

impl Protocol {
    /// Detect the protocol from the schema identifiers.
    pub fn detect<S: AsRef<str>>(schemas: &[S]) -> Self {
        for schema in schemas {
            let s = schema.as_ref().to_ascii_uppercase();
            if s.contains("AP242") || s.contains("MANAGED_MODEL_BASED_3D_ENGINEERING") {
                return Protocol::Ap242;
            }
            if s.contains("AUTOMOTIVE_DESIGN") || s.contains("AP214") {
                return Protocol::Ap214;
            }
            if s.contains("CONFIG_CONTROL_DESIGN") || s.contains("AP203") {
                return Protocol::Ap203;
            }
        }
        Protocol::Unknown
    }
}

/// Contents of the `HEADER;` section. Missing records leave fields empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StepHeader {
    /// `FILE_DESCRIPTION` description strings.
    pub description: Vec<String>,
    /// `FILE_DESCRIPTION` implementation level (e.g. `2;1`).
    pub implementation_level: String,
    /// `FILE_NAME` name.
    pub file_name: String,
    /// `FILE_NAME` time stamp.
    pub timestamp: String,
    /// `FILE_NAME` authors.
    pub authors: Vec<String>,
    /// `FILE_NAME` organizations.
    pub organization: Vec<String>,
    /// `FILE_NAME` preprocessor version.
    pub preprocessor: String,
    /// `FILE_NAME` originating system.
    pub originating_system: String,
    /// `FILE_SCHEMA` identifiers.
    pub schema: Vec<String>,
    /// Protocol detected from `schema`.
    pub protocol: Protocol,
}

impl StepHeader {
    /// Build the header from `(type_name, args)` records in file order.
    /// Unknown records are ignored.
    pub fn from_records(records: &[(String, Vec<ParsedValue>)]) -> Self {
        let mut header = StepHeader::default();
        for (name, args) in records {
            match name.as_str() {
                "FILE_DESCRIPTION" => {
                    header.description = text_list(args.first());
                    header.implementation_level = text(args.get(1));
                }
                "FILE_NAME" => {
                    header.file_name = text(args.first());
                    header.timestamp = text(args.get(1));
                    header.authors = text_list(args.get(2));
                    header.organization = text_list(args.get(3));
                    header.preprocessor = text(args.get(4));
                    header.originating_system = text(args.get(5));
                }
                "FILE_SCHEMA" => {
                    header.schema = text_list(args.first());
                    header.protocol = Protocol::detect(&header.schema);
                }
                _ => {}
            }
        }
        header
    }
}

fn text(value: Option<&ParsedValue>) -> String {
    value.and_then(ParsedValue::as_text).unwrap_or_default().to_string()
}

fn text_list(value: Option<&ParsedValue>) -> Vec<String> {
    match value {
        Some(ParsedValue::List(items)) => items
            .iter()
            .filter_map(ParsedValue::as_text)
            .map(str::to_string)
            .collect(),
        Some(ParsedValue::Text(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}
