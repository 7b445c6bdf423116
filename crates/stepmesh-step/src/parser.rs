//! Part 21 parser: builds the entity graph from tokens.
//!
//! Records are parsed without interpreting their semantics. Each entity keeps
//! its id, type name and argument tree, plus the set of ids it references.
//! Reference targets are not resolved here, so forward references need no
//! special handling.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{Result, StepError};
use crate::graph::EntityGraph;
use crate::header::StepHeader;
use crate::lexer::{Lexer, Position, SpannedToken, Token};

/// A single argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedValue {
    /// Unset (`$`) or derived (`*`).
    Null,
    /// `.T.` / `.F.`
    Bool(bool),
    /// Integer or real.
    Number(f64),
    /// String or binary literal.
    Text(String),
    /// Enumeration tag.
    Enum(String),
    /// Instance reference.
    Reference(u64),
    /// Parenthesized list.
    List(Vec<ParsedValue>),
    /// Typed parameter (`LENGTH_MEASURE(2.)`) or one part of a complex instance.
    Typed {
        /// Type name.
        type_name: String,
        /// Arguments.
        args: Vec<ParsedValue>,
    },
}

impl ParsedValue {
    /// Numeric value; a typed measure such as `PARAMETER_VALUE(0.5)` unwraps
    /// to its single argument.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParsedValue::Number(v) => Some(*v),
            ParsedValue::Typed { args, .. } if args.len() == 1 => args[0].as_number(),
            _ => None,
        }
    }

    /// Integral numeric value.
    pub fn as_integer(&self) -> Option<i64> {
        self.as_number()
            .filter(|v| v.fract() == 0.0 && v.abs() < i64::MAX as f64)
            .map(|v| v as i64)
    }

    /// Text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParsedValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Enumeration tag.
    pub fn as_enum(&self) -> Option<&str> {
        match self {
            ParsedValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParsedValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Referenced id.
    pub fn as_reference(&self) -> Option<u64> {
        match self {
            ParsedValue::Reference(id) => Some(*id),
            _ => None,
        }
    }

    /// List items.
    pub fn as_list(&self) -> Option<&[ParsedValue]> {
        match self {
            ParsedValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Whether the value is unset.
    pub fn is_null(&self) -> bool {
        matches!(self, ParsedValue::Null)
    }

    /// Depth-first walk appending every referenced id not already in `seen`.
    fn collect_refs(&self, seen: &mut HashSet<u64>, out: &mut Vec<u64>) {
        match self {
            ParsedValue::Reference(id) => {
                if seen.insert(*id) {
                    out.push(*id);
                }
            }
            ParsedValue::List(items) | ParsedValue::Typed { args: items, .. } => {
                for item in items {
                    item.collect_refs(seen, out);
                }
            }
            _ => {}
        }
    }
}

/// A parsed data-section instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Instance id (`#123`).
    pub id: u64,
    /// Type name. Complex instances use their part names in parentheses,
    /// e.g. `(BOUNDED_CURVE B_SPLINE_CURVE ...)`.
    pub type_name: String,
    /// Arguments. For complex instances, one [`ParsedValue::Typed`] per part.
    pub args: Vec<ParsedValue>,
    /// Distinct ids referenced anywhere in `args`, in first-seen order.
    pub refs: Vec<u64>,
    /// Whether the record was a complex (multi-part) instance.
    pub complex: bool,
    /// Source line of the record.
    pub line: usize,
}

impl Entity {
    /// Build a simple instance and compute its reference set.
    pub fn new(id: u64, type_name: impl Into<String>, args: Vec<ParsedValue>) -> Self {
        let mut entity = Entity {
            id,
            type_name: type_name.into(),
            args,
            refs: Vec::new(),
            complex: false,
            line: 0,
        };
        entity.refs = compute_refs(&entity.args);
        entity
    }

    /// Build a complex instance from `(part name, args)` pairs.
    pub fn complex(id: u64, parts: Vec<(String, Vec<ParsedValue>)>) -> Self {
        let names: Vec<&str> = parts.iter().map(|(n, _)| n.as_str()).collect();
        let type_name = format!("({})", names.join(" "));
        let args = parts
            .into_iter()
            .map(|(type_name, args)| ParsedValue::Typed { type_name, args })
            .collect();
        let mut entity = Entity::new(id, type_name, args);
        entity.complex = true;
        entity
    }

    /// Names this entity is indexed under: its type, or every part name.
    pub fn type_names(&self) -> Vec<&str> {
        if self.complex {
            self.args
                .iter()
                .filter_map(|a| match a {
                    ParsedValue::Typed { type_name, .. } => Some(type_name.as_str()),
                    _ => None,
                })
                .collect()
        } else {
            vec![self.type_name.as_str()]
        }
    }

    /// Whether the entity is, or has a part, of type `name`.
    pub fn is_a(&self, name: &str) -> bool {
        self.type_name == name || (self.complex && self.part(name).is_some())
    }

    /// Arguments of the named part of a complex instance, or the entity's own
    /// arguments when it is a simple instance of that type.
    pub fn part(&self, name: &str) -> Option<&[ParsedValue]> {
        if !self.complex {
            return (self.type_name == name).then_some(self.args.as_slice());
        }
        self.args.iter().find_map(|a| match a {
            ParsedValue::Typed { type_name, args } if type_name == name => Some(args.as_slice()),
            _ => None,
        })
    }
}

fn compute_refs(args: &[ParsedValue]) -> Vec<u64> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for arg in args {
        arg.collect_refs(&mut seen, &mut out);
    }
    out
}

/// A parsed STEP file.
#[derive(Debug, Clone)]
pub struct StepFile {
    /// Header metadata.
    pub header: StepHeader,
    /// Data-section entities.
    pub graph: EntityGraph,
}

/// Parse a complete Part 21 file.
pub fn parse_step(input: &[u8]) -> Result<StepFile> {
    Parser::parse(input)
}

/// Recursive-descent parser over a token stream.
pub struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    eof: Position,
    current_entity: Option<u64>,
}

impl Parser {
    /// Parse a STEP file from bytes.
    pub fn parse(input: &[u8]) -> Result<StepFile> {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize()?;
        debug!(bytes = input.len(), tokens = tokens.len(), "tokenized STEP input");
        let mut parser = Parser {
            tokens,
            pos: 0,
            eof: lexer.position(),
            current_entity: None,
        };
        parser.parse_file()
    }

    fn parse_file(&mut self) -> Result<StepFile> {
        let mut header_records = Vec::new();
        let mut entities = Vec::new();

        if self.check_keyword("ISO-10303-21") {
            self.advance();
            self.expect_token(&Token::Semicolon)?;
        }

        while !self.is_at_end() {
            if self.check_keyword("HEADER") {
                self.advance();
                self.expect_token(&Token::Semicolon)?;
                header_records.extend(self.parse_header_section()?);
                self.expect_keyword("ENDSEC")?;
                self.expect_token(&Token::Semicolon)?;
            } else if self.check_keyword("DATA") {
                self.advance();
                // Edition 3 allows `DATA('name', ('schema'));`
                if self.check_token(&Token::LParen) {
                    self.parse_args()?;
                }
                self.expect_token(&Token::Semicolon)?;
                self.parse_data_section(&mut entities)?;
                self.expect_keyword("ENDSEC")?;
                self.expect_token(&Token::Semicolon)?;
            } else if self.check_keyword("END-ISO-10303-21") {
                self.advance();
                self.expect_token(&Token::Semicolon)?;
                break;
            } else {
                return Err(self.error(format!("unexpected token {:?}", self.peek_token())));
            }
        }

        let header = StepHeader::from_records(&header_records);
        let graph = EntityGraph::from_entities(entities)?;
        debug!(entities = graph.len(), schema = ?header.schema, "parsed STEP file");
        Ok(StepFile { header, graph })
    }

    fn parse_header_section(&mut self) -> Result<Vec<(String, Vec<ParsedValue>)>> {
        let mut records = Vec::new();
        while let Some(Token::Keyword(name)) = self.peek_token().cloned() {
            if name == "ENDSEC" {
                break;
            }
            self.advance();
            let args = self.parse_args()?;
            self.expect_token(&Token::Semicolon)?;
            records.push((name, args));
        }
        Ok(records)
    }

    fn parse_data_section(&mut self, entities: &mut Vec<Entity>) -> Result<()> {
        while let Some(Token::EntityRef(id)) = self.peek_token().cloned() {
            let line = self.peek().map(|t| t.pos.line).unwrap_or(self.eof.line);
            self.current_entity = Some(id);
            self.advance();
            self.expect_token(&Token::Equals)?;

            let mut entity = match self.peek_token().cloned() {
                Some(Token::Keyword(type_name)) => {
                    self.advance();
                    let args = self.parse_args()?;
                    Entity::new(id, type_name, args)
                }
                Some(Token::LParen) => {
                    self.advance();
                    let mut parts = Vec::new();
                    while let Some(Token::Keyword(part)) = self.peek_token().cloned() {
                        self.advance();
                        parts.push((part, self.parse_args()?));
                    }
                    self.expect_token(&Token::RParen)?;
                    if parts.is_empty() {
                        return Err(self.error("complex instance has no parts"));
                    }
                    Entity::complex(id, parts)
                }
                other => return Err(self.error(format!("expected type name, got {other:?}"))),
            };
            self.expect_token(&Token::Semicolon)?;
            entity.line = line;
            entities.push(entity);
            self.current_entity = None;
        }
        Ok(())
    }

    fn parse_args(&mut self) -> Result<Vec<ParsedValue>> {
        self.expect_token(&Token::LParen)?;
        let mut args = Vec::new();
        if !self.check_token(&Token::RParen) {
            args.push(self.parse_value()?);
            while self.check_token(&Token::Comma) {
                self.advance();
                args.push(self.parse_value()?);
            }
        }
        self.expect_token(&Token::RParen)?;
        Ok(args)
    }

    fn parse_value(&mut self) -> Result<ParsedValue> {
        let Some(tok) = self.peek_token().cloned() else {
            return Err(self.error("unexpected end of input"));
        };
        let value = match tok {
            Token::LParen => return self.parse_args().map(ParsedValue::List),
            Token::Keyword(type_name) => {
                self.advance();
                let args = self.parse_args()?;
                return Ok(ParsedValue::Typed { type_name, args });
            }
            Token::EntityRef(id) => ParsedValue::Reference(id),
            Token::String(s) | Token::Binary(s) => ParsedValue::Text(s),
            Token::Real(v) => ParsedValue::Number(v),
            Token::Integer(v) => ParsedValue::Number(v as f64),
            Token::Enum(e) => match e.as_str() {
                "T" | "TRUE" => ParsedValue::Bool(true),
                "F" | "FALSE" => ParsedValue::Bool(false),
                _ => ParsedValue::Enum(e),
            },
            Token::Asterisk | Token::Dollar => ParsedValue::Null,
            other => return Err(self.error(format!("unexpected value {other:?}"))),
        };
        self.advance();
        Ok(value)
    }

    fn peek(&self) -> Option<&SpannedToken> {
        self.tokens.get(self.pos)
    }

    fn peek_token(&self) -> Option<&Token> {
        self.peek().map(|t| &t.token)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check_token(&self, expected: &Token) -> bool {
        self.peek_token() == Some(expected)
    }

    fn check_keyword(&self, name: &str) -> bool {
        matches!(self.peek_token(), Some(Token::Keyword(k)) if k == name)
    }

    fn error(&self, message: impl Into<String>) -> StepError {
        let pos = self.peek().map(|t| t.pos).unwrap_or(self.eof);
        StepError::parser(self.current_entity, pos.line, pos.col, message)
    }

    fn expect_token(&mut self, expected: &Token) -> Result<()> {
        if self.check_token(expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {expected:?}, got {:?}", self.peek_token())))
        }
    }

    fn expect_keyword(&mut self, name: &str) -> Result<()> {
        if self.check_keyword(name) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected keyword '{name}', got {:?}", self.peek_token())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Protocol;

    fn wrap(data: &str) -> String {
        format!(
            "ISO-10303-21;\nHEADER;\nFILE_DESCRIPTION((''),'2;1');\nENDSEC;\nDATA;\n{data}\nENDSEC;\nEND-ISO-10303-21;\n"
        )
    }

    #[test]
    fn test_parse_simple() {
        let input = r#"
ISO-10303-21;
HEADER;
FILE_DESCRIPTION(('demo part'), '2;1');
FILE_NAME('cube.stp', '2024-05-01T10:00:00', ('someone'), ('org'), 'pp', 'sys', '');
FILE_SCHEMA(('AUTOMOTIVE_DESIGN { 1 0 10303 214 1 1 1 1 }'));
ENDSEC;
DATA;
#1 = CARTESIAN_POINT('origin', (0.0, 0.0, 0.0));
#2 = DIRECTION('x', (1., 0., 0.));
ENDSEC;
END-ISO-10303-21;
"#;
        let file = parse_step(input.as_bytes()).unwrap();
        assert_eq!(file.header.file_name, "cube.stp");
        assert_eq!(file.header.description, vec!["demo part"]);
        assert_eq!(file.header.protocol, Protocol::Ap214);
        assert_eq!(file.graph.len(), 2);

        let p1 = file.graph.get(1).unwrap();
        assert_eq!(p1.type_name, "CARTESIAN_POINT");
        assert_eq!(p1.args[0].as_text(), Some("origin"));
        let coords = p1.args[1].as_list().unwrap();
        assert_eq!(coords.len(), 3);
        assert_eq!(coords[0].as_number(), Some(0.0));
        assert_eq!(p1.line, 9);
    }

    #[test]
    fn test_values() {
        let input = wrap(
            "#1 = B_SPLINE_CURVE_WITH_KNOTS('', 3, (#2, #3, #4), .UNSPECIFIED., .F., .T., (4, 4), (0.0, 1.0), $, *, PARAMETER_VALUE(0.5));",
        );
        let file = parse_step(input.as_bytes()).unwrap();
        let e = file.graph.get(1).unwrap();
        assert_eq!(e.args[1].as_integer(), Some(3));
        assert_eq!(e.args[3].as_enum(), Some("UNSPECIFIED"));
        assert_eq!(e.args[4].as_bool(), Some(false));
        assert_eq!(e.args[5].as_bool(), Some(true));
        assert!(e.args[8].is_null());
        assert!(e.args[9].is_null());
        assert_eq!(e.args[10].as_number(), Some(0.5));
        assert_eq!(e.refs, vec![2, 3, 4]);
    }

    #[test]
    fn test_complex_instance() {
        let input = wrap(
            "#7 = ( BOUNDED_CURVE() B_SPLINE_CURVE(1, (#1, #2), .UNSPECIFIED., .F., .F.) RATIONAL_B_SPLINE_CURVE((1., 2.)) );",
        );
        let file = parse_step(input.as_bytes()).unwrap();
        let e = file.graph.get(7).unwrap();
        assert!(e.complex);
        assert!(e.is_a("RATIONAL_B_SPLINE_CURVE"));
        assert!(!e.is_a("LINE"));
        assert_eq!(e.part("B_SPLINE_CURVE").map(|a| a.len()), Some(5));
        assert_eq!(e.refs, vec![1, 2]);
        assert_eq!(file.graph.ids_of_type("BOUNDED_CURVE"), &[7]);
        assert_eq!(file.graph.ids_of_type("B_SPLINE_CURVE"), &[7]);
    }

    #[test]
    fn test_strings_with_parens_and_comments() {
        let input = wrap("/* a (comment */ #1 = PRODUCT('a(b', 'it''s', '', ());");
        let file = parse_step(input.as_bytes()).unwrap();
        let e = file.graph.get(1).unwrap();
        assert_eq!(e.args[0].as_text(), Some("a(b"));
        assert_eq!(e.args[1].as_text(), Some("it's"));
        assert_eq!(e.args[3].as_list().map(|l| l.len()), Some(0));
    }

    #[test]
    fn test_forward_references_resolve_identically() {
        let forward = wrap(
            "#10 = VERTEX_POINT('', #20);\n#20 = CARTESIAN_POINT('', (1., 2., 3.));",
        );
        let backward = wrap(
            "#20 = CARTESIAN_POINT('', (1., 2., 3.));\n#10 = VERTEX_POINT('', #20);",
        );
        let a = parse_step(forward.as_bytes()).unwrap().graph;
        let b = parse_step(backward.as_bytes()).unwrap().graph;
        for g in [&a, &b] {
            assert_eq!(g.references(10), &[20]);
            assert_eq!(g.referrers(20), &[10]);
        }
        assert_eq!(a.get(10).map(|e| &e.args), b.get(10).map(|e| &e.args));
        assert_eq!(a.get(20).map(|e| &e.args), b.get(20).map(|e| &e.args));
    }

    #[test]
    fn test_unterminated_record_is_fatal() {
        let input = wrap("#1 = CARTESIAN_POINT('', (0., 0., 0.);\n#2 = DIRECTION('', (0., 0., 1.));");
        match parse_step(input.as_bytes()) {
            Err(StepError::Parser { entity_id, line, .. }) => {
                assert_eq!(entity_id, Some(1));
                assert_eq!(line, 6);
            }
            other => panic!("expected parser error, got {other:?}"),
        }

        let input = wrap("#1 = CARTESIAN_POINT('unterminated, (0., 0., 0.));");
        assert!(matches!(parse_step(input.as_bytes()), Err(StepError::Lexer { .. })));
    }

    #[test]
    fn test_duplicate_id_is_fatal() {
        let input = wrap("#1 = DIRECTION('', (0., 0., 1.));\n#1 = DIRECTION('', (1., 0., 0.));");
        let err = parse_step(input.as_bytes()).unwrap_err();
        assert!(matches!(err, StepError::DuplicateEntity(1)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_lenient_framing() {
        // No ISO marker and no END marker.
        let input = "DATA;\n#1 = DIRECTION('', (0., 0., 1.));\nENDSEC;\n";
        let file = parse_step(input.as_bytes()).unwrap();
        assert_eq!(file.graph.len(), 1);
        assert_eq!(file.header.protocol, Protocol::Unknown);
    }
}
