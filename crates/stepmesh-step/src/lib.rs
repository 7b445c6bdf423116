#![warn(missing_docs)]

//! STEP (ISO 10303-21) reading for the stepmesh importer.
//!
//! Parses the exchange structure into an [`EntityGraph`], converts geometry
//! entities into [`stepmesh_geom`] curves and surfaces, and resolves B-Rep
//! faces for tessellation. Protocols AP203, AP214 and AP242 share the
//! geometry and topology subset handled here.
//!
//! # Example
//!
//! ```no_run
//! use stepmesh_step::{parse_step, resolve_faces, validate_topology};
//!
//! let bytes = std::fs::read("model.step").unwrap();
//! let file = parse_step(&bytes).unwrap();
//! println!("{} entities, schema {:?}", file.graph.len(), file.header.schema);
//!
//! for (id, face) in resolve_faces(&file.graph) {
//!     if let Err(e) = face {
//!         eprintln!("face #{id}: {e}");
//!     }
//! }
//! let check = validate_topology(&file.graph);
//! assert!(check.issues.is_empty());
//! ```

mod cache;
pub mod entities;
mod error;
mod faces;
mod graph;
mod header;
mod lexer;
mod parser;
mod validate;

pub use cache::GeometryCache;
pub use entities::{EntityArgs, EntityCategory};
pub use error::{Result, StepError};
pub use faces::{resolve_face, resolve_faces};
pub use graph::EntityGraph;
pub use header::{Protocol, StepHeader};
pub use lexer::{Lexer, Position, SpannedToken, Token};
pub use parser::{parse_step, Entity, ParsedValue, StepFile};
pub use validate::{euler_report, validate_topology, EulerReport, TopologyCheck, TopologyIssue};
