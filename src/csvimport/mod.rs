//! CSV import building blocks: parser, validation/mapping contracts,
//! per-entity plugins, and the registry that ties them together

pub mod entities;
pub mod mapper;
pub mod parser;
pub mod registry;
pub mod validator;

pub use mapper::{EntityCreationRequest, EntityMapper};
pub use parser::{parse_csv, CsvRow, ParseError};
pub use registry::ImportRegistry;
pub use validator::{validate_csv, validate_headers, EntityValidator};
