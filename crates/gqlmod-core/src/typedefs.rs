//! Type definition fragments.

use async_graphql_parser::parse_schema;
use async_graphql_parser::types::ServiceDocument;

use crate::error::CompositionError;

/// SDL contributed by one module: source text or already parsed documents.
#[derive(Debug, Clone)]
pub enum TypeDefs {
    Sdl(String),
    SdlList(Vec<String>),
    Document(ServiceDocument),
    Documents(Vec<ServiceDocument>),
}

impl Default for TypeDefs {
    fn default() -> Self {
        Self::SdlList(Vec::new())
    }
}

impl TypeDefs {
    /// Parses every fragment. Blank SDL strings are skipped.
    pub fn to_documents(&self) -> Result<Vec<ServiceDocument>, CompositionError> {
        match self {
            Self::Sdl(sdl) => parse_fragment(sdl).map(|doc| doc.into_iter().collect()),
            Self::SdlList(list) => list
                .iter()
                .filter_map(|sdl| parse_fragment(sdl).transpose())
                .collect(),
            Self::Document(doc) => Ok(vec![doc.clone()]),
            Self::Documents(docs) => Ok(docs.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Sdl(sdl) => sdl.trim().is_empty(),
            Self::SdlList(list) => list.iter().all(|sdl| sdl.trim().is_empty()),
            Self::Document(doc) => doc.definitions.is_empty(),
            Self::Documents(docs) => docs.iter().all(|doc| doc.definitions.is_empty()),
        }
    }
}

fn parse_fragment(sdl: &str) -> Result<Option<ServiceDocument>, CompositionError> {
    if sdl.trim().is_empty() {
        return Ok(None);
    }
    parse_schema(sdl)
        .map(Some)
        .map_err(|e| CompositionError::schema_merge(format!("invalid SDL: {e}")))
}

impl From<&str> for TypeDefs {
    fn from(sdl: &str) -> Self {
        Self::Sdl(sdl.to_string())
    }
}

impl From<String> for TypeDefs {
    fn from(sdl: String) -> Self {
        Self::Sdl(sdl)
    }
}

impl From<Vec<String>> for TypeDefs {
    fn from(list: Vec<String>) -> Self {
        Self::SdlList(list)
    }
}

impl From<Vec<&str>> for TypeDefs {
    fn from(list: Vec<&str>) -> Self {
        Self::SdlList(list.into_iter().map(str::to_string).collect())
    }
}

impl From<ServiceDocument> for TypeDefs {
    fn from(doc: ServiceDocument) -> Self {
        Self::Document(doc)
    }
}

impl From<Vec<ServiceDocument>> for TypeDefs {
    fn from(docs: Vec<ServiceDocument>) -> Self {
        Self::Documents(docs)
    }
}
