//! SDL merging.
//!
//! Fragments are parsed with `async-graphql-parser`, folded in order by
//! [`merge_documents`] and printed back with [`print_document`].

mod merge;
mod printer;

pub use merge::merge_documents;
pub use printer::print_document;

use async_graphql_parser::parse_schema;

use crate::error::CompositionError;
use crate::typedefs::TypeDefs;

/// Merges SDL strings in order into one SDL string.
///
/// # Errors
///
/// `SchemaMerge` if a fragment does not parse or a type is redefined with a
/// different kind.
pub fn merge_type_defs<S: AsRef<str>>(fragments: &[S]) -> Result<String, CompositionError> {
    let documents = fragments
        .iter()
        .map(AsRef::as_ref)
        .filter(|sdl| !sdl.trim().is_empty())
        .map(|sdl| {
            parse_schema(sdl).map_err(|e| CompositionError::schema_merge(format!("invalid SDL: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(print_document(&merge_documents(documents)?))
}

/// Merges [`TypeDefs`] values in order into one SDL string.
pub fn merge_fragments<'a>(
    fragments: impl IntoIterator<Item = &'a TypeDefs>,
) -> Result<String, CompositionError> {
    let mut documents = Vec::new();
    for fragment in fragments {
        documents.extend(fragment.to_documents()?);
    }
    Ok(print_document(&merge_documents(documents)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_type_defs_orders_by_first_definition() {
        let sdl = merge_type_defs(&[
            "type User { id: ID! }",
            "type Post { id: ID! author: User }",
            "type Query { posts: [Post!]! } extend type User { posts: [Post!]! }",
        ])
        .unwrap();

        let user = sdl.find("type User").unwrap();
        let post = sdl.find("type Post").unwrap();
        let query = sdl.find("type Query").unwrap();
        assert!(user < post && post < query);
        assert!(sdl.contains("type User {\n  id: ID!\n  posts: [Post!]!\n}"));
        assert!(!sdl.contains("extend"));
    }

    #[test]
    fn test_merge_type_defs_empty() {
        assert_eq!(merge_type_defs::<&str>(&[]).unwrap(), "");
        assert_eq!(merge_type_defs(&["", "   "]).unwrap(), "");
    }

    #[test]
    fn test_merge_fragments_accepts_documents() {
        let doc = parse_schema("type Query { a: Int }").unwrap();
        let fragments = [TypeDefs::from(doc), TypeDefs::from("extend type Query { b: Int }")];
        let sdl = merge_fragments(&fragments).unwrap();
        assert_eq!(sdl, "type Query {\n  a: Int\n  b: Int\n}\n");
    }
}
