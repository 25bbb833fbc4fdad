//! Ordered merge of SDL documents.

use std::mem::discriminant;

use async_graphql_parser::Positioned;
use async_graphql_parser::types::{
    ConstDirective, DirectiveDefinition, EnumValueDefinition, FieldDefinition,
    InputValueDefinition, SchemaDefinition, ServiceDocument, TypeDefinition, TypeKind,
    TypeSystemDefinition,
};
use async_graphql_value::Name;
use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::error::CompositionError;

/// Merges documents in order into one document.
///
/// Same-named types are folded together: later fields, enum values, union
/// members and input fields replace earlier entries of the same name and
/// append otherwise. `extend` definitions fold into their base wherever the
/// base appears. Redefining a type with a different kind is an error.
pub fn merge_documents(
    documents: impl IntoIterator<Item = ServiceDocument>,
) -> Result<ServiceDocument, CompositionError> {
    let mut schema: Option<Positioned<SchemaDefinition>> = None;
    let mut directives: IndexMap<String, Positioned<DirectiveDefinition>> = IndexMap::new();
    let mut types: IndexMap<String, Positioned<TypeDefinition>> = IndexMap::new();

    for document in documents {
        for definition in document.definitions {
            match definition {
                TypeSystemDefinition::Schema(incoming) => match schema.as_mut() {
                    Some(existing) => merge_schema(&mut existing.node, incoming.node),
                    None => {
                        let mut incoming = incoming;
                        incoming.node.extend = false;
                        schema = Some(incoming);
                    }
                },
                TypeSystemDefinition::Directive(incoming) => {
                    let name = incoming.node.name.node.to_string();
                    if directives.insert(name.clone(), incoming).is_some() {
                        trace!(directive = %name, "Directive definition replaced");
                    }
                }
                TypeSystemDefinition::Type(incoming) => {
                    let name = incoming.node.name.node.to_string();
                    match types.get_mut(&name) {
                        Some(existing) => merge_type(&mut existing.node, incoming.node)?,
                        None => {
                            let mut incoming = incoming;
                            incoming.node.extend = false;
                            types.insert(name, incoming);
                        }
                    }
                }
            }
        }
    }

    debug!(types = types.len(), "Merged type definitions");

    let mut definitions = Vec::with_capacity(types.len() + directives.len() + 1);
    if let Some(schema) = schema {
        definitions.push(TypeSystemDefinition::Schema(schema));
    }
    definitions.extend(directives.into_values().map(TypeSystemDefinition::Directive));
    definitions.extend(types.into_values().map(TypeSystemDefinition::Type));
    Ok(ServiceDocument { definitions })
}

fn merge_schema(existing: &mut SchemaDefinition, incoming: SchemaDefinition) {
    if incoming.query.is_some() {
        existing.query = incoming.query;
    }
    if incoming.mutation.is_some() {
        existing.mutation = incoming.mutation;
    }
    if incoming.subscription.is_some() {
        existing.subscription = incoming.subscription;
    }
    merge_directives(&mut existing.directives, incoming.directives);
}

fn kind_name(kind: &TypeKind) -> &'static str {
    match kind {
        TypeKind::Scalar => "scalar",
        TypeKind::Object(_) => "type",
        TypeKind::Interface(_) => "interface",
        TypeKind::Union(_) => "union",
        TypeKind::Enum(_) => "enum",
        TypeKind::InputObject(_) => "input",
    }
}

fn merge_type(existing: &mut TypeDefinition, incoming: TypeDefinition) -> Result<(), CompositionError> {
    if discriminant(&existing.kind) != discriminant(&incoming.kind) {
        return Err(CompositionError::schema_merge(format!(
            "type '{}' is defined as {} and as {}",
            existing.name.node,
            kind_name(&existing.kind),
            kind_name(&incoming.kind)
        )));
    }

    // A base definition's description wins over an extension's.
    if incoming.description.is_some() && (!incoming.extend || existing.description.is_none()) {
        existing.description = incoming.description;
    }
    merge_directives(&mut existing.directives, incoming.directives);

    match (&mut existing.kind, incoming.kind) {
        (TypeKind::Object(existing), TypeKind::Object(incoming)) => {
            merge_names(&mut existing.implements, incoming.implements);
            merge_fields(&mut existing.fields, incoming.fields);
        }
        (TypeKind::Interface(existing), TypeKind::Interface(incoming)) => {
            merge_names(&mut existing.implements, incoming.implements);
            merge_fields(&mut existing.fields, incoming.fields);
        }
        (TypeKind::Union(existing), TypeKind::Union(incoming)) => {
            merge_names(&mut existing.members, incoming.members);
        }
        (TypeKind::Enum(existing), TypeKind::Enum(incoming)) => {
            merge_enum_values(&mut existing.values, incoming.values);
        }
        (TypeKind::InputObject(existing), TypeKind::InputObject(incoming)) => {
            merge_input_values(&mut existing.fields, incoming.fields);
        }
        _ => {}
    }
    Ok(())
}

fn merge_fields(
    existing: &mut Vec<Positioned<FieldDefinition>>,
    incoming: Vec<Positioned<FieldDefinition>>,
) {
    for field in incoming {
        match existing
            .iter_mut()
            .find(|f| f.node.name.node == field.node.name.node)
        {
            Some(slot) => *slot = field,
            None => existing.push(field),
        }
    }
}

fn merge_input_values(
    existing: &mut Vec<Positioned<InputValueDefinition>>,
    incoming: Vec<Positioned<InputValueDefinition>>,
) {
    for value in incoming {
        match existing
            .iter_mut()
            .find(|v| v.node.name.node == value.node.name.node)
        {
            Some(slot) => *slot = value,
            None => existing.push(value),
        }
    }
}

fn merge_enum_values(
    existing: &mut Vec<Positioned<EnumValueDefinition>>,
    incoming: Vec<Positioned<EnumValueDefinition>>,
) {
    for value in incoming {
        match existing
            .iter_mut()
            .find(|v| v.node.value.node == value.node.value.node)
        {
            Some(slot) => *slot = value,
            None => existing.push(value),
        }
    }
}

fn merge_names(existing: &mut Vec<Positioned<Name>>, incoming: Vec<Positioned<Name>>) {
    for name in incoming {
        if !existing.iter().any(|n| n.node == name.node) {
            existing.push(name);
        }
    }
}

fn merge_directives(
    existing: &mut Vec<Positioned<ConstDirective>>,
    incoming: Vec<Positioned<ConstDirective>>,
) {
    for directive in incoming {
        if !existing
            .iter()
            .any(|d| d.node.name.node == directive.node.name.node)
        {
            existing.push(directive);
        }
    }
}
