//! Prints a parsed SDL document back to text.

use std::fmt::Write;

use async_graphql_parser::Positioned;
use async_graphql_parser::types::{
    ConstDirective, DirectiveDefinition, DirectiveLocation, FieldDefinition,
    InputValueDefinition, SchemaDefinition, ServiceDocument, TypeDefinition, TypeKind,
    TypeSystemDefinition,
};
use async_graphql_value::Name;

const INDENT: &str = "  ";

/// Renders `document` as SDL, one blank line between definitions.
pub fn print_document(document: &ServiceDocument) -> String {
    let blocks: Vec<String> = document
        .definitions
        .iter()
        .map(|definition| match definition {
            TypeSystemDefinition::Schema(schema) => print_schema(&schema.node),
            TypeSystemDefinition::Directive(directive) => print_directive_definition(&directive.node),
            TypeSystemDefinition::Type(ty) => print_type(&ty.node),
        })
        .collect();

    let mut out = blocks.join("\n\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn print_schema(schema: &SchemaDefinition) -> String {
    let mut out = String::from("schema");
    out.push_str(&print_directives(&schema.directives));
    out.push_str(" {\n");
    let roots = [
        ("query", &schema.query),
        ("mutation", &schema.mutation),
        ("subscription", &schema.subscription),
    ];
    for (operation, name) in roots {
        if let Some(name) = name {
            let _ = writeln!(out, "{INDENT}{operation}: {}", name.node);
        }
    }
    out.push('}');
    out
}

fn print_directive_definition(directive: &DirectiveDefinition) -> String {
    let mut out = print_description(directive.description.as_ref(), "");
    let _ = write!(out, "directive @{}", directive.name.node);
    out.push_str(&print_arguments(&directive.arguments));
    if directive.is_repeatable {
        out.push_str(" repeatable");
    }
    let locations: Vec<String> = directive
        .locations
        .iter()
        .map(|location| location_name(&location.node))
        .collect();
    let _ = write!(out, " on {}", locations.join(" | "));
    out
}

fn print_type(ty: &TypeDefinition) -> String {
    let mut out = print_description(ty.description.as_ref(), "");
    let name = &ty.name.node;
    let directives = print_directives(&ty.directives);

    match &ty.kind {
        TypeKind::Scalar => {
            let _ = write!(out, "scalar {name}{directives}");
        }
        TypeKind::Object(object) => {
            let _ = write!(out, "type {name}{}{directives}", print_implements(&object.implements));
            out.push_str(&print_fields(&object.fields));
        }
        TypeKind::Interface(interface) => {
            let _ = write!(
                out,
                "interface {name}{}{directives}",
                print_implements(&interface.implements)
            );
            out.push_str(&print_fields(&interface.fields));
        }
        TypeKind::Union(union) => {
            let _ = write!(out, "union {name}{directives}");
            if !union.members.is_empty() {
                let members: Vec<&str> = union.members.iter().map(|m| m.node.as_str()).collect();
                let _ = write!(out, " = {}", members.join(" | "));
            }
        }
        TypeKind::Enum(enum_type) => {
            let _ = write!(out, "enum {name}{directives}");
            if !enum_type.values.is_empty() {
                out.push_str(" {\n");
                for value in &enum_type.values {
                    out.push_str(&print_description(value.node.description.as_ref(), INDENT));
                    let _ = writeln!(
                        out,
                        "{INDENT}{}{}",
                        value.node.value.node,
                        print_directives(&value.node.directives)
                    );
                }
                out.push('}');
            }
        }
        TypeKind::InputObject(input) => {
            let _ = write!(out, "input {name}{directives}");
            if !input.fields.is_empty() {
                out.push_str(" {\n");
                for field in &input.fields {
                    out.push_str(&print_description(field.node.description.as_ref(), INDENT));
                    let _ = writeln!(out, "{INDENT}{}", print_input_value(&field.node));
                }
                out.push('}');
            }
        }
    }
    out
}

fn print_fields(fields: &[Positioned<FieldDefinition>]) -> String {
    if fields.is_empty() {
        return String::new();
    }
    let mut out = String::from(" {\n");
    for field in fields {
        let field = &field.node;
        out.push_str(&print_description(field.description.as_ref(), INDENT));
        let _ = writeln!(
            out,
            "{INDENT}{}{}: {}{}",
            field.name.node,
            print_arguments(&field.arguments),
            field.ty.node,
            print_directives(&field.directives)
        );
    }
    out.push('}');
    out
}

fn print_arguments(arguments: &[Positioned<InputValueDefinition>]) -> String {
    if arguments.is_empty() {
        return String::new();
    }
    let rendered: Vec<String> = arguments
        .iter()
        .map(|argument| {
            let description = argument
                .node
                .description
                .as_ref()
                .map(|d| format!("{} ", quote(&d.node)))
                .unwrap_or_default();
            format!("{description}{}", print_input_value(&argument.node))
        })
        .collect();
    format!("({})", rendered.join(", "))
}

fn print_input_value(value: &InputValueDefinition) -> String {
    let mut out = format!("{}: {}", value.name.node, value.ty.node);
    if let Some(default) = &value.default_value {
        let _ = write!(out, " = {}", default.node);
    }
    out.push_str(&print_directives(&value.directives));
    out
}

fn print_implements(implements: &[Positioned<Name>]) -> String {
    if implements.is_empty() {
        return String::new();
    }
    let names: Vec<&str> = implements.iter().map(|n| n.node.as_str()).collect();
    format!(" implements {}", names.join(" & "))
}

fn print_directives(directives: &[Positioned<ConstDirective>]) -> String {
    directives
        .iter()
        .map(|directive| {
            let directive = &directive.node;
            if directive.arguments.is_empty() {
                format!(" @{}", directive.name.node)
            } else {
                let arguments: Vec<String> = directive
                    .arguments
                    .iter()
                    .map(|(name, value)| format!("{}: {}", name.node, value.node))
                    .collect();
                format!(" @{}({})", directive.name.node, arguments.join(", "))
            }
        })
        .collect()
}

fn print_description(description: Option<&Positioned<String>>, indent: &str) -> String {
    match description {
        Some(description) => format!("{indent}{}\n", quote(&description.node)),
        None => String::new(),
    }
}

// GraphQL string escapes are a subset of JSON's.
fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{text}\""))
}

/// `FieldDefinition` -> `FIELD_DEFINITION`.
fn location_name(location: &DirectiveLocation) -> String {
    let debug = format!("{location:?}");
    let mut out = String::with_capacity(debug.len() + 4);
    for (i, ch) in debug.chars().enumerate() {
        if ch.is_ascii_uppercase() && i > 0 {
            out.push('_');
        }
        out.push(ch.to_ascii_uppercase());
    }
    out
}
