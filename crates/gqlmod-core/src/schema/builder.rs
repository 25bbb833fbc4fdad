//! Executable schema builder.
//!
//! Turns merged SDL plus a [`ResolverMap`] into an async-graphql dynamic
//! [`Schema`]. Every field gets a resolver: either the one from the map, or a
//! default that reads the same-named key from the parent object value.

use std::sync::Arc;

use async_graphql::dynamic::{
    Enum, EnumItem, Field, FieldFuture, FieldValue, InputObject, InputValue, Interface,
    InterfaceField, Object, ResolverContext, Scalar, Schema, SchemaBuilder, TypeRef, Union,
};
use async_graphql::Value;
use async_graphql_parser::Positioned;
use async_graphql_parser::parse_schema;
use async_graphql_parser::types::{
    BaseType, ConstDirective, FieldDefinition, InputValueDefinition, SchemaDefinition,
    ServiceDocument, Type, TypeDefinition, TypeKind, TypeSystemDefinition,
};
use serde_json::Map;
use tracing::{debug, trace, warn};

use super::value::{
    InputField, InputObjects, OutputKind, OutputShape, TypeKinds, apply_input_defaults,
    to_field_value,
};
use crate::config::SchemaLimits;
use crate::context::ModuleContext;
use crate::error::CompositionError;
use crate::resolver::{FieldInfo, Resolver, ResolverMap, ResolverParams};

const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// Root operation type names.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Roots {
    query: String,
    mutation: Option<String>,
    subscription: Option<String>,
}

/// Builds an executable schema from SDL and resolvers.
///
/// Resolvers keyed by a type or field that the SDL does not declare are
/// logged and ignored.
///
/// # Errors
///
/// `SchemaBuild` if the SDL does not parse, the query root is missing, or
/// async-graphql rejects the resulting schema.
pub fn build_schema(
    type_defs: &str,
    resolvers: &ResolverMap,
    limits: SchemaLimits,
) -> Result<Schema, CompositionError> {
    debug!("Starting GraphQL schema build");

    let document = parse_schema(type_defs)
        .map_err(|e| CompositionError::schema_build(format!("invalid SDL: {e}")))?;

    let type_defs: Vec<&TypeDefinition> = document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            TypeSystemDefinition::Type(ty) => Some(&ty.node),
            _ => None,
        })
        .collect();

    let roots = resolve_roots(&document, &type_defs);
    if !type_defs.iter().any(|ty| ty.name.node.as_str() == roots.query) {
        return Err(CompositionError::schema_build(format!(
            "query root type '{}' is not defined",
            roots.query
        )));
    }
    if let Some(subscription) = &roots.subscription {
        warn!(
            root = %subscription,
            "Subscription root is not executable; registering it as a plain object"
        );
    }

    warn_unknown_resolvers(&type_defs, resolvers);

    let shared = Shared {
        kinds: Arc::new(collect_kinds(&type_defs)),
        inputs: Arc::new(collect_inputs(&type_defs)?),
    };

    let mut builder = Schema::build(&roots.query, roots.mutation.as_deref(), None);
    for ty in &type_defs {
        builder = register_type(builder, ty, resolvers, &shared);
    }

    let mut builder = builder.limit_depth(limits.max_depth);
    builder = builder.limit_complexity(limits.max_complexity);
    if !limits.introspection_enabled {
        builder = builder.disable_introspection();
    }

    let schema = builder
        .finish()
        .map_err(|e| CompositionError::schema_build(e.to_string()))?;

    debug!(types = type_defs.len(), "GraphQL schema build complete");
    Ok(schema)
}

fn resolve_roots(document: &ServiceDocument, type_defs: &[&TypeDefinition]) -> Roots {
    let defined = |name: &str| type_defs.iter().any(|ty| ty.name.node.as_str() == name);

    let schema: Option<&SchemaDefinition> =
        document.definitions.iter().find_map(|definition| match definition {
            TypeSystemDefinition::Schema(schema) => Some(&schema.node),
            _ => None,
        });

    match schema {
        Some(schema) => Roots {
            query: schema
                .query
                .as_ref()
                .map_or_else(|| "Query".to_string(), |name| name.node.to_string()),
            mutation: schema.mutation.as_ref().map(|name| name.node.to_string()),
            subscription: schema.subscription.as_ref().map(|name| name.node.to_string()),
        },
        None => Roots {
            query: "Query".to_string(),
            mutation: defined("Mutation").then(|| "Mutation".to_string()),
            subscription: defined("Subscription").then(|| "Subscription".to_string()),
        },
    }
}

fn collect_kinds(type_defs: &[&TypeDefinition]) -> TypeKinds {
    type_defs
        .iter()
        .map(|ty| {
            let kind = match ty.kind {
                TypeKind::Object(_) => OutputKind::Object,
                TypeKind::Interface(_) | TypeKind::Union(_) => OutputKind::Abstract,
                TypeKind::Enum(_) => OutputKind::Enum,
                TypeKind::Scalar | TypeKind::InputObject(_) => OutputKind::Scalar,
            };
            (ty.name.node.to_string(), kind)
        })
        .collect()
}

/// Input object fields with their defaults, for filling in arguments.
fn collect_inputs(type_defs: &[&TypeDefinition]) -> Result<InputObjects, CompositionError> {
    let mut inputs = InputObjects::new();
    for ty in type_defs {
        let TypeKind::InputObject(input) = &ty.kind else {
            continue;
        };
        let fields = input
            .fields
            .iter()
            .map(|field| {
                let field = &field.node;
                let default = field
                    .default_value
                    .as_ref()
                    .map(|value| value.node.clone().into_json())
                    .transpose()
                    .map_err(|e| {
                        CompositionError::schema_build(format!(
                            "default of {}.{} is not representable: {e}",
                            ty.name.node, field.name.node
                        ))
                    })?;
                Ok(InputField {
                    name: field.name.node.to_string(),
                    shape: output_shape(&field.ty.node),
                    default,
                })
            })
            .collect::<Result<Vec<_>, CompositionError>>()?;
        inputs.insert(ty.name.node.to_string(), fields);
    }
    Ok(inputs)
}

fn warn_unknown_resolvers(type_defs: &[&TypeDefinition], resolvers: &ResolverMap) {
    for (type_name, field_name) in resolvers.paths() {
        let declared = type_defs
            .iter()
            .find(|ty| ty.name.node.as_str() == type_name)
            .map(|ty| match &ty.kind {
                TypeKind::Object(object) => has_field(&object.fields, &field_name),
                TypeKind::Interface(interface) => has_field(&interface.fields, &field_name),
                _ => false,
            });
        match declared {
            Some(true) => {}
            Some(false) => warn!(
                type_name = %type_name,
                field = %field_name,
                "Resolver for a field missing from the schema is ignored"
            ),
            None => warn!(
                type_name = %type_name,
                field = %field_name,
                "Resolver for a type missing from the schema is ignored"
            ),
        }
    }
}

fn has_field(fields: &[Positioned<FieldDefinition>], name: &str) -> bool {
    fields.iter().any(|field| field.node.name.node.as_str() == name)
}

/// Lookup tables shared by every field resolver.
#[derive(Clone)]
struct Shared {
    kinds: Arc<TypeKinds>,
    inputs: Arc<InputObjects>,
}

fn register_type(
    builder: SchemaBuilder,
    ty: &TypeDefinition,
    resolvers: &ResolverMap,
    shared: &Shared,
) -> SchemaBuilder {
    let name = ty.name.node.as_str();
    let description = ty.description.as_ref().map(|d| d.node.clone());
    trace!(type_name = %name, "Registering type");

    match &ty.kind {
        TypeKind::Scalar => {
            if BUILTIN_SCALARS.contains(&name) {
                return builder;
            }
            let mut scalar = Scalar::new(name);
            if let Some(description) = description {
                scalar = scalar.description(description);
            }
            builder.register(scalar)
        }
        TypeKind::Object(object_type) => {
            let mut object = Object::new(name);
            if let Some(description) = description {
                object = object.description(description);
            }
            for interface in &object_type.implements {
                object = object.implement(interface.node.as_str());
            }
            for field in &object_type.fields {
                object = object.field(build_field(name, &field.node, resolvers, shared));
            }
            builder.register(object)
        }
        TypeKind::Interface(interface_type) => {
            let mut interface = Interface::new(name);
            if let Some(description) = description {
                interface = interface.description(description);
            }
            for parent in &interface_type.implements {
                interface = interface.implement(parent.node.as_str());
            }
            for field in &interface_type.fields {
                let field = &field.node;
                let mut interface_field =
                    InterfaceField::new(field.name.node.as_str(), type_ref(&field.ty.node));
                if let Some(description) = &field.description {
                    interface_field = interface_field.description(description.node.clone());
                }
                for argument in &field.arguments {
                    interface_field = interface_field.argument(build_input_value(&argument.node));
                }
                interface = interface.field(interface_field);
            }
            builder.register(interface)
        }
        TypeKind::Union(union_type) => {
            let mut union = Union::new(name);
            if let Some(description) = description {
                union = union.description(description);
            }
            for member in &union_type.members {
                union = union.possible_type(member.node.as_str());
            }
            builder.register(union)
        }
        TypeKind::Enum(enum_type) => {
            let mut enumeration = Enum::new(name);
            if let Some(description) = description {
                enumeration = enumeration.description(description);
            }
            for value in &enum_type.values {
                let value = &value.node;
                let mut item = EnumItem::new(value.value.node.as_str());
                if let Some(description) = &value.description {
                    item = item.description(description.node.clone());
                }
                if let Some(reason) = deprecation(&value.directives) {
                    item = item.deprecation(reason.as_deref());
                }
                enumeration = enumeration.item(item);
            }
            builder.register(enumeration)
        }
        TypeKind::InputObject(input_type) => {
            let mut input = InputObject::new(name);
            if let Some(description) = description {
                input = input.description(description);
            }
            for field in &input_type.fields {
                input = input.field(build_input_value(&field.node));
            }
            builder.register(input)
        }
    }
}

fn build_field(
    type_name: &str,
    definition: &FieldDefinition,
    resolvers: &ResolverMap,
    shared: &Shared,
) -> Field {
    let field_name = definition.name.node.as_str();
    let binding = Arc::new(FieldBinding {
        info: FieldInfo::new(type_name, field_name),
        resolver: resolvers.get(type_name, field_name).cloned(),
        shape: output_shape(&definition.ty.node),
        arguments: definition
            .arguments
            .iter()
            .map(|argument| {
                (
                    argument.node.name.node.to_string(),
                    output_shape(&argument.node.ty.node),
                )
            })
            .collect(),
        shared: shared.clone(),
    });

    let mut field = Field::new(field_name, type_ref(&definition.ty.node), move |ctx| {
        let binding = Arc::clone(&binding);
        FieldFuture::new(async move { binding.resolve(ctx).await })
    });
    if let Some(description) = &definition.description {
        field = field.description(description.node.clone());
    }
    if let Some(reason) = deprecation(&definition.directives) {
        field = field.deprecation(reason.as_deref());
    }
    for argument in &definition.arguments {
        field = field.argument(build_input_value(&argument.node));
    }
    field
}

fn build_input_value(definition: &InputValueDefinition) -> InputValue {
    let mut input = InputValue::new(definition.name.node.as_str(), type_ref(&definition.ty.node));
    if let Some(description) = &definition.description {
        input = input.description(description.node.clone());
    }
    if let Some(default) = &definition.default_value {
        input = input.default_value(default.node.clone());
    }
    input
}

/// `Some(reason)` when `@deprecated` is present.
fn deprecation(directives: &[Positioned<ConstDirective>]) -> Option<Option<String>> {
    let directive = directives
        .iter()
        .find(|d| d.node.name.node.as_str() == "deprecated")?;
    let reason = directive
        .node
        .arguments
        .iter()
        .find(|(name, _)| name.node.as_str() == "reason")
        .and_then(|(_, value)| match &value.node {
            Value::String(reason) => Some(reason.clone()),
            _ => None,
        });
    Some(reason)
}

fn type_ref(ty: &Type) -> TypeRef {
    let base = match &ty.base {
        BaseType::Named(name) => TypeRef::named(name.as_str()),
        BaseType::List(inner) => TypeRef::List(Box::new(type_ref(inner))),
    };
    if ty.nullable {
        base
    } else {
        TypeRef::NonNull(Box::new(base))
    }
}

fn output_shape(ty: &Type) -> OutputShape {
    match &ty.base {
        BaseType::Named(name) => OutputShape::Named(name.to_string()),
        BaseType::List(inner) => OutputShape::List(Box::new(output_shape(inner))),
    }
}

/// Everything a field resolver closure needs.
struct FieldBinding {
    info: FieldInfo,
    resolver: Option<Resolver>,
    shape: OutputShape,
    arguments: Vec<(String, OutputShape)>,
    shared: Shared,
}

impl FieldBinding {
    async fn resolve<'a>(
        &self,
        ctx: ResolverContext<'a>,
    ) -> Result<Option<FieldValue<'a>>, async_graphql::Error> {
        let parent = match ctx.parent_value.as_value() {
            Some(value) => value.clone().into_json()?,
            None => serde_json::Value::Null,
        };

        let value = match &self.resolver {
            Some(resolver) => {
                let mut args = Map::new();
                for (name, value) in ctx.args.as_index_map() {
                    let mut value = value.clone().into_json()?;
                    let declared = self.arguments.iter().find(|(arg, _)| arg == name.as_str());
                    if let Some((_, shape)) = declared {
                        apply_input_defaults(&mut value, shape, &self.shared.inputs);
                    }
                    args.insert(name.to_string(), value);
                }
                let context = ctx
                    .ctx
                    .data_opt::<Arc<ModuleContext>>()
                    .cloned()
                    .unwrap_or_else(|| Arc::new(ModuleContext::empty()));

                resolver
                    .call(ResolverParams {
                        parent,
                        args,
                        context,
                        info: self.info.clone(),
                    })
                    .await?
            }
            None => parent
                .get(&self.info.field_name)
                .cloned()
                .unwrap_or(serde_json::Value::Null),
        };

        to_field_value(value, &self.shape, &self.shared.kinds)
    }
}
