//! Schema-driven path and component generation
//!
//! Turns every non-skipped schema node into component schemas (read shape,
//! create/update bodies, list wrapper) and CRUD, list and edge endpoints.

use crate::config::{Config, PageBounds};
use restforge_common::graph::{EdgeDef, FieldDef, SchemaNode};
use restforge_common::naming::{kebab_case, pascal_case, pluralize};
use restforge_common::spec::{self, schema_ref, Parameter, RefOr, RequestBody, Response};
use restforge_common::{
    catalog, FilterOp, GeneratorError, OpenApiSpec, Operation, Predicate, Result, SchemaGraph,
};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Path serving the document itself
pub const SPEC_ENDPOINT: &str = "/openapi.json";

/// Add paths and component schemas for every schema in `graph`
pub(crate) fn generate(config: &Config, graph: &SchemaGraph, spec: &mut OpenApiSpec) -> Result<()> {
    for node in graph.schemas.iter().filter(|node| !node.annotations.skip) {
        NodeGenerator::new(config, graph, node)?.generate(spec);
    }

    if !config.handler.is_none() && !config.disable_spec_handler {
        add_spec_endpoint(spec);
    }

    Ok(())
}

/// Register `GET /openapi.json`
pub(crate) fn add_spec_endpoint(spec: &mut OpenApiSpec) {
    spec.add_tag("Meta", Some("API metadata.".to_string()));

    let op = spec::Operation {
        operation_id: Some("getOpenAPISpec".to_string()),
        summary: Some("Get the OpenAPI specification of this API".to_string()),
        tags: vec!["Meta".to_string()],
        responses: responses([(
            200,
            Response::json("OpenAPI specification.", json!({ "type": "object" })),
        )]),
        ..Default::default()
    };
    spec.path_mut(SPEC_ENDPOINT).set_method("get", op);
}

struct NodeGenerator<'a> {
    config: &'a Config,
    graph: &'a SchemaGraph,
    node: &'a SchemaNode,
    name: String,
    /// Edges whose target is generated too
    edges: Vec<(&'a EdgeDef, &'a SchemaNode)>,
}

impl<'a> NodeGenerator<'a> {
    fn new(config: &'a Config, graph: &'a SchemaGraph, node: &'a SchemaNode) -> Result<Self> {
        let mut edges = Vec::new();
        for edge in &node.edges {
            let target = graph.node(&edge.target).ok_or_else(|| {
                GeneratorError::Generation(format!(
                    "edge {:?} on schema {:?} points at unknown schema {:?}",
                    edge.name, node.name, edge.target
                ))
            })?;
            if !target.annotations.skip {
                edges.push((edge, target));
            }
        }

        Ok(Self {
            config,
            graph,
            node,
            name: pascal_case(&node.name),
            edges,
        })
    }

    fn generate(&self, spec: &mut OpenApiSpec) {
        let ops = self.config.operations_for(self.node);

        spec.add_tag(&self.name, self.node.description.clone());

        let schemas = &mut spec.components.schemas;
        schemas.insert(self.name.clone(), self.read_schema());
        schemas.insert(
            format!("{}List", self.name),
            list_schema(&self.name, self.bounds().is_some()),
        );
        if ops.contains(&Operation::Create) {
            schemas.insert(format!("{}Create", self.name), self.create_schema());
        }
        if ops.contains(&Operation::Update) {
            schemas.insert(format!("{}Update", self.name), self.update_schema());
        }

        let collection = self.collection_path();
        let item = format!("{}/{{id}}", collection);
        for op in &ops {
            let (path, method, operation) = match op {
                Operation::Create => (&collection, "post", self.create_op()),
                Operation::Read => (&item, "get", self.read_op()),
                Operation::Update => (&item, "patch", self.update_op()),
                Operation::Delete => (&item, "delete", self.delete_op()),
                Operation::List => (&collection, "get", self.list_op()),
            };
            spec.path_mut(path).set_method(method, operation);
        }

        if ops.contains(&Operation::Read) {
            for (edge, target) in &self.edges {
                self.edge_endpoint(spec, &item, edge, target);
            }
        }

        debug!(schema = %self.node.name, operations = ops.len(), "generated schema");
    }

    fn bounds(&self) -> Option<PageBounds> {
        self.config.page_bounds(&self.node.annotations)
    }

    fn collection_path(&self) -> String {
        format!("/{}", kebab_case(&pluralize(&self.node.name)))
    }

    fn eager_edges(&self) -> impl Iterator<Item = &(&'a EdgeDef, &'a SchemaNode)> + '_ {
        self.edges
            .iter()
            .filter(|(edge, _)| self.config.eager_load(edge))
    }

    fn read_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = vec!["id".to_string()];
        properties.insert("id".to_string(), self.node.id_field().json_schema());

        for field in self.node.data_fields().filter(|f| !f.sensitive) {
            properties.insert(field.name.clone(), field.json_schema());
            if !self.config.disable_patch_json_tag || !field.optional {
                required.push(field.name.clone());
            }
        }

        let mut edges = Map::new();
        for (edge, target) in self.eager_edges() {
            let target_ref = ref_schema(&pascal_case(&target.name));
            let schema = if edge.unique {
                target_ref
            } else {
                json!({ "type": "array", "items": target_ref })
            };
            edges.insert(edge.name.clone(), schema);
        }
        if !edges.is_empty() {
            properties.insert(
                "edges".to_string(),
                json!({ "type": "object", "properties": edges }),
            );
            required.push("edges".to_string());
        }

        object_schema(properties, required, self.node.description.as_deref())
    }

    fn create_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        if self.config.allow_client_uuids {
            properties.insert("id".to_string(), self.node.id_field().value_schema());
        }

        for field in self.node.data_fields() {
            properties.insert(field.name.clone(), field.json_schema());
            if !field.optional {
                required.push(field.name.clone());
            }
        }

        for (edge, target) in &self.edges {
            properties.insert(edge.name.clone(), edge_id_schema(edge, target));
            if edge.required {
                required.push(edge.name.clone());
            }
        }

        self.strict(object_schema(properties, required, None))
    }

    fn update_schema(&self) -> Value {
        let mut properties = Map::new();

        for field in self.node.data_fields().filter(|f| !f.immutable) {
            properties.insert(field.name.clone(), field.json_schema());
        }

        for (edge, target) in &self.edges {
            if edge.unique {
                properties.insert(edge.name.clone(), edge_id_schema(edge, target));
            } else {
                let ids = edge_id_schema(edge, target);
                properties.insert(format!("add_{}", edge.name), ids.clone());
                properties.insert(format!("remove_{}", edge.name), ids);
            }
        }

        self.strict(object_schema(properties, Vec::new(), None))
    }

    fn strict(&self, mut schema: Value) -> Value {
        if self.config.strict_mutate {
            schema["additionalProperties"] = Value::Bool(false);
        }
        schema
    }

    fn id_param(&self) -> RefOr<Parameter> {
        RefOr::Item(Parameter::path(
            "id",
            &format!("The ID of the {} entity.", self.name),
            self.node.id_field().value_schema(),
        ))
    }

    fn read_tags(&self) -> Vec<String> {
        let mut tags = vec![self.name.clone()];
        if self.config.add_edges_to_tags {
            for (_, target) in self.eager_edges() {
                let tag = pascal_case(&target.name);
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
        }
        tags
    }

    fn create_op(&self) -> spec::Operation {
        spec::Operation {
            operation_id: Some(format!("create{}", self.name)),
            summary: Some(format!("Create a new {} entity", self.name)),
            tags: vec![self.name.clone()],
            request_body: Some(RequestBody::json(ref_schema(&format!(
                "{}Create",
                self.name
            )))),
            responses: responses([(
                201,
                Response::json(
                    &format!("The created {} entity.", self.name),
                    ref_schema(&self.name),
                ),
            )]),
            ..Default::default()
        }
    }

    fn read_op(&self) -> spec::Operation {
        spec::Operation {
            operation_id: Some(format!("read{}", self.name)),
            summary: Some(format!("Find a {} entity by ID", self.name)),
            tags: self.read_tags(),
            parameters: vec![self.id_param()],
            responses: responses([(
                200,
                Response::json(
                    &format!("The requested {} entity.", self.name),
                    ref_schema(&self.name),
                ),
            )]),
            ..Default::default()
        }
    }

    fn update_op(&self) -> spec::Operation {
        spec::Operation {
            operation_id: Some(format!("update{}", self.name)),
            summary: Some(format!("Update an existing {} entity", self.name)),
            tags: vec![self.name.clone()],
            parameters: vec![self.id_param()],
            request_body: Some(RequestBody::json(ref_schema(&format!(
                "{}Update",
                self.name
            )))),
            responses: responses([(
                200,
                Response::json(
                    &format!("The updated {} entity.", self.name),
                    ref_schema(&self.name),
                ),
            )]),
            ..Default::default()
        }
    }

    fn delete_op(&self) -> spec::Operation {
        spec::Operation {
            operation_id: Some(format!("delete{}", self.name)),
            summary: Some(format!("Delete a single {} entity", self.name)),
            tags: vec![self.name.clone()],
            parameters: vec![self.id_param()],
            responses: responses([(
                204,
                Response::new(&format!("The {} entity was deleted.", self.name)),
            )]),
            ..Default::default()
        }
    }

    fn list_op(&self) -> spec::Operation {
        spec::Operation {
            operation_id: Some(format!("list{}", pascal_case(&pluralize(&self.node.name)))),
            summary: Some(format!("Query all {} entities", self.name)),
            tags: self.read_tags(),
            parameters: list_parameters(self.graph, self.node, self.bounds()),
            responses: responses([(
                200,
                Response::json(
                    &format!("The matching {} entities.", self.name),
                    ref_schema(&format!("{}List", self.name)),
                ),
            )]),
            ..Default::default()
        }
    }

    fn edge_endpoint(
        &self,
        spec: &mut OpenApiSpec,
        item_path: &str,
        edge: &EdgeDef,
        target: &SchemaNode,
    ) {
        let eager = self.config.eager_load(edge);
        let disabled = edge
            .disable_endpoint
            .unwrap_or(eager && self.config.disable_eager_loaded_endpoints);
        if disabled {
            debug!(schema = %self.node.name, edge = %edge.name, "skipping edge endpoint");
            return;
        }

        let target_name = pascal_case(&target.name);
        let edge_name = pascal_case(&edge.name);
        let mut tags = vec![self.name.clone()];
        if target_name != self.name {
            tags.push(target_name.clone());
        }

        let mut op = spec::Operation {
            tags,
            parameters: vec![self.id_param()],
            ..Default::default()
        };

        if edge.unique {
            op.operation_id = Some(format!("read{}{}", self.name, edge_name));
            op.summary = Some(format!(
                "Find the attached {} of a {} by ID",
                target_name, self.name
            ));
            op.responses = responses([(
                200,
                Response::json(
                    &format!("The {} attached to the {}.", target_name, self.name),
                    ref_schema(&target_name),
                ),
            )]);
        } else {
            // Eager-loaded edges are served unpaged unless the optimization
            // is disabled.
            let bounds = self
                .config
                .page_bounds(&target.annotations)
                .filter(|_| !eager || self.config.disable_eager_load_non_paged_opt);

            let schema = if bounds.is_some() {
                ref_schema(&format!("{}List", target_name))
            } else {
                json!({ "type": "array", "items": ref_schema(&target_name) })
            };

            op.operation_id = Some(format!("list{}{}", self.name, edge_name));
            op.summary = Some(format!(
                "Find the attached {} entities of a {} by ID",
                target_name, self.name
            ));
            op.parameters
                .extend(list_parameters(self.graph, target, bounds));
            op.responses = responses([(
                200,
                Response::json(
                    &format!("The {} entities attached to the {}.", target_name, self.name),
                    schema,
                ),
            )]);
        }

        let path = format!("{}/{}", item_path, kebab_case(&edge.name));
        spec.path_mut(&path).set_method("get", op);
    }
}

/// Pagination, sorting and filter parameters of a list endpoint over `node`
fn list_parameters(
    graph: &SchemaGraph,
    node: &SchemaNode,
    bounds: Option<PageBounds>,
) -> Vec<RefOr<Parameter>> {
    let mut params = Vec::new();

    if let Some(bounds) = bounds {
        params.push(Parameter::query(
            "page",
            "Returned page (paginated response).",
            json!({ "type": "integer", "minimum": 1, "default": 1 }),
        ));
        params.push(Parameter::query(
            "per_page",
            "Number of entities per page.",
            json!({
                "type": "integer",
                "minimum": bounds.min,
                "maximum": bounds.max,
                "default": bounds.default,
            }),
        ));
    }

    let sortable = node.sortable_fields();
    if let Some(default) = sortable.first() {
        params.push(Parameter::query(
            "sort",
            "Sort entity results by the given field.",
            json!({ "type": "string", "enum": sortable, "default": default }),
        ));
        params.push(Parameter::query(
            "order",
            "Sort order of the results.",
            json!({ "type": "string", "enum": ["asc", "desc"], "default": "asc" }),
        ));
    }

    for field in node.fields.iter().filter(|f| !f.sensitive) {
        params.extend(field_filters(None, field));
    }

    for edge in &node.edges {
        let Some(target) = graph.node(&edge.target).filter(|t| !t.annotations.skip) else {
            continue;
        };

        if edge.filter.has(Predicate::IS_NIL) {
            params.push(Parameter::query(
                &format!("has.{}", edge.name),
                &format!("If true, only return entities that have a {:?} edge.", edge.name),
                json!({ "type": "boolean" }),
            ));
        }

        if edge.filter.has(Predicate::EDGE) {
            for field in target.fields.iter().filter(|f| !f.sensitive) {
                params.extend(field_filters(Some(&edge.name), field));
            }
        }
    }

    params.into_iter().map(RefOr::Item).collect()
}

/// One query parameter per operation in the field's predicate
fn field_filters(edge: Option<&str>, field: &FieldDef) -> Vec<Parameter> {
    let label = match edge {
        Some(edge) => FieldDef {
            name: format!("{}.{}", edge, field.name),
            ..field.clone()
        },
        None => field.clone(),
    };

    field
        .filter
        .explode()
        .into_iter()
        .map(|op| {
            let mut param = Parameter::query(
                &catalog::param_name(edge, &field.name, op),
                &catalog::describe(&label, op),
                catalog::value_schema(field, op),
            );
            if matches!(op, FilterOp::In | FilterOp::NotIn) {
                param.explode = Some(true);
            }
            param
        })
        .collect()
}

fn list_schema(name: &str, paginated: bool) -> Value {
    let items = json!({ "type": "array", "items": ref_schema(name) });
    if !paginated {
        return items;
    }

    json!({
        "type": "object",
        "required": ["page", "total_count", "last_page", "content"],
        "properties": {
            "page": { "type": "integer", "description": "Page number (1-indexed)." },
            "total_count": {
                "type": "integer",
                "description": "Total number of matching entities.",
            },
            "last_page": { "type": "integer", "description": "Last page number." },
            "is_last_page": { "type": "boolean", "description": "Whether this is the last page." },
            "content": items,
        }
    })
}

/// Schema of the ID (or IDs) referencing an edge's target
fn edge_id_schema(edge: &EdgeDef, target: &SchemaNode) -> Value {
    let id = target.id_field().value_schema();
    if edge.unique {
        id
    } else {
        json!({ "type": "array", "items": id })
    }
}

fn object_schema(
    properties: Map<String, Value>,
    required: Vec<String>,
    description: Option<&str>,
) -> Value {
    let mut schema = json!({ "type": "object", "properties": properties });
    if !required.is_empty() {
        schema["required"] = json!(required);
    }
    if let Some(description) = description {
        schema["description"] = Value::String(description.to_string());
    }
    schema
}

fn ref_schema(name: &str) -> Value {
    json!({ "$ref": schema_ref(name) })
}

fn responses<const N: usize>(items: [(u16, Response); N]) -> BTreeMap<String, RefOr<Response>> {
    items
        .into_iter()
        .map(|(status, response)| (status.to_string(), RefOr::Item(response)))
        .collect()
}
