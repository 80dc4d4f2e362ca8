//! Global request headers, response headers and error responses
//!
//! Applied to every operation after the post-generate hook, so hooks see the
//! document before policy is stamped and operations added by hooks still
//! receive it.

use crate::config::{error_body_schema, Config};
use restforge_common::spec::{
    response_ref, schema_ref, Header, Parameter, ParameterLocation, RefOr, Response,
};
use restforge_common::OpenApiSpec;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::debug;

/// Component schema shared by error responses without their own schema
pub const ERROR_BODY_SCHEMA: &str = "ErrorBody";

/// Component response name for an error status
pub fn error_response_name(status: u16) -> String {
    format!("{}Error", status)
}

pub(crate) fn apply(config: &Config, spec: &mut OpenApiSpec) {
    let headers = response_headers(config);
    register_error_responses(config, spec, &headers);

    let mut stamped = 0usize;
    for (path, method, op) in spec.operations_mut() {
        for (name, header) in &config.global_request_headers {
            if op.has_parameter(name, ParameterLocation::Header) {
                continue;
            }
            op.parameters.push(RefOr::Item(Parameter {
                name: name.clone(),
                location: ParameterLocation::Header,
                description: header.description.clone(),
                required: header.required,
                schema: header.schema.clone(),
                explode: None,
            }));
        }

        for response in op.responses.values_mut().filter_map(RefOr::as_item_mut) {
            add_headers(response, &headers);
        }

        for status in config.global_error_responses.keys() {
            if !applies_to(*status, path, method) {
                continue;
            }
            op.responses
                .entry(status.to_string())
                .or_insert_with(|| RefOr::reference(response_ref(&error_response_name(*status))));
        }

        stamped += 1;
    }

    debug!(operations = stamped, "applied global policies");
}

/// 409 is limited to writes; 404 is omitted on collection reads.
fn applies_to(status: u16, path: &str, method: &str) -> bool {
    match status {
        409 => matches!(method, "post" | "put" | "patch"),
        404 => !(method == "get" && !path.contains('{')),
        _ => true,
    }
}

fn response_headers(config: &Config) -> BTreeMap<String, Header> {
    config
        .global_response_headers
        .iter()
        .map(|(name, header)| {
            (
                name.clone(),
                Header {
                    description: header.description.clone(),
                    required: header.required,
                    schema: header.schema.clone(),
                },
            )
        })
        .collect()
}

fn add_headers(response: &mut Response, headers: &BTreeMap<String, Header>) {
    for (name, header) in headers {
        response
            .headers
            .entry(name.clone())
            .or_insert_with(|| header.clone());
    }
}

fn register_error_responses(
    config: &Config,
    spec: &mut OpenApiSpec,
    headers: &BTreeMap<String, Header>,
) {
    let components = &mut spec.components;

    for (status, error) in &config.global_error_responses {
        let schema = match &error.schema {
            Some(schema) => schema.clone(),
            None => {
                components
                    .schemas
                    .entry(ERROR_BODY_SCHEMA.to_string())
                    .or_insert_with(error_body_schema);
                json!({ "$ref": schema_ref(ERROR_BODY_SCHEMA) })
            }
        };

        let response = components
            .responses
            .entry(error_response_name(*status))
            .or_insert_with(|| Response::json(&error.description, schema));
        add_headers(response, headers);
    }
}
