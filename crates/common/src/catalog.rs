//! Filter operation catalog
//!
//! Static metadata for every [`FilterOp`]: its canonical identifier, the
//! token used in query-parameter names and the wording of its description.

use crate::graph::FieldDef;
use crate::predicate::FilterOp;
use serde_json::{json, Value};

enum Wording {
    /// Same sentence for every field kind
    Fixed(&'static str),
    /// Ordering operators read differently on textual fields
    Ordered {
        textual: &'static str,
        other: &'static str,
    },
}

struct CatalogEntry {
    op: FilterOp,
    name: &'static str,
    token: &'static str,
    wording: Wording,
}

/// Indexed by `FilterOp as usize`.
static CATALOG: [CatalogEntry; 15] = [
    CatalogEntry {
        op: FilterOp::Eq,
        name: "EQ",
        token: "eq",
        wording: Wording::Fixed("to be equal to the provided value."),
    },
    CatalogEntry {
        op: FilterOp::Neq,
        name: "NEQ",
        token: "neq",
        wording: Wording::Fixed("to be not equal to the provided value."),
    },
    CatalogEntry {
        op: FilterOp::Gt,
        name: "GT",
        token: "gt",
        wording: Wording::Ordered {
            textual: "to be longer than the provided value.",
            other: "to be greater than the provided value.",
        },
    },
    CatalogEntry {
        op: FilterOp::Gte,
        name: "GTE",
        token: "gte",
        wording: Wording::Ordered {
            textual: "to be longer than or equal in length to the provided value.",
            other: "to be greater than or equal to the provided value.",
        },
    },
    CatalogEntry {
        op: FilterOp::Lt,
        name: "LT",
        token: "lt",
        wording: Wording::Ordered {
            textual: "to be shorter than the provided value.",
            other: "to be less than the provided value.",
        },
    },
    CatalogEntry {
        op: FilterOp::Lte,
        name: "LTE",
        token: "lte",
        wording: Wording::Ordered {
            textual: "to be shorter than or equal in length to the provided value.",
            other: "to be less than or equal to the provided value.",
        },
    },
    CatalogEntry {
        op: FilterOp::IsNil,
        name: "IsNil",
        token: "null",
        wording: Wording::Fixed("to be null/nil."),
    },
    CatalogEntry {
        op: FilterOp::NotNil,
        name: "NotNil",
        token: "notNil",
        wording: Wording::Fixed("to be not null/nil."),
    },
    CatalogEntry {
        op: FilterOp::In,
        name: "In",
        token: "in",
        wording: Wording::Fixed("to be within the provided values."),
    },
    CatalogEntry {
        op: FilterOp::NotIn,
        name: "NotIn",
        token: "notIn",
        wording: Wording::Fixed("to be not within the provided values."),
    },
    CatalogEntry {
        op: FilterOp::EqualFold,
        name: "EqualFold",
        token: "eqFold",
        wording: Wording::Fixed("to be equal to the provided value, case-insensitive."),
    },
    CatalogEntry {
        op: FilterOp::Contains,
        name: "Contains",
        token: "contains",
        wording: Wording::Fixed("to contain the provided value."),
    },
    CatalogEntry {
        op: FilterOp::ContainsFold,
        name: "ContainsFold",
        token: "containsFold",
        wording: Wording::Fixed("to contain the provided value, case-insensitive."),
    },
    CatalogEntry {
        op: FilterOp::HasPrefix,
        name: "HasPrefix",
        token: "prefix",
        wording: Wording::Fixed("to start with the provided value."),
    },
    CatalogEntry {
        op: FilterOp::HasSuffix,
        name: "HasSuffix",
        token: "suffix",
        wording: Wording::Fixed("to end with the provided value."),
    },
];

fn entry(op: FilterOp) -> &'static CatalogEntry {
    let entry = &CATALOG[op as usize];
    debug_assert_eq!(entry.op, op);
    entry
}

impl FilterOp {
    /// Canonical operation identifier (e.g. `"EQ"`, `"HasPrefix"`)
    pub fn name(self) -> &'static str {
        entry(self).name
    }

    /// Query-parameter token (e.g. `"eq"`, `"prefix"`)
    pub fn param_token(self) -> &'static str {
        entry(self).token
    }
}

impl std::fmt::Display for FilterOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Query-parameter token for a filter operation.
///
/// Defined for atomic operations only; a grouped [`crate::Predicate`] must be
/// exploded first.
pub fn param_token(op: FilterOp) -> &'static str {
    op.param_token()
}

/// One-sentence description of filtering `field` with `op`.
pub fn describe(field: &FieldDef, op: FilterOp) -> String {
    let tail = match entry(op).wording {
        Wording::Fixed(text) => text,
        Wording::Ordered { textual, other } => {
            if field.is_textual() {
                textual
            } else {
                other
            }
        }
    };
    format!("Filters field {:?} {}", field.name, tail)
}

/// Query-parameter name: `<field>.<token>`, or `<edge>.<field>.<token>` when
/// the filter is reached through an edge.
pub fn param_name(edge: Option<&str>, field: &str, op: FilterOp) -> String {
    match edge {
        Some(edge) => format!("{}.{}.{}", edge, field, op.param_token()),
        None => format!("{}.{}", field, op.param_token()),
    }
}

/// JSON schema of the value accepted by a filter query parameter.
pub fn value_schema(field: &FieldDef, op: FilterOp) -> Value {
    match op {
        FilterOp::IsNil | FilterOp::NotNil => json!({ "type": "boolean" }),
        FilterOp::In | FilterOp::NotIn => json!({
            "type": "array",
            "items": field.value_schema(),
        }),
        _ => field.value_schema(),
    }
}
