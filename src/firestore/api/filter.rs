use crate::firestore::api::query_modifiers::{
    CompositeFilter, CompositeOperator, FieldFilter, FilterDef, FilterOperator, IntoFilterOperator,
};
use crate::firestore::constants::{MAX_COMPOSITE_FILTERS, MAX_FILTER_IN_VALUES};
use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::{FieldPath, IntoFieldPath};
use crate::firestore::native::NativeSerializer;
use crate::firestore::value::{FirestoreValue, ValueKind};

/// A field condition or an `AND` / `OR` combination of filters, attached to a
/// query with [`Query::where_filter`](crate::firestore::api::Query::where_filter).
///
/// Field conditions are checked when the filter is attached, so building a
/// filter never fails on its own.
#[derive(Clone, Debug)]
pub struct Filter {
    node: FilterNode,
}

#[derive(Clone, Debug)]
enum FilterNode {
    Field {
        field_path: FirestoreResult<FieldPath>,
        operator: Option<FilterOperator>,
        value: FirestoreValue,
    },
    Composite {
        operator: CompositeOperator,
        queries: Vec<Filter>,
    },
}

impl Filter {
    pub fn field(
        field_path: impl IntoFieldPath,
        operator: impl IntoFilterOperator,
        value: impl Into<FirestoreValue>,
    ) -> Self {
        Self {
            node: FilterNode::Field {
                field_path: field_path.into_field_path(),
                operator: operator.into_filter_operator(),
                value: value.into(),
            },
        }
    }

    /// Matches documents satisfying every filter. Takes between 1 and 10 filters.
    pub fn and(queries: impl IntoIterator<Item = Filter>) -> FirestoreResult<Self> {
        let queries = collect_members(queries)?;
        Ok(Self {
            node: FilterNode::Composite {
                operator: CompositeOperator::And,
                queries,
            },
        })
    }

    /// Matches documents satisfying any filter. Takes between 1 and 10 filters,
    /// none of which may contain another `OR`.
    pub fn or(queries: impl IntoIterator<Item = Filter>) -> FirestoreResult<Self> {
        let queries = collect_members(queries)?;
        if queries.iter().any(Filter::contains_or) {
            return Err(invalid_argument(
                "OR Filters with nested OR Filters are not supported",
            ));
        }
        Ok(Self {
            node: FilterNode::Composite {
                operator: CompositeOperator::Or,
                queries,
            },
        })
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.node, FilterNode::Composite { .. })
    }

    fn contains_or(&self) -> bool {
        match &self.node {
            FilterNode::Field { .. } => false,
            FilterNode::Composite { operator, queries } => {
                *operator == CompositeOperator::Or || queries.iter().any(Filter::contains_or)
            }
        }
    }

    /// Field condition parts, for a single filter passed to `where`.
    pub(crate) fn as_field(
        &self,
    ) -> Option<(&FirestoreResult<FieldPath>, Option<FilterOperator>, &FirestoreValue)> {
        match &self.node {
            FilterNode::Field {
                field_path,
                operator,
                value,
            } => Some((field_path, *operator, value)),
            FilterNode::Composite { .. } => None,
        }
    }

    /// Validates every condition in the tree and encodes it for the engine.
    pub(crate) fn to_filter_def(&self, serializer: &NativeSerializer) -> FirestoreResult<FilterDef> {
        match &self.node {
            FilterNode::Composite { operator, queries } => {
                let queries = queries
                    .iter()
                    .map(|query| query.to_filter_def(serializer))
                    .collect::<FirestoreResult<Vec<_>>>()?;
                Ok(FilterDef::Composite(CompositeFilter {
                    operator: *operator,
                    queries,
                }))
            }
            FilterNode::Field {
                field_path,
                operator,
                value,
            } => {
                let field_path = field_path.clone().map_err(|err| {
                    invalid_argument(format!(
                        "first argument of Filter(*,_ , _) 'fieldPath' {}.",
                        err.message()
                    ))
                })?;
                let operator = operator.ok_or_else(|| {
                    invalid_argument(
                        "second argument of Filter(*,_ , _) 'opStr' is invalid. Expected one of '==', '>', '>=', '<', '<=', '!=', 'array-contains', 'not-in', 'array-contains-any' or 'in'.",
                    )
                })?;
                validate_condition_value(
                    "third argument of Filter(*,_ , _) 'value'",
                    operator,
                    value,
                    MAX_FILTER_IN_VALUES,
                )?;
                Ok(FilterDef::Field(FieldFilter {
                    field_path,
                    operator,
                    value: serializer.encode_value(value)?,
                }))
            }
        }
    }
}

fn collect_members(queries: impl IntoIterator<Item = Filter>) -> FirestoreResult<Vec<Filter>> {
    let queries: Vec<Filter> = queries.into_iter().collect();
    if queries.is_empty() || queries.len() > MAX_COMPOSITE_FILTERS {
        return Err(invalid_argument(format!(
            "Expected 1-{MAX_COMPOSITE_FILTERS} instances of Filter, but got {} Filters",
            queries.len()
        )));
    }
    Ok(queries)
}

/// Value checks shared by `where` and filter conditions. `subject` names the
/// argument in messages and `max_list_len` bounds list operators.
pub(crate) fn validate_condition_value(
    subject: &str,
    operator: FilterOperator,
    value: &FirestoreValue,
    max_list_len: usize,
) -> FirestoreResult<()> {
    if value.is_undefined() {
        return Err(invalid_argument(format!("{subject} argument expected.")));
    }

    if value.is_null() && !operator.accepts_null() {
        return Err(invalid_argument(format!(
            "{subject} is invalid. You can only perform equals comparisons on null"
        )));
    }

    if operator.takes_list() {
        let len = match value.kind() {
            ValueKind::Array(values) => values.len(),
            _ => 0,
        };
        if len == 0 {
            return Err(invalid_argument(format!(
                "{subject} is invalid. A non-empty array is required for '{operator}' filters."
            )));
        }
        if len > max_list_len {
            return Err(invalid_argument(format!(
                "{subject} is invalid. '{operator}' filters support a maximum of {max_list_len} elements in the value array."
            )));
        }
    }
    Ok(())
}
