use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use crate::firestore::error::{invalid_argument, FirestoreError, FirestoreResult};
use crate::firestore::model::FieldPath;
use crate::firestore::native::{QueryRequest, WireValue};

/// Whether a query targets a single collection or every collection sharing an id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryType {
    #[default]
    Collection,
    CollectionGroup,
}

/// Field filter comparison, serialized with its engine name (`EQUAL`, `NOT_IN`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    ArrayContains,
    ArrayContainsAny,
    In,
    NotIn,
}

impl FilterOperator {
    /// Maps the query-language symbol (`"=="`, `"array-contains"`, ...) to an operator.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let operator = match symbol {
            "==" => FilterOperator::Equal,
            "!=" => FilterOperator::NotEqual,
            "<" => FilterOperator::LessThan,
            "<=" => FilterOperator::LessThanOrEqual,
            ">" => FilterOperator::GreaterThan,
            ">=" => FilterOperator::GreaterThanOrEqual,
            "array-contains" => FilterOperator::ArrayContains,
            "array-contains-any" => FilterOperator::ArrayContainsAny,
            "in" => FilterOperator::In,
            "not-in" => FilterOperator::NotIn,
            _ => return None,
        };
        Some(operator)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            FilterOperator::Equal => "==",
            FilterOperator::NotEqual => "!=",
            FilterOperator::LessThan => "<",
            FilterOperator::LessThanOrEqual => "<=",
            FilterOperator::GreaterThan => ">",
            FilterOperator::GreaterThanOrEqual => ">=",
            FilterOperator::ArrayContains => "array-contains",
            FilterOperator::ArrayContainsAny => "array-contains-any",
            FilterOperator::In => "in",
            FilterOperator::NotIn => "not-in",
        }
    }

    /// `<`, `<=`, `>`, `>=` and `!=`.
    pub fn is_inequality(self) -> bool {
        matches!(
            self,
            FilterOperator::LessThan
                | FilterOperator::LessThanOrEqual
                | FilterOperator::GreaterThan
                | FilterOperator::GreaterThanOrEqual
                | FilterOperator::NotEqual
        )
    }

    /// Operators whose value is a list: `in`, `array-contains-any` and `not-in`.
    pub fn takes_list(self) -> bool {
        matches!(
            self,
            FilterOperator::In | FilterOperator::ArrayContainsAny | FilterOperator::NotIn
        )
    }

    /// Only `==` and `!=` may compare against null.
    pub fn accepts_null(self) -> bool {
        matches!(self, FilterOperator::Equal | FilterOperator::NotEqual)
    }
}

impl Display for FilterOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Accepts either a [`FilterOperator`] or its query-language symbol.
pub trait IntoFilterOperator {
    fn into_filter_operator(self) -> Option<FilterOperator>;
}

impl IntoFilterOperator for FilterOperator {
    fn into_filter_operator(self) -> Option<FilterOperator> {
        Some(self)
    }
}

impl IntoFilterOperator for &str {
    fn into_filter_operator(self) -> Option<FilterOperator> {
        FilterOperator::from_symbol(self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompositeOperator {
    And,
    Or,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderDirection {
    #[default]
    Ascending,
    Descending,
}

impl FromStr for OrderDirection {
    type Err = FirestoreError;

    /// Parses `asc` or `desc`, ignoring case.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Ok(OrderDirection::Ascending),
            "desc" => Ok(OrderDirection::Descending),
            _ => Err(invalid_argument(
                "firebase.firestore().collection().orderBy(_, *) 'directionStr' must be one of 'asc' or 'desc'.",
            )),
        }
    }
}

/// Accepts either an [`OrderDirection`] or `"asc"` / `"desc"`.
pub trait IntoOrderDirection {
    fn into_order_direction(self) -> FirestoreResult<OrderDirection>;
}

impl IntoOrderDirection for OrderDirection {
    fn into_order_direction(self) -> FirestoreResult<OrderDirection> {
        Ok(self)
    }
}

impl IntoOrderDirection for &str {
    fn into_order_direction(self) -> FirestoreResult<OrderDirection> {
        self.parse()
    }
}

/// Encoded leaf filter.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFilter {
    pub field_path: FieldPath,
    pub operator: FilterOperator,
    pub value: WireValue,
}

/// Encoded `AND` / `OR` filter node.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompositeFilter {
    pub operator: CompositeOperator,
    pub queries: Vec<FilterDef>,
}

/// One entry of the filter tree sent to the engine.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterDef {
    Field(FieldFilter),
    Composite(CompositeFilter),
}

impl FilterDef {
    /// Calls `visit` for every leaf in the tree, depth first.
    pub fn for_each_field<'a>(&'a self, visit: &mut dyn FnMut(&'a FieldFilter)) {
        match self {
            FilterDef::Field(field) => visit(field),
            FilterDef::Composite(composite) => {
                for query in &composite.queries {
                    query.for_each_field(visit);
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDef {
    pub field_path: FieldPath,
    pub direction: OrderDirection,
}

/// Cursor slots of a query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CursorPosition {
    StartAt,
    StartAfter,
    EndAt,
    EndBefore,
}

impl CursorPosition {
    pub fn method_name(self) -> &'static str {
        match self {
            CursorPosition::StartAt => "startAt",
            CursorPosition::StartAfter => "startAfter",
            CursorPosition::EndAt => "endAt",
            CursorPosition::EndBefore => "endBefore",
        }
    }
}

/// Limit and cursor options; only the keys that are set are serialized.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_to_last: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<Vec<WireValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_after: Option<Vec<WireValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_at: Option<Vec<WireValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_before: Option<Vec<WireValue>>,
}

impl QueryOptions {
    fn cursor_slot(&mut self, position: CursorPosition) -> &mut Option<Vec<WireValue>> {
        match position {
            CursorPosition::StartAt => &mut self.start_at,
            CursorPosition::StartAfter => &mut self.start_after,
            CursorPosition::EndAt => &mut self.end_at,
            CursorPosition::EndBefore => &mut self.end_before,
        }
    }

    pub fn cursor(&self, position: CursorPosition) -> Option<&[WireValue]> {
        match position {
            CursorPosition::StartAt => self.start_at.as_deref(),
            CursorPosition::StartAfter => self.start_after.as_deref(),
            CursorPosition::EndAt => self.end_at.as_deref(),
            CursorPosition::EndBefore => self.end_before.as_deref(),
        }
    }
}

/// Filters, orderings, limits and cursors accumulated by a query.
///
/// Values are immutable: every `with_*` method returns a new value and leaves
/// `self` untouched. Filter and order lists are shared between derived values
/// and only copied when one of them appends.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryModifiers {
    query_type: QueryType,
    filters: Arc<Vec<FilterDef>>,
    orders: Arc<Vec<OrderDef>>,
    options: QueryOptions,
}

impl QueryModifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query_type(&self) -> QueryType {
        self.query_type
    }

    pub fn is_collection_group(&self) -> bool {
        self.query_type == QueryType::CollectionGroup
    }

    pub fn filters(&self) -> &[FilterDef] {
        &self.filters
    }

    pub fn orders(&self) -> &[OrderDef] {
        &self.orders
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    pub fn limit(&self) -> Option<u32> {
        self.options.limit
    }

    pub fn limit_to_last(&self) -> Option<u32> {
        self.options.limit_to_last
    }

    pub fn has_start(&self) -> bool {
        self.options.start_at.is_some() || self.options.start_after.is_some()
    }

    pub fn has_end(&self) -> bool {
        self.options.end_at.is_some() || self.options.end_before.is_some()
    }

    pub fn as_collection_group(&self) -> Self {
        let mut next = self.clone();
        next.query_type = QueryType::CollectionGroup;
        next
    }

    pub fn with_filter(&self, filter: FilterDef) -> Self {
        let mut next = self.clone();
        Arc::make_mut(&mut next.filters).push(filter);
        next
    }

    pub fn with_order(&self, order: OrderDef) -> Self {
        let mut next = self.clone();
        Arc::make_mut(&mut next.orders).push(order);
        next
    }

    /// Sets `limit` and clears `limit_to_last`.
    pub fn with_limit(&self, limit: u32) -> Self {
        let mut next = self.clone();
        next.options.limit_to_last = None;
        next.options.limit = Some(limit);
        next
    }

    /// Sets `limit_to_last` and clears `limit`.
    pub fn with_limit_to_last(&self, limit: u32) -> Self {
        let mut next = self.clone();
        next.options.limit = None;
        next.options.limit_to_last = Some(limit);
        next
    }

    pub fn with_cursor(&self, position: CursorPosition, values: Vec<WireValue>) -> Self {
        let mut next = self.clone();
        *next.options.cursor_slot(position) = Some(values);
        next
    }

    /// Snapshot of the modifiers in the shape the engine receives.
    pub fn to_request(&self, path: impl Into<String>) -> QueryRequest {
        QueryRequest {
            path: path.into(),
            query_type: self.query_type,
            filters: self.filters.to_vec(),
            orders: self.orders.to_vec(),
            options: self.options.clone(),
        }
    }

    /// Checks the cross-filter rules over the whole filter tree.
    pub fn validate_where(&self) -> FirestoreResult<()> {
        if self.filters.is_empty() {
            return Ok(());
        }
        let mut leaves = Vec::new();
        for filter in self.filters.iter() {
            filter.for_each_field(&mut |field| leaves.push(field));
        }
        FilterCheck::default().check(&leaves)
    }

    /// Checks the orderings against each other and against the filters.
    pub fn validate_order_by(&self) -> FirestoreResult<()> {
        if self.orders.len() > 1 {
            let unique: HashSet<&FieldPath> =
                self.orders.iter().map(|order| &order.field_path).collect();
            if unique.len() != self.orders.len() {
                return Err(invalid_argument(
                    "Invalid query. Order by clause cannot contain duplicate fields.",
                ));
            }
        }

        let mut leaves = Vec::new();
        for filter in self.filters.iter() {
            filter.for_each_field(&mut |field| leaves.push(field));
        }
        for leaf in leaves {
            self.check_orders_against(leaf)?;
        }
        Ok(())
    }

    fn check_orders_against(&self, filter: &FieldFilter) -> FirestoreResult<()> {
        let filter_path = &filter.field_path;
        for order in self.orders.iter() {
            let order_path = &order.field_path;
            if filter.operator == FilterOperator::Equal && filter_path == order_path {
                return Err(invalid_argument(format!(
                    "Invalid query. Query.orderBy() parameter: {order_path} cannot be the same as your Query.where() fieldPath parameter: {filter_path}"
                )));
            }

            if filter_path.is_document_id() && !order_path.is_document_id() {
                return Err(invalid_argument(
                    "Invalid query. Query.where() fieldPath parameter: 'FirestoreFieldPath' cannot be used in conjunction with a different Query.orderBy() parameter",
                ));
            }

            if filter.operator.is_inequality() {
                let first = &self.orders[0].field_path;
                if filter_path != first {
                    return Err(invalid_argument(format!(
                        "Invalid query. Initial Query.orderBy() parameter: {order_path} has to be the same as the Query.where() fieldPath parameter(s): {filter_path} when an inequality operator is invoked "
                    )));
                }
            }
        }
        Ok(())
    }

    /// `limit_to_last` needs at least one ordering; checked when the query runs.
    pub fn validate_limit_to_last(&self) -> FirestoreResult<()> {
        if self.options.limit_to_last.is_some() && self.orders.is_empty() {
            return Err(invalid_argument(
                "firebase.firestore().collection().limitToLast() queries require specifying at least one firebase.firestore().collection().orderBy() clause",
            ));
        }
        Ok(())
    }
}

/// Flags collected over every leaf of a filter tree.
#[derive(Default)]
struct FilterCheck<'a> {
    inequality: Option<&'a FieldPath>,
    has_not_equal: bool,
    has_array_contains: bool,
    has_array_contains_any: bool,
    has_in: bool,
    has_not_in: bool,
}

impl<'a> FilterCheck<'a> {
    fn check(&mut self, leaves: &[&'a FieldFilter]) -> FirestoreResult<()> {
        for field in leaves.iter().copied() {
            if !field.operator.is_inequality() {
                continue;
            }

            if field.operator == FilterOperator::NotEqual {
                if self.has_not_equal {
                    return Err(invalid_argument(
                        "Invalid query. You cannot use more than one '!=' inequality filter.",
                    ));
                }
                self.has_not_equal = true;
            }

            match self.inequality {
                None => self.inequality = Some(&field.field_path),
                Some(existing) if existing != &field.field_path => {
                    return Err(invalid_argument(format!(
                        "Invalid query. All where filters with an inequality (<, <=, >, != or >=) must be on the same field. But you have inequality filters on '{existing}' and '{}'",
                        field.field_path
                    )));
                }
                Some(_) => {}
            }
        }

        for field in leaves {
            match field.operator {
                FilterOperator::ArrayContains => {
                    if self.has_array_contains {
                        return Err(invalid_argument(
                            "Invalid query. Queries only support a single array-contains filter.",
                        ));
                    }
                    self.has_array_contains = true;
                }
                FilterOperator::ArrayContainsAny => {
                    if self.has_array_contains_any {
                        return Err(invalid_argument(
                            "Invalid query. You cannot use more than one 'array-contains-any' filter.",
                        ));
                    }
                    if self.has_not_in {
                        return Err(invalid_argument(
                            "Invalid query. You cannot use 'array-contains-any' filters with 'not-in' filters.",
                        ));
                    }
                    self.has_array_contains_any = true;
                }
                FilterOperator::In => {
                    if self.has_not_in {
                        return Err(invalid_argument(
                            "Invalid query. You cannot use 'in' filters with 'not-in' filters.",
                        ));
                    }
                    self.has_in = true;
                }
                FilterOperator::NotIn => {
                    if self.has_not_in {
                        return Err(invalid_argument(
                            "Invalid query. You cannot use more than one 'not-in' filter.",
                        ));
                    }
                    if self.has_not_equal {
                        return Err(invalid_argument(
                            "Invalid query. You cannot use 'not-in' filters with '!=' inequality filters",
                        ));
                    }
                    if self.has_in {
                        return Err(invalid_argument(
                            "Invalid query. You cannot use 'not-in' filters with 'in' filters.",
                        ));
                    }
                    if self.has_array_contains_any {
                        return Err(invalid_argument(
                            "Invalid query. You cannot use 'not-in' filters with 'array-contains-any' filters.",
                        ));
                    }
                    self.has_not_in = true;
                }
                _ => {}
            }
        }
        Ok(())
    }
}
