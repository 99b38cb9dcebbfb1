use crate::firestore::api::aggregate::AggregateQuery;
use crate::firestore::api::filter::{validate_condition_value, Filter};
use crate::firestore::api::listener::{ListenerKind, ListenerRegistration, SnapshotHandler};
use crate::firestore::api::query_modifiers::{
    CursorPosition, FieldFilter, FilterDef, FilterOperator, IntoFilterOperator,
    IntoOrderDirection, OrderDef, QueryModifiers,
};
use crate::firestore::api::snapshot::{DocumentSnapshot, QuerySnapshot};
use crate::firestore::api::Firestore;
use crate::firestore::constants::MAX_WHERE_IN_VALUES;
use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::{FieldPath, IntoFieldPath, ResourcePath};
use crate::firestore::native::{GetOptions, NativeSerializer, QueryRequest, SnapshotListenOptions};
use crate::firestore::value::FirestoreValue;

const WHERE_PREFIX: &str = "firebase.firestore().collection().where() ";
const ORDER_BY_PREFIX: &str = "firebase.firestore().collection().orderBy() ";
const ON_SNAPSHOT_PREFIX: &str = "firebase.firestore().collection().onSnapshot(*) ";

/// Position given to `start_at`, `start_after`, `end_at` and `end_before`:
/// a document snapshot, or field values matching the query's orderings.
#[derive(Clone, Debug)]
pub enum QueryCursor {
    Snapshot(DocumentSnapshot),
    Values(Vec<FirestoreValue>),
}

impl From<DocumentSnapshot> for QueryCursor {
    fn from(snapshot: DocumentSnapshot) -> Self {
        QueryCursor::Snapshot(snapshot)
    }
}

impl From<&DocumentSnapshot> for QueryCursor {
    fn from(snapshot: &DocumentSnapshot) -> Self {
        QueryCursor::Snapshot(snapshot.clone())
    }
}

impl From<Vec<FirestoreValue>> for QueryCursor {
    fn from(values: Vec<FirestoreValue>) -> Self {
        QueryCursor::Values(values)
    }
}

impl From<FirestoreValue> for QueryCursor {
    fn from(value: FirestoreValue) -> Self {
        QueryCursor::Values(vec![value])
    }
}

/// An immutable query over a collection, a collection group or a named
/// bundle query. Every builder method validates its input and returns a new
/// query.
#[derive(Clone, Debug)]
pub struct Query {
    firestore: Firestore,
    path: ResourcePath,
    modifiers: QueryModifiers,
    query_name: Option<String>,
}

impl Query {
    pub(crate) fn new(
        firestore: Firestore,
        path: ResourcePath,
        modifiers: QueryModifiers,
        query_name: Option<String>,
    ) -> Self {
        Self {
            firestore,
            path,
            modifiers,
            query_name,
        }
    }

    fn with_modifiers(&self, modifiers: QueryModifiers) -> Self {
        Self {
            firestore: self.firestore.clone(),
            path: self.path.clone(),
            modifiers,
            query_name: self.query_name.clone(),
        }
    }

    pub fn firestore(&self) -> &Firestore {
        &self.firestore
    }

    pub(crate) fn resource_path(&self) -> &ResourcePath {
        &self.path
    }

    pub fn modifiers(&self) -> &QueryModifiers {
        &self.modifiers
    }

    pub fn query_name(&self) -> Option<&str> {
        self.query_name.as_deref()
    }

    /// The request sent to the engine when this query runs.
    pub fn request(&self) -> QueryRequest {
        let path = match &self.query_name {
            Some(name) => name.clone(),
            None => self.path.relative_name(),
        };
        self.modifiers.to_request(path)
    }

    pub fn where_field(
        &self,
        field_path: impl IntoFieldPath,
        operator: impl IntoFilterOperator,
        value: impl Into<FirestoreValue>,
    ) -> FirestoreResult<Query> {
        let modifiers = self.condition_modifiers(
            field_path.into_field_path(),
            operator.into_filter_operator(),
            &value.into(),
        )?;
        self.apply_where(modifiers)
    }

    /// Adds a [`Filter`]. A single field condition is checked exactly like
    /// [`where_field`](Query::where_field); composite filters are checked leaf
    /// by leaf with the tighter list bound of filters.
    pub fn where_filter(&self, filter: &Filter) -> FirestoreResult<Query> {
        let modifiers = match filter.as_field() {
            Some((field_path, operator, value)) => {
                self.condition_modifiers(field_path.clone(), operator, value)?
            }
            None => {
                let filter = filter.to_filter_def(&NativeSerializer::lenient())?;
                self.modifiers.with_filter(filter)
            }
        };
        self.apply_where(modifiers)
    }

    fn condition_modifiers(
        &self,
        field_path: FirestoreResult<FieldPath>,
        operator: Option<FilterOperator>,
        value: &FirestoreValue,
    ) -> FirestoreResult<QueryModifiers> {
        let field_path = field_path.map_err(|err| {
            invalid_argument(format!(
                "firebase.firestore().collection().where(*) 'fieldPath' {}.",
                err.message()
            ))
        })?;
        let operator = operator.ok_or_else(|| {
            invalid_argument(
                "firebase.firestore().collection().where(_, *) 'opStr' is invalid. Expected one of '==', '>', '>=', '<', '<=', '!=', 'array-contains', 'not-in', 'array-contains-any' or 'in'.",
            )
        })?;
        validate_condition_value(
            "firebase.firestore().collection().where(_, _, *) 'value'",
            operator,
            value,
            MAX_WHERE_IN_VALUES,
        )?;

        let value = NativeSerializer::lenient().encode_value(value)?;
        Ok(self.modifiers.with_filter(FilterDef::Field(FieldFilter {
            field_path,
            operator,
            value,
        })))
    }

    /// New filters are checked against each other and against any orderings
    /// already on the query.
    fn apply_where(&self, modifiers: QueryModifiers) -> FirestoreResult<Query> {
        modifiers
            .validate_where()
            .map_err(|err| err.with_prefix(WHERE_PREFIX))?;
        if !modifiers.orders().is_empty() {
            modifiers
                .validate_order_by()
                .map_err(|err| err.with_prefix(WHERE_PREFIX))?;
        }
        Ok(self.with_modifiers(modifiers))
    }

    fn validate_for_execution(&self) -> FirestoreResult<()> {
        self.modifiers.validate_limit_to_last()?;
        self.modifiers
            .validate_where()
            .map_err(|err| err.with_prefix(WHERE_PREFIX))?;
        self.modifiers
            .validate_order_by()
            .map_err(|err| err.with_prefix(ORDER_BY_PREFIX))
    }

    pub fn order_by(
        &self,
        field_path: impl IntoFieldPath,
        direction: impl IntoOrderDirection,
    ) -> FirestoreResult<Query> {
        let field_path = field_path.into_field_path().map_err(|err| {
            invalid_argument(format!(
                "firebase.firestore().collection().orderBy(*) 'fieldPath' {}.",
                err.message()
            ))
        })?;
        let direction = direction.into_order_direction()?;

        if self.modifiers.has_start() {
            return Err(invalid_argument(
                "firebase.firestore().collection().orderBy() Invalid query. You must not call startAt() or startAfter() before calling orderBy().",
            ));
        }
        if self.modifiers.has_end() {
            return Err(invalid_argument(
                "firebase.firestore().collection().orderBy() Invalid query. You must not call endAt() or endBefore() before calling orderBy().",
            ));
        }

        let modifiers = self.modifiers.with_order(OrderDef {
            field_path,
            direction,
        });
        modifiers
            .validate_order_by()
            .map_err(|err| err.with_prefix(ORDER_BY_PREFIX))?;
        Ok(self.with_modifiers(modifiers))
    }

    /// Keeps the first `limit` results. Clears any `limit_to_last`.
    pub fn limit(&self, limit: i64) -> FirestoreResult<Query> {
        let limit = positive_limit(limit).ok_or_else(|| {
            invalid_argument(
                "firebase.firestore().collection().limit(*) 'limit' must be a positive integer value.",
            )
        })?;
        Ok(self.with_modifiers(self.modifiers.with_limit(limit)))
    }

    /// Keeps the last `limit` results. Clears any `limit`. The query needs at
    /// least one ordering by the time it runs.
    pub fn limit_to_last(&self, limit: i64) -> FirestoreResult<Query> {
        let limit = positive_limit(limit).ok_or_else(|| {
            invalid_argument(
                "firebase.firestore().collection().limitToLast(*) 'limitToLast' must be a positive integer value.",
            )
        })?;
        Ok(self.with_modifiers(self.modifiers.with_limit_to_last(limit)))
    }

    pub fn start_at(&self, cursor: impl Into<QueryCursor>) -> FirestoreResult<Query> {
        self.with_cursor(CursorPosition::StartAt, cursor.into())
    }

    pub fn start_after(&self, cursor: impl Into<QueryCursor>) -> FirestoreResult<Query> {
        self.with_cursor(CursorPosition::StartAfter, cursor.into())
    }

    pub fn end_at(&self, cursor: impl Into<QueryCursor>) -> FirestoreResult<Query> {
        self.with_cursor(CursorPosition::EndAt, cursor.into())
    }

    pub fn end_before(&self, cursor: impl Into<QueryCursor>) -> FirestoreResult<Query> {
        self.with_cursor(CursorPosition::EndBefore, cursor.into())
    }

    fn with_cursor(&self, position: CursorPosition, cursor: QueryCursor) -> FirestoreResult<Query> {
        let prefix = format!(
            "firebase.firestore().collection().{}(*) ",
            position.method_name()
        );
        let (modifiers, values) = match cursor {
            QueryCursor::Snapshot(snapshot) => self.snapshot_cursor(&snapshot, &prefix)?,
            QueryCursor::Values(values) => {
                if values.is_empty() {
                    return Err(invalid_argument(format!(
                        "{prefix}Expected a DocumentSnapshot or list of field values but got undefined."
                    )));
                }
                if values.len() > self.modifiers.orders().len() {
                    return Err(invalid_argument(format!(
                        "{prefix}Too many arguments provided. The number of arguments must be less than or equal to the number of orderBy() clauses."
                    )));
                }
                (self.modifiers.clone(), values)
            }
        };

        let encoded = NativeSerializer::default().encode_array(&values)?;
        Ok(self.with_modifiers(modifiers.with_cursor(position, encoded)))
    }

    /// Reads the ordered fields from `snapshot` and appends the document id,
    /// adding the implicit trailing document-id ordering when missing.
    fn snapshot_cursor(
        &self,
        snapshot: &DocumentSnapshot,
        prefix: &str,
    ) -> FirestoreResult<(QueryModifiers, Vec<FirestoreValue>)> {
        if !snapshot.exists() {
            return Err(invalid_argument(format!(
                "{prefix}Can't use a DocumentSnapshot that doesn't exist."
            )));
        }

        let mut values = Vec::new();
        for order in self.modifiers.orders() {
            if order.field_path.is_document_id() {
                continue;
            }
            let value = snapshot.get(&order.field_path)?.ok_or_else(|| {
                invalid_argument(format!(
                    "{prefix}You are trying to start or end a query using a document for which the field '{}' (used as the orderBy) does not exist.",
                    order.field_path
                ))
            })?;
            values.push(value.clone());
        }

        let modifiers = match self.modifiers.orders().last() {
            Some(last) if last.field_path.is_document_id() => self.modifiers.clone(),
            last => self.modifiers.with_order(OrderDef {
                field_path: FieldPath::document_id(),
                direction: last.map(|order| order.direction).unwrap_or_default(),
            }),
        };

        let id = if self.modifiers.is_collection_group() {
            snapshot.path().relative_name()
        } else {
            snapshot.id().to_string()
        };
        values.push(FirestoreValue::from_string(id));
        Ok((modifiers, values))
    }

    pub async fn get(&self, options: GetOptions) -> FirestoreResult<QuerySnapshot> {
        let native = self.firestore.native();
        let snapshot = match &self.query_name {
            Some(_) => native.named_query_get(&self.request(), options).await?,
            None => {
                self.validate_for_execution()?;
                native.collection_get(&self.request(), options).await?
            }
        };
        QuerySnapshot::from_native(self, snapshot)
    }

    /// Listens to the query results. Events are delivered to `handler` in the
    /// order the engine emits them until the registration is removed or dropped.
    pub fn on_snapshot(
        &self,
        options: SnapshotListenOptions,
        handler: impl Into<SnapshotHandler<QuerySnapshot>>,
    ) -> FirestoreResult<ListenerRegistration> {
        if self.query_name.is_none() {
            self.validate_for_execution()?;
        }
        let observer = handler
            .into()
            .into_observer()
            .map_err(|err| err.with_prefix(ON_SNAPSHOT_PREFIX))?;

        let listeners = self.firestore.listeners();
        let listener_id = listeners.next_id();
        listeners.add_query(listener_id, self.clone(), observer);

        let request = self.request();
        let native = self.firestore.native();
        match &self.query_name {
            Some(_) => native.named_query_on_snapshot(&request, listener_id, options),
            None => native.collection_on_snapshot(&request, listener_id, options),
        }
        Ok(ListenerRegistration::new(
            self.firestore.clone(),
            listener_id,
            ListenerKind::Query,
        ))
    }

    /// Aggregation over the documents this query matches.
    pub fn count(&self) -> AggregateQuery {
        AggregateQuery::new(self.clone())
    }

    /// Same app, query type, path and modifiers.
    pub fn is_equal(&self, other: &Query) -> bool {
        self.firestore.app_name() == other.firestore.app_name()
            && self.path == other.path
            && self.modifiers == other.modifiers
    }
}

fn positive_limit(limit: i64) -> Option<u32> {
    u32::try_from(limit).ok().filter(|limit| *limit > 0)
}
