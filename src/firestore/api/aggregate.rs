use crate::firestore::api::query::Query;
use crate::firestore::error::FirestoreResult;

/// Count aggregation over the documents matched by a query.
#[derive(Clone, Debug)]
pub struct AggregateQuery {
    query: Query,
}

impl AggregateQuery {
    pub(crate) fn new(query: Query) -> Self {
        Self { query }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub async fn get(&self) -> FirestoreResult<AggregateQuerySnapshot> {
        let result = self
            .query
            .firestore()
            .native()
            .collection_count(&self.query.request())
            .await?;
        Ok(AggregateQuerySnapshot {
            query: self.clone(),
            count: result.count,
        })
    }
}

#[derive(Clone, Debug)]
pub struct AggregateQuerySnapshot {
    query: AggregateQuery,
    count: u64,
}

impl AggregateQuerySnapshot {
    pub fn query(&self) -> &AggregateQuery {
        &self.query
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}
