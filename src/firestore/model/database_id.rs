use std::fmt::{Display, Formatter};

use crate::firestore::constants::{DEFAULT_APP_NAME, DEFAULT_DATABASE_ID};

/// Identifies one Firestore instance: the owning app plus the database name.
///
/// Two references can only be mixed in a batch or transaction when their
/// database ids are equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DatabaseId {
    app_name: String,
    database: String,
}

impl DatabaseId {
    pub fn new(app_name: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            database: database.into(),
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn is_default_database(&self) -> bool {
        self.database == DEFAULT_DATABASE_ID
    }

    pub fn with_database(&self, database: impl Into<String>) -> Self {
        Self::new(self.app_name.clone(), database)
    }
}

impl Default for DatabaseId {
    fn default() -> Self {
        Self::new(DEFAULT_APP_NAME, DEFAULT_DATABASE_ID)
    }
}

impl Display for DatabaseId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.app_name, self.database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_targets_default_app() {
        let id = DatabaseId::default();
        assert_eq!(id.app_name(), DEFAULT_APP_NAME);
        assert!(id.is_default_database());
    }

    #[test]
    fn identity_covers_app_and_database() {
        let primary = DatabaseId::default();
        let secondary = primary.with_database("second");
        assert_ne!(primary, secondary);
        assert_eq!(secondary.to_string(), "[DEFAULT]/second");
    }
}
