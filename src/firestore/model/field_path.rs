use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::firestore::constants::DOCUMENT_ID_FIELD;
use crate::firestore::error::{invalid_argument, FirestoreResult};

const RESERVED_CHARACTERS: [char; 5] = ['~', '*', '/', '[', ']'];

/// Path to a field inside a document, made of one or more non-empty names.
///
/// Serializes as the list of its segments, the layout engines expect for
/// filter and order field paths.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn new<S, I>(segments: I) -> FirestoreResult<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(invalid_argument(
                "firebase.firestore.FieldPath() Invalid field path. Provided names must not be empty.",
            ));
        }
        if let Some(index) = segments.iter().position(|segment| segment.is_empty()) {
            return Err(invalid_argument(format!(
                "firebase.firestore.FieldPath() Invalid field name at argument {}. Field names must not be empty.",
                index + 1
            )));
        }
        Ok(Self { segments })
    }

    /// Parses a dotted field reference such as `address.city`.
    pub fn from_dot_separated(path: &str) -> FirestoreResult<Self> {
        if path.is_empty() || path.starts_with('.') || path.ends_with('.') || path.contains("..") {
            return Err(invalid_argument(format!(
                "Invalid field path ({path}). Paths must not be empty, begin with '.', end with '.', or contain '..'"
            )));
        }
        if path.contains(&RESERVED_CHARACTERS[..]) {
            return Err(invalid_argument(format!(
                "Invalid field path ({path}). Paths must not contain '~', '*', '/', '[', or ']'"
            )));
        }
        FieldPath::new(path.split('.'))
    }

    /// The reserved path addressing the document identifier.
    pub fn document_id() -> Self {
        Self {
            segments: vec![DOCUMENT_ID_FIELD.to_string()],
        }
    }

    pub fn is_document_id(&self) -> bool {
        self.segments.len() == 1 && self.segments[0] == DOCUMENT_ID_FIELD
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn canonical_string(&self) -> String {
        self.segments.join(".")
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.segments.clone()
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical_string())
    }
}

/// Trait that converts common user inputs into a validated [`FieldPath`].
pub trait IntoFieldPath {
    fn into_field_path(self) -> FirestoreResult<FieldPath>;
}

impl IntoFieldPath for FieldPath {
    fn into_field_path(self) -> FirestoreResult<FieldPath> {
        Ok(self)
    }
}

impl<'a> IntoFieldPath for &'a FieldPath {
    fn into_field_path(self) -> FirestoreResult<FieldPath> {
        Ok(self.clone())
    }
}

impl IntoFieldPath for String {
    fn into_field_path(self) -> FirestoreResult<FieldPath> {
        FieldPath::from_dot_separated(&self)
    }
}

impl<'a> IntoFieldPath for &'a str {
    fn into_field_path(self) -> FirestoreResult<FieldPath> {
        FieldPath::from_dot_separated(self)
    }
}
