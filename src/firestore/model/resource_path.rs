use std::fmt::{Display, Formatter};
use std::ops::Deref;

use crate::firestore::error::{invalid_argument, FirestoreResult};

const RESOURCE_NAME_MARKER: &str = "/documents/";

/// Slash separated path to a collection or document, relative to the database root.
///
/// The root is the empty path. Odd segment counts address collections and
/// non-zero even counts address documents.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ResourcePath {
    segments: Vec<String>,
}

impl ResourcePath {
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    pub fn root() -> Self {
        Self { segments: Vec::new() }
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments = segments.into_iter().map(Into::into).collect();
        Self::new(segments)
    }

    pub fn from_string(path: &str) -> FirestoreResult<Self> {
        if path.trim().is_empty() {
            return Ok(Self::root());
        }

        if path.contains("//") {
            return Err(invalid_argument("Found empty segment in resource path"));
        }

        Ok(Self::root().child(path))
    }

    /// Parses a fully qualified resource name such as
    /// `projects/p/databases/d/documents/users/alice`.
    ///
    /// Names without the `documents` marker are treated as relative paths.
    pub fn from_name(name: &str) -> FirestoreResult<Self> {
        match name.find(RESOURCE_NAME_MARKER) {
            Some(index) => Self::from_string(&name[index + RESOURCE_NAME_MARKER.len()..]),
            None if name.ends_with("/documents") => Ok(Self::root()),
            None => Self::from_string(name),
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn is_document(&self) -> bool {
        !self.segments.is_empty() && self.segments.len() % 2 == 0
    }

    pub fn is_collection(&self) -> bool {
        self.segments.len() % 2 == 1
    }

    /// Appends the `/` separated segments of `relative`, skipping empty ones.
    pub fn child(&self, relative: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(
            relative
                .split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string),
        );
        Self::new(segments)
    }

    /// Returns the enclosing path, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self::new(segments))
    }

    /// Last segment of the path, `None` at the root.
    pub fn id(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_str())
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn relative_name(&self) -> String {
        self.segments.join("/")
    }
}

impl Display for ResourcePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.relative_name())
    }
}

impl Deref for ResourcePath {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_render_path() {
        let path = ResourcePath::from_string("cities/sf/neighborhoods/downtown").unwrap();
        assert_eq!(path.len(), 4);
        assert_eq!(path.id(), Some("downtown"));
        assert_eq!(path.relative_name(), "cities/sf/neighborhoods/downtown");
    }

    #[test]
    fn handles_root_path() {
        let path = ResourcePath::from_string("").unwrap();
        assert!(path.is_empty());
        assert!(!path.is_document());
        assert!(!path.is_collection());
        assert_eq!(path.id(), None);
        assert!(path.parent().is_none());
    }

    #[test]
    fn rejects_empty_segments() {
        let err = ResourcePath::from_string("cities//sf").unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
    }

    #[test]
    fn parity_follows_segment_count() {
        let mut path = ResourcePath::root();
        for (index, segment) in ["a", "b", "c", "d", "e", "f"].iter().enumerate() {
            path = path.child(segment);
            let count = index + 1;
            assert_eq!(path.is_document(), count % 2 == 0, "count {count}");
            assert_eq!(path.is_collection(), count % 2 == 1, "count {count}");
        }
    }

    #[test]
    fn child_splits_on_slash() {
        let path = ResourcePath::root().child("users/alice/").child("/posts");
        assert_eq!(path.segments(), &["users", "alice", "posts"]);
        assert_eq!(path.parent().unwrap().relative_name(), "users/alice");
    }

    #[test]
    fn strips_resource_name_prefix() {
        let path =
            ResourcePath::from_name("projects/demo/databases/(default)/documents/users/alice")
                .unwrap();
        assert_eq!(path.relative_name(), "users/alice");

        let root = ResourcePath::from_name("projects/demo/databases/(default)/documents").unwrap();
        assert!(root.is_empty());

        let relative = ResourcePath::from_name("users/bob").unwrap();
        assert!(relative.is_document());
    }
}
