use base64::{
    engine::general_purpose::{STANDARD, STANDARD_NO_PAD},
    Engine as _,
};

use crate::firestore::error::{invalid_argument, FirestoreResult};

/// Binary blob, carried on the wire as standard base64.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BytesValue(Vec<u8>);

impl BytesValue {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Accepts padded and unpadded input; engines differ on which they emit.
    pub fn from_base64(value: &str) -> FirestoreResult<Self> {
        STANDARD
            .decode(value)
            .or_else(|_| STANDARD_NO_PAD.decode(value))
            .map(Self)
            .map_err(|err| {
                invalid_argument(format!(
                    "firebase.firestore.Blob.fromBase64String() failed to decode: {err}"
                ))
            })
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for BytesValue {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

impl From<&[u8]> for BytesValue {
    fn from(value: &[u8]) -> Self {
        Self::new(value.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_roundtrip() {
        let bytes = BytesValue::new(vec![1, 2, 3, 4]);
        let encoded = bytes.to_base64();
        assert_eq!(encoded, "AQIDBA==");
        let decoded = BytesValue::from_base64(&encoded).unwrap();
        assert_eq!(decoded.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn accepts_unpadded_input() {
        let decoded = BytesValue::from_base64("AQIDBA").unwrap();
        assert_eq!(decoded.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn rejects_garbage() {
        let err = BytesValue::from_base64("***").unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
    }
}
