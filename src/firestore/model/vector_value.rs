/// Fixed-length list of numbers used for vector search fields.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VectorValue {
    values: Vec<f64>,
}

impl VectorValue {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn to_array(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<f64>> for VectorValue {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}
