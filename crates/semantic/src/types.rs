/// Embedding output.
///
/// Not `Serialize`: vectors are request-scoped and never written
/// anywhere.
#[derive(Clone, PartialEq)]
pub struct Embedding {
    /// Embedding values as returned by the provider.
    pub vector: Vec<f32>,
    /// Name of the model used to produce the vector.
    pub model_name: String,
}

impl Embedding {
    /// Dimension of `vector`.
    pub fn dim(&self) -> usize {
        self.vector.len()
    }
}

// Only the shape is printed.
impl std::fmt::Debug for Embedding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedding")
            .field("model_name", &self.model_name)
            .field("dim", &self.dim())
            .finish()
    }
}
