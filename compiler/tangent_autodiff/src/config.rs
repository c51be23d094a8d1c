//! Knobs for the primal-extraction pass.

/// Configuration for [`DiffUnzipPass`](crate::DiffUnzipPass).
///
/// `Default` gives the naming scheme downstream passes expect; the
/// `with_*` setters exist for tests and for embedding the pass in a
/// differently named pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnzipConfig {
    /// Prepended to the original function's name to name the primal function.
    pub primal_prefix: String,
    /// Appended to the split function's name to name its context struct.
    pub context_suffix: String,
    /// How many pointer-typed users deep the write search may follow
    /// before answering "no write found".
    pub max_pointer_depth: usize,
    /// Run the structural verifier over both functions after splitting.
    pub verify: bool,
}

impl Default for UnzipConfig {
    fn default() -> Self {
        Self {
            primal_prefix: "s_bwd_primal_".to_owned(),
            context_suffix: "_Intermediates".to_owned(),
            max_pointer_depth: 64,
            verify: cfg!(debug_assertions),
        }
    }
}

impl UnzipConfig {
    #[must_use]
    pub fn with_primal_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.primal_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_context_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.context_suffix = suffix.into();
        self
    }

    #[must_use]
    pub fn with_max_pointer_depth(mut self, depth: usize) -> Self {
        self.max_pointer_depth = depth;
        self
    }

    #[must_use]
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }
}
