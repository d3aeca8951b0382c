//! Release metadata baked in by the build script.

/// Product name, version, and commit of the running binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    product: String,
    version: String,
    commit: String,
}

impl BuildInfo {
    /// Builds metadata from explicit values.
    #[must_use]
    pub fn new(
        product: impl Into<String>,
        version: impl Into<String>,
        commit: impl Into<String>,
    ) -> Self {
        Self {
            product: product.into(),
            version: version.into(),
            commit: commit.into(),
        }
    }

    /// Metadata of this build.
    #[must_use]
    pub fn current() -> Self {
        Self::new(
            env!("DOCKERD_PRODUCT_NAME"),
            env!("CARGO_PKG_VERSION"),
            env!("DOCKERD_GIT_COMMIT"),
        )
    }

    /// Product name reported by `--version`.
    #[must_use]
    pub fn product(&self) -> &str {
        &self.product
    }

    /// `"{version}, build {commit}"`.
    #[must_use]
    pub fn version_string(&self) -> String {
        format!("{}, build {}", self.version, self.commit)
    }
}
