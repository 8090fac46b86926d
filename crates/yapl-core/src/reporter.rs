//! Reporter trait for dependency injection
//!
//! This trait allows core logic to report progress and status without
//! being coupled to a specific terminal implementation.

pub trait Reporter: Send + Sync {
    /// Indicates a new section or phase has started (e.g. "Dependencies", "Prefix").
    fn section(&self, title: &str);

    /// A component is being fetched and unpacked.
    fn fetching(&self, component: &str, version: &str);

    /// A component is present and usable.
    fn done(&self, component: &str, version: &str, detail: &str);

    /// A best-effort step failed without aborting the operation.
    fn warning(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn fetching(&self, component: &str, version: &str) {
        (**self).fetching(component, version);
    }
    fn done(&self, component: &str, version: &str, detail: &str) {
        (**self).done(component, version, detail);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
}

/// A reporter that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn fetching(&self, _: &str, _: &str) {}
    fn done(&self, _: &str, _: &str, _: &str) {}
    fn warning(&self, _: &str) {}
}
