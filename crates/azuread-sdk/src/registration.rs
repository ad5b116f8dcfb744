//! Static service manifest entries.

/// Describes one service package: which resources and data sources it
/// contributes and how it is labelled in the issue tracker and on the
/// documentation website.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceRegistration {
    /// Human readable service name.
    pub name: &'static str,
    /// Module under the provider's `services` directory, used for labeler
    /// globs.
    pub package: &'static str,
    /// Issue tracker label. Services without one are not labelled.
    pub github_label: Option<&'static str>,
    pub website_categories: &'static [&'static str],
    pub resources: &'static [&'static str],
    pub data_sources: &'static [&'static str],
}

impl ServiceRegistration {
    /// Returns true if `type_name` is a resource or data source of this
    /// service.
    #[must_use]
    pub fn provides(&self, type_name: &str) -> bool {
        self.resources.contains(&type_name) || self.data_sources.contains(&type_name)
    }
}
