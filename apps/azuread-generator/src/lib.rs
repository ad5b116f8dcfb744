//! Generators for repository metadata derived from the service manifest.
//!
//! - `.github/labeler-pull-request-triage.yaml`: labels pull requests by the
//!   service modules they touch
//! - `.github/labeler-issue-triage.yaml`: labels issues by the resource names
//!   they mention
//!
//! Output is deterministic: labels and packages are sorted, so re-running the
//! generator on an unchanged manifest produces byte-identical files.

mod error;
mod labels;

pub use error::{GeneratorError, GeneratorResult};
pub use labels::{IssueLabels, PullRequestLabels};

use azuread_sdk::registration::ServiceRegistration;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A file rendered from the service manifest.
pub trait Generator {
    /// Where the file lives relative to the repository root.
    fn output_path(&self, root: &Path) -> PathBuf;

    /// Renders the file. Services whose package is in `skip` are left out.
    fn render(&self, services: &[ServiceRegistration], skip: &BTreeSet<&str>) -> String;
}

/// Renders every generator into `root` and returns the written paths.
///
/// # Errors
///
/// Returns an error if `root` is not a directory, a skipped package is not
/// part of the manifest, or a file cannot be written.
pub fn generate(
    root: &Path,
    services: &[ServiceRegistration],
    skip: &[String],
) -> GeneratorResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(GeneratorError::NotADirectory(root.to_path_buf()));
    }

    let skip: BTreeSet<&str> = skip.iter().map(String::as_str).collect();
    if let Some(unknown) = skip
        .iter()
        .find(|p| !services.iter().any(|s| s.package == **p))
    {
        return Err(GeneratorError::UnknownPackage((*unknown).to_string()));
    }

    let generators: [&dyn Generator; 2] = [&PullRequestLabels, &IssueLabels];
    let mut written = Vec::with_capacity(generators.len());

    for generator in generators {
        let path = generator.output_path(root);
        let contents = generator.render(services, &skip);
        write_file(&path, &contents)?;
        info!(path = %path.display(), bytes = contents.len(), "generated");
        written.push(path);
    }

    Ok(written)
}

fn write_file(path: &Path, contents: &str) -> GeneratorResult<()> {
    let io_error = |source| GeneratorError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    debug!(path = %path.display(), "writing");
    fs::write(path, contents).map_err(io_error)
}
