//! Third-party library bootstrapper
//!
//! Takes declarative library descriptors and produces one directory of
//! ready-to-build source per library: archives are downloaded into a
//! content cache and extracted, repositories are cloned or updated with
//! git, hg or svn. When the primary source fails, a previously uploaded
//! archive or snapshot is fetched from a fallback mirror. After
//! acquisition an optional patch is applied or a script is run.
//!
//! # Example descriptor file
//!
//! ```json
//! [
//!   { "name": "zlib",
//!     "source": { "type": "archive", "url": "https://zlib.net/zlib-1.3.1.tar.gz" } },
//!   { "name": "glm",
//!     "source": { "type": "git", "url": "https://github.com/g-truc/glm.git",
//!                 "revision": "0.9.9.8" },
//!     "postprocess": { "type": "patch", "file": "glm.patch", "pnum": 1 } }
//! ]
//! ```
//!
//! # Library use
//!
//! ```no_run
//! use libstrap::{BootstrapConfig, Bootstrapper, HttpClient, SystemTools, load_descriptors};
//! use std::path::Path;
//!
//! let tools = SystemTools::new("/tmp/libstrap-cache", HttpClient::default());
//! let config = BootstrapConfig::new()
//!     .create_snapshots(true)
//!     .fallback_url("https://mirror.example.org/libs");
//! let bootstrapper = Bootstrapper::new(config, tools.toolset());
//!
//! for library in load_descriptors(Path::new("libraries.json")).unwrap() {
//!     let report = bootstrapper.bootstrap(&library, &Path::new("deps").join(&library.name));
//!     println!("{}: {}", report.name, if report.success() { "ok" } else { "failed" });
//! }
//! ```

pub mod bootstrap;
pub mod core;
pub mod descriptor;
pub mod driver;
pub mod error;
pub mod helpers;

#[cfg(test)]
mod test_support;

pub use bootstrap::{
    BootstrapConfig, BootstrapEvent, BootstrapReport, Bootstrapper, FallbackArtifact,
    FallbackOutcome, Level, Phase,
};
pub use crate::core::settings::Settings;
pub use descriptor::{LibraryDescriptor, load_descriptors, parse_descriptors, snapshot_archive_name};
pub use error::{
    ArchiveError, BootstrapError, DescriptorError, FetchError, PostprocessError, VcsError,
};
pub use helpers::{HttpClient, SystemTools, Toolset};
