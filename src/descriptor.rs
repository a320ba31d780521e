//! Library descriptors - parsing and validation.
//!
//! A descriptor file is JSON, either an array of library objects that each
//! carry a `name`, or an object keyed by library name:
//!
//! ```json
//! {
//!   "zlib": {
//!     "source": { "type": "archive", "url": "https://zlib.net/zlib-1.3.1.tar.gz",
//!                 "sha1": "f535367b1a11e2f9ac3bec723fb007fbc0d189e5" },
//!     "postprocess": { "type": "patch", "file": "zlib.patch", "pnum": 1 }
//!   },
//!   "glm": {
//!     "source": { "type": "git", "url": "https://github.com/g-truc/glm.git",
//!                 "revision": "0.9.9.8" }
//!   }
//! }
//! ```
//!
//! Raw descriptors keep every field optional so that shape problems are
//! reported by the validator, in a fixed order, instead of by serde.

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{DescriptorError, PostprocessError};

/// Default patch path-strip count.
pub const DEFAULT_PNUM: u32 = 2;

/// A library as declared by the caller. Read-only to the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryDescriptor {
    pub name: String,
    pub source: Option<RawSource>,
    pub postprocess: Option<RawPostprocess>,
}

/// Unvalidated `source` object.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RawSource {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub url: Option<String>,
    pub sha1: Option<String>,
    pub sha256: Option<String>,
    #[serde(rename = "user-agent", alias = "userAgent", alias = "user_agent")]
    pub user_agent: Option<String>,
    pub branch: Option<String>,
    #[serde(rename = "branch-follow", alias = "branchFollow", alias = "branch_follow")]
    pub branch_follow: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub revision: Option<String>,
}

/// Unvalidated `postprocess` object.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RawPostprocess {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub file: Option<String>,
    pub pnum: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LibraryBody {
    source: Option<RawSource>,
    postprocess: Option<RawPostprocess>,
}

/// Accept `"1234"` and `1234` alike; svn revisions are often written as numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a string or number, got {}",
            other
        ))),
    }
}

/// Treat `""` like an absent field.
fn present(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

/// Recognized source kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Archive,
    Git,
    Hg,
    Svn,
}

impl SourceKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "archive" => Some(Self::Archive),
            "git" => Some(Self::Git),
            "hg" => Some(Self::Hg),
            "svn" => Some(Self::Svn),
            _ => None,
        }
    }
}

/// Version-control systems a repository source can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VcsKind {
    Git,
    Hg,
    Svn,
}

impl VcsKind {
    /// Name of the command-line tool.
    pub fn tool(&self) -> &'static str {
        match self {
            Self::Git => "git",
            Self::Hg => "hg",
            Self::Svn => "svn",
        }
    }

    /// Metadata directory marking a working copy.
    pub fn metadata_dir(&self) -> &'static str {
        match self {
            Self::Git => ".git",
            Self::Hg => ".hg",
            Self::Svn => ".svn",
        }
    }
}

/// Expected digests of a downloaded archive. Every digest present must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Integrity {
    pub sha1: Option<String>,
    pub sha256: Option<String>,
}

impl Integrity {
    pub fn is_empty(&self) -> bool {
        self.sha1.is_none() && self.sha256.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSource {
    pub url: String,
    pub integrity: Integrity,
    pub user_agent: Option<String>,
}

/// Repository source with its effective branch (`branch`, else `branch-follow`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSource {
    pub kind: VcsKind,
    pub url: String,
    pub branch: Option<String>,
    pub revision: Option<String>,
}

impl RepoSource {
    /// Name of the snapshot archive for this checkout of `name`.
    pub fn snapshot_archive_name(&self, name: &str) -> String {
        snapshot_archive_name(name, self.revision.as_deref())
    }
}

/// Validated source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Archive(ArchiveSource),
    Repository(RepoSource),
}

/// Validated postprocessing step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostprocessSpec {
    /// Patch file relative to the postprocessing root, strip count.
    Patch { file: PathBuf, pnum: u32 },
    Script { file: PathBuf },
}

/// `<name>.tar.gz`, or `<name>_<revision>.tar.gz` when a revision is pinned.
pub fn snapshot_archive_name(name: &str, revision: Option<&str>) -> String {
    match revision {
        Some(rev) => format!("{}_{}.tar.gz", name, rev),
        None => format!("{}.tar.gz", name),
    }
}

impl LibraryDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_source(mut self, source: RawSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_postprocess(mut self, postprocess: RawPostprocess) -> Self {
        self.postprocess = Some(postprocess);
        self
    }

    /// Validate the `source` object.
    ///
    /// Checks, in order: source present, type and url present, type
    /// recognized, branch and revision not both set.
    pub fn validate_source(&self) -> Result<SourceSpec, DescriptorError> {
        let src = self
            .source
            .as_ref()
            .filter(|s| **s != RawSource::default())
            .ok_or(DescriptorError::MissingSource)?;

        let (Some(kind), Some(url)) = (present(&src.kind), present(&src.url)) else {
            return Err(DescriptorError::MissingTypeOrUrl);
        };

        let kind =
            SourceKind::parse(&kind).ok_or_else(|| DescriptorError::UnknownSourceType(kind))?;

        let vcs = match kind {
            SourceKind::Archive => {
                return Ok(SourceSpec::Archive(ArchiveSource {
                    url,
                    integrity: Integrity {
                        sha1: present(&src.sha1),
                        sha256: present(&src.sha256),
                    },
                    user_agent: present(&src.user_agent),
                }));
            }
            SourceKind::Git => VcsKind::Git,
            SourceKind::Hg => VcsKind::Hg,
            SourceKind::Svn => VcsKind::Svn,
        };

        let branch = present(&src.branch).or_else(|| present(&src.branch_follow));
        let revision = present(&src.revision);
        if branch.is_some() && revision.is_some() {
            return Err(DescriptorError::BranchAndRevision);
        }
        if vcs == VcsKind::Svn
            && let Some(branch) = &branch
        {
            return Err(DescriptorError::SvnBranch(branch.clone()));
        }

        Ok(SourceSpec::Repository(RepoSource {
            kind: vcs,
            url,
            branch,
            revision,
        }))
    }

    /// The `postprocess` object, if one is declared. An empty object counts as absent.
    pub fn postprocess(&self) -> Option<&RawPostprocess> {
        self.postprocess
            .as_ref()
            .filter(|p| **p != RawPostprocess::default())
    }
}

impl RawPostprocess {
    /// Validate shape: `type` and `file` present, `type` is `patch` or `script`.
    pub fn validate(&self) -> Result<PostprocessSpec, PostprocessError> {
        let kind = present(&self.kind).ok_or(PostprocessError::MissingType)?;
        let file = present(&self.file).ok_or(PostprocessError::MissingFile)?;

        match kind.as_str() {
            "patch" => Ok(PostprocessSpec::Patch {
                file: PathBuf::from(file),
                pnum: self.pnum.unwrap_or(DEFAULT_PNUM),
            }),
            "script" => Ok(PostprocessSpec::Script {
                file: PathBuf::from(file),
            }),
            _ => Err(PostprocessError::UnknownType(kind)),
        }
    }
}

/// Object-form entries in document order, repeated keys included.
struct MapEntries(Vec<(String, serde_json::Value)>);

impl<'de> Deserialize<'de> for MapEntries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = MapEntries;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of libraries")
            }

            fn visit_map<A>(self, mut map: A) -> Result<MapEntries, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, serde_json::Value>()? {
                    entries.push(entry);
                }
                Ok(MapEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Parse a descriptor document, keeping declaration order.
pub fn parse_descriptors(content: &str) -> Result<Vec<LibraryDescriptor>, DescriptorError> {
    let document: serde_json::Value = serde_json::from_str(content)?;

    let entries: Vec<(String, serde_json::Value)> = match document {
        serde_json::Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let name = item
                    .get("name")
                    .and_then(|n| n.as_str())
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .ok_or(DescriptorError::MissingName(index))?;
                Ok((name, item))
            })
            .collect::<Result<_, DescriptorError>>()?,
        // a Value map keeps only the last of repeated keys
        serde_json::Value::Object(_) => serde_json::from_str::<MapEntries>(content)?.0,
        _ => return Err(DescriptorError::NotACollection),
    };

    let mut seen = HashSet::new();
    let mut libraries = Vec::with_capacity(entries.len());
    for (name, value) in entries {
        if !seen.insert(name.clone()) {
            return Err(DescriptorError::DuplicateName(name));
        }
        let body: LibraryBody =
            serde_json::from_value(value).map_err(|source| DescriptorError::InvalidLibrary {
                name: name.clone(),
                source,
            })?;
        libraries.push(LibraryDescriptor {
            name,
            source: body.source,
            postprocess: body.postprocess,
        });
    }

    Ok(libraries)
}

/// Read and parse a descriptor file.
pub fn load_descriptors(path: &Path) -> Result<Vec<LibraryDescriptor>, DescriptorError> {
    let content = std::fs::read_to_string(path).map_err(|source| DescriptorError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_descriptors(&content)
}
