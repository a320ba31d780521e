//! Error types.
//!
//! One enum per concern. Descriptor-shape errors are detected before any
//! I/O; fetch, archive and VCS errors are recoverable through the fallback
//! mirror; postprocessing errors are always final.

use std::path::PathBuf;
use thiserror::Error;

use crate::bootstrap::FallbackOutcome;

/// Errors in the shape of a library descriptor or a descriptor file.
#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("missing source description")]
    MissingSource,

    #[error("missing type or URL description")]
    MissingTypeOrUrl,

    #[error("unknown source type '{0}'")]
    UnknownSourceType(String),

    #[error("cannot specify both branch (to follow) and revision")]
    BranchAndRevision,

    #[error("svn has no branch to follow ('{0}'); point the URL at the branch instead")]
    SvnBranch(String),

    #[error("cannot read descriptor file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid descriptor JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("descriptor file must hold an array or an object of libraries")]
    NotACollection,

    #[error("library #{0} has no 'name'")]
    MissingName(usize),

    #[error("library '{0}' is declared more than once")]
    DuplicateName(String),

    #[error("library '{name}' is malformed: {source}")]
    InvalidLibrary {
        name: String,
        source: serde_json::Error,
    },
}

/// Errors while downloading into the cache or from the fallback mirror.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("cannot derive a file name from URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP {code} for {url}")]
    Status { url: String, code: u16 },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{algorithm} integrity check failed for '{file}'\n  expected: {expected}\n  got:      {actual}")]
    HashMismatch {
        algorithm: &'static str,
        file: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Errors from the archive codec.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("cannot detect archive format: {0}")]
    UnknownFormat(PathBuf),

    #[error("archive contains unsafe entry: {0}")]
    UnsafeEntry(String),

    #[error("cannot read archive {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors from the version-control adapter.
#[derive(Error, Debug)]
pub enum VcsError {
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: &'static str,
        source: std::io::Error,
    },

    #[error("{tool} {operation} failed\nDetails: {stderr}")]
    CommandFailed {
        tool: &'static str,
        operation: String,
        stderr: String,
    },

    #[error("no {tool} working copy at {path}")]
    NoWorkingCopy { tool: &'static str, path: PathBuf },

    #[error("{0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the postprocessing phase: descriptor shape and execution.
#[derive(Error, Debug)]
pub enum PostprocessError {
    #[error("postprocessing object must have a 'type'")]
    MissingType,

    #[error("postprocessing object must have a 'file'")]
    MissingFile,

    #[error("unknown postprocessing type '{0}'")]
    UnknownType(String),

    #[error("patch not found: {0}")]
    PatchNotFound(PathBuf),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("patch application of {file} failed (exit code: {code:?})\nstderr: {stderr}")]
    PatchFailed {
        file: PathBuf,
        code: Option<i32>,
        stderr: String,
    },

    #[error("script execution of {file} failed (exit code: {code:?})")]
    ScriptFailed { file: PathBuf, code: Option<i32> },
}

/// Final failure of one library bootstrap.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("cannot create library directory {path}: {source}")]
    LibraryDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("{primary}; fallback: {fallback}")]
    Unrecovered {
        primary: String,
        fallback: FallbackOutcome,
    },

    #[error("updating state from downloaded repository from fallback URL failed: {0}")]
    Rederive(#[source] VcsError),

    #[error(transparent)]
    Postprocess(#[from] PostprocessError),
}
