//! Test fixtures - sample descriptor documents.

#![allow(dead_code)]

/// Archive library whose URL is filled in with `{url}`.
pub const ARCHIVE_DESCRIPTOR: &str = r#"
{
  "zlib": {
    "source": { "type": "archive", "url": "{url}" }
  }
}
"#;

/// Two libraries in array form, one with a patch.
pub const ARRAY_DESCRIPTOR: &str = r#"
[
  { "name": "zlib",
    "source": { "type": "archive", "url": "https://zlib.net/zlib-1.3.1.tar.gz",
                "sha1": "f535367b1a11e2f9ac3bec723fb007fbc0d189e5" } },
  { "name": "glm",
    "source": { "type": "git", "url": "https://github.com/g-truc/glm.git",
                "revision": "0.9.9.8" },
    "postprocess": { "type": "patch", "file": "glm.patch", "pnum": 1 } }
]
"#;

/// Same library declared twice.
pub const DUPLICATE_DESCRIPTOR: &str = r#"
[
  { "name": "zlib", "source": { "type": "archive", "url": "https://a/zlib.tar.gz" } },
  { "name": "zlib", "source": { "type": "archive", "url": "https://b/zlib.tar.gz" } }
]
"#;

/// Fill `{url}` in a fixture.
pub fn with_url(template: &str, url: &str) -> String {
    template.replace("{url}", url)
}
