//! Cache key derivation
//!
//! Maps (repository slug, branch or pull request, cache name, key tag) to an
//! object path. The mapping is deterministic so that a push from one build
//! and a fetch from a later one meet at the same object.

use crate::error::{DircacheError, DircacheResult};
use sha2::{Digest, Sha256};
use std::fmt;

const DEFAULT_NAME: &str = "cache";
const ARCHIVE_EXTENSION: &str = "tgz";

/// Identifies one cache archive of a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    owner: String,
    repo: String,
    branch: String,
    pull_request: Option<PullRequest>,
    name: String,
    tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PullRequest {
    number: u64,
    base_branch: Option<String>,
}

impl CacheKey {
    /// Create a key for a repository slug (`owner/name`) and branch
    pub fn new(slug: &str, branch: &str) -> DircacheResult<Self> {
        let (owner, repo) = slug
            .trim()
            .split_once('/')
            .ok_or_else(|| DircacheError::CacheKeyInvalid(format!("slug {:?} is not owner/name", slug)))?;
        if repo.contains('/') {
            return Err(DircacheError::CacheKeyInvalid(format!(
                "slug {:?} is not owner/name",
                slug
            )));
        }

        Ok(Self {
            owner: segment("slug owner", owner)?,
            repo: segment("slug name", repo)?,
            branch: segment("branch", branch)?,
            pull_request: None,
            name: DEFAULT_NAME.to_string(),
            tag: None,
        })
    }

    /// Scope the key to a pull request; its cache is seeded from the base
    /// branch when it has none of its own
    pub fn with_pull_request(
        mut self,
        number: u64,
        base_branch: Option<&str>,
    ) -> DircacheResult<Self> {
        let base_branch = base_branch
            .map(|b| segment("pull request base branch", b))
            .transpose()?;
        self.pull_request = Some(PullRequest {
            number,
            base_branch,
        });
        Ok(self)
    }

    /// Use an explicit cache name instead of `cache`
    pub fn with_name(mut self, name: &str) -> DircacheResult<Self> {
        self.name = segment("cache name", name)?;
        Ok(self)
    }

    /// Distinguish archives of the same branch, e.g. per OS or toolchain
    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tag = Some(tag.to_string());
        self
    }

    /// Object path pushes go to; also the first fetch candidate
    pub fn object_path(&self) -> String {
        self.path_for(&self.own_branch())
    }

    /// Object paths to try on fetch, most specific first
    pub fn fetch_paths(&self, default_branch: Option<&str>) -> Vec<String> {
        let mut branches = vec![self.own_branch()];
        if let Some(base) = self.pull_request.as_ref().and_then(|pr| pr.base_branch.clone()) {
            branches.push(base);
        }
        if let Some(default) = default_branch.map(sanitize).filter(|b| is_usable(b)) {
            branches.push(default);
        }

        let mut paths: Vec<String> = Vec::with_capacity(branches.len());
        for branch in branches {
            let path = self.path_for(&branch);
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }

    fn own_branch(&self) -> String {
        match &self.pull_request {
            Some(pr) => format!("PR.{}", pr.number),
            None => self.branch.clone(),
        }
    }

    fn file_name(&self) -> String {
        match &self.tag {
            Some(tag) => format!("{}-{}.{}", self.name, tag_digest(tag), ARCHIVE_EXTENSION),
            None => format!("{}.{}", self.name, ARCHIVE_EXTENSION),
        }
    }

    fn path_for(&self, branch: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.owner,
            self.repo,
            branch,
            self.file_name()
        )
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.object_path())
    }
}

/// First 12 hex chars of the tag's SHA-256
fn tag_digest(tag: &str) -> String {
    let digest = Sha256::digest(tag.as_bytes());
    hex::encode(&digest[..6])
}

/// Replace everything outside `[A-Za-z0-9._-]` with `_`
fn sanitize(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn is_usable(segment: &str) -> bool {
    !segment.is_empty() && segment != "." && segment != ".."
}

fn segment(what: &str, value: &str) -> DircacheResult<String> {
    let sanitized = sanitize(value);
    if !is_usable(&sanitized) {
        return Err(DircacheError::CacheKeyInvalid(format!(
            "{} {:?} does not form a usable path segment",
            what, value
        )));
    }
    Ok(sanitized)
}
