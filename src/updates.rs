//! This module checks mods' repositories for newer releases or commits.
//!
//! The check is purely informational: it reads the registry and never touches the selection.
//! Each request is bounded by timeouts, and a failure only affects the mod it was made for.

use std::{
	fs,
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
	time::Duration,
};

use anyhow::{Context, Result};
use serde::Deserialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::{prelude::*, registry::ModRegistry};

const API_BASE: &str = "https://api.github.com/repos";
const USER_AGENT: &str = concat!("modlaunch/", env!("CARGO_PKG_VERSION"));

/// What a mod's repository has that the installed copy doesn't.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
	UpToDate,
	NewRelease { tag: String },
	NewCommits,
	NewReleaseAndCommits { tag: String },
}

/// The result of checking one mod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
	/// The mod's name.
	pub name: String,

	/// The repository that was checked.
	pub repository: String,

	/// What was found.
	pub status: UpdateStatus,
}

impl UpdateReport {
	/// A one-line summary for display.
	pub fn summary(&self) -> String {
		match &self.status {
			UpdateStatus::UpToDate => format!("{} is up to date.", self.name),
			UpdateStatus::NewRelease { tag } => format!("{} - New packed release available: {tag}", self.name),
			UpdateStatus::NewCommits => format!("{} - New commits available.", self.name),
			UpdateStatus::NewReleaseAndCommits { tag } => {
				format!("{} - New packed release, {tag}, and new commits available.", self.name)
			},
		}
	}
}

/// The parts of a release the check cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
	pub tag: Option<String>,
	pub published: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
struct RawRelease {
	tag_name: Option<String>,
	published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCommit {
	commit: RawCommitDetail,
}

#[derive(Debug, Deserialize)]
struct RawCommitDetail {
	committer: RawSignature,
}

#[derive(Debug, Deserialize)]
struct RawSignature {
	date: String,
}

/// Checks mods for updates, one request at a time.
/// Cloning a checker shares its cancellation flag.
#[derive(Clone)]
pub struct UpdateChecker {
	agent: ureq::Agent,
	cancelled: Arc<AtomicBool>,
}

impl Default for UpdateChecker {
	fn default() -> Self {
		Self::new()
	}
}

impl UpdateChecker {
	/// Builds a checker with bounded connect and read timeouts.
	pub fn new() -> Self {
		let agent = ureq::AgentBuilder::new()
			.timeout_connect(Duration::from_secs(5))
			.timeout_read(Duration::from_secs(10))
			.timeout_write(Duration::from_secs(10))
			.build();

		Self {
			agent,
			cancelled: Arc::new(AtomicBool::new(false)),
		}
	}

	/// Stops any check in progress after the request it is currently making.
	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::Relaxed);
	}

	/// Checks every mod that declares a repository.
	/// Mods are reported in registry order, each with its own result.
	pub fn check_all(&self, registry: &ModRegistry) -> Vec<(String, Result<UpdateReport>)> {
		let mut results = Vec::new();

		for descriptor in registry.all_mods().filter(|m| m.repository.is_some()) {
			if self.cancelled.load(Ordering::Relaxed) {
				info!("Update check cancelled.");
				break;
			}

			let result = self.check(registry, descriptor);
			if let Err(error) = &result {
				warn!("Update check for {} failed: {error:#}", descriptor.name);
			}

			results.push((descriptor.name.clone(), result));
		}

		results
	}

	/// Checks a single mod.
	pub fn check(&self, registry: &ModRegistry, descriptor: &ModDescriptor) -> Result<UpdateReport> {
		let repository = descriptor.repository.clone().context("mod declares no repository")?;
		let api = api_url(&repository).with_context(|| format!("'{repository}' is not a GitHub repository"))?;

		let manifest = registry.directory().join(&descriptor.manifest_file);
		let modified = fs::metadata(&manifest)
			.and_then(|m| m.modified())
			.with_context(|| format!("read modification time of '{}'", manifest.display()))?;

		let release = self.latest_release(&api)?;
		let commit = self.latest_commit(&api)?;

		let status = assess(descriptor.version.as_deref(), OffsetDateTime::from(modified), release.as_ref(), commit);
		debug!("{}: {status:?}", descriptor.name);

		Ok(UpdateReport {
			name: descriptor.name.clone(),
			repository,
			status,
		})
	}

	fn latest_release(&self, api: &str) -> Result<Option<ReleaseInfo>> {
		let Some(response) = self.get(&format!("{api}/releases/latest"))? else {
			return Ok(None);
		};

		let raw: RawRelease = response.into_json().context("decode latest release")?;
		let Some(published) = raw.published_at else {
			return Ok(None);
		};

		Ok(Some(ReleaseInfo {
			tag: raw.tag_name,
			published: parse_date(&published)?,
		}))
	}

	fn latest_commit(&self, api: &str) -> Result<Option<OffsetDateTime>> {
		let Some(response) = self.get(&format!("{api}/commits?per_page=1"))? else {
			return Ok(None);
		};

		let commits: Vec<RawCommit> = response.into_json().context("decode commits")?;
		commits
			.first()
			.map(|c| parse_date(&c.commit.committer.date))
			.transpose()
	}

	/// Makes a GET request, treating "not found" as an absent resource.
	fn get(&self, url: &str) -> Result<Option<ureq::Response>> {
		trace!("GET {url}");

		match self.agent.get(url).set("User-Agent", USER_AGENT).call() {
			Ok(response) => Ok(Some(response)),
			Err(ureq::Error::Status(404, _)) => Ok(None),
			Err(error) => Err(error).with_context(|| format!("request {url}")),
		}
	}
}

/// Maps a repository page URL onto its API URL.
/// Returns *None* for anything that isn't a `github.com/<owner>/<repo>` address.
pub fn api_url(repository: &str) -> Option<String> {
	let rest = repository
		.trim()
		.trim_start_matches("https://")
		.trim_start_matches("http://")
		.trim_start_matches("www.")
		.strip_prefix("github.com/")?;

	let mut parts = rest.trim_end_matches('/').split('/');
	let owner = parts.next().filter(|p| !p.is_empty())?;
	let repo = parts.next().filter(|p| !p.is_empty())?.trim_end_matches(".git");

	Some(format!("{API_BASE}/{owner}/{repo}"))
}

/// Decides what a repository offers over the installed copy.
///
/// A release counts as new when its tag differs from the declared version,
/// or when it was published after the manifest was last modified.
/// Commits count as new when the latest one is newer than the manifest.
pub fn assess(
	declared_version: Option<&str>,
	local_modified: OffsetDateTime,
	release: Option<&ReleaseInfo>,
	latest_commit: Option<OffsetDateTime>,
) -> UpdateStatus {
	let new_release = release.and_then(|r| {
		let tag_changed = r.tag.as_deref().is_some_and(|tag| Some(tag) != declared_version);
		(tag_changed || r.published > local_modified).then(|| r.tag.clone().unwrap_or_default())
	});

	let new_commits = latest_commit.is_some_and(|date| date > local_modified);

	match (new_release, new_commits) {
		(Some(tag), true) => UpdateStatus::NewReleaseAndCommits { tag },
		(Some(tag), false) => UpdateStatus::NewRelease { tag },
		(None, true) => UpdateStatus::NewCommits,
		(None, false) => UpdateStatus::UpToDate,
	}
}

fn parse_date(raw: &str) -> Result<OffsetDateTime> {
	OffsetDateTime::parse(raw, &Rfc3339).with_context(|| format!("parse date '{raw}'"))
}
