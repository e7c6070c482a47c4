//! CLI release versions and the GitHub releases API

use super::UpgradeError;
use regex::Regex;
use serde::Deserialize;
use std::cmp::Ordering;
use std::sync::OnceLock;
use std::time::Duration;

pub const RELEASES_API_URL: &str = "https://api.github.com/repos/plantonhq/project-planton/releases";
pub const RELEASES_PAGE_URL: &str = "https://github.com/plantonhq/project-planton/releases";

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const CLI_TAG_PATTERN: &str = r"^v?(\d+)\.(\d+)\.(\d+)-cli\.(\d{8})\.(\d+)$";

/// Version baked in at build time, `dev` for local builds
pub fn current() -> &'static str {
    match option_env!("PROJECT_PLANTON_VERSION") {
        Some(version) if !version.trim().is_empty() => version,
        _ => "dev",
    }
}

/// Release the staging mirror should follow; `None` for dev builds
pub fn release_version() -> Option<String> {
    match current() {
        "dev" => None,
        version => Some(version.to_string()),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRelease {
    pub tag_name: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
}

/// Parsed `v<major>.<minor>.<patch>-cli.<yyyymmdd>.<revision>` tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliVersion {
    pub tag: String,
    major: u64,
    minor: u64,
    patch: u64,
    date: u32,
    revision: u64,
}

fn cli_tag_regex() -> Option<&'static Regex> {
    static REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(CLI_TAG_PATTERN).ok()).as_ref()
}

impl CliVersion {
    pub fn parse(tag: &str) -> Option<Self> {
        let caps = cli_tag_regex()?.captures(tag)?;
        Some(Self {
            tag: tag.to_string(),
            major: caps[1].parse().ok()?,
            minor: caps[2].parse().ok()?,
            patch: caps[3].parse().ok()?,
            date: caps[4].parse().ok()?,
            revision: caps[5].parse().ok()?,
        })
    }

    fn key(&self) -> (u64, u64, u64, u32, u64) {
        (self.major, self.minor, self.patch, self.date, self.revision)
    }
}

impl Ord for CliVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for CliVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Highest published CLI release; drafts, prereleases and non-CLI tags are skipped
pub fn latest_cli_release(releases: &[GitHubRelease]) -> Option<CliVersion> {
    releases
        .iter()
        .filter(|r| !r.draft && !r.prerelease && r.tag_name.contains("-cli."))
        .filter_map(|r| CliVersion::parse(&r.tag_name))
        .max()
}

/// Whether `latest` should replace `current`
pub fn is_newer(current: &str, latest: &str) -> bool {
    if current == latest {
        return false;
    }
    if current.is_empty() || current == "dev" {
        return true;
    }
    match (CliVersion::parse(current), CliVersion::parse(latest)) {
        (Some(current), Some(latest)) => latest > current,
        _ => true,
    }
}

/// `0.3.15-cli.20260113.0` → `v0.3.15-cli.20260113.0`
pub fn normalize_tag(version: &str) -> String {
    let version = version.trim();
    if version.starts_with('v') {
        version.to_string()
    } else {
        format!("v{version}")
    }
}

pub struct GitHubReleases {
    client: reqwest::Client,
    api_url: String,
}

impl GitHubReleases {
    pub fn new() -> Result<Self, UpgradeError> {
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_url: RELEASES_API_URL.to_string(),
        })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header("User-Agent", "project-planton")
    }

    /// Tag of the newest CLI release
    pub async fn latest(&self) -> Result<String, UpgradeError> {
        tracing::debug!(url = %self.api_url, "Fetching releases");
        let response = self.get(&self.api_url).send().await?;
        if !response.status().is_success() {
            return Err(UpgradeError::HttpStatus {
                url: self.api_url.clone(),
                status: response.status().as_u16(),
            });
        }

        let releases: Vec<GitHubRelease> = response.json().await?;
        if releases.is_empty() {
            return Err(UpgradeError::NoReleases);
        }
        latest_cli_release(&releases)
            .map(|v| v.tag)
            .ok_or(UpgradeError::NoReleases)
    }

    /// Normalized tag if a release with that tag exists
    pub async fn validate_version(&self, version: &str) -> Result<String, UpgradeError> {
        let tag = normalize_tag(version);
        let url = format!("{}/tags/{}", self.api_url, tag);
        tracing::debug!(%url, "Validating release tag");

        let response = self.get(&url).send().await?;
        match response.status().as_u16() {
            200 => Ok(tag),
            404 => Err(UpgradeError::VersionNotFound(tag)),
            status => Err(UpgradeError::HttpStatus { url, status }),
        }
    }
}
