//! Release asset naming per platform

use super::UpgradeError;

const DOWNLOAD_BASE_URL: &str = "https://github.com/plantonhq/project-planton/releases/download";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// `darwin`, `linux` or `windows`
    pub os: &'static str,
    /// `amd64` or `arm64`
    pub arch: &'static str,
}

impl Platform {
    pub fn current() -> Result<Self, UpgradeError> {
        Self::from_rust(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn from_rust(os: &str, arch: &str) -> Result<Self, UpgradeError> {
        let unsupported = || UpgradeError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        };
        let os = match os {
            "macos" => "darwin",
            "linux" => "linux",
            "windows" => "windows",
            _ => return Err(unsupported()),
        };
        let arch = match arch {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            _ => return Err(unsupported()),
        };
        Ok(Self { os, arch })
    }

    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }

    /// `cli_<version>_<os>_<arch>.tar.gz`, `.zip` on Windows
    pub fn asset_name(&self, tag: &str) -> String {
        let version = tag.trim_start_matches('v');
        let ext = if self.is_windows() { "zip" } else { "tar.gz" };
        format!("cli_{}_{}_{}.{}", version, self.os, self.arch, ext)
    }

    pub fn download_url(&self, tag: &str) -> String {
        format!("{}/{}/{}", DOWNLOAD_BASE_URL, tag, self.asset_name(tag))
    }

    pub fn checksums_url(&self, tag: &str) -> String {
        format!("{}/{}/checksums.txt", DOWNLOAD_BASE_URL, tag)
    }

    /// File name of the executable inside the archive
    pub fn binary_name(&self) -> &'static str {
        if self.is_windows() {
            "project-planton.exe"
        } else {
            "project-planton"
        }
    }
}
