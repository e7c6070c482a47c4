//! Direct install from a GitHub release archive

use super::UpgradeError;
use super::platform::Platform;
use crate::utils::{print_detail, print_step, print_success};
use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempPath;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);
const CHECKSUM_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the new binary ended up
#[derive(Debug)]
pub struct Installed {
    pub path: PathBuf,
    /// Shell setup the user still needs, if the install dir is not on PATH
    pub path_hint: Option<String>,
}

/// Downloads, verifies and installs release `tag`
///
/// The installed binary is only touched after the checksum matched.
pub async fn install(tag: &str) -> Result<Installed, UpgradeError> {
    let platform = Platform::current()?;
    let archive_name = platform.asset_name(tag);
    let download_url = platform.download_url(tag);

    println!();
    print_step(&format!("Downloading project-planton {tag}..."));
    print_detail(&download_url);
    let archive = download_to_temp(&download_url, &archive_name).await?;
    print_success(&format!("Downloaded project-planton {tag}"));

    print_step("Verifying checksum...");
    let checksums = fetch_checksums(&platform.checksums_url(tag)).await?;
    verify_checksum(&archive, &checksums, &archive_name)?;
    print_success("Checksum verified");

    print_step("Extracting binary...");
    let extract_dir = tempfile::Builder::new()
        .prefix("project-planton-upgrade-")
        .tempdir()?;
    let binary = if platform.is_windows() {
        extract_with_tar(&archive, extract_dir.path(), platform.binary_name()).await?
    } else {
        extract_from_tar_gz(&archive, extract_dir.path(), platform.binary_name())?
    };
    print_success("Extracted binary");

    let (install_path, path_hint) = install_path(&platform);
    if let Some(dir) = install_path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| permission_or_io(e, dir))?;
    }

    print_step("Installing...");
    print_detail(&install_path.display().to_string());
    replace_binary(&binary, &install_path)?;
    print_success("Installed new binary");

    if platform.os == "darwin" {
        remove_quarantine(&install_path).await;
    }

    Ok(Installed {
        path: install_path,
        path_hint,
    })
}

async fn download_to_temp(url: &str, archive_name: &str) -> Result<TempPath, UpgradeError> {
    let client = reqwest::Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .build()?;
    let mut response = client
        .get(url)
        .header("User-Agent", "project-planton")
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(UpgradeError::HttpStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let progress = download_progress(response.content_length(), archive_name);
    let suffix = if archive_name.ends_with(".zip") {
        ".zip"
    } else {
        ".tar.gz"
    };
    let mut file = tempfile::Builder::new()
        .prefix("project-planton-upgrade-")
        .suffix(suffix)
        .tempfile()?;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk)?;
        progress.inc(chunk.len() as u64);
    }
    file.flush()?;
    progress.finish_and_clear();

    Ok(file.into_temp_path())
}

fn download_progress(total: Option<u64>, archive_name: &str) -> ProgressBar {
    let progress = match total {
        Some(total) => {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  {bar:30.cyan/blue} {bytes}/{total_bytes} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("  {spinner:.green} {bytes} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb
        }
    };
    progress.set_message(archive_name.to_string());
    progress
}

async fn fetch_checksums(url: &str) -> Result<String, UpgradeError> {
    let client = reqwest::Client::builder()
        .timeout(CHECKSUM_TIMEOUT)
        .build()?;
    let response = client
        .get(url)
        .header("User-Agent", "project-planton")
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(UpgradeError::HttpStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }
    Ok(response.text().await?)
}

/// Checksum listed for `archive_name` in a `sha256sum`-style file
pub fn expected_checksum(checksums: &str, archive_name: &str) -> Option<String> {
    checksums.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let checksum = parts.next()?;
        let name = parts.next()?.trim_start_matches('*');
        (name == archive_name).then(|| checksum.to_lowercase())
    })
}

pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

pub fn verify_checksum(archive: &Path, checksums: &str, archive_name: &str) -> Result<(), UpgradeError> {
    let expected = expected_checksum(checksums, archive_name)
        .ok_or_else(|| UpgradeError::ChecksumNotFound(archive_name.to_string()))?;
    let actual = sha256_file(archive)?;
    if actual != expected {
        return Err(UpgradeError::ChecksumMismatch { expected, actual });
    }
    tracing::debug!(checksum = %actual, "Archive checksum matches");
    Ok(())
}

/// Unpacks `binary_name` from a `.tar.gz` into `dest_dir`
pub fn extract_from_tar_gz(
    archive: &Path,
    dest_dir: &Path,
    binary_name: &str,
) -> Result<PathBuf, UpgradeError> {
    let file = std::fs::File::open(archive)?;
    let mut tar = tar::Archive::new(GzDecoder::new(file));

    for entry in tar.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry.path()?.into_owned();
        if path.file_name().is_some_and(|name| name == binary_name) {
            let dest = dest_dir.join(binary_name);
            entry.unpack(&dest)?;
            return Ok(dest);
        }
    }

    Err(UpgradeError::BinaryNotInArchive(binary_name.to_string()))
}

/// Zip archives are unpacked with the system `tar`, which reads zip on Windows
async fn extract_with_tar(
    archive: &Path,
    dest_dir: &Path,
    binary_name: &str,
) -> Result<PathBuf, UpgradeError> {
    tracing::debug!("Running: tar -xf {} -C {}", archive.display(), dest_dir.display());
    let output = tokio::process::Command::new("tar")
        .arg("-xf")
        .arg(archive)
        .arg("-C")
        .arg(dest_dir)
        .output()
        .await?;
    if !output.status.success() {
        return Err(UpgradeError::CommandFailed {
            command: "tar -xf".to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let dest = dest_dir.join(binary_name);
    if !dest.is_file() {
        return Err(UpgradeError::BinaryNotInArchive(binary_name.to_string()));
    }
    Ok(dest)
}

/// Current executable if writable, else the per-user bin directory
fn install_path(platform: &Platform) -> (PathBuf, Option<String>) {
    let current = std::env::current_exe()
        .ok()
        .map(|exe| std::fs::canonicalize(&exe).unwrap_or(exe))
        .filter(|exe| is_writable(exe));
    let path_env = std::env::var("PATH").unwrap_or_default();
    choose_install_path(platform, current, dirs::home_dir(), &path_env)
}

pub fn choose_install_path(
    platform: &Platform,
    writable_current: Option<PathBuf>,
    home: Option<PathBuf>,
    path_env: &str,
) -> (PathBuf, Option<String>) {
    if let Some(current) = writable_current {
        return (current, None);
    }

    let Some(home) = home else {
        return if platform.is_windows() {
            let local = std::env::var("LOCALAPPDATA").unwrap_or_default();
            (
                PathBuf::from(local)
                    .join("Programs")
                    .join("project-planton")
                    .join(platform.binary_name()),
                None,
            )
        } else {
            (PathBuf::from("/usr/local/bin/project-planton"), None)
        };
    };

    if platform.is_windows() {
        let dir = home
            .join("AppData")
            .join("Local")
            .join("Programs")
            .join("project-planton");
        let hint = format!("Add {} to your PATH if not already configured.", dir.display());
        return (dir.join(platform.binary_name()), Some(hint));
    }

    let dir = home.join(".local").join("bin");
    let path = dir.join(platform.binary_name());
    if path_env.contains(dir.to_string_lossy().as_ref()) {
        return (path, None);
    }

    let rc_file = if platform.os == "linux" {
        "~/.bashrc"
    } else {
        "~/.zshrc"
    };
    let hint = format!(
        "Add {} to your PATH:\n  echo 'export PATH=\"$HOME/.local/bin:$PATH\"' >> {rc_file} && source {rc_file}",
        dir.display()
    );
    (path, Some(hint))
}

/// Whether `path` can be replaced in place
///
/// The binary is swapped by rename, so only its directory has to be
/// writable. Opening a running executable for write fails on Linux.
fn is_writable(path: &Path) -> bool {
    path.is_file()
        && path
            .parent()
            .is_some_and(|dir| tempfile::NamedTempFile::new_in(dir).is_ok())
}

/// Moves `new_binary` over `dest`
///
/// A plain rename is tried first. When that fails (typically across
/// filesystems) the binary is copied next to `dest` and renamed into place,
/// so `dest` is never left half-written.
pub fn replace_binary(new_binary: &Path, dest: &Path) -> Result<(), UpgradeError> {
    set_executable(new_binary)?;

    match std::fs::rename(new_binary, dest) {
        Ok(()) => return Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(UpgradeError::PermissionDenied {
                path: dest.to_path_buf(),
            });
        }
        Err(e) => tracing::debug!(error = %e, "rename failed, copying instead"),
    }

    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut staged = tempfile::Builder::new()
        .prefix(".project-planton-")
        .tempfile_in(dir)
        .map_err(|e| permission_or_io(e, dest))?;
    let mut source = std::fs::File::open(new_binary)?;
    std::io::copy(&mut source, staged.as_file_mut())?;
    staged.as_file().sync_all()?;

    let staged = staged.into_temp_path();
    set_executable(&staged)?;
    staged
        .persist(dest)
        .map_err(|e| permission_or_io(e.error, dest))?;
    Ok(())
}

fn set_executable(path: &Path) -> Result<(), UpgradeError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

fn permission_or_io(e: std::io::Error, path: &Path) -> UpgradeError {
    if e.kind() == std::io::ErrorKind::PermissionDenied {
        UpgradeError::PermissionDenied {
            path: path.to_path_buf(),
        }
    } else {
        UpgradeError::Io(e)
    }
}

async fn remove_quarantine(path: &Path) {
    let result = tokio::process::Command::new("xattr")
        .args(["-dr", "com.apple.quarantine"])
        .arg(path)
        .output()
        .await;
    if let Err(e) = result {
        tracing::debug!(error = %e, "xattr unavailable, quarantine attribute left in place");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;

    fn write_tar_gz(path: &Path, entries: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *content).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_expected_checksum() {
        let checksums = "\
abc123  cli_0.3.15_darwin_arm64.tar.gz
DEF456 *cli_0.3.15_linux_amd64.tar.gz
";
        assert_eq!(
            expected_checksum(checksums, "cli_0.3.15_linux_amd64.tar.gz").unwrap(),
            "def456"
        );
        assert_eq!(
            expected_checksum(checksums, "cli_0.3.15_darwin_arm64.tar.gz").unwrap(),
            "abc123"
        );
        assert!(expected_checksum(checksums, "cli_0.3.15_windows_amd64.zip").is_none());
    }

    #[test]
    fn test_verify_checksum() {
        let temp_dir = tempfile::tempdir().unwrap();
        let archive = temp_dir.path().join("cli.tar.gz");
        std::fs::write(&archive, b"hello").unwrap();
        // sha256("hello")
        let digest = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        assert_eq!(sha256_file(&archive).unwrap(), digest);

        verify_checksum(&archive, &format!("{digest}  cli.tar.gz\n"), "cli.tar.gz").unwrap();

        let err = verify_checksum(&archive, &format!("{}  cli.tar.gz\n", "0".repeat(64)), "cli.tar.gz")
            .unwrap_err();
        assert!(matches!(err, UpgradeError::ChecksumMismatch { .. }));

        let err = verify_checksum(&archive, "", "cli.tar.gz").unwrap_err();
        assert!(matches!(err, UpgradeError::ChecksumNotFound(name) if name == "cli.tar.gz"));
    }

    #[test]
    fn test_extract_from_tar_gz() {
        let temp_dir = tempfile::tempdir().unwrap();
        let archive = temp_dir.path().join("cli.tar.gz");
        write_tar_gz(
            &archive,
            &[("README.md", b"docs"), ("project-planton", b"#!/bin/sh\necho new\n")],
        );

        let out = temp_dir.path().join("out");
        std::fs::create_dir_all(&out).unwrap();
        let binary = extract_from_tar_gz(&archive, &out, "project-planton").unwrap();
        assert_eq!(binary, out.join("project-planton"));
        assert_eq!(std::fs::read_to_string(&binary).unwrap(), "#!/bin/sh\necho new\n");

        let err = extract_from_tar_gz(&archive, &out, "project-planton.exe").unwrap_err();
        assert!(matches!(err, UpgradeError::BinaryNotInArchive(_)));
    }

    #[test]
    fn test_replace_binary() {
        let temp_dir = tempfile::tempdir().unwrap();
        let new_binary = temp_dir.path().join("new");
        let dest = temp_dir.path().join("bin").join("project-planton");
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
        std::fs::write(&new_binary, "new").unwrap();
        std::fs::write(&dest, "old").unwrap();

        replace_binary(&new_binary, &dest).unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "new");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&dest).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn test_running_executable_is_writable() {
        let exe = std::env::current_exe().unwrap();
        assert!(is_writable(&exe));

        let temp_dir = tempfile::tempdir().unwrap();
        assert!(!is_writable(&temp_dir.path().join("missing")));
        assert!(!is_writable(temp_dir.path()));
    }

    #[test]
    fn test_choose_install_path() {
        let linux = Platform::from_rust("linux", "x86_64").unwrap();
        let home = PathBuf::from("/home/dev");

        let (path, hint) =
            choose_install_path(&linux, Some("/opt/bin/project-planton".into()), Some(home.clone()), "");
        assert_eq!(path, PathBuf::from("/opt/bin/project-planton"));
        assert!(hint.is_none());

        let (path, hint) = choose_install_path(&linux, None, Some(home.clone()), "/usr/bin");
        assert_eq!(path, home.join(".local/bin/project-planton"));
        assert!(hint.unwrap().contains("~/.bashrc"));

        let (_, hint) =
            choose_install_path(&linux, None, Some(home.clone()), "/home/dev/.local/bin:/usr/bin");
        assert!(hint.is_none());

        let mac = Platform::from_rust("macos", "aarch64").unwrap();
        let (_, hint) = choose_install_path(&mac, None, Some(home.clone()), "");
        assert!(hint.unwrap().contains("~/.zshrc"));

        let windows = Platform::from_rust("windows", "x86_64").unwrap();
        let (path, hint) = choose_install_path(&windows, None, Some(home), "");
        assert!(path.ends_with("AppData/Local/Programs/project-planton/project-planton.exe"));
        assert!(hint.unwrap().contains("PATH"));
    }
}
