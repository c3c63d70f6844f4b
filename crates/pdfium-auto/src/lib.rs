//! # pdfium-auto
//!
//! Find a usable [PDFium](https://pdfium.googlesource.com/pdfium/) shared
//! library for `pdfium-render`, fetching it on first use when none is
//! installed.
//!
//! ## Resolution order
//!
//! 1. `PDFIUM_LIB_PATH`, when it names an existing file.
//! 2. The per-version cache directory (see [`pdfium_cache_dir`]).
//! 3. A download of the platform archive from
//!    [bblanchon/pdfium-binaries](https://github.com/bblanchon/pdfium-binaries),
//!    unpacked into the cache directory.
//!
//! The resolved path is remembered for the lifetime of the process, so only
//! the first call can touch the network.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pdfium_auto::{bind_pdfium, ensure_pdfium_library};
//!
//! // Make sure the library is on disk, reporting download progress.
//! let path = ensure_pdfium_library(Some(&|done, total| {
//!     eprint!("\r{done}/{} bytes", total.unwrap_or(0));
//! })).expect("pdfium download failed");
//!
//! // Later, from any thread:
//! let pdfium = bind_pdfium(None).expect("bind failed");
//! ```
//!
//! ## Environment variables
//!
//! - `PDFIUM_LIB_PATH`: path to an existing pdfium library; skips download.
//! - `PDFIUM_AUTO_CACHE_DIR`: override the base cache directory.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use pdfium_render::prelude::Pdfium;
use thiserror::Error;
use tracing::{debug, info, warn};

/// The pdfium-binaries release tag used for downloads.
pub const PDFIUM_VERSION: &str = "7690";

const BASE_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

/// Name of the application directory inside the user cache directory.
const CACHE_APP_DIR: &str = "pdfbatch";

/// Size of each read from the download stream.
const READ_CHUNK: usize = 64 * 1024;

/// Errors returned while locating or binding pdfium.
#[derive(Error, Debug)]
pub enum PdfiumAutoError {
    /// No prebuilt archive exists for this OS/architecture.
    #[error("Unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// Could not create or write into the cache directory.
    #[error("Cache directory error: {0}")]
    CacheDir(#[source] std::io::Error),

    #[error("Download failed: {0}")]
    Download(String),

    /// The archive was fetched but the library could not be unpacked from it.
    #[error("Archive extraction failed: {0}")]
    Extract(String),

    /// The library file exists but `pdfium-render` could not load it.
    #[error("Failed to bind PDFium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },
}

// ── Platform table ───────────────────────────────────────────────────────────

/// One prebuilt pdfium archive and where the library sits inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: &'static str,
    pub arch: &'static str,
    /// Asset name in the release, e.g. `pdfium-linux-x64.tgz`.
    pub archive: &'static str,
    /// Path of the library inside the archive.
    pub member: &'static str,
    /// File name the library is cached under.
    pub lib_name: &'static str,
}

const PLATFORMS: &[Platform] = &[
    Platform {
        os: "linux",
        arch: "x86_64",
        archive: "pdfium-linux-x64.tgz",
        member: "lib/libpdfium.so",
        lib_name: "libpdfium.so",
    },
    Platform {
        os: "linux",
        arch: "aarch64",
        archive: "pdfium-linux-arm64.tgz",
        member: "lib/libpdfium.so",
        lib_name: "libpdfium.so",
    },
    Platform {
        os: "macos",
        arch: "aarch64",
        archive: "pdfium-mac-arm64.tgz",
        member: "lib/libpdfium.dylib",
        lib_name: "libpdfium.dylib",
    },
    Platform {
        os: "macos",
        arch: "x86_64",
        archive: "pdfium-mac-x64.tgz",
        member: "lib/libpdfium.dylib",
        lib_name: "libpdfium.dylib",
    },
    Platform {
        os: "windows",
        arch: "x86_64",
        archive: "pdfium-win-x64.tgz",
        member: "bin/pdfium.dll",
        lib_name: "pdfium.dll",
    },
    Platform {
        os: "windows",
        arch: "aarch64",
        archive: "pdfium-win-arm64.tgz",
        member: "bin/pdfium.dll",
        lib_name: "pdfium.dll",
    },
];

/// Look up the archive for an explicit OS/architecture pair.
pub fn platform_for(os: &str, arch: &str) -> Result<&'static Platform, PdfiumAutoError> {
    PLATFORMS
        .iter()
        .find(|p| p.os == os && p.arch == arch)
        .ok_or_else(|| PdfiumAutoError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        })
}

/// The archive for the platform this binary was compiled for.
pub fn current_platform() -> Result<&'static Platform, PdfiumAutoError> {
    platform_for(std::env::consts::OS, std::env::consts::ARCH)
}

// ── Cache directory ──────────────────────────────────────────────────────────

/// Per-version directory the library is cached in.
///
/// `<cache>/pdfbatch/pdfium-{VERSION}/`, where `<cache>` is the platform
/// user cache directory or `PDFIUM_AUTO_CACHE_DIR` when set.
pub fn pdfium_cache_dir() -> PathBuf {
    let versioned = format!("pdfium-{PDFIUM_VERSION}");
    if let Ok(base) = std::env::var("PDFIUM_AUTO_CACHE_DIR") {
        return PathBuf::from(base).join(versioned);
    }
    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir)
        .join(CACHE_APP_DIR)
        .join(versioned)
}

static RESOLVED_PATH: OnceLock<PathBuf> = OnceLock::new();

fn env_library() -> Option<PathBuf> {
    std::env::var_os("PDFIUM_LIB_PATH")
        .map(PathBuf::from)
        .filter(|p| p.is_file())
}

/// Path of an already available library, without any network access.
pub fn cached_pdfium_path() -> Option<PathBuf> {
    if let Some(p) = RESOLVED_PATH.get() {
        return Some(p.clone());
    }
    env_library().or_else(|| {
        let platform = current_platform().ok()?;
        let p = pdfium_cache_dir().join(platform.lib_name);
        p.is_file().then_some(p)
    })
}

/// `true` when [`ensure_pdfium_library`] would not need to download.
pub fn is_pdfium_cached() -> bool {
    cached_pdfium_path().is_some()
}

/// Make sure the pdfium library is on disk and return its path.
///
/// `on_progress` receives `(bytes_downloaded, total_bytes)` while the
/// archive is fetched. It is never called when no download happens.
pub fn ensure_pdfium_library(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, PdfiumAutoError> {
    if let Some(path) = RESOLVED_PATH.get() {
        return Ok(path.clone());
    }

    let path = match cached_pdfium_path() {
        Some(p) => {
            debug!("Using pdfium library at {}", p.display());
            p
        }
        None => {
            if let Some(p) = std::env::var_os("PDFIUM_LIB_PATH") {
                warn!(
                    "PDFIUM_LIB_PATH '{}' does not exist; downloading pdfium instead",
                    Path::new(&p).display()
                );
            }
            download_into_cache(current_platform()?, on_progress)?
        }
    };

    // Another thread may have won the race; both resolved the same file.
    let _ = RESOLVED_PATH.set(path.clone());
    Ok(path)
}

/// Bind to pdfium, downloading it first when necessary.
///
/// Dropping the returned [`Pdfium`] shuts the library down for the whole
/// process, so callers keep a single instance alive.
pub fn bind_pdfium(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<Pdfium, PdfiumAutoError> {
    let lib_path = ensure_pdfium_library(on_progress)?;
    bind_pdfium_from_path(&lib_path)
}

/// Bind to the library at `path`. Never downloads.
pub fn bind_pdfium_from_path(path: &Path) -> Result<Pdfium, PdfiumAutoError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| PdfiumAutoError::Bind {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

// ── Download ─────────────────────────────────────────────────────────────────

fn release_url(platform: &Platform) -> String {
    format!(
        "{BASE_URL}/chromium%2F{PDFIUM_VERSION}/{}",
        platform.archive
    )
}

fn download_into_cache(
    platform: &Platform,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, PdfiumAutoError> {
    let cache_dir = pdfium_cache_dir();
    std::fs::create_dir_all(&cache_dir).map_err(PdfiumAutoError::CacheDir)?;

    let url = release_url(platform);
    info!("Downloading pdfium {} from {}", PDFIUM_VERSION, url);
    let archive = download_bytes(&url, on_progress)?;

    // Unpack beside the final name and rename, so a killed process never
    // leaves a truncated library that later looks cached.
    let lib_path = cache_dir.join(platform.lib_name);
    let partial = cache_dir.join(format!("{}.part", platform.lib_name));
    unpack_member(&archive, platform.member, &partial)?;
    std::fs::rename(&partial, &lib_path).map_err(PdfiumAutoError::CacheDir)?;

    info!("pdfium cached at {}", lib_path.display());
    Ok(lib_path)
}

fn download_bytes(
    url: &str,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<Vec<u8>, PdfiumAutoError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pdfium-auto/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| PdfiumAutoError::Download(e.to_string()))?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| PdfiumAutoError::Download(format!("GET {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(PdfiumAutoError::Download(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    let total = response.content_length();
    let mut buf = Vec::with_capacity(total.unwrap_or(0) as usize);
    let mut chunk = vec![0u8; READ_CHUNK];

    loop {
        match response.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if let Some(cb) = on_progress {
                    cb(buf.len() as u64, total);
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(PdfiumAutoError::Download(format!("Read error: {e}"))),
        }
    }

    debug!("Downloaded {} bytes", buf.len());
    Ok(buf)
}

/// Extract the single archive entry named `member` to `dest`.
fn unpack_member(archive: &[u8], member: &str, dest: &Path) -> Result<(), PdfiumAutoError> {
    use flate2::read::GzDecoder;
    use tar::Archive;

    let extract = |e: std::io::Error| PdfiumAutoError::Extract(e.to_string());
    let mut tar = Archive::new(GzDecoder::new(archive));

    for entry in tar.entries().map_err(extract)? {
        let mut entry = entry.map_err(extract)?;
        if entry.path().map_err(extract)?.as_ref() == Path::new(member) {
            entry.unpack(dest).map_err(extract)?;
            return Ok(());
        }
    }

    Err(PdfiumAutoError::Extract(format!(
        "'{member}' not found in archive"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};

    fn tgz_with(name: &str, contents: &[u8]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::fast()));
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, contents).unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn known_platforms_resolve() {
        let p = platform_for("linux", "x86_64").unwrap();
        assert_eq!(p.lib_name, "libpdfium.so");
        let p = platform_for("windows", "x86_64").unwrap();
        assert_eq!(p.member, "bin/pdfium.dll");
    }

    #[test]
    fn unknown_platform_is_an_error() {
        let err = platform_for("plan9", "mips").unwrap_err();
        assert!(err.to_string().contains("plan9/mips"));
    }

    #[test]
    fn release_url_names_version_and_archive() {
        let url = release_url(platform_for("macos", "aarch64").unwrap());
        assert!(url.ends_with("/chromium%2F7690/pdfium-mac-arm64.tgz"), "{url}");
    }

    #[test]
    fn cache_dir_is_versioned() {
        let d = pdfium_cache_dir();
        assert!(d.to_string_lossy().contains(PDFIUM_VERSION));
    }

    #[test]
    fn unpack_member_extracts_named_entry() {
        let dir = std::env::temp_dir().join(format!("pdfium-auto-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let dest = dir.join("libpdfium.so");

        let archive = tgz_with("lib/libpdfium.so", b"not really a library");
        unpack_member(&archive, "lib/libpdfium.so", &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"not really a library");

        let missing = unpack_member(&archive, "bin/pdfium.dll", &dir.join("x"));
        assert!(matches!(missing, Err(PdfiumAutoError::Extract(_))));

        std::fs::remove_dir_all(&dir).ok();
    }
}
