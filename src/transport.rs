//! Remote transfer sessions
//!
//! [`RemoteSession`] is the seam between the synchronizer and the wire. The
//! FTP implementation owns one control connection; it is used by exactly one
//! caller at a time and operations run strictly one after another.

use anyhow::{anyhow, Context, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;
use suppaftp::native_tls::TlsConnector;
use suppaftp::types::FileType;
use suppaftp::{NativeTlsConnector, NativeTlsFtpStream};
use tracing::{debug, info, warn};

use crate::config::{FtpConfig, TransferOptions};
use crate::error::DeployError;

/// A connected, authenticated transfer session
#[cfg_attr(test, mockall::automock)]
pub trait RemoteSession {
    /// Create `path` and any missing parents; succeeds if it already exists
    fn ensure_dir(&mut self, path: &str) -> Result<()>;

    /// Upload a local file to `remote_path`, returning the bytes sent
    fn upload_file(&mut self, local_path: &Path, remote_path: &str) -> Result<u64>;

    /// Close the session; calling it again is a no-op
    fn disconnect(&mut self) -> Result<()>;
}

/// FTP or explicit-FTPS session backed by suppaftp
pub struct FtpSession {
    stream: Option<NativeTlsFtpStream>,
    /// Login directory, used to anchor relative remote paths
    home: String,
    /// Directories known to exist on the server
    known_dirs: HashSet<String>,
    retry_attempts: u32,
}

impl FtpSession {
    /// Connect, optionally upgrade to TLS, log in and switch to binary mode
    pub fn connect(ftp: &FtpConfig, options: &TransferOptions) -> Result<Self, DeployError> {
        info!("Connecting to FTP server: {}:{}", ftp.host, ftp.port);

        let address = resolve_address(&ftp.host, ftp.port)
            .map_err(|e| DeployError::Connection(e.to_string()))?;

        let connect_timeout = Duration::from_secs(options.connect_timeout.max(1));
        let mut stream = NativeTlsFtpStream::connect_timeout(address, connect_timeout)
            .map_err(|e| DeployError::Connection(format!("{}:{}: {}", ftp.host, ftp.port, e)))?;

        if ftp.secure {
            debug!("Upgrading control connection to TLS");
            let connector = TlsConnector::new()
                .map_err(|e| DeployError::Connection(format!("TLS setup failed: {}", e)))?;
            stream = stream
                .into_secure(NativeTlsConnector::from(connector), &ftp.host)
                .map_err(|e| DeployError::Connection(format!("TLS handshake failed: {}", e)))?;
        }

        stream
            .login(ftp.user.as_str(), ftp.password.as_str())
            .map_err(|e| DeployError::Connection(format!("login as '{}' failed: {}", ftp.user, e)))?;

        // Uploads are byte-for-byte; never let the server translate line endings
        stream
            .transfer_type(FileType::Binary)
            .map_err(|e| DeployError::Connection(format!("failed to set binary mode: {}", e)))?;

        let upload_timeout = Duration::from_secs(options.upload_timeout.max(1));
        if let Err(e) = stream
            .get_ref()
            .set_read_timeout(Some(upload_timeout))
            .and_then(|_| stream.get_ref().set_write_timeout(Some(upload_timeout)))
        {
            warn!("Failed to apply upload timeout: {}", e);
        }

        let home = stream
            .pwd()
            .map(|dir| normalize_remote_path(&dir))
            .unwrap_or_else(|_| "/".to_string());

        info!("Connected to FTP server successfully");

        Ok(Self {
            stream: Some(stream),
            home,
            known_dirs: HashSet::new(),
            retry_attempts: options.retry_attempts,
        })
    }

    fn absolute(&self, path: &str) -> String {
        if path.starts_with('/') {
            normalize_remote_path(path)
        } else {
            remote_join(&self.home, path)
        }
    }

    fn put_once(&mut self, local_path: &Path, remote_path: &str) -> Result<u64> {
        let file = File::open(local_path)
            .with_context(|| format!("Failed to open {}", local_path.display()))?;
        let mut reader = BufReader::new(file);

        let stream = self.stream.as_mut().context("FTP session is closed")?;
        let bytes = stream
            .put_file(remote_path, &mut reader)
            .with_context(|| format!("STOR {} failed", remote_path))?;

        Ok(bytes)
    }
}

impl RemoteSession for FtpSession {
    fn ensure_dir(&mut self, path: &str) -> Result<()> {
        let target = self.absolute(path);
        if self.known_dirs.contains(&target) {
            return Ok(());
        }

        let Self {
            stream, known_dirs, ..
        } = self;
        let stream = stream.as_mut().context("FTP session is closed")?;

        stream.cwd("/").context("Failed to change to remote root")?;

        let mut current = String::from("/");
        for part in target.split('/').filter(|part| !part.is_empty()) {
            current = remote_join(&current, part);

            if stream.cwd(part).is_err() {
                debug!("Creating remote directory {}", current);
                stream
                    .mkdir(part)
                    .with_context(|| format!("MKD {} failed", current))?;
                stream
                    .cwd(part)
                    .with_context(|| format!("CWD {} failed", current))?;
            }

            known_dirs.insert(current.clone());
        }

        Ok(())
    }

    fn upload_file(&mut self, local_path: &Path, remote_path: &str) -> Result<u64> {
        let remote_path = self.absolute(remote_path);
        let mut attempt = 0;

        loop {
            match self.put_once(local_path, &remote_path) {
                Ok(bytes) => return Ok(bytes),
                Err(e) if attempt < self.retry_attempts => {
                    attempt += 1;
                    warn!(
                        "Upload of {} failed, retrying ({}/{}): {:#}",
                        remote_path, attempt, self.retry_attempts, e
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn disconnect(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            debug!("Closing FTP session");
            stream.quit().context("QUIT failed")?;
        }
        Ok(())
    }
}

impl Drop for FtpSession {
    fn drop(&mut self) {
        if let Err(e) = self.disconnect() {
            debug!("FTP session closed uncleanly: {:#}", e);
        }
    }
}

/// Session that logs what would be transferred without touching the network
#[derive(Debug, Default)]
pub struct DryRunSession {
    closed: bool,
}

impl DryRunSession {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RemoteSession for DryRunSession {
    fn ensure_dir(&mut self, path: &str) -> Result<()> {
        if self.closed {
            return Err(anyhow!("Dry-run session is closed"));
        }
        debug!("[dry-run] Would ensure remote directory {}", path);
        Ok(())
    }

    fn upload_file(&mut self, local_path: &Path, remote_path: &str) -> Result<u64> {
        if self.closed {
            return Err(anyhow!("Dry-run session is closed"));
        }
        let size = std::fs::metadata(local_path)
            .with_context(|| format!("Failed to stat {}", local_path.display()))?
            .len();
        info!("[dry-run] Would upload {} -> {}", local_path.display(), remote_path);
        Ok(size)
    }

    fn disconnect(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Resolve `host:port` to the first socket address
pub fn resolve_address(host: &str, port: u16) -> Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .with_context(|| format!("Failed to resolve {}:{}", host, port))?
        .next()
        .ok_or_else(|| anyhow!("No address found for {}:{}", host, port))
}

/// Collapse repeated and trailing slashes and `.` components
///
/// An empty relative path becomes `.`, an empty absolute path becomes `/`.
pub fn normalize_remote_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let parts: Vec<&str> = path
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();

    match (absolute, parts.is_empty()) {
        (true, true) => "/".to_string(),
        (false, true) => ".".to_string(),
        (true, false) => format!("/{}", parts.join("/")),
        (false, false) => parts.join("/"),
    }
}

/// Join a relative path onto a remote base directory
pub fn remote_join(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        return normalize_remote_path(base);
    }
    if base.is_empty() || base == "." {
        return normalize_remote_path(relative);
    }
    normalize_remote_path(&format!("{}/{}", base, relative))
}

/// Parent directory of a remote path
pub fn remote_parent(path: &str) -> String {
    let normalized = normalize_remote_path(path);
    match normalized.rfind('/') {
        Some(0) => "/".to_string(),
        Some(index) => normalized[..index].to_string(),
        None => ".".to_string(),
    }
}
