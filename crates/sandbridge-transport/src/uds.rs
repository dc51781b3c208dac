use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::LinkStream;

/// Fixed file name of the rendezvous socket inside the cache directory.
pub const RENDEZVOUS_FILE_NAME: &str = "socket";

/// Derive the rendezvous address for one controller run.
///
/// The address is process-wide: the controller binds it once and every
/// worker spawned during that run connects to the same path.
pub fn rendezvous_path(cache_dir: impl AsRef<Path>) -> PathBuf {
    cache_dir.as_ref().join(RENDEZVOUS_FILE_NAME)
}

/// Listening side of the controller/worker rendezvous.
///
/// Binds a filesystem-path Unix domain socket with a small backlog and
/// accepts one worker connection per call. A stale socket left behind by
/// a previous controller run is removed before binding; the path is
/// unlinked again on drop if its inode identity is unchanged.
pub struct RendezvousListener {
    listener: UnixListener,
    path: PathBuf,
    created_inode: Option<(u64, u64)>,
}

impl RendezvousListener {
    /// Permission mode for the created socket path. The rendezvous is
    /// private to the controller and the workers it spawns.
    pub const SOCKET_MODE: u32 = 0o600;

    /// Accept backlog. Workers connect one at a time, re-connecting only
    /// on crash/respawn, so the queue stays short.
    pub const BACKLOG_HINT: i32 = 5;

    /// Maximum socket path length.
    /// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Bind and listen on the rendezvous path.
    ///
    /// If the path already exists and is a socket, it is removed first
    /// (stale rendezvous cleanup). An existing non-socket file is never
    /// removed; binding fails instead.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let path_bytes = path.as_os_str().len();
        if path_bytes >= Self::MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path,
                len: path_bytes,
                max: Self::MAX_PATH_LEN,
            });
        }

        if path.exists() {
            let metadata = std::fs::symlink_metadata(&path).map_err(|e| TransportError::Bind {
                path: path.clone(),
                source: e,
            })?;
            if metadata.file_type().is_socket() {
                debug!(?path, "removing stale rendezvous socket");
                std::fs::remove_file(&path).map_err(|e| TransportError::Bind {
                    path: path.clone(),
                    source: e,
                })?;
            } else {
                return Err(TransportError::Bind {
                    path: path.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        "existing path is not a unix socket",
                    ),
                });
            }
        }

        let listener = UnixListener::bind(&path).map_err(|e| TransportError::Bind {
            path: path.clone(),
            source: e,
        })?;

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(Self::SOCKET_MODE))
            .map_err(|e| TransportError::Bind {
                path: path.clone(),
                source: e,
            })?;

        shrink_backlog(&listener, Self::BACKLOG_HINT);

        let created_metadata =
            std::fs::symlink_metadata(&path).map_err(|e| TransportError::Bind {
                path: path.clone(),
                source: e,
            })?;
        let created_inode = Some((created_metadata.dev(), created_metadata.ino()));

        info!(?path, "listening on rendezvous socket");

        Ok(Self {
            listener,
            path,
            created_inode,
        })
    }

    /// Accept an incoming worker connection (blocking).
    pub fn accept(&self) -> Result<LinkStream> {
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!("accepted worker connection");
        Ok(LinkStream::from_unix(stream))
    }

    /// Connect to a listening rendezvous socket (blocking, worker side).
    pub fn connect(path: impl AsRef<Path>) -> Result<LinkStream> {
        let path = path.as_ref();
        let stream =
            std::os::unix::net::UnixStream::connect(path).map_err(|e| TransportError::Connect {
                path: path.to_path_buf(),
                source: e,
            })?;
        debug!(?path, "connected to rendezvous socket");
        Ok(LinkStream::from_unix(stream))
    }

    /// The path this listener is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Re-issue `listen(2)` with a small backlog. Best-effort: the standard
/// library binds with a larger default, and a failure here only means the
/// kernel keeps that default.
fn shrink_backlog(listener: &UnixListener, backlog: i32) {
    use std::os::fd::AsRawFd;

    // SAFETY: `listener` owns an open, listening socket descriptor;
    // calling listen(2) again only adjusts the backlog.
    let rc = unsafe { libc::listen(listener.as_raw_fd(), backlog) };
    if rc != 0 {
        debug!("listen backlog adjustment failed; keeping default");
    }
}

impl Drop for RendezvousListener {
    fn drop(&mut self) {
        if let Some((expected_dev, expected_ino)) = self.created_inode {
            if let Ok(metadata) = std::fs::symlink_metadata(&self.path) {
                if metadata.file_type().is_socket()
                    && metadata.dev() == expected_dev
                    && metadata.ino() == expected_ino
                {
                    debug!(path = ?self.path, "cleaning up rendezvous socket");
                    let _ = std::fs::remove_file(&self.path);
                } else {
                    debug!(
                        path = ?self.path,
                        "socket path identity changed; skipping cleanup"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    fn make_cache_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sbr-uds-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn rendezvous_path_appends_fixed_name() {
        let path = rendezvous_path("/run/shell-cache");
        assert_eq!(path, PathBuf::from("/run/shell-cache/socket"));
    }

    #[test]
    fn bind_accept_connect() {
        let dir = make_cache_dir("roundtrip");
        let sock_path = rendezvous_path(&dir);

        let listener = RendezvousListener::bind(&sock_path).unwrap();
        assert!(sock_path.exists());

        let path_clone = sock_path.clone();
        let handle = std::thread::spawn(move || {
            let mut worker = RendezvousListener::connect(&path_clone).unwrap();
            worker.write_all(b"ready").unwrap();
        });

        let mut link = listener.accept().unwrap();
        let mut buf = [0u8; 5];
        link.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ready");

        handle.join().unwrap();

        drop(listener);
        assert!(
            !sock_path.exists(),
            "socket file should be cleaned up on drop"
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn rebind_replaces_stale_socket() {
        let dir = make_cache_dir("stale");
        let sock_path = rendezvous_path(&dir);

        // Simulate a crashed previous run: bind, then leak the socket file.
        let first = RendezvousListener::bind(&sock_path).unwrap();
        std::mem::forget(first);
        assert!(sock_path.exists());

        let second = RendezvousListener::bind(&sock_path).unwrap();
        assert!(sock_path.exists());

        drop(second);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn path_too_long() {
        let long_path = "/tmp/".to_string() + &"a".repeat(200) + ".sock";
        let result = RendezvousListener::bind(&long_path);
        assert!(matches!(result, Err(TransportError::PathTooLong { .. })));
    }

    #[test]
    fn bind_hardens_permissions() {
        let dir = make_cache_dir("perms");
        let sock_path = rendezvous_path(&dir);

        let listener = RendezvousListener::bind(&sock_path).unwrap();
        let mode = std::fs::metadata(&sock_path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);

        drop(listener);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bind_rejects_existing_non_socket_file() {
        let dir = make_cache_dir("nonsock");
        let sock_path = rendezvous_path(&dir);
        std::fs::write(&sock_path, b"regular-file").unwrap();

        let result = RendezvousListener::bind(&sock_path);
        assert!(matches!(result, Err(TransportError::Bind { .. })));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn drop_does_not_remove_replaced_path() {
        let dir = make_cache_dir("droprace");
        let sock_path = rendezvous_path(&dir);

        let listener = RendezvousListener::bind(&sock_path).unwrap();
        assert!(sock_path.exists());

        // Replace path while listener is alive.
        std::fs::remove_file(&sock_path).unwrap();
        std::fs::write(&sock_path, b"replacement-file").unwrap();

        drop(listener);
        assert!(
            sock_path.exists(),
            "drop must not remove path if inode identity changed"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }
}
