use std::path::{Path, PathBuf};
use std::thread;

use tracing::{debug, error, info};

use sandbridge_frame::Role;
use sandbridge_transport::{rendezvous_path, RendezvousListener};

use crate::endpoint::Endpoint;
use crate::error::Result;

/// Controller-side connection acceptor.
///
/// Binds the rendezvous socket under the controller's cache directory
/// and turns each incoming worker connection into a fresh [`Endpoint`]
/// labelled `worker-1`, `worker-2`, … in accept order. One acceptor
/// exists per controller process; workers connect exactly once, at
/// startup, and keep that single connection for their lifetime.
pub struct ConnectionAcceptor {
    listener: RendezvousListener,
    path: PathBuf,
    accepted: u64,
}

impl ConnectionAcceptor {
    /// Bind the rendezvous socket inside `cache_dir`.
    pub fn bind(cache_dir: impl AsRef<Path>) -> Result<Self> {
        let path = rendezvous_path(cache_dir.as_ref());
        let listener = RendezvousListener::bind(&path)?;
        info!(path = %path.display(), "accepting worker connections");
        Ok(Self {
            listener,
            path,
            accepted: 0,
        })
    }

    /// Path of the bound rendezvous socket, to hand to spawned workers.
    pub fn socket_path(&self) -> &Path {
        &self.path
    }

    /// Number of connections accepted so far.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Block until the next worker connects, returning its endpoint.
    pub fn accept(&mut self) -> Result<Endpoint> {
        let stream = self.listener.accept()?;
        self.accepted += 1;
        let label = format!("worker-{}", self.accepted);

        match stream.peer_credentials() {
            Some((uid, _gid, pid)) => debug!(label, pid, uid, "worker connected"),
            None => debug!(label, "worker connected (credentials unavailable)"),
        }

        Endpoint::from_stream(Role::Controller, label, stream)
    }

    /// Run the accept loop on a dedicated thread, invoking `hand_off`
    /// with each new endpoint.
    ///
    /// Failure to accept is unrecoverable for the controller: without
    /// the acceptor no worker can ever attach, so the loop logs the
    /// error and aborts the process.
    pub fn spawn<F>(mut self, mut hand_off: F) -> std::io::Result<thread::JoinHandle<()>>
    where
        F: FnMut(Endpoint) + Send + 'static,
    {
        thread::Builder::new()
            .name("connection-acceptor".into())
            .spawn(move || loop {
                match self.accept() {
                    Ok(endpoint) => hand_off(endpoint),
                    Err(err) => {
                        error!(%err, "accept failed; controller cannot continue");
                        std::process::abort();
                    }
                }
            })
    }
}

impl std::fmt::Debug for ConnectionAcceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionAcceptor")
            .field("path", &self.path)
            .field("accepted", &self.accepted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::mpsc;
    use std::thread;

    use sandbridge_frame::MessageKind;
    use sandbridge_wire::Value;

    use super::*;
    use crate::dispatcher::Dispatcher;
    use crate::message::ContentReady;

    fn make_cache_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "sbr-acc-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir
    }

    #[test]
    fn accepts_workers_with_sequential_labels() {
        let dir = make_cache_dir("labels");
        let mut acceptor = ConnectionAcceptor::bind(&dir).expect("acceptor should bind");
        let path = acceptor.socket_path().to_path_buf();

        let connector = thread::spawn(move || {
            let first = Endpoint::connect(&path).expect("first worker should connect");
            let second = Endpoint::connect(&path).expect("second worker should connect");
            (first, second)
        });

        let first = acceptor.accept().expect("first accept should succeed");
        let second = acceptor.accept().expect("second accept should succeed");
        assert_eq!(first.peer_label(), "worker-1");
        assert_eq!(second.peer_label(), "worker-2");
        assert_eq!(first.role(), Role::Controller);
        assert_eq!(acceptor.accepted(), 2);

        let (worker_a, worker_b) = connector.join().expect("connector thread should finish");
        assert_eq!(worker_a.role(), Role::Worker);
        assert_eq!(worker_b.peer_label(), "controller");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn spawned_acceptor_hands_off_working_endpoints() {
        let dir = make_cache_dir("spawn");
        let acceptor = ConnectionAcceptor::bind(&dir).expect("acceptor should bind");
        let path = acceptor.socket_path().to_path_buf();

        let (tx, rx) = mpsc::channel();
        let _handle = acceptor
            .spawn(move |endpoint| {
                let _ = tx.send(endpoint);
            })
            .expect("acceptor thread should spawn");

        let mut worker = Endpoint::connect(&path).expect("worker should connect");
        worker
            .send(MessageKind::ContentReady, &ContentReady(3).encode())
            .expect("worker send should succeed");

        let mut controller = rx.recv().expect("acceptor should hand off an endpoint");
        assert_eq!(controller.peer_label(), "worker-1");

        let mut dispatcher = Dispatcher::new();
        dispatcher.register(MessageKind::ContentReady, |_, payload| {
            let ready = ContentReady::decode(&payload)?;
            assert_eq!(ready.0, 3);
            Ok(())
        });
        controller
            .pump(&mut dispatcher)
            .expect("handed-off endpoint should dispatch");

        // The link works in the other direction too.
        controller
            .send_values(MessageKind::ModuleRequire, &[
                Value::Str("formfiller".into()),
                Value::Int(3),
            ])
            .expect("controller send should succeed");
        drop(controller);

        let mut worker_dispatcher = Dispatcher::new();
        worker_dispatcher.register(MessageKind::ModuleRequire, |_, _| Ok(()));
        worker
            .serve(&mut worker_dispatcher)
            .expect("worker serve should end cleanly");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
