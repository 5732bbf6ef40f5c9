//! Ferry integration test harness.
//!
//! Server and client run in-process over loopback TCP. Every test gets its
//! own scratch directories and its own listener on an ephemeral port, so
//! tests are independent and need no external setup.

mod transfer;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use ferry_core::config::{FerryConfig, NetworkConfig, StorageConfig};
use ferry_core::wire::TransferRequest;
use ferry_ctl::TransferOutcome;

// ── Harness ───────────────────────────────────────────────────────────────────

/// One running ferry server plus its scratch directories.
pub struct TestServer {
    pub addr: SocketAddr,
    pub serve_root: PathBuf,
    pub output_dir: PathBuf,
    handle: JoinHandle<()>,
    _serve: TempDir,
    _out: TempDir,
}

impl TestServer {
    /// Bind an ephemeral port and serve `transfers` connections, one at a
    /// time — the same sequential accept discipline as ferryd's main loop.
    pub async fn start(transfers: usize) -> Self {
        let serve = tempfile::tempdir().expect("failed to create serve dir");
        let out = tempfile::tempdir().expect("failed to create output dir");
        let serve_root = serve.path().to_path_buf();
        let output_dir = out.path().to_path_buf();

        let config = FerryConfig {
            network: NetworkConfig::default(),
            storage: StorageConfig {
                serve_root: serve_root.clone(),
                output_dir: output_dir.clone(),
            },
        };

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind test listener");
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            for _ in 0..transfers {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(e) => {
                        eprintln!("accept failed: {e}");
                        return;
                    }
                };
                if let Err(e) = ferryd::transfer::serve_connection(stream, &config).await {
                    eprintln!("transfer failed: {e:#}");
                }
            }
        });

        Self {
            addr,
            serve_root,
            output_dir,
            handle,
            _serve: serve,
            _out: out,
        }
    }

    /// Place a file into the served directory.
    pub fn stage_file(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.serve_root.join(name);
        std::fs::write(&path, content).expect("failed to stage file");
        path
    }

    /// Run one client transfer against this server.
    pub async fn fetch(
        &self,
        file: &str,
        chunk_count: u32,
        output: &Path,
    ) -> Result<TransferOutcome> {
        let request = TransferRequest::new(file, chunk_count)?;
        let stream = TcpStream::connect(self.addr).await?;
        ferry_ctl::fetch(stream, &request, output).await
    }

    /// Wait for the server task to finish its planned transfers.
    pub async fn join(self) {
        self.handle.await.expect("server task panicked");
        // Tests read staged and output files after join; keep the scratch
        // directories instead of deleting them when the guards drop.
        let _ = self._serve.keep();
        let _ = self._out.keep();
    }
}
