//! Test server management.
//!
//! Spawns and manages stormerd instances for integration testing.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

/// A test server instance.
pub struct TestServer {
    child: Child,
    port: u16,
    // Removed on drop, after the child is gone.
    data_dir: TempDir,
}

impl TestServer {
    /// Spawn a new test server with the default test configuration.
    pub async fn spawn(port: u16) -> anyhow::Result<Self> {
        Self::spawn_with(port, "").await
    }

    /// Spawn a test server, appending `extra` TOML to the generated config.
    pub async fn spawn_with(port: u16, extra: &str) -> anyhow::Result<Self> {
        let data_dir = tempfile::Builder::new()
            .prefix(&format!("stormer-test-{port}-"))
            .tempdir()?;

        let public = data_dir.path().join("public");
        std::fs::create_dir_all(&public)?;
        std::fs::write(
            public.join("index.html"),
            "<!doctype html><title>Stormer</title>",
        )?;

        let config_path = data_dir.path().join("config.toml");
        let config_content = format!(
            r#"
[server]
name = "test"
environment = "test"

[listen]
address = "127.0.0.1:{port}"
static_dir = "{static_dir}"

[limits]
message_rate = 1000.0
message_burst = 1000.0
{extra}
"#,
            static_dir = public.display(),
        );
        std::fs::write(&config_path, config_content)?;

        let binary_path = PathBuf::from(env!("CARGO_BIN_EXE_stormerd"));
        let child = Command::new(&binary_path)
            .arg(&config_path)
            .env_remove("PORT")
            .env_remove("STORMER_ENV")
            .stdout(Stdio::null())
            .spawn()?;

        let server = Self {
            child,
            port,
            data_dir,
        };

        // Wait for server to start listening
        server.wait_until_ready().await?;

        Ok(server)
    }

    /// Wait until the server is accepting connections.
    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        for _ in 0..30 {
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("Server failed to start within 3 seconds")
    }

    /// Base URL for HTTP requests.
    pub fn http_url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    /// WebSocket endpoint URL.
    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/ws", self.port)
    }

    #[allow(dead_code)]
    pub fn data_dir(&self) -> &std::path::Path {
        self.data_dir.path()
    }

    /// Create a new test client connected to this server.
    pub async fn connect(&self) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::connect(&self.ws_url()).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
