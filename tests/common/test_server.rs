use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::LazyLock;

use tempfile::TempDir;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "Admin123456";

pub struct TestServer {
    pub temp_dir: TempDir,
    pub base_url: String,
    server_process: Option<Child>,
}

static BUILD_RELEASE: LazyLock<()> = LazyLock::new(|| {
    let build_status = Command::new("cargo")
        .args(["build", "--release"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("build release binary");
    assert!(build_status.success(), "Failed to build release binary");
});

fn binary() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("target/release/docvault")
}

impl TestServer {
    pub async fn start() -> Self {
        LazyLock::force(&BUILD_RELEASE);

        let temp_dir = TempDir::new().expect("create temp dir");
        let data_dir = temp_dir.path();

        let init_output = Command::new(binary())
            .args(["admin", "init", "--data-dir"])
            .arg(data_dir)
            .args(["--email", ADMIN_EMAIL, "--password", ADMIN_PASSWORD])
            .arg("--non-interactive")
            .output()
            .expect("run init");
        assert!(
            init_output.status.success(),
            "Failed to initialize database"
        );

        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);

        let base_url = format!("http://127.0.0.1:{}", port);

        let server_process = Command::new(binary())
            .args(["serve", "--data-dir"])
            .arg(data_dir)
            .args(["--host", "127.0.0.1", "--port"])
            .arg(port.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("start server");

        Self::wait_for_ready(&base_url).await;

        Self {
            temp_dir,
            base_url,
            server_process: Some(server_process),
        }
    }

    async fn wait_for_ready(base_url: &str) {
        let client = reqwest::Client::new();
        for _ in 0..50 {
            if client
                .get(format!("{}/health", base_url))
                .send()
                .await
                .is_ok()
            {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
        panic!("Server did not become ready");
    }

    pub fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Bucket directory blobs are listed from; tests drop files here the way
    /// operators would out-of-band.
    pub fn bucket_dir(&self) -> PathBuf {
        self.data_dir().join("storage").join("documents")
    }

    /// Provisions an account through the admin CLI, the way identities enter
    /// the system in production.
    pub fn create_user(&self, email: &str, password: &str, full_name: Option<&str>) {
        let mut cmd = Command::new(binary());
        cmd.args(["admin", "create-user", "--data-dir"])
            .arg(self.data_dir())
            .args(["--email", email, "--password", password]);
        if let Some(name) = full_name {
            cmd.args(["--full-name", name]);
        }
        let output = cmd.output().expect("run create-user");
        assert!(
            output.status.success(),
            "Failed to create user: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    /// Logs in over HTTP and returns the session token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let client = reqwest::Client::new();
        let resp: serde_json::Value = client
            .post(format!("{}/api/v1/auth/login", self.base_url))
            .json(&serde_json::json!({"email": email, "password": password}))
            .send()
            .await
            .expect("login request")
            .json()
            .await
            .expect("parse login response");

        resp["data"]["token"]
            .as_str()
            .unwrap_or_else(|| panic!("no token in login response: {resp}"))
            .to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(mut process) = self.server_process.take() {
            let _ = process.kill();
            let _ = process.wait();
        }
    }
}
