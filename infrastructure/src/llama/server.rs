//! `llama-server` child process lifecycle.

use super::error::{LlamaError, Result};
use super::protocol::ChatRequest;
use pocketllm_application::RuntimeOptions;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, trace};

const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Launch settings for `llama-server`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerLaunch {
    /// Executable name or path
    pub binary: String,
    pub host: String,
    /// 0 picks a free port
    pub port: u16,
    pub load_timeout: Duration,
}

impl Default for ServerLaunch {
    fn default() -> Self {
        Self {
            binary: "llama-server".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            load_timeout: Duration::from_secs(120),
        }
    }
}

/// A running `llama-server` with one model loaded.
///
/// The process is killed when this value is dropped, and on Linux also when
/// the parent process dies.
pub struct LlamaServer {
    child: Mutex<Child>,
    base_url: String,
    client: reqwest::Client,
}

impl LlamaServer {
    /// Spawn the server for `model_path` and wait until it reports healthy.
    pub async fn start(
        launch: &ServerLaunch,
        model_path: &Path,
        options: &RuntimeOptions,
    ) -> Result<Self> {
        let port = match launch.port {
            0 => free_port(&launch.host)?,
            port => port,
        };
        let args = server_args(model_path, options, &launch.host, port);
        debug!("Spawning {} {}", launch.binary, args.join(" "));

        let mut cmd = Command::new(&launch.binary);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Linux: request kernel to send SIGTERM to child when parent dies.
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        let mut child = cmd.spawn()?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr));
        }

        let server = Self {
            child: Mutex::new(child),
            base_url: format!("http://{}:{}", launch.host, port),
            client: reqwest::Client::new(),
        };
        server.wait_until_ready(launch.load_timeout).await?;
        info!("llama-server ready at {}", server.base_url);
        Ok(server)
    }

    /// Open a streaming chat completion.
    pub async fn chat_stream(&self, body: &ChatRequest<'_>) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlamaError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Kill the process and wait for it to exit.
    pub async fn stop(&self) -> Result<()> {
        let mut child = self.child.lock().await;
        if child.try_wait()?.is_none() {
            child.kill().await?;
        }
        debug!("llama-server at {} stopped", self.base_url);
        Ok(())
    }

    async fn wait_until_ready(&self, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.poll_health())
            .await
            .map_err(|_| LlamaError::LoadTimeout(timeout))?
    }

    /// Poll `/health` until the model is loaded or the process exits.
    async fn poll_health(&self) -> Result<()> {
        let health = format!("{}/health", self.base_url);
        loop {
            if let Some(status) = self.child.lock().await.try_wait()? {
                return Err(LlamaError::ExitedEarly(status.to_string()));
            }
            match self.client.get(&health).send().await {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => trace!(status = %response.status(), "Model still loading"),
                Err(e) => trace!("llama-server not reachable yet: {}", e),
            }
            tokio::time::sleep(HEALTH_POLL_INTERVAL).await;
        }
    }
}

impl Drop for LlamaServer {
    fn drop(&mut self) {
        debug!("LlamaServer dropping, killing child process");
        let _ = self.child.get_mut().start_kill();
    }
}

/// Command-line arguments for `llama-server`.
pub fn server_args(
    model_path: &Path,
    options: &RuntimeOptions,
    host: &str,
    port: u16,
) -> Vec<String> {
    let mut args = vec![
        "-m".to_string(),
        model_path.display().to_string(),
        "-c".to_string(),
        options.context_length.to_string(),
        "-ngl".to_string(),
        options.gpu_layers.to_string(),
    ];
    if options.use_mlock {
        args.push("--mlock".to_string());
    }
    args.extend([
        "--host".to_string(),
        host.to_string(),
        "--port".to_string(),
        port.to_string(),
    ]);
    args
}

fn free_port(host: &str) -> std::io::Result<u16> {
    let listener = std::net::TcpListener::bind((host, 0))?;
    Ok(listener.local_addr()?.port())
}

async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        trace!(target: "llama_server", "{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_args() {
        let args = server_args(
            Path::new("/models/a.gguf"),
            &RuntimeOptions::default(),
            "127.0.0.1",
            8080,
        );
        assert_eq!(
            args,
            vec![
                "-m", "/models/a.gguf", "-c", "2048", "-ngl", "1", "--mlock", "--host",
                "127.0.0.1", "--port", "8080",
            ]
        );
    }

    #[test]
    fn test_server_args_without_mlock() {
        let options = RuntimeOptions {
            use_mlock: false,
            ..RuntimeOptions::default()
        };
        let args = server_args(Path::new("m.gguf"), &options, "0.0.0.0", 1);
        assert!(!args.contains(&"--mlock".to_string()));
    }

    #[test]
    fn test_free_port_is_nonzero() {
        assert_ne!(free_port("127.0.0.1").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_binary_fails_to_spawn() {
        let launch = ServerLaunch {
            binary: "/nonexistent/llama-server".to_string(),
            ..ServerLaunch::default()
        };
        let err = LlamaServer::start(&launch, Path::new("m.gguf"), &RuntimeOptions::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, LlamaError::SpawnError(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_exiting_early_is_reported() {
        let launch = ServerLaunch {
            binary: "false".to_string(),
            load_timeout: Duration::from_secs(10),
            ..ServerLaunch::default()
        };
        let err = LlamaServer::start(&launch, Path::new("m.gguf"), &RuntimeOptions::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, LlamaError::ExitedEarly(_)));
    }
}
