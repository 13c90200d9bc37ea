use std::process::{Child, Command, Stdio};

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{json, Value};
use tracing::{debug, warn};

#[cfg(unix)]
use rand::{distributions::Alphanumeric, Rng};
#[cfg(unix)]
use std::io::{BufRead, BufReader, Write};
#[cfg(unix)]
use std::os::unix::net::UnixStream;
#[cfg(unix)]
use std::time::Duration;

use crate::player::{MediaSurface, SurfaceFactory};

#[cfg(unix)]
const CONNECT_RETRIES: usize = 20;
#[cfg(unix)]
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(50);
#[cfg(unix)]
const IPC_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct Launcher {
    command: Vec<String>,
}

impl Launcher {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl SurfaceFactory for Launcher {
    fn open(&self, video_url: &str, title: &str) -> Result<Box<dyn MediaSurface>> {
        let surface = MpvSurface::spawn(&self.command, video_url, title)?;
        Ok(Box::new(surface))
    }
}

pub struct MpvSurface {
    child: Child,
    ipc_path: String,
}

impl MpvSurface {
    fn spawn(command: &[String], video_url: &str, title: &str) -> Result<Self> {
        if video_url.trim().is_empty() {
            bail!("video URL missing");
        }
        let Some((program, extra)) = command.split_first() else {
            bail!("player command is empty");
        };
        let ipc_path = unique_ipc_path()?;
        remove_stale(&ipc_path);

        let mut args = extra.to_vec();
        args.extend(player_args(video_url, title, &ipc_path));
        debug!(?args, "spawning player");

        let child = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("launch {program} to play {video_url}"))?;
        Ok(Self { child, ipc_path })
    }

    fn request(&mut self, command: Value) -> Result<Value> {
        if let Some(status) = self.child.try_wait().context("poll player status")? {
            bail!("player exited with status {status}");
        }
        let payload = json!({ "command": command, "request_id": 1 });
        let serialized = serde_json::to_string(&payload).context("serialize mpv command")?;
        let reply = send_ipc_request(&self.ipc_path, &serialized)?;
        match reply.get("error").and_then(Value::as_str) {
            Some("success") | None => Ok(reply.get("data").cloned().unwrap_or(Value::Null)),
            Some(other) => Err(anyhow!("mpv rejected command: {other}")),
        }
    }
}

impl MediaSurface for MpvSurface {
    fn is_paused(&mut self) -> Result<bool> {
        let data = self.request(json!(["get_property", "pause"]))?;
        data.as_bool()
            .ok_or_else(|| anyhow!("unexpected pause property {data}"))
    }

    fn play(&mut self) -> Result<()> {
        self.request(json!(["set_property", "pause", false]))
            .map(|_| ())
    }

    fn pause(&mut self) -> Result<()> {
        self.request(json!(["set_property", "pause", true]))
            .map(|_| ())
    }
}

impl Drop for MpvSurface {
    fn drop(&mut self) {
        if let Err(err) = self.child.kill() {
            if err.kind() != std::io::ErrorKind::InvalidInput {
                warn!("failed to stop player: {err}");
            }
        }
        let _ = self.child.wait();
        remove_stale(&self.ipc_path);
    }
}

fn player_args(video_url: &str, title: &str, ipc_path: &str) -> Vec<String> {
    let mut args = vec![
        "--pause".to_string(),
        "--force-window=yes".to_string(),
        "--keep-open=no".to_string(),
        "--loop-file=inf".to_string(),
        "--really-quiet".to_string(),
        "--idle=no".to_string(),
        "--no-config".to_string(),
        "--ytdl=no".to_string(),
        format!("--input-ipc-server={ipc_path}"),
    ];
    if !title.trim().is_empty() {
        args.push(format!("--force-media-title={}", title.trim()));
    }
    args.push("--".to_string());
    args.push(video_url.to_string());
    args
}

#[cfg(unix)]
fn send_ipc_request(path: &str, serialized: &str) -> Result<Value> {
    let mut stream = connect(path)?;
    stream
        .set_read_timeout(Some(IPC_TIMEOUT))
        .context("set mpv IPC timeout")?;
    stream
        .write_all(serialized.as_bytes())
        .context("write mpv IPC command")?;
    stream
        .write_all(b"\n")
        .context("write mpv IPC command terminator")?;

    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let line = line.context("read mpv IPC reply")?;
        let value: Value = match serde_json::from_str(&line) {
            Ok(value) => value,
            Err(_) => continue,
        };
        // mpv interleaves event lines with replies.
        if value.get("request_id").and_then(Value::as_i64) == Some(1) {
            return Ok(value);
        }
    }
    Err(anyhow!("mpv closed IPC socket without replying"))
}

#[cfg(unix)]
fn connect(path: &str) -> Result<UnixStream> {
    let mut last_err = None;
    for _ in 0..CONNECT_RETRIES {
        match UnixStream::connect(path) {
            Ok(stream) => return Ok(stream),
            Err(err) => {
                last_err = Some(err);
                std::thread::sleep(CONNECT_RETRY_DELAY);
            }
        }
    }
    match last_err {
        Some(err) => Err(anyhow!(err)).with_context(|| format!("connect to mpv IPC socket {path}")),
        None => Err(anyhow!("connect to mpv IPC socket {path}")),
    }
}

#[cfg(not(unix))]
fn send_ipc_request(_path: &str, _serialized: &str) -> Result<Value> {
    Err(anyhow!("Video controls are not supported on this platform."))
}

#[cfg(unix)]
fn unique_ipc_path() -> Result<String> {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();
    let mut path = std::env::temp_dir();
    path.push(format!("sorts-mpv-{}-{suffix}.sock", std::process::id()));
    Ok(path.to_string_lossy().to_string())
}

#[cfg(not(unix))]
fn unique_ipc_path() -> Result<String> {
    Err(anyhow!("Video controls are not supported on this platform."))
}

fn remove_stale(path: &str) {
    if let Err(err) = std::fs::remove_file(path) {
        if err.kind() != std::io::ErrorKind::NotFound {
            debug!("failed to remove mpv ipc path {path}: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_start_paused_with_ipc() {
        let args = player_args("https://cdn.test/1.mp4", " Jump rope ", "/tmp/x.sock");
        assert!(args.contains(&"--pause".to_string()));
        assert!(args.contains(&"--input-ipc-server=/tmp/x.sock".to_string()));
        assert!(args.contains(&"--force-media-title=Jump rope".to_string()));
        assert_eq!(args[args.len() - 2..], ["--", "https://cdn.test/1.mp4"]);
    }

    #[test]
    fn dash_prefixed_url_stays_positional() {
        let args = player_args("--script=/tmp/evil.lua", "Trick", "/tmp/x.sock");
        let separator = args.iter().position(|arg| arg == "--").unwrap();
        assert_eq!(separator, args.len() - 2);
        assert_eq!(args[separator + 1], "--script=/tmp/evil.lua");
        assert!(args[..separator]
            .iter()
            .all(|arg| arg != "--script=/tmp/evil.lua"));
    }

    #[test]
    fn untitled_video_has_no_title_flag() {
        let args = player_args("https://cdn.test/1.mp4", "", "/tmp/x.sock");
        assert!(!args.iter().any(|arg| arg.starts_with("--force-media-title")));
    }

    #[test]
    fn empty_command_or_url_is_rejected() {
        let launcher = Launcher::new(Vec::new());
        assert!(launcher.open("https://cdn.test/1.mp4", "A").is_err());
        let launcher = Launcher::new(vec!["mpv".into()]);
        assert!(launcher.open("   ", "A").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn ipc_paths_are_unique() {
        let a = unique_ipc_path().unwrap();
        let b = unique_ipc_path().unwrap();
        assert_ne!(a, b);
        assert!(a.ends_with(".sock"));
    }
}
