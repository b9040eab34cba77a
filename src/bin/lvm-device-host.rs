use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use lvm_device_host::preflight::check_lvm_tools;
use lvm_device_host::{
    HostConfig, HostRunner, LogicalVolumeDevice, OpenRequest, Session, ThreadSleeper,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn usage() -> &'static str {
    "Usage:\n  lvm-device-host [--config <path>]\n  lvm-device-host [--config <path>] --check\n\nRequests are read as JSON lines from stdin:\n  {\"method\": \"open\", \"args\": {\"devpath\": ..., \"parent\": ..., \"tree\": ..., \"options\": {\"volume\": ...}}}\n  {\"method\": \"close\"}"
}

#[derive(Debug, Deserialize)]
#[serde(tag = "method", content = "args", rename_all = "lowercase")]
enum Request {
    Open(OpenRequest),
    Close,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.as_slice() {
        [] => serve(&HostConfig::default()),
        [check] if check == "--check" => preflight(&HostConfig::default()),
        [flag, path] if flag == "--config" => serve(&load_config(Path::new(path))?),
        [flag, path, check] if flag == "--config" && check == "--check" => {
            preflight(&load_config(Path::new(path))?)
        }
        _ => bail!(usage()),
    }
}

fn load_config(path: &Path) -> Result<HostConfig> {
    HostConfig::load(path).with_context(|| format!("loading config '{}'", path.display()))
}

fn preflight(config: &HostConfig) -> Result<()> {
    check_lvm_tools(&config.tools)?;
    info!("all LVM tools found");
    Ok(())
}

fn serve(config: &HostConfig) -> Result<()> {
    check_lvm_tools(&config.tools)?;

    let device = LogicalVolumeDevice::new(config, &HostRunner, &ThreadSleeper);
    let mut session = Session::new();
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();

    let served = serve_lines(&device, &mut session, stdin.lock(), stdout.lock());

    // the stage may go away without closing; never leave the volume active
    if let Some(volume) = session.active_volume().cloned() {
        info!(volume = %volume, "input closed with active volume, deactivating");
        device
            .close(&mut session)
            .with_context(|| format!("deactivating '{volume}' on shutdown"))?;
    }
    served
}

fn serve_lines(
    device: &LogicalVolumeDevice<'_>,
    session: &mut Session,
    input: impl BufRead,
    mut output: impl Write,
) -> Result<()> {
    for line in input.lines() {
        let line = line.context("reading request from stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(device, session, &line);
        serde_json::to_writer(&mut output, &response).context("writing response")?;
        output.write_all(b"\n").context("writing response")?;
        output.flush().context("flushing response")?;
    }
    Ok(())
}

fn handle_line(device: &LogicalVolumeDevice<'_>, session: &mut Session, line: &str) -> Value {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            error!(error = %e, "malformed request");
            return json!({ "error": format!("malformed request: {e}") });
        }
    };

    let outcome = match request {
        Request::Open(args) => device.open(session, &args).map(|result| json!(result)),
        Request::Close => device.close(session).map(|()| Value::Null),
    };

    match outcome {
        Ok(result) => json!({ "result": result }),
        Err(e) => {
            error!(error = %e, "request failed");
            json!({ "error": e.to_string() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(lines: &str) -> Vec<Value> {
        let config = HostConfig::default();
        let device = LogicalVolumeDevice::new(&config, &HostRunner, &ThreadSleeper);
        let mut session = Session::new();
        let mut out = Vec::new();
        serve_lines(&device, &mut session, lines.as_bytes(), &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_close_without_open_is_ok() {
        let responses = run("{\"method\": \"close\"}\n\n{\"method\": \"close\"}\n");
        assert_eq!(responses, vec![json!({"result": null}), json!({"result": null})]);
    }

    #[test]
    fn test_bad_requests_get_error_responses() {
        let responses = run(concat!(
            "not json\n",
            "{\"method\": \"mount\"}\n",
            "{\"method\": \"open\", \"args\": {\"devpath\": \"/tmp/dev\", \"parent\": \"/dev/sda1\", \"options\": {\"volume\": \"root\"}}}\n",
        ));
        assert_eq!(responses.len(), 3);
        for response in &responses {
            assert!(response.get("error").is_some(), "{response}");
        }
        assert!(responses[2]["error"]
            .as_str()
            .unwrap()
            .contains("protocol misuse"));
    }
}
