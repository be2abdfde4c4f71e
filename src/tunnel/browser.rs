use std::path::PathBuf;
use std::process::{Command, Stdio};

use directories::ProjectDirs;

use crate::config::Config;
use crate::{Result, TunnelError};

/// Launch the configured browser with a dedicated profile, routed through
/// the local SOCKS proxy, opening the default URL. Detached; output
/// suppressed.
pub fn launch(config: &Config) -> Result<()> {
    Command::new(&config.browser)
        .arg(format!("--user-data-dir={}", profile_dir().display()))
        .arg(format!(
            "--proxy-server=socks5://localhost:{}",
            config.tunnel_port
        ))
        .arg(&config.default_url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| TunnelError::spawn(config.browser.clone(), e))?;

    Ok(())
}

/// Separate browser profile so the proxy settings never leak into the
/// user's regular sessions.
fn profile_dir() -> PathBuf {
    ProjectDirs::from("", "", "ec2-tunnel")
        .map(|dirs| dirs.cache_dir().join("browser-profile"))
        .unwrap_or_else(|| std::env::temp_dir().join("ec2-tunnel-browser"))
}
