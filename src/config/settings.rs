use std::path::PathBuf;

use crate::{Result, TunnelError};

/// Keys that must be present (and non-empty) in the environment before any
/// workflow runs.
pub const REQUIRED_KEYS: &[&str] = &[
    "TUNNEL_NAME",
    "TUNNEL_PORT",
    "SSH_USER",
    "SSH_KEY",
    "TUNNEL_DEFAULT_URL",
];

/// Browser binary used when `TUNNEL_BROWSER` is not set.
const DEFAULT_BROWSER: &str = "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome";

/// Immutable configuration for one command invocation, sourced from the
/// process environment and validated once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Value of the `Name` tag identifying the EC2 instance
    pub instance_name: String,

    /// Local port for the SOCKS5 dynamic forward
    pub tunnel_port: u16,

    /// SSH login user on the instance
    pub ssh_user: String,

    /// Path to the SSH private key
    pub ssh_key: PathBuf,

    /// URL opened in the proxied browser once the tunnel is up
    pub default_url: String,

    /// Browser binary to launch with the SOCKS proxy configured
    pub browser: String,
}

impl Config {
    /// Load and validate configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        require_keys(REQUIRED_KEYS, &lookup)?;

        let get = |key: &str| lookup(key).unwrap_or_default();

        let port_raw = get("TUNNEL_PORT");
        let tunnel_port = port_raw
            .trim()
            .parse::<u16>()
            .map_err(|_| TunnelError::InvalidEnvValue {
                key: "TUNNEL_PORT".to_string(),
                message: format!("'{}' is not a valid port number", port_raw),
            })?;

        Ok(Self {
            instance_name: get("TUNNEL_NAME"),
            tunnel_port,
            ssh_user: get("SSH_USER"),
            ssh_key: PathBuf::from(get("SSH_KEY")),
            default_url: get("TUNNEL_DEFAULT_URL"),
            browser: lookup("TUNNEL_BROWSER")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BROWSER.to_string()),
        })
    }
}

/// Check that every key resolves to a non-empty value, failing on the first
/// one that doesn't.
fn require_keys<F>(keys: &[&str], lookup: &F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    for key in keys {
        match lookup(key) {
            Some(value) if !value.trim().is_empty() => {}
            _ => return Err(TunnelError::MissingEnvKey((*key).to_string())),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("TUNNEL_NAME", "dev-server"),
            ("TUNNEL_PORT", "8123"),
            ("SSH_USER", "ec2-user"),
            ("SSH_KEY", "/home/me/.ssh/dev.pem"),
            ("TUNNEL_DEFAULT_URL", "https://dashboard.internal"),
        ])
    }

    fn load(env: &HashMap<&str, &str>) -> Result<Config> {
        Config::from_lookup(|key| env.get(key).map(|v| (*v).to_string()))
    }

    #[test]
    fn loads_a_complete_environment() {
        let config = load(&full_env()).unwrap();

        assert_eq!(config.instance_name, "dev-server");
        assert_eq!(config.tunnel_port, 8123);
        assert_eq!(config.ssh_user, "ec2-user");
        assert_eq!(config.ssh_key, PathBuf::from("/home/me/.ssh/dev.pem"));
        assert_eq!(config.default_url, "https://dashboard.internal");
        assert_eq!(config.browser, DEFAULT_BROWSER);
    }

    #[test]
    fn names_the_missing_key() {
        let mut env = full_env();
        env.remove("SSH_KEY");

        let err = load(&env).unwrap_err();
        assert!(matches!(err, TunnelError::MissingEnvKey(ref key) if key == "SSH_KEY"));
    }

    #[test]
    fn reports_the_first_missing_key() {
        let mut env = full_env();
        env.remove("TUNNEL_PORT");
        env.remove("TUNNEL_DEFAULT_URL");

        let err = load(&env).unwrap_err();
        assert!(matches!(err, TunnelError::MissingEnvKey(ref key) if key == "TUNNEL_PORT"));
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let mut env = full_env();
        env.insert("SSH_USER", "  ");

        let err = load(&env).unwrap_err();
        assert!(matches!(err, TunnelError::MissingEnvKey(ref key) if key == "SSH_USER"));
    }

    #[test]
    fn rejects_a_non_numeric_port() {
        let mut env = full_env();
        env.insert("TUNNEL_PORT", "not-a-port");

        let err = load(&env).unwrap_err();
        assert!(matches!(err, TunnelError::InvalidEnvValue { ref key, .. } if key == "TUNNEL_PORT"));
    }

    #[test]
    fn browser_override_is_honoured() {
        let mut env = full_env();
        env.insert("TUNNEL_BROWSER", "/usr/bin/chromium");

        let config = load(&env).unwrap();
        assert_eq!(config.browser, "/usr/bin/chromium");
    }
}
