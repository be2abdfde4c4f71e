use std::net::{SocketAddr, TcpStream};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use crate::{Result, TunnelError};

/// Max number of times to re-attempt the forward after a failed probe
pub const TUNNEL_ATTEMPTS: u32 = 3;

/// How long the port probe waits for a connection
const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Grace period between spawning ssh and the first probe, so the forward
/// has a chance to bind the local port
const BIND_GRACE: Duration = Duration::from_millis(750);

/// Everything needed to build the `ssh -D` invocation
#[derive(Debug, Clone)]
pub struct ForwardOptions {
    pub local_port: u16,
    pub ssh_user: String,
    pub ssh_key: PathBuf,
    pub host: String,
}

/// Local side of the tunnel: port cleanup, ssh spawning and the listen
/// probe. Tests substitute canned transports so no processes are spawned.
pub trait TunnelTransport {
    /// Best-effort kill of whatever currently occupies the local port.
    fn clear_port(&self, port: u16);

    /// Spawn the detached dynamic-forward ssh process. Not waited upon.
    fn spawn_forward(&self, opts: &ForwardOptions, debug: bool) -> Result<()>;

    /// Whether the local port is accepting connections.
    fn probe(&self, port: u16) -> bool;
}

/// Production transport shelling out to `ssh`, `sh`/`lsof` and a TCP probe
pub struct SshTunnel;

impl TunnelTransport for SshTunnel {
    fn clear_port(&self, port: u16) {
        let _ = Command::new("sh")
            .arg("-c")
            .arg(format!("lsof -ti:{} | xargs kill -9", port))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
    }

    fn spawn_forward(&self, opts: &ForwardOptions, debug: bool) -> Result<()> {
        let mut command = Command::new("ssh");
        command.args(forward_args(opts));

        if debug {
            command
                .arg("-vv")
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
        } else {
            command
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null());
        }

        command.spawn().map_err(|e| TunnelError::spawn("ssh", e))?;

        std::thread::sleep(BIND_GRACE);
        Ok(())
    }

    fn probe(&self, port: u16) -> bool {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        TcpStream::connect_timeout(&addr, PROBE_TIMEOUT).is_ok()
    }
}

/// Argument list for the dynamic forward, minus the debug flags.
/// Host key checking is disabled on purpose: instances get a new host key
/// every time they come back with a fresh public IP.
fn forward_args(opts: &ForwardOptions) -> Vec<String> {
    vec![
        "-D".to_string(),
        opts.local_port.to_string(),
        "-N".to_string(),
        "-o".to_string(),
        "UserKnownHostsFile=/dev/null".to_string(),
        "-o".to_string(),
        "StrictHostKeyChecking=no".to_string(),
        format!("{}@{}", opts.ssh_user, opts.host),
        "-i".to_string(),
        opts.ssh_key.display().to_string(),
    ]
}

/// Clear the local port, spawn the forward and verify it listens, retrying
/// the whole sequence until the probe succeeds or the attempt budget runs
/// out.
pub fn establish<T: TunnelTransport>(
    transport: &T,
    opts: &ForwardOptions,
    debug: bool,
) -> Result<()> {
    let mut attempts = 0u32;

    loop {
        transport.clear_port(opts.local_port);
        transport.spawn_forward(opts, debug)?;

        if transport.probe(opts.local_port) {
            return Ok(());
        }

        if attempts > TUNNEL_ATTEMPTS {
            return Err(TunnelError::TunnelFailed);
        }
        attempts += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Transport whose probe starts succeeding after a set number of
    /// failures, with call counters for every operation.
    struct ScriptedTransport {
        listening_after: u32,
        clears: Cell<u32>,
        spawns: Cell<u32>,
        probes: Cell<u32>,
    }

    impl ScriptedTransport {
        fn listening_after(failures: u32) -> Self {
            Self {
                listening_after: failures,
                clears: Cell::new(0),
                spawns: Cell::new(0),
                probes: Cell::new(0),
            }
        }

        fn never_listening() -> Self {
            Self::listening_after(u32::MAX)
        }
    }

    impl TunnelTransport for ScriptedTransport {
        fn clear_port(&self, _port: u16) {
            self.clears.set(self.clears.get() + 1);
        }

        fn spawn_forward(&self, _opts: &ForwardOptions, _debug: bool) -> Result<()> {
            self.spawns.set(self.spawns.get() + 1);
            Ok(())
        }

        fn probe(&self, _port: u16) -> bool {
            self.probes.set(self.probes.get() + 1);
            self.probes.get() > self.listening_after
        }
    }

    fn options() -> ForwardOptions {
        ForwardOptions {
            local_port: 8123,
            ssh_user: "ec2-user".to_string(),
            ssh_key: PathBuf::from("/home/me/.ssh/dev.pem"),
            host: "203.0.113.10".to_string(),
        }
    }

    #[test]
    fn succeeds_first_try_when_the_port_comes_up() {
        let transport = ScriptedTransport::listening_after(0);

        establish(&transport, &options(), false).unwrap();

        assert_eq!(transport.spawns.get(), 1);
        assert_eq!(transport.probes.get(), 1);
        assert_eq!(transport.clears.get(), 1);
    }

    #[test]
    fn retries_twice_when_the_port_comes_up_on_the_third_probe() {
        let transport = ScriptedTransport::listening_after(2);

        establish(&transport, &options(), false).unwrap();

        assert_eq!(transport.spawns.get(), 3);
        assert_eq!(transport.probes.get(), 3);
    }

    #[test]
    fn gives_up_when_the_port_never_listens() {
        let transport = ScriptedTransport::never_listening();

        let err = establish(&transport, &options(), false).unwrap_err();
        assert!(matches!(err, TunnelError::TunnelFailed));

        // one initial attempt plus TUNNEL_ATTEMPTS + 1 retries
        assert_eq!(transport.spawns.get(), TUNNEL_ATTEMPTS + 2);
        // the port is cleared before every spawn
        assert_eq!(transport.clears.get(), transport.spawns.get());
    }

    #[test]
    fn spawn_failure_aborts_immediately() {
        struct BrokenSpawn;

        impl TunnelTransport for BrokenSpawn {
            fn clear_port(&self, _port: u16) {}

            fn spawn_forward(&self, _opts: &ForwardOptions, _debug: bool) -> Result<()> {
                Err(TunnelError::spawn(
                    "ssh",
                    std::io::Error::from(std::io::ErrorKind::NotFound),
                ))
            }

            fn probe(&self, _port: u16) -> bool {
                true
            }
        }

        let err = establish(&BrokenSpawn, &options(), false).unwrap_err();
        assert!(matches!(err, TunnelError::Spawn { .. }));
    }

    #[test]
    fn forward_args_cover_the_dynamic_forward() {
        let args = forward_args(&options());

        assert_eq!(args[0], "-D");
        assert_eq!(args[1], "8123");
        assert!(args.contains(&"-N".to_string()));
        assert!(args.contains(&"StrictHostKeyChecking=no".to_string()));
        assert!(args.contains(&"ec2-user@203.0.113.10".to_string()));
        assert_eq!(args[args.len() - 2], "-i");
        assert_eq!(args[args.len() - 1], "/home/me/.ssh/dev.pem");
    }
}
