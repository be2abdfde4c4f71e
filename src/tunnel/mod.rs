pub mod browser;
pub mod forward;

pub use forward::{establish, ForwardOptions, SshTunnel, TunnelTransport, TUNNEL_ATTEMPTS};
