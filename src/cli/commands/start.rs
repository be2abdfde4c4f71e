use crate::aws::client::AwsClients;
use crate::aws::instance::{poll_until, Ec2Provider, InstanceProvider, InstanceStatus, PollPolicy};
use crate::config::Config;
use crate::tunnel::{self, ForwardOptions, SshTunnel, TunnelTransport};
use crate::{Result, TunnelError};

use super::create_spinner;

pub async fn execute(config: &Config, debug: bool) -> Result<()> {
    println!("SSH Tunnel - Start");
    println!("==================");
    println!();
    println!("Starting SSH tunnel setup...");

    let spinner = create_spinner("Connecting to AWS...");
    let clients = AwsClients::new().await?;
    spinner.finish_with_message(format!("Connected to AWS ({})", clients.region));

    let provider = Ec2Provider::new(clients);
    run_with(&provider, &SshTunnel, config, debug, &PollPolicy::default()).await
}

/// Start workflow over any provider/transport, so the sequencing is
/// testable without AWS or spawned processes.
async fn run_with<P, T>(
    provider: &P,
    transport: &T,
    config: &Config,
    debug: bool,
    policy: &PollPolicy,
) -> Result<()>
where
    P: InstanceProvider,
    T: TunnelTransport,
{
    println!("Starting \"{}\" EC2 instance", config.instance_name);

    let instance = provider
        .find_by_name(&config.instance_name)
        .await?
        .ok_or_else(|| TunnelError::InstanceNotFound(config.instance_name.clone()))?;
    provider.start_instance(&instance.instance_id).await?;

    println!("Checking server state...");
    // Re-polled snapshot: the pre-start one has no public IP yet
    let instance = poll_until(provider, &config.instance_name, InstanceStatus::Running, policy).await?;

    println!("Creating tunnel...");
    let host = instance
        .public_ip
        .clone()
        .ok_or_else(|| TunnelError::NoPublicIp(instance.instance_id.clone()))?;

    let options = ForwardOptions {
        local_port: config.tunnel_port,
        ssh_user: config.ssh_user.clone(),
        ssh_key: config.ssh_key.clone(),
        host,
    };
    tunnel::establish(transport, &options, debug)?;

    println!("Launching browser...");
    if let Err(e) = tunnel::browser::launch(config) {
        println!("Warning: could not launch browser: {}", e);
    }

    println!("All done! Enjoy.");
    Ok(())
}
