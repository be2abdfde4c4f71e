use crate::aws::client::AwsClients;
use crate::aws::instance::{poll_until, Ec2Provider, InstanceProvider, InstanceStatus, PollPolicy};
use crate::config::Config;
use crate::{Result, TunnelError};

use super::create_spinner;

pub async fn execute(config: &Config) -> Result<()> {
    println!("SSH Tunnel - Stop");
    println!("=================");
    println!();
    println!("Starting SSH tunnel teardown...");

    let spinner = create_spinner("Connecting to AWS...");
    let clients = AwsClients::new().await?;
    spinner.finish_with_message(format!("Connected to AWS ({})", clients.region));

    let provider = Ec2Provider::new(clients);
    run_with(&provider, config, &PollPolicy::default()).await
}

async fn run_with<P: InstanceProvider>(
    provider: &P,
    config: &Config,
    policy: &PollPolicy,
) -> Result<()> {
    println!("Stopping \"{}\" EC2 instance", config.instance_name);

    let instance = provider
        .find_by_name(&config.instance_name)
        .await?
        .ok_or_else(|| TunnelError::InstanceNotFound(config.instance_name.clone()))?;
    provider.stop_instance(&instance.instance_id).await?;

    println!("Checking server state...");
    poll_until(provider, &config.instance_name, InstanceStatus::Stopped, policy).await?;

    println!("Server stopped, tunnel destroyed!");
    Ok(())
}
