use std::time::Duration;

use aws_sdk_ec2::types::Filter;

use super::client::AwsClients;
use crate::{Result, TunnelError};

/// Lifecycle state of an EC2 instance, as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceStatus {
    Pending,
    Running,
    ShuttingDown,
    Stopping,
    Stopped,
    Terminated,
    Unknown(String),
}

impl From<&str> for InstanceStatus {
    fn from(value: &str) -> Self {
        match value {
            "pending" => InstanceStatus::Pending,
            "running" => InstanceStatus::Running,
            "shutting-down" => InstanceStatus::ShuttingDown,
            "stopping" => InstanceStatus::Stopping,
            "stopped" => InstanceStatus::Stopped,
            "terminated" => InstanceStatus::Terminated,
            other => InstanceStatus::Unknown(other.to_string()),
        }
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstanceStatus::Pending => write!(f, "pending"),
            InstanceStatus::Running => write!(f, "running"),
            InstanceStatus::ShuttingDown => write!(f, "shutting-down"),
            InstanceStatus::Stopping => write!(f, "stopping"),
            InstanceStatus::Stopped => write!(f, "stopped"),
            InstanceStatus::Terminated => write!(f, "terminated"),
            InstanceStatus::Unknown(other) => write!(f, "{}", other),
        }
    }
}

/// Read-only snapshot of a single instance, fetched fresh on every poll
#[derive(Debug, Clone)]
pub struct InstanceDescriptor {
    pub instance_id: String,
    pub public_ip: Option<String>,
    pub status: InstanceStatus,
}

/// Cloud provider operations the workflows need. The production
/// implementation talks to EC2; tests substitute canned providers.
#[allow(async_fn_in_trait)]
pub trait InstanceProvider {
    /// Find the first instance tagged `Name=<name>`.
    async fn find_by_name(&self, name: &str) -> Result<Option<InstanceDescriptor>>;

    /// Request a start; error if the provider does not acknowledge it.
    async fn start_instance(&self, instance_id: &str) -> Result<()>;

    /// Request a stop; error if the provider does not acknowledge it.
    async fn stop_instance(&self, instance_id: &str) -> Result<()>;
}

/// Production provider backed by the AWS SDK
pub struct Ec2Provider {
    clients: AwsClients,
}

impl Ec2Provider {
    pub fn new(clients: AwsClients) -> Self {
        Self { clients }
    }
}

impl InstanceProvider for Ec2Provider {
    async fn find_by_name(&self, name: &str) -> Result<Option<InstanceDescriptor>> {
        let response = self
            .clients
            .ec2
            .describe_instances()
            .filters(Filter::builder().name("tag:Name").values(name).build())
            .send()
            .await
            .map_err(TunnelError::ec2)?;

        let instance = response
            .reservations()
            .first()
            .and_then(|r| r.instances().first());

        Ok(instance.map(|instance| InstanceDescriptor {
            instance_id: instance.instance_id().unwrap_or_default().to_string(),
            public_ip: instance.public_ip_address().map(String::from),
            status: instance
                .state()
                .and_then(|s| s.name())
                .map(|name| InstanceStatus::from(name.as_str()))
                .unwrap_or_else(|| InstanceStatus::Unknown(String::new())),
        }))
    }

    async fn start_instance(&self, instance_id: &str) -> Result<()> {
        let response = self
            .clients
            .ec2
            .start_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .map_err(TunnelError::ec2)?;

        if response.starting_instances().is_empty() {
            return Err(TunnelError::StartRejected(instance_id.to_string()));
        }

        Ok(())
    }

    async fn stop_instance(&self, instance_id: &str) -> Result<()> {
        let response = self
            .clients
            .ec2
            .stop_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .map_err(TunnelError::ec2)?;

        if response.stopping_instances().is_empty() {
            return Err(TunnelError::StopRejected(instance_id.to_string()));
        }

        Ok(())
    }
}

/// Fixed-interval, fixed-budget polling policy
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_attempts: 20,
        }
    }
}

/// Re-fetch the instance at a fixed interval until its status equals
/// `target` or the attempt budget runs out.
///
/// Budget exhaustion is not an error: the loop prints a warning and hands
/// back the last snapshot so downstream steps can decide what to do with it.
pub async fn poll_until<P: InstanceProvider>(
    provider: &P,
    name: &str,
    target: InstanceStatus,
    policy: &PollPolicy,
) -> Result<InstanceDescriptor> {
    let mut checks = 0u32;

    loop {
        let instance = provider
            .find_by_name(name)
            .await?
            .ok_or_else(|| TunnelError::InstanceNotFound(name.to_string()))?;
        checks += 1;

        println!("Status: {}", instance.status);

        if instance.status == target {
            return Ok(instance);
        }

        if checks > policy.max_attempts {
            println!(
                "Warning: gave up waiting for status \"{}\" after {} checks; continuing",
                target, checks
            );
            return Ok(instance);
        }

        tokio::time::sleep(policy.interval).await;
    }
}
