use aws_config::BehaviorVersion;
use aws_sdk_ec2::Client as Ec2Client;

use crate::{Result, TunnelError};

/// AWS client wrapper built from the default credential/region chain
#[derive(Clone)]
pub struct AwsClients {
    pub ec2: Ec2Client,
    pub region: String,
}

impl AwsClients {
    /// Create a new EC2 client from the default configuration.
    pub async fn new() -> Result<Self> {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .load()
            .await;

        let region = config
            .region()
            .map(|r| r.to_string())
            .ok_or(TunnelError::AwsCredentials)?;

        Ok(Self {
            ec2: Ec2Client::new(&config),
            region,
        })
    }
}
