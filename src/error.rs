use thiserror::Error;

#[derive(Error, Debug)]
pub enum TunnelError {
    // Configuration Errors
    #[error("environment is missing the required `{0}` key")]
    MissingEnvKey(String),

    #[error("invalid value for `{key}`: {message}")]
    InvalidEnvValue { key: String, message: String },

    // AWS Errors
    #[error("AWS credentials not found or invalid")]
    AwsCredentials,

    #[error("AWS EC2 error: {0}")]
    Ec2(String),

    // Instance Errors
    #[error("instance not found: {0}")]
    InstanceNotFound(String),

    #[error("unable to start instance {0}")]
    StartRejected(String),

    #[error("unable to stop instance {0}")]
    StopRejected(String),

    #[error("instance {0} has no public IP address")]
    NoPublicIp(String),

    // Tunnel Errors
    #[error("tunnel could not be established")]
    TunnelFailed,

    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // File/IO Errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TunnelError {
    pub fn ec2(err: impl std::fmt::Display) -> Self {
        TunnelError::Ec2(err.to_string())
    }

    pub fn spawn(command: impl Into<String>, source: std::io::Error) -> Self {
        TunnelError::Spawn {
            command: command.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TunnelError>;
