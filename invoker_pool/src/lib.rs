pub mod alert;
pub mod config;
pub mod container;
pub mod error;
pub mod manager;
pub mod protocol;
pub mod worker;

pub use alert::{AlertSink, TracingAlerts};
pub use config::{load_pool_config_from_json, PoolConfig};
pub use container::probe::{AssumeAlive, DockerProbe, SandboxProbe};
pub use error::PoolError;
pub use manager::pool::{
    Execution, Invoker, InvokerHandle, InvokerPool, PoolOptions, PoolSnapshot, Status,
    WorkerSignature,
};
pub use protocol::{ProtocolError, TestingRequest, TestingResponse};
