//! AWS client modules
//!
//! Each service gets an operations trait describing exactly the calls the
//! commands need, and an SDK-backed client implementing it. Commands are
//! generic over the trait so they can be exercised against in-memory fakes.
//!
//! - EFS: file systems and mount targets
//! - S3: buckets, objects and object versions
//! - SSM: parameters
//! - ECS: task definitions
//! - Organizations / IAM Identity Center: accounts and SSO assignments

pub mod context;
pub mod ecs;
pub mod efs;
pub mod error;
pub mod org;
pub mod s3;
pub mod ssm;

pub use context::{AwsContext, FromAwsContext};
pub use ecs::{EcsClient, EcsOperations};
pub use efs::{EfsClient, EfsOperations};
pub use error::{AwsError, ErrorKind, classify_code};
pub use org::{OrgClient, OrgOperations};
pub use s3::{S3Client, S3Operations};
pub use ssm::{SsmClient, SsmOperations};
