//! sitesync - Static Site Deployment over FTP
//!
//! sitesync builds a static site and mirrors the build output onto a remote
//! directory over FTP or FTPS, skipping files that match exclusion rules.
//!
//! ## Core Features
//!
//! - **Build Step**: Runs the site's build command before uploading
//! - **Exclusion Rules**: Literal and regex rules, pruning whole directories
//! - **Partial-failure Tolerance**: Failed files are counted, not fatal
//! - **Configuration Management**: YAML configuration with `FTP_*` environment overrides
//! - **Dry Runs**: Preview a deployment without connecting
//!
//! ## Modules
//!
//! - [`config`]: Configuration management and parsing
//! - [`exclude`]: Exclusion rules
//! - [`sync`]: Directory traversal and upload accounting
//! - [`transport`]: Remote session trait and the FTP implementation
//! - [`deploy`]: End-to-end deployment lifecycle

pub mod build_step;
pub mod config;
pub mod deploy;
pub mod error;
pub mod exclude;
pub mod health;
pub mod sync;
pub mod transport;

pub use config::Config;
pub use deploy::{Deployer, RunOptions};
pub use error::DeployError;
pub use exclude::{ExclusionRule, ExclusionRules, RuleSpec};
pub use health::HealthCheck;
pub use sync::{synchronize, DeploymentStats, EntryOutcome, SkipReason, SyncConfig};
pub use transport::{DryRunSession, FtpSession, RemoteSession};
