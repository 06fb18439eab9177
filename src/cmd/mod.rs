//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module    | Commands handled               |
//! |-----------|--------------------------------|
//! | `run`     | `Run`, `Worker`                |
//! | `daemon`  | `Daemon`                       |
//! | `inspect` | `Status`, `Metrics`, `Reports` |
//! | `config`  | `Config`                       |

pub mod config;
pub mod daemon;
pub mod inspect;
pub mod run;

pub use config::cmd_config;
pub use daemon::cmd_daemon;
pub use inspect::{cmd_metrics, cmd_reports, cmd_status};
pub use run::{cmd_run, cmd_worker};
