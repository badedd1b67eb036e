//! CLI command implementations.
//!
//! | Module  | Commands handled |
//! |---------|------------------|
//! | `serve` | `Serve`          |
//! | `run`   | `Run`            |

pub mod run;
pub mod serve;

pub use run::cmd_run;
pub use serve::cmd_serve;
