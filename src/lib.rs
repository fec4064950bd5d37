#![warn(clippy::pedantic)]
// Noisy doc/signature lints — would require annotating hundreds of pub functions
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
// Style preference — keeping format!("{}", x) over format!("{x}") for readability with complex exprs
#![allow(clippy::uninlined_format_args)]
// Module structure — our modules have guard::IntakeGuard pattern by design
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod directory;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod guard;
pub mod hours;
pub mod ledger;
pub mod model;
pub mod outbound;
pub mod pipeline;
pub mod policy;
pub mod settings;
pub mod store;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
