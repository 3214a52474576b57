//! Time-aware blocking rules: schedule parsing and evaluation, domain matching and the block registry
//! that answers whether a query should be blocked right now.

mod domain;
mod error;
mod interval;
mod registry;
mod schedule;

pub use domain::DomainMatcher;
pub use error::{RuleError, ScheduleError};
pub use interval::Interval;
pub use registry::{Block, BlockConfig, BlockRegistry};
pub use schedule::{Schedule, ScheduleLine};
