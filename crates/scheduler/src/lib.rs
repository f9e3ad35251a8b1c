pub mod error;
pub mod model;
pub mod planner;
pub mod table;

pub use error::PlanningError;
pub use model::{ExecutionPlan, MissingDependency, Phase, PhaseMap, ProbeDescriptor, Validation};
pub use planner::PhaseScheduler;
pub use table::ProbeTable;
