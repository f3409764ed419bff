pub mod types;
pub mod slots;
pub mod constraints;
pub mod assign;
pub mod edit;

pub use types::{PinnedAssignments, Schedule, ScheduleError, TimeSlot};
pub use slots::{generate_slots, ScheduleConfig};
pub use constraints::ConstraintModel;
pub use assign::assign;
pub use edit::reassign;
