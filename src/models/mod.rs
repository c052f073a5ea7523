pub mod crn;
pub mod loaders;
pub mod outcome;
pub mod profile;
pub mod report;

pub use crn::{Crn, WorkingSet};
pub use loaders::load_profile;
pub use outcome::{ClassifiedOutcome, OutcomeCategory, RawOutcome, ReasonRule};
pub use profile::{ClassEntry, Credentials, Profile};
pub use report::{DroppedEntry, RoundSummary, RunStatus, TerminalReport};
