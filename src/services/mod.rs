pub mod classifier;
pub mod review_writer;

pub use classifier::{outcome_crn, ErrorClassifier, ReasonTable};
pub use review_writer::ReviewWriter;
