pub mod driver;
pub mod registration_session;
pub mod session_state;

pub use driver::SubmissionDriver;
pub use registration_session::RegistrationSession;
pub use session_state::SessionState;
