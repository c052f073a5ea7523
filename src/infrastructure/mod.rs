pub mod automation;
pub mod chrome_port;

pub use automation::{AutomationPort, PortResult};
pub use chrome_port::ChromePort;
