pub mod monitor;
pub mod notifier;
pub mod token;

pub use monitor::Monitor;
pub use notifier::Notifier;
pub use token::TokenService;
