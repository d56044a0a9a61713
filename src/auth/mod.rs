pub mod handlers;
pub mod link;
pub mod session;

pub use session::CurrentUser;
