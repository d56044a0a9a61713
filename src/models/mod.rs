pub mod booking;
pub mod event;
pub mod location;
pub mod profile;
pub mod ticket;
pub mod user;

pub use booking::{Booking, BookingStatus};
pub use event::{Event, EventType};
pub use location::Location;
pub use profile::{OrganiserProfile, Profile};
pub use ticket::Ticket;
pub use user::{LoginToken, Session, User};
