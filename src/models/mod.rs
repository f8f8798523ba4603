pub mod account;
pub mod destination;
pub mod share;
pub mod trip_input;
