pub mod delivery;
pub mod event;
pub mod location;
pub mod matching;
pub mod page;
pub mod request;
pub mod traveler;
