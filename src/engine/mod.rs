pub mod lifecycle;
pub mod login;
pub mod matching;
pub mod otp;
pub mod ranking;
pub mod requests;
pub mod tracking;
pub mod travelers;

#[cfg(test)]
pub(crate) mod testkit;
