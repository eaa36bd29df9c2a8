pub mod client;
pub mod headers;

pub use client::{retry, ProbeError, ProbeOptions, Prober, RedirectMode};
pub use headers::HeaderProfile;
