//! Gate test organization:
//! - quota.rs: both limits respected under contention
//! - compensation.rs: minute-window failure hands the in-flight slot back
//! - guard.rs: release on every exit path
//! - windows.rs: minute-boundary and zero-wait behavior

mod compensation;
mod guard;
mod quota;
mod windows;
