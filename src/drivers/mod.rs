pub mod encoder;
pub mod filter;
pub mod motor;
pub mod pid;
pub mod rate;
pub mod telemetry;
