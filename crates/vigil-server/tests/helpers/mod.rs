//! Test helpers para vigil-server.

#![allow(dead_code, unused_imports)]

pub mod app;
pub mod assertions;
pub mod client;

pub use app::{EchoUpstream, TestApp};
pub use assertions::*;
pub use client::{TestClient, TestResponse, client};
