mod client;
mod connectivity;

pub use client::{HttpShowsApi, ShowsApi};
pub use connectivity::{Connectivity, FixedConnectivity, TcpProbe};
