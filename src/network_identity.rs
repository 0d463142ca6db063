use serde::Serialize;
use std::net::SocketAddr;

/// What the host is called and where its endpoints listen.
pub trait NetworkIdentity: Send + Sync {
    fn hostname(&self) -> String;

    fn endpoints(&self) -> Vec<Endpoint>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub name: &'static str,
    pub address: String,
}

/// Identity read from the running host.
pub struct HostIdentity {
    endpoints: Vec<Endpoint>,
}

impl HostIdentity {
    pub fn new() -> Self {
        Self { endpoints: Vec::new() }
    }

    pub fn with_endpoint(mut self, name: &'static str, address: SocketAddr) -> Self {
        self.endpoints.push(Endpoint { name, address: address.to_string() });
        self
    }
}

impl Default for HostIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkIdentity for HostIdentity {
    fn hostname(&self) -> String {
        std::env::var("HOSTNAME")
            .ok()
            .filter(|h| !h.trim().is_empty())
            .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn endpoints(&self) -> Vec<Endpoint> {
        self.endpoints.clone()
    }
}
