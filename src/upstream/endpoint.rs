//! Parsing and classification of `host:port` collector addresses.

use std::{
    fmt,
    io,
    net::{IpAddr, SocketAddr, ToSocketAddrs},
    str::FromStr,
};

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("missing port in upstream endpoint '{0}'")]
    MissingPort(String),
    #[error("invalid port in upstream endpoint '{0}'")]
    InvalidPort(String),
    #[error("too many colons in upstream endpoint '{0}'")]
    TooManyColons(String),
    #[error("unterminated IPv6 literal in upstream endpoint '{0}'")]
    UnterminatedBracket(String),
}

/// Address of a log collector.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UpstreamEndpoint {
    host: String,
    port: u16,
}

impl UpstreamEndpoint {
    /// Parse `host:port`, `:port` or `[v6addr]:port`.
    pub fn parse(endpoint: &str) -> Result<Self, EndpointError> {
        let (host, port) = if let Some(rest) = endpoint.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| EndpointError::UnterminatedBracket(endpoint.to_owned()))?;
            let port = tail
                .strip_prefix(':')
                .ok_or_else(|| EndpointError::MissingPort(endpoint.to_owned()))?;
            (host, port)
        } else {
            let (host, port) = endpoint
                .rsplit_once(':')
                .ok_or_else(|| EndpointError::MissingPort(endpoint.to_owned()))?;
            if host.contains(':') {
                return Err(EndpointError::TooManyColons(endpoint.to_owned()));
            }
            (host, port)
        };
        let port = port
            .parse::<u16>()
            .map_err(|_| EndpointError::InvalidPort(endpoint.to_owned()))?;
        Ok(Self {
            host: host.to_owned(),
            port,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// True when the collector runs on this machine: an empty host,
    /// `localhost`, or a loopback IP literal.
    pub fn is_loopback(&self) -> bool {
        if self.host.is_empty() || self.host.eq_ignore_ascii_case("localhost") {
            return true;
        }
        self.host
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false)
    }

    pub(crate) fn socket_addrs(&self) -> io::Result<Vec<SocketAddr>> {
        let host = if self.host.is_empty() {
            "localhost"
        } else {
            self.host.as_str()
        };
        (host, self.port).to_socket_addrs().map(Iterator::collect)
    }
}

impl FromStr for UpstreamEndpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for UpstreamEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
