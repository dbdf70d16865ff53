//! Configuration for the recommendation service and its HTTP listener.

/// Port used when neither `--port` nor `PORT` is given
pub const DEFAULT_PORT: u16 = 5000;

/// Host used when `--host` is not given (all interfaces)
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Number of recommendations returned when the request names no limit
pub const DEFAULT_LIMIT: usize = 10;

/// How a request's user id is turned into a similarity-matrix row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndexMapping {
    /// Resolve through the user ids stored in the model
    #[default]
    Lookup,
    /// Treat the user id as the row number itself
    Cast,
}

/// Behaviour of the recommendation service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub index_mapping: IndexMapping,
    /// Whether the queried user may appear in their own results
    pub include_self: bool,
    pub default_limit: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            index_mapping: IndexMapping::default(),
            include_self: false,
            default_limit: DEFAULT_LIMIT,
        }
    }
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure how user ids map to rows (default: Lookup)
    pub fn with_index_mapping(mut self, mapping: IndexMapping) -> Self {
        self.index_mapping = mapping;
        self
    }

    /// Configure self-inclusion in results (default: false)
    pub fn with_include_self(mut self, include_self: bool) -> Self {
        self.include_self = include_self;
        self
    }

    /// Configure the limit used when a request names none (default: 10)
    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }
}

/// Where the HTTP server listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
