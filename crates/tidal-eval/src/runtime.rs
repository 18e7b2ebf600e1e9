//! The runtime: owner of the environment and promise arenas.

use tidal_ast::EnvId;

use crate::env::Frame;
use crate::promise::Promise;
use crate::registry::Registry;

/// Maximum nesting of closure calls before evaluation is abandoned.
pub const MAX_CALL_DEPTH: u32 = 1000;

/// The top environment always occupies the first arena slot.
pub const TOP_ENV: EnvId = EnvId(0);

/// Resource limits applied during evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_call_depth: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_call_depth: MAX_CALL_DEPTH,
        }
    }
}

/// Single-threaded interpreter state. Environments and promises are
/// addressed by index and live as long as the runtime.
///
/// Nothing is ever freed: every closure call, verb call and captured
/// argument appends frames or promises, so memory grows with the work done.
/// Hosts that evaluate indefinitely should start a fresh `Runtime` per
/// session rather than keep one alive. [`Runtime::env_count`] reports the
/// current size.
#[derive(Debug)]
pub struct Runtime {
    pub(crate) frames: Vec<Frame>,
    pub(crate) promises: Vec<Promise>,
    pub(crate) registry: Registry,
    pub(crate) limits: Limits,
    pub(crate) depth: u32,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// A runtime with the builtin registry and default limits.
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    pub fn with_registry(registry: Registry) -> Self {
        Self {
            frames: vec![Frame::new(None)],
            promises: Vec::new(),
            registry,
            limits: Limits::default(),
            depth: 0,
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn top_env(&self) -> EnvId {
        TOP_ENV
    }

    /// Whether `env` is the top environment, where substitution degrades to
    /// plain quoting.
    pub fn is_top_level_target(&self, env: EnvId) -> bool {
        env == TOP_ENV
    }

    /// Number of environments allocated so far.
    pub fn env_count(&self) -> usize {
        self.frames.len()
    }
}
