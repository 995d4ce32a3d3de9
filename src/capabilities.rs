//! Id generation and time, injectable so tests can pin both

use chrono::{DateTime, SubsecRound, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use std::sync::Arc;

const OBJECT_ID_LENGTH: usize = 10;

pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random base62 ids of ten characters
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjectIdGenerator;

impl IdGenerator for ObjectIdGenerator {
    fn generate(&self) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(OBJECT_ID_LENGTH)
            .map(char::from)
            .collect()
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock truncated to milliseconds, the precision every backend keeps
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(3)
    }
}

#[derive(Clone)]
pub struct Capabilities {
    pub ids: Arc<dyn IdGenerator>,
    pub clock: Arc<dyn Clock>,
}

impl Capabilities {
    pub fn new(ids: Arc<dyn IdGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self { ids, clock }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::new(Arc::new(ObjectIdGenerator), Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}
