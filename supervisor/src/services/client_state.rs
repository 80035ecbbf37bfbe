//! Shared connection flag
//!
//! Whoever owns the live client connection flips the flag; the readiness
//! gate only reads it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::traits::ClientState;

#[derive(Debug, Clone, Default)]
pub struct ConnectionFlag {
    connected: Arc<AtomicBool>,
}

impl ConnectionFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_connected(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    pub fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl ClientState for ConnectionFlag {
    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
