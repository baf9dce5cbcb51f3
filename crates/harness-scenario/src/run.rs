//! Per-test setup and teardown
//!
//! A [`TestRun`] owns the resolved configuration for one scenario and the
//! port behind it. Teardown releases the port; dropping the run without
//! calling teardown releases it too.

use harness_core::{EnvSource, PortAllocator, Result, RunConfig};
use tracing::info;

/// Configuration and resources held for the duration of one scenario
#[derive(Debug)]
pub struct TestRun {
    config: RunConfig,
    allocator: PortAllocator,
    released: bool,
}

impl TestRun {
    /// Resolve the run configuration and allocate its port
    pub fn setup(env: &impl EnvSource, allocator: &PortAllocator) -> Result<Self> {
        let config = RunConfig::resolve_from(env, allocator)?;
        info!(
            log_mask = %config.log_mask,
            addr = %config.transport_address_family,
            interface = %config.network_interface,
            port = config.port,
            "Test run configured"
        );
        Ok(Self {
            config,
            allocator: allocator.clone(),
            released: false,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Release everything the run holds
    pub fn teardown(mut self) {
        info!("tearDown begin");
        self.release();
        info!("tearDown end");
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.allocator.release(self.config.port);
        }
    }
}

impl Drop for TestRun {
    fn drop(&mut self) {
        self.release();
    }
}
