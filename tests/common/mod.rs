#![allow(dead_code)]

use std::sync::Arc;

use assetdag::config::ConfigFile;
use assetdag::fs::mock::MockFileSystem;
use assetdag::registry::TaskRegistry;
use assetdag::runner::Runner;

pub use assetdag_test_utils::builders;
pub use assetdag_test_utils::fake_backend::FakeRunBackend;
pub use assetdag_test_utils::{init_tracing, with_timeout};

/// Registry for `cfg`, panicking on registration errors.
pub fn registry(cfg: &ConfigFile) -> Arc<TaskRegistry> {
    Arc::new(TaskRegistry::from_config(cfg).expect("registry should build"))
}

/// Runner over an in-memory filesystem: sources under `src/`, outputs
/// under `out/`.
pub fn mock_runner(fs: &MockFileSystem, cfg: &ConfigFile) -> Runner {
    Runner::new(registry(cfg), Arc::new(fs.clone()), "src", "out")
}
