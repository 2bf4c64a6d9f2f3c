//! Process-wide registry
//!
//! Applications that want a single registry shared by every thread install
//! it once at startup with [`init`] and reach it anywhere with [`registry`].

use once_cell::sync::OnceCell;
use srcpool_core::{Result, SrcpoolError};

use crate::registry::SourceRegistry;

static REGISTRY: OnceCell<SourceRegistry> = OnceCell::new();

/// Install the process-wide registry. Fails if one is already installed.
pub fn init(registry: SourceRegistry) -> Result<&'static SourceRegistry> {
    REGISTRY.set(registry).map_err(|_| {
        SrcpoolError::Configuration("global registry already initialized".to_string())
    })?;
    tracing::debug!("global registry installed");
    registry_ref()
}

/// The process-wide registry, if installed
pub fn get() -> Option<&'static SourceRegistry> {
    REGISTRY.get()
}

/// The process-wide registry, failing if [`init`] has not been called
pub fn registry() -> Result<&'static SourceRegistry> {
    registry_ref()
}

fn registry_ref() -> Result<&'static SourceRegistry> {
    REGISTRY.get().ok_or_else(|| {
        SrcpoolError::Configuration("global registry not initialized".to_string())
    })
}

#[cfg(test)]
mod tests {
    use srcpool_core::SourceConfig;

    use super::*;
    use crate::mock::MockFactory;

    // The only test touching the process-wide cell.
    #[test]
    fn test_init_once() {
        assert!(get().is_none());
        assert!(matches!(registry(), Err(SrcpoolError::Configuration(_))));

        let installed = init(SourceRegistry::new(MockFactory::new())).expect("first init");
        installed
            .add_source("db", SourceConfig::new("primary").with_max_connections(1))
            .expect("add");

        let again = init(SourceRegistry::new(MockFactory::new())).unwrap_err();
        assert!(again.to_string().contains("already initialized"));

        let resource = registry().expect("installed").get_connection("db").expect("get");
        assert!(resource.connected());
        assert!(get().is_some_and(|r| r.contains("db")));
    }
}
