use crate::adapters::outbound::TcpConnector;
use crate::application::utils::UtilFuncs;
use crate::application::world_context::{ContextSettings, WorldContext};
use crate::common::ConnectError;
use crate::config::SdkConfig;
use crate::domains::connection::Connector;
use crate::domains::logger::DynLogger;
use std::sync::Arc;

pub const DEFAULT_ENDPOINT: &str = "127.0.0.1:5726";

/// High-level entry point for one connected TongSim instance.
///
/// Every method is synchronous; asynchronous work happens on the context's loop.
pub struct TongSim {
    context: Arc<WorldContext>,
    utils: UtilFuncs,
}

impl TongSim {
    /// Connect over TCP with default settings.
    pub fn connect(endpoint: &str, logger: DynLogger) -> Result<Self, ConnectError> {
        let connector = Arc::new(TcpConnector::new(logger.clone()));
        Self::with_connector(endpoint, connector, logger, ContextSettings::default())
    }

    pub fn from_config(config: &SdkConfig, logger: DynLogger) -> Result<Self, ConnectError> {
        let connector = Arc::new(TcpConnector::new(logger.clone()).with_level(config.log_level));
        Self::with_connector(&config.endpoint, connector, logger, config.context_settings())
    }

    pub fn with_connector(
        endpoint: &str,
        connector: Arc<dyn Connector>,
        logger: DynLogger,
        settings: ContextSettings,
    ) -> Result<Self, ConnectError> {
        let context = Arc::new(WorldContext::new(endpoint, connector, logger, settings)?);
        let utils = UtilFuncs::new(context.clone());
        Ok(Self { context, utils })
    }

    /// The runtime context owning the loop and the connection.
    pub fn context(&self) -> &Arc<WorldContext> {
        &self.context
    }

    /// Blocking helpers for common world operations.
    pub fn utils(&self) -> &UtilFuncs {
        &self.utils
    }

    /// Shut down the runtime and release all managed resources.
    pub fn close(&self) {
        self.context.release();
    }
}

impl Drop for TongSim {
    fn drop(&mut self) {
        self.close();
    }
}
