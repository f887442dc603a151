pub mod config_base;
pub mod errors;
pub mod structured_logging;

pub use structured_logging::{
    init_structured_logging,
    ExecutionContext,
    JsonLayer,
    LogLine,
    LoggingConfig,
    OperationTimer,
    RequestContext,
    REQUEST_ID_FIELD,
};

pub use errors::{ConfigError, ConfigResult};

pub use config_base::{env_flag, env_override, ConfigTrait};
