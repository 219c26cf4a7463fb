//! Destination factories
//!
//! Turn a `SinkConfig` into the `Destination` its workers share.

mod console;
mod file;

pub use self::console::console_destination;
pub use self::file::{FileSinkConfig, file_destination};

use contracts::{ContractError, SinkConfig, SinkType};

use crate::output::Destination;

/// Open the destination stream described by `config`
pub fn open_destination(config: &SinkConfig) -> Result<Destination, ContractError> {
    match config.sink_type {
        SinkType::Console => Ok(console_destination()),
        SinkType::File => {
            let file_config = FileSinkConfig::from_params(&config.params);
            file_destination(&config.name, &file_config)
        }
    }
}
