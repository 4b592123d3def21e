mod config_cmd;
mod record;
mod sync_cmd;

pub use config_cmd::ConfigCommand;
pub use record::{DeleteCommand, InsertCommand, SelectCommand, UpdateCommand};
pub use sync_cmd::SyncCommand;
