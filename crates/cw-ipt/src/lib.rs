pub mod command;
pub mod executor;
pub mod manager;
pub mod persist;
pub mod purge;
pub mod save;

pub use command::SystemRunner;
pub use executor::{ExecutionReport, Executor};
pub use manager::ChainManager;
pub use persist::SaveFilePersister;
pub use purge::{PurgeDescriptor, PurgeGenerator, RuleTag};
pub use save::{ChainHeader, RuleLine, SaveDump};
