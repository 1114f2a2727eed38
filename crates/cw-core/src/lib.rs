pub mod catalog;
pub mod context;
pub mod desired;
pub mod error;
pub mod model;
pub mod planner;
pub mod validator;

pub use catalog::ChainCatalog;
pub use context::{CommandRunner, Context, NoopPersister, Persister, TracingContext};
pub use desired::{DesiredState, PersistConfig};
pub use error::ChainError;
pub use model::{ChainId, ChainRecord, Ensure, Policy, Property, Protocol, Table};
pub use planner::{Action, Plan};
pub use validator::{ChainValidator, verify};
