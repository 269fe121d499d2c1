pub mod comprehension;
pub mod config;
pub mod demographics;
pub mod error;
pub mod host;
pub mod session;
pub mod state;
pub mod trial;

pub use comprehension::{ChoiceOption, ComprehensionForm, ComprehensionQuestion, Grade};
pub use config::{DemographicsOptions, ExperimentConfig, Page, Pages, Variant};
pub use demographics::DemographicsForm;
pub use error::{ConfigError, HostError};
pub use host::{Host, MemoryHost};
pub use session::Session;
pub use state::{Effect, ExperimentEvent, ExperimentStateMachine};
pub use trial::{ReadinessPolicy, TrialInput, TrialRun};
