pub mod config;
pub mod error;
pub mod recorder;
pub mod resolver;
pub mod rotation;
pub mod token;
pub mod types;

pub use config::AppConfig;
pub use error::{StoreError, SurveyError, SurveyResult};
pub use recorder::{ImpressionRecorder, ResultRecorder};
pub use resolver::{Assignment, AssignmentResolver};
pub use rotation::RotationSet;
pub use token::{AssignmentCodec, CookieKey};
pub use types::{SurveyCatalog, SurveyFamily};
