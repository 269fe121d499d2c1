pub mod screen;
pub mod stimulus;
pub mod trial;
pub mod view;

pub use screen::{Limits, Screen, Signal, SubmissionStage};
pub use stimulus::{Clip, Framing, PromptStyle, ScaleLabels, TrialDescriptor};
pub use trial::{ResponseRecord, TrialStage};
pub use view::{
    ButtonView, DemographicsField, DemographicsView, PageView, QuestionView, ScreenView, TrialView,
};
