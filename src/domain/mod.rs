pub mod features;
pub mod filters;
pub mod presenter;
pub mod records;
pub mod report;

pub use features::{FeatureConfig, FeatureKind, FeatureRegistry};
pub use filters::{FilterOverrides, Filters, StatusFilter};
pub use presenter::{RowChange, TablePresenter};
pub use records::RecordStatus;
pub use report::{ReportContainer, ReportSummary};
