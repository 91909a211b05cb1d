//! Domain types shared by the stores, services and handlers.

pub mod boundary;
pub mod design;
pub mod finance;
pub mod municipality;
pub mod state;

pub use boundary::{
    AnnotatedBoundaryFeature, AnnotatedProperties, Feature, FeatureCollection, MunicipalBoundary,
    MunicipalProperties, StateBoundary, StateProperties,
};
pub use finance::{FinancialRecord, Metric, MetricClass, MetricValue, Metrics, Modifier};
pub use municipality::Municipality;
pub use state::UsState;
