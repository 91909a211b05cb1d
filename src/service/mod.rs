pub mod boundary_loader;
pub mod history;
pub mod prompt;
pub mod reconcile;

pub use history::{HistoryGenerator, generate_history};
pub use reconcile::{JoinKey, Reconciler, reconcile_boundaries};
