pub mod context;
pub mod error;
pub mod task;

pub use context::AppContext;
pub use error::{PanelcastError, Result};
pub use task::run_isolated;
