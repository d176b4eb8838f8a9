pub mod page;
pub mod state;

pub use page::{FiltersState, Page, PageKind, PageTarget};
pub use state::{NavOutcome, NavigationHistory};
