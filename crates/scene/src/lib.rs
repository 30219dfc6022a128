pub mod layout;
pub mod picking;
pub mod region;
pub mod selection;
pub mod view;

pub use layout::{Layout, derive_layout};
pub use picking::{ProjectedRegion, ProjectedScene};
pub use region::{Region, RegionSet};
pub use selection::Selection;
pub use view::{Size, ViewTarget};
