//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod coefficient;
pub mod estimate;
pub mod estimate_export;
pub mod material;
pub mod room;
pub mod work;
pub mod work_item;

// Re-export specific types to avoid conflicts
pub use coefficient::{
    Column as CoefficientColumn, Entity as Coefficient, Model as CoefficientModel,
};
pub use estimate::{Column as EstimateColumn, Entity as Estimate, Model as EstimateModel};
pub use estimate_export::{
    Column as EstimateExportColumn, Entity as EstimateExport, Model as EstimateExportModel,
};
pub use material::{Column as MaterialColumn, Entity as Material, Model as MaterialModel};
pub use room::{Column as RoomColumn, Entity as Room, Model as RoomModel};
pub use work::{Column as WorkColumn, Entity as Work, Model as WorkModel};
pub use work_item::{Column as WorkItemColumn, Entity as WorkItem, Model as WorkItemModel};
