//! Header names the pipeline relies on.

/// Categorical column used to partition an upload.
pub const MATERIAL_GROUP: &str = "Material Group";
pub const MATERIAL_NUMBER: &str = "Material Number";
pub const QUANTITY: &str = "Quantity";
pub const QUANTITY_IN_UNE: &str = "Quantity in UnE";
pub const ORDER_QUANTITY: &str = "Order Quantity";
pub const POSTING_DATE: &str = "Pstng Date";
pub const SHELF_LIFE_DATE: &str = "SLED/BBD";
pub const VENDOR: &str = "Vendor Number";
pub const PLANT: &str = "Plant";
pub const SITE: &str = "Site";
pub const BATCH: &str = "Batch";

/// Literal written into empty or missing cells.
pub const UNKNOWN: &str = "Unknown";
