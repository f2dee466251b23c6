pub mod classification;
pub mod memory;
pub mod ports;
pub mod record;
pub mod row_match;
pub mod summary;
pub mod value_objects;
