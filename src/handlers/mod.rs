pub mod design;
pub mod finance;
pub mod gis;
