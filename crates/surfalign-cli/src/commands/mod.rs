pub mod align;
pub mod info;
