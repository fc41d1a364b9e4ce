mod detection;
mod label_table;
mod model_config;
mod records;
mod scan_config;
mod screen_box;
mod world_position;

pub use detection::*;
pub use label_table::*;
pub use model_config::*;
pub use records::*;
pub use scan_config::*;
pub use screen_box::*;
pub use world_position::*;
