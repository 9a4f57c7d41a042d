pub mod player;
pub mod settings;
pub mod video;
