pub mod camera;
pub mod scores;

pub use camera::Camera;
pub use scores::LocalStorageScores;
