pub mod camera;
pub mod layout;
pub mod progress_api;
pub mod scene;
pub mod store;
pub mod sync;
pub mod toast;
pub mod tree;
pub mod ui;
pub mod widget;
