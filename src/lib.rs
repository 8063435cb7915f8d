pub mod aggregate;
pub mod auth;
pub mod capacity;
pub mod cli;
pub mod config;
pub mod directory;
pub mod edit;
pub mod error;
pub mod geojson;
pub mod import;
pub mod model;
pub mod remote;
pub mod schema;
pub mod store;
pub mod ui;
pub mod view;

pub use auth::{Capabilities, Session};
pub use cli::{Cli, Commands};
pub use directory::Directory;
pub use error::{FacilityError, FacilityResult};
pub use model::{Document, FacilityRecord, Status};
pub use store::{FacilityStore, SqliteStore};
pub use ui::{ConsoleUi, Phase, SilentUi, Ui, UiApp};
pub use view::{StatusFilter, ViewState};
