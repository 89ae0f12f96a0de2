pub mod app_config;
pub mod database;
pub mod reservation_repo;
pub mod directory_client;
pub mod workflow_client;
pub mod notifier;

pub use app_config::Config;
pub use database::DbClient;
pub use directory_client::HttpDirectoryClient;
pub use notifier::HttpNotifier;
pub use reservation_repo::PgReservationStore;
pub use workflow_client::HttpWorkflowEngine;
