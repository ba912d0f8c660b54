//! Dashboard service clients.

pub mod grafana;
pub mod mock;

pub use grafana::GrafanaClient;
pub use mock::MockDashboardService;
