pub mod jwt;
pub mod metrics;
pub mod notification;
pub mod orders;
pub mod repository;

pub use jwt::{JwtService, SessionClaims};
pub use metrics::{get_metrics, init_metrics};
pub use notification::{NoopNotifier, Notifier, SmtpNotifier};
pub use orders::OrderService;
pub use repository::StoreRepository;
