pub mod audit_logs;
pub mod images;
pub mod order_details;
pub mod orders;
pub mod products;

pub use audit_logs::Entity as AuditLogs;
pub use images::Entity as Images;
pub use order_details::Entity as OrderDetails;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
