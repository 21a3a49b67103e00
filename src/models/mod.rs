//! Data models for SmartControl

pub mod audit;
pub mod custody;
pub mod device;
pub mod employee;
pub mod enums;
pub mod history;
pub mod line;
pub mod maintenance;

// Re-export commonly used types
pub use audit::{Actor, AuditEntry};
pub use custody::{CustodyRecord, CustodyRecordListing};
pub use device::Device;
pub use employee::Employee;
pub use enums::{AuditAction, AuditResource, CustodyStatus, DeviceCondition, DeviceStatus, LineStatus, MaintenanceStatus};
pub use history::DeviceHistoryEntry;
pub use line::{Line, LineLink};
pub use maintenance::MaintenanceOrder;
