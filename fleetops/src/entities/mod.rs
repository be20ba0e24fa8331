//! Sea-ORM entities, one module per table, each with its API struct, create and
//! update payloads and its `CRUDResource` binding.

pub mod api_key;
pub mod bid;
pub mod inspection;
pub mod job;
pub mod license;
pub mod notification;
pub mod organization;
pub mod profile;
pub mod schedule;
pub mod setting;
pub mod vehicle;

pub use api_key::{ApiKey, ApiKeyStatus};
pub use bid::{Bid, BidStatus, BidWithDriver};
pub use inspection::{Inspection, InspectionStatus, InspectionType};
pub use job::{Job, JobStatus};
pub use license::{License, LicenseStatus};
pub use notification::{Notification, NotificationKind, NotificationStatus};
pub use organization::Organization;
pub use profile::{Profile, ProfileStatus, Role};
pub use schedule::{Schedule, ScheduleStatus};
pub use setting::{Setting, SettingSection};
pub use vehicle::{Vehicle, VehicleStatus};
