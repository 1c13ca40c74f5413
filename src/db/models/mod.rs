pub mod bm_log;
pub mod caregiver;
pub mod intake;
pub mod medication;
pub mod message;
pub mod patient;
pub mod team_settings;

pub use bm_log::BmLog;
pub use caregiver::Caregiver;
pub use intake::IntakeLog;
pub use medication::{Medication, MedicationLog};
pub use message::Message;
pub use patient::Patient;
pub use team_settings::TeamSettings;
