pub mod bm_log;
pub mod caregiver;
pub mod intake;
pub mod medication;
pub mod message;
pub mod patient;
pub mod team_settings;

pub use bm_log::BmLogRepository;
pub use caregiver::CaregiverRepository;
pub use intake::{HydrationLogRepository, JuiceLogRepository};
pub use medication::{MedicationLogRepository, MedicationRepository};
pub use message::MessageRepository;
pub use patient::PatientRepository;
pub use team_settings::TeamSettingsRepository;
