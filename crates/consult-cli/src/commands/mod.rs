pub mod consultation;
pub mod directory;
pub mod dispatch;
pub mod doctor;
pub mod outbox;
pub mod serve;
