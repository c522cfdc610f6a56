pub mod chat;

pub use chat::{PatientContext, ReplySource, Role, SessionId};
