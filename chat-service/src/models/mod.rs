//! Domain models for the chat service.

pub mod record;
pub mod session;

pub use record::{ChatRecord, TurnRecord};
pub use session::{
    build_context, ChatSession, ChatTurn, ConversationHandle, GeneratedImage, Persona, RemoteRole,
    RemoteTurn, Role, Verbosity,
};
