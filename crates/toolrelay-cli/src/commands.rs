pub mod chat;
pub mod inspect;
pub mod ping;
pub mod probe;
pub mod proxy;
pub mod samples;
