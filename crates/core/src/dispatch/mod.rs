//! Dispatch module - the adaptive broadcast loop pushing live counter
//! updates to subscribed chats.

mod cadence;
mod dispatch_constants;
mod dispatch_render;
mod dispatch_service;
mod dispatch_traits;


// Re-export the public interface
pub use cadence::DispatchCadence;
pub use dispatch_constants::*;
pub use dispatch_render::{escape_html, render_update, welcome_keyboard};
pub use dispatch_service::{DispatchConfig, DispatchService};
pub use dispatch_traits::{Keyboard, KeyboardButton, MessengerError, MessengerTrait};
