//! The check library: every individual check, grouped by the
//! event it fires on. `register_all` is the crate's single composition
//! root — checks never register themselves.

pub mod post_tool_use;
pub mod pre_tool_use;
pub mod session;
pub mod stop;
pub mod user_prompt_submit;

use crate::registry::CheckRegistry;

pub fn register_all(registry: &mut CheckRegistry) {
    pre_tool_use::register(registry);
    post_tool_use::register(registry);
    user_prompt_submit::register(registry);
    stop::register(registry);
    session::register(registry);
}
