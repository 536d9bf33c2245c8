//! Session orchestration: requests in, ordered results and events out.

mod command;
mod driver;
mod event;
mod handle;
mod paging;

pub use command::{
    Command, CommandResult, LoopFrame, SessionMode, SessionOutcome, SessionRequest,
};
pub use driver::SessionDriver;
pub use event::SessionEvent;
pub use handle::SessionHandle;
pub use paging::{PAGING_DISABLE_COMMANDS, disable_paging};
